//! Top-level application orchestration.
//!
//! `src/main.rs` is intentionally tiny; this module is the "real main" that:
//! - parses CLI arguments
//! - loads the parameter table (bundled or uploaded)
//! - evaluates curves and compares observations
//! - prints reports/plots
//! - writes optional exports

use clap::Parser;

use crate::cli::{CompareArgs, Command, CurveArgs, DomainArgs, GenerateArgs, ListArgs, PlotArgs, SourceArgs, TuiArgs};
use crate::data::{SampleConfig, generate_observations};
use crate::domain::RunConfig;
use crate::error::{AppError, EXIT_EMPTY, EXIT_INPUT};
use crate::io::params::{ParameterSource, load_parameters};

pub mod pipeline;

/// Entry point for the `growth` binary.
pub fn run() -> Result<(), AppError> {
    // `growth` and `growth --params p.xlsx` behave like `growth tui ...`.
    // Clap requires a subcommand name, so argv is rewritten before parsing.
    let argv = rewrite_args(std::env::args().collect());
    let cli = crate::cli::Cli::parse_from(argv);

    match cli.command {
        Command::List(args) => handle_list(args),
        Command::Curve(args) => handle_curve(args),
        Command::Compare(args) => handle_compare(args),
        Command::Plot(args) => handle_plot(args),
        Command::Generate(args) => handle_generate(args),
        Command::Tui(args) => handle_tui(args),
    }
}

fn handle_list(args: ListArgs) -> Result<(), AppError> {
    let source = ParameterSource::from_option(args.source.params);
    let set = load_parameters(&source)?;
    print!("{}", crate::report::format_parameter_table(&set, &source.origin()));
    Ok(())
}

fn handle_curve(args: CurveArgs) -> Result<(), AppError> {
    let mut config = run_config(&args.source, &args.domain, args.id.clone());
    config.observations_path = None;
    config.plot = args.plot.plot;
    config.plot_width = args.plot.width;
    config.plot_height = args.plot.height;
    config.export_curve = args.export_curve.clone();

    let run = pipeline::run(&config)?;
    println!("Parameters: {}", run.session.origin());

    for curve in &run.curves {
        println!();
        print!("{}", crate::report::format_curve_table(curve));
        if config.plot {
            println!();
            print!(
                "{}",
                crate::plot::render_ascii_plot(curve, &[], config.plot_width, config.plot_height, None)
            );
        }
    }

    if let Some(path) = &config.export_curve {
        crate::io::curve::write_curve_json(path, &run.curves, run.session.origin())?;
    }
    Ok(())
}

fn handle_compare(args: CompareArgs) -> Result<(), AppError> {
    let mut config = run_config(&args.source, &args.domain, args.id.clone());
    if config.observations_path.is_none() {
        let path = crate::cli::picker::prompt_for_table_path("observation", "--obs")?;
        config.observations_path = Some(path);
    }
    config.top_n = args.top;
    config.plot = args.plot.plot;
    config.plot_width = args.plot.width;
    config.plot_height = args.plot.height;
    config.export_results = args.export.clone();
    config.export_curve = args.export_curve.clone();

    let run = pipeline::run(&config)?;
    let (Some(cmp), Some(ingest)) = (&run.comparison, run.session.observations()) else {
        return Err(AppError::new(EXIT_INPUT, "No observations loaded."));
    };

    println!("Parameters: {}", run.session.origin());
    print!("{}", crate::report::format_ingest_notes(ingest));
    println!();
    print!("{}", crate::report::format_comparison(cmp, &run.summaries));

    if let Some(dev) = &run.deviations {
        println!();
        print!("{}", crate::report::format_deviations(dev));
    }

    if config.plot {
        for curve in &run.curves {
            let rows: Vec<_> = cmp.rows_for(curve.id()).cloned().collect();
            if rows.is_empty() {
                continue;
            }
            println!();
            print!(
                "{}",
                crate::plot::render_ascii_plot(
                    curve,
                    &rows,
                    config.plot_width,
                    config.plot_height,
                    run.deviations.as_ref(),
                )
            );
        }
    }

    // Optional exports.
    if let Some(path) = &config.export_results {
        crate::io::export::write_results_csv(path, &cmp.rows)?;
    }
    if let Some(path) = &config.export_curve {
        crate::io::curve::write_curve_json(path, &run.curves, run.session.origin())?;
    }

    if cmp.rows.is_empty() {
        return Err(AppError::new(
            EXIT_EMPTY,
            "No observation matched an identifier in the parameter table.",
        ));
    }
    Ok(())
}

fn handle_plot(args: PlotArgs) -> Result<(), AppError> {
    let curve = crate::io::curve::read_curve_json(&args.curve)?;
    print!(
        "{}",
        crate::plot::render_ascii_plot_from_curve_file(&curve, args.width, args.height)
    );
    Ok(())
}

fn handle_generate(args: GenerateArgs) -> Result<(), AppError> {
    let set = load_parameters(&ParameterSource::from_option(args.params.clone()))?;
    let Some(params) = set.get(&args.id) else {
        return Err(AppError::new(
            EXIT_INPUT,
            format!("Unknown identifier '{}'.", args.id),
        ));
    };

    let cfg = SampleConfig {
        count: args.count,
        seed: args.seed,
        time_min: args.time_min,
        time_max: args.time_max,
        sigma: args.sigma,
        jump_prob_high: args.jump_prob_high,
        jump_prob_low: args.jump_prob_low,
        jump_k: args.jump_k,
    };
    let records = generate_observations(params, &cfg)?;
    crate::io::ingest::write_observations_csv(&args.out, &records)?;
    println!("Wrote {} observation(s) for {} to {}", records.len(), args.id, args.out.display());
    Ok(())
}

fn handle_tui(args: TuiArgs) -> Result<(), AppError> {
    let config = run_config(&args.source, &args.domain, None);
    crate::tui::run(&config)
}

/// Translate shared flag groups into the pipeline's `RunConfig`.
pub fn run_config(source: &SourceArgs, domain: &DomainArgs, id: Option<String>) -> RunConfig {
    RunConfig {
        params_path: source.params.clone(),
        observations_path: source.observations.clone(),
        time_start: domain.start,
        time_end: domain.end,
        time_points: domain.points,
        id,
        top_n: 5,
        plot: false,
        plot_width: 100,
        plot_height: 25,
        export_results: None,
        export_curve: None,
    }
}

/// Rewrite argv so `growth` defaults to `growth tui`.
///
/// Rules:
/// - `growth`                          -> `growth tui`
/// - `growth --params p.xlsx ...`      -> `growth tui --params p.xlsx ...`
/// - `growth --help/--version/-h`      -> unchanged (show top-level help/version)
fn rewrite_args(mut argv: Vec<String>) -> Vec<String> {
    let Some(arg1) = argv.get(1).cloned() else {
        argv.push("tui".to_string());
        return argv;
    };

    let is_top_level_help_or_version = matches!(
        arg1.as_str(),
        "-h" | "--help" | "-V" | "--version" | "help"
    );
    if is_top_level_help_or_version {
        return argv;
    }

    let is_subcommand = matches!(
        arg1.as_str(),
        "list" | "curve" | "compare" | "plot" | "generate" | "tui"
    );
    if is_subcommand {
        return argv;
    }

    // If the first token is a flag, treat it as "tui flags".
    if arg1.starts_with('-') {
        argv.insert(1, "tui".to_string());
        return argv;
    }

    // Otherwise, leave as-is.
    argv
}
