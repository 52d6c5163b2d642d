//! Command-line parsing for the growth-curve dashboard.
//!
//! The goal of this module is to keep **argument parsing** and **command dispatch**
//! separate from the evaluation code. Flags that several commands share live in
//! flattened groups (`SourceArgs`, `DomainArgs`, `PlotOpts`).

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::models::{DEFAULT_TIME_END, DEFAULT_TIME_POINTS, DEFAULT_TIME_START};

pub mod picker;

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(name = "growth", version, about = "Gompertz growth-curve dashboard")]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Print the active parameter table and where it came from.
    List(ListArgs),
    /// Print predicted values over the time domain; optionally plot/export.
    Curve(CurveArgs),
    /// Compare observations against the reference curves.
    Compare(CompareArgs),
    /// Plot a previously exported curve JSON.
    Plot(PlotArgs),
    /// Write a synthetic observation CSV around one identifier's curve.
    Generate(GenerateArgs),
    /// Launch the interactive TUI (default when no subcommand is given).
    Tui(TuiArgs),
}

/// Where parameters and observations come from.
#[derive(Debug, Args, Clone, Default)]
pub struct SourceArgs {
    /// Parameter table (.csv/.xlsx/.xls). Omit to use the bundled defaults.
    #[arg(short = 'p', long = "params", value_name = "FILE", env = "GROWTH_PARAMETERS")]
    pub params: Option<PathBuf>,

    /// Observation table (id, time, observed).
    #[arg(short = 'o', long = "obs", value_name = "FILE", env = "GROWTH_OBSERVATIONS")]
    pub observations: Option<PathBuf>,
}

/// Time domain the curves are evaluated over.
#[derive(Debug, Args, Clone)]
pub struct DomainArgs {
    /// First time point (days).
    #[arg(long, default_value_t = DEFAULT_TIME_START, allow_negative_numbers = true)]
    pub start: f64,

    /// Last time point (days).
    #[arg(long, default_value_t = DEFAULT_TIME_END, allow_negative_numbers = true)]
    pub end: f64,

    /// Number of evenly spaced points.
    #[arg(long, default_value_t = DEFAULT_TIME_POINTS)]
    pub points: usize,
}

impl Default for DomainArgs {
    fn default() -> Self {
        Self {
            start: DEFAULT_TIME_START,
            end: DEFAULT_TIME_END,
            points: DEFAULT_TIME_POINTS,
        }
    }
}

/// Terminal plot options.
#[derive(Debug, Args, Clone)]
pub struct PlotOpts {
    /// Render an ASCII plot in the terminal.
    #[arg(long)]
    pub plot: bool,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct ListArgs {
    #[command(flatten)]
    pub source: SourceArgs,
}

#[derive(Debug, Args, Clone)]
pub struct CurveArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub domain: DomainArgs,

    /// Only this identifier (default: every identifier).
    #[arg(long)]
    pub id: Option<String>,

    #[command(flatten)]
    pub plot: PlotOpts,

    /// Export the evaluated curves (parameters + grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,
}

#[derive(Debug, Args, Clone)]
pub struct CompareArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub domain: DomainArgs,

    /// Only this identifier (default: every identifier).
    #[arg(long)]
    pub id: Option<String>,

    /// Show top-N deviations above and below the curve.
    #[arg(long, default_value_t = 5)]
    pub top: usize,

    #[command(flatten)]
    pub plot: PlotOpts,

    /// Export per-observation results to CSV.
    #[arg(long, value_name = "CSV")]
    pub export: Option<PathBuf>,

    /// Export the evaluated curves (parameters + grid) to JSON.
    #[arg(long = "export-curve", value_name = "JSON")]
    pub export_curve: Option<PathBuf>,
}

/// Options for plotting a saved curve.
#[derive(Debug, Args, Clone)]
pub struct PlotArgs {
    /// Curve JSON file produced by `growth curve --export-curve`.
    #[arg(long, value_name = "JSON")]
    pub curve: PathBuf,

    /// Plot width (columns).
    #[arg(long, default_value_t = 100)]
    pub width: usize,

    /// Plot height (rows).
    #[arg(long, default_value_t = 25)]
    pub height: usize,
}

#[derive(Debug, Args, Clone)]
pub struct GenerateArgs {
    /// Parameter table (.csv/.xlsx/.xls). Omit to use the bundled defaults.
    #[arg(short = 'p', long = "params", value_name = "FILE", env = "GROWTH_PARAMETERS")]
    pub params: Option<PathBuf>,

    /// Identifier whose curve the observations are drawn around.
    #[arg(long)]
    pub id: String,

    /// Output CSV path.
    #[arg(long, value_name = "CSV")]
    pub out: PathBuf,

    /// Number of observations.
    #[arg(short = 'n', long, default_value_t = 40)]
    pub count: usize,

    /// Random seed.
    #[arg(long, default_value_t = 42)]
    pub seed: u64,

    /// Earliest observation time (days).
    #[arg(long, default_value_t = DEFAULT_TIME_START)]
    pub time_min: f64,

    /// Latest observation time (days).
    #[arg(long, default_value_t = DEFAULT_TIME_END)]
    pub time_max: f64,

    /// Standard deviation of the multiplicative log-noise.
    #[arg(long, default_value_t = 0.05)]
    pub sigma: f64,

    /// Probability of an above-curve outlier.
    #[arg(long, default_value_t = 0.02)]
    pub jump_prob_high: f64,

    /// Probability of a below-curve outlier.
    #[arg(long, default_value_t = 0.02)]
    pub jump_prob_low: f64,

    /// Outlier size in units of sigma.
    #[arg(long, default_value_t = 3.0)]
    pub jump_k: f64,
}

#[derive(Debug, Args, Clone, Default)]
pub struct TuiArgs {
    #[command(flatten)]
    pub source: SourceArgs,

    #[command(flatten)]
    pub domain: DomainArgs,
}
