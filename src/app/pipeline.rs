//! Shared "load → evaluate → compare" pipeline used by the CLI commands.
//!
//! Keeping this in one place avoids duplicating the core workflow:
//! parameter load -> time domain -> curve evaluation -> observation comparison
//!
//! The commands can then focus on presentation (tables, plots, exports).

use crate::domain::{GrowthCurve, RunConfig};
use crate::error::{AppError, EXIT_INPUT};
use crate::io::params::ParameterSource;
use crate::models::{evaluate, linspace};
use crate::report::{Comparison, Deviations, ResidualSummary, compare, compare_all, rank_deviations, summarize};
use crate::session::Session;

/// All computed outputs of a single run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub session: Session,
    /// Curves for the selected identifier(s), in parameter-table order.
    pub curves: Vec<GrowthCurve>,
    /// Present when observations were supplied.
    pub comparison: Option<Comparison>,
    pub summaries: Vec<ResidualSummary>,
    pub deviations: Option<Deviations>,
}

/// Build and validate the time domain requested by `config`.
pub fn time_domain(config: &RunConfig) -> Result<Vec<f64>, AppError> {
    if !(config.time_start.is_finite() && config.time_end.is_finite()) {
        return Err(AppError::new(EXIT_INPUT, "Time domain bounds must be finite."));
    }
    if config.time_end <= config.time_start {
        return Err(AppError::new(
            EXIT_INPUT,
            format!(
                "Invalid time domain: end ({}) must be greater than start ({}).",
                config.time_end, config.time_start
            ),
        ));
    }
    if config.time_points < 2 {
        return Err(AppError::new(EXIT_INPUT, "Time domain needs at least 2 points."));
    }
    Ok(linspace(config.time_start, config.time_end, config.time_points))
}

/// Open a session on the configured parameter source (bundled when none).
pub fn open_session(config: &RunConfig) -> Result<Session, AppError> {
    let domain = time_domain(config)?;
    let source = ParameterSource::from_option(config.params_path.clone());
    Ok(Session::open(&source, domain)?)
}

/// Execute the full pipeline and return the computed outputs.
pub fn run(config: &RunConfig) -> Result<RunOutput, AppError> {
    let mut session = open_session(config)?;
    if let Some(path) = &config.observations_path {
        session.reload_observations(path)?;
    }
    run_with_session(config, session)
}

/// Evaluate and compare using an already opened session.
pub fn run_with_session(config: &RunConfig, session: Session) -> Result<RunOutput, AppError> {
    let params = session.parameters();

    let curves: Vec<GrowthCurve> = match &config.id {
        Some(id) => {
            let Some(p) = params.get(id) else {
                let known: Vec<&str> = params.ids().collect();
                return Err(AppError::new(
                    EXIT_INPUT,
                    format!("Unknown identifier '{id}'. Available: {}", known.join(", ")),
                ));
            };
            vec![evaluate(p, session.time_domain())]
        }
        None => params.iter().map(|p| evaluate(p, session.time_domain())).collect(),
    };

    let comparison = session.observations().map(|ingest| {
        let comparison = match (&config.id, curves.first()) {
            (Some(_), Some(curve)) => compare(&ingest.records, curve, params),
            _ => compare_all(&ingest.records, params),
        };
        log::debug!(
            "compared {} observation(s): {} matched, {} unmatched",
            ingest.records.len(),
            comparison.rows.len(),
            comparison.unmatched.len()
        );
        comparison
    });

    log::debug!(
        "evaluated {} curve(s) over {} time point(s)",
        curves.len(),
        session.time_domain().len()
    );

    let summaries = comparison.as_ref().map(|c| summarize(&c.rows)).unwrap_or_default();
    let deviations = comparison.as_ref().map(|c| rank_deviations(&c.rows, config.top_n));

    Ok(RunOutput {
        session,
        curves,
        comparison,
        summaries,
        deviations,
    })
}
