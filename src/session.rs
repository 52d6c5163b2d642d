//! Session context: the parameter set, observations and time domain in use.
//!
//! A `Session` is owned by whichever front-end drives it (one CLI command, or
//! the TUI for its lifetime) and passed explicitly; nothing is global.
//!
//! Reloads are replace-on-success: a new table is loaded into a temporary and
//! only swapped in once it validated completely. A failed reload leaves the
//! previous state untouched and hands the error back to the caller.

use std::collections::BTreeMap;
use std::path::Path;

use crate::domain::{GrowthCurve, ParameterOrigin, ParameterSet};
use crate::error::LoadError;
use crate::io::ingest::{IngestedObservations, load_observations};
use crate::io::params::{ParameterSource, load_parameters};
use crate::models::{evaluate, evaluate_all};
use crate::report::compare::{Comparison, compare_all};

pub const STATUS_DEFAULT: &str = "Using default parameters file.";
pub const STATUS_CUSTOM: &str = "Custom parameters file loaded successfully.";

#[derive(Debug, Clone)]
pub struct Session {
    params: ParameterSet,
    origin: ParameterOrigin,
    observations: Option<IngestedObservations>,
    time_domain: Vec<f64>,
}

impl Session {
    /// Start a session from `source` (bundled defaults when nothing was uploaded).
    pub fn open(source: &ParameterSource, time_domain: Vec<f64>) -> Result<Self, LoadError> {
        let params = load_parameters(source)?;
        Ok(Self {
            params,
            origin: source.origin(),
            observations: None,
            time_domain,
        })
    }

    pub fn parameters(&self) -> &ParameterSet {
        &self.params
    }

    pub fn origin(&self) -> &ParameterOrigin {
        &self.origin
    }

    pub fn is_default(&self) -> bool {
        self.origin == ParameterOrigin::Bundled
    }

    /// Which parameter file is in use, as shown to the user.
    pub fn status_message(&self) -> &'static str {
        if self.is_default() { STATUS_DEFAULT } else { STATUS_CUSTOM }
    }

    pub fn time_domain(&self) -> &[f64] {
        &self.time_domain
    }

    pub fn observations(&self) -> Option<&IngestedObservations> {
        self.observations.as_ref()
    }

    /// Replace the active parameter set with the one read from `source`.
    ///
    /// On error the previous set (and its origin) stays active.
    pub fn reload_parameters(&mut self, source: &ParameterSource) -> Result<(), LoadError> {
        match load_parameters(source) {
            Ok(params) => {
                self.params = params;
                self.origin = source.origin();
                Ok(())
            }
            Err(err) => {
                log::warn!(
                    "rejected parameters from {}; keeping {}: {err}",
                    source.origin(),
                    self.origin
                );
                Err(err)
            }
        }
    }

    /// Switch back to the bundled parameter table.
    pub fn reset_to_defaults(&mut self) -> Result<(), LoadError> {
        self.reload_parameters(&ParameterSource::Bundled)
    }

    /// Replace the active observations with the ones read from `path`.
    ///
    /// On error the previous observations stay active.
    pub fn reload_observations(&mut self, path: &Path) -> Result<(), LoadError> {
        match load_observations(path) {
            Ok(ingest) => {
                self.observations = Some(ingest);
                Ok(())
            }
            Err(err) => {
                log::warn!("rejected observations from {}: {err}", path.display());
                Err(err)
            }
        }
    }

    /// Evaluate the curve of one identifier over the session's time domain.
    pub fn curve(&self, id: &str) -> Option<GrowthCurve> {
        self.params.get(id).map(|p| evaluate(p, &self.time_domain))
    }

    /// Evaluate every curve over the session's time domain.
    pub fn curves(&self) -> BTreeMap<String, GrowthCurve> {
        evaluate_all(&self.params, &self.time_domain)
    }

    /// Compare the loaded observations (if any) against the active set.
    pub fn comparison(&self) -> Option<Comparison> {
        self.observations
            .as_ref()
            .map(|ingest| compare_all(&ingest.records, &self.params))
    }
}
