//! Shared domain types.
//!
//! These types are intentionally kept lightweight so they can be:
//!
//! - built once by the loaders and held by a `Session`
//! - evaluated repeatedly by the Gompertz evaluator
//! - exported to JSON/CSV and reloaded later for plotting

use std::collections::HashMap;
use std::path::PathBuf;

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

/// One Gompertz growth model: `b0 * exp(-b1 * exp(-b2 * t))`.
///
/// - `b0`: upper asymptote (mature weight)
/// - `b1`: displacement along the time axis
/// - `b2`: growth rate
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveParameters {
    pub id: String,
    pub b0: f64,
    pub b1: f64,
    pub b2: f64,
}

/// All curve parameters active in a session, keyed by identifier.
///
/// Keeps the order rows appeared in the source table (used for display) while
/// offering constant-time lookup by identifier. Identifiers are unique.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterSet {
    entries: Vec<CurveParameters>,
    index: HashMap<String, usize>,
}

impl ParameterSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert a new entry. Returns the entry back if its identifier is already present.
    pub fn insert(&mut self, params: CurveParameters) -> Result<(), CurveParameters> {
        if self.index.contains_key(&params.id) {
            return Err(params);
        }
        self.index.insert(params.id.clone(), self.entries.len());
        self.entries.push(params);
        Ok(())
    }

    pub fn get(&self, id: &str) -> Option<&CurveParameters> {
        self.index.get(id).map(|&idx| &self.entries[idx])
    }

    pub fn contains(&self, id: &str) -> bool {
        self.index.contains_key(id)
    }

    /// Identifiers in source order.
    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|p| p.id.as_str())
    }

    pub fn iter(&self) -> std::slice::Iter<'_, CurveParameters> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl<'a> IntoIterator for &'a ParameterSet {
    type Item = &'a CurveParameters;
    type IntoIter = std::slice::Iter<'a, CurveParameters>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

/// Where the active parameter set came from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParameterOrigin {
    /// The table compiled into the binary.
    Bundled,
    /// A user-supplied file (display name).
    File(String),
}

impl std::fmt::Display for ParameterOrigin {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterOrigin::Bundled => write!(f, "bundled defaults"),
            ParameterOrigin::File(name) => write!(f, "{name}"),
        }
    }
}

/// A single measured value for one identifier.
#[derive(Debug, Clone, PartialEq)]
pub struct ObservationRecord {
    pub id: String,
    pub time: f64,
    pub observed: f64,
    /// Source line (1-based, header = 1) when loaded from a file.
    pub line: Option<usize>,
}

/// Predicted values of one curve over a time domain.
///
/// Derived data: recomputable from `params` and the domain at any time.
#[derive(Debug, Clone, PartialEq)]
pub struct GrowthCurve {
    pub params: CurveParameters,
    /// `(time, predicted)` pairs in domain order. Predictions may be non-finite.
    pub points: Vec<(f64, f64)>,
}

impl GrowthCurve {
    pub fn id(&self) -> &str {
        &self.params.id
    }

    /// Number of predictions that are `NaN` or infinite.
    pub fn non_finite_count(&self) -> usize {
        self.points.iter().filter(|(_, y)| !y.is_finite()).count()
    }

    /// Points safe to draw (both coordinates finite).
    pub fn finite_points(&self) -> impl Iterator<Item = (f64, f64)> + '_ {
        self.points
            .iter()
            .copied()
            .filter(|(t, y)| t.is_finite() && y.is_finite())
    }
}

/// A full run's configuration as understood by the pipeline.
///
/// This is derived from CLI flags (plus `.env` / environment defaults).
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Parameter table; `None` means the bundled defaults.
    pub params_path: Option<PathBuf>,
    /// Optional observation table to compare against the curves.
    pub observations_path: Option<PathBuf>,

    pub time_start: f64,
    pub time_end: f64,
    pub time_points: usize,

    /// Restrict output to a single identifier.
    pub id: Option<String>,
    /// Deviations listed on each side of the curve.
    pub top_n: usize,

    pub plot: bool,
    pub plot_width: usize,
    pub plot_height: usize,

    pub export_results: Option<PathBuf>,
    pub export_curve: Option<PathBuf>,
}

/// A saved curve file (JSON).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveFile {
    pub tool: String,
    pub generated_at: DateTime<Local>,
    /// Where the parameters came from (`bundled defaults` or a file name).
    pub origin: String,
    pub curves: Vec<CurveEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveEntry {
    pub params: CurveParameters,
    pub grid: CurveGrid,
}

/// Sampled curve. Non-finite predictions are stored as `null`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurveGrid {
    pub time: Vec<f64>,
    pub predicted: Vec<Option<f64>>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params(id: &str) -> CurveParameters {
        CurveParameters {
            id: id.to_string(),
            b0: 500.0,
            b1: 3.0,
            b2: 0.01,
        }
    }

    #[test]
    fn parameter_set_keeps_source_order_and_rejects_duplicates() {
        let mut set = ParameterSet::new();
        set.insert(params("North")).unwrap();
        set.insert(params("Alpha")).unwrap();

        let dup = set.insert(params("North")).unwrap_err();
        assert_eq!(dup.id, "North");

        assert_eq!(set.ids().collect::<Vec<_>>(), vec!["North", "Alpha"]);
        assert_eq!(set.len(), 2);
        assert!(set.contains("Alpha"));
        assert!(set.get("Zulu").is_none());
    }

    #[test]
    fn growth_curve_counts_non_finite_points() {
        let curve = GrowthCurve {
            params: params("X"),
            points: vec![(0.0, 1.0), (1.0, f64::NAN), (2.0, f64::INFINITY), (3.0, 4.0)],
        };
        assert_eq!(curve.non_finite_count(), 2);
        assert_eq!(curve.finite_points().count(), 2);
    }
}
