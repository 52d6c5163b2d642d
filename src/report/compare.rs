//! Observation comparator: residuals against the reference curves.
//!
//! Predicted values are taken from the Gompertz formula at the exact
//! observation time (never interpolated from a sampled grid). Records whose
//! identifier has no parameters are reported individually; they never abort
//! the rest of the batch.

use thiserror::Error;

use crate::domain::{CurveParameters, GrowthCurve, ObservationRecord, ParameterSet};
use crate::models::predict;

/// One observation compared against its reference curve.
#[derive(Debug, Clone, PartialEq)]
pub struct ComparisonRow {
    pub id: String,
    pub time: f64,
    pub observed: f64,
    pub predicted: f64,
    /// `observed - predicted`.
    pub residual: f64,
    pub line: Option<usize>,
}

impl ComparisonRow {
    /// `false` when the prediction (and therefore the residual) is `NaN`/`inf`.
    pub fn is_finite(&self) -> bool {
        self.predicted.is_finite() && self.residual.is_finite()
    }
}

/// An observation whose identifier is not in the active parameter set.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("No parameters for identifier '{id}' (t={time}, observed={observed})")]
pub struct UnmatchedIdentifier {
    pub id: String,
    pub time: f64,
    pub observed: f64,
    pub line: Option<usize>,
}

impl From<&ObservationRecord> for UnmatchedIdentifier {
    fn from(record: &ObservationRecord) -> Self {
        Self {
            id: record.id.clone(),
            time: record.time,
            observed: record.observed,
            line: record.line,
        }
    }
}

/// Result of comparing a batch of observations. Both lists keep input order.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Comparison {
    pub rows: Vec<ComparisonRow>,
    pub unmatched: Vec<UnmatchedIdentifier>,
}

impl Comparison {
    /// Rows belonging to one identifier.
    pub fn rows_for<'a>(&'a self, id: &'a str) -> impl Iterator<Item = &'a ComparisonRow> + 'a {
        self.rows.iter().filter(move |r| r.id == id)
    }

    pub fn non_finite_count(&self) -> usize {
        self.rows.iter().filter(|r| !r.is_finite()).count()
    }
}

/// Compare one record against a parameter row.
pub fn compare_record(record: &ObservationRecord, params: &CurveParameters) -> ComparisonRow {
    let predicted = predict(params, record.time);
    ComparisonRow {
        id: record.id.clone(),
        time: record.time,
        observed: record.observed,
        predicted,
        residual: record.observed - predicted,
        line: record.line,
    }
}

/// Compare observations against a single curve taken from `set`.
///
/// Records of other identifiers in `set` belong to other curves and are
/// skipped. Records whose identifier is missing from `set` are unmatched.
pub fn compare(observations: &[ObservationRecord], curve: &GrowthCurve, set: &ParameterSet) -> Comparison {
    let mut out = Comparison::default();
    for record in observations {
        if record.id == curve.params.id {
            out.rows.push(compare_record(record, &curve.params));
        } else if !set.contains(&record.id) {
            out.unmatched.push(record.into());
        }
    }
    out
}

/// Compare observations against every curve in `set`, routing by identifier.
pub fn compare_all(observations: &[ObservationRecord], set: &ParameterSet) -> Comparison {
    let mut out = Comparison::default();
    for record in observations {
        match set.get(&record.id) {
            Some(params) => out.rows.push(compare_record(record, params)),
            None => out.unmatched.push(record.into()),
        }
    }
    out
}

/// Residual statistics for one identifier.
///
/// Statistics cover finite residuals only; `non_finite` counts the rest.
/// They are `None` when no finite residual exists.
#[derive(Debug, Clone, PartialEq)]
pub struct ResidualSummary {
    pub id: String,
    pub n: usize,
    pub non_finite: usize,
    pub mean_residual: Option<f64>,
    pub rmse: Option<f64>,
    pub max_abs_residual: Option<f64>,
}

/// Per-identifier summaries, in order of first appearance.
pub fn summarize(rows: &[ComparisonRow]) -> Vec<ResidualSummary> {
    let mut order: Vec<&str> = Vec::new();
    for r in rows {
        if !order.contains(&r.id.as_str()) {
            order.push(&r.id);
        }
    }

    order
        .into_iter()
        .map(|id| {
            let group: Vec<&ComparisonRow> = rows.iter().filter(|r| r.id == id).collect();
            let finite: Vec<f64> = group.iter().filter(|r| r.is_finite()).map(|r| r.residual).collect();

            let (mean_residual, rmse, max_abs_residual) = if finite.is_empty() {
                (None, None, None)
            } else {
                let n = finite.len() as f64;
                let mean = finite.iter().sum::<f64>() / n;
                let rmse = (finite.iter().map(|r| r * r).sum::<f64>() / n).sqrt();
                let max_abs = finite.iter().fold(0.0_f64, |acc, r| acc.max(r.abs()));
                (Some(mean), Some(rmse), Some(max_abs))
            };

            ResidualSummary {
                id: id.to_string(),
                n: group.len(),
                non_finite: group.len() - finite.len(),
                mean_residual,
                rmse,
                max_abs_residual,
            }
        })
        .collect()
}

/// Largest deviations on each side of the curve (top-N each side).
#[derive(Debug, Clone, Default)]
pub struct Deviations {
    /// Heaviest relative to the curve (largest positive residuals).
    pub above: Vec<ComparisonRow>,
    /// Lightest relative to the curve (most negative residuals).
    pub below: Vec<ComparisonRow>,
}

/// Rank the top deviations above and below the curve. Non-finite rows are excluded.
pub fn rank_deviations(rows: &[ComparisonRow], top_n: usize) -> Deviations {
    let mut sorted: Vec<ComparisonRow> = rows.iter().filter(|r| r.is_finite()).cloned().collect();
    sorted.sort_by(|a, b| b.residual.total_cmp(&a.residual));
    let above = sorted.iter().filter(|r| r.residual > 0.0).take(top_n).cloned().collect();

    sorted.reverse();
    let below = sorted.iter().filter(|r| r.residual < 0.0).take(top_n).cloned().collect();

    Deviations { above, below }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::evaluate;

    fn params(id: &str, b0: f64, b1: f64, b2: f64) -> CurveParameters {
        CurveParameters {
            id: id.to_string(),
            b0,
            b1,
            b2,
        }
    }

    fn obs(id: &str, time: f64, observed: f64) -> ObservationRecord {
        ObservationRecord {
            id: id.to_string(),
            time,
            observed,
            line: None,
        }
    }

    fn region_set() -> ParameterSet {
        let mut set = ParameterSet::new();
        set.insert(params("RegionA", 500.0, 3.5, 0.05)).unwrap();
        set.insert(params("RegionB", 420.0, 3.0, 0.04)).unwrap();
        set
    }

    #[test]
    fn predicted_uses_the_exact_observation_time() {
        let p = params("RegionA", 500.0, 3.5, 0.05);
        // A coarse grid that does not contain t=37.3.
        let curve = evaluate(&p, &[0.0, 100.0]);
        let cmp = compare(&[obs("RegionA", 37.3, 300.0)], &curve, &region_set());

        let row = &cmp.rows[0];
        assert_eq!(row.predicted, predict(&p, 37.3));
        assert_eq!(row.residual, 300.0 - predict(&p, 37.3));
        assert!(cmp.unmatched.is_empty());
    }

    #[test]
    fn unmatched_identifier_does_not_abort_the_batch() {
        let records = vec![
            obs("RegionA", 10.0, 100.0),
            obs("RegionZ", 20.0, 150.0),
            obs("RegionB", 30.0, 200.0),
        ];
        let cmp = compare_all(&records, &region_set());

        assert_eq!(cmp.rows.len(), 2);
        assert_eq!(cmp.rows[0].id, "RegionA");
        assert_eq!(cmp.rows[1].id, "RegionB");
        assert_eq!(cmp.unmatched.len(), 1);
        assert_eq!(cmp.unmatched[0].id, "RegionZ");
        assert!(cmp.unmatched[0].to_string().contains("RegionZ"));
    }

    #[test]
    fn single_curve_comparison_skips_known_ids_and_reports_unknown_ones() {
        let set = region_set();
        let curve = evaluate(set.get("RegionA").unwrap(), &[0.0]);
        let records = [
            obs("RegionB", 1.0, 1.0),
            obs("RegionA", 1.0, 1.0),
            obs("RegionZ", 2.0, 2.0),
        ];
        let cmp = compare(&records, &curve, &set);

        assert_eq!(cmp.rows.len(), 1);
        assert_eq!(cmp.rows[0].id, "RegionA");
        assert_eq!(cmp.unmatched.len(), 1);
        assert_eq!(cmp.unmatched[0].id, "RegionZ");
    }

    #[test]
    fn comparison_is_idempotent() {
        let records = vec![obs("RegionA", 12.5, 120.0), obs("RegionB", 80.0, 390.0)];
        let set = region_set();
        assert_eq!(compare_all(&records, &set), compare_all(&records, &set));
    }

    #[test]
    fn non_finite_predictions_are_kept_and_flagged() {
        let mut set = ParameterSet::new();
        set.insert(params("Bad", 1.0, -1.0, -1.0)).unwrap();
        let cmp = compare_all(&[obs("Bad", 1000.0, 10.0), obs("Bad", 0.0, 3.0)], &set);

        assert_eq!(cmp.rows.len(), 2);
        assert!(!cmp.rows[0].is_finite());
        assert!(cmp.rows[0].residual.is_infinite());
        assert_eq!(cmp.non_finite_count(), 1);

        let summary = summarize(&cmp.rows);
        assert_eq!(summary[0].n, 2);
        assert_eq!(summary[0].non_finite, 1);
        // Only the finite residual contributes.
        let expected = 3.0 - predict(&params("Bad", 1.0, -1.0, -1.0), 0.0);
        assert!((summary[0].mean_residual.unwrap() - expected).abs() < 1e-12);
    }

    #[test]
    fn summary_statistics() {
        let rows = vec![
            ComparisonRow {
                id: "A".to_string(),
                time: 0.0,
                observed: 3.0,
                predicted: 0.0,
                residual: 3.0,
                line: None,
            },
            ComparisonRow {
                id: "A".to_string(),
                time: 1.0,
                observed: -4.0,
                predicted: 0.0,
                residual: -4.0,
                line: None,
            },
        ];
        let s = &summarize(&rows)[0];
        assert_eq!(s.n, 2);
        assert_eq!(s.mean_residual, Some(-0.5));
        assert!((s.rmse.unwrap() - 12.5_f64.sqrt()).abs() < 1e-12);
        assert_eq!(s.max_abs_residual, Some(4.0));
    }

    #[test]
    fn rank_deviations_basic() {
        let set = region_set();
        let a = &set.get("RegionA").unwrap().clone();
        let records = vec![
            obs("RegionA", 50.0, predict(a, 50.0)),
            obs("RegionA", 60.0, predict(a, 60.0) + 25.0),
            obs("RegionA", 70.0, predict(a, 70.0) - 40.0),
            obs("RegionA", 80.0, predict(a, 80.0) + 5.0),
        ];
        let cmp = compare_all(&records, &set);
        let dev = rank_deviations(&cmp.rows, 1);

        assert_eq!(dev.above.len(), 1);
        assert_eq!(dev.above[0].time, 60.0);
        assert_eq!(dev.below.len(), 1);
        assert_eq!(dev.below[0].time, 70.0);
    }
}
