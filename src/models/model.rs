//! Gompertz growth-curve evaluation.
//!
//! Everything downstream (tables, plots, residuals) relies on one primitive:
//! predict `y(t) = b0 * exp(-b1 * exp(-b2 * t))` for a given parameter row.
//!
//! Evaluation never fails. Pathological coefficients produce `NaN`/`inf`
//! which are passed through untouched; renderers are responsible for flagging them.

use std::collections::BTreeMap;

use crate::domain::{CurveParameters, GrowthCurve, ParameterSet};

/// Default time axis of the dashboard (days).
pub const DEFAULT_TIME_START: f64 = 0.0;
pub const DEFAULT_TIME_END: f64 = 800.0;
pub const DEFAULT_TIME_POINTS: usize = 200;

/// Predict the Gompertz value at time `t`.
pub fn predict(params: &CurveParameters, t: f64) -> f64 {
    gompertz(t, params.b0, params.b1, params.b2)
}

/// The raw three-parameter Gompertz function.
pub fn gompertz(t: f64, b0: f64, b1: f64, b2: f64) -> f64 {
    b0 * (-b1 * (-b2 * t).exp()).exp()
}

/// Lazily evaluate a curve over `time_domain`, yielding `(t, predicted)`.
pub fn evaluate_iter<'a>(
    params: &'a CurveParameters,
    time_domain: &'a [f64],
) -> impl Iterator<Item = (f64, f64)> + 'a {
    time_domain.iter().map(move |&t| (t, predict(params, t)))
}

/// Evaluate one curve over `time_domain`.
pub fn evaluate(params: &CurveParameters, time_domain: &[f64]) -> GrowthCurve {
    GrowthCurve {
        params: params.clone(),
        points: evaluate_iter(params, time_domain).collect(),
    }
}

/// Evaluate every entry of `set` independently over the same domain.
pub fn evaluate_all(set: &ParameterSet, time_domain: &[f64]) -> BTreeMap<String, GrowthCurve> {
    set.iter()
        .map(|params| (params.id.clone(), evaluate(params, time_domain)))
        .collect()
}

/// `n` evenly spaced values from `start` to `end` (both inclusive).
///
/// `n == 1` yields `[start]`; `n == 0` yields an empty domain.
pub fn linspace(start: f64, end: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let step = (end - start) / (n as f64 - 1.0);
            let mut out: Vec<f64> = (0..n).map(|i| start + step * i as f64).collect();
            // Pin the endpoint so it is not off by an ulp.
            out[n - 1] = end;
            out
        }
    }
}

/// The dashboard's default time axis: 200 points over 0..=800 days.
pub fn default_time_domain() -> Vec<f64> {
    linspace(DEFAULT_TIME_START, DEFAULT_TIME_END, DEFAULT_TIME_POINTS)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn region_a() -> CurveParameters {
        CurveParameters {
            id: "RegionA".to_string(),
            b0: 500.0,
            b1: 3.5,
            b2: 0.05,
        }
    }

    #[test]
    fn value_at_zero_is_b0_times_exp_minus_b1() {
        let p = region_a();
        assert_eq!(predict(&p, 0.0), 500.0 * (-3.5_f64).exp());
    }

    #[test]
    fn converges_to_asymptote_for_large_t() {
        let p = region_a();
        let y = predict(&p, 1.0e6);
        assert!((y - p.b0).abs() < 1e-9, "expected ~{}, got {y}", p.b0);
        assert!((predict(&p, 400.0) - p.b0).abs() < 1e-4);
    }

    #[test]
    fn monotone_non_decreasing_for_positive_b1_b2() {
        let cases = [(500.0, 3.5, 0.05), (650.0, 2.8, 0.006), (1.0, 0.1, 10.0), (30.0, 12.0, 0.2)];
        let domain = linspace(-5.0, 1000.0, 2001);
        for (b0, b1, b2) in cases {
            let p = CurveParameters {
                id: "m".to_string(),
                b0,
                b1,
                b2,
            };
            let ys: Vec<f64> = evaluate_iter(&p, &domain).map(|(_, y)| y).collect();
            for w in ys.windows(2) {
                assert!(w[0] <= w[1], "not monotone for ({b0}, {b1}, {b2}): {} > {}", w[0], w[1]);
            }
        }
    }

    #[test]
    fn evaluation_is_bit_identical_across_calls() {
        let p = CurveParameters {
            id: "d".to_string(),
            b0: 612.25,
            b1: 2.7182,
            b2: 0.00731,
        };
        let domain = default_time_domain();
        let a = evaluate(&p, &domain);
        let b = evaluate(&p, &domain);
        for (x, y) in a.points.iter().zip(b.points.iter()) {
            assert_eq!(x.0.to_bits(), y.0.to_bits());
            assert_eq!(x.1.to_bits(), y.1.to_bits());
        }
    }

    #[test]
    fn region_a_scenario_is_strictly_increasing() {
        let curve = evaluate(&region_a(), &[0.0, 50.0, 100.0]);
        let ys: Vec<f64> = curve.points.iter().map(|&(_, y)| y).collect();

        assert!((ys[0] - 500.0 * (-3.5_f64).exp()).abs() < 1e-12);
        assert!((ys[0] - 15.0987).abs() < 1e-3);
        assert!((ys[1] - 375.1442).abs() < 1e-3, "t=50 -> {}", ys[1]);
        assert!((ys[2] - 488.3465).abs() < 1e-3, "t=100 -> {}", ys[2]);
        assert!(ys[0] < ys[1] && ys[1] < ys[2]);
        assert!(ys[2] < 500.0);
    }

    #[test]
    fn pathological_parameters_propagate_without_panicking() {
        let p = CurveParameters {
            id: "bad".to_string(),
            b0: f64::INFINITY,
            b1: 0.0,
            b2: 1.0,
        };
        assert!(predict(&p, 1.0).is_infinite());

        let p = CurveParameters {
            id: "nan".to_string(),
            b0: 1.0,
            b1: f64::NAN,
            b2: 1.0,
        };
        let curve = evaluate(&p, &[0.0, 1.0]);
        assert_eq!(curve.non_finite_count(), 2);

        // Negative growth rate blows up for large t instead of raising.
        let p = CurveParameters {
            id: "neg".to_string(),
            b0: 1.0,
            b1: -1.0,
            b2: -1.0,
        };
        assert!(predict(&p, 1000.0).is_infinite());
    }

    #[test]
    fn evaluate_all_covers_every_identifier() {
        let mut set = ParameterSet::new();
        set.insert(region_a()).unwrap();
        set.insert(CurveParameters {
            id: "RegionB".to_string(),
            b0: 420.0,
            b1: 3.0,
            b2: 0.04,
        })
        .unwrap();

        let domain = [0.0, 10.0];
        let curves = evaluate_all(&set, &domain);
        assert_eq!(curves.len(), 2);
        assert_eq!(curves["RegionB"].points.len(), 2);
        assert_eq!(curves["RegionA"], evaluate(&region_a(), &domain));
    }

    #[test]
    fn linspace_matches_endpoints_and_length() {
        let d = default_time_domain();
        assert_eq!(d.len(), 200);
        assert_eq!(d[0], 0.0);
        assert_eq!(d[199], 800.0);
        assert!((d[1] - 800.0 / 199.0).abs() < 1e-12);

        assert!(linspace(0.0, 1.0, 0).is_empty());
        assert_eq!(linspace(3.0, 9.0, 1), vec![3.0]);
        assert_eq!(linspace(0.0, 1.0, 3), vec![0.0, 0.5, 1.0]);
    }
}
