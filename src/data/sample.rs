//! Synthetic observation generation around a reference curve.
//!
//! Used for demos and for exercising the comparator without real measurements.
//! Each observation is the curve value at a random time, scaled by
//! multiplicative log-normal noise with occasional jumps (outliers). The
//! noise is mean-corrected so `E[observed] == predicted`.

use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};

use rand::prelude::*;
use rand::rngs::StdRng;
use rand_distr::Normal;

use crate::domain::{CurveParameters, ObservationRecord};
use crate::error::{AppError, EXIT_INPUT, EXIT_RUNTIME};
use crate::models::predict;

#[derive(Debug, Clone)]
pub struct SampleConfig {
    pub count: usize,
    pub seed: u64,
    pub time_min: f64,
    pub time_max: f64,
    /// Standard deviation of the log-noise.
    pub sigma: f64,
    /// Probability of a heavy (above-curve) outlier.
    pub jump_prob_high: f64,
    /// Probability of a light (below-curve) outlier.
    pub jump_prob_low: f64,
    /// Jump size in units of `sigma`.
    pub jump_k: f64,
}

impl Default for SampleConfig {
    fn default() -> Self {
        Self {
            count: 40,
            seed: 42,
            time_min: 0.0,
            time_max: 800.0,
            sigma: 0.05,
            jump_prob_high: 0.02,
            jump_prob_low: 0.02,
            jump_k: 3.0,
        }
    }
}

/// Generate `cfg.count` observations for `params`, sorted by time.
///
/// Output is fully determined by the parameters and the config (including the seed).
pub fn generate_observations(params: &CurveParameters, cfg: &SampleConfig) -> Result<Vec<ObservationRecord>, AppError> {
    if cfg.count == 0 {
        return Err(AppError::new(EXIT_INPUT, "Sample count must be > 0."));
    }
    if !(cfg.time_min.is_finite() && cfg.time_max.is_finite() && cfg.time_max > cfg.time_min) {
        return Err(AppError::new(EXIT_INPUT, "Invalid time range for sample generation."));
    }
    if !(cfg.sigma.is_finite() && cfg.sigma >= 0.0) {
        return Err(AppError::new(EXIT_INPUT, "Noise sigma must be finite and >= 0."));
    }
    if cfg.jump_prob_high < 0.0 || cfg.jump_prob_low < 0.0 || (cfg.jump_prob_high + cfg.jump_prob_low) >= 1.0 {
        return Err(AppError::new(EXIT_INPUT, "Invalid jump probability settings."));
    }
    if !(cfg.jump_k.is_finite() && cfg.jump_k > 0.0) {
        return Err(AppError::new(EXIT_INPUT, "Invalid jump magnitude setting."));
    }

    let mut rng = StdRng::seed_from_u64(sample_seed(params, cfg));
    let normal = Normal::new(0.0, 1.0)
        .map_err(|e| AppError::new(EXIT_RUNTIME, format!("Noise distribution error: {e}")))?;

    let mean_correction = jump_mean_correction(cfg.sigma, cfg.jump_prob_high, cfg.jump_prob_low, cfg.jump_k);

    let mut out = Vec::with_capacity(cfg.count);
    for _ in 0..cfg.count {
        let time = rng.gen_range(cfg.time_min..=cfg.time_max);
        let base = predict(params, time);
        if !base.is_finite() {
            return Err(AppError::new(
                EXIT_INPUT,
                format!("Curve '{}' is not finite at t={time:.4}; cannot sample around it.", params.id),
            ));
        }

        let z = normal.sample(&mut rng);
        let jump = sample_jump(&mut rng, cfg.jump_prob_high, cfg.jump_prob_low, cfg.jump_k);
        let exponent = cfg.sigma * (z + jump) - mean_correction;

        out.push(ObservationRecord {
            id: params.id.clone(),
            time,
            observed: base * exponent.exp(),
            line: None,
        });
    }

    out.sort_by(|a, b| a.time.total_cmp(&b.time));
    log::debug!("generated {} observation(s) for {}", out.len(), params.id);
    Ok(out)
}

fn sample_seed(params: &CurveParameters, cfg: &SampleConfig) -> u64 {
    let mut hasher = DefaultHasher::new();
    params.id.hash(&mut hasher);
    params.b0.to_bits().hash(&mut hasher);
    params.b1.to_bits().hash(&mut hasher);
    params.b2.to_bits().hash(&mut hasher);
    cfg.count.hash(&mut hasher);
    cfg.seed.hash(&mut hasher);
    cfg.time_min.to_bits().hash(&mut hasher);
    cfg.time_max.to_bits().hash(&mut hasher);
    hasher.finish()
}

/// Log-shift so E[exp(log-noise)] == 1.0 (keeps the curve unbiased).
fn jump_mean_correction(sigma: f64, p_high: f64, p_low: f64, k: f64) -> f64 {
    let p_none = 1.0 - p_high - p_low;
    let m1 = p_none + p_high * (sigma * k).exp() + p_low * (-sigma * k).exp();
    0.5 * sigma * sigma + m1.ln()
}

fn sample_jump(rng: &mut StdRng, p_high: f64, p_low: f64, k: f64) -> f64 {
    let roll: f64 = rng.r#gen();
    if roll < p_high {
        k
    } else if roll < p_high + p_low {
        -k
    } else {
        0.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn north() -> CurveParameters {
        CurveParameters {
            id: "North".to_string(),
            b0: 612.4,
            b1: 2.92,
            b2: 0.0061,
        }
    }

    #[test]
    fn generation_is_deterministic_per_seed() {
        let cfg = SampleConfig::default();
        let a = generate_observations(&north(), &cfg).unwrap();
        let b = generate_observations(&north(), &cfg).unwrap();
        assert_eq!(a, b);

        let other = SampleConfig { seed: 7, ..cfg };
        let c = generate_observations(&north(), &other).unwrap();
        assert_ne!(a, c);
    }

    #[test]
    fn observations_are_sorted_and_in_range() {
        let cfg = SampleConfig {
            count: 200,
            time_min: 10.0,
            time_max: 300.0,
            ..SampleConfig::default()
        };
        let obs = generate_observations(&north(), &cfg).unwrap();
        assert_eq!(obs.len(), 200);
        assert!(obs.iter().all(|o| o.id == "North" && o.observed > 0.0));
        assert!(obs.iter().all(|o| (10.0..=300.0).contains(&o.time)));
        assert!(obs.windows(2).all(|w| w[0].time <= w[1].time));
    }

    #[test]
    fn noise_is_mean_corrected() {
        let cfg = SampleConfig {
            count: 20_000,
            ..SampleConfig::default()
        };
        let p = north();
        let obs = generate_observations(&p, &cfg).unwrap();
        let mean_ratio = obs.iter().map(|o| o.observed / predict(&p, o.time)).sum::<f64>() / obs.len() as f64;
        assert!((mean_ratio - 1.0).abs() < 0.01, "mean ratio {mean_ratio}");
    }

    #[test]
    fn zero_sigma_reproduces_the_curve() {
        let cfg = SampleConfig {
            sigma: 0.0,
            ..SampleConfig::default()
        };
        let p = north();
        for o in generate_observations(&p, &cfg).unwrap() {
            assert!((o.observed - predict(&p, o.time)).abs() < 1e-9);
        }
    }

    #[test]
    fn invalid_settings_are_rejected() {
        let p = north();
        let bad = [
            SampleConfig {
                count: 0,
                ..SampleConfig::default()
            },
            SampleConfig {
                time_min: 5.0,
                time_max: 5.0,
                ..SampleConfig::default()
            },
            SampleConfig {
                jump_prob_high: 0.6,
                jump_prob_low: 0.5,
                ..SampleConfig::default()
            },
        ];
        for cfg in bad {
            assert_eq!(generate_observations(&p, &cfg).unwrap_err().exit_code(), EXIT_INPUT);
        }
    }

    #[test]
    fn jump_correction_without_jumps_is_half_variance() {
        let c = jump_mean_correction(0.1, 0.0, 0.0, 3.0);
        assert!((c - 0.005).abs() < 1e-15);
    }
}
