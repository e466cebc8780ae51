//! Percentile Bootstrap
//!
//! Resamples the per-operation values with replacement and reads the
//! confidence bounds of the mean straight off the sorted bootstrap means.

use rand::Rng;
use rand::thread_rng;
use rayon::prelude::*;

/// Bounds of a bootstrap confidence interval for the mean
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct BootstrapInterval {
    pub lower: f64,
    pub upper: f64,
}

impl BootstrapInterval {
    pub fn half_width(&self) -> f64 {
        (self.upper - self.lower) / 2.0
    }
}

/// Bootstrap the mean of `samples`; callers guarantee `samples.len() >= 2`.
pub(crate) fn bootstrap_mean(samples: &[f64], iterations: usize, confidence: f64) -> BootstrapInterval {
    let n = samples.len();
    let mut means: Vec<f64> = (0..iterations)
        .into_par_iter()
        .map_init(thread_rng, |rng, _| {
            let mut sum = 0.0;
            for _ in 0..n {
                sum += samples[rng.gen_range(0..n)];
            }
            sum / n as f64
        })
        .collect();
    means.sort_by(f64::total_cmp);

    let alpha = (1.0 - confidence) / 2.0;
    let last = means.len() - 1;
    let lower_idx = ((alpha * means.len() as f64).floor() as usize).min(last);
    let upper_idx = (((1.0 - alpha) * means.len() as f64).floor() as usize).min(last);

    BootstrapInterval {
        lower: means[lower_idx],
        upper: means[upper_idx],
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_interval_contains_mean() {
        let samples: Vec<f64> = (0..100).map(|x| x as f64).collect();
        let interval = bootstrap_mean(&samples, 2_000, 0.95);
        assert!(interval.lower < 49.5);
        assert!(interval.upper > 49.5);
        assert!(interval.half_width() > 0.0);
    }

    #[test]
    fn test_constant_samples_collapse() {
        let samples = vec![7.0; 12];
        let interval = bootstrap_mean(&samples, 500, 0.99);
        assert_eq!(interval.lower, 7.0);
        assert_eq!(interval.upper, 7.0);
        assert_eq!(interval.half_width(), 0.0);
    }

    #[test]
    fn test_wider_confidence_is_wider() {
        let samples: Vec<f64> = (0..50).map(|x| (x * x) as f64).collect();
        let narrow = bootstrap_mean(&samples, 5_000, 0.5);
        let wide = bootstrap_mean(&samples, 5_000, 0.999);
        assert!(wide.half_width() > narrow.half_width());
    }
}
