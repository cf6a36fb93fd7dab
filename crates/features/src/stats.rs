//! Sample statistics shared by the feature builder and normalizer.

use statrs::statistics::Statistics;
use tickcast_core::{Error, Result};

/// Mean and sample standard deviation of a slice.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SampleStats {
    pub mean: f64,
    /// Standard deviation with the N-1 denominator.
    pub std_dev: f64,
}

impl SampleStats {
    /// Compute statistics for `values`.
    ///
    /// The sample standard deviation needs at least two observations.
    pub fn of(values: &[f64]) -> Result<Self> {
        if values.len() < 2 {
            return Err(Error::insufficient_data(format!(
                "sample statistics need at least 2 values, got {}",
                values.len()
            )));
        }

        Ok(Self {
            mean: values.iter().mean(),
            std_dev: values.iter().std_dev(),
        })
    }

    /// Z-score of `value` against these statistics.
    #[inline]
    pub fn z_score(&self, value: f64) -> f64 {
        (value - self.mean) / self.std_dev
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_known_values() {
        // mean 5, squared deviations sum to 32, 32 / 7 = 4.571...
        let stats = SampleStats::of(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]).unwrap();
        assert_relative_eq!(stats.mean, 5.0);
        assert_relative_eq!(stats.std_dev, (32.0_f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn test_single_value_rejected() {
        assert!(matches!(SampleStats::of(&[1.0]), Err(Error::InsufficientData(_))));
        assert!(matches!(SampleStats::of(&[]), Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_z_score() {
        let stats = SampleStats { mean: 10.0, std_dev: 2.0 };
        assert_relative_eq!(stats.z_score(14.0), 2.0);
    }
}
