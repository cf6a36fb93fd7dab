//! Column-wise z-score normalization.
//!
//! Statistics come from the matrix being normalized, pending row included,
//! and are recomputed on every call. Nothing is carried between cycles.

use crate::stats::SampleStats;
use tickcast_core::{Error, Result};

/// Relative tolerance below which a column counts as constant.
const DEGENERATE_REL_TOL: f64 = 1e-10;

/// A standardized matrix and the statistics used to produce it.
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedMatrix {
    rows: Vec<Vec<f64>>,
    columns: Vec<SampleStats>,
}

impl NormalizedMatrix {
    /// Standardized rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Per-column statistics of the input.
    pub fn column_stats(&self) -> &[SampleStats] {
        &self.columns
    }

    /// Split into (all rows but the last, last row).
    pub fn split_last(&self) -> (&[Vec<f64>], &[Vec<f64>]) {
        self.rows.split_at(self.rows.len().saturating_sub(1))
    }
}

/// Column-wise z-score standardizer.
#[derive(Debug, Clone, Copy, Default)]
pub struct Normalizer;

impl Normalizer {
    pub fn new() -> Self {
        Self
    }

    /// Standardize every column to zero mean and unit sample stdev.
    pub fn normalize(&self, matrix: &[Vec<f64>]) -> Result<NormalizedMatrix> {
        if matrix.len() < 2 {
            return Err(Error::insufficient_data(format!(
                "normalization needs at least 2 rows, got {}",
                matrix.len()
            )));
        }

        let width = matrix[0].len();
        if width == 0 {
            return Err(Error::data("matrix has no columns"));
        }
        if let Some((i, row)) = matrix.iter().enumerate().find(|(_, r)| r.len() != width) {
            return Err(Error::data(format!(
                "row {} has {} columns, expected {}",
                i,
                row.len(),
                width
            )));
        }

        let mut columns = transpose(matrix);
        let mut stats = Vec::with_capacity(columns.len());

        for (index, column) in columns.iter_mut().enumerate() {
            let s = SampleStats::of(column)?;
            let tolerance = DEGENERATE_REL_TOL * s.mean.abs().max(1.0);
            if s.std_dev.is_nan() || s.std_dev <= tolerance {
                return Err(Error::DegenerateColumn { column: index });
            }

            for value in column.iter_mut() {
                *value = s.z_score(*value);
            }
            stats.push(s);
        }

        Ok(NormalizedMatrix {
            rows: transpose(&columns),
            columns: stats,
        })
    }
}

/// Swap rows and columns of a rectangular matrix.
fn transpose(matrix: &[Vec<f64>]) -> Vec<Vec<f64>> {
    let width = matrix.first().map_or(0, Vec::len);
    (0..width)
        .map(|j| matrix.iter().map(|row| row[j]).collect())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    fn sample_matrix() -> Vec<Vec<f64>> {
        (0..30)
            .map(|i| {
                let x = i as f64;
                vec![27000.0 + x * 3.5, (x * 0.4).sin(), x * x, -5.0 + (x * 1.3).cos()]
            })
            .collect()
    }

    #[test]
    fn test_columns_standardized() {
        let normalized = Normalizer::new().normalize(&sample_matrix()).unwrap();
        let columns = transpose(normalized.rows());

        assert_eq!(columns.len(), 4);
        for column in &columns {
            let s = SampleStats::of(column).unwrap();
            assert_abs_diff_eq!(s.mean, 0.0, epsilon = 1e-9);
            assert_abs_diff_eq!(s.std_dev, 1.0, epsilon = 1e-9);
        }
    }

    #[test]
    fn test_shape_preserved() {
        let matrix = sample_matrix();
        let normalized = Normalizer::new().normalize(&matrix).unwrap();

        assert_eq!(normalized.rows().len(), matrix.len());
        assert!(normalized.rows().iter().all(|r| r.len() == 4));
        assert_eq!(normalized.column_stats().len(), 4);
    }

    #[test]
    fn test_known_values() {
        let matrix = vec![vec![1.0], vec![2.0], vec![3.0]];
        let normalized = Normalizer::new().normalize(&matrix).unwrap();

        assert_abs_diff_eq!(normalized.rows()[0][0], -1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalized.rows()[1][0], 0.0, epsilon = 1e-12);
        assert_abs_diff_eq!(normalized.rows()[2][0], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_constant_column_is_degenerate() {
        let mut matrix = sample_matrix();
        for row in matrix.iter_mut() {
            row[2] = 0.1;
        }

        match Normalizer::new().normalize(&matrix) {
            Err(Error::DegenerateColumn { column }) => assert_eq!(column, 2),
            other => panic!("expected DegenerateColumn, got {:?}", other),
        }
    }

    #[test]
    fn test_too_few_rows() {
        let result = Normalizer::new().normalize(&[vec![1.0, 2.0]]);
        assert!(matches!(result, Err(Error::InsufficientData(_))));
    }

    #[test]
    fn test_ragged_rows() {
        let result = Normalizer::new().normalize(&[vec![1.0, 2.0], vec![3.0]]);
        assert!(matches!(result, Err(Error::Data(_))));
    }

    #[test]
    fn test_split_last() {
        let normalized = Normalizer::new().normalize(&sample_matrix()).unwrap();
        let (train, test) = normalized.split_last();

        assert_eq!(train.len(), 29);
        assert_eq!(test.len(), 1);
        assert_eq!(test[0], normalized.rows()[29]);
    }
}
