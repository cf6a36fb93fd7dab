//! Sliding-window feature matrix construction.
//!
//! Every index `i` in `window..len - output` yields one labeled row: the
//! statistics of the trailing `window` prices, and a label from the
//! cumulative return of the `output` prices starting at `i`. One extra
//! unlabeled row describes the latest prices and is the row to predict.

use crate::stats::SampleStats;
use tickcast_core::config::{BandAnchor, FeatureConfig};
use tickcast_core::{Error, FeatureRow, Label, Price, Result};

/// Cumulative multiplicative return across consecutive prices.
///
/// `prod(p[k] / p[k-1]) - 1`; a single price has zero return.
pub fn cumulative_return(prices: &[Price]) -> f64 {
    let growth: f64 = prices.windows(2).map(|w| w[1] / w[0]).product();
    growth - 1.0
}

/// Feature rows for one price snapshot.
#[derive(Debug, Clone, PartialEq)]
pub struct Dataset {
    /// All rows; the last one is unlabeled.
    rows: Vec<FeatureRow>,
    /// One label per row except the last.
    labels: Vec<Label>,
}

impl Dataset {
    /// All rows, pending row last.
    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Labels for every row but the last.
    pub fn labels(&self) -> &[Label] {
        &self.labels
    }

    /// Number of labeled rows.
    pub fn labeled_len(&self) -> usize {
        self.labels.len()
    }

    /// The unlabeled row to predict.
    pub fn pending(&self) -> &FeatureRow {
        // build() always appends the pending row
        &self.rows[self.rows.len() - 1]
    }

    /// Rows as a dense matrix, pending row last.
    pub fn to_matrix(&self) -> Vec<Vec<f64>> {
        self.rows.iter().map(FeatureRow::to_vec).collect()
    }

    /// Labels in classifier encoding.
    pub fn label_values(&self) -> Vec<f64> {
        self.labels.iter().map(|l| l.as_f64()).collect()
    }
}

/// Builds labeled feature rows from a price series.
#[derive(Debug, Clone)]
pub struct FeatureBuilder {
    window: usize,
    output: usize,
    band_multiplier: f64,
    band_anchor: BandAnchor,
}

impl FeatureBuilder {
    /// Builder with mean-centred bands two standard deviations wide.
    pub fn new(window: usize, output: usize) -> Self {
        Self {
            window,
            output,
            band_multiplier: 2.0,
            band_anchor: BandAnchor::Mean,
        }
    }

    /// Builder from configuration.
    pub fn from_config(config: &FeatureConfig) -> Self {
        Self {
            window: config.window,
            output: config.output,
            band_multiplier: config.band_multiplier,
            band_anchor: config.band_anchor,
        }
    }

    /// Override band centre and width.
    pub fn with_bands(mut self, anchor: BandAnchor, multiplier: f64) -> Self {
        self.band_anchor = anchor;
        self.band_multiplier = multiplier;
        self
    }

    /// Trailing window length.
    pub fn window(&self) -> usize {
        self.window
    }

    /// Forward horizon length.
    pub fn output(&self) -> usize {
        self.output
    }

    /// Smallest series `build` accepts.
    pub fn min_prices(&self) -> usize {
        self.window + self.output + 1
    }

    /// Build the labeled rows plus the pending row.
    pub fn build(&self, prices: &[Price]) -> Result<Dataset> {
        let n = prices.len();
        if n < self.min_prices() {
            return Err(Error::insufficient_data(format!(
                "need more than {} prices (window {} + output {}), got {}",
                self.window + self.output,
                self.window,
                self.output,
                n
            )));
        }

        let labeled = n - self.window - self.output;
        let mut rows = Vec::with_capacity(labeled + 1);
        let mut labels = Vec::with_capacity(labeled);

        for i in self.window..n - self.output {
            let trailing = &prices[i - self.window..i];
            rows.push(self.row(trailing, prices[i])?);

            let forward = &prices[i..i + self.output];
            labels.push(Label::from_return(cumulative_return(forward)));
        }

        // The pending row takes its statistics from the last `output`
        // prices, not the last `window`.
        let tail = &prices[n - self.output..];
        rows.push(self.row(tail, prices[n - 1])?);

        Ok(Dataset { rows, labels })
    }

    fn row(&self, window: &[Price], last_price: Price) -> Result<FeatureRow> {
        let stats = SampleStats::of(window)?;
        let centre = match self.band_anchor {
            BandAnchor::Mean => stats.mean,
            BandAnchor::LastPrice => last_price,
        };
        let half_width = self.band_multiplier * stats.std_dev;

        Ok(FeatureRow {
            last_price,
            window_mean: stats.mean,
            lower_band: centre - half_width,
            upper_band: centre + half_width,
        })
    }
}

impl Default for FeatureBuilder {
    fn default() -> Self {
        Self::from_config(&FeatureConfig::default())
    }
}
