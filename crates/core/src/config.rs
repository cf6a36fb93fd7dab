//! Configuration structures for the tickcast system.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;

/// Main configuration for the forecaster.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Tick buffer configuration.
    pub buffer: BufferConfig,
    /// Feature construction configuration.
    pub features: FeatureConfig,
    /// Train/predict loop timing.
    pub schedule: ScheduleConfig,
    /// Market data feed configuration.
    pub feed: FeedConfig,
    /// Classifier configuration.
    pub classifier: ClassifierConfig,
}

impl Config {
    /// Load a configuration from a JSON file.
    ///
    /// Missing sections and fields fall back to their defaults.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let config: Config = serde_json::from_str(&raw)?;
        config.validate()?;
        Ok(config)
    }

    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<()> {
        let f = &self.features;
        if f.window < 2 {
            return Err(Error::config(format!("features.window must be >= 2, got {}", f.window)));
        }
        if f.output < 2 {
            return Err(Error::config(format!("features.output must be >= 2, got {}", f.output)));
        }
        if !(f.band_multiplier.is_finite() && f.band_multiplier >= 0.0) {
            return Err(Error::config("features.band_multiplier must be finite and >= 0"));
        }

        let b = &self.buffer;
        if b.start_limit <= f.window + f.output {
            return Err(Error::config(format!(
                "buffer.start_limit ({}) must exceed window + output ({})",
                b.start_limit,
                f.window + f.output
            )));
        }
        if b.limit < b.start_limit {
            return Err(Error::config(format!(
                "buffer.limit ({}) must be >= buffer.start_limit ({})",
                b.limit, b.start_limit
            )));
        }

        if self.schedule.cycle_interval_ms == 0 {
            return Err(Error::config("schedule.cycle_interval_ms must be > 0"));
        }

        let c = &self.classifier;
        if !(c.c.is_finite() && c.c > 0.0) {
            return Err(Error::config("classifier.c must be finite and > 0"));
        }
        if let Some(gamma) = c.gamma {
            if !(gamma.is_finite() && gamma > 0.0) {
                return Err(Error::config("classifier.gamma must be finite and > 0"));
            }
        }
        if !(c.learning_rate.is_finite() && c.learning_rate > 0.0) {
            return Err(Error::config("classifier.learning_rate must be finite and > 0"));
        }

        if self.feed.product_id.is_empty() {
            return Err(Error::config("feed.product_id must not be empty"));
        }

        Ok(())
    }
}

/// Tick buffer sizing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BufferConfig {
    /// Maximum number of prices retained.
    pub limit: usize,
    /// Prices required before the first cycle runs.
    pub start_limit: usize,
}

impl Default for BufferConfig {
    fn default() -> Self {
        Self {
            limit: 300,
            start_limit: 60,
        }
    }
}

/// Where the volatility bands of a feature row are centred.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BandAnchor {
    /// `window_mean ± k·stdev`.
    Mean,
    /// `last_price ± k·stdev`.
    LastPrice,
}

/// Sliding-window feature configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeatureConfig {
    /// Trailing window length for row statistics.
    pub window: usize,
    /// Forward horizon length used for labels.
    pub output: usize,
    /// Stdev multiplier for the bands.
    pub band_multiplier: f64,
    /// Band centre.
    pub band_anchor: BandAnchor,
}

impl Default for FeatureConfig {
    fn default() -> Self {
        Self {
            window: 15,
            output: 5,
            band_multiplier: 2.0,
            band_anchor: BandAnchor::Mean,
        }
    }
}

/// Loop timing.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ScheduleConfig {
    /// Pause after each cycle (ms).
    pub cycle_interval_ms: u64,
    /// Re-check interval while waiting for enough prices (ms).
    pub waiting_poll_ms: u64,
}

impl ScheduleConfig {
    /// Pause after each cycle.
    pub fn cycle_interval(&self) -> Duration {
        Duration::from_millis(self.cycle_interval_ms)
    }

    /// Re-check interval while waiting.
    pub fn waiting_poll(&self) -> Duration {
        Duration::from_millis(self.waiting_poll_ms)
    }
}

impl Default for ScheduleConfig {
    fn default() -> Self {
        Self {
            cycle_interval_ms: 3_000,
            waiting_poll_ms: 1_000,
        }
    }
}

/// Market data feed configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FeedConfig {
    /// WebSocket endpoint.
    pub url: String,
    /// Product to subscribe to (e.g., "BTC-USD").
    pub product_id: String,
    /// Channel name.
    pub channel: String,
    /// Delay before reconnecting after a dropped connection (ms).
    pub reconnect_delay_ms: u64,
}

impl FeedConfig {
    /// Delay before reconnecting.
    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }
}

impl Default for FeedConfig {
    fn default() -> Self {
        Self {
            url: "wss://ws-feed.exchange.coinbase.com".to_string(),
            product_id: "BTC-USD".to_string(),
            channel: "ticker".to_string(),
            reconnect_delay_ms: 5_000,
        }
    }
}

/// Which classifier implementation backs the loop.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClassifierKind {
    /// RBF-kernel support vector classifier with Platt probabilities.
    Svm,
    /// Logistic regression trained by gradient descent.
    Logistic,
}

/// Classifier hyperparameters.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClassifierConfig {
    /// Implementation to use.
    pub kind: ClassifierKind,
    /// SVM soft-margin penalty.
    pub c: f64,
    /// RBF kernel coefficient. `None` uses `1 / (n_features * var(X))`.
    pub gamma: Option<f64>,
    /// SMO stopping tolerance.
    pub tolerance: f64,
    /// SMO iteration cap.
    pub max_passes: usize,
    /// Logistic regression step size.
    pub learning_rate: f64,
    /// Logistic regression iteration cap.
    pub max_iter: usize,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            kind: ClassifierKind::Svm,
            c: 1.0,
            gamma: None,
            tolerance: 1e-3,
            max_passes: 10_000,
            learning_rate: 0.1,
            max_iter: 1_000,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert_eq!(config.buffer.limit, 300);
        assert_eq!(config.buffer.start_limit, 60);
        assert_eq!(config.features.window, 15);
        assert_eq!(config.features.output, 5);
        assert_eq!(config.schedule.cycle_interval(), Duration::from_secs(3));
        assert_eq!(config.classifier.kind, ClassifierKind::Svm);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let json = r#"{"buffer": {"start_limit": 80}, "classifier": {"kind": "logistic"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.buffer.start_limit, 80);
        assert_eq!(config.buffer.limit, 300);
        assert_eq!(config.classifier.kind, ClassifierKind::Logistic);
        assert_eq!(config.features.band_anchor, BandAnchor::Mean);
    }

    #[test]
    fn test_band_anchor_serde() {
        let json = r#"{"features": {"band_anchor": "last_price"}}"#;
        let config: Config = serde_json::from_str(json).unwrap();
        assert_eq!(config.features.band_anchor, BandAnchor::LastPrice);
    }

    #[test]
    fn test_start_limit_must_exceed_windows() {
        let mut config = Config::default();
        config.buffer.start_limit = 20;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_limit_below_start_limit_rejected() {
        let mut config = Config::default();
        config.buffer.limit = 50;
        assert!(matches!(config.validate(), Err(Error::Config(_))));
    }

    #[test]
    fn test_short_window_rejected() {
        let mut config = Config::default();
        config.features.output = 1;
        assert!(config.validate().is_err());
    }
}
