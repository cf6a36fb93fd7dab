//! Core data types for the tickcast system.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// A single quote from the feed.
pub type Price = f64;

/// Number of columns in a [`FeatureRow`].
pub const FEATURE_COUNT: usize = 4;

/// Direction label for a forward horizon.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[repr(u8)]
pub enum Label {
    /// Cumulative forward return strictly positive.
    Up = 0,
    /// Forward return zero or negative.
    Down = 1,
}

impl Label {
    /// Label for a cumulative return.
    #[inline]
    pub fn from_return(ror: f64) -> Self {
        if ror > 0.0 {
            Label::Up
        } else {
            Label::Down
        }
    }

    /// Interpret a classifier output as a label.
    ///
    /// Classifiers report labels as floats; anything below 0.5 is `Up`.
    #[inline]
    pub fn from_prediction(value: f64) -> Self {
        if value < 0.5 {
            Label::Up
        } else {
            Label::Down
        }
    }

    /// Class index, also the column in a probability row.
    #[inline]
    pub fn index(self) -> usize {
        self as usize
    }

    /// Float encoding handed to classifiers.
    #[inline]
    pub fn as_f64(self) -> f64 {
        self.index() as f64
    }
}

/// Windowed statistics for one index of the price series.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FeatureRow {
    /// Price at the row's index.
    pub last_price: f64,
    /// Mean of the statistics window.
    pub window_mean: f64,
    /// Lower volatility band.
    pub lower_band: f64,
    /// Upper volatility band.
    pub upper_band: f64,
}

impl FeatureRow {
    /// Columns in matrix order.
    #[inline]
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [self.last_price, self.window_mean, self.lower_band, self.upper_band]
    }

    /// Columns as an owned row vector.
    pub fn to_vec(&self) -> Vec<f64> {
        self.to_array().to_vec()
    }
}

/// Trade direction a forecast favours.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Direction {
    Long,
    Short,
}

impl From<Label> for Direction {
    fn from(label: Label) -> Self {
        match label {
            Label::Up => Direction::Long,
            Label::Down => Direction::Short,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Long => f.write_str("Long"),
            Direction::Short => f.write_str("Short"),
        }
    }
}

/// Result of one train/predict cycle.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Forecast {
    /// Predicted direction.
    pub direction: Direction,
    /// Probability the classifier assigns to the predicted direction.
    pub probability: f64,
    /// Labeled rows the classifier was fitted on.
    pub training_rows: usize,
    /// When the forecast was produced.
    pub as_of: DateTime<Utc>,
}

impl fmt::Display for Forecast {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "The chance of a {} working is {}", self.direction, self.probability)
    }
}
