//! Feature computation for the tickcast system.
//!
//! This crate handles:
//! - Sample statistics over price windows
//! - Labeled sliding-window feature rows
//! - Column-wise z-score normalization

pub mod stats;
pub mod builder;
pub mod normalizer;

pub use stats::SampleStats;
pub use builder::{cumulative_return, Dataset, FeatureBuilder};
pub use normalizer::{NormalizedMatrix, Normalizer};
