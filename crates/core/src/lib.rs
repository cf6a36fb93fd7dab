//! Core types and configuration for the tickcast system.
//!
//! This crate provides shared types used across all other crates:
//! - Price, label and feature row types
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::Config;
pub use error::{Error, Result};
pub use types::*;
