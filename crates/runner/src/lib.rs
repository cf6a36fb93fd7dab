//! Train/predict loop for tickcast.
//!
//! This crate provides:
//! - `TrainPredictLoop`, the wait → fit → predict → report state machine
//! - `Reporter` sinks for waiting notices and forecasts

pub mod pipeline;
pub mod reporter;

pub use pipeline::{select_forecast, LoopState, StepOutcome, TrainPredictLoop};
pub use reporter::{ConsoleReporter, MemoryReporter, Reporter};
