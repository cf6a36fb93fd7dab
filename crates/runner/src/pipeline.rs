//! The retrain-every-cycle forecasting loop.
//!
//! Each cycle snapshots the tick buffer, rebuilds and normalizes the
//! feature matrix from scratch, fits the classifier on every labeled row
//! and predicts the pending row. Nothing but the buffer survives a cycle.

use crate::reporter::Reporter;
use chrono::Utc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;
use tickcast_core::{Config, Error, Forecast, Label, Result};
use tickcast_features::{FeatureBuilder, Normalizer};
use tickcast_ingestion::TickBuffer;
use tickcast_model::{Classifier, NUM_CLASSES};
use tracing::{debug, error, info, warn};

/// Where the loop is in its cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoopState {
    /// Fewer than `start_limit` prices buffered.
    Waiting,
    /// Ready to run a cycle.
    Ready,
    /// Handing a forecast to the reporter.
    Reporting,
}

/// What one step of the loop did.
#[derive(Debug)]
pub enum StepOutcome {
    /// Still waiting; `remaining` more prices needed.
    Waiting { remaining: usize },
    /// A forecast was reported.
    Reported(Forecast),
    /// The cycle failed and was skipped.
    Skipped(Error),
}

/// Drives wait → build → normalize → fit → predict → report.
pub struct TrainPredictLoop<C, R> {
    buffer: Arc<TickBuffer>,
    classifier: C,
    reporter: R,
    builder: FeatureBuilder,
    normalizer: Normalizer,
    start_limit: usize,
    cycle_interval: Duration,
    waiting_poll: Duration,
    state: LoopState,
    completed: u64,
    skipped: u64,
}

impl<C: Classifier, R: Reporter> TrainPredictLoop<C, R> {
    /// Create a loop reading from `buffer`.
    pub fn new(buffer: Arc<TickBuffer>, classifier: C, reporter: R, config: &Config) -> Self {
        Self {
            buffer,
            classifier,
            reporter,
            builder: FeatureBuilder::from_config(&config.features),
            normalizer: Normalizer::new(),
            start_limit: config.buffer.start_limit,
            cycle_interval: config.schedule.cycle_interval(),
            waiting_poll: config.schedule.waiting_poll(),
            state: LoopState::Waiting,
            completed: 0,
            skipped: 0,
        }
    }

    /// Current state.
    pub fn state(&self) -> LoopState {
        self.state
    }

    /// The output sink.
    pub fn reporter(&self) -> &R {
        &self.reporter
    }

    /// Cycles that produced a forecast.
    pub fn completed_cycles(&self) -> u64 {
        self.completed
    }

    /// Cycles skipped because of an error.
    pub fn skipped_cycles(&self) -> u64 {
        self.skipped
    }

    /// Run one Ready pass: snapshot, features, fit, predict.
    pub fn run_cycle(&mut self) -> Result<Forecast> {
        let prices = self.buffer.snapshot();
        let dataset = self.builder.build(&prices)?;
        let normalized = self.normalizer.normalize(&dataset.to_matrix())?;

        let (train, test) = normalized.split_last();
        let labels = dataset.label_values();
        debug!(
            "Cycle on {} prices: {} training rows, {} pending",
            prices.len(),
            train.len(),
            test.len()
        );

        self.classifier.fit(train, &labels)?;
        let predicted = self.classifier.predict(test)?;
        let proba = self.classifier.predict_proba(test)?;

        select_forecast(&predicted, &proba, train.len())
    }

    /// Advance the state machine by one step, sleeping as configured.
    pub fn tick(&mut self) -> StepOutcome {
        if self.state == LoopState::Waiting {
            let len = self.buffer.len();
            if len < self.start_limit {
                let remaining = self.start_limit - len;
                self.reporter.waiting(remaining);
                thread::sleep(self.waiting_poll);
                return StepOutcome::Waiting { remaining };
            }
            info!("{} prices buffered, starting {} cycles", len, self.classifier.name());
            self.state = LoopState::Ready;
        }

        let outcome = match self.run_cycle() {
            Ok(forecast) => {
                self.state = LoopState::Reporting;
                self.reporter.forecast(&forecast);
                self.completed += 1;
                StepOutcome::Reported(forecast)
            }
            Err(e) => {
                if e.is_cycle_recoverable() {
                    warn!("Skipping cycle: {}", e);
                } else {
                    error!("Skipping cycle: {}", e);
                }
                self.skipped += 1;
                StepOutcome::Skipped(e)
            }
        };

        self.state = LoopState::Ready;
        thread::sleep(self.cycle_interval);
        outcome
    }

    /// Step until `keep_going` rejects an outcome. Returns the step count.
    pub fn run_while(&mut self, mut keep_going: impl FnMut(&StepOutcome) -> bool) -> usize {
        let mut steps = 0;
        loop {
            let outcome = self.tick();
            steps += 1;
            if !keep_going(&outcome) {
                return steps;
            }
        }
    }

    /// Run until the process ends.
    pub fn run(&mut self) -> ! {
        loop {
            self.tick();
        }
    }
}

/// Pick the reported probability from the first prediction row.
///
/// An `Up` prediction reports `proba[0]` as a Long; anything else reports
/// `proba[1]` as a Short.
pub fn select_forecast(predicted: &[f64], proba: &[Vec<f64>], training_rows: usize) -> Result<Forecast> {
    let value = *predicted
        .first()
        .ok_or_else(|| Error::prediction("classifier returned no prediction"))?;
    let row = proba
        .first()
        .ok_or_else(|| Error::prediction("classifier returned no probabilities"))?;
    if row.len() != NUM_CLASSES {
        return Err(Error::prediction(format!(
            "probability row has {} entries, expected {}",
            row.len(),
            NUM_CLASSES
        )));
    }

    let label = Label::from_prediction(value);
    Ok(Forecast {
        direction: label.into(),
        probability: row[label.index()],
        training_rows,
        as_of: Utc::now(),
    })
}
