//! Classifiers for the tickcast train/predict loop.
//!
//! This crate provides:
//! - The `Classifier` capability (fit / predict / predict_proba)
//! - RBF-kernel support vector classifier with Platt probabilities
//! - Logistic regression

pub mod classifier;
pub mod svm;
pub mod logistic;

pub use classifier::{build_classifier, Classifier, NUM_CLASSES};
pub use svm::RbfSvc;
pub use logistic::LogisticClassifier;
