//! The classifier capability used by the train/predict loop.
//!
//! Implementations are re-fitted from scratch on every call to `fit`.
//! Labels are `0.0` (up) and `1.0` (down); probability rows have one
//! column per label in that order.

use crate::logistic::LogisticClassifier;
use crate::svm::RbfSvc;
use tickcast_core::config::{ClassifierConfig, ClassifierKind};
use tickcast_core::{Error, Result};

/// Number of classes every classifier reports.
pub const NUM_CLASSES: usize = 2;

/// Binary classifier with probability estimates.
pub trait Classifier: Send {
    /// Short identifier for logs.
    fn name(&self) -> &'static str;

    /// Fit on `features` (one row per sample) and `labels`.
    fn fit(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<()>;

    /// One label per input row.
    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>>;

    /// One probability row of width [`NUM_CLASSES`] per input row.
    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>>;
}

impl<C: Classifier + ?Sized> Classifier for Box<C> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn fit(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<()> {
        (**self).fit(features, labels)
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        (**self).predict(features)
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        (**self).predict_proba(features)
    }
}

/// Build the classifier selected in the configuration.
pub fn build_classifier(config: &ClassifierConfig) -> Box<dyn Classifier> {
    match config.kind {
        ClassifierKind::Svm => Box::new(RbfSvc::from_config(config)),
        ClassifierKind::Logistic => Box::new(LogisticClassifier::from_config(config)),
    }
}

/// Check a training set and return the class of each label
/// (`false` for 0, `true` for 1) and the feature width.
pub(crate) fn check_training_set(features: &[Vec<f64>], labels: &[f64]) -> Result<(Vec<bool>, usize)> {
    if features.is_empty() {
        return Err(Error::training("empty training set"));
    }
    if features.len() != labels.len() {
        return Err(Error::training(format!(
            "{} feature rows but {} labels",
            features.len(),
            labels.len()
        )));
    }

    let width = features[0].len();
    if width == 0 {
        return Err(Error::training("feature rows have no columns"));
    }
    for (i, row) in features.iter().enumerate() {
        if row.len() != width {
            return Err(Error::training(format!(
                "row {} has {} columns, expected {}",
                i,
                row.len(),
                width
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::training(format!("row {} has non-finite values", i)));
        }
    }

    let classes = labels
        .iter()
        .enumerate()
        .map(|(i, &y)| {
            if y == 0.0 {
                Ok(false)
            } else if y == 1.0 {
                Ok(true)
            } else {
                Err(Error::training(format!("label {} at row {} is not 0 or 1", y, i)))
            }
        })
        .collect::<Result<Vec<_>>>()?;

    Ok((classes, width))
}

/// Check prediction input against the fitted feature width.
pub(crate) fn check_prediction_input(features: &[Vec<f64>], width: usize) -> Result<()> {
    for (i, row) in features.iter().enumerate() {
        if row.len() != width {
            return Err(Error::prediction(format!(
                "row {} has {} columns, model was fitted on {}",
                i,
                row.len(),
                width
            )));
        }
        if row.iter().any(|v| !v.is_finite()) {
            return Err(Error::prediction(format!("row {} has non-finite values", i)));
        }
    }
    Ok(())
}

/// Probability row `[P(0), P(1)]` from `P(1)`.
#[inline]
pub(crate) fn proba_row(p_one: f64) -> Vec<f64> {
    vec![1.0 - p_one, p_one]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_training_set() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 0.0]];
        let (classes, width) = check_training_set(&x, &[0.0, 1.0]).unwrap();
        assert_eq!(classes, vec![false, true]);
        assert_eq!(width, 2);
    }

    #[test]
    fn test_length_mismatch_rejected() {
        let x = vec![vec![0.0], vec![1.0]];
        assert!(matches!(check_training_set(&x, &[0.0]), Err(Error::Training(_))));
    }

    #[test]
    fn test_bad_labels_rejected() {
        let x = vec![vec![0.0], vec![1.0]];
        assert!(matches!(check_training_set(&x, &[0.0, 2.0]), Err(Error::Training(_))));
    }

    #[test]
    fn test_ragged_and_non_finite_rejected() {
        assert!(check_training_set(&[vec![0.0], vec![1.0, 2.0]], &[0.0, 1.0]).is_err());
        assert!(check_training_set(&[vec![f64::NAN], vec![1.0]], &[0.0, 1.0]).is_err());
        assert!(check_training_set(&[], &[]).is_err());
    }

    #[test]
    fn test_prediction_width_checked() {
        assert!(check_prediction_input(&[vec![1.0, 2.0]], 2).is_ok());
        assert!(matches!(
            check_prediction_input(&[vec![1.0]], 2),
            Err(Error::Prediction(_))
        ));
    }

    #[test]
    fn test_factory_selects_kind() {
        let mut config = ClassifierConfig::default();
        assert_eq!(build_classifier(&config).name(), "rbf-svc");
        config.kind = ClassifierKind::Logistic;
        assert_eq!(build_classifier(&config).name(), "logistic");
    }
}
