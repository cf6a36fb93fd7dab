//! Logistic regression for binary direction labels.
//!
//! Batch gradient descent on the log loss with an L2 penalty.

use crate::classifier::{check_prediction_input, check_training_set, proba_row, Classifier};
use tickcast_core::config::ClassifierConfig;
use tickcast_core::{Error, Result};
use tracing::debug;

/// Logistic regression classifier.
#[derive(Debug, Clone)]
pub struct LogisticClassifier {
    learning_rate: f64,
    max_iter: usize,
    tolerance: f64,
    /// L2 strength, `1 / C`.
    l2: f64,
    weights: Option<Vec<f64>>,
    bias: f64,
}

impl LogisticClassifier {
    pub fn new(learning_rate: f64, max_iter: usize, l2: f64) -> Self {
        Self {
            learning_rate,
            max_iter,
            tolerance: 1e-7,
            l2,
            weights: None,
            bias: 0.0,
        }
    }

    /// Create from configuration; the penalty is `1 / c`.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self::new(config.learning_rate, config.max_iter, 1.0 / config.c)
    }

    /// Numerically stable sigmoid.
    fn sigmoid(z: f64) -> f64 {
        if z >= 0.0 {
            1.0 / (1.0 + (-z).exp())
        } else {
            let e = z.exp();
            e / (1.0 + e)
        }
    }

    fn log_loss(targets: &[f64], probs: &[f64]) -> f64 {
        let eps = 1e-15;
        -targets
            .iter()
            .zip(probs)
            .map(|(&y, &p)| {
                let p = p.clamp(eps, 1.0 - eps);
                y * p.ln() + (1.0 - y) * (1.0 - p).ln()
            })
            .sum::<f64>()
            / targets.len() as f64
    }

    /// Probability of label 1 for each row.
    fn positive_proba(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        let weights = self
            .weights
            .as_ref()
            .ok_or_else(|| Error::prediction("classifier has not been fitted"))?;
        check_prediction_input(features, weights.len())?;

        Ok(features
            .iter()
            .map(|x| Self::sigmoid(dot(weights, x) + self.bias))
            .collect())
    }

    /// Fitted coefficients, if any.
    pub fn coefficients(&self) -> Option<&[f64]> {
        self.weights.as_deref()
    }
}

impl Default for LogisticClassifier {
    fn default() -> Self {
        Self::from_config(&ClassifierConfig::default())
    }
}

fn dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b).map(|(x, y)| x * y).sum()
}

impl Classifier for LogisticClassifier {
    fn name(&self) -> &'static str {
        "logistic"
    }

    fn fit(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<()> {
        self.weights = None;
        let (classes, width) = check_training_set(features, labels)?;
        let targets: Vec<f64> = classes.iter().map(|&p| if p { 1.0 } else { 0.0 }).collect();
        let n = targets.len() as f64;

        let mut weights = vec![0.0; width];
        let mut bias = 0.0;
        let mut prev_cost = f64::INFINITY;

        for iter in 0..self.max_iter {
            let probs: Vec<f64> = features
                .iter()
                .map(|x| Self::sigmoid(dot(&weights, x) + bias))
                .collect();

            let mut grad_w = vec![0.0; width];
            let mut grad_b = 0.0;
            for ((x, p), y) in features.iter().zip(&probs).zip(&targets) {
                let err = p - y;
                for (g, v) in grad_w.iter_mut().zip(x) {
                    *g += err * v;
                }
                grad_b += err;
            }

            for (w, g) in weights.iter_mut().zip(&grad_w) {
                *w -= self.learning_rate * (g / n + self.l2 * *w / n);
            }
            bias -= self.learning_rate * grad_b / n;

            let cost = Self::log_loss(&targets, &probs);
            if !cost.is_finite() {
                return Err(Error::training("log loss diverged"));
            }
            if (prev_cost - cost).abs() < self.tolerance {
                debug!("Logistic regression converged at iteration {}", iter);
                break;
            }
            prev_cost = cost;
        }

        self.weights = Some(weights);
        self.bias = bias;
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(self
            .positive_proba(features)?
            .into_iter()
            .map(|p| if p >= 0.5 { 1.0 } else { 0.0 })
            .collect())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        Ok(self
            .positive_proba(features)?
            .into_iter()
            .map(proba_row)
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_sigmoid() {
        assert_relative_eq!(LogisticClassifier::sigmoid(0.0), 0.5);
        assert!(LogisticClassifier::sigmoid(100.0) > 0.99);
        assert!(LogisticClassifier::sigmoid(-100.0) < 0.01);
    }

    #[test]
    fn test_separable_fit() {
        let x = vec![
            vec![-2.0, -1.5],
            vec![-1.5, -2.0],
            vec![-1.0, -1.0],
            vec![1.0, 1.0],
            vec![1.5, 2.0],
            vec![2.0, 1.5],
        ];
        let y = vec![0.0, 0.0, 0.0, 1.0, 1.0, 1.0];

        let mut model = LogisticClassifier::new(0.5, 2_000, 0.0);
        model.fit(&x, &y).unwrap();

        assert_eq!(model.predict(&x).unwrap(), y);
        let proba = model.predict_proba(&[vec![-2.0, -2.0]]).unwrap();
        assert!(proba[0][0] > 0.5);
        assert_relative_eq!(proba[0][0] + proba[0][1], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_l2_shrinks_coefficients() {
        let x = vec![vec![-1.0], vec![-0.5], vec![0.5], vec![1.0]];
        let y = vec![0.0, 0.0, 1.0, 1.0];

        let mut loose = LogisticClassifier::new(0.5, 2_000, 0.0);
        let mut tight = LogisticClassifier::new(0.5, 2_000, 5.0);
        loose.fit(&x, &y).unwrap();
        tight.fit(&x, &y).unwrap();

        let w_loose = loose.coefficients().unwrap()[0];
        let w_tight = tight.coefficients().unwrap()[0];
        assert!(w_tight.abs() < w_loose.abs());
    }

    #[test]
    fn test_single_class_predicts_that_class() {
        let x = vec![vec![0.0], vec![1.0], vec![2.0]];
        let mut model = LogisticClassifier::default();
        model.fit(&x, &[0.0, 0.0, 0.0]).unwrap();

        assert_eq!(model.predict(&[vec![1.5]]).unwrap(), vec![0.0]);
    }

    #[test]
    fn test_unfitted_and_mismatch() {
        let mut model = LogisticClassifier::default();
        assert!(matches!(model.predict(&[vec![1.0]]), Err(Error::Prediction(_))));
        assert!(matches!(model.fit(&[vec![1.0]], &[0.0, 1.0]), Err(Error::Training(_))));
    }
}
