//! RBF-kernel support vector classifier.
//!
//! Trained with SMO using second-order working set selection. Probability
//! estimates come from a Platt sigmoid fitted to the training decision
//! values.

use crate::classifier::{check_prediction_input, check_training_set, proba_row, Classifier};
use statrs::statistics::Statistics;
use tickcast_core::config::ClassifierConfig;
use tickcast_core::{Error, Result};
use tracing::{debug, warn};

/// Floor for non-positive curvature in SMO steps.
const TAU: f64 = 1e-12;

/// RBF kernel `exp(-gamma * |a - b|^2)`.
#[inline]
fn rbf(a: &[f64], b: &[f64], gamma: f64) -> f64 {
    let sq: f64 = a.iter().zip(b).map(|(x, y)| (x - y) * (x - y)).sum();
    (-gamma * sq).exp()
}

/// Fitted model state.
#[derive(Debug, Clone)]
enum Fitted {
    /// Training set contained a single class.
    Constant { positive: bool, width: usize },
    Kernel(KernelModel),
}

#[derive(Debug, Clone)]
struct KernelModel {
    support: Vec<Vec<f64>>,
    /// `alpha_i * y_i` for each support vector.
    coef: Vec<f64>,
    rho: f64,
    gamma: f64,
    width: usize,
    platt: PlattScale,
}

impl KernelModel {
    fn decision(&self, x: &[f64]) -> f64 {
        let sum: f64 = self
            .support
            .iter()
            .zip(&self.coef)
            .map(|(sv, c)| c * rbf(sv, x, self.gamma))
            .sum();
        sum - self.rho
    }
}

/// Support vector classifier with a Gaussian kernel.
#[derive(Debug, Clone)]
pub struct RbfSvc {
    c: f64,
    gamma: Option<f64>,
    tolerance: f64,
    max_passes: usize,
    fitted: Option<Fitted>,
}

impl RbfSvc {
    /// Create an unfitted classifier. `gamma = None` picks
    /// `1 / (n_features * var(X))` at fit time.
    pub fn new(c: f64, gamma: Option<f64>) -> Self {
        Self {
            c,
            gamma,
            tolerance: 1e-3,
            max_passes: 10_000,
            fitted: None,
        }
    }

    /// Create from configuration.
    pub fn from_config(config: &ClassifierConfig) -> Self {
        Self {
            c: config.c,
            gamma: config.gamma,
            tolerance: config.tolerance,
            max_passes: config.max_passes,
            fitted: None,
        }
    }

    /// Signed distance to the separating surface; positive means label 1.
    pub fn decision_function(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        match self.fitted()? {
            Fitted::Constant { positive, width } => {
                check_prediction_input(features, *width)?;
                let value = if *positive { 1.0 } else { -1.0 };
                Ok(vec![value; features.len()])
            }
            Fitted::Kernel(model) => {
                check_prediction_input(features, model.width)?;
                Ok(features.iter().map(|x| model.decision(x)).collect())
            }
        }
    }

    /// Number of support vectors, zero for a single-class fit.
    pub fn support_vector_count(&self) -> usize {
        match &self.fitted {
            Some(Fitted::Kernel(model)) => model.support.len(),
            _ => 0,
        }
    }

    fn fitted(&self) -> Result<&Fitted> {
        self.fitted
            .as_ref()
            .ok_or_else(|| Error::prediction("classifier has not been fitted"))
    }

    fn resolve_gamma(&self, features: &[Vec<f64>], width: usize) -> f64 {
        if let Some(gamma) = self.gamma {
            return gamma;
        }
        let variance = features.iter().flatten().population_variance();
        if variance > 0.0 && variance.is_finite() {
            1.0 / (width as f64 * variance)
        } else {
            1.0
        }
    }

    /// Solve the dual problem. Returns (alpha, rho).
    fn solve(&self, kernel: &[Vec<f64>], y: &[f64]) -> (Vec<f64>, f64) {
        let n = y.len();
        let c = self.c;
        let mut alpha = vec![0.0; n];
        // Gradient of the dual objective, Q·alpha - e.
        let mut grad = vec![-1.0; n];

        let at_upper = |a: f64| a >= c;
        let at_lower = |a: f64| a <= 0.0;

        let mut iterations = 0;
        loop {
            if iterations >= self.max_passes {
                warn!("SMO stopped after {} iterations without converging", iterations);
                break;
            }

            // Maximal violating index i.
            let mut g_max = f64::NEG_INFINITY;
            let mut i_sel = None;
            for t in 0..n {
                let candidate = if y[t] > 0.0 {
                    (!at_upper(alpha[t])).then_some(-grad[t])
                } else {
                    (!at_lower(alpha[t])).then_some(grad[t])
                };
                if let Some(v) = candidate {
                    if v >= g_max {
                        g_max = v;
                        i_sel = Some(t);
                    }
                }
            }
            let Some(i) = i_sel else { break };

            // Second index by second-order gain.
            let mut g_max2 = f64::NEG_INFINITY;
            let mut j_sel = None;
            let mut best_obj = f64::INFINITY;
            for t in 0..n {
                let candidate = if y[t] > 0.0 {
                    (!at_lower(alpha[t])).then_some(grad[t])
                } else {
                    (!at_upper(alpha[t])).then_some(-grad[t])
                };
                let Some(v) = candidate else { continue };
                g_max2 = g_max2.max(v);

                let grad_diff = g_max + v;
                if grad_diff > 0.0 {
                    let quad = kernel[i][i] + kernel[t][t] - 2.0 * kernel[i][t];
                    let obj = -(grad_diff * grad_diff) / if quad > 0.0 { quad } else { TAU };
                    if obj <= best_obj {
                        best_obj = obj;
                        j_sel = Some(t);
                    }
                }
            }

            if g_max + g_max2 < self.tolerance {
                break;
            }
            let Some(j) = j_sel else { break };
            iterations += 1;

            let (old_i, old_j) = (alpha[i], alpha[j]);
            let q_ij = y[i] * y[j] * kernel[i][j];

            if y[i] != y[j] {
                let quad = kernel[i][i] + kernel[j][j] + 2.0 * q_ij;
                let quad = if quad > 0.0 { quad } else { TAU };
                let delta = (-grad[i] - grad[j]) / quad;
                let diff = alpha[i] - alpha[j];
                alpha[i] += delta;
                alpha[j] += delta;
                if diff > 0.0 {
                    if alpha[j] < 0.0 {
                        alpha[j] = 0.0;
                        alpha[i] = diff;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = -diff;
                }
                if diff > 0.0 {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = c - diff;
                    }
                } else if alpha[j] > c {
                    alpha[j] = c;
                    alpha[i] = c + diff;
                }
            } else {
                let quad = kernel[i][i] + kernel[j][j] - 2.0 * q_ij;
                let quad = if quad > 0.0 { quad } else { TAU };
                let delta = (grad[i] - grad[j]) / quad;
                let sum = alpha[i] + alpha[j];
                alpha[i] -= delta;
                alpha[j] += delta;
                if sum > c {
                    if alpha[i] > c {
                        alpha[i] = c;
                        alpha[j] = sum - c;
                    }
                } else if alpha[j] < 0.0 {
                    alpha[j] = 0.0;
                    alpha[i] = sum;
                }
                if sum > c {
                    if alpha[j] > c {
                        alpha[j] = c;
                        alpha[i] = sum - c;
                    }
                } else if alpha[i] < 0.0 {
                    alpha[i] = 0.0;
                    alpha[j] = sum;
                }
            }

            let d_i = alpha[i] - old_i;
            let d_j = alpha[j] - old_j;
            for k in 0..n {
                grad[k] += y[i] * y[k] * kernel[i][k] * d_i + y[j] * y[k] * kernel[j][k] * d_j;
            }
        }

        debug!("SMO finished after {} iterations", iterations);
        let rho = Self::rho(&alpha, &grad, y, c);
        (alpha, rho)
    }

    /// Offset from the KKT conditions.
    fn rho(alpha: &[f64], grad: &[f64], y: &[f64], c: f64) -> f64 {
        let mut upper = f64::INFINITY;
        let mut lower = f64::NEG_INFINITY;
        let mut free_sum = 0.0;
        let mut free_count = 0usize;

        for t in 0..alpha.len() {
            let yg = y[t] * grad[t];
            if alpha[t] >= c {
                if y[t] < 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else if alpha[t] <= 0.0 {
                if y[t] > 0.0 {
                    upper = upper.min(yg);
                } else {
                    lower = lower.max(yg);
                }
            } else {
                free_count += 1;
                free_sum += yg;
            }
        }

        if free_count > 0 {
            free_sum / free_count as f64
        } else {
            (upper + lower) / 2.0
        }
    }
}

impl Default for RbfSvc {
    fn default() -> Self {
        Self::new(1.0, None)
    }
}

impl Classifier for RbfSvc {
    fn name(&self) -> &'static str {
        "rbf-svc"
    }

    fn fit(&mut self, features: &[Vec<f64>], labels: &[f64]) -> Result<()> {
        self.fitted = None;
        let (classes, width) = check_training_set(features, labels)?;

        let positives = classes.iter().filter(|&&p| p).count();
        if positives == 0 || positives == classes.len() {
            debug!("Single-class training set of {} rows", classes.len());
            self.fitted = Some(Fitted::Constant {
                positive: positives > 0,
                width,
            });
            return Ok(());
        }

        let gamma = self.resolve_gamma(features, width);
        let y: Vec<f64> = classes.iter().map(|&p| if p { 1.0 } else { -1.0 }).collect();
        let kernel: Vec<Vec<f64>> = features
            .iter()
            .map(|a| features.iter().map(|b| rbf(a, b, gamma)).collect())
            .collect();

        let (alpha, rho) = self.solve(&kernel, &y);
        if !rho.is_finite() {
            return Err(Error::training("SVM offset is not finite"));
        }

        // Training decision values for the Platt fit, from the kernel cache.
        let decisions: Vec<f64> = (0..y.len())
            .map(|i| {
                (0..y.len())
                    .filter(|&k| alpha[k] > 0.0)
                    .map(|k| alpha[k] * y[k] * kernel[k][i])
                    .sum::<f64>()
                    - rho
            })
            .collect();
        let platt = PlattScale::fit(&decisions, &classes);

        let mut support = Vec::new();
        let mut coef = Vec::new();
        for (k, &a) in alpha.iter().enumerate() {
            if a > 0.0 {
                support.push(features[k].clone());
                coef.push(a * y[k]);
            }
        }
        debug!(
            "Fitted RBF SVC: {} support vectors of {} rows, gamma {:.4}",
            support.len(),
            y.len(),
            gamma
        );

        self.fitted = Some(Fitted::Kernel(KernelModel {
            support,
            coef,
            rho,
            gamma,
            width,
            platt,
        }));
        Ok(())
    }

    fn predict(&self, features: &[Vec<f64>]) -> Result<Vec<f64>> {
        Ok(self
            .decision_function(features)?
            .into_iter()
            .map(|d| if d > 0.0 { 1.0 } else { 0.0 })
            .collect())
    }

    fn predict_proba(&self, features: &[Vec<f64>]) -> Result<Vec<Vec<f64>>> {
        match self.fitted()? {
            Fitted::Constant { positive, width } => {
                check_prediction_input(features, *width)?;
                let p_one = if *positive { 1.0 } else { 0.0 };
                Ok(vec![proba_row(p_one); features.len()])
            }
            Fitted::Kernel(model) => {
                check_prediction_input(features, model.width)?;
                Ok(features
                    .iter()
                    .map(|x| proba_row(model.platt.probability(model.decision(x))))
                    .collect())
            }
        }
    }
}

/// Platt sigmoid `P(1 | f) = 1 / (1 + exp(a·f + b))`.
#[derive(Debug, Clone, Copy)]
struct PlattScale {
    a: f64,
    b: f64,
}

impl PlattScale {
    const MAX_ITER: usize = 100;
    const MIN_STEP: f64 = 1e-10;
    const SIGMA: f64 = 1e-12;
    const EPS: f64 = 1e-5;

    /// Newton fit with backtracking line search on smoothed targets.
    fn fit(decisions: &[f64], classes: &[bool]) -> Self {
        let prior1 = classes.iter().filter(|&&p| p).count() as f64;
        let prior0 = classes.len() as f64 - prior1;
        let hi = (prior1 + 1.0) / (prior1 + 2.0);
        let lo = 1.0 / (prior0 + 2.0);
        let targets: Vec<f64> = classes.iter().map(|&p| if p { hi } else { lo }).collect();

        let objective = |a: f64, b: f64| -> f64 {
            decisions
                .iter()
                .zip(&targets)
                .map(|(&f, &t)| {
                    let z = f * a + b;
                    if z >= 0.0 {
                        t * z + (-z).exp().ln_1p()
                    } else {
                        (t - 1.0) * z + z.exp().ln_1p()
                    }
                })
                .sum()
        };

        let mut a = 0.0;
        let mut b = ((prior0 + 1.0) / (prior1 + 1.0)).ln();
        let mut fval = objective(a, b);

        for _ in 0..Self::MAX_ITER {
            let (mut h11, mut h22, mut h21) = (Self::SIGMA, Self::SIGMA, 0.0);
            let (mut g1, mut g2) = (0.0, 0.0);
            for (&f, &t) in decisions.iter().zip(&targets) {
                let z = f * a + b;
                let (p, q) = if z >= 0.0 {
                    let e = (-z).exp();
                    (e / (1.0 + e), 1.0 / (1.0 + e))
                } else {
                    let e = z.exp();
                    (1.0 / (1.0 + e), e / (1.0 + e))
                };
                let d2 = p * q;
                h11 += f * f * d2;
                h22 += d2;
                h21 += f * d2;
                let d1 = t - p;
                g1 += f * d1;
                g2 += d1;
            }

            if g1.abs() < Self::EPS && g2.abs() < Self::EPS {
                break;
            }

            let det = h11 * h22 - h21 * h21;
            let da = -(h22 * g1 - h21 * g2) / det;
            let db = -(-h21 * g1 + h11 * g2) / det;
            let gd = g1 * da + g2 * db;

            let mut step = 1.0;
            while step >= Self::MIN_STEP {
                let (na, nb) = (a + step * da, b + step * db);
                let nf = objective(na, nb);
                if nf < fval + 1e-4 * step * gd {
                    a = na;
                    b = nb;
                    fval = nf;
                    break;
                }
                step /= 2.0;
            }
            if step < Self::MIN_STEP {
                debug!("Platt line search stalled");
                break;
            }
        }

        Self { a, b }
    }

    /// Probability of label 1 for a decision value.
    fn probability(&self, decision: f64) -> f64 {
        let z = decision * self.a + self.b;
        if z >= 0.0 {
            let e = (-z).exp();
            e / (1.0 + e)
        } else {
            1.0 / (1.0 + z.exp())
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    /// Two well separated blobs; label 1 sits at positive coordinates.
    fn blobs() -> (Vec<Vec<f64>>, Vec<f64>) {
        let mut x = Vec::new();
        let mut y = Vec::new();
        for i in 0..20 {
            let jitter = (i as f64 * 0.37).sin() * 0.3;
            x.push(vec![-2.0 + jitter, -2.0 - jitter]);
            y.push(0.0);
            x.push(vec![2.0 - jitter, 2.0 + jitter]);
            y.push(1.0);
        }
        (x, y)
    }

    #[test]
    fn test_rbf_kernel() {
        assert_relative_eq!(rbf(&[1.0, 2.0], &[1.0, 2.0], 0.5), 1.0);
        assert_relative_eq!(rbf(&[0.0], &[2.0], 0.5), (-2.0_f64).exp());
    }

    #[test]
    fn test_separable_blobs() {
        let (x, y) = blobs();
        let mut svc = RbfSvc::default();
        svc.fit(&x, &y).unwrap();

        assert_eq!(svc.predict(&x).unwrap(), y);
        assert!(svc.support_vector_count() > 0);

        let probe = vec![vec![-2.0, -2.0], vec![2.0, 2.0]];
        assert_eq!(svc.predict(&probe).unwrap(), vec![0.0, 1.0]);
    }

    #[test]
    fn test_probabilities_follow_classes() {
        let (x, y) = blobs();
        let mut svc = RbfSvc::default();
        svc.fit(&x, &y).unwrap();

        let proba = svc.predict_proba(&[vec![-2.0, -2.0], vec![2.0, 2.0]]).unwrap();
        for row in &proba {
            assert_eq!(row.len(), 2);
            assert_relative_eq!(row[0] + row[1], 1.0, epsilon = 1e-12);
            assert!(row.iter().all(|p| (0.0..=1.0).contains(p)));
        }
        assert!(proba[0][0] > 0.5);
        assert!(proba[1][1] > 0.5);
    }

    #[test]
    fn test_single_class() {
        let x = vec![vec![0.0, 1.0], vec![1.0, 2.0], vec![2.0, 3.0]];
        let mut svc = RbfSvc::default();
        svc.fit(&x, &[0.0, 0.0, 0.0]).unwrap();

        assert_eq!(svc.predict(&[vec![5.0, 5.0]]).unwrap(), vec![0.0]);
        assert_eq!(svc.predict_proba(&[vec![5.0, 5.0]]).unwrap(), vec![vec![1.0, 0.0]]);
    }

    #[test]
    fn test_unfitted_predict_fails() {
        let svc = RbfSvc::default();
        assert!(matches!(svc.predict(&[vec![1.0]]), Err(Error::Prediction(_))));
    }

    #[test]
    fn test_refit_replaces_state() {
        let (x, y) = blobs();
        let mut svc = RbfSvc::default();
        svc.fit(&x, &y).unwrap();

        assert!(svc.fit(&x, &y[1..]).is_err());
        assert!(matches!(svc.predict(&x), Err(Error::Prediction(_))));
    }

    #[test]
    fn test_xor_needs_kernel() {
        let x = vec![
            vec![0.0, 0.0],
            vec![1.0, 1.0],
            vec![0.0, 1.0],
            vec![1.0, 0.0],
        ];
        let y = vec![0.0, 0.0, 1.0, 1.0];
        let mut svc = RbfSvc::new(100.0, Some(2.0));
        svc.fit(&x, &y).unwrap();

        assert_eq!(svc.predict(&x).unwrap(), y);
    }
}
