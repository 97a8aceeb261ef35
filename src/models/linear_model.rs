use ndarray::Array1;
use serde_json::{json, Value};

use crate::optim::losses::{sigmoid, Loss};
use crate::traits::estimator::{
    check_dimension, expose_roles, Capability, Classifier, Estimator, EstimatorError, Label, Proba,
    Regressor,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

/// Weights updated by stochastic gradient descent on a pluggable loss.
#[derive(Debug, Clone)]
struct Sgd {
    /// Learning rate for the weights
    lr: f64,
    /// Learning rate for the intercept
    intercept_lr: f64,
    /// L2 penalty applied to the weights
    l2: f64,
    loss: Loss,
    /// Set on the first example
    weights: Option<Array1<f64>>,
    intercept: f64,
}

impl Sgd {
    fn new(lr: f64, intercept_lr: f64, l2: f64, loss: Loss) -> Self {
        Self {
            lr,
            intercept_lr,
            l2,
            loss,
            weights: None,
            intercept: 0.0,
        }
    }

    /// `w . x + b`; only the intercept before any learning
    fn raw(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        let dim = self.weights.as_ref().map(|w| w.len());
        check_dimension(dim, x, "Feature dimension doesn't match model weights")?;
        Ok(match &self.weights {
            Some(weights) => weights.dot(x.as_array()) + self.intercept,
            None => self.intercept,
        })
    }

    /// One gradient step; `link` maps the raw score to the prediction fed to the loss.
    fn step(&mut self, x: &FeatureVector, y: f64, link: fn(f64) -> f64) -> Result<(), EstimatorError> {
        let y_pred = link(self.raw(x)?);
        let gradient = self.loss.gradient(y, y_pred);

        let weights = self
            .weights
            .get_or_insert_with(|| Array1::zeros(x.dimension()));
        let update = x.as_array() * gradient + &*weights * self.l2;
        weights.scaled_add(-self.lr, &update);
        self.intercept -= self.intercept_lr * gradient;
        Ok(())
    }

    fn params(&self) -> Value {
        json!({
            "lr": self.lr,
            "intercept_lr": self.intercept_lr,
            "l2": self.l2,
            "loss": self.loss,
        })
    }
}

fn identity(z: f64) -> f64 {
    z
}

/// Linear regression trained online with SGD
#[derive(Debug, Clone)]
pub struct LinearRegression {
    sgd: Sgd,
}

impl LinearRegression {
    pub fn new(lr: f64, intercept_lr: f64, l2: f64, loss: Loss) -> Self {
        Self { sgd: Sgd::new(lr, intercept_lr, l2, loss) }
    }

    pub fn with_intercept_lr(mut self, intercept_lr: f64) -> Self {
        self.sgd.intercept_lr = intercept_lr;
        self
    }

    pub fn weights(&self) -> Option<&Array1<f64>> {
        self.sgd.weights.as_ref()
    }

    pub fn intercept(&self) -> f64 {
        self.sgd.intercept
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new(0.01, 0.01, 0.0, Loss::Squared)
    }
}

impl Regressor for LinearRegression {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        self.sgd.step(x, y, identity)
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        self.sgd.raw(x)
    }
}

impl Estimator for LinearRegression {
    fn name(&self) -> String {
        "LinearRegression".to_string()
    }

    fn params(&self) -> Value {
        self.sgd.params()
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Regressor);
}

/// Linear regression with an L2 penalty; a specialization of [`LinearRegression`].
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    inner: LinearRegression,
}

impl RidgeRegression {
    pub fn new(alpha: f64) -> Self {
        Self { inner: LinearRegression::new(0.01, 0.01, alpha, Loss::Squared) }
    }

    pub fn with_intercept_lr(self, intercept_lr: f64) -> Self {
        Self { inner: self.inner.with_intercept_lr(intercept_lr) }
    }
}

impl Default for RidgeRegression {
    fn default() -> Self {
        Self::new(0.1)
    }
}

impl Regressor for RidgeRegression {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        self.inner.learn_one(x, y)
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        self.inner.predict_one(x)
    }
}

impl Estimator for RidgeRegression {
    fn name(&self) -> String {
        "RidgeRegression".to_string()
    }

    fn params(&self) -> Value {
        json!({ "alpha": self.inner.sgd.l2, "intercept_lr": self.inner.sgd.intercept_lr })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Regressor);
}

/// Binary logistic regression trained online with SGD on the log loss
#[derive(Debug, Clone)]
pub struct LogisticRegression {
    sgd: Sgd,
}

impl LogisticRegression {
    pub fn new(lr: f64, l2: f64) -> Self {
        Self { sgd: Sgd::new(lr, lr, l2, Loss::Log) }
    }
}

impl Default for LogisticRegression {
    fn default() -> Self {
        Self::new(0.01, 0.0)
    }
}

impl Classifier for LogisticRegression {
    fn learn_one(&mut self, x: &FeatureVector, y: Label) -> Result<(), EstimatorError> {
        let target = if y != 0 { 1.0 } else { 0.0 };
        self.sgd.step(x, target, sigmoid)
    }

    fn predict_proba_one(&self, x: &FeatureVector) -> Result<Proba, EstimatorError> {
        let p = sigmoid(self.sgd.raw(x)?);
        Ok(Proba::from([(0, 1.0 - p), (1, p)]))
    }
}

impl Estimator for LogisticRegression {
    fn name(&self) -> String {
        "LogisticRegression".to_string()
    }

    fn params(&self) -> Value {
        self.sgd.params()
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Classifier);
}

/// Passive-aggressive update rule (PA-I)
#[derive(Debug, Clone)]
struct PassiveAggressive {
    c: f64,
    weights: Option<Array1<f64>>,
}

impl PassiveAggressive {
    fn new(c: f64) -> Self {
        Self { c, weights: None }
    }

    fn score(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        let dim = self.weights.as_ref().map(|w| w.len());
        check_dimension(dim, x, "Feature dimension doesn't match model weights")?;
        Ok(self.weights.as_ref().map_or(0.0, |w| w.dot(x.as_array())))
    }

    /// Moves the weights by `direction * tau * x` where `tau` is the capped step.
    fn update(&mut self, x: &FeatureVector, loss: f64, direction: f64) {
        let weights = self
            .weights
            .get_or_insert_with(|| Array1::zeros(x.dimension()));
        let norm = x.as_array().dot(x.as_array());
        if loss <= 0.0 || norm == 0.0 {
            return;
        }
        let tau = self.c.min(loss / norm);
        weights.scaled_add(direction * tau, x.as_array());
    }
}

/// Passive-aggressive regressor with an epsilon-insensitive loss
#[derive(Debug, Clone)]
pub struct PARegressor {
    pa: PassiveAggressive,
    eps: f64,
}

impl PARegressor {
    pub fn new(c: f64, eps: f64) -> Self {
        Self { pa: PassiveAggressive::new(c), eps }
    }
}

impl Default for PARegressor {
    fn default() -> Self {
        Self::new(1.0, 0.1)
    }
}

impl Regressor for PARegressor {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        let residual = y - self.pa.score(x)?;
        let loss = (residual.abs() - self.eps).max(0.0);
        self.pa.update(x, loss, residual.signum());
        Ok(())
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        self.pa.score(x)
    }
}

impl Estimator for PARegressor {
    fn name(&self) -> String {
        "PARegressor".to_string()
    }

    fn params(&self) -> Value {
        json!({ "C": self.pa.c, "eps": self.eps })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Regressor);
}

/// Passive-aggressive binary classifier with a hinge loss
#[derive(Debug, Clone)]
pub struct PAClassifier {
    pa: PassiveAggressive,
}

impl PAClassifier {
    pub fn new(c: f64) -> Self {
        Self { pa: PassiveAggressive::new(c) }
    }
}

impl Default for PAClassifier {
    fn default() -> Self {
        Self::new(1.0)
    }
}

impl Classifier for PAClassifier {
    fn learn_one(&mut self, x: &FeatureVector, y: Label) -> Result<(), EstimatorError> {
        let sign = if y != 0 { 1.0 } else { -1.0 };
        let loss = (1.0 - sign * self.pa.score(x)?).max(0.0);
        self.pa.update(x, loss, sign);
        Ok(())
    }

    fn predict_proba_one(&self, x: &FeatureVector) -> Result<Proba, EstimatorError> {
        let p = sigmoid(self.pa.score(x)?);
        Ok(Proba::from([(0, 1.0 - p), (1, p)]))
    }
}

impl Estimator for PAClassifier {
    fn name(&self) -> String {
        "PAClassifier".to_string()
    }

    fn params(&self) -> Value {
        json!({ "C": self.pa.c })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Classifier);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![
        EstimatorType::new(
            "linear_model",
            "LinearRegression",
            &[Capability::Regressor],
            &[Family::LinearRegression],
            Constructor::WithInterceptLr(|intercept_lr| {
                boxed(LinearRegression::default().with_intercept_lr(intercept_lr))
            }),
        ),
        EstimatorType::new(
            "linear_model",
            "LogisticRegression",
            &[Capability::Classifier],
            &[Family::LogisticRegression],
            Constructor::Default(|| boxed(LogisticRegression::default())),
        ),
        EstimatorType::new(
            "linear_model",
            "PAClassifier",
            &[Capability::Classifier],
            &[Family::PassiveAggressive],
            Constructor::Default(|| boxed(PAClassifier::default())),
        ),
        EstimatorType::new(
            "linear_model",
            "PARegressor",
            &[Capability::Regressor],
            &[Family::PassiveAggressive],
            Constructor::Default(|| boxed(PARegressor::default())),
        ),
        EstimatorType::new(
            "linear_model",
            "RidgeRegression",
            &[Capability::Regressor],
            &[Family::LinearRegression, Family::Ridge],
            Constructor::WithInterceptLr(|intercept_lr| {
                boxed(RidgeRegression::default().with_intercept_lr(intercept_lr))
            }),
        ),
    ]
}
