use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::optim::losses::Loss;
use crate::traits::estimator::{
    describe, expose_roles, require_role, Capability, Classifier, Estimator, EstimatorError, Label,
    Proba, Regressor,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

/// Rates above this are truncated before drawing.
const MAX_POISSON_RATE: f64 = 64.0;

/// Draws from Poisson(`rate`), which is how online bagging and boosting
/// resample an example.
fn poisson(rng: &mut StdRng, rate: f64) -> usize {
    let limit = (-rate.min(MAX_POISSON_RATE)).exp();
    let mut k = 0;
    let mut p = 1.0;
    loop {
        p *= rng.random::<f64>();
        if p <= limit {
            return k;
        }
        k += 1;
    }
}

fn seeded(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_os_rng(),
    }
}

fn replicate(model: Box<dyn Estimator>, n_models: usize) -> Result<Vec<Box<dyn Estimator>>, EstimatorError> {
    if n_models == 0 {
        return Err(EstimatorError::InvalidParameter("n_models must be positive".to_string()));
    }
    Ok((0..n_models).map(|_| model.clone()).collect())
}

fn missing(role: Capability, owner: &str) -> EstimatorError {
    EstimatorError::MissingRole { role, context: owner.to_string() }
}

/// Online bagging (Oza) over copies of a regressor; predicts their mean.
#[derive(Debug, Clone)]
pub struct BaggingRegressor {
    models: Vec<Box<dyn Estimator>>,
    seed: Option<u64>,
    rng: StdRng,
}

impl BaggingRegressor {
    pub fn new(regressor: Box<dyn Estimator>, n_models: usize, seed: Option<u64>) -> Result<Self, EstimatorError> {
        require_role(regressor.as_ref(), Capability::Regressor, "BaggingRegressor")?;
        Ok(Self { models: replicate(regressor, n_models)?, seed, rng: seeded(seed) })
    }
}

impl Regressor for BaggingRegressor {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        for model in &mut self.models {
            let regressor = model
                .as_regressor_mut()
                .ok_or_else(|| missing(Capability::Regressor, "BaggingRegressor"))?;
            for _ in 0..poisson(&mut self.rng, 1.0) {
                regressor.learn_one(x, y)?;
            }
        }
        Ok(())
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        let mut total = 0.0;
        for model in &self.models {
            let regressor = model
                .as_regressor()
                .ok_or_else(|| missing(Capability::Regressor, "BaggingRegressor"))?;
            total += regressor.predict_one(x)?;
        }
        Ok(total / self.models.len() as f64)
    }
}

impl Estimator for BaggingRegressor {
    fn name(&self) -> String {
        "BaggingRegressor".to_string()
    }

    fn params(&self) -> Value {
        json!({
            "regressor": describe(self.models[0].as_ref()),
            "n_models": self.models.len(),
            "seed": self.seed,
        })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Regressor);
}

/// Online bagging over copies of a classifier; averages their probabilities.
#[derive(Debug, Clone)]
pub struct BaggingClassifier {
    models: Vec<Box<dyn Estimator>>,
    seed: Option<u64>,
    rng: StdRng,
}

impl BaggingClassifier {
    pub fn new(classifier: Box<dyn Estimator>, n_models: usize, seed: Option<u64>) -> Result<Self, EstimatorError> {
        require_role(classifier.as_ref(), Capability::Classifier, "BaggingClassifier")?;
        Ok(Self { models: replicate(classifier, n_models)?, seed, rng: seeded(seed) })
    }
}

impl Classifier for BaggingClassifier {
    fn learn_one(&mut self, x: &FeatureVector, y: Label) -> Result<(), EstimatorError> {
        for model in &mut self.models {
            let classifier = model
                .as_classifier_mut()
                .ok_or_else(|| missing(Capability::Classifier, "BaggingClassifier"))?;
            for _ in 0..poisson(&mut self.rng, 1.0) {
                classifier.learn_one(x, y)?;
            }
        }
        Ok(())
    }

    fn predict_proba_one(&self, x: &FeatureVector) -> Result<Proba, EstimatorError> {
        let mut votes = Proba::new();
        for model in &self.models {
            let classifier = model
                .as_classifier()
                .ok_or_else(|| missing(Capability::Classifier, "BaggingClassifier"))?;
            for (label, p) in classifier.predict_proba_one(x)? {
                *votes.entry(label).or_insert(0.0) += p;
            }
        }
        let total: f64 = votes.values().sum();
        if total > 0.0 {
            votes.values_mut().for_each(|p| *p /= total);
        }
        Ok(votes)
    }

    fn is_multiclass(&self) -> bool {
        self.models[0].as_classifier().is_some_and(|c| c.is_multiclass())
    }
}

impl Estimator for BaggingClassifier {
    fn name(&self) -> String {
        "BaggingClassifier".to_string()
    }

    fn params(&self) -> Value {
        json!({
            "classifier": describe(self.models[0].as_ref()),
            "n_models": self.models.len(),
            "seed": self.seed,
        })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Classifier);
}

/// Online boosting (Oza and Russell) over copies of a binary or multiclass
/// classifier.
///
/// Each example is shown to the members in turn with a Poisson weight that
/// grows after a member gets it wrong and shrinks after it gets it right.
/// Members vote with `ln((1 - e) / e)`, `e` being their weighted error rate.
#[derive(Debug, Clone)]
pub struct AdaBoostClassifier {
    models: Vec<Box<dyn Estimator>>,
    correct_weight: Vec<f64>,
    wrong_weight: Vec<f64>,
    seed: Option<u64>,
    rng: StdRng,
}

impl AdaBoostClassifier {
    pub fn new(classifier: Box<dyn Estimator>, n_models: usize, seed: Option<u64>) -> Result<Self, EstimatorError> {
        require_role(classifier.as_ref(), Capability::Classifier, "AdaBoostClassifier")?;
        let models = replicate(classifier, n_models)?;
        Ok(Self {
            correct_weight: vec![0.0; models.len()],
            wrong_weight: vec![0.0; models.len()],
            models,
            seed,
            rng: seeded(seed),
        })
    }

    /// Voting weight of member `i`; members no better than chance get 1.
    pub fn model_weight(&self, i: usize) -> f64 {
        let error = (self.wrong_weight[i] + 1e-16) / (self.correct_weight[i] + self.wrong_weight[i] + 1e-16);
        if error > 0.5 {
            1.0
        } else {
            ((1.0 - error) / error).ln()
        }
    }
}

impl Classifier for AdaBoostClassifier {
    fn learn_one(&mut self, x: &FeatureVector, y: Label) -> Result<(), EstimatorError> {
        let mut rate = 1.0;
        for (i, model) in self.models.iter_mut().enumerate() {
            let classifier = model
                .as_classifier_mut()
                .ok_or_else(|| missing(Capability::Classifier, "AdaBoostClassifier"))?;
            for _ in 0..poisson(&mut self.rng, rate) {
                classifier.learn_one(x, y)?;
            }

            let hit = classifier.predict_one(x)? == Some(y);
            if hit {
                self.correct_weight[i] += rate;
            } else {
                self.wrong_weight[i] += rate;
            }
            let seen = self.correct_weight[i] + self.wrong_weight[i];
            let side = if hit { self.correct_weight[i] } else { self.wrong_weight[i] };
            rate *= seen / (2.0 * side);
        }
        Ok(())
    }

    fn predict_proba_one(&self, x: &FeatureVector) -> Result<Proba, EstimatorError> {
        let mut weighted = Proba::new();
        let mut plain = Proba::new();
        for (i, model) in self.models.iter().enumerate() {
            let classifier = model
                .as_classifier()
                .ok_or_else(|| missing(Capability::Classifier, "AdaBoostClassifier"))?;
            let weight = self.model_weight(i);
            for (label, p) in classifier.predict_proba_one(x)? {
                *weighted.entry(label).or_insert(0.0) += weight * p;
                *plain.entry(label).or_insert(0.0) += p;
            }
        }
        // every member sits exactly at chance: fall back to an even vote
        let mut votes = if weighted.values().sum::<f64>() > 0.0 { weighted } else { plain };
        let total: f64 = votes.values().sum();
        if total > 0.0 {
            votes.values_mut().for_each(|p| *p /= total);
        }
        Ok(votes)
    }

    fn is_multiclass(&self) -> bool {
        self.models[0].as_classifier().is_some_and(|c| c.is_multiclass())
    }
}

impl Estimator for AdaBoostClassifier {
    fn name(&self) -> String {
        "AdaBoostClassifier".to_string()
    }

    fn params(&self) -> Value {
        json!({
            "classifier": describe(self.models[0].as_ref()),
            "n_models": self.models.len(),
            "seed": self.seed,
        })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Classifier);
}

/// Hedge algorithm: weights regressors by their exponentiated past loss.
#[derive(Debug, Clone)]
pub struct HedgeRegressor {
    regressors: Vec<Box<dyn Estimator>>,
    weights: Vec<f64>,
    loss: Loss,
    learning_rate: f64,
}

impl HedgeRegressor {
    pub fn new(regressors: Vec<Box<dyn Estimator>>, loss: Loss, learning_rate: f64) -> Result<Self, EstimatorError> {
        if regressors.is_empty() {
            return Err(EstimatorError::InvalidParameter(
                "HedgeRegressor needs at least one regressor".to_string(),
            ));
        }
        for regressor in &regressors {
            require_role(regressor.as_ref(), Capability::Regressor, "HedgeRegressor")?;
        }
        let weights = vec![1.0 / regressors.len() as f64; regressors.len()];
        Ok(Self { regressors, weights, loss, learning_rate })
    }

    pub fn weights(&self) -> &[f64] {
        &self.weights
    }
}

impl Regressor for HedgeRegressor {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        for (model, weight) in self.regressors.iter_mut().zip(self.weights.iter_mut()) {
            let regressor = model
                .as_regressor_mut()
                .ok_or_else(|| missing(Capability::Regressor, "HedgeRegressor"))?;
            let loss = self.loss.evaluate(y, regressor.predict_one(x)?);
            *weight *= (-self.learning_rate * loss).exp();
            regressor.learn_one(x, y)?;
        }

        let total: f64 = self.weights.iter().sum();
        if total > 0.0 && total.is_finite() {
            self.weights.iter_mut().for_each(|w| *w /= total);
        } else {
            // every weight underflowed
            let uniform = 1.0 / self.weights.len() as f64;
            self.weights.iter_mut().for_each(|w| *w = uniform);
        }
        Ok(())
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        let mut prediction = 0.0;
        for (model, weight) in self.regressors.iter().zip(&self.weights) {
            let regressor = model
                .as_regressor()
                .ok_or_else(|| missing(Capability::Regressor, "HedgeRegressor"))?;
            prediction += weight * regressor.predict_one(x)?;
        }
        Ok(prediction)
    }
}

impl Estimator for HedgeRegressor {
    fn name(&self) -> String {
        "HedgeRegressor".to_string()
    }

    fn params(&self) -> Value {
        let regressors: Vec<String> = self.regressors.iter().map(|r| describe(r.as_ref())).collect();
        json!({ "regressors": regressors, "loss": self.loss, "learning_rate": self.learning_rate })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Regressor);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![
        EstimatorType::new(
            "ensemble",
            "BaggingClassifier",
            &[Capability::Classifier],
            &[Family::Bagging],
            Constructor::WithClassifier(|classifier| {
                BaggingClassifier::new(classifier, 10, Some(42)).map(boxed)
            }),
        ),
        EstimatorType::new(
            "ensemble",
            "BaggingRegressor",
            &[Capability::Regressor],
            &[Family::Bagging],
            Constructor::WithRegressor(|regressor| {
                BaggingRegressor::new(regressor, 10, Some(42)).map(boxed)
            }),
        ),
        EstimatorType::new(
            "ensemble",
            "AdaBoostClassifier",
            &[Capability::Classifier],
            &[Family::AdaBoost],
            Constructor::WithClassifier(|classifier| {
                AdaBoostClassifier::new(classifier, 10, Some(42)).map(boxed)
            }),
        ),
        EstimatorType::new(
            "ensemble",
            "HedgeRegressor",
            &[Capability::Regressor],
            &[Family::Hedge],
            Constructor::WithRegressors(|regressors| {
                HedgeRegressor::new(regressors, Loss::Squared, 0.5).map(boxed)
            }),
        ),
    ]
}
