//! Generic checks, selected from an estimator's capabilities.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::Value;
use thiserror::Error;

use crate::optim::losses::{sigmoid, Loss};
use crate::traits::estimator::{
    Capability, Classifier, Clusterer, Estimator, EstimatorError, Label, Proba, Regressor,
    Transformer,
};
use crate::traits::features::FeatureVector;

use super::config::{ConfigError, HarnessConfig};

/// A contract violation found by a check
#[derive(Error, Debug, Clone, PartialEq)]
pub enum Violation {
    #[error("{operation} failed: {source}")]
    Failed {
        operation: &'static str,
        source: EstimatorError,
    },
    #[error("{operation} produced a non-finite value ({value})")]
    NonFinite { operation: &'static str, value: f64 },
    #[error("{0}")]
    Broken(String),
    #[error("panicked: {0}")]
    Panicked(String),
}

fn failed(operation: &'static str) -> impl FnOnce(EstimatorError) -> Violation {
    move |source| Violation::Failed { operation, source }
}

fn finite(operation: &'static str, value: f64) -> Result<f64, Violation> {
    if value.is_finite() {
        Ok(value)
    } else {
        Err(Violation::NonFinite { operation, value })
    }
}

pub type CheckFn = fn(&mut dyn Estimator, &CheckContext) -> Result<(), Violation>;

/// A named check over one estimator
#[derive(Debug, Clone, Copy)]
pub struct Check {
    pub name: &'static str,
    pub run: CheckFn,
}

impl Check {
    pub const fn new(name: &'static str, run: CheckFn) -> Self {
        Self { name, run }
    }
}

/// Synthetic data shared by every check of a run.
///
/// Targets are a fixed linear function of the features plus an offset.
/// Class labels bucket the examples by target rank, so every class is
/// represented whatever the seed.
#[derive(Debug, Clone)]
pub struct CheckContext {
    config: HarnessConfig,
    features: Vec<FeatureVector>,
    targets: Vec<f64>,
    binary_labels: Vec<Label>,
    multiclass_labels: Vec<Label>,
}

impl CheckContext {
    pub const N_CLASSES: usize = 3;

    /// Generates the data for `config`, which must pass
    /// [`HarnessConfig::validate`].
    pub fn new(config: HarnessConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        let mut rng = StdRng::seed_from_u64(config.seed);
        let features: Vec<FeatureVector> = (0..config.n_samples)
            .map(|_| {
                let values: Vec<f64> = (0..config.n_features).map(|_| rng.random_range(-2.0..2.0)).collect();
                FeatureVector::new(values)
            })
            .collect();
        let targets: Vec<f64> = features
            .iter()
            .map(|x| {
                x.as_array()
                    .iter()
                    .enumerate()
                    .map(|(j, v)| v / (j + 1) as f64)
                    .sum::<f64>()
                    + 3.0
            })
            .collect();

        let mut order: Vec<usize> = (0..targets.len()).collect();
        order.sort_by(|&a, &b| targets[a].total_cmp(&targets[b]));
        let n = targets.len().max(1);
        let mut binary_labels = vec![0; targets.len()];
        let mut multiclass_labels = vec![0; targets.len()];
        for (rank, &i) in order.iter().enumerate() {
            binary_labels[i] = rank * 2 / n;
            multiclass_labels[i] = rank * Self::N_CLASSES / n;
        }

        Ok(Self {
            config,
            features,
            targets,
            binary_labels,
            multiclass_labels,
        })
    }

    pub fn config(&self) -> &HarnessConfig {
        &self.config
    }

    pub fn features(&self) -> &[FeatureVector] {
        &self.features
    }

    /// A fixed example used for before/after comparisons
    pub fn query(&self) -> &FeatureVector {
        &self.features[0]
    }

    pub fn query_target(&self) -> f64 {
        self.targets[0]
    }

    pub fn regression(&self) -> impl Iterator<Item = (&FeatureVector, f64)> {
        self.features.iter().zip(self.targets.iter().copied())
    }

    /// Labels {0, 1} for binary classifiers, three classes otherwise
    pub fn classification(&self, multiclass: bool) -> impl Iterator<Item = (&FeatureVector, Label)> {
        let labels = if multiclass { &self.multiclass_labels } else { &self.binary_labels };
        self.features.iter().zip(labels.iter().copied())
    }
}

fn regressor_mut(estimator: &mut dyn Estimator) -> Result<&mut dyn Regressor, Violation> {
    let name = estimator.name();
    estimator
        .as_regressor_mut()
        .ok_or_else(|| Violation::Broken(format!("{} does not expose its Regressor role", name)))
}

fn classifier_mut(estimator: &mut dyn Estimator) -> Result<&mut dyn Classifier, Violation> {
    let name = estimator.name();
    estimator
        .as_classifier_mut()
        .ok_or_else(|| Violation::Broken(format!("{} does not expose its Classifier role", name)))
}

fn transformer_mut(estimator: &mut dyn Estimator) -> Result<&mut dyn Transformer, Violation> {
    let name = estimator.name();
    estimator
        .as_transformer_mut()
        .ok_or_else(|| Violation::Broken(format!("{} does not expose its Transformer role", name)))
}

fn clusterer_mut(estimator: &mut dyn Estimator) -> Result<&mut dyn Clusterer, Violation> {
    let name = estimator.name();
    estimator
        .as_clusterer_mut()
        .ok_or_else(|| Violation::Broken(format!("{} does not expose its Clusterer role", name)))
}

/// Feeds the whole dataset through every role the estimator holds.
fn learn_dataset(estimator: &mut dyn Estimator, ctx: &CheckContext, limit: usize) -> Result<(), Violation> {
    let caps = estimator.capabilities();
    if caps.contains(Capability::Regressor) {
        let regressor = regressor_mut(estimator)?;
        for (x, y) in ctx.regression().take(limit) {
            regressor.learn_one(x, y).map_err(failed("Regressor::learn_one"))?;
        }
    }
    if caps.contains(Capability::Classifier) {
        let classifier = classifier_mut(estimator)?;
        let multiclass = classifier.is_multiclass();
        for (x, y) in ctx.classification(multiclass).take(limit) {
            classifier.learn_one(x, y).map_err(failed("Classifier::learn_one"))?;
        }
    }
    if caps.contains(Capability::Transformer) {
        let transformer = transformer_mut(estimator)?;
        for (x, y) in ctx.regression().take(limit) {
            transformer.learn_one(x, Some(y)).map_err(failed("Transformer::learn_one"))?;
        }
    }
    if caps.contains(Capability::Clusterer) {
        let clusterer = clusterer_mut(estimator)?;
        for x in ctx.features().iter().take(limit) {
            clusterer.learn_one(x).map_err(failed("Clusterer::learn_one"))?;
        }
    }
    Ok(())
}

/// Every output the estimator produces for `x`, flattened.
fn outputs(estimator: &dyn Estimator, x: &FeatureVector) -> Result<Vec<f64>, Violation> {
    let mut out = Vec::new();
    if let Some(regressor) = estimator.as_regressor() {
        out.push(regressor.predict_one(x).map_err(failed("Regressor::predict_one"))?);
    }
    if let Some(classifier) = estimator.as_classifier() {
        let proba = classifier.predict_proba_one(x).map_err(failed("Classifier::predict_proba_one"))?;
        for (label, p) in proba {
            out.push(label as f64);
            out.push(p);
        }
    }
    if let Some(transformer) = estimator.as_transformer() {
        let transformed = transformer.transform_one(x).map_err(failed("Transformer::transform_one"))?;
        out.extend(transformed.as_array().iter().copied());
    }
    if let Some(clusterer) = estimator.as_clusterer() {
        out.push(clusterer.predict_one(x).map_err(failed("Clusterer::predict_one"))? as f64);
    }
    Ok(out)
}

fn same_outputs(a: &[f64], b: &[f64]) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| x.to_bits() == y.to_bits())
}

pub fn check_identity(estimator: &mut dyn Estimator, _ctx: &CheckContext) -> Result<(), Violation> {
    if estimator.name().trim().is_empty() {
        return Err(Violation::Broken("estimator name is empty".to_string()));
    }
    match estimator.params() {
        Value::Null | Value::Object(_) => Ok(()),
        other => Err(Violation::Broken(format!("params must be a JSON object, got {}", other))),
    }
}

pub fn check_clone_is_independent(estimator: &mut dyn Estimator, ctx: &CheckContext) -> Result<(), Violation> {
    let half = ctx.features().len() / 2;
    learn_dataset(estimator, ctx, half)?;
    let before = outputs(estimator, ctx.query())?;

    let mut copy = estimator.clone_box();
    learn_dataset(copy.as_mut(), ctx, usize::MAX)?;

    let after = outputs(estimator, ctx.query())?;
    if !same_outputs(&before, &after) {
        return Err(Violation::Broken(format!(
            "learning on a clone changed the original's output from {:?} to {:?}",
            before, after
        )));
    }
    Ok(())
}

pub fn check_regressor_predict_before_learning(
    estimator: &mut dyn Estimator,
    ctx: &CheckContext,
) -> Result<(), Violation> {
    let regressor = regressor_mut(estimator)?;
    regressor.predict_one(ctx.query()).map_err(failed("Regressor::predict_one"))?;
    Ok(())
}

pub fn check_regressor_learns_dataset(estimator: &mut dyn Estimator, ctx: &CheckContext) -> Result<(), Violation> {
    let regressor = regressor_mut(estimator)?;
    for (x, y) in ctx.regression() {
        regressor.learn_one(x, y).map_err(failed("Regressor::learn_one"))?;
    }
    for x in ctx.features() {
        let y_pred = regressor.predict_one(x).map_err(failed("Regressor::predict_one"))?;
        finite("Regressor::predict_one", y_pred)?;
    }
    Ok(())
}

pub fn check_regressor_repeated_learning(
    estimator: &mut dyn Estimator,
    ctx: &CheckContext,
) -> Result<(), Violation> {
    let regressor = regressor_mut(estimator)?;
    let (x, y) = (ctx.query(), ctx.query_target());
    for _ in 0..ctx.config().repeats {
        regressor.learn_one(x, y).map_err(failed("Regressor::learn_one"))?;
    }
    regressor.predict_one(x).map_err(failed("Regressor::predict_one"))?;
    Ok(())
}

/// A distribution is either empty (nothing learned yet) or sums to one.
fn validate_proba(proba: &Proba, tolerance: f64, allow_empty: bool) -> Result<(), Violation> {
    if proba.is_empty() {
        return if allow_empty {
            Ok(())
        } else {
            Err(Violation::Broken("no class probabilities after learning".to_string()))
        };
    }
    for (label, &p) in proba {
        finite("Classifier::predict_proba_one", p)?;
        if !(-tolerance..=1.0 + tolerance).contains(&p) {
            return Err(Violation::Broken(format!("probability of class {} is {}, outside [0, 1]", label, p)));
        }
    }
    let total: f64 = proba.values().sum();
    if (total - 1.0).abs() > tolerance {
        return Err(Violation::Broken(format!("probabilities sum to {}", total)));
    }
    Ok(())
}

pub fn check_proba_before_learning(estimator: &mut dyn Estimator, ctx: &CheckContext) -> Result<(), Violation> {
    let classifier = classifier_mut(estimator)?;
    let proba = classifier
        .predict_proba_one(ctx.query())
        .map_err(failed("Classifier::predict_proba_one"))?;
    validate_proba(&proba, ctx.config().tolerance, true)
}

pub fn check_proba_after_learning(estimator: &mut dyn Estimator, ctx: &CheckContext) -> Result<(), Violation> {
    let classifier = classifier_mut(estimator)?;
    let multiclass = classifier.is_multiclass();
    for (x, y) in ctx.classification(multiclass) {
        classifier.learn_one(x, y).map_err(failed("Classifier::learn_one"))?;
    }
    for x in ctx.features() {
        let proba = classifier.predict_proba_one(x).map_err(failed("Classifier::predict_proba_one"))?;
        validate_proba(&proba, ctx.config().tolerance, false)?;
    }
    Ok(())
}

pub fn check_predict_is_argmax(estimator: &mut dyn Estimator, ctx: &CheckContext) -> Result<(), Violation> {
    let classifier = classifier_mut(estimator)?;
    let multiclass = classifier.is_multiclass();
    for (x, y) in ctx.classification(multiclass) {
        classifier.learn_one(x, y).map_err(failed("Classifier::learn_one"))?;
    }
    for x in ctx.features() {
        let proba = classifier.predict_proba_one(x).map_err(failed("Classifier::predict_proba_one"))?;
        let predicted = classifier.predict_one(x).map_err(failed("Classifier::predict_one"))?;
        let best = proba.values().copied().fold(f64::NEG_INFINITY, f64::max);
        let lowest_best = proba.iter().find(|&(_, &p)| p == best).map(|(&label, _)| label);
        if predicted != lowest_best {
            return Err(Violation::Broken(format!(
                "predict_one returned {:?} but the most probable class is {:?}",
                predicted, lowest_best
            )));
        }
    }
    Ok(())
}

pub fn check_classifier_repeated_learning(
    estimator: &mut dyn Estimator,
    ctx: &CheckContext,
) -> Result<(), Violation> {
    let classifier = classifier_mut(estimator)?;
    let x = ctx.query();
    for _ in 0..ctx.config().repeats {
        classifier.learn_one(x, 1).map_err(failed("Classifier::learn_one"))?;
    }
    let proba = classifier.predict_proba_one(x).map_err(failed("Classifier::predict_proba_one"))?;
    validate_proba(&proba, ctx.config().tolerance, false)
}

pub fn check_transform_before_learning(estimator: &mut dyn Estimator, ctx: &CheckContext) -> Result<(), Violation> {
    let transformer = transformer_mut(estimator)?;
    transformer.transform_one(ctx.query()).map_err(failed("Transformer::transform_one"))?;
    Ok(())
}

pub fn check_transform_output(estimator: &mut dyn Estimator, ctx: &CheckContext) -> Result<(), Violation> {
    let transformer = transformer_mut(estimator)?;
    for (x, y) in ctx.regression() {
        transformer.learn_one(x, Some(y)).map_err(failed("Transformer::learn_one"))?;
    }
    let mut width = None;
    for x in ctx.features() {
        let out = transformer.transform_one(x).map_err(failed("Transformer::transform_one"))?;
        for &value in out.as_array() {
            finite("Transformer::transform_one", value)?;
        }
        match width {
            None => width = Some(out.dimension()),
            Some(w) if w != out.dimension() => {
                return Err(Violation::Broken(format!(
                    "output width changed from {} to {} between calls",
                    w,
                    out.dimension()
                )));
            }
            Some(_) => {}
        }
    }
    Ok(())
}

pub fn check_cluster_assignment(estimator: &mut dyn Estimator, ctx: &CheckContext) -> Result<(), Violation> {
    let clusterer = clusterer_mut(estimator)?;
    let x = ctx.query();
    let stable = |clusterer: &dyn Clusterer| -> Result<(), Violation> {
        let first = clusterer.predict_one(x).map_err(failed("Clusterer::predict_one"))?;
        let second = clusterer.predict_one(x).map_err(failed("Clusterer::predict_one"))?;
        if first != second {
            return Err(Violation::Broken(format!("query assigned to {} then {}", first, second)));
        }
        Ok(())
    };
    stable(&*clusterer)?;
    for x in ctx.features() {
        clusterer.learn_one(x).map_err(failed("Clusterer::learn_one"))?;
    }
    stable(&*clusterer)
}

const COMMON_CHECKS: &[Check] = &[
    Check::new("check_identity", check_identity),
    Check::new("check_clone_is_independent", check_clone_is_independent),
];

const REGRESSOR_CHECKS: &[Check] = &[
    Check::new("check_regressor_predict_before_learning", check_regressor_predict_before_learning),
    Check::new("check_regressor_learns_dataset", check_regressor_learns_dataset),
    Check::new("check_regressor_repeated_learning", check_regressor_repeated_learning),
];

const CLASSIFIER_CHECKS: &[Check] = &[
    Check::new("check_proba_before_learning", check_proba_before_learning),
    Check::new("check_proba_after_learning", check_proba_after_learning),
    Check::new("check_predict_is_argmax", check_predict_is_argmax),
    Check::new("check_classifier_repeated_learning", check_classifier_repeated_learning),
];

const TRANSFORMER_CHECKS: &[Check] = &[
    Check::new("check_transform_before_learning", check_transform_before_learning),
    Check::new("check_transform_output", check_transform_output),
];

const CLUSTERER_CHECKS: &[Check] = &[Check::new("check_cluster_assignment", check_cluster_assignment)];

/// Checks applicable to `estimator`, in a fixed order.
pub fn checks_for(estimator: &dyn Estimator) -> Vec<Check> {
    let caps = estimator.capabilities();
    let mut checks = COMMON_CHECKS.to_vec();
    for (role, role_checks) in [
        (Capability::Regressor, REGRESSOR_CHECKS),
        (Capability::Classifier, CLASSIFIER_CHECKS),
        (Capability::Transformer, TRANSFORMER_CHECKS),
        (Capability::Clusterer, CLUSTERER_CHECKS),
    ] {
        if caps.contains(role) {
            checks.extend_from_slice(role_checks);
        }
    }
    checks
}

pub type LossCheckFn = fn(Loss, &CheckContext) -> Result<(), Violation>;

/// A named check over one loss
#[derive(Debug, Clone, Copy)]
pub struct LossCheck {
    pub name: &'static str,
    /// Restricts the check to a single loss
    pub only: Option<Loss>,
    pub run: LossCheckFn,
}

/// Points where every loss is differentiable
const GRADIENT_POINTS: &[(f64, f64)] = &[(0.0, 0.3), (1.0, 0.3), (0.0, 0.8), (1.0, 0.6), (2.0, -1.5), (-3.0, 4.0)];

const FD_STEP: f64 = 1e-6;

pub fn check_gradient_matches_derivative(loss: Loss, ctx: &CheckContext) -> Result<(), Violation> {
    let tolerance = ctx.config().tolerance.max(1e-5);
    for &(y_true, y_pred) in GRADIENT_POINTS {
        let (analytic, numeric) = match loss {
            // d/dz of L(y, sigmoid(z)) equals clip(p) - y
            Loss::Log => {
                if !(y_true == 0.0 || y_true == 1.0) || !(0.0..1.0).contains(&y_pred) || y_pred == 0.0 {
                    continue;
                }
                let z = (y_pred / (1.0 - y_pred)).ln();
                let numeric = (loss.evaluate(y_true, sigmoid(z + FD_STEP))
                    - loss.evaluate(y_true, sigmoid(z - FD_STEP)))
                    / (2.0 * FD_STEP);
                (loss.gradient(y_true, y_pred), numeric)
            }
            _ => {
                let numeric = (loss.evaluate(y_true, y_pred + FD_STEP) - loss.evaluate(y_true, y_pred - FD_STEP))
                    / (2.0 * FD_STEP);
                (loss.gradient(y_true, y_pred), numeric)
            }
        };
        if (analytic - numeric).abs() > tolerance * (1.0 + numeric.abs()) {
            return Err(Violation::Broken(format!(
                "{:?} gradient at ({}, {}) is {}, finite difference gives {}",
                loss, y_true, y_pred, analytic, numeric
            )));
        }
    }
    Ok(())
}

pub fn check_absolute_trichotomy(loss: Loss, _ctx: &CheckContext) -> Result<(), Violation> {
    for &(y_true, y_pred, expected) in &[(3.0, 3.0, 0.0), (3.0, 5.0, 1.0), (5.0, 3.0, -1.0)] {
        let gradient = loss.gradient(y_true, y_pred);
        if gradient != expected {
            return Err(Violation::Broken(format!(
                "Absolute gradient at ({}, {}) is {}, expected {}",
                y_true, y_pred, gradient, expected
            )));
        }
    }
    Ok(())
}

pub fn check_loss_is_finite(loss: Loss, _ctx: &CheckContext) -> Result<(), Violation> {
    for y_true in [0.0, 1.0] {
        for y_pred in [-5.0, 0.0, 0.5, 1.0, 7.0] {
            let value = finite("Loss::evaluate", loss.evaluate(y_true, y_pred))?;
            finite("Loss::gradient", loss.gradient(y_true, y_pred))?;
            if value < 0.0 {
                return Err(Violation::Broken(format!(
                    "{:?} loss at ({}, {}) is negative: {}",
                    loss, y_true, y_pred, value
                )));
            }
        }
    }
    Ok(())
}

const LOSS_CHECKS: &[LossCheck] = &[
    LossCheck {
        name: "check_gradient_matches_derivative",
        only: None,
        run: check_gradient_matches_derivative,
    },
    LossCheck {
        name: "check_absolute_trichotomy",
        only: Some(Loss::Absolute),
        run: check_absolute_trichotomy,
    },
    LossCheck {
        name: "check_loss_is_finite",
        only: None,
        run: check_loss_is_finite,
    },
];

/// Checks applicable to `loss`
pub fn checks_for_loss(loss: Loss) -> Vec<LossCheck> {
    LOSS_CHECKS
        .iter()
        .copied()
        .filter(|check| check.only.map_or(true, |only| only == loss))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::linear_model::{LinearRegression, LogisticRegression};
    use crate::models::preprocessing::StandardScaler;

    fn ctx() -> CheckContext {
        CheckContext::new(HarnessConfig::quick()).unwrap()
    }

    #[test]
    fn test_context_is_seeded_and_covers_classes() {
        let a = ctx();
        let b = ctx();
        assert_eq!(a.features(), b.features());
        let labels: Vec<Label> = a.classification(true).map(|(_, y)| y).collect();
        for class in 0..CheckContext::N_CLASSES {
            assert!(labels.contains(&class));
        }
        let binary: Vec<Label> = a.classification(false).map(|(_, y)| y).collect();
        assert!(binary.contains(&0) && binary.contains(&1));
    }

    #[test]
    fn test_context_rejects_configs_without_data() {
        let empty = HarnessConfig::new(0, 4, 42, 20, 1, 1e-6);
        assert!(matches!(CheckContext::new(empty), Err(ConfigError::Invalid(_))));
        let featureless = HarnessConfig { n_features: 0, ..HarnessConfig::quick() };
        assert!(matches!(CheckContext::new(featureless), Err(ConfigError::Invalid(_))));

        let smallest = CheckContext::new(HarnessConfig { n_samples: 3, ..HarnessConfig::quick() }).unwrap();
        assert_eq!(smallest.query().dimension(), smallest.config().n_features);
        assert!(smallest.query_target().is_finite());
    }

    #[test]
    fn test_checks_follow_capabilities() {
        let regressor_checks: Vec<&str> = checks_for(&LinearRegression::default()).iter().map(|c| c.name).collect();
        assert!(regressor_checks.contains(&"check_regressor_learns_dataset"));
        assert!(!regressor_checks.contains(&"check_proba_after_learning"));

        let scaler_checks: Vec<&str> = checks_for(&StandardScaler::new()).iter().map(|c| c.name).collect();
        assert!(scaler_checks.contains(&"check_transform_output"));
        assert!(scaler_checks.contains(&"check_identity"));
        assert!(!scaler_checks.contains(&"check_regressor_learns_dataset"));
    }

    #[test]
    fn test_checks_pass_on_well_behaved_models() {
        let ctx = ctx();
        let models: Vec<Box<dyn Estimator>> = vec![
            Box::new(LinearRegression::default()),
            Box::new(LogisticRegression::default()),
            Box::new(StandardScaler::new()),
        ];
        for model in models {
            for check in checks_for(model.as_ref()) {
                let mut copy = model.clone();
                (check.run)(copy.as_mut(), &ctx).unwrap();
            }
        }
    }

    #[test]
    fn test_mutating_one_instance_leaves_another_unaffected() {
        let ctx = ctx();
        let mut first: Box<dyn Estimator> = Box::new(LinearRegression::default());
        let second = first.clone();
        let x = FeatureVector::new(vec![1e300; 4]);
        // drive the first instance into overflow
        for _ in 0..5 {
            first.as_regressor_mut().unwrap().learn_one(&x, 1e300).unwrap();
        }
        assert!(check_regressor_learns_dataset(first.as_mut(), &ctx).is_err());
        let mut fresh = second.clone();
        assert!(check_regressor_learns_dataset(fresh.as_mut(), &ctx).is_ok());
    }

    #[test]
    fn test_proba_validation() {
        assert!(validate_proba(&Proba::new(), 1e-6, true).is_ok());
        assert!(validate_proba(&Proba::new(), 1e-6, false).is_err());
        assert!(validate_proba(&Proba::from([(0, 0.5), (1, 0.4)]), 1e-6, false).is_err());
        assert!(validate_proba(&Proba::from([(0, f64::NAN)]), 1e-6, false).is_err());
    }

    #[test]
    fn test_every_loss_passes_its_checks() {
        let ctx = ctx();
        for loss in Loss::ALL {
            for check in checks_for_loss(loss) {
                assert_eq!((check.run)(loss, &ctx), Ok(()), "{:?} {}", loss, check.name);
            }
        }
        assert_eq!(checks_for_loss(Loss::Squared).len(), 2);
        assert_eq!(checks_for_loss(Loss::Absolute).len(), 3);
    }

    #[test]
    fn test_trichotomy_rejects_other_losses() {
        let ctx = ctx();
        assert!(check_absolute_trichotomy(Loss::Absolute, &ctx).is_ok());
        assert!(check_absolute_trichotomy(Loss::Squared, &ctx).is_err());
    }
}
