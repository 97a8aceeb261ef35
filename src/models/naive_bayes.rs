use std::collections::BTreeMap;
use std::f64::consts::PI;

use crate::stats::{Univariate, Var};
use crate::traits::estimator::{
    check_dimension, expose_roles, Capability, Classifier, Estimator, EstimatorError, Label, Proba,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

/// Floor on per-feature variances so a constant feature does not produce
/// an infinite density.
const VAR_SMOOTHING: f64 = 1e-9;

/// Gaussian naive Bayes with running per-class feature statistics.
#[derive(Debug, Clone, Default)]
pub struct GaussianNB {
    class_counts: BTreeMap<Label, usize>,
    feature_vars: BTreeMap<Label, Vec<Var>>,
    total: usize,
    dimension: Option<usize>,
}

impl GaussianNB {
    pub fn new() -> Self {
        Self::default()
    }

    fn joint_log_likelihood(&self, label: Label, x: &FeatureVector) -> f64 {
        let prior = (self.class_counts[&label] as f64 / self.total as f64).ln();
        let vars = &self.feature_vars[&label];
        vars.iter().zip(x.as_array()).fold(prior, |acc, (var, &value)| {
            let variance = var.get() + VAR_SMOOTHING;
            acc - 0.5 * (2.0 * PI * variance).ln() - (value - var.mean()).powi(2) / (2.0 * variance)
        })
    }
}

impl Classifier for GaussianNB {
    fn learn_one(&mut self, x: &FeatureVector, y: Label) -> Result<(), EstimatorError> {
        check_dimension(self.dimension, x, "GaussianNB input")?;
        self.dimension = Some(x.dimension());
        *self.class_counts.entry(y).or_insert(0) += 1;
        self.total += 1;
        let vars = self
            .feature_vars
            .entry(y)
            .or_insert_with(|| vec![Var::new(0); x.dimension()]);
        for (var, &value) in vars.iter_mut().zip(x.as_array()) {
            var.update(value);
        }
        Ok(())
    }

    fn predict_proba_one(&self, x: &FeatureVector) -> Result<Proba, EstimatorError> {
        check_dimension(self.dimension, x, "GaussianNB input")?;
        let jll: Vec<(Label, f64)> = self
            .class_counts
            .keys()
            .map(|&label| (label, self.joint_log_likelihood(label, x)))
            .collect();
        // log-sum-exp normalisation
        let max = jll.iter().map(|(_, l)| *l).fold(f64::NEG_INFINITY, f64::max);
        let norm: f64 = jll.iter().map(|(_, l)| (l - max).exp()).sum();
        Ok(jll.into_iter().map(|(label, l)| (label, (l - max).exp() / norm)).collect())
    }

    fn is_multiclass(&self) -> bool {
        true
    }
}

impl Estimator for GaussianNB {
    fn name(&self) -> String {
        "GaussianNB".to_string()
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Classifier);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![EstimatorType::new(
        "naive_bayes",
        "GaussianNB",
        &[Capability::Classifier],
        &[Family::NaiveBayes],
        Constructor::Default(|| boxed(GaussianNB::new())),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gaussian_nb_separates_clusters() {
        let mut model = GaussianNB::new();
        for i in 0..10 {
            let jitter = (i as f64) * 0.1;
            model.learn_one(&FeatureVector::new(vec![-5.0 + jitter, 0.0]), 0).unwrap();
            model.learn_one(&FeatureVector::new(vec![5.0 - jitter, 1.0]), 1).unwrap();
        }
        let proba = model.predict_proba_one(&FeatureVector::new(vec![-4.0, 0.0])).unwrap();
        assert!(proba[&0] > 0.99);
        assert!((proba.values().sum::<f64>() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_gaussian_nb_single_example_is_finite() {
        let mut model = GaussianNB::new();
        model.learn_one(&FeatureVector::new(vec![1.0]), 3).unwrap();
        let proba = model.predict_proba_one(&FeatureVector::new(vec![100.0])).unwrap();
        assert_eq!(proba, Proba::from([(3, 1.0)]));
        assert!(model.predict_proba_one(&FeatureVector::new(vec![1.0, 2.0])).is_err());
    }
}
