use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::stats::{describe_univariate, Univariate};
use crate::traits::estimator::{
    expose_roles, Capability, Classifier, Estimator, EstimatorError, Label, Proba, Regressor,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

/// Predicts a running statistic of the targets, ignoring the features.
#[derive(Debug, Clone)]
pub struct StatisticRegressor {
    statistic: Box<dyn Univariate>,
}

impl StatisticRegressor {
    pub fn new(statistic: Box<dyn Univariate>) -> Self {
        Self { statistic }
    }
}

impl Regressor for StatisticRegressor {
    fn learn_one(&mut self, _x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        self.statistic.update(y);
        Ok(())
    }

    fn predict_one(&self, _x: &FeatureVector) -> Result<f64, EstimatorError> {
        Ok(self.statistic.get())
    }
}

impl Estimator for StatisticRegressor {
    fn name(&self) -> String {
        "StatisticRegressor".to_string()
    }

    fn params(&self) -> Value {
        json!({ "statistic": describe_univariate(self.statistic.as_ref()) })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Regressor);
}

/// Predicts the class frequencies seen so far.
#[derive(Debug, Clone, Default)]
pub struct PriorClassifier {
    counts: BTreeMap<Label, usize>,
    total: usize,
}

impl PriorClassifier {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Classifier for PriorClassifier {
    fn learn_one(&mut self, _x: &FeatureVector, y: Label) -> Result<(), EstimatorError> {
        *self.counts.entry(y).or_insert(0) += 1;
        self.total += 1;
        Ok(())
    }

    fn predict_proba_one(&self, _x: &FeatureVector) -> Result<Proba, EstimatorError> {
        Ok(self
            .counts
            .iter()
            .map(|(&label, &count)| (label, count as f64 / self.total as f64))
            .collect())
    }

    fn is_multiclass(&self) -> bool {
        true
    }
}

impl Estimator for PriorClassifier {
    fn name(&self) -> String {
        "PriorClassifier".to_string()
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Classifier);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![
        EstimatorType::new(
            "dummy",
            "PriorClassifier",
            &[Capability::Classifier],
            &[Family::Prior],
            Constructor::Default(|| boxed(PriorClassifier::new())),
        ),
        EstimatorType::new(
            "dummy",
            "StatisticRegressor",
            &[Capability::Regressor],
            &[Family::StatisticRegressor],
            Constructor::WithUnivariate(|statistic| boxed(StatisticRegressor::new(statistic))),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::Mean;

    #[test]
    fn test_statistic_regressor_tracks_the_mean() {
        let mut model = StatisticRegressor::new(Box::new(Mean::new()));
        let x = FeatureVector::new(vec![]);
        assert_eq!(model.predict_one(&x).unwrap(), 0.0);
        for y in [1.0, 2.0, 6.0] {
            model.learn_one(&x, y).unwrap();
        }
        assert_eq!(model.predict_one(&x).unwrap(), 3.0);
        assert_eq!(describe_univariate(model.statistic.as_ref()), json!("Mean"));
    }

    #[test]
    fn test_prior_classifier() {
        let mut model = PriorClassifier::new();
        let x = FeatureVector::new(vec![0.0]);
        assert!(model.predict_proba_one(&x).unwrap().is_empty());
        for y in [0, 2, 2, 2] {
            model.learn_one(&x, y).unwrap();
        }
        let proba = model.predict_proba_one(&x).unwrap();
        assert_eq!(proba, Proba::from([(0, 0.25), (2, 0.75)]));
        assert_eq!(Classifier::predict_one(&model, &x).unwrap(), Some(2));
    }
}
