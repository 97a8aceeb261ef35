use std::collections::BTreeMap;

use serde_json::{json, Value};

use crate::traits::estimator::{
    describe, expose_roles, require_role, Capability, Classifier, Estimator, EstimatorError, Label,
    Proba,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

/// One binary classifier per class, each trained on "this class versus the rest".
///
/// A fresh copy of the template classifier is added the first time a class
/// is seen. Probabilities are the per-class positive scores, normalised.
#[derive(Debug, Clone)]
pub struct OneVsRestClassifier {
    template: Box<dyn Estimator>,
    classifiers: BTreeMap<Label, Box<dyn Estimator>>,
}

impl OneVsRestClassifier {
    pub fn new(binary_classifier: Box<dyn Estimator>) -> Result<Self, EstimatorError> {
        require_role(binary_classifier.as_ref(), Capability::Classifier, "OneVsRestClassifier")?;
        Ok(Self { template: binary_classifier, classifiers: BTreeMap::new() })
    }

    fn missing() -> EstimatorError {
        EstimatorError::MissingRole {
            role: Capability::Classifier,
            context: "OneVsRestClassifier".to_string(),
        }
    }
}

impl Classifier for OneVsRestClassifier {
    fn learn_one(&mut self, x: &FeatureVector, y: Label) -> Result<(), EstimatorError> {
        if !self.classifiers.contains_key(&y) {
            self.classifiers.insert(y, self.template.clone());
        }
        for (&label, model) in self.classifiers.iter_mut() {
            let classifier = model.as_classifier_mut().ok_or_else(Self::missing)?;
            classifier.learn_one(x, usize::from(label == y))?;
        }
        Ok(())
    }

    fn predict_proba_one(&self, x: &FeatureVector) -> Result<Proba, EstimatorError> {
        let mut proba = Proba::new();
        for (&label, model) in &self.classifiers {
            let classifier = model.as_classifier().ok_or_else(Self::missing)?;
            let positive = classifier.predict_proba_one(x)?.get(&1).copied().unwrap_or(0.0);
            proba.insert(label, positive);
        }
        let total: f64 = proba.values().sum();
        if total > 0.0 {
            proba.values_mut().for_each(|p| *p /= total);
        } else if !proba.is_empty() {
            let uniform = 1.0 / proba.len() as f64;
            proba.values_mut().for_each(|p| *p = uniform);
        }
        Ok(proba)
    }

    fn is_multiclass(&self) -> bool {
        true
    }
}

impl Estimator for OneVsRestClassifier {
    fn name(&self) -> String {
        "OneVsRestClassifier".to_string()
    }

    fn params(&self) -> Value {
        json!({ "binary_classifier": describe(self.template.as_ref()) })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Classifier);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![EstimatorType::new(
        "multiclass",
        "OneVsRestClassifier",
        &[Capability::Classifier],
        &[Family::OneVsRest],
        Constructor::WithClassifier(|classifier| OneVsRestClassifier::new(classifier).map(boxed)),
    )]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::linear_model::LogisticRegression;

    #[test]
    fn test_one_vs_rest_learns_three_classes() {
        let mut model = OneVsRestClassifier::new(Box::new(LogisticRegression::new(0.5, 0.0))).unwrap();
        let points = [
            (FeatureVector::new(vec![-2.0, 0.0]), 0),
            (FeatureVector::new(vec![0.0, 2.0]), 1),
            (FeatureVector::new(vec![2.0, 0.0]), 2),
        ];
        for _ in 0..300 {
            for (x, y) in &points {
                model.learn_one(x, *y).unwrap();
            }
        }
        for (x, y) in &points {
            let proba = model.predict_proba_one(x).unwrap();
            assert_eq!(proba.len(), 3);
            assert!((proba.values().sum::<f64>() - 1.0).abs() < 1e-12);
            assert_eq!(Classifier::predict_one(&model, x).unwrap(), Some(*y));
        }
    }

    #[test]
    fn test_one_vs_rest_before_learning() {
        let model = OneVsRestClassifier::new(Box::new(LogisticRegression::default())).unwrap();
        assert!(model.predict_proba_one(&FeatureVector::new(vec![1.0])).unwrap().is_empty());
    }
}
