use serde_json::{json, Value};

use crate::stats::{describe_bivariate, Bivariate, Univariate, Var};
use crate::traits::estimator::{
    check_dimension, expose_roles, Capability, Estimator, EstimatorError, Transformer,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

fn select(x: &FeatureVector, keep: &[usize]) -> FeatureVector {
    let values = x.as_array();
    FeatureVector::new(keep.iter().map(|&i| values[i]).collect())
}

/// Drops features whose running variance is at or below `threshold`.
///
/// All features are kept until `min_samples` examples have been seen.
#[derive(Debug, Clone)]
pub struct VarianceThreshold {
    threshold: f64,
    min_samples: usize,
    seen: usize,
    vars: Vec<Var>,
}

impl VarianceThreshold {
    pub fn new(threshold: f64, min_samples: usize) -> Self {
        Self { threshold, min_samples, seen: 0, vars: Vec::new() }
    }

    fn kept(&self, dimension: usize) -> Vec<usize> {
        if self.seen < self.min_samples || self.vars.is_empty() {
            return (0..dimension).collect();
        }
        self.vars
            .iter()
            .enumerate()
            .filter(|(_, var)| var.get() > self.threshold)
            .map(|(i, _)| i)
            .collect()
    }
}

impl Default for VarianceThreshold {
    fn default() -> Self {
        Self::new(0.0, 2)
    }
}

impl Transformer for VarianceThreshold {
    fn learn_one(&mut self, x: &FeatureVector, _y: Option<f64>) -> Result<(), EstimatorError> {
        let dim = (!self.vars.is_empty()).then_some(self.vars.len());
        check_dimension(dim, x, "VarianceThreshold input")?;
        if self.vars.is_empty() {
            self.vars = vec![Var::default(); x.dimension()];
        }
        for (var, &value) in self.vars.iter_mut().zip(x.as_array()) {
            var.update(value);
        }
        self.seen += 1;
        Ok(())
    }

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        let dim = (!self.vars.is_empty()).then_some(self.vars.len());
        check_dimension(dim, x, "VarianceThreshold input")?;
        Ok(select(x, &self.kept(x.dimension())))
    }
}

impl Estimator for VarianceThreshold {
    fn name(&self) -> String {
        "VarianceThreshold".to_string()
    }

    fn params(&self) -> Value {
        json!({ "threshold": self.threshold, "min_samples": self.min_samples })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Transformer);
}

/// Keeps the `k` features that score highest against the target under `similarity`.
///
/// Output features keep their input order. Before learning, the first `k`
/// features are kept.
#[derive(Debug, Clone)]
pub struct SelectKBest {
    similarity: Box<dyn Bivariate>,
    k: usize,
    similarities: Vec<Box<dyn Bivariate>>,
}

impl SelectKBest {
    pub fn new(similarity: Box<dyn Bivariate>, k: usize) -> Self {
        Self { similarity, k, similarities: Vec::new() }
    }

    fn kept(&self, dimension: usize) -> Vec<usize> {
        let k = self.k.min(dimension);
        if self.similarities.is_empty() {
            return (0..k).collect();
        }
        let mut ranked: Vec<(usize, f64)> = self
            .similarities
            .iter()
            .map(|sim| sim.get())
            .enumerate()
            .collect();
        // stable sort keeps the lower index first on ties
        ranked.sort_by(|a, b| b.1.total_cmp(&a.1));
        let mut keep: Vec<usize> = ranked.into_iter().take(k).map(|(i, _)| i).collect();
        keep.sort_unstable();
        keep
    }
}

impl Transformer for SelectKBest {
    fn learn_one(&mut self, x: &FeatureVector, y: Option<f64>) -> Result<(), EstimatorError> {
        let y = y.ok_or_else(|| {
            EstimatorError::InvalidParameter("SelectKBest needs a target to learn from".to_string())
        })?;
        let dim = (!self.similarities.is_empty()).then_some(self.similarities.len());
        check_dimension(dim, x, "SelectKBest input")?;
        if self.similarities.is_empty() {
            self.similarities = vec![self.similarity.clone(); x.dimension()];
        }
        for (sim, &value) in self.similarities.iter_mut().zip(x.as_array()) {
            sim.update(value, y);
        }
        Ok(())
    }

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        let dim = (!self.similarities.is_empty()).then_some(self.similarities.len());
        check_dimension(dim, x, "SelectKBest input")?;
        Ok(select(x, &self.kept(x.dimension())))
    }
}

impl Estimator for SelectKBest {
    fn name(&self) -> String {
        "SelectKBest".to_string()
    }

    fn params(&self) -> Value {
        json!({ "similarity": describe_bivariate(self.similarity.as_ref()), "k": self.k })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Transformer);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![
        EstimatorType::new(
            "feature_selection",
            "SelectKBest",
            &[Capability::Transformer],
            &[Family::SelectKBest],
            Constructor::WithBivariate(|similarity| boxed(SelectKBest::new(similarity, 10))),
        ),
        EstimatorType::new(
            "feature_selection",
            "VarianceThreshold",
            &[Capability::Transformer],
            &[Family::VarianceThreshold],
            Constructor::Default(|| boxed(VarianceThreshold::default())),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::stats::PearsonCorrelation;

    #[test]
    fn test_variance_threshold_drops_constant_features() {
        let mut selector = VarianceThreshold::default();
        let x = FeatureVector::new(vec![1.0, 5.0, 3.0]);
        assert_eq!(selector.transform_one(&x).unwrap().dimension(), 3);

        for v in [1.0, 2.0, 3.0] {
            selector.learn_one(&FeatureVector::new(vec![v, 5.0, -v]), None).unwrap();
        }
        let out = selector.transform_one(&x).unwrap();
        assert_eq!(out, FeatureVector::new(vec![1.0, 3.0]));
    }

    #[test]
    fn test_select_k_best_keeps_correlated_features() {
        let mut selector = SelectKBest::new(Box::new(PearsonCorrelation::new()), 1);
        for i in 0..10 {
            let v = i as f64;
            let noise = if i % 2 == 0 { 1.0 } else { -1.0 };
            selector
                .learn_one(&FeatureVector::new(vec![noise, v]), Some(2.0 * v))
                .unwrap();
        }
        let out = selector.transform_one(&FeatureVector::new(vec![10.0, 20.0])).unwrap();
        assert_eq!(out, FeatureVector::new(vec![20.0]));
    }

    #[test]
    fn test_select_k_best_requires_a_target() {
        let mut selector = SelectKBest::new(Box::new(PearsonCorrelation::new()), 2);
        let err = selector.learn_one(&FeatureVector::new(vec![1.0]), None).unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidParameter(_)));
        // before learning the first k features pass through
        let out = selector.transform_one(&FeatureVector::new(vec![1.0, 2.0, 3.0])).unwrap();
        assert_eq!(out, FeatureVector::new(vec![1.0, 2.0]));
    }
}
