use ndarray::Array1;
use serde_json::{json, Value};

use crate::stats::{Univariate, Var};
use crate::traits::estimator::{
    check_dimension, expose_roles, Capability, Estimator, EstimatorError, Transformer,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

fn safe_div(a: f64, b: f64) -> f64 {
    if b == 0.0 {
        0.0
    } else {
        a / b
    }
}

/// Scales each feature to zero mean and unit variance, using running statistics.
///
/// Before any learning every output is zero.
#[derive(Debug, Clone, Default)]
pub struct StandardScaler {
    vars: Vec<Var>,
}

impl StandardScaler {
    pub fn new() -> Self {
        Self::default()
    }

    fn dimension(&self) -> Option<usize> {
        if self.vars.is_empty() {
            None
        } else {
            Some(self.vars.len())
        }
    }
}

impl Transformer for StandardScaler {
    fn learn_one(&mut self, x: &FeatureVector, _y: Option<f64>) -> Result<(), EstimatorError> {
        check_dimension(self.dimension(), x, "StandardScaler input")?;
        if self.vars.is_empty() {
            self.vars = vec![Var::new(0); x.dimension()];
        }
        for (var, &value) in self.vars.iter_mut().zip(x.as_array()) {
            var.update(value);
        }
        Ok(())
    }

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        check_dimension(self.dimension(), x, "StandardScaler input")?;
        if self.vars.is_empty() {
            return Ok(FeatureVector::from_array(Array1::zeros(x.dimension())));
        }
        let scaled = x
            .as_array()
            .iter()
            .zip(&self.vars)
            .map(|(&value, var)| safe_div(value - var.mean(), var.get().sqrt()))
            .collect();
        Ok(FeatureVector::new(scaled))
    }
}

impl Estimator for StandardScaler {
    fn name(&self) -> String {
        "StandardScaler".to_string()
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Transformer);
}

/// Scales each feature into `[0, 1]` using the running min and max.
#[derive(Debug, Clone, Default)]
pub struct MinMaxScaler {
    min: Option<Array1<f64>>,
    max: Option<Array1<f64>>,
}

impl MinMaxScaler {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Transformer for MinMaxScaler {
    fn learn_one(&mut self, x: &FeatureVector, _y: Option<f64>) -> Result<(), EstimatorError> {
        check_dimension(self.min.as_ref().map(|m| m.len()), x, "MinMaxScaler input")?;
        let values = x.as_array();
        if self.min.is_none() || self.max.is_none() {
            self.min = Some(values.clone());
            self.max = Some(values.clone());
            return Ok(());
        }
        if let Some(min) = self.min.as_mut() {
            min.zip_mut_with(values, |m, &v| *m = m.min(v));
        }
        if let Some(max) = self.max.as_mut() {
            max.zip_mut_with(values, |m, &v| *m = m.max(v));
        }
        Ok(())
    }

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        check_dimension(self.min.as_ref().map(|m| m.len()), x, "MinMaxScaler input")?;
        let (min, max) = match (&self.min, &self.max) {
            (Some(min), Some(max)) => (min, max),
            _ => return Ok(FeatureVector::from_array(Array1::zeros(x.dimension()))),
        };
        let scaled = x
            .as_array()
            .iter()
            .zip(min.iter().zip(max.iter()))
            .map(|(&value, (&lo, &hi))| safe_div(value - lo, hi - lo))
            .collect();
        Ok(FeatureVector::new(scaled))
    }
}

impl Estimator for MinMaxScaler {
    fn name(&self) -> String {
        "MinMaxScaler".to_string()
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Transformer);
}

/// Index tuples of every monomial of degree `1..=degree`, lowest degree first.
fn monomials(n_features: usize, degree: usize, interaction_only: bool) -> Vec<Vec<usize>> {
    let mut all = Vec::new();
    let mut frontier: Vec<Vec<usize>> = vec![Vec::new()];
    for _ in 0..degree {
        frontier = frontier
            .iter()
            .flat_map(|combo| {
                let start = match combo.last() {
                    Some(&last) if interaction_only => last + 1,
                    Some(&last) => last,
                    None => 0,
                };
                (start..n_features).map(move |j| {
                    let mut next = combo.clone();
                    next.push(j);
                    next
                })
            })
            .collect();
        all.extend(frontier.iter().cloned());
    }
    all
}

/// Appends polynomial combinations of the features up to `degree`.
///
/// Stateless: learning is a no-op and the output width depends only on the
/// input width.
#[derive(Debug, Clone)]
pub struct PolynomialExtender {
    degree: usize,
    /// Drop products that repeat a feature, such as `x0 * x0`
    interaction_only: bool,
    /// Prepend a constant 1
    include_bias: bool,
}

impl PolynomialExtender {
    pub fn new(degree: usize, interaction_only: bool, include_bias: bool) -> Result<Self, EstimatorError> {
        if degree == 0 {
            return Err(EstimatorError::InvalidParameter("degree must be positive".to_string()));
        }
        Ok(Self { degree, interaction_only, include_bias })
    }
}

impl Default for PolynomialExtender {
    fn default() -> Self {
        Self { degree: 2, interaction_only: false, include_bias: false }
    }
}

impl Transformer for PolynomialExtender {
    fn learn_one(&mut self, _x: &FeatureVector, _y: Option<f64>) -> Result<(), EstimatorError> {
        Ok(())
    }

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        let values = x.as_array();
        let mut out = Vec::new();
        if self.include_bias {
            out.push(1.0);
        }
        for combo in monomials(x.dimension(), self.degree, self.interaction_only) {
            out.push(combo.iter().map(|&j| values[j]).product::<f64>());
        }
        Ok(FeatureVector::new(out))
    }
}

impl Estimator for PolynomialExtender {
    fn name(&self) -> String {
        "PolynomialExtender".to_string()
    }

    fn params(&self) -> Value {
        json!({
            "degree": self.degree,
            "interaction_only": self.interaction_only,
            "include_bias": self.include_bias,
        })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Transformer);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![
        EstimatorType::new(
            "preprocessing",
            "MinMaxScaler",
            &[Capability::Transformer],
            &[Family::Scaler],
            Constructor::Default(|| boxed(MinMaxScaler::new())),
        ),
        EstimatorType::new(
            "preprocessing",
            "PolynomialExtender",
            &[Capability::Transformer],
            &[Family::PolynomialExtender],
            Constructor::Default(|| boxed(PolynomialExtender::default())),
        ),
        EstimatorType::new(
            "preprocessing",
            "StandardScaler",
            &[Capability::Transformer],
            &[Family::Scaler],
            Constructor::Default(|| boxed(StandardScaler::new())),
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_standard_scaler() {
        let mut scaler = StandardScaler::new();
        for v in [1.0, 2.0, 3.0, 4.0, 5.0] {
            scaler.learn_one(&FeatureVector::new(vec![v, 7.0]), None).unwrap();
        }
        let out = scaler.transform_one(&FeatureVector::new(vec![3.0, 7.0])).unwrap();
        assert!(out.as_array()[0].abs() < 1e-12);
        // constant feature has zero variance
        assert_eq!(out.as_array()[1], 0.0);

        let out = scaler.transform_one(&FeatureVector::new(vec![5.0, 7.0])).unwrap();
        assert!((out.as_array()[0] - 2.0 / 2f64.sqrt()).abs() < 1e-12);
    }

    #[test]
    fn test_standard_scaler_before_learning() {
        let scaler = StandardScaler::new();
        let out = scaler.transform_one(&FeatureVector::new(vec![3.0, -1.0])).unwrap();
        assert_eq!(out, FeatureVector::new(vec![0.0, 0.0]));
    }

    #[test]
    fn test_min_max_scaler() {
        let mut scaler = MinMaxScaler::new();
        scaler.learn_one(&FeatureVector::new(vec![0.0, 1.0]), None).unwrap();
        scaler.learn_one(&FeatureVector::new(vec![10.0, 1.0]), None).unwrap();
        let out = scaler.transform_one(&FeatureVector::new(vec![2.5, 1.0])).unwrap();
        assert_eq!(out, FeatureVector::new(vec![0.25, 0.0]));

        let err = scaler.learn_one(&FeatureVector::new(vec![1.0]), None).unwrap_err();
        assert!(matches!(err, EstimatorError::DimensionMismatch { .. }));
    }

    #[test]
    fn test_polynomial_extender_degree_two() {
        let x = FeatureVector::new(vec![2.0, 3.0]);
        let full = PolynomialExtender::default().transform_one(&x).unwrap();
        // x0, x1, x0*x0, x0*x1, x1*x1
        assert_eq!(full, FeatureVector::new(vec![2.0, 3.0, 4.0, 6.0, 9.0]));

        let interactions = PolynomialExtender::new(2, true, true).unwrap().transform_one(&x).unwrap();
        assert_eq!(interactions, FeatureVector::new(vec![1.0, 2.0, 3.0, 6.0]));
    }

    #[test]
    fn test_polynomial_extender_width() {
        let mut extender = PolynomialExtender::new(3, false, false).unwrap();
        let x = FeatureVector::new(vec![1.0, -1.0, 0.5, 2.0]);
        extender.learn_one(&x, Some(1.0)).unwrap();
        // 4 + 10 + 20 monomials
        assert_eq!(extender.transform_one(&x).unwrap().dimension(), 34);
        assert!(PolynomialExtender::new(0, false, false).is_err());
    }
}
