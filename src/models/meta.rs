use serde_json::{json, Value};

use crate::traits::estimator::{
    describe, expose_roles, require_role, Capability, Estimator, EstimatorError, Regressor,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

fn inner_regressor<'a>(regressor: &'a dyn Estimator, owner: &str) -> Result<&'a dyn Regressor, EstimatorError> {
    regressor.as_regressor().ok_or_else(|| EstimatorError::MissingRole {
        role: Capability::Regressor,
        context: owner.to_string(),
    })
}

fn inner_regressor_mut<'a>(
    regressor: &'a mut dyn Estimator,
    owner: &str,
) -> Result<&'a mut dyn Regressor, EstimatorError> {
    regressor.as_regressor_mut().ok_or_else(|| EstimatorError::MissingRole {
        role: Capability::Regressor,
        context: owner.to_string(),
    })
}

/// Fits the wrapped regressor on Box-Cox transformed targets.
#[derive(Debug, Clone)]
pub struct BoxCoxRegressor {
    regressor: Box<dyn Estimator>,
    power: f64,
}

impl BoxCoxRegressor {
    pub fn new(regressor: Box<dyn Estimator>, power: f64) -> Result<Self, EstimatorError> {
        require_role(regressor.as_ref(), Capability::Regressor, "BoxCoxRegressor")?;
        Ok(Self { regressor, power })
    }

    fn forward(&self, y: f64) -> f64 {
        if self.power == 0.0 {
            y.ln()
        } else {
            (y.powf(self.power) - 1.0) / self.power
        }
    }

    fn inverse(&self, z: f64) -> f64 {
        if self.power == 0.0 {
            z.exp()
        } else {
            (self.power * z + 1.0).powf(1.0 / self.power)
        }
    }
}

impl Regressor for BoxCoxRegressor {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        let z = self.forward(y);
        if !z.is_finite() {
            return Err(EstimatorError::InvalidParameter(format!(
                "Box-Cox transform with power {} is undefined for target {}",
                self.power, y
            )));
        }
        inner_regressor_mut(self.regressor.as_mut(), "BoxCoxRegressor")?.learn_one(x, z)
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        let z = inner_regressor(self.regressor.as_ref(), "BoxCoxRegressor")?.predict_one(x)?;
        Ok(self.inverse(z))
    }
}

impl Estimator for BoxCoxRegressor {
    fn name(&self) -> String {
        "BoxCoxRegressor".to_string()
    }

    fn params(&self) -> Value {
        json!({ "regressor": describe(self.regressor.as_ref()), "power": self.power })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Regressor);
}

/// Clips the wrapped regressor's predictions into `[min, max]`.
#[derive(Debug, Clone)]
pub struct PredClipper {
    regressor: Box<dyn Estimator>,
    min: f64,
    max: f64,
}

impl PredClipper {
    pub fn new(regressor: Box<dyn Estimator>, min: f64, max: f64) -> Result<Self, EstimatorError> {
        require_role(regressor.as_ref(), Capability::Regressor, "PredClipper")?;
        if min > max {
            return Err(EstimatorError::InvalidParameter(format!(
                "PredClipper bounds are inverted: {} > {}",
                min, max
            )));
        }
        Ok(Self { regressor, min, max })
    }
}

impl Regressor for PredClipper {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        inner_regressor_mut(self.regressor.as_mut(), "PredClipper")?.learn_one(x, y)
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        let y = inner_regressor(self.regressor.as_ref(), "PredClipper")?.predict_one(x)?;
        Ok(y.clamp(self.min, self.max))
    }
}

impl Estimator for PredClipper {
    fn name(&self) -> String {
        "PredClipper".to_string()
    }

    fn params(&self) -> Value {
        json!({ "regressor": describe(self.regressor.as_ref()), "min": self.min, "max": self.max })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Regressor);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![
        EstimatorType::new(
            "meta",
            "BoxCoxRegressor",
            &[Capability::Regressor],
            &[Family::BoxCox],
            Constructor::WithRegressor(|regressor| BoxCoxRegressor::new(regressor, 1.0).map(boxed)),
        ),
        EstimatorType::new(
            "meta",
            "PredClipper",
            &[Capability::Regressor],
            &[Family::PredClipper],
            Constructor::Manual,
        ),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::dummy::StatisticRegressor;
    use crate::models::preprocessing::StandardScaler;
    use crate::stats::Mean;

    fn mean_regressor() -> Box<dyn Estimator> {
        Box::new(StatisticRegressor::new(Box::new(Mean::new())))
    }

    #[test]
    fn test_box_cox_round_trips_through_the_inner_model() {
        let mut model = BoxCoxRegressor::new(mean_regressor(), 0.0).unwrap();
        let x = FeatureVector::new(vec![1.0]);
        for y in [1.0, 100.0] {
            model.learn_one(&x, y).unwrap();
        }
        // geometric mean of 1 and 100
        assert!((model.predict_one(&x).unwrap() - 10.0).abs() < 1e-9);

        let err = model.learn_one(&x, -1.0).unwrap_err();
        assert!(matches!(err, EstimatorError::InvalidParameter(_)));
    }

    #[test]
    fn test_wrappers_reject_non_regressors() {
        let err = BoxCoxRegressor::new(Box::new(StandardScaler::new()), 1.0).unwrap_err();
        assert!(matches!(err, EstimatorError::MissingRole { role: Capability::Regressor, .. }));
        assert!(PredClipper::new(mean_regressor(), 1.0, 0.0).is_err());
    }

    #[test]
    fn test_pred_clipper() {
        let mut model = PredClipper::new(mean_regressor(), -1.0, 1.0).unwrap();
        let x = FeatureVector::new(vec![]);
        model.learn_one(&x, 5.0).unwrap();
        assert_eq!(model.predict_one(&x).unwrap(), 1.0);
        assert!(model.params()["regressor"].as_str().unwrap().contains("StatisticRegressor"));
    }
}
