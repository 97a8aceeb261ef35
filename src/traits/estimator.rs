use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

use crate::traits::features::FeatureVector;

/// Class identifier used by classifiers
pub type Label = usize;

/// Probability per class, ordered by label
pub type Proba = BTreeMap<Label, f64>;

/// Errors raised by estimators while learning or predicting
#[derive(Error, Debug, Clone, PartialEq)]
pub enum EstimatorError {
    /// Data dimension mismatch errors
    #[error("Dimension mismatch ({context}): expected {expected}, got {actual}")]
    DimensionMismatch {
        expected: usize,
        actual: usize,
        context: String,
    },
    /// Invalid parameter errors
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),
    /// A collaborator estimator does not hold the role its owner needs
    #[error("{context} requires a {role} collaborator")]
    MissingRole { role: Capability, context: String },
}

/// A role an estimator can declare.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Capability {
    Classifier,
    Regressor,
    Transformer,
    Clusterer,
}

impl Capability {
    pub const ALL: [Capability; 4] = [
        Capability::Classifier,
        Capability::Regressor,
        Capability::Transformer,
        Capability::Clusterer,
    ];

    const fn bit(self) -> u8 {
        match self {
            Capability::Classifier => 1,
            Capability::Regressor => 1 << 1,
            Capability::Transformer => 1 << 2,
            Capability::Clusterer => 1 << 3,
        }
    }
}

impl Display for Capability {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let name = match self {
            Capability::Classifier => "Classifier",
            Capability::Regressor => "Regressor",
            Capability::Transformer => "Transformer",
            Capability::Clusterer => "Clusterer",
        };
        f.write_str(name)
    }
}

/// Set of roles. Roles are independent of each other; there is no hierarchy.
#[derive(Clone, Copy, Default, PartialEq, Eq, Hash)]
pub struct Capabilities {
    bits: u8,
}

impl Capabilities {
    pub const EMPTY: Capabilities = Capabilities { bits: 0 };

    pub const fn of(roles: &[Capability]) -> Self {
        let mut bits = 0;
        let mut i = 0;
        while i < roles.len() {
            bits |= roles[i].bit();
            i += 1;
        }
        Self { bits }
    }

    pub const fn with(self, role: Capability) -> Self {
        Self { bits: self.bits | role.bit() }
    }

    pub const fn contains(self, role: Capability) -> bool {
        self.bits & role.bit() != 0
    }

    pub const fn is_superset(self, other: Capabilities) -> bool {
        self.bits & other.bits == other.bits
    }

    pub const fn is_empty(self) -> bool {
        self.bits == 0
    }

    pub fn iter(self) -> impl Iterator<Item = Capability> {
        Capability::ALL.into_iter().filter(move |role| self.contains(*role))
    }
}

impl fmt::Debug for Capabilities {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter()).finish()
    }
}

impl Display for Capabilities {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("none");
        }
        let names: Vec<String> = self.iter().map(|role| role.to_string()).collect();
        f.write_str(&names.join("+"))
    }
}

/// Core trait for online estimators.
///
/// An estimator exposes each role it holds through the `as_*` accessors.
/// Those accessors can only return `Some` for types that implement the
/// matching role trait, so `capabilities` never claims an operation set the
/// type lacks. Use [`expose_roles!`](crate::traits::estimator::expose_roles)
/// to generate them.
pub trait Estimator: Send + Sync + fmt::Debug {
    /// Short type name, e.g. `LinearRegression`
    fn name(&self) -> String;

    /// Hyper-parameters, used to tell instances apart in reports
    fn params(&self) -> Value {
        Value::Null
    }

    /// Deep copy, including every nested estimator
    fn clone_box(&self) -> Box<dyn Estimator>;

    fn as_regressor(&self) -> Option<&dyn Regressor> {
        None
    }

    fn as_regressor_mut(&mut self) -> Option<&mut dyn Regressor> {
        None
    }

    fn as_classifier(&self) -> Option<&dyn Classifier> {
        None
    }

    fn as_classifier_mut(&mut self) -> Option<&mut dyn Classifier> {
        None
    }

    fn as_transformer(&self) -> Option<&dyn Transformer> {
        None
    }

    fn as_transformer_mut(&mut self) -> Option<&mut dyn Transformer> {
        None
    }

    fn as_clusterer(&self) -> Option<&dyn Clusterer> {
        None
    }

    fn as_clusterer_mut(&mut self) -> Option<&mut dyn Clusterer> {
        None
    }

    /// Roles this instance satisfies
    fn capabilities(&self) -> Capabilities {
        let mut caps = Capabilities::EMPTY;
        if self.as_classifier().is_some() {
            caps = caps.with(Capability::Classifier);
        }
        if self.as_regressor().is_some() {
            caps = caps.with(Capability::Regressor);
        }
        if self.as_transformer().is_some() {
            caps = caps.with(Capability::Transformer);
        }
        if self.as_clusterer().is_some() {
            caps = caps.with(Capability::Clusterer);
        }
        caps
    }
}

impl Clone for Box<dyn Estimator> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Name plus parameters, e.g. `LinearRegression({"lr":0.01})`.
pub fn describe(estimator: &dyn Estimator) -> String {
    match estimator.params() {
        Value::Null => estimator.name(),
        Value::Object(map) if map.is_empty() => estimator.name(),
        params => format!("{}({})", estimator.name(), params),
    }
}

/// Predicts a real-valued target.
pub trait Regressor {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError>;

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError>;
}

/// Predicts a class label.
pub trait Classifier {
    fn learn_one(&mut self, x: &FeatureVector, y: Label) -> Result<(), EstimatorError>;

    /// Probability of each known class. May be empty before any learning.
    fn predict_proba_one(&self, x: &FeatureVector) -> Result<Proba, EstimatorError>;

    /// Most probable class, lowest label on ties
    fn predict_one(&self, x: &FeatureVector) -> Result<Option<Label>, EstimatorError> {
        let proba = self.predict_proba_one(x)?;
        let mut best: Option<(Label, f64)> = None;
        for (&label, &p) in &proba {
            match best {
                Some((_, best_p)) if p <= best_p => {}
                _ => best = Some((label, p)),
            }
        }
        Ok(best.map(|(label, _)| label))
    }

    /// Binary classifiers treat any non-zero label as the positive class.
    fn is_multiclass(&self) -> bool {
        false
    }
}

/// Maps an example to a new feature vector.
pub trait Transformer {
    /// Supervised transformers use `y`; the others ignore it.
    fn learn_one(&mut self, x: &FeatureVector, y: Option<f64>) -> Result<(), EstimatorError>;

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError>;
}

/// Assigns an example to a cluster.
pub trait Clusterer {
    fn learn_one(&mut self, x: &FeatureVector) -> Result<(), EstimatorError>;

    fn predict_one(&self, x: &FeatureVector) -> Result<usize, EstimatorError>;
}

/// Generates the `as_*` accessors of [`Estimator`] for the listed roles.
macro_rules! expose_roles {
    (@role Regressor) => {
        fn as_regressor(&self) -> Option<&dyn $crate::traits::estimator::Regressor> {
            Some(self)
        }
        fn as_regressor_mut(&mut self) -> Option<&mut dyn $crate::traits::estimator::Regressor> {
            Some(self)
        }
    };
    (@role Classifier) => {
        fn as_classifier(&self) -> Option<&dyn $crate::traits::estimator::Classifier> {
            Some(self)
        }
        fn as_classifier_mut(&mut self) -> Option<&mut dyn $crate::traits::estimator::Classifier> {
            Some(self)
        }
    };
    (@role Transformer) => {
        fn as_transformer(&self) -> Option<&dyn $crate::traits::estimator::Transformer> {
            Some(self)
        }
        fn as_transformer_mut(&mut self) -> Option<&mut dyn $crate::traits::estimator::Transformer> {
            Some(self)
        }
    };
    (@role Clusterer) => {
        fn as_clusterer(&self) -> Option<&dyn $crate::traits::estimator::Clusterer> {
            Some(self)
        }
        fn as_clusterer_mut(&mut self) -> Option<&mut dyn $crate::traits::estimator::Clusterer> {
            Some(self)
        }
    };
    ($($role:ident),+ $(,)?) => {
        $( $crate::traits::estimator::expose_roles!(@role $role); )+
    };
}

pub(crate) use expose_roles;

/// Checks that a collaborator holds `role`, naming `owner` in the error.
pub(crate) fn require_role(
    estimator: &dyn Estimator,
    role: Capability,
    owner: &str,
) -> Result<(), EstimatorError> {
    if estimator.capabilities().contains(role) {
        Ok(())
    } else {
        Err(EstimatorError::MissingRole {
            role,
            context: format!("{} (got {})", owner, estimator.name()),
        })
    }
}

/// Validates the width of `x` against a dimension fixed by earlier examples.
pub(crate) fn check_dimension(
    expected: Option<usize>,
    x: &FeatureVector,
    context: &str,
) -> Result<(), EstimatorError> {
    match expected {
        Some(expected) if expected != x.dimension() => Err(EstimatorError::DimensionMismatch {
            expected,
            actual: x.dimension(),
            context: context.to_string(),
        }),
        _ => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, Default)]
    struct Constant {
        value: f64,
    }

    impl Regressor for Constant {
        fn learn_one(&mut self, _x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
            self.value = y;
            Ok(())
        }

        fn predict_one(&self, _x: &FeatureVector) -> Result<f64, EstimatorError> {
            Ok(self.value)
        }
    }

    impl Estimator for Constant {
        fn name(&self) -> String {
            "Constant".to_string()
        }

        fn clone_box(&self) -> Box<dyn Estimator> {
            Box::new(self.clone())
        }

        expose_roles!(Regressor);
    }

    struct Fixed(Proba);

    impl Classifier for Fixed {
        fn learn_one(&mut self, _x: &FeatureVector, _y: Label) -> Result<(), EstimatorError> {
            Ok(())
        }

        fn predict_proba_one(&self, _x: &FeatureVector) -> Result<Proba, EstimatorError> {
            Ok(self.0.clone())
        }
    }

    #[test]
    fn test_capabilities_follow_exposed_roles() {
        let model = Constant::default();
        let caps = model.capabilities();
        assert!(caps.contains(Capability::Regressor));
        assert!(!caps.contains(Capability::Classifier));
        assert_eq!(caps.to_string(), "Regressor");
        assert!(model.as_transformer().is_none());
    }

    #[test]
    fn test_capability_set_operations() {
        let both = Capabilities::of(&[Capability::Transformer, Capability::Regressor]);
        assert!(both.is_superset(Capabilities::of(&[Capability::Regressor])));
        assert!(!both.is_superset(Capabilities::of(&[Capability::Clusterer])));
        assert_eq!(both.iter().count(), 2);
        assert_eq!(both.to_string(), "Regressor+Transformer");
        assert_eq!(Capabilities::EMPTY.to_string(), "none");
    }

    #[test]
    fn test_boxed_clone_is_deep() {
        let mut original: Box<dyn Estimator> = Box::new(Constant { value: 1.0 });
        let copy = original.clone();
        let x = FeatureVector::new(vec![0.0]);
        original.as_regressor_mut().unwrap().learn_one(&x, 5.0).unwrap();
        assert_eq!(copy.as_regressor().unwrap().predict_one(&x).unwrap(), 1.0);
        assert_eq!(original.as_regressor().unwrap().predict_one(&x).unwrap(), 5.0);
    }

    #[test]
    fn test_predict_one_is_argmax_with_low_label_on_ties() {
        let x = FeatureVector::new(vec![]);
        let fixed = Fixed(Proba::from([(0, 0.25), (1, 0.5), (2, 0.25)]));
        assert_eq!(fixed.predict_one(&x).unwrap(), Some(1));

        let tied = Fixed(Proba::from([(3, 0.5), (7, 0.5)]));
        assert_eq!(tied.predict_one(&x).unwrap(), Some(3));

        assert_eq!(Fixed(Proba::new()).predict_one(&x).unwrap(), None);
    }

    #[test]
    fn test_describe_includes_params() {
        let model = Constant::default();
        assert_eq!(describe(&model), "Constant");
    }

    #[test]
    fn test_require_role() {
        let model = Constant::default();
        assert!(require_role(&model, Capability::Regressor, "Owner").is_ok());
        let err = require_role(&model, Capability::Classifier, "Owner").unwrap_err();
        assert!(matches!(err, EstimatorError::MissingRole { role: Capability::Classifier, .. }));
    }
}
