use std::fmt;

use crate::stats::{Bivariate, Univariate};
use crate::traits::estimator::{Capabilities, Capability, Estimator, EstimatorError};

/// Type family markers.
///
/// Rust has no subclassing, so a type lists every family it belongs to,
/// including the families of the type it specializes. Exclusion and
/// construction rules match on families, which makes them apply to every
/// specialization of a family at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Family {
    LinearRegression,
    Ridge,
    LogisticRegression,
    PassiveAggressive,
    Scaler,
    PolynomialExtender,
    VarianceThreshold,
    SelectKBest,
    StatisticRegressor,
    Prior,
    BoxCox,
    PredClipper,
    Bagging,
    AdaBoost,
    Hedge,
    OneVsRest,
    NaiveBayes,
    KMeans,
    Pipeline,
    TransformerUnion,
    FuncTransformer,
    /// Bridges to estimators from other frameworks
    Adapter,
}

pub type BuildResult = Result<Box<dyn Estimator>, EstimatorError>;

/// Shape of a type's constructor.
#[derive(Clone, Copy)]
pub enum Constructor {
    /// No arguments needed
    Default(fn() -> Box<dyn Estimator>),
    /// Takes the learning rate of the intercept
    WithInterceptLr(fn(f64) -> Box<dyn Estimator>),
    /// Needs a regressor to wrap or replicate
    WithRegressor(fn(Box<dyn Estimator>) -> BuildResult),
    /// Needs a classifier to wrap or replicate
    WithClassifier(fn(Box<dyn Estimator>) -> BuildResult),
    /// Needs a list of regressors
    WithRegressors(fn(Vec<Box<dyn Estimator>>) -> BuildResult),
    /// Needs a univariate statistic
    WithUnivariate(fn(Box<dyn Univariate>) -> Box<dyn Estimator>),
    /// Needs a bivariate statistic
    WithBivariate(fn(Box<dyn Bivariate>) -> Box<dyn Estimator>),
    /// Needs arguments that cannot be chosen generically
    Manual,
}

impl Constructor {
    pub fn shape(&self) -> &'static str {
        match self {
            Constructor::Default(_) => "default",
            Constructor::WithInterceptLr(_) => "intercept learning rate",
            Constructor::WithRegressor(_) => "regressor",
            Constructor::WithClassifier(_) => "classifier",
            Constructor::WithRegressors(_) => "regressor list",
            Constructor::WithUnivariate(_) => "univariate statistic",
            Constructor::WithBivariate(_) => "bivariate statistic",
            Constructor::Manual => "manual",
        }
    }
}

impl fmt::Debug for Constructor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Constructor({})", self.shape())
    }
}

/// Registration record for a concrete estimator type.
#[derive(Debug, Clone, Copy)]
pub struct EstimatorType {
    pub module: &'static str,
    pub name: &'static str,
    pub capabilities: Capabilities,
    pub families: &'static [Family],
    pub constructor: Constructor,
}

impl EstimatorType {
    pub const fn new(
        module: &'static str,
        name: &'static str,
        capabilities: &[Capability],
        families: &'static [Family],
        constructor: Constructor,
    ) -> Self {
        Self {
            module,
            name,
            capabilities: Capabilities::of(capabilities),
            families,
            constructor,
        }
    }

    /// `module::Name`
    pub fn qualified_name(&self) -> String {
        format!("{}::{}", self.module, self.name)
    }

    pub fn belongs_to(&self, family: Family) -> bool {
        self.families.contains(&family)
    }

    pub fn declares(&self, role: Capability) -> bool {
        self.capabilities.contains(role)
    }
}

impl PartialEq for EstimatorType {
    fn eq(&self, other: &Self) -> bool {
        self.module == other.module
            && self.name == other.name
            && self.capabilities == other.capabilities
            && self.families == other.families
            && self.constructor.shape() == other.constructor.shape()
    }
}

impl Eq for EstimatorType {}

/// Boxes an estimator for use in constructors.
pub fn boxed<E: Estimator + 'static>(estimator: E) -> Box<dyn Estimator> {
    Box::new(estimator)
}
