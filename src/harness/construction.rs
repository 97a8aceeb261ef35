use thiserror::Error;

use crate::models::cluster::KMeans;
use crate::models::compose::{Pipeline, TransformerUnion};
use crate::models::feature_selection::{SelectKBest, VarianceThreshold};
use crate::models::linear_model::{LinearRegression, LogisticRegression, PAClassifier, PARegressor};
use crate::models::multiclass::OneVsRestClassifier;
use crate::models::naive_bayes::GaussianNB;
use crate::models::preprocessing::{MinMaxScaler, PolynomialExtender, StandardScaler};
use crate::stats::{Mean, PearsonCorrelation};
use crate::traits::estimator::{describe, Capabilities, Capability, Estimator, EstimatorError};
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

use super::registry::registry;

/// Errors raised while building an instance of a registered type.
///
/// Any of these points at a registration defect, so callers treat them as fatal.
#[derive(Error, Debug)]
pub enum ConstructionError {
    #[error("{type_name}: recipe '{recipe}' cannot use a constructor of shape '{shape}'")]
    SignatureMismatch {
        type_name: String,
        recipe: &'static str,
        shape: &'static str,
    },
    #[error("{0} has no constructor the harness can call")]
    NotConstructible(String),
    #[error("{type_name} declares {declared} but the built instance provides {actual}")]
    CapabilityMismatch {
        type_name: String,
        declared: Capabilities,
        actual: Capabilities,
    },
    #[error("Estimator error during construction: {0}")]
    Estimator(#[from] EstimatorError),
}

pub type BuildOutcome = Result<Box<dyn Estimator>, ConstructionError>;

/// A rule that builds the types it applies to.
#[derive(Clone, Copy)]
pub struct Recipe {
    pub name: &'static str,
    pub applies: fn(&EstimatorType) -> bool,
    pub build: fn(&EstimatorType) -> BuildOutcome,
}

/// An instance ready to be certified, tagged with a stable identifier.
#[derive(Debug, Clone)]
pub struct Subject {
    pub id: String,
    pub estimator: Box<dyn Estimator>,
}

impl Subject {
    pub fn new(id: impl Into<String>, estimator: Box<dyn Estimator>) -> Self {
        Self { id: id.into(), estimator }
    }

    /// Identified by its name and parameters.
    pub fn described(estimator: Box<dyn Estimator>) -> Self {
        Self { id: describe(estimator.as_ref()), estimator }
    }
}

/// Recipes in priority order; the first one that applies wins.
pub static RECIPES: &[Recipe] = &[
    Recipe { name: "statistic", applies: is_statistic_regressor, build: with_mean },
    Recipe { name: "box-cox", applies: is_box_cox, build: with_linear_regression },
    Recipe { name: "bagging-classifier", applies: is_bagging_classifier, build: with_logistic_regression },
    Recipe { name: "bagging-regressor", applies: is_bagging_regressor, build: with_linear_regression },
    Recipe { name: "adaboost-classifier", applies: is_adaboost, build: with_logistic_regression },
    Recipe { name: "hedge", applies: is_hedge, build: with_scaled_regressors },
    Recipe { name: "select-k-best", applies: is_select_k_best, build: with_pearson },
    Recipe { name: "scaled-linear", applies: is_linear_regression, build: behind_scaler_with_intercept_lr },
    Recipe { name: "scaled-passive-aggressive", applies: is_pa_regressor, build: behind_scaler },
    Recipe { name: "one-vs-rest", applies: is_one_vs_rest, build: with_logistic_regression },
];

/// Fallback when no recipe applies
pub static DEFAULT_RECIPE: Recipe = Recipe { name: "default", applies: always, build: by_default };

fn always(_: &EstimatorType) -> bool {
    true
}

fn is_statistic_regressor(t: &EstimatorType) -> bool {
    t.belongs_to(Family::StatisticRegressor)
}

fn is_box_cox(t: &EstimatorType) -> bool {
    t.belongs_to(Family::BoxCox)
}

fn is_bagging_classifier(t: &EstimatorType) -> bool {
    t.belongs_to(Family::Bagging) && t.declares(Capability::Classifier)
}

fn is_bagging_regressor(t: &EstimatorType) -> bool {
    t.belongs_to(Family::Bagging) && t.declares(Capability::Regressor)
}

fn is_adaboost(t: &EstimatorType) -> bool {
    t.belongs_to(Family::AdaBoost)
}

fn is_hedge(t: &EstimatorType) -> bool {
    t.belongs_to(Family::Hedge)
}

fn is_select_k_best(t: &EstimatorType) -> bool {
    t.belongs_to(Family::SelectKBest)
}

fn is_linear_regression(t: &EstimatorType) -> bool {
    t.belongs_to(Family::LinearRegression)
}

fn is_pa_regressor(t: &EstimatorType) -> bool {
    t.belongs_to(Family::PassiveAggressive) && t.declares(Capability::Regressor)
}

fn is_one_vs_rest(t: &EstimatorType) -> bool {
    t.belongs_to(Family::OneVsRest)
}

fn mismatch(t: &EstimatorType, recipe: &'static str) -> ConstructionError {
    ConstructionError::SignatureMismatch {
        type_name: t.qualified_name(),
        recipe,
        shape: t.constructor.shape(),
    }
}

fn scaled(model: Box<dyn Estimator>) -> BuildOutcome {
    Ok(boxed(Pipeline::new(vec![boxed(StandardScaler::new()), model])?))
}

fn with_mean(t: &EstimatorType) -> BuildOutcome {
    match t.constructor {
        Constructor::WithUnivariate(new) => Ok(new(Box::new(Mean::new()))),
        _ => Err(mismatch(t, "statistic")),
    }
}

fn with_linear_regression(t: &EstimatorType) -> BuildOutcome {
    match t.constructor {
        Constructor::WithRegressor(new) => Ok(new(boxed(LinearRegression::default()))?),
        _ => Err(mismatch(t, "with-linear-regression")),
    }
}

fn with_logistic_regression(t: &EstimatorType) -> BuildOutcome {
    match t.constructor {
        Constructor::WithClassifier(new) => Ok(new(boxed(LogisticRegression::default()))?),
        _ => Err(mismatch(t, "with-logistic-regression")),
    }
}

fn with_scaled_regressors(t: &EstimatorType) -> BuildOutcome {
    match t.constructor {
        Constructor::WithRegressors(new) => {
            let regressors = vec![
                scaled(boxed(LinearRegression::default().with_intercept_lr(SCALED_INTERCEPT_LR)))?,
                scaled(boxed(PARegressor::default()))?,
            ];
            Ok(new(regressors)?)
        }
        _ => Err(mismatch(t, "hedge")),
    }
}

fn with_pearson(t: &EstimatorType) -> BuildOutcome {
    match t.constructor {
        Constructor::WithBivariate(new) => Ok(new(Box::new(PearsonCorrelation::new()))),
        _ => Err(mismatch(t, "select-k-best")),
    }
}

/// Intercept learning rate given to scaled linear regressions
const SCALED_INTERCEPT_LR: f64 = 0.1;

fn behind_scaler_with_intercept_lr(t: &EstimatorType) -> BuildOutcome {
    match t.constructor {
        Constructor::WithInterceptLr(new) => scaled(new(SCALED_INTERCEPT_LR)),
        _ => Err(mismatch(t, "scaled-linear")),
    }
}

fn behind_scaler(t: &EstimatorType) -> BuildOutcome {
    match t.constructor {
        Constructor::Default(new) => scaled(new()),
        _ => Err(mismatch(t, "behind-scaler")),
    }
}

fn by_default(t: &EstimatorType) -> BuildOutcome {
    match t.constructor {
        Constructor::Default(new) => Ok(new()),
        Constructor::Manual => Err(ConstructionError::NotConstructible(t.qualified_name())),
        _ => Err(mismatch(t, "default")),
    }
}

/// The recipe used for `estimator_type`
pub fn resolve(estimator_type: &EstimatorType) -> &'static Recipe {
    RECIPES
        .iter()
        .find(|recipe| (recipe.applies)(estimator_type))
        .unwrap_or(&DEFAULT_RECIPE)
}

/// Builds a ready instance and verifies it provides every declared role.
pub fn build(estimator_type: &EstimatorType) -> BuildOutcome {
    let recipe = resolve(estimator_type);
    log::debug!("Building {} with recipe '{}'", estimator_type.qualified_name(), recipe.name);
    let estimator = (recipe.build)(estimator_type)?;
    let actual = estimator.capabilities();
    if !actual.is_superset(estimator_type.capabilities) {
        return Err(ConstructionError::CapabilityMismatch {
            type_name: estimator_type.qualified_name(),
            declared: estimator_type.capabilities,
            actual,
        });
    }
    Ok(estimator)
}

/// Builds every discovered type, stopping at the first defect.
pub fn build_all() -> Result<Vec<Subject>, ConstructionError> {
    registry()
        .iter()
        .map(|t| Ok(Subject::new(t.qualified_name(), build(t)?)))
        .collect()
}

/// Hand-composed instances certified alongside the discovered types.
pub fn extra_subjects() -> Result<Vec<Subject>, ConstructionError> {
    let scaler = || boxed(StandardScaler::new());
    let estimators: Vec<Box<dyn Estimator>> = vec![
        boxed(LogisticRegression::default()),
        scaled(boxed(LinearRegression::default()))?,
        scaled(boxed(PAClassifier::default()))?,
        scaled(boxed(OneVsRestClassifier::new(boxed(LogisticRegression::default()))?))?,
        scaled(boxed(OneVsRestClassifier::new(boxed(PAClassifier::default()))?))?,
        boxed(GaussianNB::new()),
        scaler(),
        boxed(KMeans::new(5, 0.5, Some(42))?),
        boxed(MinMaxScaler::new()),
        boxed(TransformerUnion::new(vec![boxed(MinMaxScaler::new()), scaler()])?),
        boxed(VarianceThreshold::default()),
        boxed(SelectKBest::new(Box::new(PearsonCorrelation::new()), 10)),
        boxed(PolynomialExtender::default()),
    ];
    Ok(estimators.into_iter().map(Subject::described).collect())
}
