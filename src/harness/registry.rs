use std::sync::OnceLock;

use crate::models::{
    cluster, compose, dummy, ensemble, feature_selection, linear_model, meta, multiclass,
    naive_bayes, preprocessing,
};
use crate::traits::registration::{EstimatorType, Family};

/// Sub-packages scanned for estimators, in discovery order.
pub const SUBPACKAGES: &[(&str, fn() -> Vec<EstimatorType>)] = &[
    ("linear_model", linear_model::estimators),
    ("preprocessing", preprocessing::estimators),
    ("feature_selection", feature_selection::estimators),
    ("dummy", dummy::estimators),
    ("meta", meta::estimators),
    ("ensemble", ensemble::estimators),
    ("multiclass", multiclass::estimators),
    ("naive_bayes", naive_bayes::estimators),
    ("cluster", cluster::estimators),
    ("compose", compose::estimators),
];

/// Families that are never certified generically.
///
/// Membership is checked by family, so every type that specializes one of
/// these families is excluded as well.
pub const IGNORED: &[Family] = &[
    Family::Adapter,
    Family::FuncTransformer,
    Family::Pipeline,
    Family::PredClipper,
    Family::TransformerUnion,
];

pub fn is_ignored(estimator_type: &EstimatorType) -> bool {
    IGNORED.iter().any(|family| estimator_type.belongs_to(*family))
}

/// Every certifiable estimator type, in a deterministic order.
pub fn discover() -> Vec<EstimatorType> {
    let mut found = Vec::new();
    for (subpackage, registered) in SUBPACKAGES {
        for estimator_type in registered() {
            if is_ignored(&estimator_type) {
                log::debug!("Skipping {}: ignored family", estimator_type.qualified_name());
                continue;
            }
            if estimator_type.capabilities.is_empty() {
                log::debug!("Skipping {}: no declared capability", estimator_type.qualified_name());
                continue;
            }
            found.push(estimator_type);
        }
        log::trace!("Scanned sub-package {}", subpackage);
    }
    found
}

/// Cached result of [`discover`]
pub fn registry() -> &'static [EstimatorType] {
    static REGISTRY: OnceLock<Vec<EstimatorType>> = OnceLock::new();
    REGISTRY.get_or_init(discover)
}

/// Look up a discovered type by its `module::Name`
pub fn find(qualified_name: &str) -> Option<&'static EstimatorType> {
    registry().iter().find(|t| t.qualified_name() == qualified_name)
}
