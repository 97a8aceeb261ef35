//! streamlearn: online estimators and their conformance harness
//!
//! Estimators learn one example at a time and expose their roles
//! (regressor, classifier, transformer, clusterer) through the
//! [`Estimator`] trait. The harness discovers every registered estimator,
//! builds a working instance of each and certifies it against the
//! behaviour its roles promise.

pub mod traits;
pub mod optim;
pub mod stats;
pub mod models;
pub mod harness;

// Re-export key types for ergonomic use
pub use traits::features::FeatureVector;
pub use traits::estimator::{
    Capabilities, Capability, Classifier, Clusterer, Estimator, EstimatorError, Label, Proba,
    Regressor, Transformer,
};
pub use traits::registration::{Constructor, EstimatorType, Family};
pub use optim::Loss;

// Re-export harness entry points
pub use harness::{
    certify,
    HarnessConfig,
    HarnessError,
    Summary,
    CheckReport,
    Violation,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_library_exports() {
        // Verify that key types are exported and accessible
        let _feature = FeatureVector::new(vec![1.0, 2.0, 3.0]);
        let _config = HarnessConfig::default();
        let _loss = Loss::default();
        assert!(!harness::registry().is_empty());
    }
}
