pub mod estimator;
pub mod features;
pub mod registration;
