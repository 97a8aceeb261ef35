//! Estimator sub-packages. Each one lists the types it provides through an
//! `estimators()` function, which the harness registry collects.

pub mod cluster;
pub mod compose;
pub mod dummy;
pub mod ensemble;
pub mod feature_selection;
pub mod linear_model;
pub mod meta;
pub mod multiclass;
pub mod naive_bayes;
pub mod preprocessing;
