//! Optimisation building blocks shared by gradient-based estimators.

pub mod losses;

pub use losses::Loss;
