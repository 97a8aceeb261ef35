//! Running statistics, updated one value at a time.
//!
//! Statistics are not estimators. They are collaborators injected into
//! estimators such as `StatisticRegressor` and `SelectKBest`.

use std::fmt;

use serde_json::{json, Value};

/// Statistic over a single stream of values.
pub trait Univariate: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn update(&mut self, x: f64);

    /// Current value; `0.0` before any update.
    fn get(&self) -> f64;

    fn clone_box(&self) -> Box<dyn Univariate>;
}

/// Statistic over a stream of pairs.
pub trait Bivariate: Send + Sync + fmt::Debug {
    fn name(&self) -> &'static str;

    fn update(&mut self, x: f64, y: f64);

    /// Current value; `0.0` until enough pairs have been seen.
    fn get(&self) -> f64;

    fn clone_box(&self) -> Box<dyn Bivariate>;
}

impl Clone for Box<dyn Univariate> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

impl Clone for Box<dyn Bivariate> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Running mean.
#[derive(Debug, Clone, Default)]
pub struct Mean {
    n: f64,
    mean: f64,
}

impl Mean {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self) -> f64 {
        self.n
    }
}

impl Univariate for Mean {
    fn name(&self) -> &'static str {
        "Mean"
    }

    fn update(&mut self, x: f64) {
        self.n += 1.0;
        self.mean += (x - self.mean) / self.n;
    }

    fn get(&self) -> f64 {
        self.mean
    }

    fn clone_box(&self) -> Box<dyn Univariate> {
        Box::new(self.clone())
    }
}

/// Running variance (Welford), with `ddof` delta degrees of freedom.
#[derive(Debug, Clone)]
pub struct Var {
    ddof: u32,
    mean: Mean,
    sos: f64,
}

impl Var {
    pub fn new(ddof: u32) -> Self {
        Self { ddof, mean: Mean::new(), sos: 0.0 }
    }

    pub fn mean(&self) -> f64 {
        self.mean.get()
    }
}

impl Default for Var {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Univariate for Var {
    fn name(&self) -> &'static str {
        "Var"
    }

    fn update(&mut self, x: f64) {
        let old_mean = self.mean.get();
        self.mean.update(x);
        self.sos += (x - old_mean) * (x - self.mean.get());
    }

    fn get(&self) -> f64 {
        let dof = self.mean.count() - f64::from(self.ddof);
        if dof > 0.0 {
            self.sos / dof
        } else {
            0.0
        }
    }

    fn clone_box(&self) -> Box<dyn Univariate> {
        Box::new(self.clone())
    }
}

/// Running covariance.
#[derive(Debug, Clone)]
pub struct Cov {
    ddof: u32,
    n: f64,
    mean_x: f64,
    mean_y: f64,
    c: f64,
}

impl Cov {
    pub fn new(ddof: u32) -> Self {
        Self { ddof, n: 0.0, mean_x: 0.0, mean_y: 0.0, c: 0.0 }
    }
}

impl Default for Cov {
    fn default() -> Self {
        Self::new(1)
    }
}

impl Bivariate for Cov {
    fn name(&self) -> &'static str {
        "Cov"
    }

    fn update(&mut self, x: f64, y: f64) {
        self.n += 1.0;
        let dx = x - self.mean_x;
        self.mean_x += dx / self.n;
        self.mean_y += (y - self.mean_y) / self.n;
        self.c += dx * (y - self.mean_y);
    }

    fn get(&self) -> f64 {
        let dof = self.n - f64::from(self.ddof);
        if dof > 0.0 {
            self.c / dof
        } else {
            0.0
        }
    }

    fn clone_box(&self) -> Box<dyn Bivariate> {
        Box::new(self.clone())
    }
}

/// Running Pearson correlation.
#[derive(Debug, Clone, Default)]
pub struct PearsonCorrelation {
    var_x: Var,
    var_y: Var,
    cov: Cov,
}

impl PearsonCorrelation {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Bivariate for PearsonCorrelation {
    fn name(&self) -> &'static str {
        "PearsonCorrelation"
    }

    fn update(&mut self, x: f64, y: f64) {
        self.var_x.update(x);
        self.var_y.update(y);
        self.cov.update(x, y);
    }

    fn get(&self) -> f64 {
        let denom = (self.var_x.get() * self.var_y.get()).sqrt();
        if denom > 0.0 {
            self.cov.get() / denom
        } else {
            0.0
        }
    }

    fn clone_box(&self) -> Box<dyn Bivariate> {
        Box::new(self.clone())
    }
}

pub(crate) fn describe_univariate(stat: &dyn Univariate) -> Value {
    json!(stat.name())
}

pub(crate) fn describe_bivariate(stat: &dyn Bivariate) -> Value {
    json!(stat.name())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mean_and_var() {
        let mut mean = Mean::new();
        let mut var = Var::default();
        for x in [2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0] {
            mean.update(x);
            var.update(x);
        }
        assert!((mean.get() - 5.0).abs() < 1e-12);
        // sample variance of the sequence above
        assert!((var.get() - 32.0 / 7.0).abs() < 1e-12);
        assert!((var.mean() - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_statistics_start_at_zero() {
        assert_eq!(Mean::new().get(), 0.0);
        let mut var = Var::default();
        var.update(3.0);
        assert_eq!(var.get(), 0.0);
        assert_eq!(PearsonCorrelation::new().get(), 0.0);
    }

    #[test]
    fn test_pearson_correlation() {
        let mut pos = PearsonCorrelation::new();
        let mut neg = PearsonCorrelation::new();
        for i in 0..20 {
            let x = i as f64;
            pos.update(x, 3.0 * x + 1.0);
            neg.update(x, -0.5 * x);
        }
        assert!((pos.get() - 1.0).abs() < 1e-9);
        assert!((neg.get() + 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_boxed_statistics_clone_independently() {
        let mut original: Box<dyn Univariate> = Box::new(Mean::new());
        original.update(10.0);
        let copy = original.clone();
        original.update(20.0);
        assert_eq!(copy.get(), 10.0);
        assert_eq!(original.get(), 15.0);
    }
}
