use ndarray::Array1;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde_json::{json, Value};

use crate::traits::estimator::{
    check_dimension, expose_roles, Capability, Clusterer, Estimator, EstimatorError,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{boxed, Constructor, EstimatorType, Family};

/// Incremental k-means.
///
/// Centers are drawn from `N(mu, sigma)` on the first example; each example
/// then pulls its closest center towards it by a factor `halflife`.
#[derive(Debug, Clone)]
pub struct KMeans {
    n_clusters: usize,
    halflife: f64,
    mu: f64,
    sigma: f64,
    seed: Option<u64>,
    rng: StdRng,
    centers: Vec<Array1<f64>>,
}

impl KMeans {
    pub fn new(n_clusters: usize, halflife: f64, seed: Option<u64>) -> Result<Self, EstimatorError> {
        if n_clusters == 0 {
            return Err(EstimatorError::InvalidParameter("n_clusters must be positive".to_string()));
        }
        if !(0.0..=1.0).contains(&halflife) {
            return Err(EstimatorError::InvalidParameter(format!(
                "halflife must lie in [0, 1], got {}",
                halflife
            )));
        }
        let rng = match seed {
            Some(seed) => StdRng::seed_from_u64(seed),
            None => StdRng::from_os_rng(),
        };
        Ok(Self {
            n_clusters,
            halflife,
            mu: 0.0,
            sigma: 1.0,
            seed,
            rng,
            centers: Vec::new(),
        })
    }

    pub fn centers(&self) -> &[Array1<f64>] {
        &self.centers
    }

    /// Box-Muller draw from `N(mu, sigma)`
    fn gaussian(&mut self) -> f64 {
        let u1: f64 = 1.0 - self.rng.random::<f64>();
        let u2: f64 = self.rng.random::<f64>();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        self.mu + self.sigma * z
    }

    fn closest(&self, x: &FeatureVector) -> usize {
        let mut best = (0, f64::INFINITY);
        for (i, center) in self.centers.iter().enumerate() {
            let distance = (center - x.as_array()).mapv(|d| d * d).sum();
            if distance < best.1 {
                best = (i, distance);
            }
        }
        best.0
    }

    fn dimension(&self) -> Option<usize> {
        self.centers.first().map(|c| c.len())
    }
}

impl Default for KMeans {
    fn default() -> Self {
        Self {
            n_clusters: 5,
            halflife: 0.5,
            mu: 0.0,
            sigma: 1.0,
            seed: None,
            rng: StdRng::from_os_rng(),
            centers: Vec::new(),
        }
    }
}

impl Clusterer for KMeans {
    fn learn_one(&mut self, x: &FeatureVector) -> Result<(), EstimatorError> {
        check_dimension(self.dimension(), x, "KMeans input")?;
        if self.centers.is_empty() {
            let mut centers = Vec::with_capacity(self.n_clusters);
            for _ in 0..self.n_clusters {
                centers.push(Array1::from_shape_fn(x.dimension(), |_| self.gaussian()));
            }
            self.centers = centers;
        }
        let closest = self.closest(x);
        let center = &mut self.centers[closest];
        let step = (x.as_array() - &*center) * self.halflife;
        *center += &step;
        Ok(())
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<usize, EstimatorError> {
        check_dimension(self.dimension(), x, "KMeans input")?;
        Ok(self.closest(x))
    }
}

impl Estimator for KMeans {
    fn name(&self) -> String {
        "KMeans".to_string()
    }

    fn params(&self) -> Value {
        json!({
            "n_clusters": self.n_clusters,
            "halflife": self.halflife,
            "mu": self.mu,
            "sigma": self.sigma,
            "seed": self.seed,
        })
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Clusterer);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![EstimatorType::new(
        "cluster",
        "KMeans",
        &[Capability::Clusterer],
        &[Family::KMeans],
        Constructor::Default(|| boxed(KMeans::default())),
    )]
}
