use ndarray::Array1;

/// A single dense example, one value per feature.
#[derive(Clone, Debug, PartialEq)]
pub struct FeatureVector {
    values: Array1<f64>,
}

impl FeatureVector {
    // Create new feature vector
    pub fn new(values: Vec<f64>) -> Self {
        Self { values: Array1::from(values) }
    }

    pub fn from_array(values: Array1<f64>) -> Self {
        Self { values }
    }

    /// Number of features
    pub fn dimension(&self) -> usize {
        self.values.len()
    }

    pub fn as_array(&self) -> &Array1<f64> {
        &self.values
    }

    pub fn into_array(self) -> Array1<f64> {
        self.values
    }

    pub fn is_finite(&self) -> bool {
        self.values.iter().all(|v| v.is_finite())
    }

    /// Concatenate two vectors, `self` first.
    pub fn concat(&self, other: &FeatureVector) -> FeatureVector {
        let mut values = self.values.to_vec();
        values.extend(other.values.iter().copied());
        FeatureVector::new(values)
    }
}

impl From<Vec<f64>> for FeatureVector {
    fn from(values: Vec<f64>) -> Self {
        FeatureVector::new(values)
    }
}
