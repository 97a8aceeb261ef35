use serde::{Deserialize, Serialize};

/// Bounds applied to predicted probabilities by [`Loss::Log`].
pub const PROBA_EPSILON: f64 = 1e-15;

/// Scalar loss functions used by gradient-based estimators.
///
/// All operations are total. `Log` never rejects a prediction outside
/// `[0, 1]`: it clamps it into `(1e-15, 1 - 1e-15)` first, in both
/// [`evaluate`](Loss::evaluate) and [`gradient`](Loss::gradient).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Loss {
    /// L1 loss, `|p - y|`
    Absolute,
    /// L2 loss, `(p - y)^2`
    #[default]
    Squared,
    /// Cross-entropy on a predicted probability
    Log,
}

impl Loss {
    pub const ALL: [Loss; 3] = [Loss::Absolute, Loss::Squared, Loss::Log];

    /// Loss of predicting `y_pred` when the truth is `y_true`.
    pub fn evaluate(self, y_true: f64, y_pred: f64) -> f64 {
        match self {
            Loss::Absolute => (y_pred - y_true).abs(),
            Loss::Squared => (y_pred - y_true).powi(2),
            Loss::Log => {
                let p = clip_proba(y_pred);
                -(y_true * p.ln() + (1.0 - y_true) * (1.0 - p).ln())
            }
        }
    }

    /// Derivative of the loss with respect to the prediction.
    ///
    /// For `Log` this is the gradient with respect to the logit of the
    /// prediction, `clip(p) - y`, which is what logistic models step on.
    pub fn gradient(self, y_true: f64, y_pred: f64) -> f64 {
        match self {
            Loss::Absolute => {
                let diff = y_pred - y_true;
                if diff > 0.0 {
                    1.0
                } else if diff == 0.0 {
                    0.0
                } else {
                    -1.0
                }
            }
            Loss::Squared => 2.0 * (y_pred - y_true),
            Loss::Log => clip_proba(y_pred) - y_true,
        }
    }
}

/// Clamp a probability into `(PROBA_EPSILON, 1 - PROBA_EPSILON)`.
pub fn clip_proba(p: f64) -> f64 {
    p.min(1.0 - PROBA_EPSILON).max(PROBA_EPSILON)
}

/// Logistic function
pub fn sigmoid(z: f64) -> f64 {
    if z >= 0.0 {
        1.0 / (1.0 + (-z).exp())
    } else {
        let e = z.exp();
        e / (1.0 + e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_absolute_loss() {
        let loss = Loss::Absolute;
        assert_eq!(loss.evaluate(3.0, 3.0), 0.0);
        assert_eq!(loss.gradient(3.0, 3.0), 0.0);
        assert_eq!(loss.evaluate(3.0, 5.0), 2.0);
        assert_eq!(loss.gradient(3.0, 5.0), 1.0);
        assert_eq!(loss.evaluate(5.0, 3.0), 2.0);
        assert_eq!(loss.gradient(5.0, 3.0), -1.0);
    }

    #[test]
    fn test_squared_loss() {
        let loss = Loss::Squared;
        assert_eq!(loss.evaluate(2.0, 5.0), 9.0);
        assert_eq!(loss.gradient(2.0, 5.0), 6.0);
        assert_eq!(loss.evaluate(5.0, 2.0), 9.0);
        assert_eq!(loss.gradient(5.0, 2.0), -6.0);
    }

    #[test]
    fn test_log_loss_is_finite_out_of_range() {
        for &y_true in &[0.0, 1.0] {
            for &y_pred in &[-5.0, 0.0, 0.5, 1.0, 7.0] {
                let value = Loss::Log.evaluate(y_true, y_pred);
                assert!(value.is_finite(), "log loss({}, {}) = {}", y_true, y_pred, value);
                assert!(value >= 0.0, "log loss({}, {}) = {}", y_true, y_pred, value);
            }
        }
    }

    #[test]
    fn test_log_loss_uses_same_clip_in_both_operations() {
        // 7.0 and 1.0 clip to the same probability
        assert_eq!(Loss::Log.evaluate(0.0, 7.0), Loss::Log.evaluate(0.0, 1.0));
        assert_eq!(Loss::Log.gradient(0.0, 7.0), 1.0 - PROBA_EPSILON);
        assert_eq!(Loss::Log.gradient(1.0, -5.0), PROBA_EPSILON - 1.0);
        assert!((Loss::Log.evaluate(1.0, 0.5) - std::f64::consts::LN_2).abs() < 1e-12);
    }

    #[test]
    fn test_gradients_match_central_differences() {
        let h = 1e-6;
        for &y_true in &[-2.0, 0.0, 1.5] {
            for &y_pred in &[-3.0, -0.5, 0.7, 4.0] {
                for loss in [Loss::Absolute, Loss::Squared] {
                    let numeric =
                        (loss.evaluate(y_true, y_pred + h) - loss.evaluate(y_true, y_pred - h)) / (2.0 * h);
                    assert!(
                        (numeric - loss.gradient(y_true, y_pred)).abs() < 1e-4,
                        "{:?} at ({}, {})",
                        loss,
                        y_true,
                        y_pred
                    );
                }
            }
        }
    }

    #[test]
    fn test_log_gradient_is_logit_space_derivative() {
        let h = 1e-6;
        for &y_true in &[0.0, 1.0] {
            for &z in &[-3.0, -0.2, 0.0, 1.1, 2.5] {
                let numeric = (Loss::Log.evaluate(y_true, sigmoid(z + h))
                    - Loss::Log.evaluate(y_true, sigmoid(z - h)))
                    / (2.0 * h);
                assert!((numeric - Loss::Log.gradient(y_true, sigmoid(z))).abs() < 1e-5);
            }
        }
    }

    #[test]
    fn test_sigmoid_is_stable() {
        assert_eq!(sigmoid(0.0), 0.5);
        assert!(sigmoid(-800.0) >= 0.0);
        assert!(sigmoid(800.0) <= 1.0);
        assert!((sigmoid(2.0) + sigmoid(-2.0) - 1.0).abs() < 1e-12);
    }
}
