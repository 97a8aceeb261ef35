use std::fmt;

use crate::traits::estimator::{
    describe, expose_roles, require_role, Capability, Classifier, Clusterer, Estimator,
    EstimatorError, Label, Proba, Regressor, Transformer,
};
use crate::traits::features::FeatureVector;
use crate::traits::registration::{Constructor, EstimatorType, Family};

fn missing(role: Capability, context: &str) -> EstimatorError {
    EstimatorError::MissingRole { role, context: context.to_string() }
}

/// Sequential composition: every step but the last is a transformer whose
/// output feeds the next step.
///
/// The pipeline holds whichever roles its final step holds. Learning updates
/// each transformer and then passes its output forward, so the final step
/// always sees features produced by up-to-date transformers.
#[derive(Debug, Clone)]
pub struct Pipeline {
    steps: Vec<Box<dyn Estimator>>,
}

impl Pipeline {
    pub fn new(steps: Vec<Box<dyn Estimator>>) -> Result<Self, EstimatorError> {
        let Some((_, head)) = steps.split_last() else {
            return Err(EstimatorError::InvalidParameter("a pipeline needs at least one step".to_string()));
        };
        for step in head {
            require_role(step.as_ref(), Capability::Transformer, "Pipeline")?;
        }
        Ok(Self { steps })
    }

    /// Appends a step, like `|` chaining.
    pub fn then(mut self, step: Box<dyn Estimator>) -> Result<Self, EstimatorError> {
        if let Some(last) = self.steps.last() {
            require_role(last.as_ref(), Capability::Transformer, "Pipeline")?;
        }
        self.steps.push(step);
        Ok(self)
    }

    pub fn steps(&self) -> &[Box<dyn Estimator>] {
        &self.steps
    }

    fn final_step(&self) -> &dyn Estimator {
        // `new` guarantees at least one step
        self.steps[self.steps.len() - 1].as_ref()
    }

    /// Runs `x` through every transformer without learning.
    fn transform_head(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        let mut x = x.clone();
        for step in &self.steps[..self.steps.len() - 1] {
            let transformer = step
                .as_transformer()
                .ok_or_else(|| missing(Capability::Transformer, "Pipeline"))?;
            x = transformer.transform_one(&x)?;
        }
        Ok(x)
    }

    /// Updates every transformer on `x` and returns the input of the final step.
    fn learn_head(&mut self, x: &FeatureVector, y: Option<f64>) -> Result<FeatureVector, EstimatorError> {
        let mut x = x.clone();
        let n = self.steps.len();
        for step in &mut self.steps[..n - 1] {
            let transformer = step
                .as_transformer_mut()
                .ok_or_else(|| missing(Capability::Transformer, "Pipeline"))?;
            transformer.learn_one(&x, y)?;
            x = transformer.transform_one(&x)?;
        }
        Ok(x)
    }

    fn final_step_mut(&mut self) -> &mut dyn Estimator {
        let n = self.steps.len();
        self.steps[n - 1].as_mut()
    }
}

impl Regressor for Pipeline {
    fn learn_one(&mut self, x: &FeatureVector, y: f64) -> Result<(), EstimatorError> {
        let x = self.learn_head(x, Some(y))?;
        self.final_step_mut()
            .as_regressor_mut()
            .ok_or_else(|| missing(Capability::Regressor, "Pipeline"))?
            .learn_one(&x, y)
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<f64, EstimatorError> {
        let x = self.transform_head(x)?;
        self.final_step()
            .as_regressor()
            .ok_or_else(|| missing(Capability::Regressor, "Pipeline"))?
            .predict_one(&x)
    }
}

impl Classifier for Pipeline {
    fn learn_one(&mut self, x: &FeatureVector, y: Label) -> Result<(), EstimatorError> {
        let x = self.learn_head(x, Some(y as f64))?;
        self.final_step_mut()
            .as_classifier_mut()
            .ok_or_else(|| missing(Capability::Classifier, "Pipeline"))?
            .learn_one(&x, y)
    }

    fn predict_proba_one(&self, x: &FeatureVector) -> Result<Proba, EstimatorError> {
        let x = self.transform_head(x)?;
        self.final_step()
            .as_classifier()
            .ok_or_else(|| missing(Capability::Classifier, "Pipeline"))?
            .predict_proba_one(&x)
    }

    fn is_multiclass(&self) -> bool {
        self.final_step().as_classifier().is_some_and(|c| c.is_multiclass())
    }
}

impl Transformer for Pipeline {
    fn learn_one(&mut self, x: &FeatureVector, y: Option<f64>) -> Result<(), EstimatorError> {
        let x = self.learn_head(x, y)?;
        self.final_step_mut()
            .as_transformer_mut()
            .ok_or_else(|| missing(Capability::Transformer, "Pipeline"))?
            .learn_one(&x, y)
    }

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        let x = self.transform_head(x)?;
        self.final_step()
            .as_transformer()
            .ok_or_else(|| missing(Capability::Transformer, "Pipeline"))?
            .transform_one(&x)
    }
}

impl Clusterer for Pipeline {
    fn learn_one(&mut self, x: &FeatureVector) -> Result<(), EstimatorError> {
        let x = self.learn_head(x, None)?;
        self.final_step_mut()
            .as_clusterer_mut()
            .ok_or_else(|| missing(Capability::Clusterer, "Pipeline"))?
            .learn_one(&x)
    }

    fn predict_one(&self, x: &FeatureVector) -> Result<usize, EstimatorError> {
        let x = self.transform_head(x)?;
        self.final_step()
            .as_clusterer()
            .ok_or_else(|| missing(Capability::Clusterer, "Pipeline"))?
            .predict_one(&x)
    }
}

impl Estimator for Pipeline {
    fn name(&self) -> String {
        self.steps
            .iter()
            .map(|step| describe(step.as_ref()))
            .collect::<Vec<_>>()
            .join(" | ")
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    fn as_regressor(&self) -> Option<&dyn Regressor> {
        self.final_step().as_regressor().map(|_| self as &dyn Regressor)
    }

    fn as_regressor_mut(&mut self) -> Option<&mut dyn Regressor> {
        if self.final_step().as_regressor().is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn as_classifier(&self) -> Option<&dyn Classifier> {
        self.final_step().as_classifier().map(|_| self as &dyn Classifier)
    }

    fn as_classifier_mut(&mut self) -> Option<&mut dyn Classifier> {
        if self.final_step().as_classifier().is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn as_transformer(&self) -> Option<&dyn Transformer> {
        self.final_step().as_transformer().map(|_| self as &dyn Transformer)
    }

    fn as_transformer_mut(&mut self) -> Option<&mut dyn Transformer> {
        if self.final_step().as_transformer().is_some() {
            Some(self)
        } else {
            None
        }
    }

    fn as_clusterer(&self) -> Option<&dyn Clusterer> {
        self.final_step().as_clusterer().map(|_| self as &dyn Clusterer)
    }

    fn as_clusterer_mut(&mut self) -> Option<&mut dyn Clusterer> {
        if self.final_step().as_clusterer().is_some() {
            Some(self)
        } else {
            None
        }
    }
}

/// Runs several transformers side by side and concatenates their outputs.
#[derive(Debug, Clone)]
pub struct TransformerUnion {
    transformers: Vec<Box<dyn Estimator>>,
}

impl TransformerUnion {
    pub fn new(transformers: Vec<Box<dyn Estimator>>) -> Result<Self, EstimatorError> {
        if transformers.is_empty() {
            return Err(EstimatorError::InvalidParameter(
                "a transformer union needs at least one transformer".to_string(),
            ));
        }
        for transformer in &transformers {
            require_role(transformer.as_ref(), Capability::Transformer, "TransformerUnion")?;
        }
        Ok(Self { transformers })
    }
}

impl Transformer for TransformerUnion {
    fn learn_one(&mut self, x: &FeatureVector, y: Option<f64>) -> Result<(), EstimatorError> {
        for step in &mut self.transformers {
            step.as_transformer_mut()
                .ok_or_else(|| missing(Capability::Transformer, "TransformerUnion"))?
                .learn_one(x, y)?;
        }
        Ok(())
    }

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        let mut out = FeatureVector::new(Vec::new());
        for step in &self.transformers {
            let part = step
                .as_transformer()
                .ok_or_else(|| missing(Capability::Transformer, "TransformerUnion"))?
                .transform_one(x)?;
            out = out.concat(&part);
        }
        Ok(out)
    }
}

impl Estimator for TransformerUnion {
    fn name(&self) -> String {
        self.transformers
            .iter()
            .map(|step| describe(step.as_ref()))
            .collect::<Vec<_>>()
            .join(" + ")
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Transformer);
}

/// Applies a plain function to every example.
#[derive(Clone)]
pub struct FuncTransformer {
    func: fn(&FeatureVector) -> FeatureVector,
}

impl FuncTransformer {
    pub fn new(func: fn(&FeatureVector) -> FeatureVector) -> Self {
        Self { func }
    }
}

impl fmt::Debug for FuncTransformer {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("FuncTransformer")
    }
}

impl Transformer for FuncTransformer {
    fn learn_one(&mut self, _x: &FeatureVector, _y: Option<f64>) -> Result<(), EstimatorError> {
        Ok(())
    }

    fn transform_one(&self, x: &FeatureVector) -> Result<FeatureVector, EstimatorError> {
        Ok((self.func)(x))
    }
}

impl Estimator for FuncTransformer {
    fn name(&self) -> String {
        "FuncTransformer".to_string()
    }

    fn clone_box(&self) -> Box<dyn Estimator> {
        Box::new(self.clone())
    }

    expose_roles!(Transformer);
}

pub fn estimators() -> Vec<EstimatorType> {
    vec![
        EstimatorType::new(
            "compose",
            "FuncTransformer",
            &[Capability::Transformer],
            &[Family::FuncTransformer],
            Constructor::Manual,
        ),
        EstimatorType::new(
            "compose",
            "Pipeline",
            &[],
            &[Family::Pipeline],
            Constructor::Manual,
        ),
        EstimatorType::new(
            "compose",
            "TransformerUnion",
            &[Capability::Transformer],
            &[Family::TransformerUnion],
            Constructor::Manual,
        ),
    ]
}
