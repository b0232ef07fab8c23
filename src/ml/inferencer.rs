// ============================================================
// Layer 5 — Inferencer
// ============================================================
use anyhow::{anyhow, ensure, Context, Result};
use burn::prelude::*;

use crate::domain::sample::Prediction;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::model::DigitClassifier;

/// Runs the classifier in inference mode on single images.
///
/// B is a plain (non-autodiff) backend, so BatchNorm uses its
/// running statistics and Dropout is disabled.
pub struct Inferencer<B: Backend> {
    model:     DigitClassifier<B>,
    input_dim: usize,
    device:    B::Device,
}

impl<B: Backend> Inferencer<B> {
    pub fn from_checkpoint(ckpt_manager: &CheckpointManager, device: B::Device) -> Result<Self> {
        let cfg   = ckpt_manager.load_classifier_config()?;
        let model = ckpt_manager.load_model(cfg.init::<B>(&device), &device)?;
        tracing::info!("Model loaded from checkpoint");
        Ok(Self { model, input_dim: cfg.input_dim, device })
    }

    /// Wrap an in-memory model, e.g. `trained.valid()`.
    pub fn from_model(model: DigitClassifier<B>, input_dim: usize, device: B::Device) -> Self {
        Self { model, input_dim, device }
    }

    /// Classify one flattened, [0, 1]-scaled image.
    pub fn predict(&self, pixels: &[f32]) -> Result<Prediction> {
        ensure!(
            pixels.len() == self.input_dim,
            "expected {} pixel values, got {}",
            self.input_dim,
            pixels.len()
        );

        let input = Tensor::<B, 1>::from_floats(pixels, &self.device)
            .reshape([1, self.input_dim]);
        let probabilities = self
            .model
            .forward(input)
            .into_data()
            .convert::<f32>()
            .to_vec::<f32>()
            .map_err(|e| anyhow!("Cannot read model output: {e:?}"))?;

        let prediction = Prediction::from_probabilities(probabilities)
            .context("model produced an empty probability vector")?;
        tracing::debug!("Predicted {} (p={:.4})", prediction.class, prediction.probability);
        Ok(prediction)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::{INPUT_DIM, NUM_CLASSES};
    use crate::ml::model::DigitClassifierConfig;
    use burn::backend::NdArray;

    type TestBackend = NdArray;

    fn inferencer() -> Inferencer<TestBackend> {
        let device = Default::default();
        let model  = DigitClassifierConfig::new().init::<TestBackend>(&device);
        Inferencer::from_model(model, INPUT_DIM, device)
    }

    #[test]
    fn test_prediction_is_a_valid_class_and_probability() {
        let pixels: Vec<f32> = (0..INPUT_DIM).map(|i| (i % 17) as f32 / 16.0).collect();
        let prediction = inferencer().predict(&pixels).unwrap();

        assert!(prediction.class < NUM_CLASSES);
        assert!((0.0..=1.0).contains(&prediction.probability));
        assert_eq!(prediction.probabilities.len(), NUM_CLASSES);
        let sum: f32 = prediction.probabilities.iter().sum();
        assert!((sum - 1.0).abs() < 1e-5);
        assert_eq!(prediction.probability, prediction.probabilities[prediction.class]);
    }

    #[test]
    fn test_wrong_input_length_is_rejected() {
        assert!(inferencer().predict(&[0.5; 10]).is_err());
    }
}
