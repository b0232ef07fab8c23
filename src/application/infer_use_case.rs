// ============================================================
// Layer 2 — Inference Use Case
// ============================================================
//   1. Check that a trained model and the image both exist
//   2. Decode the image to 784 grayscale values in [0, 1]
//   3. Rebuild the classifier from the checkpoint
//   4. One inference-mode forward pass → arg-max class

use anyhow::{bail, Result};
use std::path::Path;

use crate::data::image::load_digit_image;
use crate::domain::sample::Prediction;
use crate::infra::checkpoint::CheckpointManager;
use crate::ml::{
    backend::{CpuBackend, DeviceChoice, GpuBackend},
    inferencer::Inferencer,
};

pub struct InferUseCase {
    ckpt:   CheckpointManager,
    device: DeviceChoice,
}

impl InferUseCase {
    pub fn new(checkpoint_dir: impl AsRef<Path>, device: DeviceChoice) -> Self {
        Self {
            ckpt: CheckpointManager::new(checkpoint_dir.as_ref()),
            device,
        }
    }

    /// Classify the digit in the image at `image_path`.
    pub fn classify(&self, image_path: impl AsRef<Path>) -> Result<Prediction> {
        let image_path = image_path.as_ref();

        if !self.ckpt.has_model() {
            bail!("model not found, train a model before calling inference");
        }
        if !image_path.is_file() {
            bail!("can not find image file '{}'", image_path.display());
        }

        let pixels = load_digit_image(image_path)?;
        self.classify_pixels(&pixels)
    }

    /// Classify an already flattened, [0, 1]-scaled image.
    pub fn classify_pixels(&self, pixels: &[f32]) -> Result<Prediction> {
        match self.device {
            DeviceChoice::Cpu => {
                Inferencer::<CpuBackend>::from_checkpoint(&self.ckpt, DeviceChoice::cpu_device())?
                    .predict(pixels)
            }
            DeviceChoice::Gpu(index) => {
                Inferencer::<GpuBackend>::from_checkpoint(&self.ckpt, DeviceChoice::gpu_device(index))?
                    .predict(pixels)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::train_use_case::{TrainConfig, TrainUseCase};
    use crate::data::loader::{toy_samples, InMemorySource};
    use crate::domain::sample::{IMAGE_SIDE, INPUT_DIM};
    use crate::ml::backend::CpuTrainBackend;
    use burn::module::AutodiffModule;
    use image::{GrayImage, Luma};

    /// Toy digit snapped to 8-bit levels so a PNG round-trip is lossless.
    fn quantized_digit(label: usize) -> Vec<f32> {
        toy_samples(10, 11)[label]
            .pixels
            .iter()
            .map(|p| (p * 255.0).round() / 255.0)
            .collect()
    }

    #[test]
    fn test_missing_model_is_reported_first() {
        let dir = tempfile::tempdir().unwrap();
        let use_case = InferUseCase::new(dir.path(), DeviceChoice::Cpu);

        let err = use_case.classify(dir.path().join("missing.png")).unwrap_err();
        assert_eq!(err.to_string(), "model not found, train a model before calling inference");
    }

    #[test]
    fn test_saved_model_predicts_like_trained_model() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = TrainConfig {
            checkpoint_dir: dir.path().to_string_lossy().into_owned(),
            epochs:         1,
            batch_size:     16,
            ..TrainConfig::default()
        };
        let source  = InMemorySource::new(toy_samples(48, 1), toy_samples(16, 2));
        let outcome = TrainUseCase::new(cfg)
            .train_on::<CpuTrainBackend>(&source, DeviceChoice::cpu_device())
            .unwrap();

        let pixels = quantized_digit(3);
        let fresh  = Inferencer::from_model(outcome.model.valid(), INPUT_DIM, DeviceChoice::cpu_device())
            .predict(&pixels)
            .unwrap();

        let use_case = InferUseCase::new(dir.path(), DeviceChoice::Cpu);
        let reloaded = use_case.classify_pixels(&pixels).unwrap();
        assert_eq!(reloaded, fresh);

        // Same answer through the image file path.
        let side  = IMAGE_SIDE as u32;
        let image = GrayImage::from_fn(side, side, |x, y| {
            Luma([(pixels[(y * side + x) as usize] * 255.0).round() as u8])
        });
        let image_path = dir.path().join("digit.png");
        image.save(&image_path).unwrap();
        assert_eq!(use_case.classify(&image_path).unwrap(), fresh);

        let err = use_case.classify(dir.path().join("nope.png")).unwrap_err();
        assert!(err.to_string().starts_with("can not find image file"));
    }
}
