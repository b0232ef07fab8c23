// ============================================================
// Layer 6 — Checkpoint Manager
// ============================================================
// Saves and restores the trained classifier.
//
// What gets saved:
//   1. Model weights (model.mpk)     : every parameter and the
//                                      BatchNorm running statistics
//   2. classifier_config.json        : model architecture
//   3. train_config.json             : how the model was trained
//
// The weights use NamedMpkFileRecorder with FullPrecisionSettings
// rather than CompactRecorder: CompactRecorder stores f16, and a
// reloaded model must reproduce the exact predictions of the
// model that was saved.
//
// Directory layout:
//   models/mnist_mlp/
//     model.mpk
//     classifier_config.json
//     train_config.json
//     metrics.csv                     ← written by MetricsLogger

use anyhow::{bail, Context, Result};
use std::{fs, path::PathBuf};
use burn::{
    prelude::*,
    record::{FullPrecisionSettings, NamedMpkFileRecorder, Recorder},
};

use crate::application::train_use_case::TrainConfig;
use crate::ml::model::{DigitClassifier, DigitClassifierConfig};

const MODEL_FILE:  &str = "model";
const MODEL_EXT:   &str = "mpk";
const CONFIG_FILE: &str = "classifier_config.json";
const TRAIN_FILE:  &str = "train_config.json";

type ModelRecorder = NamedMpkFileRecorder<FullPrecisionSettings>;

/// Manages saving and loading of the model checkpoint.
pub struct CheckpointManager {
    dir: PathBuf,
}

impl CheckpointManager {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    /// Path of the weights file as written by the recorder.
    pub fn model_path(&self) -> PathBuf {
        self.dir.join(format!("{MODEL_FILE}.{MODEL_EXT}"))
    }

    /// True once a training run has written its weights.
    pub fn has_model(&self) -> bool {
        self.model_path().is_file() && self.dir.join(CONFIG_FILE).is_file()
    }

    fn ensure_dir(&self) -> Result<()> {
        fs::create_dir_all(&self.dir)
            .with_context(|| format!("Cannot create checkpoint dir '{}'", self.dir.display()))
    }

    /// Save the model weights, overwriting any previous checkpoint.
    pub fn save_model<B: Backend>(&self, model: &DigitClassifier<B>) -> Result<()> {
        self.ensure_dir()?;
        // Recorder appends the extension itself
        let path = self.dir.join(MODEL_FILE);

        ModelRecorder::new()
            .record(model.clone().into_record(), path.clone())
            .with_context(|| format!("Failed to save model to '{}'", path.display()))?;

        tracing::info!("Saved model to '{}'", self.model_path().display());
        Ok(())
    }

    /// Load saved weights into `model`, which must have been built
    /// from the saved classifier config.
    pub fn load_model<B: Backend>(
        &self,
        model:  DigitClassifier<B>,
        device: &B::Device,
    ) -> Result<DigitClassifier<B>> {
        if !self.model_path().is_file() {
            bail!(
                "model not found at '{}', train a model before calling inference",
                self.model_path().display()
            );
        }
        let path = self.dir.join(MODEL_FILE);

        let record = ModelRecorder::new()
            .load(path.clone(), device)
            .with_context(|| format!("Cannot load model '{}'", path.display()))?;

        Ok(model.load_record(record))
    }

    pub fn save_classifier_config(&self, cfg: &DigitClassifierConfig) -> Result<()> {
        self.write_json(CONFIG_FILE, cfg)
    }

    pub fn load_classifier_config(&self) -> Result<DigitClassifierConfig> {
        self.read_json(CONFIG_FILE)
    }

    pub fn save_train_config(&self, cfg: &TrainConfig) -> Result<()> {
        self.write_json(TRAIN_FILE, cfg)
    }

    fn write_json<T: serde::Serialize>(&self, name: &str, value: &T) -> Result<()> {
        self.ensure_dir()?;
        let path = self.dir.join(name);
        let json = serde_json::to_string_pretty(value)?;
        fs::write(&path, json)
            .with_context(|| format!("Cannot write '{}'", path.display()))?;
        tracing::debug!("Saved '{}'", path.display());
        Ok(())
    }

    fn read_json<T: serde::de::DeserializeOwned>(&self, name: &str) -> Result<T> {
        let path = self.dir.join(name);
        let json = fs::read_to_string(&path).with_context(|| {
            format!(
                "Cannot read '{}'. Make sure you have run 'train' before 'inference'.",
                path.display()
            )
        })?;
        serde_json::from_str(&json)
            .with_context(|| format!("Malformed '{}'", path.display()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::{Autodiff, NdArray};

    type TestBackend = NdArray;

    #[test]
    fn test_model_roundtrip_is_exact() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let config = DigitClassifierConfig::new();

        let model: DigitClassifier<TestBackend> = config.init(&device);
        ckpt.save_model(&model).unwrap();
        ckpt.save_classifier_config(&config).unwrap();
        assert!(ckpt.has_model());

        let loaded = ckpt
            .load_model(ckpt.load_classifier_config().unwrap().init::<TestBackend>(&device), &device)
            .unwrap();
        assert_eq!(loaded.flat_parameters(), model.flat_parameters());
    }

    #[test]
    fn test_autodiff_model_saves_running_statistics() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path());
        let device = Default::default();
        let config = DigitClassifierConfig::new();

        let model: DigitClassifier<Autodiff<TestBackend>> = config.init(&device);
        let _ = model.forward(Tensor::ones([4, 784], &device));
        ckpt.save_model(&model).unwrap();

        let loaded = ckpt
            .load_model(config.init::<TestBackend>(&device), &device)
            .unwrap();
        assert_eq!(loaded.flat_parameters(), model.flat_parameters());
    }

    #[test]
    fn test_missing_model_is_reported() {
        let dir    = tempfile::tempdir().unwrap();
        let ckpt   = CheckpointManager::new(dir.path().join("nothing-here"));
        let device = Default::default();

        assert!(!ckpt.has_model());
        let err = ckpt
            .load_model(DigitClassifierConfig::new().init::<TestBackend>(&device), &device)
            .unwrap_err();
        assert!(err.to_string().contains("model not found"));
        assert!(ckpt.load_classifier_config().is_err());
    }

    #[test]
    fn test_train_config_roundtrip() {
        let dir  = tempfile::tempdir().unwrap();
        let ckpt = CheckpointManager::new(dir.path());
        let cfg  = TrainConfig { epochs: 3, use_swa: true, ..TrainConfig::default() };

        ckpt.save_train_config(&cfg).unwrap();
        let json = fs::read_to_string(dir.path().join(TRAIN_FILE)).unwrap();
        let loaded: TrainConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.epochs, 3);
        assert!(loaded.use_swa);
        assert_eq!(loaded.optimizer, cfg.optimizer);
    }
}
