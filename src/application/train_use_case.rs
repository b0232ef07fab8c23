// ============================================================
// Layer 2 — TrainUseCase
// ============================================================
// Orchestrates the full training pipeline in order:
//
//   Step 1: Pick the backend from the device choice    (Layer 5 - ml)
//   Step 2: Seed the backend RNG                       (Layer 5 - ml)
//   Step 3: Load train / test splits                   (Layer 4 - data)
//   Step 4: Build the classifier                       (Layer 5 - ml)
//   Step 5: Save configs for inference                 (Layer 6 - infra)
//   Step 6: Run the training loop and post-phases      (Layer 5 - ml)
//   Step 7: Save the final weights                     (Layer 6 - infra)

use anyhow::{ensure, Result};
use burn::{module::AutodiffModule, tensor::backend::AutodiffBackend};
use serde::{Deserialize, Serialize};

use crate::data::{dataset::DigitDataset, loader::MnistSource};
use crate::domain::traits::DigitSource;
use crate::infra::{
    checkpoint::CheckpointManager,
    metrics::{EpochMetrics, MetricsLogger},
};
use crate::ml::{
    backend::{CpuTrainBackend, DeviceChoice, GpuTrainBackend},
    evaluator::EvalResult,
    model::{DigitClassifier, DigitClassifierConfig},
    optim::{LookaheadConfig, OptimizerKind},
    trainer::{run_training, McDropoutReport, TrainOutcome},
};

// ─── Training Configuration ──────────────────────────────────────────────────
// All settings of a training run. Saved next to the weights as
// train_config.json so a run can be traced back to its settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub checkpoint_dir: String,
    pub batch_size:     usize,
    pub epochs:         usize,
    pub lr:             f64,
    pub optimizer:      OptimizerKind,
    pub use_swa:        bool,
    /// First epoch whose weights enter the SWA average
    pub swa_start:      usize,
    /// Average every `swa_freq` optimizer steps
    pub swa_freq:       usize,
    pub use_lookahead:  bool,
    pub lookahead:      LookaheadConfig,
    pub mc_dropout:     bool,
    pub mc_samples:     usize,
    pub seed:           u64,
    pub verbose:        u8,
    pub device:         DeviceChoice,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            checkpoint_dir: "models/mnist_mlp".to_string(),
            batch_size:     32,
            epochs:         30,
            lr:             1e-3,
            optimizer:      OptimizerKind::Adam,
            use_swa:        false,
            swa_start:      25,
            swa_freq:       1,
            use_lookahead:  false,
            lookahead:      LookaheadConfig::default(),
            mc_dropout:     false,
            mc_samples:     100,
            seed:           42,
            verbose:        0,
            device:         DeviceChoice::Cpu,
        }
    }
}

/// Backend-independent result of a run, for the CLI layer.
#[derive(Debug, Clone)]
pub struct TrainSummary {
    pub history:    Vec<EpochMetrics>,
    pub swa:        Option<EvalResult>,
    pub mc_dropout: Option<McDropoutReport>,
}

impl<B: AutodiffBackend> From<TrainOutcome<B>> for TrainSummary {
    fn from(o: TrainOutcome<B>) -> Self {
        Self { history: o.history, swa: o.swa, mc_dropout: o.mc_dropout }
    }
}

// ─── TrainUseCase ─────────────────────────────────────────────────────────────
pub struct TrainUseCase {
    config: TrainConfig,
}

impl TrainUseCase {
    pub fn new(config: TrainConfig) -> Self {
        Self { config }
    }

    /// Train on MNIST, downloading it on first use.
    pub fn execute(&self) -> Result<TrainSummary> {
        self.execute_with(&MnistSource::new())
    }

    /// Train on any sample source with the configured device.
    pub fn execute_with(&self, source: &dyn DigitSource) -> Result<TrainSummary> {
        let summary: TrainSummary = match self.config.device {
            DeviceChoice::Cpu => {
                tracing::info!("Training on CPU (ndarray backend)");
                self.train_on::<CpuTrainBackend>(source, DeviceChoice::cpu_device())?.into()
            }
            DeviceChoice::Gpu(index) => {
                tracing::info!("Training on GPU {} (wgpu backend)", index);
                self.train_on::<GpuTrainBackend>(source, DeviceChoice::gpu_device(index))?.into()
            }
        };
        Ok(summary)
    }

    /// Full pipeline on backend `B`; returns the trained model too.
    pub fn train_on<B: AutodiffBackend>(
        &self,
        source: &dyn DigitSource,
        device: B::Device,
    ) -> Result<TrainOutcome<B>> {
        let cfg = &self.config;
        ensure!(cfg.batch_size > 0, "batch size must be positive");
        ensure!(cfg.swa_freq > 0, "swa frequency must be positive");

        B::seed(cfg.seed);

        // ── Load data ─────────────────────────────────────────────────────────
        let train = DigitDataset::new(source.train_samples()?);
        let valid = DigitDataset::new(source.valid_samples()?);
        ensure!(train.sample_count() > 0, "no training samples available");
        ensure!(valid.sample_count() > 0, "no validation samples available");
        tracing::info!(
            "Split: {} train, {} validation",
            train.sample_count(),
            valid.sample_count()
        );

        // ── Build model, save configs ─────────────────────────────────────────
        let model_cfg = DigitClassifierConfig::new();
        let model: DigitClassifier<B> = model_cfg.init(&device);

        let ckpt = CheckpointManager::new(&cfg.checkpoint_dir);
        ckpt.save_classifier_config(&model_cfg)?;
        ckpt.save_train_config(cfg)?;
        let metrics = MetricsLogger::new(&cfg.checkpoint_dir)?;
        tracing::info!("Logging epoch metrics to '{}'", metrics.csv_path().display());

        // ── Train ─────────────────────────────────────────────────────────────
        let outcome = run_training(cfg, &model_cfg, model, train, valid, &device, Some(&metrics))?;

        // ── Persist final weights ─────────────────────────────────────────────
        ckpt.save_model(&outcome.model.valid())?;
        Ok(outcome)
    }
}
