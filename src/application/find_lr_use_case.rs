// ============================================================
// Layer 2 — Learning-Rate Finder Use Case
// ============================================================
//   1. Load the training split
//   2. Fresh classifier + the chosen base optimizer
//   3. Sweep the learning rate batch by batch until the finder
//      reaches max_lr or the loss diverges
//   4. Write plots/mnist_lr_finder_for_{optimizer}.{png,csv}
//
// Nothing is saved to the model checkpoint: the sweep only
// explores rates, the weights it ends with are discarded.

use anyhow::{ensure, Result};
use burn::tensor::backend::AutodiffBackend;
use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::data::{dataset::DigitDataset, loader::MnistSource};
use crate::domain::traits::DigitSource;
use crate::infra::plot::LrPlotWriter;
use crate::ml::{
    backend::{CpuTrainBackend, DeviceChoice, GpuTrainBackend},
    lr_finder::{LrFinder, LrFinderConfig, LrPoint},
    model::{DigitClassifier, DigitClassifierConfig},
    optim::{build_optimizer, OptimizerKind},
    trainer::find_learning_rate,
};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FindLrConfig {
    pub optimizer:  OptimizerKind,
    pub plots_dir:  String,
    pub batch_size: usize,
    pub finder:     LrFinderConfig,
    pub seed:       u64,
    pub device:     DeviceChoice,
}

impl Default for FindLrConfig {
    fn default() -> Self {
        Self {
            optimizer:  OptimizerKind::Adam,
            plots_dir:  "plots".to_string(),
            batch_size: 32,
            finder:     LrFinderConfig::default(),
            seed:       42,
            device:     DeviceChoice::Cpu,
        }
    }
}

/// What a sweep produced.
#[derive(Debug, Clone)]
pub struct LrReport {
    pub history:   Vec<LrPoint>,
    pub best_lr:   Option<f64>,
    pub completed: bool,
    pub plot_path: PathBuf,
}

pub struct FindLrUseCase {
    config: FindLrConfig,
}

impl FindLrUseCase {
    pub fn new(config: FindLrConfig) -> Self {
        Self { config }
    }

    pub fn execute(&self) -> Result<LrReport> {
        self.execute_with(&MnistSource::new())
    }

    pub fn execute_with(&self, source: &dyn DigitSource) -> Result<LrReport> {
        let cfg = &self.config;
        ensure!(cfg.batch_size > 0, "batch size must be positive");
        ensure!(
            cfg.finder.start_lr > 0.0 && cfg.finder.start_lr < cfg.finder.max_lr,
            "learning rate range must satisfy 0 < start ({}) < max ({})",
            cfg.finder.start_lr,
            cfg.finder.max_lr
        );

        let finder = match cfg.device {
            DeviceChoice::Cpu => self.sweep_on::<CpuTrainBackend>(source, DeviceChoice::cpu_device())?,
            DeviceChoice::Gpu(index) => {
                self.sweep_on::<GpuTrainBackend>(source, DeviceChoice::gpu_device(index))?
            }
        };

        let plot_path = LrPlotWriter::new(&cfg.plots_dir).write(cfg.optimizer.name(), finder.history())?;

        Ok(LrReport {
            history:   finder.history().to_vec(),
            best_lr:   finder.best_lr(),
            completed: finder.done(),
            plot_path,
        })
    }

    fn sweep_on<B: AutodiffBackend>(
        &self,
        source: &dyn DigitSource,
        device: B::Device,
    ) -> Result<LrFinder> {
        let cfg = &self.config;
        B::seed(cfg.seed);

        let train = DigitDataset::new(source.train_samples()?);
        ensure!(train.sample_count() > 0, "no training samples available");

        let model: DigitClassifier<B> = DigitClassifierConfig::new().init(&device);
        let optim = build_optimizer::<B>(cfg.optimizer);

        tracing::info!(
            "Sweeping '{}' from lr={:e} to lr={:e} over {} steps",
            cfg.optimizer, cfg.finder.start_lr, cfg.finder.max_lr, cfg.finder.num_steps,
        );
        let finder = find_learning_rate(
            model,
            optim,
            train,
            cfg.batch_size,
            LrFinder::new(cfg.finder),
            &device,
        );
        tracing::info!("Sweep recorded {} points", finder.history().len());
        Ok(finder)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::loader::{toy_samples, InMemorySource};

    #[test]
    fn test_sweep_writes_plot_for_optimizer() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = FindLrConfig {
            optimizer:  OptimizerKind::Sgd,
            plots_dir:  dir.path().to_string_lossy().into_owned(),
            batch_size: 8,
            finder:     LrFinderConfig { start_lr: 1e-4, max_lr: 1e-1, num_steps: 6, ..Default::default() },
            ..FindLrConfig::default()
        };
        let source = InMemorySource::new(toy_samples(80, 1), Vec::new());

        let report = FindLrUseCase::new(cfg).execute_with(&source).unwrap();
        assert!(report.completed);
        assert!(!report.history.is_empty());
        assert!(report.best_lr.is_some());
        assert_eq!(report.plot_path, dir.path().join("mnist_lr_finder_for_sgd.png"));
        assert!(report.plot_path.is_file());
        assert!(dir.path().join("mnist_lr_finder_for_sgd.csv").is_file());
    }

    #[test]
    fn test_inverted_range_is_rejected() {
        let cfg = FindLrConfig {
            finder: LrFinderConfig { start_lr: 1.0, max_lr: 1e-3, ..Default::default() },
            ..FindLrConfig::default()
        };
        let source = InMemorySource::new(toy_samples(10, 1), Vec::new());
        assert!(FindLrUseCase::new(cfg).execute_with(&source).is_err());
    }
}
