// ============================================================
// Layer 6 — Metrics Logger
// ============================================================
// Records training metrics to a CSV file after each epoch.
//
// Metrics recorded per epoch:
//   - epoch:      the epoch number (1, 2, 3, ...)
//   - train_loss: mean categorical cross-entropy on the training set
//   - train_acc:  fraction of training digits classified correctly
//   - valid_loss: mean categorical cross-entropy on the test set
//   - valid_acc:  fraction of test digits classified correctly
//   - seconds:    wall-clock time of the epoch
//
// Output file: models/mnist_mlp/metrics.csv
//
// Example CSV output:
//   epoch,train_loss,train_acc,valid_loss,valid_acc,seconds
//   1,0.412300,0.881200,0.201700,0.940100,4
//   2,0.190400,0.944800,0.142900,0.957300,4
//   ...
//
// A new training run starts a fresh file; rows of an older run
// in the same directory would describe a different model.

use anyhow::{Context, Result};
use std::{
    fs::{self, OpenOptions},
    io::Write,
    path::{Path, PathBuf},
};
use serde::{Deserialize, Serialize};

const HEADER: &str = "epoch,train_loss,train_acc,valid_loss,valid_acc,seconds";

/// One row of metrics data for a single training epoch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EpochMetrics {
    /// The epoch number (starts at 1)
    pub epoch: usize,

    /// Mean cross-entropy over all training batches
    pub train_loss: f64,

    /// Training accuracy in [0.0, 1.0]
    pub train_acc: f64,

    /// Mean cross-entropy over the validation batches
    pub valid_loss: f64,

    /// Validation accuracy in [0.0, 1.0]
    pub valid_acc: f64,

    /// Whole seconds the epoch took
    pub seconds: u64,
}

impl EpochMetrics {
    pub fn new(
        epoch:      usize,
        train_loss: f64,
        train_acc:  f64,
        valid_loss: f64,
        valid_acc:  f64,
        seconds:    u64,
    ) -> Self {
        Self { epoch, train_loss, train_acc, valid_loss, valid_acc, seconds }
    }
}

/// Logs epoch metrics to a CSV file for later analysis.
pub struct MetricsLogger {
    csv_path: PathBuf,
}

impl MetricsLogger {
    /// Create the directory if needed and start a fresh CSV with its header.
    pub fn new(dir: impl AsRef<Path>) -> Result<Self> {
        let dir = dir.as_ref();
        fs::create_dir_all(dir)
            .with_context(|| format!("Cannot create metrics dir '{}'", dir.display()))?;

        let csv_path = dir.join("metrics.csv");
        let mut f = fs::File::create(&csv_path)
            .with_context(|| format!("Cannot create '{}'", csv_path.display()))?;
        writeln!(f, "{HEADER}")?;
        tracing::debug!("Created metrics CSV: '{}'", csv_path.display());

        Ok(Self { csv_path })
    }

    /// Append one epoch's metrics as a new row in the CSV.
    pub fn log(&self, m: &EpochMetrics) -> Result<()> {
        let mut f = OpenOptions::new()
            .append(true)
            .open(&self.csv_path)
            .with_context(|| format!("Cannot open '{}'", self.csv_path.display()))?;

        writeln!(
            f,
            "{},{:.6},{:.6},{:.6},{:.6},{}",
            m.epoch,
            m.train_loss,
            m.train_acc,
            m.valid_loss,
            m.valid_acc,
            m.seconds,
        )?;

        tracing::debug!(
            "Logged epoch {} metrics: train_loss={:.4}, valid_loss={:.4}",
            m.epoch,
            m.train_loss,
            m.valid_loss,
        );

        Ok(())
    }

    pub fn csv_path(&self) -> &Path {
        &self.csv_path
    }
}
