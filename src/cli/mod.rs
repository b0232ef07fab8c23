// ============================================================
// Layer 1 — CLI / Presentation Layer
// ============================================================
// Entry point for all user interaction, parsed with `clap`.
// All work is delegated to Layer 2 (application); this layer
// only routes and prints results.
//
// Three commands are supported:
//   1. `train`    : trains the classifier on MNIST
//   2. `inference`: classifies one image with the saved model
//   3. `find-lr`  : learning-rate sweep with a plot

pub mod commands;

use anyhow::Result;
use clap::Parser;
use commands::{Commands, FindLrArgs, InferenceArgs, TrainArgs};

use crate::application::{find_lr_use_case::FindLrConfig, train_use_case::TrainConfig};
use crate::ml::backend::DeviceChoice;

#[derive(Parser, Debug)]
#[command(
    name = "mnist-mlp",
    version = "0.1.0",
    about = "Train an MLP digit classifier on MNIST, find a learning rate, classify images."
)]
pub struct Cli {
    /// The subcommand to run
    #[command(subcommand)]
    pub command: Commands,

    /// GPU device id to run on; empty or absent means CPU only
    #[arg(long, global = true)]
    pub gpu: Option<String>,

    /// 0 prints results only, 1 adds per-epoch lines, 2+ traces everything
    #[arg(long, global = true, default_value_t = 0)]
    pub verbose: u8,
}

impl Cli {
    pub fn run(self) -> Result<()> {
        let device = DeviceChoice::from_flag(self.gpu.as_deref())?;
        match self.command {
            Commands::Train(args)     => run_train(args, device, self.verbose),
            Commands::Inference(args) => run_inference(args, device, self.verbose),
            Commands::FindLr(args)    => run_find_lr(args, device, self.verbose),
        }
    }
}

/// Handles the `train` subcommand.
fn run_train(args: TrainArgs, device: DeviceChoice, verbose: u8) -> Result<()> {
    use crate::application::train_use_case::TrainUseCase;

    let config = TrainConfig { device, verbose, ..args.into() };
    let checkpoint_dir = config.checkpoint_dir.clone();
    tracing::info!("Starting training with optimizer '{}'", config.optimizer);

    let summary = TrainUseCase::new(config).execute()?;
    if let Some(last) = summary.history.last() {
        tracing::info!(
            "Final epoch {}: test cce {:.4}, acc {:.2}%",
            last.epoch,
            last.valid_loss,
            last.valid_acc * 100.0
        );
    }
    if let Some(swa) = summary.swa {
        tracing::info!("SWA model: test cce {:.4}, acc {:.2}%", swa.loss, swa.accuracy * 100.0);
    }
    if let Some(mc) = summary.mc_dropout {
        tracing::info!(
            "MC dropout moved test accuracy by {:+.2} points",
            (mc.with.accuracy - mc.without.accuracy) * 100.0
        );
    }

    println!("Training complete. Model saved to '{}'.", checkpoint_dir);
    Ok(())
}

/// Handles the `inference` subcommand.
fn run_inference(args: InferenceArgs, device: DeviceChoice, verbose: u8) -> Result<()> {
    use crate::application::infer_use_case::InferUseCase;

    let prediction = InferUseCase::new(&args.checkpoint_dir, device).classify(&args.image_path)?;
    println!(
        "it is a: {} with probability {:4.2}%",
        prediction.class,
        prediction.probability * 100.0
    );
    if verbose > 0 {
        for (class, p) in prediction.probabilities.iter().enumerate() {
            println!("  {class}: {:6.2}%", p * 100.0);
        }
    }
    Ok(())
}

/// Handles the `find-lr` subcommand.
fn run_find_lr(args: FindLrArgs, device: DeviceChoice, verbose: u8) -> Result<()> {
    use crate::application::find_lr_use_case::FindLrUseCase;

    let config = FindLrConfig { device, ..args.into() };
    let report = FindLrUseCase::new(config).execute()?;

    if verbose > 0 {
        for p in &report.history {
            println!("lr {:.3e} loss {:.4}", p.lr, p.loss);
        }
    }
    if !report.completed {
        println!("sweep ran out of training batches before reaching the max learning rate");
    }
    if let Some(best) = report.best_lr {
        println!("lowest smoothed loss at lr {:.3e}", best);
    }
    println!("Learning rate plot saved to '{}'.", report.plot_path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::optim::OptimizerKind;
    use commands::OptimizerArg;

    #[test]
    fn test_train_defaults() {
        let cli = Cli::try_parse_from(["mnist-mlp", "train"]).unwrap();
        assert_eq!(cli.verbose, 0);
        assert!(cli.gpu.is_none());
        let Commands::Train(args) = cli.command else { panic!("expected train") };

        let cfg: TrainConfig = args.into();
        assert_eq!(cfg.optimizer, OptimizerKind::Adam);
        assert_eq!(cfg.epochs, 30);
        assert!(!cfg.use_swa && !cfg.use_lookahead && !cfg.mc_dropout);
    }

    #[test]
    fn test_train_flags_and_globals() {
        let cli = Cli::try_parse_from([
            "mnist-mlp", "train", "--optimizer", "adamw", "--use-swa", "--use-lookahead",
            "--mc-dropout", "--gpu", "0", "--verbose", "1",
        ])
        .unwrap();
        assert_eq!(cli.gpu.as_deref(), Some("0"));
        assert_eq!(cli.verbose, 1);
        let Commands::Train(args) = cli.command else { panic!("expected train") };
        assert_eq!(args.optimizer, OptimizerArg::AdamW);
        assert!(args.use_swa && args.use_lookahead && args.mc_dropout);
    }

    #[test]
    fn test_optimizer_names_are_case_insensitive() {
        let cli = Cli::try_parse_from(["mnist-mlp", "find-lr", "--optimizer", "RMSprop"]).unwrap();
        let Commands::FindLr(args) = cli.command else { panic!("expected find-lr") };
        assert_eq!(OptimizerKind::from(args.optimizer), OptimizerKind::RmsProp);
    }

    #[test]
    fn test_unknown_optimizer_is_rejected() {
        assert!(Cli::try_parse_from(["mnist-mlp", "train", "--optimizer", "lion"]).is_err());
    }

    #[test]
    fn test_inference_requires_image_path() {
        assert!(Cli::try_parse_from(["mnist-mlp", "inference"]).is_err());
        let cli = Cli::try_parse_from(["mnist-mlp", "inference", "--image-path", "seven.png"]).unwrap();
        let Commands::Inference(args) = cli.command else { panic!("expected inference") };
        assert_eq!(args.image_path, "seven.png");
        assert_eq!(args.checkpoint_dir, "models/mnist_mlp");
    }
}
