// ============================================================
// Layer 1 — CLI Commands and Arguments
// ============================================================
// Defines the three subcommands: `train`, `inference` and
// `find-lr`, with all their configurable flags.
//
// clap's derive macros generate the help text, the error
// messages for missing or unknown values, and the string →
// number conversions.

use clap::{Args, Subcommand, ValueEnum};

use crate::application::{find_lr_use_case::FindLrConfig, train_use_case::TrainConfig};
use crate::ml::{lr_finder::LrFinderConfig, optim::{LookaheadConfig, OptimizerKind}};

/// The top-level subcommands available to the user
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Train the digit classifier on MNIST and save it
    Train(TrainArgs),

    /// Classify one image with the saved model
    Inference(InferenceArgs),

    /// Sweep the learning rate and plot loss against it
    FindLr(FindLrArgs),
}

/// Optimizer names accepted on the command line.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OptimizerArg {
    Adam,
    #[value(name = "adamw")]
    AdamW,
    Sgd,
    Momentum,
    #[value(name = "rmsprop")]
    RmsProp,
    #[value(name = "adagrad")]
    AdaGrad,
}

impl From<OptimizerArg> for OptimizerKind {
    fn from(a: OptimizerArg) -> Self {
        match a {
            OptimizerArg::Adam     => OptimizerKind::Adam,
            OptimizerArg::AdamW    => OptimizerKind::AdamW,
            OptimizerArg::Sgd      => OptimizerKind::Sgd,
            OptimizerArg::Momentum => OptimizerKind::Momentum,
            OptimizerArg::RmsProp  => OptimizerKind::RmsProp,
            OptimizerArg::AdaGrad  => OptimizerKind::AdaGrad,
        }
    }
}

/// All arguments for the `train` command.
#[derive(Args, Debug)]
pub struct TrainArgs {
    /// Update rule used for every training step
    #[arg(long, value_enum, ignore_case = true, default_value = "adam")]
    pub optimizer: OptimizerArg,

    /// Average the weights of the late epochs (stochastic weight averaging)
    #[arg(long)]
    pub use_swa: bool,

    /// Wrap the optimizer with lookahead (k=5, alpha=0.5)
    #[arg(long)]
    pub use_lookahead: bool,

    /// Compare test scores with and without Monte-Carlo dropout
    #[arg(long)]
    pub mc_dropout: bool,

    /// Number of full passes through the training data
    #[arg(long, default_value_t = 30)]
    pub epochs: usize,

    /// Number of samples processed together in one step
    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Learning rate of the optimizer
    #[arg(long, default_value_t = 1e-3)]
    pub lr: f64,

    /// First epoch whose weights enter the SWA average
    #[arg(long, default_value_t = 25)]
    pub swa_start: usize,

    /// Average the weights every N optimizer steps
    #[arg(long, default_value_t = 1)]
    pub swa_freq: usize,

    /// Forward passes averaged per batch with MC dropout
    #[arg(long, default_value_t = 100)]
    pub mc_samples: usize,

    /// Directory the trained model is saved to
    #[arg(long, default_value = "models/mnist_mlp")]
    pub checkpoint_dir: String,

    /// Seed of the backend random number generator
    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

/// Convert CLI TrainArgs into the application-layer TrainConfig.
/// Device and verbosity come from the global flags and are set
/// by the caller.
impl From<TrainArgs> for TrainConfig {
    fn from(a: TrainArgs) -> Self {
        TrainConfig {
            checkpoint_dir: a.checkpoint_dir,
            batch_size:     a.batch_size,
            epochs:         a.epochs,
            lr:             a.lr,
            optimizer:      a.optimizer.into(),
            use_swa:        a.use_swa,
            swa_start:      a.swa_start,
            swa_freq:       a.swa_freq,
            use_lookahead:  a.use_lookahead,
            lookahead:      LookaheadConfig::default(),
            mc_dropout:     a.mc_dropout,
            mc_samples:     a.mc_samples,
            seed:           a.seed,
            ..TrainConfig::default()
        }
    }
}

/// All arguments for the `inference` command
#[derive(Args, Debug)]
pub struct InferenceArgs {
    /// Image of a single digit (any format the image crate decodes)
    #[arg(long)]
    pub image_path: String,

    /// Directory where training saved the model
    #[arg(long, default_value = "models/mnist_mlp")]
    pub checkpoint_dir: String,
}

/// All arguments for the `find-lr` command
#[derive(Args, Debug)]
pub struct FindLrArgs {
    /// Optimizer whose learning rate is swept
    #[arg(long, value_enum, ignore_case = true, default_value = "adam")]
    pub optimizer: OptimizerArg,

    /// Directory the plot and CSV are written to
    #[arg(long, default_value = "plots")]
    pub plots_dir: String,

    #[arg(long, default_value_t = 32)]
    pub batch_size: usize,

    /// Smallest learning rate of the sweep
    #[arg(long, default_value_t = 1e-7)]
    pub start_lr: f64,

    /// Largest learning rate of the sweep
    #[arg(long, default_value_t = 1e-1)]
    pub max_lr: f64,

    /// Batches needed to grow from start_lr to max_lr
    #[arg(long, default_value_t = 100)]
    pub num_steps: usize,

    #[arg(long, default_value_t = 42)]
    pub seed: u64,
}

impl From<FindLrArgs> for FindLrConfig {
    fn from(a: FindLrArgs) -> Self {
        FindLrConfig {
            optimizer:  a.optimizer.into(),
            plots_dir:  a.plots_dir,
            batch_size: a.batch_size,
            finder: LrFinderConfig {
                start_lr:  a.start_lr,
                max_lr:    a.max_lr,
                num_steps: a.num_steps,
                ..LrFinderConfig::default()
            },
            seed: a.seed,
            ..FindLrConfig::default()
        }
    }
}
