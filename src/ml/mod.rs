// ============================================================
// Layer 5 — ML / Model Layer (Burn)
// ============================================================
// All Burn-specific code lives here.
//
//   model.rs       : encoder/decoder MLP with BatchNorm and Dropout
//   interpolate.rs : blending of learnable weights (SWA, lookahead)
//   optim.rs       : optimizer factory and the lookahead wrapper
//   swa.rs         : stochastic weight averaging
//   lr_finder.rs   : exponential learning-rate range test
//   evaluator.rs   : cross-entropy, accuracy, MC-dropout evaluation
//   trainer.rs     : epoch loop and the learning-rate sweep
//   inferencer.rs  : single-image prediction
//   backend.rs     : CPU/GPU backend selection
//
// Reference: Burn Book §3 (Building Blocks), §5 (Training)

/// CPU (NdArray) / GPU (Wgpu) backend selection
pub mod backend;

/// Loss and metric evaluation, including Monte-Carlo dropout
pub mod evaluator;

/// Inference engine: loads a checkpoint and classifies an image
pub mod inferencer;

/// Weight interpolation shared by SWA and lookahead
pub mod interpolate;

/// Learning-rate finder
pub mod lr_finder;

/// MLP digit classifier architecture
pub mod model;

/// Optimizer factory and lookahead
pub mod optim;

/// Stochastic weight averaging
pub mod swa;

/// Training loop with validation and post-training phases
pub mod trainer;
