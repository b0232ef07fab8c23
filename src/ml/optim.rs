// ============================================================
// Layer 5 — Optimizers
// ============================================================
// The training loop talks to a single object-safe trait,
// ModelOptimizer, so the optimizer can be chosen at runtime
// from the command line and wrapped (lookahead) without the
// trainer knowing the concrete type.
//
// Every burn optimizer (OptimizerAdaptor<Adam, ..> etc.) is
// adapted through BurnOptimizer. Lookahead wraps any
// ModelOptimizer and is itself one.

use burn::{
    optim::{
        momentum::MomentumConfig,
        AdaGradConfig, AdamConfig, AdamWConfig, GradientsParams, Optimizer, RmsPropConfig,
        SgdConfig,
    },
    tensor::backend::AutodiffBackend,
};
use serde::{Deserialize, Serialize};

use crate::ml::{interpolate::Interpolate, model::DigitClassifier};

/// Optimizers selectable by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OptimizerKind {
    #[default]
    Adam,
    AdamW,
    Sgd,
    Momentum,
    RmsProp,
    AdaGrad,
}

impl OptimizerKind {
    /// Short lowercase name, used on the command line and in file names.
    pub fn name(&self) -> &'static str {
        match self {
            OptimizerKind::Adam     => "adam",
            OptimizerKind::AdamW    => "adamw",
            OptimizerKind::Sgd      => "sgd",
            OptimizerKind::Momentum => "momentum",
            OptimizerKind::RmsProp  => "rmsprop",
            OptimizerKind::AdaGrad  => "adagrad",
        }
    }
}

impl std::fmt::Display for OptimizerKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// Update rule applied to the classifier after every backward pass.
pub trait ModelOptimizer<B: AutodiffBackend> {
    fn step(
        &mut self,
        lr:    f64,
        model: DigitClassifier<B>,
        grads: GradientsParams,
    ) -> DigitClassifier<B>;
}

/// Adapts any burn `Optimizer` to `ModelOptimizer`.
pub struct BurnOptimizer<O>(pub O);

impl<B, O> ModelOptimizer<B> for BurnOptimizer<O>
where
    B: AutodiffBackend,
    O: Optimizer<DigitClassifier<B>, B>,
{
    fn step(
        &mut self,
        lr:    f64,
        model: DigitClassifier<B>,
        grads: GradientsParams,
    ) -> DigitClassifier<B> {
        self.0.step(lr, model, grads)
    }
}

/// Build the base optimizer for `kind`. Hyperparameters follow
/// the Keras defaults the model was tuned with.
pub fn build_optimizer<B: AutodiffBackend>(kind: OptimizerKind) -> Box<dyn ModelOptimizer<B>> {
    tracing::debug!("Building optimizer '{}'", kind);
    match kind {
        OptimizerKind::Adam => Box::new(BurnOptimizer(
            AdamConfig::new()
                .with_epsilon(1e-7)
                .init::<B, DigitClassifier<B>>(),
        )),
        OptimizerKind::AdamW => Box::new(BurnOptimizer(
            AdamWConfig::new()
                .with_epsilon(1e-7)
                .init::<B, DigitClassifier<B>>(),
        )),
        OptimizerKind::Sgd => Box::new(BurnOptimizer(
            SgdConfig::new().init::<B, DigitClassifier<B>>(),
        )),
        OptimizerKind::Momentum => Box::new(BurnOptimizer(
            SgdConfig::new()
                .with_momentum(Some(
                    MomentumConfig::new().with_momentum(0.9).with_dampening(0.0),
                ))
                .init::<B, DigitClassifier<B>>(),
        )),
        OptimizerKind::RmsProp => Box::new(BurnOptimizer(
            RmsPropConfig::new()
                .with_alpha(0.9)
                .init::<B, DigitClassifier<B>>(),
        )),
        OptimizerKind::AdaGrad => Box::new(BurnOptimizer(
            AdaGradConfig::new().init::<B, DigitClassifier<B>>(),
        )),
    }
}

// ─── Lookahead ────────────────────────────────────────────────────────────────
/// Lookahead settings: sync every `sync_period` fast steps and
/// move the slow weights `alpha` of the way toward the fast ones.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LookaheadConfig {
    pub sync_period: usize,
    pub alpha:       f64,
}

impl Default for LookaheadConfig {
    fn default() -> Self {
        Self { sync_period: 5, alpha: 0.5 }
    }
}

/// Zhang et al. (2019): k fast steps with the inner optimizer,
/// then slow ← slow + α(fast − slow) and fast ← slow.
pub struct Lookahead<B: AutodiffBackend> {
    inner:  Box<dyn ModelOptimizer<B>>,
    config: LookaheadConfig,
    slow:   Option<DigitClassifier<B>>,
    steps:  usize,
}

impl<B: AutodiffBackend> Lookahead<B> {
    pub fn new(inner: Box<dyn ModelOptimizer<B>>, config: LookaheadConfig) -> Self {
        Self { inner, config: config.normalized(), slow: None, steps: 0 }
    }
}

impl LookaheadConfig {
    fn normalized(self) -> Self {
        Self {
            sync_period: self.sync_period.max(1),
            alpha:       self.alpha.clamp(0.0, 1.0),
        }
    }
}

impl<B: AutodiffBackend> ModelOptimizer<B> for Lookahead<B> {
    fn step(
        &mut self,
        lr:    f64,
        model: DigitClassifier<B>,
        grads: GradientsParams,
    ) -> DigitClassifier<B> {
        // Slow weights start from the weights before the first fast step.
        let slow = match self.slow.take() {
            Some(slow) => slow,
            None       => model.clone(),
        };

        let fast = self.inner.step(lr, model, grads);
        self.steps += 1;

        if self.steps % self.config.sync_period != 0 {
            self.slow = Some(slow);
            return fast;
        }

        // slow + α(fast − slow) == fast·α + slow·(1 − α)
        let synced = fast.interpolate(&slow, 1.0 - self.config.alpha);
        self.slow = Some(synced.clone());
        tracing::trace!("Lookahead sync after {} fast steps", self.steps);
        synced
    }
}

/// Base optimizer for `kind`, wrapped in lookahead when requested.
pub fn build_training_optimizer<B: AutodiffBackend>(
    kind:      OptimizerKind,
    lookahead: Option<LookaheadConfig>,
) -> Box<dyn ModelOptimizer<B>> {
    let base = build_optimizer::<B>(kind);
    match lookahead {
        Some(config) => {
            tracing::info!(
                "Wrapping '{}' with lookahead (k={}, alpha={})",
                kind, config.sync_period, config.alpha
            );
            Box::new(Lookahead::new(base, config))
        }
        None => base,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::{batcher::DigitBatcher, loader::toy_samples};
    use crate::ml::model::DigitClassifierConfig;
    use burn::{
        backend::{Autodiff, NdArray},
        data::dataloader::batcher::Batcher,
        prelude::*,
    };

    type TestAutodiffBackend = Autodiff<NdArray>;

    /// Replaces the model with a fixed target on every step so the
    /// lookahead arithmetic can be checked exactly.
    struct JumpTo(DigitClassifier<TestAutodiffBackend>);

    impl ModelOptimizer<TestAutodiffBackend> for JumpTo {
        fn step(
            &mut self,
            _lr:   f64,
            model: DigitClassifier<TestAutodiffBackend>,
            _grads: GradientsParams,
        ) -> DigitClassifier<TestAutodiffBackend> {
            model.interpolate(&self.0, 1.0)
        }
    }

    fn loss_grads(
        model: &DigitClassifier<TestAutodiffBackend>,
        device: &<TestAutodiffBackend as Backend>::Device,
    ) -> GradientsParams {
        // Rows must differ: identical rows give BatchNorm zero variance,
        // a zero encoder output and a zero decoder gradient.
        let batch = DigitBatcher::<TestAutodiffBackend>::new(device.clone()).batch(toy_samples(10, 0));
        let step  = model.forward_classification(batch.images, batch.targets);
        GradientsParams::from_grads(step.loss.backward(), model)
    }

    fn decoder_weights(model: &DigitClassifier<TestAutodiffBackend>) -> Vec<f32> {
        model.decoder.dense.weight.val().into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_optimizer_names() {
        assert_eq!(OptimizerKind::default(), OptimizerKind::Adam);
        assert_eq!(OptimizerKind::RmsProp.to_string(), "rmsprop");
        assert_eq!(OptimizerKind::AdamW.name(), "adamw");
    }

    #[test]
    fn test_every_optimizer_changes_weights() {
        let device = Default::default();
        let kinds = [
            OptimizerKind::Adam,
            OptimizerKind::AdamW,
            OptimizerKind::Sgd,
            OptimizerKind::Momentum,
            OptimizerKind::RmsProp,
            OptimizerKind::AdaGrad,
        ];
        for kind in kinds {
            let model: DigitClassifier<TestAutodiffBackend> = DigitClassifierConfig::new().init(&device);
            let before = decoder_weights(&model);
            let grads  = loss_grads(&model, &device);

            let mut optim = build_optimizer::<TestAutodiffBackend>(kind);
            let model = optim.step(1e-2, model, grads);
            assert_ne!(decoder_weights(&model), before, "{kind} left weights unchanged");
        }
    }

    #[test]
    fn test_lookahead_syncs_every_k_steps() {
        let device = Default::default();
        let config = DigitClassifierConfig::new();
        let start:  DigitClassifier<TestAutodiffBackend> = config.init(&device);
        let target: DigitClassifier<TestAutodiffBackend> = config.init(&device);

        let start_w  = decoder_weights(&start);
        let target_w = decoder_weights(&target);

        let mut lookahead = Lookahead::new(
            Box::new(JumpTo(target)),
            LookaheadConfig { sync_period: 2, alpha: 0.5 },
        );

        // First fast step: not a sync point, fast weights are the target.
        let grads = loss_grads(&start, &device);
        let model = lookahead.step(1e-3, start, grads);
        assert_eq!(decoder_weights(&model), target_w);

        // Second fast step syncs: halfway between start and target.
        let grads = loss_grads(&model, &device);
        let model = lookahead.step(1e-3, model, grads);
        let w = decoder_weights(&model);
        for ((got, s), t) in w.iter().zip(&start_w).zip(&target_w) {
            assert!((got - (s + t) / 2.0).abs() < 1e-6);
        }
    }
}
