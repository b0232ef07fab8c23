// ============================================================
// Layer 5 — Training Loop
// ============================================================
// Epoch loop with an explicit optimizer step, in the order:
//
//   for each epoch:
//     reset train metrics
//     for each train batch: forward → loss → backward → step
//     reset valid metrics
//     for each valid batch: forward (inference mode) → metrics
//     log one line
//
//   then, optionally:
//     SWA         swap in averaged weights, refresh BatchNorm
//                 statistics with one pass over the training
//                 data, re-evaluate
//     MC dropout  compare plain inference with averaged
//                 dropout-enabled predictions
//
// Burn notes:
//   - Training uses B (Autodiff<..>) so gradients are tracked
//   - model.valid() returns the model on B::InnerBackend, which
//     is what makes BatchNorm/Dropout behave in inference mode
//   - Validation batcher must therefore use B::InnerBackend

use anyhow::Result;
use burn::{
    data::dataloader::DataLoaderBuilder,
    module::AutodiffModule,
    optim::GradientsParams,
    prelude::*,
    tensor::backend::AutodiffBackend,
};
use std::{sync::Arc, time::Instant};

use crate::application::train_use_case::TrainConfig;
use crate::data::{batcher::DigitBatcher, dataset::DigitDataset};
use crate::infra::metrics::{EpochMetrics, MetricsLogger};
use crate::ml::{
    evaluator::{count_correct, evaluate, evaluate_mc_dropout, AccuracyMetric, EvalResult, MeanMetric},
    lr_finder::LrFinder,
    model::{DigitClassifier, DigitClassifierConfig},
    optim::{build_training_optimizer, ModelOptimizer},
    swa::StochasticWeightAverage,
};

/// Validation scores with and without Monte-Carlo dropout.
#[derive(Debug, Clone, Copy)]
pub struct McDropoutReport {
    pub without: EvalResult,
    pub with:    EvalResult,
}

/// Everything a training run produces.
pub struct TrainOutcome<B: AutodiffBackend> {
    pub model:      DigitClassifier<B>,
    pub history:    Vec<EpochMetrics>,
    pub swa:        Option<EvalResult>,
    pub mc_dropout: Option<McDropoutReport>,
}

pub fn run_training<B: AutodiffBackend>(
    cfg:       &TrainConfig,
    model_cfg: &DigitClassifierConfig,
    model:     DigitClassifier<B>,
    train:     DigitDataset,
    valid:     DigitDataset,
    device:    &B::Device,
    metrics:   Option<&MetricsLogger>,
) -> Result<TrainOutcome<B>> {
    let steps_per_epoch = train.batch_count(cfg.batch_size);
    let train = Arc::new(train);
    let valid = Arc::new(valid);

    // ── Data loaders (dataset order, no worker threads) ──────────────────────
    let train_loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .build(train.clone());
    let valid_loader = DataLoaderBuilder::new(DigitBatcher::<B::InnerBackend>::new(device.clone()))
        .batch_size(cfg.batch_size)
        .build(valid.clone());

    // ── Optimizer and weight averaging ────────────────────────────────────────
    let lookahead = cfg.use_lookahead.then_some(cfg.lookahead);
    let mut optim: Box<dyn ModelOptimizer<B>> =
        build_training_optimizer::<B>(cfg.optimizer, lookahead);
    let mut swa = cfg.use_swa.then(|| {
        let start = cfg.swa_start * steps_per_epoch;
        tracing::info!("SWA enabled: averaging from step {} every {} step(s)", start, cfg.swa_freq);
        StochasticWeightAverage::<B>::new(start, cfg.swa_freq)
    });

    tracing::info!(
        "Training for {} epoch(s), {} batches per epoch, optimizer '{}', lr={}",
        cfg.epochs, steps_per_epoch, cfg.optimizer, cfg.lr,
    );

    let mut model      = model;
    let mut history    = Vec::with_capacity(cfg.epochs);
    let mut step       = 0usize;
    let mut train_loss = MeanMetric::new();
    let mut train_acc  = AccuracyMetric::new();

    // ── Epoch loop ────────────────────────────────────────────────────────────
    for epoch in 1..=cfg.epochs {
        let started = Instant::now();

        // ── Training phase ────────────────────────────────────────────────────
        train_loss.reset();
        train_acc.reset();

        for batch in train_loader.iter() {
            let size    = batch.len();
            let targets = batch.targets.clone();
            let output  = model.forward_classification(batch.images, batch.targets);

            train_loss.update(output.loss.clone().into_scalar().elem::<f64>());
            train_acc.update(count_correct(output.probabilities.detach(), targets), size);

            // Backward pass + optimizer update
            let grads = output.loss.backward();
            let grads = GradientsParams::from_grads(grads, &model);
            model = optim.step(cfg.lr, model, grads);

            step += 1;
            if let Some(swa) = swa.as_mut() {
                swa.observe(step, &model);
            }
        }

        // ── Validation phase ──────────────────────────────────────────────────
        // model.valid() → DigitClassifier<B::InnerBackend>
        let valid_result = evaluate(&model.valid(), valid_loader.iter());

        let row = EpochMetrics::new(
            epoch,
            train_loss.result(),
            train_acc.result(),
            valid_result.loss,
            valid_result.accuracy,
            started.elapsed().as_secs(),
        );
        report_epoch(cfg, &row);
        if let Some(logger) = metrics {
            logger.log(&row)?;
        }
        history.push(row);
    }

    // ── SWA: swap in averaged weights ─────────────────────────────────────────
    let swa_result = match swa {
        Some(swa) if swa.count() > 0 => {
            tracing::info!("SWA: applying average of {} snapshots", swa.count());
            model = swa.apply(model);

            // Training-mode passes refresh the BatchNorm running
            // statistics for the averaged weights. No updates.
            for batch in train_loader.iter() {
                let _ = model.forward(batch.images);
            }

            let result = evaluate(&model.valid(), valid_loader.iter());
            println!(
                "SWA model cce {:.4} acc {:4.2}%",
                result.loss,
                result.accuracy * 100.0,
            );
            Some(result)
        }
        Some(_) => {
            tracing::warn!(
                "SWA: no weights averaged (swa_start={} epochs, trained {} epochs)",
                cfg.swa_start, cfg.epochs,
            );
            None
        }
        None => None,
    };

    // ── Monte-Carlo dropout comparison ────────────────────────────────────────
    let mc_result = if cfg.mc_dropout {
        let without = evaluate(&model.valid(), valid_loader.iter());
        println!(
            "test without mc dropout cce {:.4} acc {:4.2}%",
            without.loss,
            without.accuracy * 100.0,
        );

        // Dropout is only active on the autodiff backend, so the
        // stochastic passes need an autodiff validation loader.
        let mc_loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(device.clone()))
            .batch_size(cfg.batch_size)
            .build(valid.clone());
        let probe = model.duplicate(model_cfg);
        let with  = evaluate_mc_dropout(&probe, mc_loader.iter(), cfg.mc_samples);
        println!(
            "test with mc dropout cce {:.4} acc {:4.2}%",
            with.loss,
            with.accuracy * 100.0,
        );
        Some(McDropoutReport { without, with })
    } else {
        None
    };

    tracing::info!("Training complete after {} optimizer steps", step);
    Ok(TrainOutcome { model, history, swa: swa_result, mc_dropout: mc_result })
}

fn report_epoch(cfg: &TrainConfig, m: &EpochMetrics) {
    tracing::debug!(
        epoch = m.epoch,
        train_loss = m.train_loss,
        valid_loss = m.valid_loss,
        "epoch finished"
    );
    if cfg.verbose > 0 {
        println!(
            "epoch {:>3} time {} sec / epoch train cce {:.4} acc {:4.2}% test cce {:.4} acc {:4.2}%",
            m.epoch,
            m.seconds,
            m.train_loss,
            m.train_acc * 100.0,
            m.valid_loss,
            m.valid_acc * 100.0,
        );
    }
}

// ─── Learning-rate sweep ──────────────────────────────────────────────────────
/// Train on `train` batch by batch, taking the learning rate from
/// `finder` and feeding it every batch loss, until the finder is
/// done or the data runs out. Returns the finder with its history.
pub fn find_learning_rate<B: AutodiffBackend>(
    model:      DigitClassifier<B>,
    mut optim:  Box<dyn ModelOptimizer<B>>,
    train:      DigitDataset,
    batch_size: usize,
    mut finder: LrFinder,
    device:     &B::Device,
) -> LrFinder {
    let loader = DataLoaderBuilder::new(DigitBatcher::<B>::new(device.clone()))
        .batch_size(batch_size)
        .build(train);

    let mut model = model;
    for (index, batch) in loader.iter().enumerate() {
        if finder.done() {
            break;
        }
        let lr     = finder.lr();
        let output = model.forward_classification(batch.images, batch.targets);
        let loss   = output.loss.clone().into_scalar().elem::<f64>();

        let grads = GradientsParams::from_grads(output.loss.backward(), &model);
        model = optim.step(lr, model, grads);

        let next = finder.step(loss);
        tracing::debug!("lr sweep batch {:>4}: lr={:.3e} loss={:.4} next={:.3e}", index, lr, loss, next);
    }

    if !finder.done() {
        tracing::warn!("LR finder ran out of training batches before reaching max lr");
    }
    finder
}
