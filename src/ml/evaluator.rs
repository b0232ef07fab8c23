// ============================================================
// Layer 5 — Loss and Metric Evaluation
// ============================================================
// Keras-style metrics: the loss is the mean of per-batch losses,
// accuracy counts every sample. Both accumulators are reset at
// the start of every epoch phase and read at its end.
//
// Cross-entropy here is computed from probabilities (not logits)
// because Monte-Carlo dropout averages probabilities before the
// loss is taken. Probabilities are clipped to [ε, 1 − ε] first.

use burn::prelude::*;

use crate::data::batcher::DigitBatch;
use crate::ml::model::DigitClassifier;

const PROB_EPSILON: f64 = 1e-7;

/// Running mean of scalar observations.
#[derive(Debug, Clone, Default)]
pub struct MeanMetric {
    sum:   f64,
    count: usize,
}

impl MeanMetric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, value: f64) {
        self.sum   += value;
        self.count += 1;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// 0.0 when nothing was observed.
    pub fn result(&self) -> f64 {
        if self.count == 0 { 0.0 } else { self.sum / self.count as f64 }
    }
}

/// Fraction of correctly classified samples.
#[derive(Debug, Clone, Default)]
pub struct AccuracyMetric {
    correct: usize,
    total:   usize,
}

impl AccuracyMetric {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn update(&mut self, correct: usize, total: usize) {
        self.correct += correct.min(total);
        self.total   += total;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    /// In [0, 1]; 0.0 when nothing was observed.
    pub fn result(&self) -> f64 {
        if self.total == 0 { 0.0 } else { self.correct as f64 / self.total as f64 }
    }
}

/// Loss and accuracy of one evaluation pass.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EvalResult {
    pub loss:     f64,
    /// Fraction in [0, 1]
    pub accuracy: f64,
}

/// Mean categorical cross-entropy of `probabilities` [n, classes]
/// against integer `targets` [n].
pub fn categorical_crossentropy<B: Backend>(
    probabilities: Tensor<B, 2>,
    targets:       Tensor<B, 1, Int>,
) -> Tensor<B, 1> {
    let [batch_size, _] = probabilities.dims();
    probabilities
        .clamp(PROB_EPSILON, 1.0 - PROB_EPSILON)
        .gather(1, targets.reshape([batch_size, 1]))
        .log()
        .neg()
        .mean()
}

/// Number of rows whose arg-max equals the target.
pub fn count_correct<B: Backend>(
    probabilities: Tensor<B, 2>,
    targets:       Tensor<B, 1, Int>,
) -> usize {
    // argmax(1) returns shape [batch, 1]: flatten before comparing
    let predicted = probabilities.argmax(1).flatten::<1>(0, 1);
    let correct: i64 = predicted
        .equal(targets)
        .int()
        .sum()
        .into_scalar()
        .elem::<i64>();
    correct.max(0) as usize
}

/// One pass over `batches` with a single forward per batch.
///
/// The mode follows the model's backend: pass `model.valid()` for
/// inference-mode evaluation.
pub fn evaluate<B, I>(model: &DigitClassifier<B>, batches: I) -> EvalResult
where
    B: Backend,
    I: IntoIterator<Item = DigitBatch<B>>,
{
    let mut loss     = MeanMetric::new();
    let mut accuracy = AccuracyMetric::new();

    for batch in batches {
        let size  = batch.len();
        let probs = model.forward(batch.images).detach();
        loss.update(
            categorical_crossentropy(probs.clone(), batch.targets.clone())
                .into_scalar()
                .elem::<f64>(),
        );
        accuracy.update(count_correct(probs, batch.targets), size);
    }

    EvalResult { loss: loss.result(), accuracy: accuracy.result() }
}

/// Monte-Carlo dropout: average the probabilities of `num_samples`
/// forward passes per batch, then score the average.
///
/// Dropout is only stochastic on an autodiff backend, so pass the
/// training-mode model here (ideally a `duplicate`, since every
/// pass also moves the BatchNorm running statistics).
pub fn evaluate_mc_dropout<B, I>(
    model:       &DigitClassifier<B>,
    batches:     I,
    num_samples: usize,
) -> EvalResult
where
    B: Backend,
    I: IntoIterator<Item = DigitBatch<B>>,
{
    let num_samples  = num_samples.max(1);
    let mut loss     = MeanMetric::new();
    let mut accuracy = AccuracyMetric::new();

    for batch in batches {
        let size    = batch.len();
        let mut sum = model.forward(batch.images.clone()).detach();
        for _ in 1..num_samples {
            sum = sum + model.forward(batch.images.clone()).detach();
        }
        let probs = sum.div_scalar(num_samples as f64);

        loss.update(
            categorical_crossentropy(probs.clone(), batch.targets.clone())
                .into_scalar()
                .elem::<f64>(),
        );
        accuracy.update(count_correct(probs, batch.targets), size);
    }

    EvalResult { loss: loss.result(), accuracy: accuracy.result() }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::batcher::DigitBatcher;
    use crate::domain::sample::{DigitSample, INPUT_DIM};
    use crate::ml::model::DigitClassifierConfig;
    use burn::{
        backend::{Autodiff, NdArray},
        data::dataloader::batcher::Batcher,
    };

    type TestBackend         = NdArray;
    type TestAutodiffBackend = Autodiff<NdArray>;

    fn probs_and_targets() -> (Tensor<TestBackend, 2>, Tensor<TestBackend, 1, Int>) {
        let device = Default::default();
        let probs = Tensor::<TestBackend, 1>::from_floats([0.9, 0.1, 0.2, 0.8, 0.6, 0.4].as_slice(), &device)
            .reshape([3, 2]);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([0, 1, 1].as_slice(), &device);
        (probs, targets)
    }

    fn batches<B: Backend>(device: &B::Device) -> Vec<DigitBatch<B>> {
        let batcher = DigitBatcher::<B>::new(device.clone());
        (0..3)
            .map(|b| {
                let items = (0..4)
                    .map(|i| {
                        let v = ((b * 4 + i) % 7) as f32 / 7.0;
                        DigitSample::new(vec![v; INPUT_DIM], (b + i) % 10)
                    })
                    .collect();
                batcher.batch(items)
            })
            .collect()
    }

    #[test]
    fn test_count_correct() {
        let (probs, targets) = probs_and_targets();
        assert_eq!(count_correct(probs, targets), 2);
    }

    #[test]
    fn test_crossentropy_matches_hand_computation() {
        let (probs, targets) = probs_and_targets();
        let loss = categorical_crossentropy(probs, targets).into_scalar().elem::<f64>();
        let expected = -((0.9f64).ln() + (0.8f64).ln() + (0.4f64).ln()) / 3.0;
        assert!((loss - expected).abs() < 1e-5, "{loss} vs {expected}");
    }

    #[test]
    fn test_crossentropy_of_zero_probability_is_finite() {
        let device = Default::default();
        let probs   = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0].as_slice(), &device).reshape([1, 2]);
        let targets = Tensor::<TestBackend, 1, Int>::from_ints([1].as_slice(), &device);
        let loss = categorical_crossentropy(probs, targets).into_scalar().elem::<f64>();
        assert!(loss.is_finite());
        assert!(loss > 10.0);
    }

    #[test]
    fn test_accuracy_after_reset_and_perfect_batch() {
        let mut accuracy = AccuracyMetric::new();
        accuracy.update(1, 10);
        assert!((accuracy.result() - 0.1).abs() < 1e-12);

        accuracy.reset();
        accuracy.update(32, 32);
        assert_eq!(accuracy.result(), 1.0);
    }

    #[test]
    fn test_mean_metric() {
        let mut mean = MeanMetric::new();
        assert_eq!(mean.result(), 0.0);
        mean.update(1.0);
        mean.update(3.0);
        assert_eq!(mean.result(), 2.0);
        mean.reset();
        mean.update(5.0);
        assert_eq!(mean.result(), 5.0);
    }

    #[test]
    fn test_evaluate_reports_unit_range_accuracy() {
        let device = Default::default();
        let model: DigitClassifier<TestBackend> = DigitClassifierConfig::new().init(&device);
        let result = evaluate(&model, batches::<TestBackend>(&device));

        assert!(result.loss.is_finite() && result.loss > 0.0);
        assert!((0.0..=1.0).contains(&result.accuracy));
    }

    #[test]
    fn test_single_sample_mc_dropout_equals_one_training_pass() {
        // Dropout 0 removes the randomness; the remaining difference
        // between the two paths would be a bug in the averaging.
        let device = Default::default();
        let model: DigitClassifier<TestAutodiffBackend> = DigitClassifierConfig::new()
            .with_dropout(0.0)
            .init(&device);

        let mc    = evaluate_mc_dropout(&model, batches::<TestAutodiffBackend>(&device), 1);
        let plain = evaluate(&model, batches::<TestAutodiffBackend>(&device));

        assert!((mc.loss - plain.loss).abs() < 1e-6);
        assert_eq!(mc.accuracy, plain.accuracy);
    }

    #[test]
    fn test_mc_dropout_averages_to_plain_inference_without_dropout() {
        let device = Default::default();
        let model: DigitClassifier<TestBackend> = DigitClassifierConfig::new()
            .with_dropout(0.0)
            .init(&device);

        let mc    = evaluate_mc_dropout(&model, batches::<TestBackend>(&device), 5);
        let plain = evaluate(&model, batches::<TestBackend>(&device));

        assert!((mc.loss - plain.loss).abs() < 1e-5);
        assert_eq!(mc.accuracy, plain.accuracy);
    }
}
