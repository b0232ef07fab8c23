// ============================================================
// Layer 5 — Stochastic Weight Averaging
// ============================================================
// Izmailov et al. (2018). Once `start_step` optimizer steps have
// run, every `frequency` steps the current weights are folded
// into an equal-weight running mean:
//
//   avg ← avg + (θ − avg) / (n + 1)
//
// The average lives next to the optimizer rather than inside it,
// so it works with any ModelOptimizer (lookahead included).
// After training the averaged weights are swapped into the model;
// BatchNorm statistics must then be recomputed by the caller.

use burn::prelude::*;

use crate::ml::{interpolate::Interpolate, model::DigitClassifier};

pub struct StochasticWeightAverage<B: Backend> {
    start_step: usize,
    frequency:  usize,
    average:    Option<DigitClassifier<B>>,
    count:      usize,
}

impl<B: Backend> StochasticWeightAverage<B> {
    pub fn new(start_step: usize, frequency: usize) -> Self {
        Self { start_step, frequency: frequency.max(1), average: None, count: 0 }
    }

    /// Called after optimizer step number `step` (1-based).
    pub fn observe(&mut self, step: usize, model: &DigitClassifier<B>) {
        if step < self.start_step || (step - self.start_step) % self.frequency != 0 {
            return;
        }

        self.average = Some(match self.average.take() {
            None          => model.clone(),
            Some(average) => average.interpolate(model, 1.0 / (self.count + 1) as f64),
        });
        self.count += 1;

        if self.count == 1 {
            tracing::info!("SWA: started averaging at step {}", step);
        }
    }

    /// How many snapshots went into the average.
    pub fn count(&self) -> usize {
        self.count
    }

    /// Replace the learnable weights of `model` with the average.
    /// Returns `model` untouched when nothing was averaged yet.
    pub fn apply(&self, model: DigitClassifier<B>) -> DigitClassifier<B> {
        match &self.average {
            Some(average) => model.interpolate(average, 1.0),
            None          => model,
        }
    }
}
