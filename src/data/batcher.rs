// ============================================================
// Layer 4 — Digit Batcher
// ============================================================
// Implements Burn's Batcher trait to turn a Vec<DigitSample>
// into tensors on the target device.
//
//   Input:  N samples, each with 784 pixels and one label
//   Output: images [N, 784] (float), targets [N] (int)
//
// Every sample has the same pixel count, so flattening all
// pixels into one Vec and reshaping is enough.

use burn::{
    data::dataloader::batcher::Batcher,
    prelude::*,
};

use crate::domain::sample::DigitSample;

/// A batch of digits ready for the model forward pass.
/// B is the Burn Backend, so the same batcher serves the
/// autodiff backend (training) and the inner backend (validation).
#[derive(Debug, Clone)]
pub struct DigitBatch<B: Backend> {
    /// Pixel rows: shape: [batch_size, 784]
    pub images: Tensor<B, 2>,

    /// Class labels: shape: [batch_size]
    pub targets: Tensor<B, 1, Int>,
}

impl<B: Backend> DigitBatch<B> {
    pub fn len(&self) -> usize {
        self.targets.dims()[0]
    }
}

/// Holds the target device so tensors are created on the
/// correct CPU/GPU.
#[derive(Clone, Debug)]
pub struct DigitBatcher<B: Backend> {
    pub device: B::Device,
}

impl<B: Backend> DigitBatcher<B> {
    pub fn new(device: B::Device) -> Self {
        Self { device }
    }
}

impl<B: Backend> Batcher<DigitSample, DigitBatch<B>> for DigitBatcher<B> {
    fn batch(&self, items: Vec<DigitSample>) -> DigitBatch<B> {
        let batch_size = items.len();
        let input_dim  = items.first().map(|s| s.pixels.len()).unwrap_or(0);

        let pixels: Vec<f32> = items
            .iter()
            .flat_map(|s| s.pixels.iter().copied())
            .collect();

        let labels: Vec<i32> = items
            .iter()
            .map(|s| s.label as i32)
            .collect();

        let images = Tensor::<B, 1>::from_floats(pixels.as_slice(), &self.device)
            .reshape([batch_size, input_dim]);

        let targets = Tensor::<B, 1, Int>::from_ints(labels.as_slice(), &self.device);

        DigitBatch { images, targets }
    }
}
