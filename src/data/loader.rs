// ============================================================
// Layer 4 — Sample Sources
// ============================================================
// MnistSource wraps burn's built-in MNIST dataset. The first
// call downloads the IDX files into burn's cache directory;
// later calls read them from disk.
//
// Pixels arrive as f32 values in 0..=255 laid out as a 28x28
// array. They are flattened row-major and divided by 255 so the
// model sees the same [0, 1] inputs that inference produces.

use anyhow::Result;
use burn::data::dataset::{
    vision::{MnistDataset, MnistItem},
    Dataset,
};

use crate::domain::{sample::DigitSample, traits::DigitSource};

/// The standard 60k/10k MNIST train/test split.
#[derive(Debug, Default, Clone, Copy)]
pub struct MnistSource;

impl MnistSource {
    pub fn new() -> Self {
        Self
    }

    fn convert(dataset: MnistDataset) -> Vec<DigitSample> {
        dataset.iter().map(to_sample).collect()
    }
}

impl DigitSource for MnistSource {
    fn train_samples(&self) -> Result<Vec<DigitSample>> {
        tracing::info!("Loading MNIST training split");
        let samples = Self::convert(MnistDataset::train());
        tracing::info!("Loaded {} training samples", samples.len());
        Ok(samples)
    }

    fn valid_samples(&self) -> Result<Vec<DigitSample>> {
        tracing::info!("Loading MNIST test split");
        let samples = Self::convert(MnistDataset::test());
        tracing::info!("Loaded {} validation samples", samples.len());
        Ok(samples)
    }
}

fn to_sample(item: MnistItem) -> DigitSample {
    let pixels = item
        .image
        .iter()
        .flatten()
        .map(|&p| p / 255.0)
        .collect();
    DigitSample::new(pixels, item.label as usize)
}

/// A fixed pair of sample vectors, used in place of the download.
#[cfg(test)]
#[derive(Debug, Clone, Default)]
pub struct InMemorySource {
    train: Vec<DigitSample>,
    valid: Vec<DigitSample>,
}

#[cfg(test)]
impl InMemorySource {
    pub fn new(train: Vec<DigitSample>, valid: Vec<DigitSample>) -> Self {
        Self { train, valid }
    }
}

#[cfg(test)]
impl DigitSource for InMemorySource {
    fn train_samples(&self) -> Result<Vec<DigitSample>> {
        Ok(self.train.clone())
    }

    fn valid_samples(&self) -> Result<Vec<DigitSample>> {
        Ok(self.valid.clone())
    }
}

/// Separable toy digits: class k lights up the k-th band of pixels.
#[cfg(test)]
pub(crate) fn toy_samples(count: usize, seed: u64) -> Vec<DigitSample> {
    use crate::domain::sample::INPUT_DIM;
    use rand::{rngs::StdRng, Rng, SeedableRng};

    let mut rng = StdRng::seed_from_u64(seed);
    let band    = INPUT_DIM / 10;
    (0..count)
        .map(|i| {
            let label  = i % 10;
            let pixels = (0..INPUT_DIM)
                .map(|p| {
                    let noise: f32 = rng.gen_range(0.0..0.1);
                    if p / band == label { 0.9 + noise } else { noise }
                })
                .collect();
            DigitSample::new(pixels, label)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::sample::INPUT_DIM;

    #[test]
    fn test_mnist_item_is_flattened_and_scaled() {
        let mut image = [[0.0f32; 28]; 28];
        image[0][1] = 255.0;
        image[27][27] = 127.5;
        let sample = to_sample(MnistItem { image, label: 7 });

        assert_eq!(sample.label, 7);
        assert_eq!(sample.pixels.len(), INPUT_DIM);
        assert_eq!(sample.pixels[1], 1.0);
        assert!((sample.pixels[INPUT_DIM - 1] - 0.5).abs() < 1e-6);
        assert!(sample.pixels.iter().all(|p| (0.0..=1.0).contains(p)));
    }

    #[test]
    fn test_in_memory_source_returns_both_splits() {
        let train = vec![DigitSample::new(vec![0.0; 4], 1)];
        let valid = vec![DigitSample::new(vec![1.0; 4], 2), DigitSample::new(vec![0.5; 4], 3)];
        let source = InMemorySource::new(train, valid);

        assert_eq!(source.train_samples().unwrap().len(), 1);
        assert_eq!(source.valid_samples().unwrap().len(), 2);
    }

    #[test]
    fn test_toy_samples_cover_every_class() {
        let samples = toy_samples(20, 0);
        assert_eq!(samples.len(), 20);
        for class in 0..10 {
            assert_eq!(samples.iter().filter(|s| s.label == class).count(), 2);
        }
        assert!(samples.iter().all(|s| s.pixels.len() == INPUT_DIM));
    }
}
