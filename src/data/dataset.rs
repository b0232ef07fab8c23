use burn::data::dataset::Dataset;

use crate::domain::sample::DigitSample;

/// In-memory collection of digit samples, served in insertion order.
pub struct DigitDataset {
    samples: Vec<DigitSample>,
}

impl DigitDataset {
    pub fn new(samples: Vec<DigitSample>) -> Self { Self { samples } }

    pub fn sample_count(&self) -> usize { self.samples.len() }

    /// Number of batches a loader with `batch_size` will yield,
    /// counting a trailing partial batch.
    pub fn batch_count(&self, batch_size: usize) -> usize {
        self.samples.len().div_ceil(batch_size.max(1))
    }
}

impl Dataset<DigitSample> for DigitDataset {
    fn get(&self, index: usize) -> Option<DigitSample> {
        self.samples.get(index).cloned()
    }

    fn len(&self) -> usize {
        self.samples.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_batch_count_includes_partial_batch() {
        let samples = (0..70).map(|i| DigitSample::new(vec![0.0; 2], i % 10)).collect();
        let dataset = DigitDataset::new(samples);
        assert_eq!(dataset.batch_count(32), 3);
        assert_eq!(dataset.batch_count(70), 1);
        assert_eq!(dataset.len(), 70);
        assert_eq!(dataset.get(69).map(|s| s.label), Some(9));
        assert!(dataset.get(70).is_none());
    }
}
