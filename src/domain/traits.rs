// ============================================================
// Layer 3 — Core Traits (Abstractions)
// ============================================================
// The training driver only needs "something that hands out a
// training split and a validation split". MNIST downloaded by
// burn is one implementation; tests use an in-memory one.

use anyhow::Result;
use crate::domain::sample::DigitSample;

// ─── DigitSource ──────────────────────────────────────────────────────────────
/// Any component that can supply labelled digit samples.
///
/// Implementations:
///   - MnistSource   → burn's MNIST dataset (downloaded on first use)
///   - InMemorySource → a fixed pair of sample vectors
pub trait DigitSource {
    /// Samples used to update the model weights.
    fn train_samples(&self) -> Result<Vec<DigitSample>>;

    /// Samples used only for evaluation.
    fn valid_samples(&self) -> Result<Vec<DigitSample>>;
}
