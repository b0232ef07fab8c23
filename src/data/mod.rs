// ============================================================
// Layer 4 — Data Pipeline
// ============================================================
// Everything between "a source of digits" and "tensor batches
// the model can consume".
//
//   MnistSource                   → Vec<DigitSample>
//       │
//       ▼
//   DigitDataset                  → implements Burn's Dataset trait
//       │
//       ▼
//   DigitBatcher                  → stacks samples into tensors
//       │
//       ▼
//   DataLoader                    → feeds batches in dataset order
//
// The inference path skips the dataset entirely: a single image
// file is decoded by `image` into the same 784-value layout.

/// Sample sources: burn's MNIST download and an in-memory source
pub mod loader;

/// Implements Burn's Dataset trait for digit samples
pub mod dataset;

/// Implements Burn's Batcher trait to create tensor batches
pub mod batcher;

/// Decodes an external image file into a model input vector
pub mod image;
