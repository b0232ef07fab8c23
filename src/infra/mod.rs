// ============================================================
// Layer 6 — Infrastructure Layer
// ============================================================
// File-system concerns shared by the use cases:
//
//   checkpoint.rs: Saving and loading the classifier
//                   Full-precision MessagePack record of every
//                   parameter and running statistic, plus the
//                   model and training configs as JSON so
//                   inference can rebuild the model.
//
//   metrics.rs   : Training metrics logging
//                   One CSV row per epoch (loss and accuracy
//                   on both splits).
//
//   plot.rs      : Learning-rate sweep output
//                   PNG line plot and CSV of the recorded
//                   (rate, smoothed loss) pairs.

/// Model checkpoint saving and loading
pub mod checkpoint;

/// Training metrics CSV logger
pub mod metrics;

/// Learning-rate finder plot writer
pub mod plot;
