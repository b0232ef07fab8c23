// ============================================================
// Layer 3 — Digit Sample and Prediction
// ============================================================
// A sample is one flattened grayscale digit image together with
// its class label. Pixels are row-major and already scaled into
// [0, 1] by the time a DigitSample exists.
//
// A prediction is what the inference driver reports back: the
// arg-max class and the probability the model assigned to it.

use serde::{Deserialize, Serialize};

/// Side length of an MNIST image in pixels.
pub const IMAGE_SIDE: usize = 28;

/// Number of values in a flattened image (28 * 28).
pub const INPUT_DIM: usize = IMAGE_SIDE * IMAGE_SIDE;

/// Number of digit classes (0 through 9).
pub const NUM_CLASSES: usize = 10;

/// One labelled training or validation example.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DigitSample {
    /// Row-major pixel intensities in [0, 1], length INPUT_DIM
    pub pixels: Vec<f32>,

    /// Class index in [0, NUM_CLASSES)
    pub label: usize,
}

impl DigitSample {
    pub fn new(pixels: Vec<f32>, label: usize) -> Self {
        debug_assert!(label < NUM_CLASSES, "label {label} out of range");
        Self { pixels, label }
    }
}

/// The outcome of classifying a single image.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    /// Arg-max class index
    pub class: usize,

    /// Probability of `class`, in [0, 1]
    pub probability: f32,

    /// Full probability distribution over all classes
    pub probabilities: Vec<f32>,
}

impl Prediction {
    /// Pick the most probable class out of a probability vector.
    /// Returns None for an empty vector.
    pub fn from_probabilities(probabilities: Vec<f32>) -> Option<Self> {
        let (class, probability) = probabilities
            .iter()
            .copied()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(&b.1))?;
        Some(Self { class, probability, probabilities })
    }
}
