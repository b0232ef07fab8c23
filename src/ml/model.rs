// ============================================================
// Layer 5 — Digit Classifier (Burn)
// ============================================================
// A small MLP split into two blocks:
//
//   encoder: Dense(128) → BatchNorm → ReLU → Dense(32) → BatchNorm → ReLU
//   decoder: Dense(10)  → Dropout(0.1) → Softmax
//
// Training vs inference mode is decided by the backend, the way
// every Burn module does it:
//   - on an Autodiff backend BatchNorm uses batch statistics and
//     updates its running averages, Dropout zeroes activations
//   - after model.valid() (inner backend) BatchNorm uses the
//     running averages and Dropout is the identity

use burn::{
    nn::{
        loss::CrossEntropyLossConfig,
        BatchNorm, BatchNormConfig,
        Dropout, DropoutConfig,
        Linear, LinearConfig,
    },
    prelude::*,
    tensor::activation::{relu, softmax},
};

use crate::ml::interpolate::Interpolate;

// NOTE: #[derive(Config)] already generates Clone and Serialize/Deserialize.
#[derive(Config, Debug)]
pub struct DigitClassifierConfig {
    #[config(default = 784)]
    pub input_dim: usize,
    #[config(default = 10)]
    pub num_classes: usize,
    #[config(default = 128)]
    pub hidden_dim: usize,
    #[config(default = 32)]
    pub bottleneck_dim: usize,
    #[config(default = 0.1)]
    pub dropout: f64,
    /// Weight of the newest batch in the running statistics
    /// (Keras momentum 0.99 expressed the Burn way).
    #[config(default = 0.01)]
    pub norm_momentum: f64,
    #[config(default = 1e-3)]
    pub norm_epsilon: f64,
}

impl DigitClassifierConfig {
    pub fn init<B: Backend>(&self, device: &B::Device) -> DigitClassifier<B> {
        let norm = |features: usize| {
            BatchNormConfig::new(features)
                .with_momentum(self.norm_momentum)
                .with_epsilon(self.norm_epsilon)
                .init::<B, 0>(device)
        };

        let encoder = Encoder {
            dense1: LinearConfig::new(self.input_dim, self.hidden_dim).init(device),
            norm1:  norm(self.hidden_dim),
            dense2: LinearConfig::new(self.hidden_dim, self.bottleneck_dim).init(device),
            norm2:  norm(self.bottleneck_dim),
        };
        let decoder = Decoder {
            dense:   LinearConfig::new(self.bottleneck_dim, self.num_classes).init(device),
            dropout: DropoutConfig::new(self.dropout).init(),
        };

        DigitClassifier { encoder, decoder }
    }
}

#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    pub dense1: Linear<B>,
    pub norm1:  BatchNorm<B, 0>,
    pub dense2: Linear<B>,
    pub norm2:  BatchNorm<B, 0>,
}

impl<B: Backend> Encoder<B> {
    /// [batch, input_dim] → [batch, bottleneck_dim]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        let x = relu(self.norm1.forward(self.dense1.forward(x)));
        relu(self.norm2.forward(self.dense2.forward(x)))
    }
}

#[derive(Module, Debug)]
pub struct Decoder<B: Backend> {
    pub dense:   Linear<B>,
    pub dropout: Dropout,
}

impl<B: Backend> Decoder<B> {
    /// [batch, bottleneck_dim] → logits [batch, num_classes]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 2> {
        self.dropout.forward(self.dense.forward(x))
    }
}

#[derive(Module, Debug)]
pub struct DigitClassifier<B: Backend> {
    pub encoder: Encoder<B>,
    pub decoder: Decoder<B>,
}

/// Loss and probabilities of one training step.
pub struct ClassificationStep<B: Backend> {
    pub loss:          Tensor<B, 1>,
    pub probabilities: Tensor<B, 2>,
}

impl<B: Backend> DigitClassifier<B> {
    /// Unnormalised class scores, [batch, num_classes].
    pub fn forward_logits(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        self.decoder.forward(self.encoder.forward(images))
    }

    /// Class probabilities, each row sums to 1.
    pub fn forward(&self, images: Tensor<B, 2>) -> Tensor<B, 2> {
        softmax(self.forward_logits(images), 1)
    }

    /// Cross-entropy is taken on the logits rather than on the
    /// softmax output so the gradient stays well conditioned.
    pub fn forward_classification(
        &self,
        images:  Tensor<B, 2>,
        targets: Tensor<B, 1, Int>,
    ) -> ClassificationStep<B> {
        let logits = self.forward_logits(images);
        let loss = CrossEntropyLossConfig::new()
            .init(&logits.device())
            .forward(logits.clone(), targets);
        let probabilities = softmax(logits, 1);
        ClassificationStep { loss, probabilities }
    }

    /// Deep copy whose BatchNorm running statistics are not shared
    /// with `self`. A plain clone shares them, so forward passes on
    /// the clone would move the original's statistics too.
    pub fn duplicate(&self, config: &DigitClassifierConfig) -> Self {
        let device = self.encoder.dense1.weight.val().device();
        config
            .init::<B>(&device)
            .load_record(self.clone().into_record())
    }

    /// All parameters and running statistics, flattened in a fixed
    /// order. Used to compare two models value by value.
    #[cfg(test)]
    pub fn flat_parameters(&self) -> Vec<f32> {
        fn linear<B: Backend>(l: &Linear<B>, out: &mut Vec<f32>) {
            out.extend(l.weight.val().into_data().iter::<f32>());
            if let Some(bias) = &l.bias {
                out.extend(bias.val().into_data().iter::<f32>());
            }
        }
        fn norm<B: Backend>(n: &BatchNorm<B, 0>, out: &mut Vec<f32>) {
            out.extend(n.gamma.val().into_data().iter::<f32>());
            out.extend(n.beta.val().into_data().iter::<f32>());
            out.extend(n.running_mean.value_sync().into_data().iter::<f32>());
            out.extend(n.running_var.value_sync().into_data().iter::<f32>());
        }

        let mut out = Vec::new();
        linear(&self.encoder.dense1, &mut out);
        norm(&self.encoder.norm1, &mut out);
        linear(&self.encoder.dense2, &mut out);
        norm(&self.encoder.norm2, &mut out);
        linear(&self.decoder.dense, &mut out);
        out
    }
}

impl<B: Backend> Interpolate for Encoder<B> {
    fn interpolate(self, target: &Self, alpha: f64) -> Self {
        Self {
            dense1: self.dense1.interpolate(&target.dense1, alpha),
            norm1:  self.norm1.interpolate(&target.norm1, alpha),
            dense2: self.dense2.interpolate(&target.dense2, alpha),
            norm2:  self.norm2.interpolate(&target.norm2, alpha),
        }
    }
}

impl<B: Backend> Interpolate for Decoder<B> {
    fn interpolate(self, target: &Self, alpha: f64) -> Self {
        Self {
            dense:   self.dense.interpolate(&target.dense, alpha),
            dropout: self.dropout,
        }
    }
}

impl<B: Backend> Interpolate for DigitClassifier<B> {
    fn interpolate(self, target: &Self, alpha: f64) -> Self {
        Self {
            encoder: self.encoder.interpolate(&target.encoder, alpha),
            decoder: self.decoder.interpolate(&target.decoder, alpha),
        }
    }
}
