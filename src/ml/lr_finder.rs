// ============================================================
// Layer 5 — Learning-Rate Finder
// ============================================================
// Smith (2017) / fastai style range test. The learning rate grows
// exponentially from `start_lr` to `max_lr` over `num_steps`
// batches while the training loss is tracked with a bias-corrected
// exponential moving average. The sweep stops once the rate
// reaches `max_lr` or the smoothed loss blows past
// `divergence × best`.
//
// Plotting the recorded (rate, smoothed loss) pairs on a log
// axis shows the range where training is stable.

use serde::{Deserialize, Serialize};

/// One point of the sweep.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LrPoint {
    pub lr:   f64,
    pub loss: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LrFinderConfig {
    pub start_lr:   f64,
    pub max_lr:     f64,
    pub num_steps:  usize,
    /// Smoothing factor of the loss moving average
    pub beta:       f64,
    /// Stop once smoothed loss exceeds this multiple of the best
    pub divergence: f64,
}

impl Default for LrFinderConfig {
    fn default() -> Self {
        Self {
            start_lr:   1e-7,
            max_lr:     1e-1,
            num_steps:  100,
            beta:       0.98,
            divergence: 4.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LrFinder {
    config:     LrFinderConfig,
    multiplier: f64,
    lr:         f64,
    avg_loss:   f64,
    best_loss:  f64,
    iteration:  i32,
    done:       bool,
    history:    Vec<LrPoint>,
}

impl LrFinder {
    pub fn new(config: LrFinderConfig) -> Self {
        let steps      = config.num_steps.max(1) as f64;
        let multiplier = (config.max_lr / config.start_lr).powf(1.0 / steps);
        Self {
            config,
            multiplier,
            lr:        config.start_lr,
            avg_loss:  0.0,
            best_loss: f64::INFINITY,
            iteration: 0,
            done:      config.start_lr >= config.max_lr,
            history:   Vec::new(),
        }
    }

    /// The rate to use for the next batch.
    pub fn lr(&self) -> f64 {
        self.lr
    }

    /// Feed the loss of the batch trained at `self.lr()` and get
    /// the rate for the next batch.
    pub fn step(&mut self, loss: f64) -> f64 {
        if self.done {
            return self.lr;
        }

        let beta = self.config.beta;
        self.iteration += 1;
        self.avg_loss = beta * self.avg_loss + (1.0 - beta) * loss;
        let smoothed  = self.avg_loss / (1.0 - beta.powi(self.iteration));

        let diverged = !loss.is_finite()
            || !smoothed.is_finite()
            || (self.iteration > 1 && smoothed > self.config.divergence * self.best_loss);
        if diverged {
            tracing::info!("LR finder: loss diverged at lr={:.3e}", self.lr);
            self.done = true;
            return self.lr;
        }

        if smoothed < self.best_loss {
            self.best_loss = smoothed;
        }
        self.history.push(LrPoint { lr: self.lr, loss: smoothed });

        // Relative slack absorbs rounding in multiplier^num_steps.
        self.lr *= self.multiplier;
        if self.lr >= self.config.max_lr * (1.0 - 1e-9) {
            self.lr   = self.config.max_lr;
            self.done = true;
            tracing::info!("LR finder: reached max lr {:.3e}", self.config.max_lr);
        }
        self.lr
    }

    pub fn done(&self) -> bool {
        self.done
    }

    pub fn history(&self) -> &[LrPoint] {
        &self.history
    }

    /// Rate at which the smoothed loss was lowest.
    pub fn best_lr(&self) -> Option<f64> {
        self.history
            .iter()
            .min_by(|a, b| a.loss.total_cmp(&b.loss))
            .map(|p| p.lr)
    }
}
