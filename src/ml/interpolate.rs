// ============================================================
// Layer 5 — Parameter Interpolation
// ============================================================
// Weight averaging (SWA) and lookahead both boil down to moving
// one set of weights part of the way toward another:
//
//   θ ← θ·(1 − α) + θ_target·α
//
// Only learnable parameters move. BatchNorm running statistics
// stay with `self`, and every Param keeps its id so optimizer
// state keyed by id (Adam moments etc.) remains attached.

use burn::{
    module::Param,
    nn::{BatchNorm, Linear},
    prelude::*,
};

/// A module whose learnable parameters can be blended with
/// those of another instance of the same architecture.
pub trait Interpolate: Sized {
    /// `self * (1 - alpha) + target * alpha` for every learnable
    /// parameter. `alpha = 0` keeps `self`, `alpha = 1` takes `target`.
    fn interpolate(self, target: &Self, alpha: f64) -> Self;
}

/// Blend two tensors outside the autodiff graph. The result is
/// a leaf that requires grad whenever `from` did.
pub fn lerp<B: Backend, const D: usize>(
    from:  Tensor<B, D>,
    to:    Tensor<B, D>,
    alpha: f64,
) -> Tensor<B, D> {
    let require_grad = from.is_require_grad();
    // detach() keeps the require-grad flag, so the arithmetic would
    // still be tracked and the result could not become a leaf.
    let from = from.detach().set_require_grad(false);
    let to   = to.detach().set_require_grad(false);
    from.mul_scalar(1.0 - alpha)
        .add(to.mul_scalar(alpha))
        .set_require_grad(require_grad)
}

fn lerp_param<B: Backend, const D: usize>(
    param:  Param<Tensor<B, D>>,
    target: &Param<Tensor<B, D>>,
    alpha:  f64,
) -> Param<Tensor<B, D>> {
    let target = target.val();
    param.map(|tensor| lerp(tensor, target.clone(), alpha))
}

impl<B: Backend> Interpolate for Linear<B> {
    fn interpolate(mut self, target: &Self, alpha: f64) -> Self {
        self.weight = lerp_param(self.weight, &target.weight, alpha);
        self.bias = match (self.bias, &target.bias) {
            (Some(bias), Some(other)) => Some(lerp_param(bias, other, alpha)),
            (bias, _) => bias,
        };
        self
    }
}

impl<B: Backend, const D: usize> Interpolate for BatchNorm<B, D> {
    fn interpolate(mut self, target: &Self, alpha: f64) -> Self {
        self.gamma = lerp_param(self.gamma, &target.gamma, alpha);
        self.beta  = lerp_param(self.beta, &target.beta, alpha);
        self
    }
}
