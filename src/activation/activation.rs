use serde::{Serialize, Deserialize};
use std::f64::consts::PI;

/// Pointwise nonlinearity applied to every weighted sum of a layer.
///
/// All variants are stateless, so one value is shared by every layer of a
/// network and serialized alongside its parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub enum ActivationFunction {
    Sigmoid,
    ReLU,
    /// ReLU with a small slope for negative inputs; `alpha = 0.01` is the
    /// usual choice for image classifiers.
    LeakyReLU { alpha: f64 },
    Identity,
    Tanh,
    Elu { alpha: f64 },
    Gelu,
    Swish,
}

impl ActivationFunction {
    pub fn function(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => sigmoid(x),
            ActivationFunction::ReLU => if x > 0.0 { x } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { x } else { alpha * x },
            ActivationFunction::Identity => x,
            ActivationFunction::Tanh => x.tanh(),
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { x } else { alpha * (x.exp() - 1.0) }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                0.5 * x * (1.0 + (c * (x + 0.044715 * x.powi(3))).tanh())
            }
            ActivationFunction::Swish => x * sigmoid(x),
        }
    }

    /// Derivative with respect to the pre-activation value `x`.
    pub fn derivative(&self, x: f64) -> f64 {
        match self {
            ActivationFunction::Sigmoid => {
                let fx = sigmoid(x);
                fx * (1.0 - fx)
            }
            ActivationFunction::ReLU => if x > 0.0 { 1.0 } else { 0.0 },
            ActivationFunction::LeakyReLU { alpha } => if x > 0.0 { 1.0 } else { *alpha },
            ActivationFunction::Identity => 1.0,
            ActivationFunction::Tanh => {
                let t = x.tanh();
                1.0 - t * t
            }
            ActivationFunction::Elu { alpha } => {
                if x > 0.0 { 1.0 } else { alpha * x.exp() }
            }
            ActivationFunction::Gelu => {
                let c = (2.0_f64 / PI).sqrt();
                let inner = c * (x + 0.044715 * x.powi(3));
                let tanh_inner = inner.tanh();
                let sech2 = 1.0 - tanh_inner * tanh_inner;
                let d_inner = c * (1.0 + 3.0 * 0.044715 * x.powi(2));
                0.5 * tanh_inner + 0.5 * x * sech2 * d_inner + 0.5
            }
            ActivationFunction::Swish => {
                let sig = sigmoid(x);
                sig + x * sig * (1.0 - sig)
            }
        }
    }
}

fn sigmoid(x: f64) -> f64 {
    1.0 / (1.0 + (-x).exp())
}
