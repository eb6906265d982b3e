use parking_lot::RwLock;
use rand::Rng;
use serde::{Serialize, Deserialize};

use crate::{
    activation::activation::ActivationFunction,
    error::{NetworkError, Result},
    math::matrix::Matrix,
};

/// The trainable parameters of one layer.
///
/// `weights` is `outputs × inputs`; `biases` has one entry per output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LayerParams {
    pub weights: Matrix,
    pub biases: Vec<f64>,
}

impl LayerParams {
    /// Weighted sums `W·x + b` for an input of the right width.
    pub fn weighted_sums(&self, input: &[f64]) -> Vec<f64> {
        let mut sums = self.weights.mul_vec(input);
        for (sum, bias) in sums.iter_mut().zip(&self.biases) {
            *sum += bias;
        }
        sums
    }
}

/// Gradients of the cost with respect to one layer's parameters.
#[derive(Debug, Clone, PartialEq)]
pub struct LayerGradients {
    pub weights: Matrix,
    pub biases: Vec<f64>,
}

impl LayerGradients {
    pub fn zeros(inputs: usize, outputs: usize) -> LayerGradients {
        LayerGradients {
            weights: Matrix::zeros(outputs, inputs),
            biases: vec![0.0; outputs],
        }
    }
}

/// One affine transform followed by a pointwise activation.
///
/// The parameters sit behind a per-layer lock: inference and training
/// sessions take the read side, gradient application takes the write side,
/// so two mini-batches never interleave partial updates of the same layer.
#[derive(Debug)]
pub struct Layer {
    inputs: usize,
    outputs: usize,
    activation: ActivationFunction,
    params: RwLock<LayerParams>,
}

impl Layer {
    /// He-initialized weights, zero biases.
    pub fn new<R: Rng + ?Sized>(
        inputs: usize,
        outputs: usize,
        activation: ActivationFunction,
        rng: &mut R,
    ) -> Layer {
        let params = LayerParams {
            weights: Matrix::he(outputs, inputs, rng),
            biases: vec![0.0; outputs],
        };
        Layer { inputs, outputs, activation, params: RwLock::new(params) }
    }

    /// Rebuilds a layer from stored parameters, checking their shapes.
    pub fn from_params(activation: ActivationFunction, params: LayerParams) -> Result<Layer> {
        let (outputs, inputs) = (params.weights.rows, params.weights.cols);
        if outputs == 0 || inputs == 0
            || !params.weights.is_rectangular()
            || params.biases.len() != outputs
        {
            return Err(NetworkError::Persistence(format!(
                "layer parameters do not form a {}x{} weight matrix with {} biases",
                outputs, inputs, outputs
            )));
        }
        Ok(Layer { inputs, outputs, activation, params: RwLock::new(params) })
    }

    pub fn inputs(&self) -> usize {
        self.inputs
    }

    pub fn outputs(&self) -> usize {
        self.outputs
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activation
    }

    /// A copy of the current parameters.
    pub fn params(&self) -> LayerParams {
        self.params.read().clone()
    }

    /// Computes `activation(W·x + b)` without touching the parameters.
    pub fn forward(&self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.inputs {
            return Err(NetworkError::InputShapeMismatch {
                expected: self.inputs,
                actual: input.len(),
            });
        }
        let sums = self.params.read().weighted_sums(input);
        Ok(sums.into_iter().map(|z| self.activation.function(z)).collect())
    }

    /// `param -= gradient * learning_rate` for every weight and bias.
    ///
    /// Gradients must have this layer's exact shape; nothing is truncated or
    /// padded. Holds this layer's write lock for the duration of the update
    /// only.
    pub fn apply_gradients(&self, learning_rate: f64, gradients: &LayerGradients) -> Result<()> {
        let grads = &gradients.weights;
        if grads.rows != self.outputs || !grads.is_rectangular() {
            return Err(NetworkError::InputShapeMismatch { expected: self.outputs, actual: grads.rows });
        }
        if grads.cols != self.inputs {
            return Err(NetworkError::InputShapeMismatch { expected: self.inputs, actual: grads.cols });
        }
        if gradients.biases.len() != self.outputs {
            return Err(NetworkError::InputShapeMismatch {
                expected: self.outputs,
                actual: gradients.biases.len(),
            });
        }

        let mut params = self.params.write();
        params.weights.sub_scaled(grads, learning_rate);
        for (bias, grad) in params.biases.iter_mut().zip(&gradients.biases) {
            *bias -= grad * learning_rate;
        }
        Ok(())
    }

    pub fn nudge_weight(&self, output: usize, input: usize, delta: f64) {
        self.params.write().weights.data[output][input] += delta;
    }

    pub fn nudge_bias(&self, output: usize, delta: f64) {
        self.params.write().biases[output] += delta;
    }
}
