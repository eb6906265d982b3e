use crate::{
    activation::activation::ActivationFunction,
    cost::cost_function::CostFunction,
    data::sample::Sample,
    error::{NetworkError, Result},
    layers::dense::{LayerGradients, LayerParams},
    network::network::Network,
};

/// Per-layer scratch for one mini-batch.
///
/// Holds a copy of the layer's parameters taken when the session was opened,
/// the values cached by the last forward pass, and the gradients summed over
/// every sample trained so far.
#[derive(Debug, Clone)]
pub struct LayerSession {
    params: LayerParams,
    activation: ActivationFunction,
    last_input: Vec<f64>,
    last_sums: Vec<f64>,
    last_activations: Vec<f64>,
    gradients: LayerGradients,
}

impl LayerSession {
    pub fn new(params: LayerParams, activation: ActivationFunction) -> LayerSession {
        let (outputs, inputs) = (params.weights.rows, params.weights.cols);
        LayerSession {
            params,
            activation,
            last_input: Vec::new(),
            last_sums: Vec::new(),
            last_activations: Vec::new(),
            gradients: LayerGradients::zeros(inputs, outputs),
        }
    }

    pub fn inputs(&self) -> usize {
        self.params.weights.cols
    }

    pub fn outputs(&self) -> usize {
        self.params.weights.rows
    }

    /// Computes the activations and caches (input, sums, activations).
    ///
    /// On a shape mismatch nothing is cached.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        if input.len() != self.inputs() {
            return Err(NetworkError::InputShapeMismatch {
                expected: self.inputs(),
                actual: input.len(),
            });
        }
        let sums = self.params.weighted_sums(input);
        let activations: Vec<f64> = sums.iter().map(|&z| self.activation.function(z)).collect();

        self.last_input = input.to_vec();
        self.last_sums = sums;
        self.last_activations = activations.clone();
        Ok(activations)
    }

    /// `signal[i] = act'(sum[i]) * cost'(activation[i], expected[i])`.
    pub fn output_signal(&self, expected: &[f64], cost: CostFunction) -> Vec<f64> {
        self.last_sums
            .iter()
            .zip(&self.last_activations)
            .zip(expected)
            .map(|((&z, &a), &y)| self.activation.derivative(z) * cost.node_derivative(a, y))
            .collect()
    }

    /// Back-propagates the following layer's signal through its weights:
    /// `signal[j] = act'(sum[j]) * Σ_k next_weights[k][j] * next_signal[k]`.
    pub fn hidden_signal(&self, next: &LayerSession, next_signal: &[f64]) -> Vec<f64> {
        next.params
            .weights
            .transpose_mul_vec(next_signal)
            .into_iter()
            .zip(&self.last_sums)
            .map(|(back, &z)| back * self.activation.derivative(z))
            .collect()
    }

    /// Adds `signal ⊗ last_input` to the weight gradients and `signal` to
    /// the bias gradients.
    pub fn accumulate(&mut self, signal: &[f64]) {
        self.gradients.weights.add_outer(signal, &self.last_input);
        for (acc, s) in self.gradients.biases.iter_mut().zip(signal) {
            *acc += s;
        }
    }

    pub fn gradients(&self) -> &LayerGradients {
        &self.gradients
    }
}

/// Per-batch working state for a whole network.
///
/// Sessions are never shared between threads: each mini-batch task opens its
/// own, trains on its samples, and hands the summed gradients back to the
/// shared `Network` through `apply_to`.
#[derive(Debug, Clone)]
pub struct TrainingSession {
    layers: Vec<LayerSession>,
    cost: CostFunction,
    samples_seen: usize,
}

impl TrainingSession {
    /// Copies the network's current parameters into fresh per-layer scratch.
    pub fn new(network: &Network) -> TrainingSession {
        let layers = network
            .layers()
            .iter()
            .map(|layer| LayerSession::new(layer.params(), layer.activation()))
            .collect();
        TrainingSession { layers, cost: network.cost(), samples_seen: 0 }
    }

    pub fn layers(&self) -> &[LayerSession] {
        &self.layers
    }

    pub fn samples_seen(&self) -> usize {
        self.samples_seen
    }

    /// Runs `input` through every layer, caching what backprop needs.
    pub fn forward(&mut self, input: &[f64]) -> Result<Vec<f64>> {
        let mut current = input.to_vec();
        for layer in self.layers.iter_mut() {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Forward pass, output signal, then a backward sweep from the
    /// output-adjacent layer to the input-adjacent one, accumulating each
    /// layer's gradients. Returns the sample's cost.
    ///
    /// Shapes are checked before any gradient is touched, so a rejected
    /// sample leaves the totals of earlier samples intact.
    pub fn train_on_sample(&mut self, sample: &Sample) -> Result<f64> {
        let output_width = self.layers[self.layers.len() - 1].outputs();
        if sample.expected.len() != output_width {
            return Err(NetworkError::InputShapeMismatch {
                expected: output_width,
                actual: sample.expected.len(),
            });
        }

        let outputs = self.forward(&sample.input)?;

        let last = self.layers.len() - 1;
        let mut signal = self.layers[last].output_signal(&sample.expected, self.cost);
        self.layers[last].accumulate(&signal);

        for i in (0..last).rev() {
            signal = self.layers[i].hidden_signal(&self.layers[i + 1], &signal);
            self.layers[i].accumulate(&signal);
        }

        self.samples_seen += 1;
        Ok(self.cost.sample_cost(&outputs, &sample.expected))
    }

    /// Trains on `samples` in order and returns the summed cost.
    pub fn train_on_batch(&mut self, samples: &[Sample]) -> Result<f64> {
        let mut total = 0.0;
        for sample in samples {
            total += self.train_on_sample(sample)?;
        }
        Ok(total)
    }

    /// Applies the accumulated gradients, averaged over the samples seen and
    /// scaled by `learning_rate`, to `network`.
    ///
    /// Each layer's lock is held only while that layer is updated. A session
    /// opened on a network of another shape is rejected at the first
    /// mismatching layer.
    pub fn apply_to(&self, network: &Network, learning_rate: f64) -> Result<()> {
        if network.layers().len() != self.layers.len() {
            return Err(NetworkError::InvalidTopology(format!(
                "session has {} layers, network has {}",
                self.layers.len(),
                network.layers().len()
            )));
        }
        if self.samples_seen == 0 {
            return Ok(());
        }
        let scale = learning_rate / self.samples_seen as f64;
        for (layer, session) in network.layers().iter().zip(&self.layers) {
            layer.apply_gradients(scale, &session.gradients)?;
        }
        Ok(())
    }
}
