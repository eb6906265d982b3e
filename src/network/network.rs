use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    activation::activation::ActivationFunction,
    cost::cost_function::CostFunction,
    data::sample::Sample,
    error::{NetworkError, Result},
    layers::dense::Layer,
};

/// An ordered, non-empty stack of dense layers.
///
/// The layer parameters are the only state shared between training workers;
/// every method here takes `&self` and goes through the per-layer locks.
#[derive(Debug)]
pub struct Network {
    pub(crate) layers: Vec<Layer>,
    pub(crate) layer_widths: Vec<usize>,
    pub(crate) activation: ActivationFunction,
    pub(crate) cost: CostFunction,
    pub(crate) save_dir: PathBuf,
    /// Epochs completed over the network's whole life, across `train` calls
    /// and save/load cycles.
    pub(crate) trained_epochs: AtomicUsize,
}

impl Network {
    /// Builds a He-initialized network from layer widths (input first).
    ///
    /// `save_dir` is a base path: checkpoints go into the first
    /// `<save_dir>-<i>` that does not exist yet.
    pub fn new(
        layer_widths: &[usize],
        activation: ActivationFunction,
        cost: CostFunction,
        save_dir: impl AsRef<Path>,
    ) -> Result<Network> {
        Network::with_rng(layer_widths, activation, cost, save_dir, &mut rand::thread_rng())
    }

    /// Same as `new`, with reproducible initial weights.
    pub fn seeded(
        layer_widths: &[usize],
        activation: ActivationFunction,
        cost: CostFunction,
        save_dir: impl AsRef<Path>,
        seed: u64,
    ) -> Result<Network> {
        Network::with_rng(layer_widths, activation, cost, save_dir, &mut StdRng::seed_from_u64(seed))
    }

    pub fn with_rng<R: Rng + ?Sized>(
        layer_widths: &[usize],
        activation: ActivationFunction,
        cost: CostFunction,
        save_dir: impl AsRef<Path>,
        rng: &mut R,
    ) -> Result<Network> {
        validate_topology(layer_widths)?;

        let layers = layer_widths
            .windows(2)
            .map(|pair| Layer::new(pair[0], pair[1], activation, rng))
            .collect();

        Ok(Network {
            layers,
            layer_widths: layer_widths.to_vec(),
            activation,
            cost,
            save_dir: select_save_directory(save_dir.as_ref()),
            trained_epochs: AtomicUsize::new(0),
        })
    }

    pub fn layers(&self) -> &[Layer] {
        &self.layers
    }

    pub fn layer_widths(&self) -> &[usize] {
        &self.layer_widths
    }

    pub fn input_width(&self) -> usize {
        self.layer_widths[0]
    }

    pub fn output_width(&self) -> usize {
        self.layer_widths[self.layer_widths.len() - 1]
    }

    pub fn activation(&self) -> ActivationFunction {
        self.activation
    }

    pub fn cost(&self) -> CostFunction {
        self.cost
    }

    /// Directory checkpoints are written to.
    pub fn save_dir(&self) -> &Path {
        &self.save_dir
    }

    pub fn trained_epochs(&self) -> usize {
        self.trained_epochs.load(Ordering::SeqCst)
    }

    /// Counts one more completed epoch and returns its index. Checkpoints are
    /// tagged with this index, so tags never repeat for one network.
    pub(crate) fn finish_epoch(&self) -> usize {
        self.trained_epochs.fetch_add(1, Ordering::SeqCst)
    }

    /// Forward pass through every layer with the current parameters.
    pub fn infer(&self, input: &[f64]) -> Result<Vec<f64>> {
        let mut current = input.to_vec();
        for layer in &self.layers {
            current = layer.forward(&current)?;
        }
        Ok(current)
    }

    /// Cost of one sample: the per-output costs summed.
    pub fn sample_cost(&self, sample: &Sample) -> Result<f64> {
        self.check_expected(sample)?;
        let outputs = self.infer(&sample.input)?;
        Ok(self.cost.sample_cost(&outputs, &sample.expected))
    }

    /// Mean sample cost over `samples`.
    pub fn mean_cost(&self, samples: &[Sample]) -> Result<f64> {
        if samples.is_empty() {
            return Err(NetworkError::EmptyDataset);
        }
        let mut total = 0.0;
        for sample in samples {
            total += self.sample_cost(sample)?;
        }
        Ok(total / samples.len() as f64)
    }

    /// Index of the strongest output unit.
    pub fn classify(&self, input: &[f64]) -> Result<usize> {
        Ok(argmax(&self.infer(input)?))
    }

    /// Fraction of samples whose strongest output matches the strongest
    /// expected output.
    pub fn accuracy(&self, samples: &[Sample]) -> Result<f64> {
        if samples.is_empty() {
            return Err(NetworkError::EmptyDataset);
        }
        let mut correct = 0usize;
        for sample in samples {
            self.check_expected(sample)?;
            if self.classify(&sample.input)? == argmax(&sample.expected) {
                correct += 1;
            }
        }
        Ok(correct as f64 / samples.len() as f64)
    }

    pub(crate) fn check_expected(&self, sample: &Sample) -> Result<()> {
        if sample.expected.len() != self.output_width() {
            return Err(NetworkError::InputShapeMismatch {
                expected: self.output_width(),
                actual: sample.expected.len(),
            });
        }
        Ok(())
    }
}

/// At least an input and an output width, none of them zero.
pub(crate) fn validate_topology(layer_widths: &[usize]) -> Result<()> {
    if layer_widths.len() < 2 {
        return Err(NetworkError::InvalidTopology(format!(
            "need at least 2 layer widths, got {}",
            layer_widths.len()
        )));
    }
    if let Some(pos) = layer_widths.iter().position(|&w| w == 0) {
        return Err(NetworkError::InvalidTopology(format!("layer {} has width 0", pos)));
    }
    Ok(())
}

/// First `<base>-<i>` path that does not exist yet.
fn select_save_directory(base: &Path) -> PathBuf {
    let stem = base.to_string_lossy();
    (0u32..)
        .map(|i| PathBuf::from(format!("{}-{}", stem, i)))
        .find(|candidate| !candidate.exists())
        .unwrap_or_else(|| base.to_path_buf())
}

/// Index of the maximum element in a slice.
pub(crate) fn argmax(v: &[f64]) -> usize {
    v.iter()
        .enumerate()
        .max_by(|(_, a), (_, b)| a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal))
        .map(|(i, _)| i)
        .unwrap_or(0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_short_or_zero_width_topologies() {
        for widths in [vec![], vec![3], vec![3, 0, 2]] {
            let res = Network::seeded(&widths, ActivationFunction::Sigmoid, CostFunction::SumOfSquaredErrors, "unused", 1);
            assert!(matches!(res, Err(NetworkError::InvalidTopology(_))), "{:?}", widths);
        }
    }

    #[test]
    fn mean_cost_of_nothing_is_an_error() {
        let net = Network::seeded(&[2, 2], ActivationFunction::Sigmoid, CostFunction::SumOfSquaredErrors, "unused", 1).unwrap();
        assert!(matches!(net.mean_cost(&[]), Err(NetworkError::EmptyDataset)));
    }

    #[test]
    fn argmax_picks_strongest_output() {
        assert_eq!(argmax(&[0.1, 0.9, 0.2]), 1);
    }
}
