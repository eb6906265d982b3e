use std::path::PathBuf;

use serde::{Serialize, Deserialize};

use crate::activation::activation::ActivationFunction;
use crate::cost::cost_function::CostFunction;
use crate::error::Result;
use crate::network::network::Network;

/// A serializable description of a network architecture.
///
/// `NetworkSpec` can be saved to / loaded from JSON independently of any
/// trained weights, so run configurations can be stored before training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSpec {
    /// Widths from the input layer to the output layer.
    pub layer_widths: Vec<usize>,
    pub activation: ActivationFunction,
    pub cost: CostFunction,
    /// Base path for checkpoint directories.
    pub save_dir: PathBuf,
    /// Fixes the initial weights when set.
    #[serde(default)]
    pub seed: Option<u64>,
}

impl NetworkSpec {
    pub fn build(&self) -> Result<Network> {
        match self.seed {
            Some(seed) => Network::seeded(&self.layer_widths, self.activation, self.cost, &self.save_dir, seed),
            None => Network::new(&self.layer_widths, self.activation, self.cost, &self.save_dir),
        }
    }

    /// Serializes the spec to a pretty-printed JSON file.
    pub fn save_json(&self, path: &str) -> Result<()> {
        let file = std::fs::File::create(path)?;
        let writer = std::io::BufWriter::new(file);
        serde_json::to_writer_pretty(writer, self)?;
        Ok(())
    }

    /// Deserializes a `NetworkSpec` from a JSON file.
    pub fn load_json(path: &str) -> Result<NetworkSpec> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
