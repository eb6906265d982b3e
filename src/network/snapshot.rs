use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::AtomicUsize;

use log::info;
use serde::{Serialize, Deserialize};

use crate::{
    activation::activation::ActivationFunction,
    cost::cost_function::CostFunction,
    error::{NetworkError, Result},
    layers::dense::{Layer, LayerParams},
    network::network::{validate_topology, Network},
};

/// Bumped whenever the snapshot layout changes incompatibly.
const FORMAT_VERSION: u32 = 1;

/// Serialized form of a `Network` at one point in training.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkSnapshot {
    pub format_version: u32,
    /// Epoch the snapshot was taken after, if any.
    pub epoch: Option<usize>,
    /// Epochs the network had completed when the snapshot was taken.
    #[serde(default)]
    pub trained_epochs: usize,
    pub layer_widths: Vec<usize>,
    pub activation: ActivationFunction,
    pub cost: CostFunction,
    pub layers: Vec<LayerParams>,
}

impl Network {
    /// Copies the current parameters, one layer lock at a time.
    pub fn snapshot(&self, epoch: Option<usize>) -> NetworkSnapshot {
        NetworkSnapshot {
            format_version: FORMAT_VERSION,
            epoch,
            trained_epochs: self.trained_epochs(),
            layer_widths: self.layer_widths.clone(),
            activation: self.activation,
            cost: self.cost,
            layers: self.layers.iter().map(Layer::params).collect(),
        }
    }

    /// Writes `<save_dir>/epoch-<epoch>.json` and returns its path.
    ///
    /// Checkpoints are immutable: an existing file with the same tag is an
    /// error, never overwritten.
    pub fn save(&self, epoch: usize) -> Result<PathBuf> {
        fs::create_dir_all(&self.save_dir)?;
        let path = self.save_dir.join(format!("epoch-{}.json", epoch));
        if path.exists() {
            return Err(NetworkError::Persistence(format!(
                "checkpoint {} already exists",
                path.display()
            )));
        }
        self.save_json(&path, Some(epoch))?;
        info!("Saved network of epoch {} to {}", epoch, path.display());
        Ok(path)
    }

    /// Serializes the network to `path`.
    ///
    /// The file is written under a temporary name and renamed into place,
    /// so an interrupted save never leaves a truncated snapshot behind.
    pub fn save_json(&self, path: &Path, epoch: Option<usize>) -> Result<()> {
        let tmp = path.with_extension("json.tmp");
        {
            let file = fs::File::create(&tmp)?;
            let mut writer = BufWriter::new(file);
            serde_json::to_writer(&mut writer, &self.snapshot(epoch))?;
            writer.flush()?;
        }
        fs::rename(&tmp, path)?;
        Ok(())
    }

    /// Restores a network written by `save` or `save_json`.
    ///
    /// Further checkpoints of the restored network go next to the file.
    pub fn load(path: impl AsRef<Path>) -> Result<Network> {
        let path = path.as_ref();
        let file = fs::File::open(path)?;
        let snapshot: NetworkSnapshot = serde_json::from_reader(BufReader::new(file))?;
        let save_dir = path.parent().map(Path::to_path_buf).unwrap_or_default();
        Network::from_snapshot(snapshot, save_dir)
    }

    pub fn from_snapshot(snapshot: NetworkSnapshot, save_dir: PathBuf) -> Result<Network> {
        if snapshot.format_version != FORMAT_VERSION {
            return Err(NetworkError::Persistence(format!(
                "unsupported snapshot format {} (expected {})",
                snapshot.format_version, FORMAT_VERSION
            )));
        }
        validate_topology(&snapshot.layer_widths)
            .map_err(|e| NetworkError::Persistence(e.to_string()))?;
        if snapshot.layers.len() != snapshot.layer_widths.len() - 1 {
            return Err(NetworkError::Persistence(format!(
                "{} layer widths need {} layers, snapshot has {}",
                snapshot.layer_widths.len(),
                snapshot.layer_widths.len() - 1,
                snapshot.layers.len()
            )));
        }

        let mut layers = Vec::with_capacity(snapshot.layers.len());
        for (i, params) in snapshot.layers.into_iter().enumerate() {
            let layer = Layer::from_params(snapshot.activation, params)?;
            let (inputs, outputs) = (snapshot.layer_widths[i], snapshot.layer_widths[i + 1]);
            if layer.inputs() != inputs || layer.outputs() != outputs {
                return Err(NetworkError::Persistence(format!(
                    "layer {} is {}x{}, expected {}x{}",
                    i, layer.outputs(), layer.inputs(), outputs, inputs
                )));
            }
            layers.push(layer);
        }

        Ok(Network {
            layers,
            layer_widths: snapshot.layer_widths,
            activation: snapshot.activation,
            cost: snapshot.cost,
            save_dir,
            trained_epochs: AtomicUsize::new(snapshot.trained_epochs),
        })
    }
}
