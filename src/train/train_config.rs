use std::sync::mpsc;

use serde::{Serialize, Deserialize};

use crate::error::{NetworkError, Result};
use crate::train::epoch_stats::EpochStats;

/// Configuration for a `Trainer` run.
///
/// # Fields
/// - `learning_rate`: step size; gradients are averaged over each batch first
/// - `batch_size`: samples per mini-batch; the last batch may be smaller
/// - `max_epochs`: upper bound on full passes over the training data
/// - `patience`: consecutive non-improving validation epochs tolerated
/// - `worker_threads`: pool size; `None` uses the available parallelism
/// - `progress_tx`: optional channel sender; one `EpochStats` is sent per
///   completed epoch. A dropped receiver is ignored.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainConfig {
    pub learning_rate: f64,
    pub batch_size: usize,
    pub max_epochs: usize,
    #[serde(default = "default_patience")]
    pub patience: usize,
    #[serde(default)]
    pub worker_threads: Option<usize>,
    #[serde(skip)]
    pub progress_tx: Option<mpsc::Sender<EpochStats>>,
}

fn default_patience() -> usize {
    5
}

impl TrainConfig {
    /// Creates a `TrainConfig` with no progress channel and the default pool size.
    pub fn new(learning_rate: f64, batch_size: usize, max_epochs: usize, patience: usize) -> Self {
        TrainConfig {
            learning_rate,
            batch_size,
            max_epochs,
            patience,
            worker_threads: None,
            progress_tx: None,
        }
    }

    pub fn with_worker_threads(mut self, threads: usize) -> Self {
        self.worker_threads = Some(threads);
        self
    }

    pub fn with_progress(mut self, tx: mpsc::Sender<EpochStats>) -> Self {
        self.progress_tx = Some(tx);
        self
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.learning_rate.is_finite() && self.learning_rate > 0.0) {
            return Err(NetworkError::InvalidConfig(format!(
                "learning rate must be a positive number, got {}",
                self.learning_rate
            )));
        }
        if self.batch_size == 0 {
            return Err(NetworkError::InvalidConfig("batch size must be at least 1".into()));
        }
        if self.max_epochs == 0 {
            return Err(NetworkError::InvalidConfig("max epochs must be at least 1".into()));
        }
        if self.worker_threads == Some(0) {
            return Err(NetworkError::InvalidConfig("worker thread count must be at least 1".into()));
        }
        Ok(())
    }

    /// Deserializes a `TrainConfig` from a JSON file.
    pub fn load_json(path: &str) -> Result<TrainConfig> {
        let file = std::fs::File::open(path)?;
        let reader = std::io::BufReader::new(file);
        Ok(serde_json::from_reader(reader)?)
    }
}
