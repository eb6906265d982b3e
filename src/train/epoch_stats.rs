use std::path::PathBuf;

use serde::{Serialize, Deserialize};

/// Where the early-stopping bookkeeping stands after an epoch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValidationStatus {
    /// No validation data configured.
    Skipped,
    Improved,
    NoImprovement { stale_epochs: usize },
    /// Patience exhausted. `stale_epochs == 0` means this epoch improved
    /// and was checkpointed before stopping (patience 0).
    Stopped { stale_epochs: usize },
}

/// Per-epoch training statistics.
///
/// When a `progress_tx` channel is configured in `TrainConfig`, the trainer
/// sends one `EpochStats` value at the end of every completed epoch.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EpochStats {
    /// 0-based epoch index over the network's lifetime, so it keeps counting
    /// across `train` calls. Checkpoints are tagged with it.
    pub epoch: usize,
    pub max_epochs: usize,
    /// Mean cost of the training samples, measured while training on them.
    pub train_cost: f64,
    pub val_cost: Option<f64>,
    /// Argmax accuracy on the validation set, as a fraction in [0, 1].
    pub val_accuracy: Option<f64>,
    pub status: ValidationStatus,
    /// Wall-clock duration of this single epoch in milliseconds.
    pub elapsed_ms: u64,
}

/// Summary returned by a finished training run.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrainOutcome {
    pub epochs_run: usize,
    pub stopped_early: bool,
    pub final_train_cost: f64,
    pub best_val_cost: Option<f64>,
    pub last_val_cost: Option<f64>,
    /// Snapshot written for the best validation cost.
    pub best_checkpoint: Option<PathBuf>,
}
