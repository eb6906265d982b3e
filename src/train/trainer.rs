use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Instant;

use log::{debug, info, warn};
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuilder};

use crate::{
    data::{sample::Sample, source::DataSource},
    error::{NetworkError, Result},
    network::network::Network,
    train::{
        early_stopping::{EarlyStopping, Verdict},
        epoch_stats::{EpochStats, TrainOutcome, ValidationStatus},
        session::TrainingSession,
        train_config::TrainConfig,
    },
};

/// Trains `network` with the given hyperparameters and the default pool size.
pub fn train<D: DataSource + ?Sized>(
    network: &Network,
    data: &mut D,
    learning_rate: f64,
    batch_size: usize,
    max_epochs: usize,
    patience: usize,
) -> Result<TrainOutcome> {
    Trainer::new(TrainConfig::new(learning_rate, batch_size, max_epochs, patience))?.train(network, data)
}

/// Trains one mini-batch against the network's current parameters and
/// applies the batch-averaged gradients. Returns the summed sample cost.
pub fn train_batch(network: &Network, batch: &[Sample], learning_rate: f64) -> Result<f64> {
    let mut session = TrainingSession::new(network);
    let cost = session.train_on_batch(batch)?;
    session.apply_to(network, learning_rate)?;
    Ok(cost)
}

/// Runs the epoch loop: parallel mini-batch SGD, validation, early stopping
/// and checkpointing of every improved epoch.
///
/// Batches run on a fixed rayon pool that lives for one `train` call. Each
/// batch copies the parameters current when it starts and writes its update
/// back one layer at a time, so batches of the same epoch may train against
/// slightly different parameter versions (asynchronous SGD).
#[derive(Debug)]
pub struct Trainer {
    config: TrainConfig,
}

impl Trainer {
    pub fn new(config: TrainConfig) -> Result<Trainer> {
        config.validate()?;
        Ok(Trainer { config })
    }

    pub fn config(&self) -> &TrainConfig {
        &self.config
    }

    pub fn train<D: DataSource + ?Sized>(&self, network: &Network, data: &mut D) -> Result<TrainOutcome> {
        let threads = self.config.worker_threads.unwrap_or_else(available_threads);
        let pool = ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("trainer-worker-{}", i))
            .build()
            .map_err(|e| NetworkError::InvalidConfig(format!("cannot start worker pool: {}", e)))?;

        let validating = data.has_validation_data();
        if !validating {
            warn!("No validation data: early stopping and checkpointing are disabled for this run");
        }
        info!(
            "Training {:?} network: lr {}, batch size {}, up to {} epochs, patience {}, {} workers",
            network.layer_widths(),
            self.config.learning_rate,
            self.config.batch_size,
            self.config.max_epochs,
            self.config.patience,
            threads
        );

        let result = self.run(&pool, network, data, validating);
        // The pool is torn down before any error reaches the caller.
        drop(pool);
        result
    }

    fn run<D: DataSource + ?Sized>(
        &self,
        pool: &ThreadPool,
        network: &Network,
        data: &mut D,
        validating: bool,
    ) -> Result<TrainOutcome> {
        let mut early_stopping = EarlyStopping::new(self.config.patience);
        let mut outcome = TrainOutcome {
            epochs_run: 0,
            stopped_early: false,
            final_train_cost: f64::NAN,
            best_val_cost: None,
            last_val_cost: None,
            best_checkpoint: None,
        };

        for run_epoch in 0..self.config.max_epochs {
            let t_start = Instant::now();

            let samples = data.training_data();
            let train_cost = self.run_epoch(pool, network, &samples)?;
            let epoch = network.finish_epoch();
            outcome.epochs_run = run_epoch + 1;
            outcome.final_train_cost = train_cost;

            let (val_cost, val_accuracy, status) = if validating {
                let validation = data.validation_data();
                let cost = network.mean_cost(validation)?;
                let accuracy = network.accuracy(validation)?;
                let verdict = early_stopping.observe(cost);
                if verdict.improved() {
                    // Save failures are fatal for the run.
                    outcome.best_checkpoint = Some(network.save(epoch)?);
                }
                let status = match verdict {
                    Verdict::Improved => ValidationStatus::Improved,
                    Verdict::NoImprovement { stale_epochs } => ValidationStatus::NoImprovement { stale_epochs },
                    Verdict::Stop { stale_epochs, .. } => ValidationStatus::Stopped { stale_epochs },
                };
                outcome.last_val_cost = Some(cost);
                outcome.best_val_cost = early_stopping.best_cost();
                (Some(cost), Some(accuracy), status)
            } else {
                (None, None, ValidationStatus::Skipped)
            };

            let stats = EpochStats {
                epoch,
                max_epochs: self.config.max_epochs,
                train_cost,
                val_cost,
                val_accuracy,
                status,
                elapsed_ms: t_start.elapsed().as_millis() as u64,
            };
            log_epoch(&stats, run_epoch);

            if let Some(ref tx) = self.config.progress_tx {
                // A dropped receiver only means nobody is watching.
                let _ = tx.send(stats);
            }

            if let ValidationStatus::Stopped { stale_epochs } = status {
                info!(
                    "Stopping after epoch {}: validation cost has not improved for {} epochs",
                    epoch, stale_epochs
                );
                outcome.stopped_early = true;
                break;
            }
        }

        Ok(outcome)
    }

    /// One pass over `samples`. Blocks until every batch task has finished
    /// and returns the mean training cost.
    fn run_epoch(&self, pool: &ThreadPool, network: &Network, samples: &[Sample]) -> Result<f64> {
        if samples.is_empty() {
            return Err(NetworkError::EmptyDataset);
        }
        let learning_rate = self.config.learning_rate;
        let batch_size = self.config.batch_size;

        // `collect` into a `Result` stops handing out new batches after the
        // first failure; batches already running are allowed to finish.
        let batch_costs: Vec<f64> = pool.install(|| {
            samples
                .par_chunks(batch_size)
                .enumerate()
                .map(|(index, batch)| run_batch_task(network, batch, learning_rate, index))
                .collect::<Result<Vec<f64>>>()
        })?;

        Ok(batch_costs.iter().sum::<f64>() / samples.len() as f64)
    }
}

fn run_batch_task(network: &Network, batch: &[Sample], learning_rate: f64, index: usize) -> Result<f64> {
    debug!("Batch {} started with {} samples", index, batch.len());
    catch_batch_failure(index, || train_batch(network, batch, learning_rate))
}

/// Runs one batch task and turns its error or panic into `WorkerTask`.
fn catch_batch_failure<F>(index: usize, task: F) -> Result<f64>
where
    F: FnOnce() -> Result<f64>,
{
    match panic::catch_unwind(AssertUnwindSafe(task)) {
        Ok(Ok(cost)) => Ok(cost),
        Ok(Err(err)) => Err(NetworkError::WorkerTask {
            batch: index,
            message: err.to_string(),
            source: Some(Box::new(err)),
        }),
        Err(payload) => Err(NetworkError::WorkerTask {
            batch: index,
            message: format!("panicked: {}", panic_message(payload.as_ref())),
            source: None,
        }),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        *msg
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.as_str()
    } else {
        "unknown panic payload"
    }
}

fn available_threads() -> usize {
    std::thread::available_parallelism().map(|n| n.get()).unwrap_or(1)
}

/// `run_epoch` counts from 0 within this `train` call; `stats.epoch` is the
/// network's lifetime epoch index.
fn log_epoch(stats: &EpochStats, run_epoch: usize) {
    let head = format!(
        "Epoch {} ({}/{} this run): train cost {:.4}",
        stats.epoch, run_epoch + 1, stats.max_epochs, stats.train_cost
    );
    match (stats.val_cost, stats.status) {
        (Some(val_cost), ValidationStatus::Improved)
        | (Some(val_cost), ValidationStatus::Stopped { stale_epochs: 0 }) => info!(
            "{}, validation cost {:.4} (new best), {} ms",
            head, val_cost, stats.elapsed_ms
        ),
        (Some(val_cost), ValidationStatus::NoImprovement { stale_epochs })
        | (Some(val_cost), ValidationStatus::Stopped { stale_epochs }) => info!(
            "{}, validation cost {:.4} (no improvement for {} epochs), {} ms",
            head, val_cost, stale_epochs, stats.elapsed_ms
        ),
        _ => info!("{}, {} ms", head, stats.elapsed_ms),
    }
}
