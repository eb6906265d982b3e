// Trainer state machine: epochs, early stopping, checkpoints, worker errors.

use std::fs;
use std::path::PathBuf;
use std::sync::mpsc;

use ferrite_trainer::{
    train, ActivationFunction, CostFunction, DataSource, Network, NetworkError, Sample, TrainConfig,
    Trainer, TrainingDataManager,
};
use ferrite_trainer::train::ValidationStatus;

fn scratch_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("ferrite-trainer-{}-{}", name, std::process::id()));
    let _ = fs::remove_dir_all(&dir);
    fs::create_dir_all(&dir).unwrap();
    dir
}

/// Fixed training and validation sets, no shuffling.
struct FixedData {
    training: Vec<Sample>,
    validation: Vec<Sample>,
}

impl DataSource for FixedData {
    fn training_data(&mut self) -> Vec<Sample> {
        self.training.clone()
    }

    fn validation_data(&self) -> &[Sample] {
        &self.validation
    }
}

/// With plain ReLU, all-zero inputs and zero biases every pre-activation is
/// exactly 0, where the derivative is 0: no gradient ever flows, so the
/// validation cost is identical every epoch.
fn frozen_setup(dir: &PathBuf, with_validation: bool) -> (Network, FixedData) {
    let net = Network::seeded(
        &[2, 3, 1],
        ActivationFunction::ReLU,
        CostFunction::SumOfSquaredErrors,
        dir.join("run"),
        1,
    )
    .unwrap();
    let sample = Sample::new(vec![0.0, 0.0], vec![1.0]);
    let data = FixedData {
        training: vec![sample.clone(); 8],
        validation: if with_validation { vec![sample; 2] } else { Vec::new() },
    };
    (net, data)
}

/// Label is 1 when the first coordinate exceeds the second.
fn separable_samples(n: usize) -> Vec<Sample> {
    (0..n)
        .map(|i| {
            let a = ((i * 37) % 101) as f64 / 100.0;
            let b = ((i * 61) % 103) as f64 / 102.0;
            Sample::labeled(vec![a, b], if a > b { 1 } else { 0 }, 2)
        })
        .collect()
}

#[test]
fn stops_exactly_patience_epochs_after_last_improvement() {
    for patience in [0, 1, 3] {
        let dir = scratch_dir(&format!("patience-{patience}"));
        let (net, mut data) = frozen_setup(&dir, true);

        let config = TrainConfig::new(0.1, 3, 50, patience).with_worker_threads(2);
        let outcome = Trainer::new(config).unwrap().train(&net, &mut data).unwrap();

        assert!(outcome.stopped_early);
        assert_eq!(outcome.epochs_run, patience + 1);
        assert_eq!(outcome.best_checkpoint, Some(net.save_dir().join("epoch-0.json")));
        assert_eq!(outcome.best_val_cost, outcome.last_val_cost);
        assert_eq!(outcome.best_val_cost, Some(1.0));
    }
}

#[test]
fn zero_patience_checkpoints_then_stops_after_one_epoch() {
    let dir = scratch_dir("patience-zero");
    let (net, mut data) = frozen_setup(&dir, true);
    let (tx, rx) = mpsc::channel();

    let config = TrainConfig::new(0.1, 2, 10, 0).with_progress(tx);
    let outcome = Trainer::new(config).unwrap().train(&net, &mut data).unwrap();

    assert_eq!(outcome.epochs_run, 1);
    assert!(outcome.stopped_early);
    assert!(outcome.best_checkpoint.unwrap().exists());
    let stats: Vec<_> = rx.try_iter().collect();
    assert_eq!(stats.len(), 1);
    assert_eq!(stats[0].status, ValidationStatus::Stopped { stale_epochs: 0 });
}

#[test]
fn repeated_runs_never_overwrite_earlier_checkpoints() {
    let dir = scratch_dir("repeated-runs");
    let (net, mut data) = frozen_setup(&dir, true);

    let first = train(&net, &mut data, 0.1, 4, 10, 1).unwrap();
    let first_path = first.best_checkpoint.unwrap();
    let first_bytes = fs::read(&first_path).unwrap();
    assert_eq!(first_path, net.save_dir().join("epoch-0.json"));
    assert_eq!(net.trained_epochs(), 2);

    let second = train(&net, &mut data, 0.1, 4, 10, 1).unwrap();
    let second_path = second.best_checkpoint.unwrap();
    assert_eq!(second_path, net.save_dir().join("epoch-2.json"));
    assert_eq!(net.trained_epochs(), 4);
    assert_eq!(fs::read(&first_path).unwrap(), first_bytes);

    // A restored network carries on counting from its snapshot.
    let restored = Network::load(&second_path).unwrap();
    assert_eq!(restored.trained_epochs(), 3);
    let third = train(&restored, &mut data, 0.1, 4, 10, 1).unwrap();
    assert_eq!(third.best_checkpoint.unwrap(), net.save_dir().join("epoch-3.json"));
    assert_eq!(fs::read(&first_path).unwrap(), first_bytes);
}

#[test]
fn without_validation_runs_every_epoch_and_saves_nothing() {
    let dir = scratch_dir("no-validation");
    let (net, mut data) = frozen_setup(&dir, false);

    let outcome = train(&net, &mut data, 0.1, 4, 6, 1).unwrap();

    assert_eq!(outcome.epochs_run, 6);
    assert!(!outcome.stopped_early);
    assert!(outcome.best_checkpoint.is_none());
    assert!(outcome.best_val_cost.is_none());
    assert!(!net.save_dir().exists());
}

#[test]
fn progress_channel_receives_one_summary_per_epoch() {
    let dir = scratch_dir("progress");
    let (net, mut data) = frozen_setup(&dir, true);
    let (tx, rx) = mpsc::channel();

    let config = TrainConfig::new(0.1, 8, 10, 2).with_progress(tx);
    let outcome = Trainer::new(config).unwrap().train(&net, &mut data).unwrap();

    let stats: Vec<_> = rx.try_iter().collect();
    assert_eq!(stats.len(), outcome.epochs_run);
    assert_eq!(stats[0].status, ValidationStatus::Improved);
    assert_eq!(stats[1].status, ValidationStatus::NoImprovement { stale_epochs: 1 });
    assert_eq!(stats.last().unwrap().status, ValidationStatus::Stopped { stale_epochs: 2 });
    assert!(stats.iter().all(|s| s.val_accuracy.is_some()));
}

#[test]
fn parallel_training_reduces_cost_and_checkpoints_the_best_epoch() {
    let dir = scratch_dir("parallel");
    let net = Network::seeded(
        &[2, 6, 2],
        ActivationFunction::Sigmoid,
        CostFunction::SumOfSquaredErrors,
        dir.join("run"),
        3,
    )
    .unwrap();
    let mut data = TrainingDataManager::seeded(separable_samples(400), 0.2, 9).unwrap();
    let initial = net.mean_cost(data.validation_data()).unwrap();

    let config = TrainConfig::new(0.5, 10, 30, 5).with_worker_threads(4);
    let outcome = Trainer::new(config).unwrap().train(&net, &mut data).unwrap();

    let best = outcome.best_val_cost.unwrap();
    assert!(best < initial, "validation cost {initial} -> {best}");
    assert!(outcome.epochs_run <= 30);

    // The checkpoint holds the parameters that produced the best cost.
    let restored = Network::load(outcome.best_checkpoint.unwrap()).unwrap();
    let restored_cost = restored.mean_cost(data.validation_data()).unwrap();
    assert!((restored_cost - best).abs() < 1e-9);
}

#[test]
fn bad_sample_in_a_batch_surfaces_as_worker_error() {
    let dir = scratch_dir("worker-error");
    let (net, mut data) = frozen_setup(&dir, true);
    data.training[5] = Sample::new(vec![0.0, 0.0, 0.0], vec![1.0]);

    let config = TrainConfig::new(0.1, 2, 5, 2).with_worker_threads(3);
    let err = Trainer::new(config).unwrap().train(&net, &mut data).unwrap_err();

    match err {
        NetworkError::WorkerTask { batch, source: Some(cause), .. } => {
            assert_eq!(batch, 2);
            assert!(matches!(*cause, NetworkError::InputShapeMismatch { expected: 2, actual: 3 }));
        }
        other => panic!("expected a worker task error, got {:?}", other),
    }
    // The epoch was aborted before validation, so nothing was saved.
    assert!(!net.save_dir().exists());
}

#[test]
fn failed_checkpoint_is_fatal() {
    let dir = scratch_dir("checkpoint-failure");
    let blocker = dir.join("blocker");
    fs::write(&blocker, "not a directory").unwrap();

    let net = Network::seeded(
        &[2, 3, 1],
        ActivationFunction::Sigmoid,
        CostFunction::SumOfSquaredErrors,
        blocker.join("run"),
        1,
    )
    .unwrap();
    let sample = Sample::new(vec![0.5, 0.5], vec![1.0]);
    let mut data = FixedData { training: vec![sample.clone(); 4], validation: vec![sample] };

    let err = train(&net, &mut data, 0.1, 2, 5, 2).unwrap_err();
    assert!(matches!(err, NetworkError::Persistence(_)));
}

#[test]
fn empty_training_data_is_rejected() {
    let dir = scratch_dir("empty");
    let (net, _) = frozen_setup(&dir, false);
    let mut data = FixedData { training: Vec::new(), validation: Vec::new() };

    assert!(matches!(train(&net, &mut data, 0.1, 4, 3, 1), Err(NetworkError::EmptyDataset)));
}

#[test]
fn invalid_hyperparameters_are_rejected_up_front() {
    assert!(matches!(
        Trainer::new(TrainConfig::new(-0.1, 4, 3, 1)),
        Err(NetworkError::InvalidConfig(_))
    ));
    assert!(matches!(
        Trainer::new(TrainConfig::new(0.1, 0, 3, 1)),
        Err(NetworkError::InvalidConfig(_))
    ));
}
