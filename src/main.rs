//! Trains a network described by JSON files on a generated toy dataset.
//!
//! Usage:
//!   ferrite-trainer [network.json] [train.json]
//!
//! Without arguments a 2-8-1 LeakyReLU network learns XOR-like quadrants.
//! Set `RUST_LOG=info` (or `debug`) to see per-epoch progress.

use anyhow::{Context, Result};
use log::info;
use rand::{rngs::StdRng, Rng, SeedableRng};

use ferrite_trainer::{
    ActivationFunction, CostFunction, Network, NetworkSpec, Sample, TrainConfig, Trainer, TrainingDataManager,
};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = std::env::args().collect();
    let spec = match args.get(1) {
        Some(path) => NetworkSpec::load_json(path).with_context(|| format!("reading network spec {}", path))?,
        None => NetworkSpec {
            layer_widths: vec![2, 8, 1],
            activation: ActivationFunction::LeakyReLU { alpha: 0.01 },
            cost: CostFunction::SumOfSquaredErrors,
            save_dir: "networks/quadrants".into(),
            seed: Some(42),
        },
    };
    let config = match args.get(2) {
        Some(path) => TrainConfig::load_json(path).with_context(|| format!("reading train config {}", path))?,
        None => TrainConfig::new(0.05, 16, 200, 10),
    };

    let network = spec.build().context("building network")?;
    let samples = quadrant_samples(network.input_width(), network.output_width(), 2_000, 1);
    let test = quadrant_samples(network.input_width(), network.output_width(), 500, 2);
    let mut data = TrainingDataManager::seeded(samples, 0.1, 7)?.with_test_data(test);

    let outcome = Trainer::new(config)?.train(&network, &mut data)?;

    info!(
        "Finished after {} epochs (early stop: {}), final train cost {:.4}",
        outcome.epochs_run, outcome.stopped_early, outcome.final_train_cost
    );
    if let Some(path) = &outcome.best_checkpoint {
        info!("Best checkpoint: {} (validation cost {:.4})", path.display(), outcome.best_val_cost.unwrap_or(f64::NAN));
        let best = Network::load(path).context("reloading best checkpoint")?;
        info!("Test cost of the best checkpoint: {:.4}", best.mean_cost(data.test_data())?);
    }
    Ok(())
}

/// Points in [0, 1]^n labeled 1 when the first two coordinates fall in
/// opposite halves.
fn quadrant_samples(inputs: usize, outputs: usize, count: usize, seed: u64) -> Vec<Sample> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..count)
        .map(|_| {
            let input: Vec<f64> = (0..inputs).map(|_| rng.gen::<f64>()).collect();
            let positive = (input[0] > 0.5) != (input.get(1).copied().unwrap_or(0.0) > 0.5);
            Sample::new(input, vec![if positive { 1.0 } else { 0.0 }; outputs])
        })
        .collect()
}
