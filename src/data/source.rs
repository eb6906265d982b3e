use log::{debug, info};
use rand::{rngs::StdRng, seq::SliceRandom, SeedableRng};

use crate::data::sample::Sample;
use crate::error::{NetworkError, Result};
use crate::math::random::standard_normal;

/// Supplies the data a training run consumes.
///
/// `training_data` is called once per epoch and should hand back a fresh
/// (reshuffled and/or re-augmented) copy; `validation_data` stays fixed for
/// the whole run.
pub trait DataSource {
    fn training_data(&mut self) -> Vec<Sample>;

    fn validation_data(&self) -> &[Sample];

    fn has_validation_data(&self) -> bool {
        !self.validation_data().is_empty()
    }
}

/// Produces a perturbed copy of a sample set.
///
/// Implementations must return the same number of samples and transform each
/// input independently; expected outputs are left untouched.
pub trait Augmentation: Send + Sync {
    fn augment(&self, samples: Vec<Sample>, rng: &mut StdRng) -> Vec<Sample>;
}

/// Adds N(0, factor²) noise to every input value and clamps to [0, 1].
///
/// Factors below 0.1 give light noise, above 0.1 heavy noise.
#[derive(Debug, Clone, Copy)]
pub struct GaussianNoise {
    pub factor: f64,
}

impl Augmentation for GaussianNoise {
    fn augment(&self, mut samples: Vec<Sample>, rng: &mut StdRng) -> Vec<Sample> {
        for sample in samples.iter_mut() {
            for value in sample.input.iter_mut() {
                let noise = standard_normal(rng) * self.factor;
                *value = (*value + noise).clamp(0.0, 1.0);
            }
        }
        samples
    }
}

/// In-memory `DataSource` that splits a sample set into training and
/// validation portions.
pub struct TrainingDataManager {
    training: Vec<Sample>,
    validation: Vec<Sample>,
    test: Vec<Sample>,
    shuffle: bool,
    augmentations: Vec<Box<dyn Augmentation>>,
    rng: StdRng,
}

impl TrainingDataManager {
    /// Shuffles `samples` once and moves the trailing `validation_fraction`
    /// of them into the validation set. A fraction of 0 disables validation.
    pub fn new(samples: Vec<Sample>, validation_fraction: f64) -> Result<TrainingDataManager> {
        TrainingDataManager::with_rng(samples, validation_fraction, StdRng::from_entropy())
    }

    /// Like `new`, but every shuffle and augmentation is reproducible.
    pub fn seeded(samples: Vec<Sample>, validation_fraction: f64, seed: u64) -> Result<TrainingDataManager> {
        TrainingDataManager::with_rng(samples, validation_fraction, StdRng::seed_from_u64(seed))
    }

    fn with_rng(mut samples: Vec<Sample>, validation_fraction: f64, mut rng: StdRng) -> Result<TrainingDataManager> {
        if !(0.0..1.0).contains(&validation_fraction) {
            return Err(NetworkError::InvalidConfig(format!(
                "validation fraction must be in [0, 1), got {}",
                validation_fraction
            )));
        }

        samples.shuffle(&mut rng);
        let split = ((1.0 - validation_fraction) * samples.len() as f64) as usize;
        let validation = samples.split_off(split);

        info!(
            "Data split: {} training samples, {} validation samples",
            samples.len(),
            validation.len()
        );

        Ok(TrainingDataManager {
            training: samples,
            validation,
            test: Vec::new(),
            shuffle: true,
            augmentations: Vec::new(),
            rng,
        })
    }

    /// Turns per-epoch reshuffling on or off (on by default).
    pub fn with_shuffle(mut self, shuffle: bool) -> Self {
        self.shuffle = shuffle;
        self
    }

    /// Appends an augmentation applied to every epoch's training copy, in
    /// registration order.
    pub fn with_augmentation<A: Augmentation + 'static>(mut self, augmentation: A) -> Self {
        self.augmentations.push(Box::new(augmentation));
        self
    }

    /// Attaches a held-out test set. It never feeds training or early
    /// stopping; evaluate it with `Network::accuracy` or `Network::mean_cost`
    /// once training is done.
    pub fn with_test_data(mut self, samples: Vec<Sample>) -> Self {
        info!("Holding out {} test samples", samples.len());
        self.test = samples;
        self
    }

    pub fn test_data(&self) -> &[Sample] {
        &self.test
    }

    /// The training samples before any shuffling or augmentation.
    pub fn unmodified_training_data(&self) -> &[Sample] {
        &self.training
    }
}

impl DataSource for TrainingDataManager {
    fn training_data(&mut self) -> Vec<Sample> {
        let mut samples = self.training.clone();
        if self.shuffle {
            samples.shuffle(&mut self.rng);
        }
        for augmentation in &self.augmentations {
            samples = augmentation.augment(samples, &mut self.rng);
        }
        debug!("Prepared {} training samples for the next epoch", samples.len());
        samples
    }

    fn validation_data(&self) -> &[Sample] {
        &self.validation
    }
}
