pub mod error;
pub mod math;
pub mod activation;
pub mod cost;
pub mod layers;
pub mod network;
pub mod data;
pub mod train;

// Convenience re-exports
pub use error::{NetworkError, Result};
pub use math::matrix::Matrix;
pub use activation::activation::ActivationFunction;
pub use cost::cost_function::CostFunction;
pub use layers::dense::{Layer, LayerGradients, LayerParams};
pub use network::{Network, NetworkSnapshot, NetworkSpec};
pub use data::{Augmentation, DataSource, GaussianNoise, Sample, TrainingDataManager};
pub use train::{train, train_batch, EpochStats, TrainConfig, TrainOutcome, Trainer, TrainingSession};
