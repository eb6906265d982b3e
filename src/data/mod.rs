pub mod sample;
pub mod source;

pub use sample::Sample;
pub use source::{Augmentation, DataSource, GaussianNoise, TrainingDataManager};
