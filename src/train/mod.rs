pub mod early_stopping;
pub mod epoch_stats;
pub mod session;
pub mod train_config;
pub mod trainer;

pub use early_stopping::{EarlyStopping, Verdict};
pub use epoch_stats::{EpochStats, TrainOutcome, ValidationStatus};
pub use session::{LayerSession, TrainingSession};
pub use train_config::TrainConfig;
pub use trainer::{train, train_batch, Trainer};
