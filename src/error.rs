use std::error::Error;
use std::fmt;

#[derive(Debug)]
pub enum NetworkError {
    // Shape errors
    InputShapeMismatch { expected: usize, actual: usize },

    // Construction errors
    InvalidTopology(String),
    InvalidConfig(String),

    // Evaluation errors
    EmptyDataset,

    // Snapshot save/load
    Persistence(String),

    // A mini-batch task failed or panicked
    WorkerTask {
        batch: usize,
        message: String,
        source: Option<Box<NetworkError>>,
    },
}

impl fmt::Display for NetworkError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            NetworkError::InputShapeMismatch { expected, actual } => {
                write!(f, "Input shape mismatch: expected {} values, got {}", expected, actual)
            }
            NetworkError::InvalidTopology(msg) => write!(f, "Invalid topology: {}", msg),
            NetworkError::InvalidConfig(msg) => write!(f, "Invalid training configuration: {}", msg),
            NetworkError::EmptyDataset => write!(f, "Cannot compute a cost over zero samples"),
            NetworkError::Persistence(msg) => write!(f, "Persistence error: {}", msg),
            NetworkError::WorkerTask { batch, message, .. } => {
                write!(f, "Mini-batch task {} failed: {}", batch, message)
            }
        }
    }
}

impl Error for NetworkError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            NetworkError::WorkerTask { source: Some(cause), .. } => Some(cause.as_ref()),
            _ => None,
        }
    }
}

impl From<std::io::Error> for NetworkError {
    fn from(err: std::io::Error) -> NetworkError {
        NetworkError::Persistence(err.to_string())
    }
}

impl From<serde_json::Error> for NetworkError {
    fn from(err: serde_json::Error) -> NetworkError {
        NetworkError::Persistence(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, NetworkError>;
