use serde::{Serialize, Deserialize};

/// One training example: an input vector and the output it should map to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Sample {
    pub input: Vec<f64>,
    pub expected: Vec<f64>,
}

impl Sample {
    pub fn new(input: Vec<f64>, expected: Vec<f64>) -> Sample {
        Sample { input, expected }
    }

    /// Builds a sample with a one-hot target of width `classes`.
    ///
    /// # Panics
    /// Panics if `label >= classes`.
    pub fn labeled(input: Vec<f64>, label: usize, classes: usize) -> Sample {
        assert!(label < classes, "label {} out of range for {} classes", label, classes);
        let mut expected = vec![0.0; classes];
        expected[label] = 1.0;
        Sample { input, expected }
    }
}
