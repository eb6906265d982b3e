use serde::{Serialize, Deserialize};

/// Small epsilon added inside log() to prevent log(0) = -inf.
const EPS: f64 = 1e-12;

/// Fixed δ = 1.0 keeps the Huber variant field-free.
const HUBER_DELTA: f64 = 1.0;

/// Per-output error measure used to seed backpropagation.
///
/// A sample's cost is the **sum** of the per-output costs; no averaging over
/// the output width happens here.
///
/// - `SumOfSquaredErrors`: `(a - y)²`; pair with Sigmoid or LeakyReLU outputs.
/// - `BinaryCrossEntropy`: `-(y·ln a + (1-y)·ln(1-a))`; pair with Sigmoid.
/// - `AbsoluteError`: `|a - y|`.
/// - `Huber`: quadratic within δ = 1.0, linear outside.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CostFunction {
    SumOfSquaredErrors,
    BinaryCrossEntropy,
    AbsoluteError,
    Huber,
}

impl CostFunction {
    /// Cost of a single output activation against its expected value.
    pub fn node_cost(&self, output: f64, expected: f64) -> f64 {
        match self {
            CostFunction::SumOfSquaredErrors => {
                let error = output - expected;
                error * error
            }
            CostFunction::BinaryCrossEntropy => {
                -(expected * (output + EPS).ln() + (1.0 - expected) * (1.0 - output + EPS).ln())
            }
            CostFunction::AbsoluteError => (output - expected).abs(),
            CostFunction::Huber => {
                let x = output - expected;
                if x.abs() <= HUBER_DELTA {
                    0.5 * x * x
                } else {
                    HUBER_DELTA * (x.abs() - 0.5 * HUBER_DELTA)
                }
            }
        }
    }

    /// ∂cost/∂output for a single output activation.
    pub fn node_derivative(&self, output: f64, expected: f64) -> f64 {
        match self {
            CostFunction::SumOfSquaredErrors => 2.0 * (output - expected),
            CostFunction::BinaryCrossEntropy => {
                (output - expected) / ((output + EPS) * (1.0 - output + EPS))
            }
            CostFunction::AbsoluteError => {
                let diff = output - expected;
                if diff > 0.0 { 1.0 } else if diff < 0.0 { -1.0 } else { 0.0 }
            }
            CostFunction::Huber => {
                let x = output - expected;
                if x.abs() <= HUBER_DELTA { x } else { HUBER_DELTA * x.signum() }
            }
        }
    }

    /// Sum of per-output costs for one sample.
    pub fn sample_cost(&self, outputs: &[f64], expected: &[f64]) -> f64 {
        outputs.iter().zip(expected)
            .map(|(&a, &y)| self.node_cost(a, y))
            .sum()
    }
}
