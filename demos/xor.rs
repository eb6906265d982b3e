use ferrite_trainer::{ActivationFunction, CostFunction, Network, Sample, train_batch};

fn main() -> ferrite_trainer::Result<()> {
    let network = Network::seeded(
        &[2, 3, 1],
        ActivationFunction::Sigmoid,
        CostFunction::SumOfSquaredErrors,
        std::env::temp_dir().join("ferrite-xor"),
        3,
    )?;

    let samples = vec![
        Sample::new(vec![1.0, 0.0], vec![1.0]),
        Sample::new(vec![1.0, 1.0], vec![0.0]),
        Sample::new(vec![0.0, 1.0], vec![1.0]),
        Sample::new(vec![0.0, 0.0], vec![0.0]),
    ];

    let epochs = 20000;
    for epoch in 0..epochs {
        // Full-batch gradient descent on the four points.
        let loss = train_batch(&network, &samples, 2.0)? / samples.len() as f64;
        if epoch % 2000 == 0 {
            println!("Epoch {epoch}: loss = {loss:.6}");
        }
    }

    for sample in &samples {
        println!("Input: {:?} -> Output: {:.4}", sample.input, network.infer(&sample.input)?[0]);
    }
    Ok(())
}
