// Forward-pass shape contracts for layers, sessions and whole networks.

use ferrite_trainer::{
    ActivationFunction, CostFunction, Layer, LayerGradients, LayerParams, Matrix, Network, NetworkError,
    TrainingSession,
};
use rand::{rngs::StdRng, SeedableRng};

#[test]
fn layer_output_width_matches_configuration() {
    let mut rng = StdRng::seed_from_u64(3);
    for &(inputs, outputs) in &[(1, 1), (2, 5), (7, 3), (16, 16)] {
        let layer = Layer::new(inputs, outputs, ActivationFunction::Sigmoid, &mut rng);
        let out = layer.forward(&vec![0.5; inputs]).unwrap();
        assert_eq!(out.len(), outputs);
        assert!(out.iter().all(|&a| a > 0.0 && a < 1.0));
    }
}

#[test]
fn layer_rejects_wrong_input_width() {
    let layer = Layer::new(3, 2, ActivationFunction::ReLU, &mut StdRng::seed_from_u64(1));
    for len in [0, 2, 4] {
        match layer.forward(&vec![1.0; len]) {
            Err(NetworkError::InputShapeMismatch { expected, actual }) => {
                assert_eq!((expected, actual), (3, len));
            }
            other => panic!("expected a shape mismatch, got {:?}", other),
        }
    }
}

#[test]
fn layer_computes_affine_then_activation() {
    let layer = Layer::new(2, 1, ActivationFunction::Identity, &mut StdRng::seed_from_u64(2));
    let params = layer.params();
    let x = [0.5, -1.5];
    let expected = params.weights.get(0, 0) * x[0] + params.weights.get(0, 1) * x[1] + params.biases[0];
    assert!((layer.forward(&x).unwrap()[0] - expected).abs() < 1e-15);
}

#[test]
fn apply_gradients_steps_against_the_gradient() {
    let layer = Layer::new(2, 2, ActivationFunction::Identity, &mut StdRng::seed_from_u64(4));
    let before = layer.params();

    let mut grads = LayerGradients::zeros(2, 2);
    grads.weights.data[1][0] = 2.0;
    grads.biases[0] = -1.0;
    layer.apply_gradients(0.5, &grads).unwrap();

    let after = layer.params();
    assert_eq!(after.weights.get(1, 0), before.weights.get(1, 0) - 1.0);
    assert_eq!(after.weights.get(0, 1), before.weights.get(0, 1));
    assert_eq!(after.biases[0], before.biases[0] + 0.5);
}

#[test]
fn apply_gradients_rejects_mismatched_shapes() {
    let layer = Layer::new(3, 2, ActivationFunction::Sigmoid, &mut StdRng::seed_from_u64(6));
    let before = layer.params();

    let mut short_biases = LayerGradients::zeros(3, 2);
    short_biases.biases.pop();
    let transposed = LayerGradients::zeros(2, 3);
    let mut ragged = LayerGradients::zeros(3, 2);
    ragged.weights.data[1].push(1.0);

    for grads in [short_biases, transposed, ragged] {
        assert!(
            matches!(layer.apply_gradients(0.1, &grads), Err(NetworkError::InputShapeMismatch { .. })),
            "{:?}",
            grads
        );
    }
    assert_eq!(layer.params(), before);
}

#[test]
fn concurrent_updates_to_one_layer_all_land() {
    let zeros = LayerParams { weights: Matrix::zeros(2, 3), biases: vec![0.0; 2] };
    let layer = Layer::from_params(ActivationFunction::Identity, zeros).unwrap();

    let mut ones = LayerGradients::zeros(3, 2);
    for row in ones.weights.data.iter_mut() {
        row.iter_mut().for_each(|w| *w = 1.0);
    }
    ones.biases = vec![1.0; 2];

    let (threads, updates) = (8, 100);
    std::thread::scope(|scope| {
        for _ in 0..threads {
            scope.spawn(|| {
                for _ in 0..updates {
                    layer.apply_gradients(0.25, &ones).unwrap();
                }
            });
        }
    });

    // Multiples of 0.25 are exact, so any lost update would show.
    let expected = -0.25 * (threads * updates) as f64;
    let params = layer.params();
    assert!(params.weights.data.iter().flatten().all(|&w| w == expected), "{:?}", params.weights);
    assert!(params.biases.iter().all(|&b| b == expected), "{:?}", params.biases);
}

#[test]
fn network_chains_layer_widths() {
    let net = Network::seeded(
        &[5, 4, 3, 2],
        ActivationFunction::LeakyReLU { alpha: 0.01 },
        CostFunction::SumOfSquaredErrors,
        std::env::temp_dir().join("ferrite-forward-unused"),
        9,
    )
    .unwrap();

    let widths: Vec<(usize, usize)> = net.layers().iter().map(|l| (l.inputs(), l.outputs())).collect();
    assert_eq!(widths, vec![(5, 4), (4, 3), (3, 2)]);
    assert_eq!(net.infer(&[0.1; 5]).unwrap().len(), 2);
    assert!(matches!(net.infer(&[0.1; 4]), Err(NetworkError::InputShapeMismatch { .. })));
}

#[test]
fn inference_does_not_depend_on_training_sessions() {
    let net = Network::seeded(
        &[3, 4, 2],
        ActivationFunction::Sigmoid,
        CostFunction::SumOfSquaredErrors,
        std::env::temp_dir().join("ferrite-forward-unused"),
        10,
    )
    .unwrap();
    let probe = [0.2, 0.4, 0.6];
    let before = net.infer(&probe).unwrap();

    let mut session = TrainingSession::new(&net);
    session.forward(&[0.9, 0.1, 0.5]).unwrap();
    assert!(session.forward(&[1.0]).is_err());

    assert_eq!(net.infer(&probe).unwrap(), before);
    assert_eq!(session.samples_seen(), 0);
}
