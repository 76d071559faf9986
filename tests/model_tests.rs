use staticgrad::graph::dsl::GraphBuilder;
use staticgrad::graph::Graph;
use staticgrad::{Model, SGError, Shape, Tensor};

#[test]
fn relu_mean_chain() {
    // L = mean(relu(x)) for x = [-2, 1, 3].
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[3], vec![-2.0, 1.0, 3.0]);
    let y = gb.relu(&x).unwrap();
    let loss = gb.mean(&y).unwrap();
    gb.loss(&loss).unwrap();

    let mut model = Model::new(graph).unwrap();
    let out = model.forward(&[]).unwrap();
    assert!((out.at(0) - 4.0 / 3.0).abs() < 1e-6);

    model.backward(None).unwrap();
    let grad = model.gradient(&x).unwrap();
    assert!((grad.at(0) - 0.0).abs() < 1e-6);
    assert!((grad.at(1) - 1.0 / 3.0).abs() < 1e-6);
    assert!((grad.at(2) - 1.0 / 3.0).abs() < 1e-6);
}

#[test]
fn branching_paths_accumulate_gradients() {
    // y = x + relu(x): both paths feed the same parameter.
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[2], vec![-1.0, 2.0]);
    let activated = gb.relu(&x).unwrap();
    let y = gb.add(&x, &activated).unwrap();
    gb.loss(&y).unwrap();

    let mut model = Model::new(graph).unwrap();
    let out = model.forward(&[]).unwrap();
    assert_eq!(out.as_slice().unwrap(), &[-1.0, 4.0][..]);

    model.backward(Some(&Tensor::ones(&Shape::new(vec![2])))).unwrap();
    let grad = model.gradient(&x).unwrap();
    assert_eq!(grad.as_slice().unwrap(), &[1.0, 2.0][..]);
}

#[test]
fn matmul_gradients_flow_to_the_weight_only() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input(&[1, 2]);
    let w = gb.param_data(&[2, 2], vec![0.5, 0.1, 0.2, 0.4]);
    let y = gb.matmul(&x, &w).unwrap();
    gb.loss(&y).unwrap();

    let mut model = Model::new(graph).unwrap();
    let input = Tensor::from_vec(&Shape::new(vec![1, 2]), vec![1.0, 2.0]).unwrap();
    let out = model.forward(&[input]).unwrap();
    assert_eq!(out.as_slice().unwrap(), &[0.9, 0.9][..]);

    model.backward(Some(&Tensor::ones(&Shape::new(vec![1, 2])))).unwrap();
    // grad_W = x^T . ug
    let grad_w = model.gradient(&w).unwrap();
    assert_eq!(grad_w.as_slice().unwrap(), &[1.0, 1.0, 2.0, 2.0][..]);
    // The non-trainable input never gets a gradient slot.
    assert!(model.gradient(&x).is_none());
}

#[test]
fn concat_routes_gradient_slices_to_each_input() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let a = gb.param_data(&[2], vec![1.0, 2.0]);
    let b = gb.param_data(&[2], vec![3.0, 4.0]);
    let y = gb.concat(&[&a, &b], 0).unwrap();
    gb.loss(&y).unwrap();

    let mut model = Model::new(graph).unwrap();
    let out = model.forward(&[]).unwrap();
    assert_eq!(out.as_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0][..]);

    let upstream = Tensor::from_vec(&Shape::new(vec![4]), vec![10.0, 20.0, 30.0, 40.0]).unwrap();
    model.backward(Some(&upstream)).unwrap();
    assert_eq!(model.gradient(&a).unwrap().as_slice().unwrap(), &[10.0, 20.0][..]);
    assert_eq!(model.gradient(&b).unwrap().as_slice().unwrap(), &[30.0, 40.0][..]);
}

#[test]
fn inference_runs_only_the_output_prefix() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input(&[2]);
    let y = gb.relu(&x).unwrap();
    gb.output(&y);
    let z = gb.sigmoid(&y).unwrap();
    gb.loss(&z).unwrap();

    let mut model = Model::new(graph).unwrap();
    assert_eq!(model.n_inference_nodes(), Some(1));

    let input = Tensor::from_vec(&Shape::new(vec![2]), vec![-3.0, 5.0]).unwrap();
    let outputs = model.inference(&[input]).unwrap();
    assert_eq!(outputs.len(), 1);
    assert_eq!(outputs[0].as_slice().unwrap(), &[0.0, 5.0][..]);
}

#[test]
fn backward_requires_a_prior_forward() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[2], vec![1.0, 2.0]);
    let y = gb.relu(&x).unwrap();
    gb.loss(&y).unwrap();

    let mut model = Model::new(graph).unwrap();
    let err = model.backward(None).unwrap_err();
    assert!(matches!(err, SGError::BackwardBeforeForward));
}

#[test]
fn inference_only_models_reject_backward() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[2], vec![1.0, 2.0]);
    let y = gb.relu(&x).unwrap();
    gb.output(&y);
    gb.loss(&y).unwrap();

    let mut model = Model::inference_only(graph).unwrap();
    model.inference(&[]).unwrap();
    let err = model.backward(None).unwrap_err();
    assert!(matches!(err, SGError::InferenceOnly));
}

#[test]
fn forward_checks_input_arity_and_shape() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input(&[2]);
    let y = gb.relu(&x).unwrap();
    gb.loss(&y).unwrap();

    let mut model = Model::new(graph).unwrap();
    let err = model.forward(&[]).unwrap_err();
    assert!(matches!(err, SGError::ArityMismatch { .. }));

    let wrong = Tensor::from_vec(&Shape::new(vec![3]), vec![1.0, 2.0, 3.0]).unwrap();
    let err = model.forward(&[wrong]).unwrap_err();
    assert!(matches!(err, SGError::IncompatibleShapes { .. }));
}

#[test]
fn upstream_gradient_shape_is_checked() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[2], vec![1.0, 2.0]);
    let y = gb.relu(&x).unwrap();
    gb.loss(&y).unwrap();

    let mut model = Model::new(graph).unwrap();
    model.forward(&[]).unwrap();
    let bad = Tensor::ones(&Shape::new(vec![3]));
    let err = model.backward(Some(&bad)).unwrap_err();
    assert!(matches!(err, SGError::IncompatibleShapes { .. }));
}

#[test]
fn forward_without_loss_and_inference_without_outputs_error() {
    // Surface the construction warnings this graph triggers.
    let _ = tracing_subscriber::fmt().with_max_level(tracing::Level::WARN).try_init();

    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[2], vec![1.0, 2.0]);
    let _y = gb.relu(&x).unwrap();

    let mut model = Model::new(graph).unwrap();
    assert!(matches!(model.forward(&[]).unwrap_err(), SGError::LossMissing));
    assert!(matches!(model.inference(&[]).unwrap_err(), SGError::InferenceDisabled));
}

#[test]
fn repeated_backward_accumulates_until_cleared() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[2], vec![1.0, 2.0]);
    let y = gb.relu(&x).unwrap();
    gb.loss(&y).unwrap();

    let mut model = Model::new(graph).unwrap();
    model.forward(&[]).unwrap();
    model.backward(None).unwrap();
    model.backward(None).unwrap();
    assert_eq!(model.gradient(&x).unwrap().as_slice().unwrap(), &[2.0, 2.0][..]);

    model.zero_grads();
    model.backward(None).unwrap();
    assert_eq!(model.gradient(&x).unwrap().as_slice().unwrap(), &[1.0, 1.0][..]);
}

#[test]
fn elementwise_arithmetic_backward_chain() {
    // L = sum(a * b - a / b)
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let a = gb.param_data(&[2], vec![2.0, 4.0]);
    let b = gb.param_data(&[2], vec![1.0, 2.0]);
    let prod = gb.mul(&a, &b).unwrap();
    let quot = gb.div(&a, &b).unwrap();
    let diff = gb.sub(&prod, &quot).unwrap();
    let loss = gb.sum(&diff).unwrap();
    gb.loss(&loss).unwrap();

    let mut model = Model::new(graph).unwrap();
    let out = model.forward(&[]).unwrap();
    assert!((out.at(0) - 6.0).abs() < 1e-6);

    model.backward(None).unwrap();
    // dL/da = b - 1/b, dL/db = a + a/b^2
    let grad_a = model.gradient(&a).unwrap();
    assert!((grad_a.at(0) - 0.0).abs() < 1e-6);
    assert!((grad_a.at(1) - 1.5).abs() < 1e-6);
    let grad_b = model.gradient(&b).unwrap();
    assert!((grad_b.at(0) - 4.0).abs() < 1e-6);
    assert!((grad_b.at(1) - 5.0).abs() < 1e-6);
}

#[test]
fn linear_macro_builds_xw_plus_b() {
    let mut graph = Graph::new();
    let out = staticgrad::model!(&mut graph, |g| {
        let x = g.input(&[1, 2]);
        let w = g.param_data(&[2, 2], vec![1.0, 0.0, 0.0, 1.0]);
        let b = g.param_data(&[1, 2], vec![0.5, -0.5]);
        staticgrad::linear!(g, &x, &w, &b).unwrap()
    });
    graph.loss(&out).unwrap();

    let mut model = Model::new(graph).unwrap();
    let input = Tensor::from_vec(&Shape::new(vec![1, 2]), vec![3.0, 4.0]).unwrap();
    let loss = model.forward(&[input]).unwrap();
    assert_eq!(loss.as_slice().unwrap(), &[3.5, 3.5][..]);
}

#[test]
fn arena_tensors_match_symbol_shapes() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input(&[2, 3]);
    let w = gb.param_data(&[3, 1], vec![0.1, 0.2, 0.3]);
    let y = gb.matmul(&x, &w).unwrap();
    gb.loss(&y).unwrap();

    let model = Model::new(graph).unwrap();
    for s in [&x, &w, &y] {
        assert_eq!(model.tensor(s).unwrap().dims(), s.shape().dims());
    }
    assert_eq!(model.gradient(&w).unwrap().dims(), w.shape().dims());
}
