use staticgrad::graph::dsl::GraphBuilder;
use staticgrad::graph::Graph;
use staticgrad::{Model, SGError};

#[test]
fn conv2d_single_window_forward_and_backward() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]);
    let w = gb.param_data(&[1, 1, 2, 2], vec![1.0, 1.0, 1.0, 1.0]);
    let y = gb.conv2d(&x, &w, [1, 1], [0, 0]).unwrap();
    gb.loss(&y).unwrap();

    assert_eq!(y.shape().dims(), &[1, 1, 1, 1]);

    let mut model = Model::new(graph).unwrap();
    let out = model.forward(&[]).unwrap();
    assert_eq!(out.as_slice().unwrap(), &[10.0][..]);

    model.backward(None).unwrap();
    // With a unit upstream, the weight grad is the input and vice versa.
    assert_eq!(model.gradient(&w).unwrap().as_slice().unwrap(), &[1.0, 2.0, 3.0, 4.0][..]);
    assert_eq!(model.gradient(&x).unwrap().as_slice().unwrap(), &[1.0, 1.0, 1.0, 1.0][..]);
}

#[test]
fn conv2d_zero_padding_contributes_nothing() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[1, 1, 2, 2], vec![1.0, 1.0, 1.0, 1.0]);
    let w = gb.param_data(&[1, 1, 1, 1], vec![2.0]);
    let y = gb.conv2d(&x, &w, [1, 1], [1, 1]).unwrap();
    let loss = gb.sum(&y).unwrap();
    gb.loss(&loss).unwrap();

    assert_eq!(y.shape().dims(), &[1, 1, 4, 4]);

    let mut model = Model::new(graph).unwrap();
    let out = model.forward(&[]).unwrap();
    // Only the four interior cells see the input; the padded ring is zero.
    assert_eq!(out.at(0), 8.0);

    model.backward(None).unwrap();
    assert_eq!(model.gradient(&w).unwrap().as_slice().unwrap(), &[4.0][..]);
    assert_eq!(
        model.gradient(&x).unwrap().as_slice().unwrap(),
        &[2.0, 2.0, 2.0, 2.0][..]
    );
}

#[test]
fn conv2d_channel_mismatch_fails_at_build_time() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.input(&[1, 3, 4, 4]);
    let w = gb.param_data(&[2, 2, 2, 2], vec![0.0; 16]);
    let err = gb.conv2d(&x, &w, [1, 1], [0, 0]).unwrap_err();
    assert!(matches!(err, SGError::IncompatibleShapes { .. }));
}
