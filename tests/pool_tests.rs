use staticgrad::graph::dsl::GraphBuilder;
use staticgrad::graph::Graph;
use staticgrad::types::Dtype;
use staticgrad::{Model, Symbol};

fn pool_model(
    data: Vec<Dtype>,
    dims: &[usize],
    kernel: [usize; 2],
    stride: [usize; 2],
    padding: [usize; 2],
) -> (Model, Symbol) {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(dims, data);
    let pooled = gb.max_pool2d(&x, kernel, stride, padding, [1, 1]).unwrap();
    let loss = gb.sum(&pooled).unwrap();
    gb.loss(&loss).unwrap();
    (Model::new(graph).unwrap(), x)
}

#[test]
fn max_pool_2x2_single_window() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[1, 1, 2, 2], vec![1.0, 2.0, 3.0, 4.0]);
    let pooled = gb.max_pool2d(&x, [2, 2], [1, 1], [0, 0], [1, 1]).unwrap();
    gb.loss(&pooled).unwrap();

    assert_eq!(pooled.shape().dims(), &[1, 1, 1, 1]);

    let mut model = Model::new(graph).unwrap();
    let out = model.forward(&[]).unwrap();
    assert_eq!(out.as_slice().unwrap(), &[4.0][..]);

    model.backward(None).unwrap();
    let grad = model.gradient(&x).unwrap();
    assert_eq!(grad.as_slice().unwrap(), &[0.0, 0.0, 0.0, 1.0][..]);
}

#[test]
fn max_pool_tie_resolves_to_first_scanned_cell() {
    let (mut model, x) = pool_model(vec![7.0; 4], &[1, 1, 2, 2], [2, 2], [1, 1], [0, 0]);
    model.forward(&[]).unwrap();
    model.backward(None).unwrap();
    let grad = model.gradient(&x).unwrap();
    assert_eq!(grad.as_slice().unwrap(), &[1.0, 0.0, 0.0, 0.0][..]);
}

#[test]
fn max_pool_overlapping_windows_accumulate() {
    // 3x3 input, 2x2 kernel, stride 1: the centre-adjacent maximum is hit
    // by several windows and their gradients sum.
    let data = vec![1.0, 1.0, 1.0, 1.0, 9.0, 1.0, 1.0, 1.0, 1.0];
    let (mut model, x) = pool_model(data, &[1, 1, 3, 3], [2, 2], [1, 1], [0, 0]);
    model.forward(&[]).unwrap();
    model.backward(None).unwrap();
    let grad = model.gradient(&x).unwrap();
    // All four windows pick the centre cell.
    assert_eq!(grad.at(4), 4.0);
    assert_eq!(grad.sum(), 4.0);
}

#[test]
fn fully_padded_windows_emit_neg_infinity_and_no_gradient() {
    let (mut model, x) = pool_model(
        vec![1.0, 2.0, 3.0, 4.0],
        &[1, 1, 2, 2],
        [2, 2],
        [1, 1],
        [2, 2],
    );
    // The corner windows never touch the input, so the summed loss is -inf.
    let out = model.forward(&[]).unwrap();
    assert_eq!(out.at(0), Dtype::NEG_INFINITY);

    model.backward(None).unwrap();
    let grad = model.gradient(&x).unwrap();
    // 5x5 output grid; only the 3x3 block of windows touching the input
    // deposits gradient, one unit each.
    assert_eq!(grad.sum(), 9.0);
}

#[test]
fn max_pool_dilation_widens_the_window() {
    let mut graph = Graph::new();
    let mut gb = GraphBuilder::new(&mut graph);
    let x = gb.param_data(&[1, 1, 3, 3], (1..=9).map(|v| v as Dtype).collect());
    let pooled = gb.max_pool2d(&x, [2, 2], [1, 1], [0, 0], [2, 2]).unwrap();
    gb.loss(&pooled).unwrap();

    // A dilated 2x2 kernel spans the full 3x3 input: one output cell.
    assert_eq!(pooled.shape().dims(), &[1, 1, 1, 1]);

    let mut model = Model::new(graph).unwrap();
    let out = model.forward(&[]).unwrap();
    assert_eq!(out.as_slice().unwrap(), &[9.0][..]);

    model.backward(None).unwrap();
    let grad = model.gradient(&x).unwrap();
    assert_eq!(grad.at(8), 1.0);
    assert_eq!(grad.sum(), 1.0);
}

#[test]
fn max_pool_gradient_matches_finite_differences() {
    let data: Vec<Dtype> = vec![
        0.3, -1.2, 2.4, 0.9, 1.7, 0.2, -0.6, 1.1, -2.0, 0.8, 0.5, 1.9, 2.2, -0.4, 0.1, 0.7,
    ];
    let (mut model, x) = pool_model(data.clone(), &[1, 1, 4, 4], [2, 2], [1, 1], [0, 0]);
    model.forward(&[]).unwrap();
    model.backward(None).unwrap();
    let analytic = model.gradient(&x).unwrap().clone();

    let eps = 1e-3;
    // Window maxima (indices 2, 4, 12) and a never-maximal cell (index 5).
    for &idx in &[2usize, 4, 5, 12] {
        let mut plus = data.clone();
        plus[idx] += eps;
        let (mut mp, _) = pool_model(plus, &[1, 1, 4, 4], [2, 2], [1, 1], [0, 0]);
        let loss_p = mp.forward(&[]).unwrap().at(0);

        let mut minus = data.clone();
        minus[idx] -= eps;
        let (mut mm, _) = pool_model(minus, &[1, 1, 4, 4], [2, 2], [1, 1], [0, 0]);
        let loss_m = mm.forward(&[]).unwrap().at(0);

        let numerical = (loss_p - loss_m) / (2.0 * eps);
        assert!(
            (analytic.at(idx) - numerical).abs() < 5e-2,
            "grad at {}: analytic {} vs numerical {}",
            idx,
            analytic.at(idx),
            numerical
        );
    }
}
