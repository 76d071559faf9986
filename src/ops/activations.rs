use serde::{Deserialize, Serialize};

use super::{expect_arity, expect_slot};
use crate::attrs::Attributes;
use crate::errors::SGResult;
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::Shape;

/// max(0, x). The subgradient at x == 0 is 0.
#[derive(Debug, Serialize, Deserialize)]
pub struct Relu;

#[typetag::serde]
impl Operator for Relu {
    fn name(&self) -> &str {
        "Relu"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Relu", input_shapes.len(), 1)?;
        Ok(input_shapes[0].clone())
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Relu", inputs.len(), 1)?;
        out.copy_from(inputs[0])?;
        out.apply(|x| if x > 0.0 { x } else { 0.0 });
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Relu", slot, 1)?;
        let mut grad = upstream.clone();
        grad.zip_apply(inputs[0], |g, x| if x > 0.0 { g } else { 0.0 });
        Ok(grad)
    }
}

/// 1 / (1 + e^-x).
#[derive(Debug, Serialize, Deserialize)]
pub struct Sigmoid;

fn sigmoid(x: f32) -> f32 {
    1.0 / (1.0 + (-x).exp())
}

#[typetag::serde]
impl Operator for Sigmoid {
    fn name(&self) -> &str {
        "Sigmoid"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Sigmoid", input_shapes.len(), 1)?;
        Ok(input_shapes[0].clone())
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Sigmoid", inputs.len(), 1)?;
        out.copy_from(inputs[0])?;
        out.apply(sigmoid);
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Sigmoid", slot, 1)?;
        let mut grad = upstream.clone();
        grad.zip_apply(inputs[0], |g, x| {
            let s = sigmoid(x);
            g * s * (1.0 - s)
        });
        Ok(grad)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Tanh;

#[typetag::serde]
impl Operator for Tanh {
    fn name(&self) -> &str {
        "Tanh"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Tanh", input_shapes.len(), 1)?;
        Ok(input_shapes[0].clone())
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Tanh", inputs.len(), 1)?;
        out.copy_from(inputs[0])?;
        out.apply(|x| x.tanh());
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Tanh", slot, 1)?;
        let mut grad = upstream.clone();
        grad.zip_apply(inputs[0], |g, x| {
            let t = x.tanh();
            g * (1.0 - t * t)
        });
        Ok(grad)
    }
}
