use serde::{Deserialize, Serialize};

use super::{expect_arity, expect_slot};
use crate::attrs::Attributes;
use crate::errors::SGResult;
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::{Dtype, Shape};

// Full reductions to a single-element tensor of shape [1]. These serve as
// the scalar loss heads a training graph ends in.

#[derive(Debug, Serialize, Deserialize)]
pub struct Sum;

#[typetag::serde]
impl Operator for Sum {
    fn name(&self) -> &str {
        "Sum"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Sum", input_shapes.len(), 1)?;
        Ok(Shape::new(vec![1]))
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Sum", inputs.len(), 1)?;
        out.set(0, inputs[0].sum());
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Sum", slot, 1)?;
        Ok(Tensor::filled(&inputs[0].shape(), upstream.at(0)))
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Mean;

#[typetag::serde]
impl Operator for Mean {
    fn name(&self) -> &str {
        "Mean"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Mean", input_shapes.len(), 1)?;
        Ok(Shape::new(vec![1]))
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Mean", inputs.len(), 1)?;
        let n = inputs[0].num_elements().max(1) as Dtype;
        out.set(0, inputs[0].sum() / n);
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Mean", slot, 1)?;
        let n = inputs[0].num_elements().max(1) as Dtype;
        Ok(Tensor::filled(&inputs[0].shape(), upstream.at(0) / n))
    }
}
