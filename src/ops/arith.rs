use serde::{Deserialize, Serialize};

use super::{expect_arity, expect_slot};
use crate::attrs::Attributes;
use crate::errors::{SGError, SGResult};
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::Shape;

// Elementwise binary arithmetic. Shapes must match exactly; broadcasting
// is expressed with explicit reshape operators upstream of these nodes.

fn binary_shape(op: &str, input_shapes: &[Shape]) -> SGResult<Shape> {
    expect_arity(op, input_shapes.len(), 2)?;
    if input_shapes[0] != input_shapes[1] {
        return Err(SGError::IncompatibleShapes {
            expected: input_shapes[0].dims().to_vec(),
            found: input_shapes[1].dims().to_vec(),
        });
    }
    Ok(input_shapes[0].clone())
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Add;

#[typetag::serde]
impl Operator for Add {
    fn name(&self) -> &str {
        "Add"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        binary_shape("Add", input_shapes)
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Add", inputs.len(), 2)?;
        out.assign_zip(inputs[0], inputs[1], |a, b| a + b);
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        _inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Add", slot, 2)?;
        Ok(upstream.clone())
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Sub;

#[typetag::serde]
impl Operator for Sub {
    fn name(&self) -> &str {
        "Sub"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        binary_shape("Sub", input_shapes)
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Sub", inputs.len(), 2)?;
        out.assign_zip(inputs[0], inputs[1], |a, b| a - b);
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        _inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Sub", slot, 2)?;
        if slot == 0 {
            Ok(upstream.clone())
        } else {
            Ok(upstream.mapv(|g| -g))
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Mul;

#[typetag::serde]
impl Operator for Mul {
    fn name(&self) -> &str {
        "Mul"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        binary_shape("Mul", input_shapes)
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Mul", inputs.len(), 2)?;
        out.assign_zip(inputs[0], inputs[1], |a, b| a * b);
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Mul", slot, 2)?;
        let mut grad = upstream.clone();
        grad.zip_apply(inputs[1 - slot], |g, o| g * o);
        Ok(grad)
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Div;

#[typetag::serde]
impl Operator for Div {
    fn name(&self) -> &str {
        "Div"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        binary_shape("Div", input_shapes)
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Div", inputs.len(), 2)?;
        out.assign_zip(inputs[0], inputs[1], |a, b| a / b);
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Div", slot, 2)?;
        let mut grad = upstream.clone();
        if slot == 0 {
            grad.zip_apply(inputs[1], |g, b| g / b);
        } else {
            // d(a/b)/db = -a / b^2
            grad.zip_apply(inputs[0], |g, a| g * a);
            grad.zip_apply(inputs[1], |g, b| -g / (b * b));
        }
        Ok(grad)
    }
}
