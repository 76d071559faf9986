use ndarray::Ix2;
use serde::{Deserialize, Serialize};

use super::{expect_arity, expect_slot};
use crate::attrs::Attributes;
use crate::errors::{SGError, SGResult};
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::{Dtype, Shape};

/// 2-D matrix product: [M, K] @ [K, N] -> [M, N].
#[derive(Debug, Serialize, Deserialize)]
pub struct MatMul;

fn as_2d<'a>(t: &'a Tensor) -> SGResult<ndarray::ArrayView2<'a, Dtype>> {
    t.view()
        .into_dimensionality::<Ix2>()
        .map_err(|e| SGError::TensorError(e.to_string()))
}

#[typetag::serde]
impl Operator for MatMul {
    fn name(&self) -> &str {
        "MatMul"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("MatMul", input_shapes.len(), 2)?;
        let a = &input_shapes[0];
        let b = &input_shapes[1];
        if a.rank() != 2 || b.rank() != 2 {
            return Err(SGError::IncompatibleShapes {
                expected: vec![2],
                found: vec![a.rank(), b.rank()],
            });
        }
        if a.extent(1) != b.extent(0) {
            return Err(SGError::IncompatibleShapes {
                expected: vec![a.extent(0), a.extent(1)],
                found: vec![b.extent(0), b.extent(1)],
            });
        }
        Ok(Shape::new(vec![a.extent(0), b.extent(1)]))
    }

    #[tracing::instrument(skip_all, name = "kernel_matmul")]
    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("MatMul", inputs.len(), 2)?;
        let a = as_2d(inputs[0])?;
        let b = as_2d(inputs[1])?;
        let y = a.dot(&b);
        out.data.assign(&y.into_dyn());
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("MatMul", slot, 2)?;
        let a = as_2d(inputs[0])?;
        let b = as_2d(inputs[1])?;
        let ug = as_2d(upstream)?;
        let grad = if slot == 0 {
            // grad_A = ug . B^T
            ug.dot(&b.t())
        } else {
            // grad_B = A^T . ug
            a.t().dot(&ug)
        };
        Ok(grad.into_dyn().into())
    }
}
