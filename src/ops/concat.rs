use ndarray::{Axis, Slice};
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::attrs::Attributes;
use crate::errors::{SGError, SGResult};
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::{Shape, Symbol};

/// Concatenation along `dim` (default 0). The catalog's dynamic operator:
/// it accepts any number of inputs and indexes the arenas itself, and its
/// backward streams the matching upstream slice straight into the target
/// gradient slot.
#[derive(Debug, Serialize, Deserialize)]
pub struct Concat;

fn concat_dim(attrs: &Attributes) -> usize {
    attrs.get("dim").and_then(|v| v.to_int()).unwrap_or(0)
}

#[typetag::serde]
impl Operator for Concat {
    fn name(&self) -> &str {
        "Concat"
    }

    fn is_dynamic(&self) -> bool {
        true
    }

    fn result_shape(&self, input_shapes: &[Shape], attrs: &Attributes) -> SGResult<Shape> {
        let dim = concat_dim(attrs);
        let first = input_shapes.first().ok_or_else(|| SGError::ArityMismatch {
            op: "Concat".to_string(),
            expected: 1,
            found: 0,
        })?;
        if dim >= first.rank() {
            return Err(SGError::BadAttribute {
                op: "Concat".to_string(),
                attr: "dim".to_string(),
                reason: format!("axis {} out of range for rank {}", dim, first.rank()),
            });
        }
        let mut out = first.dims().to_vec();
        for shape in &input_shapes[1..] {
            let same_elsewhere = shape.rank() == first.rank()
                && shape
                    .dims()
                    .iter()
                    .enumerate()
                    .all(|(i, &e)| i == dim || e == first.extent(i));
            if !same_elsewhere {
                return Err(SGError::IncompatibleShapes {
                    expected: first.dims().to_vec(),
                    found: shape.dims().to_vec(),
                });
            }
            out[dim] += shape.extent(dim);
        }
        Ok(Shape::new(out))
    }

    fn forward(&self, _out: &mut Tensor, _inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        Err(SGError::WrongDispatch { op: "Concat".to_string(), expected: "dynamic" })
    }

    fn backward(
        &self,
        _slot: usize,
        _upstream: &Tensor,
        _inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        Err(SGError::WrongDispatch { op: "Concat".to_string(), expected: "dynamic" })
    }

    fn forward_dynamic(
        &self,
        tensors: &mut Arena,
        inputs: &[Symbol],
        outputs: &[Symbol],
        attrs: &Attributes,
    ) -> SGResult<()> {
        let dim = concat_dim(attrs);
        let (out, ins) = tensors.output_with_inputs(&outputs[0], inputs)?;
        let mut offset = 0;
        for t in ins {
            let len = t.dims()[dim];
            out.data
                .slice_axis_mut(Axis(dim), Slice::from(offset..offset + len))
                .assign(&t.data);
            offset += len;
        }
        Ok(())
    }

    fn backward_dynamic(
        &self,
        slot: usize,
        _tensors: &Arena,
        grads: &mut Arena,
        inputs: &[Symbol],
        outputs: &[Symbol],
        attrs: &Attributes,
    ) -> SGResult<()> {
        let dim = concat_dim(attrs);
        let offset: usize = inputs[..slot].iter().map(|s| s.shape().extent(dim)).sum();
        let len = inputs[slot].shape().extent(dim);
        let (upstream, grad) = grads.pair_mut(&outputs[0], &inputs[slot])?;
        let slice = upstream.data.slice_axis(Axis(dim), Slice::from(offset..offset + len));
        grad.data += &slice;
        Ok(())
    }
}
