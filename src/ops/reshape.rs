use serde::{Deserialize, Serialize};

use super::{expect_arity, expect_slot};
use crate::attrs::Attributes;
use crate::errors::{SGError, SGResult};
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::Shape;

/// Drops unit axes. With no attributes every axis of extent 1 goes; `dim`
/// names a single axis, `dims` a list. When both are set, the scalar `dim`
/// spelling wins. Naming an axis of extent != 1 fails at build time.
#[derive(Debug, Serialize, Deserialize)]
pub struct Squeeze;

fn squeezed_dims(shape: &Shape, attrs: &Attributes) -> SGResult<Vec<usize>> {
    let d = shape.dims();
    if let Some(dim) = attrs.get("dim").and_then(|v| v.to_int()) {
        check_unit_axis("Squeeze", d, dim, "dim")?;
        let mut out = d.to_vec();
        out.remove(dim);
        return Ok(out);
    }
    if let Some(axes) = attrs.get("dims").and_then(|v| v.to_tuple()) {
        for &axis in axes {
            check_unit_axis("Squeeze", d, axis, "dims")?;
        }
        let out = d
            .iter()
            .enumerate()
            .filter(|(i, _)| !axes.contains(i))
            .map(|(_, &e)| e)
            .collect();
        return Ok(out);
    }
    Ok(d.iter().copied().filter(|&e| e != 1).collect())
}

fn check_unit_axis(op: &str, dims: &[usize], axis: usize, attr: &str) -> SGResult<()> {
    if axis >= dims.len() {
        return Err(SGError::BadAttribute {
            op: op.to_string(),
            attr: attr.to_string(),
            reason: format!("axis {} out of range for rank {}", axis, dims.len()),
        });
    }
    if dims[axis] != 1 {
        return Err(SGError::IncompatibleShapes { expected: vec![1], found: vec![dims[axis]] });
    }
    Ok(())
}

#[typetag::serde]
impl Operator for Squeeze {
    fn name(&self) -> &str {
        "Squeeze"
    }

    fn result_shape(&self, input_shapes: &[Shape], attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Squeeze", input_shapes.len(), 1)?;
        Ok(Shape::new(squeezed_dims(&input_shapes[0], attrs)?))
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Squeeze", inputs.len(), 1)?;
        out.copy_from(inputs[0])
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Squeeze", slot, 1)?;
        upstream.reshaped(inputs[0].dims())
    }
}

/// Reinterprets the buffer under the shape named by the `shape` attribute.
/// Element counts must agree.
#[derive(Debug, Serialize, Deserialize)]
pub struct Reshape;

#[typetag::serde]
impl Operator for Reshape {
    fn name(&self) -> &str {
        "Reshape"
    }

    fn result_shape(&self, input_shapes: &[Shape], attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Reshape", input_shapes.len(), 1)?;
        let target = attrs
            .get("shape")
            .and_then(|v| v.to_shape())
            .ok_or_else(|| SGError::MissingAttribute {
                op: "Reshape".to_string(),
                attr: "shape".to_string(),
            })?;
        if target.num_elements() != input_shapes[0].num_elements() {
            return Err(SGError::IncompatibleShapes {
                expected: input_shapes[0].dims().to_vec(),
                found: target.dims().to_vec(),
            });
        }
        Ok(target.clone())
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Reshape", inputs.len(), 1)?;
        out.copy_from(inputs[0])
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Reshape", slot, 1)?;
        upstream.reshaped(inputs[0].dims())
    }
}

/// Inserts unit axes. With no attributes one axis is prepended; `dim`
/// names a single output position, `dims` an ascending list of output
/// positions. When both are set, `dim` wins.
#[derive(Debug, Serialize, Deserialize)]
pub struct Unsqueeze;

fn unsqueezed_dims(shape: &Shape, attrs: &Attributes) -> SGResult<Vec<usize>> {
    let d = shape.dims();
    if let Some(dim) = attrs.get("dim").and_then(|v| v.to_int()) {
        if dim > d.len() {
            return Err(SGError::BadAttribute {
                op: "Unsqueeze".to_string(),
                attr: "dim".to_string(),
                reason: format!("position {} out of range for rank {}", dim, d.len()),
            });
        }
        let mut out = d.to_vec();
        out.insert(dim, 1);
        return Ok(out);
    }
    if let Some(axes) = attrs.get("dims").and_then(|v| v.to_tuple()) {
        let out_rank = d.len() + axes.len();
        for pair in axes.windows(2) {
            if pair[0] >= pair[1] {
                return Err(SGError::BadAttribute {
                    op: "Unsqueeze".to_string(),
                    attr: "dims".to_string(),
                    reason: "positions must be strictly ascending".to_string(),
                });
            }
        }
        if let Some(&last) = axes.last() {
            if last >= out_rank {
                return Err(SGError::BadAttribute {
                    op: "Unsqueeze".to_string(),
                    attr: "dims".to_string(),
                    reason: format!("position {} out of range for rank {}", last, out_rank),
                });
            }
        }
        let mut src = d.iter();
        let out = (0..out_rank)
            .map(|i| if axes.contains(&i) { 1 } else { *src.next().expect("rank arithmetic") })
            .collect();
        return Ok(out);
    }
    let mut out = Vec::with_capacity(d.len() + 1);
    out.push(1);
    out.extend_from_slice(d);
    Ok(out)
}

#[typetag::serde]
impl Operator for Unsqueeze {
    fn name(&self) -> &str {
        "Unsqueeze"
    }

    fn result_shape(&self, input_shapes: &[Shape], attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Unsqueeze", input_shapes.len(), 1)?;
        Ok(Shape::new(unsqueezed_dims(&input_shapes[0], attrs)?))
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], _attrs: &Attributes) -> SGResult<()> {
        expect_arity("Unsqueeze", inputs.len(), 1)?;
        out.copy_from(inputs[0])
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        _attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Unsqueeze", slot, 1)?;
        upstream.reshaped(inputs[0].dims())
    }
}
