use serde::{Deserialize, Serialize};

use super::{expect_arity, expect_slot};
use crate::attrs::Attributes;
use crate::errors::SGResult;
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::{Dtype, Shape};

/// clamp(x, min, max). `min`/`max` are optional scalar attributes and
/// default to the dtype's finite extremes. The gradient passes on the
/// closed interval [min, max] and is 0 outside it.
#[derive(Debug, Serialize, Deserialize)]
pub struct Clip;

fn bounds(attrs: &Attributes) -> (Dtype, Dtype) {
    let lo = attrs
        .get("min")
        .and_then(|v| v.to_scalar::<Dtype>())
        .unwrap_or(Dtype::MIN);
    let hi = attrs
        .get("max")
        .and_then(|v| v.to_scalar::<Dtype>())
        .unwrap_or(Dtype::MAX);
    (lo, hi)
}

#[typetag::serde]
impl Operator for Clip {
    fn name(&self) -> &str {
        "Clip"
    }

    fn result_shape(&self, input_shapes: &[Shape], _attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Clip", input_shapes.len(), 1)?;
        Ok(input_shapes[0].clone())
    }

    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], attrs: &Attributes) -> SGResult<()> {
        expect_arity("Clip", inputs.len(), 1)?;
        let (lo, hi) = bounds(attrs);
        out.copy_from(inputs[0])?;
        out.apply(|x| x.max(lo).min(hi));
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("Clip", slot, 1)?;
        let (lo, hi) = bounds(attrs);
        let mut grad = upstream.clone();
        grad.zip_apply(inputs[0], |g, x| if x >= lo && x <= hi { g } else { 0.0 });
        Ok(grad)
    }
}
