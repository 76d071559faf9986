use serde::{Deserialize, Serialize};

use super::{conv_result_hw, expect_arity, expect_slot};
use crate::attrs::Attributes;
use crate::errors::{SGError, SGResult};
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::{Dtype, Shape};

/// 2-D max pooling over [N, C, H, W]. `kernel_size` is required;
/// `padding`, `stride` and `dilation` default to (0,0), (1,1) and (1,1).
/// Padded cells act as implicit -inf: a window that covers no input cell
/// produces -inf and deposits no gradient. Ties resolve to the first
/// scanned index, row-major over the kernel.
#[derive(Debug, Serialize, Deserialize)]
pub struct MaxPool2D;

struct PoolGeometry {
    kernel: [usize; 2],
    padding: [usize; 2],
    stride: [usize; 2],
    dilation: [usize; 2],
}

fn geometry(attrs: &Attributes) -> SGResult<PoolGeometry> {
    let kernel = attrs
        .get("kernel_size")
        .and_then(|v| v.to_static::<2>())
        .ok_or_else(|| SGError::MissingAttribute {
            op: "MaxPool2D".to_string(),
            attr: "kernel_size".to_string(),
        })?;
    let padding = attrs.get("padding").and_then(|v| v.to_static::<2>()).unwrap_or([0, 0]);
    let stride = attrs.get("stride").and_then(|v| v.to_static::<2>()).unwrap_or([1, 1]);
    let dilation = attrs.get("dilation").and_then(|v| v.to_static::<2>()).unwrap_or([1, 1]);
    Ok(PoolGeometry { kernel, padding, stride, dilation })
}

fn expect_nchw(op: &str, shape: &Shape) -> SGResult<()> {
    if shape.rank() != 4 {
        return Err(SGError::BadAttribute {
            op: op.to_string(),
            attr: "input".to_string(),
            reason: format!("expected a rank-4 [N,C,H,W] tensor, got rank {}", shape.rank()),
        });
    }
    Ok(())
}

/// Arg-max scan of one pooling window. Returns the flat input index of the
/// first maximum, or None when every cell falls in the padding.
#[allow(clippy::too_many_arguments)]
fn window_argmax(
    x: &[Dtype],
    base: usize,
    h: usize,
    w: usize,
    ox: usize,
    oy: usize,
    geo: &PoolGeometry,
) -> Option<(usize, Dtype)> {
    let mut best: Option<(usize, Dtype)> = None;
    for kx in 0..geo.kernel[0] {
        let ix = (ox * geo.stride[0] + kx * geo.dilation[0]) as isize - geo.padding[0] as isize;
        if ix < 0 || ix >= h as isize {
            continue;
        }
        for ky in 0..geo.kernel[1] {
            let iy = (oy * geo.stride[1] + ky * geo.dilation[1]) as isize - geo.padding[1] as isize;
            if iy < 0 || iy >= w as isize {
                continue;
            }
            let idx = base + ix as usize * w + iy as usize;
            let v = x[idx];
            match best {
                Some((_, b)) if v <= b => {}
                _ => best = Some((idx, v)),
            }
        }
    }
    best
}

#[typetag::serde]
impl Operator for MaxPool2D {
    fn name(&self) -> &str {
        "MaxPool2D"
    }

    fn result_shape(&self, input_shapes: &[Shape], attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("MaxPool2D", input_shapes.len(), 1)?;
        expect_nchw("MaxPool2D", &input_shapes[0])?;
        let geo = geometry(attrs)?;
        let d = input_shapes[0].dims();
        let (oh, ow) = conv_result_hw(d[2], d[3], geo.kernel, geo.padding, geo.stride, geo.dilation)?;
        Ok(Shape::new(vec![d[0], d[1], oh, ow]))
    }

    #[tracing::instrument(skip_all, name = "kernel_maxpool2d")]
    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], attrs: &Attributes) -> SGResult<()> {
        expect_arity("MaxPool2D", inputs.len(), 1)?;
        let geo = geometry(attrs)?;
        let (n, c, h, w) = {
            let d = inputs[0].dims();
            (d[0], d[1], d[2], d[3])
        };
        let (oh, ow) = {
            let d = out.dims();
            (d[2], d[3])
        };
        let x = inputs[0].as_slice()?;
        let o = out.as_slice_mut()?;

        for ni in 0..n {
            for ci in 0..c {
                let base = (ni * c + ci) * h * w;
                let out_base = (ni * c + ci) * oh * ow;
                for ox in 0..oh {
                    for oy in 0..ow {
                        let v = window_argmax(x, base, h, w, ox, oy, &geo)
                            .map_or(Dtype::NEG_INFINITY, |(_, v)| v);
                        o[out_base + ox * ow + oy] = v;
                    }
                }
            }
        }
        Ok(())
    }

    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        attrs: &Attributes,
    ) -> SGResult<Tensor> {
        expect_slot("MaxPool2D", slot, 1)?;
        let geo = geometry(attrs)?;
        let (n, c, h, w) = {
            let d = inputs[0].dims();
            (d[0], d[1], d[2], d[3])
        };
        let (oh, ow) = {
            let d = upstream.dims();
            (d[2], d[3])
        };
        let x = inputs[0].as_slice()?;
        let ug = upstream.as_slice()?;

        let mut grad = Tensor::zeros_like(inputs[0]);
        {
            let g = grad.as_slice_mut()?;
            for ni in 0..n {
                for ci in 0..c {
                    let base = (ni * c + ci) * h * w;
                    let out_base = (ni * c + ci) * oh * ow;
                    for ox in 0..oh {
                        for oy in 0..ow {
                            if let Some((idx, _)) = window_argmax(x, base, h, w, ox, oy, &geo) {
                                g[idx] += ug[out_base + ox * ow + oy];
                            }
                        }
                    }
                }
            }
        }
        Ok(grad)
    }
}
