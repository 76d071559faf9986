use serde::{Deserialize, Serialize};

use super::{conv_result_hw, expect_arity, expect_slot};
use crate::attrs::Attributes;
use crate::errors::{SGError, SGResult};
use crate::graph::Operator;
use crate::tensor::Tensor;
use crate::types::Shape;

/// 2-D convolution: [N, Ci, H, W] * [Co, Ci, Kh, Kw] -> [N, Co, Oh, Ow]
/// with zero padding. `padding`, `stride` and `dilation` default to (0,0),
/// (1,1) and (1,1); the kernel extents come from the weight shape.
#[derive(Debug, Serialize, Deserialize)]
pub struct Conv2D;

struct ConvGeometry {
    padding: [usize; 2],
    stride: [usize; 2],
    dilation: [usize; 2],
}

fn geometry(attrs: &Attributes) -> ConvGeometry {
    ConvGeometry {
        padding: attrs.get("padding").and_then(|v| v.to_static::<2>()).unwrap_or([0, 0]),
        stride: attrs.get("stride").and_then(|v| v.to_static::<2>()).unwrap_or([1, 1]),
        dilation: attrs.get("dilation").and_then(|v| v.to_static::<2>()).unwrap_or([1, 1]),
    }
}

fn dims4(t: &[usize]) -> (usize, usize, usize, usize) {
    (t[0], t[1], t[2], t[3])
}

#[typetag::serde]
impl Operator for Conv2D {
    fn name(&self) -> &str {
        "Conv2D"
    }

    fn result_shape(&self, input_shapes: &[Shape], attrs: &Attributes) -> SGResult<Shape> {
        expect_arity("Conv2D", input_shapes.len(), 2)?;
        let input = &input_shapes[0];
        let weight = &input_shapes[1];
        if input.rank() != 4 || weight.rank() != 4 {
            return Err(SGError::IncompatibleShapes {
                expected: vec![4],
                found: vec![input.rank(), weight.rank()],
            });
        }
        if input.extent(1) != weight.extent(1) {
            return Err(SGError::IncompatibleShapes {
                expected: vec![input.extent(1)],
                found: vec![weight.extent(1)],
            });
        }
        let geo = geometry(attrs);
        let (oh, ow) = conv_result_hw(
            input.extent(2),
            input.extent(3),
            [weight.extent(2), weight.extent(3)],
            geo.padding,
            geo.stride,
            geo.dilation,
        )?;
        Ok(Shape::new(vec![input.extent(0), weight.extent(0), oh, ow]))
    }

    #[tracing::instrument(skip_all, name = "kernel_conv2d")]
    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], attrs: &Attributes) -> SGResult<()> {
        expect_arity("Conv2D", inputs.len(), 2)?;
        let geo = geometry(attrs);
        let (n, ci, h, w) = dims4(inputs[0].dims());
        let (co, _, kh, kw) = dims4(inputs[1].dims());
        let (oh, ow) = {
            let d = out.dims();
            (d[2], d[3])
        };
        let x = inputs[0].as_slice()?;
        let wt = inputs[1].as_slice()?;
        let o = out.as_slice_mut()?;

        for ni in 0..n {
            for coi in 0..co {
                for ox in 0..oh {
                    for oy in 0..ow {
                        let mut sum = 0.0;
                        for cii in 0..ci {
                            for kx in 0..kh {
                                let ix = (ox * geo.stride[0] + kx * geo.dilation[0]) as isize
                                    - geo.padding[0] as isize;
                                if ix < 0 || ix >= h as isize {
                                    continue;
                                }
                                for ky in 0..kw {
                                    let iy = (oy * geo.stride[1] + ky * geo.dilation[1]) as isize
                                        - geo.padding[1] as isize;
                                    if iy < 0 || iy >= w as isize {
                                        continue;
                                    }
                                    let xi = ((ni * ci + cii) * h + ix as usize) * w + iy as usize;
                                    let wi = ((coi * ci + cii) * kh + kx) * kw + ky;
                                    sum += x[xi] * wt[wi];
                                }
                            }
                        }
                        o[((ni * co + coi) * oh + ox) * ow + oy] = sum;
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
        expect_slot("Conv2D", slot, 2)?;
        let geo = geometry(attrs);
        let (n, ci, h, w) = dims4(inputs[0].dims());
        let (co, _, kh, kw) = dims4(inputs[1].dims());
        let (oh, ow) = {
            let d = upstream.dims();
            (d[2], d[3])
        };
        let x = inputs[0].as_slice()?;
        let wt = inputs[1].as_slice()?;
        let ug = upstream.as_slice()?;

        let mut grad = Tensor::zeros_like(inputs[slot]);
        {
            let g = grad.as_slice_mut()?;
            for ni in 0..n {
                for coi in 0..co {
                    for ox in 0..oh {
                        for oy in 0..ow {
                            let u = ug[((ni * co + coi) * oh + ox) * ow + oy];
                            for cii in 0..ci {
                                for kx in 0..kh {
                                    let ix = (ox * geo.stride[0] + kx * geo.dilation[0]) as isize
                                        - geo.padding[0] as isize;
                                    if ix < 0 || ix >= h as isize {
                                        continue;
                                    }
                                    for ky in 0..kw {
                                        let iy = (oy * geo.stride[1] + ky * geo.dilation[1]) as isize
                                            - geo.padding[1] as isize;
                                        if iy < 0 || iy >= w as isize {
                                            continue;
                                        }
                                        let xi = ((ni * ci + cii) * h + ix as usize) * w + iy as usize;
                                        let wi = ((coi * ci + cii) * kh + kx) * kw + ky;
                                        if slot == 0 {
                                            g[xi] += wt[wi] * u;
                                        } else {
                                            g[wi] += x[xi] * u;
                                        }
                                    }
                                }
                            }
                        }
                    }
                }
            }
        }
        Ok(grad)
    }
}
