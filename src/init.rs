use ndarray::{ArrayD, IxDyn};
use ndarray_rand::rand_distr::Normal;
use ndarray_rand::RandomExt;
use rand::distributions::Uniform;
use serde::{Deserialize, Serialize};

use crate::errors::{SGError, SGResult};
use crate::tensor::Tensor;
use crate::types::{Dtype, Shape};

/// Named parameter initializers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Initializer {
    Zeros,
    Ones,
    /// Fills with the first element of the init data (0 when absent).
    Constant,
    RandomUniform,
    RandomNormal,
    XavierUniform,
    KaimingNormal,
}

/// How a parameter tensor gets its starting values. A named initializer
/// takes priority over raw data; absent both, the parameter starts zeroed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParamInit {
    Default,
    Data(Vec<Dtype>),
    Named { init: Initializer, data: Option<Vec<Dtype>> },
}

impl ParamInit {
    pub fn materialize(&self, shape: &Shape) -> SGResult<Tensor> {
        match self {
            ParamInit::Named { init, data } => init.materialize(shape, data.as_deref()),
            ParamInit::Data(data) => Tensor::from_vec(shape, data.clone()),
            ParamInit::Default => Ok(Tensor::zeros(shape)),
        }
    }
}

/// Fan extents for the variance-scaling initializers. Rank-4 weights are
/// read as [Co, Ci, Kh, Kw], rank-2 as [fan_in, fan_out]; anything else
/// falls back to the element count.
fn fan_in_out(shape: &Shape) -> (usize, usize) {
    let d = shape.dims();
    match d.len() {
        2 => (d[0], d[1]),
        4 => (d[1] * d[2] * d[3], d[0] * d[2] * d[3]),
        _ => {
            let n = shape.num_elements().max(1);
            (n, n)
        }
    }
}

impl Initializer {
    fn materialize(&self, shape: &Shape, data: Option<&[Dtype]>) -> SGResult<Tensor> {
        let dims = IxDyn(shape.dims());
        let arr: ArrayD<Dtype> = match self {
            Initializer::Zeros => ArrayD::zeros(dims),
            Initializer::Ones => ArrayD::ones(dims),
            Initializer::Constant => {
                let c = data.and_then(|d| d.first()).copied().unwrap_or(0.0);
                ArrayD::from_elem(dims, c)
            }
            Initializer::RandomUniform => ArrayD::random(dims, Uniform::new(-1.0, 1.0)),
            Initializer::RandomNormal => {
                let dist = Normal::new(0.0, 1.0).map_err(|e| SGError::TensorError(e.to_string()))?;
                ArrayD::random(dims, dist)
            }
            Initializer::XavierUniform => {
                let (fan_in, fan_out) = fan_in_out(shape);
                let limit = (6.0 / (fan_in + fan_out) as Dtype).sqrt();
                ArrayD::random(dims, Uniform::new(-limit, limit))
            }
            Initializer::KaimingNormal => {
                let (fan_in, _) = fan_in_out(shape);
                let std = (2.0 / fan_in as Dtype).sqrt();
                let dist = Normal::new(0.0, std).map_err(|e| SGError::TensorError(e.to_string()))?;
                ArrayD::random(dims, dist)
            }
        };
        Ok(arr.into())
    }
}
