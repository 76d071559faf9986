pub mod ops;

use ndarray::{ArrayD, IxDyn, Zip};
use serde::{Deserialize, Serialize};

use crate::errors::{SGError, SGResult};
use crate::types::{Dtype, Shape};

/// An N-dimensional buffer of `Dtype` in standard row-major layout.
/// Tensors own their storage exclusively; arena entries are mutated in
/// place by kernels rather than replaced.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Tensor {
    pub(crate) data: ArrayD<Dtype>,
}

impl Tensor {
    pub fn zeros(shape: &Shape) -> Self {
        Self { data: ArrayD::zeros(IxDyn(shape.dims())) }
    }

    pub fn zeros_like(other: &Tensor) -> Self {
        Self { data: ArrayD::zeros(other.data.raw_dim()) }
    }

    pub fn ones(shape: &Shape) -> Self {
        Self { data: ArrayD::ones(IxDyn(shape.dims())) }
    }

    pub fn filled(shape: &Shape, value: Dtype) -> Self {
        Self { data: ArrayD::from_elem(IxDyn(shape.dims()), value) }
    }

    pub fn from_vec(shape: &Shape, data: Vec<Dtype>) -> SGResult<Self> {
        ArrayD::from_shape_vec(IxDyn(shape.dims()), data)
            .map(|data| Self { data })
            .map_err(|e| SGError::TensorError(e.to_string()))
    }

    pub fn shape(&self) -> Shape {
        Shape::from_slice(self.data.shape())
    }

    pub fn dims(&self) -> &[usize] {
        self.data.shape()
    }

    pub fn rank(&self) -> usize {
        self.data.ndim()
    }

    pub fn num_elements(&self) -> usize {
        self.data.len()
    }

    pub fn as_slice(&self) -> SGResult<&[Dtype]> {
        self.data
            .as_slice()
            .ok_or_else(|| SGError::TensorError("tensor is not in standard layout".to_string()))
    }

    pub fn as_slice_mut(&mut self) -> SGResult<&mut [Dtype]> {
        self.data
            .as_slice_mut()
            .ok_or_else(|| SGError::TensorError("tensor is not in standard layout".to_string()))
    }

    /// Flat element load. Multi-dimensional access goes through
    /// `Shape::strides`.
    pub fn at(&self, i: usize) -> Dtype {
        self.data.as_slice().expect("standard-layout tensor")[i]
    }

    /// Flat element store.
    pub fn set(&mut self, i: usize, value: Dtype) {
        self.data.as_slice_mut().expect("standard-layout tensor")[i] = value;
    }

    pub fn fill(&mut self, value: Dtype) {
        self.data.fill(value);
    }

    /// Copies `other`'s buffer into this tensor. Element counts must match;
    /// shapes may differ, which is what the view-reinterpreting operators
    /// rely on.
    pub fn copy_from(&mut self, other: &Self) -> SGResult<()> {
        if self.num_elements() != other.num_elements() {
            return Err(SGError::IncompatibleShapes {
                expected: self.dims().to_vec(),
                found: other.dims().to_vec(),
            });
        }
        let dest = self.as_slice_mut()?;
        let src = other.as_slice()?;
        dest.copy_from_slice(src);
        Ok(())
    }

    /// Same buffer reinterpreted under a new shape with equal element count.
    pub fn reshaped(&self, dims: &[usize]) -> SGResult<Tensor> {
        self.data
            .clone()
            .into_shape(IxDyn(dims))
            .map(|data| Self { data })
            .map_err(|_| SGError::IncompatibleShapes {
                expected: dims.to_vec(),
                found: self.dims().to_vec(),
            })
    }

    pub fn view(&self) -> ndarray::ArrayViewD<'_, Dtype> {
        self.data.view()
    }

    pub fn iter(&self) -> ndarray::iter::Iter<'_, Dtype, IxDyn> {
        self.data.iter()
    }

    pub fn sum(&self) -> Dtype {
        self.data.sum()
    }

    /// Bulk elementwise transform, in place. The sweep is data-parallel
    /// when the `rayon` feature is on.
    pub fn apply<F>(&mut self, f: F)
    where
        F: Fn(Dtype) -> Dtype + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            Zip::from(&mut self.data).par_for_each(|v| *v = f(*v));
        }
        #[cfg(not(feature = "rayon"))]
        {
            Zip::from(&mut self.data).for_each(|v| *v = f(*v));
        }
    }

    /// In-place combine with a second tensor of the same shape:
    /// `self[i] = f(self[i], other[i])`.
    pub fn zip_apply<F>(&mut self, other: &Tensor, f: F)
    where
        F: Fn(Dtype, Dtype) -> Dtype + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            Zip::from(&mut self.data).and(&other.data).par_for_each(|v, &o| *v = f(*v, o));
        }
        #[cfg(not(feature = "rayon"))]
        {
            Zip::from(&mut self.data).and(&other.data).for_each(|v, &o| *v = f(*v, o));
        }
    }

    /// Writes `f(a[i], b[i])` into this tensor. All three shapes must match.
    pub fn assign_zip<F>(&mut self, a: &Tensor, b: &Tensor, f: F)
    where
        F: Fn(Dtype, Dtype) -> Dtype + Sync + Send,
    {
        #[cfg(feature = "rayon")]
        {
            Zip::from(&mut self.data)
                .and(&a.data)
                .and(&b.data)
                .par_for_each(|v, &x, &y| *v = f(x, y));
        }
        #[cfg(not(feature = "rayon"))]
        {
            Zip::from(&mut self.data)
                .and(&a.data)
                .and(&b.data)
                .for_each(|v, &x, &y| *v = f(x, y));
        }
    }

    pub fn mapv<F>(&self, f: F) -> Tensor
    where
        F: Fn(Dtype) -> Dtype + Sync + Send,
    {
        Self { data: self.data.mapv(f) }
    }
}

impl From<ArrayD<Dtype>> for Tensor {
    fn from(data: ArrayD<Dtype>) -> Self {
        Self { data }
    }
}
