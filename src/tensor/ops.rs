use super::Tensor;
use crate::types::Dtype;

// Operator overloading for kernels and tests. Equal shapes assumed; ndarray
// panics on mismatch, which only an executor bug can reach after the
// build-time shape checks.

impl std::ops::Add for &Tensor {
    type Output = Tensor;
    fn add(self, rhs: Self) -> Self::Output {
        (&self.data + &rhs.data).into()
    }
}

impl std::ops::Sub for &Tensor {
    type Output = Tensor;
    fn sub(self, rhs: Self) -> Self::Output {
        (&self.data - &rhs.data).into()
    }
}

impl std::ops::Mul for &Tensor {
    type Output = Tensor;
    fn mul(self, rhs: Self) -> Self::Output {
        (&self.data * &rhs.data).into()
    }
}

impl std::ops::Mul<Dtype> for &Tensor {
    type Output = Tensor;
    fn mul(self, rhs: Dtype) -> Self::Output {
        (&self.data * rhs).into()
    }
}

impl std::ops::Div<Dtype> for &Tensor {
    type Output = Tensor;
    fn div(self, rhs: Dtype) -> Self::Output {
        (&self.data / rhs).into()
    }
}

impl std::ops::AddAssign<&Tensor> for Tensor {
    fn add_assign(&mut self, rhs: &Tensor) {
        self.data += &rhs.data;
    }
}

impl std::ops::SubAssign<&Tensor> for Tensor {
    fn sub_assign(&mut self, rhs: &Tensor) {
        self.data -= &rhs.data;
    }
}
