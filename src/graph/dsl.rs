use crate::attrs::{AttrValue, Attributes};
use crate::errors::SGResult;
use crate::graph::Graph;
use crate::init::ParamInit;
use crate::ops::{
    Add, Clip, Concat, Conv2D, Div, MatMul, MaxPool2D, Mean, Mul, Relu, Reshape, Sigmoid,
    Squeeze, Sub, Sum, Tanh, Unsqueeze,
};
use crate::types::{Dtype, Shape, Symbol};

/// Ergonomic layer over `Graph` for hand-built models and tests.
pub struct GraphBuilder<'a> {
    graph: &'a mut Graph,
}

impl<'a> GraphBuilder<'a> {
    pub fn new(graph: &'a mut Graph) -> Self {
        Self { graph }
    }

    pub fn input(&mut self, dims: &[usize]) -> Symbol {
        self.graph.input(Shape::from_slice(dims))
    }

    pub fn param(&mut self, dims: &[usize], init: ParamInit) -> Symbol {
        self.graph.param(Shape::from_slice(dims), init)
    }

    /// Parameter with explicit starting values.
    pub fn param_data(&mut self, dims: &[usize], data: Vec<Dtype>) -> Symbol {
        self.graph.param(Shape::from_slice(dims), ParamInit::Data(data))
    }

    pub fn relu(&mut self, x: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Relu), &[x], Attributes::new())
    }

    pub fn sigmoid(&mut self, x: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Sigmoid), &[x], Attributes::new())
    }

    pub fn tanh(&mut self, x: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Tanh), &[x], Attributes::new())
    }

    pub fn clip(&mut self, x: &Symbol, min: Option<Dtype>, max: Option<Dtype>) -> SGResult<Symbol> {
        let mut attrs = Attributes::new();
        if let Some(lo) = min {
            attrs = attrs.with("min", AttrValue::Scalar(lo as f64));
        }
        if let Some(hi) = max {
            attrs = attrs.with("max", AttrValue::Scalar(hi as f64));
        }
        self.graph.op(Box::new(Clip), &[x], attrs)
    }

    /// Squeeze away the listed axes; an empty list drops every unit axis.
    pub fn squeeze(&mut self, x: &Symbol, dims: &[usize]) -> SGResult<Symbol> {
        let attrs = if dims.is_empty() {
            Attributes::new()
        } else {
            Attributes::new().with("dims", AttrValue::IntTuple(dims.to_vec()))
        };
        self.graph.op(Box::new(Squeeze), &[x], attrs)
    }

    pub fn squeeze_dim(&mut self, x: &Symbol, dim: usize) -> SGResult<Symbol> {
        let attrs = Attributes::new().with("dim", AttrValue::Int(dim));
        self.graph.op(Box::new(Squeeze), &[x], attrs)
    }

    /// Insert unit axes at the listed output positions; an empty list
    /// prepends a single one.
    pub fn unsqueeze(&mut self, x: &Symbol, dims: &[usize]) -> SGResult<Symbol> {
        let attrs = if dims.is_empty() {
            Attributes::new()
        } else {
            Attributes::new().with("dims", AttrValue::IntTuple(dims.to_vec()))
        };
        self.graph.op(Box::new(Unsqueeze), &[x], attrs)
    }

    pub fn unsqueeze_dim(&mut self, x: &Symbol, dim: usize) -> SGResult<Symbol> {
        let attrs = Attributes::new().with("dim", AttrValue::Int(dim));
        self.graph.op(Box::new(Unsqueeze), &[x], attrs)
    }

    pub fn reshape(&mut self, x: &Symbol, dims: &[usize]) -> SGResult<Symbol> {
        let attrs = Attributes::new().with("shape", AttrValue::Shape(Shape::from_slice(dims)));
        self.graph.op(Box::new(Reshape), &[x], attrs)
    }

    pub fn max_pool2d(
        &mut self,
        x: &Symbol,
        kernel_size: [usize; 2],
        stride: [usize; 2],
        padding: [usize; 2],
        dilation: [usize; 2],
    ) -> SGResult<Symbol> {
        let attrs = Attributes::new()
            .with("kernel_size", AttrValue::IntTuple(kernel_size.to_vec()))
            .with("stride", AttrValue::IntTuple(stride.to_vec()))
            .with("padding", AttrValue::IntTuple(padding.to_vec()))
            .with("dilation", AttrValue::IntTuple(dilation.to_vec()));
        self.graph.op(Box::new(MaxPool2D), &[x], attrs)
    }

    pub fn conv2d(
        &mut self,
        x: &Symbol,
        weight: &Symbol,
        stride: [usize; 2],
        padding: [usize; 2],
    ) -> SGResult<Symbol> {
        let attrs = Attributes::new()
            .with("stride", AttrValue::IntTuple(stride.to_vec()))
            .with("padding", AttrValue::IntTuple(padding.to_vec()));
        self.graph.op(Box::new(Conv2D), &[x, weight], attrs)
    }

    pub fn matmul(&mut self, a: &Symbol, b: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(MatMul), &[a, b], Attributes::new())
    }

    pub fn add(&mut self, a: &Symbol, b: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Add), &[a, b], Attributes::new())
    }

    pub fn sub(&mut self, a: &Symbol, b: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Sub), &[a, b], Attributes::new())
    }

    pub fn mul(&mut self, a: &Symbol, b: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Mul), &[a, b], Attributes::new())
    }

    pub fn div(&mut self, a: &Symbol, b: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Div), &[a, b], Attributes::new())
    }

    pub fn sum(&mut self, x: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Sum), &[x], Attributes::new())
    }

    pub fn mean(&mut self, x: &Symbol) -> SGResult<Symbol> {
        self.graph.op(Box::new(Mean), &[x], Attributes::new())
    }

    pub fn concat(&mut self, xs: &[&Symbol], dim: usize) -> SGResult<Symbol> {
        let attrs = Attributes::new().with("dim", AttrValue::Int(dim));
        self.graph.op(Box::new(Concat), xs, attrs)
    }

    /// Linear transformation: x @ w + b.
    pub fn linear(&mut self, x: &Symbol, w: &Symbol, b: &Symbol) -> SGResult<Symbol> {
        let xw = self.matmul(x, w)?;
        self.add(&xw, b)
    }

    pub fn output(&mut self, s: &Symbol) {
        self.graph.out(s);
    }

    pub fn loss(&mut self, s: &Symbol) -> SGResult<()> {
        self.graph.loss(s)
    }
}
