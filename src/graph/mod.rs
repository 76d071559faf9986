pub mod dsl;
pub mod verifier;

use std::path::Path;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use crate::arena::Arena;
use crate::attrs::Attributes;
use crate::errors::{SGError, SGResult};
use crate::init::ParamInit;
use crate::tensor::Tensor;
use crate::types::{Shape, Symbol, SymbolKind};

/// A kernel family in the operator catalog. Static operators have arity
/// 1..=3 and are handed their input tensors plus a mutable output slot;
/// dynamic operators take the whole symbol lists and index the arenas
/// themselves.
#[typetag::serde]
pub trait Operator: Send + Sync + std::fmt::Debug {
    fn name(&self) -> &str;

    /// Output shape from input shapes and node attributes. Pure; called at
    /// graph-build time, so shape and attribute errors surface before any
    /// tensor is allocated.
    fn result_shape(&self, input_shapes: &[Shape], attrs: &Attributes) -> SGResult<Shape>;

    /// Writes the node's output into the arena-resident output tensor.
    fn forward(&self, out: &mut Tensor, inputs: &[&Tensor], attrs: &Attributes) -> SGResult<()>;

    /// Gradient of the loss w.r.t. `inputs[slot]`, given the upstream
    /// gradient at the node's output. Returns a fresh tensor shaped like
    /// the slot's input; the executor accumulates it. Only invoked for
    /// trainable slots.
    fn backward(
        &self,
        slot: usize,
        upstream: &Tensor,
        inputs: &[&Tensor],
        attrs: &Attributes,
    ) -> SGResult<Tensor>;

    fn is_dynamic(&self) -> bool {
        false
    }

    fn forward_dynamic(
        &self,
        _tensors: &mut Arena,
        _inputs: &[Symbol],
        _outputs: &[Symbol],
        _attrs: &Attributes,
    ) -> SGResult<()> {
        Err(SGError::WrongDispatch { op: self.name().to_string(), expected: "static" })
    }

    /// Dynamic backward writes straight into the gradient arena slot for
    /// `inputs[slot]`.
    fn backward_dynamic(
        &self,
        _slot: usize,
        _tensors: &Arena,
        _grads: &mut Arena,
        _inputs: &[Symbol],
        _outputs: &[Symbol],
        _attrs: &Attributes,
    ) -> SGResult<()> {
        Err(SGError::WrongDispatch { op: self.name().to_string(), expected: "static" })
    }
}

/// One scheduled operation: operator, attributes, and the symbols it reads
/// and produces.
#[derive(Debug, Serialize, Deserialize)]
pub struct Node {
    pub op: Box<dyn Operator>,
    pub attrs: Attributes,
    pub inputs: Vec<Symbol>,
    pub outputs: Vec<Symbol>,
}

/// Parameter entry: the symbol plus how to fill its tensor.
#[derive(Debug, Serialize, Deserialize)]
pub struct Param {
    pub symbol: Symbol,
    pub init: ParamInit,
}

/// An immutable-once-built DAG of nodes plus the declared inputs,
/// parameters, outputs and optional loss. Nodes run in declaration order
/// forward and exact reverse order backward; cycles cannot be expressed
/// because a node may only consume symbols that already exist.
#[derive(Debug, Default, Serialize, Deserialize)]
pub struct Graph {
    next_id: usize,
    inputs: Vec<Symbol>,
    params: Vec<Param>,
    nodes: Vec<Node>,
    outputs: Vec<Symbol>,
    loss: Option<Symbol>,
}

impl Graph {
    pub fn new() -> Self {
        Self::default()
    }

    fn fresh_symbol(&mut self, shape: Shape, trainable: bool, kind: SymbolKind) -> Symbol {
        let symbol = Symbol::new(self.next_id, shape, trainable, kind);
        self.next_id += 1;
        symbol
    }

    /// Appends a non-trainable graph input.
    pub fn input(&mut self, shape: Shape) -> Symbol {
        self.input_trainable(shape, false)
    }

    pub fn input_trainable(&mut self, shape: Shape, trainable: bool) -> Symbol {
        let symbol = self.fresh_symbol(shape, trainable, SymbolKind::Input);
        self.inputs.push(symbol.clone());
        symbol
    }

    /// Appends a trainable parameter with its initializer record.
    pub fn param(&mut self, shape: Shape, init: ParamInit) -> Symbol {
        self.param_trainable(shape, init, true)
    }

    pub fn param_trainable(&mut self, shape: Shape, init: ParamInit, trainable: bool) -> Symbol {
        let symbol = self.fresh_symbol(shape, trainable, SymbolKind::Param);
        self.params.push(Param { symbol: symbol.clone(), init });
        symbol
    }

    /// Appends a node. The output shape is computed (and checked) here, so
    /// a shape or attribute problem fails the build, not the first run.
    /// The output symbol is trainable iff any input is.
    pub fn op(
        &mut self,
        op: Box<dyn Operator>,
        inputs: &[&Symbol],
        attrs: Attributes,
    ) -> SGResult<Symbol> {
        for s in inputs {
            if s.id() >= self.next_id {
                return Err(SGError::UnknownSymbol(s.id()));
            }
        }
        let input_shapes: Vec<Shape> = inputs.iter().map(|s| s.shape().clone()).collect();
        let out_shape = op.result_shape(&input_shapes, &attrs)?;
        let trainable = inputs.iter().any(|s| s.trainable());
        let output = self.fresh_symbol(out_shape, trainable, SymbolKind::Intermediate);
        self.nodes.push(Node {
            op,
            attrs,
            inputs: inputs.iter().map(|s| (*s).clone()).collect(),
            outputs: vec![output.clone()],
        });
        Ok(output)
    }

    /// Marks a symbol as a graph output, read back by `inference`.
    pub fn out(&mut self, symbol: &Symbol) {
        if !self.outputs.iter().any(|o| o.id() == symbol.id()) {
            self.outputs.push(symbol.clone());
        }
    }

    /// Marks the loss output. At most one.
    pub fn loss(&mut self, symbol: &Symbol) -> SGResult<()> {
        if self.loss.is_some() {
            return Err(SGError::DuplicateLoss);
        }
        self.loss = Some(symbol.clone());
        Ok(())
    }

    pub fn inputs(&self) -> &[Symbol] {
        &self.inputs
    }

    pub fn params(&self) -> &[Param] {
        &self.params
    }

    pub fn nodes(&self) -> &[Node] {
        &self.nodes
    }

    pub fn outputs(&self) -> &[Symbol] {
        &self.outputs
    }

    pub fn loss_out(&self) -> Option<&Symbol> {
        self.loss.as_ref()
    }

    pub fn symbol_count(&self) -> usize {
        self.next_id
    }

    /// Smallest prefix of the node list whose execution produces every
    /// declared output: scan in reverse for the last node touching an
    /// output symbol. `None` when no output is produced by any node, which
    /// disables inference.
    pub fn n_inference_nodes(&self) -> Option<usize> {
        for i in (0..self.nodes.len()).rev() {
            let produces_output = self.nodes[i]
                .outputs
                .iter()
                .any(|o| self.outputs.iter().any(|g| g.id() == o.id()));
            if produces_output {
                return Some(i + 1);
            }
        }
        None
    }

    pub fn save<P: AsRef<Path>>(&self, path: P) -> anyhow::Result<()> {
        let json = serde_json::to_string_pretty(self).context("serializing graph")?;
        std::fs::write(path.as_ref(), json)
            .with_context(|| format!("writing graph to {}", path.as_ref().display()))?;
        Ok(())
    }

    pub fn load<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let json = std::fs::read_to_string(path.as_ref())
            .with_context(|| format!("reading graph from {}", path.as_ref().display()))?;
        let graph = serde_json::from_str(&json).context("parsing graph json")?;
        Ok(graph)
    }
}
