use crate::errors::{SGError, SGResult};
use crate::tensor::Tensor;
use crate::types::{Dtype, Symbol};

/// A symbol-keyed tensor store. Slots are appended while a model is built
/// and mutated in place by kernels afterwards; appending the same symbol
/// twice is a programming error. The gradient arena only ever holds entries
/// for trainable symbols.
#[derive(Debug, Default)]
pub struct Arena {
    slots: Vec<Option<Tensor>>,
}

impl Arena {
    pub fn new() -> Self {
        Self::default()
    }

    /// Drops every entry. Symbols of the graph that filled this arena are
    /// dangling afterwards.
    pub fn clear(&mut self) {
        self.slots.clear();
    }

    pub fn occupied(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn contains(&self, symbol: &Symbol) -> bool {
        self.slots.get(symbol.id()).map_or(false, |s| s.is_some())
    }

    pub fn append(&mut self, symbol: &Symbol, tensor: Tensor) -> SGResult<()> {
        if self.slots.len() <= symbol.id() {
            self.slots.resize_with(symbol.id() + 1, || None);
        }
        let slot = &mut self.slots[symbol.id()];
        if slot.is_some() {
            return Err(SGError::DuplicateSymbol(symbol.id()));
        }
        *slot = Some(tensor);
        Ok(())
    }

    pub fn get(&self, symbol: &Symbol) -> SGResult<&Tensor> {
        self.slots
            .get(symbol.id())
            .and_then(|s| s.as_ref())
            .ok_or(SGError::MissingTensor(symbol.id()))
    }

    pub fn get_mut(&mut self, symbol: &Symbol) -> SGResult<&mut Tensor> {
        self.slots
            .get_mut(symbol.id())
            .and_then(|s| s.as_mut())
            .ok_or(SGError::MissingTensor(symbol.id()))
    }

    pub fn try_get(&self, symbol: &Symbol) -> Option<&Tensor> {
        self.slots.get(symbol.id()).and_then(|s| s.as_ref())
    }

    /// Elementwise `+=` into the slot, the accumulation step of backward.
    pub fn accumulate(&mut self, symbol: &Symbol, delta: &Tensor) -> SGResult<()> {
        let target = self.get_mut(symbol)?;
        if target.dims() != delta.dims() {
            return Err(SGError::IncompatibleShapes {
                expected: target.dims().to_vec(),
                found: delta.dims().to_vec(),
            });
        }
        *target += delta;
        Ok(())
    }

    pub fn fill_all(&mut self, value: Dtype) {
        for slot in self.slots.iter_mut().flatten() {
            slot.fill(value);
        }
    }

    /// Mutable output slot together with immutable input slots in one
    /// borrow. Valid because a node's output id exceeds all of its input
    /// ids by construction.
    pub fn output_with_inputs(
        &mut self,
        output: &Symbol,
        inputs: &[Symbol],
    ) -> SGResult<(&mut Tensor, Vec<&Tensor>)> {
        if self.slots.len() <= output.id() {
            return Err(SGError::MissingTensor(output.id()));
        }
        for s in inputs {
            if s.id() >= output.id() {
                return Err(SGError::UnknownSymbol(s.id()));
            }
        }
        let (head, tail) = self.slots.split_at_mut(output.id());
        let out = tail[0].as_mut().ok_or(SGError::MissingTensor(output.id()))?;
        let mut ins = Vec::with_capacity(inputs.len());
        for s in inputs {
            ins.push(head[s.id()].as_ref().ok_or(SGError::MissingTensor(s.id()))?);
        }
        Ok((out, ins))
    }

    /// One slot to read and a distinct slot to write, borrowed together.
    /// Dynamic backward kernels use this to stream an upstream gradient
    /// into a target gradient slot.
    pub fn pair_mut(&mut self, read: &Symbol, write: &Symbol) -> SGResult<(&Tensor, &mut Tensor)> {
        if read.id() == write.id() {
            return Err(SGError::DuplicateSymbol(read.id()));
        }
        let hi = read.id().max(write.id());
        if self.slots.len() <= hi {
            return Err(SGError::MissingTensor(hi));
        }
        let (head, tail) = self.slots.split_at_mut(hi);
        if read.id() > write.id() {
            let r = tail[0].as_ref().ok_or(SGError::MissingTensor(read.id()))?;
            let w = head[write.id()].as_mut().ok_or(SGError::MissingTensor(write.id()))?;
            Ok((r, w))
        } else {
            let w = tail[0].as_mut().ok_or(SGError::MissingTensor(write.id()))?;
            let r = head[read.id()].as_ref().ok_or(SGError::MissingTensor(read.id()))?;
            Ok((r, w))
        }
    }
}
