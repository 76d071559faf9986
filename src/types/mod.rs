use serde::{Deserialize, Serialize};

/// The element type every tensor in the engine carries, selected once at
/// compile time. Kernels, arenas and initializers all agree on it.
pub type Dtype = f32;

/// Shape of a tensor: an ordered list of extents. Immutable after
/// construction; rank 0 (the empty shape) denotes a scalar.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Self { dims }
    }

    pub fn from_slice(dims: &[usize]) -> Self {
        Self { dims: dims.to_vec() }
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Product of all extents; the empty product (rank 0) is 1.
    pub fn num_elements(&self) -> usize {
        self.dims.iter().product()
    }

    /// Row-major strides: strides[i] is the flat distance between
    /// neighbours along axis i, with strides[rank-1] == 1.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1; self.dims.len()];
        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    pub fn extent(&self, axis: usize) -> usize {
        self.dims[axis]
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Self { dims }
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Self::from_slice(dims)
    }
}

/// What a symbol stands for in its graph.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SymbolKind {
    Input,
    Param,
    Intermediate,
}

/// Handle identifying one tensor slot in the arenas. The tensor data lives
/// in the arena; the symbol carries the statically known facts about it.
/// Ids are minted monotonically by the owning graph, so a node's output
/// symbol always has a larger id than every symbol it consumes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Symbol {
    id: usize,
    shape: Shape,
    trainable: bool,
    kind: SymbolKind,
}

impl Symbol {
    pub(crate) fn new(id: usize, shape: Shape, trainable: bool, kind: SymbolKind) -> Self {
        Self { id, shape, trainable, kind }
    }

    pub fn id(&self) -> usize {
        self.id
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    /// True iff this symbol participates in backward accumulation.
    pub fn trainable(&self) -> bool {
        self.trainable
    }

    pub fn kind(&self) -> SymbolKind {
        self.kind
    }
}
