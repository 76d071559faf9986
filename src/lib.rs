pub mod arena;
pub mod attrs;
pub mod errors;
pub mod graph;
pub mod init;
#[cfg(feature = "metrics")]
pub mod metrics;
pub mod model;
pub mod ops;
pub mod tensor;
pub mod types;

mod macros;

pub use arena::Arena;
pub use attrs::{AttrValue, Attributes};
pub use errors::{SGError, SGResult};
pub use graph::{Graph, Node, Operator, Param};
pub use init::{Initializer, ParamInit};
pub use model::Model;
pub use tensor::Tensor;
pub use types::{Dtype, Shape, Symbol, SymbolKind};
