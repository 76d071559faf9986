use thiserror::Error;

#[derive(Error, Debug)]
pub enum SGError {
    #[error("Incompatible shapes: expected {expected:?}, found {found:?}")]
    IncompatibleShapes { expected: Vec<usize>, found: Vec<usize> },
    #[error("{op}: expected {expected} input(s), got {found}")]
    ArityMismatch { op: String, expected: usize, found: usize },
    #[error("{op} requires attribute `{attr}`")]
    MissingAttribute { op: String, attr: String },
    #[error("Bad attribute `{attr}` for {op}: {reason}")]
    BadAttribute { op: String, attr: String, reason: String },
    #[error("Loss output registered twice")]
    DuplicateLoss,
    #[error("Symbol {0} already owns a tensor in this arena")]
    DuplicateSymbol(usize),
    #[error("Symbol {0} is not part of this graph")]
    UnknownSymbol(usize),
    #[error("No tensor allocated for symbol {0}")]
    MissingTensor(usize),
    #[error("Graph has no loss output; forward and backward are unavailable")]
    LossMissing,
    #[error("No graph output is produced by any node; inference is unavailable")]
    InferenceDisabled,
    #[error("Model was built inference-only; backward is unavailable")]
    InferenceOnly,
    #[error("backward requires a completed forward pass")]
    BackwardBeforeForward,
    #[error("Operator `{op}` must go through the {expected} dispatch path")]
    WrongDispatch { op: String, expected: &'static str },
    #[error("Tensor error: {0}")]
    TensorError(String),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type SGResult<T> = Result<T, SGError>;
