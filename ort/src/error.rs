use std::fmt;
use std::path::PathBuf;

use thiserror::Error;

use crate::tensor::ElementType;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, OrtError>;

/// Errors returned by ONNX Runtime operations.
#[derive(Debug, Error)]
pub enum OrtError {
    #[error("ort: failed to load shared library {path:?}: {source}")]
    LibraryLoad {
        path: PathBuf,
        #[source]
        source: libloading::Error,
    },

    #[error("ort: shared library {loaded:?} is already loaded, cannot switch to {requested:?}")]
    LibraryMismatch { loaded: PathBuf, requested: PathBuf },

    #[error("ort: library does not provide API version {0}")]
    ApiVersion(u32),

    #[error("ort: environment is already initialized")]
    AlreadyInitialized,

    #[error("ort: environment destroyed with {sessions} live session(s)")]
    SessionsOutstanding { sessions: usize },

    #[error("ort: failed to load model {model:?}: {status}")]
    ModelLoad { model: String, status: StatusError },

    #[error("ort: no {kind} named {name:?} in model (available: {available:?})")]
    UnknownSlot {
        kind: SlotKind,
        name: String,
        available: Vec<String>,
    },

    #[error("ort: {kind} {name:?} bound more than once")]
    DuplicateSlot { kind: SlotKind, name: String },

    #[error("ort: expected {expected} {kind} tensor(s), got {actual}")]
    SlotCount {
        kind: SlotKind,
        expected: usize,
        actual: usize,
    },

    #[error("ort: {kind} {name:?} has shape {actual:?}, model expects {expected:?}")]
    ShapeMismatch {
        kind: SlotKind,
        name: String,
        expected: Vec<i64>,
        actual: Vec<i64>,
    },

    #[error("ort: {kind} {name:?} has element type {actual:?}, model expects {expected:?}")]
    ElementTypeMismatch {
        kind: SlotKind,
        name: String,
        expected: ElementType,
        actual: ElementType,
    },

    #[error("ort: invalid shape: {0}")]
    InvalidShape(String),

    #[error("ort: data length {actual} does not match shape size {expected}")]
    DataLength { expected: usize, actual: usize },

    #[error("ort: run failed: {0}")]
    Run(StatusError),

    #[error("ort: {0}")]
    Runtime(StatusError),

    #[error("ort: model {0:?} not registered")]
    ModelNotRegistered(String),

    #[error("ort: empty data")]
    EmptyData,

    #[error("ort: string contains an interior NUL byte: {0}")]
    InvalidName(#[from] std::ffi::NulError),
}

/// Whether a slot is a model input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotKind {
    Input,
    Output,
}

impl fmt::Display for SlotKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SlotKind::Input => f.write_str("input"),
            SlotKind::Output => f.write_str("output"),
        }
    }
}

/// Error codes reported by the native library (`OrtErrorCode`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCode {
    Fail,
    InvalidArgument,
    NoSuchFile,
    NoModel,
    EngineError,
    RuntimeException,
    InvalidProtobuf,
    ModelLoaded,
    NotImplemented,
    InvalidGraph,
    ExecutionProviderFail,
    Unknown(i32),
}

impl From<i32> for ErrorCode {
    fn from(code: i32) -> Self {
        match code {
            1 => ErrorCode::Fail,
            2 => ErrorCode::InvalidArgument,
            3 => ErrorCode::NoSuchFile,
            4 => ErrorCode::NoModel,
            5 => ErrorCode::EngineError,
            6 => ErrorCode::RuntimeException,
            7 => ErrorCode::InvalidProtobuf,
            8 => ErrorCode::ModelLoaded,
            9 => ErrorCode::NotImplemented,
            10 => ErrorCode::InvalidGraph,
            11 => ErrorCode::ExecutionProviderFail,
            other => ErrorCode::Unknown(other),
        }
    }
}

/// A failed `OrtStatus`, copied out of native memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusError {
    pub code: ErrorCode,
    pub message: String,
}

impl StatusError {
    pub(crate) fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

impl fmt::Display for StatusError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}: {}", self.code, self.message)
    }
}

impl std::error::Error for StatusError {}
