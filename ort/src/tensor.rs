//! Shapes, element types and caller-owned tensor buffers.

use std::fmt;
use std::os::raw::{c_int, c_void};

use crate::error::{OrtError, Result};

/// ONNX tensor element types (`ONNXTensorElementDataType`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ElementType {
    Float32,
    Uint8,
    Int8,
    Uint16,
    Int16,
    Int32,
    Int64,
    String,
    Bool,
    Float16,
    Float64,
    Uint32,
    Uint64,
    Bfloat16,
    Undefined(i32),
}

impl ElementType {
    pub(crate) fn to_native(self) -> c_int {
        match self {
            ElementType::Float32 => 1,
            ElementType::Uint8 => 2,
            ElementType::Int8 => 3,
            ElementType::Uint16 => 4,
            ElementType::Int16 => 5,
            ElementType::Int32 => 6,
            ElementType::Int64 => 7,
            ElementType::String => 8,
            ElementType::Bool => 9,
            ElementType::Float16 => 10,
            ElementType::Float64 => 11,
            ElementType::Uint32 => 12,
            ElementType::Uint64 => 13,
            ElementType::Bfloat16 => 16,
            ElementType::Undefined(v) => v,
        }
    }

    pub(crate) fn from_native(v: c_int) -> Self {
        match v {
            1 => ElementType::Float32,
            2 => ElementType::Uint8,
            3 => ElementType::Int8,
            4 => ElementType::Uint16,
            5 => ElementType::Int16,
            6 => ElementType::Int32,
            7 => ElementType::Int64,
            8 => ElementType::String,
            9 => ElementType::Bool,
            10 => ElementType::Float16,
            11 => ElementType::Float64,
            12 => ElementType::Uint32,
            13 => ElementType::Uint64,
            16 => ElementType::Bfloat16,
            other => ElementType::Undefined(other),
        }
    }
}

mod sealed {
    pub trait Sealed {}
}

/// Rust types that can back a tensor buffer.
///
/// Implemented for the fixed-width numeric types ONNX Runtime shares
/// memory with directly. Sealed: the byte layout must match the native
/// element type exactly.
pub trait TensorElement: sealed::Sealed + Copy + Default + Send + Sync + fmt::Debug + 'static {
    const ELEMENT_TYPE: ElementType;
}

macro_rules! tensor_element {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl sealed::Sealed for $ty {}
            impl TensorElement for $ty {
                const ELEMENT_TYPE: ElementType = ElementType::$variant;
            }
        )*
    };
}

tensor_element! {
    f32 => Float32,
    f64 => Float64,
    i8 => Int8,
    i16 => Int16,
    i32 => Int32,
    i64 => Int64,
    u8 => Uint8,
    u16 => Uint16,
    u32 => Uint32,
    u64 => Uint64,
    bool => Bool,
}

// ---------------------------------------------------------------------------
// Shape
// ---------------------------------------------------------------------------

/// Tensor dimensions. Non-empty, every dimension at least 1.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Shape {
    dims: Vec<i64>,
    size: usize,
}

impl Shape {
    /// Creates a shape after validating its dimensions.
    pub fn new(dims: impl Into<Vec<i64>>) -> Result<Self> {
        let dims = dims.into();
        if dims.is_empty() {
            return Err(OrtError::InvalidShape("shape must have at least one dimension".into()));
        }
        let mut size: usize = 1;
        for (i, &d) in dims.iter().enumerate() {
            if d < 1 {
                return Err(OrtError::InvalidShape(format!("dimension {i} is {d}")));
            }
            size = usize::try_from(d)
                .ok()
                .and_then(|d| size.checked_mul(d))
                .ok_or_else(|| OrtError::InvalidShape(format!("{dims:?} overflows usize")))?;
        }
        Ok(Self { dims, size })
    }

    pub fn dims(&self) -> &[i64] {
        &self.dims
    }

    pub fn rank(&self) -> usize {
        self.dims.len()
    }

    /// Total number of elements.
    pub fn flattened_size(&self) -> usize {
        self.size
    }

    /// Reports whether this shape satisfies a model's declared dims.
    /// Non-positive model dims are symbolic and match anything.
    pub fn conforms_to(&self, model_dims: &[i64]) -> bool {
        self.dims.len() == model_dims.len()
            && self.dims.iter().zip(model_dims).all(|(&d, &m)| m <= 0 || d == m)
    }
}

impl fmt::Display for Shape {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("[")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                f.write_str(" ")?;
            }
            write!(f, "{d}")?;
        }
        f.write_str("]")
    }
}

impl TryFrom<&[i64]> for Shape {
    type Error = OrtError;

    fn try_from(dims: &[i64]) -> Result<Self> {
        Shape::new(dims)
    }
}

// ---------------------------------------------------------------------------
// Tensor
// ---------------------------------------------------------------------------

/// Typed, shaped buffer handed to the native engine without copying.
///
/// The buffer is allocated once and never resized, so every run reads
/// from or writes into the same memory. The native engine only borrows
/// it for the duration of a run.
#[derive(Debug, Clone, PartialEq)]
pub struct Tensor<T: TensorElement> {
    shape: Shape,
    data: Box<[T]>,
}

impl<T: TensorElement> Tensor<T> {
    /// Takes ownership of `data` as the tensor's buffer.
    pub fn from_data(shape: Shape, data: Vec<T>) -> Result<Self> {
        check_len(&shape, data.len())?;
        Ok(Self {
            shape,
            data: data.into_boxed_slice(),
        })
    }

    /// Copies `data` into a new buffer. The length is checked first.
    pub fn from_slice(shape: Shape, data: &[T]) -> Result<Self> {
        check_len(&shape, data.len())?;
        Ok(Self {
            shape,
            data: data.into(),
        })
    }

    /// Allocates a zero-filled tensor, typically for outputs.
    pub fn empty(shape: Shape) -> Self {
        let data = vec![T::default(); shape.flattened_size()].into_boxed_slice();
        Self { shape, data }
    }

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    /// Resets every element to zero.
    pub fn zero(&mut self) {
        self.data.fill(T::default());
    }

    pub fn into_data(self) -> Vec<T> {
        self.data.into_vec()
    }
}

fn check_len(shape: &Shape, len: usize) -> Result<()> {
    if len != shape.flattened_size() {
        return Err(OrtError::DataLength {
            expected: shape.flattened_size(),
            actual: len,
        });
    }
    Ok(())
}

/// Type-erased view of a tensor, used to run sessions with mixed
/// element types.
pub trait AnyTensor {
    fn element_type(&self) -> ElementType;
    fn shape(&self) -> &Shape;
    /// Size of the buffer in bytes.
    fn byte_len(&self) -> usize;
    #[doc(hidden)]
    fn buffer_ptr(&self) -> *const c_void;
    #[doc(hidden)]
    fn buffer_mut_ptr(&mut self) -> *mut c_void;
}

impl<T: TensorElement> AnyTensor for Tensor<T> {
    fn element_type(&self) -> ElementType {
        T::ELEMENT_TYPE
    }

    fn shape(&self) -> &Shape {
        &self.shape
    }

    fn byte_len(&self) -> usize {
        std::mem::size_of_val(&*self.data)
    }

    fn buffer_ptr(&self) -> *const c_void {
        self.data.as_ptr().cast()
    }

    fn buffer_mut_ptr(&mut self) -> *mut c_void {
        self.data.as_mut_ptr().cast()
    }
}
