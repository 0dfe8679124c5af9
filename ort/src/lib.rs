//! Rust bindings for the ONNX Runtime C API.
//!
//! ONNX Runtime is a cross-platform inference engine for ONNX models.
//! This crate loads the shared library at runtime and wraps its C API in
//! safe types for Environment, Session, and Tensor.
//!
//! # Usage
//!
//! ```no_run
//! use giztoy_ort::{Environment, Session, Shape, Tensor};
//!
//! let env = Environment::builder()
//!     .with_library_path("libonnxruntime_1.14.1_osx_arm64.dylib")
//!     .initialize()?;
//! let session = Session::new(&env, "example_network.onnx", &["input"], &["output"])?;
//!
//! let input = Tensor::from_data(Shape::new([1, 1, 4])?, vec![0.616f32, 0.1045, 0.1191, 0.3446])?;
//! let mut output = Tensor::<f32>::empty(Shape::new([1, 1, 2])?);
//! session.run(&[&input], &mut [&mut output])?;
//! println!("{:?}", output.data());
//!
//! drop(session);
//! env.destroy()?;
//! # Ok::<(), giztoy_ort::OrtError>(())
//! ```
//!
//! # Lifecycle
//!
//! Only one [`Environment`] may exist per process; a second
//! `initialize` fails until the first is gone. Sessions hold the native
//! environment alive, and [`Environment::destroy`] reports sessions that
//! outlive it. Tensors are plain Rust buffers lent to the engine for the
//! duration of a run, so they carry no ordering constraint.
//!
//! # Dynamic Linking
//!
//! The library is opened with `libloading`. Its path comes from the
//! builder, the `ONNXRUNTIME_SHARED_LIBRARY_PATH` variable, or the
//! platform default name, in that order.

mod environment;
mod error;
mod ffi;
mod library;
mod logging;
pub mod model;
mod session;
mod tensor;

pub use environment::{Environment, EnvironmentBuilder, EnvironmentConfig};
pub use error::{ErrorCode, OrtError, Result, SlotKind, StatusError};
pub use library::{LIBRARY_PATH_ENV, resolve_library_path};
pub use logging::LoggingLevel;
pub use model::{is_registered, list_models, load_model, register_model};
pub use session::{GraphOptimizationLevel, Session, SessionBuilder, SlotInfo};
pub use tensor::{AnyTensor, ElementType, Shape, Tensor, TensorElement};
