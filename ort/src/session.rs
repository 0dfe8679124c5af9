//! Sessions: a loaded model bound to named input and output slots.

use std::ffi::CString;
use std::os::raw::{c_char, c_int, c_void};
use std::path::Path;
use std::ptr;
use std::sync::Arc;
use std::time::Instant;

use tracing::debug;

use crate::environment::{EnvInner, Environment};
use crate::error::{ErrorCode, OrtError, Result, SlotKind, StatusError};
use crate::ffi;
use crate::library::c_str_lossy;
use crate::tensor::{AnyTensor, ElementType, Shape, Tensor, TensorElement};

/// Graph optimizations applied when the model is loaded.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum GraphOptimizationLevel {
    Disabled,
    Basic,
    Extended,
    #[default]
    All,
}

impl GraphOptimizationLevel {
    fn to_native(self) -> c_int {
        match self {
            GraphOptimizationLevel::Disabled => 0,
            GraphOptimizationLevel::Basic => 1,
            GraphOptimizationLevel::Extended => 2,
            GraphOptimizationLevel::All => 99,
        }
    }
}

/// A named model input or output as declared in the graph.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SlotInfo {
    pub name: String,
    pub element_type: ElementType,
    /// Declared dimensions; symbolic dimensions are `-1`.
    pub dims: Vec<i64>,
}

// ---------------------------------------------------------------------------
// SessionBuilder
// ---------------------------------------------------------------------------

/// Configures and creates a [`Session`].
#[derive(Debug)]
pub struct SessionBuilder<'env> {
    env: &'env Environment,
    intra_threads: Option<u16>,
    inter_threads: Option<u16>,
    optimization_level: Option<GraphOptimizationLevel>,
}

impl<'env> SessionBuilder<'env> {
    pub(crate) fn new(env: &'env Environment) -> Self {
        Self {
            env,
            intra_threads: None,
            inter_threads: None,
            optimization_level: None,
        }
    }

    /// Threads used to parallelize a single operator. 0 lets ORT decide.
    pub fn with_intra_threads(mut self, threads: u16) -> Self {
        self.intra_threads = Some(threads);
        self
    }

    /// Threads used to run independent operators in parallel.
    pub fn with_inter_threads(mut self, threads: u16) -> Self {
        self.inter_threads = Some(threads);
        self
    }

    pub fn with_optimization_level(mut self, level: GraphOptimizationLevel) -> Self {
        self.optimization_level = Some(level);
        self
    }

    /// Loads a model file and binds the given input and output names.
    pub fn commit_from_file<S: AsRef<str>>(
        self,
        model_path: impl AsRef<Path>,
        input_names: &[S],
        output_names: &[S],
    ) -> Result<Session> {
        let model_path = model_path.as_ref();
        let model = model_path.display().to_string();
        if model.is_empty() {
            return Err(OrtError::ModelLoad {
                model,
                status: StatusError::new(ErrorCode::NoSuchFile, "empty model path"),
            });
        }
        let c_path = native_path(model_path)?;

        let inner = self.env.inner();
        let api = inner.lib.api();
        let options = self.options()?;
        let mut session: *mut ffi::OrtSession = ptr::null_mut();
        let status = unsafe { (api.CreateSession)(inner.env, c_path.as_ptr(), options.ptr, &mut session) };
        inner
            .lib
            .check(status)
            .map_err(|status| OrtError::ModelLoad { model: model.clone(), status })?;

        debug!(%model, "session created from file");
        Session::bind(Arc::clone(inner), session, input_names, output_names)
    }

    /// Loads a model from in-memory ONNX bytes.
    pub fn commit_from_memory<S: AsRef<str>>(
        self,
        model_data: &[u8],
        input_names: &[S],
        output_names: &[S],
    ) -> Result<Session> {
        if model_data.is_empty() {
            return Err(OrtError::EmptyData);
        }

        let inner = self.env.inner();
        let api = inner.lib.api();
        let options = self.options()?;
        let mut session: *mut ffi::OrtSession = ptr::null_mut();
        let status = unsafe {
            (api.CreateSessionFromArray)(
                inner.env,
                model_data.as_ptr() as *const c_void,
                model_data.len(),
                options.ptr,
                &mut session,
            )
        };
        inner.lib.check(status).map_err(|status| OrtError::ModelLoad {
            model: format!("<{} bytes in memory>", model_data.len()),
            status,
        })?;

        debug!(bytes = model_data.len(), "session created from memory");
        Session::bind(Arc::clone(inner), session, input_names, output_names)
    }

    fn options(&self) -> Result<SessionOptions<'_>> {
        let inner = self.env.inner();
        let lib = inner.lib;
        let api = lib.api();

        let mut ptr: *mut ffi::OrtSessionOptions = ptr::null_mut();
        lib.check_runtime(unsafe { (api.CreateSessionOptions)(&mut ptr) })?;
        let options = SessionOptions { env: inner, ptr };

        if let Some(n) = self.intra_threads {
            lib.check_runtime(unsafe { (api.SetIntraOpNumThreads)(options.ptr, c_int::from(n)) })?;
        }
        if let Some(n) = self.inter_threads {
            lib.check_runtime(unsafe { (api.SetInterOpNumThreads)(options.ptr, c_int::from(n)) })?;
        }
        if let Some(level) = self.optimization_level {
            lib.check_runtime(unsafe { (api.SetSessionGraphOptimizationLevel)(options.ptr, level.to_native()) })?;
        }
        Ok(options)
    }
}

struct SessionOptions<'a> {
    env: &'a EnvInner,
    ptr: *mut ffi::OrtSessionOptions,
}

impl Drop for SessionOptions<'_> {
    fn drop(&mut self) {
        unsafe { (self.env.lib.api().ReleaseSessionOptions)(self.ptr) };
    }
}

#[cfg(unix)]
fn native_path(path: &Path) -> Result<CString> {
    use std::os::unix::ffi::OsStrExt;
    Ok(CString::new(path.as_os_str().as_bytes())?)
}

#[cfg(windows)]
fn native_path(path: &Path) -> Result<Vec<u16>> {
    use std::os::windows::ffi::OsStrExt;
    let wide: Vec<u16> = path.as_os_str().encode_wide().collect();
    if wide.contains(&0) {
        return Err(OrtError::ModelLoad {
            model: path.display().to_string(),
            status: StatusError::new(ErrorCode::InvalidArgument, "path contains NUL"),
        });
    }
    Ok(wide.into_iter().chain(std::iter::once(0)).collect())
}

// ---------------------------------------------------------------------------
// Session
// ---------------------------------------------------------------------------

/// A loaded model with bound input and output slots.
///
/// A session may move between threads but is not `Sync`: concurrent
/// runs on one session need external locking.
pub struct Session {
    env: Arc<EnvInner>,
    session: *mut ffi::OrtSession,
    inputs: Vec<SlotInfo>,
    outputs: Vec<SlotInfo>,
    graph_inputs: Vec<SlotInfo>,
    graph_outputs: Vec<SlotInfo>,
    input_names: Vec<CString>,
    output_names: Vec<CString>,
}

unsafe impl Send for Session {}

impl std::fmt::Debug for Session {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Session")
            .field("inputs", &self.inputs)
            .field("outputs", &self.outputs)
            .finish()
    }
}

impl Session {
    pub fn builder(env: &Environment) -> SessionBuilder<'_> {
        SessionBuilder::new(env)
    }

    /// Loads `model_path` and binds the named slots using default options.
    pub fn new<S: AsRef<str>>(
        env: &Environment,
        model_path: impl AsRef<Path>,
        input_names: &[S],
        output_names: &[S],
    ) -> Result<Self> {
        env.session_builder()
            .commit_from_file(model_path, input_names, output_names)
    }

    /// Loads a model from memory using default options.
    pub fn from_memory<S: AsRef<str>>(
        env: &Environment,
        model_data: &[u8],
        input_names: &[S],
        output_names: &[S],
    ) -> Result<Self> {
        env.session_builder()
            .commit_from_memory(model_data, input_names, output_names)
    }

    /// Takes ownership of a freshly created native session, reads the
    /// graph's slots and resolves the requested names against them.
    fn bind<S: AsRef<str>>(
        env: Arc<EnvInner>,
        session: *mut ffi::OrtSession,
        input_names: &[S],
        output_names: &[S],
    ) -> Result<Self> {
        let mut this = Session {
            env,
            session,
            inputs: Vec::new(),
            outputs: Vec::new(),
            graph_inputs: Vec::new(),
            graph_outputs: Vec::new(),
            input_names: Vec::new(),
            output_names: Vec::new(),
        };

        this.graph_inputs = this.read_slots(SlotKind::Input)?;
        this.graph_outputs = this.read_slots(SlotKind::Output)?;
        this.inputs = resolve_slots(SlotKind::Input, &this.graph_inputs, input_names)?;
        this.outputs = resolve_slots(SlotKind::Output, &this.graph_outputs, output_names)?;
        this.input_names = c_names(&this.inputs)?;
        this.output_names = c_names(&this.outputs)?;
        Ok(this)
    }

    /// Bound inputs, in the order tensors are passed to `run`.
    pub fn inputs(&self) -> &[SlotInfo] {
        &self.inputs
    }

    /// Bound outputs, in the order tensors are passed to `run`.
    pub fn outputs(&self) -> &[SlotInfo] {
        &self.outputs
    }

    /// Every input the model graph declares.
    pub fn graph_inputs(&self) -> &[SlotInfo] {
        &self.graph_inputs
    }

    /// Every output the model graph declares.
    pub fn graph_outputs(&self) -> &[SlotInfo] {
        &self.graph_outputs
    }

    /// Runs the model once.
    ///
    /// Reads the current contents of `inputs` and writes results into the
    /// buffers of `outputs` in place. Blocks until the engine finishes.
    pub fn run<I: TensorElement, O: TensorElement>(
        &self,
        inputs: &[&Tensor<I>],
        outputs: &mut [&mut Tensor<O>],
    ) -> Result<()> {
        let inputs: Vec<&dyn AnyTensor> = inputs.iter().map(|t| *t as &dyn AnyTensor).collect();
        let mut outputs: Vec<&mut dyn AnyTensor> =
            outputs.iter_mut().map(|t| &mut **t as &mut dyn AnyTensor).collect();
        self.run_dyn(&inputs, &mut outputs)
    }

    /// Like [`run`](Self::run) but accepts tensors of different element types.
    pub fn run_dyn(&self, inputs: &[&dyn AnyTensor], outputs: &mut [&mut dyn AnyTensor]) -> Result<()> {
        check_count(SlotKind::Input, self.inputs.len(), inputs.len())?;
        check_count(SlotKind::Output, self.outputs.len(), outputs.len())?;
        for (slot, t) in self.inputs.iter().zip(inputs) {
            check_slot(SlotKind::Input, slot, t.element_type(), t.shape())?;
        }
        for (slot, t) in self.outputs.iter().zip(outputs.iter()) {
            check_slot(SlotKind::Output, slot, t.element_type(), t.shape())?;
        }

        let mut input_values = Vec::with_capacity(inputs.len());
        for t in inputs {
            // ORT never writes through input values.
            let data = t.buffer_ptr() as *mut c_void;
            input_values.push(NativeValue::wrap(&self.env, data, t.byte_len(), t.shape(), t.element_type())?);
        }
        let mut output_values = Vec::with_capacity(outputs.len());
        for t in outputs.iter_mut() {
            let data = t.buffer_mut_ptr();
            output_values.push(NativeValue::wrap(&self.env, data, t.byte_len(), t.shape(), t.element_type())?);
        }

        let input_ptrs: Vec<*const ffi::OrtValue> = input_values.iter().map(|v| v.ptr as *const _).collect();
        let mut output_ptrs: Vec<*mut ffi::OrtValue> = output_values.iter().map(|v| v.ptr).collect();
        let input_name_ptrs: Vec<*const c_char> = self.input_names.iter().map(|n| n.as_ptr()).collect();
        let output_name_ptrs: Vec<*const c_char> = self.output_names.iter().map(|n| n.as_ptr()).collect();

        let lib = self.env.lib;
        let start = Instant::now();
        let status = unsafe {
            (lib.api().Run)(
                self.session,
                ptr::null(),
                input_name_ptrs.as_ptr(),
                input_ptrs.as_ptr(),
                input_ptrs.len(),
                output_name_ptrs.as_ptr(),
                output_name_ptrs.len(),
                output_ptrs.as_mut_ptr(),
            )
        };
        lib.check(status).map_err(OrtError::Run)?;
        debug!(elapsed = ?start.elapsed(), "session run");
        Ok(())
    }

    fn read_slots(&self, kind: SlotKind) -> Result<Vec<SlotInfo>> {
        let lib = self.env.lib;
        let api = lib.api();

        let mut count: usize = 0;
        lib.check_runtime(unsafe {
            match kind {
                SlotKind::Input => (api.SessionGetInputCount)(self.session, &mut count),
                SlotKind::Output => (api.SessionGetOutputCount)(self.session, &mut count),
            }
        })?;

        let mut allocator: *mut ffi::OrtAllocator = ptr::null_mut();
        lib.check_runtime(unsafe { (api.GetAllocatorWithDefaultOptions)(&mut allocator) })?;

        (0..count)
            .map(|i| -> Result<SlotInfo> {
                let name = self.slot_name(kind, allocator, i)?;
                let (element_type, dims) = self.slot_type(kind, i)?;
                Ok(SlotInfo {
                    name,
                    element_type,
                    dims,
                })
            })
            .collect()
    }

    fn slot_name(&self, kind: SlotKind, allocator: *mut ffi::OrtAllocator, i: usize) -> Result<String> {
        let lib = self.env.lib;
        let api = lib.api();

        let mut raw: *mut c_char = ptr::null_mut();
        lib.check_runtime(unsafe {
            match kind {
                SlotKind::Input => (api.SessionGetInputName)(self.session, i, allocator, &mut raw),
                SlotKind::Output => (api.SessionGetOutputName)(self.session, i, allocator, &mut raw),
            }
        })?;
        let name = unsafe { c_str_lossy(raw) };
        lib.check_runtime(unsafe { (api.AllocatorFree)(allocator, raw as *mut c_void) })?;
        Ok(name)
    }

    fn slot_type(&self, kind: SlotKind, i: usize) -> Result<(ElementType, Vec<i64>)> {
        let lib = self.env.lib;
        let api = lib.api();

        let mut raw: *mut ffi::OrtTypeInfo = ptr::null_mut();
        lib.check_runtime(unsafe {
            match kind {
                SlotKind::Input => (api.SessionGetInputTypeInfo)(self.session, i, &mut raw),
                SlotKind::Output => (api.SessionGetOutputTypeInfo)(self.session, i, &mut raw),
            }
        })?;
        let type_info = TypeInfo { env: &self.env, ptr: raw };

        let mut onnx_type: c_int = 0;
        lib.check_runtime(unsafe { (api.GetOnnxTypeFromTypeInfo)(type_info.ptr, &mut onnx_type) })?;
        if onnx_type != ffi::ONNX_TYPE_TENSOR {
            // Sequences and maps cannot be bound to tensors.
            return Ok((ElementType::Undefined(0), Vec::new()));
        }

        // Borrowed from type_info; released with it.
        let mut tensor_info: *const ffi::OrtTensorTypeAndShapeInfo = ptr::null();
        lib.check_runtime(unsafe { (api.CastTypeInfoToTensorInfo)(type_info.ptr, &mut tensor_info) })?;

        let mut element_type: c_int = 0;
        lib.check_runtime(unsafe { (api.GetTensorElementType)(tensor_info, &mut element_type) })?;
        let mut rank: usize = 0;
        lib.check_runtime(unsafe { (api.GetDimensionsCount)(tensor_info, &mut rank) })?;
        let mut dims = vec![0i64; rank];
        if rank > 0 {
            lib.check_runtime(unsafe { (api.GetDimensions)(tensor_info, dims.as_mut_ptr(), rank) })?;
        }
        Ok((ElementType::from_native(element_type), dims))
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        if !self.session.is_null() {
            unsafe { (self.env.lib.api().ReleaseSession)(self.session) };
            self.session = ptr::null_mut();
        }
    }
}

struct TypeInfo<'a> {
    env: &'a EnvInner,
    ptr: *mut ffi::OrtTypeInfo,
}

impl Drop for TypeInfo<'_> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { (self.env.lib.api().ReleaseTypeInfo)(self.ptr) };
        }
    }
}

/// An `OrtValue` borrowing a tensor buffer for one run.
struct NativeValue<'a> {
    env: &'a EnvInner,
    ptr: *mut ffi::OrtValue,
}

impl<'a> NativeValue<'a> {
    fn wrap(
        env: &'a EnvInner,
        data: *mut c_void,
        byte_len: usize,
        shape: &Shape,
        element_type: ElementType,
    ) -> Result<Self> {
        let mut ptr: *mut ffi::OrtValue = ptr::null_mut();
        env.lib.check_runtime(unsafe {
            (env.lib.api().CreateTensorWithDataAsOrtValue)(
                env.memory_info,
                data,
                byte_len,
                shape.dims().as_ptr(),
                shape.rank(),
                element_type.to_native(),
                &mut ptr,
            )
        })?;
        Ok(Self { env, ptr })
    }
}

impl Drop for NativeValue<'_> {
    fn drop(&mut self) {
        if !self.ptr.is_null() {
            unsafe { (self.env.lib.api().ReleaseValue)(self.ptr) };
        }
    }
}

fn resolve_slots<S: AsRef<str>>(kind: SlotKind, graph: &[SlotInfo], names: &[S]) -> Result<Vec<SlotInfo>> {
    let mut bound: Vec<SlotInfo> = Vec::with_capacity(names.len());
    for name in names {
        let name = name.as_ref();
        if bound.iter().any(|s| s.name == name) {
            return Err(OrtError::DuplicateSlot {
                kind,
                name: name.to_string(),
            });
        }
        let slot = graph.iter().find(|s| s.name == name).ok_or_else(|| OrtError::UnknownSlot {
            kind,
            name: name.to_string(),
            available: graph.iter().map(|s| s.name.clone()).collect(),
        })?;
        bound.push(slot.clone());
    }
    Ok(bound)
}

fn c_names(slots: &[SlotInfo]) -> Result<Vec<CString>> {
    slots
        .iter()
        .map(|s| CString::new(s.name.as_str()).map_err(OrtError::from))
        .collect()
}

fn check_count(kind: SlotKind, expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(OrtError::SlotCount { kind, expected, actual });
    }
    Ok(())
}

fn check_slot(kind: SlotKind, slot: &SlotInfo, element_type: ElementType, shape: &Shape) -> Result<()> {
    if slot.element_type != element_type {
        return Err(OrtError::ElementTypeMismatch {
            kind,
            name: slot.name.clone(),
            expected: slot.element_type,
            actual: element_type,
        });
    }
    // Zero dims means the graph declares no shape; the engine checks it.
    if !slot.dims.is_empty() && !shape.conforms_to(&slot.dims) {
        return Err(OrtError::ShapeMismatch {
            kind,
            name: slot.name.clone(),
            expected: slot.dims.clone(),
            actual: shape.dims().to_vec(),
        });
    }
    Ok(())
}
