//! Raw FFI declarations for the ONNX Runtime C API.
//!
//! The C API is a table of function pointers (`OrtApi`) obtained from the
//! single exported symbol `OrtGetApiBase`. We hand-write the prefix of the
//! table we need, avoiding bindgen. Slots we never call are kept as
//! reserved padding so every offset matches `onnxruntime_c_api.h`.

#![allow(non_snake_case)]

use std::os::raw::{c_char, c_int, c_void};

pub const ORT_API_VERSION: u32 = 14;

// Opaque types — the ORT C API uses opaque pointers.
pub type OrtEnv = c_void;
pub type OrtSession = c_void;
pub type OrtSessionOptions = c_void;
pub type OrtRunOptions = c_void;
pub type OrtMemoryInfo = c_void;
pub type OrtValue = c_void;
pub type OrtStatus = c_void;
pub type OrtTypeInfo = c_void;
pub type OrtTensorTypeAndShapeInfo = c_void;
pub type OrtAllocator = c_void;

#[cfg(windows)]
pub type OrtChar = u16;
#[cfg(not(windows))]
pub type OrtChar = c_char;

// Enum values from onnxruntime_c_api.h.
pub const ORT_ARENA_ALLOCATOR: c_int = 1;
pub const ORT_MEM_TYPE_DEFAULT: c_int = 0;
pub const ONNX_TYPE_TENSOR: c_int = 1;

pub type OrtLoggingFunction = unsafe extern "system" fn(
    param: *mut c_void,
    severity: c_int,
    category: *const c_char,
    log_id: *const c_char,
    code_location: *const c_char,
    message: *const c_char,
);

type Reserved = *const c_void;

#[repr(C)]
pub struct OrtApiBase {
    pub GetApi: unsafe extern "system" fn(version: u32) -> *const OrtApi,
    pub GetVersionString: unsafe extern "system" fn() -> *const c_char,
}

#[repr(C)]
pub struct OrtApi {
    _CreateStatus: Reserved,
    pub GetErrorCode: unsafe extern "system" fn(status: *const OrtStatus) -> c_int,
    pub GetErrorMessage: unsafe extern "system" fn(status: *const OrtStatus) -> *const c_char,
    _CreateEnv: Reserved,
    pub CreateEnvWithCustomLogger: unsafe extern "system" fn(
        logging_function: OrtLoggingFunction,
        logger_param: *mut c_void,
        severity: c_int,
        log_id: *const c_char,
        out: *mut *mut OrtEnv,
    ) -> *mut OrtStatus,
    _EnableTelemetryEvents: Reserved,
    pub DisableTelemetryEvents: unsafe extern "system" fn(env: *const OrtEnv) -> *mut OrtStatus,
    pub CreateSession: unsafe extern "system" fn(
        env: *const OrtEnv,
        model_path: *const OrtChar,
        options: *const OrtSessionOptions,
        out: *mut *mut OrtSession,
    ) -> *mut OrtStatus,
    pub CreateSessionFromArray: unsafe extern "system" fn(
        env: *const OrtEnv,
        model_data: *const c_void,
        model_data_length: usize,
        options: *const OrtSessionOptions,
        out: *mut *mut OrtSession,
    ) -> *mut OrtStatus,
    pub Run: unsafe extern "system" fn(
        session: *mut OrtSession,
        run_options: *const OrtRunOptions,
        input_names: *const *const c_char,
        inputs: *const *const OrtValue,
        input_len: usize,
        output_names: *const *const c_char,
        output_names_len: usize,
        outputs: *mut *mut OrtValue,
    ) -> *mut OrtStatus,
    pub CreateSessionOptions: unsafe extern "system" fn(out: *mut *mut OrtSessionOptions) -> *mut OrtStatus,
    // SetOptimizedModelFilePath .. SetSessionLogSeverityLevel
    _reserved_11_22: [Reserved; 12],
    pub SetSessionGraphOptimizationLevel:
        unsafe extern "system" fn(options: *mut OrtSessionOptions, level: c_int) -> *mut OrtStatus,
    pub SetIntraOpNumThreads:
        unsafe extern "system" fn(options: *mut OrtSessionOptions, threads: c_int) -> *mut OrtStatus,
    pub SetInterOpNumThreads:
        unsafe extern "system" fn(options: *mut OrtSessionOptions, threads: c_int) -> *mut OrtStatus,
    // CreateCustomOpDomain .. RegisterCustomOpsLibrary
    _reserved_26_29: [Reserved; 4],
    pub SessionGetInputCount: unsafe extern "system" fn(session: *const OrtSession, out: *mut usize) -> *mut OrtStatus,
    pub SessionGetOutputCount: unsafe extern "system" fn(session: *const OrtSession, out: *mut usize) -> *mut OrtStatus,
    _SessionGetOverridableInitializerCount: Reserved,
    pub SessionGetInputTypeInfo: unsafe extern "system" fn(
        session: *const OrtSession,
        index: usize,
        out: *mut *mut OrtTypeInfo,
    ) -> *mut OrtStatus,
    pub SessionGetOutputTypeInfo: unsafe extern "system" fn(
        session: *const OrtSession,
        index: usize,
        out: *mut *mut OrtTypeInfo,
    ) -> *mut OrtStatus,
    _SessionGetOverridableInitializerTypeInfo: Reserved,
    pub SessionGetInputName: unsafe extern "system" fn(
        session: *const OrtSession,
        index: usize,
        allocator: *mut OrtAllocator,
        out: *mut *mut c_char,
    ) -> *mut OrtStatus,
    pub SessionGetOutputName: unsafe extern "system" fn(
        session: *const OrtSession,
        index: usize,
        allocator: *mut OrtAllocator,
        out: *mut *mut c_char,
    ) -> *mut OrtStatus,
    // SessionGetOverridableInitializerName .. CreateTensorAsOrtValue
    _reserved_38_48: [Reserved; 11],
    pub CreateTensorWithDataAsOrtValue: unsafe extern "system" fn(
        info: *const OrtMemoryInfo,
        data: *mut c_void,
        data_len: usize,
        shape: *const i64,
        shape_len: usize,
        element_type: c_int,
        out: *mut *mut OrtValue,
    ) -> *mut OrtStatus,
    // IsTensor .. GetStringTensorContent
    _reserved_50_54: [Reserved; 5],
    pub CastTypeInfoToTensorInfo: unsafe extern "system" fn(
        type_info: *const OrtTypeInfo,
        out: *mut *const OrtTensorTypeAndShapeInfo,
    ) -> *mut OrtStatus,
    pub GetOnnxTypeFromTypeInfo:
        unsafe extern "system" fn(type_info: *const OrtTypeInfo, out: *mut c_int) -> *mut OrtStatus,
    // CreateTensorTypeAndShapeInfo .. SetDimensions
    _reserved_57_59: [Reserved; 3],
    pub GetTensorElementType:
        unsafe extern "system" fn(info: *const OrtTensorTypeAndShapeInfo, out: *mut c_int) -> *mut OrtStatus,
    pub GetDimensionsCount:
        unsafe extern "system" fn(info: *const OrtTensorTypeAndShapeInfo, out: *mut usize) -> *mut OrtStatus,
    pub GetDimensions: unsafe extern "system" fn(
        info: *const OrtTensorTypeAndShapeInfo,
        dims: *mut i64,
        dims_len: usize,
    ) -> *mut OrtStatus,
    // GetSymbolicDimensions .. CreateMemoryInfo
    _reserved_63_68: [Reserved; 6],
    pub CreateCpuMemoryInfo:
        unsafe extern "system" fn(allocator_type: c_int, mem_type: c_int, out: *mut *mut OrtMemoryInfo) -> *mut OrtStatus,
    // CompareMemoryInfo .. AllocatorAlloc
    _reserved_70_75: [Reserved; 6],
    pub AllocatorFree: unsafe extern "system" fn(allocator: *mut OrtAllocator, ptr: *mut c_void) -> *mut OrtStatus,
    _AllocatorGetInfo: Reserved,
    pub GetAllocatorWithDefaultOptions: unsafe extern "system" fn(out: *mut *mut OrtAllocator) -> *mut OrtStatus,
    // AddFreeDimensionOverride .. KernelContext_GetOutput
    _reserved_79_91: [Reserved; 13],
    pub ReleaseEnv: unsafe extern "system" fn(env: *mut OrtEnv),
    pub ReleaseStatus: unsafe extern "system" fn(status: *mut OrtStatus),
    pub ReleaseMemoryInfo: unsafe extern "system" fn(info: *mut OrtMemoryInfo),
    pub ReleaseSession: unsafe extern "system" fn(session: *mut OrtSession),
    pub ReleaseValue: unsafe extern "system" fn(value: *mut OrtValue),
    _ReleaseRunOptions: Reserved,
    pub ReleaseTypeInfo: unsafe extern "system" fn(type_info: *mut OrtTypeInfo),
    _ReleaseTensorTypeAndShapeInfo: Reserved,
    pub ReleaseSessionOptions: unsafe extern "system" fn(options: *mut OrtSessionOptions),
}

pub type OrtGetApiBaseFn = unsafe extern "system" fn() -> *const OrtApiBase;

/// Symbol name exported by every ONNX Runtime shared library.
pub const GET_API_BASE_SYMBOL: &[u8] = b"OrtGetApiBase\0";
