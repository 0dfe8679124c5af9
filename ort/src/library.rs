//! Locating and loading the ONNX Runtime shared library.

use std::ffi::CStr;
use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use tracing::debug;

use crate::error::{ErrorCode, OrtError, Result, StatusError};
use crate::ffi;

/// Environment variable consulted when no library path is configured.
pub const LIBRARY_PATH_ENV: &str = "ONNXRUNTIME_SHARED_LIBRARY_PATH";

static LIBRARY: OnceCell<OrtLibrary> = OnceCell::new();

/// A loaded ONNX Runtime library and its API table.
///
/// The library is loaded at most once per process and never unloaded;
/// ONNX Runtime keeps thread-local state that does not survive `dlclose`.
pub(crate) struct OrtLibrary {
    path: PathBuf,
    version: String,
    api: *const ffi::OrtApi,
    _lib: libloading::Library,
}

// The API table is immutable after GetApi returns.
unsafe impl Send for OrtLibrary {}
unsafe impl Sync for OrtLibrary {}

impl OrtLibrary {
    /// Returns the loaded library, loading it from `path` on first use.
    pub(crate) fn get_or_load(path: &Path) -> Result<&'static OrtLibrary> {
        let lib = LIBRARY.get_or_try_init(|| Self::load(path))?;
        if lib.path != path {
            return Err(OrtError::LibraryMismatch {
                loaded: lib.path.clone(),
                requested: path.to_path_buf(),
            });
        }
        Ok(lib)
    }

    fn load(path: &Path) -> Result<OrtLibrary> {
        debug!(path = %path.display(), "loading onnxruntime shared library");
        let load_err = |source| OrtError::LibraryLoad {
            path: path.to_path_buf(),
            source,
        };

        let lib = unsafe { libloading::Library::new(path) }.map_err(load_err)?;
        let get_api_base: libloading::Symbol<ffi::OrtGetApiBaseFn> =
            unsafe { lib.get(ffi::GET_API_BASE_SYMBOL) }.map_err(load_err)?;

        let base = unsafe { get_api_base() };
        if base.is_null() {
            return Err(OrtError::ApiVersion(ffi::ORT_API_VERSION));
        }
        let api = unsafe { ((*base).GetApi)(ffi::ORT_API_VERSION) };
        if api.is_null() {
            return Err(OrtError::ApiVersion(ffi::ORT_API_VERSION));
        }
        let version = unsafe { c_str_lossy(((*base).GetVersionString)()) };
        debug!(%version, "onnxruntime API ready");

        Ok(OrtLibrary {
            path: path.to_path_buf(),
            version,
            api,
            _lib: lib,
        })
    }

    pub(crate) fn api(&self) -> &ffi::OrtApi {
        unsafe { &*self.api }
    }

    pub(crate) fn version(&self) -> &str {
        &self.version
    }

    pub(crate) fn path(&self) -> &Path {
        &self.path
    }

    /// Converts an OrtStatus into a Result, releasing the status.
    pub(crate) fn check(&self, status: *mut ffi::OrtStatus) -> std::result::Result<(), StatusError> {
        if status.is_null() {
            return Ok(());
        }
        let api = self.api();
        let err = unsafe {
            let code = ErrorCode::from((api.GetErrorCode)(status));
            let message = c_str_lossy((api.GetErrorMessage)(status));
            (api.ReleaseStatus)(status);
            StatusError::new(code, message)
        };
        Err(err)
    }

    /// Like [`check`](Self::check) but wraps failures as [`OrtError::Runtime`].
    pub(crate) fn check_runtime(&self, status: *mut ffi::OrtStatus) -> Result<()> {
        self.check(status).map_err(OrtError::Runtime)
    }
}

/// Resolves which shared library to load.
///
/// An explicit path wins, then [`LIBRARY_PATH_ENV`], then the platform
/// file name (`libonnxruntime.so`, `libonnxruntime.dylib`,
/// `onnxruntime.dll`) left to the system loader's search path.
pub fn resolve_library_path(explicit: Option<&Path>) -> PathBuf {
    if let Some(path) = explicit {
        return path.to_path_buf();
    }
    match std::env::var_os(LIBRARY_PATH_ENV) {
        Some(path) if !path.is_empty() => PathBuf::from(path),
        _ => PathBuf::from(libloading::library_filename("onnxruntime")),
    }
}

pub(crate) unsafe fn c_str_lossy(ptr: *const std::os::raw::c_char) -> String {
    if ptr.is_null() {
        return String::new();
    }
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}
