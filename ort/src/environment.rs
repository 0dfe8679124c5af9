//! The process-wide ONNX Runtime environment.

use std::ffi::CString;
use std::path::{Path, PathBuf};
use std::ptr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::error::{OrtError, Result};
use crate::ffi;
use crate::library::{OrtLibrary, resolve_library_path};
use crate::logging::{LoggingLevel, native_logger};
use crate::session::SessionBuilder;

/// Set while a native environment exists. Cleared only when the native
/// environment is actually released.
static INITIALIZED: AtomicBool = AtomicBool::new(false);

/// Serializable environment settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EnvironmentConfig {
    /// Log identifier passed to the native library.
    pub name: String,
    /// Shared library to load. Falls back to
    /// `ONNXRUNTIME_SHARED_LIBRARY_PATH`, then the platform default.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub library_path: Option<PathBuf>,
    pub log_level: LoggingLevel,
    pub telemetry: bool,
}

impl Default for EnvironmentConfig {
    fn default() -> Self {
        Self {
            name: "giztoy-ort".into(),
            library_path: None,
            log_level: LoggingLevel::Warning,
            telemetry: false,
        }
    }
}

/// Builds an [`Environment`].
#[derive(Debug, Clone, Default)]
pub struct EnvironmentBuilder {
    config: EnvironmentConfig,
}

impl EnvironmentBuilder {
    pub fn from_config(config: EnvironmentConfig) -> Self {
        Self { config }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.config.name = name.into();
        self
    }

    pub fn with_library_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.library_path = Some(path.into());
        self
    }

    pub fn with_log_level(mut self, level: LoggingLevel) -> Self {
        self.config.log_level = level;
        self
    }

    pub fn with_telemetry(mut self, enabled: bool) -> Self {
        self.config.telemetry = enabled;
        self
    }

    pub fn config(&self) -> &EnvironmentConfig {
        &self.config
    }

    /// Loads the shared library and creates the native environment.
    ///
    /// Fails with [`OrtError::AlreadyInitialized`] while another
    /// environment (or a session outliving it) is alive.
    pub fn initialize(self) -> Result<Environment> {
        if INITIALIZED
            .compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .is_err()
        {
            return Err(OrtError::AlreadyInitialized);
        }
        match EnvInner::create(&self.config) {
            Ok(inner) => Ok(Environment { inner: Arc::new(inner) }),
            Err(e) => {
                INITIALIZED.store(false, Ordering::Release);
                Err(e)
            }
        }
    }
}

pub(crate) struct EnvInner {
    pub(crate) lib: &'static OrtLibrary,
    pub(crate) env: *mut ffi::OrtEnv,
    pub(crate) memory_info: *mut ffi::OrtMemoryInfo,
    name: String,
}

// The native environment is thread-safe; the pointers are never mutated.
unsafe impl Send for EnvInner {}
unsafe impl Sync for EnvInner {}

impl EnvInner {
    fn create(config: &EnvironmentConfig) -> Result<Self> {
        let path = resolve_library_path(config.library_path.as_deref());
        let lib = OrtLibrary::get_or_load(&path)?;
        let api = lib.api();
        let c_name = CString::new(config.name.as_str())?;

        let mut env: *mut ffi::OrtEnv = ptr::null_mut();
        lib.check_runtime(unsafe {
            (api.CreateEnvWithCustomLogger)(
                native_logger,
                ptr::null_mut(),
                config.log_level.to_native(),
                c_name.as_ptr(),
                &mut env,
            )
        })?;

        // Build the struct early so Drop cleans up on the error paths below.
        let mut inner = EnvInner {
            lib,
            env,
            memory_info: ptr::null_mut(),
            name: config.name.clone(),
        };

        if !config.telemetry {
            lib.check_runtime(unsafe { (api.DisableTelemetryEvents)(inner.env) })?;
        }
        lib.check_runtime(unsafe {
            (api.CreateCpuMemoryInfo)(ffi::ORT_ARENA_ALLOCATOR, ffi::ORT_MEM_TYPE_DEFAULT, &mut inner.memory_info)
        })?;

        debug!(name = %inner.name, version = lib.version(), "environment initialized");
        Ok(inner)
    }
}

impl Drop for EnvInner {
    fn drop(&mut self) {
        let api = self.lib.api();
        if !self.memory_info.is_null() {
            unsafe { (api.ReleaseMemoryInfo)(self.memory_info) };
            self.memory_info = ptr::null_mut();
        }
        if !self.env.is_null() {
            unsafe { (api.ReleaseEnv)(self.env) };
            self.env = ptr::null_mut();
        }
        INITIALIZED.store(false, Ordering::Release);
        debug!(name = %self.name, "environment released");
    }
}

/// ONNX Runtime environment. At most one exists per process.
///
/// Sessions keep the native environment alive, so it is released only
/// after the handle and every session created from it are gone. Call
/// [`destroy`](Self::destroy) to have that ordering checked.
pub struct Environment {
    inner: Arc<EnvInner>,
}

impl std::fmt::Debug for Environment {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("name", &self.inner.name)
            .field("library", &self.inner.lib.path())
            .field("live_sessions", &self.live_sessions())
            .finish()
    }
}

impl Environment {
    /// Creates a builder with default settings.
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::default()
    }

    /// Initializes an environment with default settings.
    pub fn initialize() -> Result<Self> {
        Self::builder().initialize()
    }

    /// Reports whether a native environment currently exists.
    pub fn is_initialized() -> bool {
        INITIALIZED.load(Ordering::Acquire)
    }

    pub fn name(&self) -> &str {
        &self.inner.name
    }

    /// Version string reported by the loaded library.
    pub fn version(&self) -> &str {
        self.inner.lib.version()
    }

    pub fn library_path(&self) -> &Path {
        self.inner.lib.path()
    }

    /// Number of sessions created from this environment that are alive.
    pub fn live_sessions(&self) -> usize {
        Arc::strong_count(&self.inner) - 1
    }

    /// Starts building a session with non-default options.
    pub fn session_builder(&self) -> SessionBuilder<'_> {
        SessionBuilder::new(self)
    }

    /// Tears the environment down.
    ///
    /// Returns [`OrtError::SessionsOutstanding`] if sessions are still
    /// alive. The handle is consumed either way; the native environment
    /// then lives on until the last of those sessions is dropped.
    pub fn destroy(self) -> Result<()> {
        let sessions = self.live_sessions();
        drop(self);
        if sessions > 0 {
            warn!(sessions, "environment destroyed before its sessions");
            return Err(OrtError::SessionsOutstanding { sessions });
        }
        Ok(())
    }

    pub(crate) fn inner(&self) -> &Arc<EnvInner> {
        &self.inner
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_defaults() {
        let config = EnvironmentConfig::default();
        assert_eq!(config.name, "giztoy-ort");
        assert_eq!(config.log_level, LoggingLevel::Warning);
        assert!(config.library_path.is_none());
        assert!(!config.telemetry);
    }

    #[test]
    fn config_from_partial_json() {
        let config: EnvironmentConfig =
            serde_json::from_str(r#"{"library_path": "/opt/ort/libonnxruntime.so", "log_level": "error"}"#).unwrap();
        assert_eq!(config.name, "giztoy-ort");
        assert_eq!(config.library_path, Some(PathBuf::from("/opt/ort/libonnxruntime.so")));
        assert_eq!(config.log_level, LoggingLevel::Error);
    }

    #[test]
    fn builder_overrides_config() {
        let builder = EnvironmentBuilder::from_config(EnvironmentConfig::default())
            .with_name("demo")
            .with_library_path("libonnxruntime_1.14.1_osx_arm64.dylib")
            .with_log_level(LoggingLevel::Verbose)
            .with_telemetry(true);
        let config = builder.config();
        assert_eq!(config.name, "demo");
        assert_eq!(
            config.library_path.as_deref(),
            Some(Path::new("libonnxruntime_1.14.1_osx_arm64.dylib"))
        );
        assert_eq!(config.log_level, LoggingLevel::Verbose);
        assert!(config.telemetry);
    }
}
