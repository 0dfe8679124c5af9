//! Forwards ONNX Runtime's internal log messages to `tracing`.

use std::os::raw::{c_char, c_int, c_void};

use serde::{Deserialize, Serialize};
use tracing::{debug, error, info, trace, warn};

use crate::library::c_str_lossy;

/// Minimum severity the native library reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LoggingLevel {
    Verbose,
    Info,
    #[default]
    Warning,
    Error,
    Fatal,
}

impl LoggingLevel {
    pub(crate) fn to_native(self) -> c_int {
        match self {
            LoggingLevel::Verbose => 0,
            LoggingLevel::Info => 1,
            LoggingLevel::Warning => 2,
            LoggingLevel::Error => 3,
            LoggingLevel::Fatal => 4,
        }
    }
}

/// Splits ORT's `file:line function` code location.
fn split_location(location: &str) -> (&str, &str, &str) {
    let mut parts = location.splitn(2, ' ');
    let file_and_line = parts.next().unwrap_or_default();
    let function = parts.next().unwrap_or("<unknown>");
    match file_and_line.rsplit_once(':') {
        Some((file, line)) => (file, line, function),
        None => (file_and_line, "<unknown>", function),
    }
}

/// Logging callback registered with `CreateEnvWithCustomLogger`.
///
/// ORT severities shift down one `tracing` level: its INFO is chatty.
pub(crate) unsafe extern "system" fn native_logger(
    _param: *mut c_void,
    severity: c_int,
    category: *const c_char,
    log_id: *const c_char,
    code_location: *const c_char,
    message: *const c_char,
) {
    let (category, log_id, location, message) = unsafe {
        (
            c_str_lossy(category),
            c_str_lossy(log_id),
            c_str_lossy(code_location),
            c_str_lossy(message),
        )
    };
    let (file, line, function) = split_location(&location);

    match severity {
        0 => trace!(target: "ort", %category, %log_id, file, line, function, "{message}"),
        1 => debug!(target: "ort", %category, %log_id, file, line, function, "{message}"),
        2 => info!(target: "ort", %category, %log_id, file, line, function, "{message}"),
        3 => warn!(target: "ort", %category, %log_id, file, line, function, "{message}"),
        _ => error!(target: "ort", %category, %log_id, file, line, function, "{message}"),
    }
}
