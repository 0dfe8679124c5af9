//! Model registry: register ONNX model bytes by ID and load them later.

use std::collections::HashMap;
use std::sync::Mutex;

use once_cell::sync::Lazy;

use crate::environment::Environment;
use crate::error::{OrtError, Result};
use crate::session::Session;

struct ModelInfo {
    data: &'static [u8],
}

static REGISTRY: Lazy<Mutex<HashMap<String, ModelInfo>>> = Lazy::new(|| Mutex::new(HashMap::new()));

fn registry() -> std::sync::MutexGuard<'static, HashMap<String, ModelInfo>> {
    // Entries are plain data; a panic elsewhere cannot leave them half-written.
    REGISTRY.lock().unwrap_or_else(|e| e.into_inner())
}

/// Registers a model with the given ID and ONNX data.
/// Registering the same ID twice replaces the previous registration.
pub fn register_model(id: &str, data: &'static [u8]) {
    registry().insert(id.to_string(), ModelInfo { data });
}

/// Returns true if the model is registered.
pub fn is_registered(id: &str) -> bool {
    registry().contains_key(id)
}

/// Returns the IDs of all registered models, sorted.
pub fn list_models() -> Vec<String> {
    let mut ids: Vec<String> = registry().keys().cloned().collect();
    ids.sort();
    ids
}

/// Loads a registered model by ID and binds the named slots.
pub fn load_model<S: AsRef<str>>(
    env: &Environment,
    id: &str,
    input_names: &[S],
    output_names: &[S],
) -> Result<Session> {
    let data = registry()
        .get(id)
        .map(|info| info.data)
        .ok_or_else(|| OrtError::ModelNotRegistered(id.to_string()))?;
    Session::from_memory(env, data, input_names, output_names)
}
