//! Shared helpers for tests that need the native library.
//!
//! Models are built in-process as hand-encoded ONNX protobufs so the
//! tests carry no binary fixtures.

#![allow(dead_code)]

use std::io::Write;
use std::sync::{Mutex, MutexGuard};

use giztoy_ort::{Environment, LIBRARY_PATH_ENV, OrtError};

/// ONNX Runtime allows one environment per process and tests run in
/// parallel, so every native test holds this lock.
static NATIVE: Mutex<()> = Mutex::new(());

pub fn native_lock() -> MutexGuard<'static, ()> {
    NATIVE.lock().unwrap_or_else(|e| e.into_inner())
}

/// Initializes an environment, or returns None when the shared library
/// is not installed. A library named by `ONNXRUNTIME_SHARED_LIBRARY_PATH`
/// must load: the test fails rather than skips.
pub fn environment() -> Option<Environment> {
    match Environment::builder().with_name("test").initialize() {
        Ok(env) => Some(env),
        Err(OrtError::LibraryLoad { path, source }) if std::env::var_os(LIBRARY_PATH_ENV).is_none() => {
            eprintln!("skipping: onnxruntime not available at {path:?}: {source}");
            None
        }
        Err(e) => panic!("environment initialize: {e}"),
    }
}

/// Weights of the 4x2 MatMul model.
pub const WEIGHTS_4X2: [f32; 8] = [
    1.0, -1.0, //
    0.5, 2.0, //
    -2.0, 0.25, //
    3.0, 1.0, //
];

/// Expected MatMul output for a `[1, 1, 4]` input against `weights`
/// laid out as `[4, cols]`.
pub fn matmul(input: &[f32], weights: &[f32], cols: usize) -> Vec<f32> {
    (0..cols)
        .map(|j| input.iter().enumerate().map(|(i, x)| x * weights[i * cols + j]).sum())
        .collect()
}

/// ONNX model: `output[1,1,cols] = MatMul(input[1,1,4], weights[4,cols])`.
pub fn matmul_model(weights: &[f32], cols: i64) -> Vec<u8> {
    build_matmul(weights, cols, Some(&[1, 1, cols][..]))
}

/// Same network, but the graph output carries a type and no shape.
pub fn matmul_model_unshaped(weights: &[f32], cols: i64) -> Vec<u8> {
    build_matmul(weights, cols, None)
}

fn build_matmul(weights: &[f32], cols: i64, output_dims: Option<&[i64]>) -> Vec<u8> {
    assert_eq!(weights.len() as i64, 4 * cols);

    let raw: Vec<u8> = weights.iter().flat_map(|w| w.to_le_bytes()).collect();
    let mut initializer = Vec::new();
    put_int(&mut initializer, 1, 4);
    put_int(&mut initializer, 1, cols as u64);
    put_int(&mut initializer, 2, FLOAT);
    put_bytes(&mut initializer, 8, b"weights");
    put_bytes(&mut initializer, 9, &raw);

    let mut node = Vec::new();
    put_bytes(&mut node, 1, b"input");
    put_bytes(&mut node, 1, b"weights");
    put_bytes(&mut node, 2, b"output");
    put_bytes(&mut node, 3, b"matmul");
    put_bytes(&mut node, 4, b"MatMul");

    let mut graph = Vec::new();
    put_bytes(&mut graph, 1, &node);
    put_bytes(&mut graph, 2, b"example_network");
    put_bytes(&mut graph, 5, &initializer);
    put_bytes(&mut graph, 11, &value_info("input", Some(&[1, 1, 4][..])));
    put_bytes(&mut graph, 12, &value_info("output", output_dims));

    let mut opset = Vec::new();
    put_bytes(&mut opset, 1, b"");
    put_int(&mut opset, 2, 13);

    let mut model = Vec::new();
    put_int(&mut model, 1, 7);
    put_bytes(&mut model, 2, b"giztoy-ort-tests");
    put_bytes(&mut model, 7, &graph);
    put_bytes(&mut model, 8, &opset);
    model
}

/// Writes a model to a temporary `.onnx` file.
pub fn model_file(bytes: &[u8]) -> tempfile::NamedTempFile {
    let mut file = tempfile::Builder::new()
        .suffix(".onnx")
        .tempfile()
        .expect("create temp model");
    file.write_all(bytes).expect("write temp model");
    file.flush().expect("flush temp model");
    file
}

const FLOAT: u64 = 1;

fn value_info(name: &str, dims: Option<&[i64]>) -> Vec<u8> {
    let mut tensor_type = Vec::new();
    put_int(&mut tensor_type, 1, FLOAT);
    if let Some(dims) = dims {
        let mut shape = Vec::new();
        for &d in dims {
            let mut dim = Vec::new();
            put_int(&mut dim, 1, d as u64);
            put_bytes(&mut shape, 1, &dim);
        }
        put_bytes(&mut tensor_type, 2, &shape);
    }
    let mut type_proto = Vec::new();
    put_bytes(&mut type_proto, 1, &tensor_type);

    let mut info = Vec::new();
    put_bytes(&mut info, 1, name.as_bytes());
    put_bytes(&mut info, 2, &type_proto);
    info
}

fn put_varint(buf: &mut Vec<u8>, mut v: u64) {
    while v >= 0x80 {
        buf.push((v as u8) | 0x80);
        v >>= 7;
    }
    buf.push(v as u8);
}

fn put_int(buf: &mut Vec<u8>, field: u64, v: u64) {
    put_varint(buf, field << 3);
    put_varint(buf, v);
}

fn put_bytes(buf: &mut Vec<u8>, field: u64, data: &[u8]) {
    put_varint(buf, (field << 3) | 2);
    put_varint(buf, data.len() as u64);
    buf.extend_from_slice(data);
}
