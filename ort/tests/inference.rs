//! End-to-end inference against a generated MatMul model.
//! Skips when the onnxruntime shared library cannot be loaded and
//! `ONNXRUNTIME_SHARED_LIBRARY_PATH` is unset.

mod common;

use giztoy_ort::{
    AnyTensor, ElementType, GraphOptimizationLevel, OrtError, Session, Shape, SlotKind, Tensor,
};

use common::{WEIGHTS_4X2, environment, matmul, matmul_model, matmul_model_unshaped, model_file, native_lock};

const INPUT: [f32; 4] = [0.616_002_9, 0.104_542_08, 0.119_082_51, 0.344_626_72];

fn assert_close(got: &[f32], want: &[f32]) {
    assert_eq!(got.len(), want.len());
    for (i, (g, w)) in got.iter().zip(want).enumerate() {
        assert!((g - w).abs() < 1e-5, "out[{i}] = {g}, want {w}");
    }
}

#[test]
fn run_example_network() {
    let _guard = native_lock();
    let Some(env) = environment() else { return };

    let model = model_file(&matmul_model(&WEIGHTS_4X2, 2));
    let session = Session::new(&env, model.path(), &["input"], &["output"]).unwrap();

    let input = Tensor::from_data(Shape::new([1, 1, 4]).unwrap(), INPUT.to_vec()).unwrap();
    let mut output = Tensor::<f32>::empty(Shape::new([1, 1, 2]).unwrap());
    session.run(&[&input], &mut [&mut output]).unwrap();

    assert_eq!(output.data().len(), 2);
    assert_close(output.data(), &matmul(&INPUT, &WEIGHTS_4X2, 2));
    // Inputs are never written.
    assert_eq!(input.data(), &INPUT);

    drop(session);
    env.destroy().unwrap();
}

#[test]
fn repeated_runs_reuse_output_buffer() {
    let _guard = native_lock();
    let Some(env) = environment() else { return };

    let session = Session::from_memory(&env, &matmul_model(&WEIGHTS_4X2, 2), &["input"], &["output"]).unwrap();
    let shape = Shape::new([1, 1, 4]).unwrap();
    let mut output = Tensor::<f32>::empty(Shape::new([1, 1, 2]).unwrap());
    let buffer = output.data().as_ptr();

    let first = Tensor::from_slice(shape.clone(), &INPUT).unwrap();
    session.run(&[&first], &mut [&mut output]).unwrap();
    let first_out = output.data().to_vec();
    assert_close(&first_out, &matmul(&INPUT, &WEIGHTS_4X2, 2));

    let second_data = [1.0f32, 2.0, 3.0, 4.0];
    let second = Tensor::from_slice(shape, &second_data).unwrap();
    session.run(&[&second], &mut [&mut output]).unwrap();

    assert_eq!(output.data().as_ptr(), buffer);
    assert_ne!(output.data(), first_out.as_slice());
    assert_close(output.data(), &matmul(&second_data, &WEIGHTS_4X2, 2));

    drop(session);
    env.destroy().unwrap();
}

#[test]
fn input_data_mutated_between_runs() {
    let _guard = native_lock();
    let Some(env) = environment() else { return };

    let session = Session::from_memory(&env, &matmul_model(&WEIGHTS_4X2, 2), &["input"], &["output"]).unwrap();
    let mut input = Tensor::<f32>::empty(Shape::new([1, 1, 4]).unwrap());
    let mut output = Tensor::<f32>::empty(Shape::new([1, 1, 2]).unwrap());

    session.run(&[&input], &mut [&mut output]).unwrap();
    assert_eq!(output.data(), &[0.0, 0.0]);

    input.data_mut()[0] = 1.0;
    session.run(&[&input], &mut [&mut output]).unwrap();
    assert_close(output.data(), &WEIGHTS_4X2[..2]);

    drop(session);
    env.destroy().unwrap();
}

#[test]
fn mismatched_output_shape_leaves_buffer_untouched() {
    let _guard = native_lock();
    let Some(env) = environment() else { return };

    // Model produces [1, 1, 3]; the caller declares [1, 1, 2].
    let weights: Vec<f32> = (0..12).map(|i| i as f32).collect();
    let session = Session::from_memory(&env, &matmul_model(&weights, 3), &["input"], &["output"]).unwrap();
    assert_eq!(session.outputs()[0].dims, vec![1, 1, 3]);

    let input = Tensor::from_slice(Shape::new([1, 1, 4]).unwrap(), &INPUT).unwrap();
    let sentinel = vec![-7.0f32, -7.0];
    let mut output = Tensor::from_data(Shape::new([1, 1, 2]).unwrap(), sentinel.clone()).unwrap();

    let err = session.run(&[&input], &mut [&mut output]).unwrap_err();
    match err {
        OrtError::ShapeMismatch { kind, name, expected, actual } => {
            assert_eq!(kind, SlotKind::Output);
            assert_eq!(name, "output");
            assert_eq!(expected, vec![1, 1, 3]);
            assert_eq!(actual, vec![1, 1, 2]);
        }
        other => panic!("unexpected error: {other}"),
    }
    assert_eq!(output.data(), sentinel.as_slice());

    drop(session);
    env.destroy().unwrap();
}

#[test]
fn output_without_declared_shape_runs() {
    let _guard = native_lock();
    let Some(env) = environment() else { return };

    let session =
        Session::from_memory(&env, &matmul_model_unshaped(&WEIGHTS_4X2, 2), &["input"], &["output"]).unwrap();
    let input = Tensor::from_slice(Shape::new([1, 1, 4]).unwrap(), &INPUT).unwrap();
    let mut output = Tensor::<f32>::empty(Shape::new([1, 1, 2]).unwrap());

    session.run(&[&input], &mut [&mut output]).unwrap();
    assert_close(output.data(), &matmul(&INPUT, &WEIGHTS_4X2, 2));

    drop(session);
    env.destroy().unwrap();
}

#[test]
fn run_rejects_wrong_counts_and_types() {
    let _guard = native_lock();
    let Some(env) = environment() else { return };

    let session = Session::from_memory(&env, &matmul_model(&WEIGHTS_4X2, 2), &["input"], &["output"]).unwrap();
    let input = Tensor::from_slice(Shape::new([1, 1, 4]).unwrap(), &INPUT).unwrap();
    let mut output = Tensor::<f32>::empty(Shape::new([1, 1, 2]).unwrap());

    let err = session.run::<f32, f32>(&[], &mut [&mut output]).unwrap_err();
    assert!(matches!(err, OrtError::SlotCount { kind: SlotKind::Input, expected: 1, actual: 0 }));

    let mut wide = Tensor::<f64>::empty(Shape::new([1, 1, 2]).unwrap());
    let err = session.run(&[&input], &mut [&mut wide]).unwrap_err();
    assert!(matches!(
        err,
        OrtError::ElementTypeMismatch {
            expected: ElementType::Float32,
            actual: ElementType::Float64,
            ..
        }
    ));

    drop(session);
    env.destroy().unwrap();
}

#[test]
fn run_dyn_accepts_type_erased_tensors() {
    let _guard = native_lock();
    let Some(env) = environment() else { return };

    let session = Session::builder(&env)
        .with_intra_threads(1)
        .with_inter_threads(1)
        .with_optimization_level(GraphOptimizationLevel::Basic)
        .commit_from_memory(&matmul_model(&WEIGHTS_4X2, 2), &["input"], &["output"])
        .unwrap();

    let input = Tensor::from_slice(Shape::new([1, 1, 4]).unwrap(), &INPUT).unwrap();
    let mut output = Tensor::<f32>::empty(Shape::new([1, 1, 2]).unwrap());
    {
        let inputs: [&dyn AnyTensor; 1] = [&input];
        let mut outputs: [&mut dyn AnyTensor; 1] = [&mut output];
        session.run_dyn(&inputs, &mut outputs).unwrap();
    }
    assert_close(output.data(), &matmul(&INPUT, &WEIGHTS_4X2, 2));

    drop(session);
    env.destroy().unwrap();
}

#[test]
fn session_reports_graph_slots() {
    let _guard = native_lock();
    let Some(env) = environment() else { return };

    let session = Session::from_memory(&env, &matmul_model(&WEIGHTS_4X2, 2), &["input"], &["output"]).unwrap();
    assert_eq!(session.graph_inputs().len(), 1);
    assert_eq!(session.inputs()[0].name, "input");
    assert_eq!(session.inputs()[0].element_type, ElementType::Float32);
    assert_eq!(session.inputs()[0].dims, vec![1, 1, 4]);
    assert_eq!(session.graph_outputs()[0].name, "output");

    drop(session);
    env.destroy().unwrap();
}
