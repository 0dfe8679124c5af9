//! ort-run - runs one ONNX model inference from the command line.
//!
//! Mirrors the usual binding walkthrough: load the shared library,
//! initialize the environment, build a session, allocate input and
//! output tensors, run once, then tear everything down in reverse order.

use std::path::PathBuf;
use std::time::Instant;

use anyhow::{Context, Result, bail};
use clap::Parser;
use giztoy_ort::{Environment, EnvironmentBuilder, EnvironmentConfig, LoggingLevel, Session, Shape, SlotInfo, Tensor};
use tracing_subscriber::EnvFilter;

/// Run a float32 ONNX model once and print its outputs.
#[derive(Parser)]
#[command(name = "ort-run")]
#[command(about = "Run an ONNX model through the ONNX Runtime C API")]
#[command(version)]
struct Cli {
    /// Environment config file (YAML or JSON)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Path to the onnxruntime shared library
    #[arg(long)]
    library: Option<PathBuf>,

    /// Model file
    #[arg(short, long)]
    model: PathBuf,

    /// Input slot name (repeatable)
    #[arg(long = "input", default_values_t = [String::from("input")])]
    inputs: Vec<String>,

    /// Output slot name (repeatable)
    #[arg(long = "output", default_values_t = [String::from("output")])]
    outputs: Vec<String>,

    /// Input shape, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [1, 1, 4])]
    input_shape: Vec<i64>,

    /// Input values, comma separated
    #[arg(long, value_delimiter = ',', allow_negative_numbers = true,
          default_values_t = [0.616_002_9, 0.104_542_08, 0.119_082_51, 0.344_626_72])]
    input_data: Vec<f32>,

    /// Output shape, comma separated
    #[arg(long, value_delimiter = ',', default_values_t = [1, 1, 2])]
    output_shape: Vec<i64>,

    /// Print the model's inputs and outputs instead of running it
    #[arg(long)]
    describe: bool,

    /// Verbose output
    #[arg(short = 'v', long)]
    verbose: bool,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let default_level = if cli.verbose { "debug" } else { "warn" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level)))
        .with_target(cli.verbose)
        .init();

    let env = environment_builder(&cli)?
        .initialize()
        .context("initialize onnxruntime environment")?;
    tracing::debug!(version = env.version(), library = %env.library_path().display(), "environment ready");

    let result = if cli.describe {
        describe(&env, &cli)
    } else {
        run(&env, &cli)
    };
    env.destroy().context("destroy environment")?;
    result
}

fn environment_builder(cli: &Cli) -> Result<EnvironmentBuilder> {
    let mut config = match &cli.config {
        Some(path) => {
            let text = std::fs::read_to_string(path).with_context(|| format!("read config {}", path.display()))?;
            serde_yaml::from_str::<EnvironmentConfig>(&text)
                .with_context(|| format!("parse config {}", path.display()))?
        }
        None => EnvironmentConfig::default(),
    };
    if let Some(library) = &cli.library {
        config.library_path = Some(library.clone());
    }
    if cli.verbose {
        config.log_level = LoggingLevel::Info;
    }
    Ok(EnvironmentBuilder::from_config(config))
}

fn describe(env: &Environment, cli: &Cli) -> Result<()> {
    // Bind nothing: only the graph metadata is needed.
    let none: &[&str] = &[];
    let session = Session::new(env, &cli.model, none, none)
        .with_context(|| format!("load model {}", cli.model.display()))?;
    print_slots("inputs", session.graph_inputs());
    print_slots("outputs", session.graph_outputs());
    Ok(())
}

fn print_slots(title: &str, slots: &[SlotInfo]) {
    println!("{title}:");
    for slot in slots {
        println!("  {} {:?} {:?}", slot.name, slot.element_type, slot.dims);
    }
}

fn run(env: &Environment, cli: &Cli) -> Result<()> {
    if cli.inputs.len() != 1 || cli.outputs.len() != 1 {
        bail!("ort-run feeds exactly one input and one output; use --describe to inspect the model");
    }

    let session = Session::new(env, &cli.model, cli.inputs.as_slice(), cli.outputs.as_slice())
        .with_context(|| format!("load model {}", cli.model.display()))?;

    let input_shape = Shape::new(cli.input_shape.clone()).context("input shape")?;
    let input = Tensor::from_slice(input_shape, cli.input_data.as_slice()).context("input tensor")?;
    let output_shape = Shape::new(cli.output_shape.clone()).context("output shape")?;
    let mut output = Tensor::<f32>::empty(output_shape);

    let start = Instant::now();
    session.run(&[&input], &mut [&mut output]).context("run session")?;
    let elapsed = start.elapsed();

    println!("{:?} {:?}", output.data(), elapsed);
    Ok(())
}
