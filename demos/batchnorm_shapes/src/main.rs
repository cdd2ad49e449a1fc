use argh::FromArgs;
use std::path::PathBuf;

use normkit::ops::{batch_normalization, BatchNormConfig, BatchNormParams, CpuEngine, OpTape};
use normkit::tensor::Tensor;
use std::sync::Arc;

/// Parsed as a single comma separated option rather than a repeated one.
type Shape = Vec<usize>;

#[derive(FromArgs)]
/// Normalize a tensor of any rank with its own per-channel statistics
struct Args {
    /// comma separated input shape, e.g. 2,3,4
    #[argh(option, short = 's', from_str_fn(parse_shape), default = "vec![2, 3, 4]")]
    shape: Shape,

    /// replaces the last axis of --shape (the channel axis)
    #[argh(option)]
    channels: Option<usize>,

    /// path to a JSON tensor ({"shape": [...], "data": [...]}) used instead of --shape
    #[argh(option, short = 'i')]
    input: Option<PathBuf>,

    /// path to a JSON config, e.g. {"varianceEpsilon": 0.001}
    #[argh(option, short = 'c')]
    config: Option<PathBuf>,

    /// overrides the variance epsilon of the config
    #[argh(option, short = 'e')]
    epsilon: Option<f64>,

    /// run the kernel on a single thread
    #[argh(switch)]
    serial: bool,

    /// print the normalized tensor as JSON
    #[argh(switch, short = 'p')]
    print: bool,
}

fn parse_shape(value: &str) -> Result<Vec<usize>, String> {
    if value.trim().is_empty() {
        return Ok(Vec::new());
    }
    value
        .split(',')
        .map(|d| d.trim().parse::<usize>().map_err(|e| format!("{d}: {e}")))
        .collect()
}

/// Per-channel mean and variance over every axis but the last.
fn channel_stats(x: &Tensor<f32>) -> Result<(Tensor<f32>, Tensor<f32>), Box<dyn std::error::Error>> {
    let channels = x.shape().last().copied().unwrap_or(1).max(1);
    let rows = x.numel() / channels;

    let mut mean = vec![0.0f32; channels];
    let mut variance = vec![0.0f32; channels];
    if rows > 0 {
        for row in x.as_slice().chunks_exact(channels) {
            for (m, v) in mean.iter_mut().zip(row) {
                *m += v / rows as f32;
            }
        }
        for row in x.as_slice().chunks_exact(channels) {
            for ((s, v), m) in variance.iter_mut().zip(row).zip(&mean) {
                *s += (v - m).powi(2) / rows as f32;
            }
        }
    }

    Ok((
        Tensor::from_shape_vec(&[channels], mean)?,
        Tensor::from_shape_vec(&[channels], variance)?,
    ))
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let args: Args = argh::from_env();

    // load the config and apply the command line override
    let mut config = match &args.config {
        Some(path) => serde_json::from_str::<BatchNormConfig>(&std::fs::read_to_string(path)?)?,
        None => BatchNormConfig::default(),
    };
    if let Some(epsilon) = args.epsilon {
        config.variance_epsilon = epsilon;
    }

    let mut shape = args.shape.clone();
    if let Some(channels) = args.channels {
        match shape.last_mut() {
            Some(last) => *last = channels,
            None => shape.push(channels),
        }
    }

    let x: Tensor<f32> = match &args.input {
        Some(path) => serde_json::from_str(&std::fs::read_to_string(path)?)?,
        None => Tensor::from_shape_fn(&shape, |index| {
            index
                .iter()
                .enumerate()
                .map(|(axis, i)| ((axis + 1) * i) as f32)
                .sum::<f32>()
        })?,
    };
    log::info!("input shape {:?}, config {:?}", x.shape(), config);

    let (mean, variance) = channel_stats(&x)?;

    let tape = Arc::new(OpTape::new());
    let engine = CpuEngine::new()
        .with_parallel(!args.serial)
        .with_tape(tape.clone());

    let params = BatchNormParams::new(&mean, &variance).with_config(&config);
    let y = batch_normalization(&engine, &x, &params)?;

    for entry in tape.entries() {
        log::info!("recorded {} with {:?}", entry.op, entry.inputs);
    }

    println!("input shape:  {:?}", x.shape());
    println!("output shape: {:?}", y.shape());

    if args.print {
        println!("{}", serde_json::to_string_pretty(&y)?);
    }

    Ok(())
}
