//! FLEX pager decoder
//!
//! Reads a mono WAV recording of FM-demodulated baseband audio and prints
//! one FLEX_NEXT line per decoded message.
//!
//! **Usage**:
//! ```bash
//! cargo run --bin flexdecode -- recording.wav
//! ```

use std::env;
use std::process;

use rustyflex::{tracing_init, Decoder};

/// Read a WAV file and return (samples, sample_rate)
fn read_wav(path: &str) -> Result<(Vec<f32>, u32), String> {
    let reader = hound::WavReader::open(path)
        .map_err(|e| format!("Failed to open WAV file '{}': {}", path, e))?;

    let spec = reader.spec();
    if spec.channels != 1 {
        return Err(format!("Expected mono audio, got {} channels", spec.channels));
    }
    let sample_rate = spec.sample_rate;

    let samples: Result<Vec<f32>, _> = match spec.sample_format {
        hound::SampleFormat::Int => match spec.bits_per_sample {
            16 => reader
                .into_samples::<i16>()
                .map(|s| s.map(|v| v as f32 / 32768.0))
                .collect(),
            _ => return Err(format!("Unsupported bit depth: {}", spec.bits_per_sample)),
        },
        hound::SampleFormat::Float => reader.into_samples::<f32>().collect(),
    };

    samples
        .map(|s| (s, sample_rate))
        .map_err(|e| format!("Failed to read samples: {}", e))
}

fn main() {
    let args: Vec<String> = env::args().collect();

    let mut input_path: Option<String> = None;
    let mut verbosity = 0u8;
    for arg in &args[1..] {
        match arg.as_str() {
            "-v" | "--verbose" => {
                verbosity += 1;
            }
            arg if !arg.starts_with('-') => {
                input_path = Some(arg.to_string());
            }
            _ => {
                eprintln!("Unknown option: {}", arg);
                process::exit(1);
            }
        }
    }

    let input_path = match input_path {
        Some(path) => path,
        None => {
            eprintln!("Usage: {} [OPTIONS] <input.wav>", args[0]);
            eprintln!();
            eprintln!("Decodes FLEX pager messages from a mono baseband WAV recording.");
            eprintln!();
            eprintln!("Options:");
            eprintln!("  -v, --verbose    Enable frame diagnostics (repeat for per-word traces)");
            eprintln!();
            eprintln!("RUST_LOG overrides the verbosity when set, e.g. RUST_LOG=rustyflex=debug.");
            process::exit(1);
        }
    };

    tracing_init::init_tracing(verbosity);

    let (samples, sample_rate) = match read_wav(&input_path) {
        Ok(result) => result,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    eprintln!("Read {} samples at {} Hz", samples.len(), sample_rate);

    let mut decoder = match Decoder::new(sample_rate) {
        Ok(decoder) => decoder,
        Err(e) => {
            eprintln!("Error: {}", e);
            process::exit(1);
        }
    };
    decoder.set_sink(|message| println!("{}", message));
    decoder.process_samples(&samples);
}
