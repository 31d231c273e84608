//! CLI entry point for the runic assembler binary.

use std::env;
use std::fs;
use std::path::PathBuf;
use std::process::ExitCode;
use std::time::Instant;

use runic_asm::assemble;
use thiserror::Error;

const USAGE_TEXT: &str = "Usage: runic-asm <input> <output>";

/// One percent of the loadable space above the zeropage (0xff00 / 100).
const ROM_CAPACITY_PERCENT: f64 = 652.80;

#[derive(Debug, Error)]
enum CliError {
    #[error("expected exactly two arguments")]
    Usage,
    #[error("couldn't read '{path}': {detail}")]
    Read { path: String, detail: String },
    #[error("couldn't write '{path}': {detail}")]
    Write { path: String, detail: String },
}

fn parse_args(args: &[String]) -> Result<(PathBuf, PathBuf), CliError> {
    match args {
        [input, output] => Ok((PathBuf::from(input), PathBuf::from(output))),
        _ => Err(CliError::Usage),
    }
}

fn run(args: &[String]) -> Result<(), CliError> {
    let (input, output) = parse_args(args)?;

    let source = fs::read_to_string(&input).map_err(|e| CliError::Read {
        path: input.display().to_string(),
        detail: e.to_string(),
    })?;

    let started = Instant::now();
    let result = assemble(&source);

    for diagnostic in &result.diagnostics {
        eprintln!("{diagnostic}");
    }
    if result.has_errors() {
        // Diagnosed source problems inhibit output but are not a CLI failure.
        return Ok(());
    }

    fs::write(&output, &result.rom).map_err(|e| CliError::Write {
        path: output.display().to_string(),
        detail: e.to_string(),
    })?;

    let elapsed = started.elapsed().as_millis();
    let bytes = result.stats.rom_bytes;
    #[allow(clippy::cast_precision_loss)]
    let used = bytes as f64 / ROM_CAPACITY_PERCENT;
    let bang = if bytes >= 0xffff { "!" } else { "" };
    let plural = if result.stats.label_count == 1 { "" } else { "s" };

    println!("Assembled '{}' in {elapsed}ms", input.display());
    println!(
        "{bytes} bytes ({used:.2}%{bang}), {} label{plural}, 0 macros.",
        result.stats.label_count
    );
    Ok(())
}

fn main() -> ExitCode {
    let args: Vec<String> = env::args().skip(1).collect();
    match run(&args) {
        Ok(()) => ExitCode::SUCCESS,
        Err(CliError::Usage) => {
            eprintln!("{USAGE_TEXT}");
            ExitCode::FAILURE
        }
        Err(error) => {
            eprintln!("Error: {error}");
            ExitCode::FAILURE
        }
    }
}
