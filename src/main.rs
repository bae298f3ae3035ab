//! # signer CLI
//!
//! Command-line interface for the signer pipeline.
//!
//! ## Usage
//! ```bash
//! signer run 0 1 1 2 3 5 8
//! signer run --input values.txt --slow-latency-ms 10 --output json
//! ```

mod cli;

use std::process::ExitCode;

fn main() -> ExitCode {
    signer_pipeline::init_tracing();

    match cli::run() {
        Ok(code) => code,
        Err(error) => {
            eprintln!("error: {error}");
            ExitCode::FAILURE
        }
    }
}
