//! # Signer Pipeline
//!
//! Signs a stream of values through concurrent stages and reduces the
//! results to one deterministic string.
//!
//! ## Core Guarantees
//! - **Deterministic output** - the final value depends only on the input set
//! - **One slow call at a time** - the slow digest never runs concurrently
//! - **Partial success** - a failing item is reported, its siblings carry on
//!
//! ## Architecture
//! - `core` - Items, digests, stages and the executor
//! - `events` - Progress reporting over channels
//! - `error` - Error types
//! - `cli` - Command-line interface (binary only)

pub mod core;
pub mod error;
pub mod events;

// Re-export commonly used types at the crate root
pub use error::{PipelineError, Result};

/// Initialize tracing for the library
///
/// This should be called by the application entry point.
pub fn init_tracing() {
    let subscriber = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .finish();
    // A subscriber installed earlier (e.g. by a test harness) wins.
    let _ = tracing::subscriber::set_global_default(subscriber);
}
