//! # Digest Module
//!
//! The two external signing functions the stages call.
//!
//! ## Digests
//! - **Fast** - XXH32, safe to call from any number of threads
//! - **Slow** - MD5, served by a backend that tolerates one caller at a time
//!
//! Both are wrapped in a `DigestService` that adds the backend's latency,
//! so runs can model a slow remote signer without a network.
//!
//! ## Example
//! ```rust,ignore
//! use signer_pipeline::core::digest::DigestConfig;
//! use std::time::Duration;
//!
//! let signers = DigestConfig::new()
//!     .fast_latency(Duration::from_millis(100))
//!     .slow_latency(Duration::from_millis(10))
//!     .build();
//! ```

mod algorithms;
mod traits;

pub use algorithms::{Md5Digest, Xxh32Digest};
pub use traits::{Digest, DigestKind};

use crate::core::sync::CancellationToken;
use crate::error::ItemError;
use std::sync::Arc;
use std::time::Duration;

/// A digest plus the latency of the service that computes it
#[derive(Clone)]
pub struct DigestService {
    digest: Arc<dyn Digest>,
    latency: Duration,
}

impl DigestService {
    pub fn new(digest: Arc<dyn Digest>, latency: Duration) -> Self {
        Self { digest, latency }
    }

    /// Wait out the latency, then digest `content`.
    pub fn compute(&self, content: &str, cancel: &CancellationToken) -> Result<String, ItemError> {
        cancel.sleep(self.latency)?;
        Ok(self.digest.digest(content)?)
    }

    pub fn kind(&self) -> DigestKind {
        self.digest.kind()
    }

    pub fn latency(&self) -> Duration {
        self.latency
    }
}

impl std::fmt::Debug for DigestService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestService")
            .field("kind", &self.kind())
            .field("latency", &self.latency)
            .finish()
    }
}

/// The pair of digests a run signs with
#[derive(Debug, Clone)]
pub struct Signers {
    pub fast: DigestService,
    pub slow: DigestService,
}

/// Configuration builder for `Signers`
#[derive(Clone)]
pub struct DigestConfig {
    fast: Arc<dyn Digest>,
    slow: Arc<dyn Digest>,
    fast_latency: Duration,
    slow_latency: Duration,
}

impl DigestConfig {
    /// Built-in digests, no added latency
    pub fn new() -> Self {
        Self {
            fast: Arc::new(Xxh32Digest),
            slow: Arc::new(Md5Digest::new()),
            fast_latency: Duration::ZERO,
            slow_latency: Duration::ZERO,
        }
    }

    /// Replace the fast digest
    pub fn fast(mut self, digest: Arc<dyn Digest>) -> Self {
        self.fast = digest;
        self
    }

    /// Replace the slow digest
    pub fn slow(mut self, digest: Arc<dyn Digest>) -> Self {
        self.slow = digest;
        self
    }

    /// Latency added to every fast digest call
    pub fn fast_latency(mut self, latency: Duration) -> Self {
        self.fast_latency = latency;
        self
    }

    /// Latency added to every slow digest call.
    ///
    /// This is spent while holding the slow-digest lock.
    pub fn slow_latency(mut self, latency: Duration) -> Self {
        self.slow_latency = latency;
        self
    }

    pub fn build(self) -> Signers {
        Signers {
            fast: DigestService::new(self.fast, self.fast_latency),
            slow: DigestService::new(self.slow, self.slow_latency),
        }
    }
}

impl Default for DigestConfig {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DigestConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DigestConfig")
            .field("fast", &self.fast.kind())
            .field("slow", &self.slow.kind())
            .field("fast_latency", &self.fast_latency)
            .field("slow_latency", &self.slow_latency)
            .finish()
    }
}
