//! Permit pool restricting how many callers may use a resource at once.

use super::CancellationToken;
use crate::error::{ItemError, PipelineError};
use crossbeam_channel::{bounded, select, Receiver, Sender};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, OnceLock};

/// A counting lock whose permits live in a bounded channel.
///
/// Acquiring takes a token out of the channel, dropping the `Permit`
/// puts it back. With one permit this is a mutex whose acquisition can
/// be abandoned on cancellation.
#[derive(Debug)]
pub struct ConcurrencyLimiter {
    release: Sender<()>,
    tokens: Receiver<()>,
    permits: usize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
}

/// Holding one of the limiter's permits
#[derive(Debug)]
pub struct Permit<'a> {
    limiter: &'a ConcurrencyLimiter,
}

impl ConcurrencyLimiter {
    /// Create a limiter with `permits` concurrent holders.
    pub fn try_new(permits: usize) -> Result<Self, PipelineError> {
        if permits == 0 {
            return Err(PipelineError::Config(
                "a concurrency limiter needs at least one permit".to_string(),
            ));
        }
        Ok(Self::with_permits(permits))
    }

    /// A single-permit limiter: plain mutual exclusion
    pub fn exclusive() -> Self {
        Self::with_permits(1)
    }

    pub(crate) fn with_permits(permits: usize) -> Self {
        let (release, tokens) = bounded(permits);
        for _ in 0..permits {
            // Capacity equals the permit count, so this never blocks.
            let _ = release.send(());
        }

        Self {
            release,
            tokens,
            permits,
            in_flight: AtomicUsize::new(0),
            peak: AtomicUsize::new(0),
        }
    }

    /// The process-wide slow-digest lock.
    ///
    /// Created on first use and never torn down, so every pipeline that
    /// does not inject its own limiter shares the same single permit.
    pub fn global() -> Arc<Self> {
        static GLOBAL: OnceLock<Arc<ConcurrencyLimiter>> = OnceLock::new();
        GLOBAL
            .get_or_init(|| Arc::new(ConcurrencyLimiter::exclusive()))
            .clone()
    }

    /// Block until a permit is free or the run is cancelled.
    pub fn acquire(&self, cancel: &CancellationToken) -> Result<Permit<'_>, ItemError> {
        if cancel.is_cancelled() {
            return Err(ItemError::Cancelled);
        }

        select! {
            recv(self.tokens) -> token => token.map_err(|_| ItemError::Cancelled)?,
            recv(cancel.signal()) -> _ => return Err(ItemError::Cancelled),
        }

        let holders = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(holders, Ordering::SeqCst);
        Ok(Permit { limiter: self })
    }

    pub fn permits(&self) -> usize {
        self.permits
    }

    /// Permits currently held
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Highest number of simultaneous holders observed
    pub fn peak(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }
}

impl Drop for Permit<'_> {
    fn drop(&mut self) {
        self.limiter.in_flight.fetch_sub(1, Ordering::SeqCst);
        let _ = self.limiter.release.send(());
    }
}
