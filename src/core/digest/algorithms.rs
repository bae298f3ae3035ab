//! Built-in digest implementations.

use super::{Digest, DigestKind};
use crate::error::DigestError;
use std::sync::atomic::{AtomicUsize, Ordering};
use xxhash_rust::xxh32::xxh32;

/// XXH32 with seed 0, as an unsigned decimal string
#[derive(Debug, Default, Clone, Copy)]
pub struct Xxh32Digest;

impl Digest for Xxh32Digest {
    fn digest(&self, content: &str) -> Result<String, DigestError> {
        Ok(xxh32(content.as_bytes(), 0).to_string())
    }

    fn kind(&self) -> DigestKind {
        DigestKind::Xxh32
    }
}

/// MD5 as lowercase hex.
///
/// The service behind this digest tolerates a single caller. A call that
/// overlaps another one fails with `Overheated` instead of answering.
#[derive(Debug, Default)]
pub struct Md5Digest {
    active: AtomicUsize,
}

impl Md5Digest {
    pub fn new() -> Self {
        Self::default()
    }
}

impl Digest for Md5Digest {
    fn digest(&self, content: &str) -> Result<String, DigestError> {
        let concurrent = self.active.fetch_add(1, Ordering::SeqCst);
        let result = if concurrent > 0 {
            Err(DigestError::Overheated {
                kind: DigestKind::Md5.to_string(),
            })
        } else {
            Ok(format!("{:x}", md5::compute(content.as_bytes())))
        };
        self.active.fetch_sub(1, Ordering::SeqCst);
        result
    }

    fn kind(&self) -> DigestKind {
        DigestKind::Md5
    }
}
