//! Trait definitions for digest functions.

use crate::error::DigestError;
use serde::{Deserialize, Serialize};

/// A pure string-to-string digest
pub trait Digest: Send + Sync {
    /// Digest `content` into its textual signature
    fn digest(&self, content: &str) -> Result<String, DigestError>;

    /// Which algorithm this is
    fn kind(&self) -> DigestKind;
}

/// Available digest algorithms
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum DigestKind {
    /// XXH32, rendered in base 10 - the fast digest
    Xxh32,
    /// MD5, rendered as lowercase hex - the slow digest
    Md5,
    /// Anything supplied by the caller
    Custom,
}

impl std::fmt::Display for DigestKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DigestKind::Xxh32 => write!(f, "xxh32"),
            DigestKind::Md5 => write!(f, "md5"),
            DigestKind::Custom => write!(f, "custom"),
        }
    }
}

/// Closures are digests too, which keeps test stubs short
impl<F> Digest for F
where
    F: Fn(&str) -> Result<String, DigestError> + Send + Sync,
{
    fn digest(&self, content: &str) -> Result<String, DigestError> {
        self(content)
    }

    fn kind(&self) -> DigestKind {
        DigestKind::Custom
    }
}
