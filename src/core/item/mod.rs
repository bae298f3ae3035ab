//! # Item Module
//!
//! Values submitted to a pipeline.
//!
//! Callers may hand in text, integers or raw bytes. Every item is
//! normalized to a `String` exactly once, before it enters the first
//! queue, so stages only ever see text.

use crate::error::ItemError;
use serde::{Deserialize, Serialize};

/// A value submitted to a pipeline
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Item {
    Text(String),
    Integer(i64),
    Bytes(Vec<u8>),
}

impl Item {
    /// Convert to the textual form stages operate on.
    ///
    /// Integers render in base 10. Bytes must be valid UTF-8.
    pub fn normalize(self) -> Result<String, ItemError> {
        match self {
            Item::Text(text) => Ok(text),
            Item::Integer(value) => Ok(value.to_string()),
            Item::Bytes(bytes) => String::from_utf8(bytes).map_err(|e| ItemError::NotText {
                reason: e.to_string(),
            }),
        }
    }

    /// Best-effort label for failure reports
    pub fn label(&self) -> String {
        match self {
            Item::Text(text) => text.clone(),
            Item::Integer(value) => value.to_string(),
            Item::Bytes(bytes) => String::from_utf8_lossy(bytes).into_owned(),
        }
    }

    /// Parse a line of user input.
    ///
    /// Canonical integers become `Integer`; anything else, including
    /// `"007"`, stays `Text` so normalization never changes the value.
    pub fn parse(raw: &str) -> Self {
        match raw.parse::<i64>() {
            Ok(value) if value.to_string() == raw => Item::Integer(value),
            _ => Item::Text(raw.to_string()),
        }
    }
}

impl From<&str> for Item {
    fn from(value: &str) -> Self {
        Item::Text(value.to_string())
    }
}

impl From<String> for Item {
    fn from(value: String) -> Self {
        Item::Text(value)
    }
}

impl From<Vec<u8>> for Item {
    fn from(value: Vec<u8>) -> Self {
        Item::Bytes(value)
    }
}

macro_rules! item_from_int {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for Item {
                fn from(value: $ty) -> Self {
                    Item::Integer(i64::from(value))
                }
            }
        )*
    };
}

item_from_int!(i8, i16, i32, i64, u8, u16, u32);
