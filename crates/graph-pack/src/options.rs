//! Reader and writer configuration.
//!
//! Both option sets deserialize with every field optional, so host
//! applications can embed them in their own configuration files.

use serde::{Deserialize, Serialize};

use crate::constants::DEFAULT_MAX_DEPTH;

/// What the reader does with a class id the registry does not know.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnknownClassPolicy {
    /// Fail the decode with `GraphError::UnknownClass`.
    #[default]
    Reject,
    /// Substitute a [`DynamicObject`](crate::DynamicObject) that keeps every field.
    Dynamic,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ReaderOptions {
    pub unknown_classes: UnknownClassPolicy,
    /// Maximum inline object nesting.
    pub max_depth: usize,
}

impl Default for ReaderOptions {
    fn default() -> Self {
        Self {
            unknown_classes: UnknownClassPolicy::Reject,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WriterOptions {
    /// Maximum inline object nesting.
    pub max_depth: usize,
}

impl Default for WriterOptions {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}
