//! Debugger configuration types
//!
//! This module defines the fixed storage bounds used by the tokenizer, the
//! evaluator and the watchpoint pool. Every bound is fixed at construction;
//! nothing grows at runtime.

use crate::types::{Result, SdbError};
use serde::{Deserialize, Serialize};

/// Number of watchpoint slots in the default pool
pub const NR_WP: usize = 32;

/// Configuration for the debugger library
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SdbConfig {
    /// Number of watchpoint slots (free + active)
    #[serde(default = "default_max_watchpoints")]
    pub max_watchpoints: usize,

    /// Watchpoint expressions must be strictly shorter than this many bytes
    #[serde(default = "default_max_expr_len")]
    pub max_expr_len: usize,

    /// Maximum stored length of a single token's text
    #[serde(default = "default_max_token_len")]
    pub max_token_len: usize,

    /// Maximum number of tokens in one expression
    #[serde(default = "default_max_tokens")]
    pub max_tokens: usize,

    /// What to do with token text longer than `max_token_len`
    #[serde(default)]
    pub token_overflow: TokenOverflow,
}

fn default_max_watchpoints() -> usize {
    NR_WP
}

fn default_max_expr_len() -> usize {
    256
}

fn default_max_token_len() -> usize {
    31
}

fn default_max_tokens() -> usize {
    1024
}

/// Policy for token text that exceeds the storage bound
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TokenOverflow {
    /// Keep the leading bytes and carry on (lossy)
    #[default]
    Truncate,
    /// Fail the tokenization with `InputTooLong`
    Reject,
}

impl Default for SdbConfig {
    fn default() -> Self {
        Self {
            max_watchpoints: default_max_watchpoints(),
            max_expr_len: default_max_expr_len(),
            max_token_len: default_max_token_len(),
            max_tokens: default_max_tokens(),
            token_overflow: TokenOverflow::default(),
        }
    }
}

impl SdbConfig {
    /// Create a new configuration with default settings
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder method: set the watchpoint pool capacity
    pub fn with_max_watchpoints(mut self, count: usize) -> Self {
        self.max_watchpoints = count;
        self
    }

    /// Builder method: set the expression length bound
    pub fn with_max_expr_len(mut self, len: usize) -> Self {
        self.max_expr_len = len;
        self
    }

    /// Builder method: set the token text bound
    pub fn with_max_token_len(mut self, len: usize) -> Self {
        self.max_token_len = len;
        self
    }

    /// Builder method: set the token count bound
    pub fn with_max_tokens(mut self, count: usize) -> Self {
        self.max_tokens = count;
        self
    }

    /// Builder method: set the token overflow policy
    pub fn with_token_overflow(mut self, policy: TokenOverflow) -> Self {
        self.token_overflow = policy;
        self
    }

    /// Check that every bound is usable
    pub fn validate(&self) -> Result<()> {
        let bounds = [
            ("max_watchpoints", self.max_watchpoints),
            ("max_expr_len", self.max_expr_len),
            ("max_token_len", self.max_token_len),
            ("max_tokens", self.max_tokens),
        ];
        for (name, value) in bounds {
            if value == 0 {
                return Err(SdbError::InvalidConfig(format!("{} must be non-zero", name)));
            }
        }
        Ok(())
    }
}
