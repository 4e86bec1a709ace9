//! Parser configuration

use serde::{Deserialize, Serialize};

/// Knobs for the contract parser and the declaration driver
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParserConfig {
    /// Maximum expression/block nesting before parsing is refused
    pub max_nesting_depth: usize,
    /// Accept the deprecated `body` keyword as an alias for `do`
    pub accept_body_keyword: bool,
}

impl Default for ParserConfig {
    fn default() -> Self {
        Self {
            max_nesting_depth: 256,
            accept_body_keyword: true,
        }
    }
}
