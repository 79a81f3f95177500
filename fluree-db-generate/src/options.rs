//! Generation run options
//!
//! `GenerateOptions` is loaded from a JSON document (all fields optional)
//! and may be overridden from the environment, the same way connection
//! settings are indirected through environment variables.

use crate::error::{GenerateError, Result};
use fluree_vocab::media_types;
use serde::Deserialize;

/// Environment variable enabling template debug mode
pub const ENV_DEBUG_TEMPLATE: &str = "FLUREE_GENERATE_DEBUG_TEMPLATE";

/// Environment variable overriding the indentation unit
pub const ENV_INDENT_UNIT: &str = "FLUREE_GENERATE_INDENT_UNIT";

/// Options for a generation run
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct GenerateOptions {
    /// When true, a failing `st:format` argument is replaced by an inline
    /// diagnostic instead of failing the call
    pub debug_template: bool,
    /// Number of spaces per indentation level in template output
    pub indent_unit: usize,
    /// Accept header used by iterators fetching JSON documents by IRI
    pub json_accept: String,
    /// Timeout for HTTP document fetches, in milliseconds
    pub http_timeout_ms: u64,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            debug_template: false,
            indent_unit: 2,
            json_accept: media_types::APPLICATION_JSON.to_string(),
            http_timeout_ms: 30_000,
        }
    }
}

impl GenerateOptions {
    /// Create options with defaults
    pub fn new() -> Self {
        Self::default()
    }

    /// Parse options from JSON; missing fields take their defaults
    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json)
            .map_err(|e| GenerateError::Configuration(format!("invalid generate options: {e}")))
    }

    /// Apply environment variable overrides
    pub fn with_env_overrides(mut self) -> Self {
        if let Some(debug) = env_value(ENV_DEBUG_TEMPLATE) {
            match debug.to_ascii_lowercase().as_str() {
                "1" | "true" | "yes" | "on" => self.debug_template = true,
                "0" | "false" | "no" | "off" => self.debug_template = false,
                other => tracing::warn!(
                    var = ENV_DEBUG_TEMPLATE,
                    value = other,
                    "ignoring unrecognized boolean"
                ),
            }
        }
        if let Some(unit) = env_value(ENV_INDENT_UNIT) {
            match unit.parse() {
                Ok(n) => self.indent_unit = n,
                Err(_) => tracing::warn!(
                    var = ENV_INDENT_UNIT,
                    value = %unit,
                    "ignoring non-numeric indent unit"
                ),
            }
        }
        self
    }

    /// Enable or disable template debug mode
    pub fn with_debug_template(mut self, debug: bool) -> Self {
        self.debug_template = debug;
        self
    }

    /// Set the indentation unit
    pub fn with_indent_unit(mut self, unit: usize) -> Self {
        self.indent_unit = unit;
        self
    }
}

fn env_value(var: &str) -> Option<String> {
    std::env::var(var).ok().filter(|v| !v.is_empty())
}
