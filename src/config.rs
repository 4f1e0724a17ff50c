//! Configuration with environment variable support.
//!
//! Every run is driven by one [`OcrConfig`], built once at startup from the
//! command line and never mutated afterwards. The command line falls back
//! to the environment variables below.
//!
//! # Environment Variables
//!
//! | Variable | Description | Default |
//! |----------|-------------|---------|
//! | `OCR_MD_API` | OCR server base URL | `http://127.0.0.1:11434` |
//! | `OCR_MD_MODEL` | Model name | `deepseek-ocr` |
//! | `OCR_MD_TIMEOUT` | Per-request timeout in seconds | `300` |
//!
//! # Example
//!
//! ```bash
//! export OCR_MD_API="http://10.0.0.5:11434"
//! export OCR_MD_MODEL="deepseek-ocr"
//! ocr-md ./scans
//! ```

use std::env;

use crate::ocr::{OcrError, OcrResult, Protocol};

// ============================================================================
// Default Values
// ============================================================================

/// Default OCR server base URL
pub const DEFAULT_API_BASE: &str = "http://127.0.0.1:11434";

/// Default model name
pub const DEFAULT_MODEL: &str = "deepseek-ocr";

/// Instruction sent when no prompt override is given
pub const DEFAULT_PROMPT: &str = "Convert the document to markdown.";

/// Prefix that asks the model for grounded output
pub const GROUNDING_PREFIX: &str = "<|grounding|>";

/// Default per-request timeout (seconds)
pub const DEFAULT_TIMEOUT_SECS: u64 = 300;

/// File name of the combined document written for a directory input
pub const COMBINED_FILE_NAME: &str = "ocr.md";

// ============================================================================
// Environment Variable Names
// ============================================================================

/// Environment variable for the API base URL
pub const ENV_API_BASE: &str = "OCR_MD_API";

/// Environment variable for the model name
pub const ENV_MODEL: &str = "OCR_MD_MODEL";

/// Environment variable for the request timeout
pub const ENV_TIMEOUT: &str = "OCR_MD_TIMEOUT";

/// Settings for one conversion run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OcrConfig {
    /// Server base URL, without the endpoint path
    pub api_base: String,
    /// Model identifier
    pub model: String,
    /// Prompt override; `None` means [`DEFAULT_PROMPT`]
    pub prompt: Option<String>,
    /// Prepend [`GROUNDING_PREFIX`] to the prompt
    pub grounding: bool,
    /// Strip grounding markup from the model output
    pub clean: bool,
    /// Request/response shape
    pub protocol: Protocol,
    /// Ask the native endpoint for a chunked response
    pub stream: bool,
    /// Per-request timeout (seconds)
    pub timeout_secs: u64,
}

impl Default for OcrConfig {
    fn default() -> Self {
        Self::defaults()
    }
}

impl OcrConfig {
    /// Create configuration with all defaults (ignoring environment)
    pub fn defaults() -> Self {
        Self {
            api_base: DEFAULT_API_BASE.to_string(),
            model: DEFAULT_MODEL.to_string(),
            prompt: None,
            grounding: true,
            clean: true,
            protocol: Protocol::Native,
            stream: false,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        }
    }

    /// Create configuration from environment variables, falling back to defaults
    pub fn from_env() -> Self {
        Self::from_lookup(|name| env::var(name).ok())
    }

    /// Same as [`OcrConfig::from_env`], reading variables through `lookup`
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        Self {
            api_base: lookup(ENV_API_BASE).unwrap_or_else(|| DEFAULT_API_BASE.to_string()),
            model: lookup(ENV_MODEL).unwrap_or_else(|| DEFAULT_MODEL.to_string()),
            timeout_secs: lookup(ENV_TIMEOUT)
                .and_then(|s| s.parse().ok())
                .unwrap_or(DEFAULT_TIMEOUT_SECS),
            ..Self::defaults()
        }
    }

    pub fn new(api_base: impl Into<String>) -> Self {
        Self {
            api_base: api_base.into(),
            ..Self::defaults()
        }
    }

    pub fn model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    pub fn prompt(mut self, prompt: Option<String>) -> Self {
        self.prompt = prompt;
        self
    }

    pub fn grounding(mut self, grounding: bool) -> Self {
        self.grounding = grounding;
        self
    }

    pub fn clean(mut self, clean: bool) -> Self {
        self.clean = clean;
        self
    }

    pub fn protocol(mut self, protocol: Protocol) -> Self {
        self.protocol = protocol;
        self
    }

    pub fn stream(mut self, stream: bool) -> Self {
        self.stream = stream;
        self
    }

    pub fn timeout_secs(mut self, seconds: u64) -> Self {
        self.timeout_secs = seconds;
        self
    }

    /// Base URL with any trailing slash removed
    pub fn api_base_trimmed(&self) -> &str {
        self.api_base.trim_end_matches('/')
    }

    /// Reject settings no request could ever satisfy. Empty URL or model
    /// values are not checked here; they surface as per-image failures.
    pub fn validate(&self) -> OcrResult<()> {
        if self.timeout_secs == 0 {
            return Err(OcrError::InvalidConfig("timeout must be at least one second".to_string()));
        }
        Ok(())
    }
}
