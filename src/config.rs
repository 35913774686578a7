//! Pipeline tuning constants and vision endpoint configuration.
//!
//! The vision credential is process-wide: it is read from the environment
//! once, when the client is constructed. A missing key fails construction,
//! not individual requests.

use crate::error::ExtractionError;

/// Environment variable holding the vision API key.
pub const API_KEY_VAR: &str = "GEMINI_API_KEY";

/// Default acceptance threshold for detected tables.
///
/// Detector scores are *lower-is-better*; a table is accepted only when
/// `confidence_score < threshold` (strict). 1.0 matches the production
/// filtering rule.
pub const DEFAULT_CONFIDENCE_THRESHOLD: f64 = 1.0;

/// Rendering DPI for the vision fallback (scale 300/72 over PDF points).
pub const RENDER_DPI: u32 = 300;

/// Per-request timeout for vision calls. Bounds worst-case latency per
/// page; there is no retry.
pub const VISION_TIMEOUT_SECS: u64 = 60;

pub const DEFAULT_VISION_BASE_URL: &str = "https://generativelanguage.googleapis.com/v1";
pub const DEFAULT_VISION_MODEL: &str = "gemini-1.5-flash";

/// Tunables for one extraction run.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Strict upper bound on accepted detector scores (lower is better).
    pub confidence_threshold: f64,
    /// DPI used when rasterizing PDF pages for the vision fallback.
    pub render_dpi: u32,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            confidence_threshold: DEFAULT_CONFIDENCE_THRESHOLD,
            render_dpi: RENDER_DPI,
        }
    }
}

/// Connection settings for the remote vision endpoint.
#[derive(Debug, Clone)]
pub struct VisionConfig {
    pub base_url: String,
    pub model: String,
    pub api_key: String,
    pub timeout_secs: u64,
}

impl VisionConfig {
    /// Build a config with defaults for everything but the key.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            base_url: DEFAULT_VISION_BASE_URL.to_string(),
            model: DEFAULT_VISION_MODEL.to_string(),
            api_key: api_key.into(),
            timeout_secs: VISION_TIMEOUT_SECS,
        }
    }

    /// Read the credential from `GEMINI_API_KEY`.
    ///
    /// Absence (or an empty value) is a hard startup-time failure.
    pub fn from_env() -> Result<Self, ExtractionError> {
        Self::from_env_var(API_KEY_VAR)
    }

    fn from_env_var(var: &'static str) -> Result<Self, ExtractionError> {
        match std::env::var(var) {
            Ok(key) if !key.trim().is_empty() => Ok(Self::new(key)),
            _ => Err(ExtractionError::MissingCredential(var)),
        }
    }

    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}
