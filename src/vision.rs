//! Vision endpoint client for the OCR fallback.
//!
//! A page image is base64-encoded and posted to a generative vision model
//! with a fixed instruction demanding raw CSV. The response text arrives
//! at `candidates[0].content.parts[0].text`, possibly wrapped in Markdown
//! code fences, and is cleaned and parsed into rows here.
//!
//! Calls are synchronous and blocking with a fixed timeout; there is no
//! retry. Authentication is an API key passed as a query parameter.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::collections::VecDeque;

use base64::Engine as _;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::config::VisionConfig;
use crate::document::ImageMime;
use crate::error::ExtractionError;

/// Fixed extraction instruction sent with every page image.
pub const CSV_EXTRACTION_PROMPT: &str = "\
Convert the table in this image to CSV format. Use comma delimiters, \
include visible headers when present, and use empty strings for empty cells. \
Only output the raw CSV data without any markdown formatting or additional text.";

/// Remote vision capability: image in, extracted text out.
pub trait VisionClient {
    fn extract_table_text(
        &self,
        image_bytes: &[u8],
        mime: ImageMime,
    ) -> Result<String, ExtractionError>;
}

// ── Wire types ────────────────────────────────────────────

#[derive(Serialize)]
struct GenerateContentRequest<'a> {
    contents: Vec<Content<'a>>,
}

#[derive(Serialize)]
struct Content<'a> {
    parts: Vec<Part<'a>>,
}

#[derive(Serialize)]
#[serde(untagged)]
enum Part<'a> {
    Text { text: &'a str },
    InlineData { inline_data: InlineData<'a> },
}

#[derive(Serialize)]
struct InlineData<'a> {
    mime_type: &'a str,
    data: String,
}

#[derive(Deserialize)]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
}

#[derive(Deserialize)]
struct Candidate {
    content: CandidateContent,
}

#[derive(Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Deserialize)]
struct CandidatePart {
    text: String,
}

fn build_request<'a>(prompt: &'a str, mime: &'a str, data: String) -> GenerateContentRequest<'a> {
    GenerateContentRequest {
        contents: vec![Content {
            parts: vec![
                Part::Text { text: prompt },
                Part::InlineData {
                    inline_data: InlineData {
                        mime_type: mime,
                        data,
                    },
                },
            ],
        }],
    }
}

// ── GeminiClient ──────────────────────────────────────────

/// HTTP client for a Gemini-style `generateContent` endpoint.
pub struct GeminiClient {
    config: VisionConfig,
    client: reqwest::blocking::Client,
}

impl GeminiClient {
    pub fn new(config: VisionConfig) -> Self {
        let client = reqwest::blocking::Client::builder()
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self { config, client }
    }

    /// Construct from `GEMINI_API_KEY`; fails fast if the key is absent.
    pub fn from_env() -> Result<Self, ExtractionError> {
        Ok(Self::new(VisionConfig::from_env()?))
    }
}

impl VisionClient for GeminiClient {
    fn extract_table_text(
        &self,
        image_bytes: &[u8],
        mime: ImageMime,
    ) -> Result<String, ExtractionError> {
        let url = format!(
            "{}/models/{}:generateContent",
            self.config.base_url.trim_end_matches('/'),
            self.config.model
        );

        let encoded = base64::engine::general_purpose::STANDARD.encode(image_bytes);
        let body = build_request(CSV_EXTRACTION_PROMPT, mime.as_str(), encoded);

        debug!(
            url = %url,
            mime = mime.as_str(),
            image_size = image_bytes.len(),
            "Sending vision extraction request"
        );

        let response = self
            .client
            .post(&url)
            .query(&[("key", self.config.api_key.as_str())])
            .json(&body)
            .send()
            .map_err(|e| {
                if e.is_timeout() {
                    ExtractionError::Transport(format!(
                        "Request timed out after {}s",
                        self.config.timeout_secs
                    ))
                } else if e.is_connect() {
                    ExtractionError::Transport(format!(
                        "Cannot connect to {}",
                        self.config.base_url
                    ))
                } else {
                    ExtractionError::Transport(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().unwrap_or_default();
            return Err(ExtractionError::RemoteService {
                status: status.as_u16(),
                body,
            });
        }

        let text = response
            .text()
            .map_err(|e| ExtractionError::Transport(e.to_string()))?;
        let parsed: GenerateContentResponse = serde_json::from_str(&text)
            .map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;

        parsed
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content.parts.into_iter().next())
            .map(|p| p.text)
            .ok_or_else(|| {
                ExtractionError::ResponseParsing("no candidates in response".into())
            })
    }
}

// ── Response cleaning and parsing ─────────────────────────

/// Strip Markdown code-fence wrapping from a model response.
///
/// Removes the literal substrings ```` ```csv ```` and ```` ``` ```` and
/// trims surrounding whitespace.
pub fn strip_code_fences(raw: &str) -> String {
    raw.replace("```csv", "").replace("```", "").trim().to_string()
}

/// Parse cleaned response text as CSV rows.
///
/// Rows may be ragged (the combiner pads them later); empty cells stay
/// empty strings.
pub fn parse_csv_rows(text: &str) -> Result<Vec<Vec<String>>, ExtractionError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .flexible(true)
        .from_reader(text.as_bytes());

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record.map_err(|e| ExtractionError::ResponseParsing(e.to_string()))?;
        rows.push(record.iter().map(str::to_string).collect());
    }
    Ok(rows)
}

// ── Mock for testing ──────────────────────────────────────

/// Mock vision client with either a fixed response or a per-call queue.
///
/// Records how many times it was invoked, for asserting "exactly once per
/// page" behavior.
pub struct MockVisionClient {
    fixed: Option<String>,
    queue: Mutex<VecDeque<Result<String, ExtractionError>>>,
    calls: AtomicUsize,
}

impl MockVisionClient {
    /// Same response text for every call.
    pub fn always(text: &str) -> Self {
        Self {
            fixed: Some(text.to_string()),
            queue: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// One result per call, in order; exhaustion yields empty text.
    pub fn with_responses(responses: Vec<Result<String, ExtractionError>>) -> Self {
        Self {
            fixed: None,
            queue: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn call_count(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl VisionClient for MockVisionClient {
    fn extract_table_text(
        &self,
        _image_bytes: &[u8],
        _mime: ImageMime,
    ) -> Result<String, ExtractionError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Some(fixed) = &self.fixed {
            return Ok(fixed.clone());
        }
        match self.queue.lock().unwrap().pop_front() {
            Some(result) => result,
            None => Ok(String::new()),
        }
    }
}
