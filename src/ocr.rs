//! OCR model client.
//!
//! Builds one request per image and sends it to a locally hosted model
//! server. Two wire shapes are supported, picked once per run:
//! - [`Protocol::Native`]: `POST {api}/api/generate`, text in `response`
//! - [`Protocol::Chat`]: `POST {api}/v1/chat/completions`, text in
//!   `choices[0].message.content`
//!
//! The native endpoint can also be asked for a chunked reply (`--stream`),
//! which arrives as newline-delimited JSON objects.

use base64::Engine;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::config::{DEFAULT_PROMPT, GROUNDING_PREFIX, OcrConfig};
use crate::scan::ImagePath;

/// Result type for OCR operations
pub type OcrResult<T> = Result<T, OcrError>;

/// Errors that can occur while converting one image
#[derive(Debug, Error)]
pub enum OcrError {
    /// The image file could not be read
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    /// Transport failure, including timeouts
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),
    /// Server answered with a non-success status
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },
    /// Response body was not the expected JSON
    #[error("invalid response: {0}")]
    Json(#[from] serde_json::Error),
    /// Chat response without any choice
    #[error("invalid response: no choices returned")]
    MissingChoice,
    /// Settings that can never produce a usable request
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
}

/// Request/response shape spoken by the server
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Protocol {
    /// Single-endpoint generate API
    #[default]
    Native,
    /// OpenAI-compatible chat completions API
    Chat,
}

impl Protocol {
    pub fn endpoint_path(self) -> &'static str {
        match self {
            Protocol::Native => "/api/generate",
            Protocol::Chat => "/v1/chat/completions",
        }
    }

    /// Full endpoint URL for `api_base`, trailing slashes stripped first
    pub fn endpoint(self, api_base: &str) -> String {
        format!("{}{}", api_base.trim_end_matches('/'), self.endpoint_path())
    }
}

/// Body of a native generate request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct GenerateRequest {
    pub model: String,
    pub prompt: String,
    pub images: Vec<String>,
    pub stream: bool,
}

/// Body of a chat completions request
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: Vec<ContentPart>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ContentPart {
    Text { text: String },
    /// Data URI of the image
    ImageUrl { image_url: String },
}

/// One request, in whichever shape the protocol needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum RequestPayload {
    Generate(GenerateRequest),
    Chat(ChatRequest),
}

/// An absent `response` reads as empty text; an explicit `null` is rejected
#[derive(Debug, Deserialize)]
struct GenerateResponse {
    #[serde(default)]
    response: String,
    #[serde(default)]
    done: bool,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Debug, Deserialize)]
struct ChatMessageResponse {
    content: String,
}

/// Progress update while waiting for a model reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum OcrProgress {
    /// Server accepted the request
    Connected,
    /// Streamed text received so far
    Receiving(String),
    /// Final text
    Complete(String),
}

/// Effective prompt: the override (or the default), optionally grounded
pub fn build_prompt(override_prompt: Option<&str>, grounding: bool) -> String {
    let prompt = override_prompt
        .filter(|p| !p.is_empty())
        .unwrap_or(DEFAULT_PROMPT);
    if grounding {
        format!("{}{}", GROUNDING_PREFIX, prompt)
    } else {
        prompt.to_string()
    }
}

/// Mime subtype for the data URI, from the extension
pub fn guess_image_type(image: &ImagePath) -> &str {
    match image.extension.as_str() {
        "" | "jpg" => "jpeg",
        ext => ext,
    }
}

/// Read the whole file and encode it as standard base64
pub fn encode_image(path: &Path) -> OcrResult<String> {
    let data = fs::read(path).map_err(|source| OcrError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(base64::engine::general_purpose::STANDARD.encode(data))
}

/// Build the request body for `image`
pub fn build_request(config: &OcrConfig, image: &ImagePath, prompt: &str) -> OcrResult<RequestPayload> {
    let img_base64 = encode_image(&image.path)?;

    let payload = match config.protocol {
        Protocol::Native => RequestPayload::Generate(GenerateRequest {
            model: config.model.clone(),
            prompt: prompt.to_string(),
            images: vec![img_base64],
            stream: config.stream,
        }),
        Protocol::Chat => RequestPayload::Chat(ChatRequest {
            model: config.model.clone(),
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: vec![
                    ContentPart::Text {
                        text: prompt.to_string(),
                    },
                    ContentPart::ImageUrl {
                        image_url: format!(
                            "data:image/{};base64,{}",
                            guess_image_type(image),
                            img_base64
                        ),
                    },
                ],
            }],
        }),
    };
    Ok(payload)
}

/// Client for one OCR server endpoint
#[derive(Debug, Clone)]
pub struct OcrClient {
    client: reqwest::Client,
    endpoint: String,
}

impl OcrClient {
    pub fn new(config: &OcrConfig) -> OcrResult<Self> {
        config.validate()?;

        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        Ok(Self {
            client,
            endpoint: config.protocol.endpoint(config.api_base_trimmed()),
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Send `payload` and return the trimmed model text
    pub async fn recognize(&self, payload: &RequestPayload) -> OcrResult<String> {
        self.recognize_with_progress(payload, |_| {}).await
    }

    /// Send `payload`, reporting progress as the reply arrives
    pub async fn recognize_with_progress<F>(
        &self,
        payload: &RequestPayload,
        mut on_progress: F,
    ) -> OcrResult<String>
    where
        F: FnMut(OcrProgress),
    {
        tracing::debug!(endpoint = %self.endpoint, "Sending OCR request");
        let response = self.client.post(&self.endpoint).json(payload).send().await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(OcrError::Status {
                status: status.as_u16(),
                body,
            });
        }
        on_progress(OcrProgress::Connected);

        let text = match payload {
            RequestPayload::Generate(request) if request.stream => {
                read_stream(response, &mut on_progress).await?
            }
            RequestPayload::Generate(_) => {
                let body = response.bytes().await?;
                let parsed: GenerateResponse = serde_json::from_slice(&body)?;
                parsed.response
            }
            RequestPayload::Chat(_) => {
                let body = response.bytes().await?;
                let parsed: ChatResponse = serde_json::from_slice(&body)?;
                parsed
                    .choices
                    .into_iter()
                    .next()
                    .map(|choice| choice.message.content)
                    .ok_or(OcrError::MissingChoice)?
            }
        };

        let text = text.trim().to_string();
        on_progress(OcrProgress::Complete(text.clone()));
        Ok(text)
    }
}

/// Accumulate a newline-delimited JSON reply until a chunk says `done`
async fn read_stream<F>(mut response: reqwest::Response, on_progress: &mut F) -> OcrResult<String>
where
    F: FnMut(OcrProgress),
{
    let mut buffer: Vec<u8> = Vec::new();
    let mut full_content = String::new();

    while let Some(chunk) = response.chunk().await? {
        buffer.extend_from_slice(&chunk);
        while let Some(pos) = buffer.iter().position(|&b| b == b'\n') {
            let line: Vec<u8> = buffer.drain(..=pos).collect();
            let done = apply_stream_line(&line, &mut full_content);
            on_progress(OcrProgress::Receiving(full_content.clone()));
            if done {
                return Ok(full_content);
            }
        }
    }

    // Last chunk without a trailing newline
    apply_stream_line(&buffer, &mut full_content);
    Ok(full_content)
}

/// Append one stream line's text; returns whether the stream is finished
fn apply_stream_line(line: &[u8], full_content: &mut String) -> bool {
    let line = line.trim_ascii();
    if line.is_empty() {
        return false;
    }
    match serde_json::from_slice::<GenerateResponse>(line) {
        Ok(chunk) => {
            full_content.push_str(&chunk.response);
            chunk.done
        }
        Err(e) => {
            tracing::debug!(error = %e, "Skipping malformed stream chunk");
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_build_prompt_default_with_grounding() {
        assert_eq!(
            build_prompt(None, true),
            "<|grounding|>Convert the document to markdown."
        );
    }

    #[test]
    fn test_build_prompt_override_without_grounding() {
        assert_eq!(build_prompt(Some("Free OCR."), false), "Free OCR.");
        assert_eq!(build_prompt(Some(""), false), DEFAULT_PROMPT);
    }

    #[test]
    fn test_guess_image_type() {
        assert_eq!(guess_image_type(&ImagePath::new("a.JPG")), "jpeg");
        assert_eq!(guess_image_type(&ImagePath::new("a.png")), "png");
        assert_eq!(guess_image_type(&ImagePath::new("a.tif")), "tif");
        assert_eq!(guess_image_type(&ImagePath::new("scan")), "jpeg");
    }

    #[test]
    fn test_protocol_endpoint_strips_trailing_slash() {
        assert_eq!(
            Protocol::Native.endpoint("http://host:11434//"),
            "http://host:11434/api/generate"
        );
        assert_eq!(
            Protocol::Chat.endpoint("http://host:8000"),
            "http://host:8000/v1/chat/completions"
        );
    }

    #[test]
    fn test_native_payload_shape() {
        let payload = RequestPayload::Generate(GenerateRequest {
            model: "deepseek-ocr".to_string(),
            prompt: "p".to_string(),
            images: vec!["QUJD".to_string()],
            stream: false,
        });
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({"model": "deepseek-ocr", "prompt": "p", "images": ["QUJD"], "stream": false})
        );
    }

    #[test]
    fn test_chat_payload_shape() {
        let tmp = tempfile::TempDir::new().unwrap();
        let path = tmp.path().join("page.jpg");
        fs::write(&path, b"ABC").unwrap();

        let config = OcrConfig::defaults().protocol(Protocol::Chat);
        let payload = build_request(&config, &ImagePath::new(&path), "read").unwrap();
        assert_eq!(
            serde_json::to_value(&payload).unwrap(),
            json!({
                "model": "deepseek-ocr",
                "messages": [{
                    "role": "user",
                    "content": [
                        {"type": "text", "text": "read"},
                        {"type": "image_url", "image_url": "data:image/jpeg;base64,QUJD"}
                    ]
                }]
            })
        );
    }

    #[test]
    fn test_build_request_missing_file() {
        let err = build_request(
            &OcrConfig::defaults(),
            &ImagePath::new("/definitely/not/here.png"),
            "p",
        )
        .unwrap_err();
        assert!(matches!(err, OcrError::Io { .. }));
        assert!(err.to_string().contains("here.png"));
    }

    #[test]
    fn test_apply_stream_line() {
        let mut text = String::new();
        assert!(!apply_stream_line(br#"{"response":"Hel","done":false}"#, &mut text));
        assert!(!apply_stream_line(b"not json\n", &mut text));
        assert!(!apply_stream_line(b"   \n", &mut text));
        assert!(apply_stream_line(br#"{"response":"lo","done":true}"#, &mut text));
        assert_eq!(text, "Hello");
    }
}
