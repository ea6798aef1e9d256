//! Gemini-backed intent extraction.
//!
//! Downloads the inbound media, sends it inline with the extraction prompt to
//! `generateContent`, and hands the model's text back to the agent runtime.

use std::time::Duration;

use async_trait::async_trait;
use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use mandi_agent::{ExtractionError, IntentExtractor, MediaAttachment, EXTRACTION_PROMPT};
use mandi_core::config::AppConfig;
use reqwest::StatusCode;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

const API_KEY_HEADER: &str = "x-goog-api-key";
const RETRY_BACKOFF: Duration = Duration::from_millis(500);

pub struct GeminiExtractor {
    client: reqwest::Client,
    api_key: SecretString,
    base_url: String,
    model: String,
    max_retries: u32,
    twilio_credentials: Option<(SecretString, SecretString)>,
}

impl GeminiExtractor {
    pub fn from_config(config: &AppConfig) -> Result<Self, ExtractionError> {
        let api_key = config
            .llm
            .api_key
            .clone()
            .ok_or_else(|| ExtractionError::Model("llm.api_key is not configured".to_string()))?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.llm.timeout_secs))
            .build()
            .map_err(|error| ExtractionError::Model(error.to_string()))?;

        Ok(Self {
            client,
            api_key,
            base_url: config.llm.base_url.trim_end_matches('/').to_string(),
            model: config.llm.model.clone(),
            max_retries: config.llm.max_retries,
            twilio_credentials: config
                .whatsapp
                .account_sid
                .clone()
                .zip(config.whatsapp.auth_token.clone()),
        })
    }

    fn endpoint(&self) -> String {
        format!("{}/models/{}:generateContent", self.base_url, self.model)
    }

    async fn download(&self, media: &MediaAttachment) -> Result<Vec<u8>, ExtractionError> {
        let mut request = self.client.get(&media.url);
        if is_twilio_url(&media.url) {
            if let Some((account_sid, auth_token)) = &self.twilio_credentials {
                request = request
                    .basic_auth(account_sid.expose_secret(), Some(auth_token.expose_secret()));
            }
        }

        let response =
            request.send().await.map_err(|error| ExtractionError::Download(error.to_string()))?;
        if !response.status().is_success() {
            return Err(ExtractionError::Download(format!("HTTP {}", response.status())));
        }
        let bytes =
            response.bytes().await.map_err(|error| ExtractionError::Download(error.to_string()))?;
        Ok(bytes.to_vec())
    }

    async fn generate(&self, body: &GenerateRequest) -> Result<String, ExtractionError> {
        let mut attempt = 0;
        loop {
            match self.generate_once(body).await {
                Err(failure) if failure.retryable && attempt < self.max_retries => {
                    attempt += 1;
                    warn!(
                        event_name = "server.gemini.retry",
                        attempt,
                        error = %failure.error,
                        "retrying model request"
                    );
                    tokio::time::sleep(RETRY_BACKOFF * attempt).await;
                }
                Err(failure) => return Err(failure.error),
                Ok(text) => return Ok(text),
            }
        }
    }

    async fn generate_once(&self, body: &GenerateRequest) -> Result<String, AttemptFailure> {
        let response = self
            .client
            .post(self.endpoint())
            .header(API_KEY_HEADER, self.api_key.expose_secret())
            .json(body)
            .send()
            .await
            .map_err(|error| AttemptFailure::retryable(ExtractionError::Model(error.to_string())))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let error = ExtractionError::Model(format!("HTTP {status}: {text}"));
            return Err(if is_transient(status) {
                AttemptFailure::retryable(error)
            } else {
                AttemptFailure::fatal(error)
            });
        }

        let parsed = response
            .json::<GenerateResponse>()
            .await
            .map_err(|error| AttemptFailure::fatal(ExtractionError::Model(error.to_string())))?;
        response_text(parsed).map_err(AttemptFailure::fatal)
    }
}

#[async_trait]
impl IntentExtractor for GeminiExtractor {
    async fn extract(&self, media: &MediaAttachment) -> Result<String, ExtractionError> {
        let bytes = self.download(media).await?;
        debug!(
            event_name = "server.gemini.media_downloaded",
            content_type = %media.content_type,
            bytes = bytes.len(),
            "media downloaded"
        );
        self.generate(&GenerateRequest::for_media(&media.content_type, &bytes)).await
    }
}

struct AttemptFailure {
    error: ExtractionError,
    retryable: bool,
}

impl AttemptFailure {
    fn retryable(error: ExtractionError) -> Self {
        Self { error, retryable: true }
    }

    fn fatal(error: ExtractionError) -> Self {
        Self { error, retryable: false }
    }
}

fn is_transient(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

/// Twilio media URLs require the account credentials; other hosts are fetched anonymously.
fn is_twilio_url(url: &str) -> bool {
    reqwest::Url::parse(url)
        .ok()
        .and_then(|url| url.host_str().map(|host| host == "twilio.com" || host.ends_with(".twilio.com")))
        .unwrap_or(false)
}

/// `audio/ogg; codecs=opus` becomes `audio/ogg`.
fn bare_mime_type(content_type: &str) -> &str {
    content_type.split(';').next().unwrap_or(content_type).trim()
}

fn response_text(response: GenerateResponse) -> Result<String, ExtractionError> {
    if let Some(error) = response.error {
        return Err(ExtractionError::Model(format!("Gemini API error: {}", error.message)));
    }
    let text = response
        .candidates
        .unwrap_or_default()
        .into_iter()
        .next()
        .and_then(|candidate| candidate.content)
        .map(|content| {
            content.parts.into_iter().filter_map(|part| part.text).collect::<Vec<_>>().join("")
        })
        .unwrap_or_default();

    if text.trim().is_empty() {
        Err(ExtractionError::EmptyResponse)
    } else {
        Ok(text)
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerateRequest {
    contents: Vec<Content>,
    generation_config: GenerationConfig,
}

impl GenerateRequest {
    fn for_media(content_type: &str, bytes: &[u8]) -> Self {
        Self {
            contents: vec![Content {
                role: "user",
                parts: vec![
                    Part::Text { text: EXTRACTION_PROMPT.to_string() },
                    Part::InlineData {
                        inline_data: InlineData {
                            mime_type: bare_mime_type(content_type).to_string(),
                            data: STANDARD.encode(bytes),
                        },
                    },
                ],
            }],
            generation_config: GenerationConfig {
                temperature: 0.1,
                response_mime_type: "application/json",
            },
        }
    }
}

#[derive(Debug, Serialize)]
struct Content {
    role: &'static str,
    parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
enum Part {
    Text {
        text: String,
    },
    InlineData {
        #[serde(rename = "inlineData")]
        inline_data: InlineData,
    },
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct InlineData {
    mime_type: String,
    data: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GenerationConfig {
    temperature: f32,
    response_mime_type: &'static str,
}

#[derive(Debug, Deserialize)]
struct GenerateResponse {
    candidates: Option<Vec<Candidate>>,
    error: Option<ApiError>,
}

#[derive(Debug, Deserialize)]
struct Candidate {
    content: Option<CandidateContent>,
}

#[derive(Debug, Deserialize)]
struct CandidateContent {
    #[serde(default)]
    parts: Vec<CandidatePart>,
}

#[derive(Debug, Deserialize)]
struct CandidatePart {
    text: Option<String>,
}

#[derive(Debug, Deserialize)]
struct ApiError {
    message: String,
}
