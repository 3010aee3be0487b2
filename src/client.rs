use std::fmt;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

/// Backend the clients talk to when no other location is configured.
pub const DEFAULT_BASE_URL: &str = "http://127.0.0.1:5000";

/// Passage length sent when the caller does not specify one.
pub const DEFAULT_LENGTH: &str = "a short paragraph";

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);

const GENERATE_PATH: &str = "/generate-text";
const DETAILS_PATH: &str = "/explain-translate";

/// Reading difficulty of a generated passage.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    #[default]
    Medium,
    Hard,
}

impl Difficulty {
    pub fn from_str(value: &str) -> Option<Self> {
        match value.to_ascii_lowercase().as_str() {
            "easy" => Some(Difficulty::Easy),
            "medium" => Some(Difficulty::Medium),
            "hard" => Some(Difficulty::Hard),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Difficulty::Easy => "easy",
            Difficulty::Medium => "medium",
            Difficulty::Hard => "hard",
        }
    }
}

impl fmt::Display for Difficulty {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Body of a passage-generation request.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerateRequest {
    pub topic: String,
    pub difficulty: Difficulty,
    pub length: String,
}

impl GenerateRequest {
    /// A request for the topic with the backend's default difficulty and
    /// length.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            difficulty: Difficulty::default(),
            length: DEFAULT_LENGTH.to_string(),
        }
    }
}

/// Successful body of the generation endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneratedText {
    pub text: String,
}

/// Body of an explanation/translation request. `context` carries the full
/// passage the snippet was selected from; the backend truncates it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetailRequest {
    pub text: String,
    pub language: String,
    pub context: String,
}

/// Successful body of the detail endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectionDetails {
    pub explanation: String,
    pub translation: String,
}

// Both endpoints report failures as a non-2xx status with this body.
#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: String,
}

#[derive(Debug)]
pub enum TutorError {
    Network(reqwest::Error),
    Timeout,
    Api { status: u16, message: String },
    Parse(String),
}

impl TutorError {
    /// The message a user-facing surface should show for this error. For
    /// backend rejections this is the backend's own `error` string, without
    /// the status prefix [`fmt::Display`] adds.
    pub fn user_message(&self) -> String {
        match self {
            TutorError::Api { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }
}

impl fmt::Display for TutorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TutorError::Network(err) => write!(f, "network error: {err}"),
            TutorError::Timeout => write!(f, "request timed out"),
            TutorError::Api { status, message } => {
                write!(f, "backend error ({status}): {message}")
            }
            TutorError::Parse(message) => write!(f, "unexpected response body: {message}"),
        }
    }
}

impl std::error::Error for TutorError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TutorError::Network(err) => Some(err),
            _ => None,
        }
    }
}

impl From<reqwest::Error> for TutorError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_timeout() {
            TutorError::Timeout
        } else {
            TutorError::Network(err)
        }
    }
}

/// Where the tutoring backend lives and how long to wait for it.
#[derive(Debug, Clone)]
pub struct TutorConfig {
    pub base_url: String,
    pub timeout: Duration,
}

impl Default for TutorConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            timeout: DEFAULT_TIMEOUT,
        }
    }
}

/// Typed client for the two tutoring endpoints: passage generation and
/// selection explanation/translation.
#[derive(Debug, Clone)]
pub struct TutorClient {
    http: reqwest::Client,
    base_url: String,
}

impl TutorClient {
    pub fn new(config: TutorConfig) -> Result<Self, TutorError> {
        let http = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()?;
        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Requests a fresh reading passage.
    pub async fn generate_text(
        &self,
        request: &GenerateRequest,
    ) -> Result<GeneratedText, TutorError> {
        debug!(
            topic = %request.topic,
            difficulty = %request.difficulty,
            "requesting passage generation"
        );
        self.post_json(GENERATE_PATH, request).await
    }

    /// Requests an explanation and translation for a selected snippet.
    pub async fn explain_translate(
        &self,
        request: &DetailRequest,
    ) -> Result<SelectionDetails, TutorError> {
        debug!(
            language = %request.language,
            chars = request.text.chars().count(),
            "requesting selection details"
        );
        self.post_json(DETAILS_PATH, request).await
    }

    async fn post_json<B, T>(&self, path: &str, body: &B) -> Result<T, TutorError>
    where
        B: Serialize,
        T: serde::de::DeserializeOwned,
    {
        let url = format!("{}{path}", self.base_url);
        let response = self.http.post(&url).json(body).send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            let message = serde_json::from_str::<ErrorBody>(&text)
                .map(|body| body.error)
                .unwrap_or_else(|_| format!("HTTP error! Status: {}", status.as_u16()));
            warn!(status = status.as_u16(), %message, "backend rejected request");
            return Err(TutorError::Api {
                status: status.as_u16(),
                message,
            });
        }

        serde_json::from_str::<T>(&text).map_err(|err| TutorError::Parse(err.to_string()))
    }
}
