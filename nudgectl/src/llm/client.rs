use crate::error::{Error, Result};
use base64::{engine::general_purpose, Engine as _};
use nudgectl_capture::ImageArtifact;
use reqwest::blocking::Client;
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, trace};

pub const DEFAULT_BASE_URL: &str = "https://api.openai.com";
pub const DEFAULT_MODEL: &str = "gpt-4.1-mini";
pub const DEFAULT_API_KEY_ENV: &str = "OPENAI_API_KEY";
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_MAX_TOKENS: u32 = 150;
pub const DEFAULT_TEMPERATURE: f64 = 0.3;

/// One-sentence answer for a single cycle.
pub type Suggestion = String;

/// Connection settings for an OpenAI-compatible chat completion endpoint.
#[derive(Debug, Clone)]
pub struct LlmConfig {
    pub base_url: String,
    pub model: String,
    /// Bearer token. `None` is only reported when a request is attempted.
    pub api_key: Option<String>,
    /// Where the key was expected to come from, for diagnostics.
    pub api_key_env: String,
    pub timeout: Duration,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key: None,
            api_key_env: DEFAULT_API_KEY_ENV.to_string(),
            timeout: DEFAULT_TIMEOUT,
            max_tokens: DEFAULT_MAX_TOKENS,
            temperature: DEFAULT_TEMPERATURE,
        }
    }
}

/// Turns a screenshot and a goal into a next-step suggestion.
pub trait Advisor {
    fn analyze(&self, image: &ImageArtifact, goal: &str) -> Result<Suggestion>;
}

/// Build the user prompt sent alongside the screenshot.
pub fn build_prompt(goal: &str) -> String {
    format!(
        "You are helping me use this computer / play this game.\n\
         My current goal is: {}\n\
         Look at the screenshot and tell me, in one short sentence, \
         what I should do next to move toward that goal.",
        goal
    )
}

pub struct LlmClient {
    client: Client,
    config: LlmConfig,
}

impl LlmClient {
    pub fn new(config: LlmConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::Config(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self { client, config })
    }

    pub fn endpoint(&self) -> String {
        format!(
            "{}/v1/chat/completions",
            self.config.base_url.trim_end_matches('/')
        )
    }

    fn api_key(&self) -> Result<&str> {
        match self.config.api_key.as_deref().map(str::trim) {
            Some(key) if !key.is_empty() => Ok(key),
            _ => Err(Error::Config(format!(
                "{} is not set. Please set it in your environment.",
                self.config.api_key_env
            ))),
        }
    }

    /// Send PNG bytes plus a prompt and return the trimmed answer text.
    pub fn query(&self, image_bytes: &[u8], prompt: &str) -> Result<String> {
        let api_key = self.api_key()?;
        let image_base64 = general_purpose::STANDARD.encode(image_bytes);

        let body = json!({
            "model": self.config.model,
            "messages": [
                {
                    "role": "user",
                    "content": [
                        {
                            "type": "text",
                            "text": prompt
                        },
                        {
                            "type": "image_url",
                            "image_url": {
                                "url": format!("data:image/png;base64,{}", image_base64)
                            }
                        }
                    ]
                }
            ],
            "max_tokens": self.config.max_tokens,
            "temperature": self.config.temperature
        });

        let endpoint = self.endpoint();
        debug!(
            "POST {} (model {}, image {} bytes)",
            endpoint,
            self.config.model,
            image_bytes.len()
        );

        let response = self
            .client
            .post(&endpoint)
            .bearer_auth(api_key)
            .json(&body)
            .send()?;

        let status = response.status();
        if !status.is_success() {
            let error_text = response
                .text()
                .unwrap_or_else(|_| "Unknown error".to_string());
            return Err(Error::response(
                format!("OpenAI API error {}", status),
                error_text,
            ));
        }

        let text = response.text()?;
        trace!("LLM response body: {}", text);
        extract_content(&text)
    }
}

impl Advisor for LlmClient {
    fn analyze(&self, image: &ImageArtifact, goal: &str) -> Result<Suggestion> {
        // Credential first: a missing key must never reach the network
        self.api_key()?;
        let bytes = image.read_bytes()?;
        self.query(&bytes, &build_prompt(goal))
    }
}

/// Pull `choices[0].message.content` out of a chat completion body.
fn extract_content(body: &str) -> Result<String> {
    let json: Value = serde_json::from_str(body)
        .map_err(|e| Error::response(format!("Response is not valid JSON: {}", e), body))?;

    json.get("choices")
        .and_then(|v| v.get(0))
        .and_then(|v| v.get("message"))
        .and_then(|v| v.get("content"))
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .ok_or_else(|| Error::response("Invalid OpenAI response format", body))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn prompt_embeds_the_goal() {
        let prompt = build_prompt("Win the match");
        assert!(prompt.contains("My current goal is: Win the match\n"));
        assert!(prompt.contains("in one short sentence"));
    }

    #[test]
    fn vanished_artifact_is_a_fatal_capture_error() {
        let frame = image::RgbaImage::new(2, 2);
        let artifact = ImageArtifact::from_image(&frame).unwrap();
        std::fs::remove_file(artifact.path()).unwrap();

        // Nothing listens here; reaching the network would be a Transport error
        let client = LlmClient::new(LlmConfig {
            base_url: "http://127.0.0.1:1".to_string(),
            api_key: Some("sk-test".to_string()),
            ..LlmConfig::default()
        })
        .unwrap();

        let err = client.analyze(&artifact, "win").unwrap_err();
        assert!(matches!(err, Error::Capture(nudgectl_capture::Error::Io(_))));
        assert_eq!(err.severity(), crate::error::Severity::Fatal);
    }

    #[test]
    fn endpoint_tolerates_trailing_slash() {
        let client = LlmClient::new(LlmConfig {
            base_url: "http://localhost:8000/".to_string(),
            ..LlmConfig::default()
        })
        .unwrap();
        assert_eq!(client.endpoint(), "http://localhost:8000/v1/chat/completions");
    }

    #[test]
    fn extracts_and_trims_first_choice() {
        let body = r#"{"choices":[{"message":{"content":"  Click Play.\n"}},{"message":{"content":"no"}}]}"#;
        assert_eq!(extract_content(body).unwrap(), "Click Play.");
    }

    #[test]
    fn missing_content_is_a_response_error_with_payload() {
        let body = r#"{"choices":[{"message":{"role":"assistant"}}]}"#;
        let err = extract_content(body).unwrap_err();
        assert!(matches!(err, Error::Response { .. }));
        assert_eq!(err.payload(), Some(body));
    }

    #[test]
    fn empty_choices_is_a_response_error() {
        let err = extract_content(r#"{"choices":[]}"#).unwrap_err();
        assert!(matches!(err, Error::Response { .. }));
    }

    #[test]
    fn non_json_body_is_a_response_error() {
        let err = extract_content("<html>gateway timeout</html>").unwrap_err();
        assert!(matches!(err, Error::Response { .. }));
        assert_eq!(err.payload(), Some("<html>gateway timeout</html>"));
    }

    #[test]
    fn blank_api_key_is_a_config_error() {
        let client = LlmClient::new(LlmConfig {
            api_key: Some("   ".to_string()),
            ..LlmConfig::default()
        })
        .unwrap();
        assert!(matches!(client.query(b"png", "hi"), Err(Error::Config(_))));
    }
}
