use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Message {
    pub role: String,
    pub content: String,
}

impl Message {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[async_trait]
pub trait LLMProvider: Send + Sync {
    async fn complete(&self, messages: Vec<Message>) -> Result<String>;
}

#[derive(Debug, Clone)]
pub struct GeminiProvider {
    api_key: String,
    model: String,
    client: reqwest::Client,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiRequest {
    contents: Vec<GeminiContent>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system_instruction: Option<GeminiContent>,
    generation_config: GeminiGenerationConfig,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiContent {
    #[serde(skip_serializing_if = "Option::is_none")]
    role: Option<String>,
    parts: Vec<GeminiPart>,
}

#[derive(Debug, Serialize, Deserialize)]
struct GeminiPart {
    text: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct GeminiGenerationConfig {
    response_mime_type: String,
}

#[derive(Debug, Deserialize)]
struct GeminiResponse {
    candidates: Vec<GeminiCandidate>,
}

#[derive(Debug, Deserialize)]
struct GeminiCandidate {
    content: GeminiContent,
}

impl GeminiProvider {
    pub fn new(api_key: String) -> Self {
        Self {
            api_key,
            model: "gemini-2.0-flash".to_string(),
            client: reqwest::Client::new(),
        }
    }

    pub fn with_model(mut self, model: String) -> Self {
        self.model = model;
        self
    }
}

#[async_trait]
impl LLMProvider for GeminiProvider {
    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        let system_instruction = messages
            .iter()
            .find(|m| m.role == "system")
            .map(|m| GeminiContent {
                role: None,
                parts: vec![GeminiPart {
                    text: m.content.clone(),
                }],
            });

        let contents: Vec<GeminiContent> = messages
            .into_iter()
            .filter(|m| m.role != "system")
            .map(|m| GeminiContent {
                role: Some(if m.role == "assistant" {
                    "model".to_string()
                } else {
                    "user".to_string()
                }),
                parts: vec![GeminiPart { text: m.content }],
            })
            .collect();

        let request = GeminiRequest {
            contents,
            system_instruction,
            generation_config: GeminiGenerationConfig {
                response_mime_type: "application/json".to_string(),
            },
        };

        let url = format!(
            "https://generativelanguage.googleapis.com/v1beta/models/{}:generateContent",
            self.model
        );

        let response = self
            .client
            .post(&url)
            .header("x-goog-api-key", &self.api_key)
            .header("content-type", "application/json")
            .json(&request)
            .send()
            .await?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await?;
            anyhow::bail!("Gemini API error {}: {}", status, body);
        }

        let result: GeminiResponse = response.json().await?;
        result
            .candidates
            .first()
            .and_then(|c| c.content.parts.first())
            .map(|p| p.text.clone())
            .ok_or_else(|| anyhow::anyhow!("No content in response"))
    }
}

// Mock provider for testing. Records every call so tests can assert on the
// prompts that were actually sent.
pub struct MockLLMProvider {
    response: Result<String, String>,
    calls: std::sync::Mutex<Vec<Vec<Message>>>,
}

impl MockLLMProvider {
    pub fn new() -> Self {
        Self::with_response("{}".to_string())
    }

    pub fn with_response(response: String) -> Self {
        Self {
            response: Ok(response),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn failing(error: impl Into<String>) -> Self {
        Self {
            response: Err(error.into()),
            calls: std::sync::Mutex::new(Vec::new()),
        }
    }

    pub fn calls(&self) -> Vec<Vec<Message>> {
        self.calls.lock().unwrap().clone()
    }
}

impl Default for MockLLMProvider {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl LLMProvider for MockLLMProvider {
    async fn complete(&self, messages: Vec<Message>) -> Result<String> {
        self.calls.lock().unwrap().push(messages);
        match &self.response {
            Ok(text) => Ok(text.clone()),
            Err(error) => Err(anyhow::anyhow!("{}", error)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_message_constructors() {
        let sys = Message::system("test");
        assert_eq!(sys.role, "system");
        assert_eq!(sys.content, "test");

        let user = Message::user("hello");
        assert_eq!(user.role, "user");
        assert_eq!(user.content, "hello");
    }

    #[test]
    fn test_gemini_provider_creation() {
        let provider = GeminiProvider::new("test-key".to_string());
        assert_eq!(provider.model, "gemini-2.0-flash");

        let provider = provider.with_model("gemini-1.5-pro".to_string());
        assert_eq!(provider.model, "gemini-1.5-pro");
    }

    #[tokio::test]
    async fn test_mock_provider_records_calls() {
        let provider = MockLLMProvider::with_response("ok".to_string());
        let result = provider
            .complete(vec![Message::user("test")])
            .await
            .unwrap();
        assert_eq!(result, "ok");

        let calls = provider.calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0][0].content, "test");
    }

    #[tokio::test]
    async fn test_mock_provider_failure() {
        let provider = MockLLMProvider::failing("network down");
        let err = provider.complete(vec![Message::user("x")]).await;
        assert!(err.is_err());
    }
}
