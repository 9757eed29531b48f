use crate::config::AiConfig;
use crate::errors::ServiceError;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::time::Duration;
use tracing::{debug, instrument, warn};
use utoipa::ToSchema;

/// A single chat turn in provider wire format.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ChatCompletionResponse {
    choices: Vec<ChatCompletionChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionChoice {
    message: ChatCompletionMessage,
}

#[derive(Debug, Deserialize)]
struct ChatCompletionMessage {
    content: String,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    response: String,
}

/// Gateway to the text-generation providers.
///
/// The primary provider is an OpenRouter-compatible chat-completions API;
/// when it is unconfigured or failing, requests fall back to a local
/// Ollama-compatible endpoint. Both are black boxes reached over HTTP.
#[derive(Clone)]
pub struct AiClient {
    client: reqwest::Client,
    cfg: AiConfig,
}

impl AiClient {
    pub fn new(cfg: AiConfig) -> Self {
        Self {
            client: reqwest::Client::builder()
                .timeout(Duration::from_secs(cfg.request_timeout_secs))
                .build()
                .expect("reqwest client construction cannot fail with static options"),
            cfg,
        }
    }

    /// Chat completion for the assistant bubbles. The response is stripped
    /// of markdown so it reads like a person typing, not rendered source.
    #[instrument(skip(self, messages), fields(turns = messages.len()))]
    pub async fn chat(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
        self.ask(messages, true).await
    }

    /// Business-report generation. Markdown is kept because the dashboard
    /// renders it.
    #[instrument(skip(self, data_string))]
    pub async fn generate_report(&self, data_string: &str) -> Result<String, ServiceError> {
        let messages = [ChatMessage {
            role: "user".to_string(),
            content: report_prompt(data_string),
        }];
        self.ask(&messages, false).await
    }

    async fn ask(&self, messages: &[ChatMessage], strip_markdown: bool) -> Result<String, ServiceError> {
        // 1. Primary provider, when a key is configured
        if self.cfg.openrouter_api_key.is_some() {
            match self.ask_openrouter(messages).await {
                Ok(text) => {
                    return Ok(if strip_markdown {
                        clean_response(&text)
                    } else {
                        text
                    })
                }
                Err(err) => {
                    warn!(error = %err, "Primary AI provider failed; trying fallback");
                }
            }
        }

        // 2. Local fallback
        match self.ask_ollama(messages).await {
            Ok(text) => Ok(if strip_markdown {
                clean_response(&text)
            } else {
                text
            }),
            Err(err) => {
                warn!(error = %err, "Fallback AI provider failed");
                Err(ServiceError::ExternalServiceError(
                    "No AI providers available. Please check your configuration.".to_string(),
                ))
            }
        }
    }

    async fn ask_openrouter(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
        let api_key = self
            .cfg
            .openrouter_api_key
            .as_deref()
            .ok_or_else(|| ServiceError::ExternalServiceError("No API key configured".into()))?;

        let url = format!(
            "{}/v1/chat/completions",
            self.cfg.openrouter_base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .bearer_auth(api_key)
            .header("X-Title", "Autoworx System")
            .json(&json!({
                "model": self.cfg.openrouter_model,
                "messages": messages,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Provider request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Provider returned status {}",
                response.status()
            )));
        }

        let completion: ChatCompletionResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed provider response: {}", e))
        })?;

        completion
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .ok_or_else(|| {
                ServiceError::ExternalServiceError("Provider returned no choices".to_string())
            })
    }

    async fn ask_ollama(&self, messages: &[ChatMessage]) -> Result<String, ServiceError> {
        // The generate endpoint takes a single prompt; send the latest turn
        let prompt = messages
            .last()
            .map(|m| m.content.clone())
            .ok_or_else(|| ServiceError::InvalidInput("Messages array is empty".to_string()))?;

        let url = format!(
            "{}/api/generate",
            self.cfg.ollama_base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .post(&url)
            .json(&json!({
                "model": self.cfg.ollama_model,
                "prompt": prompt,
                "stream": false,
            }))
            .send()
            .await
            .map_err(|e| ServiceError::ExternalServiceError(format!("Fallback request failed: {}", e)))?;

        if !response.status().is_success() {
            return Err(ServiceError::ExternalServiceError(format!(
                "Fallback returned status {}",
                response.status()
            )));
        }

        let body: OllamaResponse = response.json().await.map_err(|e| {
            ServiceError::ExternalServiceError(format!("Malformed fallback response: {}", e))
        })?;

        debug!("Fallback AI provider answered");
        Ok(body.response)
    }
}

/// Strips markdown symbols so chat replies read like a person typing.
pub fn clean_response(text: &str) -> String {
    let mut cleaned = String::with_capacity(text.len());

    for line in text.lines() {
        let line = line.strip_prefix("> ").unwrap_or(line);
        let line = if let Some(rest) = line.strip_prefix("- ") {
            format!("\u{2022} {rest}")
        } else {
            line.to_string()
        };

        let line: String = line
            .chars()
            .filter(|c| !matches!(c, '*' | '#' | '`'))
            .collect();

        cleaned.push_str(&line);
        cleaned.push('\n');
    }

    cleaned.trim().to_string()
}

fn report_prompt(data_string: &str) -> String {
    format!(
        r#"You are the Senior Business Intelligence Analyst for Autoworx Repairs.
Provide a professional, executive-level business analysis report.

Data:
{data_string}

Use the following exact structure:
### FINANCIAL PERFORMANCE
Provide a professional breakdown of revenue.
- **Gross Revenue**: [Amount]
- **Labor Total**: [Amount]
- **Parts Total**: [Amount]
- **Average Transaction**: [Amount]

### SERVICE ANALYSIS
List the top performing services. Show job counts.

### STRATEGIC INSIGHTS
Provide 3 high-level business recommendations.

### DATA_BLOCK
At the very end, provide a JSON block with this exact structure for my charting engine (no other text in this section):
[
  {{"name": "Labor", "value": [number]}},
  {{"name": "Parts", "value": [number]}},
  {{"name": "Custom", "value": [number]}}
]

CRITICAL RULES:
1. USE MARKDOWN (### for headers, ** for bold).
2. USE 'PHP' for all currency. No Peso symbols.
3. NO EMOJIS in the text.
4. Provide the DATA_BLOCK JSON accurately.
5. Professional, objective tone."#
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_with(
        openrouter_base: &str,
        ollama_base: &str,
        api_key: Option<&str>,
    ) -> AiClient {
        AiClient::new(AiConfig {
            openrouter_api_key: api_key.map(str::to_string),
            openrouter_base_url: openrouter_base.to_string(),
            openrouter_model: "test-model".to_string(),
            ollama_base_url: ollama_base.to_string(),
            ollama_model: "test-local".to_string(),
            request_timeout_secs: 5,
        })
    }

    #[test]
    fn clean_response_strips_markdown() {
        let raw = "### Hello\n**Bold** and *starred*\n- first\n> quoted\n`code`";
        let cleaned = clean_response(raw);
        assert_eq!(cleaned, "Hello\nBold and starred\n\u{2022} first\nquoted\ncode");
    }

    #[tokio::test]
    async fn primary_provider_answers_chat() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "**Hi** there"}}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let client = client_with(&server.uri(), "http://127.0.0.1:1", Some("key"));
        let reply = client
            .chat(&[ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }])
            .await
            .unwrap();

        assert_eq!(reply, "Hi there");
    }

    #[tokio::test]
    async fn falls_back_to_local_provider_when_primary_fails() {
        let primary = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&primary)
            .await;

        let fallback = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/generate"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "response": "local answer"
            })))
            .expect(1)
            .mount(&fallback)
            .await;

        let client = client_with(&primary.uri(), &fallback.uri(), Some("key"));
        let reply = client
            .chat(&[ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }])
            .await
            .unwrap();

        assert_eq!(reply, "local answer");
    }

    #[tokio::test]
    async fn no_reachable_provider_is_an_external_service_error() {
        let client = client_with("http://127.0.0.1:1", "http://127.0.0.1:1", None);
        let result = client
            .chat(&[ChatMessage {
                role: "user".to_string(),
                content: "hello".to_string(),
            }])
            .await;

        assert!(matches!(
            result,
            Err(ServiceError::ExternalServiceError(_))
        ));
    }

    #[tokio::test]
    async fn report_generation_keeps_markdown() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/v1/chat/completions"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "choices": [{"message": {"role": "assistant", "content": "### FINANCIAL PERFORMANCE\n**Gross Revenue**: PHP 1000"}}]
            })))
            .mount(&server)
            .await;

        let client = client_with(&server.uri(), "http://127.0.0.1:1", Some("key"));
        let report = client.generate_report("[]").await.unwrap();

        assert!(report.contains("### FINANCIAL PERFORMANCE"));
        assert!(report.contains("**Gross Revenue**"));
    }
}
