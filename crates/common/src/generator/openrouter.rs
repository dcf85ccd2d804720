//! OpenRouter chat-completions generator

use super::{codes, GeneratorError, Proposal, ProposalGenerator};
use crate::errors::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Instant;

const DEFAULT_BASE_URL: &str = "https://openrouter.ai/api/v1";

const SYSTEM_PROMPT: &str = "You create study flashcards. Read the user's text and reply with \
a JSON object of the form {\"flashcards\": [{\"front\": \"...\", \"back\": \"...\"}]}. \
Each front is a short question, each back a concise answer taken from the text. \
Reply with JSON only.";

/// Generator backed by an OpenRouter-compatible chat-completions endpoint
pub struct OpenRouterGenerator {
    client: reqwest::Client,
    api_key: String,
    model: String,
    base_url: String,
    temperature: f32,
    max_proposals: usize,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    response_format: ResponseFormat,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct ResponseFormat {
    #[serde(rename = "type")]
    kind: &'static str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

#[derive(Deserialize)]
struct ProviderErrorBody {
    error: ProviderErrorDetail,
}

#[derive(Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    code: Option<serde_json::Value>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ProposalPayload {
    Wrapped { flashcards: Vec<Proposal> },
    Bare(Vec<Proposal>),
}

impl OpenRouterGenerator {
    /// Create a new OpenRouter generator
    pub fn new(
        api_key: String,
        model: String,
        base_url: Option<String>,
        temperature: f32,
        max_proposals: usize,
    ) -> Result<Self> {
        // The overall deadline is enforced by the caller
        let client = reqwest::Client::builder().build()?;

        Ok(Self {
            client,
            api_key,
            model,
            base_url: base_url.unwrap_or_else(|| DEFAULT_BASE_URL.to_string()),
            temperature,
            max_proposals,
        })
    }

    async fn request(&self, source_text: &str) -> std::result::Result<String, GeneratorError> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage { role: "system", content: SYSTEM_PROMPT },
                ChatMessage { role: "user", content: source_text },
            ],
            temperature: self.temperature,
            response_format: ResponseFormat { kind: "json_object" },
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| GeneratorError::unavailable(format!("Request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(provider_error(status.as_u16(), &body));
        }

        let reply: ChatResponse = response
            .json()
            .await
            .map_err(|e| GeneratorError::malformed(format!("Failed to parse response: {}", e)))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| GeneratorError::malformed("Response contained no message content"))
    }
}

#[async_trait]
impl ProposalGenerator for OpenRouterGenerator {
    async fn generate(&self, source_text: &str) -> std::result::Result<Vec<Proposal>, GeneratorError> {
        let start = Instant::now();
        let content = self.request(source_text).await?;
        let proposals = parse_proposals(&content, self.max_proposals)?;

        tracing::debug!(
            model = %self.model,
            proposals = proposals.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "Provider returned proposals"
        );

        Ok(proposals)
    }

    fn model_name(&self) -> &str {
        &self.model
    }
}

/// Turn a non-2xx provider reply into a generator error
fn provider_error(status: u16, body: &str) -> GeneratorError {
    let detail = serde_json::from_str::<ProviderErrorBody>(body).ok().map(|b| b.error);

    let code = detail
        .as_ref()
        .and_then(|d| d.code.as_ref())
        .map(|c| match c {
            serde_json::Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .map(|c| format!("{}_{}", codes::PROVIDER_ERROR, c.to_uppercase()))
        .unwrap_or_else(|| format!("{}_{}", codes::PROVIDER_ERROR, status));

    let message = detail
        .and_then(|d| d.message)
        .unwrap_or_else(|| body.chars().take(500).collect());

    GeneratorError::new(code, format!("HTTP {}: {}", status, message))
}

/// Parse model output into proposals.
///
/// Accepts either `{"flashcards": [...]}` or a bare array, optionally wrapped
/// in a Markdown code fence. Anything past `max_proposals` is dropped.
pub fn parse_proposals(
    content: &str,
    max_proposals: usize,
) -> std::result::Result<Vec<Proposal>, GeneratorError> {
    let trimmed = strip_code_fence(content.trim());

    let payload: ProposalPayload = serde_json::from_str(trimmed)
        .map_err(|e| GeneratorError::malformed(format!("Output is not a flashcard list: {}", e)))?;

    let mut proposals = match payload {
        ProposalPayload::Wrapped { flashcards } => flashcards,
        ProposalPayload::Bare(list) => list,
    };

    for proposal in &mut proposals {
        proposal.front = proposal.front.trim().to_string();
        proposal.back = proposal.back.trim().to_string();
    }

    if let Some(position) = proposals
        .iter()
        .position(|p| p.front.is_empty() || p.back.is_empty())
    {
        return Err(GeneratorError::malformed(format!(
            "Proposal {} has an empty side",
            position
        )));
    }

    proposals.truncate(max_proposals);
    Ok(proposals)
}

fn strip_code_fence(text: &str) -> &str {
    let Some(rest) = text.strip_prefix("```") else {
        return text;
    };
    let rest = rest.strip_prefix("json").unwrap_or(rest);
    rest.strip_suffix("```").unwrap_or(rest).trim()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_wrapped() {
        let out = r#"{"flashcards": [{"front": "Q1", "back": "A1"}, {"front": " Q2 ", "back": "A2"}]}"#;
        let proposals = parse_proposals(out, 20).unwrap();
        assert_eq!(proposals.len(), 2);
        assert_eq!(proposals[1], Proposal::new("Q2", "A2"));
    }

    #[test]
    fn test_parse_bare_array_in_fence() {
        let out = "```json\n[{\"front\": \"Q\", \"back\": \"A\"}]\n```";
        let proposals = parse_proposals(out, 20).unwrap();
        assert_eq!(proposals, vec![Proposal::new("Q", "A")]);
    }

    #[test]
    fn test_parse_truncates() {
        let out = r#"[{"front":"1","back":"a"},{"front":"2","back":"b"},{"front":"3","back":"c"}]"#;
        assert_eq!(parse_proposals(out, 2).unwrap().len(), 2);
    }

    #[test]
    fn test_parse_empty_list_is_valid() {
        assert!(parse_proposals(r#"{"flashcards": []}"#, 20).unwrap().is_empty());
    }

    #[test]
    fn test_parse_rejects_prose() {
        let err = parse_proposals("Sure! Here are your flashcards.", 20).unwrap_err();
        assert_eq!(err.code, codes::MALFORMED_OUTPUT);
    }

    #[test]
    fn test_parse_rejects_empty_side() {
        let err = parse_proposals(r#"[{"front":"Q","back":"   "}]"#, 20).unwrap_err();
        assert_eq!(err.code, codes::MALFORMED_OUTPUT);
    }

    #[test]
    fn test_provider_error_with_body() {
        let body = r#"{"error": {"message": "Insufficient credits", "code": 402}}"#;
        let err = provider_error(402, body);
        assert_eq!(err.code, "PROVIDER_ERROR_402");
        assert!(err.message.contains("Insufficient credits"));
    }

    #[test]
    fn test_provider_error_without_body() {
        let err = provider_error(503, "upstream overloaded");
        assert_eq!(err.code, "PROVIDER_ERROR_503");
        assert_eq!(err.message, "HTTP 503: upstream overloaded");
    }
}
