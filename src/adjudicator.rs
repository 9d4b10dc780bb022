//! AI adjudication client
//!
//! Sends the job requirements plus the normalized submission payload to a
//! chat-completions endpoint and parses the reply into a [`Verdict`].
//!
//! Fail-closed boundary: an ambiguous judgment must never authorize a
//! payout, so every malformed response, provider error, or timeout
//! collapses to FAIL with a reason naming the cause. `evaluate` is
//! infallible at the type level - nothing escapes this module as an error.

use crate::config::AdjudicatorConfig;
use crate::types::Verdict;
use anyhow::{Context, Result};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info, warn};

const JUDGE_SYSTEM_PROMPT: &str = r#"You are a senior code reviewer and payout judge. Your job is to strictly evaluate if a work submission meets the client's requirements.
RULES:
1. Be objective. If the work meets the core goal, PASS it.
2. Ignore minor styling issues (missing comments, indentation) unless they break the work.
3. If the submission is malicious, empty, or completely irrelevant, FAIL it.
4. IMPORTANT: You must return ONLY raw JSON. No markdown formatting.

Output JSON format: { "verdict": "PASS" (or "FAIL"), "reason": "Short explanation of why." }"#;

/// Adjudication seam. The orchestrator only sees this trait; tests swap
/// in scripted judges.
#[async_trait]
pub trait Adjudicator: Send + Sync {
    async fn evaluate(&self, requirements: &str, payload: &str) -> Verdict;
}

#[derive(Debug, Serialize)]
struct ChatRequest {
    model: String,
    messages: Vec<Message>,
    max_tokens: u32,
    temperature: f32,
}

#[derive(Debug, Serialize, Deserialize)]
struct Message {
    role: String,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    choices: Vec<Choice>,
}

#[derive(Debug, Deserialize)]
struct Choice {
    message: Message,
}

#[derive(Debug, Deserialize)]
struct RawVerdict {
    verdict: String,
    #[serde(default)]
    reason: String,
}

/// Chat-completions adjudication client
pub struct AdjudicationClient {
    client: Client,
    config: AdjudicatorConfig,
}

impl AdjudicationClient {
    pub fn new(config: AdjudicatorConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;

        info!("Adjudication client: model={}", config.model);
        Ok(Self { client, config })
    }

    pub fn from_env() -> Result<Self> {
        Self::new(AdjudicatorConfig::default())
    }

    fn build_user_message(requirements: &str, payload: &str) -> String {
        format!(
            "--- JOB REQUIREMENTS ---\n{}\n\n--- SUBMITTED WORK ---\n{}",
            requirements, payload
        )
    }

    async fn call(&self, requirements: &str, payload: &str) -> Result<String> {
        let messages = vec![
            Message {
                role: "system".to_string(),
                content: JUDGE_SYSTEM_PROMPT.to_string(),
            },
            Message {
                role: "user".to_string(),
                content: Self::build_user_message(requirements, payload),
            },
        ];

        let resp = self
            .client
            .post(format!("{}/chat/completions", self.config.api_base))
            .header("Authorization", format!("Bearer {}", self.config.api_key))
            .header("Content-Type", "application/json")
            .json(&ChatRequest {
                model: self.config.model.clone(),
                messages,
                max_tokens: self.config.max_tokens,
                temperature: self.config.temperature,
            })
            .send()
            .await
            .context("adjudication request failed")?;

        if !resp.status().is_success() {
            let err = resp.text().await.unwrap_or_default();
            anyhow::bail!("adjudication provider error: {}", err);
        }

        let chat: ChatResponse = resp.json().await?;
        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.clone())
            .unwrap_or_default();

        debug!("Judge raw response: {}", content);
        Ok(content)
    }
}

/// Strip optional markdown fencing around the JSON object.
fn strip_code_fences(raw: &str) -> String {
    raw.replace("```json", "").replace("```", "").trim().to_string()
}

/// Normalize a raw judge reply into a canonical verdict. Anything that
/// is not exactly PASS or FAIL becomes FAIL.
fn parse_verdict(raw: &str) -> Verdict {
    let cleaned = strip_code_fences(raw);
    match serde_json::from_str::<RawVerdict>(&cleaned) {
        Ok(parsed) => match parsed.verdict.as_str() {
            "PASS" => Verdict::pass(parsed.reason),
            "FAIL" => Verdict::fail(parsed.reason),
            other => {
                warn!("Judge returned invalid verdict value: {:?}", other);
                Verdict::fail("AI error: invalid verdict format.")
            }
        },
        Err(_) => {
            warn!("Judge response was not valid JSON: {}", cleaned);
            Verdict::fail("System error: adjudicator response was not valid JSON.")
        }
    }
}

#[async_trait]
impl Adjudicator for AdjudicationClient {
    async fn evaluate(&self, requirements: &str, payload: &str) -> Verdict {
        match self.call(requirements, payload).await {
            Ok(raw) => parse_verdict(&raw),
            Err(e) => {
                warn!("Adjudication call failed: {:#}", e);
                Verdict::fail(format!("System error: {}", e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::VerdictKind;
    use httpmock::prelude::*;

    fn client_for(server: &MockServer) -> AdjudicationClient {
        AdjudicationClient::new(AdjudicatorConfig {
            api_base: server.base_url(),
            api_key: "test-key".to_string(),
            model: "test-model".to_string(),
            max_tokens: 256,
            temperature: 0.0,
            timeout_secs: 2,
        })
        .unwrap()
    }

    fn chat_body(content: &str) -> serde_json::Value {
        serde_json::json!({
            "choices": [{"message": {"role": "assistant", "content": content}}]
        })
    }

    #[tokio::test]
    async fn test_pass_verdict_parsed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .json_body(chat_body(r#"{"verdict": "PASS", "reason": "meets the goal"}"#));
        });

        let verdict = client_for(&server).evaluate("req", "work").await;
        assert_eq!(verdict.kind, VerdictKind::Pass);
        assert_eq!(verdict.reason, "meets the goal");
    }

    #[tokio::test]
    async fn test_fenced_json_is_stripped() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(chat_body(
                "```json\n{\"verdict\": \"FAIL\", \"reason\": \"empty submission\"}\n```",
            ));
        });

        let verdict = client_for(&server).evaluate("req", "").await;
        assert_eq!(verdict.kind, VerdictKind::Fail);
        assert_eq!(verdict.reason, "empty submission");
    }

    #[tokio::test]
    async fn test_invalid_verdict_value_fails_closed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200)
                .json_body(chat_body(r#"{"verdict": "MAYBE", "reason": "unsure"}"#));
        });

        let verdict = client_for(&server).evaluate("req", "work").await;
        assert_eq!(verdict.kind, VerdictKind::Fail);
        assert!(verdict.reason.contains("invalid verdict format"));
    }

    #[tokio::test]
    async fn test_non_json_reply_fails_closed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(200).json_body(chat_body("Looks good to me, PASS!"));
        });

        let verdict = client_for(&server).evaluate("req", "work").await;
        assert_eq!(verdict.kind, VerdictKind::Fail);
        assert!(verdict.reason.contains("not valid JSON"));
    }

    #[tokio::test]
    async fn test_provider_error_fails_closed() {
        let server = MockServer::start();
        server.mock(|when, then| {
            when.method(POST).path("/chat/completions");
            then.status(500).body("upstream exploded");
        });

        let verdict = client_for(&server).evaluate("req", "work").await;
        assert_eq!(verdict.kind, VerdictKind::Fail);
        assert!(verdict.reason.starts_with("System error:"));
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_fails_closed() {
        let client = AdjudicationClient::new(AdjudicatorConfig {
            api_base: "http://127.0.0.1:1".to_string(),
            api_key: String::new(),
            model: "m".to_string(),
            max_tokens: 16,
            temperature: 0.0,
            timeout_secs: 1,
        })
        .unwrap();

        let verdict = client.evaluate("req", "work").await;
        assert_eq!(verdict.kind, VerdictKind::Fail);
    }
}
