//! **Generation**: answers, subject classification and learning summaries through an
//! OpenAI-compatible chat completions API (OpenRouter by default).

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::debug;
use vani_core::config::{env_first, env_opt_string};
use vani_core::{Generator, ProviderError, ProviderResult, QaPair};

use crate::error::{VoiceError, VoiceResult};

const DEFAULT_LLM_URL: &str = "https://openrouter.ai/api/v1";
const DEFAULT_LLM_MODEL: &str = "google/gemini-2.5-flash";

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Serialize)]
struct ChatMessage {
    role: &'static str,
    content: String,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessageResponse,
}

#[derive(Deserialize)]
struct ChatMessageResponse {
    #[serde(default)]
    content: Option<String>,
}

pub(crate) fn answer_prompt(question: &str) -> String {
    format!(
        "You are an educational assistant. Answer this question clearly and concisely in 2-3 \
         sentences suitable for voice response: {question}"
    )
}

pub(crate) fn classify_prompt(question: &str, labels: &[&str]) -> String {
    let list = labels
        .iter()
        .map(|l| format!("- {l}"))
        .collect::<Vec<_>>()
        .join("\n");
    format!(
        "You are an educational subject classifier. Identify the specific school-level subject \
         this question belongs to.\n\nQuestion: \"{question}\"\n\nSubjects:\n{list}\n\n\
         Return ONLY one subject name from the list, nothing else. If it is a general knowledge \
         question, return \"General Knowledge\".\n\nSubject:"
    )
}

pub(crate) fn summary_prompt(subject: &str, history: &[QaPair]) -> String {
    let pairs = history
        .iter()
        .enumerate()
        .map(|(i, p)| format!("{}. Q: {}\nA: {}", i + 1, p.question, p.answer))
        .collect::<Vec<_>>()
        .join("\n\n");
    format!(
        "Here are the user's previous {subject} questions and answers:\n{pairs}\n\n\
         Give a short and simple summary of what the user has learned so far in {subject}. \
         Keep it under 100 words and suitable for voice response."
    )
}

/// Chat-completions client. Uses `LLM_API_URL`, `LLM_API_KEY` (or `OPENROUTER_API_KEY`), `LLM_MODEL`.
pub struct OpenRouterGenerator {
    base_url: String,
    api_key: String,
    model: String,
    client: reqwest::Client,
}

impl OpenRouterGenerator {
    pub fn from_env() -> VoiceResult<Self> {
        let api_key = env_first(&["LLM_API_KEY", "OPENROUTER_API_KEY"]).ok_or_else(|| {
            VoiceError::Config("generation requires LLM_API_KEY or OPENROUTER_API_KEY".to_string())
        })?;
        let base_url = env_opt_string("LLM_API_URL").unwrap_or_else(|| DEFAULT_LLM_URL.to_string());
        let model = env_opt_string("LLM_MODEL").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string());
        Self::new(base_url, api_key, model)
    }

    pub fn new(
        base_url: impl Into<String>,
        api_key: impl Into<String>,
        model: impl Into<String>,
    ) -> VoiceResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| VoiceError::Llm(e.to_string()))?;
        Ok(Self {
            base_url: base_url.into(),
            api_key: api_key.into().trim().to_string(),
            model: model.into(),
            client,
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    async fn complete(&self, prompt: String, max_tokens: u32) -> VoiceResult<String> {
        let url = format!("{}/chat/completions", self.base_url.trim_end_matches('/'));
        let body = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage { role: "user", content: prompt }],
            temperature: Some(0.3),
            max_tokens: Some(max_tokens),
        };
        let res = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .header("X-Title", "Vidya Vani")
            .json(&body)
            .send()
            .await
            .map_err(|e| VoiceError::Llm(format!("request failed: {e}")))?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(VoiceError::Llm(format!("API error {status}: {body}")));
        }
        let parsed: ChatResponse = res
            .json()
            .await
            .map_err(|e| VoiceError::Llm(format!("response parse failed: {e}")))?;
        let text = parsed
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .map(|t| t.trim().to_string())
            .unwrap_or_default();
        if text.is_empty() {
            return Err(VoiceError::Llm("empty completion".to_string()));
        }
        debug!(target: "vani::voice", model = %self.model, chars = text.len(), "completion received");
        Ok(text)
    }
}

#[async_trait]
impl Generator for OpenRouterGenerator {
    fn is_available(&self) -> bool {
        true
    }

    async fn answer(&self, question: &str) -> ProviderResult<String> {
        Ok(self.complete(answer_prompt(question), 256).await?)
    }

    async fn classify(&self, question: &str, labels: &[&str]) -> ProviderResult<String> {
        Ok(self.complete(classify_prompt(question, labels), 16).await?)
    }

    async fn summarize(&self, subject: &str, history: &[QaPair]) -> ProviderResult<String> {
        Ok(self.complete(summary_prompt(subject, history), 256).await?)
    }
}

/// Stand-in when no LLM key is configured. Never available.
#[derive(Debug, Default)]
pub struct UnconfiguredGenerator;

#[async_trait]
impl Generator for UnconfiguredGenerator {
    fn is_available(&self) -> bool {
        false
    }

    async fn answer(&self, _question: &str) -> ProviderResult<String> {
        Err(not_configured())
    }

    async fn classify(&self, _question: &str, _labels: &[&str]) -> ProviderResult<String> {
        Err(not_configured())
    }

    async fn summarize(&self, _subject: &str, _history: &[QaPair]) -> ProviderResult<String> {
        Err(not_configured())
    }
}

fn not_configured() -> ProviderError {
    ProviderError::GenerationUnavailable("LLM_API_KEY not set".to_string())
}

/// Pick the best generator the environment allows.
pub fn create_best_generator() -> Box<dyn Generator> {
    match OpenRouterGenerator::from_env() {
        Ok(g) => Box::new(g),
        Err(e) => {
            debug!(target: "vani::voice", error = %e, "generation not configured");
            Box::new(UnconfiguredGenerator)
        }
    }
}
