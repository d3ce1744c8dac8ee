//! Remote-model fallback: prompt construction, the HTTP call, and strict
//! validation of the JSON reply into an `ExtractedTransaction`.
//!
//! This component never propagates errors — every transport or parse
//! failure becomes `None` and the orchestrator falls back to rules.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{bail, Context, Result};
use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use serde::{Deserialize, Serialize};

use plata_core::transaction::{Category, Direction, ExtractedTransaction, ExtractionMethod};

use crate::rate_limit::RateLimiter;

/// Short-form extraction, not generation: keep the completion tight.
const MAX_TOKENS: u32 = 300;
const TEMPERATURE: f32 = 0.1;
const REQUEST_TIMEOUT: Duration = Duration::from_secs(8);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Provider {
    Anthropic,
    OpenAI,
}

#[derive(Debug, Clone)]
pub struct ModelConfig {
    pub provider: Provider,
    pub model: String,
    pub api_key: String,
}

impl ModelConfig {
    /// Pick a provider from the environment. `None` means the model path
    /// is unavailable — not an error; the caller runs rules-only.
    pub fn from_env() -> Option<ModelConfig> {
        if let Ok(key) = std::env::var("ANTHROPIC_API_KEY") {
            if !key.is_empty() {
                return Some(ModelConfig {
                    provider: Provider::Anthropic,
                    model: "claude-3-5-haiku-latest".to_string(),
                    api_key: key,
                });
            }
        }
        if let Ok(key) = std::env::var("OPENAI_API_KEY") {
            if !key.is_empty() {
                return Some(ModelConfig {
                    provider: Provider::OpenAI,
                    model: "gpt-4o-mini".to_string(),
                    api_key: key,
                });
            }
        }
        None
    }
}

/// Fixed instruction sent on every call. JSON-only output, the slang
/// multiplier rule, the closed category set, and two worked examples.
pub const SYSTEM_PROMPT: &str = r#"Sos un asistente que extrae transacciones financieras de mensajes informales en español paraguayo.

Respondé ÚNICAMENTE con un objeto JSON, sin texto adicional, con esta forma exacta:
{"amount": number|null, "type": "expense"|"income"|"transfer", "category": string|null, "merchant": string|null, "notes": string|null, "confidence": number}

Reglas:
- "mil", "lucas" y "k" multiplican por 1000 (ej: "50 mil" = 50000, "5k" = 5000).
- Si la dirección no está clara, usá "expense".
- "category" debe ser una de: supermercado, comida, transporte, servicios, salud, entretenimiento, educacion, hogar, otros. Si ninguna aplica, null.
- "confidence" entre 0 y 1 según cuántos campos pudiste extraer.

Ejemplos:
Mensaje: "gasté 50 mil en biggie"
{"amount": 50000, "type": "expense", "category": "supermercado", "merchant": "biggie", "notes": null, "confidence": 0.95}

Mensaje: "me depositaron el sueldo"
{"amount": null, "type": "income", "category": null, "merchant": null, "notes": "sueldo", "confidence": 0.6}"#;

/// Seam between the model client and the network, so tests can mock the
/// round-trip.
pub trait ChatTransport: Send + Sync {
    fn complete(
        &self,
        config: &ModelConfig,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String>> + Send;
}

/// Real HTTPS transport with a bounded timeout. A stuck call must never
/// block the user-visible flow.
pub struct HttpTransport {
    client: reqwest::Client,
}

impl HttpTransport {
    pub fn new() -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .context("build http client")?;
        Ok(Self { client })
    }
}

impl ChatTransport for HttpTransport {
    fn complete(
        &self,
        config: &ModelConfig,
        system: &str,
        user: &str,
    ) -> impl Future<Output = Result<String>> + Send {
        let config = config.clone();
        let system = system.to_string();
        let user = user.to_string();
        let client = self.client.clone();
        async move {
            match config.provider {
                Provider::Anthropic => anthropic_complete(&client, &config, &system, &user).await,
                Provider::OpenAI => openai_complete(&client, &config, &system, &user).await,
            }
        }
    }
}

async fn anthropic_complete(
    client: &reqwest::Client,
    config: &ModelConfig,
    system: &str,
    user: &str,
) -> Result<String> {
    #[derive(Serialize)]
    struct Msg {
        role: String,
        content: String,
    }

    #[derive(Serialize)]
    struct Req {
        model: String,
        max_tokens: u32,
        temperature: f32,
        system: String,
        messages: Vec<Msg>,
    }

    #[derive(Deserialize)]
    struct Resp {
        content: Vec<ContentBlock>,
    }

    #[derive(Deserialize)]
    struct ContentBlock {
        #[serde(rename = "type")]
        t: String,
        text: Option<String>,
    }

    let body = Req {
        model: config.model.clone(),
        max_tokens: MAX_TOKENS,
        temperature: TEMPERATURE,
        system: system.to_string(),
        messages: vec![Msg {
            role: "user".to_string(),
            content: user.to_string(),
        }],
    };

    let mut headers = HeaderMap::new();
    headers.insert("x-api-key", HeaderValue::from_str(&config.api_key)?);
    headers.insert("anthropic-version", HeaderValue::from_static("2023-06-01"));
    headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

    let resp = client
        .post("https://api.anthropic.com/v1/messages")
        .headers(headers)
        .json(&body)
        .send()
        .await
        .context("anthropic request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("anthropic error: {status} {txt}");
    }

    let out: Resp = resp.json().await.context("parse anthropic response")?;
    let mut s = String::new();
    for b in out.content {
        if b.t == "text" {
            if let Some(t) = b.text {
                s.push_str(&t);
            }
        }
    }
    Ok(s.trim().to_string())
}

async fn openai_complete(
    client: &reqwest::Client,
    config: &ModelConfig,
    system: &str,
    user: &str,
) -> Result<String> {
    #[derive(Serialize)]
    struct Msg {
        role: String,
        content: String,
    }

    #[derive(Serialize)]
    struct RespFormat {
        #[serde(rename = "type")]
        kind: &'static str,
    }

    #[derive(Serialize)]
    struct Req {
        model: String,
        messages: Vec<Msg>,
        temperature: f32,
        max_tokens: u32,
        response_format: RespFormat,
    }

    #[derive(Deserialize)]
    struct Resp {
        choices: Vec<Choice>,
    }

    #[derive(Deserialize)]
    struct Choice {
        message: MsgOut,
    }

    #[derive(Deserialize)]
    struct MsgOut {
        content: Option<String>,
    }

    let body = Req {
        model: config.model.clone(),
        messages: vec![
            Msg {
                role: "system".to_string(),
                content: system.to_string(),
            },
            Msg {
                role: "user".to_string(),
                content: user.to_string(),
            },
        ],
        temperature: TEMPERATURE,
        max_tokens: MAX_TOKENS,
        response_format: RespFormat { kind: "json_object" },
    };

    let resp = client
        .post("https://api.openai.com/v1/chat/completions")
        .header(AUTHORIZATION, format!("Bearer {}", config.api_key))
        .json(&body)
        .send()
        .await
        .context("openai request")?;

    let status = resp.status();
    if !status.is_success() {
        let txt = resp.text().await.unwrap_or_default();
        bail!("openai error: {status} {txt}");
    }

    let out: Resp = resp.json().await.context("parse openai response")?;
    let content = out
        .choices
        .first()
        .and_then(|c| c.message.content.clone())
        .unwrap_or_default();

    Ok(content.trim().to_string())
}

/// Thin wrapper tying a transport, a config and the shared budget together.
pub struct ModelClient<T: ChatTransport> {
    transport: T,
    config: ModelConfig,
    limiter: Arc<RateLimiter>,
}

impl<T: ChatTransport> ModelClient<T> {
    pub fn new(transport: T, config: ModelConfig, limiter: Arc<RateLimiter>) -> Self {
        Self {
            transport,
            config,
            limiter,
        }
    }

    pub fn limiter(&self) -> &Arc<RateLimiter> {
        &self.limiter
    }

    /// One model round-trip. `None` on budget denial, transport failure or
    /// an invalid reply. Budget is consumed even when the call later
    /// fails, so retries cannot storm the provider.
    pub async fn extract(&self, message: &str) -> Option<ExtractedTransaction> {
        if !self.limiter.can_proceed() {
            tracing::debug!("model call denied by budget");
            return None;
        }
        self.limiter.record();

        match self
            .transport
            .complete(&self.config, SYSTEM_PROMPT, message)
            .await
        {
            Ok(raw) => {
                let parsed = parse_model_reply(&raw, message);
                if parsed.is_none() {
                    tracing::warn!(raw = %truncate(&raw, 200), "model reply rejected");
                }
                parsed
            }
            Err(e) => {
                tracing::warn!(error = %e, "model request failed");
                None
            }
        }
    }
}

impl ModelClient<HttpTransport> {
    /// Client from environment credentials; `None` when no key is set.
    pub fn from_env(limiter: Arc<RateLimiter>) -> Result<Option<Self>> {
        match ModelConfig::from_env() {
            Some(config) => Ok(Some(Self::new(HttpTransport::new()?, config, limiter))),
            None => Ok(None),
        }
    }
}

fn truncate(s: &str, max: usize) -> &str {
    match s.char_indices().nth(max) {
        Some((idx, _)) => &s[..idx],
        None => s,
    }
}

/// Validate a raw model reply into the canonical shape.
///
/// Rejections (→ `None`): not a JSON object, or `type` is not one of the
/// three directions. A missing or out-of-range `confidence` defaults to
/// 0.5 instead of rejecting.
pub fn parse_model_reply(raw: &str, original_message: &str) -> Option<ExtractedTransaction> {
    // Models like to wrap JSON in markdown fences.
    let cleaned = raw
        .trim()
        .trim_start_matches("```json")
        .trim_start_matches("```")
        .trim_end_matches("```")
        .trim();

    let value: serde_json::Value = serde_json::from_str(cleaned).ok()?;
    let obj = value.as_object()?;

    let direction = Direction::parse(obj.get("type")?.as_str()?)?;

    let amount = obj
        .get("amount")
        .and_then(|v| v.as_f64())
        .filter(|a| a.is_finite() && *a > 0.0)
        .map(|a| a.round() as u64);

    let category = obj
        .get("category")
        .and_then(|v| v.as_str())
        .and_then(Category::parse_label);

    let merchant = obj
        .get("merchant")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let notes = obj
        .get("notes")
        .and_then(|v| v.as_str())
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty());

    let confidence = obj
        .get("confidence")
        .and_then(|v| v.as_f64())
        .filter(|c| (0.0..=1.0).contains(c))
        .unwrap_or(0.5);

    Some(ExtractedTransaction {
        amount,
        direction,
        category,
        merchant,
        notes,
        confidence,
        method: ExtractionMethod::Model,
        original_message: original_message.to_string(),
    })
}
