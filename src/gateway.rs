//! Text completion against the Anthropic Messages API.
//!
//! One attempt per call, bounded by the client timeout. Every failure is
//! logged here and reported to the caller only as `None`.

use std::time::Duration;

use reqwest::blocking::Client as HttpClient;
use serde::Serialize;
use serde_json::Value;

use crate::error::{Result, TallyError};
use crate::settings::ModelSettings;

const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const ANTHROPIC_VERSION: &str = "2023-06-01";

pub trait ModelGateway {
    fn complete(&self, system_prompt: &str, user_text: &str) -> Option<String>;
}

#[derive(Serialize)]
struct Message<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Serialize)]
struct MessagesRequest<'a> {
    model: &'a str,
    max_tokens: u32,
    system: &'a str,
    messages: Vec<Message<'a>>,
}

pub struct AnthropicGateway {
    http: HttpClient,
    endpoint: String,
    model: String,
    api_key: Option<String>,
    max_tokens: u32,
}

impl AnthropicGateway {
    pub fn from_settings(cfg: &ModelSettings) -> Result<Self> {
        let http = HttpClient::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .timeout(Duration::from_secs(cfg.timeout_secs))
            .build()
            .map_err(|e| TallyError::Settings(format!("failed to build HTTP client: {e}")))?;
        let api_key = std::env::var(&cfg.api_key_env)
            .ok()
            .filter(|k| !k.trim().is_empty());
        Ok(Self {
            http,
            endpoint: cfg.endpoint.clone(),
            model: cfg.model.clone(),
            api_key,
            max_tokens: cfg.max_tokens,
        })
    }

    fn send(&self, api_key: &str, system_prompt: &str, user_text: &str) -> Option<String> {
        let body = MessagesRequest {
            model: &self.model,
            max_tokens: self.max_tokens,
            system: system_prompt,
            messages: vec![Message { role: "user", content: user_text }],
        };
        let response = match self
            .http
            .post(&self.endpoint)
            .header("x-api-key", api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&body)
            .send()
        {
            Ok(r) => r,
            Err(e) => {
                tracing::error!(endpoint = %self.endpoint, timeout = e.is_timeout(), error = %e, "model request failed");
                return None;
            }
        };

        let status = response.status();
        if !status.is_success() {
            let body_text = response.text().unwrap_or_default();
            tracing::error!(status = status.as_u16(), body = %body_text, "model API error");
            return None;
        }

        match response.json::<Value>() {
            Ok(value) => extract_text(&value),
            Err(e) => {
                tracing::error!(error = %e, "model response was not JSON");
                None
            }
        }
    }
}

impl ModelGateway for AnthropicGateway {
    fn complete(&self, system_prompt: &str, user_text: &str) -> Option<String> {
        let Some(api_key) = self.api_key.as_deref() else {
            tracing::error!("model API key is not configured");
            return None;
        };
        self.send(api_key, system_prompt, user_text)
    }
}

fn extract_text(body: &Value) -> Option<String> {
    let text = body.pointer("/content/0/text").and_then(Value::as_str);
    if text.is_none() {
        tracing::error!(body = %body, "model response had no text content");
    }
    text.map(str::to_string)
}
