//! Remote risk classifier - chat-completions inference service
//!
//! Sends the three sensor values in a single user message and expects the
//! first choice's content to be a JSON object such as
//! `{"risk_level": "critical"}`.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{ClassifyError, RiskClassifier};
use crate::config::ClassifierConfig;
use crate::types::{RiskTier, SensorReading};

/// HTTP client for the classification service.
#[derive(Clone)]
pub struct RemoteClassifier {
    http: reqwest::Client,
    endpoint: String,
    model: String,
    api_key: String,
    timeout: Duration,
}

impl std::fmt::Debug for RemoteClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RemoteClassifier")
            .field("endpoint", &self.endpoint)
            .field("model", &self.model)
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct ChatMessage {
    role: String,
    content: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage>,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatMessage,
}

#[derive(Deserialize)]
struct RiskPayload {
    risk_level: String,
}

impl RemoteClassifier {
    /// Build a client with the configured request timeout.
    pub fn new(config: &ClassifierConfig, api_key: impl Into<String>) -> Result<Self, ClassifyError> {
        let timeout = config.timeout();
        let http = reqwest::Client::builder().timeout(timeout).build()?;

        Ok(Self {
            http,
            endpoint: config.endpoint.trim_end_matches('/').to_string(),
            model: config.model.clone(),
            api_key: api_key.into(),
            timeout,
        })
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }
}

#[async_trait]
impl RiskClassifier for RemoteClassifier {
    async fn classify(&self, reading: &SensorReading) -> Result<RiskTier, ClassifyError> {
        let request = ChatRequest {
            model: &self.model,
            messages: vec![ChatMessage {
                role: "user".to_string(),
                content: build_prompt(reading),
            }],
        };

        let resp = self
            .http
            .post(&self.endpoint)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        if !resp.status().is_success() {
            return Err(ClassifyError::Status(resp.status()));
        }

        let body = resp.bytes().await.map_err(|e| self.map_transport(e))?;
        let chat: ChatResponse = serde_json::from_slice(&body)
            .map_err(|e| ClassifyError::Parse(format!("response body: {e}")))?;

        let content = chat
            .choices
            .first()
            .map(|c| c.message.content.as_str())
            .ok_or_else(|| ClassifyError::Parse("no choices in response".to_string()))?;

        parse_tier_content(content)
    }

    fn backend_name(&self) -> &'static str {
        "remote"
    }
}

impl RemoteClassifier {
    fn map_transport(&self, e: reqwest::Error) -> ClassifyError {
        if e.is_timeout() {
            ClassifyError::Timeout(self.timeout)
        } else {
            ClassifyError::Transport(e)
        }
    }
}

/// Prompt sent to the model for one sample.
pub fn build_prompt(reading: &SensorReading) -> String {
    format!(
        "Sensor reading: Temperature={}, Vibration={}, Gas={}.\n\
         Classify risk as one of: normal, warning, critical. \
         Return JSON like {{ \"risk_level\": \"critical\" }} only.",
        reading.temperature, reading.vibration, reading.gas_level
    )
}

/// Parse the model's message content into a tier.
pub fn parse_tier_content(content: &str) -> Result<RiskTier, ClassifyError> {
    let payload: RiskPayload = serde_json::from_str(content.trim())
        .map_err(|e| ClassifyError::Parse(format!("content '{}': {e}", content.trim())))?;
    payload
        .risk_level
        .parse()
        .map_err(|e: crate::types::UnknownTier| ClassifyError::Parse(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::MachineId;
    use chrono::Utc;

    fn sample() -> SensorReading {
        SensorReading {
            machine_id: MachineId::new("M1"),
            temperature: 95.5,
            vibration: 1.25,
            gas_level: 2.0,
            timestamp: Utc::now(),
            tick: 1,
        }
    }

    #[test]
    fn test_prompt_embeds_values() {
        let prompt = build_prompt(&sample());
        assert!(prompt.contains("Temperature=95.5"));
        assert!(prompt.contains("Vibration=1.25"));
        assert!(prompt.contains("Gas=2"));
        assert!(prompt.contains("normal, warning, critical"));
    }

    #[test]
    fn test_parse_content_variants() {
        assert_eq!(
            parse_tier_content(r#"{"risk_level": "critical"}"#).unwrap(),
            RiskTier::Critical
        );
        assert_eq!(
            parse_tier_content("  {\"risk_level\":\"Warning\"}\n").unwrap(),
            RiskTier::Warning
        );
        assert_eq!(
            parse_tier_content(r#"{"risk_level": "normal", "why": "fine"}"#).unwrap(),
            RiskTier::Normal
        );
    }

    #[test]
    fn test_parse_content_rejects_garbage() {
        for bad in [
            "critical",
            r#"{"level": "critical"}"#,
            r#"{"risk_level": "severe"}"#,
            "```json\n{\"risk_level\": \"critical\"}\n```",
            "",
        ] {
            let err = parse_tier_content(bad).unwrap_err();
            assert!(matches!(err, ClassifyError::Parse(_)), "{bad:?} -> {err}");
            assert!(!err.is_transport());
        }
    }

    #[test]
    fn test_client_trims_endpoint() {
        let config = ClassifierConfig {
            endpoint: "http://localhost:9000/v1/chat/completions/".to_string(),
            ..ClassifierConfig::default()
        };
        let client = RemoteClassifier::new(&config, "secret-token").unwrap();
        assert_eq!(client.endpoint(), "http://localhost:9000/v1/chat/completions");
        assert!(!format!("{client:?}").contains("secret-token"));
    }
}
