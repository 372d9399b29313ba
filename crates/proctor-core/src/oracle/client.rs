//! Advisory oracle client and decision adapter.

use async_trait::async_trait;
use serde_json::json;
use std::sync::Arc;
use tracing::{debug, warn};

use crate::domain::{DecisionResult, ViolationEvent};
use crate::metrics::METRICS;

use super::reply::{normalize_reply, parse_decision};

/// Fixed instruction contract sent with every consultation. The oracle
/// must answer with exactly one token on the first line; everything else
/// about the reply is treated as untrusted and parsed defensively.
const SYSTEM_PROMPT: &str = "\
You are an automated exam proctoring agent. You will receive a JSON array of violation events.
You MUST reply with a single line containing exactly one of these tokens:
  - END_EXAM
  - FLASH_WARNING
  - IGNORE

Apply these rules strictly:
  1) If one or more CRITICAL-level violations exist in the provided list, return END_EXAM.
  2) If three or more MAJOR-level violations occurred within a short time window, return END_EXAM.
  3) If five or more WARNING-level violations are present, return FLASH_WARNING.
  4) Otherwise return IGNORE.

After the token you MAY add, on the next line, a short reason (one sentence).
The first line must be exactly the token above. Do not return anything else.";

/// Transport to the advisory oracle.
///
/// Implementations return the raw response value; shape normalization and
/// token extraction happen in the adapter, so a transport never needs to
/// understand the reply.
#[async_trait]
pub trait OracleClient: Send + Sync {
    /// Send one consultation and return the raw response.
    async fn advise(&self, system: &str, user: &str) -> anyhow::Result<serde_json::Value>;
}

/// Oracle transport configuration.
#[derive(Debug, Clone)]
pub struct OracleConfig {
    /// Chat-completions style endpoint URL.
    pub endpoint: String,
    /// Model identifier sent with each request.
    pub model: String,
    /// Bearer token, if the endpoint requires one.
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
}

impl Default for OracleConfig {
    fn default() -> Self {
        Self {
            endpoint: std::env::var("PROCTOR_ORACLE_URL")
                .unwrap_or_else(|_| "http://localhost:11434/v1/chat/completions".to_string()),
            model: std::env::var("PROCTOR_ORACLE_MODEL").unwrap_or_else(|_| "llama3".to_string()),
            api_key: std::env::var("PROCTOR_ORACLE_API_KEY").ok(),
            timeout_secs: 30,
        }
    }
}

impl OracleConfig {
    /// Create a config from environment variables.
    pub fn from_env() -> Self {
        Self::default()
    }

    pub fn new(endpoint: &str, model: &str) -> Self {
        Self {
            endpoint: endpoint.to_string(),
            model: model.to_string(),
            api_key: None,
            timeout_secs: 30,
        }
    }

    /// Set the bearer token.
    pub fn with_api_key(mut self, key: &str) -> Self {
        self.api_key = Some(key.to_string());
        self
    }
}

/// HTTP transport posting to a chat-completions style endpoint.
pub struct HttpOracleClient {
    config: OracleConfig,
    http_client: reqwest::Client,
}

impl HttpOracleClient {
    pub fn new(config: OracleConfig) -> Self {
        let http_client = reqwest::Client::builder()
            .user_agent("proctor-core/0.2.0")
            .timeout(std::time::Duration::from_secs(config.timeout_secs))
            .build()
            .expect("Failed to create HTTP client");

        Self {
            config,
            http_client,
        }
    }

    /// Create a client from environment variables.
    pub fn from_env() -> Self {
        Self::new(OracleConfig::from_env())
    }
}

#[async_trait]
impl OracleClient for HttpOracleClient {
    async fn advise(&self, system: &str, user: &str) -> anyhow::Result<serde_json::Value> {
        let body = json!({
            "model": self.config.model,
            "temperature": 0,
            "messages": [
                { "role": "system", "content": system },
                { "role": "user", "content": user },
            ],
        });

        let mut request = self.http_client.post(&self.config.endpoint).json(&body);
        if let Some(key) = &self.config.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await?.error_for_status()?;
        Ok(response.json::<serde_json::Value>().await?)
    }
}

/// The decision adapter: formats a bounded window of events, consults the
/// oracle, and resolves the reply to a strict [`DecisionResult`].
///
/// `analyze` never fails: transport and formatting errors degrade to
/// `IGNORE` with the cause captured for audit. Availability beats missed
/// escalations here; do not invert without revisiting the policy.
#[derive(Clone)]
pub struct DecisionOracle {
    client: Arc<dyn OracleClient>,
}

impl DecisionOracle {
    pub fn new(client: Arc<dyn OracleClient>) -> Self {
        Self { client }
    }

    /// Consult the oracle about the given windowed slice of events.
    pub async fn analyze(&self, events: &[ViolationEvent]) -> DecisionResult {
        METRICS.inc_oracle_calls();

        let payload = match serde_json::to_string_pretty(events) {
            Ok(json) => json,
            Err(e) => {
                METRICS.inc_oracle_failures();
                warn!(error = %e, "failed to serialize violation window");
                return DecisionResult::fail_open(e);
            }
        };
        let user = format!("Violations:\n{payload}");

        match self.client.advise(SYSTEM_PROMPT, &user).await {
            Ok(value) => {
                let raw = normalize_reply(&value);
                let result = parse_decision(&raw);
                debug!(decision = %result.decision, "oracle replied");
                result
            }
            Err(e) => {
                METRICS.inc_oracle_failures();
                warn!(error = %e, "oracle invoke failed, degrading to IGNORE");
                DecisionResult::fail_open(e)
            }
        }
    }
}
