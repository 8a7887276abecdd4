use crate::error::ClientError;
use futures::future::BoxFuture;
use pulse_core::config::BackendConfig;
use pulse_core::executor::QueryExecutor;
use pulse_core::PulseError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::time::{Duration, Instant};
use tracing::debug;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

/// Longest slice of an error body kept in [`ClientError::Status`].
const ERROR_BODY_LIMIT: usize = 300;

#[derive(Debug, Deserialize)]
struct Response {
    #[serde(default)]
    data: Option<Value>,
    #[serde(default)]
    errors: Option<Vec<ErrorEntry>>,
}

#[derive(Debug, Deserialize)]
struct ErrorEntry {
    message: String,
}

/// Bearer-token GraphQL client for one backend.
#[derive(Debug, Clone)]
pub struct GraphQlClient {
    http: reqwest::Client,
    endpoint: String,
    token: String,
    /// Backend name used in logs and errors.
    label: String,
}

impl GraphQlClient {
    pub fn new(
        label: impl Into<String>,
        endpoint: impl Into<String>,
        token: impl Into<String>,
    ) -> crate::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent(concat!("pulse/", env!("CARGO_PKG_VERSION")))
            .timeout(REQUEST_TIMEOUT)
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.into(),
            token: token.into(),
            label: label.into(),
        })
    }

    /// Build a client from config, reading the token from the process
    /// environment.
    pub fn from_config(label: &str, cfg: &BackendConfig) -> pulse_core::Result<Self> {
        Self::from_config_with(label, cfg, |name| std::env::var(name).ok())
    }

    /// Like [`from_config`](Self::from_config) with a custom variable lookup.
    pub fn from_config_with(
        label: &str,
        cfg: &BackendConfig,
        lookup: impl Fn(&str) -> Option<String>,
    ) -> pulse_core::Result<Self> {
        let token = lookup(&cfg.token_env)
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
            .ok_or_else(|| PulseError::MissingToken(cfg.token_env.clone()))?;
        Ok(Self::new(label, cfg.endpoint.clone(), token)?)
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    /// POST one query and return its `data` object.
    pub async fn query(&self, query: &str, variables: Value) -> crate::Result<Value> {
        let started = Instant::now();
        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.token)
            .json(&json!({"query": query, "variables": variables}))
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ClientError::Status {
                backend: self.label.clone(),
                status: status.as_u16(),
                body: body.chars().take(ERROR_BODY_LIMIT).collect(),
            });
        }

        let body: Response = response.json().await?;
        debug!(
            backend = %self.label,
            operation = operation_name(query),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "query complete"
        );

        if let Some(errors) = body.errors.filter(|e| !e.is_empty()) {
            return Err(ClientError::GraphQl {
                backend: self.label.clone(),
                messages: errors.into_iter().map(|e| e.message).collect(),
            });
        }
        match body.data {
            Some(Value::Null) | None => Err(ClientError::MissingData(self.label.clone())),
            Some(data) => Ok(data),
        }
    }
}

impl QueryExecutor for GraphQlClient {
    fn execute<'a>(
        &'a self,
        query: &'a str,
        variables: Value,
    ) -> BoxFuture<'a, pulse_core::Result<Value>> {
        Box::pin(async move { Ok(self.query(query, variables).await?) })
    }
}

/// `query Foo(...)` → `Foo`, for logging.
fn operation_name(query: &str) -> &str {
    query
        .split_whitespace()
        .skip_while(|w| *w != "query")
        .nth(1)
        .and_then(|w| w.split('(').next())
        .unwrap_or("anonymous")
}
