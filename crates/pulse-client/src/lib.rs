//! `pulse-client` — HTTP transport for the pulse backends.
//!
//! Both the primary tracker and the secondary source-control host speak
//! GraphQL over HTTPS with bearer tokens, so one [`GraphQlClient`] serves
//! both. It implements [`pulse_core::executor::QueryExecutor`], which is the
//! only thing the aggregation engine sees.
//!
//! ```rust,ignore
//! use pulse_client::GraphQlClient;
//! use pulse_core::config::BackendConfig;
//!
//! let primary = GraphQlClient::from_config("primary", &BackendConfig::primary_default())?;
//! let data = primary.query("query { viewer { id } }", serde_json::json!({})).await?;
//! ```
//!
//! No retries: a failed request surfaces as an error on the first attempt.

pub mod error;
pub mod graphql;


pub use error::ClientError;
pub use graphql::GraphQlClient;

/// Convenience `Result` alias for this crate.
pub type Result<T> = std::result::Result<T, ClientError>;
