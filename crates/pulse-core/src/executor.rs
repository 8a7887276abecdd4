use crate::error::{PulseError, Result};
use futures::future::BoxFuture;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;

/// Sends one parameterized GraphQL query to a backend.
///
/// Implementations return the response's `data` object; transport failures and
/// GraphQL-level errors surface as [`PulseError::Transport`]. Retries, if any,
/// belong to the implementation.
pub trait QueryExecutor: Send + Sync {
    fn execute<'a>(&'a self, query: &'a str, variables: Value) -> BoxFuture<'a, Result<Value>>;
}

/// Deserialize the value at a JSON pointer inside a response.
pub fn decode<T: DeserializeOwned>(data: &Value, pointer: &str) -> Result<T> {
    let value = data
        .pointer(pointer)
        .ok_or_else(|| PulseError::MissingData(pointer.to_string()))?;
    Ok(T::deserialize(value)?)
}

/// Like [`decode`], but an absent or `null` value is `None`.
pub fn decode_optional<T: DeserializeOwned>(data: &Value, pointer: &str) -> Result<Option<T>> {
    match data.pointer(pointer) {
        None | Some(Value::Null) => Ok(None),
        Some(value) => Ok(Some(T::deserialize(value)?)),
    }
}

// ---------------------------------------------------------------------------
// Shared GraphQL shapes
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PageInfo {
    #[serde(default)]
    pub has_next_page: bool,
    #[serde(default)]
    pub end_cursor: Option<String>,
}

impl PageInfo {
    /// Cursor for the following page, if there is one.
    pub fn next_cursor(&self) -> Option<&str> {
        if self.has_next_page {
            self.end_cursor.as_deref()
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Connection<T> {
    #[serde(default = "Vec::new")]
    pub nodes: Vec<T>,
    #[serde(default)]
    pub page_info: Option<PageInfo>,
}

impl<T> Connection<T> {
    pub fn next_cursor(&self) -> Option<&str> {
        self.page_info.as_ref().and_then(PageInfo::next_cursor)
    }
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self {
            nodes: Vec::new(),
            page_info: None,
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Login {
    pub login: String,
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
