//! Backend response envelope

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Success envelope returned by the backend.
///
/// The failure side of the same envelope travels as
/// [`CallError::Http`](crate::CallError::Http); both carry the status plus a
/// heading/message pair so callers see one consistent shape either way.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiResponse {
    /// Numeric status code from the backend.
    pub status: u16,
    /// Short human-readable heading.
    pub heading: String,
    /// Detailed human-readable message.
    pub message: String,
    /// JSON payload; `null` when the endpoint returns nothing.
    #[serde(default)]
    pub data: Value,
}

impl ApiResponse {
    /// Decode the `data` payload into a typed value.
    pub fn data_as<T: DeserializeOwned>(&self) -> Result<T, serde_json::Error> {
        serde_json::from_value(self.data.clone())
    }
}
