//! BookNet response envelope
//!
//! Every API response is wrapped as `{ success, message, data, timestamp }`.
//! `data` is absent on most failures and on some successful mutations
//! (deletes), so it is modelled as an `Option`.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Envelope<T> {
    pub success: bool,
    #[serde(default)]
    pub message: String,
    pub data: Option<T>,
    /// Server time in milliseconds since the unix epoch
    #[serde(default)]
    pub timestamp: i64,
}

impl<T> Envelope<T> {
    /// Build a failed envelope carrying only a message.
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
            data: None,
            timestamp: 0,
        }
    }

    /// Split into the payload or the server's message.
    ///
    /// `Ok(None)` is a successful response without data.
    pub fn into_result(self) -> std::result::Result<Option<T>, String> {
        if self.success {
            Ok(self.data)
        } else {
            Err(self.message)
        }
    }
}
