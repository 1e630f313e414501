//! Target - 発信先と CallId
//!
//! 発信先は読み込んだまま保持し、番号が使えるかどうかは発信時に判定します。

use serde::{Deserialize, Serialize};
use std::fmt;

/// One entry of the dial queue.
///
/// Entries are kept exactly as loaded. A target without a usable phone number
/// stays in the queue (it still occupies an index) and is skipped at dial time.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct CallTarget {
    #[serde(default)]
    pub phone: Option<String>,
}

impl CallTarget {
    pub fn new(phone: impl Into<String>) -> Self {
        Self {
            phone: Some(phone.into()),
        }
    }

    /// Build a target from an arbitrary JSON entry.
    ///
    /// Anything other than an object with a string `phone` becomes a target
    /// without a phone number.
    pub fn from_value(value: &serde_json::Value) -> Self {
        let phone = value
            .get("phone")
            .and_then(serde_json::Value::as_str)
            .map(str::to_string);
        Self { phone }
    }

    /// Phone number to dial, if this target is dialable.
    pub fn dialable_phone(&self) -> Option<&str> {
        self.phone
            .as_deref()
            .map(str::trim)
            .filter(|phone| !phone.is_empty())
    }
}

/// Identifier assigned by the telephony provider to a placed call.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CallId(String);

impl CallId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CallId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for CallId {
    fn from(value: &str) -> Self {
        Self::new(value)
    }
}
