//! Status - 通話ステータスとプロバイダ通知
//!
//! # 終端ステータス
//! busy / failed / no-answer / canceled / completed のいずれかで通話は終わります。
//! それ以外（initiated, ringing, answered など）は経過の報告です。

use serde::{Deserialize, Serialize};
use std::fmt;

use super::target::CallId;

/// Lifecycle status of a call as reported by the provider.
///
/// Unknown values are kept in `Other` and treated as informational.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum CallStatus {
    Queued,
    Initiated,
    Ringing,
    InProgress,
    Answered,
    Completed,
    Busy,
    NoAnswer,
    Failed,
    Canceled,
    Other(String),
}

impl CallStatus {
    /// The call will not progress any further.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            CallStatus::Completed
                | CallStatus::Busy
                | CallStatus::NoAnswer
                | CallStatus::Failed
                | CallStatus::Canceled
        )
    }

    pub fn as_str(&self) -> &str {
        match self {
            CallStatus::Queued => "queued",
            CallStatus::Initiated => "initiated",
            CallStatus::Ringing => "ringing",
            CallStatus::InProgress => "in-progress",
            CallStatus::Answered => "answered",
            CallStatus::Completed => "completed",
            CallStatus::Busy => "busy",
            CallStatus::NoAnswer => "no-answer",
            CallStatus::Failed => "failed",
            CallStatus::Canceled => "canceled",
            CallStatus::Other(other) => other,
        }
    }
}

impl From<&str> for CallStatus {
    fn from(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "queued" => CallStatus::Queued,
            "initiated" => CallStatus::Initiated,
            "ringing" => CallStatus::Ringing,
            "in-progress" => CallStatus::InProgress,
            "answered" => CallStatus::Answered,
            "completed" => CallStatus::Completed,
            "busy" => CallStatus::Busy,
            "no-answer" => CallStatus::NoAnswer,
            "failed" => CallStatus::Failed,
            "canceled" | "cancelled" => CallStatus::Canceled,
            other => CallStatus::Other(other.to_string()),
        }
    }
}

impl fmt::Display for CallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Status events an outbound call subscribes to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum StatusEvent {
    Initiated,
    Ringing,
    Answered,
    Completed,
    Busy,
    NoAnswer,
    Failed,
    Canceled,
}

impl StatusEvent {
    /// Every event the dialer needs to observe a call to its end.
    pub const ALL: [StatusEvent; 8] = [
        StatusEvent::Initiated,
        StatusEvent::Ringing,
        StatusEvent::Answered,
        StatusEvent::Completed,
        StatusEvent::Busy,
        StatusEvent::NoAnswer,
        StatusEvent::Failed,
        StatusEvent::Canceled,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            StatusEvent::Initiated => "initiated",
            StatusEvent::Ringing => "ringing",
            StatusEvent::Answered => "answered",
            StatusEvent::Completed => "completed",
            StatusEvent::Busy => "busy",
            StatusEvent::NoAnswer => "no-answer",
            StatusEvent::Failed => "failed",
            StatusEvent::Canceled => "canceled",
        }
    }
}

/// Status notification delivered by the provider for one call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StatusNotification {
    pub call_id: CallId,
    pub status: CallStatus,
    pub direction: Option<String>,
    pub conference_id: Option<String>,
}

impl StatusNotification {
    pub fn new(call_id: impl Into<CallId>, status: impl Into<CallStatus>) -> Self {
        Self {
            call_id: call_id.into(),
            status: status.into(),
            direction: None,
            conference_id: None,
        }
    }

    pub fn with_direction(mut self, direction: impl Into<String>) -> Self {
        self.direction = Some(direction.into());
        self
    }

    pub fn with_conference(mut self, conference_id: impl Into<String>) -> Self {
        self.conference_id = Some(conference_id.into());
        self
    }

    /// Conference legs and inbound calls are not part of the dial lifecycle.
    pub fn is_outbound_dial_event(&self) -> bool {
        let in_conference = self
            .conference_id
            .as_deref()
            .is_some_and(|id| !id.is_empty());
        let inbound = self
            .direction
            .as_deref()
            .is_some_and(|direction| direction.contains("inbound"));
        !in_conference && !inbound
    }
}
