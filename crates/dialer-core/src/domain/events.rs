//! Events - ドメインイベント
//!
//! エンジンの状態遷移を時刻付きで記録します。送信先は `EventSink` port です。

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::target::CallId;

/// Why the engine is moving to the next queue position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceOrigin {
    /// start / start-from issued by the operator.
    Command,
    /// Explicit `next` from the operator.
    Manual,
    /// Terminal status notification, or auto-next switched back on.
    Auto,
}

impl AdvanceOrigin {
    /// Only an operator `next` lets a terminal status advance with auto-next off.
    pub fn is_manual(self) -> bool {
        matches!(self, AdvanceOrigin::Manual)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SkipReason {
    /// Entry has no usable phone number.
    InvalidTarget,
    /// Provider refused to place the call.
    PlacementFailed,
    /// Provider reported a terminal status before the call was recorded.
    EndedBeforeRecorded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum DialerEventKind {
    Started { index: usize, total: usize },
    Stopped,
    Reset { total: usize },
    AutoNextChanged { enabled: bool },
    Advanced { index: usize, origin: AdvanceOrigin },
    CallPlaced { index: usize, call_id: CallId },
    TargetSkipped { index: usize, reason: SkipReason },
    CallCancelled { call_id: CallId },
    CancelFailed { call_id: CallId, error: String },
    CallConcluded { call_id: CallId, status: String },
    Exhausted,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DialerEvent {
    pub at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: DialerEventKind,
}

impl DialerEvent {
    pub fn new(at: DateTime<Utc>, kind: DialerEventKind) -> Self {
        Self { at, kind }
    }
}
