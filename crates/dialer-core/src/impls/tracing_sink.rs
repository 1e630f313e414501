//! TracingEventSink - ドメインイベントを `tracing` に流す

use tracing::{info, warn};

use crate::domain::{DialerEvent, DialerEventKind};
use crate::ports::EventSink;

#[derive(Debug, Clone, Copy, Default)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: DialerEvent) {
        let at = event.at.to_rfc3339();
        match &event.kind {
            DialerEventKind::CancelFailed { call_id, error } => {
                warn!(%at, %call_id, %error, "cancel failed, dropping call from bookkeeping");
            }
            kind => match serde_json::to_string(kind) {
                Ok(json) => info!(%at, event = %json, "dialer event"),
                Err(_) => info!(%at, event = ?kind, "dialer event"),
            },
        }
    }
}
