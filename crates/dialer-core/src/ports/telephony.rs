//! Telephony port - 発信とキャンセル
//!
//! # 実装
//! - **TwilioTelephony**（dialer-cli）: REST API
//! - **RecordingTelephony**: テスト・dry-run 用

use async_trait::async_trait;

use crate::domain::{CallId, StatusEvent, TelephonyError};

/// Everything the provider needs to place one outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundCall {
    pub to: String,
    pub from: String,
    /// Document the provider fetches when the callee answers.
    pub answer_url: String,
    /// Where the provider posts status notifications for this call.
    pub status_callback: String,
    pub events: Vec<StatusEvent>,
}

/// Telephony は外部プロバイダへの窓口
///
/// # 設計原則
/// - `place_call` は 1 回だけ試行する（リトライしない）
/// - `hang_up` は best-effort（失敗はエンジン側で握りつぶす）
#[async_trait]
pub trait Telephony: Send + Sync {
    async fn place_call(&self, call: &OutboundCall) -> Result<CallId, TelephonyError>;

    async fn hang_up(&self, call_id: &CallId) -> Result<(), TelephonyError>;
}
