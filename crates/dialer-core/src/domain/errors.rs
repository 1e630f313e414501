//! Errors - エラー型と分類
//!
//! - `DialerError`: コマンドの拒否理由（`NoMoreTargets` 以外は状態を変更しない）
//! - `SourceError`: ターゲット一覧の読み込み失敗
//! - `TelephonyError`: プロバイダ呼び出しの失敗（発信はスキップ、切断は握りつぶす）

use thiserror::Error;

/// Reason a command was rejected. Apart from `NoMoreTargets`, which stops the
/// dialer, a rejected command leaves the engine untouched.
#[derive(Debug, Error)]
pub enum DialerError {
    #[error("Not running")]
    NotRunning,

    #[error("Please wait, an advance is already in progress")]
    Busy,

    #[error("Invalid index {index} (queue has {len} numbers)")]
    InvalidIndex { index: i64, len: usize },

    #[error("No more numbers")]
    NoMoreTargets,

    #[error("Could not load numbers: {0}")]
    Load(#[from] SourceError),
}

#[derive(Debug, Error)]
pub enum SourceError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),

    #[error("expected a JSON array or object of numbers, found {0}")]
    Shape(&'static str),
}

#[derive(Debug, Error)]
pub enum TelephonyError {
    #[error("provider rejected the request (status {status}): {body}")]
    Rejected { status: u16, body: String },

    #[error("provider request failed: {0}")]
    Transport(String),

    #[error("unexpected provider response: {0}")]
    InvalidResponse(String),
}
