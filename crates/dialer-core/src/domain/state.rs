//! State - ダイヤラーの公開状態
//!
//! エンジン内部の状態（キュー、ガード、アクティブ通話）はエンジンが所有し、
//! 外部へはここで定義する射影（snapshot）だけを出します。

use serde::{Deserialize, Serialize};

/// Projection of the engine state served to API callers and observers.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DialerSnapshot {
    /// Phone number of the entry at `index`, if any.
    pub current_target: Option<String>,
    pub index: usize,
    pub calling: bool,
    pub auto_next: bool,
    pub remaining: usize,
}

/// EngineMode はエンジン全体の状態
///
/// # 状態遷移
/// - Idle: `calling=false`
/// - Dialing: `calling=true`、通話中または発信直前
/// - WaitingManual: `calling=true`、`autoNext=false`、通話なし（next 待ち）
///
/// Exhausted (`index == len`) は即座に Idle に畳まれるため、ここには現れません。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EngineMode {
    Idle,
    Dialing,
    WaitingManual,
}
