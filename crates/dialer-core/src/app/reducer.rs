//! Reducer - ステータス通知の判定
//!
//! 通知とエンジン状態の射影（`ReducerView`）から `Reduction` を返す純粋関数です。
//! 判定結果の適用（前進、発信）はエンジンが行います。
//!
//! # 判定順
//! 1. 着信・会議レッグ → Ignored
//! 2. 終端以外 → Informational
//! 3. 停止中 → Stale
//! 4. 前進処理の実行中 → Deferred
//! 5. 生きていない CallId（重複・キャンセル済み） → Stale
//! 6. autoNext または next 起点 → Advance、それ以外 → Stall

use crate::domain::StatusNotification;

/// The parts of engine state the reducer looks at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ReducerView {
    pub calling: bool,
    pub auto_next: bool,
    /// The notified call was in the active set (before pruning).
    pub was_live: bool,
    pub guard_held: bool,
    pub manual_origin: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Reduction {
    /// Inbound or conference traffic; nothing is touched.
    Ignored,
    /// Non-terminal status.
    Informational,
    /// Terminal status for a call that is no longer live, or the dialer is idle.
    Stale,
    /// An advance is in flight; remember the call in case it is the one being placed.
    Deferred,
    /// Auto-next is off: wait for an explicit `next`.
    Stall,
    Advance,
}

/// A concluded call moves the queue on in auto mode, or when the advance that
/// placed it was an operator `next`.
pub fn advances_on_terminal(auto_next: bool, manual_origin: bool) -> bool {
    auto_next || manual_origin
}

pub fn reduce(notification: &StatusNotification, view: ReducerView) -> Reduction {
    if !notification.is_outbound_dial_event() {
        return Reduction::Ignored;
    }
    if !notification.status.is_terminal() {
        return Reduction::Informational;
    }
    if !view.calling {
        return Reduction::Stale;
    }
    if view.guard_held {
        return Reduction::Deferred;
    }
    if !view.was_live {
        return Reduction::Stale;
    }
    if advances_on_terminal(view.auto_next, view.manual_origin) {
        Reduction::Advance
    } else {
        Reduction::Stall
    }
}
