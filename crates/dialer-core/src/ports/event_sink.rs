//! EventSink port - イベント記録の抽象化
//!
//! # 実装
//! - **TracingEventSink**: `tracing` へ出力（本番用）
//! - **MemoryEventSink**: メモリに保持（テスト用）

use crate::domain::DialerEvent;

/// EventSink はドメインイベントを記録
///
/// 記録は同期・失敗なし。エンジンのロック内から呼ばれるので重い処理はしないこと。
pub trait EventSink: Send + Sync {
    fn emit(&self, event: DialerEvent);
}
