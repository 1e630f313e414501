//! Impls - ports の実装
//!
//! # 含まれる実装
//! - **JsonFileTargetSource**: `numbers.json` の読み込み
//! - **StaticTargetSource**: 固定リスト（テスト用）
//! - **RecordingTelephony**: 発信を記録するだけのプロバイダ（テスト・dry-run 用）
//! - **TracingEventSink** / **MemoryEventSink**: イベント記録
//!
//! 本番用のプロバイダ実装（Twilio）は `dialer-cli` に置きます。

pub mod json_source;
pub mod memory;
pub mod recording;
pub mod tracing_sink;

pub use self::json_source::{JsonFileTargetSource, parse_targets};
pub use self::memory::{MemoryEventSink, StaticTargetSource};
pub use self::recording::RecordingTelephony;
pub use self::tracing_sink::TracingEventSink;
