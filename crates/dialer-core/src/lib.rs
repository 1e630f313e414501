//! dialer-core
//!
//! Call-queue orchestration engine: dials an ordered list of targets one at a
//! time, advancing on operator commands or on terminal call-status
//! notifications from the telephony provider.
//!
//! # モジュール構成
//! - **domain**: ドメインモデル（target, status, state, events, errors）
//! - **queue**: 発信先リストと現在位置
//! - **ports**: 抽象化レイヤー（TargetSource, Telephony, EventSink, Clock）
//! - **app**: エンジン本体（builder, engine, guard, reducer, publisher）
//! - **impls**: ports の実装（JSON ファイル、記録用プロバイダ、イベント出力）

pub mod app;
pub mod domain;
pub mod impls;
pub mod ports;
pub mod queue;

pub use app::{CommandReport, DialerBuilder, DialerConfig, DialerEngine, Reduction};
pub use domain::{CallId, CallStatus, CallTarget, DialerError, DialerSnapshot, StatusNotification};
