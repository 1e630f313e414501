//! Ports - 抽象化レイヤー
//!
//! エンジンが依存する外部システム（発信先リスト、電話プロバイダ、
//! イベント記録、時刻）へのインターフェースです。

pub mod clock;
pub mod event_sink;
pub mod target_source;
pub mod telephony;

pub use self::clock::{Clock, FixedClock, SystemClock};
pub use self::event_sink::EventSink;
pub use self::target_source::TargetSource;
pub use self::telephony::{OutboundCall, Telephony};
