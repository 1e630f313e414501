//! Domain - ドメインモデル
//!
//! 発信先、通話ステータス、公開状態、イベント、エラーを定義します。

pub mod errors;
pub mod events;
pub mod state;
pub mod status;
pub mod target;

pub use self::errors::{DialerError, SourceError, TelephonyError};
pub use self::events::{AdvanceOrigin, DialerEvent, DialerEventKind, SkipReason};
pub use self::state::{DialerSnapshot, EngineMode};
pub use self::status::{CallStatus, StatusEvent, StatusNotification};
pub use self::target::{CallId, CallTarget};
