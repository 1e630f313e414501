//! App - アプリケーション層
//!
//! ports を組み合わせて発信キューのオーケストレーションを実装します。
//!
//! # 主要コンポーネント
//! - **DialerBuilder**: エンジンの構築とワイヤリング
//! - **DialerEngine**: コマンドと通知の処理、発信（Call Initiator）
//! - **AdvanceGuard**: 前進処理の排他制御
//! - **reducer**: ステータス通知の判定（純粋関数）
//! - **StatePublisher**: 状態の射影と配信

pub mod builder;
pub mod engine;
pub mod guard;
pub mod publisher;
pub mod reducer;

pub use self::builder::{BuildError, DialerBuilder};
pub use self::engine::{CommandReport, DialerConfig, DialerEngine};
pub use self::guard::AdvanceGuard;
pub use self::publisher::StatePublisher;
pub use self::reducer::{Reduction, ReducerView};
