//! TargetSource port - 発信先リストの読み込み
//!
//! リストは start / start-from / reset のたびに丸ごと読み直されます。
//!
//! # 実装
//! - **JsonFileTargetSource**: `numbers.json`（配列またはオブジェクト）
//! - **StaticTargetSource**: テスト用の固定リスト

use async_trait::async_trait;

use crate::domain::{CallTarget, SourceError};

/// TargetSource は順序付きの発信先リストを返す
///
/// # 設計原則
/// - 読み込みは全体置き換え（差分なし）
/// - 不正なエントリも保持する（検証は発信時）
#[async_trait]
pub trait TargetSource: Send + Sync {
    async fn load(&self) -> Result<Vec<CallTarget>, SourceError>;
}
