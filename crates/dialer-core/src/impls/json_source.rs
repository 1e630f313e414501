//! JsonFileTargetSource - `numbers.json` からの読み込み
//!
//! ファイルは次のどちらかの形式です。
//! - 配列: `[{"phone": "+1..."}, ...]`
//! - オブジェクト: `{"a": {"phone": "+1..."}, ...}`（値を記述順に使う）

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use serde_json::Value;

use crate::domain::{CallTarget, SourceError};
use crate::ports::TargetSource;

#[derive(Debug, Clone)]
pub struct JsonFileTargetSource {
    path: PathBuf,
}

impl JsonFileTargetSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

#[async_trait]
impl TargetSource for JsonFileTargetSource {
    async fn load(&self) -> Result<Vec<CallTarget>, SourceError> {
        let raw = tokio::fs::read_to_string(&self.path)
            .await
            .map_err(|source| SourceError::Io {
                path: self.path.display().to_string(),
                source,
            })?;
        parse_targets(&raw)
    }
}

/// Parse a target list document. Entries are kept even when they are not dialable.
pub fn parse_targets(raw: &str) -> Result<Vec<CallTarget>, SourceError> {
    let doc: Value = serde_json::from_str(raw)?;
    let targets = match &doc {
        Value::Array(entries) => entries.iter().map(CallTarget::from_value).collect(),
        Value::Object(entries) => entries.values().map(CallTarget::from_value).collect(),
        Value::Null => return Err(SourceError::Shape("null")),
        Value::Bool(_) => return Err(SourceError::Shape("a boolean")),
        Value::Number(_) => return Err(SourceError::Shape("a number")),
        Value::String(_) => return Err(SourceError::Shape("a string")),
    };
    Ok(targets)
}
