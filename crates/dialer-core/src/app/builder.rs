//! DialerBuilder - エンジンの構築とワイヤリング
//!
//! # Fail-fast 設計
//! - Telephony / TargetSource / DialerConfig は必須
//! - build() 時に不足があれば BuildError を返す
//! - EventSink と Clock は省略可能（TracingEventSink / SystemClock）

use std::sync::Arc;

use super::engine::{DialerConfig, DialerEngine};
use crate::impls::TracingEventSink;
use crate::ports::{Clock, EventSink, SystemClock, TargetSource, Telephony};

/// DialerBuilder は DialerEngine を構築
///
/// # 使用例
/// ```ignore
/// let engine = DialerBuilder::new()
///     .telephony(Arc::new(twilio))
///     .target_source(Arc::new(JsonFileTargetSource::new("numbers.json")))
///     .config(DialerConfig::from_base_url("+15550000", "https://dialer.example.com"))
///     .build()?;
/// ```
#[derive(Default)]
pub struct DialerBuilder {
    telephony: Option<Arc<dyn Telephony>>,
    source: Option<Arc<dyn TargetSource>>,
    events: Option<Arc<dyn EventSink>>,
    clock: Option<Arc<dyn Clock>>,
    config: Option<DialerConfig>,
}

/// BuildError はエンジン構築時のエラー
#[derive(Debug, thiserror::Error)]
pub enum BuildError {
    #[error("missing components: {0:?}. These must be set before build().")]
    Missing(Vec<&'static str>),
}

impl DialerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn telephony(mut self, telephony: Arc<dyn Telephony>) -> Self {
        self.telephony = Some(telephony);
        self
    }

    pub fn target_source(mut self, source: Arc<dyn TargetSource>) -> Self {
        self.source = Some(source);
        self
    }

    pub fn event_sink(mut self, events: Arc<dyn EventSink>) -> Self {
        self.events = Some(events);
        self
    }

    pub fn clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = Some(clock);
        self
    }

    pub fn config(mut self, config: DialerConfig) -> Self {
        self.config = Some(config);
        self
    }

    pub fn build(self) -> Result<DialerEngine, BuildError> {
        match (self.telephony, self.source, self.config) {
            (Some(telephony), Some(source), Some(config)) => Ok(DialerEngine::new(
                telephony,
                source,
                self.events.unwrap_or_else(|| Arc::new(TracingEventSink)),
                self.clock.unwrap_or_else(|| Arc::new(SystemClock)),
                config,
            )),
            (telephony, source, config) => {
                let mut missing = Vec::new();
                if telephony.is_none() {
                    missing.push("telephony");
                }
                if source.is_none() {
                    missing.push("target_source");
                }
                if config.is_none() {
                    missing.push("config");
                }
                Err(BuildError::Missing(missing))
            }
        }
    }
}
