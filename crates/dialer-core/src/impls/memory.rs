//! Memory - メモリ上の TargetSource / EventSink（テスト・組み込み用）

use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;

use crate::domain::{CallTarget, DialerEvent, DialerEventKind, SourceError};
use crate::ports::{EventSink, TargetSource};

/// A fixed target list. `replace` changes what the next load returns.
#[derive(Default)]
pub struct StaticTargetSource {
    targets: Mutex<Vec<CallTarget>>,
}

impl StaticTargetSource {
    pub fn new(targets: Vec<CallTarget>) -> Self {
        Self {
            targets: Mutex::new(targets),
        }
    }

    pub fn from_phones<I, S>(phones: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(phones.into_iter().map(CallTarget::new).collect())
    }

    pub fn replace(&self, targets: Vec<CallTarget>) {
        *lock(&self.targets) = targets;
    }
}

#[async_trait]
impl TargetSource for StaticTargetSource {
    async fn load(&self) -> Result<Vec<CallTarget>, SourceError> {
        Ok(lock(&self.targets).clone())
    }
}

/// Keeps every emitted event in memory.
#[derive(Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<DialerEvent>>,
}

impl MemoryEventSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DialerEvent> {
        lock(&self.events).clone()
    }

    pub fn kinds(&self) -> Vec<DialerEventKind> {
        lock(&self.events).iter().map(|e| e.kind.clone()).collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: DialerEvent) {
        lock(&self.events).push(event);
    }
}

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}
