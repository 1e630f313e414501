//! RecordingTelephony - プロセス内の電話プロバイダ
//!
//! 実際には発信せず、発信・切断の要求を記録します。テストと `--dry-run` で使用。
//!
//! # テスト用の操作
//! - `fail_number`: 指定番号への発信をプロバイダ拒否にする
//! - `fail_hang_ups`: 切断要求をすべて失敗させる
//! - `queue_call_ids`: 払い出す CallId を事前に決める
//! - `hold_placements` / `release_placement`: 発信を止めて競合を再現する

use std::collections::{HashSet, VecDeque};
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use tokio::sync::{Notify, Semaphore};
use ulid::Ulid;

use crate::domain::{CallId, TelephonyError};
use crate::ports::{OutboundCall, Telephony};

#[derive(Default)]
struct Recorded {
    placed: Vec<(CallId, OutboundCall)>,
    hung_up: Vec<CallId>,
    failing_numbers: HashSet<String>,
    next_ids: VecDeque<CallId>,
    fail_hang_ups: bool,
}

#[derive(Default)]
pub struct RecordingTelephony {
    recorded: Mutex<Recorded>,
    gate: Option<Arc<Semaphore>>,
    entered: Arc<Notify>,
}

impl RecordingTelephony {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every `place_call` waits for `release_placement` before returning.
    pub fn hold_placements(mut self) -> Self {
        self.gate = Some(Arc::new(Semaphore::new(0)));
        self
    }

    pub fn release_placement(&self) {
        if let Some(gate) = &self.gate {
            gate.add_permits(1);
        }
    }

    /// Resolves once a `place_call` has started (and is possibly held).
    pub async fn placement_started(&self) {
        self.entered.notified().await;
    }

    pub fn fail_number(&self, phone: impl Into<String>) {
        self.lock().failing_numbers.insert(phone.into());
    }

    pub fn fail_hang_ups(&self) {
        self.lock().fail_hang_ups = true;
    }

    pub fn queue_call_ids<I>(&self, ids: I)
    where
        I: IntoIterator,
        I::Item: Into<CallId>,
    {
        self.lock().next_ids.extend(ids.into_iter().map(Into::into));
    }

    /// Calls accepted so far, oldest first.
    pub fn placed(&self) -> Vec<(CallId, OutboundCall)> {
        self.lock().placed.clone()
    }

    pub fn dialed_numbers(&self) -> Vec<String> {
        self.lock()
            .placed
            .iter()
            .map(|(_, call)| call.to.clone())
            .collect()
    }

    pub fn last_call_id(&self) -> Option<CallId> {
        self.lock().placed.last().map(|(id, _)| id.clone())
    }

    pub fn hung_up(&self) -> Vec<CallId> {
        self.lock().hung_up.clone()
    }

    fn lock(&self) -> MutexGuard<'_, Recorded> {
        // recorded data stays readable after a panicking test
        self.recorded
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

#[async_trait]
impl Telephony for RecordingTelephony {
    async fn place_call(&self, call: &OutboundCall) -> Result<CallId, TelephonyError> {
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            let permit = gate
                .acquire()
                .await
                .map_err(|e| TelephonyError::Transport(e.to_string()))?;
            permit.forget();
        }

        let mut recorded = self.lock();
        if recorded.failing_numbers.contains(&call.to) {
            return Err(TelephonyError::Rejected {
                status: 400,
                body: format!("invalid number {}", call.to),
            });
        }
        let call_id = recorded
            .next_ids
            .pop_front()
            .unwrap_or_else(|| CallId::new(format!("CA{}", Ulid::new())));
        recorded.placed.push((call_id.clone(), call.clone()));
        Ok(call_id)
    }

    async fn hang_up(&self, call_id: &CallId) -> Result<(), TelephonyError> {
        let mut recorded = self.lock();
        recorded.hung_up.push(call_id.clone());
        if recorded.fail_hang_ups {
            return Err(TelephonyError::Transport("connection reset".to_string()));
        }
        Ok(())
    }
}
