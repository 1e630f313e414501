//! DialerEngine - 発信キューのオーケストレーション
//!
//! オペレーターのコマンド（start / start-from / stop / reset / auto-next / next）と
//! プロバイダからのステータス通知を、1 つの状態（`EngineState`）に対して処理します。
//!
//! # 設計原則
//! - 状態は `tokio::sync::Mutex` 1 つで守る。プロバイダ呼び出しの await をまたいで保持しない
//! - index を進める・発信する処理は `AdvanceGuard` を取った 1 本だけが走る
//! - stop / reset は世代番号（generation）を進めてガードを外し、進行中の処理を無効化する
//! - 読み取り（`snapshot`）は `StatePublisher` から返し、ロックを待たない

use std::collections::{BTreeSet, HashSet};
use std::mem;
use std::sync::Arc;

use tokio::sync::{Mutex, watch};
use tracing::{debug, info, instrument, warn};

use super::guard::AdvanceGuard;
use super::publisher::{StatePublisher, project};
use super::reducer::{Reduction, ReducerView, advances_on_terminal, reduce};
use crate::domain::{
    AdvanceOrigin, CallId, CallTarget, DialerError, DialerEvent, DialerEventKind, DialerSnapshot,
    EngineMode, SkipReason, StatusEvent, StatusNotification,
};
use crate::ports::{Clock, EventSink, OutboundCall, TargetSource, Telephony};
use crate::queue::QueueStore;

/// Addresses and identity used for every outbound call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DialerConfig {
    /// Number the calls are placed from.
    pub caller_id: String,
    pub status_callback_url: String,
    pub answer_url: String,
}

impl DialerConfig {
    /// Derive the callback addresses from the public base URL of the service.
    pub fn from_base_url(caller_id: impl Into<String>, base_url: &str) -> Self {
        let base = base_url.trim_end_matches('/');
        Self {
            caller_id: caller_id.into(),
            status_callback_url: format!("{base}/webhooks/status"),
            answer_url: format!("{base}/twiml/outbound?type=autodialer"),
        }
    }

    fn outbound_call(&self, phone: &str) -> OutboundCall {
        OutboundCall {
            to: phone.to_string(),
            from: self.caller_id.clone(),
            answer_url: self.answer_url.clone(),
            status_callback: self.status_callback_url.clone(),
            events: StatusEvent::ALL.to_vec(),
        }
    }
}

/// Successful command result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CommandReport {
    pub status: String,
    pub snapshot: DialerSnapshot,
}

struct EngineState {
    queue: QueueStore,
    calling: bool,
    auto_next: bool,
    /// Calls this engine has placed and not yet seen end.
    active: BTreeSet<CallId>,
    guard: AdvanceGuard,
    /// Terminal notifications for unknown calls seen while an advance was in flight.
    early_terminal: HashSet<CallId>,
    /// Bumped by every start, stop and reset.
    generation: u64,
}

impl EngineState {
    fn new() -> Self {
        Self {
            queue: QueueStore::new(),
            calling: false,
            auto_next: true,
            active: BTreeSet::new(),
            guard: AdvanceGuard::default(),
            early_terminal: HashSet::new(),
            generation: 0,
        }
    }

    fn snapshot(&self) -> DialerSnapshot {
        project(&self.queue, self.calling, self.auto_next)
    }

    /// Clear the active set and hand back what has to be cancelled remotely.
    fn take_live_calls(&mut self) -> Vec<CallId> {
        mem::take(&mut self.active).into_iter().collect()
    }

    /// End the current run. An advance still in flight belongs to an older
    /// generation from now on and loses the guard.
    fn supersede(&mut self) {
        self.generation += 1;
        self.guard.clear();
        self.early_terminal.clear();
    }

    fn mode(&self) -> EngineMode {
        if !self.calling {
            EngineMode::Idle
        } else if !self.auto_next && self.active.is_empty() && !self.guard.is_held() {
            EngineMode::WaitingManual
        } else {
            EngineMode::Dialing
        }
    }
}

/// What the locked half of an advance decided.
enum Step {
    Dial { generation: u64, cancel: Vec<CallId> },
    Exhausted { cancel: Vec<CallId> },
}

pub struct DialerEngine {
    state: Mutex<EngineState>,
    telephony: Arc<dyn Telephony>,
    source: Arc<dyn TargetSource>,
    events: Arc<dyn EventSink>,
    clock: Arc<dyn Clock>,
    publisher: StatePublisher,
    config: DialerConfig,
}

impl DialerEngine {
    pub(crate) fn new(
        telephony: Arc<dyn Telephony>,
        source: Arc<dyn TargetSource>,
        events: Arc<dyn EventSink>,
        clock: Arc<dyn Clock>,
        config: DialerConfig,
    ) -> Self {
        let state = EngineState::new();
        let publisher = StatePublisher::new(state.snapshot());
        Self {
            state: Mutex::new(state),
            telephony,
            source,
            events,
            clock,
            publisher,
            config,
        }
    }

    pub fn config(&self) -> &DialerConfig {
        &self.config
    }

    // ========================================
    // Reads
    // ========================================

    /// Latest published state. Never waits for an advance to finish.
    pub fn snapshot(&self) -> DialerSnapshot {
        self.publisher.current()
    }

    pub fn subscribe(&self) -> watch::Receiver<DialerSnapshot> {
        self.publisher.subscribe()
    }

    pub async fn mode(&self) -> EngineMode {
        self.state.lock().await.mode()
    }

    pub async fn active_calls(&self) -> Vec<CallId> {
        self.state.lock().await.active.iter().cloned().collect()
    }

    // ========================================
    // Commands
    // ========================================

    /// Reload the queue and dial from the first entry.
    pub async fn start(&self) -> Result<CommandReport, DialerError> {
        let targets = self.source.load().await?;
        self.begin(targets, 0).await?;
        Ok(self.report("Started".to_string()))
    }

    /// Reload the queue and dial from `index`. Out-of-range indices are
    /// rejected before anything changes.
    pub async fn start_from(&self, index: i64) -> Result<CommandReport, DialerError> {
        let targets = self.source.load().await?;
        let len = targets.len();
        let position = usize::try_from(index)
            .ok()
            .filter(|position| *position < len)
            .ok_or(DialerError::InvalidIndex { index, len })?;
        self.begin(targets, position).await?;
        Ok(self.report(format!("Started from {position}")))
    }

    async fn begin(&self, targets: Vec<CallTarget>, position: usize) -> Result<(), DialerError> {
        let (generation, cancel) = {
            let mut state = self.state.lock().await;
            let generation = state.generation + 1;
            state.guard.try_acquire(AdvanceOrigin::Command, generation)?;
            state.generation = generation;
            state.early_terminal.clear();
            state.queue.load(targets);
            state.queue.seek(position);
            state.calling = true;
            let cancel = state.take_live_calls();
            info!(index = position, total = state.queue.len(), "dialer started");
            self.emit(DialerEventKind::Started {
                index: position,
                total: state.queue.len(),
            });
            self.publish(&state);
            (state.generation, cancel)
        };
        self.run_sequence(AdvanceOrigin::Command, generation, cancel)
            .await;
        Ok(())
    }

    /// Stop dialing and cancel whatever is live. An advance still waiting on
    /// the provider is abandoned.
    pub async fn stop(&self) -> Result<CommandReport, DialerError> {
        let cancel = {
            let mut state = self.state.lock().await;
            state.supersede();
            state.calling = false;
            let cancel = state.take_live_calls();
            info!(index = state.queue.index(), "dialer stopped");
            self.emit(DialerEventKind::Stopped);
            self.publish(&state);
            cancel
        };
        self.cancel_calls(cancel).await;
        Ok(self.report("Stopped".to_string()))
    }

    /// Stop, reload the queue, rewind and switch auto-next back on.
    pub async fn reset(&self) -> Result<CommandReport, DialerError> {
        let targets = self.source.load().await?;
        let cancel = {
            let mut state = self.state.lock().await;
            state.supersede();
            state.calling = false;
            state.auto_next = true;
            state.queue.load(targets);
            let cancel = state.take_live_calls();
            info!(total = state.queue.len(), "dialer reset");
            self.emit(DialerEventKind::Reset {
                total: state.queue.len(),
            });
            self.publish(&state);
            cancel
        };
        self.cancel_calls(cancel).await;
        Ok(self.report("State reset".to_string()))
    }

    /// Switch auto-next. Switching it on while the dialer waits for `next`
    /// steps over the concluded entry and dials the following one.
    pub async fn set_auto_next(&self, enabled: bool) -> Result<CommandReport, DialerError> {
        let resume = {
            let mut state = self.state.lock().await;
            state.auto_next = enabled;
            self.emit(DialerEventKind::AutoNextChanged { enabled });

            // with no live call and no advance in flight, the current entry's
            // call has already ended
            let waiting = state.calling && state.active.is_empty() && !state.guard.is_held();
            let step = if enabled && waiting {
                Some(self.advance_locked(&mut state, AdvanceOrigin::Auto)?)
            } else {
                None
            };
            self.publish(&state);
            step
        };

        match resume {
            Some(Step::Dial { generation, cancel }) => {
                self.run_sequence(AdvanceOrigin::Auto, generation, cancel)
                    .await;
            }
            Some(Step::Exhausted { cancel }) => self.cancel_calls(cancel).await,
            None => {}
        }
        let label = if enabled { "ON" } else { "OFF" };
        Ok(self.report(format!("AutoNext {label}")))
    }

    /// Operator-driven advance. Rejected when idle or while another advance
    /// is in flight.
    pub async fn next(&self) -> Result<CommandReport, DialerError> {
        let step = {
            let mut state = self.state.lock().await;
            if !state.calling {
                return Err(DialerError::NotRunning);
            }
            self.advance_locked(&mut state, AdvanceOrigin::Manual)?
        };

        match step {
            Step::Dial { generation, cancel } => {
                self.run_sequence(AdvanceOrigin::Manual, generation, cancel)
                    .await;
                Ok(self.report("Next dialing".to_string()))
            }
            Step::Exhausted { cancel } => {
                self.cancel_calls(cancel).await;
                Err(DialerError::NoMoreTargets)
            }
        }
    }

    // ========================================
    // Notifications
    // ========================================

    /// Apply one provider status notification. Always succeeds; the returned
    /// reduction says what it did.
    #[instrument(skip_all, fields(call_id = %notification.call_id, status = %notification.status))]
    pub async fn handle_status(&self, notification: &StatusNotification) -> Reduction {
        if !notification.is_outbound_dial_event() {
            debug!("ignoring inbound or conference notification");
            return Reduction::Ignored;
        }

        let (reduction, step) = {
            let mut state = self.state.lock().await;
            let was_live = state.active.remove(&notification.call_id);
            let view = ReducerView {
                calling: state.calling,
                auto_next: state.auto_next,
                was_live,
                guard_held: state.guard.is_held(),
                manual_origin: state.guard.manual_origin(),
            };
            let reduction = reduce(notification, view);

            let step = match reduction {
                Reduction::Deferred => {
                    state
                        .early_terminal
                        .insert(notification.call_id.clone());
                    None
                }
                Reduction::Stall => {
                    self.emit_concluded(notification);
                    self.publish(&state);
                    None
                }
                Reduction::Advance => {
                    self.emit_concluded(notification);
                    match self.advance_locked(&mut state, AdvanceOrigin::Auto) {
                        Ok(step) => Some(step),
                        Err(err) => {
                            warn!(error = %err, "terminal status could not advance the queue");
                            None
                        }
                    }
                }
                Reduction::Ignored | Reduction::Informational | Reduction::Stale => None,
            };
            (reduction, step)
        };
        debug!(?reduction, "status notification reduced");

        match step {
            Some(Step::Dial { generation, cancel }) => {
                self.run_sequence(AdvanceOrigin::Auto, generation, cancel)
                    .await;
            }
            Some(Step::Exhausted { cancel }) => self.cancel_calls(cancel).await,
            None => {}
        }
        reduction
    }

    // ========================================
    // Advance sequence
    // ========================================

    /// Locked half of an advance: take the guard, drop live calls from the
    /// bookkeeping and step the index. On exhaustion the dialer goes idle and
    /// the guard is released again.
    fn advance_locked(
        &self,
        state: &mut EngineState,
        origin: AdvanceOrigin,
    ) -> Result<Step, DialerError> {
        state.guard.try_acquire(origin, state.generation)?;
        let cancel = state.take_live_calls();
        let index = state.queue.advance();
        info!(index, ?origin, "advancing queue");
        self.emit(DialerEventKind::Advanced { index, origin });
        self.publish(state);

        if state.queue.is_exhausted() {
            self.exhaust(state);
            let generation = state.generation;
            self.release(state, generation);
            return Ok(Step::Exhausted { cancel });
        }
        Ok(Step::Dial {
            generation: state.generation,
            cancel,
        })
    }

    /// Unlocked half: cancel superseded calls, then dial. The guard taken by
    /// the locked half is released by `dial_current`.
    async fn run_sequence(&self, origin: AdvanceOrigin, generation: u64, cancel: Vec<CallId>) {
        self.cancel_calls(cancel).await;
        self.dial_current(origin, generation).await;
    }

    /// Call initiator. Dials the current entry, skipping invalid entries and
    /// failed placements, until one call is live or the queue runs out.
    /// Every exit releases the advance guard.
    async fn dial_current(&self, origin: AdvanceOrigin, generation: u64) {
        let budget = self.state.lock().await.queue.len() + 1;

        for _ in 0..budget {
            let call = {
                let mut state = self.state.lock().await;
                if state.generation != generation || !state.calling {
                    self.release(&mut state, generation);
                    return;
                }
                if state.queue.is_exhausted() {
                    self.exhaust(&mut state);
                    self.release(&mut state, generation);
                    return;
                }
                let index = state.queue.index();
                let phone = state
                    .queue
                    .current()
                    .and_then(CallTarget::dialable_phone)
                    .map(str::to_string);
                let Some(phone) = phone else {
                    debug!(index, "skipping entry without a phone number");
                    self.skip(&mut state, index, SkipReason::InvalidTarget);
                    continue;
                };
                self.config.outbound_call(&phone)
            };

            let placed = self.telephony.place_call(&call).await;

            let mut state = self.state.lock().await;
            if state.generation != generation || !state.calling {
                self.release(&mut state, generation);
                drop(state);
                if let Ok(call_id) = placed {
                    info!(%call_id, "dialer stopped while placing; cancelling call");
                    self.cancel_calls(vec![call_id]).await;
                }
                return;
            }

            let index = state.queue.index();
            match placed {
                Ok(call_id) if state.early_terminal.contains(&call_id) => {
                    state.early_terminal.remove(&call_id);
                    if advances_on_terminal(state.auto_next, origin.is_manual()) {
                        info!(index, %call_id, "call ended before it was recorded; moving on");
                        self.skip(&mut state, index, SkipReason::EndedBeforeRecorded);
                        continue;
                    }
                    info!(index, %call_id, "call ended before it was recorded; waiting for next");
                    self.release(&mut state, generation);
                    return;
                }
                Ok(call_id) => {
                    info!(index, %call_id, to = %call.to, "call placed");
                    state.active.insert(call_id.clone());
                    self.emit(DialerEventKind::CallPlaced { index, call_id });
                    self.release(&mut state, generation);
                    return;
                }
                Err(err) => {
                    warn!(index, to = %call.to, error = %err, "call placement failed; skipping");
                    self.skip(&mut state, index, SkipReason::PlacementFailed);
                }
            }
        }

        let mut state = self.state.lock().await;
        self.release(&mut state, generation);
    }

    fn skip(&self, state: &mut EngineState, index: usize, reason: SkipReason) {
        self.emit(DialerEventKind::TargetSkipped { index, reason });
        state.queue.advance();
        self.publish(state);
    }

    fn exhaust(&self, state: &mut EngineState) {
        state.calling = false;
        info!(total = state.queue.len(), "queue exhausted");
        self.emit(DialerEventKind::Exhausted);
        self.publish(state);
    }

    /// Release the guard held by the run of `generation`. A superseded run
    /// leaves the current holder alone.
    fn release(&self, state: &mut EngineState, generation: u64) {
        if state.guard.release(generation) {
            state.early_terminal.clear();
        }
        self.publish(state);
    }

    /// Best-effort remote cancellation. Local bookkeeping is already clear.
    async fn cancel_calls(&self, calls: Vec<CallId>) {
        for call_id in calls {
            match self.telephony.hang_up(&call_id).await {
                Ok(()) => self.emit(DialerEventKind::CallCancelled { call_id }),
                Err(err) => self.emit(DialerEventKind::CancelFailed {
                    call_id,
                    error: err.to_string(),
                }),
            }
        }
    }

    // ========================================
    // Helpers
    // ========================================

    fn emit(&self, kind: DialerEventKind) {
        self.events.emit(DialerEvent::new(self.clock.now(), kind));
    }

    fn emit_concluded(&self, notification: &StatusNotification) {
        self.emit(DialerEventKind::CallConcluded {
            call_id: notification.call_id.clone(),
            status: notification.status.to_string(),
        });
    }

    fn publish(&self, state: &EngineState) {
        self.publisher.publish(state.snapshot());
    }

    fn report(&self, status: String) -> CommandReport {
        CommandReport {
            status,
            snapshot: self.snapshot(),
        }
    }
}
