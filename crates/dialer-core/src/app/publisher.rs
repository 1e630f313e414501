//! StatePublisher - 状態の配信
//!
//! 最新の `DialerSnapshot` を `watch` チャネルに保持します。
//!
//! # 性質
//! - 読み取りはエンジンのロックを待たない
//! - 新しい購読者は接続時点の snapshot をすぐに受け取る
//! - 遅い購読者は途中の snapshot を取りこぼすが、最後は必ず最新に追いつく

use tokio::sync::watch;

use crate::domain::DialerSnapshot;
use crate::queue::QueueStore;

#[derive(Debug)]
pub struct StatePublisher {
    tx: watch::Sender<DialerSnapshot>,
}

impl StatePublisher {
    pub fn new(initial: DialerSnapshot) -> Self {
        let (tx, _rx) = watch::channel(initial);
        Self { tx }
    }

    /// Push a snapshot. Returns false when it equals the current one.
    pub fn publish(&self, snapshot: DialerSnapshot) -> bool {
        self.tx.send_if_modified(|current| {
            if *current == snapshot {
                return false;
            }
            *current = snapshot;
            true
        })
    }

    pub fn current(&self) -> DialerSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DialerSnapshot> {
        self.tx.subscribe()
    }
}

/// Build the public projection of the queue and dialer flags.
pub fn project(queue: &QueueStore, calling: bool, auto_next: bool) -> DialerSnapshot {
    DialerSnapshot {
        current_target: queue
            .current()
            .and_then(|target| target.phone.clone()),
        index: queue.index(),
        calling,
        auto_next,
        remaining: queue.remaining(),
    }
}
