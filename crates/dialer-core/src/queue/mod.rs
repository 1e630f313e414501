//! QueueStore - 発信先リストと現在位置
//!
//! `index == len` は使い切った状態です。`index` が `len` を超えることはありません。

use crate::domain::CallTarget;

#[derive(Debug, Clone, Default)]
pub struct QueueStore {
    targets: Vec<CallTarget>,
    index: usize,
}

impl QueueStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole sequence and rewind to the first entry.
    pub fn load(&mut self, targets: Vec<CallTarget>) {
        self.targets = targets;
        self.index = 0;
    }

    /// Move to `index`. Positions past the end clamp to exhaustion.
    pub fn seek(&mut self, index: usize) {
        self.index = index.min(self.targets.len());
    }

    /// Step to the next position and return it.
    pub fn advance(&mut self) -> usize {
        if self.index < self.targets.len() {
            self.index += 1;
        }
        self.index
    }

    pub fn current(&self) -> Option<&CallTarget> {
        self.targets.get(self.index)
    }

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn len(&self) -> usize {
        self.targets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    pub fn remaining(&self) -> usize {
        self.targets.len().saturating_sub(self.index)
    }

    pub fn is_exhausted(&self) -> bool {
        self.index >= self.targets.len()
    }
}
