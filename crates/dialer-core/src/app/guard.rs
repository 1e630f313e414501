//! AdvanceGuard - 前進処理の排他制御
//!
//! 「index を進める」「発信する」処理は同時に 1 本だけ走らせます。
//! 2 本目は待たせずに拒否します（at-most-one-in-flight）。
//!
//! # 世代（generation）
//! - ガードは取得した処理の世代番号を覚える
//! - stop / reset は `clear` でガードを強制的に外す
//! - 古い世代の処理が後から `release` しても、新しい保持者のガードは外れない

use crate::domain::{AdvanceOrigin, DialerError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct Hold {
    origin: AdvanceOrigin,
    generation: u64,
}

/// Critical-section flag for advance sequences, plus the provenance and run
/// generation of the sequence currently holding it.
///
/// The guard lives inside the engine state, so checking and taking it happen
/// under the same lock as the rest of the state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AdvanceGuard {
    held: Option<Hold>,
}

impl AdvanceGuard {
    pub fn try_acquire(&mut self, origin: AdvanceOrigin, generation: u64) -> Result<(), DialerError> {
        if self.held.is_some() {
            return Err(DialerError::Busy);
        }
        self.held = Some(Hold { origin, generation });
        Ok(())
    }

    /// Release on behalf of the sequence of `generation`. Returns false when
    /// the guard has since been cleared or taken by a newer run.
    pub fn release(&mut self, generation: u64) -> bool {
        match self.held {
            Some(hold) if hold.generation == generation => {
                self.held = None;
                true
            }
            _ => false,
        }
    }

    /// Drop the guard whoever holds it.
    pub fn clear(&mut self) {
        self.held = None;
    }

    pub fn is_held(&self) -> bool {
        self.held.is_some()
    }

    /// The in-flight advance is an operator `next`.
    pub fn manual_origin(&self) -> bool {
        self.origin().is_some_and(AdvanceOrigin::is_manual)
    }

    pub fn origin(&self) -> Option<AdvanceOrigin> {
        self.held.map(|hold| hold.origin)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn second_acquire_is_rejected() {
        let mut guard = AdvanceGuard::default();
        guard.try_acquire(AdvanceOrigin::Manual, 1).unwrap();
        let err = guard.try_acquire(AdvanceOrigin::Auto, 1).unwrap_err();
        assert!(matches!(err, DialerError::Busy));
        assert_eq!(guard.origin(), Some(AdvanceOrigin::Manual));
    }

    #[test]
    fn only_next_counts_as_manual() {
        let mut guard = AdvanceGuard::default();
        guard.try_acquire(AdvanceOrigin::Command, 0).unwrap();
        assert!(!guard.manual_origin());
        assert!(guard.release(0));

        guard.try_acquire(AdvanceOrigin::Manual, 0).unwrap();
        assert!(guard.manual_origin());
        assert!(guard.release(0));
        assert!(!guard.is_held());
        assert!(!guard.manual_origin());
    }

    #[test]
    fn stale_release_keeps_the_newer_holder() {
        let mut guard = AdvanceGuard::default();
        guard.try_acquire(AdvanceOrigin::Command, 1).unwrap();
        guard.clear();
        guard.try_acquire(AdvanceOrigin::Command, 2).unwrap();

        assert!(!guard.release(1));
        assert!(guard.is_held());
        assert!(guard.release(2));
        assert!(!guard.is_held());
    }
}
