//! Admission control for backup/restore operations.
//!
//! One slot, shared by both operation kinds: no two backups, no two
//! restores, and no backup concurrent with a restore. Acquisition never
//! blocks; release is tied to guard drop so the slot is cleared on every
//! exit path, including panics.

use std::sync::{Arc, Mutex};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Backup,
    Restore,
}

#[derive(Debug, Clone, Default)]
pub struct OperationGate {
    slot: Arc<Mutex<Option<Operation>>>,
}

impl OperationGate {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the gate for `op`. On conflict the operation currently holding
    /// the gate is returned so the caller can report the right error.
    pub fn try_acquire(&self, op: Operation) -> Result<GateGuard, Operation> {
        let mut slot = self.slot.lock().unwrap_or_else(|e| e.into_inner());
        match *slot {
            Some(held) => Err(held),
            None => {
                *slot = Some(op);
                Ok(GateGuard {
                    slot: self.slot.clone(),
                })
            }
        }
    }

    /// The operation currently holding the gate, if any.
    pub fn current(&self) -> Option<Operation> {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Releases the gate on drop.
#[derive(Debug)]
pub struct GateGuard {
    slot: Arc<Mutex<Option<Operation>>>,
}

impl Drop for GateGuard {
    fn drop(&mut self) {
        *self.slot.lock().unwrap_or_else(|e| e.into_inner()) = None;
    }
}
