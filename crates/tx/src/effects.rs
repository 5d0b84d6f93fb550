// Path: crates/tx/src/effects.rs
//! Side effects on node-local state that routes may request.
//!
//! Local events live outside consensus state, so routes never write them
//! directly. They queue operations here; the block executor keeps the
//! operations of successful transactions and applies them at commit.

use strata_types::app::ResolutionId;

/// One queued change to the local event store.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LocalOp {
    /// Forget the event.
    Delete(ResolutionId),
    /// Keep the event but stop proposing it.
    MarkReceived(ResolutionId),
}

/// Local operations accumulated over a block.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct LocalEffects {
    ops: Vec<LocalOp>,
}

impl LocalEffects {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn delete(&mut self, id: ResolutionId) {
        self.ops.push(LocalOp::Delete(id));
    }

    pub fn mark_received(&mut self, id: ResolutionId) {
        self.ops.push(LocalOp::MarkReceived(id));
    }

    /// Appends the operations of a finished transaction.
    pub fn extend(&mut self, other: LocalEffects) {
        self.ops.extend(other.ops);
    }

    pub fn ops(&self) -> &[LocalOp] {
        &self.ops
    }

    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Takes every queued operation, leaving this set empty.
    pub fn drain(&mut self) -> Vec<LocalOp> {
        std::mem::take(&mut self.ops)
    }
}
