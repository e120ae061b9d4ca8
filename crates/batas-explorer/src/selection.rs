//! Selected village.

use batas_core::types::EntityId;

/// At most one selected village. Selecting id `0` clears the selection.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Selection {
    current: Option<EntityId>,
}

impl Selection {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self) -> Option<EntityId> {
        self.current
    }

    pub fn is_selected(&self, id: EntityId) -> bool {
        self.current == Some(id)
    }

    /// Replaces the selection. Returns true if it changed.
    pub fn select(&mut self, id: EntityId) -> bool {
        let next = Some(id).filter(|id| !id.is_none());
        let changed = next != self.current;
        self.current = next;
        changed
    }
}
