//! Document change listeners
//!
//! Pre-hooks run before a child is added or removed and may veto the change;
//! post-hooks run after it happened and cannot.

use slotmap::{new_key_type, SlotMap};

use super::{Document, NodeKey};

new_key_type! {
    /// Key for registered listeners, used for removal
    pub struct ListenerKey;
}

/// A listener's refusal of a pending change
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{reason}")]
pub struct Veto {
    reason: String,
}

impl Veto {
    pub fn new(reason: impl Into<String>) -> Self {
        Self {
            reason: reason.into(),
        }
    }

    pub fn reason(&self) -> &str {
        &self.reason
    }
}

/// The parent and child of a structural change
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChildEvent {
    pub parent: NodeKey,
    pub child: NodeKey,
}

/// Callback run before a change; `Err` cancels it
pub type PreHook = Box<dyn FnMut(&Document, &ChildEvent) -> Result<(), Veto> + Send>;
/// Callback run after a change
pub type PostHook = Box<dyn FnMut(&Document, &ChildEvent) + Send>;

pub(super) enum Listener {
    ChildAdding(PreHook),
    ChildAdded(PostHook),
    ChildRemoving(PreHook),
    ChildRemoved(PostHook),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(super) enum EventType {
    ChildAdding,
    ChildAdded,
    ChildRemoving,
    ChildRemoved,
}

impl Listener {
    fn event_type(&self) -> EventType {
        match self {
            Self::ChildAdding(_) => EventType::ChildAdding,
            Self::ChildAdded(_) => EventType::ChildAdded,
            Self::ChildRemoving(_) => EventType::ChildRemoving,
            Self::ChildRemoved(_) => EventType::ChildRemoved,
        }
    }
}

#[derive(Default)]
pub(super) struct Listeners {
    callbacks: SlotMap<ListenerKey, Listener>,
}

impl Listeners {
    pub(super) fn insert(&mut self, listener: Listener) -> ListenerKey {
        self.callbacks.insert(listener)
    }

    pub(super) fn remove(&mut self, key: ListenerKey) -> bool {
        self.callbacks.remove(key).is_some()
    }

    pub(super) fn len(&self) -> usize {
        self.callbacks.len()
    }

    /// Run the pre-hooks of `kind`, stopping at the first veto
    pub(super) fn fire_pre(
        &mut self,
        kind: EventType,
        document: &Document,
        event: &ChildEvent,
    ) -> Result<(), Veto> {
        for (_, listener) in self.callbacks.iter_mut() {
            if listener.event_type() != kind {
                continue;
            }
            if let Listener::ChildAdding(hook) | Listener::ChildRemoving(hook) = listener {
                hook(document, event)?;
            }
        }
        Ok(())
    }

    pub(super) fn fire_post(&mut self, kind: EventType, document: &Document, event: &ChildEvent) {
        for (_, listener) in self.callbacks.iter_mut() {
            if listener.event_type() != kind {
                continue;
            }
            if let Listener::ChildAdded(hook) | Listener::ChildRemoved(hook) = listener {
                hook(document, event);
            }
        }
    }
}

impl std::fmt::Debug for Listeners {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Listeners")
            .field("count", &self.callbacks.len())
            .finish()
    }
}
