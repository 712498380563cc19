#![forbid(unsafe_code)]

//! Change notification for store observers.
//!
//! Observers register a callback and receive every [`StoreEvent`] in
//! registration order. The hub holds only weak references; the returned
//! [`Subscription`] guard owns the callback, so dropping the guard
//! unsubscribes. Dead entries are pruned lazily on the next emit.
//!
//! # Failure Modes
//!
//! Callbacks receive the event only, never the store, so they cannot
//! re-enter a mutation while it is in progress. Hosts that want to react
//! by mutating should queue the work and run it after the call returns.

use std::cell::RefCell;
use std::rc::{Rc, Weak};

use crate::persistence::LoadSource;

/// What changed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    DesignChanged,
    PaletteChanged,
    InventoryChanged,
    SelectionChanged,
    /// Undo/redo availability may have changed.
    HistoryChanged {
        can_undo: bool,
        can_redo: bool,
    },
    /// Startup state came from somewhere other than the primary slot.
    Recovered(LoadSource),
}

type CallbackRc = Rc<dyn Fn(&StoreEvent)>;
type CallbackWeak = Weak<dyn Fn(&StoreEvent)>;

#[derive(Default)]
pub struct EventHub {
    subscribers: RefCell<Vec<CallbackWeak>>,
}

impl std::fmt::Debug for EventHub {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventHub")
            .field("subscriber_count", &self.subscriber_count())
            .finish()
    }
}

impl EventHub {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn subscribe(&self, callback: impl Fn(&StoreEvent) + 'static) -> Subscription {
        let strong: CallbackRc = Rc::new(callback);
        let weak = Rc::downgrade(&strong);
        self.subscribers.borrow_mut().push(weak);
        Subscription { _guard: strong }
    }

    /// Deliver `event` to every live subscriber.
    pub fn emit(&self, event: &StoreEvent) {
        let callbacks: Vec<CallbackRc> = {
            let mut subscribers = self.subscribers.borrow_mut();
            subscribers.retain(|weak| weak.strong_count() > 0);
            subscribers.iter().filter_map(Weak::upgrade).collect()
        };
        for callback in &callbacks {
            callback(event);
        }
    }

    /// Registered subscribers, including dropped ones not yet pruned.
    #[must_use]
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.borrow().len()
    }
}

/// RAII guard for a store observer. Dropping it unsubscribes.
pub struct Subscription {
    _guard: CallbackRc,
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").finish_non_exhaustive()
    }
}
