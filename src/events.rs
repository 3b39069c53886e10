//! Per-host event handler storage
//!
//! An `EventHandlerList` is a small associative store mapping an opaque
//! key to a list of handlers, so a host can carry storage for many
//! declared events without a dedicated field per event. Hosts that
//! declare few events pay for exactly what they use.

use std::sync::Arc;

/// A subscribable notification callback.
///
/// Handlers are `Arc`'d closures so that a subscription carries an
/// identity: removing a handler means removing that exact `Arc`.
pub type EventHandler = Arc<dyn Fn() + Send + Sync>;

/// Opaque key identifying one event within a host's handler list.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Debug)]
pub struct EventKey(&'static str);

impl EventKey {
    pub const fn new(name: &'static str) -> Self {
        Self(name)
    }

    pub fn name(self) -> &'static str {
        self.0
    }
}

struct Entry {
    key: EventKey,
    handlers: Vec<EventHandler>,
    next: Option<Box<Entry>>,
}

/// Singly linked (key, handlers) store with head insertion.
///
/// Lookup is a linear scan; the expected number of distinct keys per
/// host is small (one per declared event).
#[derive(Default)]
pub struct EventHandlerList {
    head: Option<Box<Entry>>,
}

impl EventHandlerList {
    pub fn new() -> Self {
        Self { head: None }
    }

    /// Get the handlers registered for a key, or an empty slice.
    pub fn handlers(&self, key: EventKey) -> &[EventHandler] {
        self.entry(key)
            .map(|entry| entry.handlers.as_slice())
            .unwrap_or(&[])
    }

    /// Clone the handlers for a key so they can be invoked without
    /// keeping the list borrowed.
    pub fn snapshot(&self, key: EventKey) -> Vec<EventHandler> {
        self.entry(key)
            .map(|entry| entry.handlers.clone())
            .unwrap_or_default()
    }

    /// Replace the entire handler set for a key.
    pub fn set(&mut self, key: EventKey, handlers: Vec<EventHandler>) {
        if let Some(entry) = Self::entry_mut(&mut self.head, key) {
            entry.handlers = handlers;
            return;
        }
        self.head = Some(Box::new(Entry {
            key,
            handlers,
            next: self.head.take(),
        }));
    }

    /// Append a handler to the set for a key, creating the entry on
    /// first use.
    pub fn add_handler(&mut self, key: EventKey, handler: EventHandler) {
        if let Some(entry) = Self::entry_mut(&mut self.head, key) {
            entry.handlers.push(handler);
            return;
        }
        self.head = Some(Box::new(Entry {
            key,
            handlers: vec![handler],
            next: self.head.take(),
        }));
    }

    /// Remove the last registered occurrence of a handler.
    ///
    /// Silently does nothing if the key or that exact handler is
    /// absent.
    pub fn remove_handler(&mut self, key: EventKey, handler: &EventHandler) {
        if let Some(entry) = Self::entry_mut(&mut self.head, key) {
            if let Some(index) = entry
                .handlers
                .iter()
                .rposition(|existing| same_handler(existing, handler))
            {
                entry.handlers.remove(index);
            }
        }
    }

    /// Copy every entry from another list into this one, appending to
    /// any handlers already registered under the same keys.
    pub fn add_handlers_from(&mut self, other: &EventHandlerList) {
        let mut cursor = other.head.as_deref();
        while let Some(entry) = cursor {
            for handler in &entry.handlers {
                self.add_handler(entry.key, handler.clone());
            }
            cursor = entry.next.as_deref();
        }
    }

    /// Drop the entire list without invoking any handler.
    pub fn clear(&mut self) {
        self.head = None;
    }

    /// Number of distinct keys currently stored.
    pub fn len(&self) -> usize {
        let mut count = 0;
        let mut cursor = self.head.as_deref();
        while let Some(entry) = cursor {
            count += 1;
            cursor = entry.next.as_deref();
        }
        count
    }

    pub fn is_empty(&self) -> bool {
        self.head.is_none()
    }

    fn entry(&self, key: EventKey) -> Option<&Entry> {
        let mut cursor = self.head.as_deref();
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(entry);
            }
            cursor = entry.next.as_deref();
        }
        None
    }

    fn entry_mut(node: &mut Option<Box<Entry>>, key: EventKey) -> Option<&mut Entry> {
        let mut cursor = node;
        while let Some(entry) = cursor {
            if entry.key == key {
                return Some(entry);
            }
            cursor = &mut entry.next;
        }
        None
    }
}

/// Handler identity: the same `Arc` allocation, compared thin.
fn same_handler(a: &EventHandler, b: &EventHandler) -> bool {
    Arc::as_ptr(a) as *const () == Arc::as_ptr(b) as *const ()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    const ALPHA: EventKey = EventKey::new("alpha");
    const BETA: EventKey = EventKey::new("beta");

    fn counting_handler(counter: Arc<AtomicUsize>) -> EventHandler {
        Arc::new(move || {
            counter.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_empty_list() {
        let list = EventHandlerList::new();
        assert!(list.is_empty());
        assert_eq!(list.len(), 0);
        assert!(list.handlers(ALPHA).is_empty());
    }

    #[test]
    fn test_add_and_invoke_in_order() {
        let mut list = EventHandlerList::new();
        let order = Arc::new(parking_lot::Mutex::new(Vec::new()));

        for tag in ["first", "second", "third"] {
            let order = order.clone();
            list.add_handler(ALPHA, Arc::new(move || order.lock().push(tag)));
        }

        for handler in list.snapshot(ALPHA) {
            handler();
        }
        assert_eq!(*order.lock(), vec!["first", "second", "third"]);
    }

    #[test]
    fn test_keys_are_independent() {
        let mut list = EventHandlerList::new();
        let counter = Arc::new(AtomicUsize::new(0));

        list.add_handler(ALPHA, counting_handler(counter.clone()));
        list.add_handler(BETA, counting_handler(counter.clone()));
        list.add_handler(BETA, counting_handler(counter.clone()));

        assert_eq!(list.len(), 2);
        assert_eq!(list.handlers(ALPHA).len(), 1);
        assert_eq!(list.handlers(BETA).len(), 2);
    }

    #[test]
    fn test_remove_handler_by_identity() {
        let mut list = EventHandlerList::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let keep = counting_handler(counter.clone());
        let gone = counting_handler(counter.clone());

        list.add_handler(ALPHA, keep.clone());
        list.add_handler(ALPHA, gone.clone());
        list.remove_handler(ALPHA, &gone);

        assert_eq!(list.handlers(ALPHA).len(), 1);
        assert!(same_handler(&list.handlers(ALPHA)[0], &keep));
    }

    #[test]
    fn test_remove_handler_drops_last_occurrence_only() {
        let mut list = EventHandlerList::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let handler = counting_handler(counter.clone());

        list.add_handler(ALPHA, handler.clone());
        list.add_handler(ALPHA, handler.clone());
        list.remove_handler(ALPHA, &handler);

        assert_eq!(list.handlers(ALPHA).len(), 1);
    }

    #[test]
    fn test_remove_handler_absent_is_noop() {
        let mut list = EventHandlerList::new();
        let counter = Arc::new(AtomicUsize::new(0));
        let never_added = counting_handler(counter.clone());

        list.remove_handler(ALPHA, &never_added);
        assert!(list.is_empty());

        list.add_handler(ALPHA, counting_handler(counter));
        list.remove_handler(ALPHA, &never_added);
        assert_eq!(list.handlers(ALPHA).len(), 1);
    }

    #[test]
    fn test_set_replaces_handlers() {
        let mut list = EventHandlerList::new();
        let counter = Arc::new(AtomicUsize::new(0));

        list.add_handler(ALPHA, counting_handler(counter.clone()));
        list.add_handler(ALPHA, counting_handler(counter.clone()));
        list.set(ALPHA, vec![counting_handler(counter.clone())]);

        assert_eq!(list.handlers(ALPHA).len(), 1);
    }

    #[test]
    fn test_add_handlers_from_merges() {
        let counter = Arc::new(AtomicUsize::new(0));

        let mut source = EventHandlerList::new();
        source.add_handler(ALPHA, counting_handler(counter.clone()));
        source.add_handler(BETA, counting_handler(counter.clone()));

        let mut target = EventHandlerList::new();
        target.add_handler(ALPHA, counting_handler(counter.clone()));
        target.add_handlers_from(&source);

        assert_eq!(target.handlers(ALPHA).len(), 2);
        assert_eq!(target.handlers(BETA).len(), 1);
    }

    #[test]
    fn test_clear_does_not_invoke() {
        let mut list = EventHandlerList::new();
        let counter = Arc::new(AtomicUsize::new(0));
        list.add_handler(ALPHA, counting_handler(counter.clone()));
        list.add_handler(BETA, counting_handler(counter.clone()));

        list.clear();
        assert!(list.is_empty());
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }
}
