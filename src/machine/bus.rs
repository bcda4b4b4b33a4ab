//! Per-machine listener registry.

use crate::core::{Event, EventKind};
use parking_lot::Mutex;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Weak};

/// Callback invoked for every matching event.
pub type Listener = Arc<dyn Fn(&Event) + Send + Sync>;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct ListenerId(u64);

struct Registration {
    id: ListenerId,
    kind: EventKind,
    listener: Listener,
}

/// Listeners of one machine, kept in registration order.
#[derive(Default)]
pub(crate) struct EventBus {
    next_id: AtomicU64,
    registrations: Mutex<Vec<Registration>>,
}

impl EventBus {
    pub(crate) fn subscribe(self: &Arc<Self>, kinds: &[EventKind], listener: Listener) -> Unsubscribe {
        let mut registrations = self.registrations.lock();
        let ids = kinds
            .iter()
            .map(|&kind| {
                let id = ListenerId(self.next_id.fetch_add(1, Ordering::Relaxed));
                registrations.push(Registration {
                    id,
                    kind,
                    listener: Arc::clone(&listener),
                });
                id
            })
            .collect();
        Unsubscribe {
            bus: Arc::downgrade(self),
            ids,
        }
    }

    /// Deliver `event` to every listener of its kind, in registration order.
    ///
    /// The registry lock is released while callbacks run, so a callback may
    /// subscribe or unsubscribe. A listener removed mid-delivery is skipped.
    pub(crate) fn announce(&self, event: &Event) {
        let targets: Vec<(ListenerId, Listener)> = self
            .registrations
            .lock()
            .iter()
            .filter(|r| r.kind == event.kind)
            .map(|r| (r.id, Arc::clone(&r.listener)))
            .collect();

        for (id, listener) in targets {
            if self.is_registered(id) {
                listener(event);
            }
        }
    }

    pub(crate) fn listener_count(&self, kind: EventKind) -> usize {
        self.registrations
            .lock()
            .iter()
            .filter(|r| r.kind == kind)
            .count()
    }

    fn is_registered(&self, id: ListenerId) -> bool {
        self.registrations.lock().iter().any(|r| r.id == id)
    }

    fn remove(&self, ids: &[ListenerId]) {
        self.registrations
            .lock()
            .retain(|r| !ids.contains(&r.id));
    }
}

/// Handle returned by `listen`; detaches the registration it came from.
///
/// Calling [`Unsubscribe::unsubscribe`] more than once is harmless, and it
/// never touches other registrations of the same callback. Dropping the
/// handle does not unsubscribe.
pub struct Unsubscribe {
    bus: Weak<EventBus>,
    ids: Vec<ListenerId>,
}

impl Unsubscribe {
    pub fn unsubscribe(&self) {
        if let Some(bus) = self.bus.upgrade() {
            bus.remove(&self.ids);
        }
    }

    /// True while at least one of the registrations is still attached.
    pub fn is_active(&self) -> bool {
        self.bus
            .upgrade()
            .is_some_and(|bus| self.ids.iter().any(|&id| bus.is_registered(id)))
    }
}

impl std::fmt::Debug for Unsubscribe {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Unsubscribe")
            .field("registrations", &self.ids.len())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::{Path, Snapshot};
    use chrono::Utc;

    fn event(kind: EventKind) -> Event {
        Event {
            kind,
            action: "test".to_string(),
            path: Path::root(),
            new_state: Snapshot::new(),
            old_state: Snapshot::new(),
            timestamp: Utc::now(),
        }
    }

    fn recorder(log: &Arc<Mutex<Vec<String>>>, tag: &str) -> Listener {
        let log = Arc::clone(log);
        let tag = tag.to_string();
        Arc::new(move |e: &Event| log.lock().push(format!("{tag}:{}", e.kind)))
    }

    #[test]
    fn delivers_in_registration_order() {
        let bus = Arc::new(EventBus::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let _a = bus.subscribe(&[EventKind::Step], recorder(&log, "a"));
        let _b = bus.subscribe(&[EventKind::Step], recorder(&log, "b"));

        bus.announce(&event(EventKind::Step));
        bus.announce(&event(EventKind::Init));

        assert_eq!(*log.lock(), vec!["a:step", "b:step"]);
    }

    #[test]
    fn same_callback_registrations_are_independent() {
        let bus = Arc::new(EventBus::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let listener = recorder(&log, "x");
        let first = bus.subscribe(&[EventKind::Step], Arc::clone(&listener));
        let _second = bus.subscribe(&[EventKind::Step], listener);

        first.unsubscribe();
        first.unsubscribe();
        bus.announce(&event(EventKind::Step));

        assert_eq!(*log.lock(), vec!["x:step"]);
        assert!(!first.is_active());
    }

    #[test]
    fn all_kinds_share_one_unsubscribe() {
        let bus = Arc::new(EventBus::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let all = bus.subscribe(&EventKind::ALL, recorder(&log, "all"));

        for kind in EventKind::ALL {
            bus.announce(&event(kind));
        }
        all.unsubscribe();
        bus.announce(&event(EventKind::Complete));

        assert_eq!(*log.lock(), vec!["all:init", "all:step", "all:complete"]);
        for kind in EventKind::ALL {
            assert_eq!(bus.listener_count(kind), 0);
        }
    }

    #[test]
    fn listener_removed_during_delivery_is_skipped() {
        let bus = Arc::new(EventBus::default());
        let log = Arc::new(Mutex::new(Vec::new()));
        let victim: Arc<Mutex<Option<Unsubscribe>>> = Arc::new(Mutex::new(None));

        let slot = Arc::clone(&victim);
        let _killer = bus.subscribe(
            &[EventKind::Step],
            Arc::new(move |_e: &Event| {
                if let Some(handle) = slot.lock().as_ref() {
                    handle.unsubscribe();
                }
            }),
        );
        *victim.lock() = Some(bus.subscribe(&[EventKind::Step], recorder(&log, "victim")));

        bus.announce(&event(EventKind::Step));
        assert!(log.lock().is_empty());
    }

    #[test]
    fn announce_without_listeners_is_a_no_op() {
        let bus = Arc::new(EventBus::default());
        bus.announce(&event(EventKind::Complete));
        assert_eq!(bus.listener_count(EventKind::Complete), 0);
    }
}
