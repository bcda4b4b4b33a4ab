//! Derived-value subscriptions.

use crate::core::{Event, EventKind, Snapshot};
use crate::machine::{Machine, Unsubscribe};
use parking_lot::Mutex;
use std::fmt;
use std::sync::Arc;

type Projection<T> = Arc<dyn Fn(&Snapshot) -> T + Send + Sync>;
type Equality<T> = Arc<dyn Fn(&T, &T) -> bool + Send + Sync>;

/// A pure projection from state to a derived value, plus the rule that
/// decides whether two projected values are "the same".
///
/// The default rule is `PartialEq`. Use [`Selector::with_equality`] for
/// anything else, e.g. identity of a shared field:
///
/// ```rust
/// use arbor::core::Snapshot;
/// use arbor::select::Selector;
/// use std::sync::Arc;
///
/// let by_identity = Selector::with_equality(
///     |state: &Snapshot| state.field("data").cloned(),
///     |a, b| match (a, b) {
///         (Some(a), Some(b)) => Arc::ptr_eq(a, b),
///         (None, None) => true,
///         _ => false,
///     },
/// );
/// # let _ = by_identity;
/// ```
pub struct Selector<T> {
    project: Projection<T>,
    same: Equality<T>,
}

impl<T: PartialEq + 'static> Selector<T> {
    pub fn new<F>(project: F) -> Self
    where
        F: Fn(&Snapshot) -> T + Send + Sync + 'static,
    {
        Self::with_equality(project, |a: &T, b: &T| a == b)
    }
}

impl<T: 'static> Selector<T> {
    pub fn with_equality<F, E>(project: F, same: E) -> Self
    where
        F: Fn(&Snapshot) -> T + Send + Sync + 'static,
        E: Fn(&T, &T) -> bool + Send + Sync + 'static,
    {
        Self {
            project: Arc::new(project),
            same: Arc::new(same),
        }
    }

    /// Apply the projection.
    pub fn select(&self, state: &Snapshot) -> T {
        (self.project)(state)
    }

    /// True if the projection differs between the two states of `event`.
    pub fn changed(&self, event: &Event) -> bool {
        let new = self.select(&event.new_state);
        let old = self.select(&event.old_state);
        !(self.same)(&new, &old)
    }
}

impl<T: Clone + Send + 'static> Selector<T> {
    /// Start observing `machine`.
    ///
    /// The projection is computed immediately from the current state. After
    /// that, `on_change` runs once for every `step` whose projected new and
    /// old values differ. The subscription ends when the returned
    /// [`Selection`] is dropped.
    pub fn subscribe<C>(&self, machine: &Machine, on_change: C) -> Selection<T>
    where
        C: Fn(&T) + Send + Sync + 'static,
    {
        let current = Arc::new(Mutex::new(self.select(&machine.get_state())));
        let project = Arc::clone(&self.project);
        let same = Arc::clone(&self.same);
        let held = Arc::clone(&current);

        let subscription = machine.listen(EventKind::Step, move |event| {
            let new = project(&event.new_state);
            let old = project(&event.old_state);
            if same(&new, &old) {
                return;
            }
            *held.lock() = new.clone();
            on_change(&new);
        });

        Selection {
            current,
            subscription,
        }
    }
}

impl<T> Clone for Selector<T> {
    fn clone(&self) -> Self {
        Self {
            project: Arc::clone(&self.project),
            same: Arc::clone(&self.same),
        }
    }
}

impl<T> fmt::Debug for Selector<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("Selector")
    }
}

/// A live projected value. Unsubscribes when dropped.
pub struct Selection<T> {
    current: Arc<Mutex<T>>,
    subscription: Unsubscribe,
}

impl<T> Selection<T> {
    /// Latest projected value.
    pub fn get(&self) -> T
    where
        T: Clone,
    {
        self.current.lock().clone()
    }

    /// Borrow the latest projected value.
    pub fn with<R>(&self, read: impl FnOnce(&T) -> R) -> R {
        read(&self.current.lock())
    }

    pub fn is_attached(&self) -> bool {
        self.subscription.is_active()
    }
}

impl<T> Drop for Selection<T> {
    fn drop(&mut self) {
        self.subscription.unsubscribe();
    }
}

impl<T: fmt::Debug> fmt::Debug for Selection<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Selection")
            .field("current", &*self.current.lock())
            .finish()
    }
}

/// A selector bound to one machine; the reusable form of [`Machine::use_selector`].
#[derive(Clone, Debug)]
pub struct BoundSelector<T> {
    machine: Machine,
    selector: Selector<T>,
}

impl<T: Clone + Send + 'static> BoundSelector<T> {
    /// Projection of the machine's current state.
    pub fn current(&self) -> T {
        self.selector.select(&self.machine.get_state())
    }

    pub fn use_selector<C>(&self, on_change: C) -> Selection<T>
    where
        C: Fn(&T) + Send + Sync + 'static,
    {
        self.selector.subscribe(&self.machine, on_change)
    }
}

impl Machine {
    /// Subscribe to a projection of this machine's state.
    pub fn use_selector<T, F, C>(&self, project: F, on_change: C) -> Selection<T>
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&Snapshot) -> T + Send + Sync + 'static,
        C: Fn(&T) + Send + Sync + 'static,
    {
        Selector::new(project).subscribe(self, on_change)
    }

    /// Bind a projection to this machine for repeated use.
    pub fn select<T, F>(&self, project: F) -> BoundSelector<T>
    where
        T: Clone + PartialEq + Send + 'static,
        F: Fn(&Snapshot) -> T + Send + Sync + 'static,
    {
        BoundSelector {
            machine: self.clone(),
            selector: Selector::new(project),
        }
    }
}
