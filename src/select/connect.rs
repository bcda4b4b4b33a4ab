//! `connect`: feed a projected slice of state into a consumer.

use super::selector::{Selection, Selector};
use crate::core::Snapshot;
use crate::machine::Machine;
use parking_lot::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

/// Build a [`Connector`] from a state-to-props projection.
///
/// # Example
///
/// ```rust
/// use arbor::{connect, patch, Machine};
/// use serde_json::Value;
///
/// let machine = Machine::new(patch! { "loadState" => "new" });
/// let view = connect(|state| state.get("loadState").cloned())
///     .wrap(&machine, |title: &String, load_state: &Option<Value>| {
///         format!("{title}: {}", load_state.as_ref().and_then(Value::as_str).unwrap_or("?"))
///     });
///
/// assert_eq!(view.render("status".to_string()), "status: new");
/// ```
pub fn connect<P, F>(map_state: F) -> Connector<P>
where
    P: Clone + PartialEq + Send + Sync + 'static,
    F: Fn(&Snapshot) -> P + Send + Sync + 'static,
{
    Connector {
        selector: Selector::new(map_state),
    }
}

/// Wraps consumers so they receive a projected slice as extra input.
#[derive(Clone, Debug)]
pub struct Connector<P> {
    selector: Selector<P>,
}

impl<P: Clone + Send + Sync + 'static> Connector<P> {
    /// Subscribe `component` to `machine`.
    ///
    /// The component is invoked on [`Connected::render`] and again, with the
    /// last rendered input, every time the projection changes.
    pub fn wrap<I, O, C>(&self, machine: &Machine, component: C) -> Connected<I, P, O>
    where
        I: Clone + Send + 'static,
        O: Clone + Send + 'static,
        C: Fn(&I, &P) -> O + Send + Sync + 'static,
    {
        let shared: Arc<Shared<I, P, O>> = Arc::new(Shared {
            component: Box::new(component),
            input: Mutex::new(None),
            output: Mutex::new(None),
            renders: AtomicUsize::new(0),
        });

        let rerender = Arc::clone(&shared);
        let selection = self.selector.subscribe(machine, move |props| {
            let input = rerender.input.lock().clone();
            if let Some(input) = input {
                rerender.render(&input, props);
            }
        });

        Connected { shared, selection }
    }
}

struct Shared<I, P, O> {
    component: Box<dyn Fn(&I, &P) -> O + Send + Sync>,
    input: Mutex<Option<I>>,
    output: Mutex<Option<O>>,
    renders: AtomicUsize,
}

impl<I, P, O: Clone> Shared<I, P, O> {
    fn render(&self, input: &I, props: &P) -> O {
        let output = (self.component)(input, props);
        *self.output.lock() = Some(output.clone());
        self.renders.fetch_add(1, Ordering::SeqCst);
        output
    }
}

/// A consumer bound to a machine through a projection.
///
/// Dropping it ends the subscription.
pub struct Connected<I, P, O> {
    shared: Arc<Shared<I, P, O>>,
    selection: Selection<P>,
}

impl<I: Clone, P: Clone, O: Clone> Connected<I, P, O> {
    /// Invoke the component with `input` and the current props.
    pub fn render(&self, input: I) -> O {
        *self.shared.input.lock() = Some(input.clone());
        let props = self.selection.get();
        self.shared.render(&input, &props)
    }

    /// Output of the most recent invocation.
    pub fn output(&self) -> Option<O> {
        self.shared.output.lock().clone()
    }

    pub fn props(&self) -> P {
        self.selection.get()
    }

    /// How many times the component has been invoked.
    pub fn render_count(&self) -> usize {
        self.shared.renders.load(Ordering::SeqCst)
    }
}
