//! Builder for constructing actions.

use crate::action::{Action, ActionFailure, ActionKind, Emit};
use crate::builder::error::ConfigurationError;
use crate::core::Patch;
use crate::machine::Machine;
use futures::Stream;
use serde_json::Value;
use stillwater::effect::BoxedEffect;

/// Builder for constructing actions with a fluent API.
#[derive(Default)]
pub struct ActionBuilder {
    name: Option<String>,
    kind: Option<ActionKind>,
}

impl ActionBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the action name (required).
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Use an effect factory as the body.
    pub fn sync<F>(mut self, factory: F) -> Self
    where
        F: Fn(Value) -> BoxedEffect<Patch, ActionFailure, Machine> + Send + Sync + 'static,
    {
        self.kind = Some(ActionKind::sync(factory));
        self
    }

    /// Use a plain function as the body.
    pub fn sync_fn<F>(mut self, body: F) -> Self
    where
        F: Fn(&Machine, &Value) -> Result<Patch, ActionFailure> + Send + Sync + 'static,
    {
        self.kind = Some(ActionKind::sync_fn(body));
        self
    }

    /// Use a stream factory as the body.
    pub fn sequence<F, S>(mut self, factory: F) -> Self
    where
        F: Fn(Machine, Value) -> S + Send + Sync + 'static,
        S: Stream<Item = Result<Emit, ActionFailure>> + Send + 'static,
    {
        self.kind = Some(ActionKind::sequence(factory));
        self
    }

    /// Build the action.
    ///
    /// Only the presence of a name and a body is checked here; the name
    /// itself is validated when the action is registered.
    pub fn build(self) -> Result<Action, ConfigurationError> {
        let name = self.name.ok_or(ConfigurationError::MissingName)?;
        let kind = self
            .kind
            .ok_or_else(|| ConfigurationError::MissingBody(name.clone()))?;
        Ok(Action::new(name, kind))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use futures::stream;
    use stillwater::prelude::*;

    #[test]
    fn builder_validates_required_fields() {
        assert_eq!(
            ActionBuilder::new().build().unwrap_err(),
            ConfigurationError::MissingName
        );
        assert_eq!(
            ActionBuilder::new().name("start").build().unwrap_err(),
            ConfigurationError::MissingBody("start".to_string())
        );
    }

    #[test]
    fn fluent_api_builds_each_kind() {
        let sync = ActionBuilder::new()
            .name("fixed")
            .sync(|_args| pure(Patch::new().set("a", 1)).boxed())
            .build()
            .unwrap();
        assert_eq!(sync.name(), "fixed");
        assert!(!sync.is_sequence());

        let seq = ActionBuilder::new()
            .name("steps")
            .sequence(|_m, _a| stream::iter(vec![Ok(Emit::Patch(Patch::new()))]))
            .build()
            .unwrap();
        assert!(seq.is_sequence());
    }

    #[test]
    fn last_body_wins() {
        let action = ActionBuilder::new()
            .name("x")
            .sequence(|_m, _a| stream::empty())
            .sync_fn(|_m, _a| Ok(Patch::new()))
            .build()
            .unwrap();
        assert!(!action.is_sequence());
    }
}
