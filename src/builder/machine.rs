//! Builder for constructing machines.

use crate::action::Action;
use crate::builder::error::ConfigurationError;
use crate::config::MachineConfig;
use crate::core::{Patch, Snapshot};
use crate::machine::{check_name, Machine};
use stillwater::validation::Validation;
use stillwater::NonEmptyVec;

type Check = Validation<(), NonEmptyVec<ConfigurationError>>;

/// Builder for constructing machines with a fluent API.
///
/// Unlike calling [`Machine::add_action`] and [`Machine::add_sub_machine`]
/// one at a time, [`MachineBuilder::build`] checks every declaration up front
/// and reports all problems together.
#[derive(Default)]
pub struct MachineBuilder {
    label: Option<String>,
    initial: Patch,
    logging: bool,
    actions: Vec<Action>,
    children: Vec<(String, Machine)>,
}

impl MachineBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Set the initial state. Defaults to an empty object.
    pub fn initial(mut self, state: Patch) -> Self {
        self.initial = state;
        self
    }

    pub fn logging(mut self, enabled: bool) -> Self {
        self.logging = enabled;
        self
    }

    /// Apply a deserialized configuration.
    pub fn config(mut self, config: MachineConfig) -> Self {
        self.initial = config.initial_patch();
        self.label = config.label;
        self.logging = config.logging;
        self
    }

    pub fn action(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn actions(mut self, actions: impl IntoIterator<Item = Action>) -> Self {
        self.actions.extend(actions);
        self
    }

    /// Attach `machine` as sub-machine `name` when built.
    pub fn child(mut self, name: impl Into<String>, machine: Machine) -> Self {
        self.children.push((name.into(), machine));
        self
    }

    /// Build the machine.
    ///
    /// Returns the single problem found, or [`ConfigurationError::Multiple`]
    /// with every problem when there are several.
    pub fn build(self) -> Result<Machine, ConfigurationError> {
        match self.validate() {
            Validation::Success(_) => {}
            Validation::Failure(errors) => {
                let mut errors: Vec<ConfigurationError> = errors.iter().cloned().collect();
                return Err(if errors.len() == 1 {
                    errors.remove(0)
                } else {
                    ConfigurationError::Multiple(errors)
                });
            }
        }

        let machine = Machine::with_parts(Snapshot::from(self.initial), self.label, self.logging);
        machine.add_actions(self.actions)?;
        machine.add_sub_machines(self.children)?;
        Ok(machine)
    }

    fn validate(&self) -> Check {
        let mut checks: Vec<Check> = Vec::new();

        for action in &self.actions {
            checks.push(name_check(action.name()));
        }

        for (index, (name, child)) in self.children.iter().enumerate() {
            checks.push(name_check(name));

            let earlier = &self.children[..index];
            let check = if earlier.iter().any(|(n, _)| n == name) {
                Validation::fail(ConfigurationError::DuplicateChild(name.clone()))
            } else if let Some((first, _)) = earlier.iter().find(|(_, m)| m.ptr_eq(child)) {
                Validation::fail(ConfigurationError::AlreadyAttached(first.clone()))
            } else if self.actions.iter().any(|a| a.name() == name) {
                Validation::fail(ConfigurationError::NameConflict(name.clone()))
            } else if let Some(existing) = child.attached_as() {
                Validation::fail(ConfigurationError::AlreadyAttached(existing.to_string()))
            } else {
                Validation::success(())
            };
            checks.push(check);
        }

        Validation::all_vec(checks).map(|_| ())
    }
}

fn name_check(name: &str) -> Check {
    match check_name(name) {
        Ok(()) => Validation::success(()),
        Err(e) => Validation::fail(e),
    }
}
