//! The filter contract
//!
//! A filter is a stateless unit of computation with two phases:
//! - **preflight**: read the tree, validate arguments, describe the
//!   structural change as [`OutputActions`]. Never touches bulk data.
//! - **execute**: run after those actions were applied; writes into the
//!   arrays and lists the actions created.
//!
//! [`FilterInstance`] drives one invocation through [`FilterState`].

use crate::action::{ApplyMode, OutputActions};
use crate::arguments::{Arguments, VersionedArguments};
use crate::parameter::Parameters;
use crate::progress::RunContext;
use crate::report::{Completion, Error, Report};
use crate::state_machine::{validate_transition, FilterState, StateError};
use serde::Serialize;
use std::fmt::Debug;
use strata_data::DataStructure;
use uuid::Uuid;

/// Arguments were written for a newer schema than the filter knows
pub const UPGRADE_NEWER_VERSION: i32 = -210;
/// Arguments were written for an older schema and no upgrade exists
pub const UPGRADE_OLDER_VERSION: i32 = -211;
/// Filter has no legacy import
pub const LEGACY_UNSUPPORTED: i32 = -400;

/// Display-only string produced by preflight
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PreflightValue {
    pub name: String,
    pub value: String,
}

/// Outcome of preflight
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PreflightResult {
    pub actions: Report<OutputActions>,
    pub values: Vec<PreflightValue>,
}

impl PreflightResult {
    #[must_use]
    pub fn ok(actions: OutputActions) -> Self {
        Self::from(Report::ok(actions))
    }

    #[must_use]
    pub fn fail(error: Error) -> Self {
        Self::from(Report::fail(error))
    }

    /// Attach an advisory value
    #[must_use]
    pub fn with_value(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.values.push(PreflightValue {
            name: name.into(),
            value: value.into(),
        });
        self
    }

    #[inline]
    #[must_use]
    pub fn is_valid(&self) -> bool {
        self.actions.is_valid()
    }
}

impl From<Report<OutputActions>> for PreflightResult {
    fn from(actions: Report<OutputActions>) -> Self {
        Self {
            actions,
            values: Vec::new(),
        }
    }
}

/// A unit of computation over a [`DataStructure`]
///
/// Implementations must be stateless: everything an invocation needs
/// arrives through [`Arguments`].
pub trait Filter: Send + Sync + Debug {
    /// Stable type name
    fn name(&self) -> &'static str;

    fn uuid(&self) -> Uuid;

    fn human_name(&self) -> &'static str;

    fn default_tags(&self) -> Vec<&'static str> {
        Vec::new()
    }

    fn parameters(&self) -> Parameters;

    /// Schema version of [`Filter::parameters`]
    fn parameters_version(&self) -> u32 {
        1
    }

    fn clone_box(&self) -> Box<dyn Filter>;

    /// Called with bound, validated arguments
    fn preflight_impl(
        &self,
        data: &DataStructure,
        args: &Arguments,
        ctx: &RunContext,
    ) -> PreflightResult;

    /// Called after the preflight actions were applied
    fn execute_impl(
        &self,
        data: &mut DataStructure,
        args: &Arguments,
        ctx: &RunContext,
    ) -> Report<Completion>;

    /// Convert a legacy parameter document into current arguments
    fn import_legacy_arguments(&self, _json: &serde_json::Value) -> Report<Arguments> {
        Report::fail(Error::import(
            LEGACY_UNSUPPORTED,
            format!("{} has no legacy parameter import", self.name()),
        ))
    }

    /// Upgrade arguments written for the older schema version `from`
    ///
    /// Only reached with `from < parameters_version()`.
    fn upgrade_arguments(&self, from: u32, _args: Arguments) -> Report<Arguments> {
        Report::fail(Error::argument(
            UPGRADE_OLDER_VERSION,
            format!(
                "{} cannot upgrade arguments from parameter version {from} to {}",
                self.name(),
                self.parameters_version()
            ),
        ))
    }

    fn default_arguments(&self) -> Arguments {
        self.parameters().default_arguments()
    }
}

impl Clone for Box<dyn Filter> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Checked entry points wrapping the `*_impl` methods
pub trait FilterExt: Filter {
    /// Bind, validate against `data`, then preflight
    fn preflight(&self, data: &DataStructure, args: &Arguments, ctx: &RunContext) -> PreflightResult {
        tracing::info!(filter = self.name(), "preflight");
        let params = self.parameters();
        let gate = params
            .bind(args)
            .and_then(|bound| params.validate_against(&bound, data).map(|()| bound));
        let (bound, warnings) = match gate.into_parts() {
            (Ok(bound), warnings) => (bound, warnings),
            (Err(errors), warnings) => {
                log_errors(self.name(), &errors);
                return PreflightResult::from(Report::fail_many(errors).with_warnings(warnings));
            }
        };

        let mut result = self.preflight_impl(data, &bound, ctx);
        result.actions = Report::ok(())
            .with_warnings(warnings)
            .and_then(|()| result.actions);
        if result.actions.is_valid() {
            for warning in result.actions.warnings() {
                tracing::warn!(filter = self.name(), code = warning.code, "{}", warning.message);
            }
        } else {
            log_errors(self.name(), result.actions.errors());
        }
        result
    }

    /// Bind, check selections, then execute
    fn execute(&self, data: &mut DataStructure, args: &Arguments, ctx: &RunContext) -> Report<Completion> {
        tracing::info!(filter = self.name(), "execute");
        let params = self.parameters();
        let report = params.bind(args).and_then(|bound| {
            params
                .validate_selections(&bound, data)
                .map(|()| bound)
        });
        let report = report.and_then(|bound| self.execute_impl(data, &bound, ctx));
        if !report.is_valid() {
            log_errors(self.name(), report.errors());
        }
        report
    }

    /// Preflight, apply the actions with allocation, execute
    fn run(&self, data: &mut DataStructure, args: &Arguments, ctx: &RunContext) -> Report<Completion> {
        let result = self.preflight(data, args, ctx);
        result
            .actions
            .and_then(|actions| Report::from(actions.apply_all(data, ApplyMode::Execute).map_err(Error::from)))
            .and_then(|()| self.execute(data, args, ctx))
    }

    /// Bring versioned arguments to the current schema
    fn upgrade(&self, versioned: VersionedArguments) -> Report<Arguments> {
        let current = self.parameters_version();
        match versioned.version.cmp(&current) {
            std::cmp::Ordering::Equal => Report::ok(versioned.arguments),
            std::cmp::Ordering::Greater => Report::fail(Error::argument(
                UPGRADE_NEWER_VERSION,
                format!(
                    "{} arguments have parameter version {}, newer than supported {current}",
                    self.name(),
                    versioned.version
                ),
            )),
            std::cmp::Ordering::Less => {
                tracing::debug!(
                    filter = self.name(),
                    from = versioned.version,
                    to = current,
                    "upgrading arguments"
                );
                self.upgrade_arguments(versioned.version, versioned.arguments)
            }
        }
    }
}

impl<T: Filter + ?Sized> FilterExt for T {}

fn log_errors(filter: &str, errors: &[Error]) {
    for error in errors {
        tracing::error!(filter, code = error.code, kind = %error.kind, "{}", error.message);
    }
}

/// One filter invocation with lifecycle bookkeeping
#[derive(Debug, Clone)]
pub struct FilterInstance {
    filter: Box<dyn Filter>,
    state: FilterState,
    arguments: Option<Arguments>,
    actions: Option<OutputActions>,
    values: Vec<PreflightValue>,
}

impl FilterInstance {
    #[must_use]
    pub fn new(filter: Box<dyn Filter>) -> Self {
        Self {
            filter,
            state: FilterState::Unbound,
            arguments: None,
            actions: None,
            values: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn filter(&self) -> &dyn Filter {
        self.filter.as_ref()
    }

    #[inline]
    #[must_use]
    pub fn state(&self) -> FilterState {
        self.state
    }

    /// Bound arguments, once bound
    #[must_use]
    pub fn arguments(&self) -> Option<&Arguments> {
        self.arguments.as_ref()
    }

    /// Actions from the last successful preflight
    #[must_use]
    pub fn actions(&self) -> Option<&OutputActions> {
        self.actions.as_ref()
    }

    #[must_use]
    pub fn preflight_values(&self) -> &[PreflightValue] {
        &self.values
    }

    fn transition(&mut self, to: FilterState) -> Result<(), StateError> {
        validate_transition(self.state, to)?;
        tracing::trace!(filter = self.filter.name(), from = %self.state, %to, "state transition");
        self.state = to;
        Ok(())
    }

    fn fail(&mut self) {
        if validate_transition(self.state, FilterState::Failed).is_ok() {
            self.state = FilterState::Failed;
        }
    }

    /// Bind `args`; a failed bind moves the instance to `Failed`
    pub fn bind(&mut self, args: &Arguments) -> Report {
        if let Err(e) = validate_transition(self.state, FilterState::Bound) {
            return Report::fail(e.into());
        }
        let report = self.filter.parameters().bind(args);
        match report.value() {
            Some(bound) => {
                self.arguments = Some(bound.clone());
                self.actions = None;
                self.values.clear();
                let _ = self.transition(FilterState::Bound);
            }
            None => self.fail(),
        }
        report.discard()
    }

    /// Preflight against `data`; repeatable while not yet applied
    pub fn preflight(&mut self, data: &DataStructure, ctx: &RunContext) -> Report<OutputActions> {
        if let Err(e) = validate_transition(self.state, FilterState::Preflighted) {
            return Report::fail(e.into());
        }
        let args = self.arguments.clone().unwrap_or_default();
        let result = self.filter.preflight(data, &args, ctx);
        match result.actions.value() {
            Some(actions) => {
                self.actions = Some(actions.clone());
                self.values = result.values;
                let _ = self.transition(FilterState::Preflighted);
            }
            None => self.fail(),
        }
        result.actions
    }

    /// Apply the preflight actions to `data`
    pub fn apply(&mut self, data: &mut DataStructure, mode: ApplyMode) -> Report {
        if let Err(e) = validate_transition(self.state, FilterState::Applied) {
            return Report::fail(e.into());
        }
        let Some(actions) = self.actions.as_ref() else {
            return Report::ok(());
        };
        match actions.apply_all(data, mode) {
            Ok(()) => {
                let _ = self.transition(FilterState::Applied);
                Report::ok(())
            }
            Err(e) => {
                self.fail();
                Report::fail(e.into())
            }
        }
    }

    /// Execute over the already-applied tree
    pub fn execute(&mut self, data: &mut DataStructure, ctx: &RunContext) -> Report<Completion> {
        if let Err(e) = validate_transition(self.state, FilterState::Executed) {
            return Report::fail(e.into());
        }
        let args = self.arguments.clone().unwrap_or_default();
        let report = self.filter.execute(data, &args, ctx);
        match report.value() {
            Some(Completion::Finished) => {
                let _ = self.transition(FilterState::Executed);
            }
            Some(Completion::Cancelled) => {
                let _ = self.transition(FilterState::Cancelled);
            }
            None => self.fail(),
        }
        report
    }

    /// Mark an executed invocation done
    ///
    /// # Errors
    /// [`StateError`] unless the instance is `Executed`.
    pub fn finish(&mut self) -> Result<(), StateError> {
        self.transition(FilterState::Done)
    }
}
