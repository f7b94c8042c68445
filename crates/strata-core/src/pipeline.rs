//! Ordered filter pipelines and their JSON documents
//!
//! [`Pipeline::preflight`] runs every enabled filter's preflight against a
//! scratch clone of the tree, applying each action batch in shape-only mode so
//! later filters see the shapes earlier ones will produce.
//! [`Pipeline::execute`] does preflight, allocate-apply, execute per filter on
//! the real tree. Both stop at the first filter that reports an error.

use crate::action::{ApplyMode, OutputActions};
use crate::arguments::{Arguments, VersionedArguments};
use crate::filter::{Filter, FilterExt, PreflightValue};
use crate::progress::RunContext;
use crate::registry::{FilterRegistry, RegistryError};
use crate::report::{Completion, Error, Report, Warning};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use strata_data::DataStructure;
use thiserror::Error;
use uuid::Uuid;

/// One filter with its arguments
#[derive(Debug, Clone)]
pub struct PipelineNode {
    pub filter: Box<dyn Filter>,
    pub arguments: Arguments,
    pub enabled: bool,
}

impl PipelineNode {
    #[must_use]
    pub fn new(filter: Box<dyn Filter>, arguments: Arguments) -> Self {
        Self {
            filter,
            arguments,
            enabled: true,
        }
    }

    #[must_use]
    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// How a pipeline run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum PipelineOutcome {
    Completed,
    Failed { index: usize },
    Cancelled { index: usize },
}

/// What happened to one node
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NodeReport {
    pub index: usize,
    pub filter: String,
    pub uuid: Uuid,
    pub skipped: bool,
    pub actions: Option<OutputActions>,
    pub values: Vec<PreflightValue>,
    pub warnings: Vec<Warning>,
    pub errors: Vec<Error>,
    pub completion: Option<Completion>,
}

impl NodeReport {
    fn new(index: usize, filter: &dyn Filter) -> Self {
        Self {
            index,
            filter: filter.name().to_string(),
            uuid: filter.uuid(),
            skipped: false,
            actions: None,
            values: Vec::new(),
            warnings: Vec::new(),
            errors: Vec::new(),
            completion: None,
        }
    }

    /// Take warnings and errors from `report`, returning its value
    fn absorb<T>(&mut self, report: Report<T>) -> Option<T> {
        let (outcome, warnings) = report.into_parts();
        self.warnings.extend(warnings);
        match outcome {
            Ok(value) => Some(value),
            Err(errors) => {
                self.errors.extend(errors);
                None
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PipelineReport {
    pub name: String,
    pub nodes: Vec<NodeReport>,
    pub outcome: PipelineOutcome,
}

impl PipelineReport {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.outcome == PipelineOutcome::Completed
    }

    pub fn errors(&self) -> impl Iterator<Item = &Error> {
        self.nodes.iter().flat_map(|n| n.errors.iter())
    }

    pub fn warnings(&self) -> impl Iterator<Item = &Warning> {
        self.nodes.iter().flat_map(|n| n.warnings.iter())
    }
}

/// Ordered list of filters run against one tree
#[derive(Debug, Clone, Default)]
pub struct Pipeline {
    name: String,
    nodes: Vec<PipelineNode>,
    validate_invariants: bool,
}

impl Pipeline {
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    /// Append a filter (builder style)
    #[must_use]
    pub fn with(mut self, filter: Box<dyn Filter>, arguments: Arguments) -> Self {
        self.push(PipelineNode::new(filter, arguments));
        self
    }

    /// Audit the tree after each applied action batch
    #[must_use]
    pub fn with_invariant_checks(mut self, enabled: bool) -> Self {
        self.validate_invariants = enabled;
        self
    }

    pub fn push(&mut self, node: PipelineNode) {
        self.nodes.push(node);
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn nodes(&self) -> &[PipelineNode] {
        &self.nodes
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    /// Validate the whole pipeline without touching `data`
    #[must_use]
    pub fn preflight(&self, data: &DataStructure, ctx: &RunContext) -> PipelineReport {
        let mut scratch = data.clone();
        self.run(&mut scratch, ctx, false)
    }

    /// Preflight, apply and execute each filter in turn on `data`
    ///
    /// Actions already applied when a later filter fails stay applied.
    pub fn execute(&self, data: &mut DataStructure, ctx: &RunContext) -> PipelineReport {
        self.run(data, ctx, true)
    }

    fn run(&self, data: &mut DataStructure, ctx: &RunContext, execute: bool) -> PipelineReport {
        let mode = if execute {
            ApplyMode::Execute
        } else {
            ApplyMode::Preflight
        };
        tracing::info!(pipeline = %self.name, filters = self.nodes.len(), ?mode, "pipeline start");
        let mut reports = Vec::with_capacity(self.nodes.len());
        let mut outcome = PipelineOutcome::Completed;

        for (index, node) in self.nodes.iter().enumerate() {
            let mut report = NodeReport::new(index, node.filter.as_ref());
            if !node.enabled {
                tracing::debug!(index, filter = node.filter.name(), "skipping disabled filter");
                report.skipped = true;
                reports.push(report);
                continue;
            }
            if ctx.is_cancelled() {
                outcome = PipelineOutcome::Cancelled { index };
                reports.push(report);
                break;
            }

            let status = run_node(node, data, ctx, mode, self.validate_invariants, &mut report);
            reports.push(report);
            match status {
                NodeStatus::Ok => {}
                NodeStatus::Failed => {
                    outcome = PipelineOutcome::Failed { index };
                    break;
                }
                NodeStatus::Cancelled => {
                    outcome = PipelineOutcome::Cancelled { index };
                    break;
                }
            }
        }

        match outcome {
            PipelineOutcome::Completed => tracing::info!(pipeline = %self.name, "pipeline completed"),
            PipelineOutcome::Failed { index } => {
                tracing::error!(pipeline = %self.name, index, "pipeline failed");
            }
            PipelineOutcome::Cancelled { index } => {
                tracing::warn!(pipeline = %self.name, index, "pipeline cancelled");
            }
        }
        PipelineReport {
            name: self.name.clone(),
            nodes: reports,
            outcome,
        }
    }
}

enum NodeStatus {
    Ok,
    Failed,
    Cancelled,
}

fn run_node(
    node: &PipelineNode,
    data: &mut DataStructure,
    ctx: &RunContext,
    mode: ApplyMode,
    validate_invariants: bool,
    report: &mut NodeReport,
) -> NodeStatus {
    let result = node.filter.preflight(data, &node.arguments, ctx);
    report.values = result.values;
    let Some(actions) = report.absorb(result.actions) else {
        return NodeStatus::Failed;
    };

    if let Err(e) = actions.apply_all(data, mode) {
        report.errors.push(e.into());
        report.actions = Some(actions);
        return NodeStatus::Failed;
    }
    report.actions = Some(actions);

    if validate_invariants {
        if let Err(e) = data.validate_invariants() {
            report.errors.push(e.into());
            return NodeStatus::Failed;
        }
    }
    if !mode.allocates() {
        return NodeStatus::Ok;
    }

    match report.absorb(node.filter.execute(data, &node.arguments, ctx)) {
        Some(Completion::Finished) => {
            report.completion = Some(Completion::Finished);
            NodeStatus::Ok
        }
        Some(Completion::Cancelled) => {
            report.completion = Some(Completion::Cancelled);
            NodeStatus::Cancelled
        }
        None => NodeStatus::Failed,
    }
}

#[derive(Debug, Error)]
pub enum PipelineDocError {
    #[error("failed to read pipeline {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid pipeline document: {0}")]
    Json(#[from] serde_json::Error),
    #[error("filter {index}: {source}")]
    Registry {
        index: usize,
        #[source]
        source: RegistryError,
    },
    #[error("filter {index} ({filter}): {}", join_errors(.errors))]
    Upgrade {
        index: usize,
        filter: String,
        errors: Vec<Error>,
    },
}

fn join_errors(errors: &[Error]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

/// One entry of a pipeline document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FilterEntry {
    pub uuid: Uuid,
    /// Parameter schema version the arguments were written for
    #[serde(default = "default_version")]
    pub version: u32,
    #[serde(default)]
    pub args: Arguments,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
}

fn default_version() -> u32 {
    1
}

fn default_enabled() -> bool {
    true
}

/// Serialized pipeline
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineDocument {
    pub name: String,
    pub filters: Vec<FilterEntry>,
}

impl PipelineDocument {
    /// # Errors
    /// [`PipelineDocError::Json`]
    pub fn from_json_str(text: &str) -> Result<Self, PipelineDocError> {
        Ok(serde_json::from_str(text)?)
    }

    /// # Errors
    /// [`PipelineDocError::Io`] or [`PipelineDocError::Json`]
    pub fn load(path: impl AsRef<Path>) -> Result<Self, PipelineDocError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| PipelineDocError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json_str(&text)
    }

    /// # Errors
    /// [`PipelineDocError::Json`]
    pub fn to_json_string(&self) -> Result<String, PipelineDocError> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Snapshot of `pipeline` at the current parameter versions
    #[must_use]
    pub fn from_pipeline(pipeline: &Pipeline) -> Self {
        Self {
            name: pipeline.name().to_string(),
            filters: pipeline
                .nodes()
                .iter()
                .map(|node| FilterEntry {
                    uuid: node.filter.uuid(),
                    version: node.filter.parameters_version(),
                    args: node.arguments.clone(),
                    enabled: node.enabled,
                })
                .collect(),
        }
    }

    /// Instantiate every filter through `registry`, upgrading old arguments
    ///
    /// Returns upgrade warnings alongside the pipeline.
    ///
    /// # Errors
    /// [`PipelineDocError::Registry`] for an unknown uuid,
    /// [`PipelineDocError::Upgrade`] when arguments cannot be upgraded.
    pub fn into_pipeline(
        self,
        registry: &FilterRegistry,
    ) -> Result<(Pipeline, Vec<Warning>), PipelineDocError> {
        let mut pipeline = Pipeline::new(self.name);
        let mut warnings = Vec::new();
        for (index, entry) in self.filters.into_iter().enumerate() {
            let filter = registry
                .create(&entry.uuid)
                .map_err(|source| PipelineDocError::Registry { index, source })?;
            let upgraded = filter.upgrade(VersionedArguments {
                version: entry.version,
                arguments: entry.args,
            });
            let (outcome, upgrade_warnings) = upgraded.into_parts();
            warnings.extend(upgrade_warnings);
            let arguments = outcome.map_err(|errors| PipelineDocError::Upgrade {
                index,
                filter: filter.name().to_string(),
                errors,
            })?;
            let node = PipelineNode {
                filter,
                arguments,
                enabled: entry.enabled,
            };
            pipeline.push(node);
        }
        Ok((pipeline, warnings))
    }
}
