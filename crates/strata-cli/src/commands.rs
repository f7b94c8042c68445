//! Subcommand implementations; each returns the process exit code

use anyhow::{Context, Result};
use serde_json::json;
use std::path::Path;
use strata_core::{
    Filter, FilterRegistry, PipelineDocument, PipelineOutcome, PipelineReport, Report, RunContext,
    RunnerConfig, TracingSink,
};
use strata_data::DataStructure;
use uuid::Uuid;

pub(crate) const EXIT_OK: i32 = 0;
pub(crate) const EXIT_FAILED: i32 = 1;
pub(crate) const EXIT_CANCELLED: i32 = 2;

fn context(config: &RunnerConfig) -> RunContext {
    RunContext::new()
        .with_progress(std::sync::Arc::new(TracingSink))
        .with_progress_step(config.progress_step_percent)
}

/// Filter by uuid, falling back to its name
fn lookup(registry: &FilterRegistry, key: &str) -> Result<Box<dyn Filter>> {
    let filter = match Uuid::parse_str(key) {
        Ok(uuid) => registry.create(&uuid)?,
        Err(_) => registry.create_by_name(key)?,
    };
    Ok(filter)
}

fn print_json(value: &impl serde::Serialize) -> Result<()> {
    println!("{}", serde_json::to_string_pretty(value)?);
    Ok(())
}

pub(crate) fn list(registry: &FilterRegistry, as_json: bool) -> Result<i32> {
    if as_json {
        print_json(&registry.iter().collect::<Vec<_>>())?;
    } else {
        for info in registry.iter() {
            println!("{}  {:<28} {}", info.uuid, info.name, info.human_name);
        }
    }
    Ok(EXIT_OK)
}

pub(crate) fn describe(registry: &FilterRegistry, key: &str, as_json: bool) -> Result<i32> {
    let filter = lookup(registry, key)?;
    let params = filter.parameters();
    if as_json {
        print_json(&json!({
            "uuid": filter.uuid(),
            "name": filter.name(),
            "human_name": filter.human_name(),
            "tags": filter.default_tags(),
            "parameters_version": filter.parameters_version(),
            "parameters": params.iter().collect::<Vec<_>>(),
            "default_arguments": params.default_arguments(),
        }))?;
    } else {
        println!("{} ({}) v{}", filter.human_name(), filter.uuid(), filter.parameters_version());
        for param in params.iter() {
            let required = if param.required { " required" } else { "" };
            println!("  {:<32} {}{required}: {}", param.key, param.kind.name(), param.label);
        }
    }
    Ok(EXIT_OK)
}

fn load_pipeline(
    registry: &FilterRegistry,
    path: &Path,
    config: &RunnerConfig,
) -> Result<strata_core::Pipeline> {
    let doc = PipelineDocument::load(path)?;
    let (pipeline, warnings) = doc
        .into_pipeline(registry)
        .with_context(|| format!("cannot build pipeline from {}", path.display()))?;
    for warning in &warnings {
        tracing::warn!(code = warning.code, "{}", warning.message);
    }
    Ok(pipeline.with_invariant_checks(config.validate_invariants))
}

fn exit_code(report: &PipelineReport) -> i32 {
    match report.outcome {
        PipelineOutcome::Completed => EXIT_OK,
        PipelineOutcome::Failed { .. } => EXIT_FAILED,
        PipelineOutcome::Cancelled { .. } => EXIT_CANCELLED,
    }
}

fn print_report(report: &PipelineReport) {
    let status = match report.outcome {
        PipelineOutcome::Completed => "completed".to_string(),
        PipelineOutcome::Failed { index } => format!("failed at filter {index}"),
        PipelineOutcome::Cancelled { index } => format!("cancelled at filter {index}"),
    };
    println!("pipeline '{}': {status}", report.name);
    for node in &report.nodes {
        let state = if node.skipped {
            "skipped".to_string()
        } else if !node.errors.is_empty() {
            "error".to_string()
        } else {
            format!("{} actions", node.actions.as_ref().map_or(0, strata_core::OutputActions::len))
        };
        println!("  [{}] {}: {state}", node.index, node.filter);
        for value in &node.values {
            println!("      {} = {}", value.name, value.value);
        }
        for warning in &node.warnings {
            println!("      {warning}");
        }
        for error in &node.errors {
            println!("      {error}");
        }
    }
}

fn print_tree(data: &DataStructure) {
    for (path, kind) in data.iter_paths() {
        println!("  {path} ({kind})");
    }
}

pub(crate) fn preflight(
    registry: &FilterRegistry,
    path: &Path,
    config: &RunnerConfig,
    as_json: bool,
) -> Result<i32> {
    let pipeline = load_pipeline(registry, path, config)?;
    let report = pipeline.preflight(&DataStructure::new(), &context(config));
    if as_json {
        print_json(&report)?;
    } else {
        print_report(&report);
    }
    Ok(exit_code(&report))
}

pub(crate) fn run(
    registry: &FilterRegistry,
    path: &Path,
    config: &RunnerConfig,
    as_json: bool,
) -> Result<i32> {
    let pipeline = load_pipeline(registry, path, config)?;
    let mut data = DataStructure::new();
    let report = pipeline.execute(&mut data, &context(config));
    if as_json {
        let tree: Vec<_> = data
            .iter_paths()
            .into_iter()
            .map(|(path, kind)| json!({"path": path, "kind": kind.to_string()}))
            .collect();
        print_json(&json!({"report": report, "tree": tree}))?;
    } else {
        print_report(&report);
        println!("data structure:");
        print_tree(&data);
    }
    Ok(exit_code(&report))
}

pub(crate) fn import_legacy(
    registry: &FilterRegistry,
    key: &str,
    path: &Path,
    as_json: bool,
) -> Result<i32> {
    let filter = lookup(registry, key)?;
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("failed to read {}", path.display()))?;
    let legacy: serde_json::Value =
        serde_json::from_str(&text).with_context(|| format!("invalid JSON in {}", path.display()))?;

    let report: Report<_> = filter.import_legacy_arguments(&legacy);
    let (outcome, warnings) = report.into_parts();
    match outcome {
        Ok(args) => {
            if as_json {
                print_json(&json!({
                    "uuid": filter.uuid(),
                    "version": filter.parameters_version(),
                    "args": args,
                    "warnings": warnings,
                }))?;
            } else {
                for warning in &warnings {
                    eprintln!("{warning}");
                }
                print_json(&args)?;
            }
            Ok(EXIT_OK)
        }
        Err(errors) => {
            if as_json {
                print_json(&json!({"errors": errors, "warnings": warnings}))?;
            } else {
                for error in &errors {
                    eprintln!("{error}");
                }
            }
            Ok(EXIT_FAILED)
        }
    }
}
