//! Runs the `strata` binary end to end

use pretty_assertions::assert_eq;
use serde_json::{json, Value};
use std::io::Write;
use std::process::{Command, Output};
use tempfile::NamedTempFile;

fn strata(args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_strata"))
        .args(args)
        .env("STRATA_LOG", "off")
        .output()
        .unwrap()
}

fn json_file(value: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().unwrap();
    write!(file, "{value}").unwrap();
    file
}

fn stdout_json(output: &Output) -> Value {
    serde_json::from_slice(&output.stdout).unwrap()
}

fn path_arg(value: &str) -> Value {
    json!({"type": "path", "value": value})
}

fn build_pipeline() -> Value {
    json!({
        "name": "build",
        "filters": [
            {
                "uuid": "1ffe837a-255b-4dc9-97eb-45134e1727a0",
                "args": {"data_object_path": path_arg("DataContainer")}
            },
            {
                "uuid": "c3648a2f-9a05-4b5e-907c-65ab35c88a71",
                "args": {
                    "data_object_path": path_arg("DataContainer/Cell Data"),
                    "tuple_dimensions": {"type": "shape", "value": [2, 3]}
                }
            },
            {
                "uuid": "6d42caa4-ee48-4753-a772-ca15395c9e35",
                "version": 2,
                "args": {
                    "output_array_path": path_arg("DataContainer/Cell Data/Mask"),
                    "numeric_type": {"type": "data_type", "value": "uint8"},
                    "component_shape": {"type": "shape", "value": [1]},
                    "initialization_value": {"type": "string", "value": "1"}
                }
            }
        ]
    })
}

#[test]
fn list_json_names_every_builtin() {
    let output = strata(&["list", "--json"]);
    assert!(output.status.success());
    let filters = stdout_json(&output);
    let names: Vec<&str> = filters
        .as_array()
        .unwrap()
        .iter()
        .map(|f| f["name"].as_str().unwrap())
        .collect();
    assert!(names.contains(&"ComputeMisorientations"));
    assert!(names.contains(&"CreateDataGroup"));
    assert_eq!(names.len(), 9);
}

#[test]
fn describe_by_name() {
    let output = strata(&["describe", "ResizeAttributeMatrix", "--json"]);
    assert!(output.status.success());
    let info = stdout_json(&output);
    assert_eq!(info["uuid"], "d035328c-8c41-4050-b08d-feb6bac18c90");
    assert_eq!(info["parameters"].as_array().unwrap().len(), 2);
}

#[test]
fn preflight_and_run() {
    let file = json_file(&build_pipeline());
    let path = file.path().to_str().unwrap();

    let output = strata(&["preflight", path, "--json"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stdout));
    assert_eq!(stdout_json(&output)["outcome"]["status"], "completed");

    let output = strata(&["run", path, "--json"]);
    assert!(output.status.success());
    let result = stdout_json(&output);
    let tree: Vec<&str> = result["tree"]
        .as_array()
        .unwrap()
        .iter()
        .map(|n| n["path"].as_str().unwrap())
        .collect();
    assert!(tree.contains(&"DataContainer/Cell Data/Mask"));
}

#[test]
fn failing_pipeline_exits_nonzero() {
    let mut pipeline = build_pipeline();
    // Parent of the matrix is never created
    pipeline["filters"].as_array_mut().unwrap().remove(0);
    let file = json_file(&pipeline);
    let output = strata(&["preflight", file.path().to_str().unwrap(), "--json"]);
    assert_eq!(output.status.code(), Some(1));
    let report = stdout_json(&output);
    assert_eq!(report["outcome"], json!({"status": "failed", "index": 0}));
}

#[test]
fn import_legacy_arguments() {
    let file = json_file(&json!({
        "CreatedDataContainer": "ImageDataContainer",
        "Filter_Human_Label": "Create Data Container"
    }));
    let output = strata(&[
        "import-legacy",
        "--filter",
        "CreateDataGroup",
        file.path().to_str().unwrap(),
        "--json",
    ]);
    assert!(output.status.success());
    let result = stdout_json(&output);
    assert_eq!(result["args"]["data_object_path"], path_arg("ImageDataContainer"));
    assert_eq!(result["warnings"], json!([]));
}

#[test]
fn bad_config_is_reported() {
    let mut config = NamedTempFile::new().unwrap();
    writeln!(config, "progress_step_percent = 0").unwrap();
    let output = strata(&["list", "--config", config.path().to_str().unwrap()]);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("progress_step_percent"));
}

#[test]
fn unknown_filter_is_an_error() {
    let output = strata(&["describe", "NoSuchFilter"]);
    assert_eq!(output.status.code(), Some(1));
}
