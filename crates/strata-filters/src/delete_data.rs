//! Delete Data

use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::{
    Action, Arguments, Completion, Error, Filter, OutputActions, Parameter, Parameters,
    PreflightResult, Report, RunContext, Warning,
};
use strata_data::{DataError, DataPath, DataStructure};
use uuid::Uuid;

pub const K_REMOVED_PATHS: &str = "removed_data_paths";

/// Nothing selected
pub const NOTHING_TO_DELETE: i32 = -8070;
/// Path lies under another removed path
pub const COVERED_BY_ANCESTOR: i32 = -8071;

/// Removes objects and everything below them
#[derive(Debug, Clone, Copy, Default)]
pub struct DeleteData;

impl DeleteData {
    pub const UUID: Uuid = Uuid::from_u128(0x622d_eb80_30f8_40f9_b741_9bbf_5ac5_2ccd);

    fn plan(args: &Arguments) -> Result<PreflightResult, Error> {
        let paths = args.get::<Vec<DataPath>>(K_REMOVED_PATHS)?;
        let mut report = Report::ok(());
        if paths.is_empty() {
            report.push_warning(Warning::new(NOTHING_TO_DELETE, "no objects selected for deletion"));
        }

        let mut actions = OutputActions::new();
        for (i, path) in paths.iter().enumerate() {
            if path.is_empty() {
                return Err(DataError::RootOperation.into());
            }
            let covered = paths
                .iter()
                .enumerate()
                .any(|(j, other)| j != i && (other.is_ancestor_of(path) || (other == path && j < i)));
            if covered {
                report.push_warning(Warning::new(
                    COVERED_BY_ANCESTOR,
                    format!("'{path}' is already removed with another selection"),
                ));
                continue;
            }
            actions.push(Action::Delete { path: path.clone() });
        }
        Ok(PreflightResult::from(report.map(|()| actions)))
    }
}

impl Filter for DeleteData {
    fn name(&self) -> &'static str {
        "DeleteData"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Delete Data"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["Core", "Memory Management", "Data Management", "Delete", "Remove"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert_separator("Input Parameter(s)").insert(
            Parameter::multi_object_selection(
                K_REMOVED_PATHS,
                "DataPaths to Remove",
                "Objects removed together with their children",
                Vec::new(),
            )
            .consumed(),
        );
        params
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(*self)
    }

    fn preflight_impl(&self, _data: &DataStructure, args: &Arguments, _ctx: &RunContext) -> PreflightResult {
        Self::plan(args).unwrap_or_else(PreflightResult::fail)
    }

    fn execute_impl(&self, _data: &mut DataStructure, _args: &Arguments, _ctx: &RunContext) -> Report<Completion> {
        Report::ok(Completion::Finished)
    }

    fn import_legacy_arguments(&self, json: &serde_json::Value) -> Report<Arguments> {
        let mut importer = LegacyImporter::new(json, self.default_arguments());
        importer.convert(
            "DataArraysToRemove",
            K_REMOVED_PATHS,
            LegacyConverter::ArrayPathList,
            Requirement::Required,
        );
        importer.finish()
    }
}
