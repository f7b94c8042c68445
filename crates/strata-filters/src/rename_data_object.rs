//! Rename Data Object

use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::{
    Action, Arguments, Completion, Error, Filter, OutputActions, Parameter, Parameters,
    PreflightResult, Report, RunContext, Warning,
};
use strata_data::{DataError, DataPath, DataStructure};
use uuid::Uuid;

pub const K_SOURCE_PATH: &str = "source_data_object_path";
pub const K_NEW_NAME: &str = "new_name";

/// New name equals the current one
pub const SAME_NAME: i32 = -8050;

/// Renames one object in place
#[derive(Debug, Clone, Copy, Default)]
pub struct RenameDataObject;

impl RenameDataObject {
    pub const UUID: Uuid = Uuid::from_u128(0x66b4_2cee_08be_4f22_93d0_48cb_1ab1_71c9);

    fn plan(data: &DataStructure, args: &Arguments) -> Result<PreflightResult, Error> {
        let path = args.get::<DataPath>(K_SOURCE_PATH)?;
        let new_name = args.get::<String>(K_NEW_NAME)?;
        let parent = path.parent().ok_or(DataError::RootOperation)?;

        let mut report = Report::ok(OutputActions::new().with(Action::Rename {
            path: path.clone(),
            new_name: new_name.clone(),
        }));
        if path.name() == Some(new_name.as_str()) {
            report.push_warning(Warning::new(
                SAME_NAME,
                format!("'{path}' already has the name '{new_name}'; nothing to do"),
            ));
        } else if data.contains(&parent.child(new_name.as_str())) {
            return Err(DataError::NameCollision {
                parent,
                name: new_name,
            }
            .into());
        }
        Ok(PreflightResult::from(report))
    }
}

impl Filter for RenameDataObject {
    fn name(&self) -> &'static str {
        "RenameDataObject"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Rename DataObject"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["Core", "Memory Management", "Data Management", "Rename"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params
            .insert_separator("Input Parameter(s)")
            .insert(
                Parameter::data_object_selection(
                    K_SOURCE_PATH,
                    "DataObject to Rename",
                    "Object whose name changes",
                    DataPath::root(),
                )
                .consumed(),
            )
            .insert(
                Parameter::data_object_name(K_NEW_NAME, "New Name", "Name after renaming", "")
                    .required(),
            );
        params
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(*self)
    }

    fn preflight_impl(&self, data: &DataStructure, args: &Arguments, _ctx: &RunContext) -> PreflightResult {
        Self::plan(data, args).unwrap_or_else(PreflightResult::fail)
    }

    fn execute_impl(&self, _data: &mut DataStructure, _args: &Arguments, _ctx: &RunContext) -> Report<Completion> {
        Report::ok(Completion::Finished)
    }

    fn import_legacy_arguments(&self, json: &serde_json::Value) -> Report<Arguments> {
        let mut importer = LegacyImporter::new(json, self.default_arguments());
        importer
            .convert(
                "SelectedDataContainerName",
                K_SOURCE_PATH,
                LegacyConverter::DataContainerPath,
                Requirement::Required,
            )
            .convert(
                "NewDataContainerName",
                K_NEW_NAME,
                LegacyConverter::LinkedName,
                Requirement::Required,
            );
        importer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_test_utils::{feature_container, path, preflight, run_filter, FEATURE_DATA};

    fn args(from: &str, to: &str) -> Arguments {
        Arguments::new()
            .with(K_SOURCE_PATH, path(from))
            .with(K_NEW_NAME, to)
    }

    #[test]
    fn renames() {
        let mut data = feature_container(3);
        assert!(run_filter(&RenameDataObject, &mut data, &args(FEATURE_DATA, "Grain Data")).is_valid());
        assert!(data.contains(&path("DataContainer/Grain Data")));
        assert!(!data.contains(&path(FEATURE_DATA)));
    }

    #[test]
    fn sibling_collision_is_structural() {
        let mut data = feature_container(3);
        data.create(&path("DataContainer/Other"), strata_data::ObjectBody::Group)
            .unwrap();
        let result = preflight(&RenameDataObject, &data, &args(FEATURE_DATA, "Other"));
        assert!(result.actions.has_error_code(-102));
    }

    #[test]
    fn same_name_warns() {
        let data = feature_container(3);
        let result = preflight(&RenameDataObject, &data, &args(FEATURE_DATA, "Feature Data"));
        assert!(result.is_valid());
        assert!(result.actions.has_warning_code(SAME_NAME));
    }

    #[test]
    fn invalid_new_name() {
        let data = feature_container(3);
        let result = preflight(&RenameDataObject, &data, &args(FEATURE_DATA, "a/b"));
        assert!(result
            .actions
            .has_error_code(strata_core::parameter::ARG_INVALID_NAME));
    }

    #[test]
    fn legacy_import() {
        let doc = json!({
            "SelectedDataContainerName": "DataContainer",
            "NewDataContainerName": "Renamed"
        });
        let args = RenameDataObject.import_legacy_arguments(&doc).into_result().unwrap();
        assert_eq!(args.get::<String>(K_NEW_NAME).unwrap(), "Renamed");
    }
}
