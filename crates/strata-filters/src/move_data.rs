//! Move Data

use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::{
    Action, Arguments, Completion, Error, Filter, OutputActions, Parameter, Parameters,
    PreflightResult, Report, RunContext, Warning,
};
use strata_data::{DataError, DataPath, DataStructure};
use uuid::Uuid;

pub const K_SOURCE_PATHS: &str = "source_data_paths";
pub const K_DESTINATION_PATH: &str = "destination_parent_path";

/// Source already sits under the destination
pub const ALREADY_IN_PLACE: i32 = -8060;

/// Reparents objects under a new container, keeping their names
#[derive(Debug, Clone, Copy, Default)]
pub struct MoveData;

impl MoveData {
    pub const UUID: Uuid = Uuid::from_u128(0x2044_1059_437a_4508_bd3d_c54f_16c0_8929);

    fn plan(data: &DataStructure, args: &Arguments) -> Result<PreflightResult, Error> {
        let sources = args.get::<Vec<DataPath>>(K_SOURCE_PATHS)?;
        let destination = args.get::<DataPath>(K_DESTINATION_PATH)?;

        let mut report = Report::ok(());
        let mut incoming: Vec<&str> = Vec::new();
        for path in &sources {
            let name = path.name().ok_or(DataError::RootOperation)?;
            if path.is_prefix_of(&destination) {
                return Err(DataError::CycleDetected {
                    path: path.clone(),
                    new_parent: destination,
                }
                .into());
            }
            if path.parent().as_ref() == Some(&destination) {
                report.push_warning(Warning::new(
                    ALREADY_IN_PLACE,
                    format!("'{path}' is already inside '{destination}'"),
                ));
                continue;
            }
            if data.contains(&destination.child(name)) || incoming.contains(&name) {
                return Err(DataError::NameCollision {
                    parent: destination,
                    name: name.to_string(),
                }
                .into());
            }
            incoming.push(name);
        }

        let actions = sources
            .iter()
            .filter(|path| path.parent().as_ref() != Some(&destination))
            .map(|path| Action::Move {
                path: path.clone(),
                new_parent: destination.clone(),
            })
            .collect::<OutputActions>();
        Ok(PreflightResult::from(report.map(|()| actions)))
    }
}

impl Filter for MoveData {
    fn name(&self) -> &'static str {
        "MoveData"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Move Data"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["Core", "Memory Management", "Data Management", "Move"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params
            .insert_separator("Input Parameter(s)")
            .insert(
                Parameter::multi_object_selection(
                    K_SOURCE_PATHS,
                    "Data to Move",
                    "Objects to reparent",
                    Vec::new(),
                )
                .consumed(),
            )
            .insert(Parameter::data_object_selection(
                K_DESTINATION_PATH,
                "New Parent",
                "Container that receives the moved objects",
                DataPath::root(),
            ));
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
                "DataArraySourcePath",
                K_SOURCE_PATHS,
                LegacyConverter::ArrayPathList,
                Requirement::Required,
            )
            .convert(
                "DataContainerDestinationName",
                K_DESTINATION_PATH,
                LegacyConverter::AttributeMatrixPath,
                Requirement::Required,
            )
            .ignore("WhatToMove");
        importer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use strata_data::ObjectBody;
    use strata_test_utils::{
        add_array, assert_consistent, feature_container, path, preflight, run_filter,
        DATA_CONTAINER, FEATURE_DATA,
    };

    fn args(sources: &[&str], destination: &str) -> Arguments {
        Arguments::new()
            .with(
                K_SOURCE_PATHS,
                sources.iter().map(|s| path(s)).collect::<Vec<_>>(),
            )
            .with(K_DESTINATION_PATH, path(destination))
    }

    fn two_matrices() -> DataStructure {
        let mut data = feature_container(2);
        data.create(
            &path("DataContainer/Other Data"),
            ObjectBody::AttributeMatrix {
                tuple_shape: vec![2],
            },
        )
        .unwrap();
        add_array(&mut data, "DataContainer/Feature Data/A", vec![2], vec![1], vec![1_i32, 2]);
        add_array(&mut data, "DataContainer/Feature Data/B", vec![2], vec![1], vec![3_i32, 4]);
        data
    }

    #[test]
    fn moves_arrays_between_matrices() {
        let mut data = two_matrices();
        let args = args(
            &["DataContainer/Feature Data/A", "DataContainer/Feature Data/B"],
            "DataContainer/Other Data",
        );
        assert!(run_filter(&MoveData, &mut data, &args).is_valid());
        assert_eq!(
            data.array::<i32>(&path("DataContainer/Other Data/B"))
                .unwrap()
                .as_slice()
                .unwrap(),
            &[3, 4]
        );
        assert!(data.child_names(&path(FEATURE_DATA)).unwrap().is_empty());
        assert_consistent(&data);
    }

    #[test]
    fn into_own_descendant_is_a_cycle() {
        let data = two_matrices();
        let result = preflight(&MoveData, &data, &args(&[DATA_CONTAINER], FEATURE_DATA));
        assert!(result.actions.has_error_code(-109));
    }

    #[test]
    fn collision_at_destination() {
        let mut data = two_matrices();
        add_array(&mut data, "DataContainer/Other Data/A", vec![2], vec![1], vec![0_i32, 0]);
        let result = preflight(
            &MoveData,
            &data,
            &args(&["DataContainer/Feature Data/A"], "DataContainer/Other Data"),
        );
        assert!(result.actions.has_error_code(-102));
    }

    #[test]
    fn already_in_place_is_skipped() {
        let data = two_matrices();
        let result = preflight(&MoveData, &data, &args(&["DataContainer/Feature Data/A"], FEATURE_DATA));
        assert!(result.actions.has_warning_code(ALREADY_IN_PLACE));
        assert_eq!(result.actions.value().map(OutputActions::len), Some(0));
    }

    #[test]
    fn legacy_import() {
        let doc = json!({
            "WhatToMove": 1,
            "DataArraySourcePath": [
                {"Data Container Name": "DC", "Attribute Matrix Name": "AM", "Data Array Name": "A"}
            ],
            "DataContainerDestinationName": {
                "Data Container Name": "DC", "Attribute Matrix Name": "Other", "Data Array Name": ""
            }
        });
        let args = MoveData.import_legacy_arguments(&doc).into_result().unwrap();
        assert_eq!(
            args.get::<Vec<DataPath>>(K_SOURCE_PATHS).unwrap(),
            vec![path("DC/AM/A")]
        );
        assert_eq!(args.get::<DataPath>(K_DESTINATION_PATH).unwrap(), path("DC/Other"));
    }
}
