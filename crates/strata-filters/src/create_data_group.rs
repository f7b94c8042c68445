//! Create Data Group

use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::{
    Action, Arguments, Completion, Error, Filter, OutputActions, Parameter, Parameters,
    PreflightResult, Report, RunContext,
};
use strata_data::{DataPath, DataStructure};
use uuid::Uuid;

pub const K_DATA_OBJECT_PATH: &str = "data_object_path";

/// Adds an empty namespace group
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDataGroup;

impl CreateDataGroup {
    pub const UUID: Uuid = Uuid::from_u128(0x1ffe_837a_255b_4dc9_97eb_4513_4e17_27a0);

    fn plan(args: &Arguments) -> Result<PreflightResult, Error> {
        let path = args.get::<DataPath>(K_DATA_OBJECT_PATH)?;
        Ok(PreflightResult::ok(
            OutputActions::new().with(Action::CreateDataGroup { path }),
        ))
    }
}

impl Filter for CreateDataGroup {
    fn name(&self) -> &'static str {
        "CreateDataGroup"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Create Data Group"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["Core", "Generation", "Create", "Data Structure"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params.insert_separator("Output Data Object").insert(Parameter::data_group_creation(
            K_DATA_OBJECT_PATH,
            "Data Object Path",
            "The complete path to the group being created",
            DataPath::single("DataContainer"),
        ));
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
            "CreatedDataContainer",
            K_DATA_OBJECT_PATH,
            LegacyConverter::DataContainerPath,
            Requirement::Required,
        );
        importer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_data::ObjectKind;
    use strata_test_utils::{path, preflight, run_filter};

    #[test]
    fn creates_group() {
        let mut data = DataStructure::new();
        let args = Arguments::new().with(K_DATA_OBJECT_PATH, path("Small IN100"));
        let result = preflight(&CreateDataGroup, &data, &args);
        assert_eq!(
            result.actions.value().map(OutputActions::len),
            Some(1)
        );
        assert!(run_filter(&CreateDataGroup, &mut data, &args).is_valid());
        assert_eq!(data.kind_of(&path("Small IN100")).unwrap(), ObjectKind::DataGroup);
    }

    #[test]
    fn missing_parent_is_structural() {
        let data = DataStructure::new();
        let args = Arguments::new().with(K_DATA_OBJECT_PATH, path("A/B"));
        let result = preflight(&CreateDataGroup, &data, &args);
        // Preflight only describes the action; applying it reports the parent.
        let mut scratch = data.clone();
        let actions = result.actions.into_result().unwrap();
        let err = actions
            .apply_all(&mut scratch, strata_core::ApplyMode::Preflight)
            .unwrap_err();
        assert_eq!(err.source.code(), -101);
    }

    #[test]
    fn legacy_import() {
        let doc = json!({
            "CreatedDataContainer": "ImageDataContainer",
            "Filter_Human_Label": "Create Data Container",
        });
        let args = CreateDataGroup.import_legacy_arguments(&doc).into_result().unwrap();
        assert_eq!(
            args.get::<DataPath>(K_DATA_OBJECT_PATH).unwrap(),
            path("ImageDataContainer")
        );
    }
}
