//! Create Attribute Matrix

use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::parameter::checked_element_count;
use strata_core::{
    Action, Arguments, Completion, Error, Filter, OutputActions, Parameter, Parameters,
    PreflightResult, Report, RunContext,
};
use strata_data::{DataPath, DataStructure};
use uuid::Uuid;

pub const K_DATA_OBJECT_PATH: &str = "data_object_path";
pub const K_TUPLE_DIMS: &str = "tuple_dimensions";

/// Adds an attribute matrix with a fixed tuple shape
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateAttributeMatrix;

impl CreateAttributeMatrix {
    pub const UUID: Uuid = Uuid::from_u128(0xc364_8a2f_9a05_4b5e_907c_65ab_35c8_8a71);

    fn plan(args: &Arguments) -> Result<PreflightResult, Error> {
        let path = args.get::<DataPath>(K_DATA_OBJECT_PATH)?;
        let tuple_shape = args.get::<Vec<usize>>(K_TUPLE_DIMS)?;
        let tuples =
            checked_element_count(&format!("'{path}' tuple dimensions"), &tuple_shape, &[1])?;
        Ok(
            PreflightResult::ok(OutputActions::new().with(Action::CreateAttributeMatrix {
                path,
                tuple_shape,
            }))
            .with_value("Number of Tuples", tuples.to_string()),
        )
    }
}

impl Filter for CreateAttributeMatrix {
    fn name(&self) -> &'static str {
        "CreateAttributeMatrix"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Create Attribute Matrix"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["Core", "Generation", "AttributeMatrix", "Create"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params
            .insert_separator("Input Parameter(s)")
            .insert(Parameter::data_group_creation(
                K_DATA_OBJECT_PATH,
                "DataObject Path",
                "The complete path to the Attribute Matrix being created",
                DataPath::from_names(&["DataContainer", "Cell Data"]),
            ))
            .insert(
                Parameter::tuple_shape(
                    K_TUPLE_DIMS,
                    "Attribute Matrix Dimensions (Slowest to Fastest Dimensions)",
                    "Slowest to Fastest Dimensions",
                    vec![1],
                )
                .optional(),
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
        importer
            .convert(
                "TupleDimensions",
                K_TUPLE_DIMS,
                LegacyConverter::TupleDims,
                Requirement::Optional,
            )
            .convert(
                "CreatedAttributeMatrix",
                K_DATA_OBJECT_PATH,
                LegacyConverter::AttributeMatrixPath,
                Requirement::Required,
            )
            .ignore("AttributeMatrixType");
        importer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_core::legacy::LEGACY_MISSING_OPTIONAL;
    use strata_core::parameter::ARG_SHAPE_OVERFLOW;
    use strata_test_utils::{path, preflight, run_filter};

    #[test]
    fn creates_matrix_and_reports_tuples() {
        let mut data = DataStructure::new();
        data.create(&path("DC"), strata_data::ObjectBody::Group).unwrap();
        let args = Arguments::new()
            .with(K_DATA_OBJECT_PATH, path("DC/Cell Data"))
            .with(K_TUPLE_DIMS, vec![3usize, 4, 5]);
        let result = preflight(&CreateAttributeMatrix, &data, &args);
        assert_eq!(result.values[0].value, "60");
        assert!(run_filter(&CreateAttributeMatrix, &mut data, &args).is_valid());
        assert_eq!(data.attribute_matrix(&path("DC/Cell Data")).unwrap(), &[3, 4, 5]);
    }

    #[test]
    fn empty_dimensions_rejected() {
        let args = Arguments::new()
            .with(K_DATA_OBJECT_PATH, path("AM"))
            .with(K_TUPLE_DIMS, Vec::<usize>::new());
        let result = preflight(&CreateAttributeMatrix, &DataStructure::new(), &args);
        assert!(result.actions.has_error_code(strata_core::parameter::ARG_EMPTY_SHAPE));
    }

    #[test]
    fn overflowing_dimensions_are_an_argument_error() {
        let huge = 1_usize << 40;
        let args = Arguments::new()
            .with(K_DATA_OBJECT_PATH, path("AM"))
            .with(K_TUPLE_DIMS, vec![huge, huge]);
        let data = DataStructure::new();
        let result = preflight(&CreateAttributeMatrix, &data, &args);
        assert!(result.actions.has_error_code(ARG_SHAPE_OVERFLOW));
        let result = CreateAttributeMatrix.preflight_impl(&data, &args, &RunContext::new());
        assert!(result.actions.has_error_code(ARG_SHAPE_OVERFLOW));
    }

    #[test]
    fn legacy_import_without_dims_warns() {
        let doc = json!({
            "CreatedAttributeMatrix": {
                "Data Container Name": "DC",
                "Attribute Matrix Name": "Feature Data",
                "Data Array Name": ""
            },
            "AttributeMatrixType": 7
        });
        let report = CreateAttributeMatrix.import_legacy_arguments(&doc);
        assert!(report.has_warning_code(LEGACY_MISSING_OPTIONAL));
        let args = report.into_result().unwrap();
        assert_eq!(args.get::<Vec<usize>>(K_TUPLE_DIMS).unwrap(), vec![1]);
        assert_eq!(
            args.get::<DataPath>(K_DATA_OBJECT_PATH).unwrap(),
            path("DC/Feature Data")
        );
    }
}
