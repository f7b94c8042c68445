//! Resize Attribute Matrix

use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::parameter::checked_element_count;
use strata_core::{
    Action, Arguments, Completion, Error, Filter, OutputActions, Parameter, Parameters,
    PreflightResult, Report, RunContext, Warning,
};
use strata_data::{shape_product, DataError, DataPath, DataStructure};
use uuid::Uuid;

pub const K_MATRIX_PATH: &str = "attribute_matrix_path";
pub const K_NEW_TUPLE_DIMS: &str = "new_tuple_dimensions";

/// Tuples beyond the new count are dropped
pub const SHRINKING: i32 = -8080;

/// Changes an attribute matrix's tuple shape together with its arrays
#[derive(Debug, Clone, Copy, Default)]
pub struct ResizeAttributeMatrix;

impl ResizeAttributeMatrix {
    pub const UUID: Uuid = Uuid::from_u128(0xd035_328c_8c41_4050_b08d_feb6_bac1_8c90);

    fn plan(data: &DataStructure, args: &Arguments) -> Result<PreflightResult, Error> {
        let path = args.get::<DataPath>(K_MATRIX_PATH)?;
        let tuple_shape = args.get::<Vec<usize>>(K_NEW_TUPLE_DIMS)?;
        let before = shape_product(data.attribute_matrix(&path)?);
        let after =
            checked_element_count(&format!("'{path}' new tuple dimensions"), &tuple_shape, &[1])?;
        Self::check_owner(data, &path, &tuple_shape)?;

        let mut report = Report::ok(OutputActions::new().with(Action::ResizeAttributeMatrix {
            path: path.clone(),
            tuple_shape,
        }));
        if after < before {
            report.push_warning(Warning::new(
                SHRINKING,
                format!(
                    "'{path}' shrinks from {before} to {after} tuples; data in the removed tuples is lost"
                ),
            ));
        }
        Ok(PreflightResult::from(report)
            .with_value("Current Tuple Count", before.to_string())
            .with_value("New Tuple Count", after.to_string()))
    }

    /// A geometry's element matrix keeps the rank the geometry needs
    fn check_owner(data: &DataStructure, path: &DataPath, tuple_shape: &[usize]) -> Result<(), Error> {
        let Some(geometry) = path.parent().and_then(|parent| data.geometry(&parent).ok()) else {
            return Ok(());
        };
        if geometry.element_data() == data.id_of(path)
            && geometry.with_element_tuple_shape(tuple_shape).is_none()
        {
            return Err(DataError::GeometryShapeMismatch {
                path: path.clone(),
                geometry: geometry.kind(),
                shape: tuple_shape.to_vec(),
            }
            .into());
        }
        Ok(())
    }
}

impl Filter for ResizeAttributeMatrix {
    fn name(&self) -> &'static str {
        "ResizeAttributeMatrix"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Resize Attribute Matrix"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["Core", "Memory Management", "Attribute Matrix", "Resize"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params
            .insert_separator("Input Parameter(s)")
            .insert(Parameter::attribute_matrix_selection(
                K_MATRIX_PATH,
                "Attribute Matrix",
                "Matrix whose tuple shape changes",
                DataPath::from_names(&["DataContainer", "Cell Data"]),
            ))
            .insert(Parameter::tuple_shape(
                K_NEW_TUPLE_DIMS,
                "New Attribute Matrix Dimensions (Slowest to Fastest Dimensions)",
                "Tuple shape applied to the matrix and every array in it",
                vec![1],
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
                "AttributeMatrixPath",
                K_MATRIX_PATH,
                LegacyConverter::AttributeMatrixPath,
                Requirement::Required,
            )
            .convert(
                "NewDimensions",
                K_NEW_TUPLE_DIMS,
                LegacyConverter::TupleDims,
                Requirement::Required,
            );
        importer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_data::Geometry;
    use strata_test_utils::{
        assert_consistent, misorientation_fixture, path, preflight, run_filter, FEATURE_DATA, PHASES,
    };

    fn args(dims: Vec<usize>) -> Arguments {
        Arguments::new()
            .with(K_MATRIX_PATH, path(FEATURE_DATA))
            .with(K_NEW_TUPLE_DIMS, dims)
    }

    #[test]
    fn grows_matrix_and_arrays() {
        let mut data = misorientation_fixture();
        let result = preflight(&ResizeAttributeMatrix, &data, &args(vec![6]));
        assert!(!result.actions.has_warning_code(SHRINKING));
        assert!(run_filter(&ResizeAttributeMatrix, &mut data, &args(vec![6])).is_valid());
        assert_eq!(data.attribute_matrix(&path(FEATURE_DATA)).unwrap(), &[6]);
        let phases = data.array::<i32>(&path(PHASES)).unwrap();
        assert_eq!(phases.number_of_tuples(), 6);
        assert_eq!(&phases.as_slice().unwrap()[..4], &[0, 1, 1, 1]);
        assert_consistent(&data);
    }

    #[test]
    fn shrinking_warns() {
        let data = misorientation_fixture();
        let result = preflight(&ResizeAttributeMatrix, &data, &args(vec![2]));
        assert!(result.is_valid());
        assert!(result.actions.has_warning_code(SHRINKING));
        assert_eq!(result.values[0].value, "4");
        assert_eq!(result.values[1].value, "2");
    }

    #[test]
    fn requires_an_attribute_matrix() {
        let data = misorientation_fixture();
        let args = Arguments::new()
            .with(K_MATRIX_PATH, path(PHASES))
            .with(K_NEW_TUPLE_DIMS, vec![2usize]);
        let result = preflight(&ResizeAttributeMatrix, &data, &args);
        assert!(result.actions.has_error_code(-105));
    }

    #[test]
    fn overflowing_dimensions_are_an_argument_error() {
        let mut data = misorientation_fixture();
        let before = data.clone();
        let huge = 1_usize << 40;
        let result = preflight(&ResizeAttributeMatrix, &data, &args(vec![huge, huge]));
        assert!(result
            .actions
            .has_error_code(strata_core::parameter::ARG_SHAPE_OVERFLOW));
        assert!(!run_filter(&ResizeAttributeMatrix, &mut data, &args(vec![huge, huge])).is_valid());
        assert_eq!(data, before);
    }

    #[test]
    fn image_cell_data_resizes_the_geometry() {
        let mut data = DataStructure::new();
        data.create_image_geometry(&path("Image"), [4, 3, 2], [1.0; 3], [0.0; 3], "Cell Data")
            .unwrap();
        let resize = Arguments::new()
            .with(K_MATRIX_PATH, path("Image/Cell Data"))
            .with(K_NEW_TUPLE_DIMS, vec![3_usize, 3, 4]);
        assert!(run_filter(&ResizeAttributeMatrix, &mut data, &resize).is_valid());
        match data.geometry(&path("Image")).unwrap() {
            Geometry::Image { dimensions, .. } => assert_eq!(*dimensions, [4, 3, 3]),
            other => panic!("unexpected geometry {other:?}"),
        }
        assert_consistent(&data);

        let flat = resize.with(K_NEW_TUPLE_DIMS, vec![36_usize]);
        let result = preflight(&ResizeAttributeMatrix, &data, &flat);
        assert!(result.actions.has_error_code(-115));
    }

    #[test]
    fn legacy_import() {
        let doc = json!({
            "AttributeMatrixPath": {
                "Data Container Name": "DC", "Attribute Matrix Name": "Cell Data", "Data Array Name": ""
            },
            "NewDimensions": {"Table Data": [[10.0, 20.0]]}
        });
        let args = ResizeAttributeMatrix.import_legacy_arguments(&doc).into_result().unwrap();
        assert_eq!(args.get::<Vec<usize>>(K_NEW_TUPLE_DIMS).unwrap(), vec![10, 20]);
    }
}
