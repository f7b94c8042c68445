//! Create Image Geometry

use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::parameter::checked_element_count;
use strata_core::{
    Action, Arguments, Completion, Error, Filter, OutputActions, Parameter, Parameters,
    PreflightResult, Report, RunContext,
};
use strata_data::{DataPath, DataStructure};
use uuid::Uuid;

pub const K_GEOMETRY_PATH: &str = "geometry_path";
pub const K_DIMENSIONS: &str = "dimensions";
pub const K_ORIGIN: &str = "origin";
pub const K_SPACING: &str = "spacing";
pub const K_CELL_DATA_NAME: &str = "cell_data_name";

pub const ZERO_DIMENSION: i32 = -8040;
pub const NON_POSITIVE_SPACING: i32 = -8041;

/// Adds a regular grid geometry with its cell data matrix
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateImageGeometry;

impl CreateImageGeometry {
    pub const UUID: Uuid = Uuid::from_u128(0x7feb_d6ba_b6c3_4033_a9e0_9e3f_3ef9_d96b);

    fn plan(args: &Arguments) -> Result<PreflightResult, Error> {
        let path = args.get::<DataPath>(K_GEOMETRY_PATH)?;
        let dimensions = args.get::<[usize; 3]>(K_DIMENSIONS)?;
        let origin = args.get::<[f32; 3]>(K_ORIGIN)?;
        let spacing = args.get::<[f32; 3]>(K_SPACING)?;
        let cell_data_name = args.get::<String>(K_CELL_DATA_NAME)?;

        if dimensions.contains(&0) {
            return Err(Error::argument(
                ZERO_DIMENSION,
                format!("image dimensions must all be non-zero, got {dimensions:?}"),
            ));
        }
        if spacing.iter().any(|s| *s <= 0.0) {
            return Err(Error::argument(
                NON_POSITIVE_SPACING,
                format!("image spacing must be positive, got {spacing:?}"),
            ));
        }

        let cells = checked_element_count(&format!("'{path}' dimensions"), &dimensions, &[1])?;
        let extent: Vec<String> = (0..3)
            .map(|i| {
                #[allow(clippy::cast_precision_loss)]
                let far = origin[i] + spacing[i] * dimensions[i] as f32;
                format!("[{}, {far}]", origin[i])
            })
            .collect();
        Ok(
            PreflightResult::ok(OutputActions::new().with(Action::CreateImageGeometry {
                path,
                dimensions,
                spacing,
                origin,
                cell_data_name,
            }))
            .with_value("Number of cells", cells.to_string())
            .with_value("Extents", extent.join(" x ")),
        )
    }
}

impl Filter for CreateImageGeometry {
    fn name(&self) -> &'static str {
        "CreateImageGeometry"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Create Geometry (Image)"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["Core", "Generation", "Geometry", "Image", "Create"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params
            .insert_separator("Input Parameter(s)")
            .insert(Parameter::uint_vec3(
                K_DIMENSIONS,
                "Dimensions",
                "Number of cells along x, y and z",
                [1, 1, 1],
            ))
            .insert(Parameter::float_vec3(
                K_ORIGIN,
                "Origin",
                "Coordinates of the grid corner",
                [0.0, 0.0, 0.0],
            ))
            .insert(Parameter::float_vec3(
                K_SPACING,
                "Spacing",
                "Cell size along x, y and z",
                [1.0, 1.0, 1.0],
            ))
            .insert_separator("Output Image Geometry")
            .insert(Parameter::data_group_creation(
                K_GEOMETRY_PATH,
                "Geometry Name",
                "Path of the geometry to create",
                DataPath::single("Image Geometry"),
            ))
            .insert(Parameter::data_object_name(
                K_CELL_DATA_NAME,
                "Cell Data Name",
                "Name of the cell attribute matrix",
                "Cell Data",
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
        importer
            .convert(
                "SelectedDataContainer",
                K_GEOMETRY_PATH,
                LegacyConverter::DataContainerPath,
                Requirement::Required,
            )
            .convert("Dimensions", K_DIMENSIONS, LegacyConverter::IntVec3, Requirement::Required)
            .convert("Origin", K_ORIGIN, LegacyConverter::FloatVec3, Requirement::Optional)
            .convert("Spacing", K_SPACING, LegacyConverter::FloatVec3, Requirement::Optional)
            .convert(
                "ImageCellAttributeMatrixName",
                K_CELL_DATA_NAME,
                LegacyConverter::LinkedName,
                Requirement::Optional,
            )
            .ignore("BoxDimensions");
        importer.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use strata_data::Geometry;
    use strata_test_utils::{path, preflight, run_filter};

    fn args() -> Arguments {
        Arguments::new()
            .with(K_GEOMETRY_PATH, path("Image"))
            .with(K_DIMENSIONS, strata_core::ArgValue::UIntVec(vec![4, 3, 2]))
            .with(K_SPACING, vec![0.5, 0.5, 1.0])
    }

    #[test]
    fn reports_cell_count() {
        let result = preflight(&CreateImageGeometry, &DataStructure::new(), &args());
        assert!(result.is_valid());
        assert_eq!(result.values[0].name, "Number of cells");
        assert_eq!(result.values[0].value, "24");
        assert_eq!(result.values[1].value, "[0, 2] x [0, 1.5] x [0, 2]");
    }

    #[test]
    fn creates_geometry_with_reversed_cell_shape() {
        let mut data = DataStructure::new();
        assert!(run_filter(&CreateImageGeometry, &mut data, &args()).is_valid());
        assert_eq!(data.attribute_matrix(&path("Image/Cell Data")).unwrap(), &[2, 3, 4]);
        match data.geometry(&path("Image")).unwrap() {
            Geometry::Image { dimensions, .. } => assert_eq!(*dimensions, [4, 3, 2]),
            other => panic!("unexpected geometry {other:?}"),
        }
    }

    #[test]
    fn rejects_zero_dimension_and_bad_spacing() {
        let zero = args().with(K_DIMENSIONS, strata_core::ArgValue::UIntVec(vec![4, 0, 2]));
        assert!(preflight(&CreateImageGeometry, &DataStructure::new(), &zero)
            .actions
            .has_error_code(ZERO_DIMENSION));
        let flat = args().with(K_SPACING, vec![1.0, 0.0, 1.0]);
        assert!(preflight(&CreateImageGeometry, &DataStructure::new(), &flat)
            .actions
            .has_error_code(NON_POSITIVE_SPACING));
    }

    #[test]
    fn overflowing_dimensions_are_an_argument_error() {
        let huge = 1_u64 << 40;
        let args = args().with(K_DIMENSIONS, strata_core::ArgValue::UIntVec(vec![huge, huge, 1]));
        let result = preflight(&CreateImageGeometry, &DataStructure::new(), &args);
        assert!(result
            .actions
            .has_error_code(strata_core::parameter::ARG_SHAPE_OVERFLOW));
    }

    #[test]
    fn legacy_import() {
        let doc = json!({
            "SelectedDataContainer": "ImageDataContainer",
            "Dimensions": {"x": 10, "y": 20, "z": 1},
            "Spacing": {"x": 0.25, "y": 0.25, "z": 1.0},
            "BoxDimensions": "Extents: ..."
        });
        let report = CreateImageGeometry.import_legacy_arguments(&doc);
        assert_eq!(report.warnings().len(), 2);
        let args = report.into_result().unwrap();
        assert_eq!(args.get::<[usize; 3]>(K_DIMENSIONS).unwrap(), [10, 20, 1]);
        assert_eq!(args.get::<[f32; 3]>(K_ORIGIN).unwrap(), [0.0, 0.0, 0.0]);
    }
}
