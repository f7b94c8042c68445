//! Create Data Array
//!
//! Parameter schema version 2 replaced the single `component_count` with a
//! `component_shape` row; version 1 arguments are upgraded.

use rayon::prelude::*;
use strata_core::arguments::ARG_KIND_MISMATCH;
use strata_core::filter::UPGRADE_OLDER_VERSION;
use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::parameter::checked_element_count;
use strata_core::{
    Action, Arguments, Completion, Error, Filter, FromArgValue, OutputActions, Parameter,
    Parameters, PreflightResult, Report, RunContext, Warning,
};
use strata_data::{DataError, DataPath, DataStructure, DataType, Element, ObjectKind};
use uuid::Uuid;

pub const K_NUMERIC_TYPE: &str = "numeric_type";
pub const K_COMPONENT_SHAPE: &str = "component_shape";
pub const K_TUPLE_DIMS: &str = "tuple_dimensions";
pub const K_OUTPUT_PATH: &str = "output_array_path";
pub const K_INIT_VALUE: &str = "initialization_value";
/// Version 1 key replaced by [`K_COMPONENT_SHAPE`]
pub const K_COMPONENT_COUNT_V1: &str = "component_count";

pub const ZERO_COMPONENTS: i32 = -8020;
pub const BAD_INIT_VALUE: i32 = -8021;
pub const UPGRADED_COMPONENT_COUNT: i32 = -8022;

const FILL_CHUNK: usize = 64 * 1024;

macro_rules! with_element {
    ($dt:expr, $func:ident($($arg:expr),*)) => {
        match $dt {
            DataType::Int8 => $func::<i8>($($arg),*),
            DataType::UInt8 => $func::<u8>($($arg),*),
            DataType::Int16 => $func::<i16>($($arg),*),
            DataType::UInt16 => $func::<u16>($($arg),*),
            DataType::Int32 => $func::<i32>($($arg),*),
            DataType::UInt32 => $func::<u32>($($arg),*),
            DataType::Int64 => $func::<i64>($($arg),*),
            DataType::UInt64 => $func::<u64>($($arg),*),
            DataType::Float32 => $func::<f32>($($arg),*),
            DataType::Float64 => $func::<f64>($($arg),*),
            DataType::Boolean => $func::<bool>($($arg),*),
        }
    };
}

/// Adds a numeric array and fills it with an initial value
#[derive(Debug, Clone, Copy, Default)]
pub struct CreateDataArray;

impl CreateDataArray {
    pub const UUID: Uuid = Uuid::from_u128(0x6d42_caa4_ee48_4753_a772_ca15_395c_9e35);

    fn plan(data: &DataStructure, args: &Arguments) -> Result<PreflightResult, Error> {
        let data_type = args.get::<DataType>(K_NUMERIC_TYPE)?;
        let component_shape = args.get::<Vec<usize>>(K_COMPONENT_SHAPE)?;
        let path = args.get::<DataPath>(K_OUTPUT_PATH)?;
        let init = args.get::<String>(K_INIT_VALUE)?;

        if component_shape.contains(&0) {
            return Err(Error::argument(
                ZERO_COMPONENTS,
                format!("component dimensions must all be non-zero, got {component_shape:?}"),
            ));
        }
        if !with_element!(data_type, parses(&init)) {
            return Err(Error::argument(
                BAD_INIT_VALUE,
                format!("initialization value '{init}' is not a valid {data_type}"),
            ));
        }

        let parent = path.parent().unwrap_or_default();
        let tuple_shape = if !parent.is_empty() && data.kind_of(&parent)? == ObjectKind::AttributeMatrix {
            data.attribute_matrix(&parent)?.to_vec()
        } else {
            args.get::<Vec<usize>>(K_TUPLE_DIMS)?
        };

        let size = checked_element_count(&format!("'{path}'"), &tuple_shape, &component_shape)?;
        Ok(PreflightResult::ok(OutputActions::new().with(Action::CreateArray {
            path,
            data_type,
            tuple_shape,
            component_shape,
        }))
        .with_value("Number of Values", size.to_string()))
    }

    fn initialize(data: &mut DataStructure, args: &Arguments, ctx: &RunContext) -> Result<Completion, Error> {
        let data_type = args.get::<DataType>(K_NUMERIC_TYPE)?;
        let path = args.get::<DataPath>(K_OUTPUT_PATH)?;
        let init = args.get::<String>(K_INIT_VALUE)?;
        with_element!(data_type, fill(data, &path, &init, ctx))
    }
}

fn parses<T: Element>(text: &str) -> bool {
    T::parse_value(text).is_some()
}

fn fill<T: Element>(
    data: &mut DataStructure,
    path: &DataPath,
    text: &str,
    ctx: &RunContext,
) -> Result<Completion, Error> {
    let value = T::parse_value(text).ok_or_else(|| {
        Error::argument(BAD_INIT_VALUE, format!("initialization value '{text}' is not valid"))
    })?;
    let store = data.array_mut::<T>(path)?;
    let values = store
        .as_mut_slice()
        .map_err(|e| DataError::store(path, e))?;

    let counter = ctx.counter("Initializing array", values.len());
    values.par_chunks_mut(FILL_CHUNK).for_each(|chunk| {
        if ctx.is_cancelled() {
            return;
        }
        chunk.fill(value);
        counter.advance(chunk.len());
    });

    if ctx.is_cancelled() {
        Ok(Completion::Cancelled)
    } else {
        Ok(Completion::Finished)
    }
}

impl Filter for CreateDataArray {
    fn name(&self) -> &'static str {
        "CreateDataArray"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Create Data Array"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["Core", "Generation", "Create", "Array", "Initialize"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params
            .insert_separator("Input Parameter(s)")
            .insert(Parameter::data_type(
                K_NUMERIC_TYPE,
                "Output Numeric Type",
                "Numeric type of the created array",
                DataType::Int32,
            ))
            .insert(Parameter::string(
                K_INIT_VALUE,
                "Initialization Value",
                "Value every element is set to",
                "0",
            ))
            .insert(Parameter::tuple_shape(
                K_COMPONENT_SHAPE,
                "Component Dimensions",
                "Slowest to fastest component dimensions",
                vec![1],
            ))
            .insert(Parameter::tuple_shape(
                K_TUPLE_DIMS,
                "Data Array Dimensions (Slowest to Fastest Dimensions)",
                "Used only when the parent is not an Attribute Matrix",
                vec![1],
            ))
            .insert_separator("Output Data Array")
            .insert(Parameter::array_creation(
                K_OUTPUT_PATH,
                "Created Array",
                "Path of the array to create",
                DataPath::single("Data"),
            ));
        params
    }

    fn parameters_version(&self) -> u32 {
        2
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(*self)
    }

    fn preflight_impl(&self, data: &DataStructure, args: &Arguments, _ctx: &RunContext) -> PreflightResult {
        Self::plan(data, args).unwrap_or_else(PreflightResult::fail)
    }

    fn execute_impl(&self, data: &mut DataStructure, args: &Arguments, ctx: &RunContext) -> Report<Completion> {
        Self::initialize(data, args, ctx).into()
    }

    fn upgrade_arguments(&self, from: u32, mut args: Arguments) -> Report<Arguments> {
        if from != 1 {
            return Report::fail(Error::argument(
                UPGRADE_OLDER_VERSION,
                format!("{} cannot upgrade arguments from parameter version {from}", self.name()),
            ));
        }
        let mut report = Report::ok(());
        if let Some(value) = args.remove(K_COMPONENT_COUNT_V1) {
            match usize::from_arg(&value) {
                Some(count) => {
                    args.insert(K_COMPONENT_SHAPE, vec![count]);
                    report.push_warning(Warning::new(
                        UPGRADED_COMPONENT_COUNT,
                        format!("'{K_COMPONENT_COUNT_V1}' = {count} became '{K_COMPONENT_SHAPE}' = [{count}]"),
                    ));
                }
                None => report.push_error(Error::argument(
                    ARG_KIND_MISMATCH,
                    format!("'{K_COMPONENT_COUNT_V1}' must be an unsigned integer, got a {}", value.kind_name()),
                )),
            }
        }
        report.map(|()| args)
    }

    fn import_legacy_arguments(&self, json: &serde_json::Value) -> Report<Arguments> {
        let mut importer = LegacyImporter::new(json, self.default_arguments());
        importer
            .convert("ScalarType", K_NUMERIC_TYPE, LegacyConverter::ScalarType, Requirement::Required)
            .convert(
                "NumberOfComponents",
                K_COMPONENT_SHAPE,
                LegacyConverter::ComponentCount,
                Requirement::Optional,
            )
            .convert("NewArray", K_OUTPUT_PATH, LegacyConverter::ArrayPath, Requirement::Required)
            .convert(
                "InitializationValue",
                K_INIT_VALUE,
                LegacyConverter::String,
                Requirement::Optional,
            )
            .ignore("InitializationType")
            .ignore("InitializationRange");
        importer.finish()
    }
}
