//! Import of legacy parameter documents
//!
//! A legacy document is a flat JSON object keyed by the old parameter names.
//! [`LegacyImporter`] starts from a filter's default arguments and maps each
//! legacy key through a [`LegacyConverter`], accumulating problems in a
//! [`Report`].

use crate::arguments::{ArgValue, Arguments};
use crate::report::{Error, Report, Warning};
use serde_json::{Map, Value};
use std::collections::HashSet;
use strata_data::{DataPath, DataType};

/// Optional legacy key absent (warning)
pub const LEGACY_MISSING_OPTIONAL: i32 = -401;
/// Required legacy key absent
pub const LEGACY_MISSING_REQUIRED: i32 = -402;
/// Legacy value has the wrong shape
pub const LEGACY_CONVERSION_FAILED: i32 = -403;
/// Legacy key no converter consumed (warning)
pub const LEGACY_UNCONSUMED_KEY: i32 = -404;
/// Document is not a JSON object
pub const LEGACY_NOT_AN_OBJECT: i32 = -405;

/// Metadata keys every legacy filter document carries
pub const LEGACY_METADATA_KEYS: [&str; 5] = [
    "Filter_Enabled",
    "Filter_Human_Label",
    "Filter_Name",
    "Filter_Uuid",
    "FilterVersion",
];

const DATA_CONTAINER_NAME: &str = "Data Container Name";
const ATTRIBUTE_MATRIX_NAME: &str = "Attribute Matrix Name";
const DATA_ARRAY_NAME: &str = "Data Array Name";
const TABLE_DATA: &str = "Table Data";

/// How one legacy value maps onto an [`ArgValue`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LegacyConverter {
    /// JSON bool, or 0/1
    Bool,
    /// 0/1 integer gating linked parameters
    LinkedBool,
    Int,
    UInt,
    Float,
    String,
    /// `{"Data Container Name", "Attribute Matrix Name", "Data Array Name"}`
    ArrayPath,
    /// JSON array of [`LegacyConverter::ArrayPath`] objects
    ArrayPathList,
    /// `{"Data Container Name", "Attribute Matrix Name"}`
    AttributeMatrixPath,
    /// Bare container name, or an object with a container name
    DataContainerPath,
    /// Bare object name
    LinkedName,
    /// `{"Table Data": [[d0, d1, ...]]}`, first row
    TupleDims,
    /// `{"x", "y", "z"}` or a 3-element array of non-negative integers
    IntVec3,
    /// `{"x", "y", "z"}` or a 3-element array of numbers
    FloatVec3,
    /// Numeric type index, int8 through bool
    ScalarType,
    /// Single component count, as a one-dimension component shape
    ComponentCount,
}

impl LegacyConverter {
    /// Convert `value`, describing the problem on failure
    ///
    /// # Errors
    /// A human-readable reason when the value has the wrong shape.
    pub fn convert(self, value: &Value) -> Result<ArgValue, String> {
        match self {
            Self::Bool | Self::LinkedBool => match value {
                Value::Bool(b) => Ok(ArgValue::Bool(*b)),
                Value::Number(n) => match n.as_i64() {
                    Some(0) => Ok(ArgValue::Bool(false)),
                    Some(1) => Ok(ArgValue::Bool(true)),
                    _ => Err(format!("expected 0 or 1, got {n}")),
                },
                other => Err(format!("expected a boolean, got {}", type_name(other))),
            },
            Self::Int => value
                .as_i64()
                .map(ArgValue::Int)
                .ok_or_else(|| format!("expected an integer, got {}", type_name(value))),
            Self::UInt => value
                .as_u64()
                .map(ArgValue::UInt)
                .ok_or_else(|| format!("expected a non-negative integer, got {}", type_name(value))),
            Self::Float => value
                .as_f64()
                .map(ArgValue::Float)
                .ok_or_else(|| format!("expected a number, got {}", type_name(value))),
            Self::String | Self::LinkedName => value
                .as_str()
                .map(|s| ArgValue::String(s.to_string()))
                .ok_or_else(|| format!("expected a string, got {}", type_name(value))),
            Self::ArrayPath => {
                object_path(value, &[DATA_CONTAINER_NAME, ATTRIBUTE_MATRIX_NAME, DATA_ARRAY_NAME])
                    .map(ArgValue::Path)
            }
            Self::ArrayPathList => value
                .as_array()
                .ok_or_else(|| format!("expected a list of paths, got {}", type_name(value)))?
                .iter()
                .map(|item| object_path(item, &[DATA_CONTAINER_NAME, ATTRIBUTE_MATRIX_NAME, DATA_ARRAY_NAME]))
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::Paths),
            Self::AttributeMatrixPath => {
                object_path(value, &[DATA_CONTAINER_NAME, ATTRIBUTE_MATRIX_NAME]).map(ArgValue::Path)
            }
            Self::DataContainerPath => match value {
                Value::String(name) => Ok(ArgValue::Path(named_path(&[name.as_str()]))),
                Value::Object(_) => object_path(value, &[DATA_CONTAINER_NAME]).map(ArgValue::Path),
                other => Err(format!("expected a container name, got {}", type_name(other))),
            },
            Self::TupleDims => {
                let row = value
                    .get(TABLE_DATA)
                    .and_then(Value::as_array)
                    .and_then(|rows| rows.first())
                    .and_then(Value::as_array)
                    .ok_or_else(|| format!("expected a '{TABLE_DATA}' table"))?;
                row.iter()
                    .map(non_negative)
                    .collect::<Result<Vec<_>, _>>()
                    .map(ArgValue::Shape)
            }
            Self::IntVec3 => vec3(value)?
                .iter()
                .map(|v| non_negative(v).map(|n| n as u64))
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::UIntVec),
            Self::FloatVec3 => vec3(value)?
                .iter()
                .map(|v| v.as_f64().ok_or_else(|| format!("expected a number, got {}", type_name(v))))
                .collect::<Result<Vec<_>, _>>()
                .map(ArgValue::FloatVec),
            Self::ScalarType => {
                let index = non_negative(value)?;
                DataType::from_index(index)
                    .map(ArgValue::DataType)
                    .ok_or_else(|| format!("unknown scalar type {index}"))
            }
            Self::ComponentCount => non_negative(value).map(|n| ArgValue::Shape(vec![n])),
        }
    }
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Empty names end the path
fn named_path(names: &[&str]) -> DataPath {
    DataPath::from_names(&names.iter().copied().take_while(|n| !n.is_empty()).collect::<Vec<_>>())
}

fn object_path(value: &Value, keys: &[&str]) -> Result<DataPath, String> {
    let object = value
        .as_object()
        .ok_or_else(|| format!("expected a path object, got {}", type_name(value)))?;
    let names = keys
        .iter()
        .map(|key| {
            object
                .get(*key)
                .and_then(Value::as_str)
                .ok_or_else(|| format!("path object lacks '{key}'"))
        })
        .collect::<Result<Vec<_>, _>>()?;
    Ok(named_path(&names))
}

#[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
fn non_negative(value: &Value) -> Result<usize, String> {
    // Legacy tables store integers as floats.
    let n = value
        .as_f64()
        .ok_or_else(|| format!("expected a number, got {}", type_name(value)))?;
    if n < 0.0 || n.fract() != 0.0 {
        return Err(format!("expected a non-negative integer, got {n}"));
    }
    Ok(n as usize)
}

fn vec3(value: &Value) -> Result<Vec<&Value>, String> {
    match value {
        Value::Array(items) if items.len() == 3 => Ok(items.iter().collect()),
        Value::Object(map) => ["x", "y", "z"]
            .iter()
            .map(|k| map.get(*k).ok_or_else(|| format!("vector lacks '{k}'")))
            .collect(),
        other => Err(format!("expected a 3-vector, got {}", type_name(other))),
    }
}

/// Whether a missing legacy key is fatal
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Requirement {
    Required,
    /// Keep the default and warn
    Optional,
}

/// Accumulating converter from one legacy document to [`Arguments`]
#[derive(Debug)]
pub struct LegacyImporter<'a> {
    doc: Option<&'a Map<String, Value>>,
    arguments: Arguments,
    report: Report,
    consumed: HashSet<&'a str>,
}

impl<'a> LegacyImporter<'a> {
    /// Start from `defaults`; a non-object document is recorded as an error
    #[must_use]
    pub fn new(doc: &'a Value, defaults: Arguments) -> Self {
        let mut report = Report::ok(());
        let doc = doc.as_object();
        if doc.is_none() {
            report.push_error(Error::import(
                LEGACY_NOT_AN_OBJECT,
                "legacy parameter document is not a JSON object",
            ));
        }
        Self {
            doc,
            arguments: defaults,
            report,
            consumed: HashSet::new(),
        }
    }

    /// Map `legacy_key` onto `key` through `converter`
    pub fn convert(
        &mut self,
        legacy_key: &'a str,
        key: &str,
        converter: LegacyConverter,
        requirement: Requirement,
    ) -> &mut Self {
        let Some(doc) = self.doc else {
            return self;
        };
        self.consumed.insert(legacy_key);
        match (doc.get(legacy_key), requirement) {
            (Some(value), _) => match converter.convert(value) {
                Ok(arg) => {
                    self.arguments.insert(key, arg);
                }
                Err(reason) => self.report.push_error(Error::import(
                    LEGACY_CONVERSION_FAILED,
                    format!("legacy key '{legacy_key}': {reason}"),
                )),
            },
            (None, Requirement::Optional) => self.report.push_warning(Warning::new(
                LEGACY_MISSING_OPTIONAL,
                format!("legacy key '{legacy_key}' is missing; '{key}' keeps its default"),
            )),
            (None, Requirement::Required) => self.report.push_error(Error::import(
                LEGACY_MISSING_REQUIRED,
                format!("required legacy key '{legacy_key}' is missing"),
            )),
        }
        self
    }

    /// Mark a legacy key as understood without mapping it
    pub fn ignore(&mut self, legacy_key: &'a str) -> &mut Self {
        self.consumed.insert(legacy_key);
        self
    }

    /// Arguments, or every accumulated error; unconsumed keys become warnings
    #[must_use]
    pub fn finish(self) -> Report<Arguments> {
        let mut report = self.report;
        if let Some(doc) = self.doc {
            for key in doc.keys() {
                if !self.consumed.contains(key.as_str())
                    && !LEGACY_METADATA_KEYS.contains(&key.as_str())
                {
                    report.push_warning(Warning::new(
                        LEGACY_UNCONSUMED_KEY,
                        format!("legacy key '{key}' was not converted"),
                    ));
                }
            }
        }
        for warning in report.warnings() {
            tracing::warn!(code = warning.code, "{}", warning.message);
        }
        let arguments = self.arguments;
        report.map(|()| arguments)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn array_path_object() {
        let value = json!({
            "Data Container Name": "DataContainer",
            "Attribute Matrix Name": "Feature Data",
            "Data Array Name": "AvgQuats",
        });
        assert_eq!(
            LegacyConverter::ArrayPath.convert(&value),
            Ok(ArgValue::Path(DataPath::from_names(&[
                "DataContainer",
                "Feature Data",
                "AvgQuats"
            ])))
        );
        let partial = json!({"Data Container Name": "DC", "Attribute Matrix Name": ""});
        assert_eq!(
            LegacyConverter::AttributeMatrixPath.convert(&partial),
            Ok(ArgValue::Path(DataPath::single("DC")))
        );
    }

    #[test]
    fn linked_bool_accepts_integers() {
        assert_eq!(LegacyConverter::LinkedBool.convert(&json!(1)), Ok(ArgValue::Bool(true)));
        assert_eq!(LegacyConverter::LinkedBool.convert(&json!(0)), Ok(ArgValue::Bool(false)));
        assert!(LegacyConverter::LinkedBool.convert(&json!(2)).is_err());
        assert!(LegacyConverter::Bool.convert(&json!("true")).is_err());
    }

    #[test]
    fn tuple_dims_table() {
        let value = json!({"Table Data": [[3.0, 2, 1]], "Rows": 1});
        assert_eq!(
            LegacyConverter::TupleDims.convert(&value),
            Ok(ArgValue::Shape(vec![3, 2, 1]))
        );
        assert!(LegacyConverter::TupleDims.convert(&json!({"Table Data": [[-1]]})).is_err());
    }

    #[test]
    fn scalar_type_index() {
        assert_eq!(
            LegacyConverter::ScalarType.convert(&json!(8)),
            Ok(ArgValue::DataType(DataType::Float32))
        );
        assert!(LegacyConverter::ScalarType.convert(&json!(11)).is_err());
        assert_eq!(
            LegacyConverter::ComponentCount.convert(&json!(3)),
            Ok(ArgValue::Shape(vec![3]))
        );
    }

    #[test]
    fn vec3_from_object_or_array() {
        assert_eq!(
            LegacyConverter::FloatVec3.convert(&json!({"x": 0.5, "y": 1, "z": 2})),
            Ok(ArgValue::FloatVec(vec![0.5, 1.0, 2.0]))
        );
        assert_eq!(
            LegacyConverter::IntVec3.convert(&json!([4, 5, 6])),
            Ok(ArgValue::UIntVec(vec![4, 5, 6]))
        );
    }

    #[test]
    fn importer_accumulates() {
        let doc = json!({
            "Count": 3,
            "Flag": "yes",
            "Stray": 1,
            "Filter_Human_Label": "Something",
        });
        let defaults = Arguments::new().with("count", 1u64).with("name", "x");
        let mut importer = LegacyImporter::new(&doc, defaults);
        importer
            .convert("Count", "count", LegacyConverter::UInt, Requirement::Required)
            .convert("Flag", "flag", LegacyConverter::Bool, Requirement::Optional)
            .convert("Name", "name", LegacyConverter::String, Requirement::Optional)
            .convert("Path", "path", LegacyConverter::ArrayPath, Requirement::Required);
        let report = importer.finish();
        assert!(report.has_error_code(LEGACY_CONVERSION_FAILED));
        assert!(report.has_error_code(LEGACY_MISSING_REQUIRED));
        assert!(report.has_warning_code(LEGACY_MISSING_OPTIONAL));
        assert!(report.has_warning_code(LEGACY_UNCONSUMED_KEY));
        assert_eq!(report.warnings().len(), 2);
    }

    #[test]
    fn importer_keeps_defaults_for_missing_optional() {
        let doc = json!({"Count": 7});
        let defaults = Arguments::new().with("count", 1u64).with("name", "x");
        let mut importer = LegacyImporter::new(&doc, defaults);
        importer
            .convert("Count", "count", LegacyConverter::UInt, Requirement::Required)
            .convert("Name", "name", LegacyConverter::String, Requirement::Optional);
        let args = importer.finish().into_result().unwrap();
        assert_eq!(args.get::<u64>("count").unwrap(), 7);
        assert_eq!(args.get::<String>("name").unwrap(), "x");
    }

    #[test]
    fn importer_rejects_non_object() {
        let doc = json!([1, 2]);
        let report = LegacyImporter::new(&doc, Arguments::new()).finish();
        assert!(report.has_error_code(LEGACY_NOT_AN_OBJECT));
    }
}
