//! Parameter schemas, argument binding and validation against a tree
//!
//! A filter declares its inputs as an ordered [`Parameters`] collection.
//! Boolean parameters can gate other parameters through links; inactive
//! parameters are neither required nor validated.

use crate::arguments::{ArgValue, Arguments, FromArgValue, ARG_KIND_MISMATCH, ARG_MISSING};
use crate::report::{Error, Report, Warning};
use indexmap::IndexMap;
use serde::Serialize;
use strata_data::{validate_name, DataError, DataPath, DataStructure, DataType, ObjectKind};

/// Argument key matches no parameter (warning)
pub const ARG_UNKNOWN_KEY: i32 = -200;
/// Number outside its declared range
pub const ARG_OUT_OF_RANGE: i32 = -203;
/// Choice index beyond the choices list
pub const ARG_INVALID_CHOICE: i32 = -204;
/// Object name rejected by the naming rules
pub const ARG_INVALID_NAME: i32 = -205;
/// Selected array or list has a disallowed element kind
pub const ARG_DISALLOWED_TYPE: i32 = -206;
/// Selected array has a disallowed component shape
pub const ARG_DISALLOWED_COMPONENTS: i32 = -207;
/// Fixed-length vector has the wrong length
pub const ARG_WRONG_LENGTH: i32 = -208;
/// Tuple shape with no dimensions
pub const ARG_EMPTY_SHAPE: i32 = -209;
/// Shape whose element count does not fit in `usize`
pub const ARG_SHAPE_OVERFLOW: i32 = -212;

/// Element count of a tuple and component shape pair
///
/// # Errors
/// [`ARG_SHAPE_OVERFLOW`] naming `what` when the count does not fit in `usize`.
pub fn checked_element_count(
    what: &str,
    tuple_shape: &[usize],
    component_shape: &[usize],
) -> Result<usize, Error> {
    strata_data::element_count(tuple_shape, component_shape)
        .map_err(|e| Error::argument(ARG_SHAPE_OVERFLOW, format!("{what}: {e}")))
}

/// Numeric flavour of a number parameter
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum NumberKind {
    Int,
    UInt,
    Float,
}

/// Number parameter constraint
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct NumberSpec {
    pub kind: NumberKind,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

/// Constraint on the value of one parameter
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ParameterKind {
    Bool,
    Number(NumberSpec),
    String,
    /// Name of an object to create next to a selection
    DataObjectName,
    Choices {
        choices: Vec<String>,
    },
    DataTypeChoice,
    /// Row of dimensions from a dynamic table, slowest first
    TupleShape,
    FloatVec {
        len: usize,
    },
    UIntVec {
        len: usize,
    },
    ArraySelection {
        /// Empty means any kind
        allowed_types: Vec<DataType>,
        /// Empty means any shape
        allowed_component_shapes: Vec<Vec<usize>>,
    },
    NeighborListSelection {
        allowed_types: Vec<DataType>,
    },
    DataGroupSelection,
    AttributeMatrixSelection,
    GeometrySelection,
    DataObjectSelection,
    MultiObjectSelection,
    DataGroupCreation,
    ArrayCreation,
}

impl ParameterKind {
    /// Whether `value` has the right shape for this kind (no range checks)
    #[must_use]
    pub fn accepts(&self, value: &ArgValue) -> bool {
        match (self, value) {
            (Self::Bool, ArgValue::Bool(_))
            | (
                Self::String | Self::DataObjectName,
                ArgValue::String(_),
            )
            | (Self::Choices { .. }, ArgValue::Choice(_))
            | (Self::DataTypeChoice, ArgValue::DataType(_))
            | (Self::TupleShape, ArgValue::Shape(_) | ArgValue::UIntVec(_))
            | (Self::FloatVec { .. }, ArgValue::FloatVec(_))
            | (Self::UIntVec { .. }, ArgValue::UIntVec(_))
            | (Self::MultiObjectSelection, ArgValue::Paths(_)) => true,
            (Self::Number(spec), value) => match spec.kind {
                NumberKind::Int => i64::from_arg(value).is_some(),
                NumberKind::UInt => u64::from_arg(value).is_some(),
                NumberKind::Float => f64::from_arg(value).is_some(),
            },
            (kind, ArgValue::Path(_)) => kind.takes_path(),
            _ => false,
        }
    }

    /// Selections and creations address a single path
    #[must_use]
    pub const fn takes_path(&self) -> bool {
        matches!(
            self,
            Self::ArraySelection { .. }
                | Self::NeighborListSelection { .. }
                | Self::DataGroupSelection
                | Self::AttributeMatrixSelection
                | Self::GeometrySelection
                | Self::DataObjectSelection
                | Self::DataGroupCreation
                | Self::ArrayCreation
        )
    }

    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::Bool => "bool",
            Self::Number(_) => "number",
            Self::String => "string",
            Self::DataObjectName => "data object name",
            Self::Choices { .. } => "choices",
            Self::DataTypeChoice => "data type",
            Self::TupleShape => "tuple shape",
            Self::FloatVec { .. } => "float vector",
            Self::UIntVec { .. } => "uint vector",
            Self::ArraySelection { .. } => "array selection",
            Self::NeighborListSelection { .. } => "neighbor list selection",
            Self::DataGroupSelection => "data group selection",
            Self::AttributeMatrixSelection => "attribute matrix selection",
            Self::GeometrySelection => "geometry selection",
            Self::DataObjectSelection => "data object selection",
            Self::MultiObjectSelection => "multi object selection",
            Self::DataGroupCreation => "data group creation",
            Self::ArrayCreation => "array creation",
        }
    }
}

/// One declared input of a filter
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Parameter {
    pub key: String,
    pub label: String,
    pub description: String,
    pub default: ArgValue,
    pub kind: ParameterKind,
    /// Must be supplied explicitly while active
    pub required: bool,
    /// Selection is removed or renamed by the filter's own actions
    pub consumed: bool,
}

impl Parameter {
    /// Raw constructor; prefer the typed helpers below
    #[must_use]
    pub fn new(
        key: impl Into<String>,
        label: impl Into<String>,
        description: impl Into<String>,
        default: ArgValue,
        kind: ParameterKind,
    ) -> Self {
        let required = kind.takes_path() || matches!(kind, ParameterKind::MultiObjectSelection);
        Self {
            key: key.into(),
            label: label.into(),
            description: description.into(),
            default,
            kind,
            required,
            consumed: false,
        }
    }

    #[must_use]
    pub fn bool(key: &str, label: &str, description: &str, default: bool) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::Bool)
    }

    #[must_use]
    pub fn int(key: &str, label: &str, description: &str, default: i64) -> Self {
        Self::number(key, label, description, default.into(), NumberKind::Int)
    }

    #[must_use]
    pub fn uint(key: &str, label: &str, description: &str, default: u64) -> Self {
        Self::number(key, label, description, default.into(), NumberKind::UInt)
    }

    #[must_use]
    pub fn float(key: &str, label: &str, description: &str, default: f64) -> Self {
        Self::number(key, label, description, default.into(), NumberKind::Float)
    }

    fn number(key: &str, label: &str, description: &str, default: ArgValue, kind: NumberKind) -> Self {
        Self::new(
            key,
            label,
            description,
            default,
            ParameterKind::Number(NumberSpec {
                kind,
                min: None,
                max: None,
            }),
        )
    }

    #[must_use]
    pub fn string(key: &str, label: &str, description: &str, default: &str) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::String)
    }

    #[must_use]
    pub fn data_object_name(key: &str, label: &str, description: &str, default: &str) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::DataObjectName)
    }

    #[must_use]
    pub fn choices(
        key: &str,
        label: &str,
        description: &str,
        default: usize,
        choices: &[&str],
    ) -> Self {
        Self::new(
            key,
            label,
            description,
            ArgValue::Choice(default),
            ParameterKind::Choices {
                choices: choices.iter().map(|c| (*c).to_string()).collect(),
            },
        )
    }

    #[must_use]
    pub fn data_type(key: &str, label: &str, description: &str, default: DataType) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::DataTypeChoice)
    }

    #[must_use]
    pub fn tuple_shape(key: &str, label: &str, description: &str, default: Vec<usize>) -> Self {
        Self::new(key, label, description, ArgValue::Shape(default), ParameterKind::TupleShape)
    }

    #[must_use]
    pub fn float_vec3(key: &str, label: &str, description: &str, default: [f64; 3]) -> Self {
        Self::new(
            key,
            label,
            description,
            ArgValue::FloatVec(default.to_vec()),
            ParameterKind::FloatVec { len: 3 },
        )
    }

    #[must_use]
    pub fn uint_vec3(key: &str, label: &str, description: &str, default: [u64; 3]) -> Self {
        Self::new(
            key,
            label,
            description,
            ArgValue::UIntVec(default.to_vec()),
            ParameterKind::UIntVec { len: 3 },
        )
    }

    #[must_use]
    pub fn array_selection(
        key: &str,
        label: &str,
        description: &str,
        default: DataPath,
        allowed_types: &[DataType],
        allowed_component_shapes: &[&[usize]],
    ) -> Self {
        Self::new(
            key,
            label,
            description,
            default.into(),
            ParameterKind::ArraySelection {
                allowed_types: allowed_types.to_vec(),
                allowed_component_shapes: allowed_component_shapes
                    .iter()
                    .map(|s| s.to_vec())
                    .collect(),
            },
        )
    }

    #[must_use]
    pub fn neighbor_list_selection(
        key: &str,
        label: &str,
        description: &str,
        default: DataPath,
        allowed_types: &[DataType],
    ) -> Self {
        Self::new(
            key,
            label,
            description,
            default.into(),
            ParameterKind::NeighborListSelection {
                allowed_types: allowed_types.to_vec(),
            },
        )
    }

    #[must_use]
    pub fn data_group_selection(key: &str, label: &str, description: &str, default: DataPath) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::DataGroupSelection)
    }

    #[must_use]
    pub fn attribute_matrix_selection(
        key: &str,
        label: &str,
        description: &str,
        default: DataPath,
    ) -> Self {
        Self::new(
            key,
            label,
            description,
            default.into(),
            ParameterKind::AttributeMatrixSelection,
        )
    }

    #[must_use]
    pub fn geometry_selection(key: &str, label: &str, description: &str, default: DataPath) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::GeometrySelection)
    }

    #[must_use]
    pub fn data_object_selection(
        key: &str,
        label: &str,
        description: &str,
        default: DataPath,
    ) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::DataObjectSelection)
    }

    #[must_use]
    pub fn multi_object_selection(
        key: &str,
        label: &str,
        description: &str,
        default: Vec<DataPath>,
    ) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::MultiObjectSelection)
    }

    #[must_use]
    pub fn data_group_creation(key: &str, label: &str, description: &str, default: DataPath) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::DataGroupCreation)
    }

    #[must_use]
    pub fn array_creation(key: &str, label: &str, description: &str, default: DataPath) -> Self {
        Self::new(key, label, description, default.into(), ParameterKind::ArrayCreation)
    }

    /// Restrict a number parameter to `[min, max]`
    #[must_use]
    pub fn with_range(mut self, min: Option<f64>, max: Option<f64>) -> Self {
        if let ParameterKind::Number(spec) = &mut self.kind {
            spec.min = min;
            spec.max = max;
        }
        self
    }

    /// Default is used when the argument is absent
    #[must_use]
    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }

    #[must_use]
    pub fn required(mut self) -> Self {
        self.required = true;
        self
    }

    /// Skip this selection in [`Parameters::validate_selections`]
    #[must_use]
    pub fn consumed(mut self) -> Self {
        self.consumed = true;
        self
    }

    /// Value checks that need no tree
    fn check_value(&self, value: &ArgValue) -> Result<(), Error> {
        if !self.kind.accepts(value) {
            return Err(Error::argument(
                ARG_KIND_MISMATCH,
                format!(
                    "'{}' expects a {}, got a {}",
                    self.label,
                    self.kind.name(),
                    value.kind_name()
                ),
            ));
        }
        match (&self.kind, value) {
            (ParameterKind::Number(spec), value) => {
                let v = f64::from_arg(value).unwrap_or_default();
                let below = spec.min.is_some_and(|min| v < min);
                let above = spec.max.is_some_and(|max| v > max);
                if below || above {
                    return Err(Error::argument(
                        ARG_OUT_OF_RANGE,
                        format!(
                            "'{}' = {v} is outside [{}, {}]",
                            self.label,
                            spec.min.map_or("-inf".to_string(), |m| m.to_string()),
                            spec.max.map_or("inf".to_string(), |m| m.to_string()),
                        ),
                    ));
                }
            }
            (ParameterKind::Choices { choices }, ArgValue::Choice(index)) => {
                if *index >= choices.len() {
                    return Err(Error::argument(
                        ARG_INVALID_CHOICE,
                        format!(
                            "'{}' choice {index} is out of range (0..{})",
                            self.label,
                            choices.len()
                        ),
                    ));
                }
            }
            (ParameterKind::DataObjectName, ArgValue::String(name)) => {
                validate_name(name).map_err(|e| {
                    Error::argument(ARG_INVALID_NAME, format!("'{}': {e}", self.label))
                })?;
            }
            (ParameterKind::TupleShape, value) => {
                let shape = Vec::<usize>::from_arg(value).unwrap_or_default();
                if shape.is_empty() {
                    return Err(Error::argument(
                        ARG_EMPTY_SHAPE,
                        format!("'{}' needs at least one dimension", self.label),
                    ));
                }
                checked_element_count(&format!("'{}'", self.label), &shape, &[1])?;
            }
            (ParameterKind::FloatVec { len }, ArgValue::FloatVec(v)) if v.len() != *len => {
                return Err(wrong_length(&self.label, *len, v.len()));
            }
            (ParameterKind::UIntVec { len }, ArgValue::UIntVec(v)) if v.len() != *len => {
                return Err(wrong_length(&self.label, *len, v.len()));
            }
            (ParameterKind::DataGroupCreation | ParameterKind::ArrayCreation, ArgValue::Path(path)) => {
                let name = path.name().unwrap_or_default();
                validate_name(name).map_err(|e| {
                    Error::argument(ARG_INVALID_NAME, format!("'{}': {e}", self.label))
                })?;
            }
            _ => {}
        }
        Ok(())
    }
}

fn wrong_length(label: &str, expected: usize, actual: usize) -> Error {
    Error::argument(
        ARG_WRONG_LENGTH,
        format!("'{label}' needs {expected} values, got {actual}"),
    )
}

/// Display layout entry
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum LayoutItem {
    Separator(String),
    Parameter(String),
}

/// `child` is active only while boolean `group` equals `value`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Link {
    pub group: String,
    pub child: String,
    pub value: bool,
}

/// Ordered parameter schema of one filter
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Parameters {
    params: IndexMap<String, Parameter>,
    layout: Vec<LayoutItem>,
    linkable: Vec<String>,
    links: Vec<Link>,
}

impl Parameters {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Display separator before the next parameters
    pub fn insert_separator(&mut self, name: &str) -> &mut Self {
        self.layout.push(LayoutItem::Separator(name.to_string()));
        self
    }

    /// Add a parameter; a repeated key replaces the earlier definition
    pub fn insert(&mut self, param: Parameter) -> &mut Self {
        if !self.params.contains_key(&param.key) {
            self.layout.push(LayoutItem::Parameter(param.key.clone()));
        }
        self.params.insert(param.key.clone(), param);
        self
    }

    /// Add a boolean parameter that can gate others through [`Parameters::link`]
    pub fn insert_linkable(&mut self, param: Parameter) -> &mut Self {
        self.linkable.push(param.key.clone());
        self.insert(param)
    }

    /// Make `child` active only when `group` equals `value`
    ///
    /// A child with several links is active when any of them holds.
    pub fn link(&mut self, group: &str, child: &str, value: bool) -> &mut Self {
        self.links.push(Link {
            group: group.to_string(),
            child: child.to_string(),
            value,
        });
        self
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&Parameter> {
        self.params.get(key)
    }

    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.params.contains_key(key)
    }

    pub fn iter(&self) -> impl Iterator<Item = &Parameter> {
        self.params.values()
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.params.keys().map(String::as_str)
    }

    #[must_use]
    pub fn layout(&self) -> &[LayoutItem] {
        &self.layout
    }

    #[must_use]
    pub fn links(&self) -> &[Link] {
        &self.links
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.params.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Every parameter at its default value
    #[must_use]
    pub fn default_arguments(&self) -> Arguments {
        self.params
            .values()
            .map(|p| (p.key.clone(), p.default.clone()))
            .collect()
    }

    /// Whether `key` is active under `args` (absent group values use the default)
    #[must_use]
    pub fn is_active(&self, key: &str, args: &Arguments) -> bool {
        let mut links = self.links.iter().filter(|l| l.child == key).peekable();
        if links.peek().is_none() {
            return true;
        }
        links.any(|link| self.group_value(&link.group, args) == Some(link.value))
    }

    fn group_value(&self, group: &str, args: &Arguments) -> Option<bool> {
        match args.value(group) {
            Some(value) => bool::from_arg(value),
            None => self.params.get(group).and_then(|p| bool::from_arg(&p.default)),
        }
    }

    /// Schema consistency problems (links to unknown or non-boolean keys)
    #[must_use]
    pub fn schema_problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        for link in &self.links {
            if !self.linkable.contains(&link.group) {
                problems.push(format!("link group '{}' was not inserted as linkable", link.group));
            }
            match self.params.get(&link.group) {
                Some(p) if p.kind == ParameterKind::Bool => {}
                Some(_) => problems.push(format!("link group '{}' is not a bool", link.group)),
                None => problems.push(format!("link group '{}' is unknown", link.group)),
            }
            if !self.params.contains_key(&link.child) {
                problems.push(format!("link child '{}' is unknown", link.child));
            }
        }
        for param in self.params.values() {
            if let Err(e) = param.check_value(&param.default) {
                if !param.required {
                    problems.push(format!("default of '{}' is invalid: {}", param.key, e.message));
                }
            }
        }
        problems
    }

    /// Fill defaults, check kinds and values, and require active required keys
    ///
    /// Unknown keys produce warnings. All problems are accumulated.
    #[must_use]
    pub fn bind(&self, args: &Arguments) -> Report<Arguments> {
        let mut report = Report::ok(());
        for key in args.keys() {
            if !self.params.contains_key(key) {
                report.push_warning(Warning::new(
                    ARG_UNKNOWN_KEY,
                    format!("argument '{key}' matches no parameter and was ignored"),
                ));
            }
        }

        let mut effective = self.default_arguments();
        for (key, value) in args.iter() {
            if self.params.contains_key(key) {
                effective.insert(key, value.clone());
            }
        }

        let mut bound = Arguments::new();
        for param in self.params.values() {
            let active = self.is_active(&param.key, &effective);
            match args.value(&param.key) {
                Some(value) => {
                    if active {
                        if let Err(e) = param.check_value(value) {
                            report.push_error(e);
                        }
                    } else if !param.kind.accepts(value) {
                        report.push_error(Error::argument(
                            ARG_KIND_MISMATCH,
                            format!("'{}' expects a {}", param.label, param.kind.name()),
                        ));
                    }
                    bound.insert(param.key.clone(), value.clone());
                }
                None if param.required && active => {
                    report.push_error(Error::argument(
                        ARG_MISSING,
                        format!("missing required argument '{}' ({})", param.key, param.label),
                    ));
                }
                None => {
                    bound.insert(param.key.clone(), param.default.clone());
                }
            }
        }
        report.map(|()| bound)
    }

    /// Check selections and creations against `data`, skipping inactive keys
    ///
    /// Assumes `args` came out of [`Parameters::bind`].
    #[must_use]
    pub fn validate_against(&self, args: &Arguments, data: &DataStructure) -> Report {
        self.validate_tree(args, data, true)
    }

    /// Like [`Parameters::validate_against`] but ignores creation paths and
    /// consumed selections
    ///
    /// Used before execute, when the creating actions have already run.
    #[must_use]
    pub fn validate_selections(&self, args: &Arguments, data: &DataStructure) -> Report {
        self.validate_tree(args, data, false)
    }

    fn validate_tree(&self, args: &Arguments, data: &DataStructure, creations: bool) -> Report {
        let mut report = Report::ok(());
        for param in self.params.values() {
            if !self.is_active(&param.key, args) {
                continue;
            }
            if !creations
                && (param.consumed
                    || matches!(
                        param.kind,
                        ParameterKind::DataGroupCreation | ParameterKind::ArrayCreation
                    ))
            {
                continue;
            }
            let Some(value) = args.value(&param.key) else {
                continue;
            };
            if let Err(e) = validate_selection(param, value, data) {
                report.push_error(e);
            }
        }
        report
    }
}

fn labelled(param: &Parameter, err: DataError) -> Error {
    let mut error = Error::from(err);
    error.message = format!("{}: {}", param.label, error.message);
    error
}

fn require_kind(
    param: &Parameter,
    data: &DataStructure,
    path: &DataPath,
    accept: impl Fn(ObjectKind) -> bool,
    expected: ObjectKind,
) -> Result<(), Error> {
    let actual = data.kind_of(path).map_err(|e| labelled(param, e))?;
    if accept(actual) {
        Ok(())
    } else {
        Err(labelled(
            param,
            DataError::WrongObjectKind {
                path: path.clone(),
                expected,
                actual,
            },
        ))
    }
}

fn validate_selection(param: &Parameter, value: &ArgValue, data: &DataStructure) -> Result<(), Error> {
    match (&param.kind, value) {
        (
            ParameterKind::ArraySelection {
                allowed_types,
                allowed_component_shapes,
            },
            ArgValue::Path(path),
        ) => {
            let array = data.any_array(path).map_err(|e| labelled(param, e))?;
            if !allowed_types.is_empty() && !allowed_types.contains(&array.data_type()) {
                return Err(Error::structural(
                    ARG_DISALLOWED_TYPE,
                    format!(
                        "{}: '{path}' is {}, allowed: {}",
                        param.label,
                        array.data_type(),
                        join_types(allowed_types)
                    ),
                ));
            }
            if !allowed_component_shapes.is_empty()
                && !allowed_component_shapes
                    .iter()
                    .any(|s| s.as_slice() == array.component_shape())
            {
                return Err(Error::structural(
                    ARG_DISALLOWED_COMPONENTS,
                    format!(
                        "{}: '{path}' has component shape {:?}, allowed: {allowed_component_shapes:?}",
                        param.label,
                        array.component_shape()
                    ),
                ));
            }
            Ok(())
        }
        (ParameterKind::NeighborListSelection { allowed_types }, ArgValue::Path(path)) => {
            let list = data.any_neighbor_list(path).map_err(|e| labelled(param, e))?;
            if !allowed_types.is_empty() && !allowed_types.contains(&list.data_type()) {
                return Err(Error::structural(
                    ARG_DISALLOWED_TYPE,
                    format!(
                        "{}: '{path}' is {}, allowed: {}",
                        param.label,
                        list.data_type(),
                        join_types(allowed_types)
                    ),
                ));
            }
            Ok(())
        }
        (ParameterKind::DataGroupSelection, ArgValue::Path(path)) => require_kind(
            param,
            data,
            path,
            |k| k == ObjectKind::DataGroup || k.is_geometry(),
            ObjectKind::DataGroup,
        ),
        (ParameterKind::AttributeMatrixSelection, ArgValue::Path(path)) => require_kind(
            param,
            data,
            path,
            |k| k == ObjectKind::AttributeMatrix,
            ObjectKind::AttributeMatrix,
        ),
        (ParameterKind::GeometrySelection, ArgValue::Path(path)) => {
            data.geometry(path).map(|_| ()).map_err(|e| labelled(param, e))
        }
        (ParameterKind::DataObjectSelection, ArgValue::Path(path)) => {
            data.resolve(path).map(|_| ()).map_err(|e| labelled(param, e))
        }
        (ParameterKind::MultiObjectSelection, ArgValue::Paths(paths)) => {
            for path in paths {
                data.resolve(path).map_err(|e| labelled(param, e))?;
            }
            Ok(())
        }
        (ParameterKind::DataGroupCreation | ParameterKind::ArrayCreation, ArgValue::Path(path)) => {
            if data.contains(path) {
                let (parent, name) = (
                    path.parent().unwrap_or_default(),
                    path.name().unwrap_or_default().to_string(),
                );
                return Err(labelled(param, DataError::NameCollision { parent, name }));
            }
            Ok(())
        }
        _ => Ok(()),
    }
}

fn join_types(types: &[DataType]) -> String {
    types
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_data::{AnyArray, ObjectBody};

    fn p(s: &str) -> DataPath {
        s.parse().unwrap()
    }

    fn schema() -> Parameters {
        let mut params = Parameters::new();
        params
            .insert_separator("Input Parameters")
            .insert_linkable(Parameter::bool("compute_avg", "Compute Average", "", true))
            .insert(
                Parameter::uint("count", "Count", "", 3).with_range(Some(1.0), Some(10.0)),
            )
            .insert(Parameter::choices("mode", "Mode", "", 0, &["a", "b"]))
            .insert_separator("Input Data")
            .insert(Parameter::array_selection(
                "quats",
                "Quaternions",
                "",
                p("DC/AM/Quats"),
                &[DataType::Float32],
                &[&[4]],
            ))
            .insert(Parameter::data_object_name("avg_name", "Average Name", "", "Avg"))
            .link("compute_avg", "avg_name", true);
        params
    }

    fn tree() -> DataStructure {
        let mut ds = DataStructure::new();
        ds.create(&p("DC"), ObjectBody::Group).unwrap();
        ds.create(&p("DC/AM"), ObjectBody::AttributeMatrix { tuple_shape: vec![2] })
            .unwrap();
        ds.create(
            &p("DC/AM/Quats"),
            ObjectBody::Array(AnyArray::new(DataType::Float32, vec![2], vec![4], true).unwrap()),
        )
        .unwrap();
        ds.create(
            &p("DC/AM/Phases"),
            ObjectBody::Array(AnyArray::new(DataType::Int32, vec![2], vec![1], true).unwrap()),
        )
        .unwrap();
        ds
    }

    #[test]
    fn layout_keeps_separators() {
        let params = schema();
        assert_eq!(params.len(), 5);
        assert_eq!(params.layout()[0], LayoutItem::Separator("Input Parameters".into()));
        assert!(params.schema_problems().is_empty());
    }

    #[test]
    fn bind_fills_defaults_and_requires_selections() {
        let params = schema();
        let report = params.bind(&Arguments::new());
        assert!(!report.is_valid());
        assert!(report.has_error_code(ARG_MISSING));

        let args = Arguments::new().with("quats", p("DC/AM/Quats"));
        let bound = params.bind(&args).into_result().unwrap();
        assert_eq!(bound.get::<u64>("count").unwrap(), 3);
        assert_eq!(bound.get::<String>("avg_name").unwrap(), "Avg");
    }

    #[test]
    fn bind_reports_every_problem() {
        let params = schema();
        let args = Arguments::new()
            .with("quats", p("DC/AM/Quats"))
            .with("count", 11u64)
            .with("mode", ArgValue::Choice(5))
            .with("compute_avg", "yes")
            .with("extra", 1i64);
        let report = params.bind(&args);
        assert!(report.has_error_code(ARG_OUT_OF_RANGE));
        assert!(report.has_error_code(ARG_INVALID_CHOICE));
        assert!(report.has_error_code(ARG_KIND_MISMATCH));
        assert!(report.has_warning_code(ARG_UNKNOWN_KEY));
    }

    #[test]
    fn tuple_shapes_must_be_non_empty_and_addressable() {
        let mut params = Parameters::new();
        params.insert(Parameter::tuple_shape("dims", "Dims", "", vec![1]));
        let huge = 1_usize << 40;
        let report = params.bind(&Arguments::new().with("dims", vec![huge, huge]));
        assert!(report.has_error_code(ARG_SHAPE_OVERFLOW));
        let report = params.bind(&Arguments::new().with("dims", Vec::<usize>::new()));
        assert!(report.has_error_code(ARG_EMPTY_SHAPE));
        assert!(params.bind(&Arguments::new().with("dims", vec![huge])).is_valid());
        assert_eq!(checked_element_count("x", &[huge], &[4]).unwrap(), huge * 4);
    }

    #[test]
    fn inactive_children_are_not_checked() {
        let params = schema();
        let args = Arguments::new()
            .with("quats", p("DC/AM/Quats"))
            .with("compute_avg", false)
            .with("avg_name", "bad/name");
        assert!(params.bind(&args).is_valid());
        assert!(!params.is_active("avg_name", &args));

        let args = args.with("compute_avg", true);
        assert!(params.bind(&args).has_error_code(ARG_INVALID_NAME));
    }

    #[test]
    fn validate_against_missing_path_is_structural() {
        let params = schema();
        let args = params
            .bind(&Arguments::new().with("quats", p("DC/AM/Nope")))
            .into_result()
            .unwrap();
        let report = params.validate_against(&args, &tree());
        assert_eq!(report.errors().len(), 1);
        let err = &report.errors()[0];
        assert_eq!(err.kind, crate::report::ErrorKind::Structural);
        assert!(err.message.contains("DC/AM/Nope"));
    }

    #[test]
    fn validate_against_checks_type_and_components() {
        let params = schema();
        let args = params
            .bind(&Arguments::new().with("quats", p("DC/AM/Phases")))
            .into_result()
            .unwrap();
        let report = params.validate_against(&args, &tree());
        assert!(report.has_error_code(ARG_DISALLOWED_TYPE));

        let ok = params
            .bind(&Arguments::new().with("quats", p("DC/AM/Quats")))
            .into_result()
            .unwrap();
        assert!(params.validate_against(&ok, &tree()).is_valid());
    }

    #[test]
    fn creation_path_must_not_exist() {
        let mut params = Parameters::new();
        params.insert(Parameter::array_creation("out", "Output", "", p("DC/AM/Quats")));
        let args = params
            .bind(&Arguments::new().with("out", p("DC/AM/Quats")))
            .into_result()
            .unwrap();
        let report = params.validate_against(&args, &tree());
        assert!(report.has_error_code(-102));
        assert!(params.validate_selections(&args, &tree()).is_valid());
    }

    #[test]
    fn schema_problems_detects_bad_links() {
        let mut params = Parameters::new();
        params
            .insert(Parameter::uint("n", "N", "", 1))
            .link("n", "missing", true);
        assert_eq!(params.schema_problems().len(), 3);
    }
}
