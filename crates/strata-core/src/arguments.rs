//! Argument values bound to a filter's parameters

use crate::report::Error;
use indexmap::IndexMap;
use serde::{Deserialize, Serialize};
use strata_data::{DataPath, DataType};

/// Argument key is absent
pub const ARG_MISSING: i32 = -201;
/// Argument has the wrong kind of value
pub const ARG_KIND_MISMATCH: i32 = -202;

/// One argument value
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "snake_case")]
pub enum ArgValue {
    Bool(bool),
    Int(i64),
    #[serde(rename = "uint")]
    UInt(u64),
    Float(f64),
    String(String),
    Path(DataPath),
    Paths(Vec<DataPath>),
    /// Tuple dimensions, slowest first
    Shape(Vec<usize>),
    FloatVec(Vec<f64>),
    #[serde(rename = "uint_vec")]
    UIntVec(Vec<u64>),
    DataType(DataType),
    /// Index into a choices list
    Choice(usize),
}

impl ArgValue {
    /// Short kind name used in messages
    #[must_use]
    pub const fn kind_name(&self) -> &'static str {
        match self {
            Self::Bool(_) => "bool",
            Self::Int(_) => "int",
            Self::UInt(_) => "uint",
            Self::Float(_) => "float",
            Self::String(_) => "string",
            Self::Path(_) => "path",
            Self::Paths(_) => "paths",
            Self::Shape(_) => "shape",
            Self::FloatVec(_) => "float_vec",
            Self::UIntVec(_) => "uint_vec",
            Self::DataType(_) => "data_type",
            Self::Choice(_) => "choice",
        }
    }
}

macro_rules! arg_from {
    ($($ty:ty => $variant:ident),* $(,)?) => {
        $(
            impl From<$ty> for ArgValue {
                fn from(value: $ty) -> Self {
                    Self::$variant(value.into())
                }
            }
        )*
    };
}

arg_from! {
    bool => Bool,
    i64 => Int,
    i32 => Int,
    u64 => UInt,
    u32 => UInt,
    f64 => Float,
    f32 => Float,
    String => String,
    DataPath => Path,
    Vec<DataPath> => Paths,
    Vec<usize> => Shape,
    Vec<f64> => FloatVec,
    Vec<u64> => UIntVec,
    DataType => DataType,
}

impl From<&str> for ArgValue {
    fn from(value: &str) -> Self {
        Self::String(value.to_string())
    }
}

/// Typed extraction from an [`ArgValue`]
pub trait FromArgValue: Sized {
    /// Kind name reported when extraction fails
    const EXPECTED: &'static str;

    fn from_arg(value: &ArgValue) -> Option<Self>;
}

impl FromArgValue for bool {
    const EXPECTED: &'static str = "bool";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Bool(b) => Some(*b),
            _ => None,
        }
    }
}

impl FromArgValue for i64 {
    const EXPECTED: &'static str = "int";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Int(v) => Some(*v),
            ArgValue::UInt(v) => i64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromArgValue for i32 {
    const EXPECTED: &'static str = "int";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        i64::from_arg(value).and_then(|v| i32::try_from(v).ok())
    }
}

impl FromArgValue for u64 {
    const EXPECTED: &'static str = "uint";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::UInt(v) => Some(*v),
            ArgValue::Int(v) => u64::try_from(*v).ok(),
            _ => None,
        }
    }
}

impl FromArgValue for usize {
    const EXPECTED: &'static str = "uint";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Choice(v) => Some(*v),
            other => u64::from_arg(other).and_then(|v| usize::try_from(v).ok()),
        }
    }
}

impl FromArgValue for f64 {
    const EXPECTED: &'static str = "float";

    #[allow(clippy::cast_precision_loss)]
    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Float(v) => Some(*v),
            ArgValue::Int(v) => Some(*v as f64),
            ArgValue::UInt(v) => Some(*v as f64),
            _ => None,
        }
    }
}

impl FromArgValue for f32 {
    const EXPECTED: &'static str = "float";

    #[allow(clippy::cast_possible_truncation)]
    fn from_arg(value: &ArgValue) -> Option<Self> {
        f64::from_arg(value).map(|v| v as f32)
    }
}

impl FromArgValue for String {
    const EXPECTED: &'static str = "string";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::String(s) => Some(s.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for DataPath {
    const EXPECTED: &'static str = "path";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Path(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<DataPath> {
    const EXPECTED: &'static str = "paths";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Paths(p) => Some(p.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<usize> {
    const EXPECTED: &'static str = "shape";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::Shape(s) => Some(s.clone()),
            ArgValue::UIntVec(v) => v.iter().map(|x| usize::try_from(*x).ok()).collect(),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<f64> {
    const EXPECTED: &'static str = "float_vec";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::FloatVec(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for Vec<u64> {
    const EXPECTED: &'static str = "uint_vec";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::UIntVec(v) => Some(v.clone()),
            _ => None,
        }
    }
}

impl FromArgValue for [f32; 3] {
    const EXPECTED: &'static str = "float_vec[3]";

    #[allow(clippy::cast_possible_truncation)]
    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::FloatVec(v) if v.len() == 3 => Some([v[0] as f32, v[1] as f32, v[2] as f32]),
            _ => None,
        }
    }
}

impl FromArgValue for [usize; 3] {
    const EXPECTED: &'static str = "uint_vec[3]";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::UIntVec(v) if v.len() == 3 => Some([
                usize::try_from(v[0]).ok()?,
                usize::try_from(v[1]).ok()?,
                usize::try_from(v[2]).ok()?,
            ]),
            _ => None,
        }
    }
}

impl FromArgValue for DataType {
    const EXPECTED: &'static str = "data_type";

    fn from_arg(value: &ArgValue) -> Option<Self> {
        match value {
            ArgValue::DataType(t) => Some(*t),
            _ => None,
        }
    }
}

/// Ordered key → value map handed to preflight and execute
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Arguments {
    values: IndexMap<String, ArgValue>,
}

impl Arguments {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set a value (builder style)
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Self {
        self.insert(key, value);
        self
    }

    /// Set a value, returning the previous one
    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<ArgValue>) -> Option<ArgValue> {
        self.values.insert(key.into(), value.into())
    }

    #[must_use]
    pub fn value(&self, key: &str) -> Option<&ArgValue> {
        self.values.get(key)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn remove(&mut self, key: &str) -> Option<ArgValue> {
        self.values.shift_remove(key)
    }

    /// Typed value for `key`
    ///
    /// # Errors
    /// Argument error when the key is missing or holds another kind.
    pub fn get<T: FromArgValue>(&self, key: &str) -> Result<T, Error> {
        let value = self
            .values
            .get(key)
            .ok_or_else(|| Error::argument(ARG_MISSING, format!("missing argument '{key}'")))?;
        T::from_arg(value).ok_or_else(|| {
            Error::argument(
                ARG_KIND_MISMATCH,
                format!(
                    "argument '{key}' is a {}, expected {}",
                    value.kind_name(),
                    T::EXPECTED
                ),
            )
        })
    }

    /// Typed value or `None` when absent
    ///
    /// # Errors
    /// Argument error when present with another kind.
    pub fn get_opt<T: FromArgValue>(&self, key: &str) -> Result<Option<T>, Error> {
        if self.contains(key) {
            self.get(key).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Overlay `other` onto `self`; keys in `other` win
    pub fn merge(&mut self, other: Self) {
        for (key, value) in other.values {
            self.values.insert(key, value);
        }
    }

    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &ArgValue)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

impl<K: Into<String>, V: Into<ArgValue>> FromIterator<(K, V)> for Arguments {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut args = Self::new();
        for (k, v) in iter {
            args.insert(k, v);
        }
        args
    }
}

/// Arguments tagged with the parameter schema version they were written for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct VersionedArguments {
    pub version: u32,
    pub arguments: Arguments,
}
