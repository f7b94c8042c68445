//! Element kinds and the sealed [`Element`] trait

use crate::array::{AnyArray, AnyList};
use crate::store::{DataStore, ListStore};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Debug, Display, Formatter};
use std::str::FromStr;

/// Primitive element kind of an array or neighbor list
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DataType {
    Int8,
    UInt8,
    Int16,
    UInt16,
    Int32,
    UInt32,
    Int64,
    UInt64,
    Float32,
    Float64,
    /// Stored as a one-byte kind
    Boolean,
}

impl DataType {
    /// Every kind, in declaration order
    pub const ALL: [Self; 11] = [
        Self::Int8,
        Self::UInt8,
        Self::Int16,
        Self::UInt16,
        Self::Int32,
        Self::UInt32,
        Self::Int64,
        Self::UInt64,
        Self::Float32,
        Self::Float64,
        Self::Boolean,
    ];

    /// Lowercase canonical name
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Int8 => "int8",
            Self::UInt8 => "uint8",
            Self::Int16 => "int16",
            Self::UInt16 => "uint16",
            Self::Int32 => "int32",
            Self::UInt32 => "uint32",
            Self::Int64 => "int64",
            Self::UInt64 => "uint64",
            Self::Float32 => "float32",
            Self::Float64 => "float64",
            Self::Boolean => "boolean",
        }
    }

    /// Size of one element in bytes
    #[must_use]
    pub const fn size_of(self) -> usize {
        match self {
            Self::Int8 | Self::UInt8 | Self::Boolean => 1,
            Self::Int16 | Self::UInt16 => 2,
            Self::Int32 | Self::UInt32 | Self::Float32 => 4,
            Self::Int64 | Self::UInt64 | Self::Float64 => 8,
        }
    }

    /// True for `float32` and `float64`
    #[inline]
    #[must_use]
    pub const fn is_float(self) -> bool {
        matches!(self, Self::Float32 | Self::Float64)
    }

    /// Position in [`DataType::ALL`], used as the legacy numeric choice index
    #[must_use]
    pub fn index(self) -> usize {
        Self::ALL.iter().position(|t| *t == self).unwrap_or(0)
    }

    /// Kind at the given legacy choice index
    #[must_use]
    pub fn from_index(index: usize) -> Option<Self> {
        Self::ALL.get(index).copied()
    }
}

impl Display for DataType {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for DataType {
    type Err = UnknownDataType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .iter()
            .copied()
            .find(|t| t.as_str().eq_ignore_ascii_case(s))
            .or_else(|| match s.to_ascii_lowercase().as_str() {
                "bool" => Some(Self::Boolean),
                "f32" | "float" => Some(Self::Float32),
                "f64" | "double" => Some(Self::Float64),
                _ => None,
            })
            .ok_or_else(|| UnknownDataType(s.to_string()))
    }
}

/// Unrecognized element kind name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown data type '{0}'")]
pub struct UnknownDataType(pub String);

pub(crate) mod private {
    pub trait Sealed {}
}

/// Rust element type bound to exactly one [`DataType`]
///
/// Sealed: only the eleven primitive kinds implement it.
pub trait Element:
    private::Sealed + Copy + Default + PartialEq + Debug + Send + Sync + 'static
{
    /// Kind tag for this element type
    const DATA_TYPE: DataType;

    /// Parse a textual value (fill values, table cells)
    fn parse_value(text: &str) -> Option<Self>;

    /// Lossy conversion for display and statistics
    fn to_f64(self) -> f64;

    #[doc(hidden)]
    fn array_ref(any: &AnyArray) -> Option<&DataStore<Self>>;
    #[doc(hidden)]
    fn array_mut(any: &mut AnyArray) -> Option<&mut DataStore<Self>>;
    #[doc(hidden)]
    fn wrap_array(store: DataStore<Self>) -> AnyArray;
    #[doc(hidden)]
    fn list_ref(any: &AnyList) -> Option<&ListStore<Self>>;
    #[doc(hidden)]
    fn list_mut(any: &mut AnyList) -> Option<&mut ListStore<Self>>;
    #[doc(hidden)]
    fn wrap_list(store: ListStore<Self>) -> AnyList;
}

macro_rules! impl_element {
    ($ty:ty, $variant:ident, |$v:ident| $to_f64:expr, |$s:ident| $parse:expr) => {
        impl private::Sealed for $ty {}

        impl Element for $ty {
            const DATA_TYPE: DataType = DataType::$variant;

            fn parse_value($s: &str) -> Option<Self> {
                $parse
            }

            #[allow(
                clippy::cast_precision_loss,
                clippy::cast_lossless,
                clippy::unnecessary_cast
            )]
            fn to_f64(self) -> f64 {
                let $v = self;
                $to_f64
            }

            fn array_ref(any: &AnyArray) -> Option<&DataStore<Self>> {
                match any {
                    AnyArray::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn array_mut(any: &mut AnyArray) -> Option<&mut DataStore<Self>> {
                match any {
                    AnyArray::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn wrap_array(store: DataStore<Self>) -> AnyArray {
                AnyArray::$variant(store)
            }

            fn list_ref(any: &AnyList) -> Option<&ListStore<Self>> {
                match any {
                    AnyList::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn list_mut(any: &mut AnyList) -> Option<&mut ListStore<Self>> {
                match any {
                    AnyList::$variant(s) => Some(s),
                    _ => None,
                }
            }

            fn wrap_list(store: ListStore<Self>) -> AnyList {
                AnyList::$variant(store)
            }
        }
    };
    ($ty:ty, $variant:ident) => {
        impl_element!($ty, $variant, |v| v as f64, |s| s.trim().parse().ok());
    };
}

impl_element!(i8, Int8);
impl_element!(u8, UInt8);
impl_element!(i16, Int16);
impl_element!(u16, UInt16);
impl_element!(i32, Int32);
impl_element!(u32, UInt32);
impl_element!(i64, Int64);
impl_element!(u64, UInt64);
impl_element!(f32, Float32);
impl_element!(f64, Float64);
impl_element!(
    bool,
    Boolean,
    |v| if v { 1.0 } else { 0.0 },
    |s| match s.trim().to_ascii_lowercase().as_str() {
        "true" | "1" => Some(true),
        "false" | "0" => Some(false),
        _ => None,
    }
);
