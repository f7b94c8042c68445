//! Strata Data
//!
//! Typed, hierarchical storage for scientific datasets.
//!
//! # Core Concepts
//!
//! - [`DataStructure`]: arena of objects addressed by [`DataPath`]
//! - [`DataStore<T>`]: tuple-major buffer with a tuple shape and a component shape
//! - [`ListStore<T>`]: one variable-length list per tuple (neighbor lists)
//! - [`AnyArray`] / [`AnyList`]: type-erased stores dispatching over [`DataType`]
//! - [`DataError`]: structural errors with stable codes
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_data::{AnyArray, DataPath, DataStructure, DataType, ObjectBody};
//!
//! let mut ds = DataStructure::new();
//! ds.create(&"Image".parse()?, ObjectBody::Group)?;
//! ds.create(
//!     &"Image/Cell Data".parse()?,
//!     ObjectBody::AttributeMatrix { tuple_shape: vec![10] },
//! )?;
//! let quats = AnyArray::new(DataType::Float32, vec![10], vec![4], true)?;
//! ds.create(&"Image/Cell Data/Quats".parse()?, ObjectBody::Array(quats))?;
//!
//! let store = ds.array::<f32>(&"Image/Cell Data/Quats".parse()?)?;
//! assert_eq!(store.number_of_components(), 4);
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod array;
mod data_type;
mod error;
mod object;
mod path;
mod store;
mod structure;

pub use array::{AnyArray, AnyList};
pub use data_type::{DataType, Element, UnknownDataType};
pub use error::{validate_name, DataError};
pub use object::{DataId, DataObject, Geometry, ObjectBody, ObjectKind};
pub use path::{DataPath, SEPARATOR};
pub use store::{
    checked_shape_product, element_count, shape_product, DataStore, ListStore, StoreError,
};
pub use structure::DataStructure;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
