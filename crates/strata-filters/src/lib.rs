//! Strata Filters - Built-in Filters
//!
//! Structural editing filters and one analysis filter, all implemented against
//! the [`strata_core::Filter`] contract.
//!
//! # Core Concepts
//!
//! - Creation: [`CreateDataGroup`], [`CreateAttributeMatrix`], [`CreateDataArray`],
//!   [`CreateImageGeometry`]
//! - Editing: [`RenameDataObject`], [`MoveData`], [`DeleteData`],
//!   [`ResizeAttributeMatrix`]
//! - Analysis: [`ComputeMisorientations`] over [`orientation`] symmetry tables
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_core::prelude::*;
//!
//! let registry = strata_filters::builtin_registry()?;
//! let filter = registry.create(&strata_filters::CreateDataGroup::UUID)?;
//! let args = Arguments::new().with("data_object_path", DataPath::single("DataContainer"));
//! let report = filter.run(&mut DataStructure::new(), &args, &RunContext::new());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod compute_misorientations;
pub mod create_attribute_matrix;
pub mod create_data_array;
pub mod create_data_group;
pub mod create_image_geometry;
pub mod delete_data;
pub mod move_data;
pub mod orientation;
pub mod rename_data_object;
pub mod resize_attribute_matrix;

pub use compute_misorientations::ComputeMisorientations;
pub use create_attribute_matrix::CreateAttributeMatrix;
pub use create_data_array::CreateDataArray;
pub use create_data_group::CreateDataGroup;
pub use create_image_geometry::CreateImageGeometry;
pub use delete_data::DeleteData;
pub use move_data::MoveData;
pub use rename_data_object::RenameDataObject;
pub use resize_attribute_matrix::ResizeAttributeMatrix;

use strata_core::{Filter, FilterFactory, FilterRegistry, RegistryError};

/// Factories for every built-in filter, in registration order
pub const BUILTIN_FILTERS: &[FilterFactory] = &[
    || -> Box<dyn Filter> { Box::new(CreateDataGroup) },
    || -> Box<dyn Filter> { Box::new(CreateAttributeMatrix) },
    || -> Box<dyn Filter> { Box::new(CreateDataArray) },
    || -> Box<dyn Filter> { Box::new(CreateImageGeometry) },
    || -> Box<dyn Filter> { Box::new(RenameDataObject) },
    || -> Box<dyn Filter> { Box::new(MoveData) },
    || -> Box<dyn Filter> { Box::new(DeleteData) },
    || -> Box<dyn Filter> { Box::new(ResizeAttributeMatrix) },
    || -> Box<dyn Filter> { Box::new(ComputeMisorientations) },
];

/// Add the built-in filters to `registry`
///
/// # Errors
/// [`RegistryError`] when one of them is already registered.
pub fn register_builtin(registry: &mut FilterRegistry) -> Result<(), RegistryError> {
    for factory in BUILTIN_FILTERS {
        registry.register(*factory)?;
    }
    tracing::debug!(count = BUILTIN_FILTERS.len(), "registered built-in filters");
    Ok(())
}

/// A registry holding only the built-in filters
///
/// # Errors
/// Never in practice; propagates [`register_builtin`].
pub fn builtin_registry() -> Result<FilterRegistry, RegistryError> {
    let mut registry = FilterRegistry::new();
    register_builtin(&mut registry)?;
    Ok(registry)
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn builtin_registry_has_every_filter() {
        let registry = builtin_registry().unwrap();
        assert_eq!(registry.len(), BUILTIN_FILTERS.len());
        assert!(registry.contains(&ComputeMisorientations::UUID));
        assert_eq!(
            registry.create_by_name("DeleteData").unwrap().uuid(),
            DeleteData::UUID
        );
    }

    #[test]
    fn registering_twice_fails() {
        let mut registry = builtin_registry().unwrap();
        assert!(matches!(
            register_builtin(&mut registry),
            Err(RegistryError::Duplicate { .. })
        ));
    }

    #[test]
    fn schemas_are_consistent() {
        let mut seen = HashSet::new();
        for factory in BUILTIN_FILTERS {
            let filter = factory();
            assert!(seen.insert(filter.uuid()), "duplicate uuid {}", filter.uuid());
            let problems = filter.parameters().schema_problems();
            assert!(problems.is_empty(), "{}: {problems:?}", filter.name());
        }
    }
}
