//! Filter registry
//!
//! Provides [`FilterRegistry`], mapping stable filter UUIDs to factories.

use crate::filter::Filter;
use indexmap::IndexMap;
use thiserror::Error;
use uuid::Uuid;

/// Builds a fresh filter instance
pub type FilterFactory = fn() -> Box<dyn Filter>;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RegistryError {
    #[error("filter {uuid} is already registered as '{name}'")]
    Duplicate { uuid: Uuid, name: String },
    #[error("filter name '{0}' is already registered")]
    DuplicateName(String),
    #[error("no filter registered with uuid {0}")]
    UnknownUuid(Uuid),
    #[error("no filter registered with name '{0}'")]
    UnknownName(String),
}

struct Entry {
    name: &'static str,
    human_name: &'static str,
    factory: FilterFactory,
}

/// Summary of a registered filter
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct FilterInfo {
    pub uuid: Uuid,
    pub name: &'static str,
    pub human_name: &'static str,
}

/// Registry of available filters, in registration order
#[derive(Default)]
pub struct FilterRegistry {
    by_uuid: IndexMap<Uuid, Entry>,
    by_name: IndexMap<&'static str, Uuid>,
}

impl std::fmt::Debug for FilterRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_list().entries(self.by_name.keys()).finish()
    }
}

impl FilterRegistry {
    /// Create new empty registry
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a factory under the uuid and name of the filter it builds
    ///
    /// # Errors
    /// [`RegistryError`] when the uuid or name is taken.
    pub fn register(&mut self, factory: FilterFactory) -> Result<(), RegistryError> {
        let probe = factory();
        let (uuid, name) = (probe.uuid(), probe.name());
        if let Some(existing) = self.by_uuid.get(&uuid) {
            return Err(RegistryError::Duplicate {
                uuid,
                name: existing.name.to_string(),
            });
        }
        if self.by_name.contains_key(name) {
            return Err(RegistryError::DuplicateName(name.to_string()));
        }
        tracing::debug!(%uuid, name, "registered filter");
        self.by_name.insert(name, uuid);
        self.by_uuid.insert(
            uuid,
            Entry {
                name,
                human_name: probe.human_name(),
                factory,
            },
        );
        Ok(())
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, uuid: &Uuid) -> bool {
        self.by_uuid.contains_key(uuid)
    }

    #[must_use]
    pub fn uuid_of(&self, name: &str) -> Option<Uuid> {
        self.by_name.get(name).copied()
    }

    /// New instance of the filter registered under `uuid`
    ///
    /// # Errors
    /// [`RegistryError::UnknownUuid`]
    pub fn create(&self, uuid: &Uuid) -> Result<Box<dyn Filter>, RegistryError> {
        self.by_uuid
            .get(uuid)
            .map(|entry| (entry.factory)())
            .ok_or(RegistryError::UnknownUuid(*uuid))
    }

    /// New instance of the filter registered under `name`
    ///
    /// # Errors
    /// [`RegistryError::UnknownName`]
    pub fn create_by_name(&self, name: &str) -> Result<Box<dyn Filter>, RegistryError> {
        let uuid = self
            .uuid_of(name)
            .ok_or_else(|| RegistryError::UnknownName(name.to_string()))?;
        self.create(&uuid)
    }

    /// Registered filters in registration order
    pub fn iter(&self) -> impl Iterator<Item = FilterInfo> + '_ {
        self.by_uuid.iter().map(|(uuid, entry)| FilterInfo {
            uuid: *uuid,
            name: entry.name,
            human_name: entry.human_name,
        })
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.by_uuid.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_uuid.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::arguments::Arguments;
    use crate::filter::PreflightResult;
    use crate::parameter::Parameters;
    use crate::progress::RunContext;
    use crate::report::{Completion, Report};
    use strata_data::DataStructure;

    macro_rules! noop_filter {
        ($ty:ident, $name:literal, $uuid:literal) => {
            #[derive(Debug, Clone)]
            struct $ty;

            impl Filter for $ty {
                fn name(&self) -> &'static str {
                    $name
                }
                fn uuid(&self) -> Uuid {
                    Uuid::from_u128($uuid)
                }
                fn human_name(&self) -> &'static str {
                    $name
                }
                fn parameters(&self) -> Parameters {
                    Parameters::new()
                }
                fn clone_box(&self) -> Box<dyn Filter> {
                    Box::new(self.clone())
                }
                fn preflight_impl(&self, _: &DataStructure, _: &Arguments, _: &RunContext) -> PreflightResult {
                    PreflightResult::ok(Default::default())
                }
                fn execute_impl(&self, _: &mut DataStructure, _: &Arguments, _: &RunContext) -> Report<Completion> {
                    Report::ok(Completion::Finished)
                }
            }
        };
    }

    noop_filter!(Alpha, "Alpha", 0xa);
    noop_filter!(Beta, "Beta", 0xb);
    noop_filter!(AlphaAgain, "Alpha", 0xc);

    #[test]
    fn registry_new_empty() {
        let registry = FilterRegistry::new();
        assert!(registry.is_empty());
        assert_eq!(registry.len(), 0);
    }

    #[test]
    fn registry_register_and_create() {
        let mut registry = FilterRegistry::new();
        registry.register(|| Box::new(Alpha)).unwrap();
        registry.register(|| Box::new(Beta)).unwrap();
        assert_eq!(registry.len(), 2);
        assert_eq!(registry.create(&Uuid::from_u128(0xb)).unwrap().name(), "Beta");
        assert_eq!(registry.create_by_name("Alpha").unwrap().uuid(), Uuid::from_u128(0xa));
        let names: Vec<_> = registry.iter().map(|info| info.name).collect();
        assert_eq!(names, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn registry_rejects_duplicates() {
        let mut registry = FilterRegistry::new();
        registry.register(|| Box::new(Alpha)).unwrap();
        assert!(matches!(
            registry.register(|| Box::new(Alpha)),
            Err(RegistryError::Duplicate { .. })
        ));
        assert_eq!(
            registry.register(|| Box::new(AlphaAgain)),
            Err(RegistryError::DuplicateName("Alpha".into()))
        );
    }

    #[test]
    fn registry_unknown_lookups() {
        let registry = FilterRegistry::new();
        assert!(matches!(
            registry.create(&Uuid::nil()),
            Err(RegistryError::UnknownUuid(_))
        ));
        assert!(matches!(
            registry.create_by_name("Nope"),
            Err(RegistryError::UnknownName(_))
        ));
    }
}
