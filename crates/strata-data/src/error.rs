//! Structural errors raised by the data structure
//!
//! Every variant carries a stable negative code so that callers can match on
//! it after conversion into an accumulated diagnostic.

use crate::data_type::DataType;
use crate::object::ObjectKind;
use crate::path::DataPath;
use crate::store::StoreError;

/// Structural error on a [`DataStructure`](crate::DataStructure)
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum DataError {
    /// No object at the path
    #[error("object not found at '{0}'")]
    PathNotFound(DataPath),

    /// Parent of the target path does not exist
    #[error("parent '{parent}' of '{path}' does not exist")]
    ParentNotFound { path: DataPath, parent: DataPath },

    /// A sibling already has this name
    #[error("an object named '{name}' already exists under '{parent}'")]
    NameCollision { parent: DataPath, name: String },

    /// Name is empty, whitespace only or contains the separator
    #[error("invalid object name '{0}'")]
    InvalidName(String),

    /// Parent cannot hold children
    #[error("'{0}' is not a container")]
    NotAContainer(DataPath),

    /// Object exists but is of another kind
    #[error("'{path}' is a {actual}, expected {expected}")]
    WrongObjectKind {
        path: DataPath,
        expected: ObjectKind,
        actual: ObjectKind,
    },

    /// Array or list exists but holds another element kind
    #[error("'{path}' holds {actual} elements, requested {requested}")]
    TypeMismatch {
        path: DataPath,
        requested: DataType,
        actual: DataType,
    },

    /// Child tuple shape differs from its attribute matrix
    #[error("'{path}' has tuple shape {actual:?} but attribute matrix requires {expected:?}")]
    TupleShapeMismatch {
        path: DataPath,
        expected: Vec<usize>,
        actual: Vec<usize>,
    },

    /// Arrays compared for tuple consistency disagree
    #[error("tuple counts differ: {}", format_counts(.0))]
    TupleCountMismatch(Vec<(DataPath, usize)>),

    /// Move would make an object its own ancestor
    #[error("cannot move '{path}' into its own descendant '{new_parent}'")]
    CycleDetected { path: DataPath, new_parent: DataPath },

    /// Operation is not defined on the root
    #[error("operation not allowed on the root")]
    RootOperation,

    /// Element access failed
    #[error("'{path}': {source}")]
    Store {
        path: DataPath,
        #[source]
        source: StoreError,
    },

    /// Container does not accept this kind of child
    #[error("{parent_kind} '{parent}' cannot hold a {child}")]
    ChildKindNotAllowed {
        parent: DataPath,
        parent_kind: ObjectKind,
        child: ObjectKind,
    },

    /// Audit of the whole tree found a broken link
    #[error("inconsistent tree: {0}")]
    Inconsistent(String),

    /// Object exists but is not a geometry
    #[error("'{path}' is a {actual}, expected a geometry")]
    NotAGeometry { path: DataPath, actual: ObjectKind },

    /// Element matrix of a geometry cannot take this tuple shape
    #[error("'{path}' holds the elements of a {geometry} and cannot take tuple shape {shape:?}")]
    GeometryShapeMismatch {
        path: DataPath,
        geometry: ObjectKind,
        shape: Vec<usize>,
    },
}

impl DataError {
    /// Stable numeric code
    #[must_use]
    pub const fn code(&self) -> i32 {
        match self {
            Self::PathNotFound(_) => -100,
            Self::ParentNotFound { .. } => -101,
            Self::NameCollision { .. } => -102,
            Self::InvalidName(_) => -103,
            Self::NotAContainer(_) => -104,
            Self::WrongObjectKind { .. } => -105,
            Self::TypeMismatch { .. } => -106,
            Self::TupleShapeMismatch { .. } => -107,
            Self::TupleCountMismatch(_) => -108,
            Self::CycleDetected { .. } => -109,
            Self::RootOperation => -110,
            Self::Store { .. } => -111,
            Self::ChildKindNotAllowed { .. } => -112,
            Self::Inconsistent(_) => -113,
            Self::NotAGeometry { .. } => -114,
            Self::GeometryShapeMismatch { .. } => -115,
        }
    }

    /// Attach a path to a store error
    #[must_use]
    pub fn store(path: &DataPath, source: StoreError) -> Self {
        Self::Store {
            path: path.clone(),
            source,
        }
    }
}

fn format_counts(counts: &[(DataPath, usize)]) -> String {
    counts
        .iter()
        .map(|(path, n)| format!("'{path}' = {n}"))
        .collect::<Vec<_>>()
        .join(", ")
}

/// Check an object name
///
/// # Errors
/// [`DataError::InvalidName`] if the name is empty, whitespace only or
/// contains `/`.
pub fn validate_name(name: &str) -> Result<(), DataError> {
    if name.trim().is_empty() || name.contains(crate::path::SEPARATOR) {
        return Err(DataError::InvalidName(name.to_string()));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_are_distinct() {
        let errors = [
            DataError::PathNotFound(DataPath::root()),
            DataError::InvalidName(String::new()),
            DataError::RootOperation,
            DataError::Inconsistent(String::new()),
        ];
        let mut codes: Vec<_> = errors.iter().map(DataError::code).collect();
        codes.dedup();
        assert_eq!(codes.len(), errors.len());
    }

    #[test]
    fn tuple_count_message_lists_every_path() {
        let err = DataError::TupleCountMismatch(vec![
            ("a/x".parse().unwrap(), 3),
            ("a/y".parse().unwrap(), 2),
        ]);
        assert_eq!(err.to_string(), "tuple counts differ: 'a/x' = 3, 'a/y' = 2");
    }

    #[test]
    fn validate_name_rules() {
        assert!(validate_name("Cell Data").is_ok());
        assert!(validate_name("").is_err());
        assert!(validate_name("   ").is_err());
        assert!(validate_name("a/b").is_err());
    }
}
