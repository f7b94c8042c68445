//! Data paths for addressing objects in a [`DataStructure`](crate::DataStructure)
//!
//! Every name in a parsed or checked path obeys the same rules as object
//! names (see [`validate_name`]), so a path that parses can always be created.

use crate::error::{validate_name, DataError};
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Separator used by the textual form of a path
pub const SEPARATOR: char = '/';

/// Path from the structure root to an object
///
/// An ordered list of object names. Two paths are equal iff their name
/// sequences are equal; no identifiers are involved. The empty path is the
/// root and renders as the empty string.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct DataPath(Vec<String>);

impl DataPath {
    /// Path from names already known to be valid (e.g. read back from the tree)
    #[inline]
    #[must_use]
    pub fn new(names: Vec<String>) -> Self {
        Self(names)
    }

    /// Path from names that still have to pass [`validate_name`]
    ///
    /// # Errors
    /// [`DataError::InvalidName`] for the first offending name.
    pub fn checked<I, S>(names: I) -> Result<Self, DataError>
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        names
            .into_iter()
            .map(|name| {
                let name = name.into();
                validate_name(&name).map(|()| name)
            })
            .collect::<Result<Vec<_>, _>>()
            .map(Self)
    }

    #[must_use]
    pub fn from_names(names: &[&str]) -> Self {
        Self(names.iter().map(|s| (*s).to_owned()).collect())
    }

    #[inline]
    #[must_use]
    pub fn single(name: impl Into<String>) -> Self {
        Self(vec![name.into()])
    }

    #[inline]
    #[must_use]
    pub fn root() -> Self {
        Self(Vec::new())
    }

    #[inline]
    #[must_use]
    pub fn segments(&self) -> &[String] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// True for the root path
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Path of the containing object; `None` for the root
    #[must_use]
    pub fn parent(&self) -> Option<Self> {
        self.0.split_last().map(|(_, rest)| Self(rest.to_vec()))
    }

    /// Object name (last segment); `None` for the root
    #[inline]
    #[must_use]
    pub fn name(&self) -> Option<&str> {
        self.0.last().map(String::as_str)
    }

    #[must_use]
    pub fn child(&self, name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.push(name.into());
        Self(names)
    }

    /// Same parent, different name. On the root this is [`DataPath::single`].
    #[must_use]
    pub fn with_name(&self, name: impl Into<String>) -> Self {
        let mut names = self.0.clone();
        names.pop();
        names.push(name.into());
        Self(names)
    }

    /// Names below `ancestor`, or `None` if `ancestor` does not lead here
    #[must_use]
    pub fn strip_prefix(&self, ancestor: &Self) -> Option<&[String]> {
        self.0.strip_prefix(ancestor.0.as_slice())
    }

    /// `self` is `other` or one of its ancestors
    #[inline]
    #[must_use]
    pub fn is_prefix_of(&self, other: &Self) -> bool {
        other.0.starts_with(&self.0)
    }

    /// `self` is a strict ancestor of `other`
    #[inline]
    #[must_use]
    pub fn is_ancestor_of(&self, other: &Self) -> bool {
        other.strip_prefix(self).is_some_and(|rest| !rest.is_empty())
    }

    #[inline]
    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.0.iter().map(String::as_str)
    }
}

impl Display for DataPath {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let mut names = self.iter();
        if let Some(first) = names.next() {
            f.write_str(first)?;
            for name in names {
                write!(f, "{SEPARATOR}{name}")?;
            }
        }
        Ok(())
    }
}

impl FromStr for DataPath {
    type Err = DataError;

    /// Split on [`SEPARATOR`]; the empty string is the root
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s.is_empty() {
            return Ok(Self::root());
        }
        Self::checked(s.split(SEPARATOR))
    }
}

impl TryFrom<String> for DataPath {
    type Error = DataError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<DataPath> for String {
    fn from(path: DataPath) -> Self {
        path.to_string()
    }
}

impl From<Vec<String>> for DataPath {
    fn from(names: Vec<String>) -> Self {
        Self(names)
    }
}

impl Default for DataPath {
    fn default() -> Self {
        Self::root()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn p(s: &str) -> DataPath {
        s.parse().unwrap()
    }

    #[test]
    fn root_has_no_parent_or_name() {
        let root = DataPath::root();
        assert!(root.is_empty());
        assert!(root.parent().is_none());
        assert!(root.name().is_none());
        assert_eq!(root.to_string(), "");
        assert_eq!(p(""), root);
    }

    #[test]
    fn parent_name_child_and_sibling() {
        let path = DataPath::from_names(&["Image", "Cell Data", "Phases"]);
        assert_eq!(path.len(), 3);
        assert_eq!(path.parent().unwrap(), p("Image/Cell Data"));
        assert_eq!(path.name(), Some("Phases"));
        assert_eq!(p("Image/Cell Data").child("Quats").to_string(), "Image/Cell Data/Quats");
        assert_eq!(path.with_name("Quats").to_string(), "Image/Cell Data/Quats");
        assert_eq!(DataPath::root().with_name("A"), DataPath::single("A"));
    }

    #[test]
    fn prefixes_and_ancestors() {
        let am = p("a/b");
        let array = p("a/b/c");
        assert!(am.is_prefix_of(&array));
        assert!(am.is_prefix_of(&am));
        assert!(am.is_ancestor_of(&array));
        assert!(!am.is_ancestor_of(&am));
        assert!(!array.is_prefix_of(&am));
        assert!(!p("a/x").is_prefix_of(&array));
        assert!(DataPath::root().is_ancestor_of(&am));
        assert_eq!(array.strip_prefix(&am), Some(&["c".to_owned()][..]));
        assert_eq!(array.strip_prefix(&p("x")), None);
    }

    #[test]
    fn names_with_spaces_survive_display_and_parse() {
        let path = p("DataContainer/Feature Data/AvgQuats");
        assert_eq!(path.segments(), &["DataContainer", "Feature Data", "AvgQuats"]);
        assert_eq!(path.to_string(), "DataContainer/Feature Data/AvgQuats");
    }

    #[test]
    fn parse_rejects_names_the_structure_would_reject() {
        for text in ["a//b", "/a", "a/", "a/   /b"] {
            let err = text.parse::<DataPath>().unwrap_err();
            assert!(matches!(err, DataError::InvalidName(_)), "{text}: {err}");
            assert_eq!(err.code(), -103);
        }
    }

    #[test]
    fn checked_validates_every_name() {
        assert_eq!(DataPath::checked(["A", "B"]).unwrap(), p("A/B"));
        assert_eq!(
            DataPath::checked(["A", "x/y"]).unwrap_err(),
            DataError::InvalidName("x/y".to_owned())
        );
    }

    #[test]
    fn serializes_as_string() {
        let path = DataPath::from_names(&["a", "b"]);
        let json = serde_json::to_string(&path).unwrap();
        assert_eq!(json, "\"a/b\"");
        assert_eq!(serde_json::from_str::<DataPath>(&json).unwrap(), path);
        assert!(serde_json::from_str::<DataPath>("\"a//b\"").is_err());
    }
}
