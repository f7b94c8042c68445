//! Structural mutations of a [`DataStructure`]
//!
//! Preflight returns [`Action`]s describing what a filter *would* change; the
//! caller applies them before execute. Actions are plain values, so two
//! preflights can be compared for structural equality.

use crate::report::Error;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Display, Formatter};
use strata_data::{AnyArray, AnyList, DataError, DataPath, DataStructure, DataType, ObjectBody};

/// When an action batch is being applied
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ApplyMode {
    /// Arrays and lists are created shape-only
    Preflight,
    /// Arrays and lists are allocated
    Execute,
}

impl ApplyMode {
    #[inline]
    #[must_use]
    pub const fn allocates(self) -> bool {
        matches!(self, Self::Execute)
    }
}

/// One structural change
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Action {
    CreateDataGroup {
        path: DataPath,
    },
    CreateAttributeMatrix {
        path: DataPath,
        tuple_shape: Vec<usize>,
    },
    CreateArray {
        path: DataPath,
        data_type: DataType,
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
    },
    CreateNeighborList {
        path: DataPath,
        data_type: DataType,
        tuple_shape: Vec<usize>,
    },
    CreateImageGeometry {
        path: DataPath,
        /// Cells along x, y, z
        dimensions: [usize; 3],
        spacing: [f32; 3],
        origin: [f32; 3],
        cell_data_name: String,
    },
    CreateVertexGeometry {
        path: DataPath,
        vertex_count: usize,
        vertex_data_name: String,
        shared_vertex_list_name: String,
    },
    Rename {
        path: DataPath,
        new_name: String,
    },
    Move {
        path: DataPath,
        new_parent: DataPath,
    },
    Delete {
        path: DataPath,
    },
    ResizeAttributeMatrix {
        path: DataPath,
        tuple_shape: Vec<usize>,
    },
}

impl Action {
    /// Path the action operates on
    #[must_use]
    pub fn target(&self) -> &DataPath {
        match self {
            Self::CreateDataGroup { path }
            | Self::CreateAttributeMatrix { path, .. }
            | Self::CreateArray { path, .. }
            | Self::CreateNeighborList { path, .. }
            | Self::CreateImageGeometry { path, .. }
            | Self::CreateVertexGeometry { path, .. }
            | Self::Rename { path, .. }
            | Self::Move { path, .. }
            | Self::Delete { path }
            | Self::ResizeAttributeMatrix { path, .. } => path,
        }
    }

    /// Paths that resolve after a successful apply and did not before
    #[must_use]
    pub fn created_paths(&self) -> Vec<DataPath> {
        match self {
            Self::CreateDataGroup { path }
            | Self::CreateAttributeMatrix { path, .. }
            | Self::CreateArray { path, .. }
            | Self::CreateNeighborList { path, .. } => vec![path.clone()],
            Self::CreateImageGeometry {
                path,
                cell_data_name,
                ..
            } => vec![path.clone(), path.child(cell_data_name.clone())],
            Self::CreateVertexGeometry {
                path,
                vertex_data_name,
                shared_vertex_list_name,
                ..
            } => vec![
                path.clone(),
                path.child(shared_vertex_list_name.clone()),
                path.child(vertex_data_name.clone()),
            ],
            Self::Rename { path, new_name } => vec![path.with_name(new_name.clone())],
            Self::Move { path, new_parent } => path
                .name()
                .map(|name| vec![new_parent.child(name)])
                .unwrap_or_default(),
            Self::Delete { .. } | Self::ResizeAttributeMatrix { .. } => Vec::new(),
        }
    }

    /// Whether the action only adds objects
    #[inline]
    #[must_use]
    pub fn is_create(&self) -> bool {
        matches!(
            self,
            Self::CreateDataGroup { .. }
                | Self::CreateAttributeMatrix { .. }
                | Self::CreateArray { .. }
                | Self::CreateNeighborList { .. }
                | Self::CreateImageGeometry { .. }
                | Self::CreateVertexGeometry { .. }
        )
    }

    /// Human-readable one-liner
    #[must_use]
    pub fn description(&self) -> String {
        self.to_string()
    }

    /// Apply to `data`
    ///
    /// # Errors
    /// Any structural error raised by the data structure. A missing parent is
    /// always an error; parents are never created implicitly.
    pub fn apply(&self, data: &mut DataStructure, mode: ApplyMode) -> Result<(), DataError> {
        let allocate = mode.allocates();
        match self {
            Self::CreateDataGroup { path } => data.create(path, ObjectBody::Group).map(|_| ()),
            Self::CreateAttributeMatrix { path, tuple_shape } => data
                .create(
                    path,
                    ObjectBody::AttributeMatrix {
                        tuple_shape: tuple_shape.clone(),
                    },
                )
                .map(|_| ()),
            Self::CreateArray {
                path,
                data_type,
                tuple_shape,
                component_shape,
            } => {
                let array = AnyArray::new(
                    *data_type,
                    tuple_shape.clone(),
                    component_shape.clone(),
                    allocate,
                )
                .map_err(|e| DataError::store(path, e))?;
                data.create(path, ObjectBody::Array(array)).map(|_| ())
            }
            Self::CreateNeighborList {
                path,
                data_type,
                tuple_shape,
            } => {
                let list = AnyList::new(*data_type, tuple_shape.clone(), allocate)
                    .map_err(|e| DataError::store(path, e))?;
                data.create(path, ObjectBody::NeighborList(list)).map(|_| ())
            }
            Self::CreateImageGeometry {
                path,
                dimensions,
                spacing,
                origin,
                cell_data_name,
            } => data
                .create_image_geometry(path, *dimensions, *spacing, *origin, cell_data_name)
                .map(|_| ()),
            Self::CreateVertexGeometry {
                path,
                vertex_count,
                vertex_data_name,
                shared_vertex_list_name,
            } => data
                .create_vertex_geometry(
                    path,
                    *vertex_count,
                    vertex_data_name,
                    shared_vertex_list_name,
                    allocate,
                )
                .map(|_| ()),
            Self::Rename { path, new_name } => data.rename(path, new_name),
            Self::Move { path, new_parent } => data.move_to(path, new_parent),
            Self::Delete { path } => data.remove(path).map(|_| ()),
            Self::ResizeAttributeMatrix { path, tuple_shape } => {
                data.resize_attribute_matrix(path, tuple_shape.clone())
            }
        }
    }
}

impl Display for Action {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::CreateDataGroup { path } => write!(f, "create data group '{path}'"),
            Self::CreateAttributeMatrix { path, tuple_shape } => {
                write!(f, "create attribute matrix '{path}' with tuples {tuple_shape:?}")
            }
            Self::CreateArray {
                path,
                data_type,
                tuple_shape,
                component_shape,
            } => write!(
                f,
                "create {data_type} array '{path}' {tuple_shape:?} x {component_shape:?}"
            ),
            Self::CreateNeighborList {
                path,
                data_type,
                tuple_shape,
            } => write!(f, "create {data_type} neighbor list '{path}' {tuple_shape:?}"),
            Self::CreateImageGeometry {
                path, dimensions, ..
            } => write!(f, "create image geometry '{path}' {dimensions:?}"),
            Self::CreateVertexGeometry {
                path, vertex_count, ..
            } => write!(f, "create vertex geometry '{path}' with {vertex_count} vertices"),
            Self::Rename { path, new_name } => write!(f, "rename '{path}' to '{new_name}'"),
            Self::Move { path, new_parent } => write!(f, "move '{path}' into '{new_parent}'"),
            Self::Delete { path } => write!(f, "delete '{path}'"),
            Self::ResizeAttributeMatrix { path, tuple_shape } => {
                write!(f, "resize attribute matrix '{path}' to {tuple_shape:?}")
            }
        }
    }
}

/// Action at `index` of a batch failed; earlier actions stay applied
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("action {index} ({action}) failed: {source}")]
pub struct ApplyError {
    pub index: usize,
    pub action: String,
    #[source]
    pub source: DataError,
}

impl From<ApplyError> for Error {
    fn from(err: ApplyError) -> Self {
        Error::structural(err.source.code(), err.to_string())
    }
}

/// Ordered batch of actions produced by one preflight
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct OutputActions {
    actions: Vec<Action>,
}

impl OutputActions {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an action (builder style)
    #[inline]
    #[must_use]
    pub fn with(mut self, action: Action) -> Self {
        self.actions.push(action);
        self
    }

    pub fn push(&mut self, action: Action) {
        self.actions.push(action);
    }

    pub fn extend(&mut self, other: Self) {
        self.actions.extend(other.actions);
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.actions.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    #[inline]
    pub fn iter(&self) -> std::slice::Iter<'_, Action> {
        self.actions.iter()
    }

    #[inline]
    #[must_use]
    pub fn as_slice(&self) -> &[Action] {
        &self.actions
    }

    /// Every path the batch creates, in order
    #[must_use]
    pub fn created_paths(&self) -> Vec<DataPath> {
        self.actions.iter().flat_map(Action::created_paths).collect()
    }

    /// Apply in order, stopping at the first failure
    ///
    /// Actions before the failing one remain applied.
    ///
    /// # Errors
    /// [`ApplyError`] naming the failing action's index.
    pub fn apply_all(&self, data: &mut DataStructure, mode: ApplyMode) -> Result<(), ApplyError> {
        for (index, action) in self.actions.iter().enumerate() {
            tracing::debug!(index, ?mode, action = %action, "applying action");
            action.apply(data, mode).map_err(|source| {
                tracing::error!(index, error = %source, "action failed");
                ApplyError {
                    index,
                    action: action.to_string(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}

impl From<Vec<Action>> for OutputActions {
    fn from(actions: Vec<Action>) -> Self {
        Self { actions }
    }
}

impl FromIterator<Action> for OutputActions {
    fn from_iter<I: IntoIterator<Item = Action>>(iter: I) -> Self {
        Self {
            actions: iter.into_iter().collect(),
        }
    }
}

impl IntoIterator for OutputActions {
    type Item = Action;
    type IntoIter = std::vec::IntoIter<Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.into_iter()
    }
}

impl<'a> IntoIterator for &'a OutputActions {
    type Item = &'a Action;
    type IntoIter = std::slice::Iter<'a, Action>;

    fn into_iter(self) -> Self::IntoIter {
        self.actions.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> DataPath {
        s.parse().unwrap()
    }

    fn feature_batch() -> OutputActions {
        OutputActions::new()
            .with(Action::CreateDataGroup { path: p("DC") })
            .with(Action::CreateAttributeMatrix {
                path: p("DC/Feature Data"),
                tuple_shape: vec![4],
            })
            .with(Action::CreateArray {
                path: p("DC/Feature Data/Avg"),
                data_type: DataType::Float32,
                tuple_shape: vec![4],
                component_shape: vec![1],
            })
            .with(Action::CreateNeighborList {
                path: p("DC/Feature Data/List"),
                data_type: DataType::Float32,
                tuple_shape: vec![4],
            })
    }

    #[test]
    fn apply_all_creates_every_path() {
        let batch = feature_batch();
        let mut ds = DataStructure::new();
        batch.apply_all(&mut ds, ApplyMode::Execute).unwrap();
        for path in batch.created_paths() {
            assert!(ds.contains(&path), "{path} missing");
        }
        assert!(ds.any_array(&p("DC/Feature Data/Avg")).unwrap().is_allocated());
    }

    #[test]
    fn preflight_mode_is_shape_only() {
        let mut ds = DataStructure::new();
        feature_batch().apply_all(&mut ds, ApplyMode::Preflight).unwrap();
        let avg = ds.any_array(&p("DC/Feature Data/Avg")).unwrap();
        assert!(!avg.is_allocated());
        assert_eq!(avg.number_of_tuples(), 4);
        assert!(!ds
            .any_neighbor_list(&p("DC/Feature Data/List"))
            .unwrap()
            .is_allocated());
    }

    #[test]
    fn apply_all_stops_at_first_failure_without_rollback() {
        let batch = OutputActions::new()
            .with(Action::CreateDataGroup { path: p("A") })
            .with(Action::CreateDataGroup { path: p("Missing/B") })
            .with(Action::CreateDataGroup { path: p("C") });
        let mut ds = DataStructure::new();
        let err = batch.apply_all(&mut ds, ApplyMode::Execute).unwrap_err();
        assert_eq!(err.index, 1);
        assert!(ds.contains(&p("A")));
        assert!(!ds.contains(&p("C")));

        let as_error: Error = err.into();
        assert_eq!(as_error.code, -101);
        assert!(as_error.message.contains("action 1"));
    }

    #[test]
    fn created_paths_for_geometry_and_rename() {
        let geom = Action::CreateImageGeometry {
            path: p("Image"),
            dimensions: [2, 2, 2],
            spacing: [1.0; 3],
            origin: [0.0; 3],
            cell_data_name: "Cell Data".into(),
        };
        assert_eq!(geom.created_paths(), vec![p("Image"), p("Image/Cell Data")]);
        let rename = Action::Rename {
            path: p("Image/Cell Data"),
            new_name: "Cells".into(),
        };
        assert_eq!(rename.created_paths(), vec![p("Image/Cells")]);
        assert!(!rename.is_create());
    }

    #[test]
    fn actions_serialize_tagged() {
        let action = Action::Delete { path: p("A/B") };
        let json = serde_json::to_value(&action).unwrap();
        assert_eq!(json, serde_json::json!({"type": "delete", "path": "A/B"}));
    }

    #[test]
    fn description_mentions_target() {
        let action = Action::Move {
            path: p("A/B"),
            new_parent: p("C"),
        };
        assert_eq!(action.description(), "move 'A/B' into 'C'");
    }
}
