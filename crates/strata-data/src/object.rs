//! Nodes of the data tree

use crate::array::{AnyArray, AnyList};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

/// Arena key of a [`DataObject`], assigned monotonically by the structure
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DataId(pub u64);

impl Display for DataId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Discriminant of an object body
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    DataGroup,
    AttributeMatrix,
    DataArray,
    NeighborList,
    ImageGeometry,
    VertexGeometry,
}

impl ObjectKind {
    /// Whether objects of this kind may have children
    #[must_use]
    pub const fn is_container(self) -> bool {
        !matches!(self, Self::DataArray | Self::NeighborList)
    }

    #[must_use]
    pub const fn is_geometry(self) -> bool {
        matches!(self, Self::ImageGeometry | Self::VertexGeometry)
    }
}

impl Display for ObjectKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::DataGroup => "data group",
            Self::AttributeMatrix => "attribute matrix",
            Self::DataArray => "data array",
            Self::NeighborList => "neighbor list",
            Self::ImageGeometry => "image geometry",
            Self::VertexGeometry => "vertex geometry",
        };
        f.write_str(s)
    }
}

/// Regular grid or point cloud metadata
#[derive(Debug, Clone, PartialEq)]
pub enum Geometry {
    /// Regular grid; cell data tuple shape is `[z, y, x]`
    Image {
        /// Cells along x, y, z
        dimensions: [usize; 3],
        spacing: [f32; 3],
        origin: [f32; 3],
        cell_data: Option<DataId>,
    },
    /// Point cloud with a shared `f32 × 3` coordinate array
    Vertex {
        vertex_count: usize,
        vertex_data: Option<DataId>,
        shared_vertex_list: Option<DataId>,
    },
}

impl Geometry {
    /// Image geometry without cell data attached yet
    #[must_use]
    pub fn image(dimensions: [usize; 3], spacing: [f32; 3], origin: [f32; 3]) -> Self {
        Self::Image {
            dimensions,
            spacing,
            origin,
            cell_data: None,
        }
    }

    #[must_use]
    pub fn vertex(vertex_count: usize) -> Self {
        Self::Vertex {
            vertex_count,
            vertex_data: None,
            shared_vertex_list: None,
        }
    }

    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Image { .. } => ObjectKind::ImageGeometry,
            Self::Vertex { .. } => ObjectKind::VertexGeometry,
        }
    }

    /// Tuple shape of the owned attribute matrix (slowest dimension first)
    #[must_use]
    pub fn element_tuple_shape(&self) -> Vec<usize> {
        match self {
            Self::Image { dimensions, .. } => vec![dimensions[2], dimensions[1], dimensions[0]],
            Self::Vertex { vertex_count, .. } => vec![*vertex_count],
        }
    }

    /// Number of cells (image) or vertices (vertex)
    #[must_use]
    pub fn element_count(&self) -> usize {
        crate::store::shape_product(&self.element_tuple_shape())
    }

    /// Id of the attribute matrix holding per-element data
    #[must_use]
    pub const fn element_data(&self) -> Option<DataId> {
        match self {
            Self::Image { cell_data, .. } => *cell_data,
            Self::Vertex { vertex_data, .. } => *vertex_data,
        }
    }

    /// This geometry re-sized to an element tuple shape
    ///
    /// `None` when the rank does not fit: image cell data is `[z, y, x]`,
    /// vertex data is `[n]`.
    #[must_use]
    pub fn with_element_tuple_shape(&self, tuple_shape: &[usize]) -> Option<Self> {
        let mut next = self.clone();
        match (&mut next, tuple_shape) {
            (Self::Image { dimensions, .. }, &[z, y, x]) => *dimensions = [x, y, z],
            (Self::Vertex { vertex_count, .. }, &[n]) => *vertex_count = n,
            _ => return None,
        }
        Some(next)
    }
}

/// Payload of a [`DataObject`]
#[derive(Debug, Clone, PartialEq)]
pub enum ObjectBody {
    Group,
    AttributeMatrix { tuple_shape: Vec<usize> },
    Array(AnyArray),
    NeighborList(AnyList),
    Geometry(Geometry),
}

impl ObjectBody {
    #[must_use]
    pub const fn kind(&self) -> ObjectKind {
        match self {
            Self::Group => ObjectKind::DataGroup,
            Self::AttributeMatrix { .. } => ObjectKind::AttributeMatrix,
            Self::Array(_) => ObjectKind::DataArray,
            Self::NeighborList(_) => ObjectKind::NeighborList,
            Self::Geometry(g) => g.kind(),
        }
    }

    /// Tuple shape for arrays, lists and attribute matrices
    #[must_use]
    pub fn tuple_shape(&self) -> Option<&[usize]> {
        match self {
            Self::AttributeMatrix { tuple_shape } => Some(tuple_shape),
            Self::Array(a) => Some(a.tuple_shape()),
            Self::NeighborList(l) => Some(l.tuple_shape()),
            Self::Group | Self::Geometry(_) => None,
        }
    }
}

/// One node of the tree
#[derive(Debug, Clone, PartialEq)]
pub struct DataObject {
    pub(crate) id: DataId,
    pub(crate) name: String,
    pub(crate) parent: Option<DataId>,
    pub(crate) children: BTreeMap<String, DataId>,
    pub(crate) body: ObjectBody,
}

impl DataObject {
    #[inline]
    #[must_use]
    pub fn id(&self) -> DataId {
        self.id
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Parent id; `None` for top-level objects
    #[inline]
    #[must_use]
    pub fn parent(&self) -> Option<DataId> {
        self.parent
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> ObjectKind {
        self.body.kind()
    }

    #[inline]
    #[must_use]
    pub fn body(&self) -> &ObjectBody {
        &self.body
    }

    /// Children by name, in name order
    pub fn children(&self) -> impl Iterator<Item = (&str, DataId)> {
        self.children.iter().map(|(n, id)| (n.as_str(), *id))
    }

    #[must_use]
    pub fn child(&self, name: &str) -> Option<DataId> {
        self.children.get(name).copied()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn image_geometry_tuple_shape_is_reversed() {
        let geom = Geometry::image([10, 20, 30], [1.0; 3], [0.0; 3]);
        assert_eq!(geom.element_tuple_shape(), vec![30, 20, 10]);
        assert_eq!(geom.element_count(), 6000);
        assert_eq!(geom.kind(), ObjectKind::ImageGeometry);
    }

    #[test]
    fn containers() {
        assert!(ObjectKind::DataGroup.is_container());
        assert!(ObjectKind::VertexGeometry.is_container());
        assert!(!ObjectKind::NeighborList.is_container());
    }

    #[test]
    fn body_tuple_shape() {
        let body = ObjectBody::AttributeMatrix {
            tuple_shape: vec![4, 2],
        };
        assert_eq!(body.tuple_shape(), Some(&[4, 2][..]));
        assert_eq!(ObjectBody::Group.tuple_shape(), None);
    }
}
