//! The data tree: an arena of [`DataObject`]s addressed by [`DataPath`]

use crate::array::{AnyArray, AnyList};
use crate::data_type::Element;
use crate::error::{validate_name, DataError};
use crate::object::{DataId, DataObject, Geometry, ObjectBody, ObjectKind};
use crate::path::DataPath;
use crate::store::{checked_shape_product, element_count, DataStore, ListStore, StoreError};
use std::collections::BTreeMap;

/// Arena-backed hierarchy of typed data
///
/// Every object lives in one map keyed by [`DataId`]; parent/child relations
/// are id links. Removing an object removes its whole subtree.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DataStructure {
    objects: BTreeMap<DataId, DataObject>,
    roots: BTreeMap<String, DataId>,
    next_id: u64,
}

impl DataStructure {
    /// Empty structure
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in the tree
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.objects.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.objects.is_empty()
    }

    // ------------------------------------------------------------------
    // Lookup
    // ------------------------------------------------------------------

    /// Walk names from the root, stopping at the first missing segment
    #[must_use]
    pub fn id_of(&self, path: &DataPath) -> Option<DataId> {
        let mut segments = path.iter();
        let mut current = *self.roots.get(segments.next()?)?;
        for segment in segments {
            current = self.objects.get(&current)?.child(segment)?;
        }
        Some(current)
    }

    /// Like [`DataStructure::id_of`] but with a structural error
    ///
    /// # Errors
    /// [`DataError::PathNotFound`] when any segment is missing.
    pub fn resolve(&self, path: &DataPath) -> Result<DataId, DataError> {
        self.id_of(path)
            .ok_or_else(|| DataError::PathNotFound(path.clone()))
    }

    #[must_use]
    pub fn get(&self, path: &DataPath) -> Option<&DataObject> {
        self.id_of(path).and_then(|id| self.objects.get(&id))
    }

    #[must_use]
    pub fn object(&self, id: DataId) -> Option<&DataObject> {
        self.objects.get(&id)
    }

    #[inline]
    #[must_use]
    pub fn contains(&self, path: &DataPath) -> bool {
        self.id_of(path).is_some()
    }

    /// Rebuild the path of an object by walking parent links
    #[must_use]
    pub fn path_of(&self, id: DataId) -> Option<DataPath> {
        let mut names = Vec::new();
        let mut current = Some(id);
        while let Some(cid) = current {
            let obj = self.objects.get(&cid)?;
            names.push(obj.name.clone());
            current = obj.parent;
            if names.len() > self.objects.len() {
                return None;
            }
        }
        names.reverse();
        Some(DataPath::new(names))
    }

    /// Kind of the object at `path`
    ///
    /// # Errors
    /// [`DataError::PathNotFound`].
    pub fn kind_of(&self, path: &DataPath) -> Result<ObjectKind, DataError> {
        self.require(path).map(DataObject::kind)
    }

    /// Names of the children of `path`; the root path lists top-level objects
    ///
    /// # Errors
    /// [`DataError::PathNotFound`].
    pub fn child_names(&self, path: &DataPath) -> Result<Vec<String>, DataError> {
        if path.is_empty() {
            return Ok(self.roots.keys().cloned().collect());
        }
        Ok(self.require(path)?.children.keys().cloned().collect())
    }

    /// Every path in the tree with its kind, depth first in name order
    #[must_use]
    pub fn iter_paths(&self) -> Vec<(DataPath, ObjectKind)> {
        let mut out = Vec::with_capacity(self.objects.len());
        let mut stack: Vec<(DataPath, DataId)> = self
            .roots
            .iter()
            .rev()
            .map(|(name, id)| (DataPath::single(name.clone()), *id))
            .collect();
        while let Some((path, id)) = stack.pop() {
            let Some(obj) = self.objects.get(&id) else {
                continue;
            };
            for (name, child) in obj.children.iter().rev() {
                stack.push((path.child(name.clone()), *child));
            }
            out.push((path, obj.kind()));
        }
        out
    }

    fn require(&self, path: &DataPath) -> Result<&DataObject, DataError> {
        let id = self.resolve(path)?;
        self.objects
            .get(&id)
            .ok_or_else(|| DataError::PathNotFound(path.clone()))
    }

    fn require_mut(&mut self, path: &DataPath) -> Result<&mut DataObject, DataError> {
        let id = self.resolve(path)?;
        self.objects
            .get_mut(&id)
            .ok_or_else(|| DataError::PathNotFound(path.clone()))
    }

    // ------------------------------------------------------------------
    // Typed access
    // ------------------------------------------------------------------

    /// Type-erased array at `path`
    ///
    /// # Errors
    /// Missing path or object is not a data array.
    pub fn any_array(&self, path: &DataPath) -> Result<&AnyArray, DataError> {
        match &self.require(path)?.body {
            ObjectBody::Array(a) => Ok(a),
            other => Err(wrong_kind(path, ObjectKind::DataArray, other.kind())),
        }
    }

    /// Mutable type-erased array at `path`
    ///
    /// # Errors
    /// Missing path or object is not a data array.
    pub fn any_array_mut(&mut self, path: &DataPath) -> Result<&mut AnyArray, DataError> {
        match &mut self.require_mut(path)?.body {
            ObjectBody::Array(a) => Ok(a),
            other => Err(wrong_kind(path, ObjectKind::DataArray, other.kind())),
        }
    }

    /// Typed array at `path`; no implicit widening
    ///
    /// # Errors
    /// Missing path, object is not a data array, or element kind differs
    /// ([`DataError::TypeMismatch`]).
    pub fn array<T: Element>(&self, path: &DataPath) -> Result<&DataStore<T>, DataError> {
        let any = self.any_array(path)?;
        any.downcast_ref::<T>().ok_or_else(|| DataError::TypeMismatch {
            path: path.clone(),
            requested: T::DATA_TYPE,
            actual: any.data_type(),
        })
    }

    /// Mutable typed array at `path`
    ///
    /// # Errors
    /// Same as [`DataStructure::array`].
    pub fn array_mut<T: Element>(
        &mut self,
        path: &DataPath,
    ) -> Result<&mut DataStore<T>, DataError> {
        let any = self.any_array_mut(path)?;
        let actual = any.data_type();
        any.downcast_mut::<T>().ok_or_else(|| DataError::TypeMismatch {
            path: path.clone(),
            requested: T::DATA_TYPE,
            actual,
        })
    }

    /// Type-erased neighbor list at `path`
    ///
    /// # Errors
    /// Missing path or object is not a neighbor list.
    pub fn any_neighbor_list(&self, path: &DataPath) -> Result<&AnyList, DataError> {
        match &self.require(path)?.body {
            ObjectBody::NeighborList(l) => Ok(l),
            other => Err(wrong_kind(path, ObjectKind::NeighborList, other.kind())),
        }
    }

    /// Mutable type-erased neighbor list at `path`
    ///
    /// # Errors
    /// Missing path or object is not a neighbor list.
    pub fn any_neighbor_list_mut(&mut self, path: &DataPath) -> Result<&mut AnyList, DataError> {
        match &mut self.require_mut(path)?.body {
            ObjectBody::NeighborList(l) => Ok(l),
            other => Err(wrong_kind(path, ObjectKind::NeighborList, other.kind())),
        }
    }

    /// Typed neighbor list at `path`
    ///
    /// # Errors
    /// Missing path, wrong object kind, or element kind differs.
    pub fn neighbor_list<T: Element>(&self, path: &DataPath) -> Result<&ListStore<T>, DataError> {
        let any = self.any_neighbor_list(path)?;
        any.downcast_ref::<T>().ok_or_else(|| DataError::TypeMismatch {
            path: path.clone(),
            requested: T::DATA_TYPE,
            actual: any.data_type(),
        })
    }

    /// Mutable typed neighbor list at `path`
    ///
    /// # Errors
    /// Missing path, wrong object kind, or element kind differs.
    pub fn neighbor_list_mut<T: Element>(
        &mut self,
        path: &DataPath,
    ) -> Result<&mut ListStore<T>, DataError> {
        let any = self.any_neighbor_list_mut(path)?;
        let actual = any.data_type();
        any.downcast_mut::<T>().ok_or_else(|| DataError::TypeMismatch {
            path: path.clone(),
            requested: T::DATA_TYPE,
            actual,
        })
    }

    /// Tuple shape of the attribute matrix at `path`
    ///
    /// # Errors
    /// Missing path or object is not an attribute matrix.
    pub fn attribute_matrix(&self, path: &DataPath) -> Result<&[usize], DataError> {
        match &self.require(path)?.body {
            ObjectBody::AttributeMatrix { tuple_shape } => Ok(tuple_shape),
            other => Err(wrong_kind(path, ObjectKind::AttributeMatrix, other.kind())),
        }
    }

    /// Geometry at `path`
    ///
    /// # Errors
    /// Missing path or object is not a geometry.
    pub fn geometry(&self, path: &DataPath) -> Result<&Geometry, DataError> {
        match &self.require(path)?.body {
            ObjectBody::Geometry(g) => Ok(g),
            other => Err(DataError::NotAGeometry {
                path: path.clone(),
                actual: other.kind(),
            }),
        }
    }

    /// Geometry at `path`, which must be of `kind`
    ///
    /// # Errors
    /// Missing path, or the object is not a geometry of `kind`.
    pub fn geometry_of_kind(&self, path: &DataPath, kind: ObjectKind) -> Result<&Geometry, DataError> {
        match &self.require(path)?.body {
            ObjectBody::Geometry(g) if g.kind() == kind => Ok(g),
            other => Err(wrong_kind(path, kind, other.kind())),
        }
    }

    /// Tuple count of an array, neighbor list or attribute matrix
    ///
    /// # Errors
    /// Missing path or the object has no tuple shape.
    pub fn tuple_count(&self, path: &DataPath) -> Result<usize, DataError> {
        let obj = self.require(path)?;
        obj.body
            .tuple_shape()
            .map(crate::store::shape_product)
            .ok_or_else(|| wrong_kind(path, ObjectKind::DataArray, obj.kind()))
    }

    // ------------------------------------------------------------------
    // Creation
    // ------------------------------------------------------------------

    /// Insert a new object named `name` under `parent` (root for the empty path)
    ///
    /// # Errors
    /// Invalid name, parent missing or not a container, child kind not
    /// allowed in the parent, name collision, or tuple shape differing from
    /// an attribute-matrix parent.
    pub fn insert(
        &mut self,
        parent: &DataPath,
        name: &str,
        body: ObjectBody,
    ) -> Result<DataId, DataError> {
        validate_name(name)?;
        if let Some(shape) = body.tuple_shape() {
            if checked_shape_product(shape).is_none() {
                return Err(DataError::store(
                    &parent.child(name),
                    StoreError::ShapeOverflow {
                        shape: shape.to_vec(),
                    },
                ));
            }
        }
        let parent_id = if parent.is_empty() {
            None
        } else {
            let id = self.id_of(parent).ok_or_else(|| DataError::ParentNotFound {
                path: parent.child(name),
                parent: parent.clone(),
            })?;
            Some(id)
        };
        self.check_attach(parent, parent_id, name, &body)?;

        let id = DataId(self.next_id);
        self.next_id += 1;
        self.attach(parent_id, name.to_string(), id);
        self.objects.insert(
            id,
            DataObject {
                id,
                name: name.to_string(),
                parent: parent_id,
                children: BTreeMap::new(),
                body,
            },
        );
        tracing::trace!(path = %parent.child(name), %id, "created object");
        Ok(id)
    }

    /// Insert a new object at `path`
    ///
    /// # Errors
    /// See [`DataStructure::insert`]; the root path is rejected.
    pub fn create(&mut self, path: &DataPath, body: ObjectBody) -> Result<DataId, DataError> {
        let (parent, name) = split(path)?;
        self.insert(&parent, name, body)
    }

    /// Create an image geometry and its cell-data attribute matrix
    ///
    /// # Errors
    /// See [`DataStructure::insert`].
    pub fn create_image_geometry(
        &mut self,
        path: &DataPath,
        dimensions: [usize; 3],
        spacing: [f32; 3],
        origin: [f32; 3],
        cell_data_name: &str,
    ) -> Result<DataId, DataError> {
        validate_name(cell_data_name)?;
        let geometry = Geometry::image(dimensions, spacing, origin);
        let tuple_shape = geometry.element_tuple_shape();
        if checked_shape_product(&tuple_shape).is_none() {
            return Err(DataError::store(path, StoreError::ShapeOverflow { shape: tuple_shape }));
        }
        let geom_id = self.create(path, ObjectBody::Geometry(geometry))?;
        let am_id = self.insert(path, cell_data_name, ObjectBody::AttributeMatrix { tuple_shape })?;
        if let Some(ObjectBody::Geometry(Geometry::Image { cell_data, .. })) =
            self.objects.get_mut(&geom_id).map(|o| &mut o.body)
        {
            *cell_data = Some(am_id);
        }
        Ok(geom_id)
    }

    /// Create a vertex geometry, its `f32 × 3` shared vertex list and its
    /// vertex-data attribute matrix
    ///
    /// # Errors
    /// See [`DataStructure::insert`].
    pub fn create_vertex_geometry(
        &mut self,
        path: &DataPath,
        vertex_count: usize,
        vertex_data_name: &str,
        shared_vertex_list_name: &str,
        allocate: bool,
    ) -> Result<DataId, DataError> {
        validate_name(vertex_data_name)?;
        validate_name(shared_vertex_list_name)?;
        if vertex_data_name == shared_vertex_list_name {
            return Err(DataError::NameCollision {
                parent: path.clone(),
                name: vertex_data_name.to_string(),
            });
        }
        let coords = AnyArray::new(
            crate::DataType::Float32,
            vec![vertex_count],
            vec![3],
            allocate,
        )
        .map_err(|e| DataError::store(&path.child(shared_vertex_list_name), e))?;
        let geom_id = self.create(path, ObjectBody::Geometry(Geometry::vertex(vertex_count)))?;
        let list_id = self.insert(path, shared_vertex_list_name, ObjectBody::Array(coords))?;
        let am_id = self.insert(
            path,
            vertex_data_name,
            ObjectBody::AttributeMatrix {
                tuple_shape: vec![vertex_count],
            },
        )?;
        if let Some(ObjectBody::Geometry(Geometry::Vertex {
            vertex_data,
            shared_vertex_list,
            ..
        })) = self.objects.get_mut(&geom_id).map(|o| &mut o.body)
        {
            *vertex_data = Some(am_id);
            *shared_vertex_list = Some(list_id);
        }
        Ok(geom_id)
    }

    // ------------------------------------------------------------------
    // Mutation
    // ------------------------------------------------------------------

    /// Remove the object at `path` and all of its descendants
    ///
    /// # Errors
    /// [`DataError::PathNotFound`]; the root path is rejected.
    pub fn remove(&mut self, path: &DataPath) -> Result<usize, DataError> {
        if path.is_empty() {
            return Err(DataError::RootOperation);
        }
        let id = self.resolve(path)?;
        self.detach(id);

        let mut stack = vec![id];
        let mut removed = 0;
        while let Some(next) = stack.pop() {
            if let Some(obj) = self.objects.remove(&next) {
                stack.extend(obj.children.values().copied());
                removed += 1;
            }
        }
        tracing::trace!(%path, removed, "removed subtree");
        Ok(removed)
    }

    /// Rename the object at `path`; a collision leaves the tree unchanged
    ///
    /// # Errors
    /// Missing path, invalid name, or sibling name collision.
    pub fn rename(&mut self, path: &DataPath, new_name: &str) -> Result<(), DataError> {
        let (parent, old_name) = split(path)?;
        validate_name(new_name)?;
        let id = self.resolve(path)?;
        if old_name == new_name {
            return Ok(());
        }
        let parent_id = self.objects.get(&id).and_then(|o| o.parent);
        if self.sibling_exists(parent_id, new_name) {
            return Err(DataError::NameCollision {
                parent,
                name: new_name.to_string(),
            });
        }
        self.detach_name(parent_id, old_name);
        self.attach(parent_id, new_name.to_string(), id);
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.name = new_name.to_string();
        }
        Ok(())
    }

    /// Reparent the object at `path` under `new_parent` (root for the empty path)
    ///
    /// # Errors
    /// Missing object or parent, cycle, collision, child kind not allowed, or
    /// tuple mismatch with an attribute-matrix destination.
    pub fn move_to(&mut self, path: &DataPath, new_parent: &DataPath) -> Result<(), DataError> {
        let (_, name) = split(path)?;
        let id = self.resolve(path)?;
        if path.is_prefix_of(new_parent) {
            return Err(DataError::CycleDetected {
                path: path.clone(),
                new_parent: new_parent.clone(),
            });
        }
        let parent_id = if new_parent.is_empty() {
            None
        } else {
            Some(self.resolve(new_parent)?)
        };
        let obj = self
            .objects
            .get(&id)
            .ok_or_else(|| DataError::PathNotFound(path.clone()))?;
        if obj.parent == parent_id {
            return Ok(());
        }
        self.check_attach(new_parent, parent_id, name, &obj.body)?;

        self.detach(id);
        self.attach(parent_id, name.to_string(), id);
        if let Some(obj) = self.objects.get_mut(&id) {
            obj.parent = parent_id;
        }
        Ok(())
    }

    /// Change the tuple shape of an attribute matrix and every direct array or
    /// list inside it
    ///
    /// When the matrix holds a geometry's element data the geometry follows:
    /// image dimensions become `[x, y, z]` of the new `[z, y, x]` shape, a
    /// vertex geometry takes the new count and its shared vertex list is
    /// re-tupled with it. Nothing changes unless every part can be resized.
    ///
    /// # Errors
    /// Missing path, object is not an attribute matrix, the shape overflows,
    /// or its rank does not fit the owning geometry.
    pub fn resize_attribute_matrix(
        &mut self,
        path: &DataPath,
        tuple_shape: Vec<usize>,
    ) -> Result<(), DataError> {
        let obj = self.require(path)?;
        if !matches!(obj.body, ObjectBody::AttributeMatrix { .. }) {
            return Err(wrong_kind(path, ObjectKind::AttributeMatrix, obj.kind()));
        }
        let (id, parent) = (obj.id, obj.parent);
        let children: Vec<DataId> = obj.children.values().copied().collect();

        let overflow = || {
            DataError::store(
                path,
                StoreError::ShapeOverflow {
                    shape: tuple_shape.clone(),
                },
            )
        };
        checked_shape_product(&tuple_shape).ok_or_else(overflow)?;
        for child in &children {
            if let Some(ObjectBody::Array(a)) = self.objects.get(child).map(|c| &c.body) {
                element_count(&tuple_shape, a.component_shape())
                    .map_err(|e| DataError::store(path, e))?;
            }
        }
        let owner = self.reshaped_owner(path, id, parent, &tuple_shape)?;

        let retuple = |body: &mut ObjectBody, shape: &[usize]| -> Result<(), StoreError> {
            match body {
                ObjectBody::AttributeMatrix { tuple_shape } => {
                    *tuple_shape = shape.to_vec();
                    Ok(())
                }
                ObjectBody::Array(a) => a.resize_tuples(shape.to_vec()),
                ObjectBody::NeighborList(l) => l.resize_tuples(shape.to_vec()),
                ObjectBody::Group | ObjectBody::Geometry(_) => Ok(()),
            }
        };
        for target in std::iter::once(id).chain(children) {
            if let Some(object) = self.objects.get_mut(&target) {
                retuple(&mut object.body, &tuple_shape).map_err(|e| DataError::store(path, e))?;
            }
        }
        if let Some((geometry_id, geometry)) = owner {
            let shared = match &geometry {
                Geometry::Vertex {
                    shared_vertex_list, ..
                } => *shared_vertex_list,
                Geometry::Image { .. } => None,
            };
            if let Some(object) = shared.and_then(|list| self.objects.get_mut(&list)) {
                retuple(&mut object.body, &tuple_shape).map_err(|e| DataError::store(path, e))?;
            }
            if let Some(object) = self.objects.get_mut(&geometry_id) {
                object.body = ObjectBody::Geometry(geometry);
            }
        }
        Ok(())
    }

    /// Owning geometry of element matrix `id`, re-sized to `tuple_shape`
    fn reshaped_owner(
        &self,
        path: &DataPath,
        id: DataId,
        parent: Option<DataId>,
        tuple_shape: &[usize],
    ) -> Result<Option<(DataId, Geometry)>, DataError> {
        let Some(owner) = parent.and_then(|pid| self.objects.get(&pid)) else {
            return Ok(None);
        };
        let ObjectBody::Geometry(geometry) = &owner.body else {
            return Ok(None);
        };
        if geometry.element_data() != Some(id) {
            return Ok(None);
        }
        let reshaped = geometry
            .with_element_tuple_shape(tuple_shape)
            .ok_or_else(|| DataError::GeometryShapeMismatch {
                path: path.clone(),
                geometry: geometry.kind(),
                shape: tuple_shape.to_vec(),
            })?;
        if let Geometry::Vertex {
            shared_vertex_list: Some(list),
            ..
        } = geometry
        {
            if let Some(ObjectBody::Array(coords)) = self.objects.get(list).map(|o| &o.body) {
                element_count(tuple_shape, coords.component_shape())
                    .map_err(|e| DataError::store(path, e))?;
            }
        }
        Ok(Some((owner.id, reshaped)))
    }

    // ------------------------------------------------------------------
    // Validation
    // ------------------------------------------------------------------

    /// Check that every path has the same tuple count and return it
    ///
    /// An empty list is trivially consistent and yields 0.
    ///
    /// # Errors
    /// [`DataError::PathNotFound`] for a missing path, otherwise
    /// [`DataError::TupleCountMismatch`] listing every path and its count.
    pub fn validate_number_of_tuples(&self, paths: &[DataPath]) -> Result<usize, DataError> {
        let counts = paths
            .iter()
            .map(|p| self.tuple_count(p).map(|n| (p.clone(), n)))
            .collect::<Result<Vec<_>, _>>()?;
        let Some((_, first)) = counts.first() else {
            return Ok(0);
        };
        let first = *first;
        if counts.iter().all(|(_, n)| *n == first) {
            Ok(first)
        } else {
            Err(DataError::TupleCountMismatch(counts))
        }
    }

    /// Audit parent/child links, names, tuple consistency and acyclicity
    ///
    /// # Errors
    /// The first violated invariant found.
    pub fn validate_invariants(&self) -> Result<(), DataError> {
        for (name, id) in &self.roots {
            let obj = self
                .objects
                .get(id)
                .ok_or_else(|| DataError::Inconsistent(format!("root '{name}' points to missing {id}")))?;
            if obj.parent.is_some() || obj.name != *name {
                return Err(DataError::Inconsistent(format!("root entry '{name}' disagrees with {id}")));
            }
        }

        for (id, obj) in &self.objects {
            validate_name(&obj.name)?;
            match obj.parent {
                None => {
                    if self.roots.get(&obj.name) != Some(id) {
                        return Err(DataError::Inconsistent(format!("{id} is detached")));
                    }
                }
                Some(pid) => {
                    let linked = self
                        .objects
                        .get(&pid)
                        .is_some_and(|p| p.children.get(&obj.name) == Some(id));
                    if !linked {
                        return Err(DataError::Inconsistent(format!(
                            "{id} is not listed by its parent {pid}"
                        )));
                    }
                }
            }

            if !obj.kind().is_container() && !obj.children.is_empty() {
                return Err(DataError::Inconsistent(format!("{id} is a leaf with children")));
            }

            for (child_name, child_id) in &obj.children {
                let child = self.objects.get(child_id).ok_or_else(|| {
                    DataError::Inconsistent(format!("{id} lists missing child '{child_name}'"))
                })?;
                if child.parent != Some(*id) || child.name != *child_name {
                    return Err(DataError::Inconsistent(format!(
                        "child '{child_name}' of {id} has a stale link"
                    )));
                }
                if let ObjectBody::AttributeMatrix { tuple_shape } = &obj.body {
                    let actual = child.body.tuple_shape().unwrap_or_default();
                    if actual != tuple_shape.as_slice() {
                        return Err(DataError::TupleShapeMismatch {
                            path: self.path_of(*child_id).unwrap_or_default(),
                            expected: tuple_shape.clone(),
                            actual: actual.to_vec(),
                        });
                    }
                }
            }

            if let ObjectBody::Geometry(geometry) = &obj.body {
                let element_shape = geometry
                    .element_data()
                    .and_then(|e| self.objects.get(&e))
                    .and_then(|e| e.body.tuple_shape());
                if element_shape.is_some_and(|shape| shape != geometry.element_tuple_shape().as_slice()) {
                    return Err(DataError::Inconsistent(format!(
                        "{id} is sized differently from its element data"
                    )));
                }
            }

            if self.path_of(*id).is_none() {
                return Err(DataError::Inconsistent(format!("{id} has a cyclic ancestry")));
            }
        }
        Ok(())
    }

    // ------------------------------------------------------------------
    // Internals
    // ------------------------------------------------------------------

    fn check_attach(
        &self,
        parent: &DataPath,
        parent_id: Option<DataId>,
        name: &str,
        body: &ObjectBody,
    ) -> Result<(), DataError> {
        if let Some(pid) = parent_id {
            let parent_obj = self
                .objects
                .get(&pid)
                .ok_or_else(|| DataError::PathNotFound(parent.clone()))?;
            let parent_kind = parent_obj.kind();
            if !parent_kind.is_container() {
                return Err(DataError::NotAContainer(parent.clone()));
            }
            if let ObjectBody::AttributeMatrix { tuple_shape } = &parent_obj.body {
                let child_kind = body.kind();
                if !matches!(child_kind, ObjectKind::DataArray | ObjectKind::NeighborList) {
                    return Err(DataError::ChildKindNotAllowed {
                        parent: parent.clone(),
                        parent_kind,
                        child: child_kind,
                    });
                }
                let actual = body.tuple_shape().unwrap_or_default();
                if actual != tuple_shape.as_slice() {
                    return Err(DataError::TupleShapeMismatch {
                        path: parent.child(name),
                        expected: tuple_shape.clone(),
                        actual: actual.to_vec(),
                    });
                }
            }
        }
        if self.sibling_exists(parent_id, name) {
            return Err(DataError::NameCollision {
                parent: parent.clone(),
                name: name.to_string(),
            });
        }
        Ok(())
    }

    fn sibling_exists(&self, parent: Option<DataId>, name: &str) -> bool {
        match parent {
            None => self.roots.contains_key(name),
            Some(pid) => self
                .objects
                .get(&pid)
                .is_some_and(|p| p.children.contains_key(name)),
        }
    }

    fn attach(&mut self, parent: Option<DataId>, name: String, id: DataId) {
        match parent {
            None => {
                self.roots.insert(name, id);
            }
            Some(pid) => {
                if let Some(p) = self.objects.get_mut(&pid) {
                    p.children.insert(name, id);
                }
            }
        }
    }

    fn detach_name(&mut self, parent: Option<DataId>, name: &str) {
        match parent {
            None => {
                self.roots.remove(name);
            }
            Some(pid) => {
                if let Some(p) = self.objects.get_mut(&pid) {
                    p.children.remove(name);
                }
            }
        }
    }

    /// Unlink `id` from its parent and clear geometry references to it
    fn detach(&mut self, id: DataId) {
        let Some((parent, name)) = self.objects.get(&id).map(|o| (o.parent, o.name.clone())) else {
            return;
        };
        self.detach_name(parent, &name);
        let Some(pid) = parent else {
            return;
        };
        if let Some(ObjectBody::Geometry(geometry)) = self.objects.get_mut(&pid).map(|p| &mut p.body) {
            let slots = match geometry {
                Geometry::Image { cell_data, .. } => vec![cell_data],
                Geometry::Vertex {
                    vertex_data,
                    shared_vertex_list,
                    ..
                } => vec![vertex_data, shared_vertex_list],
            };
            for slot in slots {
                if *slot == Some(id) {
                    *slot = None;
                }
            }
        }
    }
}

fn split(path: &DataPath) -> Result<(DataPath, &str), DataError> {
    match (path.parent(), path.name()) {
        (Some(parent), Some(name)) => Ok((parent, name)),
        _ => Err(DataError::RootOperation),
    }
}

fn wrong_kind(path: &DataPath, expected: ObjectKind, actual: ObjectKind) -> DataError {
    DataError::WrongObjectKind {
        path: path.clone(),
        expected,
        actual,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::DataType;
    use pretty_assertions::assert_eq;

    fn p(s: &str) -> DataPath {
        s.parse().unwrap()
    }

    fn am(shape: &[usize]) -> ObjectBody {
        ObjectBody::AttributeMatrix {
            tuple_shape: shape.to_vec(),
        }
    }

    fn array(dt: DataType, tuples: &[usize], comps: &[usize]) -> ObjectBody {
        ObjectBody::Array(AnyArray::new(dt, tuples.to_vec(), comps.to_vec(), true).unwrap())
    }

    fn sample() -> DataStructure {
        let mut ds = DataStructure::new();
        ds.create(&p("DC"), ObjectBody::Group).unwrap();
        ds.create(&p("DC/Feature Data"), am(&[3])).unwrap();
        ds.create(&p("DC/Feature Data/Quats"), array(DataType::Float32, &[3], &[4]))
            .unwrap();
        ds.create(&p("DC/Feature Data/Phases"), array(DataType::Int32, &[3], &[1]))
            .unwrap();
        ds
    }

    #[test]
    fn create_and_resolve() {
        let ds = sample();
        assert_eq!(ds.len(), 4);
        let id = ds.id_of(&p("DC/Feature Data/Quats")).unwrap();
        assert_eq!(ds.path_of(id).unwrap(), p("DC/Feature Data/Quats"));
        assert_eq!(ds.kind_of(&p("DC")).unwrap(), ObjectKind::DataGroup);
        assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn create_requires_parent() {
        let mut ds = DataStructure::new();
        let err = ds.create(&p("A/B"), ObjectBody::Group).unwrap_err();
        assert!(matches!(err, DataError::ParentNotFound { .. }));
    }

    #[test]
    fn create_rejects_collision_and_bad_names() {
        let mut ds = sample();
        assert!(matches!(
            ds.create(&p("DC"), ObjectBody::Group),
            Err(DataError::NameCollision { .. })
        ));
        assert!(matches!(
            ds.insert(&p("DC"), "  ", ObjectBody::Group),
            Err(DataError::InvalidName(_))
        ));
        assert!(matches!(
            ds.create(&DataPath::root(), ObjectBody::Group),
            Err(DataError::RootOperation)
        ));
    }

    #[test]
    fn attribute_matrix_rejects_mismatched_tuples() {
        let mut ds = sample();
        let err = ds
            .create(&p("DC/Feature Data/Bad"), array(DataType::Int32, &[4], &[1]))
            .unwrap_err();
        assert_eq!(err.code(), -107);
        let err = ds.create(&p("DC/Feature Data/G"), ObjectBody::Group).unwrap_err();
        assert!(matches!(err, DataError::ChildKindNotAllowed { .. }));
    }

    #[test]
    fn leaves_are_not_containers() {
        let mut ds = sample();
        let err = ds
            .create(&p("DC/Feature Data/Quats/x"), ObjectBody::Group)
            .unwrap_err();
        assert!(matches!(err, DataError::NotAContainer(_)));
    }

    #[test]
    fn typed_access_has_no_widening() {
        let ds = sample();
        assert!(ds.array::<f32>(&p("DC/Feature Data/Quats")).is_ok());
        let err = ds.array::<f32>(&p("DC/Feature Data/Phases")).unwrap_err();
        assert_eq!(
            err,
            DataError::TypeMismatch {
                path: p("DC/Feature Data/Phases"),
                requested: DataType::Float32,
                actual: DataType::Int32,
            }
        );
        assert!(err.to_string().contains("int32"));
        assert!(err.to_string().contains("float32"));
        assert!(matches!(
            ds.array::<f32>(&p("DC")),
            Err(DataError::WrongObjectKind { .. })
        ));
        assert!(matches!(
            ds.array::<f32>(&p("DC/Nope")),
            Err(DataError::PathNotFound(_))
        ));
    }

    #[test]
    fn array_mut_writes_through() {
        let mut ds = sample();
        ds.array_mut::<i32>(&p("DC/Feature Data/Phases"))
            .unwrap()
            .set(2, 5)
            .unwrap();
        assert_eq!(ds.array::<i32>(&p("DC/Feature Data/Phases")).unwrap().get(2).unwrap(), 5);
    }

    #[test]
    fn remove_is_recursive() {
        let mut ds = sample();
        assert_eq!(ds.remove(&p("DC/Feature Data")).unwrap(), 3);
        assert_eq!(ds.len(), 1);
        assert!(!ds.contains(&p("DC/Feature Data/Quats")));
        assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn rename_collision_leaves_tree_unchanged() {
        let mut ds = sample();
        let before = ds.clone();
        let err = ds.rename(&p("DC/Feature Data/Quats"), "Phases").unwrap_err();
        assert!(matches!(err, DataError::NameCollision { .. }));
        assert_eq!(ds, before);

        ds.rename(&p("DC/Feature Data/Quats"), "AvgQuats").unwrap();
        assert!(ds.contains(&p("DC/Feature Data/AvgQuats")));
        assert!(!ds.contains(&p("DC/Feature Data/Quats")));
        assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn move_rejects_cycles() {
        let mut ds = sample();
        ds.create(&p("DC/Sub"), ObjectBody::Group).unwrap();
        let err = ds.move_to(&p("DC"), &p("DC/Sub")).unwrap_err();
        assert!(matches!(err, DataError::CycleDetected { .. }));
        let err = ds.move_to(&p("DC"), &p("DC")).unwrap_err();
        assert!(matches!(err, DataError::CycleDetected { .. }));
    }

    #[test]
    fn move_reparents() {
        let mut ds = sample();
        ds.create(&p("Other"), ObjectBody::Group).unwrap();
        ds.move_to(&p("DC/Feature Data"), &p("Other")).unwrap();
        assert!(ds.contains(&p("Other/Feature Data/Quats")));
        ds.move_to(&p("Other/Feature Data"), &DataPath::root()).unwrap();
        assert!(ds.contains(&p("Feature Data/Phases")));
        assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn move_into_matrix_checks_tuples() {
        let mut ds = sample();
        ds.create(&p("Loose"), array(DataType::UInt8, &[2], &[1])).unwrap();
        let err = ds.move_to(&p("Loose"), &p("DC/Feature Data")).unwrap_err();
        assert!(matches!(err, DataError::TupleShapeMismatch { .. }));
        assert!(ds.contains(&p("Loose")));
    }

    #[test]
    fn resize_matrix_retuples_children() {
        let mut ds = sample();
        ds.resize_attribute_matrix(&p("DC/Feature Data"), vec![5]).unwrap();
        assert_eq!(ds.tuple_count(&p("DC/Feature Data/Quats")).unwrap(), 5);
        assert_eq!(ds.array::<f32>(&p("DC/Feature Data/Quats")).unwrap().len(), 20);
        assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn tuple_validation_lists_every_path() {
        let mut ds = sample();
        ds.create(&p("Loose"), array(DataType::UInt8, &[2], &[1])).unwrap();
        assert_eq!(
            ds.validate_number_of_tuples(&[p("DC/Feature Data/Quats"), p("DC/Feature Data/Phases")])
                .unwrap(),
            3
        );
        let err = ds
            .validate_number_of_tuples(&[p("DC/Feature Data/Quats"), p("Loose")])
            .unwrap_err();
        assert_eq!(
            err,
            DataError::TupleCountMismatch(vec![(p("DC/Feature Data/Quats"), 3), (p("Loose"), 2)])
        );
        assert!(matches!(
            ds.validate_number_of_tuples(&[p("Missing")]),
            Err(DataError::PathNotFound(_))
        ));
    }

    #[test]
    fn image_geometry_owns_cell_data() {
        let mut ds = DataStructure::new();
        ds.create_image_geometry(&p("Image"), [4, 3, 2], [1.0; 3], [0.0; 3], "Cell Data")
            .unwrap();
        assert_eq!(ds.attribute_matrix(&p("Image/Cell Data")).unwrap(), &[2, 3, 4]);
        let Geometry::Image { cell_data, .. } = ds.geometry(&p("Image")).unwrap() else {
            panic!("expected image geometry");
        };
        assert_eq!(*cell_data, ds.id_of(&p("Image/Cell Data")));

        ds.remove(&p("Image/Cell Data")).unwrap();
        let Geometry::Image { cell_data, .. } = ds.geometry(&p("Image")).unwrap() else {
            panic!("expected image geometry");
        };
        assert!(cell_data.is_none());
    }

    #[test]
    fn resizing_cell_data_resizes_the_image() {
        let mut ds = DataStructure::new();
        ds.create_image_geometry(&p("Image"), [4, 3, 2], [1.0; 3], [0.0; 3], "Cell Data")
            .unwrap();
        ds.create(&p("Image/Cell Data/Phases"), array(DataType::Int32, &[2, 3, 4], &[1]))
            .unwrap();
        ds.resize_attribute_matrix(&p("Image/Cell Data"), vec![1, 5, 6]).unwrap();
        let Geometry::Image { dimensions, .. } = ds.geometry(&p("Image")).unwrap() else {
            panic!("expected image geometry");
        };
        assert_eq!(*dimensions, [6, 5, 1]);
        assert_eq!(ds.tuple_count(&p("Image/Cell Data/Phases")).unwrap(), 30);
        assert!(ds.validate_invariants().is_ok());

        let err = ds
            .resize_attribute_matrix(&p("Image/Cell Data"), vec![30])
            .unwrap_err();
        assert_eq!(err.code(), -115);
        assert_eq!(ds.attribute_matrix(&p("Image/Cell Data")).unwrap(), &[1, 5, 6]);
    }

    #[test]
    fn resizing_vertex_data_resizes_the_shared_list() {
        let mut ds = DataStructure::new();
        ds.create_vertex_geometry(&p("Points"), 7, "Vertex Data", "SharedVertexList", true)
            .unwrap();
        ds.resize_attribute_matrix(&p("Points/Vertex Data"), vec![9]).unwrap();
        assert_eq!(ds.tuple_count(&p("Points/SharedVertexList")).unwrap(), 9);
        assert_eq!(ds.geometry(&p("Points")).unwrap().element_count(), 9);
        assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn resizing_a_detached_matrix_leaves_the_geometry() {
        let mut ds = DataStructure::new();
        ds.create_image_geometry(&p("Image"), [2, 2, 1], [1.0; 3], [0.0; 3], "Cell Data")
            .unwrap();
        ds.move_to(&p("Image/Cell Data"), &DataPath::default()).unwrap();
        ds.resize_attribute_matrix(&p("Cell Data"), vec![7]).unwrap();
        assert_eq!(ds.geometry(&p("Image")).unwrap().element_count(), 4);
        assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn overflowing_shapes_are_rejected() {
        let huge = 1_usize << 40;
        let mut ds = sample();
        let err = ds
            .create(&p("Big"), am(&[huge, huge]))
            .unwrap_err();
        assert_eq!(err.code(), -111);
        assert!(!ds.contains(&p("Big")));

        let before = ds.clone();
        let err = ds
            .resize_attribute_matrix(&p("DC/Feature Data"), vec![huge, huge])
            .unwrap_err();
        assert_eq!(err.code(), -111);
        assert_eq!(ds, before);

        // Tuples alone fit, tuples × 4 components do not
        let err = ds
            .resize_attribute_matrix(&p("DC/Feature Data"), vec![usize::MAX / 2])
            .unwrap_err();
        assert_eq!(err.code(), -111);
        assert_eq!(ds, before);

        assert!(ds
            .create_image_geometry(&p("Image"), [huge, huge, 1], [1.0; 3], [0.0; 3], "Cell Data")
            .is_err());
        assert!(!ds.contains(&p("Image")));
    }

    #[test]
    fn geometry_errors_name_the_requested_kind() {
        let mut ds = sample();
        ds.create_vertex_geometry(&p("Points"), 3, "Vertex Data", "SharedVertexList", false)
            .unwrap();
        assert_eq!(
            ds.geometry(&p("DC")).unwrap_err(),
            DataError::NotAGeometry {
                path: p("DC"),
                actual: ObjectKind::DataGroup,
            }
        );
        assert!(ds.geometry_of_kind(&p("Points"), ObjectKind::VertexGeometry).is_ok());
        assert_eq!(
            ds.geometry_of_kind(&p("Points"), ObjectKind::ImageGeometry).unwrap_err(),
            DataError::WrongObjectKind {
                path: p("Points"),
                expected: ObjectKind::ImageGeometry,
                actual: ObjectKind::VertexGeometry,
            }
        );
        let err = ds
            .geometry_of_kind(&p("DC"), ObjectKind::VertexGeometry)
            .unwrap_err();
        assert!(err.to_string().contains("expected vertex geometry"));
    }

    #[test]
    fn vertex_geometry_layout() {
        let mut ds = DataStructure::new();
        ds.create_vertex_geometry(&p("Points"), 7, "Vertex Data", "SharedVertexList", false)
            .unwrap();
        let coords = ds.any_array(&p("Points/SharedVertexList")).unwrap();
        assert_eq!(coords.data_type(), DataType::Float32);
        assert_eq!(coords.component_shape(), &[3]);
        assert!(!coords.is_allocated());
        assert_eq!(ds.tuple_count(&p("Points/Vertex Data")).unwrap(), 7);
    }

    #[test]
    fn iter_paths_is_depth_first() {
        let ds = sample();
        let paths: Vec<String> = ds.iter_paths().into_iter().map(|(p, _)| p.to_string()).collect();
        assert_eq!(
            paths,
            vec![
                "DC",
                "DC/Feature Data",
                "DC/Feature Data/Phases",
                "DC/Feature Data/Quats"
            ]
        );
        assert_eq!(ds.child_names(&DataPath::root()).unwrap(), vec!["DC".to_string()]);
    }
}
