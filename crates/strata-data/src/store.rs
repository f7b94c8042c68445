//! Typed tuple/component storage
//!
//! [`DataStore<T>`] backs every data array, [`ListStore<T>`] backs every
//! neighbor list. Both may be *shape-only*: they carry a tuple shape but no
//! buffer, which is how structural changes are previewed without allocating.

use crate::data_type::Element;
use serde::{Deserialize, Serialize};

/// Product of a shape; the empty shape has zero elements
///
/// Saturates at `usize::MAX`. Stores never hold such a shape since every
/// constructor goes through [`checked_shape_product`].
#[inline]
#[must_use]
pub fn shape_product(shape: &[usize]) -> usize {
    checked_shape_product(shape).unwrap_or(usize::MAX)
}

/// Product of a shape, `None` on overflow; the empty shape has zero elements
#[must_use]
pub fn checked_shape_product(shape: &[usize]) -> Option<usize> {
    if shape.is_empty() {
        return Some(0);
    }
    shape.iter().try_fold(1_usize, |acc, &dim| acc.checked_mul(dim))
}

/// Element count of a tuple and component shape pair
///
/// # Errors
/// [`StoreError::ShapeOverflow`] when the count does not fit in `usize`.
pub fn element_count(tuple_shape: &[usize], component_shape: &[usize]) -> Result<usize, StoreError> {
    checked_shape_product(tuple_shape)
        .zip(checked_shape_product(component_shape))
        .and_then(|(tuples, components)| tuples.checked_mul(components))
        .ok_or_else(|| StoreError::ShapeOverflow {
            shape: tuple_shape.iter().chain(component_shape).copied().collect(),
        })
}

/// Errors from element access on a store
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error, Serialize, Deserialize)]
pub enum StoreError {
    /// Flat index beyond `len()`
    #[error("index {index} out of range for store of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    /// Tuple index beyond `number_of_tuples()`
    #[error("tuple {tuple} out of range for {tuples} tuples")]
    TupleOutOfRange { tuple: usize, tuples: usize },

    /// Component index beyond `number_of_components()`
    #[error("component {component} out of range for {components} components")]
    ComponentOutOfRange { component: usize, components: usize },

    /// Store is shape-only
    #[error("store has no allocated buffer")]
    NotAllocated,

    /// Supplied buffer does not match the shape
    #[error("expected {expected} values, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    /// Element count of the shape does not fit in `usize`
    #[error("shape {shape:?} overflows the addressable element count")]
    ShapeOverflow { shape: Vec<usize> },
}

/// Tuple-major buffer of `T` with independent tuple and component shapes
#[derive(Debug, Clone, PartialEq)]
pub struct DataStore<T: Element> {
    tuple_shape: Vec<usize>,
    component_shape: Vec<usize>,
    buffer: Option<Vec<T>>,
}

impl<T: Element> DataStore<T> {
    /// Allocated store filled with `T::default()`
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`] when the shapes overflow.
    pub fn new(tuple_shape: Vec<usize>, component_shape: Vec<usize>) -> Result<Self, StoreError> {
        Self::filled(tuple_shape, component_shape, T::default())
    }

    /// Allocated store filled with `value`
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`] when the shapes overflow.
    pub fn filled(
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
        value: T,
    ) -> Result<Self, StoreError> {
        let len = element_count(&tuple_shape, &component_shape)?;
        Ok(Self {
            tuple_shape,
            component_shape,
            buffer: Some(vec![value; len]),
        })
    }

    /// Shape-only store
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`] when the shapes overflow.
    pub fn shape_only(
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
    ) -> Result<Self, StoreError> {
        element_count(&tuple_shape, &component_shape)?;
        Ok(Self {
            tuple_shape,
            component_shape,
            buffer: None,
        })
    }

    /// Wrap an existing buffer
    ///
    /// # Errors
    /// [`StoreError::LengthMismatch`] when `values` does not match the shapes.
    pub fn from_vec(
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
        values: Vec<T>,
    ) -> Result<Self, StoreError> {
        let expected = element_count(&tuple_shape, &component_shape)?;
        if values.len() != expected {
            return Err(StoreError::LengthMismatch {
                expected,
                actual: values.len(),
            });
        }
        Ok(Self {
            tuple_shape,
            component_shape,
            buffer: Some(values),
        })
    }

    #[inline]
    #[must_use]
    pub fn tuple_shape(&self) -> &[usize] {
        &self.tuple_shape
    }

    #[inline]
    #[must_use]
    pub fn component_shape(&self) -> &[usize] {
        &self.component_shape
    }

    #[inline]
    #[must_use]
    pub fn number_of_tuples(&self) -> usize {
        shape_product(&self.tuple_shape)
    }

    #[inline]
    #[must_use]
    pub fn number_of_components(&self) -> usize {
        shape_product(&self.component_shape)
    }

    /// Total element count (tuples × components), whether or not allocated
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.number_of_tuples() * self.number_of_components()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[inline]
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.buffer.is_some()
    }

    /// Allocate a shape-only store with default values; no-op otherwise
    pub fn allocate(&mut self) {
        if self.buffer.is_none() {
            self.buffer = Some(vec![T::default(); self.len()]);
        }
    }

    /// Get element by flat index
    ///
    /// # Errors
    /// Shape-only store or index out of range.
    pub fn get(&self, index: usize) -> Result<T, StoreError> {
        let buffer = self.buffer()?;
        buffer
            .get(index)
            .copied()
            .ok_or(StoreError::IndexOutOfRange {
                index,
                len: buffer.len(),
            })
    }

    /// Set element by flat index
    ///
    /// # Errors
    /// Shape-only store or index out of range.
    pub fn set(&mut self, index: usize, value: T) -> Result<(), StoreError> {
        let buffer = self.buffer_mut()?;
        let len = buffer.len();
        let slot = buffer
            .get_mut(index)
            .ok_or(StoreError::IndexOutOfRange { index, len })?;
        *slot = value;
        Ok(())
    }

    /// Get one component of one tuple
    ///
    /// # Errors
    /// Shape-only store, tuple or component out of range.
    pub fn get_component(&self, tuple: usize, component: usize) -> Result<T, StoreError> {
        let index = self.flat_index(tuple, component)?;
        self.get(index)
    }

    /// Set one component of one tuple
    ///
    /// # Errors
    /// Shape-only store, tuple or component out of range.
    pub fn set_component(
        &mut self,
        tuple: usize,
        component: usize,
        value: T,
    ) -> Result<(), StoreError> {
        let index = self.flat_index(tuple, component)?;
        self.set(index, value)
    }

    /// All components of one tuple
    ///
    /// # Errors
    /// Shape-only store or tuple out of range.
    pub fn tuple(&self, tuple: usize) -> Result<&[T], StoreError> {
        let range = self.tuple_range(tuple)?;
        Ok(&self.buffer()?[range])
    }

    /// Mutable components of one tuple
    ///
    /// # Errors
    /// Shape-only store or tuple out of range.
    pub fn tuple_mut(&mut self, tuple: usize) -> Result<&mut [T], StoreError> {
        let range = self.tuple_range(tuple)?;
        Ok(&mut self.buffer_mut()?[range])
    }

    /// Whole buffer in tuple-major order
    ///
    /// # Errors
    /// [`StoreError::NotAllocated`] on a shape-only store.
    pub fn as_slice(&self) -> Result<&[T], StoreError> {
        self.buffer().map(Vec::as_slice)
    }

    /// Whole mutable buffer in tuple-major order
    ///
    /// # Errors
    /// [`StoreError::NotAllocated`] on a shape-only store.
    pub fn as_mut_slice(&mut self) -> Result<&mut [T], StoreError> {
        self.buffer_mut().map(Vec::as_mut_slice)
    }

    /// Overwrite every element
    ///
    /// # Errors
    /// [`StoreError::NotAllocated`] on a shape-only store.
    pub fn fill(&mut self, value: T) -> Result<(), StoreError> {
        self.buffer_mut()?.fill(value);
        Ok(())
    }

    /// Change the tuple shape, truncating or extending with `T::default()`
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`]; the store is left unchanged.
    pub fn resize_tuples(&mut self, tuple_shape: Vec<usize>) -> Result<(), StoreError> {
        let len = element_count(&tuple_shape, &self.component_shape)?;
        self.tuple_shape = tuple_shape;
        if let Some(buffer) = self.buffer.as_mut() {
            buffer.resize(len, T::default());
        }
        Ok(())
    }

    fn buffer(&self) -> Result<&Vec<T>, StoreError> {
        self.buffer.as_ref().ok_or(StoreError::NotAllocated)
    }

    fn buffer_mut(&mut self) -> Result<&mut Vec<T>, StoreError> {
        self.buffer.as_mut().ok_or(StoreError::NotAllocated)
    }

    fn flat_index(&self, tuple: usize, component: usize) -> Result<usize, StoreError> {
        let tuples = self.number_of_tuples();
        if tuple >= tuples {
            return Err(StoreError::TupleOutOfRange { tuple, tuples });
        }
        let components = self.number_of_components();
        if component >= components {
            return Err(StoreError::ComponentOutOfRange {
                component,
                components,
            });
        }
        Ok(tuple * components + component)
    }

    fn tuple_range(&self, tuple: usize) -> Result<std::ops::Range<usize>, StoreError> {
        let tuples = self.number_of_tuples();
        if tuple >= tuples {
            return Err(StoreError::TupleOutOfRange { tuple, tuples });
        }
        let components = self.number_of_components();
        Ok(tuple * components..(tuple + 1) * components)
    }
}

/// One variable-length sequence of `T` per tuple
#[derive(Debug, Clone, PartialEq)]
pub struct ListStore<T: Element> {
    tuple_shape: Vec<usize>,
    lists: Option<Vec<Vec<T>>>,
}

impl<T: Element> ListStore<T> {
    /// Allocated store with an empty list per tuple
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`] when the tuple shape overflows.
    pub fn new(tuple_shape: Vec<usize>) -> Result<Self, StoreError> {
        let tuples = element_count(&tuple_shape, &[1])?;
        Ok(Self {
            tuple_shape,
            lists: Some(vec![Vec::new(); tuples]),
        })
    }

    /// Shape-only store
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`] when the tuple shape overflows.
    pub fn shape_only(tuple_shape: Vec<usize>) -> Result<Self, StoreError> {
        element_count(&tuple_shape, &[1])?;
        Ok(Self {
            tuple_shape,
            lists: None,
        })
    }

    /// Wrap existing lists, one per tuple
    ///
    /// # Errors
    /// [`StoreError::LengthMismatch`] when the list count differs from the
    /// tuple count.
    pub fn from_lists(tuple_shape: Vec<usize>, lists: Vec<Vec<T>>) -> Result<Self, StoreError> {
        let expected = element_count(&tuple_shape, &[1])?;
        if lists.len() != expected {
            return Err(StoreError::LengthMismatch {
                expected,
                actual: lists.len(),
            });
        }
        Ok(Self {
            tuple_shape,
            lists: Some(lists),
        })
    }

    #[inline]
    #[must_use]
    pub fn tuple_shape(&self) -> &[usize] {
        &self.tuple_shape
    }

    #[inline]
    #[must_use]
    pub fn number_of_tuples(&self) -> usize {
        shape_product(&self.tuple_shape)
    }

    #[inline]
    #[must_use]
    pub fn is_allocated(&self) -> bool {
        self.lists.is_some()
    }

    pub fn allocate(&mut self) {
        if self.lists.is_none() {
            self.lists = Some(vec![Vec::new(); self.number_of_tuples()]);
        }
    }

    /// List for one tuple
    ///
    /// # Errors
    /// Shape-only store or tuple out of range.
    pub fn list(&self, tuple: usize) -> Result<&[T], StoreError> {
        let tuples = self.number_of_tuples();
        self.lists
            .as_ref()
            .ok_or(StoreError::NotAllocated)?
            .get(tuple)
            .map(Vec::as_slice)
            .ok_or(StoreError::TupleOutOfRange { tuple, tuples })
    }

    /// Mutable list for one tuple
    ///
    /// # Errors
    /// Shape-only store or tuple out of range.
    pub fn list_mut(&mut self, tuple: usize) -> Result<&mut Vec<T>, StoreError> {
        let tuples = self.number_of_tuples();
        self.lists
            .as_mut()
            .ok_or(StoreError::NotAllocated)?
            .get_mut(tuple)
            .ok_or(StoreError::TupleOutOfRange { tuple, tuples })
    }

    /// Replace the list for one tuple
    ///
    /// # Errors
    /// Shape-only store or tuple out of range.
    pub fn set_list(&mut self, tuple: usize, values: Vec<T>) -> Result<(), StoreError> {
        *self.list_mut(tuple)? = values;
        Ok(())
    }

    /// Append one value to a tuple's list
    ///
    /// # Errors
    /// Shape-only store or tuple out of range.
    pub fn push(&mut self, tuple: usize, value: T) -> Result<(), StoreError> {
        self.list_mut(tuple)?.push(value);
        Ok(())
    }

    /// All lists in tuple order
    ///
    /// # Errors
    /// [`StoreError::NotAllocated`] on a shape-only store.
    pub fn lists(&self) -> Result<&[Vec<T>], StoreError> {
        self.lists
            .as_deref()
            .ok_or(StoreError::NotAllocated)
    }

    /// All mutable lists in tuple order
    ///
    /// # Errors
    /// [`StoreError::NotAllocated`] on a shape-only store.
    pub fn lists_mut(&mut self) -> Result<&mut [Vec<T>], StoreError> {
        self.lists
            .as_deref_mut()
            .ok_or(StoreError::NotAllocated)
    }

    /// Replace every list at once
    ///
    /// # Errors
    /// [`StoreError::LengthMismatch`] when the list count differs from the
    /// tuple count.
    pub fn set_lists(&mut self, lists: Vec<Vec<T>>) -> Result<(), StoreError> {
        let expected = self.number_of_tuples();
        if lists.len() != expected {
            return Err(StoreError::LengthMismatch {
                expected,
                actual: lists.len(),
            });
        }
        self.lists = Some(lists);
        Ok(())
    }

    /// Total number of values across all lists (0 when shape-only)
    #[must_use]
    pub fn total_values(&self) -> usize {
        self.lists
            .as_ref()
            .map_or(0, |lists| lists.iter().map(Vec::len).sum())
    }

    /// Change the tuple shape, truncating or extending with empty lists
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`]; the store is left unchanged.
    pub fn resize_tuples(&mut self, tuple_shape: Vec<usize>) -> Result<(), StoreError> {
        let tuples = element_count(&tuple_shape, &[1])?;
        self.tuple_shape = tuple_shape;
        if let Some(lists) = self.lists.as_mut() {
            lists.resize_with(tuples, Vec::new);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn store_new_is_default_filled() {
        let store = DataStore::<f32>::new(vec![2, 3], vec![4]).unwrap();
        assert_eq!(store.number_of_tuples(), 6);
        assert_eq!(store.number_of_components(), 4);
        assert_eq!(store.len(), 24);
        assert!(store.as_slice().unwrap().iter().all(|v| *v == 0.0));
    }

    #[test]
    fn store_empty_shape_has_no_tuples() {
        let store = DataStore::<i32>::new(vec![0], vec![1]).unwrap();
        assert_eq!(store.number_of_tuples(), 0);
        assert!(store.is_empty());
    }

    #[test]
    fn store_component_access() {
        let mut store = DataStore::<i32>::new(vec![3], vec![2]).unwrap();
        store.set_component(1, 1, 42).unwrap();
        assert_eq!(store.get(3).unwrap(), 42);
        assert_eq!(store.tuple(1).unwrap(), &[0, 42]);
    }

    #[test]
    fn store_out_of_range_is_error() {
        let mut store = DataStore::<u8>::new(vec![2], vec![1]).unwrap();
        assert_eq!(
            store.get(2),
            Err(StoreError::IndexOutOfRange { index: 2, len: 2 })
        );
        assert!(matches!(
            store.set_component(0, 1, 1),
            Err(StoreError::ComponentOutOfRange { .. })
        ));
        assert!(matches!(
            store.tuple(5),
            Err(StoreError::TupleOutOfRange { tuple: 5, tuples: 2 })
        ));
    }

    #[test]
    fn store_shape_only_rejects_access() {
        let mut store = DataStore::<f64>::shape_only(vec![10], vec![3]).unwrap();
        assert!(!store.is_allocated());
        assert_eq!(store.len(), 30);
        assert_eq!(store.get(0), Err(StoreError::NotAllocated));
        store.allocate();
        assert_eq!(store.get(29).unwrap(), 0.0);
    }

    #[test]
    fn store_from_vec_checks_length() {
        let err = DataStore::from_vec(vec![2], vec![2], vec![1u16, 2, 3]).unwrap_err();
        assert_eq!(err, StoreError::LengthMismatch { expected: 4, actual: 3 });
    }

    #[test]
    fn store_resize_tuples() {
        let mut store = DataStore::from_vec(vec![2], vec![2], vec![1, 2, 3, 4]).unwrap();
        store.resize_tuples(vec![3]).unwrap();
        assert_eq!(store.as_slice().unwrap(), &[1, 2, 3, 4, 0, 0]);
        store.resize_tuples(vec![1]).unwrap();
        assert_eq!(store.as_slice().unwrap(), &[1, 2]);
    }

    #[test]
    fn list_store_push_and_read() {
        let mut lists = ListStore::<i32>::new(vec![3]).unwrap();
        lists.push(1, 7).unwrap();
        lists.push(1, 9).unwrap();
        assert_eq!(lists.list(1).unwrap(), &[7, 9]);
        assert!(lists.list(0).unwrap().is_empty());
        assert_eq!(lists.total_values(), 2);
        assert!(lists.push(3, 0).is_err());
    }

    #[test]
    fn list_store_resize() {
        let mut lists = ListStore::from_lists(vec![2], vec![vec![1.0f32], vec![2.0, 3.0]]).unwrap();
        lists.resize_tuples(vec![1]).unwrap();
        assert_eq!(lists.number_of_tuples(), 1);
        assert_eq!(lists.total_values(), 1);
        lists.resize_tuples(vec![3]).unwrap();
        assert!(lists.list(2).unwrap().is_empty());
    }

    #[test]
    fn overflowing_shapes_are_errors() {
        let huge = 1_usize << 40;
        assert_eq!(checked_shape_product(&[huge, huge]), None);
        assert_eq!(checked_shape_product(&[]), Some(0));
        assert_eq!(checked_shape_product(&[3, 4]), Some(12));
        assert!(matches!(
            DataStore::<u8>::new(vec![huge, huge], vec![1]),
            Err(StoreError::ShapeOverflow { .. })
        ));
        assert!(matches!(
            DataStore::<u8>::shape_only(vec![huge], vec![huge]),
            Err(StoreError::ShapeOverflow { .. })
        ));
        assert!(matches!(
            ListStore::<i32>::shape_only(vec![huge, huge]),
            Err(StoreError::ShapeOverflow { .. })
        ));
    }

    #[test]
    fn overflowing_resize_leaves_store_unchanged() {
        let huge = 1_usize << 40;
        let mut store = DataStore::from_vec(vec![2], vec![1], vec![5_i8, 6]).unwrap();
        assert!(store.resize_tuples(vec![huge, huge]).is_err());
        assert_eq!(store.tuple_shape(), &[2]);
        assert_eq!(store.as_slice().unwrap(), &[5, 6]);

        let mut lists = ListStore::<u32>::new(vec![2]).unwrap();
        assert!(lists.resize_tuples(vec![huge, huge]).is_err());
        assert_eq!(lists.number_of_tuples(), 2);
    }
}
