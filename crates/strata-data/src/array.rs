//! Type-erased arrays and neighbor lists

use crate::data_type::{DataType, Element};
use crate::store::{DataStore, ListStore, StoreError};

/// [`DataStore`] of any element kind
#[derive(Debug, Clone, PartialEq)]
pub enum AnyArray {
    Int8(DataStore<i8>),
    UInt8(DataStore<u8>),
    Int16(DataStore<i16>),
    UInt16(DataStore<u16>),
    Int32(DataStore<i32>),
    UInt32(DataStore<u32>),
    Int64(DataStore<i64>),
    UInt64(DataStore<u64>),
    Float32(DataStore<f32>),
    Float64(DataStore<f64>),
    Boolean(DataStore<bool>),
}

/// [`ListStore`] of any element kind
#[derive(Debug, Clone, PartialEq)]
pub enum AnyList {
    Int8(ListStore<i8>),
    UInt8(ListStore<u8>),
    Int16(ListStore<i16>),
    UInt16(ListStore<u16>),
    Int32(ListStore<i32>),
    UInt32(ListStore<u32>),
    Int64(ListStore<i64>),
    UInt64(ListStore<u64>),
    Float32(ListStore<f32>),
    Float64(ListStore<f64>),
    Boolean(ListStore<bool>),
}

/// Run `$body` with `$s` bound to the inner store, whatever its kind
macro_rules! dispatch {
    ($kind:ident, $value:expr, $s:ident => $body:expr) => {
        match $value {
            $kind::Int8($s) => $body,
            $kind::UInt8($s) => $body,
            $kind::Int16($s) => $body,
            $kind::UInt16($s) => $body,
            $kind::Int32($s) => $body,
            $kind::UInt32($s) => $body,
            $kind::Int64($s) => $body,
            $kind::UInt64($s) => $body,
            $kind::Float32($s) => $body,
            $kind::Float64($s) => $body,
            $kind::Boolean($s) => $body,
        }
    };
}

/// Build a value of a generic constructor for a runtime [`DataType`]
macro_rules! for_data_type {
    ($dt:expr, $ctor:ident $(, $arg:expr)*) => {
        match $dt {
            DataType::Int8 => $ctor::<i8>($($arg),*),
            DataType::UInt8 => $ctor::<u8>($($arg),*),
            DataType::Int16 => $ctor::<i16>($($arg),*),
            DataType::UInt16 => $ctor::<u16>($($arg),*),
            DataType::Int32 => $ctor::<i32>($($arg),*),
            DataType::UInt32 => $ctor::<u32>($($arg),*),
            DataType::Int64 => $ctor::<i64>($($arg),*),
            DataType::UInt64 => $ctor::<u64>($($arg),*),
            DataType::Float32 => $ctor::<f32>($($arg),*),
            DataType::Float64 => $ctor::<f64>($($arg),*),
            DataType::Boolean => $ctor::<bool>($($arg),*),
        }
    };
}

fn new_array<T: Element>(
    tuple_shape: Vec<usize>,
    component_shape: Vec<usize>,
    allocate: bool,
) -> Result<AnyArray, StoreError> {
    let store = if allocate {
        DataStore::new(tuple_shape, component_shape)?
    } else {
        DataStore::shape_only(tuple_shape, component_shape)?
    };
    Ok(T::wrap_array(store))
}

fn new_list<T: Element>(tuple_shape: Vec<usize>, allocate: bool) -> Result<AnyList, StoreError> {
    let store = if allocate {
        ListStore::new(tuple_shape)?
    } else {
        ListStore::shape_only(tuple_shape)?
    };
    Ok(T::wrap_list(store))
}

impl AnyArray {
    /// New array of a runtime kind; shape-only unless `allocate`
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`] when the shapes overflow.
    pub fn new(
        data_type: DataType,
        tuple_shape: Vec<usize>,
        component_shape: Vec<usize>,
        allocate: bool,
    ) -> Result<Self, StoreError> {
        for_data_type!(data_type, new_array, tuple_shape, component_shape, allocate)
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        fn kind<T: Element>(_: &DataStore<T>) -> DataType {
            T::DATA_TYPE
        }
        dispatch!(AnyArray, self, s => kind(s))
    }

    #[must_use]
    pub fn tuple_shape(&self) -> &[usize] {
        dispatch!(AnyArray, self, s => s.tuple_shape())
    }

    #[must_use]
    pub fn component_shape(&self) -> &[usize] {
        dispatch!(AnyArray, self, s => s.component_shape())
    }

    #[must_use]
    pub fn number_of_tuples(&self) -> usize {
        dispatch!(AnyArray, self, s => s.number_of_tuples())
    }

    #[must_use]
    pub fn number_of_components(&self) -> usize {
        dispatch!(AnyArray, self, s => s.number_of_components())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        dispatch!(AnyArray, self, s => s.len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        dispatch!(AnyArray, self, s => s.is_allocated())
    }

    pub fn allocate(&mut self) {
        dispatch!(AnyArray, self, s => s.allocate());
    }

    /// # Errors
    /// [`StoreError::ShapeOverflow`]; the array is left unchanged.
    pub fn resize_tuples(&mut self, tuple_shape: Vec<usize>) -> Result<(), StoreError> {
        dispatch!(AnyArray, self, s => s.resize_tuples(tuple_shape))
    }

    /// Element at a flat index widened to `f64`
    #[must_use]
    pub fn value_as_f64(&self, index: usize) -> Option<f64> {
        dispatch!(AnyArray, self, s => s.get(index).ok().map(Element::to_f64))
    }

    /// Typed view, `None` if `T` is not this array's kind
    #[must_use]
    pub fn downcast_ref<T: Element>(&self) -> Option<&DataStore<T>> {
        T::array_ref(self)
    }

    /// Typed mutable view, `None` if `T` is not this array's kind
    pub fn downcast_mut<T: Element>(&mut self) -> Option<&mut DataStore<T>> {
        T::array_mut(self)
    }
}

impl<T: Element> From<DataStore<T>> for AnyArray {
    fn from(store: DataStore<T>) -> Self {
        T::wrap_array(store)
    }
}

impl AnyList {
    /// New neighbor list of a runtime kind; shape-only unless `allocate`
    ///
    /// # Errors
    /// [`StoreError::ShapeOverflow`] when the tuple shape overflows.
    pub fn new(
        data_type: DataType,
        tuple_shape: Vec<usize>,
        allocate: bool,
    ) -> Result<Self, StoreError> {
        for_data_type!(data_type, new_list, tuple_shape, allocate)
    }

    #[must_use]
    pub fn data_type(&self) -> DataType {
        fn kind<T: Element>(_: &ListStore<T>) -> DataType {
            T::DATA_TYPE
        }
        dispatch!(AnyList, self, s => kind(s))
    }

    #[must_use]
    pub fn tuple_shape(&self) -> &[usize] {
        dispatch!(AnyList, self, s => s.tuple_shape())
    }

    #[must_use]
    pub fn number_of_tuples(&self) -> usize {
        dispatch!(AnyList, self, s => s.number_of_tuples())
    }

    #[must_use]
    pub fn is_allocated(&self) -> bool {
        dispatch!(AnyList, self, s => s.is_allocated())
    }

    #[must_use]
    pub fn total_values(&self) -> usize {
        dispatch!(AnyList, self, s => s.total_values())
    }

    pub fn allocate(&mut self) {
        dispatch!(AnyList, self, s => s.allocate());
    }

    /// # Errors
    /// [`StoreError::ShapeOverflow`]; the list is left unchanged.
    pub fn resize_tuples(&mut self, tuple_shape: Vec<usize>) -> Result<(), StoreError> {
        dispatch!(AnyList, self, s => s.resize_tuples(tuple_shape))
    }

    #[must_use]
    pub fn downcast_ref<T: Element>(&self) -> Option<&ListStore<T>> {
        T::list_ref(self)
    }

    pub fn downcast_mut<T: Element>(&mut self) -> Option<&mut ListStore<T>> {
        T::list_mut(self)
    }
}

impl<T: Element> From<ListStore<T>> for AnyList {
    fn from(store: ListStore<T>) -> Self {
        T::wrap_list(store)
    }
}
