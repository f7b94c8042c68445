//! Testing utilities for Strata workspace
//!
//! Shared test helpers and fixtures.

#![allow(missing_docs)]

use strata_core::{Arguments, Completion, Filter, FilterExt, PreflightResult, Report, RunContext};
use strata_data::{AnyList, DataPath, DataStore, DataStructure, Element, ListStore, ObjectBody};

pub const DATA_CONTAINER: &str = "DataContainer";
pub const FEATURE_DATA: &str = "DataContainer/Feature Data";
pub const AVG_QUATS: &str = "DataContainer/Feature Data/AvgQuats";
pub const PHASES: &str = "DataContainer/Feature Data/Phases";
pub const NEIGHBOR_LIST: &str = "DataContainer/Feature Data/NeighborList";
pub const ENSEMBLE_DATA: &str = "DataContainer/Cell Ensemble Data";
pub const CRYSTAL_STRUCTURES: &str = "DataContainer/Cell Ensemble Data/CrystalStructures";

/// Parse a `/`-separated path
pub fn path(text: &str) -> DataPath {
    text.parse().unwrap()
}

/// Add an allocated array built from `values`
pub fn add_array<T: Element>(
    data: &mut DataStructure,
    at: &str,
    tuple_shape: Vec<usize>,
    component_shape: Vec<usize>,
    values: Vec<T>,
) {
    let store = DataStore::from_vec(tuple_shape, component_shape, values).unwrap();
    data.create(&path(at), ObjectBody::Array(store.into())).unwrap();
}

/// Add an allocated neighbor list
pub fn add_list<T: Element>(data: &mut DataStructure, at: &str, lists: Vec<Vec<T>>) {
    let store = ListStore::from_lists(vec![lists.len()], lists).unwrap();
    data.create(&path(at), ObjectBody::NeighborList(AnyList::from(store)))
        .unwrap();
}

/// `DataContainer` group with an empty `Feature Data` matrix of `features` tuples
pub fn feature_container(features: usize) -> DataStructure {
    let mut data = DataStructure::new();
    data.create(&path(DATA_CONTAINER), ObjectBody::Group).unwrap();
    data.create(
        &path(FEATURE_DATA),
        ObjectBody::AttributeMatrix {
            tuple_shape: vec![features],
        },
    )
    .unwrap();
    data
}

/// Quaternion `[x, y, z, w]` for a rotation of `degrees` about z
pub fn z_rotation(degrees: f32) -> [f32; 4] {
    let half = degrees.to_radians() / 2.0;
    [0.0, 0.0, half.sin(), half.cos()]
}

/// Four features (feature 0 is the unused slot) in two ensembles
///
/// Ensemble 0 is the "unknown" phase, ensemble 1 is cubic. Features 1..=3 sit
/// in phase 1 at 0°, 30° and 50° about z; 1 neighbors 2 and 3, 2 neighbors 1,
/// 3 neighbors 1.
pub fn misorientation_fixture() -> DataStructure {
    let mut data = feature_container(4);
    let quats: Vec<f32> = [0.0, 0.0, 30.0, 50.0]
        .into_iter()
        .flat_map(z_rotation)
        .collect();
    add_array(&mut data, AVG_QUATS, vec![4], vec![4], quats);
    add_array(&mut data, PHASES, vec![4], vec![1], vec![0_i32, 1, 1, 1]);
    add_list(
        &mut data,
        NEIGHBOR_LIST,
        vec![vec![], vec![2_i32, 3], vec![1], vec![1]],
    );
    data.create(
        &path(ENSEMBLE_DATA),
        ObjectBody::AttributeMatrix {
            tuple_shape: vec![2],
        },
    )
    .unwrap();
    add_array(&mut data, CRYSTAL_STRUCTURES, vec![2], vec![1], vec![999_u32, 1]);
    data
}

/// Arguments selecting the fixture arrays for the misorientation filter
pub fn misorientation_args(compute_average: bool) -> Arguments {
    Arguments::new()
        .with("compute_avg_misorientations", compute_average)
        .with("neighbor_list_path", path(NEIGHBOR_LIST))
        .with("avg_quats_path", path(AVG_QUATS))
        .with("feature_phases_path", path(PHASES))
        .with("crystal_structures_path", path(CRYSTAL_STRUCTURES))
        .with("misorientation_list_name", "MisorientationList")
        .with("avg_misorientations_name", "AvgMisorientations")
}

/// Preflight with a fresh context
pub fn preflight(filter: &dyn Filter, data: &DataStructure, args: &Arguments) -> PreflightResult {
    filter.preflight(data, args, &RunContext::new())
}

/// Preflight, apply and execute with a fresh context
pub fn run_filter(
    filter: &dyn Filter,
    data: &mut DataStructure,
    args: &Arguments,
) -> Report<Completion> {
    filter.run(data, args, &RunContext::new())
}

/// Assert the tree audit passes
pub fn assert_consistent(data: &DataStructure) {
    if let Err(e) = data.validate_invariants() {
        panic!("tree invariants violated: {e}");
    }
}
