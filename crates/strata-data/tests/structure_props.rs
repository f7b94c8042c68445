use proptest::prelude::*;
use strata_data::{AnyArray, DataError, DataPath, DataStructure, DataType, ObjectBody};

fn p(s: &str) -> DataPath {
    s.parse().unwrap()
}

/// Matrix with a 4-component f32 array and a 1-component i32 array.
fn quats_and_phases(tuples: usize) -> DataStructure {
    let mut ds = DataStructure::new();
    ds.create(&p("DC"), ObjectBody::Group).unwrap();
    ds.create(
        &p("DC/Feature Data"),
        ObjectBody::AttributeMatrix {
            tuple_shape: vec![tuples],
        },
    )
    .unwrap();
    ds.create(
        &p("DC/Feature Data/AvgQuats"),
        ObjectBody::Array(AnyArray::new(DataType::Float32, vec![tuples], vec![4], true).unwrap()),
    )
    .unwrap();
    ds.create(
        &p("DC/Feature Data/Phases"),
        ObjectBody::Array(AnyArray::new(DataType::Int32, vec![tuples], vec![1], true).unwrap()),
    )
    .unwrap();
    ds
}

#[test]
fn equal_tuple_counts_pass_and_shrinking_one_fails() {
    let mut ds = quats_and_phases(10);
    let paths = [p("DC/Feature Data/AvgQuats"), p("DC/Feature Data/Phases")];
    assert_eq!(ds.validate_number_of_tuples(&paths).unwrap(), 10);

    // Detach the phases array from the matrix so it can be shrunk on its own.
    ds.move_to(&p("DC/Feature Data/Phases"), &p("DC")).unwrap();
    ds.any_array_mut(&p("DC/Phases")).unwrap().resize_tuples(vec![9]).unwrap();
    let err = ds
        .validate_number_of_tuples(&[p("DC/Feature Data/AvgQuats"), p("DC/Phases")])
        .unwrap_err();
    assert!(matches!(err, DataError::TupleCountMismatch(ref counts) if counts.len() == 2));
    assert!(err.to_string().contains("'DC/Phases' = 9"));
}

proptest! {
    #[test]
    fn prop_matrix_children_share_tuple_count(
        tuples in 0usize..50,
        resized in 0usize..50,
        comps in 1usize..5,
    ) {
        let mut ds = quats_and_phases(tuples);
        ds.create(
            &p("DC/Feature Data/Extra"),
            ObjectBody::Array(AnyArray::new(DataType::UInt8, vec![tuples], vec![comps], true).unwrap()),
        )
        .unwrap();
        ds.resize_attribute_matrix(&p("DC/Feature Data"), vec![resized]).unwrap();

        for name in ds.child_names(&p("DC/Feature Data")).unwrap() {
            let path = p("DC/Feature Data").child(name);
            prop_assert_eq!(ds.tuple_count(&path).unwrap(), resized);
            let array = ds.any_array(&path).unwrap();
            prop_assert_eq!(array.len(), resized * array.number_of_components());
        }
        prop_assert!(ds.validate_invariants().is_ok());
    }

    #[test]
    fn prop_rename_collision_leaves_tree_unchanged(
        names in proptest::collection::btree_set("[A-Za-z][A-Za-z0-9 ]{0,8}", 2..6),
    ) {
        let names: Vec<String> = names.into_iter().collect();
        let mut ds = DataStructure::new();
        for name in &names {
            ds.insert(&DataPath::root(), name, ObjectBody::Group).unwrap();
        }
        let before = ds.clone();
        let err = ds.rename(&DataPath::single(names[0].clone()), &names[1]).unwrap_err();
        let is_collision = matches!(err, DataError::NameCollision { .. });
        prop_assert!(is_collision);
        prop_assert_eq!(ds, before);
    }

    #[test]
    fn prop_every_created_path_resolves(depth in 1usize..8) {
        let mut ds = DataStructure::new();
        let mut path = DataPath::root();
        for level in 0..depth {
            path = path.child(format!("Level {level}"));
            ds.create(&path, ObjectBody::Group).unwrap();
        }
        let id = ds.id_of(&path).unwrap();
        prop_assert_eq!(ds.path_of(id).unwrap(), path);
        prop_assert_eq!(ds.iter_paths().len(), depth);
    }
}
