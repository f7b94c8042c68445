//! Compute Feature Neighbor Misorientations
//!
//! For every feature, the misorientation angle to each of its contiguous
//! neighbors, reduced by the crystal symmetry of the shared ensemble. Pairs in
//! different ensembles, in ensemble 0, or in an unindexed ensemble get
//! [`MISORIENTATION_SENTINEL`].

use crate::orientation::{misorientation_deg, LaueClass, Quat, UNKNOWN_CRYSTAL_STRUCTURE};
use rayon::prelude::*;
use strata_core::legacy::{LegacyConverter, LegacyImporter, Requirement};
use strata_core::{
    Action, Arguments, Completion, Error, Filter, OutputActions, Parameter, Parameters,
    PreflightResult, Report, RunContext,
};
use strata_data::{DataError, DataPath, DataStructure, DataType, StoreError};
use uuid::Uuid;

pub const K_COMPUTE_AVG: &str = "compute_avg_misorientations";
pub const K_NEIGHBOR_LIST: &str = "neighbor_list_path";
pub const K_AVG_QUATS: &str = "avg_quats_path";
pub const K_FEATURE_PHASES: &str = "feature_phases_path";
pub const K_CRYSTAL_STRUCTURES: &str = "crystal_structures_path";
pub const K_MISORIENTATION_LIST_NAME: &str = "misorientation_list_name";
pub const K_AVG_MISORIENTATIONS_NAME: &str = "avg_misorientations_name";

pub const QUATS_NOT_FOUR_COMPONENTS: i32 = -34500;
pub const TUPLE_MISMATCH: i32 = -34501;
pub const UNSUPPORTED_CRYSTAL_STRUCTURE: i32 = -34502;
pub const PHASE_OUT_OF_RANGE: i32 = -34503;
pub const NEIGHBOR_OUT_OF_RANGE: i32 = -34504;

/// Stored for pairs whose misorientation is undefined
pub const MISORIENTATION_SENTINEL: f32 = -100.0;

/// Per-feature neighbor misorientations and their average
#[derive(Debug, Clone, Copy, Default)]
pub struct ComputeMisorientations;

struct Paths {
    neighbors: DataPath,
    quats: DataPath,
    phases: DataPath,
    crystal_structures: DataPath,
    list: DataPath,
    average: Option<DataPath>,
}

impl Paths {
    fn from_args(args: &Arguments) -> Result<Self, Error> {
        let quats = args.get::<DataPath>(K_AVG_QUATS)?;
        let parent = quats.parent().unwrap_or_default();
        let average = if args.get::<bool>(K_COMPUTE_AVG)? {
            Some(parent.child(args.get::<String>(K_AVG_MISORIENTATIONS_NAME)?))
        } else {
            None
        };
        Ok(Self {
            neighbors: args.get::<DataPath>(K_NEIGHBOR_LIST)?,
            phases: args.get::<DataPath>(K_FEATURE_PHASES)?,
            crystal_structures: args.get::<DataPath>(K_CRYSTAL_STRUCTURES)?,
            list: parent.child(args.get::<String>(K_MISORIENTATION_LIST_NAME)?),
            quats,
            average,
        })
    }
}

/// Symmetry of one ensemble
enum Ensemble {
    Unknown,
    Ops(Vec<Quat>),
    Unsupported(u32),
}

impl Ensemble {
    fn from_code(code: u32) -> Self {
        if code == UNKNOWN_CRYSTAL_STRUCTURE {
            return Self::Unknown;
        }
        LaueClass::from_code(code).map_or(Self::Unsupported(code), |class| Self::Ops(class.symmetry_ops()))
    }
}

struct Inputs<'a> {
    quats: &'a [f32],
    phases: &'a [i32],
    ensembles: Vec<Ensemble>,
}

impl Inputs<'_> {
    fn feature_misorientations(&self, feature: usize, neighbors: &[i32]) -> Result<Vec<f32>, Error> {
        neighbors
            .iter()
            .map(|&neighbor| {
                let other = usize::try_from(neighbor)
                    .ok()
                    .filter(|&n| n < self.phases.len())
                    .ok_or_else(|| {
                        Error::execution(
                            NEIGHBOR_OUT_OF_RANGE,
                            format!("feature {feature} lists neighbor {neighbor}, outside 0..{}", self.phases.len()),
                        )
                    })?;
                self.pair(feature, other)
            })
            .collect()
    }

    #[allow(clippy::cast_possible_truncation)]
    fn pair(&self, a: usize, b: usize) -> Result<f32, Error> {
        let phase = self.phases[a];
        if phase <= 0 || phase != self.phases[b] {
            return Ok(MISORIENTATION_SENTINEL);
        }
        let ensemble = usize::try_from(phase)
            .ok()
            .and_then(|p| self.ensembles.get(p))
            .ok_or_else(|| {
                Error::execution(
                    PHASE_OUT_OF_RANGE,
                    format!("feature {a} is in phase {phase}, which has no crystal structure"),
                )
            })?;
        let ops = match ensemble {
            Ensemble::Unknown => return Ok(MISORIENTATION_SENTINEL),
            Ensemble::Unsupported(code) => {
                return Err(Error::execution(
                    UNSUPPORTED_CRYSTAL_STRUCTURE,
                    format!("crystal structure {code} of phase {phase} is not supported"),
                ))
            }
            Ensemble::Ops(ops) => ops,
        };
        let (Some(qa), Some(qb)) = (self.quat(a), self.quat(b)) else {
            return Ok(MISORIENTATION_SENTINEL);
        };
        Ok(misorientation_deg(ops, qa, qb) as f32)
    }

    fn quat(&self, feature: usize) -> Option<Quat> {
        Quat::from_tuple(self.quats.get(feature * 4..feature * 4 + 4)?)
    }
}

fn store_err(path: &DataPath) -> impl Fn(StoreError) -> DataError + '_ {
    move |e| DataError::store(path, e)
}

#[allow(clippy::cast_precision_loss)]
fn average(values: &[f32]) -> f32 {
    let valid: Vec<f32> = values
        .iter()
        .copied()
        .filter(|&v| v != MISORIENTATION_SENTINEL)
        .collect();
    if valid.is_empty() {
        0.0
    } else {
        valid.iter().sum::<f32>() / valid.len() as f32
    }
}

impl ComputeMisorientations {
    pub const UUID: Uuid = Uuid::from_u128(0xecff_ae22_ed76_473f_9c58_7325_5840_c234);

    /// Quaternions have 4 components and every feature array has the same
    /// tuple count
    fn check_feature_arrays(data: &DataStructure, features: &[DataPath], quats: &DataPath) -> Result<(), Error> {
        if data.any_array(quats)?.number_of_components() != 4 {
            return Err(Error::structural(
                QUATS_NOT_FOUR_COMPONENTS,
                "Input Average Quaternions does not have 4 components.",
            ));
        }
        data.validate_number_of_tuples(features).map_err(|e| match e {
            DataError::TupleCountMismatch(_) => Error::structural(
                TUPLE_MISMATCH,
                format!("feature arrays must have equal tuple counts: {e}"),
            ),
            other => other.into(),
        })?;
        Ok(())
    }

    fn plan(data: &DataStructure, args: &Arguments) -> Result<PreflightResult, Error> {
        let paths = Paths::from_args(args)?;
        Self::check_feature_arrays(
            data,
            &[paths.quats.clone(), paths.phases.clone(), paths.neighbors.clone()],
            &paths.quats,
        )?;

        let tuple_shape = data.any_array(&paths.quats)?.tuple_shape().to_vec();
        let mut actions = OutputActions::new();
        if let Some(average) = paths.average {
            actions.push(Action::CreateArray {
                path: average,
                data_type: DataType::Float32,
                tuple_shape: tuple_shape.clone(),
                component_shape: vec![1],
            });
        }
        actions.push(Action::CreateNeighborList {
            path: paths.list,
            data_type: DataType::Float32,
            tuple_shape,
        });
        Ok(PreflightResult::ok(actions))
    }

    fn compute(data: &mut DataStructure, args: &Arguments, ctx: &RunContext) -> Result<Completion, Error> {
        let paths = Paths::from_args(args)?;
        // Inputs and outputs may have been edited since preflight
        let mut features = vec![
            paths.quats.clone(),
            paths.phases.clone(),
            paths.neighbors.clone(),
            paths.list.clone(),
        ];
        features.extend(paths.average.clone());
        Self::check_feature_arrays(data, &features, &paths.quats)?;
        let crystal_structures = data
            .array::<u32>(&paths.crystal_structures)?
            .as_slice()
            .map_err(store_err(&paths.crystal_structures))?;
        let inputs = Inputs {
            quats: data
                .array::<f32>(&paths.quats)?
                .as_slice()
                .map_err(store_err(&paths.quats))?,
            phases: data
                .array::<i32>(&paths.phases)?
                .as_slice()
                .map_err(store_err(&paths.phases))?,
            ensembles: crystal_structures.iter().copied().map(Ensemble::from_code).collect(),
        };
        let neighbors = data
            .neighbor_list::<i32>(&paths.neighbors)?
            .lists()
            .map_err(store_err(&paths.neighbors))?;

        tracing::debug!(
            features = neighbors.len(),
            ensembles = inputs.ensembles.len(),
            "computing neighbor misorientations"
        );
        let counter = ctx.counter("Computing misorientations", neighbors.len());
        let lists = neighbors
            .par_iter()
            .enumerate()
            .map(|(feature, list)| {
                if ctx.is_cancelled() {
                    return Ok(Vec::new());
                }
                let result = inputs.feature_misorientations(feature, list);
                counter.advance(1);
                result
            })
            .collect::<Result<Vec<_>, Error>>()?;
        if ctx.is_cancelled() {
            return Ok(Completion::Cancelled);
        }

        let averages: Option<Vec<f32>> = paths
            .average
            .as_ref()
            .map(|_| lists.par_iter().map(|list| average(list)).collect());

        data.neighbor_list_mut::<f32>(&paths.list)?
            .set_lists(lists)
            .map_err(store_err(&paths.list))?;
        if let (Some(path), Some(averages)) = (&paths.average, averages) {
            data.array_mut::<f32>(path)?
                .as_mut_slice()
                .map_err(store_err(path))?
                .copy_from_slice(&averages);
        }
        Ok(Completion::Finished)
    }
}

impl Filter for ComputeMisorientations {
    fn name(&self) -> &'static str {
        "ComputeMisorientations"
    }

    fn uuid(&self) -> Uuid {
        Self::UUID
    }

    fn human_name(&self) -> &'static str {
        "Compute Feature Neighbor Misorientations"
    }

    fn default_tags(&self) -> Vec<&'static str> {
        vec!["ComputeMisorientations", "Statistics", "Crystallography", "Misorientation"]
    }

    fn parameters(&self) -> Parameters {
        let mut params = Parameters::new();
        params
            .insert_separator("Input Parameter(s)")
            .insert_linkable(Parameter::bool(
                K_COMPUTE_AVG,
                "Compute Average Misorientation Per Feature",
                "Store the average misorientation with the neighboring features for each feature",
                false,
            ))
            .insert_separator("Input Feature Data")
            .insert(Parameter::neighbor_list_selection(
                K_NEIGHBOR_LIST,
                "Feature Neighbor List",
                "List of the contiguous neighboring features for a given feature",
                DataPath::from_names(&["DataContainer", "Feature Data", "NeighborList"]),
                &[DataType::Int32],
            ))
            .insert(Parameter::array_selection(
                K_AVG_QUATS,
                "Feature Average Quaternions",
                "Average orientation of each feature as a quaternion",
                DataPath::from_names(&["DataContainer", "Feature Data", "AvgQuats"]),
                &[DataType::Float32],
                &[&[4]],
            ))
            .insert(Parameter::array_selection(
                K_FEATURE_PHASES,
                "Feature Phases",
                "Ensemble each feature belongs to",
                DataPath::from_names(&["DataContainer", "Feature Data", "Phases"]),
                &[DataType::Int32],
                &[&[1]],
            ))
            .insert_separator("Input Ensemble Data")
            .insert(Parameter::array_selection(
                K_CRYSTAL_STRUCTURES,
                "Crystal Structures",
                "Crystal structure code of each ensemble",
                DataPath::from_names(&["DataContainer", "Cell Ensemble Data", "CrystalStructures"]),
                &[DataType::UInt32],
                &[&[1]],
            ))
            .insert_separator("Output Feature Data")
            .insert(Parameter::data_object_name(
                K_MISORIENTATION_LIST_NAME,
                "Misorientation List",
                "Neighbor list of misorientation angles, in degrees, created next to the quaternions",
                "MisorientationList",
            ))
            .insert(Parameter::data_object_name(
                K_AVG_MISORIENTATIONS_NAME,
                "Average Misorientations",
                "Array of the number weighted average of neighbor misorientations",
                "AvgMisorientations",
            ))
            .link(K_COMPUTE_AVG, K_AVG_MISORIENTATIONS_NAME, true);
        params
    }

    fn clone_box(&self) -> Box<dyn Filter> {
        Box::new(*self)
    }

    fn preflight_impl(&self, data: &DataStructure, args: &Arguments, _ctx: &RunContext) -> PreflightResult {
        Self::plan(data, args).unwrap_or_else(PreflightResult::fail)
    }

    fn execute_impl(&self, data: &mut DataStructure, args: &Arguments, ctx: &RunContext) -> Report<Completion> {
        Self::compute(data, args, ctx).into()
    }

    fn import_legacy_arguments(&self, json: &serde_json::Value) -> Report<Arguments> {
        let mut importer = LegacyImporter::new(json, self.default_arguments());
        importer
            .convert("FindAvgMisors", K_COMPUTE_AVG, LegacyConverter::LinkedBool, Requirement::Required)
            .convert(
                "NeighborListArrayPath",
                K_NEIGHBOR_LIST,
                LegacyConverter::ArrayPath,
                Requirement::Required,
            )
            .convert("AvgQuatsArrayPath", K_AVG_QUATS, LegacyConverter::ArrayPath, Requirement::Required)
            .convert(
                "FeaturePhasesArrayPath",
                K_FEATURE_PHASES,
                LegacyConverter::ArrayPath,
                Requirement::Required,
            )
            .convert(
                "CrystalStructuresArrayPath",
                K_CRYSTAL_STRUCTURES,
                LegacyConverter::ArrayPath,
                Requirement::Required,
            )
            .convert(
                "MisorientationListArrayName",
                K_MISORIENTATION_LIST_NAME,
                LegacyConverter::LinkedName,
                Requirement::Required,
            )
            .convert(
                "AvgMisorientationsArrayName",
                K_AVG_MISORIENTATIONS_NAME,
                LegacyConverter::LinkedName,
                Requirement::Optional,
            );
        importer.finish()
    }
}
