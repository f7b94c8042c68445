//! Strata Core - Filter Engine
//!
//! The two-phase computation model over a [`strata_data::DataStructure`]:
//! - Filters declare [`Parameters`] and receive bound [`Arguments`]
//! - Preflight validates and describes structural change as [`OutputActions`]
//! - Actions are applied (shape-only or allocating), then execute fills data
//! - Every phase reports through [`Report<T>`]: value or errors, plus warnings
//!
//! # Core Concepts
//!
//! - [`Filter`] / [`FilterExt`]: the contract and its checked entry points
//! - [`FilterInstance`]: one invocation driven through [`FilterState`]
//! - [`FilterRegistry`]: uuid → factory
//! - [`Pipeline`] / [`PipelineDocument`]: ordered filters and their JSON form
//! - [`LegacyImporter`]: old parameter documents → current arguments
//!
//! # Example
//!
//! ```rust,ignore
//! use strata_core::prelude::*;
//!
//! let mut data = DataStructure::new();
//! let pipeline = Pipeline::new("demo").with(filter, args);
//! let report = pipeline.preflight(&data, &RunContext::new());
//! assert!(report.is_success());
//! let report = pipeline.execute(&mut data, &RunContext::new());
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

pub mod action;
pub mod arguments;
pub mod config;
pub mod filter;
pub mod legacy;
pub mod parameter;
pub mod pipeline;
pub mod progress;
pub mod registry;
pub mod report;
pub mod state_machine;

pub use action::{Action, ApplyError, ApplyMode, OutputActions};
pub use arguments::{ArgValue, Arguments, FromArgValue, VersionedArguments};
pub use config::{ConfigError, LogFormat, RunnerConfig};
pub use filter::{Filter, FilterExt, FilterInstance, PreflightResult, PreflightValue};
pub use legacy::{LegacyConverter, LegacyImporter, Requirement};
pub use parameter::{NumberKind, NumberSpec, Parameter, ParameterKind, Parameters};
pub use pipeline::{
    FilterEntry, NodeReport, Pipeline, PipelineDocError, PipelineDocument, PipelineNode,
    PipelineOutcome, PipelineReport,
};
pub use progress::{
    CancelToken, CollectingSink, Message, MessageLevel, NullSink, ProgressCounter, ProgressSink,
    RunContext, TracingSink,
};
pub use registry::{FilterFactory, FilterInfo, FilterRegistry, RegistryError};
pub use report::{Completion, Error, ErrorKind, Report, Warning};
pub use state_machine::{FilterState, StateError};

/// Prelude module for common imports
pub mod prelude {
    //! Common imports for writing and running filters
    pub use crate::{
        Action, ArgValue, Arguments, CancelToken, Completion, Error, Filter, FilterExt,
        FilterRegistry, OutputActions, Parameter, Parameters, Pipeline, PreflightResult, Report,
        RunContext, Warning,
    };
    pub use strata_data::{DataPath, DataStructure, DataType};
}

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
