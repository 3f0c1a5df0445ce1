//! loadstone-core library.
//!
//! # Conventions
//!
//! - **Errors**: store and calculator operations return [`Result`] with the
//!   crate [`Error`]; config loading returns `anyhow::Result`.
//! - **Logging**: use `tracing` macros (`info!`, `warn!`, `debug!`).
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod load;
pub mod logging;
pub mod model;
pub mod store;
pub mod workspace;

pub use config::{CapacityConfig, DashboardConfig, ProjectConfig};
pub use error::{Error, ErrorCode, Result};
pub use load::{CognitiveLoadCalculator, LoadWeights, WeightedLoadCalculator};
pub use model::{
    CynefinDomain, ItemId, NewUnit, OrganizationalUnit, UnitId, UnitType, WorkItem, WorkItemType,
    WorkParadigm, WorkstreamId,
};
pub use store::{
    AssignmentStore, InMemoryWorkItems, OrganizationalUnitStore, UnitAssignments,
    UnitRegistrySnapshot, WorkItemSource,
};
pub use workspace::Workspace;
