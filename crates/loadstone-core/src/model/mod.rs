//! Domain model: work item snapshots and organizational units.

pub mod item;
pub mod unit;

pub use item::{CynefinDomain, ItemId, ParseEnumError, WorkItem, WorkItemType, WorkParadigm};
pub use unit::{NewUnit, OrganizationalUnit, UnitId, UnitType, WorkstreamId};
