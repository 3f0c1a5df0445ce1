//! In-memory stores. Each store guards its state with one mutex so every
//! mutation is a single critical section.

pub mod assignment;
pub mod items;
pub mod unit;

pub use assignment::{AssignmentStore, UnitAssignments};
pub use items::{InMemoryWorkItems, WorkItemSource};
pub use unit::{OrganizationalUnitStore, UnitRegistrySnapshot};
