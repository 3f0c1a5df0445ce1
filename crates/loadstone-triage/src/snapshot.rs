//! Point-in-time copy of every store an analysis reads.
//!
//! Each aggregate call captures one [`Snapshot`] up front and never goes back
//! to the live stores, so a report is internally consistent even while other
//! threads keep assigning work.

use std::collections::{BTreeMap, BTreeSet};

use loadstone_core::{
    AssignmentStore, ItemId, OrganizationalUnit, OrganizationalUnitStore, UnitAssignments, UnitId,
    WorkItem, WorkItemSource,
};

#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    /// Every unit, ordered by name then id.
    pub units: Vec<OrganizationalUnit>,
    pub assignments: BTreeMap<UnitId, UnitAssignments>,
    pub items: BTreeMap<ItemId, WorkItem>,
    pub associated: BTreeMap<UnitId, BTreeSet<ItemId>>,
    pub owning_unit: BTreeMap<ItemId, UnitId>,
}

impl Snapshot {
    /// Copies the unit registry first, then the assignment tables, each in a
    /// single critical section. Assignment tables of units deleted between the
    /// two copies are dropped.
    pub fn capture(
        units: &OrganizationalUnitStore,
        assignments: &AssignmentStore,
        items: &dyn WorkItemSource,
    ) -> Self {
        let registry = units.snapshot();
        let mut all_units = registry.units;
        all_units.sort_by(|a, b| a.name.cmp(&b.name).then(a.id.cmp(&b.id)));

        let known: BTreeSet<UnitId> = all_units.iter().map(|unit| unit.id).collect();
        let mut tables = assignments.snapshot_all();
        tables.retain(|unit, _| known.contains(unit));

        Self {
            units: all_units,
            assignments: tables,
            items: items
                .snapshot()
                .into_iter()
                .map(|item| (item.id, item))
                .collect(),
            associated: registry.work_items,
            owning_unit: registry.owning_unit,
        }
    }

    pub fn unit(&self, id: UnitId) -> Option<&OrganizationalUnit> {
        self.units.iter().find(|unit| unit.id == id)
    }

    pub fn assignments_of(&self, unit: UnitId) -> Option<&UnitAssignments> {
        self.assignments.get(&unit)
    }

    /// Items associated with or assigned within `unit`.
    pub fn unit_item_ids(&self, unit: UnitId) -> BTreeSet<ItemId> {
        let mut ids = self.associated.get(&unit).cloned().unwrap_or_default();
        if let Some(assignments) = self.assignments.get(&unit) {
            ids.extend(assignments.iter().map(|(item, _)| item));
        }
        ids
    }

    /// Resolved items for `unit`; ids missing from the item source are
    /// dropped.
    pub fn unit_items(&self, unit: UnitId) -> Vec<&WorkItem> {
        self.unit_item_ids(unit)
            .into_iter()
            .filter_map(|id| self.items.get(&id))
            .collect()
    }
}
