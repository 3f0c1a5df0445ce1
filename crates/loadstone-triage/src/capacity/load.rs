//! Per-member load breakdown for one unit.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use tracing::warn;

use loadstone_core::{
    CognitiveLoadCalculator, ItemId, OrganizationalUnit, UnitAssignments, UnitId, WorkItem,
};

/// Load of one open item held by a member.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemLoad {
    pub item_id: ItemId,
    pub load: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLoad {
    pub member: String,
    /// Listed in the unit's declared members, as opposed to only holding
    /// assignments.
    pub declared: bool,
    /// Assignment records, including completed and unknown items.
    pub assigned_items: usize,
    /// Open items ordered by load ascending, then id.
    pub open_items: Vec<ItemLoad>,
    pub load: u64,
    /// Load against the member's fair share of capacity. `None` when the unit
    /// has no capacity.
    pub utilization_percent: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLoad {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub capacity: u32,
    pub recorded_load: u32,
    pub member_count: usize,
    /// `capacity / member_count`, truncated; zero for an empty unit.
    pub fair_share: u64,
    pub total_load: u64,
    /// Ordered by member id.
    pub members: Vec<MemberLoad>,
    /// Assigned ids the work-item source did not know about.
    pub missing_items: usize,
}

impl UnitLoad {
    #[must_use]
    pub fn member(&self, member: &str) -> Option<&MemberLoad> {
        self.members.iter().find(|m| m.member == member)
    }

    /// Utilization of the unit's summed member load, truncated.
    #[must_use]
    pub fn utilization_percent(&self) -> Option<u64> {
        percent_of(self.total_load, u64::from(self.capacity))
    }
}

/// `load * 100 * member_count / capacity`, truncated.
#[must_use]
pub fn member_utilization(load: u64, member_count: usize, capacity: u32) -> Option<u64> {
    if capacity == 0 || member_count == 0 {
        return None;
    }
    let members = u128::try_from(member_count).unwrap_or(u128::MAX);
    let scaled = u128::from(load)
        .saturating_mul(100)
        .saturating_mul(members)
        / u128::from(capacity);
    Some(u64::try_from(scaled).unwrap_or(u64::MAX))
}

pub(crate) fn percent_of(load: u64, capacity: u64) -> Option<u64> {
    if capacity == 0 {
        return None;
    }
    let scaled = u128::from(load) * 100 / u128::from(capacity);
    Some(u64::try_from(scaled).unwrap_or(u64::MAX))
}

pub(crate) fn compute_unit_load(
    unit: &OrganizationalUnit,
    assignments: Option<&UnitAssignments>,
    items: &BTreeMap<ItemId, WorkItem>,
    calculator: &dyn CognitiveLoadCalculator,
) -> UnitLoad {
    let empty = UnitAssignments::default();
    let assignments = assignments.unwrap_or(&empty);

    let mut names: BTreeSet<&str> = unit.members.iter().map(String::as_str).collect();
    names.extend(assignments.members());
    let member_count = names.len();

    let mut missing_items = 0;
    let mut members = Vec::with_capacity(member_count);
    for name in names {
        let assigned = assignments.items_of(name);
        let mut open_items = Vec::new();
        for id in &assigned {
            match items.get(id) {
                None => {
                    missing_items += 1;
                    warn!(unit = %unit.id, member = name, item = %id, "assigned item missing from snapshot, skipped");
                }
                Some(item) if item.completed => {}
                Some(item) => open_items.push(ItemLoad {
                    item_id: *id,
                    load: calculator.calculate_work_item_load(item),
                }),
            }
        }
        open_items.sort_by(|a, b| a.load.cmp(&b.load).then(a.item_id.cmp(&b.item_id)));
        let load = open_items
            .iter()
            .fold(0_u64, |sum, item| sum.saturating_add(u64::from(item.load)));

        members.push(MemberLoad {
            member: name.to_string(),
            declared: unit.members.contains(name),
            assigned_items: assigned.len(),
            open_items,
            load,
            utilization_percent: member_utilization(load, member_count, unit.cognitive_capacity),
        });
    }

    let total_load = members
        .iter()
        .fold(0_u64, |sum, member| sum.saturating_add(member.load));
    let fair_share = u64::try_from(member_count)
        .ok()
        .filter(|count| *count > 0)
        .map_or(0, |count| u64::from(unit.cognitive_capacity) / count);

    UnitLoad {
        unit_id: unit.id,
        unit_name: unit.name.clone(),
        capacity: unit.cognitive_capacity,
        recorded_load: unit.current_load,
        member_count,
        fair_share,
        total_load,
        members,
        missing_items,
    }
}
