//! Unit-scoped member to work-item assignment bookkeeping.
//!
//! Each organizational unit owns one table mapping item to member. Within a
//! unit an item has at most one member; re-assigning replaces the previous
//! mapping. The member index and the first-seen stamps are derived from the
//! table and always updated in the same critical section.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::debug;

use crate::model::{ItemId, UnitId};

#[derive(Debug, Default)]
pub struct AssignmentStore {
    inner: Mutex<Tables>,
}

#[derive(Debug, Default)]
struct Tables {
    units: HashMap<UnitId, UnitTable>,
    next_stamp: u64,
}

#[derive(Debug, Default, Clone)]
struct UnitTable {
    by_item: BTreeMap<ItemId, String>,
    by_member: BTreeMap<String, BTreeSet<ItemId>>,
    first_seen: HashMap<String, u64>,
}

impl UnitTable {
    fn detach(&mut self, member: &str, item: ItemId) {
        if let Some(items) = self.by_member.get_mut(member) {
            items.remove(&item);
            if items.is_empty() {
                self.by_member.remove(member);
                self.first_seen.remove(member);
            }
        }
    }

    fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }
}

/// Consistent copy of one unit's assignments.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct UnitAssignments {
    by_item: BTreeMap<ItemId, String>,
    by_member: BTreeMap<String, BTreeSet<ItemId>>,
}

impl UnitAssignments {
    #[must_use]
    pub fn member_of(&self, item: ItemId) -> Option<&str> {
        self.by_item.get(&item).map(String::as_str)
    }

    /// Items assigned to `member`; empty for unknown members.
    #[must_use]
    pub fn items_of(&self, member: &str) -> BTreeSet<ItemId> {
        self.by_member.get(member).cloned().unwrap_or_default()
    }

    pub fn members(&self) -> impl Iterator<Item = &str> {
        self.by_member.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (ItemId, &str)> {
        self.by_item.iter().map(|(item, member)| (*item, member.as_str()))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.by_item.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.by_item.is_empty()
    }
}

impl AssignmentStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Tables> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn read<T>(&self, unit: UnitId, f: impl FnOnce(&UnitTable) -> T, missing: T) -> T {
        let tables = self.lock();
        tables.units.get(&unit).map_or(missing, f)
    }

    /// Assign `item` to `member` within `unit`, replacing any other member
    /// that held it. Always succeeds.
    pub fn assign(&self, unit: UnitId, member: &str, item: ItemId) -> bool {
        let mut tables = self.lock();
        let stamp = tables.next_stamp;
        let table = tables.units.entry(unit).or_default();

        let previous = table.by_item.insert(item, member.to_string());
        if let Some(previous) = previous.as_deref().filter(|prev| *prev != member) {
            table.detach(previous, item);
            debug!(%unit, %item, from = previous, to = member, "assignment replaced");
        }

        table
            .by_member
            .entry(member.to_string())
            .or_default()
            .insert(item);
        let fresh = !table.first_seen.contains_key(member);
        if fresh {
            table.first_seen.insert(member.to_string(), stamp);
            tables.next_stamp += 1;
        }
        debug!(%unit, %item, member, "assigned");
        true
    }

    /// Remove the exact `(member, item)` pair. False when it did not exist.
    pub fn unassign(&self, unit: UnitId, member: &str, item: ItemId) -> bool {
        let mut tables = self.lock();
        let Some(table) = tables.units.get_mut(&unit) else {
            return false;
        };
        if table.by_item.get(&item).map(String::as_str) != Some(member) {
            return false;
        }
        table.by_item.remove(&item);
        table.detach(member, item);
        if table.is_empty() {
            tables.units.remove(&unit);
        }
        debug!(%unit, %item, member, "unassigned");
        true
    }

    #[must_use]
    pub fn find_items_by_member(&self, unit: UnitId, member: &str) -> BTreeSet<ItemId> {
        self.read(
            unit,
            |table| table.by_member.get(member).cloned().unwrap_or_default(),
            BTreeSet::new(),
        )
    }

    #[must_use]
    pub fn find_member_by_item(&self, unit: UnitId, item: ItemId) -> Option<String> {
        self.read(unit, |table| table.by_item.get(&item).cloned(), None)
    }

    /// Drop every assignment in `unit`. Returns how many were removed.
    pub fn clear_unit_assignments(&self, unit: UnitId) -> usize {
        let removed = self
            .lock()
            .units
            .remove(&unit)
            .map_or(0, |table| table.by_item.len());
        debug!(%unit, removed, "cleared unit assignments");
        removed
    }

    /// Drop every assignment `member` holds in `unit`. Returns how many were
    /// removed.
    pub fn clear_member_assignments(&self, unit: UnitId, member: &str) -> usize {
        let mut tables = self.lock();
        let Some(table) = tables.units.get_mut(&unit) else {
            return 0;
        };
        let Some(items) = table.by_member.remove(member) else {
            return 0;
        };
        table.first_seen.remove(member);
        for item in &items {
            table.by_item.remove(item);
        }
        if table.is_empty() {
            tables.units.remove(&unit);
        }
        debug!(%unit, member, removed = items.len(), "cleared member assignments");
        items.len()
    }

    #[must_use]
    pub fn find_assigned_members(&self, unit: UnitId) -> BTreeSet<String> {
        self.read(
            unit,
            |table| table.by_member.keys().cloned().collect(),
            BTreeSet::new(),
        )
    }

    #[must_use]
    pub fn find_assigned_work_items(&self, unit: UnitId) -> BTreeSet<ItemId> {
        self.read(
            unit,
            |table| table.by_item.keys().copied().collect(),
            BTreeSet::new(),
        )
    }

    #[must_use]
    pub fn is_assigned(&self, unit: UnitId, item: ItemId) -> bool {
        self.read(unit, |table| table.by_item.contains_key(&item), false)
    }

    #[must_use]
    pub fn assignment_count(&self, unit: UnitId, member: &str) -> usize {
        self.read(
            unit,
            |table| table.by_member.get(member).map_or(0, BTreeSet::len),
            0,
        )
    }

    #[must_use]
    pub fn member_assignment_counts(&self, unit: UnitId) -> BTreeMap<String, usize> {
        self.read(
            unit,
            |table| {
                table
                    .by_member
                    .iter()
                    .map(|(member, items)| (member.clone(), items.len()))
                    .collect()
            },
            BTreeMap::new(),
        )
    }

    /// Up to `limit` members by assignment count, descending. Ties go to the
    /// member that was assigned work first.
    #[must_use]
    pub fn top_assigned_members(&self, unit: UnitId, limit: usize) -> Vec<(String, usize)> {
        self.read(
            unit,
            |table| {
                let mut ranked: Vec<(u64, &String, usize)> = table
                    .by_member
                    .iter()
                    .map(|(member, items)| {
                        let stamp = table.first_seen.get(member).copied().unwrap_or(u64::MAX);
                        (stamp, member, items.len())
                    })
                    .collect();
                ranked.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));
                ranked
                    .into_iter()
                    .take(limit)
                    .map(|(_, member, count)| (member.clone(), count))
                    .collect()
            },
            Vec::new(),
        )
    }

    #[must_use]
    pub fn snapshot_unit(&self, unit: UnitId) -> UnitAssignments {
        self.read(
            unit,
            |table| UnitAssignments {
                by_item: table.by_item.clone(),
                by_member: table.by_member.clone(),
            },
            UnitAssignments::default(),
        )
    }

    /// Every unit's assignments, copied in one critical section.
    #[must_use]
    pub fn snapshot_all(&self) -> BTreeMap<UnitId, UnitAssignments> {
        self.lock()
            .units
            .iter()
            .map(|(unit, table)| {
                (
                    *unit,
                    UnitAssignments {
                        by_item: table.by_item.clone(),
                        by_member: table.by_member.clone(),
                    },
                )
            })
            .collect()
    }

    /// Units with at least one assignment.
    #[must_use]
    pub fn unit_ids(&self) -> BTreeSet<UnitId> {
        self.lock().units.keys().copied().collect()
    }

    /// Forget every assignment in every unit.
    pub fn clear(&self) {
        let mut tables = self.lock();
        tables.units.clear();
        tables.next_stamp = 0;
        debug!("cleared all assignments");
    }
}
