//! Organizational unit registry with capacity, hierarchy and association
//! queries.

use chrono::Utc;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::sync::{Mutex, MutexGuard, PoisonError};
use tracing::{debug, info};

use crate::error::{Error, Result};
use crate::model::{
    CynefinDomain, ItemId, NewUnit, OrganizationalUnit, UnitId, UnitType, WorkParadigm,
    WorkstreamId,
};

#[derive(Debug, Default)]
pub struct OrganizationalUnitStore {
    inner: Mutex<Registry>,
}

/// Point-in-time copy of the registry, taken under one lock.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UnitRegistrySnapshot {
    /// Ordered by id.
    pub units: Vec<OrganizationalUnit>,
    pub work_items: BTreeMap<UnitId, BTreeSet<ItemId>>,
    pub owning_unit: BTreeMap<ItemId, UnitId>,
}

#[derive(Debug, Default)]
struct Registry {
    units: BTreeMap<UnitId, OrganizationalUnit>,
    work_items: BTreeMap<UnitId, BTreeSet<ItemId>>,
    workstreams: BTreeMap<UnitId, BTreeSet<WorkstreamId>>,
    owning_unit: BTreeMap<ItemId, UnitId>,
}

impl OrganizationalUnitStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, Registry> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn filter(&self, predicate: impl Fn(&OrganizationalUnit) -> bool) -> Vec<OrganizationalUnit> {
        self.lock()
            .units
            .values()
            .filter(|unit| predicate(unit))
            .cloned()
            .collect()
    }

    /// Validate `request` and store the resulting unit.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`] for a negative capacity or blank
    /// name.
    pub fn create(&self, request: NewUnit) -> Result<OrganizationalUnit> {
        let unit = OrganizationalUnit::from_request(request, Utc::now())?;
        self.lock().units.insert(unit.id, unit.clone());
        info!(unit = %unit.id, name = %unit.name, capacity = unit.cognitive_capacity, "unit created");
        Ok(unit)
    }

    /// Insert or replace `unit` by id, stamping `updated_at`.
    pub fn save(&self, mut unit: OrganizationalUnit) -> OrganizationalUnit {
        unit.updated_at = Utc::now();
        self.lock().units.insert(unit.id, unit.clone());
        debug!(unit = %unit.id, "unit saved");
        unit
    }

    #[must_use]
    pub fn find_by_id(&self, id: UnitId) -> Option<OrganizationalUnit> {
        self.lock().units.get(&id).cloned()
    }

    #[must_use]
    pub fn find_all(&self) -> Vec<OrganizationalUnit> {
        self.filter(|_| true)
    }

    #[must_use]
    pub fn find_by_type(&self, unit_type: UnitType) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.unit_type == unit_type)
    }

    #[must_use]
    pub fn find_by_parent(&self, parent: UnitId) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.parent_id == Some(parent))
    }

    #[must_use]
    pub fn find_by_owner(&self, owner: &str) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.owner == owner)
    }

    #[must_use]
    pub fn find_by_member(&self, member: &str) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.has_member(member))
    }

    #[must_use]
    pub fn find_by_domain_expertise(&self, domain: CynefinDomain) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.domain_expertise.contains(&domain))
    }

    #[must_use]
    pub fn find_by_work_paradigm(&self, paradigm: WorkParadigm) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.work_paradigms.contains(&paradigm))
    }

    #[must_use]
    pub fn find_by_tag(&self, tag: &str) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.tags.contains(tag))
    }

    #[must_use]
    pub fn find_active(&self) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.active)
    }

    #[must_use]
    pub fn find_inactive(&self) -> Vec<OrganizationalUnit> {
        self.filter(|unit| !unit.active)
    }

    /// Every descendant of `root`, breadth first. Cycles introduced through
    /// [`save`](Self::save) are walked once.
    #[must_use]
    pub fn find_children_tree(&self, root: UnitId) -> Vec<OrganizationalUnit> {
        let registry = self.lock();
        let mut children: BTreeMap<UnitId, Vec<&OrganizationalUnit>> = BTreeMap::new();
        for unit in registry.units.values() {
            if let Some(parent) = unit.parent_id {
                children.entry(parent).or_default().push(unit);
            }
        }

        let mut visited = BTreeSet::from([root]);
        let mut queue = VecDeque::from([root]);
        let mut tree = Vec::new();
        while let Some(current) = queue.pop_front() {
            for child in children.get(&current).into_iter().flatten() {
                if visited.insert(child.id) {
                    tree.push((*child).clone());
                    queue.push_back(child.id);
                }
            }
        }
        tree
    }

    /// Remove the unit and its item/workstream associations. Assignment
    /// records live elsewhere; see `Workspace::delete_unit` for the full
    /// cascade.
    pub fn delete_by_id(&self, id: UnitId) -> bool {
        let mut registry = self.lock();
        if registry.units.remove(&id).is_none() {
            return false;
        }
        registry.work_items.remove(&id);
        registry.workstreams.remove(&id);
        registry.owning_unit.retain(|_, owner| *owner != id);
        info!(unit = %id, "unit deleted");
        true
    }

    /// Replace the unit's recorded load.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] when `id` is unknown.
    pub fn update_cognitive_load(&self, id: UnitId, load: u32) -> Result<OrganizationalUnit> {
        let mut registry = self.lock();
        let unit = registry.units.get_mut(&id).ok_or_else(|| Error::unknown_unit(id))?;
        unit.current_load = load;
        unit.updated_at = Utc::now();
        debug!(unit = %id, load, capacity = unit.cognitive_capacity, "cognitive load updated");
        Ok(unit.clone())
    }

    /// Units whose free capacity is at least `min_free`. Overloaded units have
    /// negative free capacity.
    #[must_use]
    pub fn find_with_available_capacity(&self, min_free: i64) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.available_capacity() >= min_free)
    }

    /// Units at or above `percent` utilization. Zero-capacity units have no
    /// utilization and never match.
    #[must_use]
    pub fn find_at_capacity_threshold(&self, percent: u64) -> Vec<OrganizationalUnit> {
        self.filter(|unit| unit.utilization_percent().is_some_and(|util| util >= percent))
    }

    pub fn associate_work_item(&self, unit: UnitId, item: ItemId) -> bool {
        let mut registry = self.lock();
        if !registry.units.contains_key(&unit) {
            return false;
        }
        registry.work_items.entry(unit).or_default().insert(item);
        true
    }

    pub fn dissociate_work_item(&self, unit: UnitId, item: ItemId) -> bool {
        let mut registry = self.lock();
        if !registry.units.contains_key(&unit) {
            return false;
        }
        registry
            .work_items
            .get_mut(&unit)
            .is_some_and(|items| items.remove(&item))
    }

    #[must_use]
    pub fn find_work_item_ids(&self, unit: UnitId) -> BTreeSet<ItemId> {
        self.lock().work_items.get(&unit).cloned().unwrap_or_default()
    }

    #[must_use]
    pub fn find_units_for_work_item(&self, item: ItemId) -> BTreeSet<UnitId> {
        self.lock()
            .work_items
            .iter()
            .filter(|(_, items)| items.contains(&item))
            .map(|(unit, _)| *unit)
            .collect()
    }

    pub fn associate_workstream(&self, unit: UnitId, workstream: WorkstreamId) -> bool {
        let mut registry = self.lock();
        if !registry.units.contains_key(&unit) {
            return false;
        }
        registry.workstreams.entry(unit).or_default().insert(workstream);
        true
    }

    pub fn dissociate_workstream(&self, unit: UnitId, workstream: WorkstreamId) -> bool {
        let mut registry = self.lock();
        if !registry.units.contains_key(&unit) {
            return false;
        }
        registry
            .workstreams
            .get_mut(&unit)
            .is_some_and(|streams| streams.remove(&workstream))
    }

    #[must_use]
    pub fn find_workstream_ids(&self, unit: UnitId) -> BTreeSet<WorkstreamId> {
        self.lock().workstreams.get(&unit).cloned().unwrap_or_default()
    }

    /// Make `unit` the owner of `item` and associate the two. Associations
    /// with the previous owner are left in place.
    pub fn set_owning_unit_for_work_item(&self, item: ItemId, unit: UnitId) -> bool {
        let mut registry = self.lock();
        if !registry.units.contains_key(&unit) {
            return false;
        }
        let previous = registry.owning_unit.insert(item, unit);
        registry.work_items.entry(unit).or_default().insert(item);
        debug!(%item, %unit, previous = ?previous, "owning unit set");
        true
    }

    #[must_use]
    pub fn find_owning_unit_for_work_item(&self, item: ItemId) -> Option<UnitId> {
        self.lock().owning_unit.get(&item).copied()
    }

    #[must_use]
    pub fn find_owned_work_item_ids(&self, unit: UnitId) -> BTreeSet<ItemId> {
        self.lock()
            .owning_unit
            .iter()
            .filter(|(_, owner)| **owner == unit)
            .map(|(item, _)| *item)
            .collect()
    }

    /// Apply `change` to a stored unit. The unit is only re-stamped when
    /// `change` reports a modification. `None` for unknown ids.
    fn modify(
        &self,
        id: UnitId,
        change: impl FnOnce(&mut OrganizationalUnit) -> bool,
    ) -> Option<OrganizationalUnit> {
        let mut registry = self.lock();
        let unit = registry.units.get_mut(&id)?;
        if change(unit) {
            unit.updated_at = Utc::now();
        }
        Some(unit.clone())
    }

    pub fn add_member(&self, id: UnitId, member: &str) -> Option<OrganizationalUnit> {
        let unit = self.modify(id, |unit| unit.members.insert(member.to_string()))?;
        debug!(unit = %id, member, members = unit.members.len(), "member added");
        Some(unit)
    }

    /// Remove a declared member. Assignments the member still holds in the
    /// assignment store are left alone.
    pub fn remove_member(&self, id: UnitId, member: &str) -> Option<OrganizationalUnit> {
        let unit = self.modify(id, |unit| unit.members.remove(member))?;
        debug!(unit = %id, member, members = unit.members.len(), "member removed");
        Some(unit)
    }

    pub fn add_domain_expertise(
        &self,
        id: UnitId,
        domain: CynefinDomain,
    ) -> Option<OrganizationalUnit> {
        self.modify(id, |unit| unit.domain_expertise.insert(domain))
    }

    pub fn add_work_paradigm(
        &self,
        id: UnitId,
        paradigm: WorkParadigm,
    ) -> Option<OrganizationalUnit> {
        self.modify(id, |unit| unit.work_paradigms.insert(paradigm))
    }

    /// Units, item associations and ownership copied in one critical section.
    #[must_use]
    pub fn snapshot(&self) -> UnitRegistrySnapshot {
        let registry = self.lock();
        UnitRegistrySnapshot {
            units: registry.units.values().cloned().collect(),
            work_items: registry.work_items.clone(),
            owning_unit: registry.owning_unit.clone(),
        }
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.lock().units.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.lock().units.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn team(store: &OrganizationalUnitStore, name: &str, capacity: i64) -> OrganizationalUnit {
        store
            .create(NewUnit::new(name, UnitType::Team, "owner", capacity))
            .expect("valid unit")
    }

    #[test]
    fn create_rejects_negative_capacity() {
        let store = OrganizationalUnitStore::new();
        let err = store
            .create(NewUnit::new("Core", UnitType::Team, "ana", -5))
            .expect_err("negative capacity");
        assert!(matches!(err, Error::InvariantViolation(_)));
        assert!(store.is_empty());
    }

    #[test]
    fn update_load_on_unknown_unit_is_invalid_argument() {
        let store = OrganizationalUnitStore::new();
        let err = store
            .update_cognitive_load(UnitId::new(), 10)
            .expect_err("unknown unit");
        assert!(matches!(err, Error::InvalidArgument(_)));
    }

    #[test]
    fn update_load_replaces_only_current_load() {
        let store = OrganizationalUnitStore::new();
        let unit = team(&store, "Core", 100);
        let updated = store.update_cognitive_load(unit.id, 130).expect("known unit");
        assert_eq!(updated.current_load, 130);
        assert_eq!(updated.cognitive_capacity, 100);
        assert_eq!(updated.name, "Core");
        assert_eq!(updated.available_capacity(), -30);
    }

    #[test]
    fn available_capacity_boundary_is_inclusive() {
        let store = OrganizationalUnitStore::new();
        let unit = team(&store, "Core", 100);
        store.update_cognitive_load(unit.id, 60).expect("known unit");

        assert_eq!(store.find_with_available_capacity(40).len(), 1);
        assert!(store.find_with_available_capacity(41).is_empty());
        assert_eq!(store.find_with_available_capacity(-10).len(), 1);
    }

    #[test]
    fn threshold_uses_truncated_percent_and_skips_zero_capacity() {
        let store = OrganizationalUnitStore::new();
        let unit = team(&store, "Core", 1000);
        let empty = team(&store, "Empty", 0);
        store.update_cognitive_load(unit.id, 749).expect("known unit");
        store.update_cognitive_load(empty.id, 5).expect("known unit");

        assert!(store.find_at_capacity_threshold(75).is_empty());
        assert_eq!(store.find_at_capacity_threshold(74).len(), 1);
        assert_eq!(store.find_at_capacity_threshold(0).len(), 1);
    }

    #[test]
    fn children_tree_is_breadth_first() {
        let store = OrganizationalUnitStore::new();
        let root = team(&store, "Root", 10);
        let a = store
            .create(NewUnit::new("A", UnitType::Squad, "o", 1).parent(root.id))
            .expect("valid");
        let b = store
            .create(NewUnit::new("B", UnitType::Squad, "o", 1).parent(root.id))
            .expect("valid");
        let a1 = store
            .create(NewUnit::new("A1", UnitType::Squad, "o", 1).parent(a.id))
            .expect("valid");

        let tree: Vec<UnitId> = store.find_children_tree(root.id).iter().map(|u| u.id).collect();
        assert_eq!(tree.len(), 3);
        assert_eq!(tree[2], a1.id);
        assert!(tree[..2].contains(&a.id) && tree[..2].contains(&b.id));
        assert_eq!(store.find_by_parent(root.id).len(), 2);
        assert!(store.find_children_tree(a1.id).is_empty());
    }

    #[test]
    fn ownership_transfer_keeps_old_association() {
        let store = OrganizationalUnitStore::new();
        let first = team(&store, "First", 10);
        let second = team(&store, "Second", 10);
        let item = ItemId::new();

        assert!(store.set_owning_unit_for_work_item(item, first.id));
        assert!(store.set_owning_unit_for_work_item(item, second.id));

        assert_eq!(store.find_owning_unit_for_work_item(item), Some(second.id));
        assert!(store.find_work_item_ids(first.id).contains(&item));
        assert!(store.find_work_item_ids(second.id).contains(&item));
        assert!(store.find_owned_work_item_ids(first.id).is_empty());
        assert_eq!(
            store.find_units_for_work_item(item),
            BTreeSet::from([first.id, second.id])
        );
    }

    #[test]
    fn associations_on_unknown_units_fail() {
        let store = OrganizationalUnitStore::new();
        let ghost = UnitId::new();
        assert!(!store.associate_work_item(ghost, ItemId::new()));
        assert!(!store.associate_workstream(ghost, WorkstreamId::new()));
        assert!(!store.set_owning_unit_for_work_item(ItemId::new(), ghost));
        assert!(!store.dissociate_work_item(ghost, ItemId::new()));
    }

    #[test]
    fn delete_drops_associations_and_ownership() {
        let store = OrganizationalUnitStore::new();
        let unit = team(&store, "Core", 10);
        let item = ItemId::new();
        let stream = WorkstreamId::new();
        store.set_owning_unit_for_work_item(item, unit.id);
        store.associate_workstream(unit.id, stream);

        assert!(store.delete_by_id(unit.id));
        assert!(!store.delete_by_id(unit.id));
        assert!(store.find_work_item_ids(unit.id).is_empty());
        assert!(store.find_workstream_ids(unit.id).is_empty());
        assert_eq!(store.find_owning_unit_for_work_item(item), None);
    }

    #[test]
    fn attribute_queries() {
        let store = OrganizationalUnitStore::new();
        store
            .create(
                NewUnit::new("Research", UnitType::Guild, "ana", 50)
                    .members(["m1"])
                    .expertise([CynefinDomain::Complex])
                    .paradigms([WorkParadigm::Research])
                    .tag("ml"),
            )
            .expect("valid");
        store
            .create(NewUnit::new("Ops", UnitType::Team, "bo", 50).inactive())
            .expect("valid");

        assert_eq!(store.find_by_type(UnitType::Guild).len(), 1);
        assert_eq!(store.find_by_owner("bo").len(), 1);
        assert_eq!(store.find_by_member("m1").len(), 1);
        assert_eq!(store.find_by_domain_expertise(CynefinDomain::Complex).len(), 1);
        assert!(store.find_by_domain_expertise(CynefinDomain::Chaotic).is_empty());
        assert_eq!(store.find_by_work_paradigm(WorkParadigm::Research).len(), 1);
        assert_eq!(store.find_by_tag("ml").len(), 1);
        assert_eq!(store.find_active().len(), 1);
        assert_eq!(store.find_inactive().len(), 1);
        assert_eq!(store.find_all().len(), 2);
    }

    #[test]
    fn member_and_expertise_helpers_update_in_place() {
        let store = OrganizationalUnitStore::new();
        let unit = team(&store, "Core", 10);

        let updated = store.add_member(unit.id, "m1").expect("known unit");
        assert!(updated.has_member("m1"));
        assert_eq!(store.find_by_member("m1").len(), 1);

        let updated = store
            .add_domain_expertise(unit.id, CynefinDomain::Complex)
            .expect("known unit");
        assert!(updated.domain_expertise.contains(&CynefinDomain::Complex));
        let updated = store
            .add_work_paradigm(unit.id, WorkParadigm::Research)
            .expect("known unit");
        assert!(updated.work_paradigms.contains(&WorkParadigm::Research));

        let updated = store.remove_member(unit.id, "m1").expect("known unit");
        assert!(!updated.has_member("m1"));
        // Removing twice is not an error.
        assert!(store.remove_member(unit.id, "m1").is_some());

        assert!(store.add_member(UnitId::new(), "m1").is_none());
        assert!(store.remove_member(UnitId::new(), "m1").is_none());
    }

    #[test]
    fn snapshot_copies_units_associations_and_ownership() {
        let store = OrganizationalUnitStore::new();
        let a = team(&store, "A", 10);
        let b = team(&store, "B", 10);
        let owned = ItemId::new();
        let loose = ItemId::new();
        store.set_owning_unit_for_work_item(owned, a.id);
        store.associate_work_item(b.id, loose);

        let snapshot = store.snapshot();
        store.delete_by_id(a.id);

        assert_eq!(snapshot.units.len(), 2);
        assert_eq!(snapshot.owning_unit.get(&owned), Some(&a.id));
        assert_eq!(snapshot.work_items[&a.id], BTreeSet::from([owned]));
        assert_eq!(snapshot.work_items[&b.id], BTreeSet::from([loose]));
        assert_eq!(store.snapshot().units.len(), 1);
    }
}
