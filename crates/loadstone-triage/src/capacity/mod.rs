//! Overload detection and rebalancing.
//!
//! # Overview
//!
//! A member's load is the summed calculator load of their open assigned
//! items. Utilization compares that load against the member's fair share of
//! the unit capacity (`capacity / member_count`), so a three-member unit of
//! capacity 30 puts a member carrying 18 at 180%. Members above
//! [`CapacityConfig::overload_threshold_percent`] are flagged; see
//! [`rebalance`] for how proposals are built.
//!
//! Only active units are analyzed.

pub mod load;
pub mod rebalance;
pub mod suggest;

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, info, instrument};

use loadstone_core::{
    AssignmentStore, CapacityConfig, CognitiveLoadCalculator, ItemId, OrganizationalUnitStore,
    UnitId, WorkItemSource, Workspace,
};

pub use load::{ItemLoad, MemberLoad, UnitLoad, member_utilization};
pub use rebalance::ReassignmentRecommendation;
pub use suggest::UnitSuggestion;

use crate::snapshot::Snapshot;

// ---------------------------------------------------------------------------
// Risks
// ---------------------------------------------------------------------------

/// How far past its fair share a member is. Ordered least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OverloadSeverity {
    Elevated,
    High,
    Critical,
}

impl OverloadSeverity {
    /// Critical at 200% and above, High from 150%. No utilization (a
    /// zero-capacity unit) is Critical.
    #[must_use]
    pub const fn from_utilization(utilization_percent: Option<u64>) -> Self {
        match utilization_percent {
            None => Self::Critical,
            Some(percent) if percent >= 200 => Self::Critical,
            Some(percent) if percent >= 150 => Self::High,
            Some(_) => Self::Elevated,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OverloadRisk {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub member: String,
    pub current_load: u64,
    /// Fair share of unit capacity, truncated.
    pub capacity_share: u64,
    pub utilization_percent: Option<u64>,
    pub severity: OverloadSeverity,
    /// Open items, heaviest first.
    pub contributing_items: Vec<ItemId>,
}

pub(crate) fn risks_for(unit: &UnitLoad, threshold_percent: u32) -> Vec<OverloadRisk> {
    let threshold = u64::from(threshold_percent);
    unit.members
        .iter()
        .filter(|member| {
            if unit.capacity == 0 {
                member.assigned_items > 0
            } else {
                member.utilization_percent.is_some_and(|util| util > threshold)
            }
        })
        .map(|member| {
            let mut heaviest = member.open_items.clone();
            heaviest.sort_by(|a, b| b.load.cmp(&a.load).then(a.item_id.cmp(&b.item_id)));
            OverloadRisk {
                unit_id: unit.unit_id,
                unit_name: unit.unit_name.clone(),
                member: member.member.clone(),
                current_load: member.load,
                capacity_share: unit.fair_share,
                utilization_percent: member.utilization_percent,
                severity: OverloadSeverity::from_utilization(member.utilization_percent),
                contributing_items: heaviest.into_iter().map(|item| item.item_id).collect(),
            }
        })
        .collect()
}

/// Most severe first, then utilization, load, unit name and member id.
pub(crate) fn rank_risks(risks: &mut [OverloadRisk]) {
    let util = |risk: &OverloadRisk| risk.utilization_percent.unwrap_or(u64::MAX);
    risks.sort_by(|a, b| {
        b.severity
            .cmp(&a.severity)
            .then_with(|| util(b).cmp(&util(a)))
            .then_with(|| b.current_load.cmp(&a.current_load))
            .then_with(|| a.unit_name.cmp(&b.unit_name))
            .then_with(|| a.member.cmp(&b.member))
    });
}

// ---------------------------------------------------------------------------
// Analyzer
// ---------------------------------------------------------------------------

/// Reads the stores and derives overload risks and rebalancing proposals.
/// Never mutates anything.
#[derive(Clone)]
pub struct CapacityAnalyzer {
    units: Arc<OrganizationalUnitStore>,
    assignments: Arc<AssignmentStore>,
    items: Arc<dyn WorkItemSource>,
    calculator: Arc<dyn CognitiveLoadCalculator>,
    config: CapacityConfig,
}

impl std::fmt::Debug for CapacityAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CapacityAnalyzer")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl CapacityAnalyzer {
    #[must_use]
    pub fn new(
        units: Arc<OrganizationalUnitStore>,
        assignments: Arc<AssignmentStore>,
        items: Arc<dyn WorkItemSource>,
        calculator: Arc<dyn CognitiveLoadCalculator>,
        config: CapacityConfig,
    ) -> Self {
        Self {
            units,
            assignments,
            items,
            calculator,
            config,
        }
    }

    #[must_use]
    pub fn from_workspace(workspace: &Workspace) -> Self {
        Self::new(
            Arc::clone(workspace.units()),
            Arc::clone(workspace.assignments()),
            Arc::clone(workspace.items()),
            Arc::clone(workspace.calculator()),
            workspace.config().capacity,
        )
    }

    #[must_use]
    pub const fn config(&self) -> &CapacityConfig {
        &self.config
    }

    pub(crate) fn calculator(&self) -> &dyn CognitiveLoadCalculator {
        self.calculator.as_ref()
    }

    pub(crate) fn snapshot(&self) -> Snapshot {
        Snapshot::capture(&self.units, &self.assignments, self.items.as_ref())
    }

    /// Loads for every active unit in `snapshot`, in snapshot order.
    pub(crate) fn unit_loads(&self, snapshot: &Snapshot) -> Vec<UnitLoad> {
        snapshot
            .units
            .iter()
            .filter(|unit| unit.active)
            .map(|unit| {
                load::compute_unit_load(
                    unit,
                    snapshot.assignments_of(unit.id),
                    &snapshot.items,
                    self.calculator(),
                )
            })
            .collect()
    }

    pub(crate) fn risks_in(&self, loads: &[UnitLoad]) -> Vec<OverloadRisk> {
        let mut risks: Vec<OverloadRisk> = loads
            .iter()
            .flat_map(|unit| risks_for(unit, self.config.overload_threshold_percent))
            .collect();
        rank_risks(&mut risks);
        risks
    }

    pub(crate) fn recommendations_in(
        &self,
        loads: &[UnitLoad],
        risks: &[OverloadRisk],
    ) -> Vec<ReassignmentRecommendation> {
        rebalance::recommend(loads, risks, &self.config)
    }

    /// Members over the overload threshold across every active unit, most
    /// severe first.
    #[must_use]
    #[instrument(skip(self))]
    pub fn identify_overload_risks(&self) -> Vec<OverloadRisk> {
        let snapshot = self.snapshot();
        let risks = self.risks_in(&self.unit_loads(&snapshot));
        info!(risks = risks.len(), "overload risks identified");
        risks
    }

    /// Proposed moves that bring overloaded members back toward the threshold.
    #[must_use]
    #[instrument(skip(self))]
    pub fn generate_reassignment_recommendations(&self) -> Vec<ReassignmentRecommendation> {
        let snapshot = self.snapshot();
        let loads = self.unit_loads(&snapshot);
        let risks = self.risks_in(&loads);
        let proposals = self.recommendations_in(&loads, &risks);
        info!(
            risks = risks.len(),
            recommendations = proposals.len(),
            "reassignment recommendations generated"
        );
        proposals
    }

    /// Active units ranked by how well they suit `item_id`, best first.
    /// Inactive units are left out; an unknown item yields nothing.
    #[must_use]
    #[instrument(skip(self))]
    pub fn suggest_units_for_work_item(&self, item_id: ItemId) -> Vec<UnitSuggestion> {
        let snapshot = self.snapshot();
        let Some(item) = snapshot.items.get(&item_id) else {
            debug!(item = %item_id, "no such work item to place");
            return Vec::new();
        };
        let item_load = self.calculator().calculate_work_item_load(item);

        let mut suggestions: Vec<UnitSuggestion> = snapshot
            .units
            .iter()
            .filter(|unit| unit.active)
            .map(|unit| UnitSuggestion {
                unit: unit.clone(),
                score: suggest::score_unit(unit, item, item_load, &snapshot),
            })
            .collect();
        suggest::rank(&mut suggestions);
        info!(item = %item_id, candidates = suggestions.len(), "units ranked for work item");
        suggestions
    }

    /// Per-member load breakdown for one unit, active or not.
    #[must_use]
    pub fn member_loads(&self, unit_id: UnitId) -> Option<UnitLoad> {
        let unit = self.units.find_by_id(unit_id)?;
        let assignments = self.assignments.snapshot_unit(unit_id);
        let items: BTreeMap<_, _> = self
            .items
            .snapshot()
            .into_iter()
            .map(|item| (item.id, item))
            .collect();
        let loads = load::compute_unit_load(&unit, Some(&assignments), &items, self.calculator());
        debug!(unit = %unit_id, members = loads.member_count, total = loads.total_load, "member loads computed");
        Some(loads)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit_load(capacity: u32, members: &[(&str, u64, usize)]) -> UnitLoad {
        let member_count = members.len();
        UnitLoad {
            unit_id: UnitId::new(),
            unit_name: "Core".to_string(),
            capacity,
            recorded_load: 0,
            member_count,
            fair_share: u64::from(capacity) / u64::try_from(member_count.max(1)).unwrap_or(1),
            total_load: members.iter().map(|m| m.1).sum(),
            members: members
                .iter()
                .map(|(name, load, assigned)| MemberLoad {
                    member: (*name).to_string(),
                    declared: true,
                    assigned_items: *assigned,
                    open_items: Vec::new(),
                    load: *load,
                    utilization_percent: member_utilization(*load, member_count, capacity),
                })
                .collect(),
            missing_items: 0,
        }
    }

    #[test]
    fn severity_bands() {
        assert_eq!(OverloadSeverity::from_utilization(Some(126)), OverloadSeverity::Elevated);
        assert_eq!(OverloadSeverity::from_utilization(Some(150)), OverloadSeverity::High);
        assert_eq!(OverloadSeverity::from_utilization(Some(199)), OverloadSeverity::High);
        assert_eq!(OverloadSeverity::from_utilization(Some(200)), OverloadSeverity::Critical);
        assert_eq!(OverloadSeverity::from_utilization(None), OverloadSeverity::Critical);
        assert!(OverloadSeverity::Critical > OverloadSeverity::Elevated);
    }

    #[test]
    fn threshold_is_exclusive() {
        // fair share 20, so a load of 25 lands exactly on 125%
        let unit = unit_load(80, &[("a", 25, 1), ("b", 26, 1), ("c", 0, 0), ("d", 0, 0)]);
        let risks = risks_for(&unit, 125);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].member, "b");
        assert_eq!(risks[0].capacity_share, 20);
    }

    #[test]
    fn zero_capacity_flags_members_with_assignments() {
        let unit = unit_load(0, &[("a", 0, 2), ("b", 0, 0)]);
        let risks = risks_for(&unit, 125);
        assert_eq!(risks.len(), 1);
        assert_eq!(risks[0].member, "a");
        assert_eq!(risks[0].utilization_percent, None);
        assert_eq!(risks[0].severity, OverloadSeverity::Critical);
    }

    #[test]
    fn ranking_orders_by_severity_then_utilization_then_names() {
        let mut risks = vec![
            risk("Beta", "x", Some(140), 14),
            risk("Alpha", "y", Some(210), 21),
            risk("Alpha", "z", None, 0),
            risk("Alpha", "b", Some(140), 14),
            risk("Alpha", "a", Some(140), 14),
        ];
        rank_risks(&mut risks);
        let order: Vec<(&str, &str)> = risks
            .iter()
            .map(|r| (r.unit_name.as_str(), r.member.as_str()))
            .collect();
        assert_eq!(
            order,
            vec![
                ("Alpha", "z"),
                ("Alpha", "y"),
                ("Alpha", "a"),
                ("Alpha", "b"),
                ("Beta", "x"),
            ]
        );
    }

    fn risk(unit: &str, member: &str, utilization: Option<u64>, load: u64) -> OverloadRisk {
        OverloadRisk {
            unit_id: UnitId::new(),
            unit_name: unit.to_string(),
            member: member.to_string(),
            current_load: load,
            capacity_share: 10,
            utilization_percent: utilization,
            severity: OverloadSeverity::from_utilization(utilization),
            contributing_items: Vec::new(),
        }
    }
}
