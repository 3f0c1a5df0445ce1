//! Read-only aggregate views over the stores.
//!
//! # Overview
//!
//! Every `generate_*` call captures a fresh snapshot of the unit store, the
//! assignment store and the work-item source, then derives its report from
//! that snapshot alone. Nothing is cached between calls.
//!
//! Malformed or missing data is skipped per item or per unit; no view fails
//! because one record is bad.

pub mod distribution;
pub mod estimation;
pub mod model;
pub mod trend;

use chrono::{DateTime, Duration, Utc};
use std::collections::{BTreeMap, BTreeSet};
use tracing::{debug, info, instrument};

use loadstone_core::{
    CognitiveLoadCalculator, CynefinDomain, DashboardConfig, UnitAssignments, UnitId, WorkItem,
    WorkItemType, WorkParadigm, Workspace,
};

pub use distribution::{DistributionBucket, DistributionKey, DistributionReport, UnitBucketCounts};
pub use estimation::{AccuracyStats, EstimationSample, UnitAccuracy};
pub use model::{
    CognitiveLoadDashboardData, DashboardData, DomainDistributionData, EstimationAccuracyData,
    ItemSummary, LoadSummary, MemberLoadView, ParadigmDistributionData, TrendAnalysisData,
    UnitDashboardData, UnitLoadView, UnitMemberView, UnitSummary,
};
pub use trend::{TrendInterval, TrendPoint, UnitTrendSeries};

use crate::capacity::load::{compute_unit_load, percent_of};
use crate::capacity::{
    CapacityAnalyzer, OverloadRisk, ReassignmentRecommendation, UnitLoad, rank_risks, risks_for,
};
use crate::snapshot::Snapshot;

#[derive(Debug, Clone)]
pub struct DashboardAggregator {
    analyzer: CapacityAnalyzer,
    config: DashboardConfig,
}

fn counts_for<K: Ord + Copy>(all: &[K], keys: impl IntoIterator<Item = K>) -> BTreeMap<K, usize> {
    let mut counts: BTreeMap<K, usize> = all.iter().map(|key| (*key, 0)).collect();
    for key in keys {
        *counts.entry(key).or_default() += 1;
    }
    counts
}

fn summarize(
    item: &WorkItem,
    calculator: &dyn CognitiveLoadCalculator,
    assignee: Option<String>,
) -> ItemSummary {
    ItemSummary {
        id: item.id,
        title: item.title.clone(),
        item_type: item.item_type,
        domain: item.domain,
        paradigm: item.paradigm,
        load: calculator.calculate_work_item_load(item),
        blocked: item.blocked,
        due_at: item.due_at,
        completed_at: item.completed_at,
        assignee,
    }
}

impl DashboardAggregator {
    #[must_use]
    pub const fn new(analyzer: CapacityAnalyzer, config: DashboardConfig) -> Self {
        Self { analyzer, config }
    }

    #[must_use]
    pub fn from_workspace(workspace: &Workspace) -> Self {
        Self::new(
            CapacityAnalyzer::from_workspace(workspace),
            workspace.config().dashboard,
        )
    }

    #[must_use]
    pub const fn analyzer(&self) -> &CapacityAnalyzer {
        &self.analyzer
    }

    fn calculator(&self) -> &dyn CognitiveLoadCalculator {
        self.analyzer.calculator()
    }

    // -----------------------------------------------------------------------
    // Overview
    // -----------------------------------------------------------------------

    /// Item totals, distributions, unit summaries, risks and proposals.
    #[must_use]
    #[instrument(skip(self))]
    #[allow(clippy::cast_precision_loss)]
    pub fn generate_dashboard(&self) -> DashboardData {
        let snapshot = self.analyzer.snapshot();
        let loads = self.analyzer.unit_loads(&snapshot);
        let overload_risks = self.analyzer.risks_in(&loads);
        let recommendations = self.analyzer.recommendations_in(&loads, &overload_risks);

        let items: Vec<&WorkItem> = snapshot.items.values().collect();
        let active: Vec<&WorkItem> = items.iter().copied().filter(|item| item.is_active()).collect();

        let active_loads: Vec<u32> = active
            .iter()
            .map(|item| self.calculator().calculate_work_item_load(item))
            .collect();
        let total: u64 = active_loads.iter().map(|load| u64::from(*load)).sum();
        let active_load = LoadSummary {
            total,
            average: if active_loads.is_empty() {
                0.0
            } else {
                total as f64 / active_loads.len() as f64
            },
            max: active_loads.iter().copied().max().unwrap_or(0),
        };

        let mut by_tag: BTreeMap<String, usize> = BTreeMap::new();
        for item in &items {
            let tags: BTreeSet<&String> = item.tags.iter().collect();
            for tag in tags {
                *by_tag.entry(tag.clone()).or_default() += 1;
            }
        }

        let units = self.unit_summaries(&snapshot, &loads, &overload_risks);

        let data = DashboardData {
            generated_at: Utc::now(),
            total_items: items.len(),
            active_items: active.len(),
            blocked_items: items.iter().filter(|item| item.blocked).count(),
            completed_items: items.iter().filter(|item| item.completed).count(),
            by_domain: counts_for(&CynefinDomain::ALL, items.iter().map(|item| item.domain)),
            by_paradigm: counts_for(&WorkParadigm::ALL, items.iter().map(|item| item.paradigm)),
            by_type: counts_for(&WorkItemType::ALL, items.iter().map(|item| item.item_type)),
            by_tag,
            units,
            overload_risks,
            recommendations,
            active_load,
        };
        info!(
            items = data.total_items,
            units = data.units.len(),
            risks = data.overload_risks.len(),
            "dashboard generated"
        );
        data
    }

    fn unit_summaries(
        &self,
        snapshot: &Snapshot,
        loads: &[UnitLoad],
        risks: &[OverloadRisk],
    ) -> Vec<UnitSummary> {
        snapshot
            .units
            .iter()
            .map(|unit| {
                // Inactive units are not analyzed; summarize them from the
                // raw snapshot.
                let computed = loads.iter().find(|load| load.unit_id == unit.id);
                let assigned_load = computed.map_or(0, |load| load.total_load);
                let member_count = computed.map_or(unit.members.len(), |load| load.member_count);
                UnitSummary {
                    unit_id: unit.id,
                    name: unit.name.clone(),
                    unit_type: unit.unit_type,
                    active: unit.active,
                    member_count,
                    capacity: unit.cognitive_capacity,
                    recorded_load: unit.current_load,
                    assigned_load,
                    utilization_percent: percent_of(
                        assigned_load,
                        u64::from(unit.cognitive_capacity),
                    ),
                    assigned_items: snapshot
                        .assignments_of(unit.id)
                        .map_or(0, UnitAssignments::len),
                    associated_items: snapshot.associated.get(&unit.id).map_or(0, BTreeSet::len),
                    overloaded_members: risks.iter().filter(|risk| risk.unit_id == unit.id).count(),
                }
            })
            .collect()
    }

    // -----------------------------------------------------------------------
    // Cognitive load
    // -----------------------------------------------------------------------

    /// Capacity against load per unit and member, with system totals.
    #[must_use]
    #[instrument(skip(self))]
    pub fn generate_cognitive_load_dashboard(&self) -> CognitiveLoadDashboardData {
        let snapshot = self.analyzer.snapshot();
        let loads = self.analyzer.unit_loads(&snapshot);

        let mut units = Vec::with_capacity(loads.len());
        let mut all_members = Vec::new();
        for load in &loads {
            let Some(unit) = snapshot.unit(load.unit_id) else {
                continue;
            };
            let members: Vec<MemberLoadView> = load
                .members
                .iter()
                .map(|member| MemberLoadView {
                    unit_id: load.unit_id,
                    unit_name: load.unit_name.clone(),
                    member: member.member.clone(),
                    load: member.load,
                    open_items: member.open_items.len(),
                    utilization_percent: member.utilization_percent,
                })
                .collect();

            let load_outside_expertise = if unit.domain_expertise.is_empty() {
                0
            } else {
                load.members
                    .iter()
                    .flat_map(|member| &member.open_items)
                    .filter(|open| {
                        snapshot
                            .items
                            .get(&open.item_id)
                            .is_some_and(|item| !unit.domain_expertise.contains(&item.domain))
                    })
                    .map(|open| u64::from(open.load))
                    .sum()
            };

            all_members.extend(members.iter().cloned());
            units.push(UnitLoadView {
                unit_id: unit.id,
                name: unit.name.clone(),
                capacity: unit.cognitive_capacity,
                recorded_load: unit.current_load,
                assigned_load: load.total_load,
                utilization_percent: load.utilization_percent(),
                available_capacity: unit.available_capacity(),
                members,
                load_outside_expertise,
            });
        }

        let threshold = u64::from(self.config.overloaded_member_percent);
        let limit = self.config.top_members_limit;
        let (mut overloaded, mut underloaded): (Vec<_>, Vec<_>) = all_members
            .into_iter()
            .filter(|member| member.utilization_percent.is_some())
            .partition(|member| member.utilization_percent.is_some_and(|util| util >= threshold));
        overloaded.sort_by(|a, b| {
            b.utilization_percent
                .cmp(&a.utilization_percent)
                .then_with(|| b.load.cmp(&a.load))
                .then_with(|| a.member.cmp(&b.member))
        });
        underloaded.sort_by(|a, b| {
            a.utilization_percent
                .cmp(&b.utilization_percent)
                .then_with(|| a.load.cmp(&b.load))
                .then_with(|| a.member.cmp(&b.member))
        });
        overloaded.truncate(limit);
        underloaded.truncate(limit);

        let mut load_by_domain: BTreeMap<CynefinDomain, u64> =
            CynefinDomain::ALL.iter().map(|d| (*d, 0)).collect();
        let mut load_by_paradigm: BTreeMap<WorkParadigm, u64> =
            WorkParadigm::ALL.iter().map(|p| (*p, 0)).collect();
        for item in snapshot.items.values().filter(|item| !item.completed) {
            let load = u64::from(self.calculator().calculate_work_item_load(item));
            *load_by_domain.entry(item.domain).or_default() += load;
            *load_by_paradigm.entry(item.paradigm).or_default() += load;
        }

        let total_capacity: u64 = units.iter().map(|u| u64::from(u.capacity)).sum();
        let total_assigned_load: u64 = units.iter().map(|u| u.assigned_load).sum();
        let data = CognitiveLoadDashboardData {
            generated_at: Utc::now(),
            total_capacity,
            total_recorded_load: units.iter().map(|u| u64::from(u.recorded_load)).sum(),
            total_assigned_load,
            system_utilization_percent: percent_of(total_assigned_load, total_capacity),
            units,
            overloaded_members: overloaded,
            underloaded_members: underloaded,
            load_by_domain,
            load_by_paradigm,
        };
        debug!(
            units = data.units.len(),
            overloaded = data.overloaded_members.len(),
            "cognitive load dashboard generated"
        );
        data
    }

    // -----------------------------------------------------------------------
    // Distributions
    // -----------------------------------------------------------------------

    #[must_use]
    #[instrument(skip(self))]
    pub fn generate_cynefin_distribution(&self) -> DomainDistributionData {
        distribution::build(&self.analyzer.snapshot(), self.calculator())
    }

    #[must_use]
    #[instrument(skip(self))]
    pub fn generate_work_paradigm_distribution(&self) -> ParadigmDistributionData {
        distribution::build(&self.analyzer.snapshot(), self.calculator())
    }

    // -----------------------------------------------------------------------
    // Trend
    // -----------------------------------------------------------------------

    /// Open load over `[start, end]`, one point per interval.
    #[must_use]
    #[instrument(skip(self))]
    pub fn generate_cognitive_load_trend(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
        interval: TrendInterval,
    ) -> TrendAnalysisData {
        let snapshot = self.analyzer.snapshot();
        let (points, unit_series) = trend::build(&snapshot, self.calculator(), start, end, interval);
        debug!(points = points.len(), "cognitive load trend generated");
        TrendAnalysisData {
            start,
            end,
            interval,
            points,
            unit_series,
        }
    }

    // -----------------------------------------------------------------------
    // Unit
    // -----------------------------------------------------------------------

    /// Detail view for one unit. `None` when the unit does not exist.
    #[must_use]
    pub fn generate_unit_dashboard(&self, unit_id: UnitId) -> Option<UnitDashboardData> {
        self.generate_unit_dashboard_at(unit_id, Utc::now())
    }

    /// [`generate_unit_dashboard`](Self::generate_unit_dashboard) with the
    /// upcoming and recent windows anchored at `now`.
    #[must_use]
    #[instrument(skip(self))]
    pub fn generate_unit_dashboard_at(
        &self,
        unit_id: UnitId,
        now: DateTime<Utc>,
    ) -> Option<UnitDashboardData> {
        let snapshot = self.analyzer.snapshot();
        let unit = snapshot.unit(unit_id)?.clone();
        let calculator = self.calculator();

        let load = compute_unit_load(
            &unit,
            snapshot.assignments_of(unit_id),
            &snapshot.items,
            calculator,
        );
        let mut risks: Vec<OverloadRisk> =
            risks_for(&load, self.analyzer.config().overload_threshold_percent);
        rank_risks(&mut risks);
        let recommendations: Vec<ReassignmentRecommendation> = self
            .analyzer
            .recommendations_in(std::slice::from_ref(&load), &risks);

        let assignee = |item: &WorkItem| {
            snapshot
                .assignments_of(unit_id)
                .and_then(|a| a.member_of(item.id))
                .map(str::to_string)
        };
        let items = snapshot.unit_items(unit_id);

        let active_items = items
            .iter()
            .copied()
            .filter(|item| item.is_active())
            .map(|item| summarize(item, calculator, assignee(item)))
            .collect();

        let upcoming_until = now + Duration::days(i64::from(self.config.upcoming_window_days));
        let mut upcoming: Vec<ItemSummary> = items
            .iter()
            .copied()
            .filter(|item| !item.completed)
            .filter(|item| item.due_at.is_some_and(|due| due >= now && due <= upcoming_until))
            .map(|item| summarize(item, calculator, assignee(item)))
            .collect();
        upcoming.sort_by(|a, b| a.due_at.cmp(&b.due_at).then(a.id.cmp(&b.id)));

        let recent_since = now - Duration::days(i64::from(self.config.recent_window_days));
        let mut recently_completed: Vec<ItemSummary> = items
            .iter()
            .copied()
            .filter(|item| item.completed)
            .filter(|item| item.completed_at.is_some_and(|at| at >= recent_since && at <= now))
            .map(|item| summarize(item, calculator, assignee(item)))
            .collect();
        recently_completed.sort_by(|a, b| b.completed_at.cmp(&a.completed_at).then(a.id.cmp(&b.id)));

        let members = load
            .members
            .iter()
            .map(|member| UnitMemberView {
                member: member.member.clone(),
                declared: member.declared,
                assigned_items: member.assigned_items,
                open_items: member.open_items.len(),
                load: member.load,
                utilization_percent: member.utilization_percent,
            })
            .collect();

        let owned_item_ids = snapshot
            .owning_unit
            .iter()
            .filter(|(_, owner)| **owner == unit_id)
            .map(|(item, _)| *item)
            .collect();

        let data = UnitDashboardData {
            generated_at: now,
            members,
            active_items,
            owned_item_ids,
            capacity: unit.cognitive_capacity,
            recorded_load: unit.current_load,
            assigned_load: load.total_load,
            utilization_percent: load.utilization_percent(),
            domain_counts: counts_for(&CynefinDomain::ALL, items.iter().map(|item| item.domain)),
            paradigm_counts: counts_for(
                &WorkParadigm::ALL,
                items.iter().map(|item| item.paradigm),
            ),
            upcoming,
            recently_completed,
            risks,
            recommendations,
            unit,
        };
        debug!(unit = %unit_id, items = items.len(), "unit dashboard generated");
        Some(data)
    }

    // -----------------------------------------------------------------------
    // Estimation
    // -----------------------------------------------------------------------

    /// Estimation accuracy for items completed within `[start, end]`.
    #[must_use]
    #[instrument(skip(self))]
    pub fn generate_estimation_accuracy_report(
        &self,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> EstimationAccuracyData {
        let snapshot = self.analyzer.snapshot();
        let report = estimation::build(&snapshot, start, end, self.config.estimation_ranking_limit);
        info!(samples = report.samples, "estimation accuracy report generated");
        EstimationAccuracyData {
            start,
            end,
            total_items_analyzed: report.samples,
            overall: report.overall,
            accuracy_by_domain: report.by_domain,
            accuracy_by_paradigm: report.by_paradigm,
            accuracy_by_type: report.by_type,
            accuracy_by_tag: report.by_tag,
            accuracy_by_unit: report.by_unit,
            worst_estimations: report.worst,
            best_estimations: report.best,
        }
    }

    // -----------------------------------------------------------------------
    // Capacity
    // -----------------------------------------------------------------------

    #[must_use]
    pub fn identify_overload_risks(&self) -> Vec<OverloadRisk> {
        self.analyzer.identify_overload_risks()
    }

    #[must_use]
    pub fn generate_reassignment_recommendations(&self) -> Vec<ReassignmentRecommendation> {
        self.analyzer.generate_reassignment_recommendations()
    }
}
