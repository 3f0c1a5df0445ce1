//! Records returned by the dashboard aggregator. All of them serialize; the
//! aggregator itself picks no output format.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use loadstone_core::{
    CynefinDomain, ItemId, OrganizationalUnit, UnitId, UnitType, WorkItemType, WorkParadigm,
};

use super::distribution::DistributionReport;
use super::estimation::{AccuracyStats, EstimationSample, UnitAccuracy};
use super::trend::{TrendInterval, TrendPoint, UnitTrendSeries};
use crate::capacity::{OverloadRisk, ReassignmentRecommendation};

// ---------------------------------------------------------------------------
// Overview
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DashboardData {
    pub generated_at: DateTime<Utc>,
    pub total_items: usize,
    /// Neither completed nor blocked.
    pub active_items: usize,
    pub blocked_items: usize,
    pub completed_items: usize,
    /// Every domain is present, zero counts included.
    pub by_domain: BTreeMap<CynefinDomain, usize>,
    pub by_paradigm: BTreeMap<WorkParadigm, usize>,
    pub by_type: BTreeMap<WorkItemType, usize>,
    pub by_tag: BTreeMap<String, usize>,
    pub units: Vec<UnitSummary>,
    pub overload_risks: Vec<OverloadRisk>,
    pub recommendations: Vec<ReassignmentRecommendation>,
    pub active_load: LoadSummary,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadSummary {
    pub total: u64,
    /// Zero when there are no active items.
    pub average: f64,
    pub max: u32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSummary {
    pub unit_id: UnitId,
    pub name: String,
    pub unit_type: UnitType,
    pub active: bool,
    pub member_count: usize,
    pub capacity: u32,
    pub recorded_load: u32,
    /// Summed load of open assigned items.
    pub assigned_load: u64,
    pub utilization_percent: Option<u64>,
    pub assigned_items: usize,
    pub associated_items: usize,
    pub overloaded_members: usize,
}

// ---------------------------------------------------------------------------
// Cognitive load
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CognitiveLoadDashboardData {
    pub generated_at: DateTime<Utc>,
    pub units: Vec<UnitLoadView>,
    pub total_capacity: u64,
    pub total_recorded_load: u64,
    pub total_assigned_load: u64,
    pub system_utilization_percent: Option<u64>,
    /// Members at or above the overloaded-member threshold, most utilized
    /// first.
    pub overloaded_members: Vec<MemberLoadView>,
    /// Members below the threshold, least utilized first.
    pub underloaded_members: Vec<MemberLoadView>,
    /// Load of open items, every domain present.
    pub load_by_domain: BTreeMap<CynefinDomain, u64>,
    pub load_by_paradigm: BTreeMap<WorkParadigm, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitLoadView {
    pub unit_id: UnitId,
    pub name: String,
    pub capacity: u32,
    pub recorded_load: u32,
    pub assigned_load: u64,
    pub utilization_percent: Option<u64>,
    pub available_capacity: i64,
    pub members: Vec<MemberLoadView>,
    /// Open assigned load in domains the unit does not list as expertise.
    /// Zero for units that declare no expertise.
    pub load_outside_expertise: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MemberLoadView {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub member: String,
    pub load: u64,
    pub open_items: usize,
    pub utilization_percent: Option<u64>,
}

// ---------------------------------------------------------------------------
// Distributions
// ---------------------------------------------------------------------------

pub type DomainDistributionData = DistributionReport<CynefinDomain>;
pub type ParadigmDistributionData = DistributionReport<WorkParadigm>;

// ---------------------------------------------------------------------------
// Trend
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendAnalysisData {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub interval: TrendInterval,
    pub points: Vec<TrendPoint>,
    pub unit_series: Vec<UnitTrendSeries>,
}

// ---------------------------------------------------------------------------
// Unit
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitDashboardData {
    pub generated_at: DateTime<Utc>,
    pub unit: OrganizationalUnit,
    pub members: Vec<UnitMemberView>,
    /// Active associated, owned or assigned items.
    pub active_items: Vec<ItemSummary>,
    pub owned_item_ids: BTreeSet<ItemId>,
    pub capacity: u32,
    pub recorded_load: u32,
    pub assigned_load: u64,
    pub utilization_percent: Option<u64>,
    pub domain_counts: BTreeMap<CynefinDomain, usize>,
    pub paradigm_counts: BTreeMap<WorkParadigm, usize>,
    /// Open items due within the upcoming window, soonest first.
    pub upcoming: Vec<ItemSummary>,
    /// Items completed within the recent window, latest first.
    pub recently_completed: Vec<ItemSummary>,
    pub risks: Vec<OverloadRisk>,
    pub recommendations: Vec<ReassignmentRecommendation>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitMemberView {
    pub member: String,
    pub declared: bool,
    pub assigned_items: usize,
    pub open_items: usize,
    pub load: u64,
    pub utilization_percent: Option<u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemSummary {
    pub id: ItemId,
    pub title: String,
    pub item_type: WorkItemType,
    pub domain: CynefinDomain,
    pub paradigm: WorkParadigm,
    pub load: u32,
    pub blocked: bool,
    pub due_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    pub assignee: Option<String>,
}

// ---------------------------------------------------------------------------
// Estimation
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationAccuracyData {
    pub start: DateTime<Utc>,
    pub end: DateTime<Utc>,
    pub total_items_analyzed: usize,
    pub overall: AccuracyStats,
    pub accuracy_by_domain: BTreeMap<CynefinDomain, AccuracyStats>,
    pub accuracy_by_paradigm: BTreeMap<WorkParadigm, AccuracyStats>,
    pub accuracy_by_type: BTreeMap<WorkItemType, AccuracyStats>,
    pub accuracy_by_tag: BTreeMap<String, AccuracyStats>,
    pub accuracy_by_unit: Vec<UnitAccuracy>,
    /// Largest underestimates first.
    pub worst_estimations: Vec<EstimationSample>,
    /// Closest estimates first.
    pub best_estimations: Vec<EstimationSample>,
}
