#![forbid(unsafe_code)]
//! loadstone-triage library.
//!
//! Read-only analysis over the loadstone stores: per-member load, overload
//! risks, reassignment proposals, unit placement suggestions and dashboard
//! views.
//!
//! # Conventions
//!
//! - **Errors**: analysis never fails; missing or malformed records are
//!   skipped and logged.
//! - **Logging**: Use `tracing` macros (`info!`, `warn!`, `debug!`).

pub mod capacity;
pub mod dashboard;
mod snapshot;

pub use capacity::{
    CapacityAnalyzer, ItemLoad, MemberLoad, OverloadRisk, OverloadSeverity,
    ReassignmentRecommendation, UnitLoad, UnitSuggestion, member_utilization,
};
pub use dashboard::{
    CognitiveLoadDashboardData, DashboardAggregator, DashboardData, DomainDistributionData,
    EstimationAccuracyData, ParadigmDistributionData, TrendAnalysisData, TrendInterval,
    UnitDashboardData,
};
