//! Reassignment proposals for overloaded members.
//!
//! # Algorithm
//!
//! Risks are visited in rank order. For each flagged member of a unit with at
//! least two members and non-zero capacity, the member's open items are
//! walked from lightest to heaviest. An item moves to the member with the
//! lowest projected load among those still under the low-water mark, even when
//! the destination ends up heavier than the source was before the move.
//! Walking stops once the source is back at or under the overload threshold.
//! Projected loads carry over between proposals, so later proposals see the
//! effect of earlier ones.
//!
//! Nothing is applied. Callers enact a proposal with `AssignmentStore::assign`.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

use loadstone_core::{CapacityConfig, ItemId, UnitId};

use super::OverloadRisk;
use super::load::{UnitLoad, member_utilization};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReassignmentRecommendation {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub source_member: String,
    pub destination_member: String,
    pub item_id: ItemId,
    pub item_load: u32,
    /// Source load after this and every earlier proposal in the unit.
    pub projected_source_load: u64,
    pub projected_destination_load: u64,
    pub rationale: String,
}

pub(crate) fn recommend(
    loads: &[UnitLoad],
    risks: &[OverloadRisk],
    config: &CapacityConfig,
) -> Vec<ReassignmentRecommendation> {
    let by_id: BTreeMap<UnitId, &UnitLoad> = loads.iter().map(|unit| (unit.unit_id, unit)).collect();
    let mut projected: BTreeMap<UnitId, BTreeMap<&str, u64>> = BTreeMap::new();
    let mut proposals = Vec::new();

    for risk in risks {
        if proposals.len() >= config.max_recommendations {
            break;
        }
        let Some(&unit) = by_id.get(&risk.unit_id) else {
            continue;
        };
        if unit.member_count < 2 || unit.capacity == 0 {
            continue;
        }
        let Some(source) = unit.member(&risk.member) else {
            continue;
        };

        let utilization = |load: u64| {
            member_utilization(load, unit.member_count, unit.capacity).unwrap_or(u64::MAX)
        };
        let threshold = u64::from(config.overload_threshold_percent);
        let low_water = u64::from(config.low_water_percent);

        let unit_loads = projected.entry(unit.unit_id).or_insert_with(|| {
            unit.members
                .iter()
                .map(|member| (member.member.as_str(), member.load))
                .collect()
        });

        for item in &source.open_items {
            let source_load = unit_loads.get(source.member.as_str()).copied().unwrap_or(source.load);
            if utilization(source_load) <= threshold {
                break;
            }
            let item_load = u64::from(item.load);

            let destination = lightest(
                unit_loads
                    .iter()
                    .filter(|(name, load)| **name != source.member && utilization(**load) < low_water)
                    .map(|(name, load)| (*name, *load)),
            );
            let Some((destination, destination_load)) = destination else {
                continue;
            };

            let new_source = source_load.saturating_sub(item_load);
            let new_destination = destination_load.saturating_add(item_load);
            unit_loads.insert(source.member.as_str(), new_source);
            unit_loads.insert(destination, new_destination);

            debug!(
                unit = %unit.unit_id,
                item = %item.item_id,
                from = %source.member,
                to = destination,
                load = item.load,
                "reassignment proposed"
            );
            proposals.push(ReassignmentRecommendation {
                unit_id: unit.unit_id,
                unit_name: unit.unit_name.clone(),
                source_member: source.member.clone(),
                destination_member: destination.to_string(),
                item_id: item.item_id,
                item_load: item.load,
                projected_source_load: new_source,
                projected_destination_load: new_destination,
                rationale: format!(
                    "{} is at {}% of fair share; moving load {} brings it to {}% and {} to {}%",
                    source.member,
                    utilization(source_load),
                    item.load,
                    utilization(new_source),
                    destination,
                    utilization(new_destination),
                ),
            });
            if proposals.len() >= config.max_recommendations {
                break;
            }
        }
    }
    proposals
}

/// Lowest load first, then member name.
fn lightest<'a>(pool: impl Iterator<Item = (&'a str, u64)>) -> Option<(&'a str, u64)> {
    pool.min_by(|a, b| a.1.cmp(&b.1).then(a.0.cmp(b.0)))
}
