//! Bucketed item distributions over a closed enumeration.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use loadstone_core::{CognitiveLoadCalculator, CynefinDomain, ItemId, UnitId, WorkItem, WorkParadigm};

use crate::snapshot::Snapshot;

/// A closed set of buckets an item falls into exactly one of.
pub trait DistributionKey: Copy + Ord + 'static {
    fn all() -> &'static [Self];
    fn of(item: &WorkItem) -> Self;
}

impl DistributionKey for CynefinDomain {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn of(item: &WorkItem) -> Self {
        item.domain
    }
}

impl DistributionKey for WorkParadigm {
    fn all() -> &'static [Self] {
        &Self::ALL
    }

    fn of(item: &WorkItem) -> Self {
        item.paradigm
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DistributionBucket {
    pub count: usize,
    /// Share of all items, 0 to 100.
    pub percentage: f64,
    pub item_ids: Vec<ItemId>,
    pub average_load: f64,
    /// Completed share of the bucket, 0 to 1.
    pub completion_rate: f64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitBucketCounts<K: Ord> {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub counts: BTreeMap<K, usize>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DistributionReport<K: Ord> {
    pub total_items: usize,
    /// Every key is present, empty buckets included.
    pub buckets: BTreeMap<K, DistributionBucket>,
    /// Counts over each unit's associated and assigned items.
    pub by_unit: Vec<UnitBucketCounts<K>>,
}

#[allow(clippy::cast_precision_loss)]
pub(crate) fn build<K: DistributionKey>(
    snapshot: &Snapshot,
    calculator: &dyn CognitiveLoadCalculator,
) -> DistributionReport<K> {
    let total_items = snapshot.items.len();

    let mut grouped: BTreeMap<K, Vec<&WorkItem>> =
        K::all().iter().map(|key| (*key, Vec::new())).collect();
    for item in snapshot.items.values() {
        grouped.entry(K::of(item)).or_default().push(item);
    }

    let buckets = grouped
        .into_iter()
        .map(|(key, items)| {
            let count = items.len();
            let bucket = if count == 0 {
                DistributionBucket::default()
            } else {
                let load: u64 = items
                    .iter()
                    .map(|item| u64::from(calculator.calculate_work_item_load(item)))
                    .sum();
                let completed = items.iter().filter(|item| item.completed).count();
                DistributionBucket {
                    count,
                    percentage: count as f64 * 100.0 / total_items as f64,
                    item_ids: items.iter().map(|item| item.id).collect(),
                    average_load: load as f64 / count as f64,
                    completion_rate: completed as f64 / count as f64,
                }
            };
            (key, bucket)
        })
        .collect();

    let by_unit = snapshot
        .units
        .iter()
        .map(|unit| {
            let mut counts: BTreeMap<K, usize> = K::all().iter().map(|key| (*key, 0)).collect();
            for item in snapshot.unit_items(unit.id) {
                *counts.entry(K::of(item)).or_default() += 1;
            }
            UnitBucketCounts {
                unit_id: unit.id,
                unit_name: unit.name.clone(),
                counts,
            }
        })
        .collect();

    DistributionReport {
        total_items,
        buckets,
        by_unit,
    }
}
