//! Estimated versus actual effort for completed items.
//!
//! An item is sampled when it completed inside the requested range and its
//! metadata carries positive `estimated_hours` and `actual_hours`. Per item,
//! accuracy is `100 - |actual - estimated| / estimated * 100`, floored at 0.
//! Bias is the mean of `estimated - actual`: positive means work was
//! overestimated.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use loadstone_core::{
    CynefinDomain, ItemId, UnitId, WorkItem, WorkParadigm,
    model::item::{ACTUAL_HOURS_KEY, ESTIMATED_HOURS_KEY},
};

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EstimationSample {
    pub item_id: ItemId,
    pub title: String,
    pub domain: CynefinDomain,
    pub paradigm: WorkParadigm,
    pub estimated_hours: f64,
    pub actual_hours: f64,
    /// `actual - estimated`; positive when the work ran over.
    pub deviation_hours: f64,
    pub deviation_percent: f64,
    pub accuracy_percent: f64,
}

impl EstimationSample {
    fn from_item(item: &WorkItem) -> Option<Self> {
        let estimated = item.metadata_hours(ESTIMATED_HOURS_KEY)?;
        let actual = item.metadata_hours(ACTUAL_HOURS_KEY)?;
        let deviation = actual - estimated;
        let deviation_percent = deviation / estimated * 100.0;
        Some(Self {
            item_id: item.id,
            title: item.title.clone(),
            domain: item.domain,
            paradigm: item.paradigm,
            estimated_hours: estimated,
            actual_hours: actual,
            deviation_hours: deviation,
            deviation_percent,
            accuracy_percent: (100.0 - deviation_percent.abs()).max(0.0),
        })
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AccuracyStats {
    pub count: usize,
    pub accuracy_percent: f64,
    pub mean_absolute_error_hours: f64,
    /// Mean of `estimated - actual`.
    pub bias_hours: f64,
}

impl AccuracyStats {
    #[allow(clippy::cast_precision_loss)]
    fn from_samples<'a>(samples: impl IntoIterator<Item = &'a EstimationSample>) -> Self {
        let mut stats = Self::default();
        for sample in samples {
            stats.count += 1;
            stats.accuracy_percent += sample.accuracy_percent;
            stats.mean_absolute_error_hours += sample.deviation_hours.abs();
            stats.bias_hours -= sample.deviation_hours;
        }
        if stats.count > 0 {
            let n = stats.count as f64;
            stats.accuracy_percent /= n;
            stats.mean_absolute_error_hours /= n;
            stats.bias_hours /= n;
        }
        stats
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnitAccuracy {
    pub unit_id: UnitId,
    pub unit_name: String,
    pub stats: AccuracyStats,
}

pub(crate) struct EstimationReport {
    pub samples: usize,
    pub overall: AccuracyStats,
    pub by_domain: BTreeMap<CynefinDomain, AccuracyStats>,
    pub by_paradigm: BTreeMap<WorkParadigm, AccuracyStats>,
    pub by_type: BTreeMap<loadstone_core::WorkItemType, AccuracyStats>,
    pub by_tag: BTreeMap<String, AccuracyStats>,
    pub by_unit: Vec<UnitAccuracy>,
    pub worst: Vec<EstimationSample>,
    pub best: Vec<EstimationSample>,
}

fn group<K: Ord>(
    pairs: impl IntoIterator<Item = (K, usize)>,
    samples: &[EstimationSample],
) -> BTreeMap<K, AccuracyStats> {
    let mut grouped: BTreeMap<K, Vec<usize>> = BTreeMap::new();
    for (key, index) in pairs {
        grouped.entry(key).or_default().push(index);
    }
    grouped
        .into_iter()
        .map(|(key, indices)| {
            (
                key,
                AccuracyStats::from_samples(indices.iter().map(|i| &samples[*i])),
            )
        })
        .collect()
}

pub(crate) fn build(
    snapshot: &Snapshot,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    ranking_limit: usize,
) -> EstimationReport {
    let sampled: Vec<(&WorkItem, EstimationSample)> = snapshot
        .items
        .values()
        .filter(|item| item.completed)
        .filter(|item| item.completed_at.is_some_and(|at| at >= start && at <= end))
        .filter_map(|item| EstimationSample::from_item(item).map(|sample| (item, sample)))
        .collect();
    let (items, samples): (Vec<&WorkItem>, Vec<EstimationSample>) = sampled.into_iter().unzip();

    let indexed = || items.iter().enumerate();
    let by_domain = group(indexed().map(|(i, item)| (item.domain, i)), &samples);
    let by_paradigm = group(indexed().map(|(i, item)| (item.paradigm, i)), &samples);
    let by_type = group(indexed().map(|(i, item)| (item.item_type, i)), &samples);
    let by_tag = group(
        indexed().flat_map(|(i, item)| item.tags.iter().map(move |tag| (tag.clone(), i))),
        &samples,
    );
    let by_unit_id = group(
        indexed().filter_map(|(i, item)| snapshot.owning_unit.get(&item.id).map(|unit| (*unit, i))),
        &samples,
    );
    let by_unit = by_unit_id
        .into_iter()
        .filter_map(|(unit_id, stats)| {
            snapshot.unit(unit_id).map(|unit| UnitAccuracy {
                unit_id,
                unit_name: unit.name.clone(),
                stats,
            })
        })
        .collect();

    let mut worst = samples.clone();
    worst.sort_by(|a, b| {
        b.deviation_hours
            .total_cmp(&a.deviation_hours)
            .then(a.item_id.cmp(&b.item_id))
    });
    worst.truncate(ranking_limit);

    let mut best = samples.clone();
    best.sort_by(|a, b| {
        a.deviation_hours
            .abs()
            .total_cmp(&b.deviation_hours.abs())
            .then(a.item_id.cmp(&b.item_id))
    });
    best.truncate(ranking_limit);

    EstimationReport {
        samples: samples.len(),
        overall: AccuracyStats::from_samples(&samples),
        by_domain,
        by_paradigm,
        by_type,
        by_tag,
        by_unit,
        worst,
        best,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use loadstone_core::WorkItemType;

    fn sample(estimated: &str, actual: &str) -> Option<EstimationSample> {
        let item = WorkItem::new(
            "x",
            WorkItemType::Task,
            CynefinDomain::Obvious,
            WorkParadigm::Task,
        )
        .meta(ESTIMATED_HOURS_KEY, estimated)
        .meta(ACTUAL_HOURS_KEY, actual);
        EstimationSample::from_item(&item)
    }

    #[test]
    fn deviation_is_actual_minus_estimated() {
        let over = sample("10", "15").expect("valid sample");
        assert!((over.deviation_hours - 5.0).abs() < f64::EPSILON);
        assert!((over.deviation_percent - 50.0).abs() < 1e-9);
        assert!((over.accuracy_percent - 50.0).abs() < 1e-9);

        let way_over = sample("2", "10").expect("valid sample");
        assert!(way_over.accuracy_percent.abs() < f64::EPSILON);
    }

    #[test]
    fn non_positive_hours_are_not_sampled() {
        assert!(sample("0", "4").is_none());
        assert!(sample("4", "-1").is_none());
        assert!(sample("n/a", "4").is_none());
    }

    #[test]
    fn bias_is_positive_for_overestimates() {
        let samples = [
            sample("10", "8").expect("valid"),
            sample("10", "6").expect("valid"),
        ];
        let stats = AccuracyStats::from_samples(&samples);
        assert_eq!(stats.count, 2);
        assert!((stats.bias_hours - 3.0).abs() < 1e-9);
        assert!((stats.mean_absolute_error_hours - 3.0).abs() < 1e-9);
        assert!((stats.accuracy_percent - 70.0).abs() < 1e-9);
    }

    #[test]
    fn empty_stats_are_zero() {
        let stats = AccuracyStats::from_samples(&[]);
        assert_eq!(stats, AccuracyStats::default());
    }
}
