//! Load over time, bucketed by day, week or calendar month.
//!
//! Buckets are aligned to the requested start: the first bucket begins at
//! `start` and each following bucket begins one interval later, until a
//! bucket would begin after `end`. An item is open at a point in time when it
//! was created before it and not yet completed. Items flagged completed
//! without a completion time are never open.

use chrono::{DateTime, Duration, Months, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};

use loadstone_core::{
    CognitiveLoadCalculator, CynefinDomain, UnitId, WorkItem, WorkParadigm,
    model::ParseEnumError,
};

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrendInterval {
    Daily,
    Weekly,
    Monthly,
}

impl TrendInterval {
    /// Start of bucket `index`, counted from `start`. `None` past the
    /// representable range.
    #[must_use]
    pub fn bucket_start(self, start: DateTime<Utc>, index: u32) -> Option<DateTime<Utc>> {
        match self {
            Self::Daily => start.checked_add_signed(Duration::days(i64::from(index))),
            Self::Weekly => start.checked_add_signed(Duration::weeks(i64::from(index))),
            Self::Monthly => start.checked_add_months(Months::new(index)),
        }
    }
}

impl fmt::Display for TrendInterval {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
        })
    }
}

impl FromStr for TrendInterval {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "daily" | "day" => Ok(Self::Daily),
            "weekly" | "week" => Ok(Self::Weekly),
            "monthly" | "month" => Ok(Self::Monthly),
            _ => Err(ParseEnumError {
                expected: "trend interval",
                got: s.to_string(),
            }),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub bucket_start: DateTime<Utc>,
    /// Exclusive.
    pub bucket_end: DateTime<Utc>,
    /// Load of items open at `bucket_end`.
    pub open_load: u64,
    pub open_items: usize,
    /// Created within the bucket.
    pub new_items: usize,
    /// Completed within the bucket.
    pub completed_items: usize,
    pub load_by_domain: BTreeMap<CynefinDomain, u64>,
    pub load_by_paradigm: BTreeMap<WorkParadigm, u64>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitTrendSeries {
    pub unit_id: UnitId,
    pub unit_name: String,
    /// Open load at the end of each bucket, parallel to the points.
    pub open_load: Vec<u64>,
}

fn open_at(item: &WorkItem, at: DateTime<Utc>) -> bool {
    if item.created_at >= at {
        return false;
    }
    match (item.completed, item.completed_at) {
        (_, Some(done)) => done >= at,
        (true, None) => false,
        (false, None) => true,
    }
}

fn within(at: Option<DateTime<Utc>>, from: DateTime<Utc>, until: DateTime<Utc>) -> bool {
    at.is_some_and(|at| at >= from && at < until)
}

/// `[start, end)` windows for every bucket beginning at or before `end`.
pub(crate) fn buckets(
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: TrendInterval,
) -> Vec<(DateTime<Utc>, DateTime<Utc>)> {
    let mut windows = Vec::new();
    let mut index = 0_u32;
    let mut cursor = start;
    while cursor <= end {
        let Some(next) = index
            .checked_add(1)
            .and_then(|next| interval.bucket_start(start, next))
        else {
            break;
        };
        windows.push((cursor, next));
        cursor = next;
        index += 1;
    }
    windows
}

pub(crate) fn build(
    snapshot: &Snapshot,
    calculator: &dyn CognitiveLoadCalculator,
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    interval: TrendInterval,
) -> (Vec<TrendPoint>, Vec<UnitTrendSeries>) {
    let windows = buckets(start, end, interval);
    let loads: BTreeMap<_, u64> = snapshot
        .items
        .values()
        .map(|item| (item.id, u64::from(calculator.calculate_work_item_load(item))))
        .collect();
    let load_of = |item: &WorkItem| loads.get(&item.id).copied().unwrap_or_default();

    let points = windows
        .iter()
        .map(|&(bucket_start, bucket_end)| {
            let mut point = TrendPoint {
                bucket_start,
                bucket_end,
                open_load: 0,
                open_items: 0,
                new_items: 0,
                completed_items: 0,
                load_by_domain: CynefinDomain::ALL.iter().map(|d| (*d, 0)).collect(),
                load_by_paradigm: WorkParadigm::ALL.iter().map(|p| (*p, 0)).collect(),
            };
            for item in snapshot.items.values() {
                if within(Some(item.created_at), bucket_start, bucket_end) {
                    point.new_items += 1;
                }
                if within(item.completed_at, bucket_start, bucket_end) {
                    point.completed_items += 1;
                }
                if open_at(item, bucket_end) {
                    let load = load_of(item);
                    point.open_items += 1;
                    point.open_load += load;
                    *point.load_by_domain.entry(item.domain).or_default() += load;
                    *point.load_by_paradigm.entry(item.paradigm).or_default() += load;
                }
            }
            point
        })
        .collect();

    let unit_series = snapshot
        .units
        .iter()
        .map(|unit| {
            let items = snapshot.unit_items(unit.id);
            UnitTrendSeries {
                unit_id: unit.id,
                unit_name: unit.name.clone(),
                open_load: windows
                    .iter()
                    .map(|&(_, bucket_end)| {
                        items
                            .iter()
                            .filter(|item| open_at(item, bucket_end))
                            .map(|item| load_of(item))
                            .sum()
                    })
                    .collect(),
            }
        })
        .collect();

    (points, unit_series)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(y: i32, m: u32, d: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(y, m, d, 0, 0, 0).single().expect("valid date")
    }

    #[test]
    fn parses_interval_names() {
        assert_eq!("Daily".parse::<TrendInterval>(), Ok(TrendInterval::Daily));
        assert_eq!(" week ".parse::<TrendInterval>(), Ok(TrendInterval::Weekly));
        assert_eq!("MONTHLY".parse::<TrendInterval>(), Ok(TrendInterval::Monthly));
        assert!("hourly".parse::<TrendInterval>().is_err());
    }

    #[test]
    fn daily_buckets_include_the_end_day() {
        let windows = buckets(at(2026, 3, 1), at(2026, 3, 3), TrendInterval::Daily);
        assert_eq!(windows.len(), 3);
        assert_eq!(windows[2], (at(2026, 3, 3), at(2026, 3, 4)));
    }

    #[test]
    fn weekly_buckets_align_to_start() {
        let windows = buckets(at(2026, 3, 4), at(2026, 3, 20), TrendInterval::Weekly);
        let starts: Vec<_> = windows.iter().map(|w| w.0).collect();
        assert_eq!(starts, vec![at(2026, 3, 4), at(2026, 3, 11), at(2026, 3, 18)]);
    }

    #[test]
    fn monthly_buckets_use_calendar_months() {
        let windows = buckets(at(2026, 1, 31), at(2026, 4, 1), TrendInterval::Monthly);
        let starts: Vec<_> = windows.iter().map(|w| w.0).collect();
        // Each start is computed from the original start, so the day does not
        // drift after a short month.
        assert_eq!(
            starts,
            vec![at(2026, 1, 31), at(2026, 2, 28), at(2026, 3, 31)]
        );
        assert_eq!(windows[1].1, at(2026, 3, 31));
    }

    #[test]
    fn start_after_end_yields_nothing() {
        assert!(buckets(at(2026, 5, 1), at(2026, 4, 1), TrendInterval::Daily).is_empty());
    }
}
