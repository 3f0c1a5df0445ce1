//! Ranking units as homes for a work item.
//!
//! Each active unit gets an additive suitability score:
//!
//! | Factor                                                   | Points |
//! |----------------------------------------------------------|--------|
//! | item domain in the unit's expertise                      | +50    |
//! | item paradigm among the unit's paradigms                 | +30    |
//! | recorded load plus the item fits capacity                | +20    |
//! | ...and lands between 70% and 90% of capacity             | +10    |
//! | item does not fit                                        | -50    |
//! | Complex item and at least three members                  | +15    |
//! | unit holds another item sharing type, domain or paradigm | +25    |

use serde::{Deserialize, Serialize};

use loadstone_core::{CynefinDomain, OrganizationalUnit, WorkItem};

use crate::snapshot::Snapshot;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UnitSuggestion {
    pub unit: OrganizationalUnit,
    pub score: i32,
}

pub(crate) fn score_unit(
    unit: &OrganizationalUnit,
    item: &WorkItem,
    item_load: u32,
    snapshot: &Snapshot,
) -> i32 {
    let mut score = 0;

    if unit.domain_expertise.contains(&item.domain) {
        score += 50;
    }
    if unit.work_paradigms.contains(&item.paradigm) {
        score += 30;
    }

    let capacity = i64::from(unit.cognitive_capacity);
    let recorded = i64::from(unit.current_load);
    let required = i64::from(item_load);
    if capacity - recorded >= required {
        score += 20;
        let after = (recorded + required) * 100;
        if capacity > 0 && after >= capacity * 70 && after <= capacity * 90 {
            score += 10;
        }
    } else {
        score -= 50;
    }

    if item.domain == CynefinDomain::Complex && unit.members.len() >= 3 {
        score += 15;
    }

    let related = snapshot.unit_items(unit.id).into_iter().any(|other| {
        other.id != item.id
            && (other.item_type == item.item_type
                || other.domain == item.domain
                || other.paradigm == item.paradigm)
    });
    if related {
        score += 25;
    }

    score
}

/// Highest score first, then unit name and id.
pub(crate) fn rank(suggestions: &mut [UnitSuggestion]) {
    suggestions.sort_by(|a, b| {
        b.score
            .cmp(&a.score)
            .then_with(|| a.unit.name.cmp(&b.unit.name))
            .then_with(|| a.unit.id.cmp(&b.unit.id))
    });
}
