//! Cognitive load scoring for work items.
//!
//! Loads are plain integers derived on demand from an item's type, CYNEFIN
//! domain, work paradigm and blocked flag. Nothing here touches shared state.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{Error, Result};
use crate::model::{CynefinDomain, OrganizationalUnit, WorkItem, WorkItemType, WorkParadigm};

/// Scores a work item. Implementations must be deterministic.
pub trait CognitiveLoadCalculator: Send + Sync {
    fn calculate_work_item_load(&self, item: &WorkItem) -> u32;

    /// Saturating sum of item loads.
    fn calculate_total_load(&self, items: &[WorkItem]) -> u64 {
        items.iter().fold(0_u64, |total, item| {
            total.saturating_add(u64::from(self.calculate_work_item_load(item)))
        })
    }

    /// Recorded load the unit would carry after taking on `item`.
    fn calculate_impact(&self, unit: &OrganizationalUnit, item: &WorkItem) -> u64 {
        u64::from(unit.current_load) + u64::from(self.calculate_work_item_load(item))
    }
}

/// Base load per item type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BaseLoads {
    pub task: u32,
    pub bug: u32,
    pub chore: u32,
    pub feature: u32,
    pub epic: u32,
    pub goal: u32,
}

impl Default for BaseLoads {
    fn default() -> Self {
        Self {
            task: 5,
            bug: 8,
            chore: 13,
            feature: 20,
            epic: 40,
            goal: 50,
        }
    }
}

/// Domain multipliers, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DomainPercents {
    pub obvious: u32,
    pub complicated: u32,
    pub complex: u32,
    pub chaotic: u32,
}

impl Default for DomainPercents {
    fn default() -> Self {
        Self {
            obvious: 100,
            complicated: 150,
            complex: 200,
            chaotic: 300,
        }
    }
}

/// Paradigm multipliers, in percent.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ParadigmPercents {
    pub task: u32,
    pub story: u32,
    pub engineering: u32,
    pub product: u32,
    pub research: u32,
    pub experiment: u32,
    pub goal: u32,
}

impl Default for ParadigmPercents {
    fn default() -> Self {
        Self {
            task: 100,
            story: 120,
            engineering: 130,
            product: 140,
            research: 180,
            experiment: 200,
            goal: 150,
        }
    }
}

/// Weight table driving [`WeightedLoadCalculator`]. Loaded from the `[load]`
/// config section.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoadWeights {
    pub base: BaseLoads,
    pub domain_percent: DomainPercents,
    pub paradigm_percent: ParadigmPercents,
    pub blocked_percent: u32,
}

impl Default for LoadWeights {
    fn default() -> Self {
        Self {
            base: BaseLoads::default(),
            domain_percent: DomainPercents::default(),
            paradigm_percent: ParadigmPercents::default(),
            blocked_percent: 125,
        }
    }
}

impl LoadWeights {
    #[must_use]
    pub const fn base_for(&self, item_type: WorkItemType) -> u32 {
        match item_type {
            WorkItemType::Task => self.base.task,
            WorkItemType::Bug => self.base.bug,
            WorkItemType::Chore => self.base.chore,
            WorkItemType::Feature => self.base.feature,
            WorkItemType::Epic => self.base.epic,
            WorkItemType::Goal => self.base.goal,
        }
    }

    #[must_use]
    pub const fn domain_percent_for(&self, domain: CynefinDomain) -> u32 {
        match domain {
            CynefinDomain::Obvious => self.domain_percent.obvious,
            CynefinDomain::Complicated => self.domain_percent.complicated,
            CynefinDomain::Complex => self.domain_percent.complex,
            CynefinDomain::Chaotic => self.domain_percent.chaotic,
        }
    }

    #[must_use]
    pub const fn paradigm_percent_for(&self, paradigm: WorkParadigm) -> u32 {
        match paradigm {
            WorkParadigm::Task => self.paradigm_percent.task,
            WorkParadigm::Story => self.paradigm_percent.story,
            WorkParadigm::Engineering => self.paradigm_percent.engineering,
            WorkParadigm::Product => self.paradigm_percent.product,
            WorkParadigm::Research => self.paradigm_percent.research,
            WorkParadigm::Experiment => self.paradigm_percent.experiment,
            WorkParadigm::Goal => self.paradigm_percent.goal,
        }
    }

    /// Reject tables under which a harder domain could score lower than an
    /// easier one, or a blocked item lower than an unblocked one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidLoadWeights`] naming the offending entry.
    pub fn validate(&self) -> Result<()> {
        for pair in CynefinDomain::ALL.windows(2) {
            let (easier, harder) = (pair[0], pair[1]);
            if self.domain_percent_for(harder) < self.domain_percent_for(easier) {
                return Err(Error::InvalidLoadWeights(format!(
                    "domain_percent.{harder} ({}) is below domain_percent.{easier} ({})",
                    self.domain_percent_for(harder),
                    self.domain_percent_for(easier)
                )));
            }
        }
        if self.blocked_percent < 100 {
            return Err(Error::InvalidLoadWeights(format!(
                "blocked_percent must be at least 100, got {}",
                self.blocked_percent
            )));
        }
        Ok(())
    }
}

/// Default load policy: `base x domain% x paradigm% x blocked%`, rounded half
/// up in integer arithmetic.
#[derive(Debug, Clone, Default)]
pub struct WeightedLoadCalculator {
    weights: LoadWeights,
}

impl WeightedLoadCalculator {
    /// # Errors
    ///
    /// Returns [`Error::InvalidLoadWeights`] if `weights` fails validation.
    pub fn new(weights: LoadWeights) -> Result<Self> {
        weights.validate()?;
        Ok(Self { weights })
    }

    #[must_use]
    pub const fn weights(&self) -> &LoadWeights {
        &self.weights
    }
}

impl CognitiveLoadCalculator for WeightedLoadCalculator {
    fn calculate_work_item_load(&self, item: &WorkItem) -> u32 {
        let blocked = if item.blocked {
            self.weights.blocked_percent
        } else {
            100
        };
        let numerator = u128::from(self.weights.base_for(item.item_type))
            * u128::from(self.weights.domain_percent_for(item.domain))
            * u128::from(self.weights.paradigm_percent_for(item.paradigm))
            * u128::from(blocked);
        let load = round_half_up(numerator, 1_000_000);
        u32::try_from(load).unwrap_or(u32::MAX)
    }
}

const fn round_half_up(numerator: u128, denominator: u128) -> u128 {
    (numerator + denominator / 2) / denominator
}

/// Recommended capacity for a unit: the larger of its type baseline and 25
/// per member, scaled up 5% for each expertise domain and each paradigm.
#[must_use]
pub fn recommend_capacity(unit: &OrganizationalUnit) -> u32 {
    let members = u128::try_from(unit.members.len()).unwrap_or(u128::MAX);
    let baseline = u128::from(unit.unit_type.base_capacity()).max(members.saturating_mul(25));
    let scaled = baseline
        * breadth_percent(unit.domain_expertise.len())
        * breadth_percent(unit.work_paradigms.len());
    let capacity = u32::try_from(round_half_up(scaled, 10_000)).unwrap_or(u32::MAX);
    debug!(unit = %unit.id, capacity, "recommended capacity");
    capacity
}

/// Individual capacity from a base of 25, scaled by experience level
/// (clamped to 1..=5, 90% to 130%) and expertise breadth.
#[must_use]
pub fn estimate_individual_capacity(
    domains: &[CynefinDomain],
    paradigms: &[WorkParadigm],
    experience_level: u8,
) -> u32 {
    let experience = 80 + 10 * u128::from(experience_level.clamp(1, 5));
    let scaled =
        25 * experience * breadth_percent(domains.len()) * breadth_percent(paradigms.len());
    u32::try_from(round_half_up(scaled, 1_000_000)).unwrap_or(u32::MAX)
}

// Breadth beyond 100 entries is not meaningful; the cap keeps products small.
fn breadth_percent(count: usize) -> u128 {
    100 + 5 * u128::try_from(count.min(100)).unwrap_or(100)
}

/// Truncated utilization of a unit's recorded load, `None` for zero capacity.
#[must_use]
pub fn utilization_percent(unit: &OrganizationalUnit) -> Option<u64> {
    unit.utilization_percent()
}
