//! Composition root wiring the stores, the work-item source and the load
//! policy together.

use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

use crate::config::{ProjectConfig, load_project_config};
use crate::error::Result;
use crate::load::{CognitiveLoadCalculator, WeightedLoadCalculator};
use crate::model::{OrganizationalUnit, UnitId};
use crate::store::{AssignmentStore, OrganizationalUnitStore, WorkItemSource};

#[derive(Clone)]
pub struct Workspace {
    units: Arc<OrganizationalUnitStore>,
    assignments: Arc<AssignmentStore>,
    items: Arc<dyn WorkItemSource>,
    calculator: Arc<dyn CognitiveLoadCalculator>,
    config: ProjectConfig,
}

impl std::fmt::Debug for Workspace {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Workspace")
            .field("units", &self.units.len())
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

impl Workspace {
    /// Empty stores, default config and the default load policy.
    pub fn new(items: Arc<dyn WorkItemSource>) -> Self {
        Self {
            units: Arc::new(OrganizationalUnitStore::new()),
            assignments: Arc::new(AssignmentStore::new()),
            items,
            calculator: Arc::new(WeightedLoadCalculator::default()),
            config: ProjectConfig::default(),
        }
    }

    /// Empty stores with the load policy built from `config.load`.
    ///
    /// # Errors
    ///
    /// Fails when `config` does not validate.
    pub fn with_config(items: Arc<dyn WorkItemSource>, config: ProjectConfig) -> Result<Self> {
        config.validate()?;
        let calculator = WeightedLoadCalculator::new(config.load)?;
        Ok(Self {
            calculator: Arc::new(calculator),
            config,
            ..Self::new(items)
        })
    }

    /// Load `.loadstone/config.toml` under `project_root` and build a
    /// workspace from it.
    ///
    /// # Errors
    ///
    /// Fails when the config cannot be read, parsed or validated.
    pub fn open(project_root: &Path, items: Arc<dyn WorkItemSource>) -> anyhow::Result<Self> {
        let config = load_project_config(project_root)?;
        let workspace = Self::with_config(items, config)?;
        info!(root = %project_root.display(), "workspace opened");
        Ok(workspace)
    }

    /// Swap in a different load policy.
    #[must_use]
    pub fn with_calculator(mut self, calculator: Arc<dyn CognitiveLoadCalculator>) -> Self {
        self.calculator = calculator;
        self
    }

    #[must_use]
    pub fn units(&self) -> &Arc<OrganizationalUnitStore> {
        &self.units
    }

    #[must_use]
    pub fn assignments(&self) -> &Arc<AssignmentStore> {
        &self.assignments
    }

    #[must_use]
    pub fn items(&self) -> &Arc<dyn WorkItemSource> {
        &self.items
    }

    #[must_use]
    pub fn calculator(&self) -> &Arc<dyn CognitiveLoadCalculator> {
        &self.calculator
    }

    #[must_use]
    pub const fn config(&self) -> &ProjectConfig {
        &self.config
    }

    /// Delete a unit together with its assignments and associations.
    pub fn delete_unit(&self, id: UnitId) -> bool {
        if !self.units.delete_by_id(id) {
            return false;
        }
        let removed = self.assignments.clear_unit_assignments(id);
        info!(unit = %id, assignments = removed, "unit deleted with cascade");
        true
    }

    /// Recompute a unit's recorded load from its open assigned items and store
    /// it.
    ///
    /// # Errors
    ///
    /// Returns [`crate::Error::InvalidArgument`] when `id` is unknown.
    pub fn refresh_unit_load(&self, id: UnitId) -> Result<OrganizationalUnit> {
        let assigned = self.assignments.find_assigned_work_items(id);
        let mut total: u64 = 0;
        for item_id in assigned {
            match self.items.find(item_id) {
                Some(item) if !item.completed => {
                    total = total
                        .saturating_add(u64::from(self.calculator.calculate_work_item_load(&item)));
                }
                Some(_) => {}
                None => warn!(unit = %id, item = %item_id, "assigned item missing from source"),
            }
        }
        let load = u32::try_from(total).unwrap_or(u32::MAX);
        self.units.update_cognitive_load(id, load)
    }
}
