use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::{fmt, str::FromStr};
use uuid::Uuid;

use super::item::{CynefinDomain, ParseEnumError, WorkParadigm, normalize};
use crate::error::{Error, Result};

/// Identifier of an organizational unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct UnitId(pub Uuid);

impl UnitId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for UnitId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for UnitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

/// Identifier of a workstream associated with units.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct WorkstreamId(pub Uuid);

impl WorkstreamId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for WorkstreamId {
    fn default() -> Self {
        Self::new()
    }
}

/// Shape of an organizational unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnitType {
    Squad,
    Team,
    Department,
    BusinessUnit,
    Tribe,
    Guild,
    Chapter,
    ProductTeam,
    ProjectTeam,
    VirtualTeam,
    Custom,
}

impl UnitType {
    pub const ALL: [Self; 11] = [
        Self::Squad,
        Self::Team,
        Self::Department,
        Self::BusinessUnit,
        Self::Tribe,
        Self::Guild,
        Self::Chapter,
        Self::ProductTeam,
        Self::ProjectTeam,
        Self::VirtualTeam,
        Self::Custom,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Squad => "squad",
            Self::Team => "team",
            Self::Department => "department",
            Self::BusinessUnit => "business_unit",
            Self::Tribe => "tribe",
            Self::Guild => "guild",
            Self::Chapter => "chapter",
            Self::ProductTeam => "product_team",
            Self::ProjectTeam => "project_team",
            Self::VirtualTeam => "virtual_team",
            Self::Custom => "custom",
        }
    }

    /// Baseline cognitive capacity for a unit of this shape.
    #[must_use]
    pub const fn base_capacity(self) -> u32 {
        match self {
            Self::Squad => 75,
            Self::Team | Self::VirtualTeam | Self::Custom => 100,
            Self::Department => 250,
            Self::BusinessUnit => 500,
            Self::Tribe => 400,
            Self::Guild | Self::ProjectTeam => 150,
            Self::Chapter => 200,
            Self::ProductTeam => 120,
        }
    }
}

impl fmt::Display for UnitType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for UnitType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = normalize(s).replace(['-', ' '], "_");
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalized)
            .ok_or_else(|| ParseEnumError {
                expected: "unit type",
                got: s.to_string(),
            })
    }
}

/// A named group with capacity and membership.
///
/// Built through [`OrganizationalUnit::from_request`], which is the only place
/// the non-negative capacity invariant is checked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OrganizationalUnit {
    pub id: UnitId,
    pub name: String,
    pub description: Option<String>,
    pub unit_type: UnitType,
    pub parent_id: Option<UnitId>,
    pub owner: String,
    pub members: BTreeSet<String>,
    pub domain_expertise: BTreeSet<CynefinDomain>,
    pub work_paradigms: BTreeSet<WorkParadigm>,
    pub tags: BTreeSet<String>,
    pub cognitive_capacity: u32,
    pub current_load: u32,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl OrganizationalUnit {
    /// Build a unit from a create request.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvariantViolation`] when the requested capacity is
    /// negative or does not fit in `u32`, or when the name is blank.
    pub fn from_request(request: NewUnit, now: DateTime<Utc>) -> Result<Self> {
        let cognitive_capacity = u32::try_from(request.cognitive_capacity).map_err(|_| {
            Error::InvariantViolation(format!(
                "cognitive capacity must be between 0 and {}, got {}",
                u32::MAX,
                request.cognitive_capacity
            ))
        })?;

        let name = request.name.trim().to_string();
        if name.is_empty() {
            return Err(Error::InvariantViolation(
                "unit name cannot be empty".to_string(),
            ));
        }

        Ok(Self {
            id: UnitId::new(),
            name,
            description: request.description,
            unit_type: request.unit_type,
            parent_id: request.parent_id,
            owner: request.owner,
            members: request.members,
            domain_expertise: request.domain_expertise,
            work_paradigms: request.work_paradigms,
            tags: request.tags,
            cognitive_capacity,
            current_load: 0,
            active: request.active,
            created_at: now,
            updated_at: now,
        })
    }

    /// Free capacity; negative when the unit is overloaded.
    #[must_use]
    pub fn available_capacity(&self) -> i64 {
        i64::from(self.cognitive_capacity) - i64::from(self.current_load)
    }

    /// Truncated integer utilization of the recorded load, or `None` for a
    /// zero-capacity unit.
    #[must_use]
    pub fn utilization_percent(&self) -> Option<u64> {
        utilization_percent(u64::from(self.current_load), u64::from(self.cognitive_capacity))
    }

    #[must_use]
    pub fn has_member(&self, member: &str) -> bool {
        self.members.contains(member)
    }
}

/// `load * 100 / capacity`, truncated. `None` when capacity is zero.
#[must_use]
pub const fn utilization_percent(load: u64, capacity: u64) -> Option<u64> {
    if capacity == 0 {
        return None;
    }
    Some(load.saturating_mul(100) / capacity)
}

/// Create request for an organizational unit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NewUnit {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub unit_type: UnitType,
    #[serde(default)]
    pub parent_id: Option<UnitId>,
    pub owner: String,
    pub cognitive_capacity: i64,
    #[serde(default)]
    pub members: BTreeSet<String>,
    #[serde(default)]
    pub domain_expertise: BTreeSet<CynefinDomain>,
    #[serde(default)]
    pub work_paradigms: BTreeSet<WorkParadigm>,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(default = "default_active")]
    pub active: bool,
}

const fn default_active() -> bool {
    true
}

impl NewUnit {
    pub fn new(
        name: impl Into<String>,
        unit_type: UnitType,
        owner: impl Into<String>,
        cognitive_capacity: i64,
    ) -> Self {
        Self {
            name: name.into(),
            description: None,
            unit_type,
            parent_id: None,
            owner: owner.into(),
            cognitive_capacity,
            members: BTreeSet::new(),
            domain_expertise: BTreeSet::new(),
            work_paradigms: BTreeSet::new(),
            tags: BTreeSet::new(),
            active: true,
        }
    }

    #[must_use]
    pub fn description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    #[must_use]
    pub const fn parent(mut self, parent_id: UnitId) -> Self {
        self.parent_id = Some(parent_id);
        self
    }

    #[must_use]
    pub fn members<I, S>(mut self, members: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.members.extend(members.into_iter().map(Into::into));
        self
    }

    #[must_use]
    pub fn expertise(mut self, domains: impl IntoIterator<Item = CynefinDomain>) -> Self {
        self.domain_expertise.extend(domains);
        self
    }

    #[must_use]
    pub fn paradigms(mut self, paradigms: impl IntoIterator<Item = WorkParadigm>) -> Self {
        self.work_paradigms.extend(paradigms);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    #[must_use]
    pub const fn inactive(mut self) -> Self {
        self.active = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn negative_capacity_is_rejected_at_construction() {
        let err = OrganizationalUnit::from_request(
            NewUnit::new("Core", UnitType::Team, "ana", -1),
            Utc::now(),
        )
        .expect_err("negative capacity must fail");
        assert!(matches!(err, Error::InvariantViolation(_)));
    }

    #[test]
    fn oversized_capacity_is_rejected() {
        let request = NewUnit::new("Core", UnitType::Team, "ana", i64::from(u32::MAX) + 1);
        assert!(OrganizationalUnit::from_request(request, Utc::now()).is_err());
    }

    #[test]
    fn blank_name_is_rejected() {
        let request = NewUnit::new("   ", UnitType::Squad, "ana", 10);
        assert!(OrganizationalUnit::from_request(request, Utc::now()).is_err());
    }

    #[test]
    fn new_unit_starts_with_zero_load() {
        let unit = OrganizationalUnit::from_request(
            NewUnit::new(" Core ", UnitType::Team, "ana", 40).members(["m1", "m2"]),
            Utc::now(),
        )
        .expect("valid request");
        assert_eq!(unit.name, "Core");
        assert_eq!(unit.current_load, 0);
        assert_eq!(unit.available_capacity(), 40);
        assert_eq!(unit.utilization_percent(), Some(0));
        assert!(unit.has_member("m2"));
        assert!(unit.active);
    }

    #[test]
    fn utilization_truncates() {
        assert_eq!(utilization_percent(749, 1000), Some(74));
        assert_eq!(utilization_percent(750, 1000), Some(75));
        assert_eq!(utilization_percent(45, 30), Some(150));
        assert_eq!(utilization_percent(5, 0), None);
    }

    #[test]
    fn unit_type_parse_accepts_separators() {
        assert_eq!(UnitType::from_str("business-unit"), Ok(UnitType::BusinessUnit));
        assert_eq!(UnitType::from_str("Product Team"), Ok(UnitType::ProductTeam));
        assert_eq!(UnitType::from_str("squad"), Ok(UnitType::Squad));
        assert!(UnitType::from_str("platoon").is_err());
        for kind in UnitType::ALL {
            assert_eq!(UnitType::from_str(&kind.to_string()), Ok(kind));
        }
    }
}
