use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::{fmt, str::FromStr};
use uuid::Uuid;

/// Metadata key carrying the estimated effort of an item, in hours.
pub const ESTIMATED_HOURS_KEY: &str = "estimated_hours";
/// Metadata key carrying the actual effort spent on an item, in hours.
pub const ACTUAL_HOURS_KEY: &str = "actual_hours";

/// Identifier of a work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ItemId(pub Uuid);

impl ItemId {
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ItemId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.0, f)
    }
}

impl FromStr for ItemId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s.trim()).map(Self)
    }
}

/// CYNEFIN problem-complexity classification, ordered from least to most
/// demanding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CynefinDomain {
    Obvious,
    Complicated,
    Complex,
    Chaotic,
}

impl CynefinDomain {
    pub const ALL: [Self; 4] = [
        Self::Obvious,
        Self::Complicated,
        Self::Complex,
        Self::Chaotic,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Obvious => "obvious",
            Self::Complicated => "complicated",
            Self::Complex => "complex",
            Self::Chaotic => "chaotic",
        }
    }
}

/// The nature of the work an item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkParadigm {
    Task,
    Story,
    Engineering,
    Product,
    Research,
    Experiment,
    Goal,
}

impl WorkParadigm {
    pub const ALL: [Self; 7] = [
        Self::Task,
        Self::Story,
        Self::Engineering,
        Self::Product,
        Self::Research,
        Self::Experiment,
        Self::Goal,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Story => "story",
            Self::Engineering => "engineering",
            Self::Product => "product",
            Self::Research => "research",
            Self::Experiment => "experiment",
            Self::Goal => "goal",
        }
    }
}

/// Kind of work item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WorkItemType {
    Task,
    Bug,
    Chore,
    Feature,
    Epic,
    Goal,
}

impl WorkItemType {
    pub const ALL: [Self; 6] = [
        Self::Task,
        Self::Bug,
        Self::Chore,
        Self::Feature,
        Self::Epic,
        Self::Goal,
    ];

    const fn as_str(self) -> &'static str {
        match self {
            Self::Task => "task",
            Self::Bug => "bug",
            Self::Chore => "chore",
            Self::Feature => "feature",
            Self::Epic => "epic",
            Self::Goal => "goal",
        }
    }
}

/// Read-only snapshot of a work item as supplied by the work-item subsystem.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WorkItem {
    pub id: ItemId,
    pub title: String,
    pub item_type: WorkItemType,
    pub domain: CynefinDomain,
    pub paradigm: WorkParadigm,
    pub blocked: bool,
    pub completed: bool,
    pub created_at: DateTime<Utc>,
    pub due_at: Option<DateTime<Utc>>,
    pub completed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub tags: Vec<String>,
    #[serde(default)]
    pub metadata: BTreeMap<String, String>,
}

impl WorkItem {
    /// Create an open, unblocked item created now.
    pub fn new(
        title: impl Into<String>,
        item_type: WorkItemType,
        domain: CynefinDomain,
        paradigm: WorkParadigm,
    ) -> Self {
        Self {
            id: ItemId::new(),
            title: title.into(),
            item_type,
            domain,
            paradigm,
            blocked: false,
            completed: false,
            created_at: Utc::now(),
            due_at: None,
            completed_at: None,
            tags: Vec::new(),
            metadata: BTreeMap::new(),
        }
    }

    /// Active means neither completed nor blocked.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !self.completed && !self.blocked
    }

    /// Positive numeric metadata value, if present and parseable.
    #[must_use]
    pub fn metadata_hours(&self, key: &str) -> Option<f64> {
        self.metadata
            .get(key)
            .and_then(|raw| raw.trim().parse::<f64>().ok())
            .filter(|hours| hours.is_finite() && *hours > 0.0)
    }

    #[must_use]
    pub fn with_blocked(mut self, blocked: bool) -> Self {
        self.blocked = blocked;
        self
    }

    /// Mark completed at `at`.
    #[must_use]
    pub fn complete_at(mut self, at: DateTime<Utc>) -> Self {
        self.completed = true;
        self.completed_at = Some(at);
        self
    }

    #[must_use]
    pub fn created(mut self, at: DateTime<Utc>) -> Self {
        self.created_at = at;
        self
    }

    #[must_use]
    pub fn due(mut self, at: DateTime<Utc>) -> Self {
        self.due_at = Some(at);
        self
    }

    #[must_use]
    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.push(tag.into());
        self
    }

    #[must_use]
    pub fn meta(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.metadata.insert(key.into(), value.into());
        self
    }
}

/// Error returned when parsing an enum value from text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseEnumError {
    pub expected: &'static str,
    pub got: String,
}

impl fmt::Display for ParseEnumError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {}: '{}'", self.expected, self.got)
    }
}

impl std::error::Error for ParseEnumError {}

impl fmt::Display for CynefinDomain {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WorkParadigm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl fmt::Display for WorkItemType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

pub(crate) fn normalize(input: &str) -> String {
    input.trim().to_ascii_lowercase()
}

impl FromStr for CynefinDomain {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = normalize(s);
        // "clear" is the newer name for the obvious domain.
        match normalized.as_str() {
            "obvious" | "clear" => Ok(Self::Obvious),
            "complicated" => Ok(Self::Complicated),
            "complex" => Ok(Self::Complex),
            "chaotic" => Ok(Self::Chaotic),
            _ => Err(ParseEnumError {
                expected: "cynefin domain",
                got: s.to_string(),
            }),
        }
    }
}

impl FromStr for WorkParadigm {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|paradigm| paradigm.as_str() == normalize(s))
            .ok_or_else(|| ParseEnumError {
                expected: "work paradigm",
                got: s.to_string(),
            })
    }
}

impl FromStr for WorkItemType {
    type Err = ParseEnumError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|kind| kind.as_str() == normalize(s))
            .ok_or_else(|| ParseEnumError {
                expected: "work item type",
                got: s.to_string(),
            })
    }
}
