use std::fmt;

/// Machine-readable error codes for agent-friendly decision making.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorCode {
    ConfigParseError,
    ConfigInvalid,
    InvalidArgument,
    InvariantViolation,
    InvalidEnumValue,
    InvalidLoadWeights,
}

impl ErrorCode {
    pub const ALL: [Self; 6] = [
        Self::ConfigParseError,
        Self::ConfigInvalid,
        Self::InvalidArgument,
        Self::InvariantViolation,
        Self::InvalidEnumValue,
        Self::InvalidLoadWeights,
    ];

    /// Stable code identifier (`E####`) for machine parsing.
    #[must_use]
    pub const fn code(self) -> &'static str {
        match self {
            Self::ConfigParseError => "E1002",
            Self::ConfigInvalid => "E1003",
            Self::InvalidArgument => "E2002",
            Self::InvariantViolation => "E2003",
            Self::InvalidEnumValue => "E2005",
            Self::InvalidLoadWeights => "E3001",
        }
    }

    /// Short human-facing summary for logs and terminal output.
    #[must_use]
    pub const fn message(self) -> &'static str {
        match self {
            Self::ConfigParseError => "Config file parse error",
            Self::ConfigInvalid => "Config value out of range",
            Self::InvalidArgument => "Invalid argument",
            Self::InvariantViolation => "Invariant violation",
            Self::InvalidEnumValue => "Invalid domain/paradigm/type value",
            Self::InvalidLoadWeights => "Load weight table violates ordering",
        }
    }

    /// Optional remediation hint that can be surfaced to operators and agents.
    #[must_use]
    pub const fn hint(self) -> Option<&'static str> {
        match self {
            Self::ConfigParseError => Some("Fix syntax in .loadstone/config.toml and retry."),
            Self::ConfigInvalid => {
                Some("Keep thresholds positive and low_water_percent <= overload_threshold_percent.")
            }
            Self::InvalidArgument => Some("Check that the referenced unit still exists."),
            Self::InvariantViolation => Some("Cognitive capacity must be a non-negative integer."),
            Self::InvalidEnumValue => {
                Some("Use one of the documented domain/paradigm/type values.")
            }
            Self::InvalidLoadWeights => Some(
                "Domain multipliers must not decrease with complexity and blocked_percent must be >= 100.",
            ),
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.code())
    }
}

/// Library error for store and calculator operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    #[error("invariant violation: {0}")]
    InvariantViolation(String),

    #[error("invalid load weights: {0}")]
    InvalidLoadWeights(String),

    #[error("invalid config: {0}")]
    InvalidConfig(String),

    #[error(transparent)]
    Parse(#[from] crate::model::ParseEnumError),
}

impl Error {
    #[must_use]
    pub const fn code(&self) -> ErrorCode {
        match self {
            Self::InvalidArgument(_) => ErrorCode::InvalidArgument,
            Self::InvariantViolation(_) => ErrorCode::InvariantViolation,
            Self::InvalidLoadWeights(_) => ErrorCode::InvalidLoadWeights,
            Self::InvalidConfig(_) => ErrorCode::ConfigInvalid,
            Self::Parse(_) => ErrorCode::InvalidEnumValue,
        }
    }

    /// Whether the caller passed something the store cannot act on, as
    /// opposed to a broken invariant.
    #[must_use]
    pub const fn is_invalid_argument(&self) -> bool {
        matches!(self, Self::InvalidArgument(_) | Self::Parse(_))
    }

    pub(crate) fn unknown_unit(id: crate::model::UnitId) -> Self {
        Self::InvalidArgument(format!("unit {id} not found"))
    }
}

pub type Result<T, E = Error> = std::result::Result<T, E>;
