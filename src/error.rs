use thiserror::Error;

use crate::models::{AttendeeId, PersonaId};

/// Status reported when the assignment solve cannot produce an optimal matching
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SolverStatus {
    /// A cost entry was NaN or infinite
    NonFiniteCost,
    /// The augmenting search could not reach a free slot for some row
    Infeasible,
}

impl std::fmt::Display for SolverStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            SolverStatus::NonFiniteCost => write!(f, "non-finite cost"),
            SolverStatus::Infeasible => write!(f, "infeasible"),
        }
    }
}

/// Errors that can occur during a match run
#[derive(Debug, Error)]
pub enum MatchError {
    #[error("{attendees} attendees do not fit into {slots} group slots")]
    TooManyAttendees { attendees: usize, slots: usize },

    #[error("cannot place {attendees} attendees into zero groups")]
    NoGroups { attendees: usize },

    #[error("attendee {0} is not in the roster")]
    UnknownAttendee(AttendeeId),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("unknown category: {0}")]
    UnknownCategory(String),

    #[error("attendee {0} already has two active personas")]
    PersonaLimit(AttendeeId),

    #[error("persona {0} does not belong to this attendee")]
    UnknownPersona(PersonaId),

    #[error("persona {0} is retired")]
    RetiredPersona(PersonaId),

    #[error("attendee {0} facilitates this group and cannot be a member")]
    FacilitatorAsMember(AttendeeId),

    #[error("attendee {0} is already a member of this group")]
    DuplicateMember(AttendeeId),

    #[error("group {0} has no themes")]
    GroupWithoutThemes(usize),

    #[error("theme search over {requested} groups exceeds the limit of {max}")]
    TooManyThemeGroups { requested: usize, max: usize },

    #[error("assignment solver failed: {status}")]
    Solver { status: SolverStatus },
}

impl MatchError {
    /// Whether the error was caused by the caller's input rather than the solver
    pub fn is_invalid_input(&self) -> bool {
        !matches!(self, MatchError::Solver { .. })
    }
}

impl From<config::ConfigError> for MatchError {
    fn from(err: config::ConfigError) -> Self {
        MatchError::InvalidConfig(err.to_string())
    }
}

impl From<toml::de::Error> for MatchError {
    fn from(err: toml::de::Error) -> Self {
        MatchError::InvalidConfig(err.to_string())
    }
}

pub type Result<T> = std::result::Result<T, MatchError>;
