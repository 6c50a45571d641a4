// Model exports
pub mod domain;
pub mod requests;
pub mod responses;

pub use domain::{
    Attendee, AttendeeId, Category, Group, Persona, PersonaId, Roster, ScoringConfig, SwapStrategy,
};
pub use requests::{MatchGroupsRequest, SelectThemesRequest};
pub use responses::{
    ErrorResponse, HealthResponse, MatchGroupsResponse, MatchSummary, SelectThemesResponse,
};
