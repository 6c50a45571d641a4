use serde::{Deserialize, Serialize};
use validator::Validate;

use crate::error::Result;
use crate::models::domain::{Attendee, Group, Roster};

/// Request to fill a set of groups with attendees
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct MatchGroupsRequest {
    #[validate(length(max = 64), nested)]
    #[serde(default)]
    pub groups: Vec<Group>,
    // The refiner is quadratic per pass; keep sessions small
    #[validate(length(max = 500))]
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

/// Request to pick one theme per group
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct SelectThemesRequest {
    #[validate(range(min = 1, max = 16))]
    #[serde(alias = "group_count", rename = "groupCount")]
    pub group_count: usize,
    #[validate(length(max = 500))]
    #[serde(default)]
    pub attendees: Vec<Attendee>,
}

/// Index attendees by id, checking each snapshot's persona invariants
///
/// Personas are claimed by the attendee they arrived with. A later entry with
/// a repeated id replaces the earlier one.
pub fn into_roster(attendees: Vec<Attendee>) -> Result<Roster> {
    let mut roster = Roster::with_capacity(attendees.len());
    for mut attendee in attendees {
        attendee.check_invariants()?;
        attendee.claim_personas();
        roster.insert(attendee.id, attendee);
    }
    Ok(roster)
}
