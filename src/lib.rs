//! Session Match - matchmaking engine for facilitated session groups
//!
//! This library places a roster of attendees into facilitator-led groups.
//! A min-cost assignment first honours each attendee's theme preferences,
//! then a pairwise-swap local search balances the social constraints.

pub mod config;
pub mod core;
pub mod error;
pub mod models;
pub mod routes;

// Re-export commonly used types
pub use core::{Matchmaker, MatchReport, ThemeSelection};
pub use error::{MatchError, Result};
pub use models::{Attendee, AttendeeId, Category, Group, Persona, Roster, ScoringConfig};
