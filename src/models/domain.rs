use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;
use validator::Validate;

use crate::error::{MatchError, Result};

pub type AttendeeId = Uuid;
pub type PersonaId = Uuid;

/// Snapshot of every attendee known to a match run, facilitators included
pub type Roster = HashMap<AttendeeId, Attendee>;

/// Maximum number of non-retired personas an attendee may hold
pub const MAX_ACTIVE_PERSONAS: usize = 2;

/// Closed set of themes shared by personas and groups
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Category {
    Arcane,
    Divine,
    Martial,
    Primal,
    Shadow,
}

impl Category {
    pub const ALL: [Category; 5] = [
        Category::Arcane,
        Category::Divine,
        Category::Martial,
        Category::Primal,
        Category::Shadow,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Category::Arcane => "arcane",
            Category::Divine => "divine",
            Category::Martial => "martial",
            Category::Primal => "primal",
            Category::Shadow => "shadow",
        }
    }

    /// Position of this category in `Category::ALL`
    pub fn index(&self) -> usize {
        *self as usize
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Category {
    type Error = MatchError;

    fn try_from(value: String) -> Result<Self> {
        value.parse()
    }
}

impl From<Category> for String {
    fn from(category: Category) -> Self {
        category.as_str().to_string()
    }
}

impl FromStr for Category {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Category::ALL
            .iter()
            .copied()
            .find(|c| c.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| MatchError::UnknownCategory(s.to_string()))
    }
}

/// A character an attendee plays
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Persona {
    pub id: PersonaId,
    /// Back-reference to the owning attendee; set when the persona is added
    #[serde(default)]
    pub owner: AttendeeId,
    pub name: String,
    pub category: Category,
    #[serde(default)]
    pub retired: bool,
}

impl Persona {
    pub fn new(name: impl Into<String>, category: Category) -> Self {
        Self {
            id: Uuid::new_v4(),
            owner: Uuid::nil(),
            name: name.into(),
            category,
            retired: false,
        }
    }
}

/// A person to be placed into a session group
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Attendee {
    pub id: AttendeeId,
    pub name: String,
    #[serde(default)]
    pub is_facilitator: bool,
    #[serde(default)]
    personas: Vec<Persona>,
    #[serde(default)]
    primary_persona: Option<PersonaId>,
    #[serde(default)]
    pub preferred_partners: HashSet<AttendeeId>,
    #[serde(default)]
    pub avoids: HashSet<AttendeeId>,
    #[serde(default)]
    pub avoids_as_facilitator: HashSet<AttendeeId>,
    /// Last date this attendee shared a group with each other attendee
    #[serde(default)]
    pub history: HashMap<AttendeeId, NaiveDate>,
}

impl Attendee {
    pub fn new(id: AttendeeId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            is_facilitator: false,
            personas: Vec::new(),
            primary_persona: None,
            preferred_partners: HashSet::new(),
            avoids: HashSet::new(),
            avoids_as_facilitator: HashSet::new(),
            history: HashMap::new(),
        }
    }

    pub fn facilitator(id: AttendeeId, name: impl Into<String>) -> Self {
        Self {
            is_facilitator: true,
            ..Self::new(id, name)
        }
    }

    pub fn personas(&self) -> &[Persona] {
        &self.personas
    }

    pub fn active_personas(&self) -> impl Iterator<Item = &Persona> {
        self.personas.iter().filter(|p| !p.retired)
    }

    /// Add a persona, claiming ownership of it
    pub fn add_persona(&mut self, mut persona: Persona) -> Result<PersonaId> {
        if !persona.retired && self.active_personas().count() >= MAX_ACTIVE_PERSONAS {
            return Err(MatchError::PersonaLimit(self.id));
        }
        persona.owner = self.id;
        let id = persona.id;
        self.personas.push(persona);
        Ok(id)
    }

    /// Point every persona's owner at this attendee
    ///
    /// Snapshots deserialized from outside carry no owner on their personas.
    pub fn claim_personas(&mut self) {
        for persona in &mut self.personas {
            persona.owner = self.id;
        }
    }

    pub fn primary_persona(&self) -> Option<&Persona> {
        let primary = self.primary_persona?;
        self.personas.iter().find(|p| p.id == primary && !p.retired)
    }

    pub fn is_primary(&self, persona: &Persona) -> bool {
        !persona.retired && self.primary_persona == Some(persona.id)
    }

    /// Make `persona_id` the primary persona, demoting any previous primary
    pub fn set_primary(&mut self, persona_id: PersonaId) -> Result<()> {
        let persona = self
            .personas
            .iter()
            .find(|p| p.id == persona_id)
            .ok_or(MatchError::UnknownPersona(persona_id))?;
        if persona.retired {
            return Err(MatchError::RetiredPersona(persona_id));
        }
        self.primary_persona = Some(persona_id);
        Ok(())
    }

    /// Retire a persona; a retired persona is never primary
    pub fn retire_persona(&mut self, persona_id: PersonaId) -> Result<()> {
        let persona = self
            .personas
            .iter_mut()
            .find(|p| p.id == persona_id)
            .ok_or(MatchError::UnknownPersona(persona_id))?;
        persona.retired = true;
        if self.primary_persona == Some(persona_id) {
            self.primary_persona = None;
        }
        Ok(())
    }

    /// Check the persona invariants on a snapshot received from outside
    pub fn check_invariants(&self) -> Result<()> {
        if self.active_personas().count() > MAX_ACTIVE_PERSONAS {
            return Err(MatchError::PersonaLimit(self.id));
        }
        if let Some(primary) = self.primary_persona {
            match self.personas.iter().find(|p| p.id == primary) {
                None => return Err(MatchError::UnknownPersona(primary)),
                Some(p) if p.retired => return Err(MatchError::RetiredPersona(primary)),
                Some(_) => {}
            }
        }
        Ok(())
    }

    pub fn avoids(&self, other: &AttendeeId) -> bool {
        self.avoids.contains(other)
    }

    pub fn prefers(&self, other: &AttendeeId) -> bool {
        self.preferred_partners.contains(other)
    }

    pub fn avoids_as_facilitator(&self, other: &AttendeeId) -> bool {
        self.avoids_as_facilitator.contains(other)
    }

    pub fn last_played_with(&self, other: &AttendeeId) -> Option<NaiveDate> {
        self.history.get(other).copied()
    }

    /// Record a shared session, keeping the most recent date
    pub fn record_session(&mut self, other: AttendeeId, date: NaiveDate) {
        let entry = self.history.entry(other).or_insert(date);
        if date > *entry {
            *entry = date;
        }
    }
}

/// A session unit led by a facilitator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate)]
#[serde(rename_all = "camelCase")]
pub struct Group {
    #[serde(default)]
    pub facilitator: Option<AttendeeId>,
    #[validate(length(min = 1))]
    pub themes: Vec<Category>,
    #[serde(default)]
    pub members: Vec<AttendeeId>,
    pub date: NaiveDate,
}

impl Group {
    pub fn new(facilitator: Option<AttendeeId>, themes: Vec<Category>, date: NaiveDate) -> Self {
        Self {
            facilitator,
            themes,
            members: Vec::new(),
            date,
        }
    }

    pub fn add_member(&mut self, id: AttendeeId) -> Result<()> {
        if self.facilitator == Some(id) {
            return Err(MatchError::FacilitatorAsMember(id));
        }
        if self.members.contains(&id) {
            return Err(MatchError::DuplicateMember(id));
        }
        self.members.push(id);
        Ok(())
    }

    pub fn remove_member(&mut self, id: &AttendeeId) -> bool {
        match self.members.iter().position(|m| m == id) {
            Some(pos) => {
                self.members.remove(pos);
                true
            }
            None => false,
        }
    }

    /// Put `incoming` in the slot held by `outgoing`, keeping member order
    pub fn replace_member(&mut self, outgoing: &AttendeeId, incoming: AttendeeId) -> bool {
        match self.members.iter_mut().find(|m| *m == outgoing) {
            Some(slot) => {
                *slot = incoming;
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, id: &AttendeeId) -> bool {
        self.members.contains(id)
    }

    pub fn clear_members(&mut self) {
        self.members.clear();
    }
}

/// Local-search swap selection policy
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SwapStrategy {
    /// Apply the first improving swap and restart the scan
    #[default]
    FirstImprovement,
    /// Scan every swap and apply the best one
    BestImprovement,
}

impl FromStr for SwapStrategy {
    type Err = MatchError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "first_improvement" => Ok(SwapStrategy::FirstImprovement),
            "best_improvement" => Ok(SwapStrategy::BestImprovement),
            other => Err(MatchError::InvalidConfig(format!("unknown swap strategy: {}", other))),
        }
    }
}

/// Scoring parameters, read-only for the duration of a match run
#[derive(Debug, Clone, PartialEq)]
pub struct ScoringConfig {
    pub category_match_bonus: f64,
    pub second_choice_multiplier: f64,
    pub third_choice_multiplier: f64,
    pub fourth_choice_multiplier: f64,
    /// Magnitude subtracted for every avoid relation
    pub avoid_penalty: f64,
    pub preferred_partner_bonus: f64,
    /// Added to a persona's score when it is the attendee's primary
    pub primary_persona_multiplier: f64,
    pub grudge_window_weeks: f64,
    pub max_reunion_bonus: f64,
    /// Acceptable 2nd/3rd/4th choice categories, best first
    pub fallback_preferences: HashMap<Category, Vec<Category>>,
    pub max_group_size: Option<usize>,
    pub max_theme_groups: usize,
    pub swap_strategy: SwapStrategy,
    pub max_swaps: usize,
}

impl ScoringConfig {
    /// Reject values that would make scores meaningless
    pub fn validate(&self) -> Result<()> {
        let numbers = [
            ("category_match_bonus", self.category_match_bonus),
            ("second_choice_multiplier", self.second_choice_multiplier),
            ("third_choice_multiplier", self.third_choice_multiplier),
            ("fourth_choice_multiplier", self.fourth_choice_multiplier),
            ("avoid_penalty", self.avoid_penalty),
            ("preferred_partner_bonus", self.preferred_partner_bonus),
            ("primary_persona_multiplier", self.primary_persona_multiplier),
            ("grudge_window_weeks", self.grudge_window_weeks),
            ("max_reunion_bonus", self.max_reunion_bonus),
        ];
        for (name, value) in numbers {
            if !value.is_finite() || value < 0.0 {
                return Err(MatchError::InvalidConfig(format!(
                    "{} must be a non-negative number, got {}",
                    name, value
                )));
            }
        }
        if self.max_group_size == Some(0) {
            return Err(MatchError::InvalidConfig("max_group_size must be at least 1".to_string()));
        }
        Ok(())
    }

    pub fn fallbacks_for(&self, category: Category) -> &[Category] {
        self.fallback_preferences
            .get(&category)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

pub fn default_fallback_preferences() -> HashMap<Category, Vec<Category>> {
    use Category::*;
    HashMap::from([
        (Arcane, vec![Shadow, Divine, Primal]),
        (Divine, vec![Arcane, Martial, Primal]),
        (Martial, vec![Primal, Divine, Shadow]),
        (Primal, vec![Martial, Arcane, Divine]),
        (Shadow, vec![Arcane, Martial, Primal]),
    ])
}

impl Default for ScoringConfig {
    fn default() -> Self {
        Self {
            category_match_bonus: 10.0,
            second_choice_multiplier: 0.75,
            third_choice_multiplier: 0.5,
            fourth_choice_multiplier: 0.25,
            avoid_penalty: 50.0,
            preferred_partner_bonus: 5.0,
            primary_persona_multiplier: 2.0,
            grudge_window_weeks: 4.0,
            max_reunion_bonus: 3.0,
            fallback_preferences: default_fallback_preferences(),
            max_group_size: None,
            max_theme_groups: 6,
            swap_strategy: SwapStrategy::FirstImprovement,
            max_swaps: 10_000,
        }
    }
}
