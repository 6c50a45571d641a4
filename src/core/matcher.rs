use std::collections::HashSet;

use crate::core::{
    assignment::assign_initial,
    refiner::{RefineReport, Refiner},
    scoring::total_social_score,
    themes::{select_themes, ThemeSelection},
};
use crate::error::{MatchError, Result};
use crate::models::{Attendee, AttendeeId, Group, Roster, ScoringConfig};

/// Result of a match run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MatchReport {
    /// Number of attendees placed into groups
    pub placed: usize,
    /// Total cost of the initial category-optimal assignment
    pub initial_cost: f64,
    /// Total social score right after the initial assignment
    pub social_score_before: f64,
    /// Total social score after refinement
    pub social_score_after: f64,
    pub refinement: RefineReport,
}

/// Main matchmaking orchestrator - implements the two-phase pipeline
///
/// # Pipeline Stages
/// 1. Facilitator filtering
/// 2. Category-optimal initial assignment (min-cost bipartite matching)
/// 3. Social refinement (pairwise-swap local search)
#[derive(Debug, Clone)]
pub struct Matchmaker {
    config: ScoringConfig,
}

impl Matchmaker {
    pub fn new(config: ScoringConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self { config })
    }

    pub fn with_default_config() -> Self {
        Self {
            config: ScoringConfig::default(),
        }
    }

    pub fn config(&self) -> &ScoringConfig {
        &self.config
    }

    /// Attendees eligible for placement, sorted by id
    ///
    /// Facilitators are excluded, whether flagged as such or named as the
    /// facilitator of one of `groups`.
    pub fn placeable_attendees<'a>(&self, groups: &[Group], roster: &'a Roster) -> Vec<&'a Attendee> {
        let leading: HashSet<AttendeeId> = groups.iter().filter_map(|g| g.facilitator).collect();

        let mut placeable: Vec<&Attendee> = roster
            .values()
            .filter(|a| !a.is_facilitator && !leading.contains(&a.id))
            .collect();
        placeable.sort_by_key(|a| a.id);
        placeable
    }

    /// Populate `groups` with every placeable attendee in `roster`
    ///
    /// With no groups or no placeable attendee this is a no-op. On error the
    /// groups are left exactly as they were passed in. Every group needs at
    /// least one theme.
    pub fn match_groups(&self, groups: &mut [Group], roster: &Roster) -> Result<MatchReport> {
        if let Some(index) = groups.iter().position(|g| g.themes.is_empty()) {
            return Err(MatchError::GroupWithoutThemes(index));
        }

        let placeable = self.placeable_attendees(groups, roster);

        if groups.is_empty() || placeable.is_empty() {
            tracing::debug!(
                "Nothing to match ({} groups, {} placeable attendees)",
                groups.len(),
                placeable.len()
            );
            return Ok(MatchReport::default());
        }

        for attendee in &placeable {
            if attendee.active_personas().next().is_none() {
                tracing::warn!(
                    "Attendee {} ({}) has no active personas, scoring with default affinity",
                    attendee.name,
                    attendee.id
                );
            }
        }

        // Stage 2: category-optimal placement, computed before any mutation
        let initial = assign_initial(&self.config, &placeable, groups)?;

        let mut staged: Vec<Group> = groups.to_vec();
        for group in &mut staged {
            group.clear_members();
        }
        for (attendee, &group) in placeable.iter().zip(&initial.group_of) {
            staged[group].add_member(attendee.id)?;
        }

        // Stage 3: social refinement
        let social_score_before = total_social_score(&self.config, &staged, roster)?;
        let refinement = Refiner::new(&self.config, roster).refine(&mut staged)?;
        let social_score_after = total_social_score(&self.config, &staged, roster)?;

        groups.clone_from_slice(&staged);

        tracing::info!(
            "Matched {} attendees into {} groups: initial cost {:.3}, social score {:.3} -> {:.3} after {} swaps",
            placeable.len(),
            groups.len(),
            initial.total_cost,
            social_score_before,
            social_score_after,
            refinement.swaps.len()
        );

        Ok(MatchReport {
            placed: placeable.len(),
            initial_cost: initial.total_cost,
            social_score_before,
            social_score_after,
            refinement,
        })
    }

    /// Choose a theme for each of `group_count` groups from the non-facilitator roster
    pub fn select_themes(&self, group_count: usize, roster: &Roster) -> Result<ThemeSelection> {
        let placeable = self.placeable_attendees(&[], roster);
        select_themes(&self.config, group_count, &placeable)
    }

    /// Select themes for `groups` and overwrite each group's themes with its pick
    pub fn assign_themes(&self, groups: &mut [Group], roster: &Roster) -> Result<ThemeSelection> {
        let placeable = self.placeable_attendees(groups, roster);
        let selection = select_themes(&self.config, groups.len(), &placeable)?;

        for (group, theme) in groups.iter_mut().zip(&selection.themes) {
            group.themes = vec![*theme];
        }

        Ok(selection)
    }
}

impl Default for Matchmaker {
    fn default() -> Self {
        Self::with_default_config()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Category, Persona};
    use chrono::NaiveDate;
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn create_attendee(n: u128, category: Category) -> Attendee {
        let mut a = Attendee::new(Uuid::from_u128(n), format!("Attendee {}", n));
        a.add_persona(Persona::new(format!("Persona {}", n), category)).unwrap();
        a
    }

    fn create_roster(attendees: Vec<Attendee>) -> Roster {
        attendees.into_iter().map(|a| (a.id, a)).collect()
    }

    fn create_groups(themes: &[Category]) -> Vec<Group> {
        themes
            .iter()
            .enumerate()
            .map(|(i, t)| Group::new(Some(Uuid::from_u128(1000 + i as u128)), vec![*t], date()))
            .collect()
    }

    #[test]
    fn test_exact_theme_matches_cost_nothing() {
        let matchmaker = Matchmaker::with_default_config();
        let roster = create_roster(vec![
            create_attendee(1, Category::Arcane),
            create_attendee(2, Category::Martial),
            create_attendee(3, Category::Arcane),
            create_attendee(4, Category::Martial),
            create_attendee(5, Category::Arcane),
        ]);
        let mut groups = create_groups(&[Category::Arcane, Category::Martial]);

        let report = matchmaker.match_groups(&mut groups, &roster).unwrap();

        assert_eq!(report.initial_cost, 0.0);
        assert_eq!(report.placed, 5);
        assert_eq!(groups[0].members.len(), 3);
        assert_eq!(groups[1].members.len(), 2);
        for id in &groups[0].members {
            assert_eq!(roster[id].personas()[0].category, Category::Arcane);
        }
    }

    #[test]
    fn test_facilitators_are_not_placed() {
        let matchmaker = Matchmaker::with_default_config();
        let lead = Uuid::from_u128(1000);
        let mut attendees = vec![
            create_attendee(1, Category::Arcane),
            create_attendee(2, Category::Arcane),
            Attendee::facilitator(Uuid::from_u128(50), "Flagged"),
        ];
        // Named as a group's facilitator but not flagged
        attendees.push(create_attendee(1000, Category::Arcane));
        let roster = create_roster(attendees);
        let mut groups = create_groups(&[Category::Arcane, Category::Divine]);
        assert_eq!(groups[0].facilitator, Some(lead));

        let report = matchmaker.match_groups(&mut groups, &roster).unwrap();

        assert_eq!(report.placed, 2);
        let placed: Vec<_> = groups.iter().flat_map(|g| g.members.iter()).collect();
        assert!(!placed.contains(&&lead));
        assert!(!placed.contains(&&Uuid::from_u128(50)));
    }

    #[test]
    fn test_empty_inputs_are_noops() {
        let matchmaker = Matchmaker::with_default_config();

        let mut groups = create_groups(&[Category::Arcane]);
        let report = matchmaker.match_groups(&mut groups, &Roster::new()).unwrap();
        assert_eq!(report, MatchReport::default());
        assert!(groups[0].members.is_empty());

        let roster = create_roster(vec![create_attendee(1, Category::Arcane)]);
        let mut no_groups: Vec<Group> = Vec::new();
        assert!(matchmaker.match_groups(&mut no_groups, &roster).is_ok());
    }

    #[test]
    fn test_failure_leaves_groups_untouched() {
        let config = ScoringConfig {
            max_group_size: Some(1),
            ..ScoringConfig::default()
        };
        let matchmaker = Matchmaker::new(config).unwrap();
        let roster = create_roster(vec![
            create_attendee(1, Category::Arcane),
            create_attendee(2, Category::Arcane),
            create_attendee(3, Category::Arcane),
        ]);
        let mut groups = create_groups(&[Category::Arcane, Category::Divine]);
        groups[0].add_member(Uuid::from_u128(77)).unwrap();
        let snapshot = groups.clone();

        let err = matchmaker.match_groups(&mut groups, &roster);
        assert!(matches!(err, Err(MatchError::TooManyAttendees { attendees: 3, slots: 2 })));
        assert_eq!(groups, snapshot);
    }

    #[test]
    fn test_group_without_themes_rejected() {
        let matchmaker = Matchmaker::with_default_config();
        let roster = create_roster(vec![create_attendee(1, Category::Arcane)]);
        let mut groups = create_groups(&[Category::Arcane, Category::Divine]);
        groups[1].themes.clear();

        let err = matchmaker.match_groups(&mut groups, &roster);
        assert!(matches!(err, Err(MatchError::GroupWithoutThemes(1))));
        assert!(groups[0].members.is_empty());
    }

    #[test]
    fn test_invalid_config_rejected() {
        let config = ScoringConfig {
            grudge_window_weeks: f64::NAN,
            ..ScoringConfig::default()
        };
        assert!(matches!(Matchmaker::new(config), Err(MatchError::InvalidConfig(_))));
    }

    #[test]
    fn test_assign_themes_overwrites_group_themes() {
        let matchmaker = Matchmaker::with_default_config();
        let roster = create_roster(vec![
            create_attendee(1, Category::Primal),
            create_attendee(2, Category::Primal),
        ]);
        let mut groups = create_groups(&[Category::Arcane, Category::Arcane]);

        let selection = matchmaker.assign_themes(&mut groups, &roster).unwrap();

        assert_eq!(selection.total_cost, 0.0);
        assert_eq!(groups[0].themes, vec![Category::Primal]);
        assert_eq!(groups[1].themes, vec![Category::Primal]);
    }
}
