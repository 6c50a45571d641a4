use chrono::NaiveDate;

use crate::error::{MatchError, Result};
use crate::models::{Attendee, AttendeeId, Category, Group, Persona, Roster, ScoringConfig};

/// Score given when no persona relates to any group theme
pub const DEFAULT_SCORE: f64 = 1.0;

/// Look up an attendee, failing on ids that are not in the roster
#[inline]
pub fn lookup<'a>(roster: &'a Roster, id: &AttendeeId) -> Result<&'a Attendee> {
    roster.get(id).ok_or(MatchError::UnknownAttendee(*id))
}

/// Score a single persona against a set of group themes
///
/// Scoring tiers:
/// - exact theme match:          category_match_bonus
/// - 1st fallback present:       bonus * second_choice_multiplier
/// - 2nd fallback present:       bonus * third_choice_multiplier
/// - 3rd fallback present:       bonus * fourth_choice_multiplier
/// - otherwise:                  DEFAULT_SCORE
///
/// The primary persona additionally receives `primary_persona_multiplier`.
#[inline]
pub fn persona_affinity(
    config: &ScoringConfig,
    persona: &Persona,
    is_primary: bool,
    themes: &[Category],
) -> f64 {
    let bonus = config.category_match_bonus;

    let tier_score = if themes.contains(&persona.category) {
        bonus
    } else {
        let rank = config
            .fallbacks_for(persona.category)
            .iter()
            .position(|fallback| themes.contains(fallback));

        match rank {
            Some(0) => bonus * config.second_choice_multiplier,
            Some(1) => bonus * config.third_choice_multiplier,
            Some(2) => bonus * config.fourth_choice_multiplier,
            _ => DEFAULT_SCORE,
        }
    };

    if is_primary {
        tier_score + config.primary_persona_multiplier
    } else {
        tier_score
    }
}

/// Category affinity of an attendee for a group's themes
///
/// The best of the attendee's active personas counts. An attendee without any
/// active persona falls back to `DEFAULT_SCORE`.
pub fn category_affinity(config: &ScoringConfig, attendee: &Attendee, themes: &[Category]) -> f64 {
    attendee
        .active_personas()
        .map(|persona| persona_affinity(config, persona, attendee.is_primary(persona), themes))
        .fold(None, |best: Option<f64>, score| Some(best.map_or(score, |b| b.max(score))))
        .unwrap_or_else(|| {
            tracing::trace!("Attendee {} has no active personas, using default affinity", attendee.id);
            DEFAULT_SCORE
        })
}

/// Time-decayed reunion term for a pair last seen together on `last_played`
///
/// Inside the grudge window the term grows linearly from 0 (played this week)
/// to `max_reunion_bonus` at the window's edge. Outside the window, or when the
/// pair never played together, the full bonus applies.
#[inline]
pub fn reunion_term(config: &ScoringConfig, last_played: Option<NaiveDate>, session_date: NaiveDate) -> f64 {
    let max = config.max_reunion_bonus;
    let window = config.grudge_window_weeks;

    let Some(last) = last_played else {
        return max;
    };
    if window <= 0.0 {
        return max;
    }

    let weeks = ((session_date - last).num_days() as f64 / 7.0).max(0.0);
    if weeks < window {
        max * weeks / window
    } else {
        max
    }
}

/// Most recent shared session recorded by either side of a pair
#[inline]
fn last_played_together(a: &Attendee, b: &Attendee) -> Option<NaiveDate> {
    match (a.last_played_with(&b.id), b.last_played_with(&a.id)) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (x, y) => x.or(y),
    }
}

/// Social score of a single pair of attendees; symmetric in its arguments
pub fn pair_score(config: &ScoringConfig, a: &Attendee, b: &Attendee, session_date: NaiveDate) -> f64 {
    let mut score = 0.0;

    if a.avoids(&b.id) || b.avoids(&a.id) {
        score -= config.avoid_penalty;
    }

    if a.prefers(&b.id) || b.prefers(&a.id) {
        score += config.preferred_partner_bonus;
    }

    score + reunion_term(config, last_played_together(a, b), session_date)
}

/// Penalty for an attendee placed under a facilitator they avoid
#[inline]
pub fn facilitator_term(config: &ScoringConfig, attendee: &Attendee, facilitator: Option<&AttendeeId>) -> f64 {
    match facilitator {
        Some(f) if attendee.avoids_as_facilitator(f) => -config.avoid_penalty,
        _ => 0.0,
    }
}

/// Full social score of a group
///
/// ```text
/// score = sum(pair_score(a, b) for each unordered member pair)
///       + sum(facilitator_term(m) + category_affinity(m) for each member)
/// ```
pub fn group_social_score(config: &ScoringConfig, group: &Group, roster: &Roster) -> Result<f64> {
    let members = group
        .members
        .iter()
        .map(|id| lookup(roster, id))
        .collect::<Result<Vec<_>>>()?;

    if group.facilitator.is_none() && !members.is_empty() {
        tracing::debug!("Group on {} has no facilitator, skipping facilitator terms", group.date);
    }

    let mut score = 0.0;
    for (i, a) in members.iter().enumerate() {
        for b in &members[i + 1..] {
            score += pair_score(config, a, b, group.date);
        }
        score += facilitator_term(config, a, group.facilitator.as_ref());
        score += category_affinity(config, a, &group.themes);
    }

    Ok(score)
}

/// Sum of `group_social_score` over every group
pub fn total_social_score(config: &ScoringConfig, groups: &[Group], roster: &Roster) -> Result<f64> {
    groups
        .iter()
        .map(|g| group_social_score(config, g, roster))
        .sum()
}

/// Everything `member` adds to `group`, ignoring the member with id `excluding`
///
/// Pair terms are symmetric, so the score of a group with one member replaced
/// differs from the original by the difference of the two contributions.
pub fn member_contribution(
    config: &ScoringConfig,
    member: &Attendee,
    group: &Group,
    excluding: &AttendeeId,
    roster: &Roster,
) -> Result<f64> {
    let mut score = facilitator_term(config, member, group.facilitator.as_ref())
        + category_affinity(config, member, &group.themes);

    for other_id in &group.members {
        if other_id == excluding || *other_id == member.id {
            continue;
        }
        let other = lookup(roster, other_id)?;
        score += pair_score(config, member, other, group.date);
    }

    Ok(score)
}

/// Change in combined social score if `p1` (in `g1`) and `p2` (in `g2`) trade places
///
/// Equivalent to
/// `score(g1 - p1 + p2) + score(g2 - p2 + p1) - score(g1) - score(g2)`
/// without building either hypothetical group.
pub fn swap_delta(
    config: &ScoringConfig,
    g1: &Group,
    g2: &Group,
    p1: &AttendeeId,
    p2: &AttendeeId,
    roster: &Roster,
) -> Result<f64> {
    let a1 = lookup(roster, p1)?;
    let a2 = lookup(roster, p2)?;

    let g1_delta = member_contribution(config, a2, g1, p1, roster)?
        - member_contribution(config, a1, g1, p1, roster)?;
    let g2_delta = member_contribution(config, a1, g2, p2, roster)?
        - member_contribution(config, a2, g2, p2, roster)?;

    Ok(g1_delta + g2_delta)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::Persona;
    use uuid::Uuid;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 1).unwrap()
    }

    fn attendee(n: u128, categories: &[Category]) -> Attendee {
        let mut a = Attendee::new(Uuid::from_u128(n), format!("Attendee {}", n));
        for (i, c) in categories.iter().enumerate() {
            a.add_persona(Persona::new(format!("Persona {}", i), *c)).unwrap();
        }
        a
    }

    fn roster(attendees: Vec<Attendee>) -> Roster {
        attendees.into_iter().map(|a| (a.id, a)).collect()
    }

    fn group(themes: &[Category], members: &[u128]) -> Group {
        let mut g = Group::new(None, themes.to_vec(), date());
        for m in members {
            g.add_member(Uuid::from_u128(*m)).unwrap();
        }
        g
    }

    #[test]
    fn test_exact_match_scores_bonus() {
        let config = ScoringConfig::default();
        let a = attendee(1, &[Category::Arcane]);
        assert_eq!(category_affinity(&config, &a, &[Category::Arcane]), 10.0);
    }

    #[test]
    fn test_fallback_tiers() {
        let config = ScoringConfig::default();
        let a = attendee(1, &[Category::Arcane]);

        // arcane -> [shadow, divine, primal]
        assert_eq!(category_affinity(&config, &a, &[Category::Shadow]), 7.5);
        assert_eq!(category_affinity(&config, &a, &[Category::Divine]), 5.0);
        assert_eq!(category_affinity(&config, &a, &[Category::Primal]), 2.5);
        assert_eq!(category_affinity(&config, &a, &[Category::Martial]), DEFAULT_SCORE);
    }

    #[test]
    fn test_best_ranked_theme_wins() {
        let config = ScoringConfig::default();
        let a = attendee(1, &[Category::Arcane]);
        let score = category_affinity(&config, &a, &[Category::Primal, Category::Shadow]);
        assert_eq!(score, 7.5);
    }

    #[test]
    fn test_primary_bonus_and_best_persona() {
        let config = ScoringConfig::default();
        let mut a = attendee(1, &[Category::Martial, Category::Arcane]);
        let martial = a.personas()[0].id;
        a.set_primary(martial).unwrap();

        // primary martial vs arcane: 1.0 + 2.0; arcane persona exact: 10.0
        assert_eq!(category_affinity(&config, &a, &[Category::Arcane]), 10.0);
        assert_eq!(category_affinity(&config, &a, &[Category::Martial]), 12.0);
    }

    #[test]
    fn test_no_personas_defaults() {
        let config = ScoringConfig::default();
        let a = attendee(1, &[]);
        assert_eq!(category_affinity(&config, &a, &[Category::Arcane]), DEFAULT_SCORE);
    }

    #[test]
    fn test_retired_personas_ignored() {
        let config = ScoringConfig::default();
        let mut a = attendee(1, &[Category::Arcane]);
        let id = a.personas()[0].id;
        a.retire_persona(id).unwrap();
        assert_eq!(category_affinity(&config, &a, &[Category::Arcane]), DEFAULT_SCORE);
    }

    #[test]
    fn test_reunion_term_decay() {
        let config = ScoringConfig::default();
        let today = date();

        assert_eq!(reunion_term(&config, None, today), 3.0);
        assert_eq!(reunion_term(&config, Some(today), today), 0.0);
        assert_eq!(reunion_term(&config, Some(today - chrono::Duration::weeks(2)), today), 1.5);
        assert_eq!(reunion_term(&config, Some(today - chrono::Duration::weeks(5)), today), 3.0);
        assert_eq!(reunion_term(&config, Some(today + chrono::Duration::weeks(1)), today), 0.0);
    }

    #[test]
    fn test_pair_score_one_sided_relations() {
        let config = ScoringConfig::default();
        let mut a = attendee(1, &[]);
        let b = attendee(2, &[]);
        a.avoids.insert(b.id);

        assert_eq!(pair_score(&config, &a, &b, date()), -47.0);
        assert_eq!(pair_score(&config, &b, &a, date()), -47.0);

        a.avoids.clear();
        a.preferred_partners.insert(b.id);
        assert_eq!(pair_score(&config, &b, &a, date()), 8.0);
    }

    #[test]
    fn test_pair_score_uses_latest_history() {
        let config = ScoringConfig::default();
        let mut a = attendee(1, &[]);
        let mut b = attendee(2, &[]);
        a.record_session(b.id, date() - chrono::Duration::weeks(10));
        b.record_session(a.id, date());

        assert_eq!(pair_score(&config, &a, &b, date()), 0.0);
    }

    #[test]
    fn test_facilitator_avoidance() {
        let config = ScoringConfig::default();
        let facilitator = Uuid::from_u128(99);
        let mut a = attendee(1, &[Category::Arcane]);
        a.avoids_as_facilitator.insert(facilitator);
        let r = roster(vec![a]);

        let mut g = group(&[Category::Arcane], &[1]);
        assert_eq!(group_social_score(&config, &g, &r).unwrap(), 10.0);

        g.facilitator = Some(facilitator);
        assert_eq!(group_social_score(&config, &g, &r).unwrap(), -40.0);
    }

    #[test]
    fn test_social_score_order_independent() {
        let config = ScoringConfig::default();
        let mut a = attendee(1, &[Category::Arcane]);
        let b = attendee(2, &[Category::Divine]);
        let mut c = attendee(3, &[Category::Shadow]);
        a.avoids.insert(b.id);
        c.preferred_partners.insert(a.id);
        c.record_session(b.id, date() - chrono::Duration::weeks(1));
        let r = roster(vec![a, b, c]);

        let forward = group_social_score(&config, &group(&[Category::Arcane], &[1, 2, 3]), &r).unwrap();
        let reversed = group_social_score(&config, &group(&[Category::Arcane], &[3, 2, 1]), &r).unwrap();
        let shuffled = group_social_score(&config, &group(&[Category::Arcane], &[2, 3, 1]), &r).unwrap();

        assert!((forward - reversed).abs() < 1e-9);
        assert!((forward - shuffled).abs() < 1e-9);
    }

    #[test]
    fn test_unknown_member_is_an_error() {
        let config = ScoringConfig::default();
        let r = roster(vec![attendee(1, &[])]);
        let g = group(&[Category::Arcane], &[1, 2]);
        assert!(matches!(
            group_social_score(&config, &g, &r),
            Err(MatchError::UnknownAttendee(_))
        ));
    }

    #[test]
    fn test_swap_delta_matches_full_recompute() {
        let config = ScoringConfig::default();
        let mut a = attendee(1, &[Category::Arcane]);
        let mut b = attendee(2, &[Category::Martial]);
        let c = attendee(3, &[Category::Martial]);
        let d = attendee(4, &[Category::Arcane, Category::Primal]);
        a.avoids.insert(c.id);
        b.preferred_partners.insert(d.id);
        b.record_session(c.id, date() - chrono::Duration::weeks(1));
        let r = roster(vec![a, b, c, d]);

        let g1 = group(&[Category::Arcane], &[1, 3]);
        let g2 = group(&[Category::Martial], &[2, 4]);
        let p1 = Uuid::from_u128(3);
        let p2 = Uuid::from_u128(4);

        let before = group_social_score(&config, &g1, &r).unwrap()
            + group_social_score(&config, &g2, &r).unwrap();

        let mut s1 = g1.clone();
        let mut s2 = g2.clone();
        s1.replace_member(&p1, p2);
        s2.replace_member(&p2, p1);
        let after = group_social_score(&config, &s1, &r).unwrap()
            + group_social_score(&config, &s2, &r).unwrap();

        let delta = swap_delta(&config, &g1, &g2, &p1, &p2, &r).unwrap();
        assert!((delta - (after - before)).abs() < 1e-9, "delta {} vs {}", delta, after - before);
    }
}
