use crate::core::assignment::{build_cost_matrix, expand_slots, group_capacities, slot_cost, solve_assignment};
use crate::core::scoring::category_affinity;
use crate::error::{MatchError, Result};
use crate::models::{Attendee, Category, ScoringConfig};

/// Slack allowed when comparing a combination's cost with the lower bound
const BOUND_EPSILON: f64 = 1e-9;

/// Lazy iterator over every ordered tuple of `length` categories
///
/// Yields `Category::ALL.len().pow(length)` tuples in odometer order, the last
/// position changing fastest. Clone it to restart from the current position,
/// or build a new one to start over.
#[derive(Debug, Clone)]
pub struct ThemeCombinations {
    indices: Vec<usize>,
    done: bool,
}

impl ThemeCombinations {
    pub fn new(length: usize) -> Self {
        Self {
            indices: vec![0; length],
            done: false,
        }
    }

    /// Total number of tuples for `length` positions, if it fits in a usize
    pub fn total(length: usize) -> Option<usize> {
        u32::try_from(length)
            .ok()
            .and_then(|exp| Category::ALL.len().checked_pow(exp))
    }
}

impl Iterator for ThemeCombinations {
    type Item = Vec<Category>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }

        let current = self.indices.iter().map(|&i| Category::ALL[i]).collect();

        // Advance the odometer
        self.done = true;
        for pos in (0..self.indices.len()).rev() {
            self.indices[pos] += 1;
            if self.indices[pos] < Category::ALL.len() {
                self.done = false;
                break;
            }
            self.indices[pos] = 0;
        }

        Some(current)
    }
}

/// Outcome of a theme search
#[derive(Debug, Clone, PartialEq)]
pub struct ThemeSelection {
    /// One category per group, in group order
    pub themes: Vec<Category>,
    pub total_cost: f64,
    /// Number of combinations solved before returning
    pub evaluated: usize,
}

/// Pick the theme for each of `group_count` groups that best fits `attendees`
///
/// Exhaustive over `|categories|^group_count` combinations, which is why
/// `group_count` is capped by `max_theme_groups`. Each attendee's affinity
/// for each category is computed once up front. The search stops as soon as
/// a combination reaches the lower bound where every attendee sits in their
/// own best category, which is zero cost unless primary personas are involved.
pub fn select_themes(
    config: &ScoringConfig,
    group_count: usize,
    attendees: &[&Attendee],
) -> Result<ThemeSelection> {
    if group_count > config.max_theme_groups {
        return Err(MatchError::TooManyThemeGroups {
            requested: group_count,
            max: config.max_theme_groups,
        });
    }
    if group_count == 0 {
        return Ok(ThemeSelection {
            themes: Vec::new(),
            total_cost: 0.0,
            evaluated: 0,
        });
    }

    let capacities = group_capacities(attendees.len(), group_count, config.max_group_size)?;
    let slots = expand_slots(&capacities);

    let affinity: Vec<Vec<f64>> = attendees
        .iter()
        .map(|a| {
            Category::ALL
                .iter()
                .map(|c| category_affinity(config, a, std::slice::from_ref(c)))
                .collect()
        })
        .collect();

    let lower_bound: f64 = affinity
        .iter()
        .map(|row| {
            row.iter()
                .map(|&a| slot_cost(config, a))
                .fold(f64::INFINITY, f64::min)
        })
        .sum();

    let mut best: Option<(Vec<Category>, f64)> = None;
    let mut evaluated = 0;

    for combination in ThemeCombinations::new(group_count) {
        let cost = build_cost_matrix(config, attendees.len(), &slots, |row, group| {
            affinity[row][combination[group].index()]
        });
        let solved = solve_assignment(&cost)?;
        evaluated += 1;

        let improves = best.as_ref().map_or(true, |(_, c)| solved.total_cost < *c);
        if improves {
            best = Some((combination, solved.total_cost));
        }

        if solved.total_cost <= lower_bound + BOUND_EPSILON {
            tracing::debug!("Optimal theme combination found after {} candidates", evaluated);
            break;
        }
    }

    let (themes, total_cost) = best.ok_or(MatchError::NoGroups {
        attendees: attendees.len(),
    })?;

    tracing::debug!(
        "Selected themes {:?} for {} attendees (cost {:.3}, {} combinations tried)",
        themes,
        attendees.len(),
        total_cost,
        evaluated
    );

    Ok(ThemeSelection {
        themes,
        total_cost,
        evaluated,
    })
}
