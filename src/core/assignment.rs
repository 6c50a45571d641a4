use crate::core::scoring::category_affinity;
use crate::error::{MatchError, Result, SolverStatus};
use crate::models::{Attendee, Group, ScoringConfig};

/// Result of a min-cost assignment solve
#[derive(Debug, Clone, PartialEq)]
pub struct Assignment {
    /// Column (slot) matched to each row (attendee)
    pub row_to_col: Vec<usize>,
    pub total_cost: f64,
}

/// Category-optimal placement of attendees, not yet written into any group
#[derive(Debug, Clone, PartialEq)]
pub struct InitialAssignment {
    /// Group index for each attendee, in the order the attendees were given
    pub group_of: Vec<usize>,
    pub capacities: Vec<usize>,
    pub total_cost: f64,
}

/// Split `attendees` into `groups` near-equal capacities
///
/// The first `attendees % groups` groups receive one extra seat.
pub fn group_capacities(attendees: usize, groups: usize, max_group_size: Option<usize>) -> Result<Vec<usize>> {
    if groups == 0 {
        if attendees == 0 {
            return Ok(Vec::new());
        }
        return Err(MatchError::NoGroups { attendees });
    }

    if let Some(max) = max_group_size {
        let slots = groups.saturating_mul(max);
        if attendees > slots {
            return Err(MatchError::TooManyAttendees { attendees, slots });
        }
    }

    let base = attendees / groups;
    let remainder = attendees % groups;

    Ok((0..groups)
        .map(|g| if g < remainder { base + 1 } else { base })
        .collect())
}

/// Flatten capacities into one entry per slot holding the owning group index
pub fn expand_slots(capacities: &[usize]) -> Vec<usize> {
    capacities
        .iter()
        .enumerate()
        .flat_map(|(group, &cap)| std::iter::repeat(group).take(cap))
        .collect()
}

/// Cost of placing an attendee with the given affinity into a slot
///
/// Measured from the category match bonus, so a plain exact theme match costs
/// nothing. A primary persona lifts affinity past the bonus and the cost goes
/// negative, which keeps minimal cost equivalent to maximal total affinity.
#[inline]
pub fn slot_cost(config: &ScoringConfig, affinity: f64) -> f64 {
    config.category_match_bonus - affinity
}

/// Build an `rows x slots` cost matrix from a per-(row, group) affinity function
pub fn build_cost_matrix<F>(config: &ScoringConfig, rows: usize, slots: &[usize], affinity: F) -> Vec<Vec<f64>>
where
    F: Fn(usize, usize) -> f64,
{
    (0..rows)
        .map(|row| slots.iter().map(|&group| slot_cost(config, affinity(row, group))).collect())
        .collect()
}

/// Solve the rectangular assignment problem exactly (rows <= columns)
///
/// Shortest augmenting path formulation of the Hungarian algorithm with
/// row/column potentials; O(rows^2 * cols).
pub fn solve_assignment(cost: &[Vec<f64>]) -> Result<Assignment> {
    let n = cost.len();
    if n == 0 {
        return Ok(Assignment { row_to_col: Vec::new(), total_cost: 0.0 });
    }

    let m = cost[0].len();
    if n > m {
        return Err(MatchError::TooManyAttendees { attendees: n, slots: m });
    }
    if cost.iter().any(|row| row.len() != m) {
        return Err(MatchError::Solver { status: SolverStatus::Infeasible });
    }
    if cost.iter().flatten().any(|c| !c.is_finite()) {
        return Err(MatchError::Solver { status: SolverStatus::NonFiniteCost });
    }

    // 1-based indices; column 0 is the virtual source
    let mut u = vec![0.0; n + 1];
    let mut v = vec![0.0; m + 1];
    let mut owner = vec![0usize; m + 1];
    let mut way = vec![0usize; m + 1];

    for row in 1..=n {
        owner[0] = row;
        let mut j0 = 0usize;
        let mut min_slack = vec![f64::INFINITY; m + 1];
        let mut used = vec![false; m + 1];

        loop {
            used[j0] = true;
            let i0 = owner[j0];
            let mut delta = f64::INFINITY;
            let mut j1 = None;

            for j in 1..=m {
                if used[j] {
                    continue;
                }
                let reduced = cost[i0 - 1][j - 1] - u[i0] - v[j];
                if reduced < min_slack[j] {
                    min_slack[j] = reduced;
                    way[j] = j0;
                }
                if min_slack[j] < delta {
                    delta = min_slack[j];
                    j1 = Some(j);
                }
            }

            let j1 = j1.ok_or(MatchError::Solver { status: SolverStatus::Infeasible })?;

            for j in 0..=m {
                if used[j] {
                    u[owner[j]] += delta;
                    v[j] -= delta;
                } else {
                    min_slack[j] -= delta;
                }
            }

            j0 = j1;
            if owner[j0] == 0 {
                break;
            }
        }

        // Flip the augmenting path
        loop {
            let j1 = way[j0];
            owner[j0] = owner[j1];
            j0 = j1;
            if j0 == 0 {
                break;
            }
        }
    }

    let mut row_to_col = vec![usize::MAX; n];
    for j in 1..=m {
        if owner[j] != 0 {
            row_to_col[owner[j] - 1] = j - 1;
        }
    }
    if row_to_col.iter().any(|&c| c == usize::MAX) {
        return Err(MatchError::Solver { status: SolverStatus::Infeasible });
    }

    let total_cost = row_to_col
        .iter()
        .enumerate()
        .map(|(row, &col)| cost[row][col])
        .sum();

    Ok(Assignment { row_to_col, total_cost })
}

/// Place attendees into groups maximizing total category affinity
///
/// Group sizes follow `group_capacities`. No group is modified; the caller
/// commits the result once the whole solve has succeeded.
pub fn assign_initial(
    config: &ScoringConfig,
    attendees: &[&Attendee],
    groups: &[Group],
) -> Result<InitialAssignment> {
    let capacities = group_capacities(attendees.len(), groups.len(), config.max_group_size)?;
    let slots = expand_slots(&capacities);

    // affinity[attendee][group], computed once per pair rather than per slot
    let affinity: Vec<Vec<f64>> = attendees
        .iter()
        .map(|a| groups.iter().map(|g| category_affinity(config, a, &g.themes)).collect())
        .collect();

    let cost = build_cost_matrix(config, attendees.len(), &slots, |row, group| affinity[row][group]);
    let solved = solve_assignment(&cost)?;

    let group_of = solved.row_to_col.iter().map(|&slot| slots[slot]).collect();

    tracing::debug!(
        "Initial assignment placed {} attendees into {} groups (capacities {:?}, cost {:.3})",
        attendees.len(),
        groups.len(),
        capacities,
        solved.total_cost
    );

    Ok(InitialAssignment {
        group_of,
        capacities,
        total_cost: solved.total_cost,
    })
}
