//! Pairwise-swap local search over an already populated set of groups
//!
//! Every pass considers swapping each attendee of one group with each
//! attendee of another. The swap-selection policy is a [`SwapForager`]:
//! first-improvement restarts the scan after the first improving swap,
//! best-improvement applies the single best swap of a full pass.

use std::fmt::Debug;

use crate::core::scoring::swap_delta;
use crate::error::Result;
use crate::models::{AttendeeId, Group, Roster, ScoringConfig, SwapStrategy};

/// Gains at or below this are treated as no improvement
pub const IMPROVEMENT_EPSILON: f64 = 1e-9;

/// A swap of two attendees between two groups, with its score gain
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SwapRecord {
    pub first_group: usize,
    pub second_group: usize,
    /// Attendee that moved out of `first_group`
    pub first: AttendeeId,
    /// Attendee that moved out of `second_group`
    pub second: AttendeeId,
    pub gain: f64,
}

/// Outcome of a refinement run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RefineReport {
    pub swaps: Vec<SwapRecord>,
    /// Number of scans, including the final one that found nothing
    pub passes: usize,
    pub hit_swap_limit: bool,
}

impl RefineReport {
    pub fn total_gain(&self) -> f64 {
        self.swaps.iter().map(|s| s.gain).sum()
    }
}

/// Collects improving swaps during a pass and picks the one to apply
pub trait SwapForager: Send + Debug {
    /// Called at the start of each pass to reset state.
    fn pass_started(&mut self);

    /// Offers an improving swap.
    fn add_candidate(&mut self, candidate: SwapRecord);

    /// Returns true once the forager wants the scan to stop.
    fn is_quit_early(&self) -> bool;

    /// Picks the swap to apply, if any was offered.
    fn pick_candidate(&mut self) -> Option<SwapRecord>;
}

/// Applies the first improving swap found
#[derive(Debug, Clone, Default)]
pub struct FirstImprovementForager {
    picked: Option<SwapRecord>,
}

impl SwapForager for FirstImprovementForager {
    fn pass_started(&mut self) {
        self.picked = None;
    }

    fn add_candidate(&mut self, candidate: SwapRecord) {
        if self.picked.is_none() {
            self.picked = Some(candidate);
        }
    }

    fn is_quit_early(&self) -> bool {
        self.picked.is_some()
    }

    fn pick_candidate(&mut self) -> Option<SwapRecord> {
        self.picked.take()
    }
}

/// Scans a full pass and applies the swap with the largest gain
///
/// Ties keep the earliest swap in scan order.
#[derive(Debug, Clone, Default)]
pub struct BestImprovementForager {
    best: Option<SwapRecord>,
}

impl SwapForager for BestImprovementForager {
    fn pass_started(&mut self) {
        self.best = None;
    }

    fn add_candidate(&mut self, candidate: SwapRecord) {
        match &self.best {
            Some(best) if best.gain >= candidate.gain => {}
            _ => self.best = Some(candidate),
        }
    }

    fn is_quit_early(&self) -> bool {
        false
    }

    fn pick_candidate(&mut self) -> Option<SwapRecord> {
        self.best.take()
    }
}

pub fn forager_for(strategy: SwapStrategy) -> Box<dyn SwapForager> {
    match strategy {
        SwapStrategy::FirstImprovement => Box::new(FirstImprovementForager::default()),
        SwapStrategy::BestImprovement => Box::new(BestImprovementForager::default()),
    }
}

/// Hill-climbing refiner over group memberships
#[derive(Debug, Clone, Copy)]
pub struct Refiner<'a> {
    config: &'a ScoringConfig,
    roster: &'a Roster,
}

impl<'a> Refiner<'a> {
    pub fn new(config: &'a ScoringConfig, roster: &'a Roster) -> Self {
        Self { config, roster }
    }

    /// Refine with the configured swap strategy
    pub fn refine(&self, groups: &mut [Group]) -> Result<RefineReport> {
        let mut forager = forager_for(self.config.swap_strategy);
        self.refine_with(groups, forager.as_mut())
    }

    /// Swap attendees until a full pass finds no improving swap
    ///
    /// Every applied swap strictly increases the total social score, which is
    /// bounded, so the loop ends. `max_swaps` additionally caps the work.
    pub fn refine_with(&self, groups: &mut [Group], forager: &mut dyn SwapForager) -> Result<RefineReport> {
        let mut report = RefineReport::default();

        loop {
            if report.swaps.len() >= self.config.max_swaps {
                tracing::warn!(
                    "Refinement stopped after {} swaps without converging",
                    report.swaps.len()
                );
                report.hit_swap_limit = true;
                break;
            }

            report.passes += 1;
            forager.pass_started();
            self.scan(groups, forager)?;

            let Some(swap) = forager.pick_candidate() else {
                break;
            };

            groups[swap.first_group].replace_member(&swap.first, swap.second);
            groups[swap.second_group].replace_member(&swap.second, swap.first);

            tracing::debug!(
                "Swapped {} (group {}) with {} (group {}), gain {:.3}",
                swap.first,
                swap.first_group,
                swap.second,
                swap.second_group,
                swap.gain
            );
            report.swaps.push(swap);
        }

        Ok(report)
    }

    fn scan(&self, groups: &[Group], forager: &mut dyn SwapForager) -> Result<()> {
        for (i, g1) in groups.iter().enumerate() {
            for (j, g2) in groups.iter().enumerate().skip(i + 1) {
                for p1 in &g1.members {
                    for p2 in &g2.members {
                        let gain = swap_delta(self.config, g1, g2, p1, p2, self.roster)?;
                        if gain <= IMPROVEMENT_EPSILON {
                            continue;
                        }
                        forager.add_candidate(SwapRecord {
                            first_group: i,
                            second_group: j,
                            first: *p1,
                            second: *p2,
                            gain,
                        });
                        if forager.is_quit_early() {
                            return Ok(());
                        }
                    }
                }
            }
        }
        Ok(())
    }
}
