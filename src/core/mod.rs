// Core algorithm exports
pub mod assignment;
pub mod matcher;
pub mod refiner;
pub mod scoring;
pub mod themes;

pub use assignment::{assign_initial, group_capacities, solve_assignment, Assignment, InitialAssignment};
pub use matcher::{MatchReport, Matchmaker};
pub use refiner::{
    BestImprovementForager, FirstImprovementForager, RefineReport, Refiner, SwapForager, SwapRecord,
};
pub use scoring::{category_affinity, group_social_score, pair_score, swap_delta, total_social_score, DEFAULT_SCORE};
pub use themes::{select_themes, ThemeCombinations, ThemeSelection};
