// Unit tests for Session Match

use chrono::NaiveDate;
use session_match::core::{
    assignment::{assign_initial, group_capacities, solve_assignment},
    scoring::{category_affinity, group_social_score, pair_score, DEFAULT_SCORE},
    themes::{select_themes, ThemeCombinations},
};
use session_match::models::{Attendee, Category, Group, Persona, Roster, ScoringConfig};
use uuid::Uuid;

fn session_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 9, 14).unwrap()
}

fn create_attendee(n: u128, categories: &[Category]) -> Attendee {
    let mut attendee = Attendee::new(Uuid::from_u128(n), format!("Attendee {}", n));
    for category in categories {
        attendee
            .add_persona(Persona::new(format!("{} persona", category), *category))
            .unwrap();
    }
    attendee
}

#[test]
fn test_zero_personas_scores_default() {
    let config = ScoringConfig::default();
    let attendee = create_attendee(1, &[]);

    for category in Category::ALL {
        assert_eq!(category_affinity(&config, &attendee, &[category]), DEFAULT_SCORE);
    }
}

#[test]
fn test_affinity_respects_custom_multipliers() {
    let config = ScoringConfig {
        category_match_bonus: 20.0,
        second_choice_multiplier: 0.5,
        ..ScoringConfig::default()
    };
    let attendee = create_attendee(1, &[Category::Divine]);

    // divine -> [arcane, martial, primal]
    assert_eq!(category_affinity(&config, &attendee, &[Category::Divine]), 20.0);
    assert_eq!(category_affinity(&config, &attendee, &[Category::Arcane]), 10.0);
    assert_eq!(category_affinity(&config, &attendee, &[Category::Shadow]), DEFAULT_SCORE);
}

#[test]
fn test_primary_persona_bonus() {
    let config = ScoringConfig::default();
    let mut attendee = create_attendee(1, &[Category::Primal]);
    let without = category_affinity(&config, &attendee, &[Category::Primal]);

    let persona = attendee.personas()[0].id;
    attendee.set_primary(persona).unwrap();
    let with = category_affinity(&config, &attendee, &[Category::Primal]);

    assert_eq!(with - without, config.primary_persona_multiplier);
}

#[test]
fn test_pair_score_is_symmetric() {
    let config = ScoringConfig::default();
    let mut a = create_attendee(1, &[]);
    let mut b = create_attendee(2, &[]);
    a.preferred_partners.insert(b.id);
    b.record_session(a.id, session_date() - chrono::Duration::weeks(3));

    assert_eq!(
        pair_score(&config, &a, &b, session_date()),
        pair_score(&config, &b, &a, session_date())
    );
}

#[test]
fn test_recent_reunion_scores_lower_than_stale_one() {
    let config = ScoringConfig::default();
    let mut a = create_attendee(1, &[]);
    let b = create_attendee(2, &[]);
    let c = create_attendee(3, &[]);
    a.record_session(b.id, session_date() - chrono::Duration::weeks(1));
    a.record_session(c.id, session_date() - chrono::Duration::weeks(12));

    let recent = pair_score(&config, &a, &b, session_date());
    let stale = pair_score(&config, &a, &c, session_date());
    assert!(recent < stale);
    assert_eq!(stale, config.max_reunion_bonus);
}

#[test]
fn test_group_social_score_of_empty_group() {
    let config = ScoringConfig::default();
    let group = Group::new(None, vec![Category::Arcane], session_date());
    assert_eq!(group_social_score(&config, &group, &Roster::new()).unwrap(), 0.0);
}

#[test]
fn test_capacities_differ_by_at_most_one() {
    for attendees in 0..30 {
        for groups in 1..7 {
            let caps = group_capacities(attendees, groups, None).unwrap();
            let max = *caps.iter().max().unwrap();
            let min = *caps.iter().min().unwrap();
            assert!(max - min <= 1);
            assert_eq!(caps.iter().sum::<usize>(), attendees);
            // Larger groups come first
            assert!(caps.windows(2).all(|w| w[0] >= w[1]));
        }
    }
}

#[test]
fn test_solver_finds_optimum_over_greedy() {
    // Greedy row-by-row would take (0,0)=1 then (1,1)=10 for 11
    let cost = vec![vec![1.0, 2.0], vec![1.0, 10.0]];
    let solved = solve_assignment(&cost).unwrap();
    assert_eq!(solved.total_cost, 3.0);
    assert_eq!(solved.row_to_col, vec![1, 0]);
}

#[test]
fn test_initial_assignment_zero_cost_scenario() {
    let config = ScoringConfig::default();
    let attendees = vec![
        create_attendee(1, &[Category::Shadow]),
        create_attendee(2, &[Category::Divine]),
        create_attendee(3, &[Category::Shadow]),
        create_attendee(4, &[Category::Divine]),
        create_attendee(5, &[Category::Shadow]),
    ];
    let refs: Vec<_> = attendees.iter().collect();
    let groups = vec![
        Group::new(None, vec![Category::Shadow], session_date()),
        Group::new(None, vec![Category::Divine], session_date()),
    ];

    let initial = assign_initial(&config, &refs, &groups).unwrap();

    assert_eq!(initial.capacities, vec![3, 2]);
    assert_eq!(initial.total_cost, 0.0);
    assert_eq!(initial.group_of, vec![0, 1, 0, 1, 0]);
}

#[test]
fn test_theme_combinations_are_lazy() {
    let mut combos = ThemeCombinations::new(6);
    let first = combos.next().unwrap();
    assert_eq!(first, vec![Category::Arcane; 6]);
    assert_eq!(ThemeCombinations::total(6), Some(15_625));
}

#[test]
fn test_theme_selection_with_no_attendees() {
    let config = ScoringConfig::default();
    let selection = select_themes(&config, 2, &[]).unwrap();
    assert_eq!(selection.total_cost, 0.0);
    assert_eq!(selection.evaluated, 1);
}

#[test]
fn test_solver_prefers_primary_persona_placement() {
    let config = ScoringConfig::default();
    let flexible = create_attendee(1, &[Category::Arcane, Category::Divine]);
    let mut devoted = create_attendee(2, &[Category::Arcane]);
    let primary = devoted.personas()[0].id;
    devoted.set_primary(primary).unwrap();

    let groups = vec![
        Group::new(None, vec![Category::Arcane], session_date()),
        Group::new(None, vec![Category::Divine], session_date()),
    ];

    let initial = assign_initial(&config, &[&flexible, &devoted], &groups).unwrap();

    // 12 + 10 beats 10 + 7
    assert_eq!(initial.group_of, vec![1, 0]);
    assert_eq!(initial.total_cost, -config.primary_persona_multiplier);
}

#[test]
fn test_theme_selection_follows_primary_persona() {
    let config = ScoringConfig::default();
    let mut attendee = create_attendee(1, &[Category::Arcane, Category::Divine]);
    let divine = attendee.personas()[1].id;
    attendee.set_primary(divine).unwrap();

    let selection = select_themes(&config, 1, &[&attendee]).unwrap();

    assert_eq!(selection.themes, vec![Category::Divine]);
    assert_eq!(selection.total_cost, -config.primary_persona_multiplier);
}
