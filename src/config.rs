use config::{Config, ConfigError, Environment, File};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;

use crate::error::{MatchError, Result};
use crate::models::domain::default_fallback_preferences;
use crate::models::{Category, ScoringConfig, SwapStrategy};

/// Application configuration
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    #[serde(default)]
    pub server: ServerSettings,
    #[serde(default)]
    pub scoring: ScoringSettings,
    #[serde(default)]
    pub logging: LoggingSettings,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ServerSettings {
    #[serde(default = "default_host")]
    pub host: String,
    #[serde(default = "default_port")]
    pub port: u16,
    pub workers: Option<usize>,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            workers: None,
        }
    }
}

fn default_host() -> String { "0.0.0.0".to_string() }
fn default_port() -> u16 { 8080 }

/// Matchmaking parameters as they appear in configuration files
#[derive(Debug, Clone, Deserialize)]
pub struct ScoringSettings {
    #[serde(default = "default_category_match_bonus")]
    pub category_match_bonus: f64,
    #[serde(default = "default_second_choice_multiplier")]
    pub second_choice_multiplier: f64,
    #[serde(default = "default_third_choice_multiplier")]
    pub third_choice_multiplier: f64,
    #[serde(default = "default_fourth_choice_multiplier")]
    pub fourth_choice_multiplier: f64,
    #[serde(default = "default_avoid_penalty")]
    pub avoid_penalty: f64,
    #[serde(default = "default_preferred_partner_bonus")]
    pub preferred_partner_bonus: f64,
    #[serde(default = "default_primary_persona_multiplier")]
    pub primary_persona_multiplier: f64,
    #[serde(default = "default_grudge_window_weeks")]
    pub grudge_window_weeks: f64,
    #[serde(default = "default_max_reunion_bonus")]
    pub max_reunion_bonus: f64,
    /// Per-category overrides, merged over the default fallback orderings
    #[serde(default = "default_fallback_preferences")]
    pub fallback: HashMap<Category, Vec<Category>>,
    #[serde(default)]
    pub max_group_size: Option<usize>,
    #[serde(default = "default_max_theme_groups")]
    pub max_theme_groups: usize,
    #[serde(default)]
    pub swap_strategy: SwapStrategy,
    #[serde(default = "default_max_swaps")]
    pub max_swaps: usize,
}

impl Default for ScoringSettings {
    fn default() -> Self {
        Self {
            category_match_bonus: default_category_match_bonus(),
            second_choice_multiplier: default_second_choice_multiplier(),
            third_choice_multiplier: default_third_choice_multiplier(),
            fourth_choice_multiplier: default_fourth_choice_multiplier(),
            avoid_penalty: default_avoid_penalty(),
            preferred_partner_bonus: default_preferred_partner_bonus(),
            primary_persona_multiplier: default_primary_persona_multiplier(),
            grudge_window_weeks: default_grudge_window_weeks(),
            max_reunion_bonus: default_max_reunion_bonus(),
            fallback: default_fallback_preferences(),
            max_group_size: None,
            max_theme_groups: default_max_theme_groups(),
            swap_strategy: SwapStrategy::default(),
            max_swaps: default_max_swaps(),
        }
    }
}

fn default_category_match_bonus() -> f64 { 10.0 }
fn default_second_choice_multiplier() -> f64 { 0.75 }
fn default_third_choice_multiplier() -> f64 { 0.5 }
fn default_fourth_choice_multiplier() -> f64 { 0.25 }
fn default_avoid_penalty() -> f64 { 50.0 }
fn default_preferred_partner_bonus() -> f64 { 5.0 }
fn default_primary_persona_multiplier() -> f64 { 2.0 }
fn default_grudge_window_weeks() -> f64 { 4.0 }
fn default_max_reunion_bonus() -> f64 { 3.0 }
fn default_max_theme_groups() -> usize { 6 }
fn default_max_swaps() -> usize { 10_000 }

impl TryFrom<ScoringSettings> for ScoringConfig {
    type Error = MatchError;

    fn try_from(settings: ScoringSettings) -> Result<Self> {
        let mut fallback_preferences = default_fallback_preferences();
        fallback_preferences.extend(settings.fallback);

        let config = ScoringConfig {
            category_match_bonus: settings.category_match_bonus,
            second_choice_multiplier: settings.second_choice_multiplier,
            third_choice_multiplier: settings.third_choice_multiplier,
            fourth_choice_multiplier: settings.fourth_choice_multiplier,
            avoid_penalty: settings.avoid_penalty,
            preferred_partner_bonus: settings.preferred_partner_bonus,
            primary_persona_multiplier: settings.primary_persona_multiplier,
            grudge_window_weeks: settings.grudge_window_weeks,
            max_reunion_bonus: settings.max_reunion_bonus,
            fallback_preferences,
            max_group_size: settings.max_group_size,
            max_theme_groups: settings.max_theme_groups,
            swap_strategy: settings.swap_strategy,
            max_swaps: settings.max_swaps,
        };
        config.validate()?;
        Ok(config)
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> Result<T> {
    value
        .trim()
        .parse()
        .map_err(|_| MatchError::InvalidConfig(format!("{} is not a valid number: {:?}", key, value)))
}

fn parse_categories(value: &str) -> Result<Vec<Category>> {
    value
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::parse::<Category>)
        .collect()
}

impl ScoringConfig {
    /// Build a configuration from a flat key/value settings store
    ///
    /// Numeric keys use the field names (`avoid_penalty`, ...). Fallback
    /// orderings use `fallback.<category>` with a comma-separated list, e.g.
    /// `fallback.arcane = "shadow, divine, primal"`. Missing keys keep their
    /// defaults; unrecognised keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Result<Self>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut s = ScoringSettings::default();

        for (key, value) in pairs {
            let key = key.as_ref().trim();
            let value = value.as_ref();

            match key {
                "category_match_bonus" => s.category_match_bonus = parse_number(key, value)?,
                "second_choice_multiplier" => s.second_choice_multiplier = parse_number(key, value)?,
                "third_choice_multiplier" => s.third_choice_multiplier = parse_number(key, value)?,
                "fourth_choice_multiplier" => s.fourth_choice_multiplier = parse_number(key, value)?,
                "avoid_penalty" => s.avoid_penalty = parse_number(key, value)?,
                "preferred_partner_bonus" => s.preferred_partner_bonus = parse_number(key, value)?,
                "primary_persona_multiplier" => s.primary_persona_multiplier = parse_number(key, value)?,
                "grudge_window_weeks" => s.grudge_window_weeks = parse_number(key, value)?,
                "max_reunion_bonus" => s.max_reunion_bonus = parse_number(key, value)?,
                "max_theme_groups" => s.max_theme_groups = parse_number(key, value)?,
                "max_swaps" => s.max_swaps = parse_number(key, value)?,
                "max_group_size" => {
                    s.max_group_size = match value.trim() {
                        "" | "none" => None,
                        v => Some(parse_number(key, v)?),
                    }
                }
                "swap_strategy" => s.swap_strategy = value.parse()?,
                _ => match key.strip_prefix("fallback.") {
                    Some(category) => {
                        s.fallback.insert(category.parse()?, parse_categories(value)?);
                    }
                    None => tracing::debug!("Ignoring unrecognised scoring key: {}", key),
                },
            }
        }

        ScoringConfig::try_from(s)
    }

    /// Parse a standalone TOML scoring table
    pub fn from_toml_str(source: &str) -> Result<Self> {
        let settings: ScoringSettings = toml::from_str(source)?;
        ScoringConfig::try_from(settings)
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct LoggingSettings {
    #[serde(default = "default_log_level")]
    pub level: String,
    #[serde(default = "default_log_format")]
    pub format: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

fn default_log_level() -> String { "info".to_string() }
fn default_log_format() -> String { "json".to_string() }

impl Settings {
    /// Load configuration from file and environment variables
    ///
    /// Configuration is loaded in the following order (later overrides earlier):
    /// 1. Default values in the struct
    /// 2. Configuration file (config/default.toml)
    /// 3. Local overrides (config/local.toml)
    /// 4. Environment variables (prefixed with SESSION_MATCH)
    pub fn load() -> std::result::Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name("config/local").required(false))
            // e.g., SESSION_MATCH__SCORING__AVOID_PENALTY -> scoring.avoid_penalty
            .add_source(
                Environment::with_prefix("SESSION_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Load configuration from a custom path
    pub fn load_from<P: AsRef<Path>>(path: P) -> std::result::Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(
                Environment::with_prefix("SESSION_MATCH")
                    .prefix_separator("__")
                    .separator("__")
                    .try_parsing(true),
            )
            .build()?;

        settings.try_deserialize()
    }

    /// Validated engine configuration from the `scoring` section
    pub fn scoring_config(&self) -> Result<ScoringConfig> {
        ScoringConfig::try_from(self.scoring.clone())
    }
}
