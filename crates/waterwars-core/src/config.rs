//! Configuration loading and typed config structures for a WaterWars game.
//!
//! A game is described by one YAML file, `waterwars-config.yaml` by
//! default. It names the game and its seed, picks the water and economy
//! strategies, carries the settings those strategies read, and lists the
//! starting players, parcels, and assets.
//!
//! Loading only checks that the YAML matches these structs. Whether the
//! chosen strategies find the keys they need is checked when the
//! strategies are built (see [`crate::strategies`]).

use std::path::Path;

use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::warn;

use waterwars_economy::EconomySettings;
use waterwars_types::AssetType;
use waterwars_water::WaterSettings;

use crate::strategies::{AllocatorKind, DistributorKind, EconomyKind, RainfallKind};

/// Environment variable overriding `game.seed`.
pub const SEED_ENV_VAR: &str = "WATERWARS_SEED";

/// Errors that can occur when loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file from disk.
    #[error("failed to read config file: {source}")]
    Io {
        /// The underlying I/O error.
        #[from]
        source: std::io::Error,
    },

    /// Failed to parse YAML content.
    #[error("failed to parse config YAML: {source}")]
    Yaml {
        /// The underlying YAML parse error.
        source: serde_yml::Error,
    },
}

impl From<serde_yml::Error> for ConfigError {
    fn from(source: serde_yml::Error) -> Self {
        Self::Yaml { source }
    }
}

/// Top-level game configuration.
///
/// Mirrors the structure of `waterwars-config.yaml`. Every section has
/// defaults, so an empty file is a valid (if empty) game.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct GameConfig {
    /// Name, seed, and length of the game.
    #[serde(default)]
    pub game: GameSection,

    /// Which strategy implementation fills each role.
    #[serde(default)]
    pub strategies: StrategyConfig,

    /// Keys read by the rainfall generators and distributors.
    #[serde(default)]
    pub water: WaterSettings,

    /// Per-round economic activity series.
    #[serde(default)]
    pub economy: EconomySettings,

    /// Starting players, parcels, and assets.
    #[serde(default)]
    pub scenario: ScenarioConfig,
}

impl GameConfig {
    /// Load configuration from a YAML file.
    ///
    /// After parsing, [`SEED_ENV_VAR`] overrides `game.seed` when it is set
    /// to a valid integer.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Io`] if the file cannot be read, or
    /// [`ConfigError::Yaml`] if the content is not valid YAML.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let contents = std::fs::read_to_string(path)?;
        Self::parse(&contents)
    }

    /// Parse configuration from a YAML string.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Yaml`] if the string is not valid YAML.
    pub fn parse(yaml: &str) -> Result<Self, ConfigError> {
        let mut config: Self = serde_yml::from_str(yaml)?;
        config.game.apply_env_overrides();
        Ok(config)
    }
}

// ---------------------------------------------------------------------------
// Game section
// ---------------------------------------------------------------------------

/// Game-level settings.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct GameSection {
    /// Human-readable game name.
    #[serde(default = "default_game_name")]
    pub name: String,

    /// Seed for every random strategy.
    #[serde(default = "default_seed")]
    pub seed: u64,

    /// Number of rounds to play.
    #[serde(default = "default_max_rounds")]
    pub max_rounds: u64,
}

impl GameSection {
    /// Override settings with environment variables when set.
    ///
    /// - `WATERWARS_SEED` overrides `seed`
    pub fn apply_env_overrides(&mut self) {
        self.override_seed(std::env::var(SEED_ENV_VAR).ok().as_deref());
    }

    /// Replace the seed with `value` if it parses. Unparseable values are
    /// logged and ignored.
    pub fn override_seed(&mut self, value: Option<&str>) {
        let Some(raw) = value else {
            return;
        };
        match raw.trim().parse::<u64>() {
            Ok(seed) => self.seed = seed,
            Err(e) => warn!(value = raw, error = %e, "Ignoring invalid {SEED_ENV_VAR}"),
        }
    }
}

impl Default for GameSection {
    fn default() -> Self {
        Self {
            name: default_game_name(),
            seed: default_seed(),
            max_rounds: default_max_rounds(),
        }
    }
}

// ---------------------------------------------------------------------------
// Strategy selection
// ---------------------------------------------------------------------------

/// The strategy chosen for each role.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
pub struct StrategyConfig {
    /// Rainfall generator.
    #[serde(default)]
    pub rainfall: RainfallKind,

    /// Water distributor.
    #[serde(default)]
    pub distributor: DistributorKind,

    /// Water allocator.
    #[serde(default)]
    pub allocator: AllocatorKind,

    /// Economic activity generator.
    #[serde(default)]
    pub economy: EconomyKind,
}

// ---------------------------------------------------------------------------
// Scenario
// ---------------------------------------------------------------------------

/// The starting board. Players are referred to by name throughout.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct ScenarioConfig {
    /// Player names.
    #[serde(default)]
    pub players: Vec<String>,

    /// Parcels on the map.
    #[serde(default)]
    pub parcels: Vec<ParcelSpec>,

    /// Assets already built when the game starts.
    #[serde(default)]
    pub assets: Vec<AssetSpec>,
}

/// One parcel of the starting board.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ParcelSpec {
    /// Parcel name, unique within the scenario.
    pub name: String,

    /// Zone used to look up the parcel's initial rights.
    #[serde(default = "default_zone")]
    pub zone: String,

    /// East-west coordinate.
    #[serde(default)]
    pub x: i64,

    /// North-south coordinate (higher is further north).
    #[serde(default)]
    pub y: i64,

    /// Explicit initial rights, overriding the zone entitlement.
    #[serde(default)]
    pub water_rights: Option<u64>,

    /// Name of the player owning the water rights.
    #[serde(default)]
    pub water_rights_owner: Option<String>,

    /// Name of the player owning the development rights.
    #[serde(default)]
    pub development_rights_owner: Option<String>,
}

/// One asset of the starting board.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct AssetSpec {
    /// Display name.
    pub name: String,

    /// Name of the parcel the asset stands on.
    pub parcel: String,

    /// Name of the building player.
    pub owner: String,

    /// Asset category.
    pub asset_type: AssetType,

    /// Starting level.
    #[serde(default = "default_level")]
    pub level: usize,

    /// Water needed per round.
    pub water_usage: u64,

    /// Whether partial allocations are accepted.
    #[serde(default)]
    pub can_partially_allocate_water: bool,

    /// Revenue at a multiplier of 1.0.
    pub nominal_revenue: Decimal,
}

// ---------------------------------------------------------------------------
// Default value functions
// ---------------------------------------------------------------------------

fn default_game_name() -> String {
    "WaterWars".to_owned()
}

const fn default_seed() -> u64 {
    42
}

const fn default_max_rounds() -> u64 {
    10
}

fn default_zone() -> String {
    "default".to_owned()
}

const fn default_level() -> usize {
    1
}
