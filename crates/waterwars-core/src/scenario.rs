//! Building the starting game from a [`ScenarioConfig`].
//!
//! Players are created first, then parcels (whose initial rights come from
//! the zone entitlement unless the parcel overrides them), then assets.
//! Names are resolved to ids as they go and returned in a [`Roster`] so
//! callers can keep addressing entities by name.

use std::collections::BTreeMap;

use tracing::info;

use waterwars_types::{AssetId, ConfigError, Parcel, ParcelId, Player, PlayerId, Position};
use waterwars_water::{AssetBlueprint, GameError, GameState, ParcelEntitlementConfig, WaterSettings};

use crate::config::ScenarioConfig;

/// Errors raised while building the starting game.
#[derive(Debug, thiserror::Error)]
pub enum ScenarioError {
    /// The zone entitlement settings are unusable.
    #[error("entitlement configuration: {0}")]
    Config(#[from] ConfigError),

    /// A name appears twice.
    #[error("duplicate {kind} name: {name}")]
    DuplicateName {
        /// What kind of entity the name belongs to.
        kind: &'static str,
        /// The repeated name.
        name: String,
    },

    /// A name does not refer to anything declared earlier.
    #[error("unknown {kind}: {name}")]
    UnknownName {
        /// What kind of entity was expected.
        kind: &'static str,
        /// The unresolved name.
        name: String,
    },

    /// The game rejected an entity.
    #[error(transparent)]
    Game(#[from] GameError),
}

/// Name-to-id lookup for everything created from a scenario.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Roster {
    /// Players by name.
    pub players: BTreeMap<String, PlayerId>,
    /// Parcels by name.
    pub parcels: BTreeMap<String, ParcelId>,
    /// Assets by name.
    pub assets: BTreeMap<String, AssetId>,
}

impl Roster {
    fn player(&self, name: &str) -> Result<PlayerId, ScenarioError> {
        self.players
            .get(name)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownName {
                kind: "player",
                name: name.to_owned(),
            })
    }

    fn optional_player(&self, name: Option<&str>) -> Result<Option<PlayerId>, ScenarioError> {
        name.map(|n| self.player(n)).transpose()
    }
}

/// Create a game holding everything `scenario` declares.
///
/// # Errors
///
/// Returns [`ScenarioError`] if a name is repeated or unknown, the zone
/// entitlement is missing for a parcel that needs it, or the game rejects
/// an entity (for example an asset on a parcel its owner cannot develop).
pub fn seed_game(
    scenario: &ScenarioConfig,
    water: &WaterSettings,
) -> Result<(GameState, Roster), ScenarioError> {
    let mut state = GameState::new();
    let mut roster = Roster::default();

    for name in &scenario.players {
        if roster.players.contains_key(name) {
            return Err(duplicate("player", name));
        }
        let id = state.add_player(Player::new(name.clone()))?;
        roster.players.insert(name.clone(), id);
    }

    // Only needed when some parcel relies on its zone for initial rights.
    let entitlements = if scenario.parcels.iter().any(|p| p.water_rights.is_none()) {
        Some(ParcelEntitlementConfig::from_settings(water)?)
    } else {
        None
    };

    for entry in &scenario.parcels {
        if roster.parcels.contains_key(&entry.name) {
            return Err(duplicate("parcel", &entry.name));
        }
        let rights = entry
            .water_rights
            .or_else(|| entitlements.as_ref().map(|e| e.for_zone(&entry.zone)))
            .unwrap_or(0);
        let mut parcel = Parcel::new(
            entry.name.clone(),
            entry.zone.clone(),
            Position {
                x: entry.x,
                y: entry.y,
            },
            rights,
        );
        parcel.water_rights_owner = roster.optional_player(entry.water_rights_owner.as_deref())?;
        parcel.development_rights_owner =
            roster.optional_player(entry.development_rights_owner.as_deref())?;
        let id = state.add_parcel(parcel)?;
        roster.parcels.insert(entry.name.clone(), id);
    }

    for entry in &scenario.assets {
        if roster.assets.contains_key(&entry.name) {
            return Err(duplicate("asset", &entry.name));
        }
        let owner = roster.player(&entry.owner)?;
        let parcel = roster
            .parcels
            .get(&entry.parcel)
            .copied()
            .ok_or_else(|| ScenarioError::UnknownName {
                kind: "parcel",
                name: entry.parcel.clone(),
            })?;
        let blueprint = AssetBlueprint {
            name: entry.name.clone(),
            asset_type: entry.asset_type,
            level: entry.level,
            water_usage: entry.water_usage,
            can_partially_allocate_water: entry.can_partially_allocate_water,
            nominal_revenue: entry.nominal_revenue,
        };
        let id = state.build_asset(owner, parcel, blueprint)?;
        roster.assets.insert(entry.name.clone(), id);
    }

    info!(
        players = roster.players.len(),
        parcels = roster.parcels.len(),
        assets = roster.assets.len(),
        "Scenario seeded"
    );
    Ok((state, roster))
}

fn duplicate(kind: &'static str, name: &str) -> ScenarioError {
    ScenarioError::DuplicateName {
        kind,
        name: name.to_owned(),
    }
}
