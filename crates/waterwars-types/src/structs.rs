//! Core entity structs for the WaterWars engine.
//!
//! Players, parcels, and assets are plain data. Ownership links between them
//! are stored as IDs; the authoritative collections live in the game state
//! aggregate in `waterwars-water`.

use std::collections::{BTreeMap, BTreeSet};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::enums::{AssetType, EntityType, LedgerEntryType};
use crate::ids::{AssetId, LedgerEntryId, ParcelId, PlayerId};

// ---------------------------------------------------------------------------
// Position
// ---------------------------------------------------------------------------

/// Position of a parcel on the game map.
///
/// Higher `y` is further north. Only the tiered distributor looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Position {
    /// East-west coordinate.
    pub x: i64,
    /// North-south coordinate (higher is more northerly).
    pub y: i64,
}

// ---------------------------------------------------------------------------
// Player
// ---------------------------------------------------------------------------

/// A player competing for water.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Player {
    /// Unique player identifier.
    pub id: PlayerId,
    /// Display name.
    pub name: String,
    /// Total water rights owned. Changes only through rights trades.
    pub water_entitlement: u64,
    /// Spendable water this round.
    pub water: u64,
    /// Parcels whose water rights this player owns.
    pub water_rights_owned: BTreeSet<ParcelId>,
    /// Accumulated revenue.
    pub money: Decimal,
}

impl Player {
    /// Create a player with no rights, no water, and no money.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: PlayerId::new(),
            name: name.into(),
            water_entitlement: 0,
            water: 0,
            water_rights_owned: BTreeSet::new(),
            money: Decimal::ZERO,
        }
    }

    /// Whether the player owns the water rights of at least one parcel.
    pub fn owns_any_water_rights(&self) -> bool {
        !self.water_rights_owned.is_empty()
    }
}

// ---------------------------------------------------------------------------
// Parcel
// ---------------------------------------------------------------------------

/// A parcel of land (buy point) carrying water and development rights.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parcel {
    /// Unique parcel identifier.
    pub id: ParcelId,
    /// Display name.
    pub name: String,
    /// Zone name, used to look up per-zone entitlement overrides.
    pub zone: String,
    /// Map position.
    pub position: Position,
    /// Water entitlement fixed when the parcel was created.
    pub initial_water_rights: u64,
    /// Water currently sitting on the parcel.
    pub water_available: u64,
    /// Owner of the water rights, if any.
    pub water_rights_owner: Option<PlayerId>,
    /// Owner of the development rights, if any.
    pub development_rights_owner: Option<PlayerId>,
}

impl Parcel {
    /// Create an unowned parcel with no water on it.
    pub fn new(
        name: impl Into<String>,
        zone: impl Into<String>,
        position: Position,
        initial_water_rights: u64,
    ) -> Self {
        Self {
            id: ParcelId::new(),
            name: name.into(),
            zone: zone.into(),
            position,
            initial_water_rights,
            water_available: 0,
            water_rights_owner: None,
            development_rights_owner: None,
        }
    }

    /// Whether some player owns this parcel's water rights.
    pub const fn has_water_rights_owner(&self) -> bool {
        self.water_rights_owner.is_some()
    }
}

// ---------------------------------------------------------------------------
// GameAsset
// ---------------------------------------------------------------------------

/// A water-consuming asset built on a parcel.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct GameAsset {
    /// Unique asset identifier.
    pub id: AssetId,
    /// Display name.
    pub name: String,
    /// Asset category.
    pub asset_type: AssetType,
    /// Current level, starting at 1.
    pub level: usize,
    /// Parcel the asset stands on.
    pub parcel_id: ParcelId,
    /// Player who built the asset.
    pub owner: PlayerId,
    /// Water required at the current level.
    pub water_usage: u64,
    /// Water currently committed to the asset.
    pub water_allocated: u64,
    /// Whether any amount in `0..=water_usage` may be allocated. When false
    /// only `0` and `water_usage` are accepted.
    pub can_partially_allocate_water: bool,
    /// Revenue at a multiplier of 1.0 when fully watered.
    pub nominal_revenue: Decimal,
}

impl GameAsset {
    /// Whether the asset has all the water it needs.
    pub const fn is_fully_watered(&self) -> bool {
        self.water_allocated >= self.water_usage
    }
}

// ---------------------------------------------------------------------------
// LedgerEntry
// ---------------------------------------------------------------------------

/// A single recorded water movement.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// Unique entry identifier.
    pub id: LedgerEntryId,
    /// Round in which the movement happened.
    pub round: u64,
    /// Category of movement.
    pub entry_type: LedgerEntryType,
    /// Source entity (`None` for world-sourced rainfall).
    pub from_entity: Option<Uuid>,
    /// Type of the source entity.
    pub from_entity_type: Option<EntityType>,
    /// Destination entity (`None` for the void).
    pub to_entity: Option<Uuid>,
    /// Type of the destination entity.
    pub to_entity_type: Option<EntityType>,
    /// Water units moved. Always positive.
    pub quantity: u64,
    /// Short reason code, e.g. `"ALLOCATE"`.
    pub reason: String,
    /// Related entity, such as the player on whose behalf water moved.
    pub reference_id: Option<Uuid>,
    /// Real-world timestamp.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// RoundContext
// ---------------------------------------------------------------------------

/// Read-only view of the game handed to generators once per round.
#[derive(Debug, Clone, Copy)]
pub struct RoundContext<'a> {
    /// The round being generated, starting at 1.
    pub round: u64,
    /// Every player in the game.
    pub players: &'a BTreeMap<PlayerId, Player>,
    /// Every parcel in the game, owned or not.
    pub parcels: &'a BTreeMap<ParcelId, Parcel>,
}

impl RoundContext<'_> {
    /// Number of parcels in the game.
    pub fn parcel_count(&self) -> u64 {
        u64::try_from(self.parcels.len()).unwrap_or(u64::MAX)
    }

    /// Total entitlement the game owes this round: every player's water
    /// entitlement plus the initial rights of parcels nobody owns.
    ///
    /// Returns `None` on overflow.
    pub fn total_entitlement(&self) -> Option<u64> {
        let owned = self
            .players
            .values()
            .try_fold(0_u64, |acc, p| acc.checked_add(p.water_entitlement))?;
        self.parcels
            .values()
            .filter(|parcel| !parcel.has_water_rights_owner())
            .try_fold(owned, |acc, parcel| acc.checked_add(parcel.initial_water_rights))
    }
}
