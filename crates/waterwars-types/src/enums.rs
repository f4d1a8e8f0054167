//! Enumeration types for the WaterWars engine.
//!
//! Asset categories, round phases, and the ledger classification enums
//! used by `waterwars-ledger`.

use serde::{Deserialize, Serialize};

// ---------------------------------------------------------------------------
// Asset types
// ---------------------------------------------------------------------------

/// The category of a revenue-generating game asset.
///
/// Every type has levels `1..=max_level()`. Level 0 is never a valid asset
/// level; tables indexed by level keep slot 0 unused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AssetType {
    /// Fields of crops. Cheap, thirsty, short-lived revenue.
    Crops,
    /// Residential housing. Sold once built, needs water while being built.
    Houses,
    /// Industrial factory. High water usage, high revenue.
    Factory,
}

impl AssetType {
    /// All asset types, in a stable order.
    pub const ALL: [Self; 3] = [Self::Crops, Self::Houses, Self::Factory];

    /// Highest level an asset of this type can reach.
    pub const fn max_level(self) -> usize {
        match self {
            Self::Crops | Self::Houses | Self::Factory => 3,
        }
    }
}

// ---------------------------------------------------------------------------
// Round phases
// ---------------------------------------------------------------------------

/// The phase of a game round.
///
/// Rounds cycle `Build -> Allocation -> Revenue -> Build`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum RoundPhase {
    /// Players buy parcels and build assets. Water balances are zero.
    Build,
    /// Rainfall has been distributed; players commit water to assets.
    Allocation,
    /// Watered assets produce revenue.
    Revenue,
}

// ---------------------------------------------------------------------------
// Ledger classification
// ---------------------------------------------------------------------------

/// Classification of a water movement recorded in the ledger.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum LedgerEntryType {
    /// Distributed rainfall lands on a parcel (world -> parcel).
    Rainfall,
    /// Parcel water committed to an asset (parcel -> asset).
    Allocate,
    /// Asset water returned to a parcel (asset -> parcel).
    GiveBack,
    /// Returned water with nowhere to go (asset -> void).
    Forfeit,
    /// Unused parcel water lost at the end of a round (parcel -> void).
    Evaporate,
    /// Water used up by an asset at the end of a round (asset -> void).
    Consume,
}

/// The type of entity participating in a ledger movement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum EntityType {
    /// The world (source of rainfall).
    World,
    /// A parcel holding distributed water.
    Parcel,
    /// A water-consuming asset.
    Asset,
    /// The void (destination for lost or consumed water).
    Void,
}
