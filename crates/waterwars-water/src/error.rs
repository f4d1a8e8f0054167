//! Error types for the `waterwars-water` crate.
//!
//! Each stage of a round has its own error: generation, distribution, and
//! allocation. [`GameError`] covers operations on the game state itself and
//! is wrapped by the others where they touch it.

use waterwars_ledger::LedgerError;
use waterwars_types::{AssetId, AssetType, ConfigError, ParcelId, PlayerId};

/// Errors raised by game-state operations outside a single strategy.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// A player with this id is already registered.
    #[error("duplicate player id: {0}")]
    DuplicatePlayer(PlayerId),

    /// A parcel with this id is already registered.
    #[error("duplicate parcel id: {0}")]
    DuplicateParcel(ParcelId),

    /// The player does not exist.
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// The parcel does not exist.
    #[error("parcel not found: {0}")]
    ParcelNotFound(ParcelId),

    /// The asset does not exist.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// Building requires the development rights of the parcel.
    #[error("player {player} does not own the development rights of parcel {parcel}")]
    NotDevelopmentOwner {
        /// The player attempting to build.
        player: PlayerId,
        /// The parcel being built on.
        parcel: ParcelId,
    },

    /// The requested asset level is outside `1..=max_level`.
    #[error("{asset_type:?} has no level {level}")]
    InvalidLevel {
        /// The asset type.
        asset_type: AssetType,
        /// The requested level.
        level: usize,
    },

    /// A balance would overflow or go below zero.
    #[error("arithmetic overflow in game state calculation")]
    ArithmeticOverflow,

    /// A ledger entry could not be recorded.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// Another thread panicked while holding the game lock.
    #[error("game state lock poisoned")]
    LockPoisoned,
}

/// Errors raised while generating the round's rainfall.
#[derive(Debug, thiserror::Error)]
pub enum GenerationError {
    /// The generator is missing configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// The computed total does not fit in a water quantity.
    #[error("rainfall total overflowed for round {round}")]
    Overflow {
        /// The round being generated.
        round: u64,
    },
}

/// Errors raised while distributing rainfall among players and parcels.
#[derive(Debug, thiserror::Error)]
pub enum DistributionError {
    /// The distributor is missing configuration.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A share or running total overflowed.
    #[error("arithmetic overflow in {0} distribution")]
    ArithmeticOverflow(&'static str),

    /// Applying the distribution to the game failed.
    #[error(transparent)]
    Game(#[from] GameError),
}

impl From<LedgerError> for DistributionError {
    fn from(err: LedgerError) -> Self {
        Self::Game(GameError::Ledger(err))
    }
}

/// Game-logic errors raised by an allocation change.
///
/// Every variant is raised before any state is touched, so a failed change
/// leaves the game exactly as it was.
#[derive(Debug, thiserror::Error)]
pub enum AllocationError {
    /// The player does not exist.
    #[error("player not found: {0}")]
    PlayerNotFound(PlayerId),

    /// The asset does not exist.
    #[error("asset not found: {0}")]
    AssetNotFound(AssetId),

    /// The asset belongs to another player.
    #[error("player {player} does not own asset {asset}")]
    NotAssetOwner {
        /// The requesting player.
        player: PlayerId,
        /// The asset.
        asset: AssetId,
    },

    /// A negative allocation was requested.
    #[error("allocation must not be negative (requested {0})")]
    NegativeAmount(i64),

    /// The request exceeds what the asset can use.
    #[error("asset {asset} uses at most {usage} units, requested {requested}")]
    AboveUsage {
        /// The asset.
        asset: AssetId,
        /// The requested allocation.
        requested: u64,
        /// The asset's water usage.
        usage: u64,
    },

    /// The asset only accepts zero or its full usage.
    #[error("asset {asset} is all-or-nothing: requested {requested}, usage {usage}")]
    PartialNotAllowed {
        /// The asset.
        asset: AssetId,
        /// The requested allocation.
        requested: u64,
        /// The asset's water usage.
        usage: u64,
    },

    /// The player does not have enough spendable water for the increase.
    #[error("player {player} needs {required} water but has {available}")]
    InsufficientWater {
        /// The player.
        player: PlayerId,
        /// Water needed for the increase.
        required: u64,
        /// The player's spendable water.
        available: u64,
    },

    /// The player's parcels do not hold enough water for the increase.
    #[error("parcels of player {player} are short {shortfall} units")]
    ParcelsExhausted {
        /// The player.
        player: PlayerId,
        /// Water that could not be found.
        shortfall: u64,
    },

    /// A returned amount would overflow a parcel or player balance.
    #[error("arithmetic overflow in allocation")]
    ArithmeticOverflow,

    /// A ledger entry for the change could not be built.
    #[error("ledger error: {0}")]
    Ledger(#[from] LedgerError),

    /// The shared game could not be accessed.
    #[error(transparent)]
    Game(#[from] GameError),
}
