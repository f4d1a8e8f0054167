//! Water generation, distribution, and allocation for the WaterWars engine.
//!
//! Each round, a [`RainfallGenerator`] decides how much water exists, a
//! [`WaterDistributor`] divides it among players and parcels, and a
//! [`WaterAllocator`] moves it between parcels and the assets that consume
//! it as players ask. All three are strategies chosen when the game is
//! configured.
//!
//! # Modules
//!
//! - [`state`] -- The [`GameState`] aggregate and round balance lifecycle
//! - [`rainfall`] -- Utopian, series, and random below-ideal generators
//! - [`distribution`] -- Fair, per-parcel, tiered, and player-only
//!   distributors
//! - [`allocation`] -- The parcel-oriented allocator
//! - [`rights`] -- Water and development rights transfers
//! - [`shared`] -- [`SharedGame`], the lock-guarded handle used across threads
//! - [`notify`] -- Change notification sinks
//! - [`config`] -- Water settings and zone entitlements
//! - [`error`] -- Error types
//!
//! # Conservation
//!
//! Water enters the game only through distribution (recorded as rainfall)
//! and leaves only when returned water has nowhere to go, when unused
//! parcel water evaporates, or when assets consume it at the end of a
//! round. Every movement is recorded in the game's water ledger.

pub mod allocation;
pub mod config;
pub mod distribution;
pub mod error;
pub mod notify;
pub mod rainfall;
pub mod rights;
pub mod shared;
pub mod state;

// Re-export primary types at crate root.
pub use allocation::{
    AllocationChange, ParcelOrientedAllocator, WaterAllocator, requested_amount,
};
pub use config::{ParcelEntitlementConfig, WaterSettings};
pub use distribution::{
    FairDistributor, SimpleFairPerParcelDistributor, SimplePlayerOnlyDistributor, TIER_RANGE,
    TieredDistributor, WaterDistributor,
};
pub use error::{AllocationError, DistributionError, GameError, GenerationError};
pub use notify::{Change, ChangeSink, NoOpSink, RecordingSink, TracingSink};
pub use rainfall::{
    RainfallGenerator, RandomBelowIdealRainfall, SeriesRainfall, UtopianRainfall,
};
pub use rights::{transfer_development_rights, transfer_water_rights};
pub use shared::SharedGame;
pub use state::{AssetBlueprint, DistributionOutcome, GameState, ResetOutcome};
