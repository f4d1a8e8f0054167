//! Shared type definitions for the WaterWars resource engine.
//!
//! This crate is the single source of truth for the entities the engine
//! operates on. Every other crate in the workspace depends on it.
//!
//! # Modules
//!
//! - [`ids`] -- Type-safe UUID wrappers for players, parcels, and assets
//! - [`enums`] -- Asset types, round phases, ledger classifications
//! - [`structs`] -- Player, parcel, asset, ledger entry, and round context structs
//! - [`config`] -- Configuration errors and per-round ratio series

pub mod config;
pub mod enums;
pub mod ids;
pub mod structs;

// Re-export all public types at crate root for convenience.
pub use config::{ConfigError, RatioSeries};
pub use enums::{AssetType, EntityType, LedgerEntryType, RoundPhase};
pub use ids::{AssetId, LedgerEntryId, ParcelId, PlayerId};
pub use structs::{GameAsset, LedgerEntry, Parcel, Player, Position, RoundContext};
