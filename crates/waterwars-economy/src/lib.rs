//! Economic activity and revenue for the WaterWars engine.
//!
//! An [`EconomicGenerator`] produces a revenue multiplier for every asset
//! type and level each round. Revenue for a watered asset is its nominal
//! revenue scaled by that multiplier.
//!
//! # Modules
//!
//! - [`activity`] -- [`Multipliers`], the generator trait, and the series
//!   generator
//! - [`revenue`] -- Per-asset and per-player revenue

pub mod activity;
pub mod revenue;

pub use activity::{EconomicGenerator, EconomySettings, Multipliers, SeriesEconomy};
pub use revenue::{asset_revenue, revenue_by_player};

use waterwars_types::ConfigError;

/// Errors raised by economic calculations.
#[derive(Debug, thiserror::Error)]
pub enum EconomyError {
    /// The generator's configuration is unusable.
    #[error("configuration error: {0}")]
    Config(#[from] ConfigError),

    /// A revenue figure overflowed.
    #[error("arithmetic overflow in revenue calculation")]
    ArithmeticOverflow,
}
