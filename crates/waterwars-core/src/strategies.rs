//! Strategy selection.
//!
//! The configuration names one implementation per role. [`Strategies`]
//! builds them, hands each its settings through `update_configuration`,
//! and checks that the combination can work. Any configuration problem
//! therefore surfaces here, before the first round starts.

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::info;

use waterwars_economy::{EconomicGenerator, EconomySettings, SeriesEconomy};
use waterwars_types::ConfigError;
use waterwars_water::{
    FairDistributor, ParcelOrientedAllocator, RainfallGenerator, RandomBelowIdealRainfall,
    SeriesRainfall, SimpleFairPerParcelDistributor, SimplePlayerOnlyDistributor,
    TieredDistributor, UtopianRainfall, WaterAllocator, WaterDistributor, WaterSettings,
};

use crate::config::StrategyConfig;

/// Available rainfall generators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RainfallKind {
    /// Fixed water per parcel.
    #[default]
    Utopian,
    /// Total entitlement scaled by a per-round ratio.
    Series,
    /// Random shortfall below an ideal amount.
    RandomBelowIdeal,
}

/// Available water distributors.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DistributorKind {
    /// Proportional to entitlement, rounded up.
    #[default]
    Fair,
    /// Proportional to owned parcel rights, rounded down.
    SimpleFairPerParcel,
    /// North to south in bands of parcels.
    Tiered,
    /// Player balances only, parcels untouched.
    SimplePlayerOnly,
}

/// Available water allocators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AllocatorKind {
    /// Draws from and returns to the player's parcels.
    #[default]
    ParcelOriented,
}

/// Available economic activity generators.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EconomyKind {
    /// Configured per-round series.
    #[default]
    Series,
}

/// The configured strategy for every role.
pub struct Strategies {
    /// Produces each round's total rainfall.
    pub rainfall: Box<dyn RainfallGenerator>,
    /// Divides rainfall among players and parcels.
    pub distributor: Box<dyn WaterDistributor>,
    /// Moves water between parcels and assets. Shared with request handlers.
    pub allocator: Arc<dyn WaterAllocator>,
    /// Produces each round's revenue multipliers.
    pub economy: Box<dyn EconomicGenerator>,
}

impl core::fmt::Debug for Strategies {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("Strategies")
            .field("rainfall", &self.rainfall.name())
            .field("distributor", &self.distributor.name())
            .field("allocator", &self.allocator.name())
            .field("economy", &self.economy.name())
            .finish()
    }
}

impl Strategies {
    /// Build and configure the strategies named in `kinds`.
    ///
    /// `seed` feeds the random rainfall generator.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a strategy is missing a key it needs, a
    /// value is malformed, or the distributor cannot feed the allocator.
    pub fn from_config(
        kinds: StrategyConfig,
        water: &WaterSettings,
        economy: &EconomySettings,
        seed: u64,
    ) -> Result<Self, ConfigError> {
        let mut rainfall: Box<dyn RainfallGenerator> = match kinds.rainfall {
            RainfallKind::Utopian => Box::new(UtopianRainfall::new()),
            RainfallKind::Series => Box::new(SeriesRainfall::new()),
            RainfallKind::RandomBelowIdeal => Box::new(RandomBelowIdealRainfall::from_seed(seed)),
        };
        let mut distributor: Box<dyn WaterDistributor> = match kinds.distributor {
            DistributorKind::Fair => Box::new(FairDistributor),
            DistributorKind::SimpleFairPerParcel => Box::new(SimpleFairPerParcelDistributor),
            DistributorKind::Tiered => Box::new(TieredDistributor::new()),
            DistributorKind::SimplePlayerOnly => Box::new(SimplePlayerOnlyDistributor),
        };
        let allocator: Arc<dyn WaterAllocator> = match kinds.allocator {
            AllocatorKind::ParcelOriented => Arc::new(ParcelOrientedAllocator),
        };
        let mut economy_generator: Box<dyn EconomicGenerator> = match kinds.economy {
            EconomyKind::Series => Box::new(SeriesEconomy::new()),
        };

        rainfall.update_configuration(water)?;
        distributor.update_configuration(water)?;
        economy_generator.update_configuration(economy)?;

        let strategies = Self {
            rainfall,
            distributor,
            allocator,
            economy: economy_generator,
        };
        strategies.check_compatible()?;

        info!(
            rainfall = strategies.rainfall.name(),
            distributor = strategies.distributor.name(),
            allocator = strategies.allocator.name(),
            economy = strategies.economy.name(),
            "Strategies configured"
        );
        Ok(strategies)
    }

    /// Reject combinations where the allocator would never find water.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] for a distributor that leaves
    /// parcels dry.
    pub fn check_compatible(&self) -> Result<(), ConfigError> {
        if self.distributor.writes_parcels() {
            return Ok(());
        }
        Err(ConfigError::InvalidValue {
            key: "strategies.distributor".to_owned(),
            reason: format!(
                "{} puts no water on parcels, so the {} allocator has nothing to draw from",
                self.distributor.name(),
                self.allocator.name()
            ),
        })
    }
}
