//! Rainfall generators: how much water exists in a round.
//!
//! | Generator | Total |
//! |-----------|-------|
//! | [`UtopianRainfall`] | `parcels * water_per_parcel` |
//! | [`SeriesRainfall`] | `ceil(total_entitlement * ratio[round])` |
//! | [`RandomBelowIdealRainfall`] | `ideal - uniform(0..=(parcels / 4) * ideal_per_parcel)` |
//!
//! Generators read their keys in
//! [`update_configuration`](RainfallGenerator::update_configuration) and
//! fail there when a key is missing. Calling `generate` on an unconfigured
//! generator is a configuration error too.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rust_decimal::Decimal;
use rust_decimal::prelude::ToPrimitive;
use tracing::debug;

use waterwars_types::{ConfigError, RatioSeries, RoundContext};

use crate::config::{IDEAL_WATER_PER_PARCEL, WATER_PER_PARCEL, WaterSettings};
use crate::error::GenerationError;

/// Strategy producing the round's total rainfall.
pub trait RainfallGenerator: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Read the keys this generator needs.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required key is missing or malformed.
    fn update_configuration(&mut self, settings: &WaterSettings) -> Result<(), ConfigError>;

    /// Total water units available in `ctx.round`.
    ///
    /// # Errors
    ///
    /// Returns [`GenerationError`] if the generator is unconfigured or the
    /// total does not fit in a `u64`.
    fn generate(&mut self, ctx: &RoundContext<'_>) -> Result<u64, GenerationError>;
}

// ---------------------------------------------------------------------------
// Utopian
// ---------------------------------------------------------------------------

/// Every parcel gets a fixed amount, every round.
#[derive(Debug, Default, Clone)]
pub struct UtopianRainfall {
    water_per_parcel: Option<u64>,
}

impl UtopianRainfall {
    /// Create an unconfigured generator.
    pub const fn new() -> Self {
        Self {
            water_per_parcel: None,
        }
    }
}

impl RainfallGenerator for UtopianRainfall {
    fn name(&self) -> &'static str {
        "utopian"
    }

    fn update_configuration(&mut self, settings: &WaterSettings) -> Result<(), ConfigError> {
        self.water_per_parcel = Some(WaterSettings::require(
            WATER_PER_PARCEL,
            settings.water_per_parcel,
        )?);
        Ok(())
    }

    fn generate(&mut self, ctx: &RoundContext<'_>) -> Result<u64, GenerationError> {
        let per_parcel = self
            .water_per_parcel
            .ok_or(ConfigError::NotConfigured("utopian rainfall"))?;
        ctx.parcel_count()
            .checked_mul(per_parcel)
            .ok_or(GenerationError::Overflow { round: ctx.round })
    }
}

// ---------------------------------------------------------------------------
// Series
// ---------------------------------------------------------------------------

/// Scales the game's total entitlement by a per-round ratio.
///
/// The total entitlement counts every player's rights plus the rights of
/// parcels nobody owns yet.
#[derive(Debug, Default, Clone)]
pub struct SeriesRainfall {
    deviations: Option<RatioSeries>,
}

impl SeriesRainfall {
    /// Create an unconfigured generator.
    pub const fn new() -> Self {
        Self { deviations: None }
    }
}

impl RainfallGenerator for SeriesRainfall {
    fn name(&self) -> &'static str {
        "series"
    }

    fn update_configuration(&mut self, settings: &WaterSettings) -> Result<(), ConfigError> {
        self.deviations = Some(settings.rainfall_series()?);
        Ok(())
    }

    fn generate(&mut self, ctx: &RoundContext<'_>) -> Result<u64, GenerationError> {
        let series = self
            .deviations
            .as_ref()
            .ok_or(ConfigError::NotConfigured("series rainfall"))?;
        let overflow = || GenerationError::Overflow { round: ctx.round };

        let total = ctx.total_entitlement().ok_or_else(overflow)?;
        let ratio = series.ratio_for_round(ctx.round);
        let water = Decimal::from(total)
            .checked_mul(ratio)
            .and_then(|scaled| scaled.ceil().to_u64())
            .ok_or_else(overflow)?;

        debug!(round = ctx.round, total, %ratio, water, "Series rainfall");
        Ok(water)
    }
}

// ---------------------------------------------------------------------------
// RandomBelowIdeal
// ---------------------------------------------------------------------------

/// Falls short of the ideal by a random amount of up to a quarter of the
/// parcels' worth of water.
#[derive(Debug, Clone)]
pub struct RandomBelowIdealRainfall<R: Rng = StdRng> {
    ideal_water_per_parcel: Option<u64>,
    rng: R,
}

impl RandomBelowIdealRainfall<StdRng> {
    /// Create an unconfigured generator with a seeded [`StdRng`].
    pub fn from_seed(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }
}

impl<R: Rng> RandomBelowIdealRainfall<R> {
    /// Create an unconfigured generator drawing from `rng`.
    pub const fn with_rng(rng: R) -> Self {
        Self {
            ideal_water_per_parcel: None,
            rng,
        }
    }

    /// The ideal total and the widest possible shortfall for `parcels`.
    fn bounds(per_parcel: u64, parcels: u64) -> Option<(u64, u64)> {
        let ideal = parcels.checked_mul(per_parcel)?;
        let range = parcels.checked_div(4)?.checked_mul(per_parcel)?;
        Some((ideal, range))
    }
}

impl<R: Rng + Send> RainfallGenerator for RandomBelowIdealRainfall<R> {
    fn name(&self) -> &'static str {
        "random_below_ideal"
    }

    fn update_configuration(&mut self, settings: &WaterSettings) -> Result<(), ConfigError> {
        self.ideal_water_per_parcel = Some(WaterSettings::require(
            IDEAL_WATER_PER_PARCEL,
            settings.ideal_water_per_parcel,
        )?);
        Ok(())
    }

    fn generate(&mut self, ctx: &RoundContext<'_>) -> Result<u64, GenerationError> {
        let per_parcel = self
            .ideal_water_per_parcel
            .ok_or(ConfigError::NotConfigured("random below-ideal rainfall"))?;
        let (ideal, range) = Self::bounds(per_parcel, ctx.parcel_count())
            .ok_or(GenerationError::Overflow { round: ctx.round })?;

        let shortfall = self.rng.random_range(0..=range);
        let water = ideal
            .checked_sub(shortfall)
            .ok_or(GenerationError::Overflow { round: ctx.round })?;

        debug!(round = ctx.round, ideal, shortfall, water, "Below-ideal rainfall");
        Ok(water)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use waterwars_types::{Parcel, ParcelId, Player, Position};

    use super::*;

    fn parcels(count: usize, rights: u64) -> BTreeMap<ParcelId, Parcel> {
        (0..count)
            .map(|i| {
                let parcel = Parcel::new(format!("lot-{i}"), "valley", Position::default(), rights);
                (parcel.id, parcel)
            })
            .collect()
    }

    #[test]
    fn utopian_is_parcels_times_rate() {
        let players = BTreeMap::new();
        let parcels = parcels(6, 0);
        let ctx = RoundContext {
            round: 9,
            players: &players,
            parcels: &parcels,
        };
        let mut generator = UtopianRainfall::new();
        let settings = WaterSettings {
            water_per_parcel: Some(250),
            ..WaterSettings::default()
        };
        assert!(generator.update_configuration(&settings).is_ok());
        assert_eq!(generator.generate(&ctx).ok(), Some(1500));
    }

    #[test]
    fn missing_key_fails_at_configuration() {
        let mut generator = UtopianRainfall::new();
        let result = generator.update_configuration(&WaterSettings::default());
        assert!(matches!(result, Err(ConfigError::MissingKey(WATER_PER_PARCEL))));

        let mut random = RandomBelowIdealRainfall::from_seed(1);
        let result = random.update_configuration(&WaterSettings::default());
        assert!(matches!(
            result,
            Err(ConfigError::MissingKey(IDEAL_WATER_PER_PARCEL))
        ));
    }

    #[test]
    fn unconfigured_generator_reports_config_error() {
        let players = BTreeMap::new();
        let parcels = parcels(1, 0);
        let ctx = RoundContext {
            round: 1,
            players: &players,
            parcels: &parcels,
        };
        let result = SeriesRainfall::new().generate(&ctx);
        assert!(matches!(
            result,
            Err(GenerationError::Config(ConfigError::NotConfigured(_)))
        ));
    }

    #[test]
    fn series_scales_total_entitlement_with_ceiling() {
        let mut player = Player::new("ada");
        player.water_entitlement = 1001;
        let mut players = BTreeMap::new();
        players.insert(player.id, player);
        // One unowned parcel adds its 999 rights; the owned one is counted
        // through the player's entitlement.
        let mut parcels = parcels(1, 999);
        let mut owned = Parcel::new("owned", "valley", Position::default(), 1001);
        owned.water_rights_owner = players.keys().next().copied();
        parcels.insert(owned.id, owned);

        let mut generator = SeriesRainfall::new();
        let settings = WaterSettings {
            rainfall_deviations: Some("0.5, 0.333".to_owned()),
            ..WaterSettings::default()
        };
        assert!(generator.update_configuration(&settings).is_ok());

        let at = |round| RoundContext {
            round,
            players: &players,
            parcels: &parcels,
        };
        assert_eq!(generator.generate(&at(1)).ok(), Some(1000));
        // 2000 * 0.333 = 666.0 exactly.
        assert_eq!(generator.generate(&at(2)).ok(), Some(666));
        // Past the end of the series the ratio is 1.0.
        assert_eq!(generator.generate(&at(3)).ok(), Some(2000));
    }

    #[test]
    fn series_rounds_up() {
        let mut players = BTreeMap::new();
        let mut player = Player::new("ada");
        player.water_entitlement = 3;
        players.insert(player.id, player);
        let parcels = BTreeMap::new();
        let mut generator = SeriesRainfall {
            deviations: Some(RatioSeries::from_ratios(vec![dec!(0.5)])),
        };
        let ctx = RoundContext {
            round: 1,
            players: &players,
            parcels: &parcels,
        };
        assert_eq!(generator.generate(&ctx).ok(), Some(2));
    }

    #[test]
    fn below_ideal_stays_within_bounds() {
        let players = BTreeMap::new();
        let parcels = parcels(8, 0);
        let ctx = RoundContext {
            round: 1,
            players: &players,
            parcels: &parcels,
        };
        let mut generator = RandomBelowIdealRainfall::with_rng(StdRng::seed_from_u64(42));
        let settings = WaterSettings {
            ideal_water_per_parcel: Some(100),
            ..WaterSettings::default()
        };
        assert!(generator.update_configuration(&settings).is_ok());

        // ideal = 800, range = (8 / 4) * 100 = 200
        for _ in 0..200 {
            let water = generator.generate(&ctx).unwrap_or(0);
            assert!((600..=800).contains(&water), "rainfall {water} out of range");
        }
    }

    #[test]
    fn below_ideal_is_reproducible_with_same_seed() {
        let players = BTreeMap::new();
        let parcels = parcels(12, 0);
        let ctx = RoundContext {
            round: 4,
            players: &players,
            parcels: &parcels,
        };
        let settings = WaterSettings {
            ideal_water_per_parcel: Some(37),
            ..WaterSettings::default()
        };
        let mut a = RandomBelowIdealRainfall::from_seed(7);
        let mut b = RandomBelowIdealRainfall::from_seed(7);
        assert!(a.update_configuration(&settings).is_ok());
        assert!(b.update_configuration(&settings).is_ok());
        for _ in 0..10 {
            assert_eq!(a.generate(&ctx).ok(), b.generate(&ctx).ok());
        }
    }

    #[test]
    fn below_ideal_with_few_parcels_has_no_variance() {
        let players = BTreeMap::new();
        let parcels = parcels(3, 0);
        let ctx = RoundContext {
            round: 1,
            players: &players,
            parcels: &parcels,
        };
        let mut generator = RandomBelowIdealRainfall::from_seed(99);
        let settings = WaterSettings {
            ideal_water_per_parcel: Some(10),
            ..WaterSettings::default()
        };
        assert!(generator.update_configuration(&settings).is_ok());
        // 3 / 4 == 0, so the range collapses to zero.
        assert_eq!(generator.generate(&ctx).ok(), Some(30));
    }
}
