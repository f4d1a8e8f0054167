//! Per-round economic activity multipliers.
//!
//! Multipliers are kept as a dense table per asset type, indexed by level
//! with index 0 unused. Anything without configured data is `1.0`.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use tracing::debug;

use waterwars_types::{AssetType, ConfigError, RatioSeries, RoundContext};

/// Configured per-round series, by asset type and level.
///
/// In YAML:
///
/// ```yaml
/// series:
///   crops:
///     1: "1.0, 0.8, 1.2"
///   factory:
///     2: "0.9"
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EconomySettings {
    /// Comma-separated ratio lists keyed by asset type, then level.
    pub series: BTreeMap<AssetType, BTreeMap<usize, String>>,
}

/// Revenue multipliers for one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Multipliers {
    /// `table[type][level]`; index 0 is unused.
    table: BTreeMap<AssetType, Vec<Decimal>>,
}

impl Multipliers {
    /// Every type and level at `1.0`.
    pub fn neutral() -> Self {
        let table = AssetType::ALL
            .iter()
            .map(|t| (*t, vec![Decimal::ONE; t.max_level().saturating_add(1)]))
            .collect();
        Self { table }
    }

    /// The multiplier for `asset_type` at `level`, `1.0` if there is none.
    pub fn get(&self, asset_type: AssetType, level: usize) -> Decimal {
        self.table
            .get(&asset_type)
            .and_then(|row| row.get(level))
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    /// The dense table.
    pub const fn as_table(&self) -> &BTreeMap<AssetType, Vec<Decimal>> {
        &self.table
    }

    fn set(&mut self, asset_type: AssetType, level: usize, value: Decimal) {
        if let Some(slot) = self
            .table
            .get_mut(&asset_type)
            .and_then(|row| row.get_mut(level))
        {
            *slot = value;
        }
    }
}

impl Default for Multipliers {
    fn default() -> Self {
        Self::neutral()
    }
}

/// Strategy producing the round's revenue multipliers.
pub trait EconomicGenerator: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Read and validate the generator's settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a series is malformed or names a level
    /// the asset type does not have.
    fn update_configuration(&mut self, settings: &EconomySettings) -> Result<(), ConfigError>;

    /// Multipliers for `ctx.round`.
    fn generate(&self, ctx: &RoundContext<'_>) -> Multipliers;
}

/// Looks multipliers up in configured per-round series.
#[derive(Debug, Clone, Default)]
pub struct SeriesEconomy {
    series: BTreeMap<(AssetType, usize), RatioSeries>,
}

impl SeriesEconomy {
    /// A generator with no series, producing all-`1.0` tables.
    pub const fn new() -> Self {
        Self {
            series: BTreeMap::new(),
        }
    }
}

impl EconomicGenerator for SeriesEconomy {
    fn name(&self) -> &'static str {
        "series"
    }

    fn update_configuration(&mut self, settings: &EconomySettings) -> Result<(), ConfigError> {
        let mut series = BTreeMap::new();
        for (asset_type, levels) in &settings.series {
            for (level, text) in levels {
                let key = format!("economy.series.{asset_type:?}.{level}");
                if *level == 0 || *level > asset_type.max_level() {
                    return Err(ConfigError::InvalidValue {
                        key,
                        reason: format!(
                            "level must be between 1 and {}",
                            asset_type.max_level()
                        ),
                    });
                }
                series.insert((*asset_type, *level), RatioSeries::parse(&key, text)?);
            }
        }
        self.series = series;
        Ok(())
    }

    fn generate(&self, ctx: &RoundContext<'_>) -> Multipliers {
        let mut multipliers = Multipliers::neutral();
        for ((asset_type, level), series) in &self.series {
            multipliers.set(*asset_type, *level, series.ratio_for_round(ctx.round));
        }
        debug!(round = ctx.round, configured = self.series.len(), "Economic multipliers generated");
        multipliers
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::arithmetic_side_effects)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    fn settings(entries: &[(AssetType, usize, &str)]) -> EconomySettings {
        let mut series: BTreeMap<AssetType, BTreeMap<usize, String>> = BTreeMap::new();
        for (asset_type, level, text) in entries {
            series
                .entry(*asset_type)
                .or_default()
                .insert(*level, (*text).to_owned());
        }
        EconomySettings { series }
    }

    fn at_round<T>(round: u64, f: impl FnOnce(&RoundContext<'_>) -> T) -> T {
        let players = BTreeMap::new();
        let parcels = BTreeMap::new();
        f(&RoundContext {
            round,
            players: &players,
            parcels: &parcels,
        })
    }

    #[test]
    fn neutral_table_is_dense_and_one_based() {
        let neutral = Multipliers::neutral();
        for asset_type in AssetType::ALL {
            let row = neutral.as_table().get(&asset_type).unwrap();
            assert_eq!(row.len(), asset_type.max_level() + 1);
            assert!(row.iter().all(|m| *m == Decimal::ONE));
        }
    }

    #[test]
    fn configured_level_follows_series() {
        let mut generator = SeriesEconomy::new();
        generator
            .update_configuration(&settings(&[(AssetType::Crops, 2, "0.5, 1.25")]))
            .unwrap();

        let round1 = at_round(1, |ctx| generator.generate(ctx));
        let round2 = at_round(2, |ctx| generator.generate(ctx));
        let round3 = at_round(3, |ctx| generator.generate(ctx));

        assert_eq!(round1.get(AssetType::Crops, 2), dec!(0.5));
        assert_eq!(round2.get(AssetType::Crops, 2), dec!(1.25));
        // Past the end of the series.
        assert_eq!(round3.get(AssetType::Crops, 2), Decimal::ONE);
        // Unconfigured levels and types.
        assert_eq!(round1.get(AssetType::Crops, 1), Decimal::ONE);
        assert_eq!(round1.get(AssetType::Factory, 3), Decimal::ONE);
    }

    #[test]
    fn level_zero_rejected() {
        let mut generator = SeriesEconomy::new();
        let result = generator.update_configuration(&settings(&[(AssetType::Houses, 0, "1.0")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn level_above_max_rejected() {
        let mut generator = SeriesEconomy::new();
        let level = AssetType::Factory.max_level() + 1;
        let result =
            generator.update_configuration(&settings(&[(AssetType::Factory, level, "1.0")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn malformed_series_rejected() {
        let mut generator = SeriesEconomy::new();
        let result = generator.update_configuration(&settings(&[(AssetType::Crops, 1, "1.0,,2")]));
        assert!(matches!(result, Err(ConfigError::InvalidValue { .. })));
    }

    #[test]
    fn settings_deserialize_from_json() {
        let json = r#"{"series": {"crops": {"1": "1.0, 0.9"}}}"#;
        let parsed: EconomySettings = serde_json::from_str(json).unwrap();
        assert_eq!(
            parsed.series.get(&AssetType::Crops).and_then(|l| l.get(&1)),
            Some(&"1.0, 0.9".to_owned())
        );
    }
}
