//! Settings consumed by the water strategies.
//!
//! All water strategies read from one [`WaterSettings`] value. Each
//! strategy picks the keys it needs in `update_configuration` and fails
//! there with [`ConfigError::MissingKey`] if one is absent.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use waterwars_types::{ConfigError, RatioSeries};

/// Key: water each parcel receives from the utopian generator.
pub const WATER_PER_PARCEL: &str = "water_per_parcel";
/// Key: ideal per-parcel water for the below-ideal generator.
pub const IDEAL_WATER_PER_PARCEL: &str = "ideal_water_per_parcel";
/// Key: comma-separated per-round rainfall ratios.
pub const RAINFALL_DEVIATIONS: &str = "rainfall_deviations";
/// Key: default parcel entitlement, also the tiered distributor's cap.
pub const PARCEL_WATER_ENTITLEMENT: &str = "parcel_water_entitlement";

/// Typed water settings, keyed by well-known names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WaterSettings {
    /// See [`WATER_PER_PARCEL`].
    pub water_per_parcel: Option<u64>,
    /// See [`IDEAL_WATER_PER_PARCEL`].
    pub ideal_water_per_parcel: Option<u64>,
    /// See [`RAINFALL_DEVIATIONS`].
    pub rainfall_deviations: Option<String>,
    /// See [`PARCEL_WATER_ENTITLEMENT`].
    pub parcel_water_entitlement: Option<u64>,
    /// Per-zone overrides of the parcel entitlement.
    pub zone_water_entitlements: BTreeMap<String, u64>,
}

impl WaterSettings {
    /// Return `value` or a [`ConfigError::MissingKey`] naming `key`.
    pub const fn require(key: &'static str, value: Option<u64>) -> Result<u64, ConfigError> {
        match value {
            Some(v) => Ok(v),
            None => Err(ConfigError::MissingKey(key)),
        }
    }

    /// Parse the rainfall deviation series.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if the key is absent and
    /// [`ConfigError::InvalidValue`] if the list does not parse.
    pub fn rainfall_series(&self) -> Result<RatioSeries, ConfigError> {
        let text = self
            .rainfall_deviations
            .as_deref()
            .ok_or(ConfigError::MissingKey(RAINFALL_DEVIATIONS))?;
        RatioSeries::parse(RAINFALL_DEVIATIONS, text)
    }
}

/// Initial water rights for new parcels, by zone.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParcelEntitlementConfig {
    /// Rights for parcels in zones without an override.
    pub default: u64,
    /// Rights for parcels in specific zones.
    pub zones: BTreeMap<String, u64>,
}

impl ParcelEntitlementConfig {
    /// Build from settings.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::MissingKey`] if no default entitlement is set.
    pub fn from_settings(settings: &WaterSettings) -> Result<Self, ConfigError> {
        Ok(Self {
            default: WaterSettings::require(
                PARCEL_WATER_ENTITLEMENT,
                settings.parcel_water_entitlement,
            )?,
            zones: settings.zone_water_entitlements.clone(),
        })
    }

    /// Initial rights for a parcel in `zone`.
    pub fn for_zone(&self, zone: &str) -> u64 {
        self.zones.get(zone).copied().unwrap_or(self.default)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn require_names_the_missing_key() {
        assert!(matches!(
            WaterSettings::require(WATER_PER_PARCEL, None),
            Err(ConfigError::MissingKey("water_per_parcel"))
        ));
        assert!(matches!(WaterSettings::require(WATER_PER_PARCEL, Some(3)), Ok(3)));
    }

    #[test]
    fn rainfall_series_requires_key() {
        let settings = WaterSettings::default();
        assert!(matches!(
            settings.rainfall_series(),
            Err(ConfigError::MissingKey(RAINFALL_DEVIATIONS))
        ));
    }

    #[test]
    fn rainfall_series_rejects_garbage() {
        let settings = WaterSettings {
            rainfall_deviations: Some("1.0, dry".to_owned()),
            ..WaterSettings::default()
        };
        assert!(matches!(
            settings.rainfall_series(),
            Err(ConfigError::InvalidValue { .. })
        ));
    }

    #[test]
    fn zone_override_wins() {
        let mut zones = BTreeMap::new();
        zones.insert("riverside".to_owned(), 1500);
        let settings = WaterSettings {
            parcel_water_entitlement: Some(1000),
            zone_water_entitlements: zones,
            ..WaterSettings::default()
        };
        let config = ParcelEntitlementConfig::from_settings(&settings).ok();
        assert_eq!(config.as_ref().map(|c| c.for_zone("riverside")), Some(1500));
        assert_eq!(config.as_ref().map(|c| c.for_zone("desert")), Some(1000));
    }

    #[test]
    fn entitlement_config_requires_default() {
        let result = ParcelEntitlementConfig::from_settings(&WaterSettings::default());
        assert!(matches!(
            result,
            Err(ConfigError::MissingKey(PARCEL_WATER_ENTITLEMENT))
        ));
    }

    #[test]
    fn settings_deserialize_with_defaults() {
        let json = r#"{"water_per_parcel": 250}"#;
        let settings: WaterSettings = serde_json::from_str(json).unwrap_or_default();
        assert_eq!(settings.water_per_parcel, Some(250));
        assert!(settings.zone_water_entitlements.is_empty());
    }
}
