//! Configuration errors and ratio-series values shared by the strategy crates.
//!
//! Strategies validate their settings in `update_configuration`, so a
//! missing or malformed key stops the game at startup instead of surfacing
//! in the middle of a round.

use core::str::FromStr;

use rust_decimal::Decimal;

/// Errors raised while applying configuration to an engine component.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    /// A key the component requires was not present.
    #[error("missing required configuration key: {0}")]
    MissingKey(&'static str),

    /// A key was present but its value could not be used.
    #[error("invalid value for {key}: {reason}")]
    InvalidValue {
        /// The offending key.
        key: String,
        /// What is wrong with the value.
        reason: String,
    },

    /// The component was used before any configuration was applied.
    #[error("{0} used before configuration was applied")]
    NotConfigured(&'static str),
}

/// A per-round series of deviation ratios.
///
/// Configured as a comma-separated list such as `"1.0, 0.8, 0.65"`. The first
/// value applies to round 1; round 0 is never looked up, and any round past
/// the end of the list uses a ratio of `1.0`.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct RatioSeries {
    /// `ratios[i]` is the ratio for round `i + 1`.
    ratios: Vec<Decimal>,
}

impl RatioSeries {
    /// Build a series directly from ratios, the first being round 1.
    pub const fn from_ratios(ratios: Vec<Decimal>) -> Self {
        Self { ratios }
    }

    /// Parse a comma-separated ratio list for the configuration key `key`.
    ///
    /// Whitespace around values is ignored and an empty string yields an
    /// empty series. Negative ratios are rejected.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if any value is empty, not a
    /// decimal number, or negative.
    pub fn parse(key: &str, text: &str) -> Result<Self, ConfigError> {
        if text.trim().is_empty() {
            return Ok(Self::default());
        }

        let mut ratios = Vec::new();
        for (position, raw) in text.split(',').enumerate() {
            let token = raw.trim();
            let ratio = Decimal::from_str(token).map_err(|err| ConfigError::InvalidValue {
                key: key.to_owned(),
                reason: format!("entry {position} ({token:?}) is not a ratio: {err}"),
            })?;
            if ratio.is_sign_negative() {
                return Err(ConfigError::InvalidValue {
                    key: key.to_owned(),
                    reason: format!("entry {position} is negative ({ratio})"),
                });
            }
            ratios.push(ratio);
        }

        Ok(Self { ratios })
    }

    /// The ratio for `round`, or `1.0` when the series has no value for it.
    pub fn ratio_for_round(&self, round: u64) -> Decimal {
        let Some(index) = round.checked_sub(1) else {
            return Decimal::ONE;
        };
        usize::try_from(index)
            .ok()
            .and_then(|i| self.ratios.get(i))
            .copied()
            .unwrap_or(Decimal::ONE)
    }

    /// Number of configured rounds.
    pub fn len(&self) -> usize {
        self.ratios.len()
    }

    /// Whether no rounds are configured.
    pub fn is_empty(&self) -> bool {
        self.ratios.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_comma_separated_ratios() {
        let series = RatioSeries::parse("rainfall.deviations", "1.0, 0.8,0.5");
        let series = series.ok().unwrap_or_default();
        assert_eq!(series.len(), 3);
        assert_eq!(series.ratio_for_round(1), Decimal::ONE);
        assert_eq!(series.ratio_for_round(2), Decimal::new(8, 1));
        assert_eq!(series.ratio_for_round(3), Decimal::new(5, 1));
    }

    #[test]
    fn round_zero_and_rounds_past_end_default_to_one() {
        let series = RatioSeries::from_ratios(vec![Decimal::new(5, 1)]);
        assert_eq!(series.ratio_for_round(0), Decimal::ONE);
        assert_eq!(series.ratio_for_round(1), Decimal::new(5, 1));
        assert_eq!(series.ratio_for_round(2), Decimal::ONE);
        assert_eq!(series.ratio_for_round(u64::MAX), Decimal::ONE);
    }

    #[test]
    fn empty_text_is_empty_series() {
        let series = RatioSeries::parse("k", "  ");
        assert_eq!(series, Ok(RatioSeries::default()));
    }

    #[test]
    fn rejects_garbage_and_negative_entries() {
        assert!(matches!(
            RatioSeries::parse("k", "1.0,abc"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            RatioSeries::parse("k", "1.0,,0.5"),
            Err(ConfigError::InvalidValue { .. })
        ));
        assert!(matches!(
            RatioSeries::parse("k", "-0.5"),
            Err(ConfigError::InvalidValue { .. })
        ));
    }
}
