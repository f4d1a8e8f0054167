//! Revenue earned by watered assets.
//!
//! A fully watered asset earns `nominal_revenue * multiplier`. An asset
//! that accepts partial water and has some earns the same pro rata. Any
//! other asset earns nothing.

use std::collections::BTreeMap;

use rust_decimal::Decimal;

use waterwars_types::{GameAsset, PlayerId};

use crate::EconomyError;
use crate::activity::Multipliers;

/// Revenue `asset` earns this round.
///
/// # Errors
///
/// Returns [`EconomyError::ArithmeticOverflow`] if the result does not fit
/// in a [`Decimal`].
pub fn asset_revenue(asset: &GameAsset, multipliers: &Multipliers) -> Result<Decimal, EconomyError> {
    let multiplier = multipliers.get(asset.asset_type, asset.level);
    let full = asset
        .nominal_revenue
        .checked_mul(multiplier)
        .ok_or(EconomyError::ArithmeticOverflow)?;

    if asset.is_fully_watered() {
        return Ok(full);
    }
    if !asset.can_partially_allocate_water || asset.water_allocated == 0 {
        return Ok(Decimal::ZERO);
    }

    full.checked_mul(Decimal::from(asset.water_allocated))
        .and_then(|scaled| scaled.checked_div(Decimal::from(asset.water_usage)))
        .ok_or(EconomyError::ArithmeticOverflow)
}

/// Total revenue per asset owner.
///
/// Players whose assets earn nothing still appear with zero.
///
/// # Errors
///
/// Returns [`EconomyError::ArithmeticOverflow`] if any figure overflows.
pub fn revenue_by_player<'a>(
    assets: impl IntoIterator<Item = &'a GameAsset>,
    multipliers: &Multipliers,
) -> Result<BTreeMap<PlayerId, Decimal>, EconomyError> {
    let mut totals: BTreeMap<PlayerId, Decimal> = BTreeMap::new();
    for asset in assets {
        let earned = asset_revenue(asset, multipliers)?;
        let total = totals.entry(asset.owner).or_insert(Decimal::ZERO);
        *total = total
            .checked_add(earned)
            .ok_or(EconomyError::ArithmeticOverflow)?;
    }
    Ok(totals)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::collections::BTreeMap;

    use rust_decimal_macros::dec;

    use waterwars_types::{AssetId, AssetType, ParcelId, RoundContext};

    use super::*;
    use crate::activity::{EconomicGenerator, EconomySettings, SeriesEconomy};

    fn asset(owner: PlayerId, usage: u64, allocated: u64, partial: bool) -> GameAsset {
        GameAsset {
            id: AssetId::new(),
            name: "Orchard".to_owned(),
            asset_type: AssetType::Crops,
            level: 1,
            parcel_id: ParcelId::new(),
            owner,
            water_usage: usage,
            water_allocated: allocated,
            can_partially_allocate_water: partial,
            nominal_revenue: dec!(200),
        }
    }

    fn boom() -> Multipliers {
        let mut generator = SeriesEconomy::new();
        let mut levels = BTreeMap::new();
        levels.insert(1, "1.5".to_owned());
        let mut series = BTreeMap::new();
        series.insert(AssetType::Crops, levels);
        generator
            .update_configuration(&EconomySettings { series })
            .unwrap();
        let players = BTreeMap::new();
        let parcels = BTreeMap::new();
        generator.generate(&RoundContext {
            round: 1,
            players: &players,
            parcels: &parcels,
        })
    }

    #[test]
    fn fully_watered_earns_scaled_nominal() {
        let owner = PlayerId::new();
        let earned = asset_revenue(&asset(owner, 50, 50, false), &boom()).unwrap();
        assert_eq!(earned, dec!(300));
    }

    #[test]
    fn partial_asset_earns_pro_rata() {
        let owner = PlayerId::new();
        let earned = asset_revenue(&asset(owner, 50, 20, true), &Multipliers::neutral()).unwrap();
        assert_eq!(earned, dec!(80));
    }

    #[test]
    fn dry_or_all_or_nothing_earns_nothing() {
        let owner = PlayerId::new();
        let dry = asset_revenue(&asset(owner, 50, 0, true), &boom()).unwrap();
        assert_eq!(dry, Decimal::ZERO);
        // All-or-nothing assets cannot hold partial water through the
        // allocator, but revenue does not rely on that.
        let partial = asset_revenue(&asset(owner, 50, 20, false), &boom()).unwrap();
        assert_eq!(partial, Decimal::ZERO);
    }

    #[test]
    fn zero_usage_asset_always_earns() {
        let owner = PlayerId::new();
        let earned = asset_revenue(&asset(owner, 0, 0, false), &Multipliers::neutral()).unwrap();
        assert_eq!(earned, dec!(200));
    }

    #[test]
    fn totals_group_by_owner() {
        let ada = PlayerId::new();
        let bo = PlayerId::new();
        let assets = [
            asset(ada, 10, 10, false),
            asset(ada, 10, 5, true),
            asset(bo, 10, 0, true),
        ];
        let totals = revenue_by_player(&assets, &Multipliers::neutral()).unwrap();
        assert_eq!(totals.get(&ada), Some(&dec!(300)));
        assert_eq!(totals.get(&bo), Some(&Decimal::ZERO));
    }
}
