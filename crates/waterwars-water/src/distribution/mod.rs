//! Water distributors: turning a round's rainfall into player and parcel
//! balances.
//!
//! | Distributor | Basis | Rounding | Unowned parcels |
//! |-------------|-------|----------|-----------------|
//! | [`FairDistributor`] | player entitlement | ceiling | zero |
//! | [`SimpleFairPerParcelDistributor`] | owned parcel rights | floor | zero |
//! | [`TieredDistributor`] | north-to-south bands | integer division | watered, not counted |
//! | [`SimplePlayerOnlyDistributor`] | player entitlement | floor | untouched |
//!
//! Distributors overwrite parcel balances rather than adding to them, so
//! each is meant to run once per round. Every distributor computes its full
//! result before writing anything, then reports each parcel it wrote to the
//! [`ChangeSink`] once.

pub mod fair;
pub mod per_parcel;
pub mod player_only;
pub mod tiered;

pub use fair::FairDistributor;
pub use per_parcel::SimpleFairPerParcelDistributor;
pub use player_only::SimplePlayerOnlyDistributor;
pub use tiered::{TIER_RANGE, TieredDistributor};

use std::collections::BTreeMap;

use waterwars_types::{ConfigError, Parcel, ParcelId, Player, PlayerId};

use crate::config::WaterSettings;
use crate::error::DistributionError;
use crate::notify::{Change, ChangeSink};

/// Strategy dividing the round's rainfall among players and parcels.
pub trait WaterDistributor: Send {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Read the keys this distributor needs. Most need none.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a required key is missing.
    fn update_configuration(&mut self, _settings: &WaterSettings) -> Result<(), ConfigError> {
        Ok(())
    }

    /// Whether this distributor puts water on parcels. Allocators draw from
    /// parcels, so a distributor that does not cannot feed them.
    fn writes_parcels(&self) -> bool {
        true
    }

    /// Divide `water` and return each player's share.
    ///
    /// Parcel balances are overwritten as a side effect.
    ///
    /// # Errors
    ///
    /// Returns [`DistributionError`] if the distributor is unconfigured or
    /// a share overflows. Nothing is written in that case.
    fn allocate(
        &self,
        water: u64,
        players: &BTreeMap<PlayerId, Player>,
        parcels: &mut BTreeMap<ParcelId, Parcel>,
        sink: &mut dyn ChangeSink,
    ) -> Result<BTreeMap<PlayerId, u64>, DistributionError>;
}

/// Sum of all player entitlements.
pub(crate) fn player_entitlement(players: &BTreeMap<PlayerId, Player>) -> u128 {
    players
        .values()
        .fold(0_u128, |acc, p| acc.saturating_add(u128::from(p.water_entitlement)))
}

/// `floor(part * water / whole)`, or `None` when `whole` is zero or the
/// result does not fit.
pub(crate) fn share_floor(part: u64, water: u64, whole: u128) -> Option<u64> {
    let scaled = u128::from(part).checked_mul(u128::from(water))?;
    u64::try_from(scaled.checked_div(whole)?).ok()
}

/// `ceil(part * water / whole)`, or `None` when `whole` is zero or the
/// result does not fit.
pub(crate) fn share_ceil(part: u64, water: u64, whole: u128) -> Option<u64> {
    let scaled = u128::from(part).checked_mul(u128::from(water))?;
    let quotient = scaled.checked_div(whole)?;
    let rounded = if scaled.checked_rem(whole)? == 0 {
        quotient
    } else {
        quotient.checked_add(1)?
    };
    u64::try_from(rounded).ok()
}

/// Overwrite parcel balances with `plan`, then report each parcel once.
pub(crate) fn write_parcels(
    parcels: &mut BTreeMap<ParcelId, Parcel>,
    plan: &BTreeMap<ParcelId, u64>,
    sink: &mut dyn ChangeSink,
) {
    for (id, water) in plan {
        if let Some(parcel) = parcels.get_mut(id) {
            parcel.water_available = *water;
        }
    }
    for id in plan.keys() {
        sink.trigger_changed(Change::Parcel(*id));
    }
}

/// Add `amount` to `player`'s running total.
pub(crate) fn accumulate(
    totals: &mut BTreeMap<PlayerId, u64>,
    player: PlayerId,
    amount: u64,
    distributor: &'static str,
) -> Result<(), DistributionError> {
    let total = totals.entry(player).or_insert(0);
    *total = total
        .checked_add(amount)
        .ok_or(DistributionError::ArithmeticOverflow(distributor))?;
    Ok(())
}
