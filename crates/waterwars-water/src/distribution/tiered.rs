//! Geographic tiered distribution, north to south.

use std::collections::BTreeMap;

use tracing::debug;

use waterwars_types::{ConfigError, Parcel, ParcelId, Player, PlayerId};

use super::{WaterDistributor, accumulate, write_parcels};
use crate::config::{PARCEL_WATER_ENTITLEMENT, WaterSettings};
use crate::error::DistributionError;
use crate::notify::ChangeSink;

const NAME: &str = "tiered";

/// Widest north-south spread of a single tier.
pub const TIER_RANGE: i64 = 15;

/// Waters parcels in bands from north to south until the water runs out.
///
/// Parcels are sorted by `y` descending (ties by id) and cut into tiers: a
/// parcel more than [`TIER_RANGE`] south of its tier's first parcel starts a
/// new tier. Each parcel in a tier receives
/// `min(parcel_water_entitlement, remaining / tier_size)`, owned or not;
/// only owned parcels count towards player shares.
///
/// When a tier's share is limited by the remaining water rather than the
/// cap, distribution stops after that tier. Tiers further south get
/// nothing, even if some water is left over from the division.
#[derive(Debug, Default, Clone)]
pub struct TieredDistributor {
    cap: Option<u64>,
}

impl TieredDistributor {
    /// Create an unconfigured distributor.
    pub const fn new() -> Self {
        Self { cap: None }
    }

    /// Create a distributor with a per-parcel cap.
    pub const fn with_cap(cap: u64) -> Self {
        Self { cap: Some(cap) }
    }
}

/// Group parcel ids into tiers, northernmost first.
pub fn tiers(parcels: &BTreeMap<ParcelId, Parcel>) -> Vec<Vec<ParcelId>> {
    let mut ordered: Vec<&Parcel> = parcels.values().collect();
    ordered.sort_by(|a, b| b.position.y.cmp(&a.position.y).then(a.id.cmp(&b.id)));

    let mut tiers: Vec<Vec<ParcelId>> = Vec::new();
    let mut tier_top: Option<i64> = None;
    for parcel in ordered {
        let y = parcel.position.y;
        let joins = tier_top.is_some_and(|top| top.saturating_sub(y) <= TIER_RANGE);
        match tiers.last_mut() {
            Some(tier) if joins => tier.push(parcel.id),
            _ => {
                tier_top = Some(y);
                tiers.push(vec![parcel.id]);
            }
        }
    }
    tiers
}

impl WaterDistributor for TieredDistributor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn update_configuration(&mut self, settings: &WaterSettings) -> Result<(), ConfigError> {
        self.cap = Some(WaterSettings::require(
            PARCEL_WATER_ENTITLEMENT,
            settings.parcel_water_entitlement,
        )?);
        Ok(())
    }

    fn allocate(
        &self,
        water: u64,
        players: &BTreeMap<PlayerId, Player>,
        parcels: &mut BTreeMap<ParcelId, Parcel>,
        sink: &mut dyn ChangeSink,
    ) -> Result<BTreeMap<PlayerId, u64>, DistributionError> {
        let cap = self
            .cap
            .ok_or(ConfigError::NotConfigured("tiered distributor"))?;

        let mut shares: BTreeMap<PlayerId, u64> = players.keys().map(|id| (*id, 0)).collect();
        let mut plan: BTreeMap<ParcelId, u64> = parcels.keys().map(|id| (*id, 0)).collect();
        let mut remaining = water;

        for (index, tier) in tiers(parcels).iter().enumerate() {
            let size = u64::try_from(tier.len()).unwrap_or(u64::MAX);
            let even = remaining.checked_div(size).unwrap_or(0);
            let scarce = even < cap;
            let per_parcel = even.min(cap);

            for id in tier {
                plan.insert(*id, per_parcel);
                if let Some(owner) = parcels.get(id).and_then(|p| p.water_rights_owner) {
                    accumulate(&mut shares, owner, per_parcel, NAME)?;
                }
            }
            let used = per_parcel
                .checked_mul(size)
                .ok_or(DistributionError::ArithmeticOverflow(NAME))?;
            remaining = remaining.saturating_sub(used);

            debug!(tier = index, size, per_parcel, remaining, scarce, "Tier watered");
            if scarce {
                break;
            }
        }

        write_parcels(parcels, &plan, sink);
        Ok(shares)
    }
}
