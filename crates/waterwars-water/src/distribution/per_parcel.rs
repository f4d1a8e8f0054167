//! Per-parcel fair distribution with floor rounding.

use std::collections::BTreeMap;

use waterwars_types::{Parcel, ParcelId, Player, PlayerId};

use super::{WaterDistributor, accumulate, share_floor, write_parcels};
use crate::error::DistributionError;
use crate::notify::ChangeSink;

const NAME: &str = "simple_fair_per_parcel";

/// Shares water over owned parcels in proportion to their initial rights.
///
/// Unowned parcels are left out of the total and receive nothing. With
/// enough water every owned parcel gets its full rights; otherwise each
/// gets `floor(rights * water / total)`. A player's share is the sum over
/// the parcels they own.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimpleFairPerParcelDistributor;

impl WaterDistributor for SimpleFairPerParcelDistributor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn allocate(
        &self,
        water: u64,
        players: &BTreeMap<PlayerId, Player>,
        parcels: &mut BTreeMap<ParcelId, Parcel>,
        sink: &mut dyn ChangeSink,
    ) -> Result<BTreeMap<PlayerId, u64>, DistributionError> {
        let total = parcels
            .values()
            .filter(|p| p.has_water_rights_owner())
            .fold(0_u128, |acc, p| acc.saturating_add(u128::from(p.initial_water_rights)));
        let plenty = u128::from(water) >= total;

        let mut shares: BTreeMap<PlayerId, u64> = players.keys().map(|id| (*id, 0)).collect();
        let mut plan = BTreeMap::new();
        for parcel in parcels.values() {
            let amount = match parcel.water_rights_owner {
                Some(_) if total == 0 => 0,
                Some(_) if plenty => parcel.initial_water_rights,
                Some(_) => share_floor(parcel.initial_water_rights, water, total)
                    .ok_or(DistributionError::ArithmeticOverflow(NAME))?,
                None => 0,
            };
            if let Some(owner) = parcel.water_rights_owner {
                accumulate(&mut shares, owner, amount, NAME)?;
            }
            plan.insert(parcel.id, amount);
        }

        write_parcels(parcels, &plan, sink);
        Ok(shares)
    }
}
