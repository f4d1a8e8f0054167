//! Player-only distribution with no parcel side effects.

use std::collections::BTreeMap;

use waterwars_types::{Parcel, ParcelId, Player, PlayerId};

use super::{WaterDistributor, player_entitlement, share_floor};
use crate::error::DistributionError;
use crate::notify::ChangeSink;

const NAME: &str = "simple_player_only";

/// Shares water among players by entitlement, truncating, and never
/// touches parcels.
///
/// Each player gets `floor(entitlement * water / total)`, capped at their
/// entitlement.
#[derive(Debug, Default, Clone, Copy)]
pub struct SimplePlayerOnlyDistributor;

impl WaterDistributor for SimplePlayerOnlyDistributor {
    fn name(&self) -> &'static str {
        NAME
    }

    fn writes_parcels(&self) -> bool {
        false
    }

    fn allocate(
        &self,
        water: u64,
        players: &BTreeMap<PlayerId, Player>,
        _parcels: &mut BTreeMap<ParcelId, Parcel>,
        _sink: &mut dyn ChangeSink,
    ) -> Result<BTreeMap<PlayerId, u64>, DistributionError> {
        let total = player_entitlement(players);
        let mut shares = BTreeMap::new();
        for player in players.values() {
            let share = if total == 0 {
                0
            } else {
                share_floor(player.water_entitlement, water, total)
                    .ok_or(DistributionError::ArithmeticOverflow(NAME))?
                    .min(player.water_entitlement)
            };
            shares.insert(player.id, share);
        }
        Ok(shares)
    }
}
