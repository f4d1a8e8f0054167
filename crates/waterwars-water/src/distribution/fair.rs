//! Player-level fair distribution with ceiling rounding.

use std::collections::BTreeMap;

use waterwars_types::{Parcel, ParcelId, Player, PlayerId};

use super::{WaterDistributor, player_entitlement, share_ceil, share_floor, write_parcels};
use crate::error::DistributionError;
use crate::notify::ChangeSink;

const NAME: &str = "fair";

/// Shares water in proportion to each player's entitlement, ignoring where
/// their parcels are.
///
/// The total includes the rights of unowned parcels, so when some parcels
/// are unowned the players never receive the whole rainfall. Each share is
/// rounded up, which can hand out slightly more than was generated; that
/// excess is kept.
///
/// A player's share is spread over the parcels whose water rights they own,
/// in proportion to each parcel's initial rights. Flooring leftovers go to
/// the parcel with the most rights (lowest id on ties), so the parcels add
/// up to the share exactly.
#[derive(Debug, Default, Clone, Copy)]
pub struct FairDistributor;

impl WaterDistributor for FairDistributor {
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
        let unowned = parcels
            .values()
            .filter(|p| !p.has_water_rights_owner())
            .fold(0_u128, |acc, p| acc.saturating_add(u128::from(p.initial_water_rights)));
        let total = player_entitlement(players).saturating_add(unowned);

        let mut shares = BTreeMap::new();
        for player in players.values() {
            let share = if total == 0 {
                0
            } else if u128::from(water) >= total {
                player.water_entitlement
            } else {
                share_ceil(player.water_entitlement, water, total)
                    .ok_or(DistributionError::ArithmeticOverflow(NAME))?
            };
            shares.insert(player.id, share);
        }

        let mut plan: BTreeMap<ParcelId, u64> = parcels.keys().map(|id| (*id, 0)).collect();
        for (player, share) in &shares {
            let owned: Vec<(ParcelId, u64)> = parcels
                .values()
                .filter(|p| p.water_rights_owner == Some(*player))
                .map(|p| (p.id, p.initial_water_rights))
                .collect();
            for (parcel, amount) in spread(*share, &owned)? {
                plan.insert(parcel, amount);
            }
        }

        write_parcels(parcels, &plan, sink);
        Ok(shares)
    }
}

/// Split `share` over `owned` parcels in proportion to their rights.
fn spread(share: u64, owned: &[(ParcelId, u64)]) -> Result<Vec<(ParcelId, u64)>, DistributionError> {
    let whole = owned
        .iter()
        .fold(0_u128, |acc, (_, rights)| acc.saturating_add(u128::from(*rights)));

    let mut placed: Vec<(ParcelId, u64)> = Vec::with_capacity(owned.len());
    let mut handed_out: u64 = 0;
    for (parcel, rights) in owned {
        let amount = if whole == 0 {
            0
        } else {
            share_floor(*rights, share, whole).ok_or(DistributionError::ArithmeticOverflow(NAME))?
        };
        handed_out = handed_out.saturating_add(amount);
        placed.push((*parcel, amount));
    }

    let leftover = share.saturating_sub(handed_out);
    if leftover > 0 {
        // Lowest id wins ties: owned is in id order and only a strictly
        // larger rights value replaces the pick.
        let mut pick: Option<(usize, u64)> = None;
        for (index, (_, rights)) in owned.iter().enumerate() {
            if pick.is_none_or(|(_, best)| *rights > best) {
                pick = Some((index, *rights));
            }
        }
        if let Some(slot) = pick.and_then(|(index, _)| placed.get_mut(index)) {
            slot.1 = slot
                .1
                .checked_add(leftover)
                .ok_or(DistributionError::ArithmeticOverflow(NAME))?;
        }
    }

    Ok(placed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::distribution::test_support::Board;
    use crate::notify::{Change, RecordingSink};

    #[test]
    fn ceiling_shares_against_half_ratio() {
        // 300 + 200 owned, 100 unowned: ratio 300 / 600 = 0.5.
        let mut board = Board::default();
        let ada = board.player("ada");
        let bo = board.player("bo");
        board.parcel(Some(ada), 300, 0);
        board.parcel(Some(bo), 200, 0);
        let unowned = board.parcel(None, 100, 0);

        let shares = FairDistributor
            .allocate(300, &board.players, &mut board.parcels, &mut RecordingSink::new())
            .unwrap_or_default();

        assert_eq!(shares.get(&ada), Some(&150));
        assert_eq!(shares.get(&bo), Some(&100));
        assert_eq!(board.water_on(unowned), 0);
    }

    #[test]
    fn ceiling_can_exceed_generated_total() {
        let mut board = Board::default();
        let players: Vec<PlayerId> = (0..3).map(|_| board.player("p")).collect();
        for player in &players {
            board.parcel(Some(*player), 1, 0);
        }

        // 2 units over 3 entitlements: each share is ceil(2/3) = 1.
        let shares = FairDistributor
            .allocate(2, &board.players, &mut board.parcels, &mut RecordingSink::new())
            .unwrap_or_default();
        let total: u64 = shares.values().sum();
        assert_eq!(total, 3);
    }

    #[test]
    fn plenty_of_water_caps_at_entitlement() {
        let mut board = Board::default();
        let ada = board.player("ada");
        let parcel = board.parcel(Some(ada), 400, 0);

        let shares = FairDistributor
            .allocate(10_000, &board.players, &mut board.parcels, &mut RecordingSink::new())
            .unwrap_or_default();
        assert_eq!(shares.get(&ada), Some(&400));
        assert_eq!(board.water_on(parcel), 400);
    }

    #[test]
    fn share_spreads_over_owned_parcels() {
        let mut board = Board::default();
        let ada = board.player("ada");
        let small = board.parcel(Some(ada), 100, 0);
        let large = board.parcel(Some(ada), 200, 0);

        // ratio 101 / 300: share = ceil(300 * 101 / 300) = 101.
        let shares = FairDistributor
            .allocate(101, &board.players, &mut board.parcels, &mut RecordingSink::new())
            .unwrap_or_default();
        assert_eq!(shares.get(&ada), Some(&101));
        // floor(101/3) = 33 and floor(202/3) = 67, leftover 1 to the larger.
        assert_eq!(board.water_on(small), 33);
        assert_eq!(board.water_on(large), 68);
    }

    #[test]
    fn every_parcel_reported_once() {
        let mut board = Board::default();
        let ada = board.player("ada");
        let a = board.parcel(Some(ada), 10, 0);
        let b = board.parcel(None, 10, 0);

        let mut sink = RecordingSink::new();
        let _ = FairDistributor.allocate(5, &board.players, &mut board.parcels, &mut sink);
        assert_eq!(sink.count(Change::Parcel(a)), 1);
        assert_eq!(sink.count(Change::Parcel(b)), 1);
    }

    #[test]
    fn no_entitlement_means_no_water() {
        let mut board = Board::default();
        let ada = board.player("ada");
        let shares = FairDistributor
            .allocate(500, &board.players, &mut board.parcels, &mut RecordingSink::new())
            .unwrap_or_default();
        assert_eq!(shares.get(&ada), Some(&0));
    }
}
