//! Parcel-oriented allocation: assets draw from their owner's parcels.
//!
//! # Drawing water
//!
//! An increase is drawn from the asset's own parcel first, if the player
//! owns its water rights. Anything still needed comes from the player's
//! other parcels, always from whichever currently holds the most water
//! (lowest id on ties). The richest parcel is looked up again after every
//! draw.
//!
//! # Giving water back
//!
//! A decrease returns water to the player's parcels:
//!
//! - no water rights anywhere: the water is lost,
//! - rights on the asset's own parcel: all of it goes there,
//! - otherwise: `ceil(returned / parcels)` to each owned parcel in id
//!   order until nothing is left.
//!
//! Drawing is greedy and returning is even, so a draw followed by a return
//! can leave the water spread differently than before.

use std::collections::BTreeMap;

use tracing::{debug, info};

use waterwars_ledger::TransactionBuilder;
use waterwars_types::{AssetId, LedgerEntry, ParcelId, PlayerId};

use super::{AllocationChange, WaterAllocator};
use crate::error::AllocationError;
use crate::notify::{Change, ChangeSink};
use crate::state::GameState;

/// Allocator that moves water between an asset and its owner's parcels.
#[derive(Debug, Default, Clone, Copy)]
pub struct ParcelOrientedAllocator;

/// Everything a change will write, computed before anything is written.
struct Plan {
    change: AllocationChange,
    /// New `water_available` for every touched parcel.
    parcel_balances: BTreeMap<ParcelId, u64>,
    player_water: u64,
    entries: Vec<LedgerEntry>,
}

impl WaterAllocator for ParcelOrientedAllocator {
    fn name(&self) -> &'static str {
        "parcel_oriented"
    }

    fn change_allocation(
        &self,
        state: &mut GameState,
        asset: AssetId,
        player: PlayerId,
        new_allocation: u64,
        sink: &mut dyn ChangeSink,
    ) -> Result<AllocationChange, AllocationError> {
        let plan = plan_change(state, asset, player, new_allocation)?;
        if plan.change.is_noop() {
            debug!(asset_id = %asset, player_id = %player, "Allocation unchanged");
            return Ok(plan.change);
        }
        Ok(commit(state, plan, sink))
    }
}

/// Validate the request and work out every balance it changes.
fn plan_change(
    state: &GameState,
    asset_id: AssetId,
    player_id: PlayerId,
    new_allocation: u64,
) -> Result<Plan, AllocationError> {
    let player = state
        .players
        .get(&player_id)
        .ok_or(AllocationError::PlayerNotFound(player_id))?;
    let asset = state
        .assets
        .get(&asset_id)
        .ok_or(AllocationError::AssetNotFound(asset_id))?;

    if asset.owner != player_id {
        return Err(AllocationError::NotAssetOwner {
            player: player_id,
            asset: asset_id,
        });
    }
    if new_allocation > asset.water_usage {
        return Err(AllocationError::AboveUsage {
            asset: asset_id,
            requested: new_allocation,
            usage: asset.water_usage,
        });
    }
    if !asset.can_partially_allocate_water
        && new_allocation != 0
        && new_allocation != asset.water_usage
    {
        return Err(AllocationError::PartialNotAllowed {
            asset: asset_id,
            requested: new_allocation,
            usage: asset.water_usage,
        });
    }

    let previous = asset.water_allocated;
    let mut plan = Plan {
        change: AllocationChange::unchanged(asset_id, player_id, previous),
        parcel_balances: BTreeMap::new(),
        player_water: player.water,
        entries: Vec::new(),
    };
    if new_allocation == previous {
        return Ok(plan);
    }
    plan.change.current = new_allocation;

    // Parcels whose water rights this player actually holds, by id.
    let owned: BTreeMap<ParcelId, u64> = player
        .water_rights_owned
        .iter()
        .filter_map(|id| state.parcels.get(id))
        .filter(|parcel| parcel.water_rights_owner == Some(player_id))
        .map(|parcel| (parcel.id, parcel.water_available))
        .collect();
    let home = asset.parcel_id;
    let round = state.round;

    if new_allocation > previous {
        let required = new_allocation.saturating_sub(previous);
        if required > player.water {
            return Err(AllocationError::InsufficientWater {
                player: player_id,
                required,
                available: player.water,
            });
        }

        let drawn = draw(&owned, home, required).map_err(|shortfall| {
            AllocationError::ParcelsExhausted {
                player: player_id,
                shortfall,
            }
        })?;
        for (parcel, amount) in &drawn {
            let before = owned.get(parcel).copied().unwrap_or(0);
            plan.parcel_balances
                .insert(*parcel, before.saturating_sub(*amount));
            plan.entries.push(
                TransactionBuilder::allocation(round, *amount, *parcel, asset_id, player_id)
                    .build()?,
            );
        }
        plan.player_water = player.water.saturating_sub(required);
        plan.change.drawn = drawn;
    } else {
        let returned = previous.saturating_sub(new_allocation);
        let targets = give_back(&owned, home, returned);

        if targets.is_empty() {
            plan.change.lost = returned;
            plan.entries.push(
                TransactionBuilder::forfeit(round, returned, asset_id, player_id).build()?,
            );
        } else {
            for (parcel, amount) in &targets {
                let before = owned.get(parcel).copied().unwrap_or(0);
                let after = before
                    .checked_add(*amount)
                    .ok_or(AllocationError::ArithmeticOverflow)?;
                plan.parcel_balances.insert(*parcel, after);
                plan.entries.push(
                    TransactionBuilder::give_back(round, *amount, asset_id, *parcel, player_id)
                        .build()?,
                );
            }
            plan.player_water = player
                .water
                .checked_add(returned)
                .ok_or(AllocationError::ArithmeticOverflow)?;
        }
        plan.change.returned = targets;
    }

    Ok(plan)
}

/// Draw `required` units: home parcel first, then richest remaining.
///
/// Returns the draws in order, or the shortfall if the parcels run dry.
fn draw(
    owned: &BTreeMap<ParcelId, u64>,
    home: ParcelId,
    required: u64,
) -> Result<Vec<(ParcelId, u64)>, u64> {
    let mut available = owned.clone();
    let mut outstanding = required;
    let mut drawn = Vec::new();

    if let Some(home_water) = available.get_mut(&home) {
        let take = (*home_water).min(outstanding);
        if take > 0 {
            *home_water = home_water.saturating_sub(take);
            outstanding = outstanding.saturating_sub(take);
            drawn.push((home, take));
        }
    }

    while outstanding > 0 {
        let mut richest: Option<(ParcelId, u64)> = None;
        for (id, water) in &available {
            if *id == home || *water == 0 {
                continue;
            }
            if richest.is_none_or(|(_, best)| *water > best) {
                richest = Some((*id, *water));
            }
        }
        let Some((id, water)) = richest else {
            return Err(outstanding);
        };

        let take = water.min(outstanding);
        if let Some(slot) = available.get_mut(&id) {
            *slot = slot.saturating_sub(take);
        }
        outstanding = outstanding.saturating_sub(take);
        drawn.push((id, take));
    }

    Ok(drawn)
}

/// Decide where `returned` units go. Empty means the water is lost.
fn give_back(owned: &BTreeMap<ParcelId, u64>, home: ParcelId, returned: u64) -> Vec<(ParcelId, u64)> {
    if owned.is_empty() {
        return Vec::new();
    }
    if owned.contains_key(&home) {
        return vec![(home, returned)];
    }

    let count = u64::try_from(owned.len()).unwrap_or(u64::MAX);
    let per_parcel = returned.div_ceil(count);
    let mut outstanding = returned;
    let mut targets = Vec::new();
    for id in owned.keys() {
        if outstanding == 0 {
            break;
        }
        let give = per_parcel.min(outstanding);
        outstanding = outstanding.saturating_sub(give);
        targets.push((*id, give));
    }
    targets
}

/// Write a validated plan and notify observers.
fn commit(state: &mut GameState, plan: Plan, sink: &mut dyn ChangeSink) -> AllocationChange {
    let Plan {
        change,
        parcel_balances,
        player_water,
        entries,
    } = plan;

    for (id, water) in &parcel_balances {
        if let Some(parcel) = state.parcels.get_mut(id) {
            parcel.water_available = *water;
        }
    }
    if let Some(asset) = state.assets.get_mut(&change.asset) {
        asset.water_allocated = change.current;
    }
    if let Some(player) = state.players.get_mut(&change.player) {
        player.water = player_water;
    }
    for entry in entries {
        state.ledger.append(entry);
    }

    info!(
        asset_id = %change.asset,
        player_id = %change.player,
        previous = change.previous,
        current = change.current,
        drawn = change.total_drawn(),
        returned = change.total_returned(),
        lost = change.lost,
        "Allocation changed"
    );

    sink.trigger_changed(Change::Player(change.player));
    sink.trigger_changed(Change::Asset(change.asset));
    for id in parcel_balances.keys() {
        sink.trigger_changed(Change::Parcel(*id));
    }
    change
}

#[cfg(test)]
#[allow(clippy::indexing_slicing)]
mod tests {
    use rust_decimal_macros::dec;

    use waterwars_types::{AssetType, LedgerEntryType, Parcel, Player, Position};

    use super::*;
    use crate::notify::{NoOpSink, RecordingSink};
    use crate::state::AssetBlueprint;

    struct Farm {
        state: GameState,
        player: PlayerId,
        /// `parcels[0]` is the parcel the asset stands on.
        parcels: Vec<ParcelId>,
        asset: AssetId,
    }

    impl Farm {
        /// One player, one parcel per entry of `waters`, one asset on the
        /// first parcel.
        fn new(waters: &[u64], owns_home_rights: bool, usage: u64, partial: bool) -> Self {
            let mut state = GameState::new();
            state.set_round(1);
            let player = state
                .add_player(Player::new("ada"))
                .unwrap_or_else(|_| PlayerId::new());

            let mut parcels = Vec::new();
            for (index, water) in waters.iter().enumerate() {
                let mut parcel = Parcel::new(format!("lot-{index}"), "valley", Position::default(), 100);
                if index == 0 {
                    parcel.development_rights_owner = Some(player);
                }
                if index > 0 || owns_home_rights {
                    parcel.water_rights_owner = Some(player);
                }
                parcel.water_available = *water;
                parcels.push(state.add_parcel(parcel).unwrap_or_else(|_| ParcelId::new()));
            }

            let home = parcels.first().copied().unwrap_or_else(ParcelId::new);
            let asset = state
                .build_asset(
                    player,
                    home,
                    AssetBlueprint {
                        name: "Orchard".to_owned(),
                        asset_type: AssetType::Crops,
                        level: 1,
                        water_usage: usage,
                        can_partially_allocate_water: partial,
                        nominal_revenue: dec!(100),
                    },
                )
                .unwrap_or_else(|_| AssetId::new());

            let total: u64 = waters.iter().sum();
            if let Some(p) = state.players.get_mut(&player) {
                p.water = total;
            }
            Self {
                state,
                player,
                parcels,
                asset,
            }
        }

        fn change(&mut self, amount: u64) -> Result<AllocationChange, AllocationError> {
            ParcelOrientedAllocator.change_allocation(
                &mut self.state,
                self.asset,
                self.player,
                amount,
                &mut NoOpSink,
            )
        }

        fn water_on(&self, index: usize) -> u64 {
            self.parcels
                .get(index)
                .and_then(|id| self.state.parcel(*id))
                .map_or(0, |p| p.water_available)
        }

        fn allocated(&self) -> u64 {
            self.state.asset(self.asset).map_or(0, |a| a.water_allocated)
        }

        fn player_water(&self) -> u64 {
            self.state.player(self.player).map_or(0, |p| p.water)
        }

        /// Water on the player's parcels plus water in the asset.
        fn held(&self) -> u64 {
            let on_parcels: u64 = (0..self.parcels.len()).map(|i| self.water_on(i)).sum();
            on_parcels.saturating_add(self.allocated())
        }
    }

    #[test]
    fn draws_home_first_then_richest() {
        let mut farm = Farm::new(&[10, 8, 4], true, 30, true);
        let change = farm.change(20).ok();

        assert_eq!(
            change.map(|c| c.drawn),
            Some(vec![
                (farm.parcels[0], 10),
                (farm.parcels[1], 8),
                (farm.parcels[2], 2),
            ])
        );
        assert_eq!(farm.water_on(0), 0);
        assert_eq!(farm.water_on(1), 0);
        assert_eq!(farm.water_on(2), 2);
        assert_eq!(farm.allocated(), 20);
        assert_eq!(farm.player_water(), 2);
    }

    #[test]
    fn richest_is_rechecked_after_each_draw() {
        // Home has no rights: draws come from 6 and 5. After taking 6 from
        // the richest, 5 is now the richest.
        let mut farm = Farm::new(&[0, 5, 6], false, 30, true);
        let change = farm.change(9).ok();
        assert_eq!(
            change.map(|c| c.drawn),
            Some(vec![(farm.parcels[2], 6), (farm.parcels[1], 3)])
        );
        assert_eq!(farm.water_on(1), 2);
        assert_eq!(farm.water_on(2), 0);
    }

    #[test]
    fn insufficient_water_leaves_state_unchanged() {
        let mut farm = Farm::new(&[10, 8, 4], true, 30, true);
        if let Some(p) = farm.state.players.get_mut(&farm.player) {
            p.water = 5;
        }
        let before_parcels = farm.state.parcels().clone();
        let ledger_len = farm.state.ledger().len();

        let result = farm.change(20);
        assert!(matches!(
            result,
            Err(AllocationError::InsufficientWater {
                required: 20,
                available: 5,
                ..
            })
        ));
        assert_eq!(farm.allocated(), 0);
        assert_eq!(farm.player_water(), 5);
        assert_eq!(farm.state.parcels(), &before_parcels);
        assert_eq!(farm.state.ledger().len(), ledger_len);
    }

    #[test]
    fn dry_parcels_reject_the_whole_increase() {
        let mut farm = Farm::new(&[3, 4], true, 30, true);
        if let Some(p) = farm.state.players.get_mut(&farm.player) {
            p.water = 20;
        }
        let result = farm.change(10);
        assert!(matches!(
            result,
            Err(AllocationError::ParcelsExhausted { shortfall: 3, .. })
        ));
        assert_eq!(farm.water_on(0), 3);
        assert_eq!(farm.water_on(1), 4);
        assert_eq!(farm.allocated(), 0);
    }

    #[test]
    fn undo_returns_everything_home() {
        let mut farm = Farm::new(&[10, 8, 4], true, 30, true);
        assert!(farm.change(20).is_ok());
        let change = farm.change(0).ok();

        assert_eq!(change.map(|c| c.returned), Some(vec![(farm.parcels[0], 20)]));
        assert_eq!(farm.allocated(), 0);
        assert_eq!(farm.water_on(0), 20);
        assert_eq!(farm.player_water(), 22);
        assert_eq!(farm.held(), 22);
    }

    #[test]
    fn give_back_splits_evenly_without_home_rights() {
        let mut farm = Farm::new(&[0, 10, 10, 10], false, 30, true);
        let mut others: Vec<usize> = vec![1, 2, 3];
        others.sort_by_key(|i| farm.parcels[*i]);

        // Equal balances: the lowest id is drained first.
        assert!(farm.change(10).is_ok());
        assert_eq!(farm.water_on(others[0]), 0);

        // ceil(10 / 3) = 4 per parcel in id order: 4, 4, then the last 2.
        let change = farm.change(0).ok();
        assert_eq!(change.map(|c| c.total_returned()), Some(10));
        assert_eq!(farm.water_on(others[0]), 4);
        assert_eq!(farm.water_on(others[1]), 14);
        assert_eq!(farm.water_on(others[2]), 12);
        assert_eq!(farm.held(), 30);
    }

    #[test]
    fn give_back_without_rights_is_lost() {
        let mut farm = Farm::new(&[10], true, 10, true);
        assert!(farm.change(10).is_ok());

        // The player sells their only water rights.
        let home = farm.parcels[0];
        if let Some(p) = farm.state.parcels.get_mut(&home) {
            p.water_rights_owner = None;
        }
        if let Some(p) = farm.state.players.get_mut(&farm.player) {
            p.water_rights_owned.clear();
        }

        let change = farm.change(0).ok();
        assert_eq!(change.as_ref().map(|c| c.lost), Some(10));
        assert_eq!(change.map(|c| c.returned.is_empty()), Some(true));
        assert_eq!(farm.allocated(), 0);
        assert_eq!(farm.water_on(0), 0);
        assert_eq!(farm.player_water(), 0);

        let totals = farm.state.ledger().totals_for_round(1);
        assert_eq!(totals.get(&LedgerEntryType::Forfeit), Some(&10));
    }

    #[test]
    fn allocation_above_usage_rejected() {
        let mut farm = Farm::new(&[50], true, 30, true);
        assert!(matches!(
            farm.change(31),
            Err(AllocationError::AboveUsage { requested: 31, usage: 30, .. })
        ));
        assert_eq!(farm.water_on(0), 50);
    }

    #[test]
    fn all_or_nothing_asset_rejects_partial() {
        let mut farm = Farm::new(&[50], true, 30, false);
        assert!(matches!(
            farm.change(15),
            Err(AllocationError::PartialNotAllowed { requested: 15, .. })
        ));
        assert!(farm.change(30).is_ok());
        assert!(farm.change(0).is_ok());
    }

    #[test]
    fn only_the_owner_may_change_an_asset() {
        let mut farm = Farm::new(&[50], true, 30, true);
        let intruder = farm
            .state
            .add_player(Player::new("bo"))
            .unwrap_or_else(|_| PlayerId::new());
        let result = ParcelOrientedAllocator.change_allocation(
            &mut farm.state,
            farm.asset,
            intruder,
            10,
            &mut NoOpSink,
        );
        assert!(matches!(result, Err(AllocationError::NotAssetOwner { .. })));
    }

    #[test]
    fn unknown_asset_rejected() {
        let mut farm = Farm::new(&[50], true, 30, true);
        let result = ParcelOrientedAllocator.change_allocation(
            &mut farm.state,
            AssetId::new(),
            farm.player,
            10,
            &mut NoOpSink,
        );
        assert!(matches!(result, Err(AllocationError::AssetNotFound(_))));
    }

    #[test]
    fn unchanged_allocation_is_a_silent_noop() {
        let mut farm = Farm::new(&[50], true, 30, true);
        assert!(farm.change(10).is_ok());
        let ledger_len = farm.state.ledger().len();

        let mut sink = RecordingSink::new();
        let change = ParcelOrientedAllocator
            .change_allocation(&mut farm.state, farm.asset, farm.player, 10, &mut sink)
            .ok();
        assert_eq!(change.map(|c| c.is_noop()), Some(true));
        assert!(sink.changes().is_empty());
        assert_eq!(farm.state.ledger().len(), ledger_len);
    }

    #[test]
    fn observers_hear_each_entity_once() {
        let mut farm = Farm::new(&[5, 9], true, 30, true);
        let mut sink = RecordingSink::new();
        let _ = ParcelOrientedAllocator.change_allocation(
            &mut farm.state,
            farm.asset,
            farm.player,
            12,
            &mut sink,
        );
        assert_eq!(sink.count(Change::Player(farm.player)), 1);
        assert_eq!(sink.count(Change::Asset(farm.asset)), 1);
        assert_eq!(sink.count(Change::Parcel(farm.parcels[0])), 1);
        assert_eq!(sink.count(Change::Parcel(farm.parcels[1])), 1);
        assert_eq!(sink.changes().len(), 4);
    }

    #[test]
    fn held_water_is_conserved_across_changes() {
        let mut farm = Farm::new(&[0, 17, 9, 4], false, 25, true);
        let start = farm.held();
        for amount in [12, 25, 3, 20, 0, 7, 7, 25, 1] {
            assert!(farm.change(amount).is_ok(), "change to {amount} failed");
            assert_eq!(farm.held(), start, "water leaked at {amount}");
            assert_eq!(farm.player_water().saturating_add(farm.allocated()), start);
        }
        assert!(farm.state.ledger().verify_conservation(1).is_balanced());
    }

    #[test]
    fn movements_are_recorded_in_the_ledger() {
        let mut farm = Farm::new(&[10, 8, 4], true, 30, true);
        assert!(farm.change(20).is_ok());
        assert!(farm.change(5).is_ok());

        let totals = farm.state.ledger().totals_for_round(1);
        assert_eq!(totals.get(&LedgerEntryType::Allocate), Some(&20));
        assert_eq!(totals.get(&LedgerEntryType::GiveBack), Some(&15));
        assert_eq!(farm.state.ledger().entries_for_round(1).len(), 4);
    }
}
