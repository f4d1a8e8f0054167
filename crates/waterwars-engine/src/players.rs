//! Simulated players submitting allocation requests.
//!
//! During each allocation phase every player runs on its own blocking
//! task and asks for water for each of its assets, largest revenue first.
//! A request for an asset's full usage that fails is retried with whatever
//! water the player has left if the asset accepts partial allocations.
//! All players share one [`AllocationDesk`], so their requests interleave
//! under the game lock.

use std::collections::BTreeMap;

use rust_decimal::Decimal;
use tokio::task::JoinSet;
use tracing::{debug, info};

use waterwars_core::round::AllocationDesk;
use waterwars_types::{AssetId, PlayerId};
use waterwars_water::{GameError, GameState, SharedGame, TracingSink};

use crate::error::EngineError;

/// One asset a player wants to water.
#[derive(Debug, Clone, Copy)]
struct Want {
    asset: AssetId,
    usage: u64,
    partial: bool,
}

/// Requests accepted and rejected for one player in one round.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlayerTally {
    /// Changes the allocator applied.
    pub accepted: u32,
    /// Changes the allocator rejected.
    pub rejected: u32,
}

/// Each player's assets, most valuable first.
fn wants_by_player(state: &GameState) -> BTreeMap<PlayerId, Vec<Want>> {
    let mut wants: BTreeMap<PlayerId, Vec<(Decimal, Want)>> = BTreeMap::new();
    for asset in state.assets().values() {
        wants.entry(asset.owner).or_default().push((
            asset.nominal_revenue,
            Want {
                asset: asset.id,
                usage: asset.water_usage,
                partial: asset.can_partially_allocate_water,
            },
        ));
    }
    wants
        .into_iter()
        .map(|(player, mut list)| {
            list.sort_by(|a, b| b.0.cmp(&a.0));
            (player, list.into_iter().map(|(_, want)| want).collect())
        })
        .collect()
}

/// Water `player` has not yet committed this round.
fn water_left(game: &SharedGame, player: PlayerId) -> u64 {
    game.with_state(|state| Ok::<_, GameError>(state.player(player).map_or(0, |p| p.water)))
        .unwrap_or(0)
}

/// Submit one player's requests. Runs on a blocking thread.
fn play(desk: &AllocationDesk, game: &SharedGame, player: PlayerId, wants: &[Want]) -> PlayerTally {
    let mut tally = PlayerTally::default();
    let mut sink = TracingSink;

    for want in wants {
        let full = desk.change(want.asset, player, want.usage, &mut sink);
        if full.is_ok() {
            tally.accepted = tally.accepted.saturating_add(1);
            continue;
        }
        if !want.partial {
            tally.rejected = tally.rejected.saturating_add(1);
            continue;
        }
        let amount = water_left(game, player).min(want.usage);
        match desk.change(want.asset, player, amount, &mut sink) {
            Ok(change) => {
                debug!(
                    player_id = %player,
                    asset_id = %want.asset,
                    allocated = change.current,
                    usage = want.usage,
                    "Partial allocation"
                );
                tally.accepted = tally.accepted.saturating_add(1);
            }
            Err(e) => {
                debug!(player_id = %player, asset_id = %want.asset, error = %e, "Request rejected");
                tally.rejected = tally.rejected.saturating_add(1);
            }
        }
    }
    tally
}

/// Run every player's requests concurrently and wait for all of them.
///
/// # Errors
///
/// Returns [`EngineError::Task`] if a player task panicked or was
/// cancelled, and [`EngineError::Round`] if the game lock is poisoned.
pub async fn submit_requests(
    desk: &AllocationDesk,
    game: &SharedGame,
) -> Result<BTreeMap<PlayerId, PlayerTally>, EngineError> {
    let snapshot = game.snapshot().map_err(|e| EngineError::Round {
        source: e.into(),
    })?;

    let mut tasks = JoinSet::new();
    for (player, wants) in wants_by_player(&snapshot) {
        let desk = desk.clone();
        let game = game.clone();
        tasks.spawn_blocking(move || (player, play(&desk, &game, player, &wants)));
    }

    let mut tallies = BTreeMap::new();
    while let Some(joined) = tasks.join_next().await {
        let (player, tally) = joined.map_err(|e| EngineError::Task {
            message: format!("{e}"),
        })?;
        tallies.insert(player, tally);
    }

    let (accepted, rejected) = tallies.values().fold((0_u32, 0_u32), |(a, r), t| {
        (a.saturating_add(t.accepted), r.saturating_add(t.rejected))
    });
    info!(
        players = tallies.len(),
        accepted, rejected, "Allocation requests settled"
    );
    Ok(tallies)
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::indexing_slicing)]
mod tests {
    use rust_decimal_macros::dec;

    use waterwars_core::config::GameConfig;
    use waterwars_core::round::{NoOpCallback, RoundManager};

    use super::*;

    const GAME: &str = r#"
strategies:
  rainfall: utopian
  distributor: simple_fair_per_parcel
water:
  water_per_parcel: 300
scenario:
  players: [ada, bo]
  parcels:
    - name: a
      water_rights: 300
      water_rights_owner: ada
      development_rights_owner: ada
    - name: b
      water_rights: 300
      water_rights_owner: bo
      development_rights_owner: bo
  assets:
    - name: mill
      parcel: a
      owner: ada
      asset_type: factory
      water_usage: 250
      nominal_revenue: "200"
    - name: field
      parcel: a
      owner: ada
      asset_type: crops
      water_usage: 100
      can_partially_allocate_water: true
      nominal_revenue: "40"
    - name: houses
      parcel: b
      owner: bo
      asset_type: houses
      water_usage: 400
      nominal_revenue: "500"
"#;

    #[test]
    fn wants_are_sorted_by_revenue() {
        let config = GameConfig::parse(GAME).unwrap();
        let (manager, roster) = RoundManager::from_config(&config).unwrap();
        let state = manager.game().snapshot().unwrap();
        let wants = wants_by_player(&state);
        let ada = wants.get(&roster.players["ada"]).unwrap();
        assert_eq!(ada.len(), 2);
        assert_eq!(ada.first().map(|w| w.asset), roster.assets.get("mill").copied());
    }

    #[tokio::test]
    async fn players_water_what_they_can() {
        let config = GameConfig::parse(GAME).unwrap();
        let (mut manager, roster) = RoundManager::from_config(&config).unwrap();
        manager.start_build_phase().unwrap();
        manager.start_allocation_phase().unwrap();

        let desk = manager.allocation_desk().unwrap();
        let game = manager.game().clone();
        let tallies = submit_requests(&desk, &game).await.unwrap();

        let ada = tallies.get(&roster.players["ada"]).copied().unwrap();
        let bo = tallies.get(&roster.players["bo"]).copied().unwrap();
        // Ada waters the mill fully and the field with the 50 left over.
        assert_eq!(ada, PlayerTally { accepted: 2, rejected: 0 });
        // Bo's houses need 400 but only 300 fell.
        assert_eq!(bo, PlayerTally { accepted: 0, rejected: 1 });

        let summary = manager.start_revenue_phase(&mut NoOpCallback).unwrap();
        // Mill 200 + half the field's 40.
        assert_eq!(summary.total_revenue, dec!(220));
    }
}
