//! Transfers of water and development rights between players.
//!
//! Water rights carry entitlement with them: the parcel's initial rights
//! move from the seller's `water_entitlement` to the buyer's, and any water
//! currently on the parcel moves between their spendable balances.

use tracing::info;

use waterwars_types::{ParcelId, PlayerId};

use crate::error::GameError;
use crate::notify::{Change, ChangeSink};
use crate::state::GameState;

/// Move a parcel's water rights to `to`, or release them when `to` is
/// `None`.
///
/// # Errors
///
/// Returns [`GameError::ParcelNotFound`] or [`GameError::PlayerNotFound`]
/// for unknown ids, and [`GameError::ArithmeticOverflow`] if a balance
/// would overflow or the seller's entitlement is short. Nothing changes on
/// error.
pub fn transfer_water_rights(
    state: &mut GameState,
    parcel_id: ParcelId,
    to: Option<PlayerId>,
    sink: &mut dyn ChangeSink,
) -> Result<(), GameError> {
    let parcel = state
        .parcels
        .get(&parcel_id)
        .ok_or(GameError::ParcelNotFound(parcel_id))?;
    let from = parcel.water_rights_owner;
    if from == to {
        return Ok(());
    }
    let rights = parcel.initial_water_rights;
    let water = parcel.water_available;

    // Compute both sides before writing either.
    let seller = match from {
        Some(id) => {
            let player = state.players.get(&id).ok_or(GameError::PlayerNotFound(id))?;
            let entitlement = player
                .water_entitlement
                .checked_sub(rights)
                .ok_or(GameError::ArithmeticOverflow)?;
            Some((id, entitlement, player.water.saturating_sub(water)))
        }
        None => None,
    };
    let buyer = match to {
        Some(id) => {
            let player = state.players.get(&id).ok_or(GameError::PlayerNotFound(id))?;
            let entitlement = player
                .water_entitlement
                .checked_add(rights)
                .ok_or(GameError::ArithmeticOverflow)?;
            let spendable = player
                .water
                .checked_add(water)
                .ok_or(GameError::ArithmeticOverflow)?;
            Some((id, entitlement, spendable))
        }
        None => None,
    };

    if let Some((id, entitlement, spendable)) = seller {
        if let Some(player) = state.players.get_mut(&id) {
            player.water_entitlement = entitlement;
            player.water = spendable;
            player.water_rights_owned.remove(&parcel_id);
        }
    }
    if let Some((id, entitlement, spendable)) = buyer {
        if let Some(player) = state.players.get_mut(&id) {
            player.water_entitlement = entitlement;
            player.water = spendable;
            player.water_rights_owned.insert(parcel_id);
        }
    }
    if let Some(parcel) = state.parcels.get_mut(&parcel_id) {
        parcel.water_rights_owner = to;
    }

    info!(
        parcel_id = %parcel_id,
        from = ?from,
        to = ?to,
        rights,
        water,
        "Water rights transferred"
    );

    sink.trigger_changed(Change::Parcel(parcel_id));
    for id in [from, to].into_iter().flatten() {
        sink.trigger_changed(Change::Player(id));
    }
    Ok(())
}

/// Move a parcel's development rights to `to`, or release them.
///
/// Assets already built on the parcel keep their owner.
///
/// # Errors
///
/// Returns [`GameError::ParcelNotFound`] or [`GameError::PlayerNotFound`].
pub fn transfer_development_rights(
    state: &mut GameState,
    parcel_id: ParcelId,
    to: Option<PlayerId>,
    sink: &mut dyn ChangeSink,
) -> Result<(), GameError> {
    if let Some(id) = to.filter(|id| !state.players.contains_key(id)) {
        return Err(GameError::PlayerNotFound(id));
    }
    let parcel = state
        .parcels
        .get_mut(&parcel_id)
        .ok_or(GameError::ParcelNotFound(parcel_id))?;
    if parcel.development_rights_owner == to {
        return Ok(());
    }
    let from = parcel.development_rights_owner;
    parcel.development_rights_owner = to;

    info!(parcel_id = %parcel_id, from = ?from, to = ?to, "Development rights transferred");
    sink.trigger_changed(Change::Parcel(parcel_id));
    Ok(())
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use waterwars_types::{Parcel, Player, Position};

    use super::*;
    use crate::notify::RecordingSink;

    fn game() -> (GameState, PlayerId, PlayerId, ParcelId) {
        let mut state = GameState::new();
        let ada = state.add_player(Player::new("ada")).unwrap();
        let bo = state.add_player(Player::new("bo")).unwrap();
        let mut parcel = Parcel::new("lot", "valley", Position::default(), 300);
        parcel.water_rights_owner = Some(ada);
        let parcel = state.add_parcel(parcel).unwrap();
        (state, ada, bo, parcel)
    }

    #[test]
    fn sale_moves_entitlement_and_water() {
        let (mut state, ada, bo, parcel) = game();
        state.parcels.get_mut(&parcel).unwrap().water_available = 120;
        state.players.get_mut(&ada).unwrap().water = 150;

        let mut sink = RecordingSink::new();
        assert!(transfer_water_rights(&mut state, parcel, Some(bo), &mut sink).is_ok());

        let seller = state.player(ada).unwrap();
        assert_eq!(seller.water_entitlement, 0);
        assert_eq!(seller.water, 30);
        assert!(!seller.owns_any_water_rights());

        let buyer = state.player(bo).unwrap();
        assert_eq!(buyer.water_entitlement, 300);
        assert_eq!(buyer.water, 120);
        assert!(buyer.water_rights_owned.contains(&parcel));

        assert_eq!(state.parcel(parcel).unwrap().water_rights_owner, Some(bo));
        assert!(sink.contains(Change::Parcel(parcel)));
        assert!(sink.contains(Change::Player(ada)));
        assert!(sink.contains(Change::Player(bo)));
    }

    #[test]
    fn release_leaves_parcel_unowned() {
        let (mut state, ada, _, parcel) = game();
        assert!(transfer_water_rights(&mut state, parcel, None, &mut RecordingSink::new()).is_ok());
        assert_eq!(state.player(ada).unwrap().water_entitlement, 0);
        assert!(!state.parcel(parcel).unwrap().has_water_rights_owner());
    }

    #[test]
    fn transfer_to_current_owner_is_a_noop() {
        let (mut state, ada, _, parcel) = game();
        let mut sink = RecordingSink::new();
        assert!(transfer_water_rights(&mut state, parcel, Some(ada), &mut sink).is_ok());
        assert!(sink.changes().is_empty());
        assert_eq!(state.player(ada).unwrap().water_entitlement, 300);
    }

    #[test]
    fn unknown_buyer_changes_nothing() {
        let (mut state, ada, _, parcel) = game();
        let result = transfer_water_rights(
            &mut state,
            parcel,
            Some(PlayerId::new()),
            &mut RecordingSink::new(),
        );
        assert!(matches!(result, Err(GameError::PlayerNotFound(_))));
        assert_eq!(state.player(ada).unwrap().water_entitlement, 300);
        assert_eq!(state.parcel(parcel).unwrap().water_rights_owner, Some(ada));
    }

    #[test]
    fn development_rights_move_independently() {
        let (mut state, ada, bo, parcel) = game();
        assert!(
            transfer_development_rights(&mut state, parcel, Some(bo), &mut RecordingSink::new())
                .is_ok()
        );
        let lot = state.parcel(parcel).unwrap();
        assert_eq!(lot.development_rights_owner, Some(bo));
        assert_eq!(lot.water_rights_owner, Some(ada));
    }
}
