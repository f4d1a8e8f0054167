//! The game state aggregate: players, parcels, assets, and the water ledger.
//!
//! [`GameState`] owns every entity the water strategies operate on. It is
//! not thread-safe on its own; concurrent access goes through
//! [`SharedGame`](crate::shared::SharedGame).

use std::collections::{BTreeMap, BTreeSet};

use rust_decimal::Decimal;
use tracing::{debug, info};

use waterwars_ledger::{Ledger, TransactionBuilder};
use waterwars_types::{
    AssetId, AssetType, GameAsset, Parcel, ParcelId, Player, PlayerId, RoundContext,
};

use crate::distribution::WaterDistributor;
use crate::error::{DistributionError, GameError};
use crate::notify::{Change, ChangeSink};

/// What to build on a parcel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AssetBlueprint {
    /// Display name.
    pub name: String,
    /// Asset category.
    pub asset_type: AssetType,
    /// Starting level, 1-based.
    pub level: usize,
    /// Water needed per round.
    pub water_usage: u64,
    /// Whether partial allocations are accepted.
    pub can_partially_allocate_water: bool,
    /// Revenue at a multiplier of 1.0.
    pub nominal_revenue: Decimal,
}

/// Totals from applying one round's distribution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct DistributionOutcome {
    /// Water the generator produced.
    pub generated: u64,
    /// Sum of all player shares. Can exceed `generated` under ceiling
    /// rounding.
    pub distributed_to_players: u64,
    /// Water that landed on parcels.
    pub landed_on_parcels: u64,
}

/// Water removed from the game at the start of a build phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetOutcome {
    /// Unused parcel water.
    pub evaporated: u64,
    /// Water used up by assets.
    pub consumed: u64,
}

/// All mutable game state.
#[derive(Debug, Clone, Default)]
pub struct GameState {
    pub(crate) round: u64,
    pub(crate) players: BTreeMap<PlayerId, Player>,
    pub(crate) parcels: BTreeMap<ParcelId, Parcel>,
    pub(crate) assets: BTreeMap<AssetId, GameAsset>,
    pub(crate) ledger: Ledger,
}

impl GameState {
    /// Create an empty game at round 0.
    pub const fn new() -> Self {
        Self {
            round: 0,
            players: BTreeMap::new(),
            parcels: BTreeMap::new(),
            assets: BTreeMap::new(),
            ledger: Ledger::new(),
        }
    }

    // -------------------------------------------------------------------
    // Accessors
    // -------------------------------------------------------------------

    /// The current round. Round 0 means no round has started.
    pub const fn round(&self) -> u64 {
        self.round
    }

    /// Set the current round. Ledger entries are stamped with it.
    pub const fn set_round(&mut self, round: u64) {
        self.round = round;
    }

    /// Look up a player.
    pub fn player(&self, id: PlayerId) -> Option<&Player> {
        self.players.get(&id)
    }

    /// Look up a parcel.
    pub fn parcel(&self, id: ParcelId) -> Option<&Parcel> {
        self.parcels.get(&id)
    }

    /// Look up an asset.
    pub fn asset(&self, id: AssetId) -> Option<&GameAsset> {
        self.assets.get(&id)
    }

    /// All players, by id.
    pub const fn players(&self) -> &BTreeMap<PlayerId, Player> {
        &self.players
    }

    /// All parcels, by id.
    pub const fn parcels(&self) -> &BTreeMap<ParcelId, Parcel> {
        &self.parcels
    }

    /// All assets, by id.
    pub const fn assets(&self) -> &BTreeMap<AssetId, GameAsset> {
        &self.assets
    }

    /// The water ledger.
    pub const fn ledger(&self) -> &Ledger {
        &self.ledger
    }

    /// Assets built by `player`.
    pub fn assets_of(&self, player: PlayerId) -> impl Iterator<Item = &GameAsset> {
        self.assets.values().filter(move |a| a.owner == player)
    }

    /// Read-only context for generators.
    pub const fn round_context(&self) -> RoundContext<'_> {
        RoundContext {
            round: self.round,
            players: &self.players,
            parcels: &self.parcels,
        }
    }

    /// Total water sitting on parcels and committed to assets.
    pub fn total_held_water(&self) -> u128 {
        let on_parcels = self
            .parcels
            .values()
            .fold(0_u128, |acc, p| acc.saturating_add(u128::from(p.water_available)));
        self.assets
            .values()
            .fold(on_parcels, |acc, a| acc.saturating_add(u128::from(a.water_allocated)))
    }

    // -------------------------------------------------------------------
    // Registration
    // -------------------------------------------------------------------

    /// Register a player.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicatePlayer`] if the id is taken.
    pub fn add_player(&mut self, player: Player) -> Result<PlayerId, GameError> {
        let id = player.id;
        if self.players.contains_key(&id) {
            return Err(GameError::DuplicatePlayer(id));
        }
        debug!(player_id = %id, name = %player.name, "Player joined");
        self.players.insert(id, player);
        Ok(id)
    }

    /// Register a parcel.
    ///
    /// A parcel that already names a water rights owner is credited to that
    /// player: the parcel joins their rights set and its initial rights are
    /// added to their entitlement.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::DuplicateParcel`] if the id is taken and
    /// [`GameError::PlayerNotFound`] if a named owner does not exist.
    pub fn add_parcel(&mut self, parcel: Parcel) -> Result<ParcelId, GameError> {
        let id = parcel.id;
        if self.parcels.contains_key(&id) {
            return Err(GameError::DuplicateParcel(id));
        }
        for owner in [parcel.water_rights_owner, parcel.development_rights_owner]
            .into_iter()
            .flatten()
        {
            if !self.players.contains_key(&owner) {
                return Err(GameError::PlayerNotFound(owner));
            }
        }
        if let Some(player) = parcel
            .water_rights_owner
            .and_then(|owner| self.players.get_mut(&owner))
        {
            player.water_entitlement = player
                .water_entitlement
                .checked_add(parcel.initial_water_rights)
                .ok_or(GameError::ArithmeticOverflow)?;
            player.water_rights_owned.insert(id);
        }
        self.parcels.insert(id, parcel);
        Ok(id)
    }

    /// Build an asset on `parcel` for `player`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::NotDevelopmentOwner`] unless the player holds
    /// the parcel's development rights, and [`GameError::InvalidLevel`] for
    /// a level outside `1..=max_level`.
    pub fn build_asset(
        &mut self,
        player: PlayerId,
        parcel: ParcelId,
        blueprint: AssetBlueprint,
    ) -> Result<AssetId, GameError> {
        if !self.players.contains_key(&player) {
            return Err(GameError::PlayerNotFound(player));
        }
        let site = self
            .parcels
            .get(&parcel)
            .ok_or(GameError::ParcelNotFound(parcel))?;
        if site.development_rights_owner != Some(player) {
            return Err(GameError::NotDevelopmentOwner { player, parcel });
        }
        if blueprint.level == 0 || blueprint.level > blueprint.asset_type.max_level() {
            return Err(GameError::InvalidLevel {
                asset_type: blueprint.asset_type,
                level: blueprint.level,
            });
        }

        let asset = GameAsset {
            id: AssetId::new(),
            name: blueprint.name,
            asset_type: blueprint.asset_type,
            level: blueprint.level,
            parcel_id: parcel,
            owner: player,
            water_usage: blueprint.water_usage,
            water_allocated: 0,
            can_partially_allocate_water: blueprint.can_partially_allocate_water,
            nominal_revenue: blueprint.nominal_revenue,
        };
        let id = asset.id;
        info!(
            asset_id = %id,
            player_id = %player,
            parcel_id = %parcel,
            asset_type = ?asset.asset_type,
            level = asset.level,
            "Asset built"
        );
        self.assets.insert(id, asset);
        Ok(id)
    }

    /// Add `amount` to a player's money.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::PlayerNotFound`] or
    /// [`GameError::ArithmeticOverflow`].
    pub fn credit_money(&mut self, player: PlayerId, amount: Decimal) -> Result<(), GameError> {
        let entry = self
            .players
            .get_mut(&player)
            .ok_or(GameError::PlayerNotFound(player))?;
        entry.money = entry
            .money
            .checked_add(amount)
            .ok_or(GameError::ArithmeticOverflow)?;
        Ok(())
    }

    // -------------------------------------------------------------------
    // Round lifecycle
    // -------------------------------------------------------------------

    /// Zero every water balance ahead of a new build phase.
    ///
    /// Leftover parcel water is recorded as evaporated and asset water as
    /// consumed. Every entity whose balance changed is reported to `sink`.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::Ledger`] if an entry cannot be recorded.
    pub fn reset_round_balances(
        &mut self,
        sink: &mut dyn ChangeSink,
    ) -> Result<ResetOutcome, GameError> {
        let round = self.round;
        let mut outcome = ResetOutcome::default();
        let mut changed = Vec::new();

        let mut entries = Vec::new();
        for parcel in self.parcels.values().filter(|p| p.water_available > 0) {
            entries.push(
                TransactionBuilder::evaporation(round, parcel.water_available, parcel.id)
                    .build()?,
            );
        }
        for asset in self.assets.values().filter(|a| a.water_allocated > 0) {
            entries.push(
                TransactionBuilder::consumption(round, asset.water_allocated, asset.id).build()?,
            );
        }

        for parcel in self.parcels.values_mut().filter(|p| p.water_available > 0) {
            outcome.evaporated = outcome.evaporated.saturating_add(parcel.water_available);
            parcel.water_available = 0;
            changed.push(Change::Parcel(parcel.id));
        }
        for asset in self.assets.values_mut().filter(|a| a.water_allocated > 0) {
            outcome.consumed = outcome.consumed.saturating_add(asset.water_allocated);
            asset.water_allocated = 0;
            changed.push(Change::Asset(asset.id));
        }
        for player in self.players.values_mut().filter(|p| p.water > 0) {
            player.water = 0;
            changed.push(Change::Player(player.id));
        }
        for entry in entries {
            self.ledger.append(entry);
        }

        debug!(
            round,
            evaporated = outcome.evaporated,
            consumed = outcome.consumed,
            "Round balances reset"
        );
        for change in changed {
            sink.trigger_changed(change);
        }
        Ok(outcome)
    }

    /// Run `distributor` over `water` and apply the result.
    ///
    /// Player balances are overwritten with their shares (zero for players
    /// the distributor left out). Any increase of a parcel's water is
    /// recorded as rainfall and any decrease as evaporation, so the ledger
    /// stays in step with the holdings whatever the parcels held before.
    ///
    /// # Errors
    ///
    /// Returns [`DistributionError`] if the distributor fails. The game is
    /// unchanged in that case.
    pub fn apply_distribution(
        &mut self,
        distributor: &dyn WaterDistributor,
        water: u64,
        sink: &mut dyn ChangeSink,
    ) -> Result<DistributionOutcome, DistributionError> {
        let round = self.round;
        let before: BTreeMap<ParcelId, u64> = self
            .parcels
            .iter()
            .map(|(id, p)| (*id, p.water_available))
            .collect();

        let shares = distributor.allocate(water, &self.players, &mut self.parcels, sink)?;

        let mut outcome = DistributionOutcome {
            generated: water,
            ..DistributionOutcome::default()
        };
        for parcel in self.parcels.values() {
            let old = before.get(&parcel.id).copied().unwrap_or(0);
            let new = parcel.water_available;
            outcome.landed_on_parcels = outcome.landed_on_parcels.saturating_add(new);
            if new > old {
                let gained = new.saturating_sub(old);
                self.ledger
                    .record(TransactionBuilder::rainfall(round, gained, parcel.id))?;
            } else if old > new {
                let lost = old.saturating_sub(new);
                self.ledger
                    .record(TransactionBuilder::evaporation(round, lost, parcel.id))?;
            }
        }

        let mut changed_players = BTreeSet::new();
        for player in self.players.values_mut() {
            let share = shares.get(&player.id).copied().unwrap_or(0);
            outcome.distributed_to_players = outcome.distributed_to_players.saturating_add(share);
            if player.water != share {
                player.water = share;
                changed_players.insert(player.id);
            }
        }
        for id in changed_players {
            sink.trigger_changed(Change::Player(id));
        }

        info!(
            round,
            distributor = distributor.name(),
            generated = outcome.generated,
            distributed = outcome.distributed_to_players,
            on_parcels = outcome.landed_on_parcels,
            "Water distributed"
        );
        Ok(outcome)
    }
}
