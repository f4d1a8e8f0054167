//! Round orchestration.
//!
//! [`RoundManager`] owns the configured strategies, the shared game, and
//! the round clock, and drives each round through its three phases:
//!
//! 1. **Build** -- leftover water from the previous round evaporates or is
//!    consumed, and every balance returns to zero.
//! 2. **Allocation** -- the rainfall generator sets the round's total, the
//!    economy sets the revenue multipliers, and the distributor hands the
//!    water out. Players may then change their asset allocations through
//!    an [`AllocationDesk`].
//! 3. **Revenue** -- allocation closes, the ledger is checked against the
//!    holdings, and every watered asset pays its owner.
//!
//! A phase that fails leaves the clock where it was, so the caller may fix
//! the cause and retry the same transition.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};

use rust_decimal::Decimal;
use serde::Serialize;
use tracing::{info, warn};

use waterwars_economy::{EconomyError, Multipliers, revenue_by_player};
use waterwars_ledger::{ConservationResult, LedgerAnomaly};
use waterwars_types::{AssetId, ConfigError, LedgerEntryType, PlayerId, RoundPhase};
use waterwars_water::{
    AllocationChange, AllocationError, ChangeSink, DistributionError, DistributionOutcome,
    GameError, GameState, GenerationError, ResetOutcome, SharedGame, TracingSink,
    WaterAllocator, requested_amount,
};

use crate::clock::{ClockError, RoundClock};
use crate::config::GameConfig;
use crate::scenario::{Roster, ScenarioError, seed_game};
use crate::strategies::Strategies;

/// Errors that can occur while running rounds.
#[derive(Debug, thiserror::Error)]
pub enum RoundError {
    /// The requested transition is not allowed now.
    #[error("clock error: {source}")]
    Clock {
        /// The underlying clock error.
        #[from]
        source: ClockError,
    },

    /// A strategy rejected its configuration.
    #[error("configuration error: {source}")]
    Config {
        /// The underlying configuration error.
        #[from]
        source: ConfigError,
    },

    /// The starting scenario could not be built.
    #[error("scenario error: {source}")]
    Scenario {
        /// The underlying scenario error.
        #[from]
        source: ScenarioError,
    },

    /// Rainfall generation failed.
    #[error("rainfall error: {source}")]
    Generation {
        /// The underlying generation error.
        #[from]
        source: GenerationError,
    },

    /// Distribution failed.
    #[error("distribution error: {source}")]
    Distribution {
        /// The underlying distribution error.
        #[from]
        source: DistributionError,
    },

    /// An allocation change was rejected.
    #[error("allocation error: {source}")]
    Allocation {
        /// The underlying allocation error.
        #[from]
        source: AllocationError,
    },

    /// The game rejected an operation.
    #[error("game error: {source}")]
    Game {
        /// The underlying game error.
        #[from]
        source: GameError,
    },

    /// Revenue could not be computed.
    #[error("economy error: {source}")]
    Economy {
        /// The underlying economy error.
        #[from]
        source: EconomyError,
    },

    /// Allocation changes are only accepted during the allocation phase.
    #[error("allocation is closed in round {round}")]
    AllocationClosed {
        /// The game's current round.
        round: u64,
    },

    /// The ledger does not match the water the game holds.
    #[error("water ledger anomaly: {0}")]
    Anomaly(LedgerAnomaly),
}

/// What happened in one round, produced when its revenue phase starts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RoundSummary {
    /// The round.
    pub round: u64,
    /// Water the rainfall generator produced.
    pub generated: u64,
    /// Sum of the player shares handed out.
    pub distributed: u64,
    /// Rainfall recorded as landing on parcels.
    pub rainfall: u64,
    /// Leftover parcel water removed when the round started or dropped by
    /// the distributor.
    pub evaporated: u64,
    /// Asset water used up when the round started.
    pub consumed: u64,
    /// Water lost by give-backs with nowhere to go.
    pub forfeited: u64,
    /// Water committed to assets when allocation closed.
    pub allocated: u64,
    /// Revenue credited, by player.
    pub revenue: BTreeMap<PlayerId, Decimal>,
    /// Sum of all revenue credited.
    pub total_revenue: Decimal,
}

/// Callback invoked after each revenue phase.
///
/// Implementations can publish summaries, persist snapshots, etc. The
/// callback runs while the game is locked and sees the state right after
/// revenue was credited.
pub trait RoundCallback: Send {
    /// Called once per round after revenue has been credited.
    fn on_round(&mut self, summary: &RoundSummary, state: &GameState);
}

/// A no-op round callback for testing.
pub struct NoOpCallback;

impl RoundCallback for NoOpCallback {
    fn on_round(&mut self, _summary: &RoundSummary, _state: &GameState) {}
}

// ---------------------------------------------------------------------------
// Allocation desk
// ---------------------------------------------------------------------------

/// Cloneable handle for submitting allocation changes.
///
/// Desks are handed out during the allocation phase and may be used from
/// any thread. Once the revenue phase starts every desk refuses further
/// changes; the check happens under the game lock, so a change is either
/// applied before allocation closes or rejected.
#[derive(Clone)]
pub struct AllocationDesk {
    game: SharedGame,
    allocator: Arc<dyn WaterAllocator>,
    open: Arc<AtomicBool>,
}

impl core::fmt::Debug for AllocationDesk {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("AllocationDesk")
            .field("allocator", &self.allocator.name())
            .field("open", &self.open.load(Ordering::Acquire))
            .finish_non_exhaustive()
    }
}

impl AllocationDesk {
    /// Ask for `asset` to hold `amount` units, as submitted by a player.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::Allocation`] for a negative amount or a change
    /// the allocator rejects, and [`RoundError::AllocationClosed`] outside
    /// the allocation phase. The game is unchanged on error.
    pub fn request(
        &self,
        asset: AssetId,
        player: PlayerId,
        amount: i64,
        sink: &mut dyn ChangeSink,
    ) -> Result<AllocationChange, RoundError> {
        let amount = requested_amount(amount)?;
        self.change(asset, player, amount, sink)
    }

    /// Set `asset`'s allocation to `new_allocation`.
    ///
    /// # Errors
    ///
    /// Same as [`request`](Self::request), minus the sign check.
    pub fn change(
        &self,
        asset: AssetId,
        player: PlayerId,
        new_allocation: u64,
        sink: &mut dyn ChangeSink,
    ) -> Result<AllocationChange, RoundError> {
        self.game.with_state(|state| {
            if !self.open.load(Ordering::Acquire) {
                return Err(RoundError::AllocationClosed {
                    round: state.round(),
                });
            }
            Ok(self
                .allocator
                .change_allocation(state, asset, player, new_allocation, sink)?)
        })
    }
}

// ---------------------------------------------------------------------------
// Round manager
// ---------------------------------------------------------------------------

/// Drives a game through its rounds.
pub struct RoundManager {
    clock: RoundClock,
    game: SharedGame,
    strategies: Strategies,
    sink: Box<dyn ChangeSink>,
    open: Arc<AtomicBool>,
    multipliers: Multipliers,
    opening_holdings: u128,
    distribution: DistributionOutcome,
}

impl core::fmt::Debug for RoundManager {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("RoundManager")
            .field("clock", &self.clock)
            .field("strategies", &self.strategies)
            .finish_non_exhaustive()
    }
}

impl RoundManager {
    /// Create a manager for `state`, playing `max_rounds` rounds.
    ///
    /// Change notifications from the phases go to a [`TracingSink`] until
    /// [`with_sink`](Self::with_sink) replaces it.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::Clock`] if `max_rounds` is 0.
    pub fn new(
        strategies: Strategies,
        state: GameState,
        max_rounds: u64,
    ) -> Result<Self, RoundError> {
        Ok(Self {
            clock: RoundClock::new(max_rounds)?,
            game: SharedGame::new(state),
            strategies,
            sink: Box::new(TracingSink),
            open: Arc::new(AtomicBool::new(false)),
            multipliers: Multipliers::neutral(),
            opening_holdings: 0,
            distribution: DistributionOutcome::default(),
        })
    }

    /// Build strategies and the starting game from `config`.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::Config`] if a strategy rejects its settings and
    /// [`RoundError::Scenario`] if the scenario is inconsistent.
    pub fn from_config(config: &GameConfig) -> Result<(Self, Roster), RoundError> {
        let strategies = Strategies::from_config(
            config.strategies,
            &config.water,
            &config.economy,
            config.game.seed,
        )?;
        let (state, roster) = seed_game(&config.scenario, &config.water)?;
        info!(
            game = config.game.name,
            seed = config.game.seed,
            max_rounds = config.game.max_rounds,
            "Game created"
        );
        Ok((Self::new(strategies, state, config.game.max_rounds)?, roster))
    }

    /// Send phase change notifications to `sink`.
    #[must_use]
    pub fn with_sink(mut self, sink: Box<dyn ChangeSink>) -> Self {
        self.sink = sink;
        self
    }

    /// The round clock.
    pub const fn clock(&self) -> &RoundClock {
        &self.clock
    }

    /// The shared game.
    pub const fn game(&self) -> &SharedGame {
        &self.game
    }

    /// The configured strategies.
    pub const fn strategies(&self) -> &Strategies {
        &self.strategies
    }

    /// This round's revenue multipliers. Neutral before the first
    /// allocation phase.
    pub const fn multipliers(&self) -> &Multipliers {
        &self.multipliers
    }

    /// Whether every round has been played.
    pub const fn is_finished(&self) -> bool {
        self.clock.is_finished()
    }

    /// Open the next round and zero every water balance.
    ///
    /// Parcel water left over from the previous round is recorded as
    /// evaporated and asset water as consumed.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::Clock`] if the game is not between rounds or
    /// is finished, and [`RoundError::Game`] if the reset fails. The game
    /// and clock are unchanged on error.
    pub fn start_build_phase(&mut self) -> Result<ResetOutcome, RoundError> {
        let round = self.clock.next_into(RoundPhase::Build)?;
        let sink = self.sink.as_mut();

        let (opening, outcome) = self.game.with_state(|state| -> Result<_, RoundError> {
            let previous = state.round();
            let opening = state.total_held_water();
            state.set_round(round);
            match state.reset_round_balances(sink) {
                Ok(outcome) => Ok((opening, outcome)),
                Err(e) => {
                    state.set_round(previous);
                    Err(e.into())
                }
            }
        })?;

        self.clock.advance()?;
        self.opening_holdings = opening;
        self.distribution = DistributionOutcome::default();
        info!(
            round,
            evaporated = outcome.evaporated,
            consumed = outcome.consumed,
            "Build phase started"
        );
        Ok(outcome)
    }

    /// Generate and distribute the round's water, then open allocation.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::Clock`] outside the build phase, and
    /// [`RoundError::Generation`] or [`RoundError::Distribution`] if a
    /// strategy fails. The clock does not move on error.
    pub fn start_allocation_phase(&mut self) -> Result<DistributionOutcome, RoundError> {
        self.clock.next_into(RoundPhase::Allocation)?;
        let Strategies {
            rainfall,
            distributor,
            economy,
            ..
        } = &mut self.strategies;
        let sink = self.sink.as_mut();
        let open = &self.open;

        let (outcome, multipliers) = self.game.with_state(|state| -> Result<_, RoundError> {
            let ctx = state.round_context();
            let water = rainfall.generate(&ctx)?;
            let multipliers = economy.generate(&ctx);
            let outcome = state.apply_distribution(&**distributor, water, sink)?;
            open.store(true, Ordering::Release);
            Ok((outcome, multipliers))
        })?;

        let (round, _) = self.clock.advance()?;
        self.multipliers = multipliers;
        self.distribution = outcome;
        info!(
            round,
            generated = outcome.generated,
            distributed = outcome.distributed_to_players,
            "Allocation phase started"
        );
        Ok(outcome)
    }

    /// A desk for submitting allocation changes this round.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::AllocationClosed`] outside the allocation
    /// phase.
    pub fn allocation_desk(&self) -> Result<AllocationDesk, RoundError> {
        if self.clock.phase() != RoundPhase::Allocation {
            return Err(RoundError::AllocationClosed {
                round: self.clock.round(),
            });
        }
        Ok(AllocationDesk {
            game: self.game.clone(),
            allocator: Arc::clone(&self.strategies.allocator),
            open: Arc::clone(&self.open),
        })
    }

    /// Set `asset`'s allocation to `new_allocation` on behalf of `player`,
    /// reporting changes to the manager's sink.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::AllocationClosed`] outside the allocation
    /// phase and [`RoundError::Allocation`] if the allocator rejects the
    /// change. The game is unchanged on error.
    pub fn change_allocation(
        &mut self,
        asset: AssetId,
        player: PlayerId,
        new_allocation: u64,
    ) -> Result<AllocationChange, RoundError> {
        let desk = self.allocation_desk()?;
        desk.change(asset, player, new_allocation, self.sink.as_mut())
    }

    /// Close allocation, verify the ledger, and pay revenue.
    ///
    /// Verification runs before any money moves: if the round's ledger
    /// entries are internally unbalanced, or the opening holdings plus the
    /// round's recorded flows do not equal the water the game now holds,
    /// the transition is aborted and allocation stays open.
    ///
    /// # Errors
    ///
    /// Returns [`RoundError::Clock`] outside the allocation phase,
    /// [`RoundError::Anomaly`] on a ledger mismatch, and
    /// [`RoundError::Economy`] or [`RoundError::Game`] if revenue cannot
    /// be credited. The game and clock are unchanged on error.
    pub fn start_revenue_phase(
        &mut self,
        callback: &mut dyn RoundCallback,
    ) -> Result<RoundSummary, RoundError> {
        let round = self.clock.next_into(RoundPhase::Revenue)?;
        let open = &self.open;
        let multipliers = &self.multipliers;
        let opening = self.opening_holdings;
        let distribution = self.distribution;

        let summary = self.game.with_state(|state| -> Result<_, RoundError> {
            let ledger = state.ledger();
            let closing = state.total_held_water();
            for check in [
                ledger.verify_conservation(round),
                ledger.verify_holdings(round, opening, closing),
            ] {
                if let ConservationResult::Anomaly(anomaly) = check {
                    warn!(round, %anomaly, "Revenue phase aborted");
                    return Err(RoundError::Anomaly(anomaly));
                }
            }

            let revenue = revenue_by_player(state.assets().values(), multipliers)?;
            for (player, amount) in &revenue {
                let money = state
                    .player(*player)
                    .ok_or(GameError::PlayerNotFound(*player))?
                    .money;
                if money.checked_add(*amount).is_none() {
                    return Err(GameError::ArithmeticOverflow.into());
                }
            }
            open.store(false, Ordering::Release);
            for (player, amount) in &revenue {
                state.credit_money(*player, *amount)?;
            }

            let summary = summarize(state, round, distribution, revenue);
            callback.on_round(&summary, state);
            Ok(summary)
        })?;

        self.clock.advance()?;
        info!(
            round,
            allocated = summary.allocated,
            forfeited = summary.forfeited,
            total_revenue = %summary.total_revenue,
            "Revenue phase started"
        );
        Ok(summary)
    }
}

fn summarize(
    state: &GameState,
    round: u64,
    distribution: DistributionOutcome,
    revenue: BTreeMap<PlayerId, Decimal>,
) -> RoundSummary {
    let totals = state.ledger().totals_for_round(round);
    let total = |entry_type: LedgerEntryType| totals.get(&entry_type).copied().unwrap_or(0);
    let allocated = state
        .assets()
        .values()
        .fold(0_u64, |acc, a| acc.saturating_add(a.water_allocated));
    let total_revenue = revenue
        .values()
        .fold(Decimal::ZERO, |acc, r| acc.saturating_add(*r));

    RoundSummary {
        round,
        generated: distribution.generated,
        distributed: distribution.distributed_to_players,
        rainfall: total(LedgerEntryType::Rainfall),
        evaporated: total(LedgerEntryType::Evaporate),
        consumed: total(LedgerEntryType::Consume),
        forfeited: total(LedgerEntryType::Forfeit),
        allocated,
        revenue,
        total_revenue,
    }
}
