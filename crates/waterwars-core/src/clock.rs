//! Round clock for a WaterWars game.
//!
//! The clock holds the current round and phase. Rounds run
//! `Build -> Allocation -> Revenue`, and the next `Build` starts the next
//! round. A fresh clock sits at round 0 in `Revenue`, as if a round had
//! just finished, so the first transition opens round 1.
//!
//! Transitions are split into [`RoundClock::next`], which only computes
//! where the clock would go, and [`RoundClock::advance`], which moves it.
//! The round manager checks the transition first, does the phase's work,
//! and advances only once that work has succeeded.

use waterwars_types::RoundPhase;

/// Errors that can occur during clock operations.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ClockError {
    /// Round counter would overflow.
    #[error("round counter overflow: cannot advance beyond u64::MAX")]
    RoundOverflow,

    /// Every configured round has been played.
    #[error("game finished after {max_rounds} rounds")]
    Finished {
        /// The configured number of rounds.
        max_rounds: u64,
    },

    /// The requested phase does not follow the current one.
    #[error("cannot enter {requested:?} from {current:?}")]
    OutOfOrder {
        /// The phase the clock is in.
        current: RoundPhase,
        /// The phase that was asked for.
        requested: RoundPhase,
    },

    /// Invalid clock configuration.
    #[error("invalid clock configuration: {reason}")]
    InvalidConfig {
        /// Explanation of what is wrong with the configuration.
        reason: String,
    },
}

/// Round and phase tracker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RoundClock {
    /// Current round, 0 before the game starts.
    round: u64,

    /// Current phase within the round.
    phase: RoundPhase,

    /// Number of rounds in the game.
    max_rounds: u64,
}

impl RoundClock {
    /// Create a clock for a game of `max_rounds` rounds.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `max_rounds` is 0.
    pub fn new(max_rounds: u64) -> Result<Self, ClockError> {
        Self::from_parts(0, RoundPhase::Revenue, max_rounds)
    }

    /// Create a clock at an explicit position (useful for testing and
    /// state restoration).
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::InvalidConfig`] if `max_rounds` is 0 or
    /// `round` is past it.
    pub fn from_parts(round: u64, phase: RoundPhase, max_rounds: u64) -> Result<Self, ClockError> {
        if max_rounds == 0 {
            return Err(ClockError::InvalidConfig {
                reason: "max_rounds must be at least 1".to_owned(),
            });
        }
        if round > max_rounds {
            return Err(ClockError::InvalidConfig {
                reason: format!("round {round} is past max_rounds {max_rounds}"),
            });
        }
        Ok(Self {
            round,
            phase,
            max_rounds,
        })
    }

    /// Current round.
    pub const fn round(&self) -> u64 {
        self.round
    }

    /// Current phase.
    pub const fn phase(&self) -> RoundPhase {
        self.phase
    }

    /// Number of rounds in the game.
    pub const fn max_rounds(&self) -> u64 {
        self.max_rounds
    }

    /// Whether the last round's revenue phase has been reached.
    pub const fn is_finished(&self) -> bool {
        self.round >= self.max_rounds && matches!(self.phase, RoundPhase::Revenue)
    }

    /// The round and phase the clock would move to, without moving it.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::Finished`] after the last round and
    /// [`ClockError::RoundOverflow`] if the counter cannot advance.
    pub fn next(&self) -> Result<(u64, RoundPhase), ClockError> {
        match self.phase {
            RoundPhase::Build => Ok((self.round, RoundPhase::Allocation)),
            RoundPhase::Allocation => Ok((self.round, RoundPhase::Revenue)),
            RoundPhase::Revenue => {
                if self.round >= self.max_rounds {
                    return Err(ClockError::Finished {
                        max_rounds: self.max_rounds,
                    });
                }
                let round = self
                    .round
                    .checked_add(1)
                    .ok_or(ClockError::RoundOverflow)?;
                Ok((round, RoundPhase::Build))
            }
        }
    }

    /// Like [`next`](Self::next), but fails unless the next phase is
    /// `requested`.
    ///
    /// # Errors
    ///
    /// Returns [`ClockError::OutOfOrder`] if `requested` does not follow
    /// the current phase, plus anything [`next`](Self::next) returns.
    pub fn next_into(&self, requested: RoundPhase) -> Result<u64, ClockError> {
        let (round, phase) = self.next()?;
        if phase != requested {
            return Err(ClockError::OutOfOrder {
                current: self.phase,
                requested,
            });
        }
        Ok(round)
    }

    /// Move to the next phase, starting a new round after `Revenue`.
    ///
    /// # Errors
    ///
    /// Same as [`next`](Self::next). The clock does not move on error.
    pub fn advance(&mut self) -> Result<(u64, RoundPhase), ClockError> {
        let (round, phase) = self.next()?;
        self.round = round;
        self.phase = phase;
        Ok((round, phase))
    }
}
