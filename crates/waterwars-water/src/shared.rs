//! Thread-safe handle to a game.
//!
//! [`SharedGame`] wraps the [`GameState`] in a single mutex. Each call
//! holds the lock for the whole operation, so an allocation's draw or
//! give-back sequence is atomic with respect to every other call.

use std::sync::{Arc, Mutex};

use waterwars_types::{AssetId, PlayerId};

use crate::allocation::{AllocationChange, WaterAllocator};
use crate::error::{AllocationError, GameError};
use crate::notify::ChangeSink;
use crate::state::GameState;

/// Cloneable, lock-guarded handle to one game.
#[derive(Debug, Clone, Default)]
pub struct SharedGame {
    inner: Arc<Mutex<GameState>>,
}

impl SharedGame {
    /// Wrap `state` for shared access.
    pub fn new(state: GameState) -> Self {
        Self {
            inner: Arc::new(Mutex::new(state)),
        }
    }

    /// Run `f` with exclusive access to the game.
    ///
    /// # Errors
    ///
    /// Returns whatever `f` returns, or [`GameError::LockPoisoned`]
    /// converted into `E` if a previous holder panicked.
    pub fn with_state<T, E, F>(&self, f: F) -> Result<T, E>
    where
        F: FnOnce(&mut GameState) -> Result<T, E>,
        E: From<GameError>,
    {
        let Ok(mut state) = self.inner.lock() else {
            return Err(GameError::LockPoisoned.into());
        };
        f(&mut state)
    }

    /// Apply one allocation change under the lock.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the change is rejected or the lock is
    /// poisoned.
    pub fn change_allocation(
        &self,
        allocator: &dyn WaterAllocator,
        asset: AssetId,
        player: PlayerId,
        new_allocation: u64,
        sink: &mut dyn ChangeSink,
    ) -> Result<AllocationChange, AllocationError> {
        self.with_state(|state| {
            allocator.change_allocation(state, asset, player, new_allocation, sink)
        })
    }

    /// Clone the current state.
    ///
    /// # Errors
    ///
    /// Returns [`GameError::LockPoisoned`] if a previous holder panicked.
    pub fn snapshot(&self) -> Result<GameState, GameError> {
        self.with_state(|state| Ok(state.clone()))
    }
}
