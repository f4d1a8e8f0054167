//! Water allocators: moving parcel water into and out of assets.
//!
//! An allocation change either fully succeeds or fails before touching
//! anything. On success the allocator reports the player, the asset, and
//! every parcel it touched to the [`ChangeSink`].

pub mod parcel_oriented;

pub use parcel_oriented::ParcelOrientedAllocator;

use waterwars_types::{AssetId, ParcelId, PlayerId};

use crate::error::AllocationError;
use crate::notify::ChangeSink;
use crate::state::GameState;

/// Strategy applying a player's request to change an asset's allocation.
pub trait WaterAllocator: Send + Sync {
    /// Short name for logs.
    fn name(&self) -> &'static str;

    /// Set `asset`'s allocation to `new_allocation` on behalf of `player`.
    ///
    /// # Errors
    ///
    /// Returns [`AllocationError`] if the request is not allowed. The game
    /// is left untouched in that case.
    fn change_allocation(
        &self,
        state: &mut GameState,
        asset: AssetId,
        player: PlayerId,
        new_allocation: u64,
        sink: &mut dyn ChangeSink,
    ) -> Result<AllocationChange, AllocationError>;
}

/// What an allocation change did.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AllocationChange {
    /// The asset whose allocation changed.
    pub asset: AssetId,
    /// The player who asked.
    pub player: PlayerId,
    /// Allocation before the change.
    pub previous: u64,
    /// Allocation after the change.
    pub current: u64,
    /// Water drawn from each parcel, in draw order.
    pub drawn: Vec<(ParcelId, u64)>,
    /// Water returned to each parcel, in return order.
    pub returned: Vec<(ParcelId, u64)>,
    /// Returned water that had no parcel to go back to.
    pub lost: u64,
}

impl AllocationChange {
    /// A change that moves nothing.
    pub const fn unchanged(asset: AssetId, player: PlayerId, allocation: u64) -> Self {
        Self {
            asset,
            player,
            previous: allocation,
            current: allocation,
            drawn: Vec::new(),
            returned: Vec::new(),
            lost: 0,
        }
    }

    /// Whether the request left the allocation as it was.
    pub const fn is_noop(&self) -> bool {
        self.previous == self.current
    }

    /// Total water drawn from parcels.
    pub fn total_drawn(&self) -> u64 {
        self.drawn
            .iter()
            .fold(0_u64, |acc, (_, amount)| acc.saturating_add(*amount))
    }

    /// Total water returned to parcels.
    pub fn total_returned(&self) -> u64 {
        self.returned
            .iter()
            .fold(0_u64, |acc, (_, amount)| acc.saturating_add(*amount))
    }
}

/// Convert a raw requested amount, rejecting negatives.
///
/// # Errors
///
/// Returns [`AllocationError::NegativeAmount`] for any value below zero.
pub const fn requested_amount(raw: i64) -> Result<u64, AllocationError> {
    if raw < 0 {
        return Err(AllocationError::NegativeAmount(raw));
    }
    Ok(raw.unsigned_abs())
}
