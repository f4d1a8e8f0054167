//! Change notification for mutated players, parcels, and assets.
//!
//! Strategies report what they touched through a [`ChangeSink`] once their
//! work is complete, so observers see one consistent update per operation
//! instead of a stream of intermediate states. The engine never depends on
//! who is listening.

use tracing::debug;

use waterwars_types::{AssetId, ParcelId, PlayerId};

/// An entity whose observable state changed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Change {
    /// A player's balance, entitlement, or rights changed.
    Player(PlayerId),
    /// A parcel's water or ownership changed.
    Parcel(ParcelId),
    /// An asset's allocation changed.
    Asset(AssetId),
}

/// Receiver of change notifications.
pub trait ChangeSink: Send {
    /// Called once for each entity mutated by an operation, after the
    /// operation has fully completed.
    fn trigger_changed(&mut self, change: Change);
}

/// A sink that ignores every notification.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoOpSink;

impl ChangeSink for NoOpSink {
    fn trigger_changed(&mut self, _change: Change) {}
}

/// A sink that keeps every notification in order.
#[derive(Debug, Default, Clone)]
pub struct RecordingSink {
    changes: Vec<Change>,
}

impl RecordingSink {
    /// Create an empty recording sink.
    pub const fn new() -> Self {
        Self {
            changes: Vec::new(),
        }
    }

    /// All notifications received so far.
    pub fn changes(&self) -> &[Change] {
        &self.changes
    }

    /// Whether `change` was reported at least once.
    pub fn contains(&self, change: Change) -> bool {
        self.changes.contains(&change)
    }

    /// How many times `change` was reported.
    pub fn count(&self, change: Change) -> usize {
        self.changes.iter().filter(|c| **c == change).count()
    }

    /// Drop all recorded notifications.
    pub fn clear(&mut self) {
        self.changes.clear();
    }
}

impl ChangeSink for RecordingSink {
    fn trigger_changed(&mut self, change: Change) {
        self.changes.push(change);
    }
}

/// A sink that logs every notification at debug level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingSink;

impl ChangeSink for TracingSink {
    fn trigger_changed(&mut self, change: Change) {
        match change {
            Change::Player(id) => debug!(player_id = %id, "Player changed"),
            Change::Parcel(id) => debug!(parcel_id = %id, "Parcel changed"),
            Change::Asset(id) => debug!(asset_id = %id, "Asset changed"),
        }
    }
}
