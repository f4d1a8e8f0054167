//! Append-only water ledger for the WaterWars engine.
//!
//! Every unit of water that lands on a parcel, moves into an asset, comes
//! back out, or leaves the game is recorded here. Water only enters through
//! rainfall and only leaves through forfeit, evaporation, or consumption;
//! everything else is an internal movement that must balance.
//!
//! # Architecture
//!
//! - [`ledger`] -- The [`Ledger`] struct: append-only log with recording methods.
//! - [`transaction`] -- The [`TransactionBuilder`] for validated entry construction.
//! - [`conservation`] -- Per-round balance and holdings verification.
//!
//! # Entry types
//!
//! | Type | From | To | Flow |
//! |------|------|----|------|
//! | Rainfall | World | Parcel | source |
//! | Allocate | Parcel | Asset | internal |
//! | GiveBack | Asset | Parcel | internal |
//! | Forfeit | Asset | Void | sink |
//! | Evaporate | Parcel | Void | sink |
//! | Consume | Asset | Void | sink |
//!
//! # Usage
//!
//! ```
//! use waterwars_ledger::{ConservationResult, Ledger};
//! use waterwars_types::{AssetId, ParcelId, PlayerId};
//!
//! let mut ledger = Ledger::new();
//! let parcel = ParcelId::new();
//! let asset = AssetId::new();
//! let player = PlayerId::new();
//!
//! ledger.record_rainfall(1, 100, parcel).ok();
//! ledger.record_allocation(1, 40, parcel, asset, player).ok();
//!
//! assert_eq!(ledger.verify_conservation(1), ConservationResult::Balanced);
//! assert_eq!(ledger.verify_holdings(1, 0, 100), ConservationResult::Balanced);
//! ```

pub mod conservation;
pub mod ledger;
pub mod transaction;

// Re-export primary types at crate root.
pub use conservation::ConservationResult;
pub use ledger::Ledger;
pub use transaction::TransactionBuilder;

use serde::Serialize;

use waterwars_types::LedgerEntryType;

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can occur when recording ledger entries.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LedgerError {
    /// Quantity must be strictly positive.
    #[error("ledger entry quantity must be non-zero")]
    ZeroQuantity,

    /// A required field was not set on the builder.
    #[error("missing required field: {0}")]
    MissingField(&'static str),

    /// The from/to entity types do not match the expected types for the
    /// entry type.
    #[error("invalid entity for {entry_type:?} {side}: expected {expected}, got {actual}")]
    InvalidEntityType {
        /// The entry type being validated.
        entry_type: LedgerEntryType,
        /// Which side of the entry ("from" or "to").
        side: &'static str,
        /// The expected entity type.
        expected: String,
        /// The actual entity type.
        actual: String,
    },

    /// An internal error that should not occur in normal operation.
    #[error("internal ledger error: {0}")]
    InternalError(&'static str),
}

// ---------------------------------------------------------------------------
// Anomaly type
// ---------------------------------------------------------------------------

/// A conservation violation detected while verifying a round.
///
/// `expected` and `actual` are the two totals that should have matched:
/// debits and credits for the balance check, or computed and observed
/// closing holdings for the holdings check.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LedgerAnomaly {
    /// The round where the anomaly was detected.
    pub round: u64,
    /// The total the ledger says there should be.
    pub expected: u128,
    /// The total that was actually found.
    pub actual: u128,
    /// Human-readable description of the anomaly.
    pub message: String,
}

impl core::fmt::Display for LedgerAnomaly {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        write!(f, "{}", self.message)
    }
}
