//! The water ledger: an append-only log of all water movements.
//!
//! # Design
//!
//! - **Append-only**: entries are never modified or deleted.
//! - **Two-sided**: every entry names where water came from and went to.
//! - **Integer units**: water is counted in whole `u64` units.

use std::collections::BTreeMap;

use tracing::warn;
use uuid::Uuid;

use waterwars_types::{AssetId, LedgerEntry, LedgerEntryType, ParcelId, PlayerId};

use crate::conservation::{verify_conservation, verify_holdings, ConservationResult};
use crate::{LedgerError, TransactionBuilder};

/// The ledger tracking every water movement in a game.
#[derive(Debug, Default, Clone)]
pub struct Ledger {
    /// All entries, in insertion order.
    entries: Vec<LedgerEntry>,
}

impl Ledger {
    /// Create a new empty ledger.
    pub const fn new() -> Self {
        Self {
            entries: Vec::new(),
        }
    }

    /// Return the number of entries in the ledger.
    pub const fn len(&self) -> usize {
        self.entries.len()
    }

    /// Return whether the ledger has no entries.
    pub const fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Append an already validated [`LedgerEntry`].
    ///
    /// Used by callers that build every entry of a multi-step change up
    /// front, so that a validation failure happens before any state moves.
    pub fn append(&mut self, entry: LedgerEntry) {
        self.entries.push(entry);
    }

    /// Validate and append an entry built by `builder`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record(&mut self, builder: TransactionBuilder) -> Result<&LedgerEntry, LedgerError> {
        let entry = builder.build()?;
        self.entries.push(entry);
        self.entries.last().ok_or(LedgerError::InternalError(
            "failed to retrieve entry after append",
        ))
    }

    /// Record distributed rainfall landing on a parcel.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_rainfall(
        &mut self,
        round: u64,
        quantity: u64,
        parcel: ParcelId,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record(TransactionBuilder::rainfall(round, quantity, parcel))
    }

    /// Record parcel water committed to an asset on behalf of `player`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_allocation(
        &mut self,
        round: u64,
        quantity: u64,
        parcel: ParcelId,
        asset: AssetId,
        player: PlayerId,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record(TransactionBuilder::allocation(round, quantity, parcel, asset, player))
    }

    /// Record asset water returned to a parcel on behalf of `player`.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_give_back(
        &mut self,
        round: u64,
        quantity: u64,
        asset: AssetId,
        parcel: ParcelId,
        player: PlayerId,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record(TransactionBuilder::give_back(round, quantity, asset, parcel, player))
    }

    /// Record returned water that had no parcel to go back to.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_forfeit(
        &mut self,
        round: u64,
        quantity: u64,
        asset: AssetId,
        player: PlayerId,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record(TransactionBuilder::forfeit(round, quantity, asset, player))
    }

    /// Record unused parcel water lost when the round resets.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_evaporation(
        &mut self,
        round: u64,
        quantity: u64,
        parcel: ParcelId,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record(TransactionBuilder::evaporation(round, quantity, parcel))
    }

    /// Record water used up by an asset when the round resets.
    ///
    /// # Errors
    ///
    /// Returns [`LedgerError`] if the entry fails validation.
    pub fn record_consumption(
        &mut self,
        round: u64,
        quantity: u64,
        asset: AssetId,
    ) -> Result<&LedgerEntry, LedgerError> {
        self.record(TransactionBuilder::consumption(round, quantity, asset))
    }

    /// Verify that internal movements balance for `round`.
    pub fn verify_conservation(&self, round: u64) -> ConservationResult {
        let result = verify_conservation(round, &self.entries);
        if let ConservationResult::Anomaly(anomaly) = &result {
            warn!(round, %anomaly, "Water ledger internal imbalance");
        }
        result
    }

    /// Verify that `closing` held water matches `opening` plus the round's
    /// recorded inflows and outflows.
    pub fn verify_holdings(&self, round: u64, opening: u128, closing: u128) -> ConservationResult {
        let result = verify_holdings(round, &self.entries, opening, closing);
        if let ConservationResult::Anomaly(anomaly) = &result {
            warn!(round, %anomaly, "Water holdings do not match the ledger");
        }
        result
    }

    /// Return all entries for a given round.
    pub fn entries_for_round(&self, round: u64) -> Vec<&LedgerEntry> {
        self.entries.iter().filter(|e| e.round == round).collect()
    }

    /// Return all entries, in insertion order.
    pub fn all_entries(&self) -> &[LedgerEntry] {
        &self.entries
    }

    /// Net water received by an entity over the whole game.
    ///
    /// Positive means the entity received more than it sent.
    pub fn entity_balance(&self, entity_id: Uuid) -> i128 {
        let mut balance: i128 = 0;

        for entry in &self.entries {
            let quantity = i128::from(entry.quantity);
            if entry.to_entity == Some(entity_id) {
                balance = balance.saturating_add(quantity);
            }
            if entry.from_entity == Some(entity_id) {
                balance = balance.saturating_sub(quantity);
            }
        }

        balance
    }

    /// Total quantity per entry type recorded in `round`.
    pub fn totals_for_round(&self, round: u64) -> BTreeMap<LedgerEntryType, u64> {
        let mut totals: BTreeMap<LedgerEntryType, u64> = BTreeMap::new();
        for entry in &self.entries {
            if entry.round != round {
                continue;
            }
            let v = totals.entry(entry.entry_type).or_insert(0);
            *v = v.saturating_add(entry.quantity);
        }
        totals
    }

    /// Net change in held water during `round`: rainfall minus sinks.
    pub fn net_flow_for_round(&self, round: u64) -> i128 {
        let mut flow: i128 = 0;
        for entry in &self.entries {
            if entry.round != round {
                continue;
            }
            let quantity = i128::from(entry.quantity);
            match entry.entry_type {
                LedgerEntryType::Rainfall => flow = flow.saturating_add(quantity),
                LedgerEntryType::Forfeit
                | LedgerEntryType::Evaporate
                | LedgerEntryType::Consume => flow = flow.saturating_sub(quantity),
                // Internal movements do not change the amount held.
                LedgerEntryType::Allocate | LedgerEntryType::GiveBack => {}
            }
        }
        flow
    }
}
