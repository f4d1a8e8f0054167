//! Conservation verification for the water ledger.
//!
//! Two checks run per round:
//!
//! - [`verify_conservation`]: internal movements (`Allocate`, `GiveBack`)
//!   must debit exactly what they credit. Each well-formed entry adds its
//!   quantity to both sides, so this only fails on corrupted entries or
//!   arithmetic overflow.
//! - [`verify_holdings`]: the water held at the end of a round must equal
//!   what was held at the start plus rainfall minus every sink flow:
//!
//! ```text
//! opening + rainfall - (forfeit + evaporate + consume) == closing
//! ```
//!
//! The holdings check is what catches water created or destroyed outside
//! the ledger, e.g. a distributor or allocator that mutates a balance
//! without recording it.

use serde::Serialize;

use waterwars_types::{EntityType, LedgerEntry, LedgerEntryType};

use crate::LedgerAnomaly;

/// The result of a conservation check for a single round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum ConservationResult {
    /// The ledger is balanced for this round.
    Balanced,
    /// The round's flows do not add up.
    Anomaly(LedgerAnomaly),
}

impl ConservationResult {
    /// Whether the check passed.
    pub const fn is_balanced(&self) -> bool {
        matches!(self, Self::Balanced)
    }
}

/// Returns `true` if the entry type moves water without creating or
/// destroying it.
pub const fn is_internal(entry_type: LedgerEntryType) -> bool {
    matches!(
        entry_type,
        LedgerEntryType::Allocate | LedgerEntryType::GiveBack
    )
}

/// Returns `true` if the entry type removes water from the game.
pub const fn is_sink(entry_type: LedgerEntryType) -> bool {
    matches!(
        entry_type,
        LedgerEntryType::Forfeit | LedgerEntryType::Evaporate | LedgerEntryType::Consume
    )
}

/// Verify that internal movements balance for `round`.
///
/// An internal entry whose sides are not both held entities (parcel or
/// asset) counts only towards the side it does have, which is how a
/// corrupted entry shows up as an imbalance.
pub fn verify_conservation(round: u64, entries: &[LedgerEntry]) -> ConservationResult {
    let mut credit: u128 = 0;
    let mut debit: u128 = 0;

    for entry in entries {
        if entry.round != round || !is_internal(entry.entry_type) {
            continue;
        }

        let quantity = u128::from(entry.quantity);
        if is_held(entry.to_entity_type) {
            credit = match credit.checked_add(quantity) {
                Some(val) => val,
                None => return overflow_anomaly(round),
            };
        }
        if is_held(entry.from_entity_type) {
            debit = match debit.checked_add(quantity) {
                Some(val) => val,
                None => return overflow_anomaly(round),
            };
        }
    }

    if credit == debit {
        ConservationResult::Balanced
    } else {
        ConservationResult::Anomaly(LedgerAnomaly {
            round,
            expected: debit,
            actual: credit,
            message: format!(
                "LEDGER_ANOMALY in round {round}: internal debits {debit} != credits {credit}",
            ),
        })
    }
}

/// Verify that held water at the end of `round` matches the ledger.
///
/// `opening` and `closing` are the total water sitting on parcels and
/// assets before and after the round's movements.
pub fn verify_holdings(
    round: u64,
    entries: &[LedgerEntry],
    opening: u128,
    closing: u128,
) -> ConservationResult {
    let mut inflow: u128 = 0;
    let mut outflow: u128 = 0;

    for entry in entries {
        if entry.round != round {
            continue;
        }
        let quantity = u128::from(entry.quantity);
        if entry.entry_type == LedgerEntryType::Rainfall {
            inflow = match inflow.checked_add(quantity) {
                Some(val) => val,
                None => return overflow_anomaly(round),
            };
        } else if is_sink(entry.entry_type) {
            outflow = match outflow.checked_add(quantity) {
                Some(val) => val,
                None => return overflow_anomaly(round),
            };
        }
    }

    let Some(expected) = opening
        .checked_add(inflow)
        .and_then(|total| total.checked_sub(outflow))
    else {
        return ConservationResult::Anomaly(LedgerAnomaly {
            round,
            expected: 0,
            actual: closing,
            message: format!(
                "LEDGER_ANOMALY in round {round}: {outflow} units left the game but only \
                 {opening} + {inflow} were ever held",
            ),
        });
    };

    if expected == closing {
        ConservationResult::Balanced
    } else {
        ConservationResult::Anomaly(LedgerAnomaly {
            round,
            expected,
            actual: closing,
            message: format!(
                "LEDGER_ANOMALY in round {round}: expected {expected} units held, found {closing}",
            ),
        })
    }
}

const fn is_held(entity_type: Option<EntityType>) -> bool {
    matches!(entity_type, Some(EntityType::Parcel | EntityType::Asset))
}

/// Construct an anomaly result for arithmetic overflow during summation.
fn overflow_anomaly(round: u64) -> ConservationResult {
    ConservationResult::Anomaly(LedgerAnomaly {
        round,
        expected: 0,
        actual: 0,
        message: format!("LEDGER_ANOMALY in round {round}: arithmetic overflow while summing"),
    })
}

#[cfg(test)]
mod tests {
    use chrono::Utc;
    use uuid::Uuid;

    use waterwars_types::LedgerEntryId;

    use super::*;
    use crate::transaction::expected_entity_types;

    /// Helper to create a ledger entry without going through the builder.
    fn make_entry(round: u64, entry_type: LedgerEntryType, quantity: u64) -> LedgerEntry {
        let (from_type, to_type) = expected_entity_types(entry_type);
        LedgerEntry {
            id: LedgerEntryId::new(),
            round,
            entry_type,
            from_entity: Some(Uuid::now_v7()),
            from_entity_type: Some(from_type),
            to_entity: Some(Uuid::now_v7()),
            to_entity_type: Some(to_type),
            quantity,
            reason: format!("{entry_type:?}"),
            reference_id: None,
            created_at: Utc::now(),
        }
    }

    #[test]
    fn empty_round_is_balanced() {
        assert_eq!(verify_conservation(1, &[]), ConservationResult::Balanced);
        assert_eq!(verify_holdings(1, &[], 7, 7), ConservationResult::Balanced);
    }

    #[test]
    fn allocate_and_give_back_balance() {
        let entries = vec![
            make_entry(1, LedgerEntryType::Allocate, 30),
            make_entry(1, LedgerEntryType::GiveBack, 12),
        ];
        assert_eq!(verify_conservation(1, &entries), ConservationResult::Balanced);
    }

    #[test]
    fn corrupted_internal_entry_is_an_anomaly() {
        let mut entry = make_entry(1, LedgerEntryType::Allocate, 30);
        entry.to_entity_type = Some(EntityType::Void);
        let result = verify_conservation(1, &[entry]);
        assert!(matches!(
            result,
            ConservationResult::Anomaly(LedgerAnomaly { expected: 30, actual: 0, .. })
        ));
    }

    #[test]
    fn holdings_track_rainfall_and_sinks() {
        let entries = vec![
            make_entry(2, LedgerEntryType::Rainfall, 100),
            make_entry(2, LedgerEntryType::Allocate, 60),
            make_entry(2, LedgerEntryType::Forfeit, 10),
            make_entry(2, LedgerEntryType::Evaporate, 5),
        ];
        // 20 held before, +100 rain, -15 lost.
        assert_eq!(verify_holdings(2, &entries, 20, 105), ConservationResult::Balanced);
    }

    #[test]
    fn unrecorded_water_is_detected() {
        let entries = vec![make_entry(1, LedgerEntryType::Rainfall, 100)];
        let result = verify_holdings(1, &entries, 0, 103);
        assert!(!result.is_balanced());
        if let ConservationResult::Anomaly(anomaly) = result {
            assert_eq!(anomaly.expected, 100);
            assert_eq!(anomaly.actual, 103);
            assert!(anomaly.message.contains("LEDGER_ANOMALY"));
        }
    }

    #[test]
    fn sinks_exceeding_holdings_are_detected() {
        let entries = vec![make_entry(1, LedgerEntryType::Consume, 50)];
        let result = verify_holdings(1, &entries, 10, 0);
        assert!(!result.is_balanced());
    }

    #[test]
    fn entries_from_other_rounds_are_ignored() {
        let entries = vec![
            make_entry(1, LedgerEntryType::Rainfall, 10),
            make_entry(2, LedgerEntryType::Rainfall, 99),
        ];
        assert_eq!(verify_holdings(1, &entries, 0, 10), ConservationResult::Balanced);
    }

    #[test]
    fn internal_and_sink_classification() {
        assert!(is_internal(LedgerEntryType::Allocate));
        assert!(is_internal(LedgerEntryType::GiveBack));
        assert!(!is_internal(LedgerEntryType::Rainfall));
        assert!(is_sink(LedgerEntryType::Forfeit));
        assert!(is_sink(LedgerEntryType::Evaporate));
        assert!(is_sink(LedgerEntryType::Consume));
        assert!(!is_sink(LedgerEntryType::Rainfall));
    }

    #[test]
    fn anomaly_serializes_for_reporting() {
        let result = verify_holdings(4, &[], 1, 2);
        let json = serde_json::to_string(&result).unwrap_or_default();
        assert!(json.contains("\"round\":4"));
    }
}
