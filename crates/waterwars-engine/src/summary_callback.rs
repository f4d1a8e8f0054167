//! Round callback that logs each round's results.
//!
//! Every summary is logged as structured fields at info level and as one
//! JSON line at debug level, and each player's standing is logged after
//! it. The callback also keeps the summaries for the end-of-game report.

use rust_decimal::Decimal;
use tracing::{debug, info, warn};

use waterwars_core::round::{RoundCallback, RoundSummary};
use waterwars_water::GameState;

/// Callback that logs round summaries and keeps them.
#[derive(Debug, Default)]
pub struct SummaryLog {
    summaries: Vec<RoundSummary>,
}

impl SummaryLog {
    /// Create an empty log.
    pub const fn new() -> Self {
        Self {
            summaries: Vec::new(),
        }
    }

    /// Summaries received so far, oldest first.
    pub fn summaries(&self) -> &[RoundSummary] {
        &self.summaries
    }

    /// Revenue earned over every round so far.
    pub fn total_revenue(&self) -> Decimal {
        self.summaries
            .iter()
            .fold(Decimal::ZERO, |acc, s| acc.saturating_add(s.total_revenue))
    }
}

impl RoundCallback for SummaryLog {
    fn on_round(&mut self, summary: &RoundSummary, state: &GameState) {
        info!(
            round = summary.round,
            generated = summary.generated,
            rainfall = summary.rainfall,
            allocated = summary.allocated,
            evaporated = summary.evaporated,
            consumed = summary.consumed,
            forfeited = summary.forfeited,
            revenue = %summary.total_revenue,
            "Round complete"
        );
        match serde_json::to_string(summary) {
            Ok(json) => debug!(summary = %json, "Round summary"),
            Err(e) => warn!(error = %e, "failed to serialize round summary"),
        }
        for player in state.players().values() {
            info!(
                player = player.name,
                entitlement = player.water_entitlement,
                unspent_water = player.water,
                money = %player.money,
                "Player standing"
            );
        }
        self.summaries.push(summary.clone());
    }
}
