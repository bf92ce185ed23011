//! Aggregator over the unfiltered roster

use serde::{Deserialize, Serialize};

use super::filter::PresenceFilter;
use super::normalize::RosterEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct RosterSummary {
    pub total: usize,
    pub present: usize,
    pub absent: usize,
    /// Staff rosters: pre-confirmed attendance
    pub confirmed: usize,
    pub pending: usize,
    /// Present over total, rounded to the nearest integer
    pub percent_present: u32,
}

/// Summary card, each of which doubles as a presence-filter shortcut
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SummaryCard {
    Total,
    Present,
    Absent,
    Confirmed,
    Pending,
}

impl SummaryCard {
    pub fn presence_filter(self) -> PresenceFilter {
        match self {
            SummaryCard::Total => PresenceFilter::Any,
            SummaryCard::Present => PresenceFilter::Present,
            SummaryCard::Absent => PresenceFilter::Absent,
            SummaryCard::Confirmed => PresenceFilter::Confirmed,
            SummaryCard::Pending => PresenceFilter::Pending,
        }
    }
}

pub fn percent(part: usize, total: usize) -> u32 {
    if total == 0 {
        return 0;
    }
    ((part as f64 / total as f64) * 100.0).round() as u32
}

/// Count over the complete roster; filters never reach this
pub fn summarize(roster: &[RosterEntry]) -> RosterSummary {
    let total = roster.len();
    let present = roster.iter().filter(|e| e.present).count();
    let confirmed = roster.iter().filter(|e| e.confirmed).count();
    RosterSummary {
        total,
        present,
        absent: total - present,
        confirmed,
        pending: total - confirmed,
        percent_present: percent(present, total),
    }
}
