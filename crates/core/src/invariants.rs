//! Developer guardrails and invariants
//!
//! Debug assertions for detecting impossible states during development.
//! These checks are compiled out in release builds.

use std::collections::HashSet;

use uuid::Uuid;

use crate::models::Event;
use crate::national_id;
use crate::roster::{RosterEntry, RosterPage};

/// At most one event may be active
pub fn assert_event_list_invariants(events: &[Event]) {
    let active = events.iter().filter(|e| e.active).count();
    debug_assert!(active <= 1, "{} events are active at once", active);

    for event in events {
        debug_assert!(!event.name.trim().is_empty(), "Event {} has empty name", event.id);
        debug_assert!(
            event.ends_at >= event.starts_at,
            "Event {} ends before it starts",
            event.id
        );
    }
}

/// National ids are non-empty and unique within a roster
pub fn assert_roster_invariants(event_id: Uuid, roster: &[RosterEntry]) {
    let mut seen = HashSet::with_capacity(roster.len());
    for entry in roster {
        debug_assert!(
            entry.event_id == event_id,
            "Attendee {} of event {} found in roster of {}",
            entry.id,
            entry.event_id,
            event_id
        );

        let key = national_id::clean(&entry.national_id);
        debug_assert!(!key.is_empty(), "Attendee {} has empty national id", entry.id);
        let first = seen.insert(key);
        debug_assert!(
            first,
            "National id {} appears twice in roster of {}",
            entry.national_id,
            event_id
        );

        debug_assert!(
            entry.present || entry.checked_in_at.is_none(),
            "Attendee {} has a check-in time but is not present",
            entry.id
        );
    }
}

/// A derived page never exceeds its bounds
pub fn assert_page_invariants(page: &RosterPage, page_size: usize) {
    debug_assert!(
        page.page >= 1 && page.page <= page.page_count,
        "Page {} outside 1..={}",
        page.page,
        page.page_count
    );
    debug_assert!(
        page.rows.len() <= page_size,
        "Page holds {} rows, size is {}",
        page.rows.len(),
        page_size
    );
    debug_assert!(
        page.filtered_total <= page.summary.total,
        "Filter produced {} rows from a roster of {}",
        page.filtered_total,
        page.summary.total
    );
    debug_assert!(
        page.summary.present + page.summary.absent == page.summary.total,
        "Summary counts do not add up"
    );
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{EventDraft, EventKind};
    use crate::roster::testing::entry;
    use chrono::{Duration, Utc};

    fn event(active: bool) -> Event {
        let starts_at = Utc::now();
        let mut event = Event::from_draft(&EventDraft {
            name: "Charla".into(),
            description: None,
            starts_at,
            ends_at: starts_at + Duration::hours(1),
            kind: EventKind::Students,
            activate: false,
        })
        .unwrap();
        event.active = active;
        event
    }

    #[test]
    fn test_single_active_event() {
        assert_event_list_invariants(&[event(true), event(false)]);
    }

    #[test]
    #[should_panic(expected = "active at once")]
    fn test_two_active_events() {
        assert_event_list_invariants(&[event(true), event(true)]);
    }

    #[test]
    fn test_valid_roster() {
        let roster = vec![entry("1-9", "Ana", "López", false), entry("2-7", "Luis", "Soto", true)];
        assert_roster_invariants(Uuid::nil(), &roster);
    }

    #[test]
    #[should_panic(expected = "appears twice")]
    fn test_duplicate_ids() {
        let roster = vec![entry("1-9", "Ana", "López", false), entry("1.9", "Luis", "Soto", true)];
        assert_roster_invariants(Uuid::nil(), &roster);
    }
}
