//! In-memory roster pipeline
//!
//! Snapshot → normalize → (filter → sort → paginate) for the table, and
//! summarize for the cards, over the same unfiltered snapshot.

mod columns;
mod filter;
mod normalize;
mod page;
mod sort;
mod summary;
mod view;

pub use columns::{format_timestamp, yes_no, Column, VisibleColumns, PLACEHOLDER};
pub use filter::{compare_groups, PresenceFilter, RosterFilter};
pub use normalize::{normalize, normalize_all, split_full_name, RosterEntry};
pub use page::{page_count, slice, Pagination, DEFAULT_PAGE_SIZE, PAGE_SIZE_OPTIONS};
pub use sort::{collation_key, compare_collated, SortDirection, SortField, SortState};
pub use summary::{percent, summarize, RosterSummary, SummaryCard};
pub use view::{Facets, RosterPage, RosterView};

#[cfg(test)]
pub(crate) mod testing {
    use uuid::Uuid;

    use super::RosterEntry;

    pub fn entry(national_id: &str, given: &str, family: &str, present: bool) -> RosterEntry {
        RosterEntry {
            id: Uuid::new_v4(),
            event_id: Uuid::nil(),
            national_id: national_id.to_string(),
            given_names: given.to_string(),
            family_names: family.to_string(),
            full_name: format!("{} {}", given, family),
            program: None,
            institution: None,
            department: None,
            seat: None,
            group: None,
            present,
            confirmed: false,
            observation: None,
            checked_in_at: None,
        }
    }
}
