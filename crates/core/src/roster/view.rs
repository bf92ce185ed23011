//! Roster view state
//!
//! The whole table state (filters, sort, page, visible columns) lives in one
//! serializable struct. `derive` is a pure function of that state and a
//! roster snapshot, so any front end can drive it.

use std::collections::{BTreeMap, BTreeSet};

use serde::{Deserialize, Serialize};

use super::columns::VisibleColumns;
use super::filter::{compare_groups, PresenceFilter, RosterFilter};
use super::normalize::RosterEntry;
use super::page::{page_count, slice, Pagination};
use super::sort::{compare_collated, SortField, SortState};
use super::summary::{summarize, RosterSummary, SummaryCard};
use crate::error::Result;
use crate::invariants;
use crate::models::EventKind;

/// One derived table page
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterPage {
    pub rows: Vec<RosterEntry>,
    /// Clamped 1-based page actually shown
    pub page: usize,
    pub page_count: usize,
    pub filtered_total: usize,
    /// Computed over the unfiltered roster
    pub summary: RosterSummary,
}

/// Distinct values offered by the filter dropdowns
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Facets {
    pub institutions: Vec<String>,
    pub programs_by_institution: BTreeMap<String, Vec<String>>,
    pub programs: Vec<String>,
    pub departments: Vec<String>,
    pub groups: Vec<String>,
    pub seats: Vec<String>,
}

fn distinct<'a>(values: impl Iterator<Item = &'a Option<String>>) -> Vec<String> {
    let set: BTreeSet<String> = values
        .filter_map(|v| v.as_deref().map(str::trim))
        .filter(|v| !v.is_empty())
        .map(str::to_string)
        .collect();
    let mut values: Vec<String> = set.into_iter().collect();
    values.sort_by(|a, b| compare_collated(a, b));
    values
}

impl Facets {
    pub fn from_roster(roster: &[RosterEntry]) -> Self {
        let mut programs_by_institution: BTreeMap<String, Vec<String>> = BTreeMap::new();
        for entry in roster {
            let institution = entry.institution.as_deref().map(str::trim).unwrap_or_default();
            let program = entry.program.as_deref().map(str::trim).unwrap_or_default();
            if institution.is_empty() || program.is_empty() {
                continue;
            }
            let programs = programs_by_institution
                .entry(institution.to_string())
                .or_default();
            if !programs.iter().any(|p| p == program) {
                programs.push(program.to_string());
            }
        }
        for programs in programs_by_institution.values_mut() {
            programs.sort_by(|a, b| compare_collated(a, b));
        }

        let mut groups = distinct(roster.iter().map(|e| &e.group));
        groups.sort_by(|a, b| compare_groups(a, b));
        groups.dedup_by(|a, b| compare_groups(a, b).is_eq());

        Self {
            institutions: distinct(roster.iter().map(|e| &e.institution)),
            programs_by_institution,
            programs: distinct(roster.iter().map(|e| &e.program)),
            departments: distinct(roster.iter().map(|e| &e.department)),
            groups,
            seats: distinct(roster.iter().map(|e| &e.seat)),
        }
    }

    /// Programs offered once an institution is chosen
    pub fn programs_for(&self, institution: Option<&str>) -> &[String] {
        match institution.map(str::trim).filter(|i| !i.is_empty()) {
            Some(i) => self
                .programs_by_institution
                .get(i)
                .map(Vec::as_slice)
                .unwrap_or_default(),
            None => &self.programs,
        }
    }
}

fn blank_to_none(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterView {
    filter: RosterFilter,
    sort: SortState,
    pagination: Pagination,
    columns: VisibleColumns,
}

impl RosterView {
    pub fn new(kind: EventKind) -> Self {
        Self {
            filter: RosterFilter::default(),
            sort: SortState::by(SortField::GivenNames),
            pagination: Pagination::default(),
            columns: VisibleColumns::all(kind),
        }
    }

    pub fn with_page_size(kind: EventKind, size: usize) -> Result<Self> {
        let mut view = Self::new(kind);
        view.pagination.set_size(size)?;
        Ok(view)
    }

    pub fn filter(&self) -> &RosterFilter {
        &self.filter
    }

    pub fn sort(&self) -> SortState {
        self.sort
    }

    pub fn pagination(&self) -> Pagination {
        self.pagination
    }

    pub fn columns(&self) -> &VisibleColumns {
        &self.columns
    }

    pub fn columns_mut(&mut self) -> &mut VisibleColumns {
        &mut self.columns
    }

    pub fn kind(&self) -> EventKind {
        self.columns.kind()
    }

    /// Replace the whole filter state
    pub fn set_filter(&mut self, filter: RosterFilter) {
        self.filter = filter;
        self.pagination.reset();
    }

    fn update_filter(&mut self, f: impl FnOnce(&mut RosterFilter)) {
        f(&mut self.filter);
        self.pagination.reset();
    }

    pub fn set_search(&mut self, text: &str) {
        self.update_filter(|f| f.search = blank_to_none(text));
    }

    pub fn set_id_prefix(&mut self, prefix: &str) {
        self.update_filter(|f| f.id_prefix = blank_to_none(prefix));
    }

    /// Choosing an institution also clears the program, whose options depend on it
    pub fn set_institution(&mut self, institution: &str) {
        self.update_filter(|f| {
            f.institution = blank_to_none(institution);
            f.program = None;
        });
    }

    pub fn set_program(&mut self, program: &str) {
        self.update_filter(|f| f.program = blank_to_none(program));
    }

    pub fn set_department(&mut self, department: &str) {
        self.update_filter(|f| f.department = blank_to_none(department));
    }

    pub fn set_group(&mut self, group: &str) {
        self.update_filter(|f| f.group = blank_to_none(group));
    }

    pub fn set_seat(&mut self, seat: &str) {
        self.update_filter(|f| f.seat = blank_to_none(seat));
    }

    pub fn set_given_names(&mut self, given: &str) {
        self.update_filter(|f| f.given_names = blank_to_none(given));
    }

    pub fn set_family_names(&mut self, family: &str) {
        self.update_filter(|f| f.family_names = blank_to_none(family));
    }

    pub fn set_presence(&mut self, presence: PresenceFilter) {
        self.update_filter(|f| f.presence = presence);
    }

    /// Summary-card shortcut
    pub fn select_card(&mut self, card: SummaryCard) {
        self.set_presence(card.presence_filter());
    }

    pub fn clear_filters(&mut self) {
        self.set_filter(RosterFilter::default());
    }

    pub fn select_sort(&mut self, field: SortField) {
        self.sort.select(field);
    }

    pub fn set_page_size(&mut self, size: usize) -> Result<()> {
        self.pagination.set_size(size)
    }

    pub fn go_to_page(&mut self, page: usize) {
        self.pagination.go_to(page);
    }

    pub fn next_page(&mut self, filtered_total: usize) {
        self.pagination.next(filtered_total);
    }

    pub fn previous_page(&mut self) {
        self.pagination.previous();
    }

    /// Filter, sort and slice a snapshot; summarize it unfiltered
    pub fn derive(&self, roster: &[RosterEntry]) -> RosterPage {
        let mut matching = self.filter.apply(roster);
        self.sort.apply(&mut matching);

        let filtered_total = matching.len();
        let size = self.pagination.size();
        let page = self.pagination.clamped(filtered_total);
        let rows = slice(&matching, page, size)
            .iter()
            .map(|e| (*e).clone())
            .collect();

        let derived = RosterPage {
            rows,
            page,
            page_count: page_count(filtered_total, size),
            filtered_total,
            summary: summarize(roster),
        };
        invariants::assert_page_invariants(&derived, size);
        derived
    }

    /// Store the clamped page of a derived result back into the state
    pub fn sync(&mut self, derived: &RosterPage) {
        self.pagination.clamp_to(derived.filtered_total);
    }

    /// The full filtered and sorted sequence, without pagination
    pub fn matching(&self, roster: &[RosterEntry]) -> Vec<RosterEntry> {
        let mut matching = self.filter.apply(roster);
        self.sort.apply(&mut matching);
        matching.into_iter().cloned().collect()
    }
}
