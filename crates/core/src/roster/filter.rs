//! Filter predicate set
//!
//! Every predicate is optional; an unset or blank value never filters.
//! A record is kept only when all active predicates hold.

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::normalize::RosterEntry;

/// Presence-state predicate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PresenceFilter {
    #[default]
    Any,
    Present,
    Absent,
    /// Staff: pre-confirmed attendance
    Confirmed,
    /// Staff: no pre-confirmation
    Pending,
}

impl PresenceFilter {
    pub fn matches(&self, entry: &RosterEntry) -> bool {
        match self {
            PresenceFilter::Any => true,
            PresenceFilter::Present => entry.present,
            PresenceFilter::Absent => !entry.present,
            PresenceFilter::Confirmed => entry.confirmed,
            PresenceFilter::Pending => !entry.confirmed,
        }
    }
}

/// The full filter state of a roster table
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RosterFilter {
    #[serde(default)]
    pub presence: PresenceFilter,
    /// Free text matched against id, given, full and family names
    #[serde(default)]
    pub search: Option<String>,
    /// Case-insensitive prefix of the national id
    #[serde(default)]
    pub id_prefix: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub seat: Option<String>,
    #[serde(default)]
    pub given_names: Option<String>,
    #[serde(default)]
    pub family_names: Option<String>,
}

/// The value of an optional text predicate, or None when it should not filter
fn active(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn contains_folded(haystack: &str, needle_lower: &str) -> bool {
    haystack.to_lowercase().contains(needle_lower)
}

fn equals_exact(field: &Option<String>, wanted: &str) -> bool {
    field.as_deref().map(str::trim) == Some(wanted)
}

/// Compare group labels: numerically when both are numbers, else case-insensitively
pub fn compare_groups(a: &str, b: &str) -> Ordering {
    let (a, b) = (a.trim(), b.trim());
    match (a.parse::<f64>(), b.parse::<f64>()) {
        (Ok(x), Ok(y)) => x.partial_cmp(&y).unwrap_or(Ordering::Equal),
        (Ok(_), Err(_)) => Ordering::Less,
        (Err(_), Ok(_)) => Ordering::Greater,
        (Err(_), Err(_)) => a.to_lowercase().cmp(&b.to_lowercase()),
    }
}

impl RosterFilter {
    /// True when no predicate is active
    pub fn is_empty(&self) -> bool {
        self.presence == PresenceFilter::Any
            && [
                &self.search,
                &self.id_prefix,
                &self.institution,
                &self.program,
                &self.department,
                &self.group,
                &self.seat,
                &self.given_names,
                &self.family_names,
            ]
            .iter()
            .all(|v| active(v).is_none())
    }

    /// Evaluate every active predicate against one entry
    pub fn matches(&self, entry: &RosterEntry) -> bool {
        if !self.presence.matches(entry) {
            return false;
        }

        if let Some(search) = active(&self.search) {
            let needle = search.to_lowercase();
            let hit = contains_folded(&entry.national_id, &needle)
                || contains_folded(&entry.given_names, &needle)
                || contains_folded(&entry.full_name, &needle)
                || contains_folded(&entry.family_names, &needle);
            if !hit {
                return false;
            }
        }

        if let Some(prefix) = active(&self.id_prefix) {
            if !entry
                .national_id
                .to_lowercase()
                .starts_with(&prefix.to_lowercase())
            {
                return false;
            }
        }

        if let Some(institution) = active(&self.institution) {
            if !equals_exact(&entry.institution, institution) {
                return false;
            }
        }

        if let Some(program) = active(&self.program) {
            if !equals_exact(&entry.program, program) {
                return false;
            }
        }

        if let Some(department) = active(&self.department) {
            if !equals_exact(&entry.department, department) {
                return false;
            }
        }

        if let Some(seat) = active(&self.seat) {
            if !equals_exact(&entry.seat, seat) {
                return false;
            }
        }

        if let Some(group) = active(&self.group) {
            let same = entry
                .group
                .as_deref()
                .is_some_and(|g| compare_groups(g, group) == Ordering::Equal);
            if !same {
                return false;
            }
        }

        if let Some(given) = active(&self.given_names) {
            if !contains_folded(&entry.given_names, &given.to_lowercase()) {
                return false;
            }
        }

        if let Some(family) = active(&self.family_names) {
            if !contains_folded(&entry.family_names, &family.to_lowercase()) {
                return false;
            }
        }

        true
    }

    /// Keep the entries matching every active predicate, in input order
    pub fn apply<'a>(&self, roster: &'a [RosterEntry]) -> Vec<&'a RosterEntry> {
        roster.iter().filter(|e| self.matches(e)).collect()
    }
}
