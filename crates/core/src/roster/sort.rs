//! Sort comparator over given or family names

use std::cmp::Ordering;

use serde::{Deserialize, Serialize};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;

use super::normalize::RosterEntry;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortField {
    GivenNames,
    FamilyNames,
}

impl SortField {
    fn key<'a>(&self, entry: &'a RosterEntry) -> &'a str {
        match self {
            SortField::GivenNames => &entry.given_names,
            SortField::FamilyNames => &entry.family_names,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    #[default]
    Ascending,
    Descending,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Ascending => SortDirection::Descending,
            SortDirection::Descending => SortDirection::Ascending,
        }
    }
}

/// Current sort selection; `None` keeps the input order
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SortState {
    pub field: Option<SortField>,
    pub direction: SortDirection,
}

impl SortState {
    pub fn by(field: SortField) -> Self {
        Self {
            field: Some(field),
            direction: SortDirection::Ascending,
        }
    }

    /// Select a column header: a repeated field flips, a new one starts ascending
    pub fn select(&mut self, field: SortField) {
        if self.field == Some(field) {
            self.direction = self.direction.flipped();
        } else {
            self.field = Some(field);
            self.direction = SortDirection::Ascending;
        }
    }

    /// Stable sort in place
    pub fn apply(&self, rows: &mut [&RosterEntry]) {
        let Some(field) = self.field else {
            return;
        };
        let descending = self.direction == SortDirection::Descending;
        rows.sort_by(|a, b| {
            let ord = compare_collated(field.key(a), field.key(b));
            if descending {
                ord.reverse()
            } else {
                ord
            }
        });
    }
}

/// Primary collation key: trimmed, accents stripped, case-folded
pub fn collation_key(value: &str) -> String {
    value
        .trim()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect::<String>()
        .to_lowercase()
}

/// Compare like a Spanish-locale collator at the level the roster needs:
/// diacritics sort next to their base letter and case is ignored.
/// Accented forms follow unaccented ones when the base letters tie.
pub fn compare_collated(a: &str, b: &str) -> Ordering {
    collation_key(a).cmp(&collation_key(b)).then_with(|| {
        let a: String = a.trim().nfd().collect::<String>().to_lowercase();
        let b: String = b.trim().nfd().collect::<String>().to_lowercase();
        a.cmp(&b)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::testing::entry;

    fn given_names(rows: &[&RosterEntry]) -> Vec<String> {
        rows.iter().map(|e| e.given_names.clone()).collect()
    }

    #[test]
    fn test_diacritics_sort_beside_base_letter() {
        assert_eq!(compare_collated("Álvaro", "Beatriz"), Ordering::Less);
        assert_eq!(compare_collated("  ñandú", "Ñandu"), Ordering::Greater);
        assert_eq!(compare_collated("Ana", "ana"), Ordering::Equal);
        assert_eq!(collation_key(" Éric "), "eric");
    }

    #[test]
    fn test_toggle_cycle() {
        let mut state = SortState::default();
        state.select(SortField::GivenNames);
        assert_eq!(state, SortState::by(SortField::GivenNames));

        state.select(SortField::GivenNames);
        assert_eq!(state.direction, SortDirection::Descending);

        state.select(SortField::FamilyNames);
        assert_eq!(state.field, Some(SortField::FamilyNames));
        assert_eq!(state.direction, SortDirection::Ascending);
    }

    #[test]
    fn test_ties_keep_input_order() {
        let roster = vec![
            entry("1", "Zoe", "A", false),
            entry("2", "ana", "B", false),
            entry("3", "Ana", "C", false),
            entry("4", "beto", "D", false),
        ];
        let mut rows: Vec<&RosterEntry> = roster.iter().collect();
        SortState::by(SortField::GivenNames).apply(&mut rows);
        assert_eq!(given_names(&rows), ["ana", "Ana", "beto", "Zoe"]);

        let mut rows: Vec<&RosterEntry> = roster.iter().collect();
        SortState {
            field: Some(SortField::GivenNames),
            direction: SortDirection::Descending,
        }
        .apply(&mut rows);
        assert_eq!(given_names(&rows), ["Zoe", "beto", "ana", "Ana"]);
    }

    #[test]
    fn test_unsorted_keeps_order() {
        let roster = vec![entry("1", "Zoe", "A", false), entry("2", "ana", "B", false)];
        let mut rows: Vec<&RosterEntry> = roster.iter().collect();
        SortState::default().apply(&mut rows);
        assert_eq!(given_names(&rows), ["Zoe", "ana"]);
    }
}
