//! Roster columns, their labels and the visible set

use std::collections::BTreeSet;

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};

use super::normalize::RosterEntry;
use crate::models::EventKind;

/// Placeholder rendered in tables for missing optional fields
pub const PLACEHOLDER: &str = "-";

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Column {
    Confirmed,
    NationalId,
    GivenNames,
    FamilyNames,
    FullName,
    Program,
    Institution,
    Department,
    Seat,
    Group,
    Present,
    Observation,
    CheckedInAt,
}

const STUDENT_COLUMNS: [Column; 10] = [
    Column::NationalId,
    Column::GivenNames,
    Column::FamilyNames,
    Column::FullName,
    Column::Program,
    Column::Institution,
    Column::Seat,
    Column::Group,
    Column::Present,
    Column::CheckedInAt,
];

const STAFF_COLUMNS: [Column; 8] = [
    Column::Confirmed,
    Column::Present,
    Column::NationalId,
    Column::GivenNames,
    Column::FamilyNames,
    Column::Department,
    Column::Observation,
    Column::CheckedInAt,
];

pub fn yes_no(value: bool) -> &'static str {
    if value {
        "Sí"
    } else {
        "No"
    }
}

/// Check-in timestamp as shown to people, in local time
pub fn format_timestamp(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local)
        .format("%d/%m/%Y %H:%M:%S")
        .to_string()
}

impl Column {
    /// Columns of a roster kind, in table and export order
    pub fn for_kind(kind: EventKind) -> &'static [Column] {
        match kind {
            EventKind::Students => &STUDENT_COLUMNS,
            EventKind::Staff => &STAFF_COLUMNS,
        }
    }

    /// Stable identifier used by front ends and on the wire
    pub fn key(self) -> &'static str {
        match self {
            Column::Confirmed => "confirmed",
            Column::NationalId => "national_id",
            Column::GivenNames => "given_names",
            Column::FamilyNames => "family_names",
            Column::FullName => "full_name",
            Column::Program => "program",
            Column::Institution => "institution",
            Column::Department => "department",
            Column::Seat => "seat",
            Column::Group => "group",
            Column::Present => "present",
            Column::Observation => "observation",
            Column::CheckedInAt => "checked_in_at",
        }
    }

    pub fn from_key(key: &str) -> Option<Column> {
        STUDENT_COLUMNS
            .iter()
            .chain(STAFF_COLUMNS.iter())
            .copied()
            .find(|c| c.key() == key)
    }

    pub fn header(self) -> &'static str {
        match self {
            Column::Confirmed => "Asiste (Pre confirmación)",
            Column::NationalId => "RUT",
            Column::GivenNames => "Nombres",
            Column::FamilyNames => "Apellidos",
            Column::FullName => "Nombre Completo",
            Column::Program => "Carrera",
            Column::Institution => "Institución",
            Column::Department => "Departamento",
            Column::Seat => "Asiento",
            Column::Group => "N° de Lista",
            Column::Present => "Presente",
            Column::Observation => "Observación",
            Column::CheckedInAt => "Fecha y Hora de Registro",
        }
    }

    /// Spreadsheet width in characters
    pub fn width(self) -> u16 {
        match self {
            Column::Present | Column::Seat => 10,
            Column::Group => 12,
            Column::NationalId => 15,
            Column::Confirmed | Column::GivenNames | Column::FamilyNames | Column::Institution => 20,
            Column::Program | Column::Department | Column::CheckedInAt => 25,
            Column::FullName | Column::Observation => 30,
        }
    }

    /// Cell text, or None for a missing optional field
    pub fn value(self, entry: &RosterEntry) -> Option<String> {
        let text = |v: &Option<String>| v.clone().filter(|s| !s.trim().is_empty());
        match self {
            Column::Confirmed => Some(yes_no(entry.confirmed).to_string()),
            Column::Present => Some(yes_no(entry.present).to_string()),
            Column::NationalId => Some(entry.national_id.clone()).filter(|s| !s.is_empty()),
            Column::GivenNames => Some(entry.given_names.clone()).filter(|s| !s.is_empty()),
            Column::FamilyNames => Some(entry.family_names.clone()).filter(|s| !s.is_empty()),
            Column::FullName => Some(entry.full_name.clone()).filter(|s| !s.is_empty()),
            Column::Program => text(&entry.program),
            Column::Institution => text(&entry.institution),
            Column::Department => text(&entry.department),
            Column::Seat => text(&entry.seat),
            Column::Group => text(&entry.group),
            Column::Observation => text(&entry.observation),
            Column::CheckedInAt => entry.checked_in_at.map(format_timestamp),
        }
    }

    /// Cell text for on-screen tables
    pub fn display(self, entry: &RosterEntry) -> String {
        self.value(entry).unwrap_or_else(|| PLACEHOLDER.to_string())
    }
}

/// The set of columns currently shown
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibleColumns {
    kind: EventKind,
    hidden: BTreeSet<Column>,
}

impl VisibleColumns {
    pub fn all(kind: EventKind) -> Self {
        Self {
            kind,
            hidden: BTreeSet::new(),
        }
    }

    pub fn kind(&self) -> EventKind {
        self.kind
    }

    pub fn is_visible(&self, column: Column) -> bool {
        Column::for_kind(self.kind).contains(&column) && !self.hidden.contains(&column)
    }

    pub fn set_visible(&mut self, column: Column, visible: bool) {
        if visible {
            self.hidden.remove(&column);
        } else {
            self.hidden.insert(column);
        }
    }

    pub fn toggle(&mut self, column: Column) {
        let visible = self.is_visible(column);
        self.set_visible(column, !visible);
    }

    pub fn show_all(&mut self) {
        self.hidden.clear();
    }

    /// Visible columns in export order
    pub fn columns(&self) -> Vec<Column> {
        Column::for_kind(self.kind)
            .iter()
            .copied()
            .filter(|c| !self.hidden.contains(c))
            .collect()
    }
}
