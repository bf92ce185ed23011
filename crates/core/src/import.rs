//! Roster import from spreadsheets, CSV and JSON
//!
//! Headers are matched loosely (case, accents and surrounding spaces are
//! ignored) against a set of aliases per field. Every valid row becomes one
//! create call; failing rows are counted and skipped.

use std::fs::File;
use std::io::Read;
use std::path::Path;

use calamine::{open_workbook_auto, Data, Reader};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use unicode_normalization::char::is_combining_mark;
use unicode_normalization::UnicodeNormalization;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::models::{Attendee, AttendeeDraft};
use crate::storage::AttendeeRepository;

const GIVEN_NAMES: &[&str] = &["nombres", "nombre", "nombre(s)", "name", "primer nombre"];
const FAMILY_NAMES: &[&str] = &["apellidos", "apellido", "second name", "segundo nombre"];
const FULL_NAME: &[&str] = &[
    "nombre completo",
    "nombrecompleto",
    "nombre y apellido",
    "nombre y apellidos",
    "full name",
];
const NATIONAL_ID: &[&str] = &[
    "rut",
    "r.u.t",
    "documento",
    "dni",
    "cedula",
    "id",
    "identificacion",
    "numero documento",
    "nro documento",
];
const PROGRAM: &[&str] = &["carrera", "programa", "curso", "especialidad"];
const INSTITUTION: &[&str] = &[
    "institucion",
    "sede",
    "universidad",
    "colegio",
    "centro",
    "instituto",
];
const SEAT: &[&str] = &["asiento", "nro asiento", "numero asiento", "seat"];
const GROUP: &[&str] = &["grupo", "grupo nro", "grupo numero", "group"];

/// Accepted file kinds
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ImportFormat {
    /// xlsx, xls, ods: first sheet
    Spreadsheet,
    Csv,
    /// Array of flat objects
    Json,
}

impl ImportFormat {
    pub fn from_path(path: &Path) -> Result<Self> {
        let extension = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match extension.as_str() {
            "xlsx" | "xlsm" | "xls" | "ods" => Ok(ImportFormat::Spreadsheet),
            "csv" => Ok(ImportFormat::Csv),
            "json" => Ok(ImportFormat::Json),
            other => Err(Error::Validation(format!(
                "unsupported file type '{}': expected .xlsx, .xls, .ods, .csv or .json",
                other
            ))),
        }
    }
}

/// Outcome of a bulk import
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImportReport {
    pub created: usize,
    pub failed: usize,
}

/// Lower-case, trim and strip diacritics from a header
pub fn normalize_header(header: &str) -> String {
    header
        .trim()
        .to_lowercase()
        .nfd()
        .filter(|c| !is_combining_mark(*c))
        .collect()
}

/// One input row: (normalized header, cell text) in column order
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ImportRow {
    cells: Vec<(String, String)>,
}

impl ImportRow {
    pub fn from_pairs<K: AsRef<str>, V: Into<String>>(pairs: impl IntoIterator<Item = (K, V)>) -> Self {
        Self {
            cells: pairs
                .into_iter()
                .map(|(k, v)| (normalize_header(k.as_ref()), v.into()))
                .collect(),
        }
    }

    /// Value of the first column whose header is one of `aliases`, if non-blank
    fn field(&self, aliases: &[&str]) -> Option<String> {
        self.cells
            .iter()
            .find(|(header, _)| aliases.contains(&header.as_str()))
            .map(|(_, value)| value.trim())
            .filter(|v| !v.is_empty())
            .map(str::to_string)
    }

    fn is_blank(&self) -> bool {
        self.cells.iter().all(|(_, v)| v.trim().is_empty())
    }

    /// Map a row onto an attendee draft, or say which required field is missing
    pub fn to_draft(&self) -> Result<AttendeeDraft> {
        let given_names = self.field(GIVEN_NAMES);
        let family_names = self.field(FAMILY_NAMES);
        let full_name = match (self.field(FULL_NAME), &given_names, &family_names) {
            (Some(full), _, _) => Some(full),
            (None, Some(g), Some(f)) => Some(format!("{} {}", g, f)),
            (None, _, _) => None,
        };

        let has_split = given_names.is_some() && family_names.is_some();
        if !has_split && full_name.is_none() {
            return Err(Error::Validation("missing name".into()));
        }

        let national_id = self
            .field(NATIONAL_ID)
            .ok_or_else(|| Error::Validation("missing national id".into()))?;
        let program = self
            .field(PROGRAM)
            .ok_or_else(|| Error::Validation("missing program".into()))?;
        let institution = self
            .field(INSTITUTION)
            .ok_or_else(|| Error::Validation("missing institution".into()))?;

        Ok(AttendeeDraft {
            national_id,
            given_names,
            family_names,
            full_name,
            program: Some(program),
            institution: Some(institution),
            seat: self.field(SEAT),
            group: self.field(GROUP),
            ..Default::default()
        })
    }
}

fn cell_text(cell: &Data) -> String {
    match cell {
        Data::Empty => String::new(),
        Data::String(s) => s.clone(),
        // Whole numbers come back as floats; ids and seat numbers must not grow a ".0"
        Data::Float(f) if f.fract() == 0.0 && f.abs() < 1e15 => format!("{}", *f as i64),
        other => other.to_string(),
    }
}

fn json_text(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::Null => String::new(),
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

/// Read the first sheet of a workbook; the first row holds the headers
pub fn read_spreadsheet(path: &Path) -> Result<Vec<ImportRow>> {
    let mut workbook = open_workbook_auto(path)?;
    let range = workbook
        .worksheet_range_at(0)
        .ok_or_else(|| Error::Import("workbook has no sheets".into()))??;

    let mut rows = range.rows();
    let Some(headers) = rows.next() else {
        return Ok(Vec::new());
    };
    let headers: Vec<String> = headers.iter().map(cell_text).collect();

    Ok(rows
        .map(|row| {
            ImportRow::from_pairs(
                headers
                    .iter()
                    .zip(row.iter())
                    .map(|(h, c)| (h.as_str(), cell_text(c))),
            )
        })
        .filter(|row| !row.is_blank())
        .collect())
}

pub fn read_csv<R: Read>(reader: R) -> Result<Vec<ImportRow>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .trim(csv::Trim::All)
        .from_reader(reader);
    let headers = reader.headers()?.clone();

    let mut rows = Vec::new();
    for record in reader.records() {
        let record = record?;
        let row = ImportRow::from_pairs(headers.iter().zip(record.iter()));
        if !row.is_blank() {
            rows.push(row);
        }
    }
    Ok(rows)
}

pub fn read_json<R: Read>(reader: R) -> Result<Vec<ImportRow>> {
    let value: serde_json::Value = serde_json::from_reader(reader)?;
    let items = value
        .as_array()
        .ok_or_else(|| Error::Import("expected a JSON array of objects".into()))?;

    Ok(items
        .iter()
        .map(|item| match item.as_object() {
            Some(object) => ImportRow::from_pairs(object.iter().map(|(k, v)| (k.as_str(), json_text(v)))),
            None => ImportRow::default(),
        })
        .collect())
}

/// Parse a file into rows according to its extension
pub fn read_rows(path: &Path) -> Result<Vec<ImportRow>> {
    match ImportFormat::from_path(path)? {
        ImportFormat::Spreadsheet => read_spreadsheet(path),
        ImportFormat::Csv => read_csv(File::open(path)?),
        ImportFormat::Json => read_json(File::open(path)?),
    }
}

/// Create one attendee per valid row, tallying failures
#[instrument(skip(repo, rows), fields(rows = rows.len()))]
pub fn import_rows<R>(repo: &R, event_id: Uuid, rows: &[ImportRow]) -> Result<ImportReport>
where
    R: AttendeeRepository + ?Sized,
{
    let mut report = ImportReport::default();

    for (index, row) in rows.iter().enumerate() {
        let created = row
            .to_draft()
            .and_then(|draft| Attendee::from_draft(event_id, &draft))
            .and_then(|attendee| repo.create_attendee(&attendee));
        match created {
            Ok(()) => report.created += 1,
            Err(e) => {
                // Header row is line 1
                warn!(line = index + 2, error = %e, "Import row skipped");
                report.failed += 1;
            }
        }
    }

    info!(created = report.created, failed = report.failed, "Import finished");

    if report.created == 0 && report.failed > 0 {
        return Err(Error::Import(format!(
            "no rows imported, {} failed",
            report.failed
        )));
    }
    Ok(report)
}

/// Validate, parse and import a file into an event's roster
pub fn import_file<R>(repo: &R, event_id: Uuid, path: &Path) -> Result<ImportReport>
where
    R: AttendeeRepository + ?Sized,
{
    let rows = read_rows(path)?;
    import_rows(repo, event_id, &rows)
}
