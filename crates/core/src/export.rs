//! Spreadsheet export of a roster snapshot

use std::path::{Path, PathBuf};

use chrono::{Local, NaiveDate};
use rust_xlsxwriter::{Format, Workbook};
use serde::{Deserialize, Serialize};
use tracing::{info, instrument};

use crate::error::{Error, Result};
use crate::models::EventKind;
use crate::roster::{Column, RosterEntry};

/// Which rows of the roster go into the sheet
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportSelection {
    #[default]
    All,
    Present,
    Absent,
    Confirmed,
    Pending,
}

impl ExportSelection {
    pub fn matches(&self, entry: &RosterEntry) -> bool {
        match self {
            ExportSelection::All => true,
            ExportSelection::Present => entry.present,
            ExportSelection::Absent => !entry.present,
            ExportSelection::Confirmed => entry.confirmed,
            ExportSelection::Pending => !entry.confirmed,
        }
    }

    /// File-name fragment; `All` adds none
    pub fn file_label(&self) -> Option<&'static str> {
        match self {
            ExportSelection::All => None,
            ExportSelection::Present => Some("presentes"),
            ExportSelection::Absent => Some("ausentes"),
            ExportSelection::Confirmed => Some("confirmados"),
            ExportSelection::Pending => Some("pendientes"),
        }
    }
}

/// What to export and how
#[derive(Debug, Clone)]
pub struct ExportRequest<'a> {
    pub event_name: &'a str,
    pub kind: EventKind,
    pub selection: ExportSelection,
    /// Visible columns, in order
    pub columns: &'a [Column],
}

fn sanitize(name: &str) -> String {
    let cleaned: String = name
        .trim()
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '*' | '?' | '"' | '<' | '>' | '|' => '_',
            c if c.is_control() => '_',
            c => c,
        })
        .collect();
    if cleaned.is_empty() {
        "Evento".to_string()
    } else {
        cleaned
    }
}

/// `<event>_<Alumnos|Funcionarios>[_<selection>]_<YYYY-MM-DD>.xlsx`
pub fn file_name(event_name: &str, kind: EventKind, selection: ExportSelection, date: NaiveDate) -> String {
    let mut parts = vec![sanitize(event_name), kind.roster_label().to_string()];
    if let Some(label) = selection.file_label() {
        parts.push(label.to_string());
    }
    parts.push(date.format("%Y-%m-%d").to_string());
    format!("{}.xlsx", parts.join("_"))
}

/// Rows the selection keeps, in roster order
pub fn select<'a>(roster: &'a [RosterEntry], selection: ExportSelection) -> Vec<&'a RosterEntry> {
    roster.iter().filter(|e| selection.matches(e)).collect()
}

/// Build a one-sheet workbook. An empty selection still yields the header row.
pub fn build_workbook(roster: &[RosterEntry], request: &ExportRequest<'_>) -> Result<Workbook> {
    let columns: Vec<Column> = request
        .columns
        .iter()
        .copied()
        .filter(|c| Column::for_kind(request.kind).contains(c))
        .collect();
    if columns.is_empty() {
        return Err(Error::Validation("no visible columns to export".into()));
    }

    let mut workbook = Workbook::new();
    let header = Format::new().set_bold();
    let sheet = workbook.add_worksheet();
    sheet.set_name(request.kind.roster_label())?;

    for (col, column) in columns.iter().enumerate() {
        let col = col as u16;
        sheet.set_column_width(col, column.width())?;
        sheet.write_string_with_format(0, col, column.header(), &header)?;
    }

    for (row, entry) in select(roster, request.selection).into_iter().enumerate() {
        let row = row as u32 + 1;
        for (col, column) in columns.iter().enumerate() {
            let value = column.value(entry).unwrap_or_default();
            sheet.write_string(row, col as u16, value)?;
        }
    }

    Ok(workbook)
}

/// Serialize the workbook in memory
pub fn to_bytes(roster: &[RosterEntry], request: &ExportRequest<'_>) -> Result<Vec<u8>> {
    let mut workbook = build_workbook(roster, request)?;
    Ok(workbook.save_to_buffer()?)
}

/// Write the workbook into `dir` under its derived file name
#[instrument(skip(roster, request, dir), fields(event = %request.event_name, selection = ?request.selection))]
pub fn export_to_dir(roster: &[RosterEntry], request: &ExportRequest<'_>, dir: &Path) -> Result<PathBuf> {
    let path = dir.join(file_name(
        request.event_name,
        request.kind,
        request.selection,
        Local::now().date_naive(),
    ));
    let mut workbook = build_workbook(roster, request)?;
    workbook.save(&path)?;
    info!(path = %path.display(), "Roster exported");
    Ok(path)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roster::testing::entry;
    use calamine::{open_workbook_from_rs, Data, Reader, Xlsx};
    use std::io::Cursor;

    fn read_back(bytes: Vec<u8>, sheet: &str) -> Vec<Vec<String>> {
        let mut workbook: Xlsx<_> = open_workbook_from_rs(Cursor::new(bytes)).unwrap();
        let range = workbook.worksheet_range(sheet).unwrap();
        range
            .rows()
            .map(|row| {
                row.iter()
                    .map(|cell| match cell {
                        Data::String(s) => s.clone(),
                        Data::Empty => String::new(),
                        other => other.to_string(),
                    })
                    .collect()
            })
            .collect()
    }

    #[test]
    fn test_file_name() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 9).unwrap();
        assert_eq!(
            file_name("Charla: IA/ML", EventKind::Students, ExportSelection::All, date),
            "Charla_ IA_ML_Alumnos_2024-03-09.xlsx"
        );
        assert_eq!(
            file_name("Cena", EventKind::Staff, ExportSelection::Pending, date),
            "Cena_Funcionarios_pendientes_2024-03-09.xlsx"
        );
        assert_eq!(
            file_name("  ", EventKind::Students, ExportSelection::Present, date),
            "Evento_Alumnos_presentes_2024-03-09.xlsx"
        );
    }

    #[test]
    fn test_empty_roster_writes_header_only() {
        let request = ExportRequest {
            event_name: "Vacío",
            kind: EventKind::Students,
            selection: ExportSelection::All,
            columns: Column::for_kind(EventKind::Students),
        };
        let rows = read_back(to_bytes(&[], &request).unwrap(), "Alumnos");
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0][0], "RUT");
        assert_eq!(rows[0].len(), 10);
    }

    #[test]
    fn test_only_visible_columns_and_localized_presence() {
        let mut present = entry("11111111-1", "Ana", "López", true);
        present.department = Some("Finanzas".into());
        let roster = vec![present, entry("22222222-2", "Luis", "Soto", false)];
        let columns = [Column::Present, Column::NationalId, Column::Department];
        let request = ExportRequest {
            event_name: "Cena",
            kind: EventKind::Staff,
            selection: ExportSelection::All,
            columns: &columns,
        };
        let rows = read_back(to_bytes(&roster, &request).unwrap(), "Funcionarios");
        assert_eq!(rows[0], ["Presente", "RUT", "Departamento"]);
        assert_eq!(rows[1], ["Sí", "11111111-1", "Finanzas"]);
        assert_eq!(rows[2][0], "No");
        assert_eq!(rows[2][1], "22222222-2");
    }

    #[test]
    fn test_foreign_columns_are_dropped() {
        let columns = [Column::Program];
        let request = ExportRequest {
            event_name: "Cena",
            kind: EventKind::Staff,
            selection: ExportSelection::All,
            columns: &columns,
        };
        assert!(matches!(to_bytes(&[], &request), Err(Error::Validation(_))));
    }

    #[test]
    fn test_export_to_dir() {
        let dir = tempfile::tempdir().unwrap();
        let request = ExportRequest {
            event_name: "Feria",
            kind: EventKind::Students,
            selection: ExportSelection::Absent,
            columns: Column::for_kind(EventKind::Students),
        };
        let path = export_to_dir(&[entry("1", "Ana", "López", false)], &request, dir.path()).unwrap();
        assert!(path.exists());
        assert!(path
            .file_name()
            .unwrap()
            .to_string_lossy()
            .starts_with("Feria_Alumnos_ausentes_"));
    }
}
