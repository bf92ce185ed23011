//! Roster table view model
//!
//! The panel keeps the latest snapshot of the selected event and a
//! `RosterView`; every callback mutates the view and re-derives the page.

use std::path::Path;
use std::rc::Rc;
use std::sync::Arc;

use rollcall_core::roster::PAGE_SIZE_OPTIONS;
use rollcall_core::{
    AttendeeDraft, Column, Error, EventKind, ExportSelection, Facets, RosterEntry, RosterFilter,
    RosterPage, RosterView, SortDirection, SortField, SortState, SummaryCard,
};
use slint::{ComponentHandle, ModelRc, SharedString, VecModel};
use uuid::Uuid;

use crate::state::AppState;
use crate::{ColumnItem, MainWindow, RosterRow, SummaryItem};

use super::events::parse_id;
use super::{describe, notify};

/// Dropdown entry that disables a facet filter
const ALL_OPTION: &str = "Todas";

fn string_model(values: Vec<String>) -> ModelRc<SharedString> {
    let values: Vec<SharedString> = values.into_iter().map(SharedString::from).collect();
    ModelRc::from(Rc::new(VecModel::from(values)))
}

fn with_all(values: &[String]) -> Vec<String> {
    std::iter::once(ALL_OPTION.to_string())
        .chain(values.iter().cloned())
        .collect()
}

/// Dropdown value to filter value; the "all" entry means no filter
fn facet_value(selected: &str) -> &str {
    if selected == ALL_OPTION {
        ""
    } else {
        selected
    }
}

fn facet_label(value: &Option<String>) -> String {
    value.clone().unwrap_or_else(|| ALL_OPTION.to_string())
}

fn export_choices(kind: EventKind) -> &'static [(&'static str, ExportSelection)] {
    const STUDENTS: [(&str, ExportSelection); 3] = [
        ("Todos", ExportSelection::All),
        ("Presentes", ExportSelection::Present),
        ("Ausentes", ExportSelection::Absent),
    ];
    const STAFF: [(&str, ExportSelection); 5] = [
        ("Todos", ExportSelection::All),
        ("Presentes", ExportSelection::Present),
        ("Ausentes", ExportSelection::Absent),
        ("Confirmados", ExportSelection::Confirmed),
        ("Pendientes", ExportSelection::Pending),
    ];
    match kind {
        EventKind::Students => &STUDENTS,
        EventKind::Staff => &STAFF,
    }
}

fn selection_for(kind: EventKind, label: &str) -> ExportSelection {
    export_choices(kind)
        .iter()
        .find(|(l, _)| *l == label)
        .map(|(_, s)| *s)
        .unwrap_or_default()
}

fn sort_field(column: Column) -> Option<SortField> {
    match column {
        Column::GivenNames => Some(SortField::GivenNames),
        Column::FamilyNames => Some(SortField::FamilyNames),
        _ => None,
    }
}

fn sort_indicator(sort: SortState, column: Column) -> &'static str {
    match (sort_field(column), sort.field) {
        (Some(field), Some(current)) if field == current => match sort.direction {
            SortDirection::Ascending => " ▲",
            SortDirection::Descending => " ▼",
        },
        _ => "",
    }
}

fn card_from_key(key: &str) -> Option<SummaryCard> {
    match key {
        "total" => Some(SummaryCard::Total),
        "present" => Some(SummaryCard::Present),
        "absent" => Some(SummaryCard::Absent),
        "confirmed" => Some(SummaryCard::Confirmed),
        "pending" => Some(SummaryCard::Pending),
        _ => None,
    }
}

/// Cards shown above the table; staff rosters add the confirmation pair
fn summary_items(kind: EventKind, page: &RosterPage, filter: &RosterFilter) -> Vec<SummaryItem> {
    let summary = page.summary;
    let mut cards = vec![
        (SummaryCard::Total, "total", "Total", summary.total.to_string()),
        (
            SummaryCard::Present,
            "present",
            "Presentes",
            format!("{} ({}%)", summary.present, summary.percent_present),
        ),
        (SummaryCard::Absent, "absent", "Ausentes", summary.absent.to_string()),
    ];
    if kind == EventKind::Staff {
        cards.push((SummaryCard::Confirmed, "confirmed", "Confirmados", summary.confirmed.to_string()));
        cards.push((SummaryCard::Pending, "pending", "Pendientes", summary.pending.to_string()));
    }

    cards
        .into_iter()
        .map(|(card, key, label, value)| SummaryItem {
            card: key.into(),
            label: label.into(),
            value: value.into(),
            selected: card.presence_filter() == filter.presence,
        })
        .collect()
}

fn page_label(page: &RosterPage) -> String {
    format!(
        "Página {} de {} · {} registros",
        page.page, page.page_count, page.filtered_total
    )
}

fn to_row(entry: &RosterEntry, columns: &[Column]) -> RosterRow {
    let cells: Vec<String> = columns.iter().map(|c| c.display(entry)).collect();
    RosterRow {
        id: entry.id.to_string().into(),
        present: entry.present,
        cells: string_model(cells),
    }
}

/// Attendee form contents as typed
#[derive(Debug, Clone, Default, PartialEq)]
struct AttendeeForm {
    national_id: String,
    given: String,
    family: String,
    program: String,
    institution: String,
    department: String,
    seat: String,
    group: String,
    observation: String,
    confirmed: bool,
}

impl AttendeeForm {
    fn read(window: &MainWindow) -> Self {
        Self {
            national_id: window.get_att_national_id().to_string(),
            given: window.get_att_given().to_string(),
            family: window.get_att_family().to_string(),
            program: window.get_att_program().to_string(),
            institution: window.get_att_institution().to_string(),
            department: window.get_att_department().to_string(),
            seat: window.get_att_seat().to_string(),
            group: window.get_att_group().to_string(),
            observation: window.get_att_observation().to_string(),
            confirmed: window.get_att_confirmed(),
        }
    }

    fn from_entry(entry: &RosterEntry) -> Self {
        Self {
            national_id: entry.national_id.clone(),
            given: entry.given_names.clone(),
            family: entry.family_names.clone(),
            program: entry.program.clone().unwrap_or_default(),
            institution: entry.institution.clone().unwrap_or_default(),
            department: entry.department.clone().unwrap_or_default(),
            seat: entry.seat.clone().unwrap_or_default(),
            group: entry.group.clone().unwrap_or_default(),
            observation: entry.observation.clone().unwrap_or_default(),
            confirmed: entry.confirmed,
        }
    }

    fn show(&self, window: &MainWindow) {
        window.set_att_national_id(self.national_id.as_str().into());
        window.set_att_given(self.given.as_str().into());
        window.set_att_family(self.family.as_str().into());
        window.set_att_program(self.program.as_str().into());
        window.set_att_institution(self.institution.as_str().into());
        window.set_att_department(self.department.as_str().into());
        window.set_att_seat(self.seat.as_str().into());
        window.set_att_group(self.group.as_str().into());
        window.set_att_observation(self.observation.as_str().into());
        window.set_att_confirmed(self.confirmed);
    }

    /// Only the fields of the roster kind are kept
    fn to_draft(&self, kind: EventKind) -> AttendeeDraft {
        let text = |value: &str| Some(value.trim().to_string()).filter(|v| !v.is_empty());
        let staff = kind == EventKind::Staff;
        AttendeeDraft {
            national_id: self.national_id.trim().to_string(),
            given_names: text(&self.given),
            family_names: text(&self.family),
            full_name: None,
            program: if staff { None } else { text(&self.program) },
            institution: if staff { None } else { text(&self.institution) },
            department: if staff { text(&self.department) } else { None },
            seat: if staff { None } else { text(&self.seat) },
            group: if staff { None } else { text(&self.group) },
            confirmed: staff.then_some(self.confirmed),
            observation: if staff { text(&self.observation) } else { None },
        }
    }
}

fn reset_attendee_form(window: &MainWindow) {
    window.set_att_id("".into());
    AttendeeForm::default().show(window);
}

/// Mirror the filter state into the filter inputs
fn sync_filter_inputs(window: &MainWindow, filter: &RosterFilter) {
    window.set_search(filter.search.clone().unwrap_or_default().into());
    window.set_id_prefix(filter.id_prefix.clone().unwrap_or_default().into());
    window.set_given_filter(filter.given_names.clone().unwrap_or_default().into());
    window.set_family_filter(filter.family_names.clone().unwrap_or_default().into());
    window.set_institution_filter(facet_label(&filter.institution).into());
    window.set_program_filter(facet_label(&filter.program).into());
    window.set_department_filter(facet_label(&filter.department).into());
    window.set_group_filter(facet_label(&filter.group).into());
    window.set_seat_filter(facet_label(&filter.seat).into());
}

fn clear_window(window: &MainWindow) {
    window.set_selected_event_id("".into());
    window.set_roster_title("".into());
    window.set_rows(Default::default());
    window.set_summary(Default::default());
    window.set_columns(Default::default());
    window.set_visible_columns(Default::default());
    window.set_page_label("".into());
    reset_attendee_form(window);
}

/// Derive the current page and push it into the window
fn render(window: &MainWindow, state: &Arc<AppState>) {
    let mut panel = state.roster();
    let Some(event) = panel.event.clone() else {
        drop(panel);
        clear_window(window);
        return;
    };

    let page = panel.view.derive(&panel.snapshot);
    panel.view.sync(&page);
    let facets = Facets::from_roster(&panel.snapshot);
    let view = panel.view.clone();
    drop(panel);

    let kind = view.kind();
    let visible = view.columns().columns();
    let sort = view.sort();
    let filter = view.filter();

    let rows: Vec<RosterRow> = page.rows.iter().map(|e| to_row(e, &visible)).collect();
    let column_item = |column: Column| ColumnItem {
        key: column.key().into(),
        header: column.header().into(),
        visible: view.columns().is_visible(column),
        sort_indicator: sort_indicator(sort, column).into(),
    };
    let all_columns: Vec<ColumnItem> = Column::for_kind(kind).iter().copied().map(&column_item).collect();
    let visible_columns: Vec<ColumnItem> = visible.iter().copied().map(&column_item).collect();

    window.set_roster_title(format!("{} · {}", event.name, kind.roster_label()).into());
    window.set_is_staff(kind == EventKind::Staff);
    window.set_rows(ModelRc::from(Rc::new(VecModel::from(rows))));
    window.set_columns(ModelRc::from(Rc::new(VecModel::from(all_columns))));
    window.set_visible_columns(ModelRc::from(Rc::new(VecModel::from(visible_columns))));
    window.set_summary(ModelRc::from(Rc::new(VecModel::from(summary_items(kind, &page, filter)))));
    window.set_page_label(page_label(&page).into());

    window.set_institution_options(string_model(with_all(&facets.institutions)));
    window.set_program_options(string_model(with_all(facets.programs_for(filter.institution.as_deref()))));
    window.set_department_options(string_model(with_all(&facets.departments)));
    window.set_group_options(string_model(with_all(&facets.groups)));
    window.set_seat_options(string_model(with_all(&facets.seats)));
    // Dependent dropdowns can be reset by the view itself
    window.set_program_filter(facet_label(&filter.program).into());

    window.set_page_size_options(string_model(PAGE_SIZE_OPTIONS.iter().map(|s| s.to_string()).collect()));
    window.set_page_size(view.pagination().size().to_string().into());
    window.set_export_options(string_model(
        export_choices(kind).iter().map(|(label, _)| label.to_string()).collect(),
    ));
}

/// Mutate the view of the open roster and re-render
fn update_view(window: &MainWindow, state: &Arc<AppState>, f: impl FnOnce(&mut RosterView, &[RosterEntry])) {
    {
        let mut panel = state.roster();
        if panel.event.is_none() {
            return;
        }
        let panel = &mut *panel;
        f(&mut panel.view, &panel.snapshot);
    }
    render(window, state);
}

fn fresh_view(state: &AppState, kind: EventKind) -> RosterView {
    RosterView::with_page_size(kind, state.config.roster.page_size).unwrap_or_else(|e| {
        tracing::warn!(error = %e, "Configured page size rejected, using default");
        RosterView::new(kind)
    })
}

/// Select an event in the admin panel and follow its roster
pub fn open_event(window: &MainWindow, state: &Arc<AppState>, event_id: Uuid) {
    let event = match state.find_event(event_id) {
        Some(event) => event,
        None => match state.service.event(event_id) {
            Ok(event) => event,
            Err(e) => {
                notify(window, describe(&e));
                return;
            }
        },
    };

    let window_weak = window.as_weak();
    let state_snapshot = state.clone();
    let on_snapshot = move |entries: &[RosterEntry]| {
        let entries = entries.to_vec();
        let state = state_snapshot.clone();
        let _ = window_weak.upgrade_in_event_loop(move |w| {
            {
                let mut panel = state.roster();
                // A late snapshot of a previously selected event
                if panel.event_id() != Some(event_id) {
                    return;
                }
                panel.snapshot = entries;
            }
            render(&w, &state);
        });
    };

    let window_weak = window.as_weak();
    let on_error = move |e: &Error| {
        let message = describe(e);
        tracing::error!(event_id = %event_id, error = %e, "Roster feed failed");
        let _ = window_weak.upgrade_in_event_loop(move |w| notify(&w, message));
    };

    let subscription = state.service.subscribe_roster(event_id, on_snapshot, on_error);
    let view = fresh_view(state, event.kind);
    tracing::debug!(event_id = %event_id, "Roster opened");
    state.roster().open(event, view, subscription);

    window.set_selected_event_id(event_id.to_string().into());
    window.set_export_choice("Todos".into());
    sync_filter_inputs(window, &RosterFilter::default());
    reset_attendee_form(window);
    render(window, state);
}

/// Keep the open roster in step with the event list
pub fn follow_event_changes(window: &MainWindow, state: &Arc<AppState>) {
    let Some(event_id) = state.roster().event_id() else {
        return;
    };

    match state.find_event(event_id) {
        Some(event) => {
            {
                let mut panel = state.roster();
                if panel.view.kind() != event.kind {
                    panel.view = fresh_view(state, event.kind);
                }
                panel.event = Some(event);
            }
            render(window, state);
        }
        None => {
            state.close_roster();
            clear_window(window);
            notify(window, "El evento seleccionado fue eliminado");
        }
    }
}

fn open_event_id(window: &MainWindow, state: &AppState) -> Option<Uuid> {
    let event_id = state.roster().event_id();
    if event_id.is_none() {
        notify(window, "Selecciona un evento");
    }
    event_id
}

pub fn setup_roster_bindings(window: &MainWindow, state: Arc<AppState>) {
    let state_search = state.clone();
    let window_weak = window.as_weak();
    window.on_set_search(move |text| {
        if let Some(w) = window_weak.upgrade() {
            update_view(&w, &state_search, |view, _| view.set_search(&text));
        }
    });

    let state_prefix = state.clone();
    let window_weak = window.as_weak();
    window.on_set_id_prefix(move |text| {
        if let Some(w) = window_weak.upgrade() {
            update_view(&w, &state_prefix, |view, _| view.set_id_prefix(&text));
        }
    });

    let state_names = state.clone();
    let window_weak = window.as_weak();
    window.on_set_name_filter(move |field, value| {
        if let Some(w) = window_weak.upgrade() {
            update_view(&w, &state_names, |view, _| match field.as_str() {
                "given" => view.set_given_names(&value),
                "family" => view.set_family_names(&value),
                other => tracing::warn!(field = other, "Unknown name filter"),
            });
        }
    });

    let state_facet = state.clone();
    let window_weak = window.as_weak();
    window.on_set_facet(move |field, value| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let value = facet_value(&value);
        update_view(&w, &state_facet, |view, _| match field.as_str() {
            "institution" => view.set_institution(value),
            "program" => view.set_program(value),
            "department" => view.set_department(value),
            "group" => view.set_group(value),
            "seat" => view.set_seat(value),
            other => tracing::warn!(field = other, "Unknown facet"),
        });
    });

    let state_clear = state.clone();
    let window_weak = window.as_weak();
    window.on_clear_filters(move || {
        if let Some(w) = window_weak.upgrade() {
            update_view(&w, &state_clear, |view, _| view.clear_filters());
            sync_filter_inputs(&w, &RosterFilter::default());
        }
    });

    let state_card = state.clone();
    let window_weak = window.as_weak();
    window.on_select_card(move |key| {
        if let (Some(w), Some(card)) = (window_weak.upgrade(), card_from_key(&key)) {
            update_view(&w, &state_card, |view, _| view.select_card(card));
        }
    });

    let state_sort = state.clone();
    let window_weak = window.as_weak();
    window.on_toggle_sort(move |key| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        if let Some(field) = Column::from_key(&key).and_then(sort_field) {
            update_view(&w, &state_sort, |view, _| view.select_sort(field));
        }
    });

    let state_columns = state.clone();
    let window_weak = window.as_weak();
    window.on_toggle_column(move |key| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        if let Some(column) = Column::from_key(&key) {
            update_view(&w, &state_columns, |view, _| view.columns_mut().toggle(column));
        }
    });

    let state_next = state.clone();
    let window_weak = window.as_weak();
    window.on_next_page(move || {
        if let Some(w) = window_weak.upgrade() {
            update_view(&w, &state_next, |view, roster| {
                let total = view.derive(roster).filtered_total;
                view.next_page(total);
            });
        }
    });

    let state_previous = state.clone();
    let window_weak = window.as_weak();
    window.on_previous_page(move || {
        if let Some(w) = window_weak.upgrade() {
            update_view(&w, &state_previous, |view, _| view.previous_page());
        }
    });

    let state_size = state.clone();
    let window_weak = window.as_weak();
    window.on_set_page_size(move |text| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Ok(size) = text.trim().parse::<usize>() else {
            return;
        };
        let mut failure = None;
        update_view(&w, &state_size, |view, _| {
            if let Err(e) = view.set_page_size(size) {
                failure = Some(e);
            }
        });
        if let Some(e) = failure {
            notify(&w, describe(&e));
        }
    });

    let state_export = state.clone();
    let window_weak = window.as_weak();
    window.on_export_roster(move |label| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Some(event_id) = open_event_id(&w, &state_export) else {
            return;
        };
        let (kind, columns) = {
            let panel = state_export.roster();
            (panel.view.kind(), panel.view.columns().columns())
        };
        let selection = selection_for(kind, &label);

        let result = state_export
            .config
            .export_dir()
            .and_then(|dir| state_export.service.export_to_dir(event_id, selection, &columns, &dir));
        match result {
            Ok(path) => {
                tracing::info!(path = %path.display(), "Roster exported");
                notify(&w, format!("Archivo guardado en {}", path.display()));
            }
            Err(e) => {
                tracing::warn!(error = %e, "Export failed");
                notify(&w, describe(&e));
            }
        }
    });

    let state_import = state.clone();
    let window_weak = window.as_weak();
    window.on_import_file(move |path| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Some(event_id) = open_event_id(&w, &state_import) else {
            return;
        };
        let path = path.trim().to_string();
        if path.is_empty() {
            notify(&w, "Indica la ruta del archivo a importar");
            return;
        }

        match state_import.service.import_file(event_id, Path::new(&path)) {
            Ok(report) => {
                w.set_import_path("".into());
                notify(
                    &w,
                    format!("Importados: {} · Con error: {}", report.created, report.failed),
                );
            }
            Err(e) => {
                tracing::warn!(error = %e, "Import failed");
                notify(&w, describe(&e));
            }
        }
    });

    let state_clear_roster = state.clone();
    let window_weak = window.as_weak();
    window.on_clear_roster(move || {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Some(event_id) = open_event_id(&w, &state_clear_roster) else {
            return;
        };
        match state_clear_roster.service.clear_roster(event_id) {
            Ok(deleted) => notify(&w, format!("Se eliminaron {} asistentes", deleted)),
            Err(e) => notify(&w, describe(&e)),
        }
    });

    let state_save = state.clone();
    let window_weak = window.as_weak();
    window.on_save_attendee(move || {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Some(event_id) = open_event_id(&w, &state_save) else {
            return;
        };
        let kind = state_save.roster().view.kind();
        let draft = AttendeeForm::read(&w).to_draft(kind);

        let result = match parse_id(&w.get_att_id()) {
            None => state_save.service.add_attendee(event_id, &draft),
            Some(attendee_id) => state_save.service.update_attendee(attendee_id, &draft),
        };
        match result {
            Ok(attendee) => {
                tracing::info!(attendee_id = %attendee.id, "Attendee saved");
                state_save.roster().editing = None;
                reset_attendee_form(&w);
                notify(&w, "Asistente guardado");
            }
            Err(e) => notify(&w, describe(&e)),
        }
    });

    let state_edit = state.clone();
    let window_weak = window.as_weak();
    window.on_edit_attendee(move |id| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Some(attendee_id) = parse_id(&id) else {
            return;
        };
        let form = {
            let mut panel = state_edit.roster();
            let form = panel
                .snapshot
                .iter()
                .find(|e| e.id == attendee_id)
                .map(AttendeeForm::from_entry);
            if form.is_some() {
                panel.editing = Some(attendee_id);
            }
            form
        };
        match form {
            Some(form) => {
                w.set_att_id(id);
                form.show(&w);
            }
            None => notify(&w, "El asistente ya no existe"),
        }
    });

    let state_cancel = state.clone();
    let window_weak = window.as_weak();
    window.on_cancel_attendee(move || {
        state_cancel.roster().editing = None;
        if let Some(w) = window_weak.upgrade() {
            reset_attendee_form(&w);
        }
    });

    let state_delete = state.clone();
    let window_weak = window.as_weak();
    window.on_delete_attendee(move |id| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Some(attendee_id) = parse_id(&id) else {
            return;
        };
        match state_delete.service.delete_attendee(attendee_id) {
            Ok(()) => {
                let mut panel = state_delete.roster();
                if panel.editing == Some(attendee_id) {
                    panel.editing = None;
                    drop(panel);
                    reset_attendee_form(&w);
                }
            }
            Err(e) => notify(&w, describe(&e)),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use rollcall_core::RosterSummary;

    fn page(summary: RosterSummary) -> RosterPage {
        RosterPage {
            rows: Vec::new(),
            page: 2,
            page_count: 3,
            filtered_total: 45,
            summary,
        }
    }

    #[test]
    fn test_all_option_disables_facet() {
        assert_eq!(facet_value(ALL_OPTION), "");
        assert_eq!(facet_value("Sede Centro"), "Sede Centro");
        assert_eq!(with_all(&["A".to_string()]), vec![ALL_OPTION.to_string(), "A".to_string()]);
        assert_eq!(facet_label(&None), ALL_OPTION);
    }

    #[test]
    fn test_export_choices_follow_kind() {
        assert_eq!(export_choices(EventKind::Students).len(), 3);
        assert_eq!(selection_for(EventKind::Staff, "Pendientes"), ExportSelection::Pending);
        // Staff-only selections are not offered for students
        assert_eq!(selection_for(EventKind::Students, "Confirmados"), ExportSelection::All);
    }

    #[test]
    fn test_sort_indicator_only_on_sorted_name_column() {
        let mut sort = SortState::by(SortField::FamilyNames);
        assert_eq!(sort_indicator(sort, Column::FamilyNames), " ▲");
        assert_eq!(sort_indicator(sort, Column::GivenNames), "");
        assert_eq!(sort_indicator(sort, Column::Program), "");
        sort.select(SortField::FamilyNames);
        assert_eq!(sort_indicator(sort, Column::FamilyNames), " ▼");
    }

    #[test]
    fn test_summary_cards_mark_active_presence() {
        let summary = RosterSummary {
            total: 10,
            present: 4,
            absent: 6,
            confirmed: 3,
            pending: 7,
            percent_present: 40,
        };
        let filter = RosterFilter {
            presence: SummaryCard::Absent.presence_filter(),
            ..Default::default()
        };

        let students = summary_items(EventKind::Students, &page(summary), &filter);
        assert_eq!(students.len(), 3);
        assert_eq!(students[1].value.as_str(), "4 (40%)");
        assert!(students[2].selected);
        assert!(!students[0].selected);

        let staff = summary_items(EventKind::Staff, &page(summary), &RosterFilter::default());
        assert_eq!(staff.len(), 5);
        assert!(staff[0].selected);
        assert_eq!(card_from_key(staff[4].card.as_str()), Some(SummaryCard::Pending));
    }

    #[test]
    fn test_page_label() {
        assert_eq!(page_label(&page(RosterSummary::default())), "Página 2 de 3 · 45 registros");
    }

    #[test]
    fn test_form_keeps_only_fields_of_kind() {
        let form = AttendeeForm {
            national_id: " 12.345.678-5 ".into(),
            given: "Ana".into(),
            family: "López Soto".into(),
            program: "Enfermería".into(),
            department: "Finanzas".into(),
            confirmed: true,
            ..Default::default()
        };

        let student = form.to_draft(EventKind::Students);
        assert_eq!(student.national_id, "12.345.678-5");
        assert_eq!(student.program.as_deref(), Some("Enfermería"));
        assert!(student.department.is_none());
        assert!(student.confirmed.is_none());
        assert!(student.seat.is_none());

        let staff = form.to_draft(EventKind::Staff);
        assert_eq!(staff.department.as_deref(), Some("Finanzas"));
        assert_eq!(staff.confirmed, Some(true));
        assert!(staff.program.is_none());
        assert!(staff.validate().is_ok());
    }
}
