//! Event list and event form view model

use std::rc::Rc;
use std::sync::Arc;

use chrono::{DateTime, Duration, Local, NaiveDateTime, TimeZone, Utc};
use rollcall_core::{Event, EventDraft, EventKind};
use slint::{ComponentHandle, ModelRc, VecModel};
use uuid::Uuid;

use crate::state::AppState;
use crate::{EventItem, MainWindow};

use super::{describe, notify, roster};

const SCHEDULE_FORMAT: &str = "%d/%m/%Y %H:%M";

/// Format a stored instant for the form, in local time
pub(crate) fn format_schedule(at: DateTime<Utc>) -> String {
    at.with_timezone(&Local).format(SCHEDULE_FORMAT).to_string()
}

/// Parse a "DD/MM/AAAA HH:MM" local time
pub(crate) fn parse_schedule(text: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(text.trim(), SCHEDULE_FORMAT).ok()?;
    Local
        .from_local_datetime(&naive)
        .earliest()
        .map(|local| local.with_timezone(&Utc))
}

pub(crate) fn parse_id(text: &str) -> Option<Uuid> {
    Uuid::parse_str(text.trim()).ok()
}

fn to_item(event: &Event) -> EventItem {
    EventItem {
        id: event.id.to_string().into(),
        name: event.name.as_str().into(),
        schedule: format!("{} - {}", format_schedule(event.starts_at), format_schedule(event.ends_at)).into(),
        kind_label: event.kind.roster_label().into(),
        active: event.active,
    }
}

/// Push the cached event list into the window
pub fn render_events(window: &MainWindow, state: &Arc<AppState>) {
    let events = state.events();
    let items: Vec<EventItem> = events.iter().map(to_item).collect();
    window.set_events(ModelRc::from(Rc::new(VecModel::from(items))));

    let active_name = events
        .iter()
        .find(|e| e.active)
        .map(|e| e.name.clone())
        .unwrap_or_default();
    window.set_active_event_name(active_name.into());

    let selected = state.roster().event_id().map(|id| id.to_string()).unwrap_or_default();
    window.set_selected_event_id(selected.into());
}

fn reset_form(window: &MainWindow) {
    let start = Utc::now();
    window.set_form_event_id("".into());
    window.set_form_name("".into());
    window.set_form_description("".into());
    window.set_form_start(format_schedule(start).into());
    window.set_form_end(format_schedule(start + Duration::hours(2)).into());
    window.set_form_staff(false);
    window.set_form_activate(false);
}

fn read_form(window: &MainWindow) -> Result<EventDraft, String> {
    let starts_at = parse_schedule(&window.get_form_start())
        .ok_or_else(|| "Fecha de inicio inválida (DD/MM/AAAA HH:MM)".to_string())?;
    let ends_at = parse_schedule(&window.get_form_end())
        .ok_or_else(|| "Fecha de término inválida (DD/MM/AAAA HH:MM)".to_string())?;
    let description = window.get_form_description().trim().to_string();

    Ok(EventDraft {
        name: window.get_form_name().trim().to_string(),
        description: (!description.is_empty()).then_some(description),
        starts_at,
        ends_at,
        kind: if window.get_form_staff() {
            EventKind::Staff
        } else {
            EventKind::Students
        },
        activate: window.get_form_activate(),
    })
}

pub fn setup_event_bindings(window: &MainWindow, state: Arc<AppState>) {
    reset_form(window);

    let window_weak = window.as_weak();
    window.on_new_event(move || {
        if let Some(w) = window_weak.upgrade() {
            reset_form(&w);
        }
    });

    let state_edit = state.clone();
    let window_weak = window.as_weak();
    window.on_edit_event(move |id| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Some(event) = parse_id(&id).and_then(|id| state_edit.find_event(id)) else {
            notify(&w, "El evento ya no existe");
            return;
        };
        w.set_form_event_id(event.id.to_string().into());
        w.set_form_name(event.name.as_str().into());
        w.set_form_description(event.description.clone().unwrap_or_default().into());
        w.set_form_start(format_schedule(event.starts_at).into());
        w.set_form_end(format_schedule(event.ends_at).into());
        w.set_form_staff(event.kind == EventKind::Staff);
        w.set_form_activate(event.active);
    });

    let state_save = state.clone();
    let window_weak = window.as_weak();
    window.on_save_event(move || {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let draft = match read_form(&w) {
            Ok(draft) => draft,
            Err(message) => {
                notify(&w, message);
                return;
            }
        };

        let result = match parse_id(&w.get_form_event_id()) {
            None => state_save.service.create_event(&draft),
            Some(event_id) => state_save.service.update_event(event_id, &draft).and_then(|event| {
                // Editing can also flip activation
                if draft.activate && !event.active {
                    state_save.service.activate_event(event_id)?;
                } else if !draft.activate && event.active {
                    state_save.service.deactivate_event(event_id)?;
                }
                Ok(event)
            }),
        };

        match result {
            Ok(event) => {
                tracing::info!(event_id = %event.id, "Event saved");
                notify(&w, format!("Evento \"{}\" guardado", event.name));
                reset_form(&w);
            }
            Err(e) => {
                tracing::warn!(error = %e, "Saving event failed");
                notify(&w, describe(&e));
            }
        }
    });

    let state_select = state.clone();
    let window_weak = window.as_weak();
    window.on_select_event(move |id| {
        if let (Some(w), Some(event_id)) = (window_weak.upgrade(), parse_id(&id)) {
            roster::open_event(&w, &state_select, event_id);
        }
    });

    let state_activate = state.clone();
    let window_weak = window.as_weak();
    window.on_activate_event(move |id| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        if let Some(event_id) = parse_id(&id) {
            if let Err(e) = state_activate.service.activate_event(event_id) {
                notify(&w, describe(&e));
            }
        }
    });

    let state_deactivate = state.clone();
    let window_weak = window.as_weak();
    window.on_deactivate_event(move |id| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        if let Some(event_id) = parse_id(&id) {
            if let Err(e) = state_deactivate.service.deactivate_event(event_id) {
                notify(&w, describe(&e));
            }
        }
    });

    let state_delete = state.clone();
    let window_weak = window.as_weak();
    window.on_delete_event(move |id| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let Some(event_id) = parse_id(&id) else {
            return;
        };
        match state_delete.service.delete_event(event_id) {
            Ok(()) => {
                if w.get_form_event_id() == id {
                    reset_form(&w);
                }
                notify(&w, "Evento eliminado");
            }
            Err(e) => notify(&w, describe(&e)),
        }
    });
}
