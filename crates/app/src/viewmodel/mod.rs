//! View model bindings for Slint UI

mod auth;
mod checkin;
mod events;
mod roster;

use std::sync::Arc;
use std::time::Duration;

use rollcall_core::Error;
use slint::ComponentHandle;

use crate::state::AppState;
use crate::MainWindow;

/// How long a transient admin message stays visible
const NOTICE_SECS: u64 = 5;

pub fn setup_bindings(window: &MainWindow, state: Arc<AppState>, hub_status: String) {
    window.set_hub_status(hub_status.into());

    checkin::setup_checkin_bindings(window, state.clone());
    auth::setup_auth_bindings(window, state.clone());
    events::setup_event_bindings(window, state.clone());
    roster::setup_roster_bindings(window, state.clone());

    let state_reload = state.clone();
    let window_weak = window.as_weak();
    window.on_reload(move || {
        if let Some(w) = window_weak.upgrade() {
            w.set_fatal_error("".into());
            subscribe_feeds(&w, &state_reload);
        }
    });

    subscribe_feeds(window, &state);
}

/// Follow the event list for both routes; a failing feed takes over the window
fn subscribe_feeds(window: &MainWindow, state: &Arc<AppState>) {
    let window_weak = window.as_weak();
    let state_events = state.clone();
    let on_events = move |events: &[rollcall_core::Event]| {
        let events = events.to_vec();
        let state = state_events.clone();
        let _ = window_weak.upgrade_in_event_loop(move |w| {
            state.set_events(events);
            events::render_events(&w, &state);
            roster::follow_event_changes(&w, &state);
        });
    };

    let window_weak = window.as_weak();
    let on_error = move |e: &Error| {
        let message = e.to_string();
        tracing::error!(error = %message, "Event feed failed");
        let _ = window_weak.upgrade_in_event_loop(move |w| {
            w.set_fatal_error(message.into());
        });
    };

    let subscription = state.service.subscribe_events(on_events, on_error);
    state.replace_feeds(vec![subscription]);
}

/// Show a transient message in the admin header
pub(crate) fn notify(window: &MainWindow, message: impl Into<String>) {
    let message: String = message.into();
    window.set_status_message(message.clone().into());

    let window_weak = window.as_weak();
    slint::Timer::single_shot(Duration::from_secs(NOTICE_SECS), move || {
        if let Some(w) = window_weak.upgrade() {
            // A newer message may have replaced this one
            if w.get_status_message() == message.as_str() {
                w.set_status_message("".into());
            }
        }
    });
}

/// User-facing text for a failed operation
pub(crate) fn describe(error: &Error) -> String {
    match error {
        Error::InvalidCredentials => "Credenciales inválidas".to_string(),
        Error::NotFound(what) => format!("No encontrado: {}", what),
        Error::Validation(reason) => format!("Dato inválido: {}", reason),
        Error::Import(reason) => format!("Error al importar: {}", reason),
        Error::Export(reason) => format!("Error al exportar: {}", reason),
        other => format!("Error: {}", other),
    }
}
