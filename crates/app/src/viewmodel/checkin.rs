//! Check-in view model

use std::cell::Cell;
use std::rc::Rc;
use std::sync::Arc;
use std::time::Duration;

use rollcall_core::{national_id, CheckInOutcome, RosterEntry};
use slint::ComponentHandle;

use crate::state::AppState;
use crate::MainWindow;

/// How long a matched attendee stays on screen
const CONFIRMATION_SECS: u64 = 2;

/// What the kiosk shows after a submit
#[derive(Debug, Clone, PartialEq, Eq)]
struct Feedback {
    status: &'static str,
    message: String,
    name: String,
    details: String,
}

impl Feedback {
    fn error(message: impl Into<String>) -> Self {
        Self {
            status: "error",
            message: message.into(),
            name: String::new(),
            details: String::new(),
        }
    }

    fn warn(message: impl Into<String>) -> Self {
        Self {
            status: "warn",
            ..Self::error(message)
        }
    }

    fn welcome(entry: &RosterEntry) -> Self {
        let details = [entry.program.as_deref(), entry.institution.as_deref(), entry.department.as_deref()]
            .into_iter()
            .flatten()
            .filter(|v| !v.trim().is_empty())
            .collect::<Vec<_>>()
            .join(" · ");
        Self {
            status: "ok",
            message: "Asistencia registrada".to_string(),
            name: entry.full_name.clone(),
            details,
        }
    }
}

fn feedback_for(outcome: &CheckInOutcome) -> Feedback {
    match outcome {
        CheckInOutcome::CheckedIn(entry) => Feedback::welcome(entry),
        CheckInOutcome::AlreadyPresent(_) => Feedback::warn("Su RUT ya se encuentra registrado"),
        CheckInOutcome::NotFound => Feedback::error("RUT no encontrado en la base de datos."),
        CheckInOutcome::NoActiveEvent => Feedback::error("No hay un evento activo en este momento."),
    }
}

fn show(window: &MainWindow, feedback: &Feedback) {
    window.set_checkin_status(feedback.status.into());
    window.set_checkin_message(feedback.message.as_str().into());
    window.set_checkin_name(feedback.name.as_str().into());
    window.set_checkin_details(feedback.details.as_str().into());
}

pub fn setup_checkin_bindings(window: &MainWindow, state: Arc<AppState>) {
    window.on_checkin_edited({
        let window_weak = window.as_weak();
        move |text| {
            let formatted = national_id::format_input(&text);
            if formatted != text.as_str() {
                if let Some(w) = window_weak.upgrade() {
                    w.set_checkin_rut(formatted.into());
                }
            }
        }
    });

    // Bumped on every submit so an older timer never clears a newer result
    let generation = Rc::new(Cell::new(0u64));

    let state_submit = state.clone();
    let window_weak = window.as_weak();
    window.on_checkin_submit(move || {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        let raw = w.get_checkin_rut().to_string();

        let feedback = if national_id::clean(&raw).is_empty() {
            Feedback::error("Por favor ingresa tu RUT")
        } else if state_submit.session().already_checked(&raw) {
            Feedback::warn("Este RUT ya fue ingresado anteriormente.")
        } else {
            match state_submit.service.check_in(&raw) {
                Ok(outcome) => {
                    if matches!(outcome, CheckInOutcome::CheckedIn(_)) {
                        state_submit.session().record(&raw);
                        w.set_checkin_rut("".into());
                    }
                    feedback_for(&outcome)
                }
                Err(e) => {
                    tracing::warn!(error = %e, "Check-in failed");
                    Feedback::error("Error al procesar el registro")
                }
            }
        };
        show(&w, &feedback);

        let current = generation.get() + 1;
        generation.set(current);
        let generation = generation.clone();
        let window_weak = w.as_weak();
        slint::Timer::single_shot(Duration::from_secs(CONFIRMATION_SECS), move || {
            if generation.get() != current {
                return;
            }
            if let Some(w) = window_weak.upgrade() {
                show(&w, &Feedback::error(""));
                w.set_checkin_status("".into());
            }
        });
    });

    let state_admin = state.clone();
    let window_weak = window.as_weak();
    window.on_open_admin(move || {
        if let Some(w) = window_weak.upgrade() {
            let route = if state_admin.is_admin() { "admin" } else { "login" };
            w.set_route(route.into());
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    fn entry() -> RosterEntry {
        RosterEntry {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            national_id: "12.345.678-5".into(),
            given_names: "Ana María".into(),
            family_names: "López Soto".into(),
            full_name: "Ana María López Soto".into(),
            program: Some("Enfermería".into()),
            institution: Some("Sede Centro".into()),
            department: None,
            seat: None,
            group: None,
            present: true,
            confirmed: false,
            observation: None,
            checked_in_at: None,
        }
    }

    #[test]
    fn test_welcome_shows_full_name_and_affiliation() {
        let feedback = feedback_for(&CheckInOutcome::CheckedIn(entry()));
        assert_eq!(feedback.status, "ok");
        assert_eq!(feedback.name, "Ana María López Soto");
        assert_eq!(feedback.details, "Enfermería · Sede Centro");
    }

    #[test]
    fn test_refusals_carry_no_attendee() {
        let already = feedback_for(&CheckInOutcome::AlreadyPresent(entry()));
        assert_eq!(already.status, "warn");
        assert!(already.name.is_empty());

        let missing = feedback_for(&CheckInOutcome::NotFound);
        assert_eq!(missing.status, "error");
        assert!(feedback_for(&CheckInOutcome::NoActiveEvent)
            .message
            .contains("evento activo"));
    }
}
