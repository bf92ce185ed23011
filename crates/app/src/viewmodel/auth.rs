//! Authentication view model

use std::sync::Arc;

use slint::ComponentHandle;

use crate::state::AppState;
use crate::MainWindow;

use super::describe;

pub fn setup_auth_bindings(window: &MainWindow, state: Arc<AppState>) {
    let state_login = state.clone();
    let window_weak = window.as_weak();
    window.on_login(move |email, password| {
        let Some(w) = window_weak.upgrade() else {
            return;
        };
        if email.trim().is_empty() || password.is_empty() {
            w.set_login_error("Ingresa correo y contraseña".into());
            return;
        }

        match state_login.service.sign_in(&email, &password) {
            Ok(admin) => {
                tracing::info!(email = %admin.email, "Admin signed in");
                state_login.set_admin(Some(admin.email));
                w.set_login_error("".into());
                w.set_route("admin".into());
            }
            Err(e) => {
                tracing::warn!(error = %e, "Admin sign-in failed");
                w.set_login_error(describe(&e).into());
            }
        }
    });

    let window_weak = window.as_weak();
    window.on_back_to_checkin(move || {
        if let Some(w) = window_weak.upgrade() {
            w.set_login_error("".into());
            w.set_route("checkin".into());
        }
    });

    let state_logout = state.clone();
    let window_weak = window.as_weak();
    window.on_logout(move || {
        if let Some(email) = state_logout.admin_email() {
            tracing::info!(email = %email, "Admin signed out");
        }
        state_logout.set_admin(None);
        state_logout.close_roster();
        if let Some(w) = window_weak.upgrade() {
            w.set_selected_event_id("".into());
            w.set_roster_title("".into());
            w.set_rows(Default::default());
            w.set_route("checkin".into());
        }
    });
}
