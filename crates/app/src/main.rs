//! Rollcall - attendance check-in kiosk and admin panel
//!
//! One window serves both the kiosk route, where attendees enter their RUT,
//! and the admin panel behind sign-in. The same process can host a roster
//! hub for remote kiosks.

use std::sync::Arc;

use rollcall_core::{AttendanceService, RollcallConfig};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod hub;
mod state;
mod viewmodel;

slint::include_modules!();

fn main() {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    tracing::info!("Starting Rollcall");

    let config = match RollcallConfig::load() {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    // Runtime for the hub; the UI itself stays on the main thread
    let runtime = match tokio::runtime::Runtime::new() {
        Ok(runtime) => runtime,
        Err(e) => {
            tracing::error!("Failed to create tokio runtime: {}", e);
            std::process::exit(1);
        }
    };
    let _guard = runtime.enter();

    let service = match AttendanceService::open(&config) {
        Ok(service) => Arc::new(service),
        Err(e) => {
            tracing::error!("Failed to open attendance database: {}", e);
            std::process::exit(1);
        }
    };

    let hub = hub::Hub::start(&runtime, &config.hub, service.clone());
    let hub_status = hub.status().label();
    let app_state = Arc::new(state::AppState::new(service, config));

    let main_window = match MainWindow::new() {
        Ok(window) => window,
        Err(e) => {
            tracing::error!("Failed to create main window: {}", e);
            std::process::exit(1);
        }
    };

    viewmodel::setup_bindings(&main_window, app_state, hub_status);

    if let Err(e) = main_window.run() {
        tracing::error!("Event loop failed: {}", e);
    }

    hub.shutdown(&runtime);
    tracing::info!("Rollcall closed");
}
