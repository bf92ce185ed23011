//! Optional roster hub hosted by this window
//!
//! When enabled in the config, remote kiosks and admin panels reach the same
//! attendance service through a TCP hub running on the app's tokio runtime.

use std::sync::Arc;

use rollcall_core::config::HubConfig;
use rollcall_core::AttendanceService;
use rollcall_net::Server;
use tokio::runtime::Runtime;
use tracing::{error, info};

/// Hosting state shown in the admin header
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum HubStatus {
    Disabled,
    Hosting { port: u16 },
    Failed(String),
}

impl HubStatus {
    pub fn label(&self) -> String {
        match self {
            HubStatus::Disabled => String::new(),
            HubStatus::Hosting { port } => format!("Hub en puerto {}", port),
            HubStatus::Failed(reason) => format!("Hub detenido: {}", reason),
        }
    }
}

pub struct Hub {
    server: Option<Server>,
    status: HubStatus,
}

impl Hub {
    pub fn start(runtime: &Runtime, config: &HubConfig, service: Arc<AttendanceService>) -> Self {
        if !config.enabled {
            return Hub {
                server: None,
                status: HubStatus::Disabled,
            };
        }

        match runtime.block_on(Server::start(config.port, service, config.token.clone())) {
            Ok(server) => {
                let port = server.addr().port();
                info!(port, "Hub hosting");
                Hub {
                    server: Some(server),
                    status: HubStatus::Hosting { port },
                }
            }
            Err(e) => {
                error!(port = config.port, error = %e, "Failed to start hub");
                Hub {
                    server: None,
                    status: HubStatus::Failed(e.to_string()),
                }
            }
        }
    }

    pub fn status(&self) -> &HubStatus {
        &self.status
    }

    pub fn shutdown(self, runtime: &Runtime) {
        if let Some(server) = self.server {
            runtime.block_on(server.shutdown());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_disabled_hub_does_not_bind() {
        let runtime = Runtime::new().unwrap();
        let service = Arc::new(AttendanceService::in_memory().unwrap());
        let hub = Hub::start(&runtime, &HubConfig::default(), service);
        assert_eq!(hub.status(), &HubStatus::Disabled);
        assert_eq!(hub.status().label(), "");
        hub.shutdown(&runtime);
    }

    #[test]
    fn test_enabled_hub_reports_port() {
        let runtime = Runtime::new().unwrap();
        let service = Arc::new(AttendanceService::in_memory().unwrap());
        let config = HubConfig {
            enabled: true,
            port: 0,
            token: Some("puerta".into()),
        };
        let hub = Hub::start(&runtime, &config, service);
        match hub.status() {
            HubStatus::Hosting { port } => assert!(*port > 0),
            other => panic!("hub not hosting: {:?}", other),
        }
        hub.shutdown(&runtime);
    }
}
