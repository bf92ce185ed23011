//! Rollcall Network Library
//!
//! TCP hub that shares one attendance service with kiosks and admin panels
//! on other machines.
//!
//! # Architecture
//!
//! - **Server**: runs beside the service, answers requests and pushes feed snapshots
//! - **Client**: connects as a kiosk (token) or an admin (credentials)
//! - **Protocol**: length-prefixed JSON messages
//!
//! # Usage
//!
//! ```ignore
//! let server = Server::start(DEFAULT_PORT, service.clone(), Some(token)).await?;
//!
//! let mut kiosk = Client::connect_kiosk(addr, Some(token)).await?;
//! kiosk.subscribe(FeedTarget::ActiveRoster).await?;
//! while let Some(event) = kiosk.next_event().await {
//!     if let HubEvent::Roster { entries, .. } = event { /* redraw */ }
//! }
//! ```

pub mod client;
pub mod error;
mod frame;
pub mod protocol;
pub mod server;

pub use client::{Client, ConnectionState, HubEvent};
pub use error::{Error, Result};
pub use protocol::{Credentials, FeedTarget, Message, PeerRole, Request, Response};
pub use server::Server;

/// Default hub port
pub const DEFAULT_PORT: u16 = rollcall_core::config::DEFAULT_HUB_PORT;
