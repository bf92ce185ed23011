//! Rollcall Core Library
//!
//! Models, storage, the roster pipeline, import/export and the attendance
//! service behind the Rollcall check-in kiosk and admin panel.

pub mod auth;
pub mod config;
pub mod error;
pub mod export;
pub mod feed;
pub mod import;
pub mod invariants;
pub mod models;
pub mod national_id;
pub mod roster;
pub mod service;
pub mod storage;

pub use config::RollcallConfig;
pub use error::{Error, Result};
pub use export::{ExportRequest, ExportSelection};
pub use feed::{SnapshotFeed, Subscription};
pub use import::{ImportFormat, ImportReport, ImportRow};
pub use models::*;
pub use roster::{
    Column, Facets, PresenceFilter, RosterEntry, RosterFilter, RosterPage, RosterSummary,
    RosterView, SortDirection, SortField, SortState, SummaryCard, VisibleColumns,
};
pub use service::{AttendanceService, CheckInOutcome};
pub use storage::{AdminRepository, AttendeeRepository, Database, EventRepository, Storage};
