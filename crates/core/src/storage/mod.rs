//! SQLite storage layer for Rollcall

mod admins;
mod attendees;
mod events;
mod migrations;
mod parse;
mod traits;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Admin, Attendee, Event};
use rusqlite::Connection;
use std::path::Path;
use tracing::instrument;

pub use admins::AdminStore;
pub use attendees::AttendeeStore;
pub use events::EventStore;
pub use traits::{AdminRepository, AttendeeRepository, EventRepository, Storage};

/// Main database handle
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    #[instrument(skip(path), fields(path = %path.as_ref().display()))]
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Open in-memory database (for testing)
    #[instrument]
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        conn.execute_batch("PRAGMA foreign_keys = ON")?;
        let db = Self { conn };
        db.init()?;
        Ok(db)
    }

    /// Initialize database schema via migrations
    fn init(&self) -> Result<()> {
        migrations::run_migrations(&self.conn)?;
        Ok(())
    }

    #[cfg(test)]
    pub(crate) fn execute_batch(&self, sql: &str) -> Result<()> {
        self.conn.execute_batch(sql)?;
        Ok(())
    }

    /// Get current schema version
    pub fn schema_version(&self) -> u32 {
        self.conn
            .query_row("SELECT MAX(version) FROM schema_migrations", [], |row| {
                row.get(0)
            })
            .unwrap_or(0)
    }

    /// Get event store
    pub fn events(&self) -> EventStore<'_> {
        EventStore::new(&self.conn)
    }

    /// Get attendee store
    pub fn attendees(&self) -> AttendeeStore<'_> {
        AttendeeStore::new(&self.conn)
    }

    /// Get administrator store
    pub fn admins(&self) -> AdminStore<'_> {
        AdminStore::new(&self.conn)
    }
}

// Implement repository traits for Database
// This enables using Database through the trait interface

impl EventRepository for Database {
    fn create_event(&self, event: &Event) -> Result<()> {
        self.events().create(event)
    }

    fn find_event(&self, id: Uuid) -> Result<Option<Event>> {
        self.events().find_by_id(id)
    }

    fn list_events(&self) -> Result<Vec<Event>> {
        self.events().list()
    }

    fn find_active_event(&self) -> Result<Option<Event>> {
        self.events().find_active()
    }

    fn update_event(&self, event: &Event) -> Result<()> {
        self.events().update(event)
    }

    fn activate_event(&self, event_id: Uuid) -> Result<()> {
        self.events().activate(event_id)
    }

    fn delete_event(&self, event_id: Uuid) -> Result<()> {
        self.events().delete(event_id)
    }
}

impl AttendeeRepository for Database {
    fn create_attendee(&self, attendee: &Attendee) -> Result<()> {
        self.attendees().create(attendee)
    }

    fn find_attendee(&self, id: Uuid) -> Result<Option<Attendee>> {
        self.attendees().find_by_id(id)
    }

    fn find_attendee_by_national_id(
        &self,
        event_id: Uuid,
        national_id: &str,
    ) -> Result<Option<Attendee>> {
        self.attendees().find_by_national_id(event_id, national_id)
    }

    fn list_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>> {
        self.attendees().list_for_event(event_id)
    }

    fn update_attendee(&self, attendee: &Attendee) -> Result<()> {
        self.attendees().update(attendee)
    }

    fn mark_present(&self, attendee_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        self.attendees().mark_present(attendee_id, at)
    }

    fn delete_attendee(&self, attendee_id: Uuid) -> Result<()> {
        self.attendees().delete(attendee_id)
    }

    fn clear_roster(&self, event_id: Uuid) -> Result<u64> {
        self.attendees().clear_event(event_id)
    }
}

impl AdminRepository for Database {
    fn create_admin(&self, admin: &Admin) -> Result<()> {
        self.admins().create(admin)
    }

    fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>> {
        self.admins().find_by_email(email)
    }

    fn update_admin_last_login(&self, admin_id: Uuid) -> Result<()> {
        self.admins().update_last_login(admin_id)
    }

    fn count_admins(&self) -> Result<u64> {
        self.admins().count()
    }
}
