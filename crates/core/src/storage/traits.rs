//! Storage repository traits
//!
//! These traits define the storage interface, allowing for different
//! implementations (SQLite, mock, remote document store).

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::error::Result;
use crate::models::{Admin, Attendee, Event};

/// Event repository operations
pub trait EventRepository {
    /// Create a new event
    fn create_event(&self, event: &Event) -> Result<()>;

    /// Find event by ID
    fn find_event(&self, id: Uuid) -> Result<Option<Event>>;

    /// List every event
    fn list_events(&self) -> Result<Vec<Event>>;

    /// Find the active event
    fn find_active_event(&self) -> Result<Option<Event>>;

    /// Update an event's editable fields
    fn update_event(&self, event: &Event) -> Result<()>;

    /// Atomically make one event the only active event
    fn activate_event(&self, event_id: Uuid) -> Result<()>;

    /// Delete an event and its roster
    fn delete_event(&self, event_id: Uuid) -> Result<()>;
}

/// Attendee repository operations
pub trait AttendeeRepository {
    /// Add an attendee to a roster
    fn create_attendee(&self, attendee: &Attendee) -> Result<()>;

    /// Find attendee by ID
    fn find_attendee(&self, id: Uuid) -> Result<Option<Attendee>>;

    /// Find attendee of an event by national id
    fn find_attendee_by_national_id(&self, event_id: Uuid, national_id: &str)
        -> Result<Option<Attendee>>;

    /// Full roster of an event
    fn list_attendees(&self, event_id: Uuid) -> Result<Vec<Attendee>>;

    /// Rewrite an attendee
    fn update_attendee(&self, attendee: &Attendee) -> Result<()>;

    /// Flip presence to true, returning whether it changed
    fn mark_present(&self, attendee_id: Uuid, at: DateTime<Utc>) -> Result<bool>;

    /// Delete one attendee
    fn delete_attendee(&self, attendee_id: Uuid) -> Result<()>;

    /// Delete a whole roster
    fn clear_roster(&self, event_id: Uuid) -> Result<u64>;
}

/// Administrator repository operations
pub trait AdminRepository {
    /// Create an administrator
    fn create_admin(&self, admin: &Admin) -> Result<()>;

    /// Find administrator by email
    fn find_admin_by_email(&self, email: &str) -> Result<Option<Admin>>;

    /// Update administrator's last login time
    fn update_admin_last_login(&self, admin_id: Uuid) -> Result<()>;

    /// Number of administrators
    fn count_admins(&self) -> Result<u64>;
}

/// Combined storage interface
///
/// Provides access to all repository operations.
/// Implementations may be backed by SQLite, mocks, or network.
pub trait Storage: EventRepository + AttendeeRepository + AdminRepository {}

// Blanket implementation: any type implementing all traits implements Storage
impl<T> Storage for T where T: EventRepository + AttendeeRepository + AdminRepository {}
