//! Event storage operations

use chrono::Utc;
use rusqlite::{params, Connection, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use super::parse::{parse_datetime, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::{Event, EventKind};

const EVENT_COLUMNS: &str =
    "id, name, description, starts_at, ends_at, active, kind, created_at, updated_at";

pub struct EventStore<'a> {
    conn: &'a Connection,
}

fn event_from_row(row: &Row<'_>) -> rusqlite::Result<Event> {
    Ok(Event {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        name: row.get(1)?,
        description: row.get(2)?,
        starts_at: parse_datetime(&row.get::<_, String>(3)?)?,
        ends_at: parse_datetime(&row.get::<_, String>(4)?)?,
        active: row.get::<_, i32>(5)? != 0,
        kind: EventKind::from_tag(&row.get::<_, String>(6)?),
        created_at: parse_datetime(&row.get::<_, String>(7)?)?,
        updated_at: parse_datetime(&row.get::<_, String>(8)?)?,
    })
}

impl<'a> EventStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new event
    #[instrument(skip(self, event), fields(event_name = %event.name))]
    pub fn create(&self, event: &Event) -> Result<()> {
        self.conn.execute(
            "INSERT INTO events (id, name, description, starts_at, ends_at, active, kind, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                event.id.to_string(),
                event.name,
                event.description,
                event.starts_at.to_rfc3339(),
                event.ends_at.to_rfc3339(),
                event.active as i32,
                event.kind.as_str(),
                event.created_at.to_rfc3339(),
                event.updated_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Find event by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Event>> {
        let sql = format!("SELECT {} FROM events WHERE id = ?1", EVENT_COLUMNS);
        let event = self
            .conn
            .query_row(&sql, params![id.to_string()], event_from_row)
            .optional()?;
        Ok(event)
    }

    /// List all events, earliest first
    #[instrument(skip(self))]
    pub fn list(&self) -> Result<Vec<Event>> {
        let sql = format!(
            "SELECT {} FROM events ORDER BY starts_at, name",
            EVENT_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let events = stmt
            .query_map([], event_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(events)
    }

    /// Find the active event, if any
    #[instrument(skip(self))]
    pub fn find_active(&self) -> Result<Option<Event>> {
        let sql = format!(
            "SELECT {} FROM events WHERE active = 1 ORDER BY updated_at DESC LIMIT 1",
            EVENT_COLUMNS
        );
        let event = self.conn.query_row(&sql, [], event_from_row).optional()?;
        Ok(event)
    }

    /// Update the editable fields of an event (the active flag is owned by `activate`)
    #[instrument(skip(self, event), fields(event_id = %event.id))]
    pub fn update(&self, event: &Event) -> Result<()> {
        let changed = self.conn.execute(
            "UPDATE events SET name = ?1, description = ?2, starts_at = ?3, ends_at = ?4, kind = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                event.name,
                event.description,
                event.starts_at.to_rfc3339(),
                event.ends_at.to_rfc3339(),
                event.kind.as_str(),
                event.updated_at.to_rfc3339(),
                event.id.to_string(),
            ],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("event {}", event.id)));
        }
        Ok(())
    }

    /// Make one event the only active event.
    ///
    /// Runs as a single transaction: every row's flag is rewritten in one
    /// statement, so concurrent activations serialize instead of leaving
    /// two events active.
    #[instrument(skip(self))]
    pub fn activate(&self, event_id: Uuid) -> Result<()> {
        let tx = self.conn.unchecked_transaction()?;

        let exists: bool = tx
            .query_row(
                "SELECT 1 FROM events WHERE id = ?1",
                params![event_id.to_string()],
                |_| Ok(true),
            )
            .optional()?
            .unwrap_or(false);
        if !exists {
            return Err(Error::NotFound(format!("event {}", event_id)));
        }

        tx.execute(
            "UPDATE events
             SET active = (id = ?1),
                 updated_at = CASE WHEN active != (id = ?1) THEN ?2 ELSE updated_at END",
            params![event_id.to_string(), Utc::now().to_rfc3339()],
        )?;
        tx.commit()?;

        info!(event_id = %event_id, "Event activated");
        Ok(())
    }

    /// Clear the active flag on an event
    #[instrument(skip(self))]
    pub fn deactivate(&self, event_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE events SET active = 0, updated_at = ?1 WHERE id = ?2 AND active = 1",
            params![Utc::now().to_rfc3339(), event_id.to_string()],
        )?;
        Ok(())
    }

    /// Delete an event and, through the foreign key, its roster
    #[instrument(skip(self))]
    pub fn delete(&self, event_id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM events WHERE id = ?1",
            params![event_id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("event {}", event_id)));
        }
        Ok(())
    }

    /// Count events flagged active (should never exceed one)
    pub fn count_active(&self) -> Result<u32> {
        let count = self
            .conn
            .query_row("SELECT COUNT(*) FROM events WHERE active = 1", [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }
}
