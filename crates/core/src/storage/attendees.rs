//! Attendee storage operations

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};
use tracing::{info, instrument};
use uuid::Uuid;

use super::parse::{is_unique_violation, parse_datetime, parse_datetime_opt, parse_uuid, OptionalExt};
use crate::error::{Error, Result};
use crate::models::Attendee;
use crate::national_id;

const ATTENDEE_COLUMNS: &str = "id, event_id, national_id, given_names, family_names, full_name, program, institution, department, seat, group_name, present, confirmed, observation, created_at, checked_in_at";

pub struct AttendeeStore<'a> {
    conn: &'a Connection,
}

fn attendee_from_row(row: &Row<'_>) -> rusqlite::Result<Attendee> {
    Ok(Attendee {
        id: parse_uuid(&row.get::<_, String>(0)?)?,
        event_id: parse_uuid(&row.get::<_, String>(1)?)?,
        national_id: row.get(2)?,
        given_names: row.get(3)?,
        family_names: row.get(4)?,
        full_name: row.get(5)?,
        program: row.get(6)?,
        institution: row.get(7)?,
        department: row.get(8)?,
        seat: row.get(9)?,
        group: row.get(10)?,
        present: row.get::<_, i32>(11)? != 0,
        confirmed: row.get::<_, Option<i32>>(12)?.map(|v| v != 0),
        observation: row.get(13)?,
        created_at: parse_datetime(&row.get::<_, String>(14)?)?,
        checked_in_at: parse_datetime_opt(row.get::<_, Option<String>>(15)?)?,
    })
}

impl<'a> AttendeeStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Add an attendee to its event's roster
    #[instrument(skip(self, attendee), fields(event_id = %attendee.event_id, national_id = %attendee.national_id))]
    pub fn create(&self, attendee: &Attendee) -> Result<()> {
        let result = self.conn.execute(
            "INSERT INTO attendees (id, event_id, national_id, national_key, given_names, family_names, full_name,
                                    program, institution, department, seat, group_name, present, confirmed,
                                    observation, created_at, checked_in_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
            params![
                attendee.id.to_string(),
                attendee.event_id.to_string(),
                attendee.national_id,
                attendee.national_key(),
                attendee.given_names,
                attendee.family_names,
                attendee.full_name,
                attendee.program,
                attendee.institution,
                attendee.department,
                attendee.seat,
                attendee.group,
                attendee.present as i32,
                attendee.confirmed.map(|c| c as i32),
                attendee.observation,
                attendee.created_at.to_rfc3339(),
                attendee.checked_in_at.map(|t| t.to_rfc3339()),
            ],
        );

        match result {
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::Validation(format!(
                "national id {} is already on this roster",
                attendee.national_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Find attendee by ID
    #[instrument(skip(self))]
    pub fn find_by_id(&self, id: Uuid) -> Result<Option<Attendee>> {
        let sql = format!("SELECT {} FROM attendees WHERE id = ?1", ATTENDEE_COLUMNS);
        let attendee = self
            .conn
            .query_row(&sql, params![id.to_string()], attendee_from_row)
            .optional()?;
        Ok(attendee)
    }

    /// Find an attendee of an event by national id (punctuation-insensitive)
    #[instrument(skip(self))]
    pub fn find_by_national_id(&self, event_id: Uuid, raw_id: &str) -> Result<Option<Attendee>> {
        let sql = format!(
            "SELECT {} FROM attendees WHERE event_id = ?1 AND national_key = ?2",
            ATTENDEE_COLUMNS
        );
        let attendee = self
            .conn
            .query_row(
                &sql,
                params![event_id.to_string(), national_id::clean(raw_id)],
                attendee_from_row,
            )
            .optional()?;
        Ok(attendee)
    }

    /// Full roster of an event, in insertion order
    #[instrument(skip(self))]
    pub fn list_for_event(&self, event_id: Uuid) -> Result<Vec<Attendee>> {
        let sql = format!(
            "SELECT {} FROM attendees WHERE event_id = ?1 ORDER BY created_at, rowid",
            ATTENDEE_COLUMNS
        );
        let mut stmt = self.conn.prepare(&sql)?;
        let attendees = stmt
            .query_map(params![event_id.to_string()], attendee_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        Ok(attendees)
    }

    /// Rewrite every field of an attendee (admin edit)
    #[instrument(skip(self, attendee), fields(attendee_id = %attendee.id))]
    pub fn update(&self, attendee: &Attendee) -> Result<()> {
        let result = self.conn.execute(
            "UPDATE attendees SET national_id = ?1, national_key = ?2, given_names = ?3, family_names = ?4,
                                  full_name = ?5, program = ?6, institution = ?7, department = ?8, seat = ?9,
                                  group_name = ?10, present = ?11, confirmed = ?12, observation = ?13,
                                  checked_in_at = ?14
             WHERE id = ?15",
            params![
                attendee.national_id,
                attendee.national_key(),
                attendee.given_names,
                attendee.family_names,
                attendee.full_name,
                attendee.program,
                attendee.institution,
                attendee.department,
                attendee.seat,
                attendee.group,
                attendee.present as i32,
                attendee.confirmed.map(|c| c as i32),
                attendee.observation,
                attendee.checked_in_at.map(|t| t.to_rfc3339()),
                attendee.id.to_string(),
            ],
        );

        match result {
            Ok(0) => Err(Error::NotFound(format!("attendee {}", attendee.id))),
            Ok(_) => Ok(()),
            Err(e) if is_unique_violation(&e) => Err(Error::Validation(format!(
                "national id {} is already on this roster",
                attendee.national_id
            ))),
            Err(e) => Err(e.into()),
        }
    }

    /// Flip presence to true. Returns false when the attendee was already present.
    #[instrument(skip(self))]
    pub fn mark_present(&self, attendee_id: Uuid, at: DateTime<Utc>) -> Result<bool> {
        let changed = self.conn.execute(
            "UPDATE attendees SET present = 1, checked_in_at = ?1 WHERE id = ?2 AND present = 0",
            params![at.to_rfc3339(), attendee_id.to_string()],
        )?;
        if changed == 0 && self.find_by_id(attendee_id)?.is_none() {
            return Err(Error::NotFound(format!("attendee {}", attendee_id)));
        }
        Ok(changed > 0)
    }

    /// Delete one attendee
    #[instrument(skip(self))]
    pub fn delete(&self, attendee_id: Uuid) -> Result<()> {
        let changed = self.conn.execute(
            "DELETE FROM attendees WHERE id = ?1",
            params![attendee_id.to_string()],
        )?;
        if changed == 0 {
            return Err(Error::NotFound(format!("attendee {}", attendee_id)));
        }
        Ok(())
    }

    /// Delete the whole roster of an event, returning how many were removed
    #[instrument(skip(self))]
    pub fn clear_event(&self, event_id: Uuid) -> Result<u64> {
        let count = self.conn.execute(
            "DELETE FROM attendees WHERE event_id = ?1",
            params![event_id.to_string()],
        )?;
        info!(event_id = %event_id, deleted = count, "Roster cleared");
        Ok(count as u64)
    }

    /// Find which event an attendee belongs to
    pub fn event_of(&self, attendee_id: Uuid) -> Result<Option<Uuid>> {
        let event_id: Option<String> = self
            .conn
            .query_row(
                "SELECT event_id FROM attendees WHERE id = ?1",
                params![attendee_id.to_string()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(event_id.map(|s| parse_uuid(&s)).transpose()?)
    }
}
