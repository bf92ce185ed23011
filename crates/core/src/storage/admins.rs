//! Administrator storage operations

use chrono::Utc;
use rusqlite::{params, Connection};
use tracing::instrument;
use uuid::Uuid;

use super::parse::{parse_datetime, parse_datetime_opt, parse_uuid, OptionalExt};
use crate::error::Result;
use crate::models::Admin;

pub struct AdminStore<'a> {
    conn: &'a Connection,
}

impl<'a> AdminStore<'a> {
    pub fn new(conn: &'a Connection) -> Self {
        Self { conn }
    }

    /// Create a new administrator
    #[instrument(skip(self, admin), fields(email = %admin.email))]
    pub fn create(&self, admin: &Admin) -> Result<()> {
        self.conn.execute(
            "INSERT INTO admins (id, email, password_hash, created_at, last_login) VALUES (?1, ?2, ?3, ?4, ?5)",
            params![
                admin.id.to_string(),
                admin.email,
                admin.password_hash,
                admin.created_at.to_rfc3339(),
                admin.last_login.map(|t| t.to_rfc3339()),
            ],
        )?;
        Ok(())
    }

    /// Find administrator by email (case-insensitive)
    #[instrument(skip(self))]
    pub fn find_by_email(&self, email: &str) -> Result<Option<Admin>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, email, password_hash, created_at, last_login FROM admins WHERE email = ?1",
        )?;

        let admin = stmt
            .query_row(params![email.trim().to_lowercase()], |row| {
                Ok(Admin {
                    id: parse_uuid(&row.get::<_, String>(0)?)?,
                    email: row.get(1)?,
                    password_hash: row.get(2)?,
                    created_at: parse_datetime(&row.get::<_, String>(3)?)?,
                    last_login: parse_datetime_opt(row.get::<_, Option<String>>(4)?)?,
                })
            })
            .optional()?;

        Ok(admin)
    }

    /// Update last login time
    pub fn update_last_login(&self, admin_id: Uuid) -> Result<()> {
        self.conn.execute(
            "UPDATE admins SET last_login = ?1 WHERE id = ?2",
            params![Utc::now().to_rfc3339(), admin_id.to_string()],
        )?;
        Ok(())
    }

    /// Number of administrators
    pub fn count(&self) -> Result<u64> {
        let count: i64 = self
            .conn
            .query_row("SELECT COUNT(*) FROM admins", [], |row| row.get(0))?;
        Ok(count as u64)
    }
}
