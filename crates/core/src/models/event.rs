//! Event model - one occasion with its own roster

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Which kind of roster an event tracks
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventKind {
    /// Students: institution, program, seat and group columns
    #[default]
    Students,
    /// Staff: department, prior confirmation and observation columns
    Staff,
}

impl EventKind {
    /// Stable tag used in storage and on the wire
    pub fn as_str(&self) -> &'static str {
        match self {
            EventKind::Students => "students",
            EventKind::Staff => "staff",
        }
    }

    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "staff" | "trabajadores" => EventKind::Staff,
            _ => EventKind::Students,
        }
    }

    /// Label used for sheet names and export file names
    pub fn roster_label(&self) -> &'static str {
        match self {
            EventKind::Students => "Alumnos",
            EventKind::Staff => "Funcionarios",
        }
    }
}

/// An event for which attendance is tracked
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Event {
    pub id: Uuid,
    pub name: String,
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    pub active: bool,
    pub kind: EventKind,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Event {
    /// Build a new, inactive event from a validated draft
    pub fn from_draft(draft: &EventDraft) -> Result<Self> {
        draft.validate()?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            name: draft.name.trim().to_string(),
            description: draft.description.clone().filter(|d| !d.trim().is_empty()),
            starts_at: draft.starts_at,
            ends_at: draft.ends_at,
            active: false,
            kind: draft.kind,
            created_at: now,
            updated_at: now,
        })
    }

    /// Overwrite the editable fields from a draft
    pub fn apply_draft(&mut self, draft: &EventDraft) -> Result<()> {
        draft.validate()?;
        self.name = draft.name.trim().to_string();
        self.description = draft.description.clone().filter(|d| !d.trim().is_empty());
        self.starts_at = draft.starts_at;
        self.ends_at = draft.ends_at;
        self.kind = draft.kind;
        self.updated_at = Utc::now();
        Ok(())
    }
}

/// Input for creating or editing an event
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventDraft {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
    pub starts_at: DateTime<Utc>,
    pub ends_at: DateTime<Utc>,
    #[serde(default)]
    pub kind: EventKind,
    /// Activate right after creation (deactivating every other event)
    #[serde(default)]
    pub activate: bool,
}

impl EventDraft {
    pub fn validate(&self) -> Result<()> {
        if self.name.trim().is_empty() {
            return Err(Error::Validation("event name is required".into()));
        }
        if self.ends_at < self.starts_at {
            return Err(Error::Validation("event ends before it starts".into()));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn draft(name: &str) -> EventDraft {
        let starts_at = Utc::now();
        EventDraft {
            name: name.to_string(),
            description: Some("   ".to_string()),
            starts_at,
            ends_at: starts_at + Duration::hours(8),
            kind: EventKind::Staff,
            activate: false,
        }
    }

    #[test]
    fn test_from_draft_trims_and_drops_blank_description() {
        let event = Event::from_draft(&draft("  Seminario  ")).unwrap();
        assert_eq!(event.name, "Seminario");
        assert!(event.description.is_none());
        assert!(!event.active);
        assert_eq!(event.kind, EventKind::Staff);
    }

    #[test]
    fn test_draft_rejects_empty_name_and_inverted_range() {
        assert!(matches!(draft(" ").validate(), Err(Error::Validation(_))));

        let mut inverted = draft("Taller");
        inverted.ends_at = inverted.starts_at - Duration::minutes(1);
        assert!(matches!(inverted.validate(), Err(Error::Validation(_))));
    }

    #[test]
    fn test_kind_tags() {
        assert_eq!(EventKind::from_tag("staff"), EventKind::Staff);
        assert_eq!(EventKind::from_tag("trabajadores"), EventKind::Staff);
        assert_eq!(EventKind::from_tag("alumnos"), EventKind::Students);
        assert_eq!(EventKind::Staff.roster_label(), "Funcionarios");
    }
}
