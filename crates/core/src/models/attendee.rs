//! Attendee model - one person tracked for an event

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::national_id;

/// A stored attendee document, as written by admin actions and imports.
///
/// Name fields are kept exactly as entered: some rosters carry split
/// given/family names, others only a full name. The roster normalizer
/// produces the uniform view used by tables and exports.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attendee {
    pub id: Uuid,
    pub event_id: Uuid,
    pub national_id: String,
    pub given_names: Option<String>,
    pub family_names: Option<String>,
    pub full_name: Option<String>,
    pub program: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub seat: Option<String>,
    pub group: Option<String>,
    pub present: bool,
    /// Staff only: pre-registered intent to attend
    pub confirmed: Option<bool>,
    pub observation: Option<String>,
    pub created_at: DateTime<Utc>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

impl Attendee {
    /// Build a new attendee for an event. Presence always starts false.
    pub fn from_draft(event_id: Uuid, draft: &AttendeeDraft) -> Result<Self> {
        draft.validate()?;
        Ok(Self {
            id: Uuid::new_v4(),
            event_id,
            national_id: draft.national_id.trim().to_string(),
            given_names: non_blank(&draft.given_names),
            family_names: non_blank(&draft.family_names),
            full_name: non_blank(&draft.full_name),
            program: non_blank(&draft.program),
            institution: non_blank(&draft.institution),
            department: non_blank(&draft.department),
            seat: non_blank(&draft.seat),
            group: non_blank(&draft.group),
            present: false,
            confirmed: draft.confirmed,
            observation: non_blank(&draft.observation),
            created_at: Utc::now(),
            checked_in_at: None,
        })
    }

    /// Rewrite every editable field from a draft (admin edit action)
    pub fn apply_draft(&mut self, draft: &AttendeeDraft) -> Result<()> {
        draft.validate()?;
        self.national_id = draft.national_id.trim().to_string();
        self.given_names = non_blank(&draft.given_names);
        self.family_names = non_blank(&draft.family_names);
        self.full_name = non_blank(&draft.full_name);
        self.program = non_blank(&draft.program);
        self.institution = non_blank(&draft.institution);
        self.department = non_blank(&draft.department);
        self.seat = non_blank(&draft.seat);
        self.group = non_blank(&draft.group);
        self.confirmed = draft.confirmed;
        self.observation = non_blank(&draft.observation);
        Ok(())
    }

    /// Lookup key for the national id (punctuation stripped, upper-case)
    pub fn national_key(&self) -> String {
        national_id::clean(&self.national_id)
    }
}

/// Input for adding or editing an attendee
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttendeeDraft {
    pub national_id: String,
    #[serde(default)]
    pub given_names: Option<String>,
    #[serde(default)]
    pub family_names: Option<String>,
    #[serde(default)]
    pub full_name: Option<String>,
    #[serde(default)]
    pub program: Option<String>,
    #[serde(default)]
    pub institution: Option<String>,
    #[serde(default)]
    pub department: Option<String>,
    #[serde(default)]
    pub seat: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub confirmed: Option<bool>,
    #[serde(default)]
    pub observation: Option<String>,
}

impl AttendeeDraft {
    pub fn validate(&self) -> Result<()> {
        if national_id::clean(&self.national_id).is_empty() {
            return Err(Error::Validation("national id is required".into()));
        }
        let has_split = non_blank(&self.given_names).is_some() || non_blank(&self.family_names).is_some();
        if !has_split && non_blank(&self.full_name).is_none() {
            return Err(Error::Validation("a name is required".into()));
        }
        Ok(())
    }
}

fn non_blank(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}
