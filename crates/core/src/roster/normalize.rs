//! Record normalizer: stored attendee documents to uniform roster entries

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::Attendee;

/// Number of trailing tokens taken as family names when only a full name exists
const FAMILY_NAME_TOKENS: usize = 2;

/// An attendee with both split and joined name views always populated
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RosterEntry {
    pub id: Uuid,
    pub event_id: Uuid,
    pub national_id: String,
    pub given_names: String,
    pub family_names: String,
    pub full_name: String,
    pub program: Option<String>,
    pub institution: Option<String>,
    pub department: Option<String>,
    pub seat: Option<String>,
    pub group: Option<String>,
    pub present: bool,
    pub confirmed: bool,
    pub observation: Option<String>,
    pub checked_in_at: Option<DateTime<Utc>>,
}

/// Derive (given, family) from a joined full name.
///
/// The family name is the last two whitespace-separated tokens; the given
/// names are whatever precedes them, or the whole name when nothing does.
pub fn split_full_name(full_name: &str) -> (String, String) {
    let tokens: Vec<&str> = full_name.split_whitespace().collect();
    let cut = tokens.len().saturating_sub(FAMILY_NAME_TOKENS);
    let family = tokens[cut..].join(" ");
    let given = if cut == 0 {
        tokens.join(" ")
    } else {
        tokens[..cut].join(" ")
    };
    (given, family)
}

/// Normalize one stored attendee
pub fn normalize(attendee: &Attendee) -> RosterEntry {
    let given = attendee.given_names.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let family = attendee.family_names.as_deref().map(str::trim).filter(|s| !s.is_empty());
    let full = attendee.full_name.as_deref().map(str::trim).filter(|s| !s.is_empty());

    let (given_names, family_names, full_name) = match (given, family, full) {
        (Some(g), Some(f), full) => (
            g.to_string(),
            f.to_string(),
            full.map(str::to_string).unwrap_or_else(|| format!("{} {}", g, f)),
        ),
        (g, f, Some(full)) => {
            let (derived_given, derived_family) = split_full_name(full);
            (
                g.map(str::to_string).unwrap_or(derived_given),
                f.map(str::to_string).unwrap_or(derived_family),
                full.to_string(),
            )
        }
        (g, f, None) => {
            let g = g.unwrap_or_default().to_string();
            let f = f.unwrap_or_default().to_string();
            let joined = format!("{} {}", g, f).trim().to_string();
            (g, f, joined)
        }
    };

    RosterEntry {
        id: attendee.id,
        event_id: attendee.event_id,
        national_id: attendee.national_id.trim().to_string(),
        given_names,
        family_names,
        full_name,
        program: attendee.program.clone(),
        institution: attendee.institution.clone(),
        department: attendee.department.clone(),
        seat: attendee.seat.clone(),
        group: attendee.group.clone(),
        present: attendee.present,
        confirmed: attendee.confirmed.unwrap_or(false),
        observation: attendee.observation.clone(),
        checked_in_at: attendee.checked_in_at,
    }
}

/// Normalize a whole roster snapshot, keeping its order
pub fn normalize_all(attendees: &[Attendee]) -> Vec<RosterEntry> {
    attendees.iter().map(normalize).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stored(given: Option<&str>, family: Option<&str>, full: Option<&str>) -> Attendee {
        Attendee {
            id: Uuid::new_v4(),
            event_id: Uuid::new_v4(),
            national_id: " 12345678-5 ".into(),
            given_names: given.map(Into::into),
            family_names: family.map(Into::into),
            full_name: full.map(Into::into),
            program: None,
            institution: None,
            department: None,
            seat: None,
            group: None,
            present: false,
            confirmed: None,
            observation: None,
            created_at: Utc::now(),
            checked_in_at: None,
        }
    }

    #[test]
    fn test_split_full_name_takes_last_two_tokens() {
        assert_eq!(
            split_full_name("Juan Carlos Pérez  Soto"),
            ("Juan Carlos".to_string(), "Pérez Soto".to_string())
        );
        assert_eq!(
            split_full_name("Ana López"),
            ("Ana López".to_string(), "Ana López".to_string())
        );
        assert_eq!(split_full_name("Cher"), ("Cher".to_string(), "Cher".to_string()));
        assert_eq!(split_full_name("  "), (String::new(), String::new()));
    }

    #[test]
    fn test_normalize_joins_split_names() {
        let entry = normalize(&stored(Some("María"), Some("González"), None));
        assert_eq!(entry.full_name, "María González");
        assert_eq!(entry.national_id, "12345678-5");
        assert!(!entry.confirmed);
    }

    #[test]
    fn test_normalize_derives_from_full_name() {
        let entry = normalize(&stored(None, None, Some("Luis Alberto Martínez Rojas")));
        assert_eq!(entry.given_names, "Luis Alberto");
        assert_eq!(entry.family_names, "Martínez Rojas");
    }

    #[test]
    fn test_normalize_prefers_stored_split_over_derived() {
        let entry = normalize(&stored(Some("Luis"), None, Some("Luis Alberto Martínez Rojas")));
        assert_eq!(entry.given_names, "Luis");
        assert_eq!(entry.family_names, "Martínez Rojas");
        assert_eq!(entry.full_name, "Luis Alberto Martínez Rojas");
    }
}
