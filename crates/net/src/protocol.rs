//! Hub protocol message types
//!
//! All messages are JSON-serialized and length-prefixed on the wire.

use base64::engine::general_purpose::STANDARD;
use base64::Engine;
use rollcall_core::{
    Attendee, AttendeeDraft, CheckInOutcome, Column, Event, EventDraft, ExportSelection,
    ImportReport, ImportRow, RosterEntry,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// What a connecting peer wants to be
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeerRole {
    /// Entrance terminal: check-in and read-only feeds
    Kiosk,
    /// Admin panel: every operation
    Admin,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: String,
}

/// A live feed a peer can follow
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(tag = "feed", rename_all = "snake_case")]
pub enum FeedTarget {
    Events,
    ActiveRoster,
    Roster { event_id: Uuid },
}

/// Operations a peer can ask the hub to run
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "op", rename_all = "snake_case")]
pub enum Request {
    CheckIn { national_id: String },
    Subscribe { target: FeedTarget },
    Unsubscribe { target: FeedTarget },

    CreateEvent { draft: EventDraft },
    UpdateEvent { event_id: Uuid, draft: EventDraft },
    ActivateEvent { event_id: Uuid },
    DeactivateEvent { event_id: Uuid },
    DeleteEvent { event_id: Uuid },

    AddAttendee { event_id: Uuid, draft: AttendeeDraft },
    UpdateAttendee { attendee_id: Uuid, draft: AttendeeDraft },
    DeleteAttendee { attendee_id: Uuid },
    ClearRoster { event_id: Uuid },
    /// Rows as (header, cell) pairs in column order
    ImportRows {
        event_id: Uuid,
        rows: Vec<Vec<(String, String)>>,
    },
    ExportRoster {
        event_id: Uuid,
        selection: ExportSelection,
        columns: Vec<Column>,
    },
}

impl Request {
    /// Kiosks may only check in and follow feeds
    pub fn allowed_for(&self, role: PeerRole) -> bool {
        match role {
            PeerRole::Admin => true,
            PeerRole::Kiosk => matches!(
                self,
                Request::CheckIn { .. } | Request::Subscribe { .. } | Request::Unsubscribe { .. }
            ),
        }
    }

    /// Short name for logs
    pub fn name(&self) -> &'static str {
        match self {
            Request::CheckIn { .. } => "check_in",
            Request::Subscribe { .. } => "subscribe",
            Request::Unsubscribe { .. } => "unsubscribe",
            Request::CreateEvent { .. } => "create_event",
            Request::UpdateEvent { .. } => "update_event",
            Request::ActivateEvent { .. } => "activate_event",
            Request::DeactivateEvent { .. } => "deactivate_event",
            Request::DeleteEvent { .. } => "delete_event",
            Request::AddAttendee { .. } => "add_attendee",
            Request::UpdateAttendee { .. } => "update_attendee",
            Request::DeleteAttendee { .. } => "delete_attendee",
            Request::ClearRoster { .. } => "clear_roster",
            Request::ImportRows { .. } => "import_rows",
            Request::ExportRoster { .. } => "export_roster",
        }
    }
}

/// Convert wire rows back into import rows
pub fn import_rows_from_wire(rows: &[Vec<(String, String)>]) -> Vec<ImportRow> {
    rows.iter()
        .map(|cells| ImportRow::from_pairs(cells.iter().map(|(k, v)| (k.as_str(), v.clone()))))
        .collect()
}

/// Successful result of a request
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum Response {
    Done,
    CheckIn(CheckInOutcome),
    Event(Event),
    Attendee(Attendee),
    Cleared { deleted: u64 },
    Imported(ImportReport),
    /// Base64-encoded xlsx workbook
    Exported { workbook: String },
}

impl Response {
    pub fn exported(bytes: &[u8]) -> Self {
        Response::Exported {
            workbook: STANDARD.encode(bytes),
        }
    }

    /// Decode an exported workbook
    pub fn workbook_bytes(&self) -> Result<Vec<u8>> {
        match self {
            Response::Exported { workbook } => STANDARD
                .decode(workbook)
                .map_err(|e| Error::Protocol(format!("Invalid workbook encoding: {}", e))),
            other => Err(Error::Protocol(format!("Expected workbook, got {:?}", other))),
        }
    }
}

/// Failed request, as seen by the peer
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Failure {
    pub message: String,
}

/// Hub protocol messages
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Message {
    /// First frame from a peer
    Hello {
        role: PeerRole,
        #[serde(default)]
        token: Option<String>,
        #[serde(default)]
        credentials: Option<Credentials>,
    },

    /// Handshake accepted
    Welcome { role: PeerRole, peer_id: Uuid },

    /// Handshake refused; the connection closes after this
    Rejected { reason: String },

    Request { request_id: u64, body: Request },

    Reply {
        request_id: u64,
        result: std::result::Result<Response, Failure>,
    },

    EventsSnapshot { events: Vec<Event> },

    RosterSnapshot {
        target: FeedTarget,
        entries: Vec<RosterEntry>,
    },

    /// A followed feed could not be refreshed
    FeedError { target: FeedTarget, message: String },

    /// Ping to keep connection alive
    Ping,

    /// Pong response to ping
    Pong,

    /// Server is shutting down
    ServerShutdown,
}

impl Message {
    /// Serialize message to JSON bytes
    pub fn to_bytes(&self) -> std::result::Result<Vec<u8>, serde_json::Error> {
        serde_json::to_vec(self)
    }

    /// Deserialize message from JSON bytes
    pub fn from_bytes(bytes: &[u8]) -> std::result::Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kiosk_permissions() {
        let check_in = Request::CheckIn {
            national_id: "12345678-5".into(),
        };
        let clear = Request::ClearRoster {
            event_id: Uuid::new_v4(),
        };
        assert!(check_in.allowed_for(PeerRole::Kiosk));
        assert!(!clear.allowed_for(PeerRole::Kiosk));
        assert!(clear.allowed_for(PeerRole::Admin));
    }

    #[test]
    fn test_reply_wire_shape() {
        let msg = Message::Reply {
            request_id: 7,
            result: Ok(Response::CheckIn(CheckInOutcome::NotFound)),
        };
        let json: serde_json::Value = serde_json::from_slice(&msg.to_bytes().unwrap()).unwrap();
        assert_eq!(json["type"], "Reply");
        assert_eq!(json["request_id"], 7);
        assert_eq!(json["result"]["Ok"]["kind"], "check_in");
        assert_eq!(json["result"]["Ok"]["value"]["outcome"], "not_found");
    }

    #[test]
    fn test_roster_target_tagging() {
        let event_id = Uuid::new_v4();
        let msg = Message::Request {
            request_id: 1,
            body: Request::Subscribe {
                target: FeedTarget::Roster { event_id },
            },
        };
        let decoded = Message::from_bytes(&msg.to_bytes().unwrap()).unwrap();
        match decoded {
            Message::Request {
                body: Request::Subscribe { target },
                ..
            } => assert_eq!(target, FeedTarget::Roster { event_id }),
            other => panic!("Wrong message: {:?}", other),
        }
    }

    #[test]
    fn test_workbook_encoding() {
        let bytes = vec![0x50, 0x4b, 0x03, 0x04, 0xff];
        let response = Response::exported(&bytes);
        assert_eq!(response.workbook_bytes().unwrap(), bytes);
        assert!(Response::Done.workbook_bytes().is_err());
    }
}
