//! Hub client used by remote kiosks and admin panels

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use rollcall_core::{
    Attendee, AttendeeDraft, CheckInOutcome, Column, Event, EventDraft, ExportSelection,
    ImportReport, RosterEntry,
};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot, RwLock};
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{Credentials, FeedTarget, Message, PeerRole, Request, Response};

/// Hub is considered dead after this long without any frame
const HUB_SILENT_TIMEOUT_MS: u64 = 6000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    Connected,
    Disconnected,
}

/// Pushed by the hub, independent of any request
#[derive(Debug, Clone)]
pub enum HubEvent {
    Events(Vec<Event>),
    Roster {
        target: FeedTarget,
        entries: Vec<RosterEntry>,
    },
    FeedError {
        target: FeedTarget,
        message: String,
    },
    /// No frame for longer than the heartbeat allows
    HubSilent,
    ServerShutdown,
    Disconnected,
}

type Pending = oneshot::Sender<Result<Response>>;

enum ClientCommand {
    Request { body: Request, reply: Pending },
    Disconnect,
}

/// Client handle; requests may be issued from several tasks at once
pub struct Client {
    peer_id: Uuid,
    role: PeerRole,
    state: Arc<RwLock<ConnectionState>>,
    event_rx: mpsc::Receiver<HubEvent>,
    cmd_tx: mpsc::Sender<ClientCommand>,
}

impl Client {
    /// Connect as a kiosk, presenting the hub token if one is configured
    pub async fn connect_kiosk(addr: SocketAddr, token: Option<String>) -> Result<Self> {
        Self::connect(
            addr,
            Message::Hello {
                role: PeerRole::Kiosk,
                token,
                credentials: None,
            },
        )
        .await
    }

    /// Connect as an admin panel
    pub async fn connect_admin(addr: SocketAddr, email: &str, password: &str) -> Result<Self> {
        Self::connect(
            addr,
            Message::Hello {
                role: PeerRole::Admin,
                token: None,
                credentials: Some(Credentials {
                    email: email.to_string(),
                    password: password.to_string(),
                }),
            },
        )
        .await
    }

    async fn connect(addr: SocketAddr, hello: Message) -> Result<Self> {
        info!(addr = %addr, "Connecting to hub");
        let stream = TcpStream::connect(addr).await?;
        let (mut reader, mut writer) = tokio::io::split(stream);

        write_frame(&mut writer, &hello).await?;
        let (role, peer_id) = match read_frame(&mut reader).await? {
            Message::Welcome { role, peer_id } => (role, peer_id),
            Message::Rejected { reason } => {
                warn!(reason = %reason, "Hub refused connection");
                return Err(Error::Rejected(reason));
            }
            other => {
                return Err(Error::Protocol(format!("Expected Welcome, got {:?}", other)));
            }
        };
        info!(peer_id = %peer_id, role = ?role, "Connected to hub");

        let state = Arc::new(RwLock::new(ConnectionState::Connected));
        let (event_tx, event_rx) = mpsc::channel(64);
        let (cmd_tx, cmd_rx) = mpsc::channel(64);
        tokio::spawn(connection_task(reader, writer, state.clone(), event_tx, cmd_rx));

        Ok(Client {
            peer_id,
            role,
            state,
            event_rx,
            cmd_tx,
        })
    }

    pub fn peer_id(&self) -> Uuid {
        self.peer_id
    }

    pub fn role(&self) -> PeerRole {
        self.role
    }

    pub async fn connection_state(&self) -> ConnectionState {
        *self.state.read().await
    }

    /// Next pushed event; `None` once the connection task is gone
    pub async fn next_event(&mut self) -> Option<HubEvent> {
        self.event_rx.recv().await
    }

    /// Send a request and wait for its reply
    pub async fn request(&self, body: Request) -> Result<Response> {
        let (reply, response) = oneshot::channel();
        self.cmd_tx
            .send(ClientCommand::Request { body, reply })
            .await
            .map_err(|_| Error::NotConnected)?;
        response.await.map_err(|_| Error::NotConnected)?
    }

    async fn request_done(&self, body: Request) -> Result<()> {
        match self.request(body).await? {
            Response::Done => Ok(()),
            other => Err(unexpected(other)),
        }
    }

    async fn request_event(&self, body: Request) -> Result<Event> {
        match self.request(body).await? {
            Response::Event(event) => Ok(event),
            other => Err(unexpected(other)),
        }
    }

    async fn request_attendee(&self, body: Request) -> Result<Attendee> {
        match self.request(body).await? {
            Response::Attendee(attendee) => Ok(attendee),
            other => Err(unexpected(other)),
        }
    }

    pub async fn check_in(&self, national_id: &str) -> Result<CheckInOutcome> {
        let body = Request::CheckIn {
            national_id: national_id.to_string(),
        };
        match self.request(body).await? {
            Response::CheckIn(outcome) => Ok(outcome),
            other => Err(unexpected(other)),
        }
    }

    /// Follow a feed; the current snapshot arrives as a [`HubEvent`]
    pub async fn subscribe(&self, target: FeedTarget) -> Result<()> {
        self.request_done(Request::Subscribe { target }).await
    }

    pub async fn unsubscribe(&self, target: FeedTarget) -> Result<()> {
        self.request_done(Request::Unsubscribe { target }).await
    }

    pub async fn create_event(&self, draft: EventDraft) -> Result<Event> {
        self.request_event(Request::CreateEvent { draft }).await
    }

    pub async fn update_event(&self, event_id: Uuid, draft: EventDraft) -> Result<Event> {
        self.request_event(Request::UpdateEvent { event_id, draft })
            .await
    }

    pub async fn activate_event(&self, event_id: Uuid) -> Result<()> {
        self.request_done(Request::ActivateEvent { event_id }).await
    }

    pub async fn deactivate_event(&self, event_id: Uuid) -> Result<()> {
        self.request_done(Request::DeactivateEvent { event_id }).await
    }

    pub async fn delete_event(&self, event_id: Uuid) -> Result<()> {
        self.request_done(Request::DeleteEvent { event_id }).await
    }

    pub async fn add_attendee(&self, event_id: Uuid, draft: AttendeeDraft) -> Result<Attendee> {
        self.request_attendee(Request::AddAttendee { event_id, draft })
            .await
    }

    pub async fn update_attendee(&self, attendee_id: Uuid, draft: AttendeeDraft) -> Result<Attendee> {
        self.request_attendee(Request::UpdateAttendee { attendee_id, draft })
            .await
    }

    pub async fn delete_attendee(&self, attendee_id: Uuid) -> Result<()> {
        self.request_done(Request::DeleteAttendee { attendee_id })
            .await
    }

    /// Returns how many attendees were removed
    pub async fn clear_roster(&self, event_id: Uuid) -> Result<u64> {
        match self.request(Request::ClearRoster { event_id }).await? {
            Response::Cleared { deleted } => Ok(deleted),
            other => Err(unexpected(other)),
        }
    }

    /// Rows are (header, cell) pairs as read from the source sheet
    pub async fn import_rows(
        &self,
        event_id: Uuid,
        rows: Vec<Vec<(String, String)>>,
    ) -> Result<ImportReport> {
        match self.request(Request::ImportRows { event_id, rows }).await? {
            Response::Imported(report) => Ok(report),
            other => Err(unexpected(other)),
        }
    }

    /// Workbook bytes, ready to be written to an .xlsx file
    pub async fn export_roster(
        &self,
        event_id: Uuid,
        selection: ExportSelection,
        columns: Vec<Column>,
    ) -> Result<Vec<u8>> {
        self.request(Request::ExportRoster {
            event_id,
            selection,
            columns,
        })
        .await?
        .workbook_bytes()
    }

    pub async fn disconnect(&self) {
        let _ = self.cmd_tx.send(ClientCommand::Disconnect).await;
    }
}

fn unexpected(response: Response) -> Error {
    Error::Protocol(format!("Unexpected reply: {:?}", response))
}

async fn connection_task(
    mut reader: ReadHalf<TcpStream>,
    mut writer: WriteHalf<TcpStream>,
    state: Arc<RwLock<ConnectionState>>,
    event_tx: mpsc::Sender<HubEvent>,
    mut cmd_rx: mpsc::Receiver<ClientCommand>,
) {
    let mut pending: HashMap<u64, Pending> = HashMap::new();
    let mut next_request_id: u64 = 1;
    let mut last_frame = Instant::now();
    let silence_check = Duration::from_millis(1000);

    loop {
        tokio::select! {
            result = read_frame(&mut reader) => {
                match result {
                    Ok(msg) => {
                        last_frame = Instant::now();
                        match msg {
                            Message::Reply { request_id, result } => {
                                match pending.remove(&request_id) {
                                    Some(reply) => {
                                        let _ = reply.send(result.map_err(|f| Error::Service(f.message)));
                                    }
                                    None => debug!(request_id, "Reply for unknown request"),
                                }
                            }
                            Message::Ping => {
                                if let Err(e) = write_frame(&mut writer, &Message::Pong).await {
                                    warn!(error = %e, "Write error");
                                    break;
                                }
                            }
                            Message::ServerShutdown => {
                                let _ = event_tx.send(HubEvent::ServerShutdown).await;
                            }
                            other => {
                                if let Some(event) = push_event(other) {
                                    let _ = event_tx.send(event).await;
                                }
                            }
                        }
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!("Hub closed connection");
                        break;
                    }
                    Err(e) => {
                        warn!(error = %e, "Read error");
                        break;
                    }
                }
            }

            cmd = cmd_rx.recv() => {
                match cmd {
                    Some(ClientCommand::Request { body, reply }) => {
                        let request_id = next_request_id;
                        next_request_id += 1;
                        let msg = Message::Request { request_id, body };
                        match write_frame(&mut writer, &msg).await {
                            Ok(()) => {
                                pending.insert(request_id, reply);
                            }
                            Err(e) => {
                                warn!(error = %e, "Write error");
                                let _ = reply.send(Err(e));
                                break;
                            }
                        }
                    }
                    Some(ClientCommand::Disconnect) | None => {
                        debug!("Disconnect requested");
                        break;
                    }
                }
            }

            _ = tokio::time::sleep(silence_check) => {
                let silent_ms = last_frame.elapsed().as_millis() as u64;
                if silent_ms > HUB_SILENT_TIMEOUT_MS {
                    warn!(silent_ms, "Hub stopped responding");
                    let _ = event_tx.send(HubEvent::HubSilent).await;
                    break;
                }
            }
        }
    }

    // Outstanding requests resolve to NotConnected when their senders drop
    pending.clear();
    *state.write().await = ConnectionState::Disconnected;
    let _ = event_tx.send(HubEvent::Disconnected).await;
    info!("Disconnected from hub");
}

fn push_event(msg: Message) -> Option<HubEvent> {
    match msg {
        Message::EventsSnapshot { events } => Some(HubEvent::Events(events)),
        Message::RosterSnapshot { target, entries } => Some(HubEvent::Roster { target, entries }),
        Message::FeedError { target, message } => Some(HubEvent::FeedError { target, message }),
        Message::Pong => None,
        other => {
            debug!(message = ?other, "Ignoring unexpected message");
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::server::Server;
    use chrono::{Duration as ChronoDuration, Utc};
    use rollcall_core::{auth, AttendanceService, Database, EventKind};

    const EMAIL: &str = "admin@rollcall.test";
    const PASSWORD: &str = "secreto123";

    async fn hub(token: Option<&str>) -> (Server, SocketAddr, Arc<AttendanceService>) {
        let db = Database::open_in_memory().unwrap();
        auth::register_admin(&db, EMAIL, PASSWORD).unwrap();
        let service = Arc::new(AttendanceService::new(db));
        let server = Server::start(0, service.clone(), token.map(str::to_string))
            .await
            .unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], server.addr().port()));
        (server, addr, service)
    }

    fn draft(name: &str) -> EventDraft {
        let starts_at = Utc::now();
        EventDraft {
            name: name.to_string(),
            description: None,
            starts_at,
            ends_at: starts_at + ChronoDuration::hours(2),
            kind: EventKind::Students,
            activate: true,
        }
    }

    fn attendee(rut: &str, given: &str) -> AttendeeDraft {
        AttendeeDraft {
            national_id: rut.to_string(),
            given_names: Some(given.to_string()),
            family_names: Some("Pérez Soto".to_string()),
            program: Some("Enfermería".to_string()),
            institution: Some("Sede Centro".to_string()),
            ..Default::default()
        }
    }

    async fn next_roster(client: &mut Client) -> Vec<RosterEntry> {
        loop {
            let event = tokio::time::timeout(Duration::from_secs(5), client.next_event())
                .await
                .expect("timed out waiting for roster")
                .expect("connection ended");
            if let HubEvent::Roster { entries, .. } = event {
                return entries;
            }
        }
    }

    #[tokio::test]
    async fn test_kiosk_check_in_pushes_roster() {
        let (server, addr, service) = hub(Some("puerta")).await;
        let event = service.create_event(&draft("Titulación")).unwrap();
        service
            .add_attendee(event.id, &attendee("12345678-5", "Ana"))
            .unwrap();

        let mut kiosk = Client::connect_kiosk(addr, Some("puerta".into()))
            .await
            .unwrap();
        assert_eq!(kiosk.role(), PeerRole::Kiosk);
        kiosk.subscribe(FeedTarget::ActiveRoster).await.unwrap();
        let roster = next_roster(&mut kiosk).await;
        assert_eq!(roster.len(), 1);
        assert!(!roster[0].present);

        let outcome = kiosk.check_in(" 12345678-5 ").await.unwrap();
        assert!(matches!(outcome, CheckInOutcome::CheckedIn(ref e) if e.given_names == "Ana"));
        let roster = next_roster(&mut kiosk).await;
        assert!(roster[0].present);

        let again = kiosk.check_in("12345678-5").await.unwrap();
        assert!(matches!(again, CheckInOutcome::AlreadyPresent(_)));
        let missing = kiosk.check_in("99999999-9").await.unwrap();
        assert_eq!(missing, CheckInOutcome::NotFound);

        kiosk.disconnect().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_kiosk_cannot_administer() {
        let (server, addr, service) = hub(None).await;
        let event = service.create_event(&draft("Charla")).unwrap();

        let kiosk = Client::connect_kiosk(addr, None).await.unwrap();
        let err = kiosk.clear_roster(event.id).await.unwrap_err();
        assert!(matches!(err, Error::Service(ref m) if m.contains("not allowed")));
        assert!(kiosk.check_in("   ").await.is_err());

        kiosk.disconnect().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_wrong_token_rejected() {
        let (server, addr, _service) = hub(Some("puerta")).await;
        let err = Client::connect_kiosk(addr, None).await.err().unwrap();
        assert!(matches!(err, Error::Rejected(_)));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_admin_sign_in() {
        let (server, addr, _service) = hub(None).await;
        let err = Client::connect_admin(addr, EMAIL, "incorrecta").await.err().unwrap();
        assert!(matches!(err, Error::Rejected(ref r) if r.contains("Invalid credentials")));

        let admin = Client::connect_admin(addr, EMAIL, PASSWORD).await.unwrap();
        assert_eq!(admin.role(), PeerRole::Admin);
        admin.disconnect().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_admin_manages_roster() {
        let (server, addr, _service) = hub(None).await;
        let mut admin = Client::connect_admin(addr, EMAIL, PASSWORD).await.unwrap();

        let event = admin.create_event(draft("Seminario")).await.unwrap();
        assert!(event.active);
        admin.subscribe(FeedTarget::Roster { event_id: event.id }).await.unwrap();
        assert!(next_roster(&mut admin).await.is_empty());

        admin
            .add_attendee(event.id, attendee("11111111-1", "Luis"))
            .await
            .unwrap();
        assert_eq!(next_roster(&mut admin).await.len(), 1);

        let rows = vec![
            vec![
                ("RUT".to_string(), "22222222-2".to_string()),
                ("Nombre Completo".to_string(), "Carla Andrea Rojas Díaz".to_string()),
                ("Carrera".to_string(), "Derecho".to_string()),
                ("Sede".to_string(), "Sede Sur".to_string()),
            ],
            vec![("RUT".to_string(), "33333333-3".to_string())],
        ];
        let report = admin.import_rows(event.id, rows).await.unwrap();
        assert_eq!(report, ImportReport { created: 1, failed: 1 });
        assert_eq!(next_roster(&mut admin).await.len(), 2);

        let workbook = admin
            .export_roster(
                event.id,
                ExportSelection::All,
                Column::for_kind(EventKind::Students).to_vec(),
            )
            .await
            .unwrap();
        assert_eq!(&workbook[..2], b"PK");

        assert_eq!(admin.clear_roster(event.id).await.unwrap(), 2);
        admin.disconnect().await;
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_shutdown_is_announced() {
        let (server, addr, _service) = hub(None).await;
        let mut kiosk = Client::connect_kiosk(addr, None).await.unwrap();
        server.shutdown().await;

        let mut saw_shutdown = false;
        while let Ok(Some(event)) =
            tokio::time::timeout(Duration::from_secs(5), kiosk.next_event()).await
        {
            match event {
                HubEvent::ServerShutdown => saw_shutdown = true,
                HubEvent::Disconnected => break,
                _ => {}
            }
        }
        assert!(saw_shutdown);
        assert_eq!(kiosk.connection_state().await, ConnectionState::Disconnected);
    }
}
