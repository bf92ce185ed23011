//! Roster hub server
//!
//! Runs next to the attendance service and lets kiosks and admin panels on
//! other machines use it. Requests are answered one at a time per peer;
//! feed subscriptions leave their newest snapshot in the peer's outbox, so a
//! slow peer skips intermediate snapshots but always gets the latest one.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use rollcall_core::{AttendanceService, RosterEntry, Subscription};
use tokio::io::{ReadHalf, WriteHalf};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::{broadcast, mpsc, watch, RwLock};
use tracing::{debug, error, info, warn};
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::frame::{read_frame, write_frame};
use crate::protocol::{
    import_rows_from_wire, Credentials, Failure, FeedTarget, Message, PeerRole, Request, Response,
};

/// Maximum number of connected peers
const MAX_PEERS: usize = 32;

const HEARTBEAT_INTERVAL_MS: u64 = 2000;

/// Outgoing queue depth per peer, for replies and control frames
const PEER_QUEUE: usize = 64;

struct Peer {
    role: PeerRole,
    tx: mpsc::Sender<Message>,
}

/// Undelivered feed frames of one target
#[derive(Default)]
struct PendingFeed {
    snapshot: Option<Message>,
    error: Option<Message>,
}

/// Latest undelivered feed frames of one peer, one slot per target
struct FeedOutbox {
    pending: Mutex<HashMap<FeedTarget, PendingFeed>>,
    wake: watch::Sender<()>,
}

impl FeedOutbox {
    fn new() -> (Arc<Self>, watch::Receiver<()>) {
        let (wake, woken) = watch::channel(());
        let outbox = FeedOutbox {
            pending: Mutex::new(HashMap::new()),
            wake,
        };
        (Arc::new(outbox), woken)
    }

    fn pending(&self) -> MutexGuard<'_, HashMap<FeedTarget, PendingFeed>> {
        match self.pending.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                error!("Feed outbox mutex poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }

    /// Replace any undelivered snapshot of this target
    fn snapshot(&self, target: FeedTarget, msg: Message) {
        {
            let mut pending = self.pending();
            let slot = pending.entry(target).or_default();
            if slot.snapshot.is_some() {
                debug!(feed = ?target, "Superseding undelivered snapshot");
            }
            slot.snapshot = Some(msg);
            slot.error = None;
        }
        self.wake.send_replace(());
    }

    fn error(&self, target: FeedTarget, msg: Message) {
        self.pending().entry(target).or_default().error = Some(msg);
        self.wake.send_replace(());
    }

    /// Forget a target the peer stopped following
    fn discard(&self, target: FeedTarget) {
        self.pending().remove(&target);
    }

    /// Take everything pending, each snapshot ahead of its error
    fn take(&self) -> Vec<Message> {
        self.pending()
            .drain()
            .flat_map(|(_, slot)| slot.snapshot.into_iter().chain(slot.error))
            .collect()
    }
}

struct ServerState {
    service: Arc<AttendanceService>,
    /// Required from kiosks when set
    token: Option<String>,
    peers: HashMap<Uuid, Peer>,
}

/// Hub server handle
pub struct Server {
    addr: SocketAddr,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
}

impl Server {
    /// Bind on all interfaces; port 0 picks a free one
    pub async fn start(
        port: u16,
        service: Arc<AttendanceService>,
        token: Option<String>,
    ) -> Result<Self> {
        let listener = TcpListener::bind(SocketAddr::from(([0, 0, 0, 0], port))).await?;
        let addr = listener.local_addr()?;
        info!(addr = %addr, kiosk_token = token.is_some(), "Hub started");

        let (shutdown_tx, _) = broadcast::channel(1);
        let state = Arc::new(RwLock::new(ServerState {
            service,
            token: token.filter(|t| !t.is_empty()),
            peers: HashMap::new(),
        }));

        tokio::spawn(accept_loop(listener, state.clone(), shutdown_tx.clone()));
        tokio::spawn(heartbeat_task(state.clone(), shutdown_tx.subscribe()));

        Ok(Server {
            addr,
            state,
            shutdown_tx,
        })
    }

    pub fn addr(&self) -> SocketAddr {
        self.addr
    }

    pub async fn peer_count(&self) -> usize {
        self.state.read().await.peers.len()
    }

    /// Tell every peer the hub is going away and stop accepting
    pub async fn shutdown(&self) {
        broadcast_to_peers(&self.state, Message::ServerShutdown).await;
        let _ = self.shutdown_tx.send(());
        info!("Hub shutdown initiated");
    }
}

async fn accept_loop(
    listener: TcpListener,
    state: Arc<RwLock<ServerState>>,
    shutdown_tx: broadcast::Sender<()>,
) {
    let mut shutdown_rx = shutdown_tx.subscribe();
    loop {
        tokio::select! {
            result = listener.accept() => {
                match result {
                    Ok((stream, addr)) => {
                        debug!(addr = %addr, "New connection");
                        tokio::spawn(handle_connection(
                            stream,
                            addr,
                            state.clone(),
                            shutdown_tx.subscribe(),
                        ));
                    }
                    Err(e) => {
                        error!(error = %e, "Accept failed");
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                info!("Accept loop shutting down");
                break;
            }
        }
    }
}

async fn handle_connection(
    stream: TcpStream,
    addr: SocketAddr,
    state: Arc<RwLock<ServerState>>,
    mut shutdown_rx: broadcast::Receiver<()>,
) {
    let (mut reader, mut writer) = tokio::io::split(stream);

    let role = match handshake(&mut reader, &state).await {
        Ok(role) => role,
        Err(e) => {
            warn!(addr = %addr, error = %e, "Handshake refused");
            let reason = match e {
                Error::Rejected(reason) => reason,
                other => other.to_string(),
            };
            let _ = write_frame(&mut writer, &Message::Rejected { reason }).await;
            return;
        }
    };

    let (tx, rx) = mpsc::channel(PEER_QUEUE);
    let peer_id = Uuid::new_v4();
    let service = {
        let mut s = state.write().await;
        if s.peers.len() >= MAX_PEERS {
            drop(s);
            warn!(addr = %addr, "Hub full");
            let _ = write_frame(
                &mut writer,
                &Message::Rejected {
                    reason: Error::ServerFull.to_string(),
                },
            )
            .await;
            return;
        }
        s.peers.insert(
            peer_id,
            Peer {
                role,
                tx: tx.clone(),
            },
        );
        s.service.clone()
    };

    let (outbox, woken) = FeedOutbox::new();
    let writer_handle = tokio::spawn(writer_task(writer, rx, outbox.clone(), woken));
    let _ = tx.send(Message::Welcome { role, peer_id }).await;
    info!(addr = %addr, peer_id = %peer_id, role = ?role, "Peer connected");

    // Dropped with the connection, which detaches every feed callback
    let mut subscriptions: HashMap<FeedTarget, Subscription> = HashMap::new();

    loop {
        tokio::select! {
            result = read_frame(&mut reader) => {
                match result {
                    Ok(Message::Request { request_id, body }) => {
                        let result = handle_request(&service, role, &outbox, &mut subscriptions, body)
                            .await
                            .map_err(|e| Failure { message: e.to_string() });
                        if tx.send(Message::Reply { request_id, result }).await.is_err() {
                            break;
                        }
                    }
                    Ok(Message::Ping) => {
                        let _ = tx.send(Message::Pong).await;
                    }
                    Ok(Message::Pong) => {}
                    Ok(other) => {
                        debug!(peer_id = %peer_id, message = ?other, "Ignoring unexpected message");
                    }
                    Err(Error::ConnectionClosed) => {
                        debug!(peer_id = %peer_id, "Connection closed");
                        break;
                    }
                    Err(e) => {
                        warn!(peer_id = %peer_id, error = %e, "Read error");
                        break;
                    }
                }
            }
            _ = shutdown_rx.recv() => {
                break;
            }
        }
    }

    drop(subscriptions);
    state.write().await.peers.remove(&peer_id);
    // Let queued frames (such as the shutdown notice) drain before closing
    drop(tx);
    if tokio::time::timeout(Duration::from_millis(500), writer_handle)
        .await
        .is_err()
    {
        debug!(peer_id = %peer_id, "Writer did not drain in time");
    }
    info!(peer_id = %peer_id, "Peer disconnected");
}

/// First frame must be a Hello the hub accepts
async fn handshake(
    reader: &mut ReadHalf<TcpStream>,
    state: &Arc<RwLock<ServerState>>,
) -> Result<PeerRole> {
    match read_frame(reader).await? {
        Message::Hello {
            role: PeerRole::Kiosk,
            token,
            ..
        } => {
            let s = state.read().await;
            match &s.token {
                Some(expected) if token.as_ref() != Some(expected) => {
                    Err(Error::Rejected("Invalid token".into()))
                }
                _ => Ok(PeerRole::Kiosk),
            }
        }
        Message::Hello {
            role: PeerRole::Admin,
            credentials,
            ..
        } => {
            let Credentials { email, password } =
                credentials.ok_or_else(|| Error::Rejected("Credentials required".into()))?;
            let service = state.read().await.service.clone();
            run_blocking(&service, move |s| s.sign_in(&email, &password))
                .await
                .map_err(|e| Error::Rejected(e.to_string()))?;
            Ok(PeerRole::Admin)
        }
        _ => Err(Error::Protocol("Expected Hello".into())),
    }
}

async fn writer_task(
    mut writer: WriteHalf<TcpStream>,
    mut rx: mpsc::Receiver<Message>,
    outbox: Arc<FeedOutbox>,
    mut woken: watch::Receiver<()>,
) {
    loop {
        let batch = tokio::select! {
            msg = rx.recv() => match msg {
                Some(msg) => vec![msg],
                None => break,
            },
            changed = woken.changed() => {
                if changed.is_err() {
                    break;
                }
                outbox.take()
            }
        };
        for msg in &batch {
            if let Err(e) = write_frame(&mut writer, msg).await {
                debug!(error = %e, "Write failed");
                return;
            }
        }
    }
}

/// Run a service call off the async runtime
async fn run_blocking<T, F>(service: &Arc<AttendanceService>, f: F) -> Result<T>
where
    T: Send + 'static,
    F: FnOnce(&AttendanceService) -> rollcall_core::Result<T> + Send + 'static,
{
    let service = service.clone();
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| Error::Service(format!("Worker failed: {}", e)))?
        .map_err(Error::from)
}

async fn handle_request(
    service: &Arc<AttendanceService>,
    role: PeerRole,
    outbox: &Arc<FeedOutbox>,
    subscriptions: &mut HashMap<FeedTarget, Subscription>,
    body: Request,
) -> Result<Response> {
    if !body.allowed_for(role) {
        warn!(request = body.name(), role = ?role, "Request not allowed");
        return Err(Error::Service(format!("{} is not allowed for {:?} peers", body.name(), role)));
    }

    match body {
        Request::Subscribe { target } => {
            subscriptions.remove(&target);
            let outbox = outbox.clone();
            let subscription =
                run_blocking(service, move |s| Ok(subscribe(s, target, outbox))).await?;
            subscriptions.insert(target, subscription);
            Ok(Response::Done)
        }
        Request::Unsubscribe { target } => {
            subscriptions.remove(&target);
            outbox.discard(target);
            Ok(Response::Done)
        }
        body => {
            let name = body.name();
            run_blocking(service, move |s| execute(s, body))
                .await
                .inspect_err(|e| warn!(request = name, error = %e, "Request failed"))
        }
    }
}

fn execute(service: &AttendanceService, body: Request) -> rollcall_core::Result<Response> {
    let response = match body {
        Request::CheckIn { national_id } => Response::CheckIn(service.check_in(&national_id)?),
        Request::CreateEvent { draft } => Response::Event(service.create_event(&draft)?),
        Request::UpdateEvent { event_id, draft } => {
            Response::Event(service.update_event(event_id, &draft)?)
        }
        Request::ActivateEvent { event_id } => {
            service.activate_event(event_id)?;
            Response::Done
        }
        Request::DeactivateEvent { event_id } => {
            service.deactivate_event(event_id)?;
            Response::Done
        }
        Request::DeleteEvent { event_id } => {
            service.delete_event(event_id)?;
            Response::Done
        }
        Request::AddAttendee { event_id, draft } => {
            Response::Attendee(service.add_attendee(event_id, &draft)?)
        }
        Request::UpdateAttendee { attendee_id, draft } => {
            Response::Attendee(service.update_attendee(attendee_id, &draft)?)
        }
        Request::DeleteAttendee { attendee_id } => {
            service.delete_attendee(attendee_id)?;
            Response::Done
        }
        Request::ClearRoster { event_id } => Response::Cleared {
            deleted: service.clear_roster(event_id)?,
        },
        Request::ImportRows { event_id, rows } => {
            Response::Imported(service.import_rows(event_id, &import_rows_from_wire(&rows))?)
        }
        Request::ExportRoster {
            event_id,
            selection,
            columns,
        } => Response::exported(&service.export_bytes(event_id, selection, &columns)?),
        // Per-connection state, handled by the caller
        Request::Subscribe { .. } | Request::Unsubscribe { .. } => Response::Done,
    };
    Ok(response)
}

fn subscribe(service: &AttendanceService, target: FeedTarget, outbox: Arc<FeedOutbox>) -> Subscription {
    let errors = outbox.clone();
    let on_error = move |e: &rollcall_core::Error| {
        errors.error(
            target,
            Message::FeedError {
                target,
                message: e.to_string(),
            },
        )
    };
    let roster = move |entries: &[RosterEntry]| Message::RosterSnapshot {
        target,
        entries: entries.to_vec(),
    };

    match target {
        FeedTarget::Events => service.subscribe_events(
            move |events| {
                outbox.snapshot(
                    target,
                    Message::EventsSnapshot {
                        events: events.to_vec(),
                    },
                )
            },
            on_error,
        ),
        FeedTarget::ActiveRoster => service.subscribe_active_roster(
            move |entries| outbox.snapshot(target, roster(entries)),
            on_error,
        ),
        FeedTarget::Roster { event_id } => service.subscribe_roster(
            event_id,
            move |entries| outbox.snapshot(target, roster(entries)),
            on_error,
        ),
    }
}

async fn broadcast_to_peers(state: &Arc<RwLock<ServerState>>, msg: Message) {
    let s = state.read().await;
    for peer in s.peers.values() {
        let _ = peer.tx.send(msg.clone()).await;
    }
}

async fn heartbeat_task(state: Arc<RwLock<ServerState>>, mut shutdown_rx: broadcast::Receiver<()>) {
    let interval = Duration::from_millis(HEARTBEAT_INTERVAL_MS);
    loop {
        tokio::select! {
            _ = tokio::time::sleep(interval) => {
                let (kiosks, admins) = {
                    let s = state.read().await;
                    let kiosks = s.peers.values().filter(|p| p.role == PeerRole::Kiosk).count();
                    (kiosks, s.peers.len() - kiosks)
                };
                debug!(kiosks, admins, "Heartbeat");
                broadcast_to_peers(&state, Message::Ping).await;
            }
            _ = shutdown_rx.recv() => {
                debug!("Heartbeat task shutting down");
                break;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration as ChronoDuration, Utc};
    use rollcall_core::{AttendeeDraft, EventDraft, EventKind};
    use tokio::io::AsyncWriteExt;

    fn present(msg: &Message) -> Option<usize> {
        match msg {
            Message::RosterSnapshot { entries, .. } => {
                Some(entries.iter().filter(|e| e.present).count())
            }
            _ => None,
        }
    }

    fn snapshot_of(present_count: usize) -> Message {
        let event_id = Uuid::new_v4();
        let entries = (0..present_count)
            .map(|i| {
                let draft = AttendeeDraft {
                    national_id: format!("{}-0", i),
                    full_name: Some(format!("Persona {}", i)),
                    ..Default::default()
                };
                let mut attendee = rollcall_core::Attendee::from_draft(event_id, &draft).unwrap();
                attendee.present = true;
                rollcall_core::roster::normalize(&attendee)
            })
            .collect();
        Message::RosterSnapshot {
            target: FeedTarget::ActiveRoster,
            entries,
        }
    }

    #[test]
    fn test_outbox_keeps_newest_snapshot_per_target() {
        let (outbox, woken) = FeedOutbox::new();
        for count in 0..=PEER_QUEUE * 2 {
            outbox.snapshot(FeedTarget::ActiveRoster, snapshot_of(count % 3));
        }
        outbox.snapshot(FeedTarget::ActiveRoster, snapshot_of(5));
        outbox.error(
            FeedTarget::Events,
            Message::FeedError {
                target: FeedTarget::Events,
                message: "database is locked".into(),
            },
        );
        assert!(woken.has_changed().unwrap());

        let frames = outbox.take();
        assert_eq!(frames.len(), 2);
        let rosters: Vec<_> = frames.iter().filter_map(present).collect();
        assert_eq!(rosters, vec![5]);
        assert!(outbox.take().is_empty());
    }

    #[test]
    fn test_outbox_snapshot_clears_older_error() {
        let (outbox, _woken) = FeedOutbox::new();
        let target = FeedTarget::ActiveRoster;
        outbox.snapshot(target, snapshot_of(1));
        outbox.error(
            target,
            Message::FeedError {
                target,
                message: "disk I/O error".into(),
            },
        );
        let frames = outbox.take();
        assert_eq!(frames.len(), 2);
        assert!(matches!(frames[0], Message::RosterSnapshot { .. }));
        assert!(matches!(frames[1], Message::FeedError { .. }));

        outbox.error(
            target,
            Message::FeedError {
                target,
                message: "disk I/O error".into(),
            },
        );
        outbox.snapshot(target, snapshot_of(2));
        let frames = outbox.take();
        assert_eq!(frames.iter().filter_map(present).collect::<Vec<_>>(), vec![2]);
        assert_eq!(frames.len(), 1);
    }

    #[tokio::test]
    async fn test_unread_peer_ends_on_latest_roster() {
        let service = Arc::new(AttendanceService::in_memory().unwrap());
        let starts_at = Utc::now();
        let event = service
            .create_event(&EventDraft {
                name: "Titulación".into(),
                description: None,
                starts_at,
                ends_at: starts_at + ChronoDuration::hours(2),
                kind: EventKind::Students,
                activate: true,
            })
            .unwrap();
        let total = PEER_QUEUE * 2;
        let ids: Vec<String> = (0..total).map(|i| format!("{}-0", 2_000_000 + i)).collect();
        for id in &ids {
            let draft = AttendeeDraft {
                national_id: id.clone(),
                full_name: Some(format!("Persona {}", id)),
                ..Default::default()
            };
            service.add_attendee(event.id, &draft).unwrap();
        }

        let server = Server::start(0, service.clone(), None).await.unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], server.addr().port()));
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut reader, mut writer) = tokio::io::split(stream);
        write_frame(
            &mut writer,
            &Message::Hello {
                role: PeerRole::Kiosk,
                token: None,
                credentials: None,
            },
        )
        .await
        .unwrap();
        assert!(matches!(read_frame(&mut reader).await.unwrap(), Message::Welcome { .. }));
        write_frame(
            &mut writer,
            &Message::Request {
                request_id: 1,
                body: Request::Subscribe {
                    target: FeedTarget::ActiveRoster,
                },
            },
        )
        .await
        .unwrap();
        loop {
            if let Message::Reply { request_id: 1, result } = read_frame(&mut reader).await.unwrap() {
                assert!(result.is_ok());
                break;
            }
        }

        // More snapshots than the peer queue holds, none read yet
        for id in &ids {
            service.check_in(id).unwrap();
        }

        let mut last = None;
        while let Ok(frame) =
            tokio::time::timeout(Duration::from_millis(500), read_frame(&mut reader)).await
        {
            if let Some(count) = present(&frame.unwrap()) {
                last = Some(count);
            }
        }
        assert_eq!(last, Some(total));
        server.shutdown().await;
    }

    async fn hello(addr: SocketAddr, msg: Message) -> Message {
        let stream = TcpStream::connect(addr).await.unwrap();
        let (mut reader, mut writer) = tokio::io::split(stream);
        write_frame(&mut writer, &msg).await.unwrap();
        let reply = read_frame(&mut reader).await.unwrap();
        writer.shutdown().await.ok();
        reply
    }

    #[tokio::test]
    async fn test_server_start() {
        let service = Arc::new(AttendanceService::in_memory().unwrap());
        let server = Server::start(0, service, None).await.unwrap();
        assert!(server.addr().port() > 0);
        assert_eq!(server.peer_count().await, 0);
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_kiosk_token_checked() {
        let service = Arc::new(AttendanceService::in_memory().unwrap());
        let server = Server::start(0, service, Some("puerta".into())).await.unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], server.addr().port()));

        let refused = hello(
            addr,
            Message::Hello {
                role: PeerRole::Kiosk,
                token: Some("otra".into()),
                credentials: None,
            },
        )
        .await;
        assert!(matches!(refused, Message::Rejected { reason } if reason == "Invalid token"));

        let accepted = hello(
            addr,
            Message::Hello {
                role: PeerRole::Kiosk,
                token: Some("puerta".into()),
                credentials: None,
            },
        )
        .await;
        assert!(matches!(accepted, Message::Welcome { role: PeerRole::Kiosk, .. }));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_admin_needs_credentials() {
        let service = Arc::new(AttendanceService::in_memory().unwrap());
        let server = Server::start(0, service, None).await.unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], server.addr().port()));

        let refused = hello(
            addr,
            Message::Hello {
                role: PeerRole::Admin,
                token: None,
                credentials: None,
            },
        )
        .await;
        assert!(matches!(refused, Message::Rejected { .. }));
        server.shutdown().await;
    }

    #[tokio::test]
    async fn test_first_frame_must_be_hello() {
        let service = Arc::new(AttendanceService::in_memory().unwrap());
        let server = Server::start(0, service, None).await.unwrap();
        let addr = SocketAddr::from(([127, 0, 0, 1], server.addr().port()));

        let refused = hello(addr, Message::Ping).await;
        assert!(matches!(refused, Message::Rejected { reason } if reason.contains("Expected Hello")));
        server.shutdown().await;
    }
}
