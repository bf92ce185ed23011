//! Attendance service
//!
//! Owns the database and the live feeds. Every write goes through here and
//! is followed by a fresh full snapshot on the affected feeds; callers never
//! patch their local copies.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{info, instrument, warn};
use uuid::Uuid;

use crate::auth;
use crate::config::RollcallConfig;
use crate::error::{Error, Result};
use crate::export::{self, ExportRequest, ExportSelection};
use crate::feed::{SnapshotFeed, Subscription};
use crate::import::{self, ImportFormat, ImportReport, ImportRow};
use crate::invariants;
use crate::models::{Admin, Attendee, AttendeeDraft, Event, EventDraft};
use crate::roster::{normalize, normalize_all, Column, RosterEntry};
use crate::storage::{AttendeeRepository, Database, EventRepository};

/// Result of a kiosk check-in
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "outcome", content = "attendee", rename_all = "snake_case")]
pub enum CheckInOutcome {
    CheckedIn(RosterEntry),
    AlreadyPresent(RosterEntry),
    NotFound,
    NoActiveEvent,
}

pub struct AttendanceService {
    db: Mutex<Database>,
    events_feed: SnapshotFeed<Event>,
    active_roster_feed: SnapshotFeed<RosterEntry>,
    roster_feeds: Mutex<HashMap<Uuid, Arc<SnapshotFeed<RosterEntry>>>>,
    /// Bumped under the database lock for every snapshot read
    revision: AtomicU64,
}

fn recover<'a, T>(result: std::sync::LockResult<MutexGuard<'a, T>>, what: &str) -> MutexGuard<'a, T> {
    match result {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(lock = what, "Mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

impl AttendanceService {
    pub fn new(db: Database) -> Self {
        Self {
            db: Mutex::new(db),
            events_feed: SnapshotFeed::new(),
            active_roster_feed: SnapshotFeed::new(),
            roster_feeds: Mutex::new(HashMap::new()),
            revision: AtomicU64::new(0),
        }
    }

    pub fn in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    /// Open the configured database and create the bootstrap admin if needed
    pub fn open(config: &RollcallConfig) -> Result<Self> {
        let path = config.database_path()?;
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let db = Database::open(&path)?;
        if let Some((email, password)) = config.admin.bootstrap_credentials() {
            auth::bootstrap_admin(&db, email, password)?;
        }
        info!(path = %path.display(), "Attendance service ready");
        Ok(Self::new(db))
    }

    fn db(&self) -> MutexGuard<'_, Database> {
        recover(self.db.lock(), "database")
    }

    /// Stamp a snapshot read; call with the database guard held
    fn next_revision(&self, _db: &Database) -> u64 {
        self.revision.fetch_add(1, Ordering::SeqCst) + 1
    }

    fn roster_feed(&self, event_id: Uuid) -> Arc<SnapshotFeed<RosterEntry>> {
        let mut feeds = recover(self.roster_feeds.lock(), "roster feeds");
        feeds.retain(|id, feed| *id == event_id || feed.subscriber_count() > 0);
        feeds.entry(event_id).or_default().clone()
    }

    fn existing_roster_feed(&self, event_id: Uuid) -> Option<Arc<SnapshotFeed<RosterEntry>>> {
        recover(self.roster_feeds.lock(), "roster feeds")
            .get(&event_id)
            .cloned()
    }

    // ---- Reads ----

    pub fn events(&self) -> Result<Vec<Event>> {
        self.db().list_events()
    }

    pub fn event(&self, event_id: Uuid) -> Result<Event> {
        self.db()
            .find_event(event_id)?
            .ok_or_else(|| Error::NotFound(format!("event {}", event_id)))
    }

    pub fn active_event(&self) -> Result<Option<Event>> {
        self.db().find_active_event()
    }

    pub fn roster(&self, event_id: Uuid) -> Result<Vec<RosterEntry>> {
        Ok(normalize_all(&self.db().list_attendees(event_id)?))
    }

    pub fn attendee(&self, attendee_id: Uuid) -> Result<Attendee> {
        self.db()
            .find_attendee(attendee_id)?
            .ok_or_else(|| Error::NotFound(format!("attendee {}", attendee_id)))
    }

    /// Roster of the active event, empty when no event is active
    pub fn active_roster(&self) -> Result<Vec<RosterEntry>> {
        load_active_roster(&self.db())
    }

    // ---- Kiosk ----

    /// Mark the attendee with this national id present in the active event
    #[instrument(skip(self))]
    pub fn check_in(&self, national_id: &str) -> Result<CheckInOutcome> {
        let national_id = national_id.trim();
        if national_id.is_empty() {
            return Err(Error::Validation("national id is required".into()));
        }

        let (event_id, outcome) = {
            let db = self.db();
            let Some(event) = db.find_active_event()? else {
                return Ok(CheckInOutcome::NoActiveEvent);
            };
            let Some(mut attendee) = db.find_attendee_by_national_id(event.id, national_id)? else {
                info!(event_id = %event.id, "Check-in: id not on roster");
                return Ok(CheckInOutcome::NotFound);
            };
            if attendee.present {
                return Ok(CheckInOutcome::AlreadyPresent(normalize(&attendee)));
            }

            let at = Utc::now();
            if !db.mark_present(attendee.id, at)? {
                return Ok(CheckInOutcome::AlreadyPresent(normalize(&attendee)));
            }
            attendee.present = true;
            attendee.checked_in_at = Some(at);
            info!(event_id = %event.id, attendee_id = %attendee.id, "Attendee checked in");
            (event.id, CheckInOutcome::CheckedIn(normalize(&attendee)))
        };

        self.refresh_roster(event_id);
        Ok(outcome)
    }

    // ---- Admin ----

    pub fn sign_in(&self, email: &str, password: &str) -> Result<Admin> {
        auth::sign_in(&*self.db(), email, password)
    }

    #[instrument(skip(self, draft), fields(name = %draft.name))]
    pub fn create_event(&self, draft: &EventDraft) -> Result<Event> {
        let event = {
            let db = self.db();
            let mut event = Event::from_draft(draft)?;
            db.create_event(&event)?;
            if draft.activate {
                db.activate_event(event.id)?;
                event.active = true;
            }
            event
        };
        info!(event_id = %event.id, "Event created");

        self.refresh_events();
        if event.active {
            self.refresh_active_roster();
        }
        Ok(event)
    }

    /// Rewrite an event's fields; `draft.activate` also makes it the active event
    #[instrument(skip(self, draft))]
    pub fn update_event(&self, event_id: Uuid, draft: &EventDraft) -> Result<Event> {
        let (event, activated) = {
            let db = self.db();
            let mut event = db
                .find_event(event_id)?
                .ok_or_else(|| Error::NotFound(format!("event {}", event_id)))?;
            event.apply_draft(draft)?;
            db.update_event(&event)?;
            let activated = draft.activate && !event.active;
            if activated {
                db.activate_event(event.id)?;
                event.active = true;
            }
            (event, activated)
        };

        self.refresh_events();
        if activated {
            self.refresh_active_roster();
        }
        Ok(event)
    }

    /// Make this the only active event
    pub fn activate_event(&self, event_id: Uuid) -> Result<()> {
        self.db().activate_event(event_id)?;
        self.refresh_events();
        self.refresh_active_roster();
        Ok(())
    }

    pub fn deactivate_event(&self, event_id: Uuid) -> Result<()> {
        self.db().events().deactivate(event_id)?;
        self.refresh_events();
        self.refresh_active_roster();
        Ok(())
    }

    /// Delete an event together with its roster
    #[instrument(skip(self))]
    pub fn delete_event(&self, event_id: Uuid) -> Result<()> {
        let (was_active, revision) = {
            let db = self.db();
            let event = db
                .find_event(event_id)?
                .ok_or_else(|| Error::NotFound(format!("event {}", event_id)))?;
            db.delete_event(event_id)?;
            (event.active, self.next_revision(&db))
        };
        info!(event_id = %event_id, "Event deleted");

        let feed = recover(self.roster_feeds.lock(), "roster feeds").remove(&event_id);
        if let Some(feed) = feed {
            feed.publish_revision(revision, Vec::new());
        }
        self.refresh_events();
        if was_active {
            self.refresh_active_roster();
        }
        Ok(())
    }

    pub fn add_attendee(&self, event_id: Uuid, draft: &AttendeeDraft) -> Result<Attendee> {
        let attendee = {
            let db = self.db();
            if db.find_event(event_id)?.is_none() {
                return Err(Error::NotFound(format!("event {}", event_id)));
            }
            let attendee = Attendee::from_draft(event_id, draft)?;
            db.create_attendee(&attendee)?;
            attendee
        };
        self.refresh_roster(event_id);
        Ok(attendee)
    }

    /// Admin edit: every field is rewritten, presence is kept
    pub fn update_attendee(&self, attendee_id: Uuid, draft: &AttendeeDraft) -> Result<Attendee> {
        let attendee = {
            let db = self.db();
            let mut attendee = db
                .find_attendee(attendee_id)?
                .ok_or_else(|| Error::NotFound(format!("attendee {}", attendee_id)))?;
            attendee.apply_draft(draft)?;
            db.update_attendee(&attendee)?;
            attendee
        };
        self.refresh_roster(attendee.event_id);
        Ok(attendee)
    }

    pub fn delete_attendee(&self, attendee_id: Uuid) -> Result<()> {
        let event_id = {
            let db = self.db();
            let event_id = db
                .attendees()
                .event_of(attendee_id)?
                .ok_or_else(|| Error::NotFound(format!("attendee {}", attendee_id)))?;
            db.delete_attendee(attendee_id)?;
            event_id
        };
        self.refresh_roster(event_id);
        Ok(())
    }

    /// Delete every attendee of an event; returns how many were removed
    pub fn clear_roster(&self, event_id: Uuid) -> Result<u64> {
        let deleted = self.db().clear_roster(event_id)?;
        self.refresh_roster(event_id);
        Ok(deleted)
    }

    /// Import a file into an event's roster. The file type is checked before anything is written.
    #[instrument(skip(self, path), fields(path = %path.display()))]
    pub fn import_file(&self, event_id: Uuid, path: &Path) -> Result<ImportReport> {
        ImportFormat::from_path(path)?;
        let rows = import::read_rows(path)?;
        self.import_rows(event_id, &rows)
    }

    pub fn import_rows(&self, event_id: Uuid, rows: &[ImportRow]) -> Result<ImportReport> {
        let result = {
            let db = self.db();
            if db.find_event(event_id)?.is_none() {
                return Err(Error::NotFound(format!("event {}", event_id)));
            }
            import::import_rows(&*db, event_id, rows)
        };
        if matches!(result, Ok(ImportReport { created, .. }) if created > 0) {
            self.refresh_roster(event_id);
        }
        result
    }

    /// Export an event's roster into `dir`, returning the written file
    pub fn export_to_dir(
        &self,
        event_id: Uuid,
        selection: ExportSelection,
        columns: &[Column],
        dir: &Path,
    ) -> Result<PathBuf> {
        let event = self.event(event_id)?;
        let roster = self.roster(event_id)?;
        std::fs::create_dir_all(dir)?;
        export::export_to_dir(
            &roster,
            &ExportRequest {
                event_name: &event.name,
                kind: event.kind,
                selection,
                columns,
            },
            dir,
        )
    }

    /// Export an event's roster as xlsx bytes
    pub fn export_bytes(&self, event_id: Uuid, selection: ExportSelection, columns: &[Column]) -> Result<Vec<u8>> {
        let event = self.event(event_id)?;
        let roster = self.roster(event_id)?;
        export::to_bytes(
            &roster,
            &ExportRequest {
                event_name: &event.name,
                kind: event.kind,
                selection,
                columns,
            },
        )
    }

    // ---- Subscriptions ----

    /// Full event list on every change
    pub fn subscribe_events<S, E>(&self, on_snapshot: S, on_error: E) -> Subscription
    where
        S: Fn(&[Event]) + Send + Sync + 'static,
        E: Fn(&Error) + Send + Sync + 'static,
    {
        let primed = self.events_feed.latest().is_some();
        let subscription = self.events_feed.subscribe(on_snapshot, on_error);
        if !primed {
            self.refresh_events();
        }
        subscription
    }

    /// Full roster of one event on every change
    pub fn subscribe_roster<S, E>(&self, event_id: Uuid, on_snapshot: S, on_error: E) -> Subscription
    where
        S: Fn(&[RosterEntry]) + Send + Sync + 'static,
        E: Fn(&Error) + Send + Sync + 'static,
    {
        let feed = self.roster_feed(event_id);
        let primed = feed.latest().is_some();
        let subscription = feed.subscribe(on_snapshot, on_error);
        if !primed {
            self.refresh_roster(event_id);
        }
        subscription
    }

    /// Roster of whichever event is active, following activation changes
    pub fn subscribe_active_roster<S, E>(&self, on_snapshot: S, on_error: E) -> Subscription
    where
        S: Fn(&[RosterEntry]) + Send + Sync + 'static,
        E: Fn(&Error) + Send + Sync + 'static,
    {
        let primed = self.active_roster_feed.latest().is_some();
        let subscription = self.active_roster_feed.subscribe(on_snapshot, on_error);
        if !primed {
            self.refresh_active_roster();
        }
        subscription
    }

    // ---- Publishing ----

    // Each refresh reads and takes its revision under one database guard

    fn refresh_events(&self) {
        let (loaded, revision) = {
            let db = self.db();
            (db.list_events(), self.next_revision(&db))
        };
        match loaded {
            Ok(events) => {
                invariants::assert_event_list_invariants(&events);
                self.events_feed.publish_revision(revision, events);
            }
            Err(e) => {
                warn!(error = %e, "Failed to load events snapshot");
                self.events_feed.fail(&e);
            }
        }
    }

    fn refresh_active_roster(&self) {
        let (loaded, revision) = {
            let db = self.db();
            (load_active_roster(&db), self.next_revision(&db))
        };
        match loaded {
            Ok(roster) => {
                self.active_roster_feed.publish_revision(revision, roster);
            }
            Err(e) => {
                warn!(error = %e, "Failed to load active roster snapshot");
                self.active_roster_feed.fail(&e);
            }
        }
    }

    fn refresh_roster(&self, event_id: Uuid) {
        let (roster, is_active, revision) = {
            let db = self.db();
            let roster = db.list_attendees(event_id).map(|attendees| normalize_all(&attendees));
            let is_active = db
                .find_active_event()
                .map(|active| active.map(|e| e.id) == Some(event_id));
            (roster, is_active, self.next_revision(&db))
        };

        let feed = self.existing_roster_feed(event_id);
        match roster {
            Ok(roster) => {
                invariants::assert_roster_invariants(event_id, &roster);
                match &is_active {
                    Ok(true) => {
                        self.active_roster_feed.publish_revision(revision, roster.clone());
                    }
                    Ok(false) => {}
                    Err(e) => {
                        warn!(error = %e, "Failed to resolve the active event");
                        self.active_roster_feed.fail(e);
                    }
                }
                if let Some(feed) = feed {
                    feed.publish_revision(revision, roster);
                }
            }
            Err(e) => {
                warn!(event_id = %event_id, error = %e, "Failed to load roster snapshot");
                if let Some(feed) = feed {
                    feed.fail(&e);
                }
                // The active feed only fails for its own event
                if !matches!(is_active, Ok(false)) {
                    self.active_roster_feed.fail(&e);
                }
            }
        }
    }
}

/// Roster of the active event, empty when no event is active
fn load_active_roster(db: &Database) -> Result<Vec<RosterEntry>> {
    match db.find_active_event()? {
        Some(event) => Ok(normalize_all(&db.list_attendees(event.id)?)),
        None => Ok(Vec::new()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::EventKind;
    use crate::national_id;
    use chrono::Duration;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn event_draft(name: &str, activate: bool) -> EventDraft {
        let starts_at = Utc::now();
        EventDraft {
            name: name.into(),
            description: None,
            starts_at,
            ends_at: starts_at + Duration::hours(2),
            kind: EventKind::Students,
            activate,
        }
    }

    fn person(rut: &str, name: &str) -> AttendeeDraft {
        AttendeeDraft {
            national_id: rut.into(),
            full_name: Some(name.into()),
            program: Some("Derecho".into()),
            institution: Some("CFT".into()),
            ..Default::default()
        }
    }

    #[test]
    fn test_check_in_outcomes() {
        let service = AttendanceService::in_memory().unwrap();
        assert_eq!(service.check_in("12345678-5").unwrap(), CheckInOutcome::NoActiveEvent);
        assert!(matches!(service.check_in("   "), Err(Error::Validation(_))));

        let event = service.create_event(&event_draft("Titulación", true)).unwrap();
        service.add_attendee(event.id, &person("12.345.678-5", "Juan Pérez Soto")).unwrap();

        assert_eq!(service.check_in("1-9").unwrap(), CheckInOutcome::NotFound);

        match service.check_in("12345678-5").unwrap() {
            CheckInOutcome::CheckedIn(entry) => {
                assert!(entry.present);
                assert_eq!(entry.family_names, "Pérez Soto");
                assert!(entry.checked_in_at.is_some());
            }
            other => panic!("unexpected outcome {:?}", other),
        }
        assert!(matches!(
            service.check_in("12.345.678-5").unwrap(),
            CheckInOutcome::AlreadyPresent(_)
        ));
    }

    #[test]
    fn test_activation_is_exclusive() {
        let service = AttendanceService::in_memory().unwrap();
        let a = service.create_event(&event_draft("A", true)).unwrap();
        let b = service.create_event(&event_draft("B", true)).unwrap();

        let active: Vec<_> = service.events().unwrap().into_iter().filter(|e| e.active).collect();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, b.id);

        service.activate_event(a.id).unwrap();
        assert_eq!(service.active_event().unwrap().unwrap().id, a.id);

        service.deactivate_event(a.id).unwrap();
        assert!(service.active_event().unwrap().is_none());
    }

    #[test]
    fn test_roster_feed_gets_full_snapshots() {
        let service = AttendanceService::in_memory().unwrap();
        let event = service.create_event(&event_draft("Feria", false)).unwrap();

        let sizes = Arc::new(Mutex::new(Vec::new()));
        let sink = sizes.clone();
        let sub = service.subscribe_roster(
            event.id,
            move |roster: &[RosterEntry]| sink.lock().unwrap().push(roster.len()),
            |_| {},
        );

        service.add_attendee(event.id, &person("1-9", "Ana López")).unwrap();
        let second = service.add_attendee(event.id, &person("2-7", "Luis Soto")).unwrap();
        service.delete_attendee(second.id).unwrap();
        assert_eq!(*sizes.lock().unwrap(), vec![0, 1, 2, 1]);

        drop(sub);
        service.add_attendee(event.id, &person("3-5", "Carmen Rojas")).unwrap();
        assert_eq!(sizes.lock().unwrap().len(), 4);
    }

    #[test]
    fn test_active_roster_follows_activation() {
        let service = AttendanceService::in_memory().unwrap();
        let a = service.create_event(&event_draft("A", true)).unwrap();
        let b = service.create_event(&event_draft("B", false)).unwrap();
        service.add_attendee(a.id, &person("1-9", "Ana López")).unwrap();

        let last = Arc::new(Mutex::new(usize::MAX));
        let sink = last.clone();
        let _sub = service.subscribe_active_roster(
            move |roster: &[RosterEntry]| *sink.lock().unwrap() = roster.len(),
            |_| {},
        );
        assert_eq!(*last.lock().unwrap(), 1);

        service.activate_event(b.id).unwrap();
        assert_eq!(*last.lock().unwrap(), 0);

        service.check_in("1-9").unwrap();
        assert_eq!(*last.lock().unwrap(), 0);
    }

    #[test]
    fn test_delete_event_clears_roster_subscribers() {
        let service = AttendanceService::in_memory().unwrap();
        let event = service.create_event(&event_draft("Cena", false)).unwrap();
        service.add_attendee(event.id, &person("1-9", "Ana López")).unwrap();

        let last = Arc::new(AtomicUsize::new(usize::MAX));
        let sink = last.clone();
        let _sub = service.subscribe_roster(
            event.id,
            move |roster: &[RosterEntry]| sink.store(roster.len(), Ordering::SeqCst),
            |_| {},
        );
        assert_eq!(last.load(Ordering::SeqCst), 1);

        service.delete_event(event.id).unwrap();
        assert_eq!(last.load(Ordering::SeqCst), 0);
        assert!(matches!(service.event(event.id), Err(Error::NotFound(_))));
        assert!(matches!(service.delete_event(event.id), Err(Error::NotFound(_))));
    }

    #[test]
    fn test_update_attendee_keeps_presence() {
        let service = AttendanceService::in_memory().unwrap();
        let event = service.create_event(&event_draft("Feria", true)).unwrap();
        let a = service.add_attendee(event.id, &person("1-9", "Ana López")).unwrap();
        service.check_in("1-9").unwrap();

        let updated = service
            .update_attendee(a.id, &person("1-9", "Ana María López"))
            .unwrap();
        assert!(updated.present);
        assert_eq!(updated.full_name.as_deref(), Some("Ana María López"));
    }

    #[test]
    fn test_import_rejects_extension_before_writing() {
        let service = AttendanceService::in_memory().unwrap();
        let event = service.create_event(&event_draft("Feria", false)).unwrap();
        let result = service.import_file(event.id, Path::new("/nonexistent/lista.pdf"));
        assert!(matches!(result, Err(Error::Validation(_))));
        assert!(service.roster(event.id).unwrap().is_empty());
    }

    #[test]
    fn test_export_bytes_for_unknown_event() {
        let service = AttendanceService::in_memory().unwrap();
        assert!(matches!(
            service.export_bytes(Uuid::new_v4(), ExportSelection::All, &[Column::NationalId]),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_events_feed_counts_changes() {
        let service = AttendanceService::in_memory().unwrap();
        let calls = Arc::new(AtomicUsize::new(0));
        let c = calls.clone();
        let _sub = service.subscribe_events(
            move |_: &[Event]| {
                c.fetch_add(1, Ordering::SeqCst);
            },
            |_| {},
        );
        let event = service.create_event(&event_draft("A", false)).unwrap();
        service.activate_event(event.id).unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_concurrent_check_ins_end_on_current_roster() {
        let service = Arc::new(AttendanceService::in_memory().unwrap());
        let event = service.create_event(&event_draft("Titulación", true)).unwrap();
        let ids: Vec<String> = (1_000_000..1_000_064u32)
            .map(|body| {
                let body = body.to_string();
                let digit = national_id::check_digit(&body).unwrap();
                format!("{}-{}", body, digit)
            })
            .collect();
        for (i, id) in ids.iter().enumerate() {
            service.add_attendee(event.id, &person(id, &format!("Persona {}", i))).unwrap();
        }

        let delivered = Arc::new(Mutex::new(Vec::new()));
        let sink = delivered.clone();
        let _sub = service.subscribe_active_roster(
            move |roster: &[RosterEntry]| {
                let present = roster.iter().filter(|e| e.present).count();
                sink.lock().unwrap().push(present);
            },
            |_| {},
        );

        let handles: Vec<_> = ids
            .chunks(8)
            .map(|chunk| {
                let service = service.clone();
                let chunk = chunk.to_vec();
                std::thread::spawn(move || {
                    for id in chunk {
                        service.check_in(&id).unwrap();
                    }
                })
            })
            .collect();
        for handle in handles {
            handle.join().unwrap();
        }

        let current = service.active_roster().unwrap();
        assert_eq!(current.iter().filter(|e| e.present).count(), 64);
        let delivered = delivered.lock().unwrap();
        assert_eq!(delivered.last(), Some(&64));
        assert!(delivered.windows(2).all(|pair| pair[0] <= pair[1]));
    }

    #[test]
    fn test_roster_failure_spares_active_feed_of_other_event() {
        let service = AttendanceService::in_memory().unwrap();
        let active = service.create_event(&event_draft("Activo", true)).unwrap();
        let other = service.create_event(&event_draft("Otro", false)).unwrap();

        let active_errors = Arc::new(AtomicUsize::new(0));
        let e = active_errors.clone();
        let _active_sub = service.subscribe_active_roster(
            |_: &[RosterEntry]| {},
            move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            },
        );
        let other_errors = Arc::new(AtomicUsize::new(0));
        let e = other_errors.clone();
        let _other_sub = service.subscribe_roster(
            other.id,
            |_: &[RosterEntry]| {},
            move |_| {
                e.fetch_add(1, Ordering::SeqCst);
            },
        );

        service.db().execute_batch("DROP TABLE attendees").unwrap();

        service.refresh_roster(other.id);
        assert_eq!(other_errors.load(Ordering::SeqCst), 1);
        assert_eq!(active_errors.load(Ordering::SeqCst), 0);

        service.refresh_roster(active.id);
        assert_eq!(active_errors.load(Ordering::SeqCst), 1);
    }
}
