//! Application state management

use std::collections::HashSet;
use std::sync::{Arc, Mutex, MutexGuard};

use rollcall_core::{
    national_id, AttendanceService, Event, RollcallConfig, RosterEntry, RosterView, Subscription,
};
use uuid::Uuid;

fn lock<'a, T>(mutex: &'a Mutex<T>, what: &str) -> MutexGuard<'a, T> {
    match mutex.lock() {
        Ok(guard) => guard,
        Err(poisoned) => {
            tracing::error!(lock = what, "Mutex poisoned, recovering");
            poisoned.into_inner()
        }
    }
}

/// Ids checked in from this window since it opened. Never persisted.
#[derive(Debug, Default)]
pub struct CheckInSession {
    seen: HashSet<String>,
}

impl CheckInSession {
    pub fn already_checked(&self, raw: &str) -> bool {
        self.seen.contains(&national_id::clean(raw))
    }

    pub fn record(&mut self, raw: &str) {
        let key = national_id::clean(raw);
        if !key.is_empty() {
            self.seen.insert(key);
        }
    }

    pub fn len(&self) -> usize {
        self.seen.len()
    }
}

/// The roster table of the admin panel
pub struct RosterPanel {
    pub event: Option<Event>,
    pub snapshot: Vec<RosterEntry>,
    pub view: RosterView,
    /// Attendee loaded into the form for editing
    pub editing: Option<Uuid>,
    subscription: Option<Subscription>,
}

impl RosterPanel {
    fn closed(page_size: usize) -> Self {
        Self {
            event: None,
            snapshot: Vec::new(),
            view: RosterView::with_page_size(Default::default(), page_size)
                .unwrap_or_else(|_| RosterView::new(Default::default())),
            editing: None,
            subscription: None,
        }
    }

    pub fn event_id(&self) -> Option<Uuid> {
        self.event.as_ref().map(|e| e.id)
    }

    /// Switch to another event; the previous feed is detached
    pub fn open(&mut self, event: Event, view: RosterView, subscription: Subscription) {
        self.subscription = Some(subscription);
        self.event = Some(event);
        self.view = view;
        self.snapshot.clear();
        self.editing = None;
    }
}

/// Main application state
pub struct AppState {
    pub service: Arc<AttendanceService>,
    pub config: RollcallConfig,
    /// Signed-in admin email; gates the admin route
    admin: Mutex<Option<String>>,
    session: Mutex<CheckInSession>,
    roster: Mutex<RosterPanel>,
    events: Mutex<Vec<Event>>,
    /// Window-wide feeds (events, active roster)
    feeds: Mutex<Vec<Subscription>>,
}

impl AppState {
    pub fn new(service: Arc<AttendanceService>, config: RollcallConfig) -> Self {
        let page_size = config.roster.page_size;
        Self {
            service,
            config,
            admin: Mutex::new(None),
            session: Mutex::new(CheckInSession::default()),
            roster: Mutex::new(RosterPanel::closed(page_size)),
            events: Mutex::new(Vec::new()),
            feeds: Mutex::new(Vec::new()),
        }
    }

    pub fn is_admin(&self) -> bool {
        lock(&self.admin, "admin").is_some()
    }

    pub fn admin_email(&self) -> Option<String> {
        lock(&self.admin, "admin").clone()
    }

    pub fn set_admin(&self, email: Option<String>) {
        *lock(&self.admin, "admin") = email;
    }

    pub fn session(&self) -> MutexGuard<'_, CheckInSession> {
        lock(&self.session, "session")
    }

    pub fn roster(&self) -> MutexGuard<'_, RosterPanel> {
        lock(&self.roster, "roster")
    }

    /// Drop the open roster and its feed
    pub fn close_roster(&self) {
        *self.roster() = RosterPanel::closed(self.config.roster.page_size);
    }

    pub fn events(&self) -> Vec<Event> {
        lock(&self.events, "events").clone()
    }

    pub fn set_events(&self, events: Vec<Event>) {
        *lock(&self.events, "events") = events;
    }

    pub fn find_event(&self, event_id: Uuid) -> Option<Event> {
        lock(&self.events, "events")
            .iter()
            .find(|e| e.id == event_id)
            .cloned()
    }

    pub fn active_event(&self) -> Option<Event> {
        lock(&self.events, "events")
            .iter()
            .find(|e| e.active)
            .cloned()
    }

    /// Replace the window-wide feeds, detaching the old ones
    pub fn replace_feeds(&self, feeds: Vec<Subscription>) {
        *lock(&self.feeds, "feeds") = feeds;
    }
}
