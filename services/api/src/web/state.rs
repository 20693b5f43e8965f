//! services/api/src/web/state.rs
//!
//! Defines the application's shared state and the per-session scan registry.

use crate::config::Config;
use skincheck_core::{
    AnalysisClient, ImageSource, NamespacedStore, NearbyProviderLookup, Preferences, ResultMailbox,
    ScanSession, SlotStore, UvIndexLookup,
};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tokio::time::Instant;
use tracing::{debug, info};
use uuid::Uuid;

/// A scan session shared between requests carrying the same `x-session-id`.
/// The async mutex is only ever `try_lock`ed by handlers, so a second scan
/// request for a busy session is refused instead of queued.
pub type SharedScanSession = Arc<tokio::sync::Mutex<ScanSession>>;

struct SessionEntry {
    session: SharedScanSession,
    last_used: Instant,
}

//=========================================================================================
// AppState (Shared Across All Requests)
//=========================================================================================

/// The shared application state, created once at startup and passed to all handlers.
pub struct AppState {
    pub config: Arc<Config>,
    pub store: Arc<dyn SlotStore>,
    pub analysis: AnalysisClient,
    pub images: ImageSource,
    /// `None` when no places key is configured.
    pub providers: Option<NearbyProviderLookup>,
    pub uv: UvIndexLookup,
    sessions: Mutex<HashMap<Uuid, SessionEntry>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        store: Arc<dyn SlotStore>,
        analysis: AnalysisClient,
        providers: Option<NearbyProviderLookup>,
        uv: UvIndexLookup,
    ) -> Self {
        Self {
            images: ImageSource::new(config.max_upload_bytes),
            config,
            store,
            analysis,
            providers,
            uv,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    /// Slot storage scoped to one client session.
    pub fn session_store(&self, session_id: Uuid) -> Arc<dyn SlotStore> {
        Arc::new(NamespacedStore::new(self.store.clone(), session_id.to_string()))
    }

    pub fn mailbox(&self, session_id: Uuid) -> ResultMailbox {
        ResultMailbox::new(self.session_store(session_id))
    }

    pub fn preferences(&self, session_id: Uuid) -> Preferences {
        Preferences::new(self.session_store(session_id))
    }

    /// Returns the scan session for `session_id`, creating it on first use.
    ///
    /// Sessions idle for longer than the configured timeout are dropped first,
    /// unless a request is still holding them.
    pub fn scan_session(&self, session_id: Uuid) -> SharedScanSession {
        let now = Instant::now();
        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        self.evict_idle(&mut sessions, now);

        let entry = sessions.entry(session_id).or_insert_with(|| {
            debug!("Opening scan session {}", session_id);
            SessionEntry {
                session: Arc::new(tokio::sync::Mutex::new(ScanSession::new(
                    self.analysis.clone(),
                    self.mailbox(session_id),
                    self.images,
                ))),
                last_used: now,
            }
        });
        entry.last_used = now;
        entry.session.clone()
    }

    /// The scan session for `session_id`, if one is open.
    pub fn existing_scan_session(&self, session_id: Uuid) -> Option<SharedScanSession> {
        let sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        sessions.get(&session_id).map(|entry| entry.session.clone())
    }

    /// Forgets the scan session for `session_id`. Requests already holding it finish normally.
    pub fn close_scan_session(&self, session_id: Uuid) -> bool {
        let mut sessions = self.sessions.lock().unwrap_or_else(|p| p.into_inner());
        let closed = sessions.remove(&session_id).is_some();
        if closed {
            debug!("Closed scan session {}", session_id);
        }
        closed
    }

    pub fn open_scan_sessions(&self) -> usize {
        self.sessions.lock().unwrap_or_else(|p| p.into_inner()).len()
    }

    fn evict_idle(&self, sessions: &mut HashMap<Uuid, SessionEntry>, now: Instant) {
        let idle_timeout = self.config.session_idle_timeout;
        let before = sessions.len();
        sessions.retain(|_, entry| {
            Arc::strong_count(&entry.session) > 1
                || now.duration_since(entry.last_used) < idle_timeout
        });
        let evicted = before - sessions.len();
        if evicted > 0 {
            info!("Evicted {} idle scan session(s)", evicted);
        }
    }
}
