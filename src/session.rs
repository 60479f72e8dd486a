//! Per-user session state.
//!
//! A [`Session`] owns at most one in-memory DuckDB connection plus the text
//! currently sitting in the SQL editor. The connection is opened lazily on
//! first use and dropped on [`Session::reset`], which discards every table
//! registered through it.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::{Duration, Instant};

use duckdb::Connection;
use uuid::Uuid;

use crate::error::Result;

/// One user's interactive state: connection handle and editor text.
pub struct Session {
    conn: Option<Connection>,
    editor: String,
    last_active: Instant,
}

impl Session {
    /// Create a session with no connection yet.
    pub fn new() -> Self {
        Self {
            conn: None,
            editor: String::new(),
            last_active: Instant::now(),
        }
    }

    /// Get the session's database connection, opening it on first use.
    ///
    /// The same handle is returned until [`reset`](Self::reset) drops it.
    pub fn connection(&mut self) -> Result<&Connection> {
        match self.conn {
            Some(ref conn) => Ok(conn),
            None => {
                tracing::debug!("opening in-memory database connection");
                let conn = Connection::open_in_memory()?;
                Ok(self.conn.insert(conn))
            }
        }
    }

    /// Whether a connection has been opened and not yet reset.
    pub fn has_connection(&self) -> bool {
        self.conn.is_some()
    }

    /// The SQL text currently in the editor.
    pub fn editor_text(&self) -> &str {
        &self.editor
    }

    /// Replace the editor text wholesale.
    pub fn set_editor_text(&mut self, text: impl Into<String>) {
        self.editor = text.into();
    }

    /// Drop the cached connection and clear the editor text.
    ///
    /// Tables registered before the reset are gone afterwards; the next
    /// [`connection`](Self::connection) call opens a fresh empty database.
    pub fn reset(&mut self) {
        self.conn = None;
        self.editor.clear();
    }

    /// Record activity, deferring idle eviction.
    pub fn touch(&mut self) {
        self.last_active = Instant::now();
    }

    /// Time since the last recorded activity.
    pub fn idle_for(&self) -> Duration {
        self.last_active.elapsed()
    }
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

/// Registry of live sessions, keyed by opaque id.
///
/// Sessions are wrapped in `Arc<Mutex<..>>` because the DuckDB connection is
/// not `Sync` and interactions within one session must run one at a time.
pub struct SessionRegistry {
    sessions: Mutex<HashMap<String, Arc<Mutex<Session>>>>,
    timeout: Duration,
}

impl SessionRegistry {
    /// Create a registry evicting sessions idle longer than `timeout`.
    pub fn new(timeout: Duration) -> Self {
        Self {
            sessions: Mutex::new(HashMap::new()),
            timeout,
        }
    }

    fn map(&self) -> std::sync::MutexGuard<'_, HashMap<String, Arc<Mutex<Session>>>> {
        // The map holds only handles; recover it if a holder panicked.
        self.sessions.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Create a new session and return its id.
    pub fn create(&self) -> String {
        let id = Uuid::new_v4().to_string();
        self.map()
            .insert(id.clone(), Arc::new(Mutex::new(Session::new())));
        tracing::info!(session = %id, "created session");
        id
    }

    /// Look up a session by id.
    pub fn get(&self, id: &str) -> Option<Arc<Mutex<Session>>> {
        self.map().get(id).cloned()
    }

    /// Remove a session, returning whether it existed.
    pub fn remove(&self, id: &str) -> bool {
        let removed = self.map().remove(id).is_some();
        if removed {
            tracing::info!(session = %id, "removed session");
        }
        removed
    }

    /// Evict sessions idle past the timeout. Returns the eviction count.
    ///
    /// Sessions whose lock is currently held are mid-interaction and skipped.
    pub fn remove_expired(&self) -> usize {
        let mut map = self.map();
        let expired: Vec<String> = map
            .iter()
            .filter_map(|(id, handle)| match handle.try_lock() {
                Ok(session) if session.idle_for() > self.timeout => Some(id.clone()),
                _ => None,
            })
            .collect();

        for id in &expired {
            map.remove(id);
            tracing::info!(session = %id, "evicted idle session");
        }
        expired.len()
    }

    /// Number of live sessions.
    pub fn len(&self) -> usize {
        self.map().len()
    }

    /// Whether the registry has no live sessions.
    pub fn is_empty(&self) -> bool {
        self.map().is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_connection_is_lazy_and_cached() {
        let mut session = Session::new();
        assert!(!session.has_connection());

        session
            .connection()
            .unwrap()
            .execute("CREATE TABLE t (x INTEGER)", [])
            .unwrap();
        assert!(session.has_connection());

        // The same connection still sees the table.
        let n: i64 = session
            .connection()
            .unwrap()
            .query_row("SELECT count(*) FROM t", [], |row| row.get(0))
            .unwrap();
        assert_eq!(n, 0);
    }

    #[test]
    fn test_reset_drops_tables_and_editor() {
        let mut session = Session::new();
        session
            .connection()
            .unwrap()
            .execute("CREATE TABLE t (x INTEGER)", [])
            .unwrap();
        session.set_editor_text("SELECT * FROM t");

        session.reset();

        assert!(!session.has_connection());
        assert!(session.editor_text().is_empty());

        // Fresh connection, empty catalog: the old table is unknown.
        let err = session
            .connection()
            .unwrap()
            .query_row("SELECT count(*) FROM t", [], |row| row.get::<_, i64>(0));
        assert!(err.is_err());
    }

    #[test]
    fn test_registry_create_get_remove() {
        let registry = SessionRegistry::new(Duration::from_secs(60));
        let id = registry.create();

        assert!(registry.get(&id).is_some());
        assert!(registry.get("no-such-session").is_none());
        assert_eq!(registry.len(), 1);

        assert!(registry.remove(&id));
        assert!(!registry.remove(&id));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_registry_evicts_only_idle_sessions() {
        let registry = SessionRegistry::new(Duration::from_secs(0));
        let id = registry.create();

        // Zero timeout: the session is immediately idle.
        std::thread::sleep(Duration::from_millis(5));
        assert_eq!(registry.remove_expired(), 1);
        assert!(registry.get(&id).is_none());
    }
}
