use std::collections::HashMap;
use std::time::{Duration, Instant};

use crate::batch::{results_table, ExtractionResult};
use crate::table::Table;

/// Append-only list of extraction results owned by one session.
#[derive(Debug, Clone, Default)]
pub struct Accumulator {
    results: Vec<ExtractionResult>,
}

impl Accumulator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn append<I>(&mut self, results: I)
    where
        I: IntoIterator<Item = ExtractionResult>,
    {
        self.results.extend(results);
    }

    pub fn clear(&mut self) {
        self.results.clear();
    }

    pub fn results(&self) -> &[ExtractionResult] {
        &self.results
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn table(&self) -> Table {
        results_table(&self.results)
    }
}

/// State of one browser session.
#[derive(Debug, Clone)]
pub struct Session {
    /// Everything kept for this session, subject to the retention mode.
    pub accumulated: Accumulator,
    /// Results of the most recent batch only.
    pub last_batch: Accumulator,
    expires_at: Instant,
}

/// In-memory sessions keyed by cookie token.
pub struct SessionStore {
    sessions: HashMap<String, Session>,
    ttl: Duration,
    retain_results: bool,
}

impl SessionStore {
    pub fn new(ttl: Duration, retain_results: bool) -> Self {
        Self {
            sessions: HashMap::new(),
            ttl,
            retain_results,
        }
    }

    pub fn retain_results(&self) -> bool {
        self.retain_results
    }

    /// Resolve `token` to a live session, creating one when it is unknown or
    /// expired. Returns the live token and whether it was newly created.
    pub fn touch(&mut self, token: Option<&str>) -> (String, bool) {
        self.clear_stale();
        let expires_at = Instant::now() + self.ttl;

        if let Some(session) = token.and_then(|t| self.sessions.get_mut(t)) {
            session.expires_at = expires_at;
            return (token.unwrap_or_default().to_string(), false);
        }

        let token = generate_session_token();
        self.sessions.insert(
            token.clone(),
            Session {
                accumulated: Accumulator::new(),
                last_batch: Accumulator::new(),
                expires_at,
            },
        );
        tracing::debug!("Created session {}", token);
        (token, true)
    }

    pub fn get(&self, token: &str) -> Option<&Session> {
        self.sessions
            .get(token)
            .filter(|session| Instant::now() < session.expires_at)
    }

    /// Store a finished batch. In single-run mode the accumulated results are
    /// replaced; otherwise they are extended.
    pub fn record_batch(&mut self, token: &str, results: Vec<ExtractionResult>) {
        let Some(session) = self.sessions.get_mut(token) else {
            tracing::warn!("Dropping batch results for unknown session");
            return;
        };

        if !self.retain_results {
            session.accumulated.clear();
        }
        session.last_batch.clear();
        session.last_batch.append(results.iter().cloned());
        session.accumulated.append(results);
    }

    /// Forget every result held by a session.
    pub fn clear(&mut self, token: &str) {
        if let Some(session) = self.sessions.get_mut(token) {
            session.accumulated.clear();
            session.last_batch.clear();
        }
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Remove expired sessions
    fn clear_stale(&mut self) {
        let now = Instant::now();
        self.sessions.retain(|_, session| now < session.expires_at);
    }
}

/// Random 32-character alphanumeric session token.
fn generate_session_token() -> String {
    use rand::Rng;
    const CHARSET: &[u8] = b"abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789";
    const TOKEN_LEN: usize = 32;

    let mut rng = rand::thread_rng();
    (0..TOKEN_LEN)
        .map(|_| CHARSET[rng.gen_range(0..CHARSET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::ActivityDocument;
    use chrono::Utc;
    use serde_json::json;

    const HOUR: Duration = Duration::from_secs(3600);

    fn result(username: &str, posts: usize) -> ExtractionResult {
        let posts: Vec<_> = (0..posts).map(|i| json!({ "id": i })).collect();
        ExtractionResult {
            username: username.to_string(),
            document: serde_json::from_value::<ActivityDocument>(json!({ "posts": posts }))
                .unwrap(),
            credits_used: "1".to_string(),
            fetched_at: Utc::now(),
        }
    }

    #[test]
    fn touch_creates_then_reuses_session() {
        let mut store = SessionStore::new(HOUR, true);

        let (token, created) = store.touch(None);
        assert!(created);
        assert_eq!(token.len(), 32);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));

        let (again, created) = store.touch(Some(&token));
        assert!(!created);
        assert_eq!(again, token);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn unknown_token_gets_a_fresh_session() {
        let mut store = SessionStore::new(HOUR, true);
        let (token, created) = store.touch(Some("forged-token"));
        assert!(created);
        assert_ne!(token, "forged-token");
    }

    #[test]
    fn accumulating_mode_keeps_every_batch() {
        let mut store = SessionStore::new(HOUR, true);
        let (token, _) = store.touch(None);

        store.record_batch(&token, vec![result("alice", 1)]);
        store.record_batch(&token, vec![result("bob", 2), result("carol", 0)]);

        let session = store.get(&token).unwrap();
        let users: Vec<&str> = session
            .accumulated
            .results()
            .iter()
            .map(|r| r.username.as_str())
            .collect();
        assert_eq!(users, vec!["alice", "bob", "carol"]);
        assert_eq!(session.accumulated.table().len(), 3);
        assert_eq!(session.last_batch.len(), 2);
    }

    #[test]
    fn single_run_mode_replaces_previous_batch() {
        let mut store = SessionStore::new(HOUR, false);
        let (token, _) = store.touch(None);

        store.record_batch(&token, vec![result("alice", 1)]);
        store.record_batch(&token, vec![result("bob", 2)]);

        let session = store.get(&token).unwrap();
        assert_eq!(session.accumulated.len(), 1);
        assert_eq!(session.accumulated.results()[0].username, "bob");
        assert_eq!(session.last_batch.len(), 1);
    }

    #[test]
    fn empty_batch_keeps_accumulated_results() {
        let mut store = SessionStore::new(HOUR, true);
        let (token, _) = store.touch(None);

        store.record_batch(&token, vec![result("alice", 1)]);
        store.record_batch(&token, Vec::new());

        let session = store.get(&token).unwrap();
        assert_eq!(session.accumulated.len(), 1);
        assert!(session.last_batch.is_empty());
    }

    #[test]
    fn sessions_are_isolated() {
        let mut store = SessionStore::new(HOUR, true);
        let (first, _) = store.touch(None);
        let (second, _) = store.touch(None);
        assert_ne!(first, second);

        store.record_batch(&first, vec![result("alice", 1)]);

        assert_eq!(store.get(&first).unwrap().accumulated.len(), 1);
        assert!(store.get(&second).unwrap().accumulated.is_empty());
    }

    #[test]
    fn clear_drops_results_but_keeps_session() {
        let mut store = SessionStore::new(HOUR, true);
        let (token, _) = store.touch(None);
        store.record_batch(&token, vec![result("alice", 1)]);

        store.clear(&token);

        let session = store.get(&token).unwrap();
        assert!(session.accumulated.is_empty());
        assert!(session.last_batch.is_empty());
    }

    #[test]
    fn expired_sessions_are_dropped() {
        let mut store = SessionStore::new(Duration::ZERO, true);
        let (token, _) = store.touch(None);

        assert!(store.get(&token).is_none());

        let (fresh, created) = store.touch(Some(&token));
        assert!(created);
        assert_ne!(fresh, token);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn recording_for_unknown_session_is_ignored() {
        let mut store = SessionStore::new(HOUR, true);
        store.record_batch("missing", vec![result("alice", 1)]);
        assert!(store.is_empty());
    }
}
