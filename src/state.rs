use std::sync::Arc;

use tokio::sync::Mutex;

use crate::config::Config;
use crate::fetch::ActivityFetcher;
use crate::session::SessionStore;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub fetcher: Arc<dyn ActivityFetcher>,
    pub sessions: Arc<Mutex<SessionStore>>,
}

impl AppState {
    pub fn new(config: Config, fetcher: Arc<dyn ActivityFetcher>) -> Self {
        let sessions = SessionStore::new(config.session.ttl(), config.session.retain_results);
        Self {
            config,
            fetcher,
            sessions: Arc::new(Mutex::new(sessions)),
        }
    }
}
