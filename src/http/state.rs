use std::sync::Arc;
use tokio::sync::RwLock;

use crate::config::Config;
use crate::knowledge::KnowledgeStore;
use crate::session::LiveSession;
use crate::summary::SummaryService;
use crate::transport::SessionTransport;

/// Shared application state for HTTP handlers
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub transport: Arc<dyn SessionTransport>,
    pub knowledge: Arc<dyn KnowledgeStore>,
    pub summary: Arc<dyn SummaryService>,
    /// The active session; the process drives one microphone at a time
    pub session: Arc<RwLock<Option<Arc<LiveSession>>>>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        transport: Arc<dyn SessionTransport>,
        knowledge: Arc<dyn KnowledgeStore>,
        summary: Arc<dyn SummaryService>,
    ) -> Self {
        Self {
            config,
            transport,
            knowledge,
            summary,
            session: Arc::new(RwLock::new(None)),
        }
    }
}
