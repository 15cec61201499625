//! Application state shared across routes

use std::sync::Arc;

use crate::admission::HmacGate;
use crate::config::Config;
use crate::game::layout::BoardLayout;
use crate::game::{Arena, BroadcastPublisher};
use crate::store::MemoryStore;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub arena: Arc<Arena>,
    /// Event fan-out; each WebSocket session subscribes
    pub events: BroadcastPublisher,
}

impl AppState {
    pub fn new(config: Config) -> Self {
        let config = Arc::new(config);

        let events = BroadcastPublisher::default();
        let gate = Arc::new(HmacGate::new(&config.admission_secret));
        let store = Arc::new(MemoryStore::new());

        let arena = Arc::new(Arena::new(
            &config.game(),
            BoardLayout::standard(),
            gate,
            Arc::new(events.clone()),
            store,
        ));

        Self {
            config,
            arena,
            events,
        }
    }
}
