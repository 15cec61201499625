//! Shared fixtures for engine tests

use std::sync::Arc;
use std::time::Duration;

use super::events::RecordingPublisher;
use super::layout::BoardLayout;
use super::{Arena, GameConfig};
use crate::admission::AdmissionGate;
use crate::store::MemoryStore;

pub const TICK: Duration = Duration::from_millis(500);

/// Accepts the literal proof "ok" for any candidate
pub struct StaticGate;

impl AdmissionGate for StaticGate {
    fn verify(&self, _candidate: &str, proof: &str) -> bool {
        proof == "ok"
    }
}

pub struct Fixture {
    pub arena: Arena,
    pub publisher: Arc<RecordingPublisher>,
    pub store: Arc<MemoryStore>,
}

pub fn fixture() -> Fixture {
    let publisher = Arc::new(RecordingPublisher::new());
    let store = Arc::new(MemoryStore::new());
    let config = GameConfig {
        projectile_tick: TICK,
        ..GameConfig::default()
    };
    let arena = Arena::new(
        &config,
        BoardLayout::standard(),
        Arc::new(StaticGate),
        publisher.clone(),
        store.clone(),
    );
    Fixture {
        arena,
        publisher,
        store,
    }
}
