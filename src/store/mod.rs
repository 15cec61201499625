//! Persistence port for match state
//!
//! The in-memory engine is authoritative; a store mirrors it after every
//! logical mutation (move, admit, eliminate, reset) so the externally visible
//! copy never lags by more than one mutation.

pub mod memory;

pub use memory::MemoryStore;

use tracing::warn;

use crate::game::grid::{BoardSnapshot, SpatialGrid};
use crate::game::{Projectile, Tank};

/// Store errors
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Store unavailable: {0}")]
    Unavailable(String),
}

/// Durable store with point lookups by key
pub trait MatchStore: Send + Sync {
    fn save_board(&self, board: &BoardSnapshot) -> Result<(), StoreError>;
    fn save_tank(&self, tank: &Tank) -> Result<(), StoreError>;
    fn delete_tank(&self, id: &str) -> Result<(), StoreError>;
    fn clear_tanks(&self) -> Result<(), StoreError>;
    fn save_projectile(&self, projectile: &Projectile) -> Result<(), StoreError>;
    fn delete_projectile(&self, id: &str) -> Result<(), StoreError>;
    fn clear_projectiles(&self) -> Result<(), StoreError>;
}

/// Mirror the current grid. Failures are logged, never propagated.
pub fn persist_board(store: &dyn MatchStore, grid: &SpatialGrid) {
    if let Err(e) = store.save_board(&grid.snapshot()) {
        warn!(error = %e, "Failed to persist board");
    }
}

/// Log-and-continue wrapper for the remaining store writes
pub fn log_store_error(result: Result<(), StoreError>, what: &str) {
    if let Err(e) = result {
        warn!(error = %e, record = what, "Failed to persist record");
    }
}
