//! In-process store backed by concurrent maps

use std::time::Duration;

use dashmap::DashMap;
use parking_lot::RwLock;

use super::{MatchStore, StoreError};
use crate::game::grid::BoardSnapshot;
use crate::game::{Projectile, Tank};

/// Longest a board save waits on readers before giving up
const BOARD_WRITE_TIMEOUT: Duration = Duration::from_millis(250);

/// Keeps the persisted layout in memory: one board record, tanks and
/// projectiles keyed by identifier
#[derive(Default)]
pub struct MemoryStore {
    board: RwLock<Option<Vec<Vec<String>>>>,
    tanks: DashMap<String, Tank>,
    projectiles: DashMap<String, Projectile>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Last saved board, as tokens
    #[cfg(test)]
    pub fn board(&self) -> Option<Vec<Vec<String>>> {
        self.board.read().clone()
    }

    #[cfg(test)]
    pub fn tank(&self, id: &str) -> Option<Tank> {
        self.tanks.get(id).map(|t| t.value().clone())
    }

    #[cfg(test)]
    pub fn tank_count(&self) -> usize {
        self.tanks.len()
    }

    #[cfg(test)]
    pub fn projectile(&self, id: &str) -> Option<Projectile> {
        self.projectiles.get(id).map(|p| p.value().clone())
    }

    #[cfg(test)]
    pub fn projectile_count(&self) -> usize {
        self.projectiles.len()
    }
}

impl MatchStore for MemoryStore {
    fn save_board(&self, board: &BoardSnapshot) -> Result<(), StoreError> {
        let mut slot = self
            .board
            .try_write_for(BOARD_WRITE_TIMEOUT)
            .ok_or_else(|| StoreError::Unavailable("board record is locked".to_string()))?;
        *slot = Some(board.tokens());
        Ok(())
    }

    fn save_tank(&self, tank: &Tank) -> Result<(), StoreError> {
        self.tanks.insert(tank.id.clone(), tank.clone());
        Ok(())
    }

    fn delete_tank(&self, id: &str) -> Result<(), StoreError> {
        self.tanks.remove(id);
        Ok(())
    }

    fn clear_tanks(&self) -> Result<(), StoreError> {
        self.tanks.clear();
        Ok(())
    }

    fn save_projectile(&self, projectile: &Projectile) -> Result<(), StoreError> {
        self.projectiles
            .insert(projectile.id.clone(), projectile.clone());
        Ok(())
    }

    fn delete_projectile(&self, id: &str) -> Result<(), StoreError> {
        self.projectiles.remove(id);
        Ok(())
    }

    fn clear_projectiles(&self) -> Result<(), StoreError> {
        self.projectiles.clear();
        Ok(())
    }
}
