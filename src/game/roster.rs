//! Roster of live tanks and the spawn pool

use std::collections::VecDeque;
use std::sync::Arc;

use dashmap::DashMap;
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{GameError, GameResult};
use super::grid::{Cell, SpatialGrid, EMPTY_TOKEN, WALL_TOKEN};
use super::layout::SpawnPoint;
use super::Heading;
use crate::store::{log_store_error, persist_board, MatchStore};

/// A live tank. Presence in the roster is what makes it alive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Tank {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub color: String,
    pub rotation: Heading,
}

impl Tank {
    pub fn new(id: &str, x: i32, y: i32, color: &str, rotation: Heading) -> Self {
        Self {
            id: id.to_string(),
            x,
            y,
            color: color.to_string(),
            rotation,
        }
    }
}

/// Reject ids that collide with board tokens or can't be addressed
pub fn validate_identifier(id: &str) -> GameResult<()> {
    if id.trim().is_empty() || id == EMPTY_TOKEN || id == WALL_TOKEN {
        return Err(GameError::InvalidIdentifier(id.to_string()));
    }
    Ok(())
}

/// Authoritative registry of live tanks
pub struct Roster {
    tanks: DashMap<String, Tank>,
    /// Serializes admission and reset; the capacity check and the spawn pop
    /// happen together under this lock
    spawn_pool: Mutex<VecDeque<SpawnPoint>>,
    capacity: usize,
    grid: Arc<SpatialGrid>,
    store: Arc<dyn MatchStore>,
}

impl Roster {
    pub fn new(grid: Arc<SpatialGrid>, store: Arc<dyn MatchStore>, capacity: usize) -> Self {
        let spawn_pool = Mutex::new(grid.layout().spawns.iter().cloned().collect());
        Self {
            tanks: DashMap::new(),
            spawn_pool,
            capacity,
            grid,
            store,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn len(&self) -> usize {
        self.tanks.len()
    }

    #[cfg(test)]
    pub fn is_empty(&self) -> bool {
        self.tanks.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.tanks.contains_key(id)
    }

    pub fn get(&self, id: &str) -> Option<Tank> {
        self.tanks.get(id).map(|t| t.value().clone())
    }

    pub fn all(&self) -> Vec<Tank> {
        self.tanks.iter().map(|t| t.value().clone()).collect()
    }

    /// The only remaining tank, if exactly one is left
    pub fn sole_survivor(&self) -> Option<Tank> {
        if self.tanks.len() != 1 {
            return None;
        }
        self.tanks.iter().next().map(|t| t.value().clone())
    }

    /// Spawn points still available, in pop order
    pub fn remaining_spawns(&self) -> Vec<SpawnPoint> {
        self.spawn_pool.lock().iter().cloned().collect()
    }

    /// Admit a new tank at the next spawn point
    pub fn admit(&self, id: &str) -> GameResult<Tank> {
        let mut pool = self.spawn_pool.lock();

        if self.tanks.len() >= self.capacity {
            return Err(GameError::RoomFull);
        }
        validate_identifier(id)?;
        if self.tanks.contains_key(id) {
            return Err(GameError::TankExists(id.to_string()));
        }

        let spawn = pool.pop_front().ok_or(GameError::NoSpawnAvailable)?;
        let placed = self.grid.with_cell_lock(spawn.x, spawn.y, |cell| match cell {
            Cell::Empty => {
                *cell = Cell::Occupied(id.to_string());
                Ok(())
            }
            other => Err(GameError::Occupied {
                blocker: other.token().to_string(),
            }),
        });
        if let Err(e) = placed {
            warn!(tank_id = %id, spawn_x = spawn.x, spawn_y = spawn.y, "Spawn cell blocked");
            pool.push_front(spawn);
            return Err(e);
        }

        let tank = Tank::new(id, spawn.x, spawn.y, &spawn.color, Heading::default());
        self.tanks.insert(tank.id.clone(), tank.clone());
        drop(pool);

        persist_board(self.store.as_ref(), &self.grid);
        log_store_error(self.store.save_tank(&tank), "tank");

        info!(tank_id = %tank.id, x = tank.x, y = tank.y, "Tank admitted");
        Ok(tank)
    }

    /// Apply `f` to a live tank and persist the result. The map shard stays
    /// locked while `f` runs, so callers holding cell locks must not touch
    /// the roster from inside `f`.
    pub fn update(&self, id: &str, f: impl FnOnce(&mut Tank)) -> Option<Tank> {
        let updated = {
            let mut entry = self.tanks.get_mut(id)?;
            f(entry.value_mut());
            entry.value().clone()
        };
        log_store_error(self.store.save_tank(&updated), "tank");
        Some(updated)
    }

    /// Remove a tank and clear its cell. Returns `None` if someone else got
    /// there first, which makes elimination happen at most once.
    pub fn eliminate(&self, id: &str) -> Option<Tank> {
        let (_, tank) = self.tanks.remove(id)?;

        let cleared = self.grid.with_cell_lock(tank.x, tank.y, |cell| {
            if cell.is_occupied_by(id) {
                *cell = Cell::Empty;
            }
            Ok(())
        });
        if let Err(e) = cleared {
            warn!(tank_id = %id, error = %e, "Eliminated tank had an invalid position");
        }

        persist_board(self.store.as_ref(), &self.grid);
        log_store_error(self.store.delete_tank(id), "tank");

        info!(tank_id = %id, x = tank.x, y = tank.y, "Tank eliminated");
        Some(tank)
    }

    /// Put a tank at an arbitrary open cell, bypassing the spawn pool
    #[cfg(test)]
    pub fn seat(&self, id: &str, at: (i32, i32)) -> Tank {
        let tank = Tank::new(id, at.0, at.1, "#ffffff", Heading::default());
        self.grid.place(id, at.0, at.1).unwrap();
        self.tanks.insert(tank.id.clone(), tank.clone());
        tank
    }

    /// Drop every tank without touching the spawn pool
    pub fn clear(&self) {
        let _pool = self.spawn_pool.lock();
        self.tanks.clear();
        log_store_error(self.store.clear_tanks(), "tanks");
    }

    /// Drop every tank and refill the spawn pool to its initial sequence
    pub fn reset(&self) {
        let mut pool = self.spawn_pool.lock();
        self.tanks.clear();
        *pool = self.grid.layout().spawns.iter().cloned().collect();
        log_store_error(self.store.clear_tanks(), "tanks");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;

    fn roster() -> (Roster, Arc<SpatialGrid>, Arc<MemoryStore>) {
        let grid = Arc::new(SpatialGrid::default());
        let store = Arc::new(MemoryStore::new());
        let roster = Roster::new(grid.clone(), store.clone(), 3);
        (roster, grid, store)
    }

    #[test]
    fn test_admit_uses_spawn_sequence() {
        let (roster, grid, store) = roster();

        let alice = roster.admit("Alice").unwrap();
        assert_eq!((alice.x, alice.y), (1, 8));
        assert_eq!(alice.color, "#fa0a0a");
        assert_eq!(alice.rotation, Heading::Right);

        let bob = roster.admit("Bob").unwrap();
        assert_eq!((bob.x, bob.y), (13, 8));

        assert!(grid.occupant(1, 8).unwrap().is_occupied_by("Alice"));
        assert!(grid.occupant(13, 8).unwrap().is_occupied_by("Bob"));
        assert_eq!(store.tank_count(), 2);
        assert_eq!(store.board().unwrap()[8][13], "Bob");
    }

    #[test]
    fn test_capacity_is_enforced() {
        let (roster, _, _) = roster();
        for id in ["a", "b", "c"] {
            roster.admit(id).unwrap();
        }
        assert_eq!(roster.admit("d"), Err(GameError::RoomFull));
        assert_eq!(roster.len(), 3);
    }

    #[test]
    fn test_reserved_and_duplicate_ids() {
        let (roster, _, _) = roster();
        assert_eq!(
            roster.admit("0"),
            Err(GameError::InvalidIdentifier("0".into()))
        );
        assert_eq!(
            roster.admit("1"),
            Err(GameError::InvalidIdentifier("1".into()))
        );
        assert!(roster.admit("").is_err());

        roster.admit("Alice").unwrap();
        assert_eq!(
            roster.admit("Alice"),
            Err(GameError::TankExists("Alice".into()))
        );
        // rejected attempts never consume a spawn point
        assert_eq!(roster.remaining_spawns().len(), 3);
    }

    #[test]
    fn test_blocked_spawn_returns_point_to_pool() {
        let (roster, grid, _) = roster();
        grid.place("squatter", 1, 8).unwrap();

        let err = roster.admit("Alice").unwrap_err();
        assert_eq!(
            err,
            GameError::Occupied {
                blocker: "squatter".into()
            }
        );
        assert_eq!(roster.remaining_spawns().len(), 4);
        assert!(roster.is_empty());
    }

    #[test]
    fn test_spawn_pool_exhaustion() {
        let (roster, _, _) = roster();
        for id in ["a", "b", "c"] {
            roster.admit(id).unwrap();
        }
        roster.eliminate("a").unwrap();
        roster.admit("d").unwrap();
        roster.eliminate("b").unwrap();
        assert_eq!(roster.admit("e"), Err(GameError::NoSpawnAvailable));
    }

    #[test]
    fn test_eliminate_is_at_most_once() {
        let (roster, grid, store) = roster();
        roster.admit("Bob").unwrap();

        let gone = roster.eliminate("Bob").unwrap();
        assert_eq!((gone.x, gone.y), (1, 8));
        assert_eq!(grid.occupant(1, 8).unwrap(), Cell::Empty);
        assert!(store.tank("Bob").is_none());

        assert!(roster.eliminate("Bob").is_none());
    }

    #[test]
    fn test_sole_survivor() {
        let (roster, _, _) = roster();
        assert!(roster.sole_survivor().is_none());
        roster.admit("a").unwrap();
        assert_eq!(roster.sole_survivor().unwrap().id, "a");
        roster.admit("b").unwrap();
        assert!(roster.sole_survivor().is_none());
    }

    #[test]
    fn test_reset_refills_pool() {
        let (roster, _, store) = roster();
        roster.admit("a").unwrap();
        roster.admit("b").unwrap();
        roster.reset();
        assert!(roster.is_empty());
        assert_eq!(store.tank_count(), 0);
        assert_eq!(roster.remaining_spawns(), SpatialGrid::default().layout().spawns);
    }

    #[test]
    fn test_concurrent_admissions_never_exceed_capacity() {
        let (roster, _, _) = roster();
        let roster = Arc::new(roster);
        let handles: Vec<_> = (0..8)
            .map(|i| {
                let roster = roster.clone();
                std::thread::spawn(move || roster.admit(&format!("tank-{i}")).is_ok())
            })
            .collect();
        let admitted = handles
            .into_iter()
            .map(|h| h.join().unwrap())
            .filter(|ok| *ok)
            .count();
        assert_eq!(admitted, 3);
        assert_eq!(roster.len(), 3);
    }
}
