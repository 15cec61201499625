//! Projectile engine: one async task per shot, advancing on a fixed tick

use std::sync::Arc;
use std::time::Duration;

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use parking_lot::{RwLock, RwLockReadGuard};
use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{debug, info};

use super::error::{GameError, GameResult};
use super::events::{CollisionReport, EventPublisher, MatchEvent};
use super::grid::{Cell, SpatialGrid};
use super::lifecycle::MatchLifecycle;
use super::roster::Roster;
use super::Heading;
use crate::store::{log_store_error, MatchStore};

/// A shot in flight. Owned by its task; the registry holds a mirror for polling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Projectile {
    pub id: String,
    pub x: i32,
    pub y: i32,
    pub heading: Heading,
    pub alive: bool,
    pub owner_id: String,
}

/// Live projectiles keyed by id, plus the match generation their tasks belong to
pub struct ShotRegistry {
    live: DashMap<String, Projectile>,
    /// Current generation. Registry writes hold it shared; reset holds it
    /// exclusively, so no write from an older generation lands after a reset.
    generation: RwLock<u64>,
    /// Carries the generation to sleeping tasks
    cancel: watch::Sender<u64>,
    store: Arc<dyn MatchStore>,
}

impl ShotRegistry {
    pub fn new(store: Arc<dyn MatchStore>) -> Self {
        let (cancel, _) = watch::channel(0);
        Self {
            live: DashMap::new(),
            generation: RwLock::new(0),
            cancel,
            store,
        }
    }

    pub fn get(&self, id: &str) -> Option<Projectile> {
        self.live.get(id).map(|p| p.value().clone())
    }

    pub fn len(&self) -> usize {
        self.live.len()
    }

    pub fn generation(&self) -> u64 {
        *self.generation.read()
    }

    pub fn is_current(&self, generation: u64) -> bool {
        self.generation() == generation
    }

    /// Hold off resets while the caller acts for `generation`. `None` once a
    /// reset has moved past it. The guard must not be held across another
    /// registry call.
    fn pin(&self, generation: u64) -> Option<RwLockReadGuard<'_, u64>> {
        let current = self.generation.read();
        (*current == generation).then_some(current)
    }

    /// Register a shot fired in `generation`. A reset since then means the
    /// owner is gone.
    fn register(&self, projectile: &Projectile, generation: u64) -> GameResult<()> {
        let Some(_current) = self.pin(generation) else {
            return Err(GameError::TankNotFound(projectile.owner_id.clone()));
        };
        match self.live.entry(projectile.id.clone()) {
            Entry::Occupied(_) => return Err(GameError::ProjectileExists(projectile.id.clone())),
            Entry::Vacant(slot) => {
                slot.insert(projectile.clone());
            }
        }
        log_store_error(self.store.save_projectile(projectile), "projectile");
        Ok(())
    }

    /// Refresh the mirror. Returns false if the shot is no longer live, in
    /// which case nothing is re-created.
    fn update(&self, projectile: &Projectile, generation: u64) -> bool {
        let Some(_current) = self.pin(generation) else {
            return false;
        };
        let refreshed = match self.live.get_mut(&projectile.id) {
            Some(mut entry) => {
                *entry = projectile.clone();
                true
            }
            None => false,
        };
        if refreshed {
            log_store_error(self.store.save_projectile(projectile), "projectile");
        }
        refreshed
    }

    /// Drop a shot of `generation`. A later generation may reuse the id, so
    /// stale retirements are ignored.
    fn retire(&self, id: &str, generation: u64) {
        let Some(_current) = self.pin(generation) else {
            return;
        };
        self.live.remove(id);
        log_store_error(self.store.delete_projectile(id), "projectile");
    }

    fn subscribe_cancel(&self) -> watch::Receiver<u64> {
        self.cancel.subscribe()
    }

    /// Start a new generation: wake every running task and forget all live
    /// projectiles
    pub fn cancel_all(&self) {
        let mut current = self.generation.write();
        *current += 1;
        self.cancel.send_replace(*current);
        self.live.clear();
        log_store_error(self.store.clear_projectiles(), "projectiles");
    }
}

/// Outcome of a single advancement step
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Flight {
    Cruising,
    Landed,
}

/// Spawns and drives projectile tasks
pub struct ProjectileEngine {
    grid: Arc<SpatialGrid>,
    roster: Arc<Roster>,
    shots: Arc<ShotRegistry>,
    lifecycle: Arc<MatchLifecycle>,
    publisher: Arc<dyn EventPublisher>,
    tick: Duration,
}

impl ProjectileEngine {
    pub fn new(
        grid: Arc<SpatialGrid>,
        roster: Arc<Roster>,
        shots: Arc<ShotRegistry>,
        lifecycle: Arc<MatchLifecycle>,
        publisher: Arc<dyn EventPublisher>,
        tick: Duration,
    ) -> Self {
        Self {
            grid,
            roster,
            shots,
            lifecycle,
            publisher,
            tick,
        }
    }

    /// Fire from the owner's current cell along its current heading.
    ///
    /// Must be called from within a tokio runtime.
    pub fn fire(self: &Arc<Self>, owner_id: &str, shot_id: &str) -> GameResult<Projectile> {
        if shot_id.trim().is_empty() {
            return Err(GameError::InvalidIdentifier(shot_id.to_string()));
        }
        let generation = self.shots.generation();
        let owner = self
            .roster
            .get(owner_id)
            .ok_or_else(|| GameError::TankNotFound(owner_id.to_string()))?;

        let projectile = Projectile {
            id: shot_id.to_string(),
            x: owner.x,
            y: owner.y,
            heading: owner.rotation,
            alive: true,
            owner_id: owner.id,
        };

        let cancel = self.shots.subscribe_cancel();
        self.shots.register(&projectile, generation)?;

        info!(
            shot_id = %projectile.id,
            owner_id = %projectile.owner_id,
            heading = projectile.heading.degrees(),
            "Projectile fired"
        );

        let engine = Arc::clone(self);
        tokio::spawn(engine.fly(projectile.clone(), generation, cancel));
        Ok(projectile)
    }

    pub fn position(&self, shot_id: &str) -> GameResult<Projectile> {
        self.shots
            .get(shot_id)
            .ok_or_else(|| GameError::ProjectileNotFound(shot_id.to_string()))
    }

    /// Task body: step, then sleep one tick, until landed or cancelled
    async fn fly(
        self: Arc<Self>,
        mut shot: Projectile,
        generation: u64,
        mut cancel: watch::Receiver<u64>,
    ) {
        loop {
            if *cancel.borrow_and_update() != generation {
                break;
            }

            if self.advance(&mut shot, generation) == Flight::Landed {
                return;
            }

            tokio::select! {
                _ = tokio::time::sleep(self.tick) => {}
                changed = cancel.changed() => {
                    if changed.is_err() {
                        break;
                    }
                }
            }
        }

        debug!(shot_id = %shot.id, "Projectile cancelled");
        self.shots.retire(&shot.id, generation);
    }

    /// One advancement step. Never holds a lock across the whole step: the
    /// occupant read and the elimination each lock only what they touch.
    fn advance(&self, shot: &mut Projectile, generation: u64) -> Flight {
        let (next_x, next_y) = shot.heading.step(shot.x, shot.y);

        let occupant = match self.grid.occupant(next_x, next_y) {
            Ok(Cell::Wall) | Err(_) => {
                debug!(shot_id = %shot.id, x = next_x, y = next_y, "Projectile hit boundary");
                self.land(shot, generation);
                return Flight::Landed;
            }
            Ok(cell) => cell,
        };

        shot.x = next_x;
        shot.y = next_y;
        if !self.shots.update(shot, generation) {
            debug!(shot_id = %shot.id, "Projectile dropped by reset");
            return Flight::Landed;
        }

        let target = match occupant {
            Cell::Occupied(target) if target != shot.owner_id => target,
            _ => return Flight::Cruising,
        };

        // The elimination and its event belong to this generation; a reset
        // waits until both are done
        {
            let Some(_current) = self.shots.pin(generation) else {
                return Flight::Landed;
            };
            // A racing shot may have removed the target already; keep flying then
            let Some(victim) = self.roster.eliminate(&target) else {
                return Flight::Cruising;
            };
            info!(
                shot_id = %shot.id,
                owner_id = %shot.owner_id,
                victim_id = %victim.id,
                "Projectile hit"
            );
            self.publisher.publish(MatchEvent::Collision(CollisionReport {
                eliminated_id: victim.id,
                x: victim.x,
                y: victim.y,
                shot_id: shot.id.clone(),
            }));
        }
        self.land(shot, generation);

        self.lifecycle.resolve_victory(generation);
        Flight::Landed
    }

    fn land(&self, shot: &mut Projectile, generation: u64) {
        shot.alive = false;
        self.shots.retire(&shot.id, generation);
    }
}
