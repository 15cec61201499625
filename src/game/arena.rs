//! Arena: the single match, wired from explicitly owned components

use std::sync::Arc;

use tracing::{info, warn};

use super::arbiter::{MoveArbiter, MoveRequest};
use super::error::{GameError, GameResult};
use super::events::EventPublisher;
use super::grid::{BoardSnapshot, SpatialGrid};
use super::layout::BoardLayout;
use super::lifecycle::{MatchLifecycle, MatchPhase};
use super::projectile::{Projectile, ProjectileEngine, ShotRegistry};
use super::roster::{Roster, Tank};
use super::GameConfig;
use crate::admission::AdmissionGate;
use crate::store::{persist_board, MatchStore};

/// Entry point for every request the transport layer forwards
pub struct Arena {
    grid: Arc<SpatialGrid>,
    roster: Arc<Roster>,
    shots: Arc<ShotRegistry>,
    arbiter: MoveArbiter,
    projectiles: Arc<ProjectileEngine>,
    lifecycle: Arc<MatchLifecycle>,
    gate: Arc<dyn AdmissionGate>,
}

impl Arena {
    pub fn new(
        config: &GameConfig,
        layout: BoardLayout,
        gate: Arc<dyn AdmissionGate>,
        publisher: Arc<dyn EventPublisher>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        let grid = Arc::new(SpatialGrid::new(layout));
        let roster = Arc::new(Roster::new(grid.clone(), store.clone(), config.max_players));
        let shots = Arc::new(ShotRegistry::new(store.clone()));
        let lifecycle = Arc::new(MatchLifecycle::new(
            grid.clone(),
            roster.clone(),
            shots.clone(),
            publisher.clone(),
            store.clone(),
            config.allow_join_after_victory,
        ));
        let arbiter = MoveArbiter::new(grid.clone(), roster.clone(), publisher.clone(), store.clone());
        let projectiles = Arc::new(ProjectileEngine::new(
            grid.clone(),
            roster.clone(),
            shots.clone(),
            lifecycle.clone(),
            publisher,
            config.projectile_tick,
        ));

        persist_board(store.as_ref(), &grid);
        info!(
            width = grid.width(),
            height = grid.height(),
            max_players = config.max_players,
            "Arena ready"
        );

        Self {
            grid,
            roster,
            shots,
            arbiter,
            projectiles,
            lifecycle,
            gate,
        }
    }

    /// Verify the proof, then admit
    pub fn join(&self, id: &str, proof: &str) -> GameResult<Tank> {
        if !self.gate.verify(id, proof) {
            warn!(tank_id = %id, "Join rejected: invalid proof");
            return Err(GameError::InvalidProof);
        }
        self.lifecycle.admit(id)
    }

    pub fn move_tank(&self, id: &str, req: MoveRequest) -> GameResult<Tank> {
        self.arbiter.move_tank(id, req)
    }

    pub fn fire(&self, id: &str, shot_id: &str) -> GameResult<Projectile> {
        self.projectiles.fire(id, shot_id)
    }

    pub fn projectile(&self, shot_id: &str) -> GameResult<Projectile> {
        self.projectiles.position(shot_id)
    }

    pub fn tank(&self, id: &str) -> GameResult<Tank> {
        self.roster
            .get(id)
            .ok_or_else(|| GameError::TankNotFound(id.to_string()))
    }

    pub fn tanks(&self) -> Vec<Tank> {
        self.roster.all()
    }

    pub fn tank_count(&self) -> usize {
        self.roster.len()
    }

    pub fn capacity(&self) -> usize {
        self.roster.capacity()
    }

    /// Spawn points not yet handed out this match
    pub fn open_spawns(&self) -> usize {
        self.roster.remaining_spawns().len()
    }

    pub fn board(&self) -> BoardSnapshot {
        self.grid.snapshot()
    }

    pub fn live_projectiles(&self) -> usize {
        self.shots.len()
    }

    pub fn phase(&self) -> MatchPhase {
        self.lifecycle.phase()
    }

    pub fn reset(&self) {
        self.lifecycle.reset();
    }
}
