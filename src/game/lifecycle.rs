//! Match lifecycle: admission, victory and reset

use std::sync::Arc;

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use super::error::{GameError, GameResult};
use super::events::{EventPublisher, MatchEvent};
use super::grid::SpatialGrid;
use super::projectile::ShotRegistry;
use super::roster::{Roster, Tank};
use crate::store::{persist_board, MatchStore};

/// Match phase
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchPhase {
    /// Match ongoing, zero or more tanks
    Active,
    /// A sole survivor was announced
    Resolved,
    /// Reset done, spawn pool replenished
    Idle,
}

/// Drives Active -> Resolved -> Idle. The phase lock serializes admission,
/// victory announcement and reset against each other.
pub struct MatchLifecycle {
    phase: Mutex<MatchPhase>,
    grid: Arc<SpatialGrid>,
    roster: Arc<Roster>,
    shots: Arc<ShotRegistry>,
    publisher: Arc<dyn EventPublisher>,
    store: Arc<dyn MatchStore>,
    allow_join_after_victory: bool,
}

impl MatchLifecycle {
    pub fn new(
        grid: Arc<SpatialGrid>,
        roster: Arc<Roster>,
        shots: Arc<ShotRegistry>,
        publisher: Arc<dyn EventPublisher>,
        store: Arc<dyn MatchStore>,
        allow_join_after_victory: bool,
    ) -> Self {
        Self {
            phase: Mutex::new(MatchPhase::Active),
            grid,
            roster,
            shots,
            publisher,
            store,
            allow_join_after_victory,
        }
    }

    pub fn phase(&self) -> MatchPhase {
        *self.phase.lock()
    }

    /// Admit a tank, subject to the post-victory policy
    pub fn admit(&self, id: &str) -> GameResult<Tank> {
        let mut phase = self.phase.lock();
        if *phase == MatchPhase::Resolved && !self.allow_join_after_victory {
            warn!(tank_id = %id, "Admission refused until reset");
            return Err(GameError::MatchResolved);
        }

        let tank = self.roster.admit(id)?;
        *phase = MatchPhase::Active;
        Ok(tank)
    }

    /// The winner, if exactly one tank remains
    pub fn check_victory(&self) -> Option<Tank> {
        self.roster.sole_survivor()
    }

    /// Check for a sole survivor and announce it. Two eliminations landing
    /// together produce one announcement at most, and an elimination from a
    /// generation that a reset already closed announces nothing.
    pub fn resolve_victory(&self, generation: u64) -> Option<Tank> {
        let mut phase = self.phase.lock();
        if !self.shots.is_current(generation) {
            return None;
        }
        let winner = self.check_victory()?;
        self.announce(&mut phase, winner.clone());
        Some(winner)
    }

    /// Clear roster and grid and broadcast the winner
    #[cfg(test)]
    pub fn announce_victory(&self, winner: Tank) {
        let mut phase = self.phase.lock();
        self.announce(&mut phase, winner);
    }

    fn announce(&self, phase: &mut MatchPhase, winner: Tank) {
        self.roster.clear();
        self.grid.reset();
        persist_board(self.store.as_ref(), &self.grid);
        *phase = MatchPhase::Resolved;

        info!(winner_id = %winner.id, "Match resolved");
        self.publisher.publish(MatchEvent::Winner(winner));
    }

    /// Back to the initial configuration. Safe to call on an empty match.
    pub fn reset(&self) {
        let mut phase = self.phase.lock();
        self.shots.cancel_all();
        self.roster.reset();
        self.grid.reset();
        persist_board(self.store.as_ref(), &self.grid);
        *phase = MatchPhase::Idle;

        info!("Match reset");
    }
}
