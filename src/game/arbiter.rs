//! Two-cell move transactions

use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use super::error::{GameError, GameResult};
use super::events::{EventPublisher, MatchEvent};
use super::grid::{Cell, SpatialGrid};
use super::roster::{Roster, Tank};
use super::Heading;
use crate::store::{persist_board, MatchStore};

/// Validated move request for a single tank
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRequest {
    #[serde(alias = "posX")]
    pub from_x: i32,
    #[serde(alias = "posY")]
    pub from_y: i32,
    #[serde(alias = "newPosX")]
    pub to_x: i32,
    #[serde(alias = "newPosY")]
    pub to_y: i32,
    #[serde(alias = "rotation")]
    pub new_heading: Heading,
}

impl MoveRequest {
    pub fn new(from: (i32, i32), to: (i32, i32), new_heading: Heading) -> Self {
        Self {
            from_x: from.0,
            from_y: from.1,
            to_x: to.0,
            to_y: to.1,
            new_heading,
        }
    }

    pub fn origin(&self) -> (i32, i32) {
        (self.from_x, self.from_y)
    }

    pub fn destination(&self) -> (i32, i32) {
        (self.to_x, self.to_y)
    }
}

/// Relocates tanks across the grid, keeping roster and grid consistent
pub struct MoveArbiter {
    grid: Arc<SpatialGrid>,
    roster: Arc<Roster>,
    publisher: Arc<dyn EventPublisher>,
    store: Arc<dyn MatchStore>,
}

impl MoveArbiter {
    pub fn new(
        grid: Arc<SpatialGrid>,
        roster: Arc<Roster>,
        publisher: Arc<dyn EventPublisher>,
        store: Arc<dyn MatchStore>,
    ) -> Self {
        Self {
            grid,
            roster,
            publisher,
            store,
        }
    }

    /// Move `id` from `req.origin()` to `req.destination()`.
    ///
    /// Both cells are locked in linear-index order, the origin is re-validated
    /// and the destination must be empty. No retries: a caller that sees
    /// `StalePosition` or `Occupied` resubmits with fresh coordinates.
    pub fn move_tank(&self, id: &str, req: MoveRequest) -> GameResult<Tank> {
        let (from_x, from_y) = req.origin();
        let (to_x, to_y) = req.destination();

        // Range checks before any lock is taken
        self.grid.index(from_x, from_y)?;
        self.grid.index(to_x, to_y)?;

        if !self.roster.contains(id) {
            return Err(GameError::TankNotFound(id.to_string()));
        }

        let result = self.grid.with_cell_pair(req.origin(), req.destination(), |origin, dest| {
            if !origin.is_occupied_by(id) {
                return Err(GameError::StalePosition);
            }
            if *dest != Cell::Empty {
                return Err(GameError::Occupied {
                    blocker: dest.token().to_string(),
                });
            }

            // The tank may have been eliminated since the membership check;
            // elimination removes it from the roster before touching the grid.
            let tank = self
                .roster
                .update(id, |tank| {
                    tank.x = to_x;
                    tank.y = to_y;
                    tank.rotation = req.new_heading;
                })
                .ok_or_else(|| GameError::TankNotFound(id.to_string()))?;

            *origin = Cell::Empty;
            *dest = Cell::Occupied(id.to_string());
            Ok(tank)
        });

        let tank = match result {
            Ok(tank) => tank,
            Err(e) => {
                warn!(tank_id = %id, error = %e, "Move rejected");
                return Err(e);
            }
        };

        persist_board(self.store.as_ref(), &self.grid);
        debug!(tank_id = %id, x = to_x, y = to_y, "Tank moved");
        self.publisher.publish(MatchEvent::Movement(tank.clone()));
        Ok(tank)
    }
}
