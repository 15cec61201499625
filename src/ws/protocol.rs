//! WebSocket protocol message definitions
//! These are the wire types for client-server communication

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::game::arbiter::MoveRequest;
use crate::game::events::CollisionReport;
use crate::game::{GameError, MatchEvent, Tank};

/// Messages sent from client to server
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMsg {
    /// Relocate a tank one request at a time
    Move {
        #[serde(rename = "tankId")]
        tank_id: String,
        #[serde(flatten)]
        request: MoveRequest,
    },

    /// Fire along the tank's current heading
    Shoot {
        #[serde(rename = "tankId")]
        tank_id: String,
        #[serde(rename = "shotId", alias = "bulletId")]
        shot_id: String,
    },

    /// Ping for latency measurement
    Ping {
        /// Client timestamp
        t: u64,
    },
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMsg {
    /// Welcome message after connection
    Welcome { session_id: Uuid, server_time: u64 },

    /// A tank changed cell or heading
    Movement { tank: Tank },

    /// A projectile eliminated a tank
    Collision(CollisionReport),

    /// One tank left standing
    Winner { tank: Tank },

    /// Rejected request, sent only to the session that made it
    Error { code: String, message: String },

    /// Pong response
    Pong {
        /// Echo back client timestamp
        t: u64,
    },
}

impl From<MatchEvent> for ServerMsg {
    fn from(event: MatchEvent) -> Self {
        match event {
            MatchEvent::Movement(tank) => ServerMsg::Movement { tank },
            MatchEvent::Collision(report) => ServerMsg::Collision(report),
            MatchEvent::Winner(tank) => ServerMsg::Winner { tank },
        }
    }
}

impl From<&GameError> for ServerMsg {
    fn from(err: &GameError) -> Self {
        ServerMsg::Error {
            code: err.code().to_string(),
            message: err.to_string(),
        }
    }
}
