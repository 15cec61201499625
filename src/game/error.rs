//! Game error taxonomy

/// Typed failures for admission, movement and projectile queries
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GameError {
    /// The admission gate rejected the proof. Never carries the expected value.
    #[error("Admission proof rejected")]
    InvalidProof,

    #[error("The room is full")]
    RoomFull,

    #[error("Tank {0} already exists")]
    TankExists(String),

    #[error("Tank identifier {0:?} is reserved or invalid")]
    InvalidIdentifier(String),

    #[error("No spawn point available")]
    NoSpawnAvailable,

    #[error("Match already resolved, waiting for reset")]
    MatchResolved,

    #[error("Tank {0} not found")]
    TankNotFound(String),

    #[error("Projectile {0} not found")]
    ProjectileNotFound(String),

    #[error("Projectile {0} is already in flight")]
    ProjectileExists(String),

    #[error("Tank is no longer in the original position")]
    StalePosition,

    #[error("This cell is already occupied by: {blocker}")]
    Occupied { blocker: String },

    #[error("Cell ({x}, {y}) is outside the board")]
    OutOfBounds { x: i32, y: i32 },

    #[error("Origin and destination are the same cell")]
    SameCell,

    #[error("Invalid heading {0}, expected one of -90, 0, 90, 180")]
    InvalidHeading(i32),
}

pub type GameResult<T> = Result<T, GameError>;

impl GameError {
    /// Stable code sent to clients alongside the message
    pub fn code(&self) -> &'static str {
        match self {
            GameError::InvalidProof => "invalid_proof",
            GameError::RoomFull => "room_full",
            GameError::TankExists(_) => "tank_exists",
            GameError::InvalidIdentifier(_) => "invalid_identifier",
            GameError::NoSpawnAvailable => "no_spawn_available",
            GameError::MatchResolved => "match_resolved",
            GameError::TankNotFound(_) => "tank_not_found",
            GameError::ProjectileNotFound(_) => "projectile_not_found",
            GameError::ProjectileExists(_) => "projectile_exists",
            GameError::StalePosition => "stale_position",
            GameError::Occupied { .. } => "occupied",
            GameError::OutOfBounds { .. } => "out_of_bounds",
            GameError::SameCell => "same_cell",
            GameError::InvalidHeading(_) => "invalid_heading",
        }
    }
}
