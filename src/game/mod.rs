//! Game simulation modules

pub mod arbiter;
pub mod arena;
pub mod error;
pub mod events;
pub mod grid;
pub mod layout;
pub mod lifecycle;
pub mod projectile;
pub mod roster;

#[cfg(test)]
pub mod test_support;

pub use arena::Arena;
pub use error::{GameError, GameResult};
pub use events::{BroadcastPublisher, EventPublisher, MatchEvent};
pub use lifecycle::MatchPhase;
pub use projectile::Projectile;
pub use roster::Tank;

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Maximum number of tanks alive in one match
pub const MAX_PLAYERS: usize = 3;

/// Default projectile tick interval in milliseconds
pub const PROJECTILE_TICK_MS: u64 = 500;

/// One of the four cardinal headings, carried on the wire as degrees
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i32", into = "i32")]
pub enum Heading {
    /// -90 degrees, towards y - 1
    Up,
    /// 0 degrees, towards x + 1
    #[default]
    Right,
    /// 90 degrees, towards y + 1
    Down,
    /// 180 degrees, towards x - 1
    Left,
}

impl Heading {
    pub fn degrees(self) -> i32 {
        match self {
            Heading::Up => -90,
            Heading::Right => 0,
            Heading::Down => 90,
            Heading::Left => 180,
        }
    }

    /// Next cell along this heading
    pub fn step(self, x: i32, y: i32) -> (i32, i32) {
        match self {
            Heading::Up => (x, y - 1),
            Heading::Right => (x + 1, y),
            Heading::Down => (x, y + 1),
            Heading::Left => (x - 1, y),
        }
    }
}

impl TryFrom<i32> for Heading {
    type Error = GameError;

    fn try_from(degrees: i32) -> Result<Self, Self::Error> {
        match degrees {
            -90 => Ok(Heading::Up),
            0 => Ok(Heading::Right),
            90 => Ok(Heading::Down),
            180 => Ok(Heading::Left),
            other => Err(GameError::InvalidHeading(other)),
        }
    }
}

impl From<Heading> for i32 {
    fn from(heading: Heading) -> Self {
        heading.degrees()
    }
}

/// Tunables for a single match
#[derive(Debug, Clone)]
pub struct GameConfig {
    pub max_players: usize,
    pub projectile_tick: Duration,
    /// Whether tanks may join after a winner was announced but before reset
    pub allow_join_after_victory: bool,
}

impl Default for GameConfig {
    fn default() -> Self {
        Self {
            max_players: MAX_PLAYERS,
            projectile_tick: Duration::from_millis(PROJECTILE_TICK_MS),
            allow_join_after_victory: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_heading_from_degrees() {
        assert_eq!(Heading::try_from(-90), Ok(Heading::Up));
        assert_eq!(Heading::try_from(180), Ok(Heading::Left));
        assert_eq!(Heading::try_from(45), Err(GameError::InvalidHeading(45)));
    }

    #[test]
    fn test_new_tanks_face_right() {
        assert_eq!(Heading::default(), Heading::Right);
        assert_eq!(i32::from(Heading::default()), 0);
    }

    #[test]
    fn test_heading_steps() {
        assert_eq!(Heading::Right.step(1, 8), (2, 8));
        assert_eq!(Heading::Down.step(1, 8), (1, 9));
        assert_eq!(Heading::Up.step(1, 8), (1, 7));
        assert_eq!(Heading::Left.step(1, 8), (0, 8));
    }

    #[test]
    fn test_heading_wire_format() {
        assert_eq!(serde_json::to_string(&Heading::Up).unwrap(), "-90");
        let parsed: Heading = serde_json::from_str("180").unwrap();
        assert_eq!(parsed, Heading::Left);
        assert!(serde_json::from_str::<Heading>("45").is_err());
    }
}
