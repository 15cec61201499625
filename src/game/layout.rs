//! Fixed board layout: dimensions, wall cells and the spawn sequence

/// Board width in cells (columns)
pub const BOARD_WIDTH: i32 = 15;
/// Board height in cells (rows)
pub const BOARD_HEIGHT: i32 = 10;

/// Interior wall pillars. The outer border is always wall.
const INTERIOR_WALLS: [(i32, i32); 8] = [
    (4, 3),
    (4, 4),
    (4, 5),
    (10, 4),
    (10, 5),
    (10, 6),
    (7, 2),
    (7, 7),
];

/// Spawn tuples, consumed front to back and refilled on reset
const SPAWN_SEQUENCE: [(i32, i32, &str); 4] = [
    (1, 8, "#fa0a0a"),
    (13, 8, "#001ba1"),
    (13, 1, "#f1c40f"),
    (1, 1, "#0c7036"),
];

/// A predefined spawn position and the color handed to whoever takes it
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnPoint {
    pub x: i32,
    pub y: i32,
    pub color: String,
}

/// Static description of a board: size, walls and spawn order
#[derive(Debug, Clone)]
pub struct BoardLayout {
    pub width: i32,
    pub height: i32,
    pub walls: Vec<(i32, i32)>,
    pub spawns: Vec<SpawnPoint>,
}

impl BoardLayout {
    /// The standard 15x10 arena
    pub fn standard() -> Self {
        let mut walls = Vec::new();
        for x in 0..BOARD_WIDTH {
            walls.push((x, 0));
            walls.push((x, BOARD_HEIGHT - 1));
        }
        for y in 1..BOARD_HEIGHT - 1 {
            walls.push((0, y));
            walls.push((BOARD_WIDTH - 1, y));
        }
        walls.extend_from_slice(&INTERIOR_WALLS);

        let spawns = SPAWN_SEQUENCE
            .iter()
            .map(|&(x, y, color)| SpawnPoint {
                x,
                y,
                color: color.to_string(),
            })
            .collect();

        Self {
            width: BOARD_WIDTH,
            height: BOARD_HEIGHT,
            walls,
            spawns,
        }
    }

    pub fn is_wall(&self, x: i32, y: i32) -> bool {
        self.walls.contains(&(x, y))
    }
}

impl Default for BoardLayout {
    fn default() -> Self {
        Self::standard()
    }
}
