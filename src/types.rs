//! Core types shared across the application.
//! Pure data, no I/O.

/// Board dimensions (fixed by the game server).
pub const BOARD_WIDTH: usize = 10;
pub const BOARD_HEIGHT: usize = 20;

/// Gravity timing (milliseconds).
pub const BASE_FALL_MS: u32 = 1000;
pub const LEVEL_STEP_MS: u32 = 100;
pub const MIN_FALL_MS: u32 = 100;

/// Fixed bias applied to every computed fall interval.
pub const FALL_BIAS: f64 = 0.9;

/// Duration of the line-clear flash before removal is requested.
pub const LINE_CLEAR_ANIM_MS: u64 = 500;

/// Grace delay between a fresh-game reset and the first gravity tick.
pub const START_DELAY_MS: u64 = 100;

/// Next-piece previews shown beside the board.
pub const PREVIEW_COUNT: usize = 3;

/// The server keeps this many high scores.
pub const HIGH_SCORE_CAPACITY: usize = 10;

/// Tetromino piece kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PieceKind {
    I,
    O,
    T,
    L,
    J,
    S,
    Z,
}

impl PieceKind {
    /// Parse a piece kind from its wire tag (case-insensitive).
    pub fn from_tag(s: &str) -> Option<Self> {
        match s.to_ascii_uppercase().as_str() {
            "I" => Some(PieceKind::I),
            "O" => Some(PieceKind::O),
            "T" => Some(PieceKind::T),
            "L" => Some(PieceKind::L),
            "J" => Some(PieceKind::J),
            "S" => Some(PieceKind::S),
            "Z" => Some(PieceKind::Z),
            _ => None,
        }
    }

    /// Wire tag (uppercase, as the server sends it).
    pub fn as_tag(&self) -> &'static str {
        match self {
            PieceKind::I => "I",
            PieceKind::O => "O",
            PieceKind::T => "T",
            PieceKind::L => "L",
            PieceKind::J => "J",
            PieceKind::S => "S",
            PieceKind::Z => "Z",
        }
    }
}

/// Board cell state as encoded by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CellState {
    /// Part of a settled piece.
    Locked,
    /// Part of the active falling piece.
    Falling,
    /// Part of a full row marked for removal (flashing).
    Clearing,
}

impl CellState {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            1 => Some(CellState::Locked),
            2 => Some(CellState::Falling),
            3 => Some(CellState::Clearing),
            _ => None,
        }
    }

    pub fn code(&self) -> u8 {
        match self {
            CellState::Locked => 1,
            CellState::Falling => 2,
            CellState::Clearing => 3,
        }
    }
}

/// Player move directions accepted by the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
    Down,
    Rotate,
}

impl Direction {
    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "left" => Some(Direction::Left),
            "right" => Some(Direction::Right),
            "down" => Some(Direction::Down),
            "rotate" => Some(Direction::Rotate),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Direction::Left => "left",
            Direction::Right => "right",
            Direction::Down => "down",
            Direction::Rotate => "rotate",
        }
    }
}
