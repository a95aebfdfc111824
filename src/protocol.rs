//! Wire types for the game server's JSON protocol.
//!
//! The server owns all game rules; every response is a full [`Snapshot`] or a
//! high-score list, never a delta. Board cells and next-piece previews use
//! positional encodings (`0` or `[state, kind]`, `[shape, kind]`), so those
//! get hand-written serde impls.

use serde::{Deserialize, Serialize};

use arrayvec::ArrayVec;

use crate::types::{CellState, Direction, PieceKind, BOARD_HEIGHT, BOARD_WIDTH, HIGH_SCORE_CAPACITY};

impl Serialize for PieceKind {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_tag())
    }
}

impl<'de> Deserialize<'de> for PieceKind {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        PieceKind::from_tag(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown piece kind: {s:?}")))
    }
}

impl Serialize for Direction {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for Direction {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Direction::from_str(&s)
            .ok_or_else(|| serde::de::Error::custom(format!("unknown direction: {s:?}")))
    }
}

/// One board cell: empty, or occupied by a piece in some [`CellState`].
///
/// Wire encoding: the integer `0` for empty, otherwise `[state_code, kind_tag]`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Cell(pub Option<(CellState, PieceKind)>);

impl Cell {
    pub const EMPTY: Cell = Cell(None);

    pub fn filled(state: CellState, kind: PieceKind) -> Self {
        Cell(Some((state, kind)))
    }

    pub fn is_clearing(&self) -> bool {
        matches!(self.0, Some((CellState::Clearing, _)))
    }
}

impl Serialize for Cell {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        match self.0 {
            None => serializer.serialize_u8(0),
            Some((state, kind)) => {
                let mut seq = serializer.serialize_seq(Some(2))?;
                seq.serialize_element(&state.code())?;
                seq.serialize_element(kind.as_tag())?;
                seq.end()
            }
        }
    }
}

impl<'de> Deserialize<'de> for Cell {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = Cell;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "0 or a [state, kind] pair")
            }

            fn visit_u64<E>(self, v: u64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v == 0 {
                    Ok(Cell::EMPTY)
                } else {
                    Err(E::custom(format!("bare cell value must be 0, got {v}")))
                }
            }

            fn visit_i64<E>(self, v: i64) -> Result<Self::Value, E>
            where
                E: serde::de::Error,
            {
                if v == 0 {
                    Ok(Cell::EMPTY)
                } else {
                    Err(E::custom(format!("bare cell value must be 0, got {v}")))
                }
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let code: u8 = seq
                    .next_element()?
                    .ok_or_else(|| serde::de::Error::custom("cell pair missing state"))?;
                let kind: PieceKind = seq
                    .next_element()?
                    .ok_or_else(|| serde::de::Error::custom("cell pair missing kind"))?;
                let state = CellState::from_code(code)
                    .ok_or_else(|| serde::de::Error::custom(format!("bad cell state: {code}")))?;
                // Tolerate (and drop) trailing elements rather than desyncing the row.
                while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}
                Ok(Cell::filled(state, kind))
            }
        }

        deserializer.deserialize_any(V)
    }
}

/// Row-major board grid as the server sends it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Board(pub Vec<Vec<Cell>>);

impl Board {
    pub fn rows(&self) -> &[Vec<Cell>] {
        &self.0
    }

    pub fn get(&self, x: usize, y: usize) -> Cell {
        self.0
            .get(y)
            .and_then(|row| row.get(x))
            .copied()
            .unwrap_or(Cell::EMPTY)
    }

    /// True if any cell carries the transient clearing signal.
    pub fn has_clearing_cells(&self) -> bool {
        self.0
            .iter()
            .any(|row| row.iter().any(|cell| cell.is_clearing()))
    }
}

impl Default for Board {
    fn default() -> Self {
        Board(vec![vec![Cell::EMPTY; BOARD_WIDTH]; BOARD_HEIGHT])
    }
}

/// Preview of an upcoming piece: its shape matrix plus kind tag.
///
/// Wire encoding: `[[row, row, ...], kind_tag]` with 0/1 shape rows.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PiecePreview {
    pub shape: Vec<Vec<u8>>,
    pub kind: PieceKind,
}

impl Serialize for PiecePreview {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(2))?;
        seq.serialize_element(&self.shape)?;
        seq.serialize_element(self.kind.as_tag())?;
        seq.end()
    }
}

impl<'de> Deserialize<'de> for PiecePreview {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = PiecePreview;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "a [shape, kind] pair")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let shape: Vec<Vec<u8>> = seq
                    .next_element()?
                    .ok_or_else(|| serde::de::Error::custom("preview missing shape"))?;
                let kind: PieceKind = seq
                    .next_element()?
                    .ok_or_else(|| serde::de::Error::custom("preview missing kind"))?;
                while seq.next_element::<serde::de::IgnoredAny>()?.is_some() {}
                Ok(PiecePreview { shape, kind })
            }
        }

        deserializer.deserialize_seq(V)
    }
}

/// Upcoming-piece queue. The server refills it three at a time, so the bound
/// is generous; more than that means a desynced peer.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct NextQueue(pub ArrayVec<PiecePreview, 16>);

impl NextQueue {
    pub fn iter(&self) -> impl Iterator<Item = &PiecePreview> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl Serialize for NextQueue {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeSeq;
        let mut seq = serializer.serialize_seq(Some(self.0.len()))?;
        for preview in &self.0 {
            seq.serialize_element(preview)?;
        }
        seq.end()
    }
}

impl<'de> Deserialize<'de> for NextQueue {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        struct V;
        impl<'de> serde::de::Visitor<'de> for V {
            type Value = NextQueue;

            fn expecting(&self, f: &mut std::fmt::Formatter) -> std::fmt::Result {
                write!(f, "an array of piece previews")
            }

            fn visit_seq<A>(self, mut seq: A) -> Result<Self::Value, A::Error>
            where
                A: serde::de::SeqAccess<'de>,
            {
                let mut out = ArrayVec::<PiecePreview, 16>::new();
                while let Some(p) = seq.next_element::<PiecePreview>()? {
                    out.try_push(p)
                        .map_err(|_| serde::de::Error::custom("too many piece previews"))?;
                }
                Ok(NextQueue(out))
            }
        }

        deserializer.deserialize_seq(V)
    }
}

/// Full game state returned by the server on every request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Snapshot {
    pub board: Board,
    pub score: u32,
    pub level: u32,
    pub lines_cleared: u32,
    #[serde(default)]
    pub lines_to_next_level: u32,
    pub game_over: bool,
    pub is_paused: bool,
    pub next_pieces: NextQueue,
}

impl Snapshot {
    /// True if the server has marked rows for removal but not yet removed them.
    pub fn has_clearing_cells(&self) -> bool {
        self.board.has_clearing_cells()
    }
}

impl Default for Snapshot {
    fn default() -> Self {
        Self {
            board: Board::default(),
            score: 0,
            level: 1,
            lines_cleared: 0,
            lines_to_next_level: 10,
            game_over: false,
            is_paused: false,
            next_pieces: NextQueue::default(),
        }
    }
}

/// One scoreboard row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HighScoreEntry {
    pub name: String,
    pub score: u32,
}

/// Response to `/get_high_scores` and `/submit_score`.
///
/// A rejected submission comes back as `{"is_high_score": false}` with no
/// list at all, hence the defaults.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct HighScoreResponse {
    #[serde(default)]
    pub high_scores: Vec<HighScoreEntry>,
    #[serde(default)]
    pub is_high_score: Option<bool>,
}

/// Whether `score` would enter a scoreboard holding `entries`.
pub fn qualifies_as_high_score(score: u32, entries: &[HighScoreEntry]) -> bool {
    if entries.len() < HIGH_SCORE_CAPACITY {
        return true;
    }
    entries.iter().map(|e| e.score).min().is_some_and(|min| score > min)
}

/// Body of `POST /move`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveRequest {
    pub direction: Direction,
}

/// Body of `POST /submit_score`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScoreSubmission {
    pub name: String,
    pub score: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn snapshot_json() -> String {
        // 20x10 board with one locked row at the bottom and a falling T above it.
        let mut rows: Vec<String> = Vec::new();
        for y in 0..BOARD_HEIGHT {
            let row: Vec<String> = (0..BOARD_WIDTH)
                .map(|x| {
                    if y == BOARD_HEIGHT - 1 {
                        r#"[1, "O"]"#.to_string()
                    } else if y == 2 && (3..=5).contains(&x) {
                        r#"[2, "T"]"#.to_string()
                    } else {
                        "0".to_string()
                    }
                })
                .collect();
            rows.push(format!("[{}]", row.join(", ")));
        }
        format!(
            r#"{{
                "board": [{board}],
                "score": 300,
                "level": 2,
                "lines_cleared": 13,
                "lines_to_next_level": 20,
                "game_over": false,
                "is_paused": false,
                "next_pieces": [[[[1, 1, 1, 1]], "I"], [[[1, 1], [1, 1]], "O"]]
            }}"#,
            board = rows.join(", ")
        )
    }

    #[test]
    fn test_parse_snapshot() {
        let snap: Snapshot = serde_json::from_str(&snapshot_json()).unwrap();
        assert_eq!(snap.score, 300);
        assert_eq!(snap.level, 2);
        assert_eq!(snap.lines_cleared, 13);
        assert!(!snap.game_over);
        assert!(!snap.is_paused);
        assert_eq!(snap.next_pieces.len(), 2);
        assert_eq!(snap.next_pieces.0[0].kind, PieceKind::I);
        assert_eq!(snap.next_pieces.0[0].shape, vec![vec![1, 1, 1, 1]]);
        assert_eq!(
            snap.board.get(3, 2),
            Cell::filled(CellState::Falling, PieceKind::T)
        );
        assert_eq!(
            snap.board.get(0, BOARD_HEIGHT - 1),
            Cell::filled(CellState::Locked, PieceKind::O)
        );
        assert_eq!(snap.board.get(0, 0), Cell::EMPTY);
        assert!(!snap.has_clearing_cells());
    }

    #[test]
    fn test_clearing_cell_detected() {
        let snap: Snapshot = serde_json::from_str(
            &snapshot_json().replace(r#"[1, "O"]"#, r#"[3, "O"]"#),
        )
        .unwrap();
        assert!(snap.has_clearing_cells());
        assert_eq!(
            snap.board.get(0, BOARD_HEIGHT - 1),
            Cell::filled(CellState::Clearing, PieceKind::O)
        );
    }

    #[test]
    fn test_bad_cell_state_is_an_error() {
        let json = r#"[[0, [4, "T"]]]"#;
        assert!(serde_json::from_str::<Board>(json).is_err());
    }

    #[test]
    fn test_bare_nonzero_cell_is_an_error() {
        let json = r#"[[1]]"#;
        assert!(serde_json::from_str::<Board>(json).is_err());
    }

    #[test]
    fn test_unknown_piece_kind_is_an_error() {
        let json = r#"[[[1, "Q"]]]"#;
        assert!(serde_json::from_str::<Board>(json).is_err());
    }

    #[test]
    fn test_cell_serialize_roundtrip() {
        for cell in [
            Cell::EMPTY,
            Cell::filled(CellState::Locked, PieceKind::Z),
            Cell::filled(CellState::Falling, PieceKind::I),
            Cell::filled(CellState::Clearing, PieceKind::S),
        ] {
            let json = serde_json::to_string(&cell).unwrap();
            let back: Cell = serde_json::from_str(&json).unwrap();
            assert_eq!(back, cell);
        }
    }

    #[test]
    fn test_move_request_wire_shape() {
        let body = serde_json::to_string(&MoveRequest {
            direction: Direction::Rotate,
        })
        .unwrap();
        assert_eq!(body, r#"{"direction":"rotate"}"#);
    }

    #[test]
    fn test_rejected_submission_has_no_list() {
        let resp: HighScoreResponse =
            serde_json::from_str(r#"{"is_high_score": false}"#).unwrap();
        assert_eq!(resp.is_high_score, Some(false));
        assert!(resp.high_scores.is_empty());
    }

    #[test]
    fn test_high_score_qualification() {
        let entries: Vec<HighScoreEntry> = (0..HIGH_SCORE_CAPACITY)
            .map(|i| HighScoreEntry {
                name: format!("p{i}"),
                score: (i as u32 + 1) * 100,
            })
            .collect();

        assert!(qualifies_as_high_score(0, &entries[..5]));
        assert!(qualifies_as_high_score(101, &entries));
        assert!(!qualifies_as_high_score(100, &entries));
        assert!(!qualifies_as_high_score(0, &entries));
    }

    #[test]
    fn test_default_board_dimensions() {
        let board = Board::default();
        assert_eq!(board.rows().len(), BOARD_HEIGHT);
        assert!(board.rows().iter().all(|r| r.len() == BOARD_WIDTH));
        assert!(!board.has_clearing_cells());
    }
}
