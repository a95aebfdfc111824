//! Key bindings.
//!
//! Two maps: one for gameplay/menu screens, one for high-score name entry
//! (where most printable keys become text instead of commands).

use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

use crate::types::Direction;

/// Command from a key press on the game/menu screens.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameKey {
    Move(Direction),
    TogglePause,
    NewGame,
    EndGame,
    Retry,
    CycleTheme,
    CycleSpeed,
    Confirm,
    Quit,
}

pub fn map_game_key(key: KeyEvent) -> Option<GameKey> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        return Some(GameKey::Quit);
    }
    if !key.modifiers.is_empty() && key.modifiers != KeyModifiers::SHIFT {
        return None;
    }
    match key.code {
        KeyCode::Left => Some(GameKey::Move(Direction::Left)),
        KeyCode::Right => Some(GameKey::Move(Direction::Right)),
        KeyCode::Down => Some(GameKey::Move(Direction::Down)),
        KeyCode::Up => Some(GameKey::Move(Direction::Rotate)),
        KeyCode::Char('p') | KeyCode::Char('P') => Some(GameKey::TogglePause),
        KeyCode::Char('n') | KeyCode::Char('N') => Some(GameKey::NewGame),
        KeyCode::Char('e') | KeyCode::Char('E') => Some(GameKey::EndGame),
        KeyCode::Char('r') | KeyCode::Char('R') => Some(GameKey::Retry),
        KeyCode::Char('t') | KeyCode::Char('T') => Some(GameKey::CycleTheme),
        KeyCode::Char('s') | KeyCode::Char('S') => Some(GameKey::CycleSpeed),
        KeyCode::Enter => Some(GameKey::Confirm),
        KeyCode::Char('q') | KeyCode::Esc => Some(GameKey::Quit),
        _ => None,
    }
}

/// Command from a key press while entering a high-score name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntryKey {
    Char(char),
    Backspace,
    Submit,
    Skip,
}

pub fn map_entry_key(key: KeyEvent) -> Option<EntryKey> {
    if key.modifiers == KeyModifiers::CONTROL && key.code == KeyCode::Char('c') {
        return Some(EntryKey::Skip);
    }
    match key.code {
        KeyCode::Enter => Some(EntryKey::Submit),
        KeyCode::Esc => Some(EntryKey::Skip),
        KeyCode::Backspace => Some(EntryKey::Backspace),
        KeyCode::Char(c) if !c.is_control() => Some(EntryKey::Char(c)),
        _ => None,
    }
}
