//! Color themes, matching the six palettes the web client shipped with.

use crate::term::frame::Rgb;
use crate::types::PieceKind;

/// Named theme, persisted by name in the preferences file.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ThemeName {
    #[default]
    Classic,
    Neon,
    Ocean,
    Forest,
    Sunset,
    Midnight,
}

impl ThemeName {
    pub const ALL: [ThemeName; 6] = [
        ThemeName::Classic,
        ThemeName::Neon,
        ThemeName::Ocean,
        ThemeName::Forest,
        ThemeName::Sunset,
        ThemeName::Midnight,
    ];

    pub fn from_str(s: &str) -> Option<Self> {
        match s.to_ascii_lowercase().as_str() {
            "classic" => Some(ThemeName::Classic),
            "neon" => Some(ThemeName::Neon),
            "ocean" => Some(ThemeName::Ocean),
            "forest" => Some(ThemeName::Forest),
            "sunset" => Some(ThemeName::Sunset),
            "midnight" => Some(ThemeName::Midnight),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            ThemeName::Classic => "classic",
            ThemeName::Neon => "neon",
            ThemeName::Ocean => "ocean",
            ThemeName::Forest => "forest",
            ThemeName::Sunset => "sunset",
            ThemeName::Midnight => "midnight",
        }
    }

    /// Next theme in display order, wrapping.
    pub fn next(&self) -> Self {
        let idx = Self::ALL.iter().position(|t| t == self).unwrap_or(0);
        Self::ALL[(idx + 1) % Self::ALL.len()]
    }
}

/// Resolved palette for the renderer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub name: ThemeName,
    /// Play-area background.
    pub surface: Rgb,
    /// Board frame and separators.
    pub border: Rgb,
    /// Primary text.
    pub text: Rgb,
    /// Labels and titles.
    pub accent: Rgb,
    /// Secondary text (hints, empty-cell dots).
    pub muted: Rgb,
    /// Line-clear flash.
    pub flash: Rgb,
    /// Piece colors indexed I, O, T, L, J, S, Z.
    pieces: [Rgb; 7],
}

impl Theme {
    pub fn named(name: ThemeName) -> Self {
        match name {
            ThemeName::Classic => Self {
                name,
                surface: Rgb::new(30, 30, 40),
                border: Rgb::new(200, 200, 200),
                text: Rgb::new(220, 220, 220),
                accent: Rgb::new(240, 220, 80),
                muted: Rgb::new(110, 110, 120),
                flash: Rgb::new(255, 255, 255),
                pieces: [
                    Rgb::new(80, 220, 220),
                    Rgb::new(240, 220, 80),
                    Rgb::new(200, 120, 220),
                    Rgb::new(255, 165, 0),
                    Rgb::new(80, 120, 220),
                    Rgb::new(100, 220, 120),
                    Rgb::new(220, 80, 80),
                ],
            },
            ThemeName::Neon => Self {
                name,
                surface: Rgb::new(12, 10, 24),
                border: Rgb::new(255, 0, 204),
                text: Rgb::new(230, 230, 255),
                accent: Rgb::new(0, 255, 204),
                muted: Rgb::new(90, 80, 130),
                flash: Rgb::new(255, 255, 0),
                pieces: [
                    Rgb::new(0, 255, 255),
                    Rgb::new(255, 255, 0),
                    Rgb::new(255, 0, 255),
                    Rgb::new(255, 128, 0),
                    Rgb::new(64, 64, 255),
                    Rgb::new(0, 255, 64),
                    Rgb::new(255, 0, 64),
                ],
            },
            ThemeName::Ocean => Self {
                name,
                surface: Rgb::new(10, 30, 48),
                border: Rgb::new(120, 180, 210),
                text: Rgb::new(205, 225, 235),
                accent: Rgb::new(90, 200, 250),
                muted: Rgb::new(70, 110, 135),
                flash: Rgb::new(220, 250, 255),
                pieces: [
                    Rgb::new(72, 202, 228),
                    Rgb::new(255, 214, 10),
                    Rgb::new(130, 110, 240),
                    Rgb::new(255, 150, 80),
                    Rgb::new(0, 119, 182),
                    Rgb::new(64, 190, 160),
                    Rgb::new(230, 90, 90),
                ],
            },
            ThemeName::Forest => Self {
                name,
                surface: Rgb::new(22, 34, 24),
                border: Rgb::new(150, 180, 140),
                text: Rgb::new(215, 225, 205),
                accent: Rgb::new(170, 215, 110),
                muted: Rgb::new(95, 115, 90),
                flash: Rgb::new(245, 255, 230),
                pieces: [
                    Rgb::new(110, 200, 180),
                    Rgb::new(225, 200, 90),
                    Rgb::new(170, 130, 200),
                    Rgb::new(210, 140, 70),
                    Rgb::new(90, 140, 200),
                    Rgb::new(120, 200, 95),
                    Rgb::new(200, 95, 80),
                ],
            },
            ThemeName::Sunset => Self {
                name,
                surface: Rgb::new(40, 22, 34),
                border: Rgb::new(235, 160, 120),
                text: Rgb::new(240, 220, 210),
                accent: Rgb::new(255, 170, 90),
                muted: Rgb::new(130, 95, 105),
                flash: Rgb::new(255, 235, 200),
                pieces: [
                    Rgb::new(255, 140, 105),
                    Rgb::new(255, 200, 87),
                    Rgb::new(200, 110, 190),
                    Rgb::new(250, 120, 60),
                    Rgb::new(140, 110, 220),
                    Rgb::new(250, 180, 120),
                    Rgb::new(220, 70, 95),
                ],
            },
            ThemeName::Midnight => Self {
                name,
                surface: Rgb::new(10, 12, 22),
                border: Rgb::new(90, 100, 140),
                text: Rgb::new(180, 190, 215),
                accent: Rgb::new(130, 150, 255),
                muted: Rgb::new(65, 72, 100),
                flash: Rgb::new(210, 220, 255),
                pieces: [
                    Rgb::new(95, 180, 200),
                    Rgb::new(200, 185, 110),
                    Rgb::new(150, 120, 200),
                    Rgb::new(190, 130, 85),
                    Rgb::new(95, 115, 200),
                    Rgb::new(110, 170, 120),
                    Rgb::new(185, 95, 110),
                ],
            },
        }
    }

    pub fn piece(&self, kind: PieceKind) -> Rgb {
        let idx = match kind {
            PieceKind::I => 0,
            PieceKind::O => 1,
            PieceKind::T => 2,
            PieceKind::L => 3,
            PieceKind::J => 4,
            PieceKind::S => 5,
            PieceKind::Z => 6,
        };
        self.pieces[idx]
    }
}

impl Default for Theme {
    fn default() -> Self {
        Self::named(ThemeName::Classic)
    }
}
