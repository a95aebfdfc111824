//! GameView: maps a server [`Snapshot`] plus UI state into a [`Frame`].
//!
//! Pure, no I/O. Rendering the same inputs twice yields identical frames,
//! which the render tests rely on.

use crate::protocol::{HighScoreEntry, PiecePreview, Snapshot};
use crate::term::frame::{Frame, Style};
use crate::theme::{Theme, ThemeName};
use crate::types::{CellState, BOARD_HEIGHT, BOARD_WIDTH, PREVIEW_COUNT};

/// Terminal viewport dimensions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Viewport {
    pub width: u16,
    pub height: u16,
}

impl Viewport {
    pub fn new(width: u16, height: u16) -> Self {
        Self { width, height }
    }
}

/// Modal content drawn over the board.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Overlay<'a> {
    None,
    /// The new-game menu: theme/speed selection before starting.
    Menu { theme: ThemeName, speed: u32 },
    /// Game-over panel with the scoreboard and optional name entry.
    GameOver {
        scores: &'a [HighScoreEntry],
        qualifies: bool,
        name: &'a str,
        entering: bool,
        submitted: bool,
    },
}

/// Per-frame UI state owned by the app, not the server.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct UiState<'a> {
    pub overlay: Overlay<'a>,
    /// Surfaced failure, rendered as a banner.
    pub error: Option<&'a str>,
    /// The fall loop is held in idle waiting for a retry.
    pub held: bool,
}

impl Default for UiState<'_> {
    fn default() -> Self {
        Self {
            overlay: Overlay::None,
            error: None,
            held: false,
        }
    }
}

/// Renders gameplay frames.
pub struct GameView {
    /// Board cell width in terminal columns (2 compensates glyph aspect).
    cell_w: u16,
}

impl Default for GameView {
    fn default() -> Self {
        Self { cell_w: 2 }
    }
}

impl GameView {
    pub fn render(
        &self,
        snapshot: &Snapshot,
        ui: &UiState,
        theme: &Theme,
        viewport: Viewport,
    ) -> Frame {
        let mut frame = Frame::new(viewport.width, viewport.height);

        let board_px_w = (BOARD_WIDTH as u16) * self.cell_w;
        let board_px_h = BOARD_HEIGHT as u16;
        let frame_w = board_px_w + 2;
        let frame_h = board_px_h + 2;

        // Board on the left third, panel beside it.
        let start_x = viewport.width.saturating_sub(frame_w + 18) / 2;
        let start_y = viewport.height.saturating_sub(frame_h) / 2;

        self.draw_border(&mut frame, theme, start_x, start_y, frame_w, frame_h);
        self.draw_cells(&mut frame, snapshot, theme, start_x + 1, start_y + 1);
        self.draw_panel(
            &mut frame,
            snapshot,
            theme,
            start_x + frame_w + 2,
            start_y,
            viewport,
        );

        if snapshot.is_paused && matches!(ui.overlay, Overlay::None) {
            self.draw_center_text(&mut frame, theme, start_x, start_y, frame_w, frame_h, "PAUSED");
        }

        match ui.overlay {
            Overlay::None => {
                if snapshot.game_over {
                    self.draw_center_text(
                        &mut frame, theme, start_x, start_y, frame_w, frame_h, "GAME OVER",
                    );
                }
            }
            Overlay::Menu { theme: name, speed } => {
                self.draw_menu(&mut frame, theme, viewport, name, speed);
            }
            Overlay::GameOver {
                scores,
                qualifies,
                name,
                entering,
                submitted,
            } => {
                self.draw_game_over(
                    &mut frame, snapshot, theme, viewport, scores, qualifies, name, entering,
                    submitted,
                );
            }
        }

        if let Some(message) = ui.error {
            self.draw_error(&mut frame, theme, viewport, message, ui.held);
        }

        frame
    }

    fn draw_border(
        &self,
        frame: &mut Frame,
        theme: &Theme,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
    ) {
        let style = Style::new(theme.border, theme.surface);
        frame.put(x, y, '┌', style);
        frame.put(x + w - 1, y, '┐', style);
        frame.put(x, y + h - 1, '└', style);
        frame.put(x + w - 1, y + h - 1, '┘', style);
        for dx in 1..w - 1 {
            frame.put(x + dx, y, '─', style);
            frame.put(x + dx, y + h - 1, '─', style);
        }
        for dy in 1..h - 1 {
            frame.put(x, y + dy, '│', style);
            frame.put(x + w - 1, y + dy, '│', style);
        }
    }

    fn draw_cells(&self, frame: &mut Frame, snapshot: &Snapshot, theme: &Theme, x0: u16, y0: u16) {
        for y in 0..BOARD_HEIGHT {
            for x in 0..BOARD_WIDTH {
                let px = x0 + (x as u16) * self.cell_w;
                let py = y0 + y as u16;
                match snapshot.board.get(x, y).0 {
                    None => {
                        let style = Style::new(theme.muted, theme.surface);
                        frame.put(px, py, '·', style);
                        for dx in 1..self.cell_w {
                            frame.put(px + dx, py, ' ', style);
                        }
                    }
                    Some((state, kind)) => {
                        let (ch, style) = match state {
                            CellState::Locked => {
                                ('█', Style::new(theme.piece(kind), theme.surface))
                            }
                            CellState::Falling => {
                                ('█', Style::new(theme.piece(kind), theme.surface).bold())
                            }
                            CellState::Clearing => {
                                ('▓', Style::new(theme.flash, theme.surface).bold().reversed())
                            }
                        };
                        for dx in 0..self.cell_w {
                            frame.put(px + dx, py, ch, style);
                        }
                    }
                }
            }
        }
    }

    fn draw_panel(
        &self,
        frame: &mut Frame,
        snapshot: &Snapshot,
        theme: &Theme,
        panel_x: u16,
        start_y: u16,
        viewport: Viewport,
    ) {
        if panel_x >= viewport.width {
            return;
        }
        let label = Style::new(theme.accent, Style::default().bg).bold();
        let value = Style::new(theme.text, Style::default().bg);
        let hint = Style::new(theme.muted, Style::default().bg);

        let mut y = start_y;
        frame.put_str(panel_x, y, "SCORE", label);
        frame.put_str(panel_x, y + 1, &snapshot.score.to_string(), value);
        y += 3;

        frame.put_str(panel_x, y, "LEVEL", label);
        frame.put_str(panel_x, y + 1, &snapshot.level.to_string(), value);
        y += 3;

        frame.put_str(panel_x, y, "LINES", label);
        frame.put_str(
            panel_x,
            y + 1,
            &format!("{} ({}/10)", snapshot.lines_cleared, snapshot.lines_cleared % 10),
            value,
        );
        y += 3;

        frame.put_str(panel_x, y, "NEXT", label);
        y += 1;
        for preview in snapshot.next_pieces.iter().take(PREVIEW_COUNT) {
            y = self.draw_preview(frame, theme, preview, panel_x, y) + 1;
            if y >= viewport.height {
                return;
            }
        }

        let hints_y = start_y + (BOARD_HEIGHT as u16).saturating_sub(3);
        if hints_y > y {
            frame.put_str(panel_x, hints_y, "←→↓ move  ↑ rotate", hint);
            frame.put_str(panel_x, hints_y + 1, "p pause  e end", hint);
            frame.put_str(panel_x, hints_y + 2, "n new game  q quit", hint);
        }
    }

    /// Draw one preview shape, returning the row after it.
    fn draw_preview(
        &self,
        frame: &mut Frame,
        theme: &Theme,
        preview: &PiecePreview,
        x0: u16,
        y0: u16,
    ) -> u16 {
        let style = Style::new(theme.piece(preview.kind), Style::default().bg);
        let mut y = y0;
        for row in &preview.shape {
            for (x, cell) in row.iter().enumerate() {
                let px = x0 + (x as u16) * self.cell_w;
                if *cell != 0 {
                    for dx in 0..self.cell_w {
                        frame.put(px + dx, y, '█', style);
                    }
                }
            }
            y += 1;
        }
        y
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_center_text(
        &self,
        frame: &mut Frame,
        theme: &Theme,
        x: u16,
        y: u16,
        w: u16,
        h: u16,
        text: &str,
    ) {
        let text_w = text.chars().count() as u16;
        let cx = x + w.saturating_sub(text_w) / 2;
        let cy = y + h / 2;
        frame.put_str(cx, cy, text, Style::new(theme.flash, theme.surface).bold());
    }

    fn draw_menu(
        &self,
        frame: &mut Frame,
        theme: &Theme,
        viewport: Viewport,
        selected: ThemeName,
        speed: u32,
    ) {
        let lines = [
            "BLOCKFALL".to_string(),
            String::new(),
            format!("theme  < {} >   (t)", selected.as_str()),
            format!("speed  < {}x >      (s)", speed),
            String::new(),
            "enter  start game".to_string(),
            "q      quit".to_string(),
        ];
        self.draw_dialog(frame, theme, viewport, &lines);
    }

    #[allow(clippy::too_many_arguments)]
    fn draw_game_over(
        &self,
        frame: &mut Frame,
        snapshot: &Snapshot,
        theme: &Theme,
        viewport: Viewport,
        scores: &[HighScoreEntry],
        qualifies: bool,
        name: &str,
        entering: bool,
        submitted: bool,
    ) {
        let mut lines = vec![
            "GAME OVER".to_string(),
            String::new(),
            format!("final score  {}", snapshot.score),
            String::new(),
        ];

        if entering {
            lines.push("new high score! enter your name:".to_string());
            lines.push(format!("> {name}_"));
            lines.push(String::new());
            lines.push("enter submit   esc skip".to_string());
        } else {
            lines.push("HIGH SCORES".to_string());
            if scores.is_empty() {
                lines.push("  (none yet)".to_string());
            }
            for (i, entry) in scores.iter().enumerate() {
                lines.push(format!("{:>2}. {:<12} {}", i + 1, entry.name, entry.score));
            }
            lines.push(String::new());
            if submitted {
                lines.push("score submitted".to_string());
            } else if qualifies {
                lines.push("you made the board!".to_string());
            }
            lines.push("n new game   q quit".to_string());
        }

        self.draw_dialog(frame, theme, viewport, &lines);
    }

    fn draw_dialog(&self, frame: &mut Frame, theme: &Theme, viewport: Viewport, lines: &[String]) {
        let inner_w = lines.iter().map(|l| l.chars().count()).max().unwrap_or(0) as u16;
        let w = inner_w + 4;
        let h = lines.len() as u16 + 2;
        let x = viewport.width.saturating_sub(w) / 2;
        let y = viewport.height.saturating_sub(h) / 2;

        let body = Style::new(theme.text, theme.surface);
        frame.fill(x, y, w, h, ' ', body);
        self.draw_border(frame, theme, x, y, w, h);

        for (i, line) in lines.iter().enumerate() {
            let style = if i == 0 {
                Style::new(theme.accent, theme.surface).bold()
            } else {
                body
            };
            frame.put_str(x + 2, y + 1 + i as u16, line, style);
        }
    }

    fn draw_error(
        &self,
        frame: &mut Frame,
        theme: &Theme,
        viewport: Viewport,
        message: &str,
        held: bool,
    ) {
        let y = viewport.height.saturating_sub(1);
        let style = Style::new(theme.flash, theme.surface).bold().reversed();
        let text = if held {
            format!(" {message} — press r to retry ")
        } else {
            format!(" {message} ")
        };
        frame.put_str(0, y, &text, style);
    }
}
