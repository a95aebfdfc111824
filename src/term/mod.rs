//! Terminal rendering layer.
//!
//! The view renders into a plain glyph [`frame::Frame`]; [`writer::TermWriter`]
//! diffs frames and flushes changed rows through crossterm. Keeping the frame
//! pure makes the view unit-testable without a terminal.

pub mod frame;
pub mod view;
pub mod writer;

pub use frame::{Frame, Glyph, Rgb, Style};
pub use view::GameView;
pub use writer::TermWriter;
