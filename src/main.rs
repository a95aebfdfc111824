//! Terminal client entrypoint.
//!
//! Connects to a game server (see `--server`), restores persisted theme/speed
//! preferences, and runs the event loop until the user quits.

use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;

use blockfall_tui::client::{ClientConfig, GameClient};
use blockfall_tui::prefs;
use blockfall_tui::term::TermWriter;
use blockfall_tui::app;
use blockfall_tui::theme::ThemeName;

/// Terminal client for a server-hosted falling-block puzzle game.
#[derive(Debug, Parser)]
#[command(
    name = "blockfall-tui",
    version,
    about = "Terminal client for a server-hosted falling-block puzzle game.",
    long_about = "Plays against a game server that owns all rules; the client renders \
        snapshots, forwards input, and paces gravity.\n\n\
        CONTROLS:\n  Left/Right/Down  Move    Up  Rotate\n  P  Pause    N  New game    E  End game\n  \
        R  Retry after a connection error    Q / Esc  Quit"
)]
struct Args {
    /// Game server base URL. Overrides BLOCKFALL_SERVER.
    #[arg(long, value_name = "URL")]
    server: Option<String>,

    /// Request timeout in milliseconds. Overrides BLOCKFALL_TIMEOUT_MS.
    #[arg(long, value_name = "MS")]
    timeout_ms: Option<u64>,

    /// Append a JSON line per request/response to this file. Overrides BLOCKFALL_WIRE_LOG.
    #[arg(long, value_name = "FILE")]
    wire_log: Option<PathBuf>,

    /// Theme for this session (classic, neon, ocean, forest, sunset, midnight).
    /// Defaults to the persisted preference.
    #[arg(long, value_name = "NAME")]
    theme: Option<String>,

    /// Speed multiplier for this session (1-3). Defaults to the persisted preference.
    #[arg(long, value_name = "N")]
    speed: Option<u32>,
}

fn main() -> Result<()> {
    let args = Args::parse();

    let mut config = ClientConfig::from_env();
    if let Some(server) = args.server {
        config.base_url = server;
    }
    if let Some(ms) = args.timeout_ms {
        config.timeout = std::time::Duration::from_millis(ms);
    }
    if let Some(path) = args.wire_log {
        config.wire_log = Some(path);
    }

    let mut preferences = prefs::load();
    if let Some(name) = args.theme.as_deref() {
        match ThemeName::from_str(name) {
            Some(theme_name) => preferences.set_theme(theme_name),
            None => anyhow::bail!(
                "unknown theme {name:?}; expected one of {}",
                ThemeName::ALL
                    .iter()
                    .map(|t| t.as_str())
                    .collect::<Vec<_>>()
                    .join(", ")
            ),
        }
    }
    if let Some(speed) = args.speed {
        preferences.speed = speed.clamp(1, 3);
    }

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()?;

    let mut term = TermWriter::new();
    term.enter()?;

    let result = runtime.block_on(async {
        let client = GameClient::new(&config)?;
        app::run(&mut term, client, preferences).await
    });

    // Always try to restore terminal state.
    let _ = term.exit();
    result
}
