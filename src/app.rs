//! App: the single cooperative event loop.
//!
//! Everything converges here: keyboard events from a reader thread, completed
//! HTTP requests from spawned tasks, and the two timers the fall loop cares
//! about (the gravity tick and the clear-animation delay). The [`FallLoop`]
//! decides what each event means; this module does the I/O it dictates.

use std::pin::Pin;
use std::time::Duration;

use anyhow::Result;
use crossterm::event::{Event, KeyEvent, KeyEventKind};
use tokio::sync::mpsc;
use tokio::time::{interval_at, sleep, Instant, Interval, MissedTickBehavior, Sleep};

use crate::client::{ClientError, GameClient};
use crate::fall_loop::{FallLoop, GravityOutcome, Phase};
use crate::input::{map_entry_key, map_game_key, EntryKey, GameKey};
use crate::prefs::{self, Preferences};
use crate::protocol::{qualifies_as_high_score, HighScoreEntry, HighScoreResponse, Snapshot};
use crate::term::view::{GameView, Overlay, UiState, Viewport};
use crate::term::TermWriter;
use crate::theme::Theme;
use crate::types::{Direction, START_DELAY_MS};

/// Highest selectable speed multiplier (the web client offered 1-3).
const MAX_SPEED: u32 = 3;
/// Longest accepted high-score name.
const MAX_NAME_LEN: usize = 16;

/// Which request a completed task was for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RequestKind {
    Advance,
    Removal,
    Move(Direction),
    Pause,
    Reset,
    State,
}

/// Result of a spawned request task.
#[derive(Debug)]
enum Completion {
    Snapshot {
        seq: u64,
        kind: RequestKind,
        result: Result<Snapshot, ClientError>,
    },
    Scores {
        submitted: bool,
        result: Result<HighScoreResponse, ClientError>,
    },
}

/// Game-over screen state.
#[derive(Debug, Default)]
struct GameOverUi {
    scores: Vec<HighScoreEntry>,
    qualifies: bool,
    name: String,
    entering: bool,
    submitted: bool,
}

#[derive(Debug)]
enum Screen {
    Menu,
    Playing,
    GameOver(GameOverUi),
}

struct App {
    client: GameClient,
    fall: FallLoop,
    view: GameView,
    theme: Theme,
    prefs: Preferences,
    screen: Screen,
    error: Option<String>,
    quit: bool,
    tick: Option<Interval>,
    clear_delay: Option<Pin<Box<Sleep>>>,
    start_delay: Option<Pin<Box<Sleep>>>,
    resp_tx: mpsc::UnboundedSender<Completion>,
}

/// Run the client until the user quits. Must be called inside a tokio runtime.
pub async fn run(term: &mut TermWriter, client: GameClient, prefs: Preferences) -> Result<()> {
    let (resp_tx, mut resp_rx) = mpsc::unbounded_channel::<Completion>();
    let mut input_rx = spawn_input_thread();

    let mut app = App::new(client, prefs, resp_tx);
    app.fetch_initial_state();
    app.render(term)?;

    while !app.quit {
        tokio::select! {
            event = input_rx.recv() => match event {
                Some(event) => app.on_event(event, term),
                None => break,
            },
            completion = resp_rx.recv() => {
                if let Some(completion) = completion {
                    app.on_completion(completion);
                }
            }
            _ = async { app.tick.as_mut().unwrap().tick().await }, if app.tick.is_some() => {
                app.on_tick();
            }
            _ = async { app.clear_delay.as_mut().unwrap().await }, if app.clear_delay.is_some() => {
                app.on_clear_delay();
            }
            _ = async { app.start_delay.as_mut().unwrap().await }, if app.start_delay.is_some() => {
                app.on_start_delay();
            }
        }
        app.render(term)?;
    }

    Ok(())
}

impl App {
    fn new(client: GameClient, prefs: Preferences, resp_tx: mpsc::UnboundedSender<Completion>) -> Self {
        let theme = Theme::named(prefs.theme_name());
        let fall = FallLoop::new(prefs.speed);
        Self {
            client,
            fall,
            view: GameView::default(),
            theme,
            prefs,
            screen: Screen::Menu,
            error: None,
            quit: false,
            tick: None,
            clear_delay: None,
            start_delay: None,
            resp_tx,
        }
    }

    // ----- timers -----

    fn arm_tick(&mut self, period: Duration) {
        let mut timer = interval_at(Instant::now() + period, period);
        timer.set_missed_tick_behavior(MissedTickBehavior::Delay);
        self.tick = Some(timer);
    }

    fn disarm_timers(&mut self) {
        self.tick = None;
        self.clear_delay = None;
        self.start_delay = None;
    }

    // ----- requests -----

    fn spawn_snapshot_request(&self, kind: RequestKind, seq: u64) {
        let client = self.client.clone();
        let tx = self.resp_tx.clone();
        tokio::spawn(async move {
            let result = match kind {
                RequestKind::Advance => client.move_down().await,
                RequestKind::Removal => client.remove_lines().await,
                RequestKind::Move(direction) => client.move_piece(direction).await,
                RequestKind::Pause => client.toggle_pause().await,
                RequestKind::Reset => client.reset().await,
                RequestKind::State => client.state().await,
            };
            let _ = tx.send(Completion::Snapshot { seq, kind, result });
        });
    }

    fn spawn_scores_fetch(&self) {
        let client = self.client.clone();
        let tx = self.resp_tx.clone();
        tokio::spawn(async move {
            let result = client.high_scores().await;
            let _ = tx.send(Completion::Scores {
                submitted: false,
                result,
            });
        });
    }

    fn spawn_score_submission(&self, name: String, score: u32) {
        let client = self.client.clone();
        let tx = self.resp_tx.clone();
        tokio::spawn(async move {
            let result = client.submit_score(&name, score).await;
            let _ = tx.send(Completion::Scores {
                submitted: true,
                result,
            });
        });
    }

    fn fetch_initial_state(&mut self) {
        let seq = self.fall.issue_side_request();
        self.spawn_snapshot_request(RequestKind::State, seq);
    }

    // ----- timer events -----

    fn on_tick(&mut self) {
        if let Some(seq) = self.fall.tick() {
            self.spawn_snapshot_request(RequestKind::Advance, seq);
        }
    }

    fn on_clear_delay(&mut self) {
        self.clear_delay = None;
        if let Some(seq) = self.fall.clear_delay_elapsed() {
            self.spawn_snapshot_request(RequestKind::Removal, seq);
        }
    }

    fn on_start_delay(&mut self) {
        self.start_delay = None;
        let period = self.fall.start();
        self.arm_tick(period);
    }

    // ----- request completions -----

    fn on_completion(&mut self, completion: Completion) {
        match completion {
            Completion::Snapshot { seq, kind, result } => match result {
                Ok(snapshot) => self.on_snapshot(seq, kind, snapshot),
                Err(err) => self.on_request_error(seq, kind, err),
            },
            Completion::Scores { submitted, result } => self.on_scores(submitted, result),
        }
    }

    fn on_snapshot(&mut self, seq: u64, kind: RequestKind, snapshot: Snapshot) {
        match kind {
            RequestKind::Advance | RequestKind::Removal => {
                match self.fall.apply_gravity(seq, snapshot) {
                    GravityOutcome::Continue => self.error = None,
                    GravityOutcome::ClearAnimation(delay) => {
                        self.error = None;
                        self.tick = None;
                        self.clear_delay = Some(Box::pin(sleep(delay)));
                    }
                    GravityOutcome::Rearm(period) => {
                        self.error = None;
                        self.arm_tick(period);
                    }
                    GravityOutcome::GameOver => {
                        self.error = None;
                        self.disarm_timers();
                        self.enter_game_over();
                    }
                    GravityOutcome::Stale => {}
                }
            }
            RequestKind::Move(_) | RequestKind::Pause | RequestKind::Reset | RequestKind::State => {
                if !self.fall.apply_side_response(seq, snapshot) {
                    return;
                }
                self.error = None;
                if kind == RequestKind::Reset && matches!(self.screen, Screen::Playing) {
                    // Fresh board is on screen; give it a beat before gravity.
                    self.start_delay = Some(Box::pin(sleep(Duration::from_millis(START_DELAY_MS))));
                }
                if self.fall.snapshot().game_over && matches!(self.screen, Screen::Playing) {
                    self.disarm_timers();
                    self.enter_game_over();
                }
            }
        }
    }

    fn on_request_error(&mut self, seq: u64, kind: RequestKind, err: ClientError) {
        match kind {
            RequestKind::Advance | RequestKind::Removal => {
                if err.is_transport() {
                    if self.fall.gravity_failed(seq) {
                        self.tick = None;
                        self.clear_delay = None;
                        self.error = Some(err.to_string());
                    }
                } else {
                    self.fall.stop();
                    self.disarm_timers();
                    self.error = Some(err.to_string());
                }
            }
            RequestKind::Move(_) | RequestKind::Pause => {
                // Transient; the loop keeps running and the banner clears on
                // the next successful response.
                self.error = Some(err.to_string());
            }
            RequestKind::Reset | RequestKind::State => {
                self.error = Some(err.to_string());
                if !err.is_transport() {
                    self.fall.stop();
                    self.disarm_timers();
                }
            }
        }
    }

    fn on_scores(&mut self, submitted: bool, result: Result<HighScoreResponse, ClientError>) {
        let score = self.fall.snapshot().score;
        let Screen::GameOver(ui) = &mut self.screen else {
            return;
        };
        match result {
            Ok(resp) => {
                if !resp.high_scores.is_empty() || !submitted {
                    ui.scores = resp.high_scores;
                }
                if submitted {
                    ui.submitted = true;
                    ui.entering = false;
                } else {
                    ui.qualifies = qualifies_as_high_score(score, &ui.scores);
                    ui.entering = ui.qualifies;
                }
            }
            Err(err) => {
                self.error = Some(err.to_string());
            }
        }
    }

    // ----- input -----

    fn on_event(&mut self, event: Event, term: &mut TermWriter) {
        match event {
            Event::Resize(_, _) => term.invalidate(),
            Event::Key(key) => match key.kind {
                KeyEventKind::Press | KeyEventKind::Repeat => self.on_key(key),
                KeyEventKind::Release => {}
            },
            _ => {}
        }
    }

    fn on_key(&mut self, key: KeyEvent) {
        match &mut self.screen {
            Screen::Menu => {
                if let Some(game_key) = map_game_key(key) {
                    self.on_menu_key(game_key);
                }
            }
            Screen::Playing => {
                if let Some(game_key) = map_game_key(key) {
                    self.on_play_key(game_key);
                }
            }
            Screen::GameOver(ui) if ui.entering => {
                match map_entry_key(key) {
                    Some(EntryKey::Char(c)) => {
                        if ui.name.chars().count() < MAX_NAME_LEN {
                            ui.name.push(c);
                        }
                    }
                    Some(EntryKey::Backspace) => {
                        ui.name.pop();
                    }
                    Some(EntryKey::Submit) => {
                        let name = submission_name(&ui.name);
                        ui.entering = false;
                        let score = self.fall.snapshot().score;
                        self.spawn_score_submission(name, score);
                    }
                    Some(EntryKey::Skip) => ui.entering = false,
                    None => {}
                }
            }
            Screen::GameOver(_) => {
                match map_game_key(key) {
                    Some(GameKey::NewGame) | Some(GameKey::Confirm) => self.start_new_game(),
                    Some(GameKey::Quit) => self.quit = true,
                    _ => {}
                }
            }
        }
    }

    fn on_menu_key(&mut self, key: GameKey) {
        match key {
            GameKey::CycleTheme => {
                let next = self.theme.name.next();
                self.theme = Theme::named(next);
                self.prefs.set_theme(next);
                self.persist_prefs();
            }
            GameKey::CycleSpeed => {
                self.prefs.speed = cycle_speed(self.prefs.speed);
                self.fall.set_speed(self.prefs.speed);
                self.persist_prefs();
            }
            GameKey::Confirm | GameKey::NewGame => self.start_new_game(),
            GameKey::Quit => self.quit = true,
            _ => {}
        }
    }

    fn on_play_key(&mut self, key: GameKey) {
        let paused = self.fall.snapshot().is_paused;
        let game_over = self.fall.snapshot().game_over;
        match key {
            GameKey::Move(direction) => {
                if !paused && !game_over {
                    let seq = self.fall.issue_side_request();
                    self.spawn_snapshot_request(RequestKind::Move(direction), seq);
                }
            }
            GameKey::TogglePause => {
                if !game_over {
                    let seq = self.fall.issue_side_request();
                    self.spawn_snapshot_request(RequestKind::Pause, seq);
                }
            }
            GameKey::EndGame => {
                // Local end, like the web client's End button: no server call.
                self.fall.stop();
                self.disarm_timers();
                self.enter_game_over();
            }
            GameKey::NewGame => self.start_new_game(),
            GameKey::Retry => {
                if self.fall.phase() == Phase::Idle {
                    self.error = None;
                    let period = self.fall.start();
                    self.arm_tick(period);
                }
            }
            GameKey::Quit => self.quit = true,
            GameKey::CycleTheme | GameKey::CycleSpeed | GameKey::Confirm => {}
        }
    }

    // ----- screen transitions -----

    fn start_new_game(&mut self) {
        self.error = None;
        self.disarm_timers();
        self.fall.stop();
        self.fall.set_speed(self.prefs.speed);
        self.screen = Screen::Playing;
        let seq = self.fall.issue_side_request();
        self.spawn_snapshot_request(RequestKind::Reset, seq);
    }

    fn enter_game_over(&mut self) {
        self.screen = Screen::GameOver(GameOverUi::default());
        self.spawn_scores_fetch();
    }

    fn persist_prefs(&mut self) {
        if let Err(err) = prefs::save(&self.prefs) {
            eprintln!("[prefs] save failed: {err}");
        }
    }

    // ----- rendering -----

    fn render(&mut self, term: &mut TermWriter) -> Result<()> {
        let (width, height) = crossterm::terminal::size().unwrap_or((80, 24));
        let ui = self.ui_state();
        let frame = self
            .view
            .render(self.fall.snapshot(), &ui, &self.theme, Viewport::new(width, height));
        term.draw(&frame)
    }

    fn ui_state(&self) -> UiState<'_> {
        let overlay = match &self.screen {
            Screen::Menu => Overlay::Menu {
                theme: self.theme.name,
                speed: self.prefs.speed,
            },
            Screen::Playing => Overlay::None,
            Screen::GameOver(ui) => Overlay::GameOver {
                scores: &ui.scores,
                qualifies: ui.qualifies,
                name: &ui.name,
                entering: ui.entering,
                submitted: ui.submitted,
            },
        };
        UiState {
            overlay,
            error: self.error.as_deref(),
            held: self.error.is_some()
                && self.fall.phase() == Phase::Idle
                && matches!(self.screen, Screen::Playing),
        }
    }
}

/// Keyboard reader thread; crossterm's poll/read cannot be awaited directly.
fn spawn_input_thread() -> mpsc::UnboundedReceiver<Event> {
    let (tx, rx) = mpsc::unbounded_channel::<Event>();
    std::thread::spawn(move || loop {
        match crossterm::event::poll(Duration::from_millis(100)) {
            Ok(true) => match crossterm::event::read() {
                Ok(event) => {
                    if tx.send(event).is_err() {
                        break;
                    }
                }
                Err(_) => break,
            },
            Ok(false) => {
                if tx.is_closed() {
                    break;
                }
            }
            Err(_) => break,
        }
    });
    rx
}

fn cycle_speed(speed: u32) -> u32 {
    if speed >= MAX_SPEED {
        1
    } else {
        speed + 1
    }
}

fn submission_name(raw: &str) -> String {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        "Anonymous".to_string()
    } else {
        trimmed.to_string()
    }
}
