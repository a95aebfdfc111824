//! Fall loop controller: the state machine that drives gravity.
//!
//! The server owns the rules; this controller only decides *when* to ask it to
//! advance. It owns the cached [`Snapshot`], the paused/running phase, and the
//! request bookkeeping that keeps the gravity chain serialized:
//!
//! - at most one gravity request (advance or removal) is ever outstanding;
//! - every request carries a monotonic sequence token, and a response is only
//!   applied if its token is still live — a response that straggles in after
//!   `stop()` or a new game must not touch the cached state.
//!
//! No I/O happens here. The driver arms timers and issues HTTP requests based
//! on the values returned from these methods, which keeps every transition
//! unit-testable.

use std::time::Duration;

use crate::protocol::Snapshot;
use crate::types::{BASE_FALL_MS, FALL_BIAS, LEVEL_STEP_MS, LINE_CLEAR_ANIM_MS, MIN_FALL_MS};

/// Controller phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// No timer armed: before the first game, after `stop()`, or after a
    /// surfaced transport failure.
    Idle,
    /// Timer armed; ticks may issue advance requests.
    Running,
    /// Timer disarmed while the line-clear flash plays out.
    AwaitingClearAnimation,
    /// Game over; terminal for this game instance.
    Stopped,
}

/// Outstanding gravity-chain request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Pending {
    Advance(u64),
    Removal(u64),
}

/// What the driver should do after a gravity response was handled.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GravityOutcome {
    /// Snapshot applied; keep ticking on the current interval.
    Continue,
    /// Snapshot applied and rows are flashing: the tick timer must be
    /// disarmed, and removal requested after this delay.
    ClearAnimation(Duration),
    /// Post-removal snapshot applied: re-arm the tick timer with this
    /// (recomputed) interval.
    Rearm(Duration),
    /// Snapshot applied and the game is over; timer disarmed for good.
    GameOver,
    /// Stale or superseded response; nothing was applied and no timer state
    /// changes.
    Stale,
}

/// Gravity state machine. See the module docs for the contract.
#[derive(Debug, Clone)]
pub struct FallLoop {
    phase: Phase,
    speed: u32,
    next_seq: u64,
    /// Tokens below this were issued before the last `stop()`/reset and are dead.
    valid_from: u64,
    /// Token of the snapshot currently cached; older responses are discarded.
    last_applied: u64,
    pending: Option<Pending>,
    snapshot: Snapshot,
}

impl FallLoop {
    pub fn new(speed: u32) -> Self {
        Self {
            phase: Phase::Idle,
            speed: speed.max(1),
            next_seq: 1,
            valid_from: 0,
            last_applied: 0,
            pending: None,
            snapshot: Snapshot::default(),
        }
    }

    pub fn phase(&self) -> Phase {
        self.phase
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn speed(&self) -> u32 {
        self.speed
    }

    /// Speed multiplier is clamped to at least 1. Takes effect on the next
    /// re-arm, never retroactively for an armed timer.
    pub fn set_speed(&mut self, speed: u32) {
        self.speed = speed.max(1);
    }

    /// Current tick interval from the cached level and the speed multiplier.
    pub fn interval(&self) -> Duration {
        fall_interval(self.snapshot.level, self.speed)
    }

    /// Arm the loop. Returns the interval the driver should tick at.
    pub fn start(&mut self) -> Duration {
        self.phase = Phase::Running;
        self.pending = None;
        self.interval()
    }

    /// Disarm the loop and invalidate every outstanding token, so responses
    /// already in flight are dropped on arrival.
    pub fn stop(&mut self) {
        self.phase = Phase::Idle;
        self.pending = None;
        self.valid_from = self.next_seq;
    }

    /// A tick fired. Returns the token for an advance request, or `None` when
    /// the tick must be skipped (not running, paused, or a gravity request is
    /// still outstanding).
    pub fn tick(&mut self) -> Option<u64> {
        if self.phase != Phase::Running || self.snapshot.is_paused || self.pending.is_some() {
            return None;
        }
        let seq = self.allocate_seq();
        self.pending = Some(Pending::Advance(seq));
        Some(seq)
    }

    /// The clear-animation delay elapsed. Returns the token for a removal
    /// request, or `None` if the wait was cancelled in the meantime.
    pub fn clear_delay_elapsed(&mut self) -> Option<u64> {
        if self.phase != Phase::AwaitingClearAnimation {
            return None;
        }
        let seq = self.allocate_seq();
        self.pending = Some(Pending::Removal(seq));
        Some(seq)
    }

    /// Handle a gravity-chain response (advance or removal).
    pub fn apply_gravity(&mut self, seq: u64, snapshot: Snapshot) -> GravityOutcome {
        let pending = match self.pending {
            Some(p) => p,
            None => return GravityOutcome::Stale,
        };
        let matches = match pending {
            Pending::Advance(s) | Pending::Removal(s) => s == seq,
        };
        if !matches || seq < self.valid_from {
            return GravityOutcome::Stale;
        }
        self.pending = None;

        // A side request (move/pause) issued after this one may already have
        // applied a newer state; keep that and let the next tick resync.
        if seq < self.last_applied {
            return GravityOutcome::Stale;
        }

        self.apply(seq, snapshot);

        if self.snapshot.game_over {
            self.phase = Phase::Stopped;
            return GravityOutcome::GameOver;
        }

        match pending {
            Pending::Advance(_) => {
                if self.snapshot.has_clearing_cells() {
                    self.phase = Phase::AwaitingClearAnimation;
                    GravityOutcome::ClearAnimation(Duration::from_millis(LINE_CLEAR_ANIM_MS))
                } else {
                    GravityOutcome::Continue
                }
            }
            Pending::Removal(_) => {
                // Level may have changed with the removal; hand back a fresh
                // interval for the re-arm.
                self.phase = Phase::Running;
                GravityOutcome::Rearm(self.interval())
            }
        }
    }

    /// A gravity-chain request failed in transport. Drops to `Idle` (holding
    /// the loop until the user retries) and reports whether the failure was
    /// for the live request.
    pub fn gravity_failed(&mut self, seq: u64) -> bool {
        let live = matches!(
            self.pending,
            Some(Pending::Advance(s) | Pending::Removal(s)) if s == seq
        );
        if !live || seq < self.valid_from {
            return false;
        }
        self.pending = None;
        self.phase = Phase::Idle;
        true
    }

    /// Allocate a token for a request outside the gravity chain (move, pause,
    /// reset, initial state fetch). Its response goes through
    /// [`FallLoop::apply_side_response`].
    pub fn issue_side_request(&mut self) -> u64 {
        self.allocate_seq()
    }

    /// Apply a non-gravity response under the same token rules: dead or
    /// out-of-date tokens are dropped. Returns whether the snapshot was
    /// applied (and therefore whether a render is warranted).
    pub fn apply_side_response(&mut self, seq: u64, snapshot: Snapshot) -> bool {
        if seq < self.valid_from || seq <= self.last_applied {
            return false;
        }
        self.apply(seq, snapshot);
        if self.snapshot.game_over && self.phase != Phase::Idle {
            self.phase = Phase::Stopped;
            self.pending = None;
        }
        true
    }

    fn apply(&mut self, seq: u64, snapshot: Snapshot) {
        self.snapshot = snapshot;
        self.last_applied = seq;
    }

    fn allocate_seq(&mut self) -> u64 {
        let seq = self.next_seq;
        self.next_seq += 1;
        seq
    }
}

/// Tick interval for a level and speed multiplier.
///
/// Clamp first, then divide by the multiplier, then apply the fixed bias:
/// `max(100, 1000 - (level-1)*100) / speed * 0.9`. The floor is therefore
/// `100 / speed * 0.9`, not a hard 90 ms.
pub fn fall_interval(level: u32, speed: u32) -> Duration {
    Duration::from_secs_f64(fall_interval_ms(level, speed) / 1000.0)
}

pub fn fall_interval_ms(level: u32, speed: u32) -> f64 {
    let stepped = BASE_FALL_MS.saturating_sub(level.saturating_sub(1).saturating_mul(LEVEL_STEP_MS));
    let base = stepped.max(MIN_FALL_MS);
    base as f64 / speed.max(1) as f64 * FALL_BIAS
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::protocol::{Board, Cell};
    use crate::types::{CellState, PieceKind, BOARD_WIDTH};

    fn snapshot(level: u32) -> Snapshot {
        Snapshot {
            level,
            ..Snapshot::default()
        }
    }

    fn clearing_snapshot(level: u32) -> Snapshot {
        let mut snap = snapshot(level);
        let mut board = Board::default();
        board.0[19] = vec![Cell::filled(CellState::Clearing, PieceKind::O); BOARD_WIDTH];
        snap.board = board;
        snap
    }

    fn game_over_snapshot() -> Snapshot {
        Snapshot {
            game_over: true,
            ..Snapshot::default()
        }
    }

    #[test]
    fn test_interval_formula_exact_values() {
        assert_eq!(fall_interval_ms(1, 1), 900.0);
        assert_eq!(fall_interval_ms(5, 1), 540.0);
        assert_eq!(fall_interval_ms(10, 1), 90.0);
        assert_eq!(fall_interval_ms(99, 1), 90.0);
        // Clamp applies before the multiplier, so speed can go below 90.
        assert_eq!(fall_interval_ms(10, 2), 45.0);
        assert_eq!(fall_interval_ms(1, 2), 450.0);
    }

    #[test]
    fn test_interval_non_increasing_in_level_and_speed() {
        for speed in 1..=4 {
            let mut prev = f64::INFINITY;
            for level in 1..=20 {
                let ms = fall_interval_ms(level, speed);
                assert!(ms <= prev, "level {level} speed {speed}: {ms} > {prev}");
                assert!(ms >= fall_interval_ms(level, speed + 1));
                prev = ms;
            }
        }
    }

    #[test]
    fn test_start_arms_with_level_interval() {
        let mut fall = FallLoop::new(1);
        let seq = fall.issue_side_request();
        assert!(fall.apply_side_response(seq, snapshot(5)));

        let interval = fall.start();
        assert_eq!(fall.phase(), Phase::Running);
        assert_eq!(interval, Duration::from_secs_f64(0.540));
    }

    #[test]
    fn test_tick_issues_one_request_at_a_time() {
        let mut fall = FallLoop::new(1);
        fall.start();

        let seq = fall.tick().expect("first tick issues a request");
        // A second tick while the first is outstanding must issue nothing.
        assert_eq!(fall.tick(), None);

        assert_eq!(
            fall.apply_gravity(seq, snapshot(1)),
            GravityOutcome::Continue
        );
        assert!(fall.tick().is_some(), "resolved request unblocks the loop");
    }

    #[test]
    fn test_tick_skipped_while_paused() {
        let mut fall = FallLoop::new(1);
        fall.start();
        let seq = fall.issue_side_request();
        let mut paused = snapshot(1);
        paused.is_paused = true;
        assert!(fall.apply_side_response(seq, paused));

        assert_eq!(fall.tick(), None);
        assert_eq!(fall.phase(), Phase::Running, "timer stays armed while paused");
    }

    #[test]
    fn test_clearing_signal_suspends_ticking() {
        let mut fall = FallLoop::new(1);
        fall.start();

        let seq = fall.tick().unwrap();
        let outcome = fall.apply_gravity(seq, clearing_snapshot(1));
        assert_eq!(
            outcome,
            GravityOutcome::ClearAnimation(Duration::from_millis(LINE_CLEAR_ANIM_MS))
        );
        assert_eq!(fall.phase(), Phase::AwaitingClearAnimation);

        // No advance requests while the animation plays.
        assert_eq!(fall.tick(), None);
    }

    #[test]
    fn test_removal_rearms_with_recomputed_interval() {
        let mut fall = FallLoop::new(1);
        fall.start();

        let seq = fall.tick().unwrap();
        fall.apply_gravity(seq, clearing_snapshot(1));

        let removal_seq = fall.clear_delay_elapsed().expect("removal request issued");
        // The removal bumped the level from 1 to 2.
        let outcome = fall.apply_gravity(removal_seq, snapshot(2));
        assert_eq!(outcome, GravityOutcome::Rearm(fall_interval(2, 1)));
        assert_eq!(fall.phase(), Phase::Running);
        assert!(fall.tick().is_some());
    }

    #[test]
    fn test_clear_delay_after_stop_is_inert() {
        let mut fall = FallLoop::new(1);
        fall.start();
        let seq = fall.tick().unwrap();
        fall.apply_gravity(seq, clearing_snapshot(1));

        fall.stop();
        assert_eq!(fall.clear_delay_elapsed(), None);
    }

    #[test]
    fn test_game_over_stops_the_loop() {
        let mut fall = FallLoop::new(1);
        fall.start();

        let seq = fall.tick().unwrap();
        assert_eq!(
            fall.apply_gravity(seq, game_over_snapshot()),
            GravityOutcome::GameOver
        );
        assert_eq!(fall.phase(), Phase::Stopped);
        assert_eq!(fall.tick(), None);

        // start() re-arms for a new game.
        fall.start();
        assert!(fall.tick().is_some());
    }

    #[test]
    fn test_response_after_stop_is_dropped() {
        let mut fall = FallLoop::new(1);
        fall.start();
        let seq = fall.tick().unwrap();

        fall.stop();
        let before = fall.snapshot().clone();
        assert_eq!(
            fall.apply_gravity(seq, snapshot(7)),
            GravityOutcome::Stale
        );
        assert_eq!(fall.snapshot(), &before, "stale response must not mutate the cache");
    }

    #[test]
    fn test_side_response_after_stop_is_dropped() {
        let mut fall = FallLoop::new(1);
        fall.start();
        let move_seq = fall.issue_side_request();

        fall.stop();
        assert!(!fall.apply_side_response(move_seq, snapshot(3)));
        assert_eq!(fall.snapshot().level, 1);
    }

    #[test]
    fn test_gravity_response_superseded_by_newer_side_response() {
        let mut fall = FallLoop::new(1);
        fall.start();

        let advance_seq = fall.tick().unwrap();
        let pause_seq = fall.issue_side_request();

        // The pause response lands first and is newer.
        let mut paused = snapshot(1);
        paused.is_paused = true;
        assert!(fall.apply_side_response(pause_seq, paused));

        // The late advance must not roll the cache back.
        assert_eq!(
            fall.apply_gravity(advance_seq, snapshot(1)),
            GravityOutcome::Stale
        );
        assert!(fall.snapshot().is_paused);
        // But the chain is unblocked again once the response has settled.
        let mut unpaused = fall.snapshot().clone();
        unpaused.is_paused = false;
        let seq = fall.issue_side_request();
        assert!(fall.apply_side_response(seq, unpaused));
        assert!(fall.tick().is_some());
    }

    #[test]
    fn test_out_of_date_side_response_is_dropped() {
        let mut fall = FallLoop::new(1);
        let older = fall.issue_side_request();
        let newer = fall.issue_side_request();

        assert!(fall.apply_side_response(newer, snapshot(4)));
        assert!(!fall.apply_side_response(older, snapshot(2)));
        assert_eq!(fall.snapshot().level, 4);
    }

    #[test]
    fn test_transport_failure_holds_loop_in_idle() {
        let mut fall = FallLoop::new(1);
        fall.start();
        let seq = fall.tick().unwrap();

        assert!(fall.gravity_failed(seq));
        assert_eq!(fall.phase(), Phase::Idle);
        assert_eq!(fall.tick(), None);

        // Retry re-arms.
        fall.start();
        assert!(fall.tick().is_some());
    }

    #[test]
    fn test_failure_of_dead_request_is_ignored() {
        let mut fall = FallLoop::new(1);
        fall.start();
        let seq = fall.tick().unwrap();
        fall.stop();
        fall.start();

        assert!(!fall.gravity_failed(seq));
        assert_eq!(fall.phase(), Phase::Running);
    }

    #[test]
    fn test_side_game_over_stops_loop() {
        let mut fall = FallLoop::new(1);
        fall.start();

        // A soft-drop move response can carry game_over.
        let seq = fall.issue_side_request();
        assert!(fall.apply_side_response(seq, game_over_snapshot()));
        assert_eq!(fall.phase(), Phase::Stopped);
        assert_eq!(fall.tick(), None);
    }

    #[test]
    fn test_speed_clamped_to_at_least_one() {
        let mut fall = FallLoop::new(0);
        assert_eq!(fall.speed(), 1);
        fall.set_speed(0);
        assert_eq!(fall.speed(), 1);
        fall.set_speed(3);
        assert_eq!(fall.speed(), 3);
    }
}
