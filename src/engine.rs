//! Reconciliation of frame-ordered snapshots into a ball-by-ball event log.
//!
//! The fold is pure: [`reconcile`] threads an explicit [`EngineState`] through
//! the history and returns a fresh log, so recomputing from the same history
//! always yields the same events.

use crate::snapshot::Snapshot;
use chrono::{DateTime, Utc};
use serde::Serialize;

/// One inferred delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct BallEvent {
    pub over: u32,
    pub ball: u32,
    pub runs_delta: u32,
    pub wickets_delta: u32,
    pub batter1: String,
    pub batter2: String,
    pub batting_team: String,
    pub bowler: String,
    /// Snapshot that produced, or last amended, this event.
    pub frame_index: u64,
    pub captured_at: DateTime<Utc>,
}

impl BallEvent {
    /// Event at `position`, with participants taken from `participants` and
    /// provenance from `source`.
    fn build(
        position: (u32, u32),
        runs_delta: u32,
        wickets_delta: u32,
        participants: &Snapshot,
        source: &Snapshot,
    ) -> Self {
        Self {
            over: position.0,
            ball: position.1,
            runs_delta,
            wickets_delta,
            batter1: participants.batter1().to_string(),
            batter2: participants.batter2().to_string(),
            batting_team: participants.batting_team().to_string(),
            bowler: participants.bowler().to_string(),
            frame_index: source.frame_index(),
            captured_at: source.captured_at(),
        }
    }

    pub fn position(&self) -> (u32, u32) {
        (self.over, self.ball)
    }
}

/// Cumulative values last committed into the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct EngineState {
    pub last_runs: u32,
    pub last_wickets: u32,
    pub current_over: u32,
    pub current_ball: u32,
}

impl EngineState {
    fn seeded_from(s: &Snapshot) -> Self {
        Self {
            last_runs: s.runs(),
            last_wickets: s.wickets(),
            current_over: s.over(),
            current_ball: s.ball(),
        }
    }

    pub fn position(&self) -> (u32, u32) {
        (self.current_over, self.current_ball)
    }
}

/// Ordered events with a single correction primitive.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EventLog {
    events: Vec<BallEvent>,
}

impl EventLog {
    pub fn push(&mut self, event: BallEvent) {
        self.events.push(event);
    }

    /// Replace the most recent event.  On an empty log the event is appended.
    pub fn amend_last(&mut self, event: BallEvent) {
        match self.events.last_mut() {
            Some(last) => *last = event,
            None => self.events.push(event),
        }
    }

    pub fn last(&self) -> Option<&BallEvent> {
        self.events.last()
    }

    pub fn len(&self) -> usize {
        self.events.len()
    }

    pub fn is_empty(&self) -> bool {
        self.events.is_empty()
    }

    pub fn events(&self) -> &[BallEvent] {
        &self.events
    }

    pub fn into_events(self) -> Vec<BallEvent> {
        self.events
    }
}

/// How the first reading of a history is treated.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SeedPolicy {
    /// The first reading only sets the baseline; it emits nothing.
    #[default]
    Silent,
    /// Start from an all-zero baseline at `0.0` so the first reading is an
    /// event too.  Under this policy a wicket shown late on the second ball
    /// yields exactly two events (first ball, then the amended second), and
    /// an innings reset read after the opening snapshot is the second event.
    /// With `Silent` each of those histories is one event shorter.
    FromZero,
}

impl SeedPolicy {
    fn initial_state(self) -> Option<EngineState> {
        match self {
            SeedPolicy::Silent => None,
            SeedPolicy::FromZero => Some(EngineState::default()),
        }
    }
}

/// What a snapshot did to the log.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Seeded,
    Emitted,
    /// Emitted as the first ball after an innings boundary.
    InningsReset,
    WicketAmended,
    Duplicate,
}

/// Fold one snapshot into `state`/`log`.  `state` is `None` until the first
/// reading has been seen; `previous` is the snapshot immediately before
/// `current` in frame order.
pub fn step(
    state: Option<EngineState>,
    previous: Option<&Snapshot>,
    current: &Snapshot,
    log: &mut EventLog,
) -> (EngineState, Step) {
    let Some(mut state) = state else {
        return (EngineState::seeded_from(current), Step::Seeded);
    };

    let position = current.position();

    if position != state.position() {
        let reset = position == (0, 0);
        if reset {
            // New innings: diff against zero, not last innings' totals.
            state = EngineState::default();
        }
        let runs_delta = current.runs().saturating_sub(state.last_runs);
        let wickets_delta = current.wickets().saturating_sub(state.last_wickets);
        log.push(BallEvent::build(position, runs_delta, wickets_delta, current, current));
        let next = EngineState::seeded_from(current);
        return (next, if reset { Step::InningsReset } else { Step::Emitted });
    }

    if current.wickets() > state.last_wickets {
        // The wicket counter moves before the name fields: the batter shown
        // just before this reading is the one who is out.
        let wickets_delta = current.wickets() - state.last_wickets;
        let runs_delta = log.last().map_or(0, |e| e.runs_delta);
        let participants = previous.unwrap_or(current);
        let amended = BallEvent::build(position, runs_delta, wickets_delta, participants, current);
        log.amend_last(amended);
        state.last_wickets = current.wickets();
        return (state, Step::WicketAmended);
    }

    // Repeat sample of the committed delivery.  A same-ball run increase is
    // deliberately dropped here too.
    (state, Step::Duplicate)
}

/// Fold a frame-index-sorted history into the event log.
pub fn reconcile(history: &[Snapshot]) -> Vec<BallEvent> {
    reconcile_with(history, SeedPolicy::default())
}

pub fn reconcile_with(history: &[Snapshot], seed: SeedPolicy) -> Vec<BallEvent> {
    debug_assert!(
        history.windows(2).all(|w| w[0].frame_index() <= w[1].frame_index()),
        "history must be sorted by frame index"
    );

    let mut events = EventLog::default();
    let mut state = seed.initial_state();
    let mut previous = None;

    for current in history {
        let (next, outcome) = step(state, previous, current, &mut events);
        match outcome {
            Step::InningsReset => log::info!(
                "innings reset at frame {} (previous position {:?})",
                current.frame_index(),
                state.map(|s| s.position())
            ),
            Step::WicketAmended => log::debug!(
                "wicket amended onto {:?} at frame {}",
                current.position(),
                current.frame_index()
            ),
            _ => {}
        }
        state = Some(next);
        previous = Some(current);
    }

    events.into_events()
}
