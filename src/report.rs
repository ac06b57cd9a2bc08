//! CSV output for the event log and the raw snapshot history.

use crate::engine::BallEvent;
use crate::snapshot::Snapshot;
use crate::video::VideoInfo;
use anyhow::{Context, Result};
use std::borrow::Cow;
use std::fmt::Write as _;
use std::fs;
use std::path::Path;

pub const RESULTS_HEADER: &str =
    "over,ball,runs,wickets,frame_index,elapsed_seconds,timestamp,batter1,batter2,batting_team,bowler";
pub const ROLLUP_HEADER: &str =
    "over,ball,runs,wickets,frame_index,elapsed_seconds,timestamp,batter1,batter2,batting_team,bowler,total_runs,total_wickets";
pub const HISTORY_HEADER: &str =
    "frame_index,elapsed_seconds,timestamp,over,ball,runs,wickets,batter1,batter2,batting_team,bowler";

/// Quote a text field if it would break the row.
fn field(s: &str) -> Cow<'_, str> {
    if s.contains([',', '"', '\n', '\r']) {
        Cow::Owned(format!("\"{}\"", s.replace('"', "\"\"")))
    } else {
        Cow::Borrowed(s)
    }
}

fn push_event(csv: &mut String, e: &BallEvent, info: &VideoInfo) {
    let _ = write!(
        csv,
        "{},{},{},{},{},{:.3},{},{},{},{},{}",
        e.over,
        e.ball,
        e.runs_delta,
        e.wickets_delta,
        e.frame_index,
        info.elapsed_secs(e.frame_index),
        e.captured_at.to_rfc3339(),
        field(&e.batter1),
        field(&e.batter2),
        field(&e.batting_team),
        field(&e.bowler),
    );
}

/// One row per delivery, runs and wickets as deltas.
pub fn results_csv(events: &[BallEvent], info: &VideoInfo) -> String {
    let mut csv = String::from(RESULTS_HEADER);
    csv.push('\n');
    for e in events {
        push_event(&mut csv, e, info);
        csv.push('\n');
    }
    csv
}

/// Results plus running totals.  Totals restart whenever an event sits at
/// `0.0`, i.e. at the start of each innings.
pub fn rollup_csv(events: &[BallEvent], info: &VideoInfo) -> String {
    let mut csv = String::from(ROLLUP_HEADER);
    csv.push('\n');
    let (mut total_runs, mut total_wickets) = (0u32, 0u32);
    for e in events {
        if e.position() == (0, 0) {
            total_runs = 0;
            total_wickets = 0;
        }
        total_runs = total_runs.saturating_add(e.runs_delta);
        total_wickets = total_wickets.saturating_add(e.wickets_delta);
        push_event(&mut csv, e, info);
        let _ = writeln!(csv, ",{total_runs},{total_wickets}");
    }
    csv
}

/// Every accepted snapshot, cumulative values as read off the scoreboard.
pub fn history_csv(history: &[Snapshot], info: &VideoInfo) -> String {
    let mut csv = String::from(HISTORY_HEADER);
    csv.push('\n');
    for s in history {
        let _ = writeln!(
            csv,
            "{},{:.3},{},{},{},{},{},{},{},{},{}",
            s.frame_index(),
            info.elapsed_secs(s.frame_index()),
            s.captured_at().to_rfc3339(),
            s.over(),
            s.ball(),
            s.runs(),
            s.wickets(),
            field(s.batter1()),
            field(s.batter2()),
            field(s.batting_team()),
            field(s.bowler()),
        );
    }
    csv
}

/// Write CSV content to `path`, creating parent directories if needed.
pub fn save_csv(path: &Path, csv: &str) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("cannot create {}", parent.display()))?;
    }
    fs::write(path, csv).with_context(|| format!("cannot write {}", path.display()))
}
