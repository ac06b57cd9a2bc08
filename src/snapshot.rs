//! Snapshot validation.
//!
//! Turns the label → text map produced by the extractor into a typed
//! [`Snapshot`], or rejects the whole frame.  Only the numeric fields and
//! the team code are checked; names pass through as read.

use crate::config::labels;
use crate::error::ValidationError;
use chrono::{DateTime, Utc};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;
use std::collections::HashMap;

static SCORE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d+)\s*/\s*(\d+)").expect("score pattern"));
static OVER_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"(\d+)\.(\d+)").expect("over pattern"));

/// One accepted scoreboard reading.  Fields are private so a `Snapshot`
/// can only come out of validation (or the test constructor).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Snapshot {
    frame_index: u64,
    captured_at: DateTime<Utc>,
    runs: u32,
    wickets: u32,
    over: u32,
    ball: u32,
    batter1: String,
    batter2: String,
    batting_team: String,
    bowler: String,
}

impl Snapshot {
    pub fn from_fields(
        fields: &HashMap<String, String>,
        frame_index: u64,
        captured_at: DateTime<Utc>,
    ) -> Result<Self, ValidationError> {
        let field = |label: &str| fields.get(label).map(|s| s.trim()).unwrap_or("");

        let team = field(labels::BATTING_TEAM);
        if !is_valid_team_name(team) {
            return Err(ValidationError::TeamName(team.to_string()));
        }

        let score = field(labels::RUNS_WICKETS);
        let (runs, wickets) =
            parse_score(score).ok_or_else(|| ValidationError::Score(score.to_string()))?;

        let over_text = field(labels::OVER_WITH_BALL);
        let (over, ball) =
            parse_over(over_text).ok_or_else(|| ValidationError::Over(over_text.to_string()))?;

        Ok(Self {
            frame_index,
            captured_at,
            runs,
            wickets,
            over,
            ball,
            batter1: field(labels::BATTER1).to_string(),
            batter2: field(labels::BATTER2).to_string(),
            batting_team: team.to_string(),
            bowler: field(labels::BOWLER).to_string(),
        })
    }

    pub fn frame_index(&self) -> u64 { self.frame_index }
    pub fn captured_at(&self) -> DateTime<Utc> { self.captured_at }
    pub fn runs(&self) -> u32 { self.runs }
    pub fn wickets(&self) -> u32 { self.wickets }
    pub fn over(&self) -> u32 { self.over }
    pub fn ball(&self) -> u32 { self.ball }
    pub fn batter1(&self) -> &str { &self.batter1 }
    pub fn batter2(&self) -> &str { &self.batter2 }
    pub fn batting_team(&self) -> &str { &self.batting_team }
    pub fn bowler(&self) -> &str { &self.bowler }

    /// `(over, ball)` — the delivery this reading describes.
    pub fn position(&self) -> (u32, u32) {
        (self.over, self.ball)
    }
}

#[cfg(test)]
impl Snapshot {
    /// Build a snapshot directly, bypassing text parsing.
    pub(crate) fn reading(frame_index: u64, over: u32, ball: u32, runs: u32, wickets: u32) -> Self {
        Self {
            frame_index,
            captured_at: DateTime::<Utc>::from_timestamp(frame_index as i64, 0).unwrap_or_default(),
            runs,
            wickets,
            over,
            ball,
            batter1: String::new(),
            batter2: String::new(),
            batting_team: "IND".to_string(),
            bowler: String::new(),
        }
    }

    pub(crate) fn with_batters(mut self, batter1: &str, batter2: &str) -> Self {
        self.batter1 = batter1.to_string();
        self.batter2 = batter2.to_string();
        self
    }

    pub(crate) fn with_bowler(mut self, bowler: &str) -> Self {
        self.bowler = bowler.to_string();
        self
    }
}

fn capture_pair(re: &Regex, text: &str) -> Option<(u32, u32)> {
    let caps = re.captures(text)?;
    let a = caps.get(1)?.as_str().parse().ok()?;
    let b = caps.get(2)?.as_str().parse().ok()?;
    Some((a, b))
}

/// `"123/4"` → `(123, 4)`.  Whitespace around the slash is tolerated.
pub fn parse_score(text: &str) -> Option<(u32, u32)> {
    capture_pair(&SCORE_RE, text)
}

/// `"12.3"` → `(12, 3)`.
pub fn parse_over(text: &str) -> Option<(u32, u32)> {
    capture_pair(&OVER_RE, text)
}

/// Exactly three characters, at least one letter, and no lowercase letters.
pub fn is_valid_team_name(text: &str) -> bool {
    text.chars().count() == 3
        && text.chars().any(char::is_alphabetic)
        && text.chars().all(|c| !c.is_alphabetic() || c.is_uppercase())
}
