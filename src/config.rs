use crate::engine::SeedPolicy;
use anyhow::{Context, Result};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

/// Scoreboard labels the snapshot validator reads.
pub mod labels {
    pub const RUNS_WICKETS: &str = "RunsWickets";
    pub const OVER_WITH_BALL: &str = "OverWithBall";
    pub const BATTING_TEAM: &str = "BattingTeam";
    pub const BATTER1: &str = "Batter1";
    pub const BATTER2: &str = "Batter2";
    pub const BOWLER: &str = "Bowler";
}

/// What a region holds.  Decides which character set the recognizer
/// is restricted to; the pipeline itself never looks at it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum RegionKind {
    /// Digits and separators (`12/3`, `4.5`).
    Score,
    /// Uppercase team code.
    Team,
    /// Free text such as player names.
    #[default]
    Text,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    #[serde(default)]
    pub kind: RegionKind,
}

impl Region {
    /// Clip the rectangle to a `frame_width`×`frame_height` frame.
    /// Returns `(x, y, w, h)` or `None` when nothing of it is visible.
    pub fn clip(&self, frame_width: u32, frame_height: u32) -> Option<(u32, u32, u32, u32)> {
        let x = self.x.max(0) as u32;
        let y = self.y.max(0) as u32;
        let x2 = (x + self.width.max(0) as u32).min(frame_width);
        let y2 = (y + self.height.max(0) as u32).min(frame_height);
        if x2 <= x || y2 <= y {
            return None;
        }
        Some((x, y, x2 - x, y2 - y))
    }
}

/// Label → region map.  A `BTreeMap` keeps extraction order stable between runs.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RoiConfig {
    pub regions: BTreeMap<String, Region>,
}

impl RoiConfig {
    pub fn get(&self, label: &str) -> Option<&Region> {
        self.regions.get(label)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Region)> {
        self.regions.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.regions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.regions.is_empty()
    }
}

fn default_interval() -> f64 { 2.0 }
fn default_producers() -> usize { 1 }
fn default_consumers() -> usize { 6 }
fn default_capacity() -> usize { 100 }
fn default_output_dir() -> PathBuf { PathBuf::from(".") }
fn default_languages() -> Vec<String> { vec!["eng".to_string()] }

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PipelineConfig {
    pub video_path: PathBuf,
    pub roi_config_path: PathBuf,
    /// Directory containing `tessdata/`.  `None` → system default.
    #[serde(default)]
    pub tessdata_dir: Option<PathBuf>,
    #[serde(default = "default_languages")]
    pub languages: Vec<String>,
    #[serde(default = "default_interval")]
    pub sampling_interval_secs: f64,
    #[serde(default = "default_producers")]
    pub producer_count: usize,
    #[serde(default = "default_consumers")]
    pub consumer_count: usize,
    /// In-flight frames between producers and workers.
    #[serde(default = "default_capacity")]
    pub queue_capacity: usize,
    #[serde(default = "default_output_dir")]
    pub output_dir: PathBuf,
    #[serde(default)]
    pub seed_policy: SeedPolicy,
}

impl PipelineConfig {
    pub fn new(video_path: impl Into<PathBuf>, roi_config_path: impl Into<PathBuf>) -> Self {
        Self {
            video_path: video_path.into(),
            roi_config_path: roi_config_path.into(),
            tessdata_dir: None,
            languages: default_languages(),
            sampling_interval_secs: default_interval(),
            producer_count: default_producers(),
            consumer_count: default_consumers(),
            queue_capacity: default_capacity(),
            output_dir: default_output_dir(),
            seed_policy: SeedPolicy::default(),
        }
    }

    /// Clamp counts so a hand-edited config can't produce an empty pool.
    pub fn normalized(mut self) -> Self {
        self.producer_count = self.producer_count.max(1);
        self.consumer_count = self.consumer_count.max(1);
        self.queue_capacity = self.queue_capacity.max(1);
        if !(self.sampling_interval_secs.is_finite() && self.sampling_interval_secs > 0.0) {
            log::warn!(
                "invalid sampling interval {}, using {}",
                self.sampling_interval_secs,
                default_interval()
            );
            self.sampling_interval_secs = default_interval();
        }
        self
    }
}

fn load_json<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let text =
        fs::read_to_string(path).with_context(|| format!("cannot read {}", path.display()))?;
    serde_json::from_str(&text).with_context(|| format!("parse error in {}", path.display()))
}

fn save_json<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).context("cannot create dirs")?;
    }
    let text = serde_json::to_string_pretty(value).context("serialise error")?;
    fs::write(path, text).with_context(|| format!("cannot write {}", path.display()))
}

pub fn load_roi_config(path: &Path) -> Result<RoiConfig> {
    let cfg: RoiConfig = load_json(path)?;
    if cfg.is_empty() {
        log::warn!("{} defines no regions", path.display());
    }
    Ok(cfg)
}

pub fn save_roi_config(path: &Path, config: &RoiConfig) -> Result<()> {
    save_json(path, config)
}

pub fn load_pipeline_config(path: &Path) -> Result<PipelineConfig> {
    load_json::<PipelineConfig>(path).map(PipelineConfig::normalized)
}

pub fn save_pipeline_config(path: &Path, config: &PipelineConfig) -> Result<()> {
    save_json(path, config)
}
