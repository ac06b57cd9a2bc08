use crate::config::{load_roi_config, PipelineConfig, RoiConfig};
use crate::engine::{reconcile_with, BallEvent};
use crate::ocr::ExtractorFactory;
use crate::pipeline::{CancelFlag, FramePipeline, PipelineStats};
use crate::report::{history_csv, results_csv, rollup_csv, save_csv};
use crate::snapshot::Snapshot;
use crate::video::{VideoInfo, VideoOpener};
use anyhow::{Context, Result};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub const RESULTS_FILE: &str = "match_results.csv";
pub const ROLLUP_FILE: &str = "match_rollup.csv";
pub const HISTORY_FILE: &str = "match_history.csv";

#[derive(Debug, Serialize)]
pub struct MatchReport {
    pub info: VideoInfo,
    pub events: Vec<BallEvent>,
    pub history: Vec<Snapshot>,
    pub stats: PipelineStats,
    /// The run stopped early; `events` covers what was read until then.
    pub cancelled: bool,
}

impl MatchReport {
    pub fn results_csv(&self) -> String {
        results_csv(&self.events, &self.info)
    }

    pub fn rollup_csv(&self) -> String {
        rollup_csv(&self.events, &self.info)
    }

    pub fn history_csv(&self) -> String {
        history_csv(&self.history, &self.info)
    }

    /// Write the three CSV files into `dir`.  Returns the paths written.
    pub fn write_to(&self, dir: &Path) -> Result<Vec<PathBuf>> {
        let outputs = [
            (RESULTS_FILE, self.results_csv()),
            (ROLLUP_FILE, self.rollup_csv()),
            (HISTORY_FILE, self.history_csv()),
        ];
        let mut written = Vec::with_capacity(outputs.len());
        for (name, csv) in outputs {
            let path = dir.join(name);
            save_csv(&path, &csv)?;
            log::info!("wrote {}", path.display());
            written.push(path);
        }
        Ok(written)
    }
}

/// Sample, extract, and fold with caller-supplied backends.
pub fn run_with(
    config: &PipelineConfig,
    roi: &RoiConfig,
    opener: &dyn VideoOpener,
    factory: &dyn ExtractorFactory,
    cancel: &CancelFlag,
) -> Result<MatchReport> {
    let outcome = FramePipeline::from(config)
        .run(opener, factory, roi, cancel)
        .with_context(|| format!("processing {}", config.video_path.display()))?;

    let events = reconcile_with(&outcome.history, config.seed_policy);
    log::info!(
        "{} snapshots → {} deliveries{}",
        outcome.history.len(),
        events.len(),
        if outcome.cancelled { " (cancelled, partial)" } else { "" }
    );

    Ok(MatchReport {
        info: outcome.info,
        events,
        history: outcome.history,
        stats: outcome.stats,
        cancelled: outcome.cancelled,
    })
}

/// Full run with the FFmpeg decoder and the Tesseract recognizer.
#[cfg(all(feature = "ffmpeg", feature = "tesseract"))]
pub fn run(config: &PipelineConfig, cancel: &CancelFlag) -> Result<MatchReport> {
    use crate::ocr::tesseract::TesseractFactory;
    use crate::video::FfmpegOpener;

    let roi = load_roi_config(&config.roi_config_path)?;
    let opener = FfmpegOpener::new(&config.video_path)?;
    let factory = TesseractFactory {
        tessdata_dir: config.tessdata_dir.clone(),
        languages: config.languages.clone(),
    };
    match &config.tessdata_dir {
        Some(dir) => log::info!("tesseract data: {}", dir.display()),
        None => log::info!("tesseract data: system default"),
    }
    run_with(config, &roi, &opener, &factory, cancel)
}

#[cfg(not(all(feature = "ffmpeg", feature = "tesseract")))]
pub fn run(config: &PipelineConfig, _cancel: &CancelFlag) -> Result<MatchReport> {
    // Still validate the region file so config mistakes surface first.
    load_roi_config(&config.roi_config_path)?;
    anyhow::bail!("this build has no video/OCR backend; rebuild with `--features ffmpeg,tesseract`")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::SeedPolicy;
    use crate::error::{DecodeError, ExtractError};
    use crate::ocr::Extractor;
    use crate::video::{Frame, VideoSource};
    use std::collections::HashMap;
    use std::fs;
    use tempfile::tempdir;

    type Script = Vec<(&'static str, &'static str, &'static str)>;

    /// Scripted scoreboard: frame index → (score, over, batter) text.
    struct Opener(Script);

    impl VideoOpener for Opener {
        fn info(&self) -> Result<VideoInfo, DecodeError> {
            Ok(VideoInfo { fps: 1.0, width: 2, height: 1, frame_count: self.0.len() as u64 })
        }

        fn open(&self) -> Result<Box<dyn VideoSource>, DecodeError> {
            Ok(Box::new(OwnedReader { script: self.0.clone(), position: 0 }))
        }
    }

    struct OwnedReader {
        script: Script,
        position: u64,
    }

    impl VideoSource for OwnedReader {
        fn info(&self) -> VideoInfo {
            VideoInfo { fps: 1.0, width: 2, height: 1, frame_count: self.script.len() as u64 }
        }

        fn seek(&mut self, frame_index: u64) -> Result<(), DecodeError> {
            self.position = frame_index;
            Ok(())
        }

        fn read(&mut self) -> Result<Option<Frame>, DecodeError> {
            // Frame bytes carry the index for the fake extractor.
            Ok(Some(Frame::new(vec![self.position as u8, 0, 0, 0, 0, 0], 2, 1)))
        }
    }

    struct ScriptFactory(Script);

    struct ScriptExtractor(Script);

    impl ExtractorFactory for ScriptFactory {
        fn create(&self) -> Result<Box<dyn Extractor>, ExtractError> {
            Ok(Box::new(ScriptExtractor(self.0.clone())))
        }
    }

    impl Extractor for ScriptExtractor {
        fn extract(
            &mut self,
            frame: &Frame,
            _roi: &RoiConfig,
        ) -> Result<HashMap<String, String>, ExtractError> {
            let (score, over, batter) = self.0[frame.rgb[0] as usize];
            Ok([
                ("BattingTeam", "AUS"),
                ("RunsWickets", score),
                ("OverWithBall", over),
                ("Batter1", batter),
            ]
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect())
        }
    }

    fn script() -> Script {
        vec![
            ("0/0", "0.0", "Warner"),
            ("4/0", "0.1", "Warner"),
            ("4/0", "0.1", "Warner"),
            ("4/1", "0.1", "Warner"),
            ("4/1", "0.1", "Smith"),
            ("garbage", "0.2", "Smith"),
            ("5/1", "0.2", "Smith"),
        ]
    }

    #[test]
    fn test_run_with_end_to_end() {
        let mut config = PipelineConfig::new("match.mp4", "roi.json");
        config.sampling_interval_secs = 1.0;
        config.producer_count = 2;
        config.consumer_count = 3;
        config.queue_capacity = 2;

        let report = run_with(
            &config,
            &RoiConfig::default(),
            &Opener(script()),
            &ScriptFactory(script()),
            &CancelFlag::default(),
        )
        .unwrap();

        assert!(!report.cancelled);
        assert_eq!(report.history.len(), 6);
        assert_eq!(report.stats.rejected, 1);
        assert_eq!(report.events.len(), 2);

        let wicket = &report.events[0];
        let summary = |e: &BallEvent| (e.over, e.ball, e.runs_delta, e.wickets_delta);
        assert_eq!(summary(wicket), (0, 1, 4, 1));
        assert_eq!(wicket.batter1, "Warner");
        assert_eq!(wicket.frame_index, 3);

        let next = &report.events[1];
        assert_eq!(summary(next), (0, 2, 1, 0));
        assert_eq!(next.batter1, "Smith");
    }

    #[test]
    fn test_seed_policy_from_config() {
        let mut config = PipelineConfig::new("match.mp4", "roi.json");
        config.sampling_interval_secs = 1.0;
        config.seed_policy = SeedPolicy::FromZero;

        let report = run_with(
            &config,
            &RoiConfig::default(),
            &Opener(script()),
            &ScriptFactory(script()),
            &CancelFlag::default(),
        )
        .unwrap();

        // Reading at 0.0 is not a new position from a zero baseline.
        assert_eq!(report.events.len(), 2);
    }

    #[test]
    fn test_write_to_dir() {
        let mut config = PipelineConfig::new("match.mp4", "roi.json");
        config.sampling_interval_secs = 1.0;
        let report = run_with(
            &config,
            &RoiConfig::default(),
            &Opener(script()),
            &ScriptFactory(script()),
            &CancelFlag::default(),
        )
        .unwrap();

        let dir = tempdir().unwrap();
        let out = dir.path().join("reports");
        let written = report.write_to(&out).unwrap();
        assert_eq!(written.len(), 3);

        let results = fs::read_to_string(out.join(RESULTS_FILE)).unwrap();
        assert_eq!(results.lines().count(), 3);
        let rollup = fs::read_to_string(out.join(ROLLUP_FILE)).unwrap();
        assert!(rollup.lines().nth(2).unwrap().ends_with(",5,1"));
        let history = fs::read_to_string(out.join(HISTORY_FILE)).unwrap();
        assert_eq!(history.lines().count(), 7);
    }

    #[cfg(not(all(feature = "ffmpeg", feature = "tesseract")))]
    #[test]
    fn test_run_without_backends_fails_cleanly() {
        let dir = tempdir().unwrap();
        let roi = dir.path().join("roi.json");
        fs::write(&roi, "{}").unwrap();
        let config = PipelineConfig::new(dir.path().join("match.mp4"), &roi);
        assert!(run(&config, &CancelFlag::default()).is_err());
    }
}
