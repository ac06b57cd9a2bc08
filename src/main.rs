use anyhow::{bail, Context, Result};
use clap::Parser;
use scorereader_lib::{
    config::{load_pipeline_config, PipelineConfig},
    pipeline::CancelFlag,
    processor,
};
use std::path::PathBuf;

#[derive(Parser, Debug)]
#[command(name = "scorereader", about = "Ball-by-ball cricket event log from scoreboard video")]
struct Args {
    /// Pipeline config (JSON).  Flags below override its fields.
    #[arg(long, value_name = "PATH")]
    config: Option<PathBuf>,
    #[arg(long, value_name = "PATH")]
    video: Option<PathBuf>,
    /// Region-of-interest config (JSON).
    #[arg(long, value_name = "PATH")]
    roi: Option<PathBuf>,
    /// Seconds between sampled frames.
    #[arg(long)]
    interval: Option<f64>,
    #[arg(long)]
    producers: Option<usize>,
    #[arg(long)]
    consumers: Option<usize>,
    #[arg(long, value_name = "DIR")]
    output_dir: Option<PathBuf>,
}

impl Args {
    fn into_config(self) -> Result<PipelineConfig> {
        let mut cfg = match &self.config {
            Some(path) => load_pipeline_config(path)
                .with_context(|| format!("loading {}", path.display()))?,
            None => match (&self.video, &self.roi) {
                (Some(video), Some(roi)) => PipelineConfig::new(video, roi),
                _ => bail!("either --config or both --video and --roi are required"),
            },
        };

        if let Some(video) = self.video {
            cfg.video_path = video;
        }
        if let Some(roi) = self.roi {
            cfg.roi_config_path = roi;
        }
        if let Some(interval) = self.interval {
            cfg.sampling_interval_secs = interval;
        }
        if let Some(n) = self.producers {
            cfg.producer_count = n;
        }
        if let Some(n) = self.consumers {
            cfg.consumer_count = n;
        }
        if let Some(dir) = self.output_dir {
            cfg.output_dir = dir;
        }
        Ok(cfg.normalized())
    }
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cfg = Args::parse().into_config()?;
    log::info!("video: {}", cfg.video_path.display());
    log::info!("regions: {}", cfg.roi_config_path.display());

    let report = processor::run(&cfg, &CancelFlag::default())?;
    report.write_to(&cfg.output_dir)?;

    log::info!(
        "{} deliveries from {} snapshots ({} frames read, {} rejected)",
        report.events.len(),
        report.history.len(),
        report.stats.frames_read,
        report.stats.rejected
    );
    Ok(())
}
