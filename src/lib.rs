pub mod config;
pub mod engine;
pub mod error;
pub mod history;
pub mod ocr;
pub mod pipeline;
pub mod processor;
pub mod report;
pub mod snapshot;
pub mod video;

pub use engine::{reconcile, BallEvent};
pub use pipeline::{CancelFlag, FramePipeline};
pub use snapshot::Snapshot;
