//! Frame sampling and the worker pool.
//!
//! `P` producers each own a video handle and walk an interleaved stripe of the
//! sampled frame indices, pushing frames into one bounded queue.  A full queue
//! blocks the producer, so no frame is ever dropped for lack of room and peak
//! memory stays around `queue_capacity` frames.  `C` workers pull frames, run
//! extraction with their own extractor, validate, and append to the shared
//! [`History`].  Nothing is folded until every thread has joined.

use crate::config::{PipelineConfig, RoiConfig};
use crate::error::PipelineError;
use crate::history::History;
use crate::ocr::{Extractor, ExtractorFactory};
use crate::snapshot::Snapshot;
use crate::video::{Frame, VideoInfo, VideoOpener};
use chrono::{DateTime, Utc};
use serde::Serialize;
use std::sync::{
    atomic::{AtomicBool, AtomicU64, Ordering},
    mpsc::{sync_channel, Receiver, SyncSender},
    Arc, Mutex,
};
use std::thread;

/// Shared cancellation flag.  Producers check it before every seek.
#[derive(Debug, Clone)]
pub struct CancelFlag(pub Arc<AtomicBool>);

impl Default for CancelFlag {
    fn default() -> Self {
        CancelFlag(Arc::new(AtomicBool::new(false)))
    }
}

impl CancelFlag {
    pub fn cancel(&self) {
        self.0.store(true, Ordering::Relaxed);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::Relaxed)
    }
}

/// A sampled frame on its way to a worker.
#[derive(Debug)]
pub struct FrameItem {
    pub frame_index: u64,
    pub captured_at: DateTime<Utc>,
    pub frame: Frame,
}

/// Number of source frames between two samples: `floor(fps × interval)`, at least 1.
pub fn frame_stride(fps: f64, interval_secs: f64) -> u64 {
    let stride = fps * interval_secs;
    if stride.is_finite() && stride >= 1.0 {
        stride as u64
    } else {
        1
    }
}

/// Frame indices visited by `producer` out of `producers`:
/// `p·stride, p·stride + P·stride, …` below `frame_count`.
pub fn stripe(
    producer: usize,
    producers: usize,
    stride: u64,
    frame_count: u64,
) -> impl Iterator<Item = u64> {
    let stride = stride.max(1);
    let step = stride * producers.max(1) as u64;
    (producer as u64 * stride..frame_count).step_by(step as usize)
}

#[derive(Debug, Default)]
struct Counters {
    frames_read: AtomicU64,
    decode_failures: AtomicU64,
    empty_frames: AtomicU64,
    extraction_failures: AtomicU64,
    rejected: AtomicU64,
    accepted: AtomicU64,
}

impl Counters {
    fn bump(counter: &AtomicU64) {
        counter.fetch_add(1, Ordering::Relaxed);
    }

    fn snapshot(&self) -> PipelineStats {
        PipelineStats {
            frames_read: self.frames_read.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            empty_frames: self.empty_frames.load(Ordering::Relaxed),
            extraction_failures: self.extraction_failures.load(Ordering::Relaxed),
            rejected: self.rejected.load(Ordering::Relaxed),
            accepted: self.accepted.load(Ordering::Relaxed),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct PipelineStats {
    /// Frames decoded and queued.
    pub frames_read: u64,
    pub decode_failures: u64,
    pub empty_frames: u64,
    pub extraction_failures: u64,
    /// Frames whose extracted text failed validation.
    pub rejected: u64,
    pub accepted: u64,
}

#[derive(Debug)]
pub struct PipelineOutcome {
    pub info: VideoInfo,
    /// Accepted snapshots, sorted by frame index.
    pub history: Vec<Snapshot>,
    pub stats: PipelineStats,
    pub cancelled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FramePipeline {
    pub sampling_interval_secs: f64,
    pub producer_count: usize,
    pub consumer_count: usize,
    pub queue_capacity: usize,
}

impl Default for FramePipeline {
    fn default() -> Self {
        Self {
            sampling_interval_secs: 2.0,
            producer_count: 1,
            consumer_count: 6,
            queue_capacity: 100,
        }
    }
}

impl From<&PipelineConfig> for FramePipeline {
    fn from(cfg: &PipelineConfig) -> Self {
        Self {
            sampling_interval_secs: cfg.sampling_interval_secs,
            producer_count: cfg.producer_count.max(1),
            consumer_count: cfg.consumer_count.max(1),
            queue_capacity: cfg.queue_capacity.max(1),
        }
    }
}

/// Everything a thread needs, borrowed for the lifetime of the scope.
struct Shared<'a> {
    roi: &'a RoiConfig,
    cancel: &'a CancelFlag,
    /// Raised on a fatal error; stops producers like `cancel` but is not
    /// reported as a user cancellation.
    halt: AtomicBool,
    history: History,
    counters: Counters,
}

impl Shared<'_> {
    fn stopping(&self) -> bool {
        self.cancel.is_cancelled() || self.halt.load(Ordering::Relaxed)
    }
}

/// Raises `halt` when the owning thread unwinds.
struct HaltOnPanic<'a>(&'a AtomicBool);

impl Drop for HaltOnPanic<'_> {
    fn drop(&mut self) {
        if thread::panicking() {
            self.0.store(true, Ordering::Relaxed);
        }
    }
}

impl FramePipeline {
    pub fn run(
        &self,
        opener: &dyn VideoOpener,
        factory: &dyn ExtractorFactory,
        roi: &RoiConfig,
        cancel: &CancelFlag,
    ) -> Result<PipelineOutcome, PipelineError> {
        let info = opener.info().map_err(|source| PipelineError::Open { producer: 0, source })?;
        let stride = frame_stride(info.fps, self.sampling_interval_secs);
        let producers = self.producer_count.max(1);
        let consumers = self.consumer_count.max(1);

        log::info!(
            "sampling {} frames @ {:.2} fps every {} frames ({} producers, {} workers, queue {})",
            info.frame_count, info.fps, stride, producers, consumers, self.queue_capacity
        );

        let shared = Shared {
            roi,
            cancel,
            halt: AtomicBool::new(false),
            history: History::new(),
            counters: Counters::default(),
        };
        let (tx, rx) = sync_channel::<FrameItem>(self.queue_capacity.max(1));
        // Owned by the workers only: once the last one is gone, even by
        // panicking, the receiver drops and blocked producers wake up.
        let rx = Arc::new(Mutex::new(rx));

        let result: Result<(), PipelineError> = thread::scope(|s| {
            let shared = &shared;

            let producer_handles: Vec<_> = (0..producers)
                .map(|p| {
                    let tx = tx.clone();
                    let indices = stripe(p, producers, stride, info.frame_count);
                    s.spawn(move || produce(p, opener, indices, tx, shared))
                })
                .collect();
            // Producers hold the only senders now: the queue closes when the last one exits.
            drop(tx);

            let worker_handles: Vec<_> = (0..consumers)
                .map(|w| {
                    let rx = Arc::clone(&rx);
                    s.spawn(move || consume(w, factory, rx, shared))
                })
                .collect();
            drop(rx);

            let mut first_err = None;
            for h in producer_handles {
                let r = h.join().unwrap_or(Err(PipelineError::Panicked("producer")));
                if let Err(e) = r {
                    first_err.get_or_insert(e);
                }
            }
            for h in worker_handles {
                let r = h.join().unwrap_or(Err(PipelineError::Panicked("worker")));
                if let Err(e) = r {
                    first_err.get_or_insert(e);
                }
            }
            first_err.map_or(Ok(()), Err)
        });

        let stats = shared.counters.snapshot();
        if let Err(e) = result {
            log::error!("pipeline aborted: {e} ({stats:?})");
            return Err(e);
        }

        let cancelled = cancel.is_cancelled();
        let history = shared.history.into_sorted();
        log::info!(
            "pipeline {}: {} frames read, {} snapshots accepted, {} rejected, {} decode failures",
            if cancelled { "cancelled" } else { "finished" },
            stats.frames_read,
            stats.accepted,
            stats.rejected,
            stats.decode_failures + stats.empty_frames,
        );

        Ok(PipelineOutcome { info, history, stats, cancelled })
    }
}

fn produce(
    producer: usize,
    opener: &dyn VideoOpener,
    indices: impl Iterator<Item = u64>,
    tx: SyncSender<FrameItem>,
    shared: &Shared<'_>,
) -> Result<(), PipelineError> {
    let _halt = HaltOnPanic(&shared.halt);
    let mut video = match opener.open() {
        Ok(v) => v,
        Err(source) => {
            shared.halt.store(true, Ordering::Relaxed);
            return Err(PipelineError::Open { producer, source });
        }
    };

    for index in indices {
        if shared.stopping() {
            log::info!("producer {producer}: stopping before frame {index}");
            break;
        }

        if let Err(e) = video.seek(index) {
            log::warn!("producer {producer}: {e}");
            Counters::bump(&shared.counters.decode_failures);
            continue;
        }

        let frame = match video.read() {
            Ok(Some(frame)) if !frame.is_empty() => frame,
            Ok(_) => {
                log::warn!("producer {producer}: frame {index} empty");
                Counters::bump(&shared.counters.empty_frames);
                continue;
            }
            Err(e) => {
                log::warn!("producer {producer}: {e}");
                Counters::bump(&shared.counters.decode_failures);
                continue;
            }
        };

        let item = FrameItem { frame_index: index, captured_at: Utc::now(), frame };
        log::debug!("producer {producer}: queued frame {index}");
        Counters::bump(&shared.counters.frames_read);

        // Blocks while the queue is full.
        if tx.send(item).is_err() {
            log::warn!("producer {producer}: queue closed");
            break;
        }
    }

    log::debug!("producer {producer}: done");
    Ok(())
}

fn consume(
    worker: usize,
    factory: &dyn ExtractorFactory,
    rx: Arc<Mutex<Receiver<FrameItem>>>,
    shared: &Shared<'_>,
) -> Result<(), PipelineError> {
    let _halt = HaltOnPanic(&shared.halt);
    let mut error = None;
    let mut extractor: Option<Box<dyn Extractor>> = match factory.create() {
        Ok(e) => Some(e),
        Err(source) => {
            log::error!("worker {worker}: {source}");
            shared.halt.store(true, Ordering::Relaxed);
            error = Some(PipelineError::Extraction { worker, source });
            None
        }
    };

    loop {
        // The guard is dropped as soon as `recv` returns.
        let received = rx.lock().unwrap_or_else(|e| e.into_inner()).recv();
        let Ok(item) = received else {
            break;
        };

        // After a fatal error keep draining so no producer stays blocked.
        if shared.halt.load(Ordering::Relaxed) {
            continue;
        }
        let Some(ex) = extractor.as_mut() else {
            continue;
        };

        match ex.extract(&item.frame, shared.roi) {
            Ok(fields) => match Snapshot::from_fields(&fields, item.frame_index, item.captured_at) {
                Ok(snapshot) => {
                    log::debug!(
                        "worker {worker}: frame {} → {}/{} @ {}.{}",
                        item.frame_index,
                        snapshot.runs(),
                        snapshot.wickets(),
                        snapshot.over(),
                        snapshot.ball()
                    );
                    Counters::bump(&shared.counters.accepted);
                    shared.history.append(snapshot);
                }
                Err(reason) => {
                    log::debug!("worker {worker}: frame {} rejected: {reason}", item.frame_index);
                    Counters::bump(&shared.counters.rejected);
                }
            },
            Err(source) if source.is_fatal() => {
                log::error!("worker {worker}: frame {}: {source}", item.frame_index);
                shared.halt.store(true, Ordering::Relaxed);
                error = Some(PipelineError::Extraction { worker, source });
                extractor = None;
            }
            Err(e) => {
                log::warn!("worker {worker}: frame {}: {e}", item.frame_index);
                Counters::bump(&shared.counters.extraction_failures);
            }
        }
    }

    log::debug!("worker {worker}: queue drained");
    error.map_or(Ok(()), Err)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::reconcile;
    use crate::error::{DecodeError, ExtractError};
    use crate::video::VideoSource;
    use std::collections::{HashMap, HashSet};
    use std::sync::atomic::AtomicUsize;
    use std::time::Duration;

    // ── Fakes ────────────────────────────────────────────────────────────────

    /// In-memory video: the frame index is written into the first pixels so
    /// the fake extractor can tell frames apart.
    struct FakeOpener {
        info: VideoInfo,
        bad_seeks: HashSet<u64>,
        empty: HashSet<u64>,
        opens: AtomicUsize,
        fail_open: bool,
    }

    impl FakeOpener {
        fn new(frame_count: u64, fps: f64) -> Self {
            Self {
                info: VideoInfo { fps, width: 4, height: 1, frame_count },
                bad_seeks: HashSet::new(),
                empty: HashSet::new(),
                opens: AtomicUsize::new(0),
                fail_open: false,
            }
        }
    }

    struct FakeSource {
        info: VideoInfo,
        bad_seeks: HashSet<u64>,
        empty: HashSet<u64>,
        position: u64,
    }

    impl VideoOpener for FakeOpener {
        fn info(&self) -> Result<VideoInfo, DecodeError> {
            Ok(self.info)
        }

        fn open(&self) -> Result<Box<dyn VideoSource>, DecodeError> {
            if self.fail_open {
                return Err(DecodeError::Open { path: "fake".into(), reason: "gone".into() });
            }
            self.opens.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeSource {
                info: self.info,
                bad_seeks: self.bad_seeks.clone(),
                empty: self.empty.clone(),
                position: 0,
            }))
        }
    }

    impl VideoSource for FakeSource {
        fn info(&self) -> VideoInfo {
            self.info
        }

        fn seek(&mut self, frame_index: u64) -> Result<(), DecodeError> {
            if self.bad_seeks.contains(&frame_index) {
                return Err(DecodeError::Seek { index: frame_index, reason: "corrupt".into() });
            }
            self.position = frame_index;
            Ok(())
        }

        fn read(&mut self) -> Result<Option<Frame>, DecodeError> {
            if self.empty.contains(&self.position) {
                return Ok(Some(Frame::new(vec![], 0, 0)));
            }
            let mut rgb = self.position.to_le_bytes().to_vec();
            rgb.extend_from_slice(&[0; 4]);
            Ok(Some(Frame::new(rgb, 4, 1)))
        }
    }

    fn frame_index_of(frame: &Frame) -> u64 {
        let mut b = [0u8; 8];
        b.copy_from_slice(&frame.rgb[..8]);
        u64::from_le_bytes(b)
    }

    type Script = fn(u64) -> HashMap<String, String>;

    struct FakeFactory {
        script: Script,
        delay: Duration,
        creates: AtomicUsize,
        fail_create: bool,
        /// Cancel once this frame index has been extracted.
        cancel_at: Option<(u64, CancelFlag)>,
    }

    impl FakeFactory {
        fn new(script: Script) -> Self {
            Self {
                script,
                delay: Duration::ZERO,
                creates: AtomicUsize::new(0),
                fail_create: false,
                cancel_at: None,
            }
        }
    }

    struct FakeExtractor {
        script: Script,
        delay: Duration,
        cancel_at: Option<(u64, CancelFlag)>,
    }

    impl ExtractorFactory for FakeFactory {
        fn create(&self) -> Result<Box<dyn Extractor>, ExtractError> {
            if self.fail_create {
                return Err(ExtractError::Unsupported("no image conversion".into()));
            }
            self.creates.fetch_add(1, Ordering::SeqCst);
            Ok(Box::new(FakeExtractor {
                script: self.script,
                delay: self.delay,
                cancel_at: self.cancel_at.clone(),
            }))
        }
    }

    impl Extractor for FakeExtractor {
        fn extract(
            &mut self,
            frame: &Frame,
            _roi: &RoiConfig,
        ) -> Result<HashMap<String, String>, ExtractError> {
            thread::sleep(self.delay);
            let index = frame_index_of(frame);
            if let Some((at, flag)) = &self.cancel_at {
                if index >= *at {
                    flag.cancel();
                }
            }
            Ok((self.script)(index))
        }
    }

    fn fields(score: &str, over: &str, batter: &str) -> HashMap<String, String> {
        [
            ("BattingTeam", "IND"),
            ("RunsWickets", score),
            ("OverWithBall", over),
            ("Batter1", batter),
        ]
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect()
    }

    /// One ball every 10 frames, one run per ball.
    fn steady_scoring(index: u64) -> HashMap<String, String> {
        let ball = index / 10;
        fields(&format!("{ball}/0"), &format!("{}.{}", ball / 6, ball % 6), "Rohit")
    }

    fn pipeline(producers: usize, consumers: usize, capacity: usize) -> FramePipeline {
        FramePipeline {
            sampling_interval_secs: 1.0,
            producer_count: producers,
            consumer_count: consumers,
            queue_capacity: capacity,
        }
    }

    // ── Tests ────────────────────────────────────────────────────────────────

    #[test]
    fn test_frame_stride() {
        assert_eq!(frame_stride(25.0, 2.0), 50);
        assert_eq!(frame_stride(29.97, 2.0), 59);
        assert_eq!(frame_stride(30.0, 0.01), 1);
        assert_eq!(frame_stride(f64::NAN, 2.0), 1);
    }

    #[test]
    fn test_stripes_interleave() {
        assert_eq!(stripe(0, 3, 2, 20).collect::<Vec<_>>(), vec![0, 6, 12, 18]);
        assert_eq!(stripe(1, 3, 2, 20).collect::<Vec<_>>(), vec![2, 8, 14]);
        assert_eq!(stripe(2, 3, 2, 20).collect::<Vec<_>>(), vec![4, 10, 16]);
        assert_eq!(stripe(5, 6, 10, 20).count(), 0);
    }

    #[test]
    fn test_stripes_cover_each_sample_once() {
        let (producers, stride, frames) = (4, 7, 1000);
        let mut all: Vec<u64> =
            (0..producers).flat_map(|p| stripe(p, producers, stride, frames)).collect();
        all.sort_unstable();
        let expected: Vec<u64> = (0..frames).step_by(stride as usize).collect();
        assert_eq!(all, expected);
    }

    #[test]
    fn test_no_frame_lost_under_backpressure() {
        let opener = FakeOpener::new(120, 1.0);
        let mut factory = FakeFactory::new(steady_scoring);
        factory.delay = Duration::from_millis(2);

        let outcome = pipeline(3, 2, 1)
            .run(&opener, &factory, &RoiConfig::default(), &CancelFlag::default())
            .unwrap();

        assert!(!outcome.cancelled);
        assert_eq!(outcome.stats.frames_read, 120);
        assert_eq!(outcome.stats.accepted, 120);
        let frames: Vec<u64> = outcome.history.iter().map(Snapshot::frame_index).collect();
        assert_eq!(frames, (0..120).collect::<Vec<_>>());
    }

    #[test]
    fn test_each_producer_and_worker_gets_own_instance() {
        let opener = FakeOpener::new(40, 1.0);
        let factory = FakeFactory::new(steady_scoring);
        pipeline(3, 4, 8)
            .run(&opener, &factory, &RoiConfig::default(), &CancelFlag::default())
            .unwrap();
        assert_eq!(opener.opens.load(Ordering::SeqCst), 3);
        assert_eq!(factory.creates.load(Ordering::SeqCst), 4);
    }

    #[test]
    fn test_decode_failures_are_skipped() {
        let mut opener = FakeOpener::new(30, 1.0);
        opener.bad_seeks = [3, 4].into_iter().collect();
        opener.empty = [10].into_iter().collect();
        let factory = FakeFactory::new(steady_scoring);

        let outcome = pipeline(2, 2, 4)
            .run(&opener, &factory, &RoiConfig::default(), &CancelFlag::default())
            .unwrap();

        assert_eq!(outcome.stats.decode_failures, 2);
        assert_eq!(outcome.stats.empty_frames, 1);
        assert_eq!(outcome.stats.frames_read, 27);
        assert_eq!(outcome.history.len(), 27);
        assert!(outcome.history.iter().all(|s| ![3, 4, 10].contains(&s.frame_index())));
    }

    #[test]
    fn test_invalid_frames_never_become_snapshots() {
        fn every_third_garbled(index: u64) -> HashMap<String, String> {
            if index % 3 == 0 {
                fields("1453", "2.1", "Rohit")
            } else {
                steady_scoring(index)
            }
        }
        let opener = FakeOpener::new(30, 1.0);
        let factory = FakeFactory::new(every_third_garbled);

        let outcome = pipeline(1, 3, 4)
            .run(&opener, &factory, &RoiConfig::default(), &CancelFlag::default())
            .unwrap();

        assert_eq!(outcome.stats.rejected, 10);
        assert_eq!(outcome.stats.accepted, 20);
        assert!(outcome.history.iter().all(|s| s.frame_index() % 3 != 0));
    }

    #[test]
    fn test_cancel_before_start_reads_nothing() {
        let opener = FakeOpener::new(50, 1.0);
        let factory = FakeFactory::new(steady_scoring);
        let cancel = CancelFlag::default();
        cancel.cancel();

        let roi = RoiConfig::default();
        let outcome = pipeline(2, 2, 4).run(&opener, &factory, &roi, &cancel).unwrap();
        assert!(outcome.cancelled);
        assert_eq!(outcome.stats.frames_read, 0);
        assert!(outcome.history.is_empty());
    }

    #[test]
    fn test_cancel_mid_run_keeps_partial_history() {
        let opener = FakeOpener::new(1000, 1.0);
        let cancel = CancelFlag::default();
        let mut factory = FakeFactory::new(steady_scoring);
        factory.cancel_at = Some((20, cancel.clone()));

        let roi = RoiConfig::default();
        let outcome = pipeline(1, 1, 2).run(&opener, &factory, &roi, &cancel).unwrap();

        assert!(outcome.cancelled);
        assert!(outcome.history.len() >= 21);
        assert!(outcome.history.len() < 1000);
        // Partial results are still computable.
        assert!(!reconcile(&outcome.history).is_empty());
    }

    #[test]
    fn test_extractor_unavailable_aborts() {
        let opener = FakeOpener::new(500, 1.0);
        let mut factory = FakeFactory::new(steady_scoring);
        factory.fail_create = true;

        let err = pipeline(2, 2, 1)
            .run(&opener, &factory, &RoiConfig::default(), &CancelFlag::default())
            .unwrap_err();
        assert!(matches!(
            err,
            PipelineError::Extraction { source: ExtractError::Unsupported(_), .. }
        ));
    }

    #[test]
    fn test_open_failure_aborts() {
        let mut opener = FakeOpener::new(10, 1.0);
        opener.fail_open = true;
        let factory = FakeFactory::new(steady_scoring);

        let err = pipeline(1, 2, 1)
            .run(&opener, &factory, &RoiConfig::default(), &CancelFlag::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Open { producer: 0, .. }));
    }

    fn crash(index: u64) -> HashMap<String, String> {
        panic!("extractor crashed on frame {index}")
    }

    fn crash_on_seven(index: u64) -> HashMap<String, String> {
        if index == 7 {
            crash(index)
        } else {
            steady_scoring(index)
        }
    }

    #[test]
    fn test_only_worker_panicking_does_not_hang() {
        let opener = FakeOpener::new(50, 1.0);
        let factory = FakeFactory::new(crash);

        let err = pipeline(1, 1, 2)
            .run(&opener, &factory, &RoiConfig::default(), &CancelFlag::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Panicked("worker")));
    }

    #[test]
    fn test_one_worker_panicking_stops_the_run() {
        let opener = FakeOpener::new(500, 1.0);
        let factory = FakeFactory::new(crash_on_seven);

        let err = pipeline(2, 3, 1)
            .run(&opener, &factory, &RoiConfig::default(), &CancelFlag::default())
            .unwrap_err();
        assert!(matches!(err, PipelineError::Panicked("worker")));
    }

    #[test]
    fn test_results_independent_of_worker_interleaving() {
        let opener = FakeOpener::new(200, 5.0);
        // Sample every 5th frame → two samples per ball.
        let single = pipeline(1, 1, 100);
        let parallel = pipeline(4, 6, 3);

        let a = single
            .run(&opener, &FakeFactory::new(steady_scoring), &RoiConfig::default(), &CancelFlag::default())
            .unwrap();
        let b = parallel
            .run(&opener, &FakeFactory::new(steady_scoring), &RoiConfig::default(), &CancelFlag::default())
            .unwrap();

        // Capture times differ between runs; everything else must match.
        let key = |events: Vec<crate::engine::BallEvent>| -> Vec<_> {
            events
                .into_iter()
                .map(|e| (e.over, e.ball, e.runs_delta, e.wickets_delta, e.frame_index))
                .collect()
        };
        let events_a = key(reconcile(&a.history));
        assert_eq!(events_a, key(reconcile(&b.history)));
        // 20 balls, first one seeds.
        assert_eq!(events_a.len(), 19);
        assert!(events_a.iter().all(|e| e.2 == 1 && e.3 == 0));
    }
}
