use crate::error::DecodeError;
use image::RgbImage;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct VideoInfo {
    pub fps: f64,
    pub width: u32,
    pub height: u32,
    pub frame_count: u64,
}

impl VideoInfo {
    /// Seconds from the start of the video to `frame_index`.
    pub fn elapsed_secs(&self, frame_index: u64) -> f64 {
        if self.fps > 0.0 {
            frame_index as f64 / self.fps
        } else {
            0.0
        }
    }
}

/// One decoded frame as packed RGB24.
#[derive(Debug, Clone)]
pub struct Frame {
    pub rgb: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

impl Frame {
    pub fn new(rgb: Vec<u8>, width: u32, height: u32) -> Self {
        Self { rgb, width, height }
    }

    /// A frame with no pixels, or whose buffer doesn't cover its dimensions.
    pub fn is_empty(&self) -> bool {
        self.width == 0
            || self.height == 0
            || self.rgb.len() < self.width as usize * self.height as usize * 3
    }

    pub fn to_image(&self) -> Option<RgbImage> {
        if self.is_empty() {
            return None;
        }
        let len = self.width as usize * self.height as usize * 3;
        RgbImage::from_raw(self.width, self.height, self.rgb[..len].to_vec())
    }
}

/// A seekable video handle.  Each producer owns one; handles are never shared.
pub trait VideoSource {
    fn info(&self) -> VideoInfo;
    fn seek(&mut self, frame_index: u64) -> Result<(), DecodeError>;
    /// Read the frame at the current position.  `Ok(None)` when the
    /// decoder produced nothing there.
    fn read(&mut self) -> Result<Option<Frame>, DecodeError>;
}

/// Opens independent `VideoSource` handles onto the same resource.
pub trait VideoOpener: Sync {
    fn info(&self) -> Result<VideoInfo, DecodeError>;
    fn open(&self) -> Result<Box<dyn VideoSource>, DecodeError>;
}

#[cfg(feature = "ffmpeg")]
pub use self::ffmpeg_backend::{video_info, FfmpegOpener, FfmpegVideo};

#[cfg(feature = "ffmpeg")]
mod ffmpeg_backend {
    use super::{Frame, VideoInfo, VideoOpener, VideoSource};
    use crate::error::DecodeError;
    use ffmpeg_the_third as ffmpeg;
    use ffmpeg_the_third::{
        codec::{context::Context as CodecCtx, decoder::Video as VideoDecoder},
        format::{context::Input, Pixel},
        frame::Video as VideoFrame,
        media::Type,
        software::scaling::{context::Context as SwsCtx, flag::Flags},
    };
    use std::path::{Path, PathBuf};

    fn open_err(path: &Path, e: impl std::fmt::Display) -> DecodeError {
        DecodeError::Open { path: path.display().to_string(), reason: e.to_string() }
    }

    /// Read frame rate, dimensions and frame count without decoding.
    pub fn video_info(path: &Path) -> Result<VideoInfo, DecodeError> {
        ffmpeg::init().map_err(|e| open_err(path, e))?;
        let ictx = ffmpeg::format::input(path).map_err(|e| open_err(path, e))?;
        let stream = ictx
            .streams()
            .best(Type::Video)
            .ok_or_else(|| open_err(path, "no video stream found"))?;

        let fps = {
            let r = stream.avg_frame_rate();
            if r.1 != 0 && r.0 > 0 {
                r.0 as f64 / r.1 as f64
            } else {
                log::warn!("could not read FPS from '{}', defaulting to 30", path.display());
                30.0
            }
        };

        let nb_frames = stream.frames();
        let (width, height) = {
            let ctx = CodecCtx::from_parameters(stream.parameters())
                .map_err(|e| open_err(path, format!("codec context: {e}")))?;
            let dec = ctx
                .decoder()
                .video()
                .map_err(|e| open_err(path, format!("video decoder: {e}")))?;
            (dec.width(), dec.height())
        };

        // Format-level duration is in AV_TIME_BASE units (microseconds)
        let duration = ictx.duration().max(0) as f64 / 1_000_000.0;
        let frame_count = if nb_frames > 0 {
            nb_frames as u64
        } else {
            (duration * fps).round() as u64
        };

        Ok(VideoInfo { fps, width, height, frame_count })
    }

    pub struct FfmpegOpener {
        path: PathBuf,
        info: VideoInfo,
    }

    impl FfmpegOpener {
        pub fn new(path: impl Into<PathBuf>) -> Result<Self, DecodeError> {
            let path = path.into();
            let info = video_info(&path)?;
            Ok(Self { path, info })
        }
    }

    impl VideoOpener for FfmpegOpener {
        fn info(&self) -> Result<VideoInfo, DecodeError> {
            Ok(self.info)
        }

        fn open(&self) -> Result<Box<dyn VideoSource>, DecodeError> {
            Ok(Box::new(FfmpegVideo::open(&self.path, self.info)?))
        }
    }

    /// One demuxer + decoder + scaler.  Not shareable across threads.
    pub struct FfmpegVideo {
        ictx: Input,
        stream_idx: usize,
        decoder: VideoDecoder,
        scaler: SwsCtx,
        info: VideoInfo,
        position: u64,
    }

    impl FfmpegVideo {
        pub fn open(path: &Path, info: VideoInfo) -> Result<Self, DecodeError> {
            ffmpeg::init().map_err(|e| open_err(path, e))?;
            let ictx = ffmpeg::format::input(path).map_err(|e| open_err(path, e))?;

            // Build the decoder inside a block so the shared borrow of `ictx`
            // held by `stream` ends before `ictx` moves into the struct.
            let (stream_idx, decoder) = {
                let stream = ictx
                    .streams()
                    .best(Type::Video)
                    .ok_or_else(|| open_err(path, "no video stream"))?;
                let idx = stream.index();
                let ctx = CodecCtx::from_parameters(stream.parameters())
                    .map_err(|e| open_err(path, format!("codec context: {e}")))?;
                let dec = ctx
                    .decoder()
                    .video()
                    .map_err(|e| open_err(path, format!("video decoder: {e}")))?;
                (idx, dec)
            };

            // Pixel-format converter: native format → RGB24
            let scaler = SwsCtx::get(
                decoder.format(),
                decoder.width(),
                decoder.height(),
                Pixel::RGB24,
                decoder.width(),
                decoder.height(),
                Flags::BILINEAR,
            )
            .map_err(|e| open_err(path, format!("scaler init: {e}")))?;

            Ok(Self { ictx, stream_idx, decoder, scaler, info, position: 0 })
        }
    }

    impl VideoSource for FfmpegVideo {
        fn info(&self) -> VideoInfo {
            self.info
        }

        fn seek(&mut self, frame_index: u64) -> Result<(), DecodeError> {
            let secs = self.info.elapsed_secs(frame_index);
            // `..seek_ts` lands on the nearest keyframe ≤ the target.
            let seek_ts = (secs.max(0.0) * 1_000_000.0) as i64;
            self.ictx
                .seek(seek_ts, ..seek_ts)
                .map_err(|e| DecodeError::Seek { index: frame_index, reason: e.to_string() })?;
            self.decoder.flush();
            self.position = frame_index;
            Ok(())
        }

        fn read(&mut self) -> Result<Option<Frame>, DecodeError> {
            let index = self.position;
            let read_err = |reason: String| DecodeError::Read { index, reason };

            let mut rgb_frame = VideoFrame::empty();
            let mut found = false;

            for (stream, packet) in self.ictx.packets().filter_map(|r| r.ok()) {
                if stream.index() != self.stream_idx {
                    continue;
                }
                if self.decoder.send_packet(&packet).is_err() {
                    continue;
                }
                let mut decoded = VideoFrame::empty();
                if self.decoder.receive_frame(&mut decoded).is_ok() {
                    self.scaler
                        .run(&decoded, &mut rgb_frame)
                        .map_err(|e| read_err(format!("pixel convert: {e}")))?;
                    found = true;
                    break;
                }
            }

            if !found {
                return Ok(None);
            }

            let (width, height) = (rgb_frame.width(), rgb_frame.height());
            let stride = rgb_frame.stride(0);
            let row_bytes = width as usize * 3;
            let data = rgb_frame.data(0);

            // Copy RGB data, stripping per-row padding if the stride > row width.
            let mut flat = Vec::with_capacity(row_bytes * height as usize);
            for row in 0..height as usize {
                let start = row * stride;
                let end = start + row_bytes;
                if end > data.len() {
                    return Err(read_err(format!(
                        "frame row {row} out of bounds (stride={stride}, data.len()={})",
                        data.len()
                    )));
                }
                flat.extend_from_slice(&data[start..end]);
            }

            Ok(Some(Frame::new(flat, width, height)))
        }
    }
}
