use std::path::Path;

use crate::shared::frame::Frame;
use crate::shared::video_metadata::VideoMetadata;
use crate::video::domain::frame_source::FrameSource;

/// `AV_TIME_BASE`: container-level seek timestamps are in microseconds.
const CONTAINER_TIME_BASE: f64 = 1_000_000.0;

/// Seeks and decodes individual frames via ffmpeg-next.
///
/// Each `read_frame` seeks to the nearest keyframe at or before the target,
/// then decodes forward until the presentation timestamp reaches the target
/// index. Decoded frames are converted to packed RGB24.
pub struct FfmpegFrameSource {
    open: Option<OpenVideo>,
}

struct OpenVideo {
    ictx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::decoder::Video,
    scaler: ffmpeg_next::software::scaling::Context,
    stream_index: usize,
    time_base: f64,
    start_pts: i64,
    fps: f64,
    width: u32,
    height: u32,
}

// Safety: FfmpegFrameSource is owned by a single pipeline run and only used
// from one thread at a time. The raw pointers inside ffmpeg types are never
// shared.
unsafe impl Send for FfmpegFrameSource {}

impl FfmpegFrameSource {
    pub fn new() -> Self {
        Self { open: None }
    }
}

impl Default for FfmpegFrameSource {
    fn default() -> Self {
        Self::new()
    }
}

impl FrameSource for FfmpegFrameSource {
    fn open(&mut self, path: &Path) -> Result<VideoMetadata, Box<dyn std::error::Error>> {
        ffmpeg_next::init()?;
        self.close();

        let ictx = ffmpeg_next::format::input(path)?;
        let container_seconds = if ictx.duration() > 0 {
            ictx.duration() as f64 / CONTAINER_TIME_BASE
        } else {
            0.0
        };

        let stream = ictx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or("No video stream found")?;

        let stream_index = stream.index();
        let decoder = ffmpeg_next::codec::context::Context::from_parameters(stream.parameters())?
            .decoder()
            .video()?;

        let fps = rational_to_f64(stream.avg_frame_rate())
            .filter(|r| *r > 0.0)
            .or_else(|| rational_to_f64(stream.rate()).filter(|r| *r > 0.0))
            .ok_or("Video stream has no usable frame rate")?;
        let time_base = rational_to_f64(stream.time_base()).unwrap_or(0.0);
        let start_pts = match stream.start_time() {
            i64::MIN => 0,
            pts => pts,
        };

        let total_frames = if stream.frames() > 0 {
            stream.frames() as usize
        } else if stream.duration() > 0 && time_base > 0.0 {
            (stream.duration() as f64 * time_base * fps).round() as usize
        } else {
            (container_seconds * fps).round() as usize
        };

        let width = decoder.width();
        let height = decoder.height();
        let codec = decoder
            .codec()
            .map(|c| c.name().to_string())
            .unwrap_or_default();

        let scaler = ffmpeg_next::software::scaling::Context::get(
            decoder.format(),
            width,
            height,
            ffmpeg_next::format::Pixel::RGB24,
            width,
            height,
            ffmpeg_next::software::scaling::Flags::BILINEAR,
        )?;

        self.open = Some(OpenVideo {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            start_pts,
            fps,
            width,
            height,
        });

        Ok(VideoMetadata {
            width,
            height,
            fps,
            total_frames,
            codec,
            source_path: Some(path.to_path_buf()),
        })
    }

    fn read_frame(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let open = self.open.as_mut().ok_or("FfmpegFrameSource: not opened")?;
        open.seek_to(index)?;
        open.decode_until(index)
    }

    fn close(&mut self) {
        self.open = None;
    }
}

impl OpenVideo {
    fn seek_to(&mut self, index: usize) -> Result<(), ffmpeg_next::Error> {
        let target = (index as f64 / self.fps * CONTAINER_TIME_BASE) as i64;
        self.ictx.seek(target, ..target)?;
        self.decoder.flush();
        Ok(())
    }

    fn decode_until(&mut self, index: usize) -> Result<Option<Frame>, Box<dyn std::error::Error>> {
        let OpenVideo {
            ictx,
            decoder,
            scaler,
            stream_index,
            time_base,
            start_pts,
            fps,
            width,
            height,
        } = self;
        let locate = |pts: i64| ((pts - *start_pts) as f64 * *time_base * *fps).round() as i64;

        let mut decoded = ffmpeg_next::util::frame::video::Video::empty();
        for (stream, packet) in ictx.packets() {
            if stream.index() != *stream_index {
                continue;
            }
            if decoder.send_packet(&packet).is_err() {
                continue;
            }
            while decoder.receive_frame(&mut decoded).is_ok() {
                if reached(&decoded, index, &locate) {
                    return convert(scaler, &decoded, *width, *height, index).map(Some);
                }
            }
        }

        let _ = decoder.send_eof();
        while decoder.receive_frame(&mut decoded).is_ok() {
            if reached(&decoded, index, &locate) {
                return convert(scaler, &decoded, *width, *height, index).map(Some);
            }
        }
        Ok(None)
    }
}

/// Whether a decoded frame is at or past the target index. Frames without
/// any timestamp are accepted as-is.
fn reached(
    decoded: &ffmpeg_next::util::frame::video::Video,
    index: usize,
    locate: &impl Fn(i64) -> i64,
) -> bool {
    match decoded.timestamp().or_else(|| decoded.pts()) {
        Some(pts) => locate(pts) >= index as i64,
        None => true,
    }
}

fn convert(
    scaler: &mut ffmpeg_next::software::scaling::Context,
    decoded: &ffmpeg_next::util::frame::video::Video,
    width: u32,
    height: u32,
    index: usize,
) -> Result<Frame, Box<dyn std::error::Error>> {
    let mut rgb = ffmpeg_next::util::frame::video::Video::empty();
    scaler.run(decoded, &mut rgb)?;
    Ok(Frame::new(packed_rgb(&rgb, width, height), width, height, index))
}

fn rational_to_f64(r: ffmpeg_next::Rational) -> Option<f64> {
    if r.denominator() == 0 {
        None
    } else {
        Some(r.numerator() as f64 / r.denominator() as f64)
    }
}

/// Strips per-row padding (stride > width * 3) from an RGB24 ffmpeg frame.
fn packed_rgb(rgb: &ffmpeg_next::util::frame::video::Video, width: u32, height: u32) -> Vec<u8> {
    let stride = rgb.stride(0);
    let data = rgb.data(0);
    let row_len = width as usize * 3;

    let mut pixels = Vec::with_capacity(row_len * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        pixels.extend_from_slice(&data[start..start + row_len]);
    }
    pixels
}
