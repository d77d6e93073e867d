use super::VideoReader;
use anyhow::{anyhow, Context, Result};
use image::RgbImage;
use std::path::Path;

use ffmpeg_next::ffi;

/// Sequential video reader backed by FFmpeg via ffmpeg-next.
/// Decodes on the CPU and converts every frame to RGB24.
pub struct FfmpegReader {
    input_ctx: ffmpeg_next::format::context::Input,
    decoder: ffmpeg_next::codec::decoder::Video,
    video_stream_index: usize,
    /// Lazily created on first frame (source format is only known then).
    scaler: Option<ffmpeg_next::software::scaling::Context>,
    width: u32,
    height: u32,
    reported_fps: Option<f64>,
    reported_frames: Option<f64>,
    /// Persistent packet object to avoid allocations.
    reuse_packet: ffmpeg_next::codec::packet::Packet,
    /// Whether we've sent EOF to the decoder.
    eof_sent: bool,
    finished: bool,
}

// SAFETY: FfmpegReader is owned by exactly one thread at a time (it is created
// inside the reader thread). The raw pointers inside ffmpeg-next types are not shared.
unsafe impl Send for FfmpegReader {}

impl FfmpegReader {
    pub fn new(path: &Path) -> Result<Self> {
        ffmpeg_next::init().context("Failed to initialize FFmpeg")?;

        let input_ctx = ffmpeg_next::format::input(&path)
            .with_context(|| format!("Failed to open video file {}", path.display()))?;

        let video_stream = input_ctx
            .streams()
            .best(ffmpeg_next::media::Type::Video)
            .ok_or_else(|| anyhow!("No video stream found in {}", path.display()))?;

        let video_stream_index = video_stream.index();

        let rational_fps = video_stream.avg_frame_rate();
        let reported_fps = rational_to_fps(rational_fps.numerator(), rational_fps.denominator());

        // 0 means the muxer did not record it.
        let stream_frames = video_stream.frames();
        let reported_frames = (stream_frames > 0).then_some(stream_frames as f64);
        let duration_secs = input_ctx.duration() as f64 / ffi::AV_TIME_BASE as f64;

        tracing::info!(
            "FfmpegReader: opened {}, duration={:.2}s, fps={:?}, stream_frames={}",
            path.display(),
            duration_secs,
            reported_fps,
            stream_frames
        );

        let decoder_ctx =
            ffmpeg_next::codec::context::Context::from_parameters(video_stream.parameters())
                .context("Failed to create decoder context")?;

        let decoder = decoder_ctx
            .decoder()
            .video()
            .context("Failed to open video decoder")?;

        let width = decoder.width();
        let height = decoder.height();
        tracing::debug!("FfmpegReader: software decoding ({}x{})", width, height);

        Ok(Self {
            input_ctx,
            decoder,
            video_stream_index,
            scaler: None,
            width,
            height,
            reported_fps,
            reported_frames,
            reuse_packet: ffmpeg_next::codec::packet::Packet::empty(),
            eof_sent: false,
            finished: false,
        })
    }

    /// Retrieve the next decoded frame. `Ok(false)` once the stream is drained.
    fn decode_loop(&mut self, target_frame: &mut ffmpeg_next::util::frame::Video) -> Result<bool> {
        loop {
            // 1. Try to receive a decoded frame
            match self.decoder.receive_frame(target_frame) {
                Ok(()) => return Ok(true),
                Err(ffmpeg_next::Error::Other { errno: ffi::EAGAIN }) => {
                    if self.eof_sent {
                        return Ok(false);
                    }
                }
                Err(ffmpeg_next::Error::Eof) => return Ok(false),
                Err(e) => return Err(anyhow!("Decoder error: {}", e)),
            }

            // 2. Feed packets until we find a video packet OR reach EOF
            let mut found_packet = false;
            while self.reuse_packet.read(&mut self.input_ctx).is_ok() {
                if self.reuse_packet.stream() == self.video_stream_index {
                    self.decoder
                        .send_packet(&self.reuse_packet)
                        .context("Failed to send packet to decoder")?;
                    found_packet = true;
                    break;
                }
            }

            if !found_packet {
                // End of input, flush the decoder and drain what is left
                self.decoder
                    .send_eof()
                    .context("Failed to send EOF to decoder")?;
                self.eof_sent = true;
            }
        }
    }

    fn get_or_create_scaler(
        &mut self,
        src_format: ffmpeg_next::format::Pixel,
    ) -> Result<&mut ffmpeg_next::software::scaling::Context> {
        if self.scaler.is_none() {
            let scaler = ffmpeg_next::software::scaling::Context::get(
                src_format,
                self.width,
                self.height,
                ffmpeg_next::format::Pixel::RGB24,
                self.width,
                self.height,
                ffmpeg_next::software::scaling::Flags::BILINEAR,
            )
            .context("Failed to create scaler")?;
            self.scaler = Some(scaler);
        }
        self.scaler
            .as_mut()
            .ok_or_else(|| anyhow!("Scaler unavailable"))
    }
}

/// Copy an RGB24 ffmpeg frame into an owned image, dropping row padding.
/// Stream frame rate, `None` unless both parts of the rational are positive.
fn rational_to_fps(numerator: i32, denominator: i32) -> Option<f64> {
    (numerator > 0 && denominator > 0).then(|| numerator as f64 / denominator as f64)
}

fn rgb_frame_to_image(frame: &ffmpeg_next::util::frame::Video) -> Result<RgbImage> {
    let width = frame.width();
    let height = frame.height();
    let data = frame.data(0);
    let stride = frame.stride(0);
    let row_bytes = width as usize * 3;

    let mut buffer = Vec::with_capacity(row_bytes * height as usize);
    for y in 0..height as usize {
        let src_offset = y * stride;
        buffer.extend_from_slice(&data[src_offset..src_offset + row_bytes]);
    }

    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| anyhow!("Failed to create image from {}x{} frame", width, height))
}

impl VideoReader for FfmpegReader {
    fn reported_fps(&self) -> Option<f64> {
        self.reported_fps
    }

    fn reported_frame_count(&self) -> Option<f64> {
        self.reported_frames
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        if self.finished {
            return Ok(None);
        }

        let mut raw_frame = ffmpeg_next::util::frame::Video::empty();
        if !self.decode_loop(&mut raw_frame)? {
            self.finished = true;
            return Ok(None);
        }

        let scaler = self.get_or_create_scaler(raw_frame.format())?;
        let mut rgb_frame = ffmpeg_next::util::frame::Video::empty();
        scaler
            .run(&raw_frame, &mut rgb_frame)
            .context("Scaler failed")?;

        rgb_frame_to_image(&rgb_frame).map(Some)
    }
}
