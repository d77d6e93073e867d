use super::VideoReader;
use anyhow::{anyhow, Result};
use image::RgbImage;
use opencv::{
    core::Mat,
    imgproc,
    prelude::*,
    videoio::{VideoCapture, CAP_ANY, CAP_PROP_FPS, CAP_PROP_FRAME_COUNT},
};
use std::path::Path;

pub struct OpencvReader {
    capture: VideoCapture,
    reported_fps: f64,
    reported_frames: f64,
}

impl OpencvReader {
    pub fn new(path: &Path) -> Result<Self> {
        let path_str = path
            .to_str()
            .ok_or_else(|| anyhow!("Non UTF-8 video path: {}", path.display()))?;
        let capture = VideoCapture::from_file(path_str, CAP_ANY)?;
        if !capture.is_opened()? {
            return Err(anyhow!("Failed to open video file: {}", path_str));
        }

        // Raw values; validity is decided by the timing normalizer.
        let reported_fps = capture.get(CAP_PROP_FPS)?;
        let reported_frames = capture.get(CAP_PROP_FRAME_COUNT)?;

        tracing::info!(
            "OpencvReader: opened {}, fps={:.2}, stream_frames={}",
            path_str,
            reported_fps,
            reported_frames
        );

        Ok(Self {
            capture,
            reported_fps,
            reported_frames,
        })
    }
}

/// Convert an OpenCV Mat (BGR) to an owned RGB image
fn mat_to_rgb_image(mat: &Mat) -> Result<RgbImage> {
    let mut rgb_mat = Mat::default();
    imgproc::cvt_color_def(mat, &mut rgb_mat, imgproc::COLOR_BGR2RGB)?;

    let size = rgb_mat.size()?;
    let width = size.width as u32;
    let height = size.height as u32;

    if !rgb_mat.is_continuous() {
        return Err(anyhow!("Mat is not continuous"));
    }

    let buffer = rgb_mat.data_bytes()?.to_vec();
    RgbImage::from_raw(width, height, buffer)
        .ok_or_else(|| anyhow!("Failed to create image from Mat data"))
}

impl VideoReader for OpencvReader {
    fn reported_fps(&self) -> Option<f64> {
        Some(self.reported_fps)
    }

    fn reported_frame_count(&self) -> Option<f64> {
        Some(self.reported_frames)
    }

    fn next_frame(&mut self) -> Result<Option<RgbImage>> {
        let mut frame = Mat::default();
        let success = self.capture.read(&mut frame)?;
        if !success || frame.empty() {
            return Ok(None);
        }
        mat_to_rgb_image(&frame).map(Some)
    }
}
