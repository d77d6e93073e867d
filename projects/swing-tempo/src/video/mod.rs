#[cfg(feature = "ffmpeg")]
pub mod ffmpeg_reader;
#[cfg(feature = "opencv")]
pub mod opencv_reader;
pub mod processor;
pub mod timing;

use anyhow::Result;
use clap::ValueEnum;
use image::RgbImage;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// A decoded frame. Pixels are dropped once pose inference has seen them.
pub struct Frame {
    pub index: usize,
    pub timestamp_seconds: f64,
    pub pixels: RgbImage,
}

/// Sequential, once-only frame decoder.
///
/// Reported metadata is advisory; see [`timing::resolve_timing`].
pub trait VideoReader: Send {
    fn reported_fps(&self) -> Option<f64>;
    fn reported_frame_count(&self) -> Option<f64>;
    /// Next frame in decode order, `Ok(None)` at end of stream.
    fn next_frame(&mut self) -> Result<Option<RgbImage>>;
}

/// Something that can be (re)opened into a fresh [`VideoReader`].
pub trait VideoSource: Send + Sync {
    fn describe(&self) -> String;
    fn open(&self) -> Result<Box<dyn VideoReader>>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Backend {
    #[default]
    Ffmpeg,
    Opencv,
}

/// A video file on disk decoded with the selected backend.
#[derive(Debug, Clone)]
pub struct FileSource {
    pub path: PathBuf,
    pub backend: Backend,
}

impl FileSource {
    pub fn new(path: impl AsRef<Path>, backend: Backend) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
            backend,
        }
    }
}

impl VideoSource for FileSource {
    fn describe(&self) -> String {
        self.path.display().to_string()
    }

    fn open(&self) -> Result<Box<dyn VideoReader>> {
        if !self.path.exists() {
            anyhow::bail!("Video file not found: {}", self.path.display());
        }
        open_reader(&self.path, self.backend)
    }
}

fn open_reader(path: &Path, backend: Backend) -> Result<Box<dyn VideoReader>> {
    match backend {
        #[cfg(feature = "ffmpeg")]
        Backend::Ffmpeg => Ok(Box::new(ffmpeg_reader::FfmpegReader::new(path)?)),
        #[cfg(feature = "opencv")]
        Backend::Opencv => Ok(Box::new(opencv_reader::OpencvReader::new(path)?)),
        #[allow(unreachable_patterns)]
        other => anyhow::bail!(
            "backend {:?} is not compiled in (enable the `{}` feature) for {}",
            other,
            other.feature_name(),
            path.display()
        ),
    }
}

impl Backend {
    pub fn feature_name(self) -> &'static str {
        match self {
            Backend::Ffmpeg => "ffmpeg",
            Backend::Opencv => "opencv",
        }
    }
}

#[cfg(test)]
pub(crate) mod synthetic {
    //! In-memory decoder used by tests across the crate.

    use super::{VideoReader, VideoSource};
    use anyhow::{anyhow, Result};
    use image::RgbImage;

    #[derive(Debug, Clone)]
    pub struct SyntheticSource {
        pub frames: usize,
        pub reported_fps: Option<f64>,
        pub reported_frame_count: Option<f64>,
        /// Decoding fails when this frame index is reached.
        pub fail_at: Option<usize>,
        pub unopenable: bool,
    }

    impl SyntheticSource {
        pub fn new(frames: usize) -> Self {
            Self {
                frames,
                reported_fps: Some(30.0),
                reported_frame_count: Some(frames as f64),
                fail_at: None,
                unopenable: false,
            }
        }
    }

    struct SyntheticReader {
        source: SyntheticSource,
        position: usize,
    }

    impl VideoReader for SyntheticReader {
        fn reported_fps(&self) -> Option<f64> {
            self.source.reported_fps
        }

        fn reported_frame_count(&self) -> Option<f64> {
            self.source.reported_frame_count
        }

        fn next_frame(&mut self) -> Result<Option<RgbImage>> {
            if Some(self.position) == self.source.fail_at {
                return Err(anyhow!("corrupt packet at frame {}", self.position));
            }
            if self.position >= self.source.frames {
                return Ok(None);
            }
            self.position += 1;
            // Frame index encoded in the first pixel so tests can check ordering.
            let tag = (self.position - 1) as u8;
            Ok(Some(RgbImage::from_pixel(4, 4, image::Rgb([tag, 0, 0]))))
        }
    }

    impl VideoSource for SyntheticSource {
        fn describe(&self) -> String {
            format!("synthetic({} frames)", self.frames)
        }

        fn open(&self) -> Result<Box<dyn VideoReader>> {
            if self.unopenable {
                return Err(anyhow!("moov atom not found"));
            }
            Ok(Box::new(SyntheticReader {
                source: self.clone(),
                position: 0,
            }))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_missing_file_does_not_open() {
        let source = FileSource::new("/definitely/not/here.mp4", Backend::Ffmpeg);
        let err = source.open().err().expect("open should fail");
        assert!(err.to_string().contains("not found"));
    }
}
