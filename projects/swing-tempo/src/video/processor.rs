use crate::pipeline::reader::read_worker;
use crate::video::{Frame, VideoSource};
use anyhow::{anyhow, Result};
use crossbeam::channel;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::{Duration, Instant};

/// Frames in flight between the decoder thread and the processor.
const FRAME_QUEUE_DEPTH: usize = 2;

pub struct ProcessingStats {
    pub processed_frames: usize,
    pub duration: Duration,
}

/// A trait for handling video frames. This separates the "how to process"
/// from the "how to read and orchestrate" logic.
pub trait FrameProcessor {
    fn process(&mut self, frame: Frame) -> Result<()>;
}

/// Blanket implementation so any closure with the right signature
/// automatically implements FrameProcessor.
impl<F> FrameProcessor for F
where
    F: FnMut(Frame) -> Result<()>,
{
    fn process(&mut self, frame: Frame) -> Result<()> {
        self(frame)
    }
}

fn progress_bar(expected_frames: usize) -> Result<ProgressBar> {
    if expected_frames == 0 {
        return Ok(ProgressBar::new_spinner());
    }
    let pb = ProgressBar::new(expected_frames as u64);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({per_sec:.1.yellow} fps, {eta})")?
            .progress_chars("#>-"),
    );
    Ok(pb)
}

/// Decode `source` on a reader thread and feed every frame to `processor`
/// on the calling thread.
///
/// `expected_frames` only sizes the progress bar.
pub fn process_video<P>(
    source: &dyn VideoSource,
    fps: f64,
    expected_frames: usize,
    max_frames: Option<usize>,
    mut processor: P,
) -> Result<ProcessingStats>
where
    P: FrameProcessor,
{
    let start_time = Instant::now();
    let expected = max_frames.map_or(expected_frames, |m| m.min(expected_frames));
    let pb = progress_bar(expected)?;

    let (tx, rx) = channel::bounded::<Frame>(FRAME_QUEUE_DEPTH);

    let (processed_frames, process_result, read_result) = std::thread::scope(|scope| {
        let reader = scope.spawn(move || read_worker(tx, source, fps, max_frames));

        let mut processed_frames = 0;
        let mut process_result = Ok(());
        for frame in rx.iter() {
            if let Err(e) = processor.process(frame) {
                process_result = Err(e);
                break;
            }
            processed_frames += 1;
            pb.inc(1);
        }
        // Unblocks the reader if we stopped early.
        drop(rx);

        let read_result = reader
            .join()
            .unwrap_or_else(|_| Err(anyhow!("Reader thread panicked")));
        (processed_frames, process_result, read_result)
    });

    pb.finish_with_message("Done");
    read_result?;
    process_result?;

    Ok(ProcessingStats {
        processed_frames,
        duration: start_time.elapsed(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::video::synthetic::SyntheticSource;

    #[test]
    fn test_closure_sees_every_frame_in_order() {
        let source = SyntheticSource::new(45);
        let mut seen = Vec::new();
        let stats = process_video(&source, 30.0, 45, None, |frame: Frame| -> Result<()> {
            seen.push(frame.index);
            Ok(())
        })
        .unwrap();

        assert_eq!(stats.processed_frames, 45);
        assert_eq!(seen, (0..45).collect::<Vec<_>>());
    }

    #[test]
    fn test_processor_error_stops_pipeline() {
        let source = SyntheticSource::new(500);
        let mut calls = 0;
        let result = process_video(&source, 30.0, 500, None, |frame: Frame| -> Result<()> {
            calls += 1;
            if frame.index == 3 {
                anyhow::bail!("inference crashed");
            }
            Ok(())
        });
        assert!(result.is_err());
        assert_eq!(calls, 4);
    }

    #[test]
    fn test_open_failure_is_reported() {
        let mut source = SyntheticSource::new(10);
        source.unopenable = true;
        let result = process_video(&source, 30.0, 0, None, |_frame: Frame| -> Result<()> { Ok(()) });
        assert!(result.is_err());
    }
}
