// Reader worker: decodes frames from a video source and sends them through a channel

use crate::video::{Frame, VideoSource};
use anyhow::Result;
use crossbeam::channel::Sender;

/// Decodes `source` in order and sends each frame to the next stage.
/// Returns the number of frames sent.
///
/// The reader is opened inside the calling thread. A decode error after the
/// first frame ends the stream early (truncated files are common); an error on
/// open is returned.
pub fn read_worker(
    tx: Sender<Frame>,
    source: &dyn VideoSource,
    fps: f64,
    max_frames: Option<usize>,
) -> Result<usize> {
    let mut reader = source.open()?;
    let limit = max_frames.unwrap_or(usize::MAX);

    let mut index = 0;
    while index < limit {
        let pixels = match reader.next_frame() {
            Ok(Some(pixels)) => pixels,
            Ok(None) => break,
            Err(e) if index > 0 => {
                tracing::warn!(
                    "Reader: decode error after {} frames of {}, stopping: {}",
                    index,
                    source.describe(),
                    e
                );
                break;
            }
            Err(e) => return Err(e),
        };

        let frame = Frame {
            index,
            timestamp_seconds: index as f64 / fps,
            pixels,
        };
        if tx.send(frame).is_err() {
            // Receiver closed
            break;
        }
        index += 1;
    }

    tracing::debug!("Reader worker finished after {} frames", index);
    Ok(index)
}
