//! Failure kinds surfaced by the analysis core.
//!
//! Metadata anomalies (bad fps, unknown frame counts) are not errors; they are
//! normalized in [`crate::video::timing`].

use thiserror::Error;

/// Minimum number of analyzed frames for event detection.
pub const MIN_SERIES_LEN: usize = 30;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TempoError {
    /// The video could not be opened or decoded at all.
    #[error("video unreadable: {source_name}: {reason}")]
    VideoUnreadable { source_name: String, reason: String },

    /// Too few frames to locate swing events.
    #[error("series too short for event detection: {len} samples (need at least {min})")]
    SeriesTooShort { len: usize, min: usize },

    /// The heuristic could not produce an ordered address < top < impact triple.
    #[error("could not detect a valid swing sequence: {0}")]
    InvalidSwingSequence(String),
}

impl TempoError {
    pub fn video_unreadable(source_name: impl Into<String>, reason: impl ToString) -> Self {
        Self::VideoUnreadable {
            source_name: source_name.into(),
            reason: reason.to_string(),
        }
    }

    pub fn invalid_sequence(reason: impl Into<String>) -> Self {
        Self::InvalidSwingSequence(reason.into())
    }
}

pub type Result<T> = std::result::Result<T, TempoError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds_stay_inspectable_through_anyhow() {
        let err: anyhow::Error = TempoError::SeriesTooShort { len: 12, min: 30 }.into();
        match err.downcast_ref::<TempoError>() {
            Some(TempoError::SeriesTooShort { len, min }) => {
                assert_eq!(*len, 12);
                assert_eq!(*min, MIN_SERIES_LEN);
            }
            other => panic!("unexpected error kind: {:?}", other),
        }
    }

    #[test]
    fn test_error_messages() {
        let err = TempoError::video_unreadable("swing.mp4", "no video stream");
        assert_eq!(err.to_string(), "video unreadable: swing.mp4: no video stream");

        let err = TempoError::invalid_sequence("top not before impact");
        assert!(err.to_string().contains("top not before impact"));
    }
}
