use crate::pipeline::events::SwingEvents;
use crate::video::timing::VideoTiming;
use serde::Serialize;

/// Floor for the downswing duration; only guards the division.
pub const DOWNSWING_EPSILON: f64 = 1e-9;

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct TempoMetrics {
    pub backswing_s: f64,
    pub downswing_s: f64,
    pub ratio: f64,
}

/// Event timestamps in seconds from the start of the clip.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct EventTimes {
    pub address_s: f64,
    pub top_s: f64,
    pub impact_s: f64,
}

/// Backswing and downswing durations and their ratio. Ordering is not checked.
pub fn compute_tempo(address_t: f64, top_t: f64, impact_t: f64) -> TempoMetrics {
    let backswing_s = (top_t - address_t).max(0.0);
    let downswing_s = (impact_t - top_t).max(DOWNSWING_EPSILON);
    TempoMetrics {
        backswing_s,
        downswing_s,
        ratio: backswing_s / downswing_s,
    }
}

pub fn event_times(events: &SwingEvents, timing: &VideoTiming) -> EventTimes {
    EventTimes {
        address_s: timing.frame_to_secs(events.address_idx()),
        top_s: timing.frame_to_secs(events.top_idx()),
        impact_s: timing.frame_to_secs(events.impact_idx()),
    }
}

impl TempoMetrics {
    pub fn from_times(times: &EventTimes) -> Self {
        compute_tempo(times.address_s, times.top_s, times.impact_s)
    }

    pub fn from_events(events: &SwingEvents, timing: &VideoTiming) -> Self {
        Self::from_times(&event_times(events, timing))
    }
}
