//! Address / Top / Impact detection over a smoothed landmark series.
//!
//! The series is the tracked point's vertical position with 0 at the image
//! top, so the top of the backswing is the series minimum.

use crate::error::{Result, TempoError, MIN_SERIES_LEN};
use crate::pipeline::series::Series;
use serde::Serialize;

pub const DEFAULT_IMPACT_TOLERANCE: f64 = 0.03;

/// Address is searched in the first `max(10, 15%)` samples.
const ADDRESS_WINDOW_FRAC: f64 = 0.15;
const ADDRESS_WINDOW_MIN: usize = 10;
/// Top is searched in `[address + 5, max(address + 15, 70%))`.
const TOP_SEARCH_OFFSET: usize = 5;
const TOP_WINDOW_MIN_SPAN: usize = 15;
const TOP_WINDOW_FRAC: f64 = 0.70;
/// Impact scan starts this many samples after top.
const IMPACT_SEARCH_OFFSET: usize = 5;
/// Fallback impact is searched in the last 10% of the clip.
const IMPACT_FALLBACK_FRAC: f64 = 0.90;

#[derive(Debug, Clone, Copy)]
pub struct EventConfig {
    /// Absolute distance from the address height that counts as "returned".
    pub impact_tolerance: f64,
}

impl Default for EventConfig {
    fn default() -> Self {
        Self {
            impact_tolerance: DEFAULT_IMPACT_TOLERANCE,
        }
    }
}

/// Validated swing event frame indices.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct SwingEvents {
    address_idx: usize,
    top_idx: usize,
    impact_idx: usize,
}

impl SwingEvents {
    /// Fails unless `address < top < impact < series_len`.
    pub fn new(
        address_idx: usize,
        top_idx: usize,
        impact_idx: usize,
        series_len: usize,
    ) -> Result<Self> {
        if !(address_idx < top_idx && top_idx < impact_idx) {
            return Err(TempoError::invalid_sequence(format!(
                "expected address < top < impact, got address={}, top={}, impact={}",
                address_idx, top_idx, impact_idx
            )));
        }
        if impact_idx >= series_len {
            return Err(TempoError::invalid_sequence(format!(
                "impact {} outside series of length {}",
                impact_idx, series_len
            )));
        }
        Ok(Self {
            address_idx,
            top_idx,
            impact_idx,
        })
    }

    pub fn address_idx(&self) -> usize {
        self.address_idx
    }

    pub fn top_idx(&self) -> usize {
        self.top_idx
    }

    pub fn impact_idx(&self) -> usize {
        self.impact_idx
    }
}

pub fn detect_events(series: &Series, config: &EventConfig) -> Result<SwingEvents> {
    let n = series.len();
    if n < MIN_SERIES_LEN {
        return Err(TempoError::SeriesTooShort {
            len: n,
            min: MIN_SERIES_LEN,
        });
    }

    let y = series.dense().ok_or_else(|| {
        TempoError::invalid_sequence(format!(
            "{} of {} samples have no landmark",
            series.missing_count(),
            n
        ))
    })?;

    // Stage 1: address, the calmest frame of the setup
    let address_end = ADDRESS_WINDOW_MIN
        .max(frac_index(n, ADDRESS_WINDOW_FRAC))
        .min(n);
    let address_idx = least_motion(&y[..address_end]).ok_or_else(|| {
        TempoError::invalid_sequence("empty address window")
    })?;

    // Stage 2: top, the highest point of the tracked landmark
    let top_start = address_idx + TOP_SEARCH_OFFSET;
    let top_end = (address_idx + TOP_WINDOW_MIN_SPAN)
        .max(frac_index(n, TOP_WINDOW_FRAC))
        .min(n);
    if top_start >= top_end {
        return Err(TempoError::invalid_sequence(format!(
            "empty top window [{}, {})",
            top_start, top_end
        )));
    }
    let top_idx = top_start + first_argmin(&y[top_start..top_end]);

    // Stage 3: impact, the first return to address height
    let address_y = y[address_idx];
    let impact_idx = (top_idx + IMPACT_SEARCH_OFFSET..n)
        .find(|&i| (y[i] - address_y).abs() <= config.impact_tolerance)
        .or_else(|| {
            let tail_start = frac_index(n, IMPACT_FALLBACK_FRAC);
            let idx = least_motion(&y[tail_start..]).map(|i| i + tail_start);
            tracing::debug!(
                "no return to address height within {:.3}, falling back to calmest tail frame {:?}",
                config.impact_tolerance,
                idx
            );
            idx
        })
        .ok_or_else(|| TempoError::invalid_sequence("empty impact window"))?;

    let events = SwingEvents::new(address_idx, top_idx, impact_idx, n)?;
    tracing::debug!(
        "swing events: address={}, top={}, impact={} (n={})",
        address_idx,
        top_idx,
        impact_idx,
        n
    );
    Ok(events)
}

fn frac_index(n: usize, frac: f64) -> usize {
    (frac * n as f64) as usize
}

/// Discrete derivative: central differences inside, one-sided at the ends.
fn gradient(values: &[f64]) -> Vec<f64> {
    let n = values.len();
    match n {
        0 => Vec::new(),
        1 => vec![0.0],
        _ => (0..n)
            .map(|i| {
                if i == 0 {
                    values[1] - values[0]
                } else if i == n - 1 {
                    values[n - 1] - values[n - 2]
                } else {
                    (values[i + 1] - values[i - 1]) / 2.0
                }
            })
            .collect(),
    }
}

/// Index of the smallest absolute derivative (first on ties).
fn least_motion(values: &[f64]) -> Option<usize> {
    if values.is_empty() {
        return None;
    }
    let speed: Vec<f64> = gradient(values).into_iter().map(f64::abs).collect();
    Some(first_argmin(&speed))
}

fn first_argmin(values: &[f64]) -> usize {
    let mut best = 0;
    for (i, &v) in values.iter().enumerate().skip(1) {
        if v < values[best] {
            best = i;
        }
    }
    best
}
