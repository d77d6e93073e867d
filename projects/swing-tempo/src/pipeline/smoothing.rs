//! Gap filling and moving-average smoothing for landmark series.

use crate::pipeline::series::Series;

pub const DEFAULT_SMOOTHING_WINDOW: usize = 9;

/// Effective moving-average width: odd, at least 3.
pub fn effective_window(window: usize) -> usize {
    (window | 1).max(3)
}

/// Fill gaps, then apply a centered moving average of `window` samples.
///
/// An all-missing series comes back unchanged. Otherwise the result has the
/// same length and no missing values.
pub fn smooth(series: &Series, window: usize) -> Series {
    match fill_gaps(series) {
        Some(filled) => Series::from_values(&moving_average(&filled, window)),
        None => series.clone(),
    }
}

/// Edge-extend leading/trailing gaps and linearly interpolate interior ones.
/// `None` when there is no valid sample at all.
pub fn fill_gaps(series: &Series) -> Option<Vec<f64>> {
    let values = series.as_slice();
    let valid: Vec<usize> = values
        .iter()
        .enumerate()
        .filter_map(|(i, v)| v.map(|_| i))
        .collect();

    let (&first, &last) = (valid.first()?, valid.last()?);
    let mut out: Vec<f64> = values.iter().map(|v| v.unwrap_or(f64::NAN)).collect();

    let first_value = out[first];
    out[..first].fill(first_value);
    let last_value = out[last];
    out[last + 1..].fill(last_value);

    for pair in valid.windows(2) {
        let (a, b) = (pair[0], pair[1]);
        if b - a > 1 {
            let (ya, yb) = (out[a], out[b]);
            let span = (b - a) as f64;
            for (offset, slot) in out[a + 1..b].iter_mut().enumerate() {
                let t = (offset + 1) as f64 / span;
                *slot = ya + (yb - ya) * t;
            }
        }
    }

    Some(out)
}

/// Centered moving average with edge-replication padding; output length equals input length.
pub fn moving_average(values: &[f64], window: usize) -> Vec<f64> {
    if values.is_empty() {
        return Vec::new();
    }
    let k = effective_window(window);
    let pad = k / 2;
    let n = values.len();
    let at = |i: isize| -> f64 { values[i.clamp(0, n as isize - 1) as usize] };

    (0..n as isize)
        .map(|center| {
            let sum: f64 = (center - pad as isize..=center + pad as isize)
                .map(at)
                .sum();
            sum / k as f64
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn close(a: &[f64], b: &[f64]) -> bool {
        a.len() == b.len() && a.iter().zip(b).all(|(x, y)| (x - y).abs() < 1e-9)
    }

    #[test]
    fn test_effective_window() {
        assert_eq!(effective_window(0), 3);
        assert_eq!(effective_window(1), 3);
        assert_eq!(effective_window(3), 3);
        assert_eq!(effective_window(4), 5);
        assert_eq!(effective_window(7), 7);
        assert_eq!(effective_window(8), 9);
    }

    #[test]
    fn test_fill_gaps_edges_and_interior() {
        let series = Series::new(vec![None, None, Some(1.0), None, None, Some(4.0), None]);
        let filled = fill_gaps(&series).unwrap();
        assert!(close(&filled, &[1.0, 1.0, 1.0, 2.0, 3.0, 4.0, 4.0]));
    }

    #[test]
    fn test_fill_gaps_single_valid_value() {
        let series = Series::new(vec![None, Some(0.3), None, None]);
        let filled = fill_gaps(&series).unwrap();
        assert!(close(&filled, &[0.3, 0.3, 0.3, 0.3]));
    }

    #[test]
    fn test_all_missing_is_returned_unchanged() {
        let series = Series::new(vec![None; 40]);
        assert!(fill_gaps(&series).is_none());
        assert_eq!(smooth(&series, 9), series);
        assert_eq!(smooth(&Series::default(), 9), Series::default());
    }

    #[test]
    fn test_moving_average_edge_padding() {
        // k = 3, padded [1, 1, 2, 3, 3]
        let out = moving_average(&[1.0, 2.0, 3.0], 3);
        assert!(close(&out, &[4.0 / 3.0, 2.0, 8.0 / 3.0]));
    }

    #[test]
    fn test_moving_average_window_larger_than_series() {
        let out = moving_average(&[0.0, 1.0], 9);
        assert_eq!(out.len(), 2);
        // padded: [0,0,0,0,0,1,1,1,1,1]
        assert!(close(&out, &[4.0 / 9.0, 5.0 / 9.0]));
    }

    #[test]
    fn test_single_frame_spike_is_damped() {
        let mut values = vec![0.5; 21];
        values[10] = 0.95;
        let smoothed = smooth(&Series::from_values(&values), 9).dense().unwrap();
        assert!(smoothed[10] < 0.56);
        assert!((smoothed[0] - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_constant_series_is_fixed_point() {
        let values = vec![0.42; 35];
        let smoothed = smooth(&Series::from_values(&values), 7).dense().unwrap();
        assert!(close(&smoothed, &values));
    }

    proptest! {
        #[test]
        fn prop_smoothing_preserves_length_and_stays_gap_free(
            values in proptest::collection::vec(proptest::option::weighted(0.7, 0.0f64..1.0), 1..120),
            window in 0usize..15,
        ) {
            let series = Series::new(values);
            let once = smooth(&series, window);
            prop_assert_eq!(once.len(), series.len());

            if series.missing_count() == series.len() {
                prop_assert_eq!(&once, &series);
            } else {
                prop_assert!(once.is_gap_free());
                let twice = smooth(&once, window);
                prop_assert_eq!(twice.len(), series.len());
                prop_assert!(twice.is_gap_free());
            }
        }

        #[test]
        fn prop_smoothed_values_stay_within_input_range(
            values in proptest::collection::vec(0.0f64..1.0, 1..80),
            window in 3usize..12,
        ) {
            let lo = values.iter().cloned().fold(f64::INFINITY, f64::min);
            let hi = values.iter().cloned().fold(f64::NEG_INFINITY, f64::max);
            for v in moving_average(&values, window) {
                prop_assert!(v >= lo - 1e-12 && v <= hi + 1e-12);
            }
        }
    }
}
