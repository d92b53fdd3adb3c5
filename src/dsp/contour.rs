use super::pitch::PitchFrame;

/// Find consecutive runs of voiced frames in a pitch contour.
/// Returns a list of (start_index, end_index) pairs (inclusive).
///
/// Used by several other modules:
/// - maximum phonation time takes the longest run
/// - voice break detection looks for gaps between runs
/// - jitter/shimmer quotients need consecutive voiced frames, since a
///   perturbation cannot be measured across an unvoiced gap
pub fn voiced_runs(frames: &[PitchFrame]) -> Vec<(usize, usize)> {
    let mut runs = Vec::new();
    let mut start = None;

    for (i, frame) in frames.iter().enumerate() {
        match (frame.frequency.is_some(), start) {
            (true, None) => start = Some(i),
            (true, Some(_)) => {}
            (false, Some(s)) => {
                runs.push((s, i - 1));
                start = None;
            }
            (false, None) => {}
        }
    }

    if let Some(s) = start {
        runs.push((s, frames.len() - 1));
    }

    runs
}

/// Duration of a run in seconds, given the hop size.
pub fn run_duration_secs(start: usize, end: usize, hop_ms: f32) -> f32 {
    (end - start + 1) as f32 * hop_ms / 1000.0
}

/// Percentile value from a sorted slice.
/// `p` is in [0.0, 1.0] — e.g., 0.30 for the 30th percentile.
/// Returns 0.0 for an empty slice.
pub fn percentile(sorted: &[f32], p: f32) -> f32 {
    if sorted.is_empty() {
        return 0.0;
    }
    let idx = (p * (sorted.len() - 1) as f32).round() as usize;
    sorted[idx.min(sorted.len() - 1)]
}

/// Mean and standard deviation (population) of a slice.
/// Returns (0.0, 0.0) for an empty slice.
pub fn mean_std(values: &[f32]) -> (f32, f32) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let mean = values.iter().sum::<f32>() / values.len() as f32;
    let variance =
        values.iter().map(|&v| (v - mean).powi(2)).sum::<f32>() / values.len() as f32;
    (mean, variance.sqrt())
}
