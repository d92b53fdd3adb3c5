use super::contour;
use super::pitch::PitchFrame;

/// Jitter measures cycle-to-cycle variation of the pitch period T = 1/F0.
/// All quotients here work on runs of consecutive voiced frames — an
/// unvoiced gap breaks the chain, because perturbation cannot be measured
/// across it.
///
/// Collect the pitch periods of each voiced run, in seconds.
/// Runs shorter than 2 frames carry no perturbation information and are
/// dropped.
fn period_runs(frames: &[PitchFrame]) -> Vec<Vec<f32>> {
    contour::voiced_runs(frames)
        .into_iter()
        .filter(|&(s, e)| e - s + 1 >= 2)
        .map(|(s, e)| {
            frames[s..=e]
                .iter()
                .filter_map(|f| f.frequency)
                .map(|f0| 1.0 / f0)
                .collect()
        })
        .collect()
}

fn mean_period(runs: &[Vec<f32>]) -> Option<f32> {
    let count: usize = runs.iter().map(|r| r.len()).sum();
    if count == 0 {
        return None;
    }
    let sum: f32 = runs.iter().flatten().sum();
    let mean = sum / count as f32;
    (mean > 0.0).then_some(mean)
}

/// Mean absolute difference of consecutive pitch periods, milliseconds.
pub fn jitter_absolute_ms(frames: &[PitchFrame]) -> Option<f32> {
    let runs = period_runs(frames);
    let mut diffs: Vec<f32> = Vec::new();
    for run in &runs {
        for pair in run.windows(2) {
            diffs.push((pair[1] - pair[0]).abs());
        }
    }
    if diffs.is_empty() {
        return None;
    }
    Some(diffs.iter().sum::<f32>() / diffs.len() as f32 * 1000.0)
}

/// Local (relative) jitter: mean absolute consecutive period difference
/// divided by the mean period, as a percentage.
///
/// Clinical reference (Praat): normal voices stay below ~1.04%.
pub fn jitter_percent(frames: &[PitchFrame]) -> Option<f32> {
    let runs = period_runs(frames);
    let mean = mean_period(&runs)?;

    let mut diffs: Vec<f32> = Vec::new();
    for run in &runs {
        for pair in run.windows(2) {
            diffs.push((pair[1] - pair[0]).abs());
        }
    }
    if diffs.is_empty() {
        return None;
    }

    let mean_diff = diffs.iter().sum::<f32>() / diffs.len() as f32;
    Some(mean_diff / mean * 100.0)
}

/// Relative average perturbation: deviation of each period from the
/// three-point local mean, divided by the mean period, as a percentage.
pub fn jitter_rap_percent(frames: &[PitchFrame]) -> Option<f32> {
    smoothed_quotient(frames, 3)
}

/// Five-point period perturbation quotient. Requires at least one run
/// of 5 consecutive voiced frames.
pub fn jitter_ppq5_percent(frames: &[PitchFrame]) -> Option<f32> {
    smoothed_quotient(frames, 5)
}

/// Shared k-point smoothed perturbation quotient:
/// mean |T(i) - mean(T(i-w)..T(i+w))| / mean(T) * 100, w = (k-1)/2.
fn smoothed_quotient(frames: &[PitchFrame], k: usize) -> Option<f32> {
    let runs = period_runs(frames);
    let mean = mean_period(&runs)?;
    let half = k / 2;

    let mut deviations: Vec<f32> = Vec::new();
    for run in &runs {
        if run.len() < k {
            continue;
        }
        for i in half..run.len() - half {
            let window = &run[i - half..=i + half];
            let local_mean = window.iter().sum::<f32>() / k as f32;
            deviations.push((run[i] - local_mean).abs());
        }
    }

    if deviations.is_empty() {
        return None;
    }

    let mean_dev = deviations.iter().sum::<f32>() / deviations.len() as f32;
    Some(mean_dev / mean * 100.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn frame(time: f32, freq: Option<f32>) -> PitchFrame {
        PitchFrame {
            time,
            frequency: freq,
        }
    }

    fn constant_contour(f0: f32, n: usize) -> Vec<PitchFrame> {
        (0..n).map(|i| frame(i as f32 * 0.01, Some(f0))).collect()
    }

    #[test]
    fn perfect_signal_zero_jitter() {
        let frames = constant_contour(100.0, 50);
        let jitter = jitter_percent(&frames).unwrap();
        assert!(
            jitter < 0.001,
            "Perfect signal should have ~0% jitter, got {jitter:.4}%"
        );
        assert!(jitter_rap_percent(&frames).unwrap() < 0.001);
        assert!(jitter_ppq5_percent(&frames).unwrap() < 0.001);
    }

    #[test]
    fn known_alternating_jitter() {
        // Alternating 100/110 Hz: periods 0.01 and 0.00909
        // |diff| = 0.000909 each pair, mean period ~0.009545
        // jitter ~9.5%
        let frames: Vec<_> = (0..20)
            .map(|i| {
                let f0 = if i % 2 == 0 { 100.0 } else { 110.0 };
                frame(i as f32 * 0.01, Some(f0))
            })
            .collect();

        let jitter = jitter_percent(&frames).unwrap();
        assert!((jitter - 9.5).abs() < 1.0, "Expected ~9.5%, got {jitter:.2}%");
    }

    #[test]
    fn jitter_monotone_in_perturbation() {
        // Injected period perturbation of increasing spread must never
        // decrease measured jitter. Same deterministic noise sequence,
        // scaled by sigma.
        let mut state: u32 = 7;
        let noise: Vec<f32> = (0..200)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                (state as f32 / u32::MAX as f32) * 2.0 - 1.0
            })
            .collect();

        let mut last = 0.0f32;
        for sigma in [0.0f32, 0.005, 0.01, 0.02, 0.04] {
            let frames: Vec<_> = noise
                .iter()
                .enumerate()
                .map(|(i, &n)| frame(i as f32 * 0.01, Some(120.0 * (1.0 + sigma * n))))
                .collect();
            let jitter = jitter_percent(&frames).unwrap();
            assert!(
                jitter >= last,
                "jitter must not decrease with sigma: {jitter:.3}% after {last:.3}%"
            );
            last = jitter;
        }
    }

    #[test]
    fn absolute_jitter_in_ms() {
        // Alternating 100/110 Hz: |diff| ~0.909 ms each pair
        let frames: Vec<_> = (0..20)
            .map(|i| {
                let f0 = if i % 2 == 0 { 100.0 } else { 110.0 };
                frame(i as f32 * 0.01, Some(f0))
            })
            .collect();
        let abs_ms = jitter_absolute_ms(&frames).unwrap();
        assert!((abs_ms - 0.909).abs() < 0.05, "got {abs_ms:.3} ms");
    }

    #[test]
    fn gap_breaks_chain() {
        let frames = vec![
            frame(0.0, Some(100.0)),
            frame(0.01, Some(100.0)),
            frame(0.02, None),
            frame(0.03, Some(200.0)), // different pitch, but gap breaks the chain
            frame(0.04, Some(200.0)),
        ];
        let jitter = jitter_percent(&frames).unwrap();
        assert!(jitter < 0.001, "gap must break the chain, got {jitter:.4}%");
    }

    #[test]
    fn ppq5_needs_five_consecutive() {
        // Runs of 4 voiced frames: local jitter works, PPQ5 does not
        let mut frames = Vec::new();
        for block in 0..5 {
            for i in 0..4 {
                frames.push(frame((block * 5 + i) as f32 * 0.01, Some(100.0)));
            }
            frames.push(frame((block * 5 + 4) as f32 * 0.01, None));
        }
        assert!(jitter_percent(&frames).is_some());
        assert!(jitter_ppq5_percent(&frames).is_none());
    }

    #[test]
    fn too_few_frames() {
        let frames = vec![frame(0.0, Some(100.0))];
        assert!(jitter_percent(&frames).is_none());
        assert!(jitter_absolute_ms(&frames).is_none());
    }

    #[test]
    fn all_unvoiced() {
        let frames = vec![frame(0.0, None), frame(0.01, None)];
        assert!(jitter_percent(&frames).is_none());
    }
}
