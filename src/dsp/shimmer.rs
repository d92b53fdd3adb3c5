use rustfft::{num_complex::Complex, FftPlanner};

/// Shimmer measures cycle-to-cycle variation of peak amplitude. It
/// reflects inconsistent vocal-fold closure and air leak.
///
/// Peaks are picked on the Hilbert envelope of the waveform with a
/// minimum inter-peak distance, making the picker cycle-synchronous
/// without needing an exact pitch period per frame.
///
/// Minimum spacing between cycle peaks when the pitch period is
/// unknown. Callers with a tracked F0 should pass ~0.7 pitch periods
/// instead so intra-cycle envelope ripple never counts as a cycle.
pub const DEFAULT_MIN_PEAK_DISTANCE_MS: f32 = 5.0;

/// Peaks below this fraction of the envelope maximum are silence edges,
/// not cycles.
const MIN_PEAK_LEVEL: f32 = 0.25;

/// Fraction of the envelope trimmed at each end before peak picking;
/// the analytic signal is unreliable at the boundaries.
const EDGE_TRIM: f32 = 0.05;

/// Amplitude envelope via the analytic signal.
///
/// FFT of the full signal, zero the negative frequencies, double the
/// positive ones, inverse FFT; the magnitude of the result is the
/// envelope. The FFT runs at the exact signal length (rustfft handles
/// arbitrary sizes) — zero-padding would put a step at the original
/// signal end and ripple the whole envelope.
pub fn hilbert_envelope(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    if n < 4 {
        return samples.iter().map(|s| s.abs()).collect();
    }

    let mut planner = FftPlanner::new();
    let fft_forward = planner.plan_fft_forward(n);
    let fft_inverse = planner.plan_fft_inverse(n);

    let mut buf: Vec<Complex<f32>> = samples.iter().map(|&s| Complex::new(s, 0.0)).collect();
    fft_forward.process(&mut buf);

    // Analytic signal spectrum: keep DC and Nyquist, double positive
    // frequencies, zero negative frequencies.
    let half = n / 2;
    for (k, v) in buf.iter_mut().enumerate() {
        if k == 0 || (n % 2 == 0 && k == half) {
            // unchanged
        } else if k < half || (n % 2 == 1 && k == half) {
            *v = *v * 2.0;
        } else {
            *v = Complex::new(0.0, 0.0);
        }
    }

    fft_inverse.process(&mut buf);

    let norm = 1.0 / n as f32;
    buf.iter().map(|c| c.norm() * norm).collect()
}

/// Pick cycle-synchronous peak amplitudes from the envelope.
///
/// All local maxima (ties count, so a flat envelope still yields
/// evenly spaced peaks) above `MIN_PEAK_LEVEL` of the envelope maximum
/// are candidates; min-distance conflicts are then resolved in favor
/// of the larger peak, so a quiet cycle sitting next to a loud one is
/// never shadowed by scan order.
pub fn cycle_peaks(envelope: &[f32], sample_rate: u32, min_distance_ms: f32) -> Vec<f32> {
    let n = envelope.len();
    if n < 3 {
        return Vec::new();
    }

    let trim = (n as f32 * EDGE_TRIM) as usize;
    let start = trim.max(1);
    let end = n.saturating_sub(trim.max(1));
    if start >= end {
        return Vec::new();
    }

    let max_env = envelope[start..end]
        .iter()
        .fold(0.0f32, |m, &v| m.max(v));
    if max_env <= 0.0 {
        return Vec::new();
    }
    let floor = max_env * MIN_PEAK_LEVEL;

    let mut candidates: Vec<usize> = (start..end)
        .filter(|&i| {
            let v = envelope[i];
            v >= floor && v >= envelope[i - 1] && v >= envelope[i + 1]
        })
        .collect();
    candidates.sort_by(|&a, &b| envelope[b].total_cmp(&envelope[a]));

    let min_distance = ((min_distance_ms / 1000.0 * sample_rate as f32) as usize).max(1);
    let mut accepted: Vec<usize> = Vec::new();
    for i in candidates {
        if accepted.iter().all(|&j| i.abs_diff(j) >= min_distance) {
            accepted.push(i);
        }
    }

    accepted.sort_unstable();
    accepted.iter().map(|&i| envelope[i]).collect()
}

/// Local shimmer: mean absolute consecutive peak difference over the
/// mean peak amplitude, as a percentage.
///
/// Clinical reference (Praat): normal voices stay below ~3.81%.
pub fn shimmer_percent(peaks: &[f32]) -> Option<f32> {
    if peaks.len() < 2 {
        return None;
    }
    let mean_amp = peaks.iter().sum::<f32>() / peaks.len() as f32;
    if mean_amp <= 0.0 {
        return None;
    }
    let mean_diff = peaks
        .windows(2)
        .map(|p| (p[1] - p[0]).abs())
        .sum::<f32>()
        / (peaks.len() - 1) as f32;
    Some(mean_diff / mean_amp * 100.0)
}

/// Shimmer in dB: mean |20*log10(A(i+1)/A(i))| over consecutive peaks.
pub fn shimmer_db(peaks: &[f32]) -> Option<f32> {
    let mut ratios: Vec<f32> = Vec::new();
    for pair in peaks.windows(2) {
        if pair[0] > 0.0 && pair[1] > 0.0 {
            ratios.push((20.0 * (pair[1] / pair[0]).log10()).abs());
        }
    }
    if ratios.is_empty() {
        return None;
    }
    Some(ratios.iter().sum::<f32>() / ratios.len() as f32)
}

/// Three-point amplitude perturbation quotient.
pub fn shimmer_apq3_percent(peaks: &[f32]) -> Option<f32> {
    smoothed_quotient(peaks, 3)
}

/// Eleven-point amplitude perturbation quotient. Requires >= 11 peaks.
pub fn shimmer_apq11_percent(peaks: &[f32]) -> Option<f32> {
    smoothed_quotient(peaks, 11)
}

fn smoothed_quotient(peaks: &[f32], k: usize) -> Option<f32> {
    if peaks.len() < k {
        return None;
    }
    let mean_amp = peaks.iter().sum::<f32>() / peaks.len() as f32;
    if mean_amp <= 0.0 {
        return None;
    }

    let half = k / 2;
    let mut deviations = Vec::new();
    for i in half..peaks.len() - half {
        let window = &peaks[i - half..=i + half];
        let local_mean = window.iter().sum::<f32>() / k as f32;
        deviations.push((peaks[i] - local_mean).abs());
    }
    if deviations.is_empty() {
        return None;
    }

    let mean_dev = deviations.iter().sum::<f32>() / deviations.len() as f32;
    Some(mean_dev / mean_amp * 100.0)
}
