use super::pitch::PitchFrame;

/// Compute the harmonics-to-noise ratio using the autocorrelation method.
///
/// HNR quantifies breathiness — the ratio of harmonic (periodic) energy
/// to aperiodic (noise) energy (Boersma, 1993).
///
/// For each voiced frame:
///   1. The pitch period T0 = 1/F0 comes from the contour
///   2. A chunk of audio around the frame position is extracted
///   3. The normalized autocorrelation near lag T0 (best of a few lags
///      around the rounded period) measures periodicity: r = 1.0 is
///      perfectly periodic, r = 0.0 is pure noise
///   4. HNR = 10 * log10(r / (1 - r)) dB
///
/// The mean over voiced frames is floored at 0 dB — no periodicity
/// reports as 0, never negative infinity.
///
/// Returns None if no voiced frame yields a valid measurement.
pub fn compute_hnr_db(
    samples: &[f32],
    sample_rate: u32,
    frames: &[PitchFrame],
    hop_ms: f32,
) -> Option<f32> {
    let sr = sample_rate as f32;
    let hop_samples = (hop_ms / 1000.0 * sr) as usize;

    let mut hnr_values: Vec<f32> = Vec::new();

    for (i, frame) in frames.iter().enumerate() {
        let Some(f0) = frame.frequency else {
            continue;
        };

        let period_samples = (sr / f0).round() as usize;
        if period_samples == 0 {
            continue;
        }

        // Three periods centered on the frame give a stable estimate;
        // at least two are required for the lag to be measurable.
        let center = i * hop_samples;
        let window_size = period_samples * 3;
        let start = center.saturating_sub(window_size / 2);
        let end = (start + window_size).min(samples.len());

        if end - start < period_samples * 2 {
            continue;
        }

        let chunk = &samples[start..end];

        // The rounded lag can sit half a sample off the true period,
        // and a window that is not an integer number of true periods
        // biases the correlation low. Each frame settles on the best
        // alignment in a small neighborhood of the nominal period.
        let mut r = 0.0f32;
        for lag in period_samples.saturating_sub(2).max(1)..=period_samples + 2 {
            r = r.max(normalized_autocorrelation(chunk, lag));
        }

        // Numerical imprecision can push r slightly outside [0, 1];
        // the upper clamp also caps a pure tone at 40 dB.
        let r = r.clamp(0.0001, 0.9999);

        let hnr = 10.0 * (r / (1.0 - r)).log10();
        hnr_values.push(hnr);
    }

    if hnr_values.is_empty() {
        return None;
    }

    let mean_hnr = hnr_values.iter().sum::<f32>() / hnr_values.len() as f32;
    Some(mean_hnr.max(0.0))
}

/// Whole-signal fallback when the contour has too few voiced frames.
///
/// Scans the normalized autocorrelation over the lag range of the F0
/// band: the first peak is the harmonic energy estimate, the valley
/// before it the noise estimate, HNR = 10*log10(harmonic/noise),
/// floored at 0.
pub fn hnr_acf_fallback(
    samples: &[f32],
    sample_rate: u32,
    min_f0: f32,
    max_f0: f32,
) -> Option<f32> {
    let sr = sample_rate as f32;
    let min_lag = (sr / max_f0).floor().max(1.0) as usize;
    let max_lag = (sr / min_f0).ceil() as usize;

    if samples.len() < max_lag * 2 || min_lag >= max_lag {
        return None;
    }

    let window = &samples[..(max_lag * 4).min(samples.len())];

    let mut peak = 0.0f32;
    let mut peak_lag = 0;
    for lag in min_lag..=max_lag {
        let r = normalized_autocorrelation(window, lag).max(0.0);
        if r > peak {
            peak = r;
            peak_lag = lag;
        }
    }

    if peak_lag == 0 || peak <= 0.0 {
        return Some(0.0);
    }

    let mut valley = peak;
    for lag in min_lag..peak_lag {
        let r = normalized_autocorrelation(window, lag).max(0.0);
        if r < valley {
            valley = r;
        }
    }

    // Energy not explained by the periodic component, with the valley
    // as a secondary floor so a shallow dip cannot inflate the ratio.
    let noise = (1.0 - peak).max(valley.abs()).max(1e-4);
    let hnr = 10.0 * (peak / noise).log10();
    Some(hnr.max(0.0))
}

/// Normalized autocorrelation of a signal at a given lag.
///
/// A value of 1.0 means the signal is perfectly periodic at this lag;
/// 0.0 means no correlation.
pub fn normalized_autocorrelation(signal: &[f32], lag: usize) -> f32 {
    if lag >= signal.len() {
        return 0.0;
    }

    let n = signal.len() - lag;
    if n == 0 {
        return 0.0;
    }

    let mut cross_sum = 0.0_f64;
    let mut energy_a = 0.0_f64;
    let mut energy_b = 0.0_f64;

    for i in 0..n {
        let a = signal[i] as f64;
        let b = signal[i + lag] as f64;
        cross_sum += a * b;
        energy_a += a * a;
        energy_b += b * b;
    }

    let denom = (energy_a * energy_b).sqrt();
    if denom == 0.0 {
        return 0.0;
    }

    (cross_sum / denom) as f32
}
