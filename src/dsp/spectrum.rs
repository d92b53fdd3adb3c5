use rustfft::{num_complex::Complex, FftPlanner};

use super::windowing;

/// Short-time magnitude spectra of a signal.
pub struct Stft {
    /// One magnitude spectrum per frame, bins 0..=fft_size/2.
    pub frames: Vec<Vec<f32>>,
    /// Width of one frequency bin in Hz.
    pub bin_hz: f32,
}

/// Compute short-time magnitude spectra with a Hanning window.
///
/// Frames below the energy gate are skipped — moments of a silence
/// spectrum are meaningless.
pub fn stft(
    samples: &[f32],
    sample_rate: u32,
    window_ms: f32,
    hop_ms: f32,
    energy_gate_db: f32,
) -> Stft {
    let sr = sample_rate as f32;
    let frame_size = (window_ms / 1000.0 * sr) as usize;
    let hop_size = ((hop_ms / 1000.0 * sr) as usize).max(1);

    let mut frames = Vec::new();

    if frame_size == 0 || samples.len() < frame_size {
        return Stft {
            frames,
            bin_hz: 0.0,
        };
    }

    let fft_size = frame_size.next_power_of_two();
    let bin_hz = sr / fft_size as f32;

    let mut planner = FftPlanner::new();
    let fft = planner.plan_fft_forward(fft_size);

    let mut pos = 0;
    while pos + frame_size <= samples.len() {
        let frame = &samples[pos..pos + frame_size];
        pos += hop_size;

        let rms = frame_rms(frame);
        let rms_db = if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            f32::NEG_INFINITY
        };
        if rms_db < energy_gate_db {
            continue;
        }

        let windowed = windowing::hanning(frame);
        let mut buf: Vec<Complex<f32>> =
            windowed.iter().map(|&s| Complex::new(s, 0.0)).collect();
        buf.resize(fft_size, Complex::new(0.0, 0.0));
        fft.process(&mut buf);

        let magnitudes: Vec<f32> = buf[..=fft_size / 2].iter().map(|c| c.norm()).collect();
        frames.push(magnitudes);
    }

    Stft { frames, bin_hz }
}

/// First four standardized moments of a magnitude spectrum treated as a
/// distribution over frequency: (centroid, spread, skewness, kurtosis).
///
/// Returns None when the spectrum carries no energy.
pub fn spectral_moments(magnitudes: &[f32], bin_hz: f32) -> Option<(f32, f32, f32, f32)> {
    let total: f32 = magnitudes.iter().sum();
    if total <= 0.0 {
        return None;
    }

    let centroid: f32 = magnitudes
        .iter()
        .enumerate()
        .map(|(k, &m)| k as f32 * bin_hz * m)
        .sum::<f32>()
        / total;

    let mut m2 = 0.0f32;
    let mut m3 = 0.0f32;
    let mut m4 = 0.0f32;
    for (k, &m) in magnitudes.iter().enumerate() {
        let d = k as f32 * bin_hz - centroid;
        let w = m / total;
        m2 += w * d * d;
        m3 += w * d * d * d;
        m4 += w * d * d * d * d;
    }

    let spread = m2.sqrt();
    if spread <= 0.0 {
        return Some((centroid, 0.0, 0.0, 0.0));
    }

    let skewness = m3 / spread.powi(3);
    let kurtosis = m4 / (m2 * m2);

    Some((centroid, spread, skewness, kurtosis))
}

/// Spectral flux between two frames: L2 norm of the difference of the
/// energy-normalized magnitude spectra.
pub fn spectral_flux(prev: &[f32], cur: &[f32]) -> f32 {
    let prev_total: f32 = prev.iter().sum();
    let cur_total: f32 = cur.iter().sum();
    if prev_total <= 0.0 || cur_total <= 0.0 {
        return 0.0;
    }

    let n = prev.len().min(cur.len());
    let mut sum = 0.0f32;
    for i in 0..n {
        let d = cur[i] / cur_total - prev[i] / prev_total;
        sum += d * d;
    }
    sum.sqrt()
}

/// Frequency below which `fraction` of the spectral energy lies.
pub fn rolloff_hz(magnitudes: &[f32], bin_hz: f32, fraction: f32) -> f32 {
    let total: f32 = magnitudes.iter().map(|&m| m * m).sum();
    if total <= 0.0 {
        return 0.0;
    }
    let target = total * fraction;
    let mut acc = 0.0f32;
    for (k, &m) in magnitudes.iter().enumerate() {
        acc += m * m;
        if acc >= target {
            return k as f32 * bin_hz;
        }
    }
    (magnitudes.len() - 1) as f32 * bin_hz
}

/// Linear regression slope of log-magnitude (dB) against log-frequency.
/// Bin 0 and empty bins are skipped. Returns 0.0 when fewer than two
/// usable bins remain.
pub fn log_log_slope(magnitudes: &[f32], bin_hz: f32) -> f32 {
    let mut xs = Vec::new();
    let mut ys = Vec::new();
    for (k, &m) in magnitudes.iter().enumerate().skip(1) {
        if m > 1e-10 {
            xs.push((k as f32 * bin_hz).log10());
            ys.push(20.0 * m.log10());
        }
    }
    if xs.len() < 2 {
        return 0.0;
    }

    let n = xs.len() as f32;
    let sum_x: f32 = xs.iter().sum();
    let sum_y: f32 = ys.iter().sum();
    let sum_xy: f32 = xs.iter().zip(&ys).map(|(x, y)| x * y).sum();
    let sum_xx: f32 = xs.iter().map(|x| x * x).sum();

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-10 {
        return 0.0;
    }
    (n * sum_xy - sum_x * sum_y) / denom
}

/// Alpha ratio: mean magnitude of the lowest quartile of frequency bins
/// over the highest quartile, in dB. A spectral-tilt proxy — strongly
/// positive for a normal falling voice spectrum.
pub fn alpha_ratio_db(magnitudes: &[f32]) -> f32 {
    let n = magnitudes.len();
    if n < 8 {
        return 0.0;
    }
    let q = n / 4;
    let low: f32 = magnitudes[..q].iter().sum::<f32>() / q as f32;
    let high: f32 = magnitudes[n - q..].iter().sum::<f32>() / q as f32;
    if low <= 0.0 || high <= 0.0 {
        return 0.0;
    }
    20.0 * (low / high).log10()
}

/// Power in [lo_hz, hi_hz) of an averaged power spectrum.
pub fn band_power(power: &[f32], bin_hz: f32, lo_hz: f32, hi_hz: f32) -> f32 {
    if bin_hz <= 0.0 {
        return 0.0;
    }
    let lo = (lo_hz / bin_hz).floor().max(0.0) as usize;
    let hi = ((hi_hz / bin_hz).ceil() as usize).min(power.len());
    if lo >= hi {
        return 0.0;
    }
    power[lo..hi].iter().sum()
}

/// Mean power spectrum over all frames.
pub fn average_power(stft: &Stft) -> Vec<f32> {
    if stft.frames.is_empty() {
        return Vec::new();
    }
    let n = stft.frames[0].len();
    let mut acc = vec![0.0f32; n];
    for frame in &stft.frames {
        for (a, &m) in acc.iter_mut().zip(frame.iter()) {
            *a += m * m;
        }
    }
    let count = stft.frames.len() as f32;
    for a in &mut acc {
        *a /= count;
    }
    acc
}

/// Per-frame RMS energies at the given frame geometry (no gate).
pub fn frame_energies(samples: &[f32], sample_rate: u32, window_ms: f32, hop_ms: f32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let frame_size = (window_ms / 1000.0 * sr) as usize;
    let hop_size = ((hop_ms / 1000.0 * sr) as usize).max(1);

    let mut energies = Vec::new();
    if frame_size == 0 || samples.len() < frame_size {
        return energies;
    }
    let mut pos = 0;
    while pos + frame_size <= samples.len() {
        energies.push(frame_rms(&samples[pos..pos + frame_size]));
        pos += hop_size;
    }
    energies
}

/// Per-frame zero-crossing rates (fraction of adjacent sample pairs that
/// change sign).
pub fn frame_zcrs(samples: &[f32], sample_rate: u32, window_ms: f32, hop_ms: f32) -> Vec<f32> {
    let sr = sample_rate as f32;
    let frame_size = (window_ms / 1000.0 * sr) as usize;
    let hop_size = ((hop_ms / 1000.0 * sr) as usize).max(1);

    let mut zcrs = Vec::new();
    if frame_size < 2 || samples.len() < frame_size {
        return zcrs;
    }
    let mut pos = 0;
    while pos + frame_size <= samples.len() {
        zcrs.push(zero_crossing_rate(&samples[pos..pos + frame_size]));
        pos += hop_size;
    }
    zcrs
}

/// Fraction of adjacent sample pairs that change sign.
pub fn zero_crossing_rate(samples: &[f32]) -> f32 {
    if samples.len() < 2 {
        return 0.0;
    }
    let crossings = samples
        .windows(2)
        .filter(|p| (p[0] >= 0.0) != (p[1] >= 0.0))
        .count();
    crossings as f32 / (samples.len() - 1) as f32
}

pub fn frame_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
