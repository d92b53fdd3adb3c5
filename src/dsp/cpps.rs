use rustfft::{num_complex::Complex, FftPlanner};

use super::windowing;

/// Configuration for smoothed cepstral peak prominence (CPPS).
pub struct CppsConfig {
    /// Analysis window duration in milliseconds.
    pub frame_size_ms: f32,
    /// Hop between frames in milliseconds.
    pub hop_size_ms: f32,
    /// Quefrency band searched for the cepstral peak, milliseconds.
    /// 2 ms = 500 Hz upper bound, 20 ms = 50 Hz lower bound.
    pub quefrency_min_ms: f32,
    pub quefrency_max_ms: f32,
    /// Frames below this RMS (dB) are excluded.
    pub energy_gate_db: f32,
    /// Sigma of the Gaussian smoothing across per-frame CPP values,
    /// in frames.
    pub smoothing_sigma_frames: f32,
}

impl Default for CppsConfig {
    fn default() -> Self {
        Self {
            frame_size_ms: 40.0,
            hop_size_ms: 10.0,
            quefrency_min_ms: 2.0,
            quefrency_max_ms: 20.0,
            energy_gate_db: -45.0,
            smoothing_sigma_frames: 2.0,
        }
    }
}

/// Compute CPPS for an audio signal.
///
/// CPPS measures the strength of the cepstral peak relative to the
/// overall cepstral shape. It does not require successful pitch
/// tracking, which makes it robust on disordered voices.
///
/// Per frame:
/// 1. Hanning window
/// 2. FFT -> log power spectrum
/// 3. IFFT of the log power spectrum -> cepstrum
/// 4. Peak in the quefrency band minus the linear-regression baseline
///    over that band
///
/// The per-frame values are smoothed with a Gaussian kernel across
/// frames before averaging. Returns None if no frame passes the energy
/// gate.
pub fn compute_cpps(samples: &[f32], sample_rate: u32, config: &CppsConfig) -> Option<f32> {
    let sr = sample_rate as f32;
    let frame_size = (config.frame_size_ms / 1000.0 * sr) as usize;
    let hop_size = (config.hop_size_ms / 1000.0 * sr) as usize;

    if frame_size == 0 || hop_size == 0 || samples.len() < frame_size {
        return None;
    }

    let fft_size = frame_size.next_power_of_two();

    let mut planner = FftPlanner::new();
    let fft_forward = planner.plan_fft_forward(fft_size);
    let fft_inverse = planner.plan_fft_inverse(fft_size);

    let q_min = (config.quefrency_min_ms / 1000.0 * sr) as usize;
    let q_max = ((config.quefrency_max_ms / 1000.0 * sr).ceil() as usize).min(fft_size / 2 - 1);

    if q_min >= q_max {
        return None;
    }

    let mut cpp_values = Vec::new();
    let mut pos = 0;

    while pos + frame_size <= samples.len() {
        let frame = &samples[pos..pos + frame_size];

        let rms = frame_rms(frame);
        let rms_db = if rms > 0.0 {
            20.0 * rms.log10()
        } else {
            f32::NEG_INFINITY
        };

        if rms_db < config.energy_gate_db {
            pos += hop_size;
            continue;
        }

        let windowed = windowing::hanning(frame);

        let mut fft_buf: Vec<Complex<f32>> =
            windowed.iter().map(|&s| Complex::new(s, 0.0)).collect();
        fft_buf.resize(fft_size, Complex::new(0.0, 0.0));

        fft_forward.process(&mut fft_buf);

        let mut log_power: Vec<Complex<f32>> = fft_buf
            .iter()
            .map(|c| {
                let power = c.norm_sqr();
                let log_p = if power > 1e-20 {
                    10.0 * power.log10()
                } else {
                    -200.0
                };
                Complex::new(log_p, 0.0)
            })
            .collect();

        fft_inverse.process(&mut log_power);

        let norm = 1.0 / fft_size as f32;
        let cepstrum: Vec<f32> = log_power.iter().map(|c| c.re * norm).collect();

        if let Some(cpp) = cepstral_peak_prominence(&cepstrum, q_min, q_max) {
            cpp_values.push(cpp);
        }

        pos += hop_size;
    }

    if cpp_values.is_empty() {
        return None;
    }

    let smoothed = windowing::gaussian_smooth(&cpp_values, config.smoothing_sigma_frames);
    Some(smoothed.iter().sum::<f32>() / smoothed.len() as f32)
}

/// Peak value in the quefrency band minus the linear-regression baseline
/// at the peak quefrency.
fn cepstral_peak_prominence(cepstrum: &[f32], q_min: usize, q_max: usize) -> Option<f32> {
    if q_min >= q_max || q_max >= cepstrum.len() {
        return None;
    }

    let mut peak_val = f32::NEG_INFINITY;
    let mut peak_idx = q_min;

    for i in q_min..=q_max {
        if cepstrum[i] > peak_val {
            peak_val = cepstrum[i];
            peak_idx = i;
        }
    }

    let n = (q_max - q_min + 1) as f32;
    let mut sum_x = 0.0f32;
    let mut sum_y = 0.0f32;
    let mut sum_xy = 0.0f32;
    let mut sum_xx = 0.0f32;

    for i in q_min..=q_max {
        let x = i as f32;
        let y = cepstrum[i];
        sum_x += x;
        sum_y += y;
        sum_xy += x * y;
        sum_xx += x * x;
    }

    let denom = n * sum_xx - sum_x * sum_x;
    if denom.abs() < 1e-10 {
        return Some(0.0);
    }

    let slope = (n * sum_xy - sum_x * sum_y) / denom;
    let intercept = (sum_y - slope * sum_x) / n;

    let regression_at_peak = slope * peak_idx as f32 + intercept;

    Some(peak_val - regression_at_peak)
}

fn frame_rms(samples: &[f32]) -> f32 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f32 = samples.iter().map(|&s| s * s).sum();
    (sum_sq / samples.len() as f32).sqrt()
}
