use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use super::spectrum;
use super::windowing;
use crate::result::Formant;

/// Pre-emphasis coefficient (first-difference filter).
const PRE_EMPHASIS: f64 = 0.97;

/// Formant search band.
const MIN_FORMANT_HZ: f64 = 200.0;
const MAX_FORMANT_HZ: f64 = 5000.0;

/// Roots closer to the origin than this are spectral-shape poles, not
/// resonances.
const MIN_ROOT_MAGNITUDE: f64 = 0.7;

/// LPC runs at a reduced rate so the model order stays small and the
/// poles concentrate in the formant band. ~11 kHz keeps everything up
/// to 5 kHz representable.
const TARGET_LPC_RATE: u32 = 11025;

/// Frames below this RMS are skipped.
const ENERGY_GATE: f32 = 0.01;

/// At most this many frames are analyzed, evenly spaced; root finding
/// per frame is the expensive part and formants are stable enough that
/// more frames add nothing.
const MAX_FRAMES: usize = 40;

/// Estimate up to `max_count` formants in [200, 5000] Hz, ascending.
///
/// Linear-prediction fallback path: pre-emphasize, solve LPC
/// coefficients of order rate/1000 + 4 (Levinson-Durbin), find the
/// polynomial roots, keep roots with positive imaginary part and
/// magnitude above 0.7, convert angle to frequency. Bandwidth is
/// approximated from the root magnitude (-ln(r) * rate / pi), not
/// solved exactly. Per-formant values are medians across frames.
pub fn estimate_formants(
    samples: &[f32],
    sample_rate: u32,
    window_ms: f32,
    hop_ms: f32,
    max_count: usize,
) -> Vec<Formant> {
    if samples.is_empty() || sample_rate == 0 || max_count == 0 {
        return Vec::new();
    }

    let (signal, rate) = decimate(samples, sample_rate, TARGET_LPC_RATE);
    let order = (rate / 1000) as usize + 4;

    let sr = rate as f32;
    let frame_size = (window_ms / 1000.0 * sr) as usize;
    let hop_size = ((hop_ms / 1000.0 * sr) as usize).max(1);

    if frame_size <= order || signal.len() < frame_size {
        return Vec::new();
    }

    // Candidate frame positions, thinned to MAX_FRAMES.
    let total = (signal.len() - frame_size) / hop_size + 1;
    let step = (total / MAX_FRAMES).max(1);

    // Per-slot collections: slot k holds the k-th lowest formant of
    // each analyzed frame.
    let mut slots: Vec<Vec<(f64, f64)>> = vec![Vec::new(); max_count];

    for frame_idx in (0..total).step_by(step) {
        let pos = frame_idx * hop_size;
        let frame = &signal[pos..pos + frame_size];

        if spectrum::frame_rms(frame) < ENERGY_GATE {
            continue;
        }

        let windowed = windowing::hanning(frame);
        let frame_formants = frame_formants(&windowed, rate, order);

        for (k, &(freq, bw)) in frame_formants.iter().take(max_count).enumerate() {
            slots[k].push((freq, bw));
        }
    }

    let mut formants = Vec::new();
    for slot in slots {
        // Slots with too few supporting frames are root-finder noise.
        if slot.len() < 3 {
            break;
        }
        let mut freqs: Vec<f64> = slot.iter().map(|&(f, _)| f).collect();
        let mut bws: Vec<f64> = slot.iter().map(|&(_, b)| b).collect();
        freqs.sort_by(f64::total_cmp);
        bws.sort_by(f64::total_cmp);
        formants.push(Formant {
            frequency_hz: freqs[freqs.len() / 2] as f32,
            bandwidth_hz: bws[bws.len() / 2] as f32,
        });
    }

    formants
}

/// Formants of one pre-windowed frame, sorted ascending by frequency.
fn frame_formants(frame: &[f32], rate: u32, order: usize) -> Vec<(f64, f64)> {
    let emphasized = pre_emphasis(frame);
    let r = autocorrelation(&emphasized, order);
    let coeffs = levinson_durbin(&r, order);

    // Root-find A(z) in ascending-power form: poly[k] = coeffs[p - k].
    let poly: Vec<f64> = coeffs.iter().rev().cloned().collect();
    let roots = find_roots(&poly);

    roots_to_formants(&roots, rate as f64)
}

fn pre_emphasis(signal: &[f32]) -> Vec<f64> {
    if signal.is_empty() {
        return Vec::new();
    }
    let mut out = Vec::with_capacity(signal.len());
    out.push(signal[0] as f64);
    for i in 1..signal.len() {
        out.push(signal[i] as f64 - PRE_EMPHASIS * signal[i - 1] as f64);
    }
    out
}

/// Autocorrelation for lags 0..=order.
fn autocorrelation(signal: &[f64], order: usize) -> Vec<f64> {
    let n = signal.len();
    let mut r = vec![0.0; order + 1];
    for (lag, slot) in r.iter_mut().enumerate() {
        let mut sum = 0.0;
        for i in lag..n {
            sum += signal[i] * signal[i - lag];
        }
        *slot = sum;
    }
    r
}

/// Levinson-Durbin recursion. Returns the LPC polynomial
/// A(z) = 1 + c[1]z^-1 + ... + c[p]z^-p as `[1.0, c1, ..., cp]`.
fn levinson_durbin(r: &[f64], order: usize) -> Vec<f64> {
    if r[0] <= 0.0 {
        // Silent frame
        let mut coeffs = vec![0.0; order + 1];
        coeffs[0] = 1.0;
        return coeffs;
    }

    let mut a = vec![0.0; order + 1];
    a[0] = 1.0;
    let mut e = r[0];

    for i in 1..=order {
        let mut lambda = 0.0;
        for j in 1..i {
            lambda += a[j] * r[i - j];
        }
        lambda = (r[i] - lambda) / e;

        let mut a_new = a.clone();
        a_new[i] = lambda;
        for j in 1..i {
            a_new[j] = a[j] - lambda * a[i - j];
        }
        a = a_new;

        e *= 1.0 - lambda * lambda;
        if e <= 0.0 {
            break;
        }
    }

    let mut coeffs = vec![0.0; order + 1];
    coeffs[0] = 1.0;
    for k in 1..=order {
        coeffs[k] = -a[k];
    }
    coeffs
}

/// Durand-Kerner root finding for a real polynomial given in
/// ascending-power order.
fn find_roots(poly: &[f64]) -> Vec<Complex64> {
    let n = poly.len();
    if n <= 1 {
        return Vec::new();
    }
    let degree = n - 1;

    let lead = poly[degree];
    if lead.abs() < 1e-300 {
        return Vec::new();
    }
    let p: Vec<f64> = poly.iter().map(|c| c / lead).collect();

    // Seed the roots on a circle with offset angles to break symmetry.
    let mut roots: Vec<Complex64> = (0..degree)
        .map(|k| {
            let angle = 2.0 * PI * (k as f64 + 0.3) / degree as f64;
            Complex64::new(0.9 * angle.cos(), 0.9 * angle.sin())
        })
        .collect();

    let max_iter = 300;
    let tol = 1e-10;

    for _ in 0..max_iter {
        let mut max_correction = 0.0f64;

        for i in 0..degree {
            // Horner evaluation at roots[i]
            let mut val = Complex64::new(p[degree], 0.0);
            for j in (0..degree).rev() {
                val = val * roots[i] + Complex64::new(p[j], 0.0);
            }

            let mut denom = Complex64::new(1.0, 0.0);
            for j in 0..degree {
                if j != i {
                    denom *= roots[i] - roots[j];
                }
            }
            if denom.norm() < 1e-300 {
                continue;
            }

            let correction = val / denom;
            roots[i] -= correction;

            if correction.norm() > max_correction {
                max_correction = correction.norm();
            }
        }

        if max_correction < tol {
            break;
        }
    }

    roots
}

/// Convert LPC roots to (frequency, bandwidth) pairs.
///
/// A root at angle theta with magnitude r gives
/// frequency = theta * rate / (2*pi) and bandwidth = -ln(r) * rate / pi.
fn roots_to_formants(roots: &[Complex64], rate: f64) -> Vec<(f64, f64)> {
    let nyquist = rate / 2.0;
    let mut formants = Vec::new();

    for root in roots {
        // Only the upper half plane; conjugate pairs carry the same pole.
        if root.im <= 0.0 {
            continue;
        }

        let mag = root.norm();
        if mag < MIN_ROOT_MAGNITUDE || mag > 1.0 {
            continue;
        }

        let freq = root.im.atan2(root.re) * rate / (2.0 * PI);
        if freq < MIN_FORMANT_HZ || freq > MAX_FORMANT_HZ.min(nyquist) {
            continue;
        }

        let bw = -mag.ln() * rate / PI;
        formants.push((freq, bw));
    }

    formants.sort_by(|a, b| a.0.total_cmp(&b.0));
    formants
}

/// Integer-factor decimation with a boxcar anti-alias average. Crude,
/// but the medians downstream tolerate the residual aliasing.
fn decimate(samples: &[f32], sample_rate: u32, target_rate: u32) -> (Vec<f32>, u32) {
    if sample_rate <= target_rate {
        return (samples.to_vec(), sample_rate);
    }
    let factor = (sample_rate as f32 / target_rate as f32).round() as usize;
    if factor <= 1 {
        return (samples.to_vec(), sample_rate);
    }

    let out_rate = sample_rate / factor as u32;
    let mut out = Vec::with_capacity(samples.len() / factor + 1);
    let mut i = 0;
    while i + factor <= samples.len() {
        let avg: f32 = samples[i..i + factor].iter().sum::<f32>() / factor as f32;
        out.push(avg);
        i += factor;
    }
    (out, out_rate)
}
