use std::f32::consts::PI;

/// Apply a Hanning window to a slice of samples, returning a new Vec.
///
/// The Hanning (also called Hann) window smoothly tapers a frame of audio
/// to zero at both edges. This prevents spectral leakage — the artifacts
/// you'd get from abruptly chopping a signal in the middle of a cycle.
///
/// Formula: w(n) = 0.5 * (1 - cos(2π * n / (N - 1)))
pub fn hanning(samples: &[f32]) -> Vec<f32> {
    let n = samples.len();
    if n <= 1 {
        return samples.to_vec();
    }

    let scale = 2.0 * PI / (n - 1) as f32;

    samples
        .iter()
        .enumerate()
        .map(|(i, &s)| {
            let w = 0.5 * (1.0 - (scale * i as f32).cos());
            s * w
        })
        .collect()
}

/// Smooth a sequence with a Gaussian kernel of the given sigma (in samples).
///
/// The kernel is truncated at ±3σ and renormalized at the edges, so the
/// output has the same length as the input and no energy is lost at the
/// boundaries. Used to smooth per-frame CPP values and the energy envelope
/// before syllable-peak picking.
pub fn gaussian_smooth(values: &[f32], sigma: f32) -> Vec<f32> {
    if values.is_empty() || sigma <= 0.0 {
        return values.to_vec();
    }

    let radius = (3.0 * sigma).ceil() as usize;
    let kernel: Vec<f32> = (0..=2 * radius)
        .map(|i| {
            let x = i as f32 - radius as f32;
            (-0.5 * (x / sigma).powi(2)).exp()
        })
        .collect();

    let n = values.len();
    let mut out = Vec::with_capacity(n);

    for i in 0..n {
        let mut acc = 0.0f32;
        let mut weight = 0.0f32;
        for (k, &w) in kernel.iter().enumerate() {
            let j = i as isize + k as isize - radius as isize;
            if j >= 0 && (j as usize) < n {
                acc += w * values[j as usize];
                weight += w;
            }
        }
        out.push(if weight > 0.0 { acc / weight } else { 0.0 });
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hanning_edges_are_zero() {
        let samples = vec![1.0; 100];
        let windowed = hanning(&samples);

        assert!(windowed[0].abs() < 1e-6);
        assert!(windowed[99].abs() < 1e-6);
    }

    #[test]
    fn hanning_center_is_one() {
        let n = 101; // odd length so there's an exact center
        let samples = vec![1.0; n];
        let windowed = hanning(&samples);

        assert!((windowed[50] - 1.0).abs() < 1e-6);
    }

    #[test]
    fn hanning_is_symmetric() {
        let samples = vec![1.0; 64];
        let windowed = hanning(&samples);

        for i in 0..32 {
            assert!(
                (windowed[i] - windowed[63 - i]).abs() < 1e-6,
                "Asymmetry at index {i}"
            );
        }
    }

    #[test]
    fn hanning_empty() {
        assert!(hanning(&[]).is_empty());
    }

    #[test]
    fn smooth_preserves_constant() {
        let values = vec![2.0; 50];
        let smoothed = gaussian_smooth(&values, 2.0);
        for &v in &smoothed {
            assert!((v - 2.0).abs() < 1e-5);
        }
    }

    #[test]
    fn smooth_reduces_spike() {
        let mut values = vec![0.0; 21];
        values[10] = 1.0;
        let smoothed = gaussian_smooth(&values, 2.0);
        assert!(smoothed[10] < 0.5, "Spike should spread out, got {}", smoothed[10]);
        assert!(smoothed[8] > 0.0, "Neighbors should pick up energy");
    }

    #[test]
    fn smooth_same_length() {
        let values: Vec<f32> = (0..37).map(|i| i as f32).collect();
        assert_eq!(gaussian_smooth(&values, 1.5).len(), 37);
    }

    #[test]
    fn smooth_zero_sigma_is_noop() {
        let values = vec![1.0, 2.0, 3.0];
        assert_eq!(gaussian_smooth(&values, 0.0), values);
    }
}
