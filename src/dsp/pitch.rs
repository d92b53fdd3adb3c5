use crate::config::VoiceQualityConfig;
use crate::estimators::{Estimators, PitchEstimator};
use crate::result::GenderHint;

/// Fewer voiced frames than this and F0-derived statistics cannot be
/// computed meaningfully; downstream metrics are zeroed and a warning
/// is raised instead of dividing by zero.
pub const MIN_VOICED_FRAMES: usize = 10;

/// A single point in a pitch contour: a timestamp and an optional
/// frequency. `None` means the frame was unvoiced.
#[derive(Debug, Clone)]
pub struct PitchFrame {
    /// Time in seconds from the start of the audio.
    pub time: f32,
    /// Detected fundamental frequency, or None if unvoiced.
    pub frequency: Option<f32>,
}

/// Fundamental-frequency contour at a fixed hop size.
///
/// Frame count is floor((samples - window) / hop) + 1, so the contour
/// covers every position where a full analysis window fits.
#[derive(Debug, Clone)]
pub struct F0Contour {
    pub frames: Vec<PitchFrame>,
    pub window_ms: f32,
    pub hop_ms: f32,
    /// The F0 search band the final pass used.
    pub band_hz: (f32, f32),
    /// Caller-supplied or auto-estimated gender class.
    pub gender_class: GenderHint,
    /// Which estimator produced the contour.
    pub detection_path: &'static str,
}

impl F0Contour {
    /// Only the frequencies of voiced frames.
    pub fn voiced_frequencies(&self) -> Vec<f32> {
        self.frames.iter().filter_map(|f| f.frequency).collect()
    }

    pub fn voiced_count(&self) -> usize {
        self.frames.iter().filter(|f| f.frequency.is_some()).count()
    }

    /// Fraction of frames that are voiced. 0.0 for an empty contour.
    pub fn voiced_fraction(&self) -> f32 {
        if self.frames.is_empty() {
            return 0.0;
        }
        self.voiced_count() as f32 / self.frames.len() as f32
    }
}

/// Extract an F0 contour with gender-aware band selection.
///
/// With a gender hint the matching band is used directly. Without one,
/// a full-band pass runs first and the gender class is estimated from
/// the mean F0 (< 150 Hz male-like, 150-250 female-like, > 250
/// child-like) for a second pass over the narrower band. The second
/// pass avoids octave errors at the band edges.
///
/// If the primary estimator finds fewer than `MIN_VOICED_FRAMES` voiced
/// frames, the in-module autocorrelation fallback is tried on the same
/// band and kept if it does better.
pub fn track(
    samples: &[f32],
    sample_rate: u32,
    config: &VoiceQualityConfig,
    hint: GenderHint,
    estimators: &Estimators,
) -> F0Contour {
    let band = band_for_hint(hint, config);

    let (mut contour, estimator): (F0Contour, &dyn PitchEstimator) = {
        let primary = run_pass(samples, sample_rate, config, band, estimators.pitch.as_ref());

        if primary.voiced_count() >= MIN_VOICED_FRAMES {
            (primary, estimators.pitch.as_ref())
        } else {
            tracing::warn!(
                voiced = primary.voiced_count(),
                estimator = estimators.pitch.name(),
                "primary pitch estimator found too few voiced frames, trying fallback"
            );
            let fallback = run_pass(
                samples,
                sample_rate,
                config,
                band,
                estimators.pitch_fallback.as_ref(),
            );
            if fallback.voiced_count() > primary.voiced_count() {
                (fallback, estimators.pitch_fallback.as_ref())
            } else {
                (primary, estimators.pitch.as_ref())
            }
        }
    };
    contour.gender_class = hint;

    // Second, narrower pass when the gender had to be auto-estimated.
    if hint == GenderHint::Unspecified && contour.voiced_count() >= MIN_VOICED_FRAMES {
        let frequencies = contour.voiced_frequencies();
        let mean_f0 = frequencies.iter().sum::<f32>() / frequencies.len() as f32;
        let class = classify_gender(mean_f0);
        let narrow = band_for_hint(class, config);

        let refined = run_pass(samples, sample_rate, config, narrow, estimator);
        if refined.voiced_count() >= MIN_VOICED_FRAMES {
            contour = refined;
        }
        contour.gender_class = class;
    }

    contour
}

/// Map a mean F0 to the gender class used for the refinement pass.
fn classify_gender(mean_f0: f32) -> GenderHint {
    if mean_f0 < 150.0 {
        GenderHint::Male
    } else if mean_f0 <= 250.0 {
        GenderHint::Female
    } else {
        GenderHint::Child
    }
}

fn band_for_hint(hint: GenderHint, config: &VoiceQualityConfig) -> (f32, f32) {
    match hint {
        GenderHint::Male => config.pitch.male_f0_hz,
        GenderHint::Female => config.pitch.female_f0_hz,
        GenderHint::Child => config.pitch.child_f0_hz,
        GenderHint::Unspecified => (config.pitch.min_f0_hz, config.pitch.max_f0_hz),
    }
}

/// One detection pass over the whole waveform at a fixed band.
fn run_pass(
    samples: &[f32],
    sample_rate: u32,
    config: &VoiceQualityConfig,
    band_hz: (f32, f32),
    estimator: &dyn PitchEstimator,
) -> F0Contour {
    let sr = sample_rate as f32;
    let window = ((config.frames.window_ms / 1000.0) * sr) as usize;
    let hop = ((config.frames.hop_ms / 1000.0) * sr).max(1.0) as usize;

    // The estimator needs a buffer covering at least two full cycles of
    // the lowest frequency in the band, and never less than the frame
    // window. The power-of-two rounding happens after the max: the
    // detector sizes its FFT scratch from the buffer length, so a
    // non-power-of-two length is not merely slow, it is rejected.
    let min_buffer = (2.0 * sr / band_hz.0).ceil() as usize;
    let chunk_size = min_buffer.max(window).next_power_of_two();

    let mut frames = Vec::new();

    if window == 0 || samples.len() < window {
        return F0Contour {
            frames,
            window_ms: config.frames.window_ms,
            hop_ms: config.frames.hop_ms,
            band_hz,
            gender_class: GenderHint::Unspecified,
            detection_path: estimator.name(),
        };
    }

    let mut chunk = vec![0.0f32; chunk_size];
    let mut pos = 0;

    while pos + window <= samples.len() {
        let time = pos as f32 / sr;

        // Take a full chunk of real audio where available; zero-pad at
        // the tail so the contour keeps its window-based frame count.
        let end = (pos + chunk_size).min(samples.len());
        let available = end - pos;
        chunk[..available].copy_from_slice(&samples[pos..end]);
        chunk[available..].fill(0.0);

        let frequency = estimator.estimate(&chunk, sample_rate, band_hz.0, band_hz.1);

        frames.push(PitchFrame { time, frequency });
        pos += hop;
    }

    F0Contour {
        frames,
        window_ms: config.frames.window_ms,
        hop_ms: config.frames.hop_ms,
        band_hz,
        gender_class: GenderHint::Unspecified,
        detection_path: estimator.name(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::f32::consts::PI;

    fn sine_wave(freq_hz: f32, sample_rate: u32, duration_secs: f32) -> Vec<f32> {
        let num_samples = (sample_rate as f32 * duration_secs) as usize;
        (0..num_samples)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                0.7 * (2.0 * PI * freq_hz * t).sin()
            })
            .collect()
    }

    #[test]
    fn detects_120hz_sine() {
        let samples = sine_wave(120.0, 44100, 1.0);
        let contour = track(
            &samples,
            44100,
            &VoiceQualityConfig::default(),
            GenderHint::Unspecified,
            &Estimators::default(),
        );

        let frequencies = contour.voiced_frequencies();
        assert!(
            frequencies.len() >= MIN_VOICED_FRAMES,
            "Should detect pitch in a pure sine wave"
        );

        let mean: f32 = frequencies.iter().sum::<f32>() / frequencies.len() as f32;
        assert!(
            (mean - 120.0).abs() < 5.0,
            "Mean pitch should be ~120 Hz, got {mean:.1} Hz"
        );
    }

    #[test]
    fn auto_estimates_male_band() {
        let samples = sine_wave(120.0, 44100, 1.0);
        let contour = track(
            &samples,
            44100,
            &VoiceQualityConfig::default(),
            GenderHint::Unspecified,
            &Estimators::default(),
        );
        assert_eq!(contour.gender_class, GenderHint::Male);
        assert_eq!(contour.band_hz, VoiceQualityConfig::default().pitch.male_f0_hz);
    }

    #[test]
    fn female_band_floor_fits_inside_window() {
        // At the 150 Hz female floor two periods fit inside one 25 ms
        // window, the case where the buffer sizing must still come out
        // a power of two for the detector.
        let samples = sine_wave(220.0, 44100, 1.0);
        let contour = track(
            &samples,
            44100,
            &VoiceQualityConfig::default(),
            GenderHint::Female,
            &Estimators::default(),
        );
        let frequencies = contour.voiced_frequencies();
        assert!(frequencies.len() >= MIN_VOICED_FRAMES);
        let mean: f32 = frequencies.iter().sum::<f32>() / frequencies.len() as f32;
        assert!((mean - 220.0).abs() < 5.0, "got {mean:.1} Hz");
    }

    #[test]
    fn gender_hint_narrows_band() {
        let samples = sine_wave(300.0, 44100, 1.0);
        let contour = track(
            &samples,
            44100,
            &VoiceQualityConfig::default(),
            GenderHint::Child,
            &Estimators::default(),
        );
        assert_eq!(contour.gender_class, GenderHint::Child);
        assert_eq!(contour.band_hz, VoiceQualityConfig::default().pitch.child_f0_hz);

        let frequencies = contour.voiced_frequencies();
        assert!(!frequencies.is_empty());
        let mean: f32 = frequencies.iter().sum::<f32>() / frequencies.len() as f32;
        assert!((mean - 300.0).abs() < 10.0, "got {mean:.1} Hz");
    }

    #[test]
    fn silence_is_unvoiced() {
        let samples = vec![0.0; 44100];
        let contour = track(
            &samples,
            44100,
            &VoiceQualityConfig::default(),
            GenderHint::Unspecified,
            &Estimators::default(),
        );
        assert!(
            contour.voiced_fraction() < 0.1,
            "Silence should be mostly unvoiced, got {:.2}",
            contour.voiced_fraction()
        );
    }

    #[test]
    fn contour_timestamps_increase() {
        let samples = sine_wave(120.0, 44100, 0.5);
        let contour = track(
            &samples,
            44100,
            &VoiceQualityConfig::default(),
            GenderHint::Male,
            &Estimators::default(),
        );
        for pair in contour.frames.windows(2) {
            assert!(pair[1].time > pair[0].time);
        }
    }

    #[test]
    fn frame_count_matches_window_hop() {
        let sr = 44100u32;
        let samples = sine_wave(120.0, sr, 1.0);
        let contour = track(
            &samples,
            sr,
            &VoiceQualityConfig::default(),
            GenderHint::Male,
            &Estimators::default(),
        );
        let window = (0.025 * sr as f32) as usize;
        let hop = (0.010 * sr as f32) as usize;
        let expected = (samples.len() - window) / hop + 1;
        assert_eq!(contour.frames.len(), expected);
    }

    #[test]
    fn classify_thresholds() {
        assert_eq!(classify_gender(110.0), GenderHint::Male);
        assert_eq!(classify_gender(200.0), GenderHint::Female);
        assert_eq!(classify_gender(320.0), GenderHint::Child);
    }
}
