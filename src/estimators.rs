//! Capability interfaces over the external phonetic toolkit.
//!
//! The analyzer depends on three numeric capabilities: pitch estimation,
//! formant estimation, and harmonicity estimation. Each is a trait with
//! a concrete implementation chosen at construction time, so swapping
//! the primary toolkit for the in-module fallback (or for a different
//! toolkit entirely) never changes the public contract.

use pitch_detection::detector::mcleod::McLeodDetector;
use pitch_detection::detector::PitchDetector;

use crate::dsp::pitch::PitchFrame;
use crate::dsp::{formants, hnr, windowing};
use crate::result::Formant;

/// Estimates the fundamental frequency of one analysis chunk.
pub trait PitchEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// F0 of `chunk` bounded to [min_f0, max_f0] Hz, or None if the
    /// chunk is unvoiced. Never returns a negative or non-finite value.
    fn estimate(&self, chunk: &[f32], sample_rate: u32, min_f0: f32, max_f0: f32) -> Option<f32>;
}

/// Estimates vocal-tract resonances from a waveform.
pub trait FormantEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Up to `max_count` formants sorted by ascending frequency.
    /// Returns an empty Vec when nothing can be estimated.
    fn formants(&self, samples: &[f32], sample_rate: u32, max_count: usize) -> Vec<Formant>;
}

/// Estimates the harmonics-to-noise ratio over a pitch contour.
pub trait HarmonicityEstimator: Send + Sync {
    fn name(&self) -> &'static str;

    /// Mean HNR in dB over voiced frames, or None when no voiced frame
    /// yields a valid measurement.
    fn harmonicity_db(
        &self,
        samples: &[f32],
        sample_rate: u32,
        frames: &[PitchFrame],
        hop_ms: f32,
    ) -> Option<f32>;
}

/// The estimator set one analyzer instance uses.
///
/// Defaults to the McLeod pitch detector as primary with the
/// autocorrelation estimators behind it. The fields are public so a
/// caller with a different toolkit can inject its own implementations.
pub struct Estimators {
    pub pitch: Box<dyn PitchEstimator>,
    pub pitch_fallback: Box<dyn PitchEstimator>,
    pub formant: Box<dyn FormantEstimator>,
    pub harmonicity: Box<dyn HarmonicityEstimator>,
}

impl Default for Estimators {
    fn default() -> Self {
        Self {
            pitch: Box::new(McLeodPitchEstimator::default()),
            pitch_fallback: Box::new(AcfPitchEstimator::default()),
            formant: Box::new(LpcFormantEstimator::default()),
            harmonicity: Box::new(AcfHarmonicityEstimator),
        }
    }
}

impl Estimators {
    /// Pure in-module estimators, no external detector. Useful when the
    /// toolkit is unavailable; the public contract is unchanged.
    pub fn fallback_only() -> Self {
        Self {
            pitch: Box::new(AcfPitchEstimator::default()),
            pitch_fallback: Box::new(AcfPitchEstimator::default()),
            formant: Box::new(LpcFormantEstimator::default()),
            harmonicity: Box::new(AcfHarmonicityEstimator),
        }
    }
}

/// McLeod pitch method via the `pitch-detection` crate.
///
/// The McLeod method computes a normalized autocorrelation of the chunk
/// and picks the period of repetition; it is robust to harmonics and
/// works well on voice.
pub struct McLeodPitchEstimator {
    /// Filters out low-energy frames. Higher = stricter.
    pub power_threshold: f64,
    /// How confident the detector must be, 0.0-1.0. Kept permissive so
    /// breathy voices with naturally low clarity still register.
    pub clarity_threshold: f64,
}

impl Default for McLeodPitchEstimator {
    fn default() -> Self {
        Self {
            power_threshold: 0.2,
            clarity_threshold: 0.3,
        }
    }
}

impl PitchEstimator for McLeodPitchEstimator {
    fn name(&self) -> &'static str {
        "mcleod"
    }

    fn estimate(&self, chunk: &[f32], sample_rate: u32, min_f0: f32, max_f0: f32) -> Option<f32> {
        if chunk.is_empty() {
            return None;
        }

        let windowed = windowing::hanning(chunk);
        let padded: Vec<f64> = windowed.iter().map(|&s| s as f64).collect();

        let padding = chunk.len() / 2;
        let mut detector = McLeodDetector::new(chunk.len(), padding);
        let pitch = detector.get_pitch(
            &padded,
            sample_rate as usize,
            self.power_threshold,
            self.clarity_threshold,
        );

        // Reject sub-band rumble and artifacts outside the search band.
        pitch
            .map(|p| p.frequency as f32)
            .filter(|&f| f.is_finite() && f >= min_f0 && f <= max_f0)
    }
}

/// In-module fallback: normalized autocorrelation peak over the lag
/// range of the search band, with parabolic refinement.
pub struct AcfPitchEstimator {
    /// Minimum normalized correlation for a frame to count as voiced.
    pub voicing_threshold: f32,
}

impl Default for AcfPitchEstimator {
    fn default() -> Self {
        Self {
            voicing_threshold: 0.5,
        }
    }
}

impl PitchEstimator for AcfPitchEstimator {
    fn name(&self) -> &'static str {
        "autocorrelation"
    }

    fn estimate(&self, chunk: &[f32], sample_rate: u32, min_f0: f32, max_f0: f32) -> Option<f32> {
        let sr = sample_rate as f32;
        let min_lag = (sr / max_f0).floor().max(1.0) as usize;
        let max_lag = (sr / min_f0).ceil() as usize;

        if max_lag * 2 > chunk.len() || min_lag >= max_lag {
            return None;
        }

        // Bound the correlation window to two periods of the lowest
        // frequency so the per-frame cost stays linear in the band.
        let window = &chunk[..(max_lag * 2).min(chunk.len())];

        // Silence gate: autocorrelation of near-zero signal is noise.
        let energy: f32 = window.iter().map(|&s| s * s).sum();
        if energy < 1e-6 {
            return None;
        }

        let mut best_lag = 0;
        let mut best_r = 0.0f32;
        for lag in min_lag..=max_lag {
            let r = hnr::normalized_autocorrelation(window, lag);
            if r > best_r {
                best_r = r;
                best_lag = lag;
            }
        }

        if best_r < self.voicing_threshold || best_lag == 0 {
            return None;
        }

        // Parabolic interpolation around the peak for sub-sample lag.
        let refined = if best_lag > min_lag && best_lag < max_lag {
            let r_prev = hnr::normalized_autocorrelation(window, best_lag - 1);
            let r_next = hnr::normalized_autocorrelation(window, best_lag + 1);
            let denom = r_prev - 2.0 * best_r + r_next;
            if denom.abs() > 1e-9 {
                best_lag as f32 + 0.5 * (r_prev - r_next) / denom
            } else {
                best_lag as f32
            }
        } else {
            best_lag as f32
        };

        let f0 = sr / refined;
        (f0.is_finite() && f0 >= min_f0 && f0 <= max_f0).then_some(f0)
    }
}

/// Linear-prediction formant estimation (the in-module fallback path;
/// also the shipped default since no external formant tracker ships
/// with the crate).
pub struct LpcFormantEstimator {
    pub window_ms: f32,
    pub hop_ms: f32,
}

impl Default for LpcFormantEstimator {
    fn default() -> Self {
        Self {
            window_ms: 25.0,
            hop_ms: 10.0,
        }
    }
}

impl FormantEstimator for LpcFormantEstimator {
    fn name(&self) -> &'static str {
        "lpc"
    }

    fn formants(&self, samples: &[f32], sample_rate: u32, max_count: usize) -> Vec<Formant> {
        formants::estimate_formants(samples, sample_rate, self.window_ms, self.hop_ms, max_count)
    }
}

/// Per-frame normalized autocorrelation harmonicity (Boersma's method).
pub struct AcfHarmonicityEstimator;

impl HarmonicityEstimator for AcfHarmonicityEstimator {
    fn name(&self) -> &'static str {
        "autocorrelation"
    }

    fn harmonicity_db(
        &self,
        samples: &[f32],
        sample_rate: u32,
        frames: &[PitchFrame],
        hop_ms: f32,
    ) -> Option<f32> {
        hnr::compute_hnr_db(samples, sample_rate, frames, hop_ms)
    }
}
