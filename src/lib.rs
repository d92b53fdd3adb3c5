//! Voice quality and clinical acoustic biomarker analysis.
//!
//! Takes a complete monophonic PCM recording and produces a structured,
//! clinically interpretable assessment of vocal health: perturbation
//! (jitter, shimmer, HNR, CPPS), spectral balance and formants,
//! temporal rhythm, and a deterministic GRBAS-style clinical score with
//! disorder rules.
//!
//! ```no_run
//! use voxmetrics::{AnalyzeOptions, VoiceQualityAnalyzer, VoiceQualityConfig};
//!
//! let analyzer = VoiceQualityAnalyzer::new(VoiceQualityConfig::default());
//! let samples: Vec<f32> = vec![];
//! let result = analyzer.analyze(&samples, 44100, &AnalyzeOptions::default())?;
//! println!("{}", result.to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! Everything is CPU-bound and deterministic: the same waveform and
//! config always produce the same metrics. The analyzer is `Send + Sync`,
//! so batch callers can share one instance across a worker pool, one
//! recording per task.

use std::time::Instant;

pub mod analysis;
pub mod config;
pub mod dsp;
pub mod error;
pub mod estimators;
pub mod result;

pub use config::VoiceQualityConfig;
pub use error::AnalyzerError;
pub use estimators::Estimators;
pub use result::{GenderHint, VoiceCategory, VoiceQualityResult};

use analysis::{aggregator, clinical, perturbation, spectral, temporal};
use dsp::{pitch, precondition};

/// Per-call options.
#[derive(Debug, Clone, Default)]
pub struct AnalyzeOptions {
    /// Narrows the F0 search band when known.
    pub gender_hint: GenderHint,
    /// Caller identity, passed through to the analysis log span for
    /// audit trails. No authorization logic happens here.
    pub audit_token: Option<String>,
}

/// The analyzer: a config plus an estimator set, immutable after
/// construction.
pub struct VoiceQualityAnalyzer {
    config: VoiceQualityConfig,
    estimators: Estimators,
}

impl VoiceQualityAnalyzer {
    pub fn new(config: VoiceQualityConfig) -> Self {
        Self {
            config,
            estimators: Estimators::default(),
        }
    }

    /// Construct with caller-supplied estimator implementations.
    pub fn with_estimators(config: VoiceQualityConfig, estimators: Estimators) -> Self {
        Self { config, estimators }
    }

    pub fn config(&self) -> &VoiceQualityConfig {
        &self.config
    }

    /// Run the full pipeline over one recording.
    ///
    /// Fails only on a caller contract violation (zero sample rate,
    /// non-finite samples). Everything else — silence, noise, too few
    /// voiced frames — completes with zeroed metrics, degraded
    /// confidence, and populated warnings.
    pub fn analyze(
        &self,
        samples: &[f32],
        sample_rate: u32,
        options: &AnalyzeOptions,
    ) -> Result<VoiceQualityResult, AnalyzerError> {
        let span = tracing::info_span!(
            "voice_analysis",
            audit = options.audit_token.as_deref().unwrap_or(""),
            sample_rate,
            samples = samples.len(),
        );
        let _guard = span.enter();
        let start = Instant::now();

        let wave = precondition::precondition(samples, sample_rate, &self.config.quality)?;
        let mut warnings = Vec::new();

        let f0 = pitch::track(
            &wave.samples,
            sample_rate,
            &self.config,
            options.gender_hint,
            &self.estimators,
        );
        if f0.detection_path != self.estimators.pitch.name() {
            warnings.push(format!(
                "primary pitch estimator produced too few voiced frames; used {} fallback",
                f0.detection_path
            ));
        }

        let acoustic = perturbation::analyze(&wave, &f0, &self.config, &self.estimators, &mut warnings);
        let spectral_metrics = spectral::analyze(&wave, &self.config, &self.estimators);
        let temporal_metrics = temporal::analyze(&wave, &f0, &self.config);
        let clinical_metrics =
            clinical::score(&acoustic, &spectral_metrics, &f0, &self.config.thresholds);

        let processing_ms = start.elapsed().as_secs_f64() * 1000.0;
        tracing::debug!(
            elapsed_ms = processing_ms,
            voiced_frames = f0.voiced_count(),
            "analysis complete"
        );

        Ok(aggregator::aggregate(
            &wave,
            &f0,
            acoustic,
            spectral_metrics,
            temporal_metrics,
            clinical_metrics,
            &self.config,
            warnings,
            processing_ms,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::result::Disorder;

    const SR: u32 = 44100;

    /// Deterministic LCG noise in [-1, 1].
    struct Lcg(u32);

    impl Lcg {
        fn next(&mut self) -> f32 {
            self.0 = self.0.wrapping_mul(1103515245).wrapping_add(12345);
            (self.0 as f32 / u32::MAX as f32) * 2.0 - 1.0
        }
    }

    /// Synthetic vowel: an impulse train with per-cycle period and
    /// amplitude perturbation, shaped by second-order resonators, with
    /// silence padding at both ends.
    fn synth_vowel(
        f0: f32,
        duration: f32,
        period_jitter: f32,
        amp_shimmer: f32,
        seed: u32,
    ) -> Vec<f32> {
        let n = (SR as f32 * duration) as usize;
        let base_period = SR as f32 / f0;
        let mut rng = Lcg(seed);

        let mut excitation = vec![0.0f32; n];
        let mut pos = 0.0f32;
        while (pos as usize) < n {
            let amp = 1.0 + amp_shimmer * rng.next();
            excitation[pos as usize] = amp.max(0.05);
            pos += base_period * (1.0 + period_jitter * rng.next());
        }

        let mut signal = excitation;
        for &(freq, bw) in &[(700.0f32, 80.0f32), (1200.0, 90.0), (2700.0, 120.0)] {
            let r = (-std::f32::consts::PI * bw / SR as f32).exp();
            let theta = 2.0 * std::f32::consts::PI * freq / SR as f32;
            let a1 = 2.0 * r * theta.cos();
            let a2 = -r * r;
            let mut out = vec![0.0f32; signal.len()];
            for i in 0..signal.len() {
                let y1 = if i >= 1 { out[i - 1] } else { 0.0 };
                let y2 = if i >= 2 { out[i - 2] } else { 0.0 };
                out[i] = signal[i] + a1 * y1 + a2 * y2;
            }
            signal = out;
        }

        let peak = signal.iter().fold(0.0f32, |m, &s| m.max(s.abs()));
        if peak > 0.0 {
            for s in &mut signal {
                *s *= 0.7 / peak;
            }
        }

        let pad = vec![0.0f32; (SR as f32 * 0.15) as usize];
        let mut samples = pad.clone();
        samples.extend(signal);
        samples.extend(pad);
        samples
    }

    fn analyzer() -> VoiceQualityAnalyzer {
        VoiceQualityAnalyzer::new(VoiceQualityConfig::default())
    }

    #[test]
    fn healthy_vowel_scores_normal() {
        // 122.5 Hz is exactly 360 samples per period at 44.1 kHz, so the
        // clean fixture has no quantization-induced perturbation.
        let samples = synth_vowel(122.5, 3.0, 0.0, 0.0, 7);
        let result = analyzer()
            .analyze(&samples, SR, &AnalyzeOptions::default())
            .unwrap();

        assert!(
            matches!(
                result.category,
                VoiceCategory::Excellent | VoiceCategory::Good
            ),
            "got {:?} (jitter {:.2}%, shimmer {:.2}%, hnr {:.1} dB)",
            result.category,
            result.acoustic.jitter_percent,
            result.acoustic.shimmer_percent,
            result.acoustic.hnr_db,
        );
        assert_eq!(result.disorders.len(), 1);
        assert_eq!(result.disorders[0].disorder, Disorder::None);

        assert!((result.acoustic.f0_mean_hz - 120.0).abs() < 6.0);
        assert!(result.acoustic.jitter_percent < 0.5);
        assert!(result.acoustic.hnr_db > 15.0);
        assert!(result.quality.recording_quality > 0.8);
        assert!(result.confidence > 0.7);

        // The injected resonances should be recovered approximately.
        if let Some(f1) = result.spectral.formants.first() {
            assert!(
                (500.0..950.0).contains(&f1.frequency_hz),
                "F1 {:.0}",
                f1.frequency_hz
            );
        }
    }

    #[test]
    fn fallback_estimators_keep_the_contract() {
        // Without the external detector, the autocorrelation stack has
        // to carry the same clean-vowel scenario to the same category.
        let samples = synth_vowel(122.5, 3.0, 0.0, 0.0, 7);
        let an = VoiceQualityAnalyzer::with_estimators(
            VoiceQualityConfig::default(),
            Estimators::fallback_only(),
        );
        let result = an
            .analyze(&samples, SR, &AnalyzeOptions::default())
            .unwrap();

        assert_eq!(result.processing.pitch_detection_path, "autocorrelation");
        assert!(
            matches!(
                result.category,
                VoiceCategory::Excellent | VoiceCategory::Good
            ),
            "got {:?} (jitter {:.2}%, shimmer {:.2}%, hnr {:.1} dB)",
            result.category,
            result.acoustic.jitter_percent,
            result.acoustic.shimmer_percent,
            result.acoustic.hnr_db,
        );
        assert!((result.acoustic.f0_mean_hz - 122.5).abs() < 6.0);
    }

    #[test]
    fn perturbed_vowel_is_pathological() {
        let samples = synth_vowel(120.0, 3.0, 0.04, 0.15, 7);
        let result = analyzer()
            .analyze(&samples, SR, &AnalyzeOptions::default())
            .unwrap();

        assert!(
            matches!(result.category, VoiceCategory::Poor | VoiceCategory::Critical),
            "got {:?} (jitter {:.2}%, shimmer {:.2}%, hnr {:.1} dB)",
            result.category,
            result.acoustic.jitter_percent,
            result.acoustic.shimmer_percent,
            result.acoustic.hnr_db,
        );

        let dysphonia = result
            .disorders
            .iter()
            .find(|f| f.disorder == Disorder::Dysphonia)
            .expect("dysphonia should be detected");
        assert!(dysphonia.probability > 0.5, "p = {}", dysphonia.probability);
    }

    #[test]
    fn white_noise_not_rated_healthy() {
        let mut rng = Lcg(42);
        let samples: Vec<f32> = (0..3 * SR as usize).map(|_| 0.5 * rng.next()).collect();
        let result = analyzer()
            .analyze(&samples, SR, &AnalyzeOptions::default())
            .unwrap();

        assert!(result.acoustic.hnr_db < 5.0, "hnr {}", result.acoustic.hnr_db);
        assert!(
            !matches!(
                result.category,
                VoiceCategory::Excellent | VoiceCategory::Good
            ),
            "noise rated {:?}",
            result.category
        );
    }

    #[test]
    fn silence_completes_with_warnings() {
        let samples = vec![0.0f32; 2 * SR as usize];
        let result = analyzer()
            .analyze(&samples, SR, &AnalyzeOptions::default())
            .unwrap();

        assert_eq!(result.quality.recording_quality, 0.0);
        assert_eq!(result.acoustic.f0_mean_hz, 0.0);
        assert_eq!(result.acoustic.jitter_percent, 0.0);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn empty_input_completes() {
        let result = analyzer()
            .analyze(&[], SR, &AnalyzeOptions::default())
            .unwrap();
        assert_eq!(result.processing.duration_s, 0.0);
        assert_eq!(result.quality.recording_quality, 0.0);
        assert!(!result.warnings.is_empty());
    }

    #[test]
    fn zero_sample_rate_rejected() {
        let err = analyzer()
            .analyze(&[0.1, 0.2], 0, &AnalyzeOptions::default())
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidArgument(_)));
    }

    #[test]
    fn non_finite_samples_rejected() {
        let err = analyzer()
            .analyze(&[0.1, f32::INFINITY], SR, &AnalyzeOptions::default())
            .unwrap_err();
        assert!(matches!(err, AnalyzerError::InvalidArgument(_)));
    }

    #[test]
    fn analysis_is_deterministic() {
        let samples = synth_vowel(150.0, 2.0, 0.01, 0.05, 3);
        let an = analyzer();
        let opts = AnalyzeOptions::default();

        let mut a = an.analyze(&samples, SR, &opts).unwrap();
        let mut b = an.analyze(&samples, SR, &opts).unwrap();

        // Elapsed time is the only field allowed to differ.
        a.processing.processing_ms = 0.0;
        b.processing.processing_ms = 0.0;

        assert_eq!(a.to_json().unwrap(), b.to_json().unwrap());
    }

    #[test]
    fn gender_hint_is_respected() {
        let samples = synth_vowel(120.0, 2.0, 0.0, 0.0, 11);
        let result = analyzer()
            .analyze(
                &samples,
                SR,
                &AnalyzeOptions {
                    gender_hint: GenderHint::Male,
                    audit_token: None,
                },
            )
            .unwrap();
        assert!((result.acoustic.f0_mean_hz - 120.0).abs() < 6.0);
    }

    #[test]
    fn result_serializes() {
        let samples = synth_vowel(120.0, 1.5, 0.0, 0.0, 5);
        let result = analyzer()
            .analyze(&samples, SR, &AnalyzeOptions::default())
            .unwrap();
        let json = result.to_json().unwrap();
        assert!(json.contains("\"category\""));
        assert!(json.contains("\"f0_mean_hz\""));
    }
}
