use crate::config::VoiceQualityConfig;
use crate::dsp::pitch::{F0Contour, MIN_VOICED_FRAMES};
use crate::dsp::precondition::Waveform;
use crate::result::{
    AcousticMetrics, ClinicalMetrics, Disorder, ProcessingInfo, QualityMetrics, SpectralMetrics,
    TemporalMetrics, VoiceQualityResult,
};

use super::clinical;

/// Assemble the final result. Pure aggregation: categorization,
/// disorder rules, confidence, warnings, and the free-text notes all
/// derive from metrics already computed; no new signal processing
/// happens here.
#[allow(clippy::too_many_arguments)]
pub fn aggregate(
    wave: &Waveform,
    f0: &F0Contour,
    acoustic: AcousticMetrics,
    spectral: SpectralMetrics,
    temporal: TemporalMetrics,
    clinical_metrics: ClinicalMetrics,
    config: &VoiceQualityConfig,
    mut warnings: Vec<String>,
    processing_ms: f64,
) -> VoiceQualityResult {
    let (category, deviation) = clinical::categorize(
        &acoustic,
        &clinical_metrics,
        wave.recording_quality,
        &config.thresholds,
    );
    let disorders = clinical::detect_disorders(&acoustic, &clinical_metrics);
    let confidence = clinical::confidence(
        wave.recording_quality,
        wave.snr_db,
        acoustic.f0_mean_hz,
        acoustic.f0_std_hz,
        wave.clipping_detected,
    );

    collect_warnings(wave, f0, &acoustic, config, &mut warnings);
    let clinical_notes = build_notes(&acoustic, &clinical_metrics, config);
    let recommended_assessments = build_recommendations(&clinical_metrics, &disorders);

    let voice_quality_index = (100.0 - 20.0 * deviation).clamp(0.0, 100.0);
    let estimated_intelligibility = (0.3 * wave.recording_quality
        + 0.4 * (acoustic.hnr_db / 25.0).min(1.0)
        + 0.3 * f0.voiced_fraction())
    .clamp(0.0, 1.0);

    let quality = QualityMetrics {
        snr_db: wave.snr_db,
        recording_quality: wave.recording_quality,
        clipping_detected: wave.clipping_detected,
        background_noise_db: wave.background_noise_db,
        voice_quality_index,
        estimated_intelligibility,
        voiced_fraction: f0.voiced_fraction(),
    };

    VoiceQualityResult {
        acoustic,
        spectral,
        temporal,
        clinical: clinical_metrics,
        quality,
        category,
        confidence,
        disorders,
        clinical_notes,
        recommended_assessments,
        warnings,
        processing: ProcessingInfo {
            sample_rate: wave.sample_rate,
            duration_s: wave.duration_s,
            processing_ms,
            pitch_detection_path: f0.detection_path.to_string(),
        },
    }
}

fn collect_warnings(
    wave: &Waveform,
    f0: &F0Contour,
    acoustic: &AcousticMetrics,
    config: &VoiceQualityConfig,
    warnings: &mut Vec<String>,
) {
    if wave.recording_quality == 0.0 {
        warnings.push("recording is empty or silent; all metrics unreliable".into());
    } else if wave.snr_db < config.quality.min_snr_db {
        warnings.push(format!(
            "low signal-to-noise ratio ({:.1} dB); perturbation metrics may be inflated",
            wave.snr_db
        ));
    }
    if wave.clipping_detected {
        warnings.push("clipping detected; amplitude-based metrics unreliable".into());
    }
    if f0.voiced_count() < MIN_VOICED_FRAMES && wave.recording_quality > 0.0 {
        warnings.push("pitch tracking unreliable: too few voiced frames".into());
    }
    if acoustic.jitter_percent > 10.0 || acoustic.shimmer_percent > 20.0 {
        warnings.push(
            "extreme perturbation values; verify the recording contains sustained phonation"
                .into(),
        );
    }
}

/// Rule-generated clinical notes: the same predicates that drive the
/// scores, rendered as text.
fn build_notes(
    acoustic: &AcousticMetrics,
    clinical_metrics: &ClinicalMetrics,
    config: &VoiceQualityConfig,
) -> Vec<String> {
    let mut notes = Vec::new();
    let t = &config.thresholds;

    if acoustic.jitter_percent > t.jitter_normal_percent {
        notes.push(format!(
            "Jitter {:.2}% exceeds the normal ceiling of {:.1}%.",
            acoustic.jitter_percent, t.jitter_normal_percent
        ));
    }
    if acoustic.shimmer_percent > t.shimmer_normal_percent {
        notes.push(format!(
            "Shimmer {:.2}% exceeds the normal ceiling of {:.1}%.",
            acoustic.shimmer_percent, t.shimmer_normal_percent
        ));
    }
    if acoustic.hnr_db > 0.0 && acoustic.hnr_db < t.hnr_normal_db {
        notes.push(format!(
            "Harmonics-to-noise ratio {:.1} dB is below the {:.0} dB normal floor.",
            acoustic.hnr_db, t.hnr_normal_db
        ));
    }
    if clinical_metrics.grade >= 2.0 {
        notes.push("Marked overall dysphonia severity (GRBAS Grade >= 2).".into());
    }
    if clinical_metrics.breathiness >= 2.0 {
        notes.push("Prominent breathiness suggests incomplete glottal closure.".into());
    }
    if clinical_metrics.tremor {
        notes.push(format!(
            "Vocal tremor detected at {:.1} Hz.",
            clinical_metrics.tremor_frequency_hz
        ));
    }
    if clinical_metrics.diplophonia {
        notes.push("Diplophonia pattern: bimodal fundamental frequency distribution.".into());
    }
    if clinical_metrics.voice_breaks > 0 {
        notes.push(format!(
            "{} voice break(s) of 50-250 ms during phonation.",
            clinical_metrics.voice_breaks
        ));
    }

    if notes.is_empty() {
        notes.push("Voice quality within normal limits.".into());
    }
    notes
}

fn build_recommendations(
    clinical_metrics: &ClinicalMetrics,
    disorders: &[crate::result::DisorderFinding],
) -> Vec<String> {
    let mut recs = Vec::new();

    let flagged = |d: Disorder| disorders.iter().any(|f| f.disorder == d);

    if clinical_metrics.grade >= 2.0 || flagged(Disorder::Dysphonia) {
        recs.push("Laryngoscopic examination to assess vocal fold structure.".into());
    }
    if flagged(Disorder::BreathyDysphonia) || clinical_metrics.breathiness >= 2.0 {
        recs.push("Aerodynamic assessment of glottal airflow.".into());
    }
    if flagged(Disorder::MuscleTensionDysphonia) {
        recs.push("Laryngeal palpation and voice therapy evaluation.".into());
    }
    if flagged(Disorder::VocalTremor) {
        recs.push("Neurological evaluation for vocal tremor.".into());
    }
    if flagged(Disorder::VocalFatigue) {
        recs.push("Vocal-load history and fatigue-protocol reassessment.".into());
    }
    if clinical_metrics.voice_breaks > 2 {
        recs.push("Stroboscopic assessment of phonation stability.".into());
    }

    recs
}
