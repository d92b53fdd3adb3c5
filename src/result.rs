use serde::{Deserialize, Serialize};

/// Optional gender hint narrowing the F0 search band.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum GenderHint {
    Male,
    Female,
    Child,
    #[default]
    Unspecified,
}

/// Overall voice quality category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum VoiceCategory {
    Excellent,
    Good,
    Fair,
    Poor,
    Critical,
}

/// Disorders the rule evaluator can flag. Multiple disorders may co-occur.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Disorder {
    /// No rule triggered; reported with probability 1.0.
    None,
    /// Grade > 1 but no specific rule triggered.
    Unspecified,
    Dysphonia,
    BreathyDysphonia,
    MuscleTensionDysphonia,
    VocalTremor,
    Diplophonia,
    VocalFatigue,
}

/// One flagged disorder with the rule's score as probability.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisorderFinding {
    pub disorder: Disorder,
    /// Rule score in [0, 1].
    pub probability: f32,
}

/// Perturbation and noise metrics derived from the F0 contour and waveform.
///
/// All ratio/percent fields are non-negative. HNR is floored at 0 dB when
/// no periodicity is found, never negative infinity. Any metric that could
/// not be computed is 0.0 and named in the result's warnings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AcousticMetrics {
    pub f0_mean_hz: f32,
    pub f0_std_hz: f32,
    pub f0_min_hz: f32,
    pub f0_max_hz: f32,
    pub f0_range_hz: f32,
    /// Mean absolute difference of consecutive pitch periods, milliseconds.
    pub jitter_absolute_ms: f32,
    /// Same, divided by the mean period, as a percentage.
    pub jitter_percent: f32,
    /// Relative average perturbation (three-point smoothed).
    pub jitter_rap_percent: f32,
    /// Five-point period perturbation quotient. Requires >= 5 voiced frames.
    pub jitter_ppq5_percent: f32,
    /// Mean |20*log10(A(i+1)/A(i))| over consecutive cycle peaks, dB.
    pub shimmer_db: f32,
    pub shimmer_percent: f32,
    /// Three-point amplitude perturbation quotient.
    pub shimmer_apq3_percent: f32,
    /// Eleven-point amplitude perturbation quotient.
    pub shimmer_apq11_percent: f32,
    pub hnr_db: f32,
    /// Noise-to-harmonics ratio (linear, non-negative).
    pub nhr: f32,
    /// Voice turbulence index: energy above 2.5 kHz over low-pass energy.
    pub vti: f32,
    /// Soft phonation index: 70-1600 Hz energy over 1600-4500 Hz energy.
    pub spi: f32,
    /// Smoothed cepstral peak prominence, dB.
    pub cpps_db: f32,
    pub energy_mean: f32,
    pub energy_std: f32,
    pub zero_crossing_rate: f32,
}

/// One vocal-tract resonance.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Formant {
    pub frequency_hz: f32,
    pub bandwidth_hz: f32,
}

/// Spectral shape and formant metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SpectralMetrics {
    pub centroid_hz: f32,
    pub spread_hz: f32,
    pub skewness: f32,
    pub kurtosis: f32,
    pub flux: f32,
    /// Frequency below which 85% of spectral energy lies, Hz.
    pub rolloff_hz: f32,
    /// Mean log-magnitude vs log-frequency regression slope.
    pub slope: f32,
    /// Up to 3 formants in [200, 5000] Hz, ascending.
    pub formants: Vec<Formant>,
    /// Energy below 1 kHz over energy above 1 kHz.
    pub low_high_ratio: f32,
    /// Mean magnitude in the lowest vs highest quartile of frequency bins
    /// (spectral tilt proxy), dB.
    pub alpha_ratio_db: f32,
}

/// Temporal rhythm metrics from voiced-segment structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TemporalMetrics {
    /// Candidate syllable nuclei per second of total duration.
    pub speaking_rate: f32,
    /// Candidate syllable nuclei per second of voiced duration.
    pub articulation_rate: f32,
    pub pause_count: usize,
    pub pause_mean_s: f32,
    pub pause_std_s: f32,
    /// Fraction of total duration spent in pauses.
    pub pause_ratio: f32,
    /// 1 / (1 + stdev(inter-segment gap)); near 1 = metronomic.
    pub rhythm_regularity: f32,
    /// Coefficient of variation of inter-peak intervals.
    pub tempo_variability: f32,
    /// Time from recording start to the first voiced segment, seconds.
    pub voice_onset_s: f32,
    /// Trailing silence after the last voiced segment, seconds.
    pub voice_offset_s: f32,
    /// Rise time from segment start to 90% of peak energy, seconds.
    pub voice_attack_s: f32,
    /// Duration of the longest continuous voiced run, seconds.
    pub max_phonation_time_s: f32,
}

/// GRBAS-style severity components and disorder-adjacent flags.
/// Each GRBAS component is clamped to [0, 3].
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ClinicalMetrics {
    pub grade: f32,
    pub roughness: f32,
    pub breathiness: f32,
    pub asthenia: f32,
    pub strain: f32,
    /// Weighted composite of grade/roughness/breathiness, 0-100.
    pub hoarseness_index: f32,
    pub voice_breaks: usize,
    pub diplophonia: bool,
    pub tremor: bool,
    /// Dominant F0 modulation frequency when tremor is flagged, Hz.
    pub tremor_frequency_hz: f32,
    /// Airflow proxy in [0, 1]: higher means more turbulent leakage.
    pub estimated_airflow: f32,
    /// Glottal-efficiency proxy in [0, 1]: higher means cleaner closure.
    pub glottal_efficiency: f32,
}

/// Recording quality and reliability metrics.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct QualityMetrics {
    pub snr_db: f32,
    /// Composite recording quality in [0, 1]. 0 for empty/silent input.
    pub recording_quality: f32,
    pub clipping_detected: bool,
    /// Estimated noise floor, dB relative to full scale.
    pub background_noise_db: f32,
    /// Composite voice quality index in [0, 100].
    pub voice_quality_index: f32,
    /// Estimated intelligibility in [0, 1].
    pub estimated_intelligibility: f32,
    /// Fraction of frames with detected pitch.
    pub voiced_fraction: f32,
}

/// Processing metadata stamped on every result.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProcessingInfo {
    pub sample_rate: u32,
    pub duration_s: f32,
    pub processing_ms: f64,
    /// Name of the estimator that produced the contour, e.g. "mcleod"
    /// or "autocorrelation" when the fallback ran.
    pub pitch_detection_path: String,
}

/// The complete, serializable analysis result.
///
/// Constructed exactly once per `analyze()` call and read-only thereafter.
/// Degraded confidence and populated warnings are the signal of reduced
/// reliability — a caller always receives a complete result.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VoiceQualityResult {
    pub acoustic: AcousticMetrics,
    pub spectral: SpectralMetrics,
    pub temporal: TemporalMetrics,
    pub clinical: ClinicalMetrics,
    pub quality: QualityMetrics,
    pub category: VoiceCategory,
    /// Mean of recording quality, SNR factor, F0 consistency, clipping factor.
    pub confidence: f32,
    pub disorders: Vec<DisorderFinding>,
    pub clinical_notes: Vec<String>,
    pub recommended_assessments: Vec<String>,
    pub warnings: Vec<String>,
    pub processing: ProcessingInfo,
}

impl VoiceQualityResult {
    /// Reference JSON serialization used by the surrounding application.
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn result_roundtrip() {
        let result = VoiceQualityResult {
            acoustic: AcousticMetrics {
                f0_mean_hz: 118.3,
                jitter_percent: 0.42,
                shimmer_percent: 2.1,
                hnr_db: 24.5,
                ..Default::default()
            },
            spectral: SpectralMetrics {
                centroid_hz: 812.0,
                formants: vec![Formant {
                    frequency_hz: 705.0,
                    bandwidth_hz: 90.0,
                }],
                ..Default::default()
            },
            temporal: TemporalMetrics::default(),
            clinical: ClinicalMetrics::default(),
            quality: QualityMetrics {
                snr_db: 32.0,
                recording_quality: 0.95,
                ..Default::default()
            },
            category: VoiceCategory::Good,
            confidence: 0.9,
            disorders: vec![DisorderFinding {
                disorder: Disorder::None,
                probability: 1.0,
            }],
            clinical_notes: vec!["Voice quality within normal limits.".into()],
            recommended_assessments: Vec::new(),
            warnings: Vec::new(),
            processing: ProcessingInfo {
                sample_rate: 44100,
                duration_s: 3.0,
                processing_ms: 12.0,
                pitch_detection_path: "primary".into(),
            },
        };

        let json = result.to_json().unwrap();
        let loaded: VoiceQualityResult = serde_json::from_str(&json).unwrap();

        assert_eq!(loaded.category, VoiceCategory::Good);
        assert_eq!(loaded.disorders[0].disorder, Disorder::None);
        assert!((loaded.acoustic.hnr_db - 24.5).abs() < 0.01);
        assert_eq!(loaded.spectral.formants.len(), 1);
    }

    #[test]
    fn category_serializes_screaming_snake() {
        let json = serde_json::to_string(&VoiceCategory::Critical).unwrap();
        assert_eq!(json, "\"CRITICAL\"");
        let json = serde_json::to_string(&Disorder::BreathyDysphonia).unwrap();
        assert_eq!(json, "\"BREATHY_DYSPHONIA\"");
    }

    #[test]
    fn gender_hint_lowercase() {
        let hint: GenderHint = serde_json::from_str("\"female\"").unwrap();
        assert_eq!(hint, GenderHint::Female);
        assert_eq!(GenderHint::default(), GenderHint::Unspecified);
    }
}
