use serde::{Deserialize, Serialize};

/// All tunable parameters for one analyzer instance.
///
/// serde's `default` attribute means: if a field is missing from a config
/// document, the value from the Default implementation is used instead of
/// failing to parse. Every field has a sensible clinical default, so an
/// empty config is a valid config.
///
/// The config is supplied at construction time and never mutated during
/// analysis.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct VoiceQualityConfig {
    pub frames: FrameConfig,
    pub pitch: PitchRangeConfig,
    pub thresholds: ClinicalThresholds,
    pub quality: QualityConfig,
}

/// Frame geometry shared by every frame-based extractor.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FrameConfig {
    /// Analysis window duration in milliseconds.
    pub window_ms: f32,
    /// How far to advance between frames, in milliseconds.
    pub hop_ms: f32,
}

/// F0 search bounds, overall and per gender band.
///
/// When the caller supplies a gender hint the matching band is used
/// directly. Without a hint the tracker runs a full-band pass, estimates
/// the gender class from the mean F0, and reruns with the narrower band
/// to avoid octave errors at the band edges.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PitchRangeConfig {
    /// Full search band used when no gender hint is available.
    pub min_f0_hz: f32,
    pub max_f0_hz: f32,
    /// Gender-specific bands.
    pub male_f0_hz: (f32, f32),
    pub female_f0_hz: (f32, f32),
    pub child_f0_hz: (f32, f32),
}

/// Clinical normal-range constants.
///
/// These are approximations of published clinical literature, not values
/// validated against a reference corpus. They are configuration defaults
/// exposed for calibration, not ground truth.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ClinicalThresholds {
    /// Jitter above this is considered abnormal (percent).
    pub jitter_normal_percent: f32,
    /// Shimmer above this is considered abnormal (percent).
    pub shimmer_normal_percent: f32,
    /// HNR below this starts accumulating deviation (dB).
    pub hnr_normal_db: f32,
    /// Upper bound of each GRBAS component.
    pub grbas_scale_max: f32,
    /// Maximum number of formants to report.
    pub formant_count: usize,
}

/// Recording-quality gates applied by the preconditioner.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct QualityConfig {
    /// A sample counts as clipped when |amplitude| exceeds this.
    pub clip_level: f32,
    /// Fraction of clipped samples above which the recording is flagged.
    pub clip_ratio: f32,
    /// SNR below this raises a low-SNR warning (dB).
    pub min_snr_db: f32,
}

impl Default for VoiceQualityConfig {
    fn default() -> Self {
        Self {
            frames: FrameConfig::default(),
            pitch: PitchRangeConfig::default(),
            thresholds: ClinicalThresholds::default(),
            quality: QualityConfig::default(),
        }
    }
}

impl Default for FrameConfig {
    fn default() -> Self {
        Self {
            window_ms: 25.0,
            hop_ms: 10.0,
        }
    }
}

impl Default for PitchRangeConfig {
    fn default() -> Self {
        Self {
            min_f0_hz: 75.0,
            max_f0_hz: 600.0,
            male_f0_hz: (75.0, 200.0),
            female_f0_hz: (150.0, 400.0),
            child_f0_hz: (200.0, 600.0),
        }
    }
}

impl Default for ClinicalThresholds {
    fn default() -> Self {
        Self {
            jitter_normal_percent: 1.0,
            shimmer_normal_percent: 3.0,
            hnr_normal_db: 20.0,
            grbas_scale_max: 3.0,
            formant_count: 3,
        }
    }
}

impl Default for QualityConfig {
    fn default() -> Self {
        Self {
            clip_level: 0.99,
            clip_ratio: 0.01,
            min_snr_db: 10.0,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        let cfg = VoiceQualityConfig::default();
        assert_eq!(cfg.frames.window_ms, 25.0);
        assert_eq!(cfg.frames.hop_ms, 10.0);
        assert_eq!(cfg.thresholds.jitter_normal_percent, 1.0);
        assert_eq!(cfg.thresholds.formant_count, 3);
    }

    #[test]
    fn partial_json_uses_defaults() {
        // If the caller only specifies some fields, the rest should be defaults
        let json = r#"{"thresholds": {"jitter_normal_percent": 0.8}}"#;
        let cfg: VoiceQualityConfig = serde_json::from_str(json).unwrap();
        assert_eq!(cfg.thresholds.jitter_normal_percent, 0.8);
        assert_eq!(cfg.thresholds.shimmer_normal_percent, 3.0);
        assert_eq!(cfg.pitch.min_f0_hz, 75.0);
    }

    #[test]
    fn roundtrip_json() {
        let cfg = VoiceQualityConfig::default();
        let json = serde_json::to_string(&cfg).unwrap();
        let loaded: VoiceQualityConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded.pitch.male_f0_hz, cfg.pitch.male_f0_hz);
    }
}
