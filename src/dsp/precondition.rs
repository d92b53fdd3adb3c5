use crate::config::QualityConfig;
use crate::error::AnalyzerError;

use super::spectrum;

/// SNR is capped here when the noise-floor decile is numerically zero
/// (synthetic or digitally silent recordings).
const MAX_SNR_DB: f32 = 60.0;

/// Noise floor reported for digitally silent recordings, dBFS.
const NOISE_FLOOR_DB: f32 = -100.0;

/// Frame geometry used for the decile SNR estimate. Coarser than the
/// analysis frames on purpose: 50 ms frames average over whole pitch
/// periods.
const SNR_FRAME_MS: f32 = 50.0;
const SNR_HOP_MS: f32 = 25.0;

/// The validated, peak-normalized signal every downstream stage works on.
#[derive(Debug, Clone)]
pub struct Waveform {
    /// Samples scaled so the absolute peak is 1.0 (all-zero input stays
    /// all-zero).
    pub samples: Vec<f32>,
    pub sample_rate: u32,
    pub duration_s: f32,
    /// Measured on the raw samples, before normalization.
    pub snr_db: f32,
    pub clipping_detected: bool,
    /// Estimated noise floor, dB relative to full scale.
    pub background_noise_db: f32,
    /// Composite recording quality in [0, 1].
    pub recording_quality: f32,
}

/// Validate and precondition raw input.
///
/// A zero sample rate or any non-finite sample is a caller bug and
/// fails with `InvalidArgument`. Empty or all-zero input is a valid
/// (if useless) recording: it comes back as a zeroed waveform with
/// recording quality 0 so the pipeline can finish and report warnings.
pub fn precondition(
    samples: &[f32],
    sample_rate: u32,
    config: &QualityConfig,
) -> Result<Waveform, AnalyzerError> {
    if sample_rate == 0 {
        return Err(AnalyzerError::InvalidArgument(
            "sample rate must be positive".into(),
        ));
    }
    if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
        return Err(AnalyzerError::InvalidArgument(format!(
            "non-finite sample at index {pos}"
        )));
    }

    let duration_s = samples.len() as f32 / sample_rate as f32;
    let peak = samples.iter().fold(0.0f32, |m, &s| m.max(s.abs()));

    if samples.is_empty() || peak == 0.0 {
        return Ok(Waveform {
            samples: samples.to_vec(),
            sample_rate,
            duration_s,
            snr_db: 0.0,
            clipping_detected: false,
            background_noise_db: NOISE_FLOOR_DB,
            recording_quality: 0.0,
        });
    }

    // Clipping and noise floor are properties of the raw recording, so
    // they are measured before normalization.
    let clipped = samples.iter().filter(|s| s.abs() > config.clip_level).count();
    let clipping_detected = clipped as f32 / samples.len() as f32 > config.clip_ratio;

    let (snr_db, background_noise_db) = estimate_snr(samples, sample_rate);

    let normalized: Vec<f32> = samples.iter().map(|&s| s / peak).collect();

    let recording_quality = quality_score(snr_db, clipping_detected, duration_s);

    Ok(Waveform {
        samples: normalized,
        sample_rate,
        duration_s,
        snr_db,
        clipping_detected,
        background_noise_db,
        recording_quality,
    })
}

/// Decile SNR estimate: the quietest 10% of frames stand in for the
/// noise floor, the loudest 10% for the signal.
///
/// Each decile is summarized by its median, not its mean: frames that
/// straddle a signal onset land in the quiet decile with real energy
/// and would otherwise drag the noise estimate up by tens of dB. The
/// frame values are RMS amplitudes, so dB conversion uses 20*log10.
///
/// Returns (snr_db, noise_floor_db). SNR is clamped to [0, 60] dB.
fn estimate_snr(samples: &[f32], sample_rate: u32) -> (f32, f32) {
    let mut energies = spectrum::frame_energies(samples, sample_rate, SNR_FRAME_MS, SNR_HOP_MS);
    if energies.len() < 10 {
        // Too short for the decile split; report flat SNR.
        return (0.0, NOISE_FLOOR_DB);
    }
    energies.sort_by(f32::total_cmp);

    let decile = energies.len() / 10;
    let noise = energies[decile / 2];
    let signal = energies[energies.len() - decile + decile / 2];

    let noise_db = if noise > 0.0 {
        (20.0 * noise.log10()).max(NOISE_FLOOR_DB)
    } else {
        NOISE_FLOOR_DB
    };

    if signal <= 0.0 {
        return (0.0, noise_db);
    }
    let snr = if noise > 0.0 {
        20.0 * (signal / noise).log10()
    } else {
        MAX_SNR_DB
    };

    (snr.clamp(0.0, MAX_SNR_DB), noise_db)
}

/// Composite recording quality in [0, 1]: SNR factor, clipping penalty,
/// duration factor (full credit at 1 s and above).
fn quality_score(snr_db: f32, clipping_detected: bool, duration_s: f32) -> f32 {
    let snr_factor = (snr_db / 30.0).clamp(0.0, 1.0);
    let clip_factor = if clipping_detected { 0.5 } else { 1.0 };
    let duration_factor = (duration_s / 1.0).clamp(0.0, 1.0);
    (snr_factor * clip_factor * duration_factor).clamp(0.0, 1.0)
}
