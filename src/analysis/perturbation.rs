use crate::config::VoiceQualityConfig;
use crate::dsp::pitch::{F0Contour, MIN_VOICED_FRAMES};
use crate::dsp::precondition::Waveform;
use crate::dsp::{contour, cpps, hnr, jitter, shimmer, spectrum};
use crate::estimators::Estimators;
use crate::result::AcousticMetrics;

/// STFT frames below this are excluded from the band-energy ratios.
const ENERGY_GATE_DB: f32 = -60.0;

/// Perturbation and noise metrics from the F0 contour and waveform.
///
/// Nothing here fails: a metric that cannot be computed is reported as
/// 0.0 and named in `warnings`. Jitter needs the contour; shimmer works
/// on envelope peaks; HNR, CPPS and the band ratios read the waveform
/// directly.
pub fn analyze(
    wave: &Waveform,
    f0: &F0Contour,
    config: &VoiceQualityConfig,
    estimators: &Estimators,
    warnings: &mut Vec<String>,
) -> AcousticMetrics {
    let mut metrics = AcousticMetrics::default();

    let frequencies = f0.voiced_frequencies();
    if frequencies.len() >= MIN_VOICED_FRAMES {
        let (mean, std) = contour::mean_std(&frequencies);
        let min = frequencies.iter().copied().fold(f32::INFINITY, f32::min);
        let max = frequencies.iter().copied().fold(0.0f32, f32::max);
        metrics.f0_mean_hz = mean;
        metrics.f0_std_hz = std;
        metrics.f0_min_hz = min;
        metrics.f0_max_hz = max;
        metrics.f0_range_hz = max - min;

        metrics.jitter_absolute_ms = jitter::jitter_absolute_ms(&f0.frames).unwrap_or(0.0);
        metrics.jitter_percent = jitter::jitter_percent(&f0.frames).unwrap_or(0.0);
        metrics.jitter_rap_percent = jitter::jitter_rap_percent(&f0.frames).unwrap_or(0.0);
        metrics.jitter_ppq5_percent = jitter::jitter_ppq5_percent(&f0.frames).unwrap_or_else(|| {
            warnings.push("PPQ5 unavailable: no run of 5 consecutive voiced frames".into());
            0.0
        });
    } else {
        warnings.push(format!(
            "only {} voiced frames detected (minimum {}); pitch-derived metrics zeroed",
            frequencies.len(),
            MIN_VOICED_FRAMES
        ));
    }

    // Shimmer from cycle-synchronous envelope peaks. The tracked pitch
    // period sets the peak spacing so intra-cycle envelope ripple is
    // never counted as a cycle.
    let min_peak_distance_ms = if metrics.f0_mean_hz > 0.0 {
        0.7 * 1000.0 / metrics.f0_mean_hz
    } else {
        shimmer::DEFAULT_MIN_PEAK_DISTANCE_MS
    };
    let envelope = shimmer::hilbert_envelope(&wave.samples);
    let peaks = shimmer::cycle_peaks(&envelope, wave.sample_rate, min_peak_distance_ms);
    if peaks.len() >= 2 {
        metrics.shimmer_percent = shimmer::shimmer_percent(&peaks).unwrap_or(0.0);
        metrics.shimmer_db = shimmer::shimmer_db(&peaks).unwrap_or(0.0);
        metrics.shimmer_apq3_percent = shimmer::shimmer_apq3_percent(&peaks).unwrap_or(0.0);
        metrics.shimmer_apq11_percent = shimmer::shimmer_apq11_percent(&peaks).unwrap_or(0.0);
    } else {
        warnings.push("too few amplitude peaks for shimmer; shimmer metrics zeroed".into());
    }

    metrics.hnr_db = harmonicity(wave, f0, config, estimators, warnings);
    // Linear noise-to-harmonics ratio; 1.0 when no periodicity was found.
    metrics.nhr = 10.0f32.powf(-metrics.hnr_db / 10.0);

    let (vti, spi) = band_ratios(wave, config);
    metrics.vti = vti;
    metrics.spi = spi;

    metrics.cpps_db = cpps::compute_cpps(&wave.samples, wave.sample_rate, &cpps::CppsConfig::default())
        .unwrap_or_else(|| {
            warnings.push("CPPS unavailable: no frame passed the energy gate".into());
            0.0
        });

    let energies = spectrum::frame_energies(
        &wave.samples,
        wave.sample_rate,
        config.frames.window_ms,
        config.frames.hop_ms,
    );
    let (energy_mean, energy_std) = contour::mean_std(&energies);
    metrics.energy_mean = energy_mean;
    metrics.energy_std = energy_std;
    metrics.zero_crossing_rate = spectrum::zero_crossing_rate(&wave.samples);

    metrics
}

/// Primary harmonicity estimator over voiced frames, with the
/// whole-signal autocorrelation fallback. Floored at 0 dB.
fn harmonicity(
    wave: &Waveform,
    f0: &F0Contour,
    config: &VoiceQualityConfig,
    estimators: &Estimators,
    warnings: &mut Vec<String>,
) -> f32 {
    let primary = estimators.harmonicity.harmonicity_db(
        &wave.samples,
        wave.sample_rate,
        &f0.frames,
        f0.hop_ms,
    );
    if let Some(db) = primary {
        return db.max(0.0);
    }

    tracing::warn!(
        estimator = estimators.harmonicity.name(),
        "harmonicity estimator produced no value, using autocorrelation fallback"
    );
    match hnr::hnr_acf_fallback(
        &wave.samples,
        wave.sample_rate,
        config.pitch.min_f0_hz,
        config.pitch.max_f0_hz,
    ) {
        Some(db) => db.max(0.0),
        None => {
            warnings.push("HNR unavailable: signal too short or silent; reported as 0".into());
            0.0
        }
    }
}

/// VTI (> 2.5 kHz over low-pass energy) and SPI (70-1600 Hz over
/// 1600-4500 Hz). Both 0.0 when the denominator band carries negligible
/// energy.
fn band_ratios(wave: &Waveform, config: &VoiceQualityConfig) -> (f32, f32) {
    let stft = spectrum::stft(
        &wave.samples,
        wave.sample_rate,
        config.frames.window_ms,
        config.frames.hop_ms,
        ENERGY_GATE_DB,
    );
    let power = spectrum::average_power(&stft);
    if power.is_empty() {
        return (0.0, 0.0);
    }
    let nyquist = wave.sample_rate as f32 / 2.0;

    let low = spectrum::band_power(&power, stft.bin_hz, 0.0, 2500.0);
    let high = spectrum::band_power(&power, stft.bin_hz, 2500.0, nyquist);
    let vti = if low > 1e-10 { high / low } else { 0.0 };

    let harmonic = spectrum::band_power(&power, stft.bin_hz, 70.0, 1600.0);
    let formant_band = spectrum::band_power(&power, stft.bin_hz, 1600.0, 4500.0);
    let spi = if formant_band > 1e-10 {
        harmonic / formant_band
    } else {
        0.0
    };

    (vti, spi)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{pitch, precondition};
    use crate::result::GenderHint;
    use std::f32::consts::PI;

    const SR: u32 = 44100;

    fn analyzed(samples: &[f32]) -> (AcousticMetrics, Vec<String>) {
        let config = VoiceQualityConfig::default();
        let estimators = Estimators::default();
        let wave = precondition::precondition(samples, SR, &config.quality).unwrap();
        let f0 = pitch::track(
            &wave.samples,
            SR,
            &config,
            GenderHint::Unspecified,
            &estimators,
        );
        let mut warnings = Vec::new();
        let metrics = analyze(&wave, &f0, &config, &estimators, &mut warnings);
        (metrics, warnings)
    }

    fn sine_wave(freq: f32, duration: f32) -> Vec<f32> {
        let n = (SR as f32 * duration) as usize;
        (0..n)
            .map(|i| 0.7 * (2.0 * PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    #[test]
    fn pure_tone_clean_metrics() {
        let (metrics, _) = analyzed(&sine_wave(120.0, 2.0));

        assert!((metrics.f0_mean_hz - 120.0).abs() < 5.0, "f0 {}", metrics.f0_mean_hz);
        assert!(metrics.jitter_percent < 0.01, "jitter {}", metrics.jitter_percent);
        assert!(metrics.shimmer_percent < 0.01, "shimmer {}", metrics.shimmer_percent);
        assert!(metrics.hnr_db > 30.0, "hnr {}", metrics.hnr_db);
        assert!(metrics.nhr < 0.001, "nhr {}", metrics.nhr);
        assert!(metrics.cpps_db > 0.0);
        assert!(metrics.energy_mean > 0.0);
    }

    #[test]
    fn white_noise_low_hnr() {
        let mut state: u32 = 42;
        let noise: Vec<f32> = (0..2 * SR as usize)
            .map(|_| {
                state = state.wrapping_mul(1103515245).wrapping_add(12345);
                0.5 * ((state as f32 / u32::MAX as f32) * 2.0 - 1.0)
            })
            .collect();
        let (metrics, _) = analyzed(&noise);

        assert!(metrics.hnr_db < 5.0, "noise hnr {}", metrics.hnr_db);
        assert!(metrics.hnr_db >= 0.0);
    }

    #[test]
    fn silence_zeroed_with_warnings() {
        let (metrics, warnings) = analyzed(&vec![0.0; 2 * SR as usize]);

        assert_eq!(metrics.f0_mean_hz, 0.0);
        assert_eq!(metrics.jitter_percent, 0.0);
        assert_eq!(metrics.shimmer_percent, 0.0);
        assert_eq!(metrics.hnr_db, 0.0);
        assert!(!warnings.is_empty());
    }

    #[test]
    fn all_ratio_fields_non_negative() {
        let (m, _) = analyzed(&sine_wave(200.0, 1.0));
        for v in [
            m.jitter_percent,
            m.jitter_rap_percent,
            m.jitter_ppq5_percent,
            m.shimmer_percent,
            m.shimmer_db,
            m.hnr_db,
            m.nhr,
            m.vti,
            m.spi,
        ] {
            assert!(v >= 0.0, "metric went negative: {v}");
        }
    }

    #[test]
    fn spi_favors_low_band_for_low_tone() {
        // A 200 Hz tone has all its energy in the 70-1600 band
        let (m, _) = analyzed(&sine_wave(200.0, 1.0));
        assert!(m.spi > 1.0 || m.spi == 0.0, "spi {}", m.spi);
        assert!(m.vti < 0.5, "vti {}", m.vti);
    }
}
