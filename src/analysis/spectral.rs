use crate::config::VoiceQualityConfig;
use crate::dsp::precondition::Waveform;
use crate::dsp::spectrum;
use crate::estimators::Estimators;
use crate::result::SpectralMetrics;

/// Frames below this are excluded from the spectral averages.
const ENERGY_GATE_DB: f32 = -60.0;

/// Fraction of spectral energy under the rolloff frequency.
const ROLLOFF_FRACTION: f32 = 0.85;

/// Split frequency for the low/high energy ratio.
const LOW_HIGH_SPLIT_HZ: f32 = 1000.0;

/// Spectral shape and formant metrics over the whole waveform.
///
/// Moment, rolloff and slope values are per-frame measurements averaged
/// across energetic frames; the alpha ratio and the low/high split read
/// the average power spectrum. All-silent input comes back as the
/// zeroed default.
pub fn analyze(
    wave: &Waveform,
    config: &VoiceQualityConfig,
    estimators: &Estimators,
) -> SpectralMetrics {
    let mut metrics = SpectralMetrics::default();

    let stft = spectrum::stft(
        &wave.samples,
        wave.sample_rate,
        config.frames.window_ms,
        config.frames.hop_ms,
        ENERGY_GATE_DB,
    );
    if stft.frames.is_empty() {
        return metrics;
    }

    let mut centroids = 0.0f32;
    let mut spreads = 0.0f32;
    let mut skews = 0.0f32;
    let mut kurts = 0.0f32;
    let mut rolloffs = 0.0f32;
    let mut slopes = 0.0f32;
    let mut counted = 0usize;

    for frame in &stft.frames {
        if let Some((c, sp, sk, ku)) = spectrum::spectral_moments(frame, stft.bin_hz) {
            centroids += c;
            spreads += sp;
            skews += sk;
            kurts += ku;
            rolloffs += spectrum::rolloff_hz(frame, stft.bin_hz, ROLLOFF_FRACTION);
            slopes += spectrum::log_log_slope(frame, stft.bin_hz);
            counted += 1;
        }
    }
    if counted > 0 {
        let n = counted as f32;
        metrics.centroid_hz = centroids / n;
        metrics.spread_hz = spreads / n;
        metrics.skewness = skews / n;
        metrics.kurtosis = kurts / n;
        metrics.rolloff_hz = rolloffs / n;
        metrics.slope = slopes / n;
    }

    let mut flux_sum = 0.0f32;
    let mut flux_count = 0usize;
    for pair in stft.frames.windows(2) {
        flux_sum += spectrum::spectral_flux(&pair[0], &pair[1]);
        flux_count += 1;
    }
    if flux_count > 0 {
        metrics.flux = flux_sum / flux_count as f32;
    }

    let power = spectrum::average_power(&stft);
    let average_magnitude: Vec<f32> = power.iter().map(|p| p.sqrt()).collect();
    metrics.alpha_ratio_db = spectrum::alpha_ratio_db(&average_magnitude);

    let nyquist = wave.sample_rate as f32 / 2.0;
    let low = spectrum::band_power(&power, stft.bin_hz, 0.0, LOW_HIGH_SPLIT_HZ);
    let high = spectrum::band_power(&power, stft.bin_hz, LOW_HIGH_SPLIT_HZ, nyquist);
    metrics.low_high_ratio = if high > 1e-10 { low / high } else { 0.0 };

    metrics.formants = estimators.formant.formants(
        &wave.samples,
        wave.sample_rate,
        config.thresholds.formant_count,
    );

    metrics
}
