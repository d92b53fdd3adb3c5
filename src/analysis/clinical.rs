use rustfft::{num_complex::Complex, FftPlanner};

use crate::config::ClinicalThresholds;
use crate::dsp::contour;
use crate::dsp::pitch::F0Contour;
use crate::result::{
    AcousticMetrics, ClinicalMetrics, Disorder, DisorderFinding, SpectralMetrics, VoiceCategory,
};

/// Voicing dropouts in this range count as voice breaks: shorter gaps
/// are single-cycle glitches, longer ones are deliberate pauses.
const BREAK_MIN_MS: f32 = 50.0;
const BREAK_MAX_MS: f32 = 250.0;

/// F0 modulation band searched for vocal tremor.
const TREMOR_MIN_HZ: f32 = 3.0;
const TREMOR_MAX_HZ: f32 = 12.0;

/// Minimum tremor modulation depth relative to mean F0.
const TREMOR_MIN_DEPTH: f32 = 0.01;

/// A voiced frame within this relative distance of half or double the
/// median F0 is counted as an octave-jump candidate.
const DIPLOPHONIA_TOLERANCE: f32 = 0.12;

/// Fraction of voiced frames at half/double the median that flags
/// diplophonia.
const DIPLOPHONIA_FRACTION: f32 = 0.10;

/// GRBAS-style severity components plus disorder-adjacent flags.
///
/// Every component is a deterministic arithmetic rule over the metric
/// groups; the same input always scores the same. Components clamp to
/// [0, grbas_scale_max].
pub fn score(
    acoustic: &AcousticMetrics,
    spectral: &SpectralMetrics,
    f0: &F0Contour,
    thresholds: &ClinicalThresholds,
) -> ClinicalMetrics {
    let max = thresholds.grbas_scale_max;
    let jitter = acoustic.jitter_percent;
    let shimmer = acoustic.shimmer_percent;
    let hnr = acoustic.hnr_db;

    let grade = (jitter / 3.0 + shimmer / 6.0 + (1.0 - hnr / 30.0).max(0.0)).clamp(0.0, max);
    let roughness = (jitter / 2.0).clamp(0.0, max);

    let breathiness = (2.0 * (1.0 - hnr / 25.0).max(0.0)
        + (acoustic.vti * 2.0).min(1.0)
        + 0.5 * (1.0 - spectral.low_high_ratio).clamp(0.0, 1.0))
    .clamp(0.0, max);

    let f0_cv = coefficient_of_variation(acoustic.f0_mean_hz, acoustic.f0_std_hz);
    let energy_cv = coefficient_of_variation(acoustic.energy_mean, acoustic.energy_std);
    let strain = ((f0_cv * 10.0).min(1.0)
        + (energy_cv * 2.0).min(1.0)
        + spectral.slope.max(0.0).min(1.0))
    .clamp(0.0, max);

    let range_term = if acoustic.f0_mean_hz > 0.0 {
        (1.0 - (acoustic.f0_range_hz / (0.2 * acoustic.f0_mean_hz)).min(1.0)).max(0.0)
    } else {
        0.0
    };
    let low_energy_term = (1.0 - (acoustic.energy_mean / 0.1).min(1.0)).max(0.0);
    let spi_term = (acoustic.spi / 40.0).min(1.0);
    let asthenia = (range_term + low_energy_term + spi_term).clamp(0.0, max);

    let hoarseness_index =
        ((0.5 * grade + 0.25 * roughness + 0.25 * breathiness) / max * 100.0).clamp(0.0, 100.0);

    let (tremor, tremor_frequency_hz) = detect_tremor(f0);
    let diplophonia = detect_diplophonia(f0);
    let voice_breaks = count_voice_breaks(f0);

    let estimated_airflow =
        (0.7 * (1.0 - hnr / 30.0).max(0.0) + 0.3 * (acoustic.vti * 2.0).min(1.0)).clamp(0.0, 1.0);
    let glottal_efficiency =
        ((hnr / 30.0).clamp(0.0, 1.0) * (1.0 - (shimmer / 10.0).min(1.0))).clamp(0.0, 1.0);

    ClinicalMetrics {
        grade,
        roughness,
        breathiness,
        asthenia,
        strain,
        hoarseness_index,
        voice_breaks,
        diplophonia,
        tremor,
        tremor_frequency_hz,
        estimated_airflow,
        glottal_efficiency,
    }
}

/// Cumulative deviation from the clinical normal ranges, and the
/// category it maps to. Returned together so the aggregator can reuse
/// the deviation for the composite quality index.
pub fn categorize(
    acoustic: &AcousticMetrics,
    clinical: &ClinicalMetrics,
    recording_quality: f32,
    thresholds: &ClinicalThresholds,
) -> (VoiceCategory, f32) {
    let jitter_excess = (acoustic.jitter_percent - thresholds.jitter_normal_percent).max(0.0);
    let shimmer_excess =
        (acoustic.shimmer_percent - thresholds.shimmer_normal_percent).max(0.0) / 2.0;
    let hnr_deficit = ((thresholds.hnr_normal_db - acoustic.hnr_db) / 5.0).max(0.0);
    let quality_penalty = if recording_quality < 0.5 { 1.0 } else { 0.0 };

    let deviation = jitter_excess + shimmer_excess + hnr_deficit + clinical.grade + quality_penalty;

    let category = if deviation < 1.0 {
        VoiceCategory::Excellent
    } else if deviation < 2.0 {
        VoiceCategory::Good
    } else if deviation < 3.0 {
        VoiceCategory::Fair
    } else if deviation < 4.0 {
        VoiceCategory::Poor
    } else {
        VoiceCategory::Critical
    };

    (category, deviation)
}

/// Independent disorder predicates. Multiple disorders may co-occur;
/// when none trigger and Grade > 1 the result is UNSPECIFIED; when
/// nothing triggers at all, NONE with probability 1.0.
pub fn detect_disorders(
    acoustic: &AcousticMetrics,
    clinical: &ClinicalMetrics,
) -> Vec<DisorderFinding> {
    let mut findings = Vec::new();
    let max = 3.0f32;

    let dysphonia = 0.4 * (clinical.grade / max)
        + 0.3 * (acoustic.jitter_percent / 5.0).min(1.0)
        + 0.3 * (acoustic.shimmer_percent / 10.0).min(1.0);
    if dysphonia > 0.5 {
        findings.push(DisorderFinding {
            disorder: Disorder::Dysphonia,
            probability: dysphonia.min(1.0),
        });
    }

    let breathy = 0.5 * (clinical.breathiness / max)
        + 0.3 * (1.0 - acoustic.hnr_db / 25.0).max(0.0)
        + 0.2 * (acoustic.vti * 2.0).min(1.0);
    if breathy > 0.5 {
        findings.push(DisorderFinding {
            disorder: Disorder::BreathyDysphonia,
            probability: breathy.min(1.0),
        });
    }

    let f0_cv = coefficient_of_variation(acoustic.f0_mean_hz, acoustic.f0_std_hz);
    let tension = 0.6 * (clinical.strain / max) + 0.4 * (f0_cv * 5.0).min(1.0);
    if tension > 0.5 {
        findings.push(DisorderFinding {
            disorder: Disorder::MuscleTensionDysphonia,
            probability: tension.min(1.0),
        });
    }

    if clinical.tremor {
        findings.push(DisorderFinding {
            disorder: Disorder::VocalTremor,
            probability: 0.75,
        });
    }

    if clinical.diplophonia {
        findings.push(DisorderFinding {
            disorder: Disorder::Diplophonia,
            probability: 0.7,
        });
    }

    let low_energy_term = (1.0 - (acoustic.energy_mean / 0.1).min(1.0)).max(0.0);
    let fatigue = 0.5 * (clinical.asthenia / max) + 0.5 * low_energy_term;
    if fatigue > 0.5 {
        findings.push(DisorderFinding {
            disorder: Disorder::VocalFatigue,
            probability: fatigue.min(1.0),
        });
    }

    if findings.is_empty() {
        if clinical.grade > 1.0 {
            findings.push(DisorderFinding {
                disorder: Disorder::Unspecified,
                probability: (clinical.grade / max).min(1.0),
            });
        } else {
            findings.push(DisorderFinding {
                disorder: Disorder::None,
                probability: 1.0,
            });
        }
    }

    findings
}

/// Mean of recording quality, SNR factor, F0-tracking consistency and
/// the clipping factor.
pub fn confidence(
    recording_quality: f32,
    snr_db: f32,
    f0_mean: f32,
    f0_std: f32,
    clipping: bool,
) -> f32 {
    let snr_factor = (snr_db / 30.0).clamp(0.0, 1.0);
    let consistency = if f0_mean > 0.0 {
        1.0 / (1.0 + f0_std / f0_mean)
    } else {
        0.0
    };
    let clip_factor = if clipping { 0.7 } else { 1.0 };
    (recording_quality + snr_factor + consistency + clip_factor) / 4.0
}

fn coefficient_of_variation(mean: f32, std: f32) -> f32 {
    if mean > 0.0 {
        std / mean
    } else {
        0.0
    }
}

/// Count unvoiced gaps between voiced runs lasting 50-250 ms.
fn count_voice_breaks(f0: &F0Contour) -> usize {
    let runs = contour::voiced_runs(&f0.frames);
    runs.windows(2)
        .filter(|pair| {
            let gap_frames = pair[1].0 - pair[0].1 - 1;
            let gap_ms = gap_frames as f32 * f0.hop_ms;
            (BREAK_MIN_MS..=BREAK_MAX_MS).contains(&gap_ms)
        })
        .count()
}

/// Flag a bimodal contour: a meaningful share of voiced frames sitting
/// at half or double the median F0 signals period doubling.
fn detect_diplophonia(f0: &F0Contour) -> bool {
    let mut frequencies = f0.voiced_frequencies();
    if frequencies.len() < 20 {
        return false;
    }
    frequencies.sort_by(f32::total_cmp);
    let median = frequencies[frequencies.len() / 2];
    if median <= 0.0 {
        return false;
    }

    let near = |f: f32, target: f32| (f - target).abs() / target < DIPLOPHONIA_TOLERANCE;
    let octave_jumps = frequencies
        .iter()
        .filter(|&&f| near(f, median / 2.0) || near(f, median * 2.0))
        .count();

    octave_jumps as f32 / frequencies.len() as f32 > DIPLOPHONIA_FRACTION
}

/// Look for a dominant 3-12 Hz modulation of the F0 contour over the
/// longest voiced run. Returns (flag, modulation frequency).
fn detect_tremor(f0: &F0Contour) -> (bool, f32) {
    let frame_rate = 1000.0 / f0.hop_ms;
    let runs = contour::voiced_runs(&f0.frames);
    let longest = runs
        .into_iter()
        .max_by_key(|&(s, e)| e - s)
        .filter(|&(s, e)| {
            // Need a second of continuous voicing to resolve 3 Hz.
            (e - s + 1) as f32 / frame_rate >= 1.0
        });
    let (start, end) = match longest {
        Some(run) => run,
        None => return (false, 0.0),
    };

    let values: Vec<f32> = f0.frames[start..=end]
        .iter()
        .filter_map(|f| f.frequency)
        .collect();
    let (mean, _) = contour::mean_std(&values);
    if mean <= 0.0 {
        return (false, 0.0);
    }

    let fft_size = values.len().next_power_of_two();
    let mut buf: Vec<Complex<f32>> = values
        .iter()
        .map(|&v| Complex::new(v - mean, 0.0))
        .collect();
    buf.resize(fft_size, Complex::new(0.0, 0.0));

    let mut planner = FftPlanner::new();
    planner.plan_fft_forward(fft_size).process(&mut buf);

    let bin_hz = frame_rate / fft_size as f32;
    let lo = (TREMOR_MIN_HZ / bin_hz).ceil() as usize;
    let hi = ((TREMOR_MAX_HZ / bin_hz).floor() as usize).min(fft_size / 2);
    if lo >= hi {
        return (false, 0.0);
    }

    let mut peak_bin = lo;
    let mut peak_power = 0.0f32;
    let mut band_sum = 0.0f32;
    for (bin, v) in buf.iter().enumerate().take(hi + 1).skip(lo) {
        let p = v.norm_sqr();
        band_sum += p;
        if p > peak_power {
            peak_power = p;
            peak_bin = bin;
        }
    }
    let band_mean = band_sum / (hi - lo + 1) as f32;

    // Component amplitude of the peak bin relative to mean F0.
    let depth = 2.0 * peak_power.sqrt() / (values.len() as f32 * mean);

    let dominant = band_mean > 0.0 && peak_power >= 2.0 * band_mean;
    if dominant && depth >= TREMOR_MIN_DEPTH {
        (true, peak_bin as f32 * bin_hz)
    } else {
        (false, 0.0)
    }
}
