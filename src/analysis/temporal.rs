use crate::config::VoiceQualityConfig;
use crate::dsp::pitch::F0Contour;
use crate::dsp::precondition::Waveform;
use crate::dsp::{contour, segments, spectrum, windowing};
use crate::result::TemporalMetrics;

/// Sigma of the energy-envelope smoothing used for syllable-nucleus
/// picking, in frames.
const NUCLEUS_SMOOTHING_SIGMA: f32 = 2.0;

/// Energy fraction that counts as "arrived" for voice attack time.
const ATTACK_LEVEL: f32 = 0.9;

/// Rhythm and rate metrics from the speech-activity structure.
pub fn analyze(wave: &Waveform, f0: &F0Contour, config: &VoiceQualityConfig) -> TemporalMetrics {
    let mut metrics = TemporalMetrics::default();
    if wave.duration_s <= 0.0 {
        return metrics;
    }

    let segs = segments::detect_segments(
        &wave.samples,
        wave.sample_rate,
        config.frames.window_ms,
        config.frames.hop_ms,
    );

    let pauses = segments::pause_durations(&segs);
    metrics.pause_count = pauses.len();
    let (pause_mean, pause_std) = contour::mean_std(&pauses);
    metrics.pause_mean_s = pause_mean;
    metrics.pause_std_s = pause_std;
    metrics.pause_ratio = pauses.iter().sum::<f32>() / wave.duration_s;

    // Syllable nuclei: peaks of the smoothed energy envelope at or above
    // its mean.
    let energies = spectrum::frame_energies(
        &wave.samples,
        wave.sample_rate,
        config.frames.window_ms,
        config.frames.hop_ms,
    );
    let smoothed = windowing::gaussian_smooth(&energies, NUCLEUS_SMOOTHING_SIGMA);
    let peak_frames = energy_peaks(&smoothed);

    metrics.speaking_rate = peak_frames.len() as f32 / wave.duration_s;
    let speech_secs = segments::total_speech_secs(&segs);
    metrics.articulation_rate = if speech_secs > 0.0 {
        peak_frames.len() as f32 / speech_secs
    } else {
        0.0
    };

    // Inter-segment gaps of any length feed rhythm regularity.
    let gaps: Vec<f32> = segs
        .windows(2)
        .map(|pair| pair[1].start_s - pair[0].end_s)
        .collect();
    let (_, gap_std) = contour::mean_std(&gaps);
    metrics.rhythm_regularity = 1.0 / (1.0 + gap_std);

    // Tempo variability: CV of intervals between syllable nuclei.
    let hop_s = config.frames.hop_ms / 1000.0;
    let intervals: Vec<f32> = peak_frames
        .windows(2)
        .map(|pair| (pair[1] - pair[0]) as f32 * hop_s)
        .collect();
    let (interval_mean, interval_std) = contour::mean_std(&intervals);
    metrics.tempo_variability = if interval_mean > 0.0 {
        interval_std / interval_mean
    } else {
        0.0
    };

    if let (Some(first), Some(last)) = (segs.first(), segs.last()) {
        metrics.voice_onset_s = first.start_s;
        metrics.voice_offset_s = (wave.duration_s - last.end_s).max(0.0);
        metrics.voice_attack_s = attack_time(&energies, first, hop_s);
    }

    // Longest continuous voiced run of the pitch contour.
    metrics.max_phonation_time_s = contour::voiced_runs(&f0.frames)
        .iter()
        .map(|&(s, e)| contour::run_duration_secs(s, e, f0.hop_ms))
        .fold(0.0, f32::max);

    metrics
}

/// Indices of local maxima at or above the mean of the envelope.
fn energy_peaks(envelope: &[f32]) -> Vec<usize> {
    if envelope.len() < 3 {
        return Vec::new();
    }
    let mean = envelope.iter().sum::<f32>() / envelope.len() as f32;
    let mut peaks = Vec::new();
    for i in 1..envelope.len() - 1 {
        if envelope[i] >= mean && envelope[i] > envelope[i - 1] && envelope[i] >= envelope[i + 1] {
            peaks.push(i);
        }
    }
    peaks
}

/// Time from the start of the first segment until its energy first
/// reaches `ATTACK_LEVEL` of the segment peak.
fn attack_time(energies: &[f32], first: &segments::Segment, hop_s: f32) -> f32 {
    if hop_s <= 0.0 || energies.is_empty() {
        return 0.0;
    }
    let start = (first.start_s / hop_s) as usize;
    let end = ((first.end_s / hop_s) as usize).min(energies.len());
    if start >= end {
        return 0.0;
    }
    let seg = &energies[start..end];
    let peak = seg.iter().fold(0.0f32, |m, &e| m.max(e));
    if peak <= 0.0 {
        return 0.0;
    }
    for (i, &e) in seg.iter().enumerate() {
        if e >= ATTACK_LEVEL * peak {
            return i as f32 * hop_s;
        }
    }
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{pitch, precondition};
    use crate::estimators::Estimators;
    use crate::result::GenderHint;
    use std::f32::consts::PI;

    const SR: u32 = 16000;

    fn analyzed(samples: &[f32]) -> TemporalMetrics {
        let config = VoiceQualityConfig::default();
        let wave = precondition::precondition(samples, SR, &config.quality).unwrap();
        let f0 = pitch::track(
            &wave.samples,
            SR,
            &config,
            GenderHint::Unspecified,
            &Estimators::default(),
        );
        analyze(&wave, &f0, &config)
    }

    fn tone(freq: f32, duration: f32) -> Vec<f32> {
        let n = (SR as f32 * duration) as usize;
        (0..n)
            .map(|i| 0.6 * (2.0 * PI * freq * i as f32 / SR as f32).sin())
            .collect()
    }

    fn silence(duration: f32) -> Vec<f32> {
        vec![0.0; (SR as f32 * duration) as usize]
    }

    #[test]
    fn bursts_are_counted_as_pauses() {
        let mut samples = silence(0.3);
        samples.extend(tone(150.0, 0.6));
        samples.extend(silence(0.5));
        samples.extend(tone(150.0, 0.6));
        samples.extend(silence(0.3));

        let m = analyzed(&samples);
        assert_eq!(m.pause_count, 1);
        assert!((m.pause_mean_s - 0.5).abs() < 0.12, "pause mean {}", m.pause_mean_s);
        assert!(m.pause_ratio > 0.1 && m.pause_ratio < 0.4, "ratio {}", m.pause_ratio);
        assert!((m.voice_onset_s - 0.3).abs() < 0.1, "onset {}", m.voice_onset_s);
        assert!((m.voice_offset_s - 0.3).abs() < 0.1, "offset {}", m.voice_offset_s);
    }

    #[test]
    fn sustained_tone_long_phonation() {
        let mut samples = silence(0.2);
        samples.extend(tone(120.0, 2.0));
        samples.extend(silence(0.2));

        let m = analyzed(&samples);
        assert!(
            m.max_phonation_time_s > 1.5,
            "mpt {}",
            m.max_phonation_time_s
        );
        assert_eq!(m.pause_count, 0);
        // A single segment has no inter-segment gaps
        assert!((m.rhythm_regularity - 1.0).abs() < 1e-6);
    }

    #[test]
    fn silence_has_no_structure() {
        let m = analyzed(&silence(1.0));
        assert_eq!(m.pause_count, 0);
        assert_eq!(m.speaking_rate, 0.0);
        assert_eq!(m.max_phonation_time_s, 0.0);
    }

    #[test]
    fn empty_input() {
        let m = analyzed(&[]);
        assert_eq!(m.speaking_rate, 0.0);
    }
}
