use super::contour;
use super::spectrum;

/// Speech segments shorter than this get merged into a neighbor when
/// the gap between them is small; isolated ones below it are dropped
/// as clicks.
const MIN_SEGMENT_SECS: f32 = 0.05;

/// Gaps shorter than this are closed; they are articulatory, not
/// pauses.
const MERGE_GAP_SECS: f32 = 0.1;

/// Gaps at or above this count as pauses.
pub const MIN_PAUSE_SECS: f32 = 0.2;

/// A contiguous region of speech activity, in seconds from signal start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Segment {
    pub start_s: f32,
    pub end_s: f32,
}

impl Segment {
    pub fn duration_s(&self) -> f32 {
        self.end_s - self.start_s
    }
}

/// Detect speech-activity segments with an adaptive percentile gate.
///
/// A frame is active when its energy exceeds the 30th percentile of all
/// frame energies and its zero-crossing rate stays below the 70th
/// percentile. The energy gate adapts to the recording level; the ZCR
/// gate rejects fricative-only and noise-only frames. Gaps under 100 ms
/// are closed, then segments under 50 ms are dropped.
pub fn detect_segments(
    samples: &[f32],
    sample_rate: u32,
    window_ms: f32,
    hop_ms: f32,
) -> Vec<Segment> {
    let energies = spectrum::frame_energies(samples, sample_rate, window_ms, hop_ms);
    let zcrs = spectrum::frame_zcrs(samples, sample_rate, window_ms, hop_ms);
    if energies.is_empty() {
        return Vec::new();
    }

    let mut sorted_energy = energies.clone();
    sorted_energy.sort_by(f32::total_cmp);
    let mut sorted_zcr = zcrs.clone();
    sorted_zcr.sort_by(f32::total_cmp);

    let energy_gate = contour::percentile(&sorted_energy, 0.30).max(1e-8);
    let zcr_gate = contour::percentile(&sorted_zcr, 0.70);

    let active: Vec<bool> = energies
        .iter()
        .zip(zcrs.iter())
        .map(|(&e, &z)| e > energy_gate && z <= zcr_gate)
        .collect();

    let hop_s = hop_ms / 1000.0;
    let window_s = window_ms / 1000.0;

    // Frame runs -> time segments
    let mut segments = Vec::new();
    let mut start: Option<usize> = None;
    for (i, &a) in active.iter().enumerate() {
        match (a, start) {
            (true, None) => start = Some(i),
            (false, Some(s)) => {
                segments.push(frame_run_to_segment(s, i - 1, hop_s, window_s));
                start = None;
            }
            _ => {}
        }
    }
    if let Some(s) = start {
        segments.push(frame_run_to_segment(s, active.len() - 1, hop_s, window_s));
    }

    merge_and_filter(segments)
}

fn frame_run_to_segment(start: usize, end: usize, hop_s: f32, window_s: f32) -> Segment {
    Segment {
        start_s: start as f32 * hop_s,
        end_s: end as f32 * hop_s + window_s,
    }
}

fn merge_and_filter(segments: Vec<Segment>) -> Vec<Segment> {
    let mut merged: Vec<Segment> = Vec::new();
    for seg in segments {
        match merged.last_mut() {
            Some(last) if seg.start_s - last.end_s < MERGE_GAP_SECS => {
                last.end_s = seg.end_s;
            }
            _ => merged.push(seg),
        }
    }
    merged.retain(|s| s.duration_s() >= MIN_SEGMENT_SECS);
    merged
}

/// Pause durations between consecutive segments, keeping only gaps of
/// at least `MIN_PAUSE_SECS`.
pub fn pause_durations(segments: &[Segment]) -> Vec<f32> {
    segments
        .windows(2)
        .map(|pair| pair[1].start_s - pair[0].end_s)
        .filter(|&gap| gap >= MIN_PAUSE_SECS)
        .collect()
}

/// Total speech time across segments, seconds.
pub fn total_speech_secs(segments: &[Segment]) -> f32 {
    segments.iter().map(|s| s.duration_s()).sum()
}
