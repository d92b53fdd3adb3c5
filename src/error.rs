use thiserror::Error;

/// Errors the analyzer can surface to a caller.
///
/// Only malformed input is fatal. Everything else — silence, too few
/// voiced frames, an estimator giving up — degrades to zeroed metrics
/// plus a warning string on the result, so callers always get a
/// complete `VoiceQualityResult` back.
#[derive(Debug, Error)]
pub enum AnalyzerError {
    /// The waveform violates the caller contract: zero sample rate or
    /// non-finite samples. Raised immediately, never handled silently.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_includes_detail() {
        let err = AnalyzerError::InvalidArgument("sample rate must be > 0".into());
        assert!(err.to_string().contains("sample rate"));
    }
}
