//! Signal-processing primitives. One concern per file; free functions
//! over small config structs. Nothing here knows about clinical
//! interpretation.

pub mod contour;
pub mod cpps;
pub mod formants;
pub mod hnr;
pub mod jitter;
pub mod pitch;
pub mod precondition;
pub mod segments;
pub mod shimmer;
pub mod spectrum;
pub mod windowing;
