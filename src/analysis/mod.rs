//! Per-stage assemblers. Each module consumes dsp primitives and
//! produces one typed metric record; the aggregator merges them into
//! the public result.

pub mod aggregator;
pub mod clinical;
pub mod perturbation;
pub mod spectral;
pub mod temporal;
