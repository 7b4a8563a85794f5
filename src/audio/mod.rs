//! PCM buffers and the offline processing primitives shared by every stage.

pub(crate) mod biquad;
pub(crate) mod buffer;
pub(crate) mod graph;
pub(crate) mod param;
pub(crate) mod resample;
