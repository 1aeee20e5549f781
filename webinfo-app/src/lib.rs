//! Library half of the `webinfo` binary: the run pipeline, the JSON record it
//! produces, and the wiring from configuration to components.

pub mod pipeline;
pub mod record;
pub mod tether;
