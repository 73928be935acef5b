//! Whole-engine benchmarks.
//!
//! These drive the voice engine the way a host does: notes and parameter
//! changes through the controller, audio pulled a block at a time.

mod render;
mod voice;

pub use render::bench_render;
pub use voice::bench_voice;
