// Purpose - the audio callback boundary and external event conversions

pub mod converter;
pub mod midi;
pub mod render;

pub use render::{RenderError, RenderLoop, RenderReport};
