//! Camera input and frame handling.
//!
//! The camera is treated as a source of raw sensor noise. Nothing in
//! this module decides which bits are kept; that happens in extraction.

mod camera;
mod config;
mod frame;

pub use camera::{Camera, CameraError, MockCamera};
pub use config::{CaptureConfig, ColorMode, MAX_FPS};
pub use frame::{Frame, FrameShape};
