//! Slit-scan texture generation.
//!
//! Each camera frame contributes exactly one scanline, its middle row, to a
//! fixed-height circular buffer. Over time the buffer shows a streak image of
//! whatever passed through that line. The buffer starts as a gold gradient so
//! there is something to draw before the first frame arrives.

mod accumulator;
mod buffer;
mod cameras;
mod capture;
mod texture;

pub use accumulator::{ScanOptions, SlitScanError, SlitScanner};
pub use buffer::{gradient_color, SlitScanBuffer, GRADIENT_STOPS, SLIT_HEIGHT};
pub use cameras::{color_bars, ChannelCamera, ImageSequenceCamera, SyntheticCamera};
pub use capture::{
    probe_resolutions, CaptureDevice, CaptureError, Constraints, FacingMode, FrameReader,
    MediaStream, Resolution, TrackHandle, VideoFrame, PREFERRED_RESOLUTIONS,
};
pub use texture::{TextureHandle, TextureSampling};
