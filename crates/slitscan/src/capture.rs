//! Camera-side contracts for the slit-scanner.
//!
//! A [`CaptureDevice`] turns [`Constraints`] into a [`MediaStream`], which
//! bundles a [`FrameReader`] (the single consumer of frames) with the
//! [`TrackHandle`]s that keep the device running. Stopping a track makes its
//! reader report end-of-stream, so a drain loop blocked on `read` winds down
//! on its own.
//!
//! [`probe_resolutions`] walks a list of exact resolutions and falls back to
//! an unconstrained request, mirroring how browsers negotiate camera modes.

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use image::RgbaImage;
use thiserror::Error;
use tracing::debug;

/// Capture modes requested before falling back to whatever the device offers.
pub const PREFERRED_RESOLUTIONS: [Resolution; 3] = [
    Resolution::new(160, 120),
    Resolution::new(320, 240),
    Resolution::new(640, 480),
];

#[derive(Debug, Error)]
pub enum CaptureError {
    #[error("no capture device available")]
    NoDevice,
    #[error("capture device cannot provide exactly {0}")]
    Overconstrained(Resolution),
    #[error("failed to read frame: {0}")]
    Read(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error("failed to decode frame: {0}")]
    Decode(#[from] image::ImageError),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

impl Resolution {
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

impl fmt::Display for Resolution {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Which camera the caller would prefer; a hint, never a hard requirement.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FacingMode {
    #[default]
    Environment,
    User,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Constraints {
    pub facing: FacingMode,
    /// When set, the device must deliver exactly this size or refuse.
    pub exact: Option<Resolution>,
}

/// One decoded camera frame. Dropping it releases the pixels.
#[derive(Debug, Clone)]
pub struct VideoFrame {
    image: RgbaImage,
}

impl VideoFrame {
    pub fn new(image: RgbaImage) -> Self {
        Self { image }
    }

    pub fn width(&self) -> u32 {
        self.image.width()
    }

    pub fn height(&self) -> u32 {
        self.image.height()
    }

    pub fn image(&self) -> &RgbaImage {
        &self.image
    }

    /// RGBA bytes of the row at `floor(height / 2)`; empty for a zero-height frame.
    pub fn midline(&self) -> &[u8] {
        if self.height() == 0 {
            return &[];
        }
        let stride = self.width() as usize * 4;
        let start = (self.height() / 2) as usize * stride;
        &self.image.as_raw()[start..start + stride]
    }
}

/// Single-consumer frame source.
pub trait FrameReader: Send {
    /// Blocks for the next frame; `Ok(None)` marks the end of the stream.
    fn read(&mut self) -> Result<Option<VideoFrame>, CaptureError>;
}

/// Shared liveness switch for one media track.
#[derive(Debug, Clone)]
pub struct TrackHandle {
    live: Arc<AtomicBool>,
}

impl TrackHandle {
    pub fn new() -> Self {
        Self {
            live: Arc::new(AtomicBool::new(true)),
        }
    }

    /// Stops the track. Stopping twice is harmless.
    pub fn stop(&self) {
        self.live.store(false, Ordering::Release);
    }

    pub fn is_live(&self) -> bool {
        self.live.load(Ordering::Acquire)
    }
}

impl Default for TrackHandle {
    fn default() -> Self {
        Self::new()
    }
}

/// An opened capture session.
pub struct MediaStream {
    reader: Box<dyn FrameReader>,
    tracks: Vec<TrackHandle>,
    resolution: Option<Resolution>,
}

impl MediaStream {
    pub fn new(
        reader: Box<dyn FrameReader>,
        tracks: Vec<TrackHandle>,
        resolution: Option<Resolution>,
    ) -> Self {
        Self {
            reader,
            tracks,
            resolution,
        }
    }

    /// Negotiated size, when the device reports one up front.
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    pub fn tracks(&self) -> &[TrackHandle] {
        &self.tracks
    }

    pub fn into_parts(self) -> (Box<dyn FrameReader>, Vec<TrackHandle>) {
        (self.reader, self.tracks)
    }
}

impl fmt::Debug for MediaStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaStream")
            .field("tracks", &self.tracks.len())
            .field("resolution", &self.resolution)
            .finish()
    }
}

pub trait CaptureDevice {
    fn open(&mut self, constraints: &Constraints) -> Result<MediaStream, CaptureError>;
}

/// Tries each exact resolution in order, then an unconstrained request.
///
/// Only the final fallback's error is returned; earlier refusals are logged.
pub fn probe_resolutions<D: CaptureDevice + ?Sized>(
    device: &mut D,
    preferred: &[Resolution],
    facing: FacingMode,
) -> Result<MediaStream, CaptureError> {
    for resolution in preferred {
        let constraints = Constraints {
            facing,
            exact: Some(*resolution),
        };
        match device.open(&constraints) {
            Ok(stream) => {
                debug!(%resolution, "camera accepted exact resolution");
                return Ok(stream);
            }
            Err(error) => {
                debug!(%resolution, %error, "camera rejected exact resolution");
            }
        }
    }

    debug!("falling back to unconstrained camera request");
    device.open(&Constraints {
        facing,
        exact: None,
    })
}
