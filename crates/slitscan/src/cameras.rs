//! Capture devices that need no camera hardware.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use crossbeam_channel::{Receiver, RecvTimeoutError, Sender};
use image::{Rgba, RgbaImage};
use tracing::{debug, trace};

use crate::capture::{
    CaptureDevice, CaptureError, Constraints, FrameReader, MediaStream, Resolution, TrackHandle,
    VideoFrame,
};

const CHANNEL_POLL: Duration = Duration::from_millis(20);
const IMAGE_EXTENSIONS: [&str; 5] = ["png", "jpg", "jpeg", "bmp", "gif"];

const BAR_COLORS: [[u8; 3]; 6] = [
    [0xff, 0x3b, 0x30],
    [0xff, 0x95, 0x00],
    [0xff, 0xcc, 0x00],
    [0x34, 0xc7, 0x59],
    [0x00, 0x7a, 0xff],
    [0xaf, 0x52, 0xde],
];

/// Deterministic camera that renders vertical colour bars drifting one pixel
/// per frame.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    supported: Vec<Resolution>,
    default_resolution: Resolution,
    frame_limit: Option<u64>,
    fail_after: Option<u64>,
    frame_interval: Option<Duration>,
    available: bool,
    requests: Vec<Constraints>,
}

impl SyntheticCamera {
    /// A camera that only ever delivers `resolution`.
    pub fn new(resolution: Resolution) -> Self {
        Self {
            supported: vec![resolution],
            default_resolution: resolution,
            frame_limit: None,
            fail_after: None,
            frame_interval: None,
            available: true,
            requests: Vec::new(),
        }
    }

    /// Replaces the set of exact resolutions the camera accepts.
    pub fn with_supported(mut self, supported: impl IntoIterator<Item = Resolution>) -> Self {
        self.supported = supported.into_iter().collect();
        self
    }

    /// Ends the stream after `frames` frames.
    pub fn with_frame_limit(mut self, frames: u64) -> Self {
        self.frame_limit = Some(frames);
        self
    }

    /// Makes the read after `frames` successful frames fail.
    pub fn with_failure_after(mut self, frames: u64) -> Self {
        self.fail_after = Some(frames);
        self
    }

    /// Paces reads like a real device would.
    pub fn with_frame_interval(mut self, interval: Duration) -> Self {
        self.frame_interval = Some(interval);
        self
    }

    /// A camera that refuses every request.
    pub fn unavailable() -> Self {
        Self {
            available: false,
            ..Self::new(Resolution::new(1, 1))
        }
    }

    /// Every constraint set passed to `open`, in order.
    pub fn requests(&self) -> &[Constraints] {
        &self.requests
    }
}

impl CaptureDevice for SyntheticCamera {
    fn open(&mut self, constraints: &Constraints) -> Result<MediaStream, CaptureError> {
        self.requests.push(*constraints);
        if !self.available {
            return Err(CaptureError::NoDevice);
        }

        let resolution = match constraints.exact {
            Some(exact) if self.supported.contains(&exact) => exact,
            Some(exact) => return Err(CaptureError::Overconstrained(exact)),
            None => self.default_resolution,
        };
        debug!(%resolution, facing = ?constraints.facing, "synthetic camera opened");

        let track = TrackHandle::new();
        let reader = SyntheticReader {
            resolution,
            track: track.clone(),
            produced: 0,
            frame_limit: self.frame_limit,
            fail_after: self.fail_after,
            frame_interval: self.frame_interval,
        };
        Ok(MediaStream::new(
            Box::new(reader),
            vec![track],
            Some(resolution),
        ))
    }
}

struct SyntheticReader {
    resolution: Resolution,
    track: TrackHandle,
    produced: u64,
    frame_limit: Option<u64>,
    fail_after: Option<u64>,
    frame_interval: Option<Duration>,
}

impl FrameReader for SyntheticReader {
    fn read(&mut self) -> Result<Option<VideoFrame>, CaptureError> {
        if !self.track.is_live() {
            return Ok(None);
        }
        if self.fail_after == Some(self.produced) {
            return Err(CaptureError::Read(format!(
                "synthetic failure after {} frames",
                self.produced
            )));
        }
        if self.frame_limit.is_some_and(|limit| self.produced >= limit) {
            return Ok(None);
        }
        if let Some(interval) = self.frame_interval {
            thread::sleep(interval);
        }

        let frame = color_bars(self.resolution, self.produced);
        self.produced += 1;
        Ok(Some(VideoFrame::new(frame)))
    }
}

/// One frame of drifting colour bars, shifted `offset` pixels to the right.
pub fn color_bars(resolution: Resolution, offset: u64) -> RgbaImage {
    let bar_width = (resolution.width as usize / BAR_COLORS.len()).max(1) as u64;
    RgbaImage::from_fn(resolution.width, resolution.height, |x, _| {
        let band = ((x as u64 + offset) / bar_width) as usize % BAR_COLORS.len();
        let [r, g, b] = BAR_COLORS[band];
        Rgba([r, g, b, 255])
    })
}

/// Plays a directory of still images back as a finite stream.
#[derive(Debug, Clone)]
pub struct ImageSequenceCamera {
    files: Vec<PathBuf>,
}

impl ImageSequenceCamera {
    /// Collects the image files in `dir`, sorted by file name.
    pub fn from_dir(dir: impl AsRef<Path>) -> Result<Self, CaptureError> {
        let mut files = Vec::new();
        for entry in fs::read_dir(dir.as_ref())? {
            let path = entry?.path();
            let is_image = path
                .extension()
                .and_then(|ext| ext.to_str())
                .is_some_and(|ext| {
                    IMAGE_EXTENSIONS
                        .iter()
                        .any(|known| known.eq_ignore_ascii_case(ext))
                });
            if path.is_file() && is_image {
                files.push(path);
            }
        }
        files.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
        debug!(dir = %dir.as_ref().display(), frames = files.len(), "loaded image sequence");
        Ok(Self { files })
    }

    pub fn files(&self) -> &[PathBuf] {
        &self.files
    }
}

impl CaptureDevice for ImageSequenceCamera {
    fn open(&mut self, constraints: &Constraints) -> Result<MediaStream, CaptureError> {
        let first = self.files.first().ok_or(CaptureError::NoDevice)?;
        let (width, height) = image::image_dimensions(first)?;
        let resolution = Resolution::new(width, height);
        if let Some(exact) = constraints.exact {
            if exact != resolution {
                return Err(CaptureError::Overconstrained(exact));
            }
        }

        let track = TrackHandle::new();
        let reader = ImageSequenceReader {
            files: self.files.clone().into_iter(),
            track: track.clone(),
        };
        Ok(MediaStream::new(
            Box::new(reader),
            vec![track],
            Some(resolution),
        ))
    }
}

struct ImageSequenceReader {
    files: std::vec::IntoIter<PathBuf>,
    track: TrackHandle,
}

impl FrameReader for ImageSequenceReader {
    fn read(&mut self) -> Result<Option<VideoFrame>, CaptureError> {
        if !self.track.is_live() {
            return Ok(None);
        }
        let Some(path) = self.files.next() else {
            return Ok(None);
        };
        trace!(path = %path.display(), "decoding frame");
        let image = image::open(&path)?.to_rgba8();
        Ok(Some(VideoFrame::new(image)))
    }
}

/// A camera fed by another thread through a channel.
///
/// The stream ends when every [`Sender`] is dropped or the track is stopped.
#[derive(Debug, Clone)]
pub struct ChannelCamera {
    frames: Receiver<VideoFrame>,
    resolution: Option<Resolution>,
}

impl ChannelCamera {
    /// Creates a camera with a queue of `capacity` frames.
    pub fn bounded(capacity: usize) -> (Self, Sender<VideoFrame>) {
        let (sender, frames) = crossbeam_channel::bounded(capacity);
        (
            Self {
                frames,
                resolution: None,
            },
            sender,
        )
    }

    pub fn unbounded() -> (Self, Sender<VideoFrame>) {
        let (sender, frames) = crossbeam_channel::unbounded();
        (
            Self {
                frames,
                resolution: None,
            },
            sender,
        )
    }

    /// Advertises a single exact resolution. Without one, exact requests are
    /// refused and only the unconstrained fallback succeeds.
    pub fn with_resolution(mut self, resolution: Resolution) -> Self {
        self.resolution = Some(resolution);
        self
    }
}

impl CaptureDevice for ChannelCamera {
    fn open(&mut self, constraints: &Constraints) -> Result<MediaStream, CaptureError> {
        if let Some(exact) = constraints.exact {
            if self.resolution != Some(exact) {
                return Err(CaptureError::Overconstrained(exact));
            }
        }

        let track = TrackHandle::new();
        let reader = ChannelReader {
            frames: self.frames.clone(),
            track: track.clone(),
        };
        Ok(MediaStream::new(
            Box::new(reader),
            vec![track],
            self.resolution,
        ))
    }
}

struct ChannelReader {
    frames: Receiver<VideoFrame>,
    track: TrackHandle,
}

impl FrameReader for ChannelReader {
    fn read(&mut self) -> Result<Option<VideoFrame>, CaptureError> {
        loop {
            if !self.track.is_live() {
                return Ok(None);
            }
            match self.frames.recv_timeout(CHANNEL_POLL) {
                Ok(frame) => return Ok(Some(frame)),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Ok(None),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capture::{probe_resolutions, FacingMode, PREFERRED_RESOLUTIONS};

    #[test]
    fn synthetic_camera_honours_exact_constraints() {
        let mut camera = SyntheticCamera::new(Resolution::new(64, 48));
        let err = camera
            .open(&Constraints {
                exact: Some(Resolution::new(160, 120)),
                ..Constraints::default()
            })
            .unwrap_err();
        assert!(matches!(err, CaptureError::Overconstrained(_)));

        let stream = camera.open(&Constraints::default()).unwrap();
        assert_eq!(stream.resolution(), Some(Resolution::new(64, 48)));
        assert_eq!(camera.requests().len(), 2);
    }

    #[test]
    fn probing_prefers_the_smallest_supported_mode() {
        let mut camera = SyntheticCamera::new(Resolution::new(1280, 720))
            .with_supported([Resolution::new(320, 240), Resolution::new(640, 480)]);
        let stream =
            probe_resolutions(&mut camera, &PREFERRED_RESOLUTIONS, FacingMode::Environment)
                .unwrap();
        assert_eq!(stream.resolution(), Some(Resolution::new(320, 240)));

        let exacts: Vec<_> = camera.requests().iter().map(|c| c.exact).collect();
        assert_eq!(
            exacts,
            vec![Some(Resolution::new(160, 120)), Some(Resolution::new(320, 240))]
        );
        assert!(camera
            .requests()
            .iter()
            .all(|c| c.facing == FacingMode::Environment));
    }

    #[test]
    fn probing_falls_back_to_unconstrained() {
        let mut camera = SyntheticCamera::new(Resolution::new(1280, 720)).with_supported(Vec::new());
        let stream =
            probe_resolutions(&mut camera, &PREFERRED_RESOLUTIONS, FacingMode::User).unwrap();
        assert_eq!(stream.resolution(), Some(Resolution::new(1280, 720)));
        assert_eq!(camera.requests().len(), 4);
        assert_eq!(camera.requests()[3].exact, None);
    }

    #[test]
    fn synthetic_reader_stops_at_limit_and_on_track_stop() {
        let mut camera = SyntheticCamera::new(Resolution::new(12, 2)).with_frame_limit(2);
        let (mut reader, tracks) = camera.open(&Constraints::default()).unwrap().into_parts();
        assert!(reader.read().unwrap().is_some());
        assert!(reader.read().unwrap().is_some());
        assert!(reader.read().unwrap().is_none());

        let mut camera = SyntheticCamera::new(Resolution::new(12, 2));
        let (mut reader, tracks_b) = camera.open(&Constraints::default()).unwrap().into_parts();
        drop(tracks);
        tracks_b[0].stop();
        assert!(reader.read().unwrap().is_none());
    }

    #[test]
    fn color_bars_drift_with_offset() {
        let resolution = Resolution::new(12, 1);
        let a = color_bars(resolution, 0);
        let b = color_bars(resolution, 1);
        assert_eq!(a.get_pixel(1, 0), b.get_pixel(0, 0));
        assert_ne!(a.get_pixel(0, 0), a.get_pixel(11, 0));
    }

    #[test]
    fn image_sequence_plays_files_in_name_order() {
        let dir = tempfile::tempdir().unwrap();
        for (name, value) in [("b.png", 20u8), ("a.png", 10), ("c.png", 30)] {
            RgbaImage::from_pixel(4, 3, Rgba([value, 0, 0, 255]))
                .save(dir.path().join(name))
                .unwrap();
        }
        std::fs::write(dir.path().join("notes.txt"), "skip me").unwrap();

        let mut camera = ImageSequenceCamera::from_dir(dir.path()).unwrap();
        assert_eq!(camera.files().len(), 3);
        assert!(camera
            .open(&Constraints {
                exact: Some(Resolution::new(160, 120)),
                ..Constraints::default()
            })
            .is_err());

        let stream = camera.open(&Constraints::default()).unwrap();
        assert_eq!(stream.resolution(), Some(Resolution::new(4, 3)));
        let (mut reader, _tracks) = stream.into_parts();
        let reds: Vec<u8> = std::iter::from_fn(|| reader.read().unwrap())
            .map(|frame| frame.image().get_pixel(0, 0)[0])
            .collect();
        assert_eq!(reds, vec![10, 20, 30]);
    }

    #[test]
    fn empty_directory_has_no_device() {
        let dir = tempfile::tempdir().unwrap();
        let mut camera = ImageSequenceCamera::from_dir(dir.path()).unwrap();
        assert!(matches!(
            camera.open(&Constraints::default()),
            Err(CaptureError::NoDevice)
        ));
    }

    #[test]
    fn channel_reader_ends_on_disconnect() {
        let (mut camera, sender) = ChannelCamera::unbounded();
        let (mut reader, _tracks) = camera.open(&Constraints::default()).unwrap().into_parts();
        sender
            .send(VideoFrame::new(RgbaImage::new(2, 2)))
            .unwrap();
        drop(sender);
        assert!(reader.read().unwrap().is_some());
        assert!(reader.read().unwrap().is_none());
    }
}
