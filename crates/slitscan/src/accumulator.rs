use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use thiserror::Error;
use tracing::{debug, info, warn};

use crate::buffer::{SlitScanBuffer, SLIT_HEIGHT};
use crate::capture::{
    probe_resolutions, CaptureDevice, CaptureError, FacingMode, FrameReader, Resolution,
    TrackHandle, PREFERRED_RESOLUTIONS,
};
use crate::texture::TextureHandle;

#[derive(Debug, Error)]
pub enum SlitScanError {
    #[error("could not acquire a camera stream")]
    Acquisition(#[source] CaptureError),
    #[error("camera stream ended before delivering a frame")]
    NoFrames,
    #[error("failed to read the first camera frame")]
    FirstFrame(#[source] CaptureError),
    #[error("failed to spawn slit-scan worker")]
    Spawn(#[source] std::io::Error),
    #[error("slit-scanner is already initialised")]
    AlreadyInitialised,
}

#[derive(Debug, Clone)]
pub struct ScanOptions {
    /// Rows in the circular buffer.
    pub height: u32,
    /// Exact capture sizes to try, in order, before an unconstrained request.
    pub resolutions: Vec<Resolution>,
    pub facing: FacingMode,
}

impl Default for ScanOptions {
    fn default() -> Self {
        Self {
            height: SLIT_HEIGHT,
            resolutions: PREFERRED_RESOLUTIONS.to_vec(),
            facing: FacingMode::Environment,
        }
    }
}

/// Owns a camera stream and the worker thread that folds its frames into a
/// [`TextureHandle`].
pub struct SlitScanner {
    options: ScanOptions,
    texture: Option<TextureHandle>,
    running: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
    tracks: Vec<TrackHandle>,
    worker: Option<JoinHandle<()>>,
    resolution: Option<Resolution>,
}

impl SlitScanner {
    pub fn new(options: ScanOptions) -> Self {
        Self {
            options,
            texture: None,
            running: Arc::new(AtomicBool::new(false)),
            frames: Arc::new(AtomicU64::new(0)),
            tracks: Vec::new(),
            worker: None,
            resolution: None,
        }
    }

    /// Opens `device`, sizes the buffer from the first frame and starts
    /// draining the rest in the background.
    pub fn initialize<D: CaptureDevice + ?Sized>(
        &mut self,
        device: &mut D,
    ) -> Result<TextureHandle, SlitScanError> {
        if self.texture.is_some() {
            return Err(SlitScanError::AlreadyInitialised);
        }

        let stream = probe_resolutions(device, &self.options.resolutions, self.options.facing)
            .map_err(SlitScanError::Acquisition)?;
        let negotiated = stream.resolution();
        let (mut reader, tracks) = stream.into_parts();

        let first = match reader.read() {
            Ok(Some(frame)) => frame,
            Ok(None) => {
                stop_tracks(&tracks);
                return Err(SlitScanError::NoFrames);
            }
            Err(error) => {
                stop_tracks(&tracks);
                return Err(SlitScanError::FirstFrame(error));
            }
        };

        let texture = TextureHandle::new(SlitScanBuffer::new(first.width(), self.options.height));
        texture.write_frame(&first);
        self.frames.store(1, Ordering::Release);
        let resolution =
            negotiated.unwrap_or_else(|| Resolution::new(first.width(), first.height()));
        drop(first);

        self.running.store(true, Ordering::Release);
        let worker = {
            let texture = texture.clone();
            let running = Arc::clone(&self.running);
            let frames = Arc::clone(&self.frames);
            thread::Builder::new()
                .name("rivvon-slitscan".into())
                .spawn(move || drain(reader, texture, running, frames))
        };
        let worker = match worker {
            Ok(handle) => handle,
            Err(error) => {
                self.running.store(false, Ordering::Release);
                stop_tracks(&tracks);
                return Err(SlitScanError::Spawn(error));
            }
        };

        info!(
            %resolution,
            width = texture.dimensions().0,
            height = self.options.height,
            "slit-scan started"
        );
        self.tracks = tracks;
        self.worker = Some(worker);
        self.resolution = Some(resolution);
        self.texture = Some(texture.clone());
        Ok(texture)
    }

    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::Acquire)
    }

    pub fn texture(&self) -> Option<&TextureHandle> {
        self.texture.as_ref()
    }

    /// Capture size agreed with the device.
    pub fn resolution(&self) -> Option<Resolution> {
        self.resolution
    }

    /// Frames written so far, the synchronous first frame included.
    pub fn frames_processed(&self) -> u64 {
        self.frames.load(Ordering::Acquire)
    }

    /// Waits for a finite stream to run dry, then releases the tracks.
    pub fn join(&mut self) {
        self.join_worker();
        stop_tracks(&self.tracks);
    }

    /// Cancels the worker, stops every track and waits for the reader to be
    /// released. Safe to call repeatedly.
    pub fn stop(&mut self) {
        self.running.store(false, Ordering::Release);
        stop_tracks(&self.tracks);
        self.join_worker();
    }

    fn join_worker(&mut self) {
        if let Some(handle) = self.worker.take() {
            if handle.join().is_err() {
                warn!("slit-scan worker panicked");
            }
            self.running.store(false, Ordering::Release);
            debug!(frames = self.frames_processed(), "slit-scan worker finished");
        }
    }
}

impl Default for SlitScanner {
    fn default() -> Self {
        Self::new(ScanOptions::default())
    }
}

impl Drop for SlitScanner {
    fn drop(&mut self) {
        self.stop();
    }
}

fn stop_tracks(tracks: &[TrackHandle]) {
    for track in tracks {
        track.stop();
    }
}

fn drain(
    mut reader: Box<dyn FrameReader>,
    texture: TextureHandle,
    running: Arc<AtomicBool>,
    frames: Arc<AtomicU64>,
) {
    while running.load(Ordering::Acquire) {
        match reader.read() {
            Ok(Some(frame)) => {
                if !running.load(Ordering::Acquire) {
                    break;
                }
                texture.write_frame(&frame);
                frames.fetch_add(1, Ordering::AcqRel);
            }
            Ok(None) => {
                debug!("camera stream ended");
                break;
            }
            Err(error) => {
                warn!(%error, "camera read failed; slit-scan stopped");
                break;
            }
        }
    }
    running.store(false, Ordering::Release);
}

#[cfg(test)]
mod tests {
    use std::time::Duration;

    use image::{Rgba, RgbaImage};

    use super::*;
    use crate::buffer::gradient_color;
    use crate::cameras::{ChannelCamera, SyntheticCamera};
    use crate::capture::VideoFrame;

    fn striped_frame(width: u32, height: u32, value: u8) -> VideoFrame {
        VideoFrame::new(RgbaImage::from_fn(width, height, |_, y| {
            if y == height / 2 {
                Rgba([value, value, value, 255])
            } else {
                Rgba([1, 2, 3, 255])
            }
        }))
    }

    #[test]
    fn frames_land_in_arrival_order_over_the_gradient() {
        let (camera, sender) = ChannelCamera::unbounded();
        let mut camera = camera.with_resolution(Resolution::new(160, 120));
        for value in [10, 20, 30] {
            sender.send(striped_frame(4, 3, value)).unwrap();
        }
        drop(sender);

        let mut scanner = SlitScanner::default();
        let texture = scanner.initialize(&mut camera).unwrap();
        scanner.join();

        assert_eq!(scanner.frames_processed(), 3);
        assert!(!scanner.is_running());
        assert_eq!(scanner.resolution(), Some(Resolution::new(160, 120)));
        assert_eq!(texture.dimensions(), (4, SLIT_HEIGHT));
        texture.with_buffer(|buffer| {
            for (row, value) in [10u8, 20, 30].into_iter().enumerate() {
                assert_eq!(buffer.row_pixels(row as u32), [value, value, value, 255].repeat(4));
            }
            let untouched = gradient_color(3.5 / SLIT_HEIGHT as f32);
            assert_eq!(buffer.row_pixels(3), untouched.0.repeat(4));
            assert_eq!(buffer.row(), 3);
        });
    }

    #[test]
    fn width_comes_from_the_first_frame() {
        let mut camera =
            SyntheticCamera::new(Resolution::new(64, 48)).with_supported(Vec::new());
        let mut scanner = SlitScanner::new(ScanOptions {
            height: 16,
            ..ScanOptions::default()
        });
        let texture = scanner.initialize(&mut camera).unwrap();
        scanner.stop();
        assert_eq!(texture.dimensions(), (64, 16));
        assert_eq!(camera.requests().len(), 4);
    }

    #[test]
    fn unavailable_camera_is_an_acquisition_error() {
        let mut camera = SyntheticCamera::unavailable();
        let mut scanner = SlitScanner::default();
        let err = scanner.initialize(&mut camera).unwrap_err();
        assert!(matches!(err, SlitScanError::Acquisition(CaptureError::NoDevice)));
        assert!(scanner.texture().is_none());
        assert!(!scanner.is_running());
    }

    #[test]
    fn empty_stream_reports_no_frames() {
        let (mut camera, sender) = ChannelCamera::bounded(1);
        drop(sender);
        let mut scanner = SlitScanner::default();
        assert!(matches!(
            scanner.initialize(&mut camera),
            Err(SlitScanError::NoFrames)
        ));
    }

    #[test]
    fn read_error_ends_the_worker_quietly() {
        let mut camera = SyntheticCamera::new(Resolution::new(160, 120)).with_failure_after(5);
        let mut scanner = SlitScanner::default();
        scanner.initialize(&mut camera).unwrap();
        scanner.join();
        assert_eq!(scanner.frames_processed(), 5);
        assert!(!scanner.is_running());
    }

    #[test]
    fn stop_is_idempotent_and_cancels_an_endless_stream() {
        let mut camera = SyntheticCamera::new(Resolution::new(160, 120))
            .with_frame_interval(Duration::from_millis(1));
        let mut scanner = SlitScanner::default();
        let texture = scanner.initialize(&mut camera).unwrap();
        assert!(scanner.is_running());

        scanner.stop();
        scanner.stop();
        assert!(!scanner.is_running());

        let frames = scanner.frames_processed();
        assert!(frames >= 1);
        std::thread::sleep(Duration::from_millis(10));
        assert_eq!(scanner.frames_processed(), frames);
        let row = texture.with_buffer(|b| b.row()) as u64;
        assert_eq!(row, frames % SLIT_HEIGHT as u64);
    }

    #[test]
    fn initialising_twice_is_rejected() {
        let mut camera = SyntheticCamera::new(Resolution::new(160, 120)).with_frame_limit(1);
        let mut scanner = SlitScanner::default();
        scanner.initialize(&mut camera).unwrap();
        assert!(matches!(
            scanner.initialize(&mut camera),
            Err(SlitScanError::AlreadyInitialised)
        ));
    }
}
