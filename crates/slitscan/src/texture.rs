use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use image::RgbaImage;

use crate::buffer::SlitScanBuffer;
use crate::capture::VideoFrame;

/// How a renderer should sample the slit-scan texture.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TextureSampling {
    pub repeat_u: bool,
    pub repeat_v: bool,
    pub linear_min_filter: bool,
    /// Rotation about the texture centre, in radians.
    pub rotation: f32,
}

impl Default for TextureSampling {
    fn default() -> Self {
        Self {
            repeat_u: true,
            repeat_v: true,
            linear_min_filter: true,
            rotation: std::f32::consts::PI,
        }
    }
}

/// Shared view of a [`SlitScanBuffer`] plus a "needs upload" flag.
///
/// The scanner writes one scanline at a time and raises the flag; the
/// renderer calls [`TextureHandle::take_dirty`] before each draw and uploads
/// when it returns true. Reads may trail writes by a frame.
#[derive(Clone)]
pub struct TextureHandle {
    inner: Arc<TextureShared>,
}

struct TextureShared {
    buffer: Mutex<SlitScanBuffer>,
    dirty: AtomicBool,
    sampling: TextureSampling,
}

impl TextureHandle {
    /// Wraps `buffer`; a fresh texture starts dirty so it gets uploaded once.
    pub fn new(buffer: SlitScanBuffer) -> Self {
        Self::with_sampling(buffer, TextureSampling::default())
    }

    pub fn with_sampling(buffer: SlitScanBuffer, sampling: TextureSampling) -> Self {
        Self {
            inner: Arc::new(TextureShared {
                buffer: Mutex::new(buffer),
                dirty: AtomicBool::new(true),
                sampling,
            }),
        }
    }

    pub fn sampling(&self) -> TextureSampling {
        self.inner.sampling
    }

    /// Writes the frame's middle row and marks the texture dirty.
    pub fn write_frame(&self, frame: &VideoFrame) -> u32 {
        let row = self.lock().write_frame(frame);
        self.inner.dirty.store(true, Ordering::Release);
        row
    }

    /// Writes a raw RGBA scanline and marks the texture dirty.
    pub fn write_scanline(&self, pixels: &[u8]) -> u32 {
        let row = self.lock().write_scanline(pixels);
        self.inner.dirty.store(true, Ordering::Release);
        row
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.dirty.load(Ordering::Acquire)
    }

    /// Clears the dirty flag, returning whether it was set.
    pub fn take_dirty(&self) -> bool {
        self.inner.dirty.swap(false, Ordering::AcqRel)
    }

    /// Runs `read` against the buffer while holding the lock.
    pub fn with_buffer<R>(&self, read: impl FnOnce(&SlitScanBuffer) -> R) -> R {
        read(&self.lock())
    }

    pub fn snapshot(&self) -> RgbaImage {
        self.lock().image().clone()
    }

    pub fn dimensions(&self) -> (u32, u32) {
        let buffer = self.lock();
        (buffer.width(), buffer.height())
    }

    pub fn ptr_eq(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }

    fn lock(&self) -> MutexGuard<'_, SlitScanBuffer> {
        // A panicking writer leaves at worst one half-written scanline.
        self.inner
            .buffer
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl fmt::Debug for TextureHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let (width, height) = self.dimensions();
        f.debug_struct("TextureHandle")
            .field("width", &width)
            .field("height", &height)
            .field("dirty", &self.is_dirty())
            .finish()
    }
}
