#![warn(missing_docs)]
//! # facegate-capture
//!
//! ## Purpose
//! Owns camera acquisition, single-frame capture, PNG encoding, and stream
//! teardown for the capture-and-submit flow.
//!
//! ## Responsibilities
//! - Define a backend-agnostic [`CameraDevice`] / [`VideoStream`] pair.
//! - Expose a real webcam backend behind the `camera` feature.
//! - Expose a deterministic synthetic camera for CI and unit tests.
//! - Model an open stream as an exclusively owned [`CaptureSession`].
//!
//! ## Data flow
//! [`MediaCaptureController::open_camera`] acquires a stream ->
//! [`MediaCaptureController::capture_frame`] grabs one [`Frame`] and encodes
//! it to PNG on the blocking pool -> the resulting [`PhotoPayload`] is handed
//! to the flow controller only after encoding completes.
//!
//! ## Ownership and lifetimes
//! A [`CaptureSession`] owns its stream from acquisition until
//! [`CaptureSession::close`]. Closing is idempotent and `Drop` closes, so a
//! session can never leak the device lock past its owner.
//!
//! ## Error model
//! Denied permission, missing hardware, dropped streams and encode failures
//! are reported as [`CaptureError`] values; all of them are recoverable.
//!
//! ## Security and privacy notes
//! Frames and encoded photos stay in memory; nothing is written to disk.

use std::fmt;
use std::io::Cursor;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, AtomicUsize, Ordering};

use async_trait::async_trait;
use facegate_core::{Frame, PhotoPayload};
use image::codecs::png::PngEncoder;
use image::{ExtendedColorType, ImageEncoder};
use thiserror::Error;
use tracing::{debug, info, warn};

/// Source of live video streams.
///
/// Acquisition is an async boundary: real devices may wait on a permission
/// prompt before a stream is available.
#[async_trait(?Send)]
pub trait CameraDevice {
    /// Short backend name used in logs.
    fn name(&self) -> &str;

    /// Requests exclusive access to a video input and starts streaming.
    ///
    /// # Errors
    /// Returns [`CaptureError::DeviceUnavailable`] on denial or absent hardware.
    async fn acquire(&self) -> Result<Box<dyn VideoStream>, CaptureError>;
}

/// One live stream handed out by a [`CameraDevice`].
pub trait VideoStream {
    /// Reads the current frame at the stream's native resolution.
    ///
    /// # Errors
    /// Returns [`CaptureError::StreamLost`] when the stream dropped.
    fn current_frame(&mut self) -> Result<Frame, CaptureError>;

    /// Releases every underlying track.
    fn stop(&mut self);
}

/// An open camera stream owned by exactly one form instance.
pub struct CaptureSession {
    id: u64,
    device: String,
    stream: Option<Box<dyn VideoStream>>,
}

impl CaptureSession {
    fn new(id: u64, device: impl Into<String>, stream: Box<dyn VideoStream>) -> Self {
        Self {
            id,
            device: device.into(),
            stream: Some(stream),
        }
    }

    /// Session identifier, unique per controller.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` until the session has been closed.
    pub fn is_open(&self) -> bool {
        self.stream.is_some()
    }

    /// Reads the current frame.
    ///
    /// # Errors
    /// Returns [`CaptureError::SessionClosed`] after close, or the stream's
    /// own error.
    pub fn grab(&mut self) -> Result<Frame, CaptureError> {
        let stream = self.stream.as_mut().ok_or(CaptureError::SessionClosed)?;
        stream.current_frame()
    }

    /// Stops the stream. Returns `true` when this call released the device.
    pub fn close(&mut self) -> bool {
        match self.stream.take() {
            Some(mut stream) => {
                stream.stop();
                info!(
                    stage = "capture",
                    action = "close",
                    session = self.id,
                    device = %self.device,
                    "camera session released"
                );
                true
            }
            None => false,
        }
    }
}

impl Drop for CaptureSession {
    fn drop(&mut self) {
        if self.close() {
            debug!(session = self.id, "camera session released on drop");
        }
    }
}

impl fmt::Debug for CaptureSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CaptureSession")
            .field("id", &self.id)
            .field("device", &self.device)
            .field("open", &self.is_open())
            .finish()
    }
}

/// Acquires sessions from one device and turns frames into photo payloads.
pub struct MediaCaptureController {
    device: Arc<dyn CameraDevice>,
    enabled: bool,
    next_session: AtomicU64,
}

impl MediaCaptureController {
    /// Creates a controller over `device`.
    pub fn new(device: Arc<dyn CameraDevice>) -> Self {
        Self {
            device,
            enabled: true,
            next_session: AtomicU64::new(1),
        }
    }

    /// Applies the camera kill switch; a disabled controller never acquires.
    pub fn with_enabled(mut self, enabled: bool) -> Self {
        self.enabled = enabled;
        self
    }

    /// Returns `true` when the kill switch allows acquisition.
    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Opens a new capture session.
    ///
    /// # Errors
    /// Returns [`CaptureError::DeviceUnavailable`] when disabled by
    /// configuration, denied, or when no device is present.
    pub async fn open_camera(&self) -> Result<CaptureSession, CaptureError> {
        if !self.enabled {
            return Err(CaptureError::DeviceUnavailable(
                "camera disabled by configuration".to_string(),
            ));
        }

        let stream = self.device.acquire().await.inspect_err(|error| {
            warn!(stage = "capture", action = "open", device = self.device.name(), %error);
        })?;

        let id = self.next_session.fetch_add(1, Ordering::Relaxed);
        info!(
            stage = "capture",
            action = "open",
            session = id,
            device = self.device.name(),
            "camera session opened"
        );
        Ok(CaptureSession::new(id, self.device.name(), stream))
    }

    /// Grabs the current frame and encodes it as PNG.
    ///
    /// The payload is returned only after encoding completes.
    ///
    /// # Errors
    /// Returns [`CaptureError::SessionClosed`], [`CaptureError::StreamLost`], or
    /// [`CaptureError::Encode`].
    pub async fn capture_frame(
        &self,
        session: &mut CaptureSession,
    ) -> Result<PhotoPayload, CaptureError> {
        let frame = session.grab()?;
        let (width, height) = (frame.width, frame.height);

        let png = tokio::task::spawn_blocking(move || encode_png(&frame))
            .await
            .map_err(|error| CaptureError::Encode(format!("encode task failed: {error}")))??;

        info!(
            stage = "capture",
            action = "frame",
            session = session.id(),
            width,
            height,
            png_bytes = png.len(),
            "frame captured"
        );
        PhotoPayload::captured_png(png).map_err(|error| CaptureError::Encode(error.to_string()))
    }

    /// Releases a session. Calling it again on the same session is a no-op.
    pub fn close_session(&self, session: &mut CaptureSession) -> bool {
        session.close()
    }
}

impl fmt::Debug for MediaCaptureController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MediaCaptureController")
            .field("device", &self.device.name())
            .field("enabled", &self.enabled)
            .finish()
    }
}

/// Encodes an RGBA frame as PNG at its native resolution.
///
/// # Errors
/// Returns [`CaptureError::Encode`] when the encoder rejects the buffer.
pub fn encode_png(frame: &Frame) -> Result<Vec<u8>, CaptureError> {
    let mut png = Cursor::new(Vec::new());
    PngEncoder::new(&mut png)
        .write_image(
            &frame.rgba,
            frame.width,
            frame.height,
            ExtendedColorType::Rgba8,
        )
        .map_err(|error| CaptureError::Encode(error.to_string()))?;
    Ok(png.into_inner())
}

/// Webcam backend.
///
/// Streams come from `nokhwa` when the `camera` feature is enabled; otherwise
/// every acquisition reports the device as unavailable.
#[derive(Debug, Clone)]
pub struct NativeCamera {
    index: u32,
}

impl NativeCamera {
    /// Targets the video input at `index` (0 is the system default).
    pub fn new(index: u32) -> Self {
        Self { index }
    }
}

impl Default for NativeCamera {
    fn default() -> Self {
        Self::new(0)
    }
}

#[async_trait(?Send)]
impl CameraDevice for NativeCamera {
    fn name(&self) -> &str {
        "native"
    }

    async fn acquire(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        #[cfg(feature = "camera")]
        {
            let stream = native::open(self.index)?;
            Ok(Box::new(stream))
        }

        #[cfg(not(feature = "camera"))]
        {
            let _ = self.index;
            Err(CaptureError::DeviceUnavailable(
                "native camera support is not compiled in (enable the `camera` feature)"
                    .to_string(),
            ))
        }
    }
}

#[cfg(feature = "camera")]
mod native {
    use facegate_core::Frame;
    use nokhwa::Camera;
    use nokhwa::pixel_format::RgbFormat;
    use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType};
    use tracing::warn;

    use super::{CaptureError, VideoStream};

    pub(super) struct NativeStream {
        camera: Camera,
        stopped: bool,
    }

    pub(super) fn open(index: u32) -> Result<NativeStream, CaptureError> {
        let format =
            RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestResolution);
        let mut camera = Camera::new(CameraIndex::Index(index), format)
            .map_err(|error| CaptureError::DeviceUnavailable(error.to_string()))?;
        camera
            .open_stream()
            .map_err(|error| CaptureError::DeviceUnavailable(error.to_string()))?;

        Ok(NativeStream {
            camera,
            stopped: false,
        })
    }

    impl VideoStream for NativeStream {
        fn current_frame(&mut self) -> Result<Frame, CaptureError> {
            let buffer = self
                .camera
                .frame()
                .map_err(|error| CaptureError::StreamLost(error.to_string()))?;
            let rgb = buffer
                .decode_image::<RgbFormat>()
                .map_err(|error| CaptureError::StreamLost(error.to_string()))?;

            let (width, height) = (rgb.width(), rgb.height());
            let mut rgba = Vec::with_capacity(width as usize * height as usize * 4);
            for pixel in rgb.as_raw().chunks_exact(3) {
                rgba.extend_from_slice(pixel);
                rgba.push(u8::MAX);
            }

            Frame::new(width, height, rgba)
                .map_err(|error| CaptureError::StreamLost(error.to_string()))
        }

        fn stop(&mut self) {
            if self.stopped {
                return;
            }
            if let Err(error) = self.camera.stop_stream() {
                warn!(stage = "capture", action = "stop", %error, "failed to stop camera stream");
            }
            self.stopped = true;
        }
    }
}

/// Counters exposed by [`SyntheticCamera`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct CameraStats {
    /// Successful acquisitions.
    pub acquisitions: usize,
    /// Streams acquired and not yet stopped.
    pub open_streams: usize,
    /// Streams stopped.
    pub releases: usize,
}

#[derive(Debug, Default)]
struct Counters {
    acquisitions: AtomicUsize,
    open_streams: AtomicUsize,
    releases: AtomicUsize,
}

/// Deterministic camera for tests, CI, and demos.
#[derive(Debug, Clone)]
pub struct SyntheticCamera {
    width: u32,
    height: u32,
    denial: Option<String>,
    frames_before_loss: Option<u64>,
    counters: Arc<Counters>,
}

impl SyntheticCamera {
    /// Creates a 4x4 synthetic camera that always grants access.
    pub fn new() -> Self {
        Self {
            width: 4,
            height: 4,
            denial: None,
            frames_before_loss: None,
            counters: Arc::new(Counters::default()),
        }
    }

    /// Overrides the native resolution.
    pub fn with_resolution(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Makes every acquisition fail as if permission were denied.
    pub fn denying(mut self, reason: impl Into<String>) -> Self {
        self.denial = Some(reason.into());
        self
    }

    /// Drops each stream after `frames` successful reads.
    pub fn losing_stream_after(mut self, frames: u64) -> Self {
        self.frames_before_loss = Some(frames);
        self
    }

    /// Snapshot of acquisition counters, shared by clones.
    pub fn stats(&self) -> CameraStats {
        CameraStats {
            acquisitions: self.counters.acquisitions.load(Ordering::SeqCst),
            open_streams: self.counters.open_streams.load(Ordering::SeqCst),
            releases: self.counters.releases.load(Ordering::SeqCst),
        }
    }
}

impl Default for SyntheticCamera {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait(?Send)]
impl CameraDevice for SyntheticCamera {
    fn name(&self) -> &str {
        "synthetic"
    }

    async fn acquire(&self) -> Result<Box<dyn VideoStream>, CaptureError> {
        // Permission prompts resolve on a later turn of the event loop.
        tokio::task::yield_now().await;

        if let Some(reason) = &self.denial {
            return Err(CaptureError::DeviceUnavailable(reason.clone()));
        }

        self.counters.acquisitions.fetch_add(1, Ordering::SeqCst);
        self.counters.open_streams.fetch_add(1, Ordering::SeqCst);
        Ok(Box::new(SyntheticStream {
            width: self.width,
            height: self.height,
            sequence: 0,
            frames_before_loss: self.frames_before_loss,
            counters: Arc::clone(&self.counters),
            stopped: false,
        }))
    }
}

struct SyntheticStream {
    width: u32,
    height: u32,
    sequence: u64,
    frames_before_loss: Option<u64>,
    counters: Arc<Counters>,
    stopped: bool,
}

impl VideoStream for SyntheticStream {
    fn current_frame(&mut self) -> Result<Frame, CaptureError> {
        if self.stopped {
            return Err(CaptureError::StreamLost("stream stopped".to_string()));
        }
        if let Some(limit) = self.frames_before_loss
            && self.sequence >= limit
        {
            return Err(CaptureError::StreamLost(
                "synthetic stream dropped".to_string(),
            ));
        }

        self.sequence += 1;
        let mut rgba = Vec::with_capacity(self.width as usize * self.height as usize * 4);
        for y in 0..self.height {
            for x in 0..self.width {
                let shade = ((x + y) as u64 + self.sequence) % 256;
                rgba.extend_from_slice(&[shade as u8, (x % 256) as u8, (y % 256) as u8, 255]);
            }
        }

        Frame::new(self.width, self.height, rgba)
            .map_err(|error| CaptureError::StreamLost(error.to_string()))
    }

    fn stop(&mut self) {
        if self.stopped {
            return;
        }
        self.stopped = true;
        self.counters.open_streams.fetch_sub(1, Ordering::SeqCst);
        self.counters.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Capture layer error type.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CaptureError {
    /// Permission denied, hardware absent, or camera disabled.
    #[error("camera unavailable: {0}")]
    DeviceUnavailable(String),
    /// The stream dropped mid-session.
    #[error("camera stream lost: {0}")]
    StreamLost(String),
    /// The session was already closed.
    #[error("camera session is closed")]
    SessionClosed,
    /// PNG encoding failed.
    #[error("frame encode failed: {0}")]
    Encode(String),
}

#[cfg(test)]
mod tests {
    //! Unit tests for synthetic capture and PNG encoding.

    use super::*;

    const PNG_SIGNATURE: [u8; 8] = [0x89, b'P', b'N', b'G', 0x0D, 0x0A, 0x1A, 0x0A];

    #[test]
    fn encode_png_emits_png_signature() {
        let frame = Frame::new(2, 2, vec![128; 16]).expect("frame should be valid");
        let png = encode_png(&frame).expect("encode should work");
        assert_eq!(&png[..8], &PNG_SIGNATURE);
    }

    #[test]
    fn encode_png_is_deterministic() {
        let frame = Frame::new(3, 1, vec![9; 12]).expect("frame should be valid");
        assert_eq!(
            encode_png(&frame).expect("encode should work"),
            encode_png(&frame).expect("encode should work")
        );
    }

    #[tokio::test]
    async fn synthetic_stream_counts_open_and_release() {
        let camera = SyntheticCamera::new();
        let mut stream = camera.acquire().await.expect("acquire should work");
        assert_eq!(camera.stats().open_streams, 1);

        let frame = stream.current_frame().expect("frame should be readable");
        assert_eq!((frame.width, frame.height), (4, 4));

        stream.stop();
        stream.stop();
        assert_eq!(
            camera.stats(),
            CameraStats {
                acquisitions: 1,
                open_streams: 0,
                releases: 1,
            }
        );
    }

    #[tokio::test]
    async fn native_camera_without_feature_is_unavailable() {
        if cfg!(feature = "camera") {
            return;
        }
        let result = NativeCamera::default().acquire().await;
        assert!(matches!(result, Err(CaptureError::DeviceUnavailable(_))));
    }
}
