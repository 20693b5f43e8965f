//! crates/skincheck_core/src/capture.rs
//!
//! Owns the camera for one scan session: acquires a live stream, freezes a
//! single frame into a JPEG still, and releases the hardware on every exit.
//!
//! State machine: `Idle -> Acquiring -> Live -> Frozen`. A failed acquisition
//! returns to `Idle`; `release()` returns any state to `Idle`. A live stream is
//! never replaced in place: acquiring again releases the held stream first.

use image::codecs::jpeg::JpegEncoder;
use image::RgbImage;
use std::sync::Arc;
use tracing::{debug, info, warn};

use crate::error::CaptureError;
use crate::ports::{
    MediaAccessError, MediaDevices, MediaStream, RawFrame, ReadyState, StreamConstraints,
};

/// JPEG quality used for captured stills.
pub const DEFAULT_JPEG_QUALITY: u8 = 92;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CaptureState {
    Idle,
    Acquiring,
    Live,
    Frozen,
}

/// A still frame encoded as JPEG at the stream's native resolution.
#[derive(Debug, Clone)]
pub struct EncodedFrame {
    pub jpeg: Vec<u8>,
    pub width: u32,
    pub height: u32,
}

pub struct MediaCaptureController {
    devices: Arc<dyn MediaDevices>,
    stream: Option<Box<dyn MediaStream>>,
    state: CaptureState,
    jpeg_quality: u8,
}

impl MediaCaptureController {
    pub fn new(devices: Arc<dyn MediaDevices>) -> Self {
        Self {
            devices,
            stream: None,
            state: CaptureState::Idle,
            jpeg_quality: DEFAULT_JPEG_QUALITY,
        }
    }

    pub fn with_jpeg_quality(mut self, quality: u8) -> Self {
        self.jpeg_quality = quality.clamp(1, 100);
        self
    }

    pub fn state(&self) -> CaptureState {
        self.state
    }

    /// Number of tracks still running on the held stream.
    pub fn active_tracks(&self) -> usize {
        self.stream.as_ref().map_or(0, |s| s.active_tracks())
    }

    /// Requests a live stream. Any stream already held is released first.
    pub async fn acquire(&mut self, constraints: StreamConstraints) -> Result<(), CaptureError> {
        if self.state != CaptureState::Idle || self.stream.is_some() {
            debug!("Releasing held stream before acquiring a new one");
            self.release();
        }

        self.state = CaptureState::Acquiring;
        info!(
            "Requesting camera stream ({:?}, {}x{})",
            constraints.facing, constraints.ideal_width, constraints.ideal_height
        );

        match self.devices.get_user_media(&constraints).await {
            Ok(stream) => {
                self.stream = Some(stream);
                self.state = CaptureState::Live;
                info!("Camera stream is live");
                Ok(())
            }
            Err(MediaAccessError::NotAllowed) => {
                self.state = CaptureState::Idle;
                warn!("Camera permission denied");
                Err(CaptureError::PermissionDenied)
            }
            Err(e) => {
                self.state = CaptureState::Idle;
                warn!("Camera unavailable: {}", e);
                Err(CaptureError::DeviceUnavailable(e.to_string()))
            }
        }
    }

    /// Stops every track of the held stream. No-op when nothing is held.
    pub fn release(&mut self) {
        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
            info!("Camera stream released");
        }
        self.state = CaptureState::Idle;
    }

    /// Freezes the current frame and releases the stream.
    ///
    /// Fails with `NotReady` unless the stream is live and has buffered enough
    /// data; the stream stays live in that case so the caller can try again.
    /// Any other failure releases the stream.
    pub fn capture_frame(&mut self) -> Result<EncodedFrame, CaptureError> {
        if self.state != CaptureState::Live {
            return Err(CaptureError::NotReady);
        }
        let stream = self.stream.as_mut().ok_or(CaptureError::NotReady)?;
        if stream.ready_state() < ReadyState::HaveEnoughData {
            debug!("Capture requested before the stream had enough data");
            return Err(CaptureError::NotReady);
        }

        let frame = match stream.grab_frame() {
            Ok(frame) => frame,
            Err(e) => {
                warn!("Frame grab failed, releasing camera: {}", e);
                self.release();
                return Err(CaptureError::DeviceUnavailable(e.to_string()));
            }
        };
        if frame.width == 0 || frame.height == 0 || frame.rgb.is_empty() {
            return Err(CaptureError::NotReady);
        }

        let (width, height) = (frame.width, frame.height);
        let encoded = encode_jpeg(frame, self.jpeg_quality);

        if let Some(mut stream) = self.stream.take() {
            stream.stop_all_tracks();
        }
        let jpeg = match encoded {
            Ok(jpeg) => jpeg,
            Err(e) => {
                warn!("Frame encode failed, camera released: {}", e);
                self.state = CaptureState::Idle;
                return Err(e);
            }
        };
        self.state = CaptureState::Frozen;
        info!("Captured {}x{} frame ({} bytes)", width, height, jpeg.len());

        Ok(EncodedFrame { jpeg, width, height })
    }
}

impl Drop for MediaCaptureController {
    fn drop(&mut self) {
        self.release();
    }
}

fn encode_jpeg(frame: RawFrame, quality: u8) -> Result<Vec<u8>, CaptureError> {
    let image = RgbImage::from_raw(frame.width, frame.height, frame.rgb).ok_or_else(|| {
        CaptureError::Encode("frame buffer does not match its dimensions".to_string())
    })?;
    let mut jpeg = Vec::new();
    JpegEncoder::new_with_quality(&mut jpeg, quality)
        .encode_image(&image)
        .map_err(|e| CaptureError::Encode(e.to_string()))?;
    Ok(jpeg)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ports::FacingMode;
    use crate::test_support::{CameraOutcome, FakeCamera, FrameFault};
    use std::sync::atomic::Ordering;

    #[tokio::test]
    async fn acquire_then_release_leaves_no_live_tracks() {
        let camera = FakeCamera::granting();
        let live = camera.live_tracks();
        let mut controller = MediaCaptureController::new(Arc::new(camera));

        controller.acquire(StreamConstraints::default()).await.unwrap();
        assert_eq!(controller.state(), CaptureState::Live);
        assert_eq!(live.load(Ordering::SeqCst), 1);

        controller.release();
        assert_eq!(controller.state(), CaptureState::Idle);
        assert_eq!(live.load(Ordering::SeqCst), 0);

        // Idempotent.
        controller.release();
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn requests_rear_camera_at_full_hd_by_default() {
        let camera = FakeCamera::granting();
        let requests = camera.requests.clone();
        let mut controller = MediaCaptureController::new(Arc::new(camera));

        controller.acquire(StreamConstraints::default()).await.unwrap();

        let seen = requests.lock().unwrap();
        assert_eq!(seen[0].facing, FacingMode::Environment);
        assert_eq!((seen[0].ideal_width, seen[0].ideal_height), (1920, 1080));
    }

    #[tokio::test]
    async fn capture_before_live_is_not_ready() {
        let mut controller = MediaCaptureController::new(Arc::new(FakeCamera::granting()));
        assert!(matches!(controller.capture_frame(), Err(CaptureError::NotReady)));
    }

    #[tokio::test]
    async fn capture_before_enough_data_keeps_stream_live() {
        let camera = FakeCamera::with_ready_state(ReadyState::HaveMetadata);
        let live = camera.live_tracks();
        let mut controller = MediaCaptureController::new(Arc::new(camera));
        controller.acquire(StreamConstraints::default()).await.unwrap();

        assert!(matches!(controller.capture_frame(), Err(CaptureError::NotReady)));
        assert_eq!(controller.state(), CaptureState::Live);
        assert_eq!(live.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn capture_freezes_a_jpeg_and_releases_the_camera() {
        let camera = FakeCamera::granting();
        let live = camera.live_tracks();
        let mut controller = MediaCaptureController::new(Arc::new(camera));
        controller.acquire(StreamConstraints::default()).await.unwrap();

        let frame = controller.capture_frame().unwrap();

        assert_eq!((frame.width, frame.height), (64, 48));
        assert_eq!(&frame.jpeg[..2], &[0xFF, 0xD8]);
        assert_eq!(controller.state(), CaptureState::Frozen);
        assert_eq!(live.load(Ordering::SeqCst), 0);

        // A frozen controller cannot capture again without a new stream.
        assert!(matches!(controller.capture_frame(), Err(CaptureError::NotReady)));
    }

    #[tokio::test]
    async fn failed_grab_or_encode_releases_the_camera() {
        let faults = [(FrameFault::GrabFails, false), (FrameFault::Truncated, true)];
        for (fault, expect_encode_error) in faults {
            let camera = FakeCamera::with_frame_fault(fault);
            let live = camera.live_tracks();
            let mut controller = MediaCaptureController::new(Arc::new(camera));
            controller.acquire(StreamConstraints::default()).await.unwrap();

            let err = controller.capture_frame().unwrap_err();
            if expect_encode_error {
                assert!(matches!(err, CaptureError::Encode(_)), "{:?}", fault);
            } else {
                assert!(matches!(err, CaptureError::DeviceUnavailable(_)), "{:?}", fault);
            }
            assert_eq!(controller.state(), CaptureState::Idle);
            assert_eq!(controller.active_tracks(), 0);
            assert_eq!(live.load(Ordering::SeqCst), 0);
        }
    }

    #[tokio::test]
    async fn denied_permission_returns_to_idle() {
        let camera = FakeCamera::with_outcome(CameraOutcome::Deny);
        let mut controller = MediaCaptureController::new(Arc::new(camera));

        let err = controller.acquire(StreamConstraints::default()).await.unwrap_err();
        assert!(matches!(err, CaptureError::PermissionDenied));
        assert_eq!(controller.state(), CaptureState::Idle);
    }

    #[tokio::test]
    async fn missing_device_is_unavailable() {
        let camera = FakeCamera::with_outcome(CameraOutcome::Missing);
        let mut controller = MediaCaptureController::new(Arc::new(camera));

        let err = controller.acquire(StreamConstraints::default()).await.unwrap_err();
        assert!(matches!(err, CaptureError::DeviceUnavailable(_)));
    }

    #[tokio::test]
    async fn reacquiring_releases_the_previous_stream() {
        let camera = FakeCamera::granting();
        let live = camera.live_tracks();
        let mut controller = MediaCaptureController::new(Arc::new(camera));

        controller.acquire(StreamConstraints::default()).await.unwrap();
        controller
            .acquire(StreamConstraints::facing(FacingMode::User))
            .await
            .unwrap();

        assert_eq!(live.load(Ordering::SeqCst), 1);
        assert_eq!(controller.active_tracks(), 1);
    }

    #[tokio::test]
    async fn dropping_the_controller_releases_the_camera() {
        let camera = FakeCamera::granting();
        let live = camera.live_tracks();
        {
            let mut controller = MediaCaptureController::new(Arc::new(camera));
            controller.acquire(StreamConstraints::default()).await.unwrap();
            assert_eq!(live.load(Ordering::SeqCst), 1);
        }
        assert_eq!(live.load(Ordering::SeqCst), 0);
    }
}
