//! crates/skincheck_core/src/scan.rs
//!
//! One scan session: camera or upload in, one still image held, analysis out,
//! result handed to the results view through the mailbox.
//!
//! Every mutating operation takes `&mut self`, so a session can never have two
//! analyses in flight at once; callers sharing a session across tasks must
//! serialize access (the HTTP layer does so with a per-session mutex).

use tracing::{debug, info, warn};

use crate::analysis::AnalysisClient;
use crate::capture::{CaptureState, MediaCaptureController};
use crate::domain::{AnalysisResult, CapturedImage};
use crate::error::{CaptureError, ScanError};
use crate::handoff::ResultMailbox;
use crate::image_source::{ImageSource, UploadedFile};
use crate::ports::{MediaDevices, StreamConstraints};
use std::sync::Arc;

/// A published result and where the caller should navigate next.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub result: AnalysisResult,
    pub next_route: &'static str,
}

pub struct ScanSession {
    camera: Option<MediaCaptureController>,
    images: ImageSource,
    analysis: AnalysisClient,
    mailbox: ResultMailbox,
    image: Option<CapturedImage>,
    camera_permission_denied: bool,
}

impl ScanSession {
    pub fn new(analysis: AnalysisClient, mailbox: ResultMailbox, images: ImageSource) -> Self {
        Self {
            camera: None,
            images,
            analysis,
            mailbox,
            image: None,
            camera_permission_denied: false,
        }
    }

    /// Attaches a camera so the capture path becomes available.
    pub fn with_camera(mut self, devices: Arc<dyn MediaDevices>) -> Self {
        self.camera = Some(MediaCaptureController::new(devices));
        self
    }

    pub fn camera_state(&self) -> CaptureState {
        self.camera
            .as_ref()
            .map_or(CaptureState::Idle, MediaCaptureController::state)
    }

    /// Set once the user or platform has refused the camera. Uploading still works.
    pub fn camera_permission_denied(&self) -> bool {
        self.camera_permission_denied
    }

    pub fn image(&self) -> Option<&CapturedImage> {
        self.image.as_ref()
    }

    pub async fn start_camera(&mut self, constraints: StreamConstraints) -> Result<(), ScanError> {
        let controller = self
            .camera
            .as_mut()
            .ok_or_else(|| CaptureError::DeviceUnavailable("no camera attached".to_string()))?;

        match controller.acquire(constraints).await {
            Ok(()) => {
                self.camera_permission_denied = false;
                Ok(())
            }
            Err(CaptureError::PermissionDenied) => {
                self.camera_permission_denied = true;
                Err(CaptureError::PermissionDenied.into())
            }
            Err(e) => Err(e.into()),
        }
    }

    pub fn stop_camera(&mut self) {
        if let Some(controller) = self.camera.as_mut() {
            controller.release();
        }
    }

    /// Freezes the live frame as the session's image.
    pub fn capture(&mut self) -> Result<&CapturedImage, ScanError> {
        let controller = self.camera.as_mut().ok_or(CaptureError::NotReady)?;
        let frame = controller.capture_frame()?;
        let image = self.images.from_capture(frame);
        Ok(self.replace_image(image))
    }

    /// Uses an uploaded file as the session's image. Stops the camera if it was live.
    pub fn upload(&mut self, file: UploadedFile) -> Result<&CapturedImage, ScanError> {
        let image = self.images.from_file(file)?;
        self.stop_camera();
        Ok(self.replace_image(image))
    }

    /// Drops the held image and releases the camera.
    pub fn reset(&mut self) {
        self.stop_camera();
        if let Some(old) = self.image.take() {
            debug!("Released {}", old.reference());
        }
    }

    /// Submits the held image and publishes the result.
    ///
    /// On failure the image is kept, so the same still can be resubmitted
    /// without capturing again. Once the result is handed off the image is
    /// released.
    pub async fn analyze(&mut self) -> Result<ScanOutcome, ScanError> {
        let image = self.image.clone().ok_or(ScanError::NoImage)?;
        self.stop_camera();

        let classification = self.analysis.analyze(&image).await.inspect_err(|_| {
            warn!("Keeping {} for a manual retry", image.reference());
        })?;

        let result = AnalysisResult::from_classification(classification, &image);
        let next_route = self.mailbox.publish(&result)?;
        self.image = None;
        info!("Scan complete, released {}, continuing to {}", image.reference(), next_route);

        Ok(ScanOutcome { result, next_route })
    }

    fn replace_image(&mut self, image: CapturedImage) -> &CapturedImage {
        if let Some(old) = self.image.take() {
            debug!("Replacing {} with {}", old.reference(), image.reference());
        }
        self.image.insert(image)
    }
}
