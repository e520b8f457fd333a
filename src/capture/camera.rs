//! Webcam capture using nokhwa
//!
//! Opens a camera matching a facing preference and delivers RGBA frames.
//! Frame reads block until the camera produces the next frame, so the
//! camera itself paces the capture loop.

use crate::capture::traits::{CameraInfo, CaptureError, FacingMode, Frame, Resolution};
use nokhwa::pixel_format::RgbAFormat;
use nokhwa::utils::{
    ApiBackend, CameraFormat, CameraIndex, FrameFormat, RequestedFormat, RequestedFormatType,
};
use nokhwa::Camera;

/// Get list of available cameras
pub fn get_cameras() -> Vec<CameraInfo> {
    match nokhwa::query(ApiBackend::Auto) {
        Ok(cameras) => cameras
            .into_iter()
            .map(|info| {
                let id = match info.index() {
                    CameraIndex::Index(i) => i.to_string(),
                    CameraIndex::String(s) => s.to_string(),
                };
                let name = info.human_name().to_string();

                // Common resolutions
                let resolutions = vec![
                    Resolution {
                        width: 1920,
                        height: 1080,
                    },
                    Resolution {
                        width: 1280,
                        height: 720,
                    },
                    Resolution {
                        width: 640,
                        height: 480,
                    },
                ];

                CameraInfo {
                    id,
                    name,
                    supported_resolutions: resolutions,
                }
            })
            .collect(),
        Err(e) => {
            tracing::warn!("Failed to enumerate cameras: {:?}", e);
            Vec::new()
        }
    }
}

/// Pick a device index for the given facing mode.
///
/// Device names containing "front"/"user" or "back"/"rear" win outright;
/// otherwise `User` takes the first enumerated device and `Environment`
/// the second (falling back to the first on single-camera machines).
pub fn select_device(cameras: &[CameraInfo], facing: FacingMode) -> Option<u32> {
    let name_matches = |info: &CameraInfo| {
        let name = info.name.to_lowercase();
        match facing {
            FacingMode::User => name.contains("front") || name.contains("user"),
            FacingMode::Environment => name.contains("back") || name.contains("rear"),
        }
    };

    if let Some(hit) = cameras.iter().find(|c| name_matches(c)) {
        return hit.id.parse().ok();
    }

    let positional = match facing {
        FacingMode::User => cameras.first(),
        FacingMode::Environment => cameras.get(1).or_else(|| cameras.first()),
    };
    positional.and_then(|c| c.id.parse().ok())
}

/// An open camera delivering RGBA frames
pub struct CameraSource {
    camera: Camera,
    facing: FacingMode,
}

impl CameraSource {
    /// Open a camera for the given facing preference at the ideal
    /// resolution (the backend picks the closest supported format).
    pub fn open(facing: FacingMode, ideal: Resolution) -> Result<Self, CaptureError> {
        let cameras = get_cameras();
        if cameras.is_empty() {
            return Err(CaptureError::DeviceNotFound(facing));
        }

        let index = select_device(&cameras, facing).ok_or(CaptureError::DeviceNotFound(facing))?;

        let requested = RequestedFormat::new::<RgbAFormat>(RequestedFormatType::Closest(
            CameraFormat::new_from(ideal.width, ideal.height, FrameFormat::MJPEG, 30),
        ));

        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| CaptureError::OpenFailed(format!("{e:?}")))?;

        camera
            .open_stream()
            .map_err(|e| CaptureError::OpenFailed(format!("{e:?}")))?;

        let format = camera.camera_format();
        tracing::info!(
            "Camera opened for facing={}: device {} at {}x{} @ {}fps ({:?})",
            facing,
            index,
            format.resolution().width(),
            format.resolution().height(),
            format.frame_rate(),
            format.format(),
        );

        Ok(Self { camera, facing })
    }

    /// Facing mode this source was opened with
    pub fn facing(&self) -> FacingMode {
        self.facing
    }

    /// Actual capture resolution negotiated with the device
    pub fn resolution(&self) -> Resolution {
        let res = self.camera.camera_format().resolution();
        Resolution {
            width: res.width(),
            height: res.height(),
        }
    }

    /// Block until the camera delivers the next frame, decoded to RGBA
    pub fn read_frame(&mut self) -> Result<Frame, CaptureError> {
        let buffer = self
            .camera
            .frame()
            .map_err(|e| CaptureError::FrameFailed(format!("{e:?}")))?;

        let decoded = buffer
            .decode_image::<RgbAFormat>()
            .map_err(|e| CaptureError::FrameFailed(format!("{e:?}")))?;

        let width = decoded.width();
        let height = decoded.height();

        Ok(Frame {
            width,
            height,
            data: decoded.into_raw(),
        })
    }

    /// Stop the camera stream, releasing the device
    pub fn close(mut self) {
        if let Err(e) = self.camera.stop_stream() {
            tracing::warn!("Error stopping camera stream: {:?}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cam(id: &str, name: &str) -> CameraInfo {
        CameraInfo {
            id: id.to_string(),
            name: name.to_string(),
            supported_resolutions: vec![],
        }
    }

    #[test]
    fn test_select_device_by_name_hint() {
        let cameras = vec![cam("0", "Rear Camera"), cam("1", "Front Camera")];
        assert_eq!(select_device(&cameras, FacingMode::User), Some(1));
        assert_eq!(select_device(&cameras, FacingMode::Environment), Some(0));
    }

    #[test]
    fn test_select_device_positional() {
        let cameras = vec![cam("0", "Integrated Webcam"), cam("1", "USB Capture")];
        assert_eq!(select_device(&cameras, FacingMode::User), Some(0));
        assert_eq!(select_device(&cameras, FacingMode::Environment), Some(1));
    }

    #[test]
    fn test_select_device_single_camera_serves_both() {
        let cameras = vec![cam("0", "Integrated Webcam")];
        assert_eq!(select_device(&cameras, FacingMode::User), Some(0));
        assert_eq!(select_device(&cameras, FacingMode::Environment), Some(0));
    }

    #[test]
    fn test_select_device_empty() {
        assert_eq!(select_device(&[], FacingMode::User), None);
    }
}
