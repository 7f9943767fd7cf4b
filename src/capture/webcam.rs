use std::thread;
use std::time::Duration;

use image::{imageops, RgbImage};
use nokhwa::pixel_format::RgbFormat;
use nokhwa::utils::{CameraIndex, RequestedFormat, RequestedFormatType, Resolution};
use nokhwa::Camera;
use tracing::{info, warn};

use crate::capture::{AdjustableSource, FrameSource};
use crate::error::CaptureError;

/// 摄像头采集，输出水平镜像后的 RGB 帧
pub struct WebcamCapturer {
    camera: Camera,
}

impl WebcamCapturer {
    /// 打开摄像头并读取一帧验证
    pub fn open(index: u32) -> Result<Self, CaptureError> {
        let requested = RequestedFormat::new::<RgbFormat>(RequestedFormatType::AbsoluteHighestFrameRate);
        let mut camera = Camera::new(CameraIndex::Index(index), requested)
            .map_err(|e| backend_error("Camera::new", e))?;
        camera.open_stream().map_err(|e| backend_error("open_stream", e))?;

        let mut capturer = Self { camera };
        match capturer.grab()? {
            Some(_) => Ok(capturer),
            None => Err(CaptureError::NoOutput(format!("camera {index} returned no test frame"))),
        }
    }

    /// 最多尝试 `attempts` 次，两次之间等待 `delay`
    pub fn open_with_retries(index: u32, attempts: u32, delay: Duration) -> Result<Self, CaptureError> {
        let capturer = open_with_retries(|| Self::open(index), attempts, delay)?;
        let (width, height) = capturer.resolution();
        info!("Webcam initialized at default resolution: {width}x{height}");
        Ok(capturer)
    }
}

/// 重复尝试打开，返回最后一次的错误
pub fn open_with_retries<S, F>(mut open: F, attempts: u32, delay: Duration) -> Result<S, CaptureError>
where
    F: FnMut() -> Result<S, CaptureError>,
{
    let mut last_error = CaptureError::NoOutput("no open attempts made".into());
    for attempt in 0..attempts {
        if attempt > 0 {
            info!("Retrying webcam initialization...");
            thread::sleep(delay);
        }
        match open() {
            Ok(source) => return Ok(source),
            Err(e) => {
                warn!("Webcam open attempt {} failed: {e}", attempt + 1);
                last_error = e;
            }
        }
    }
    Err(last_error)
}

impl FrameSource for WebcamCapturer {
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        let buffer = match self.camera.frame() {
            Ok(buffer) => buffer,
            Err(e) => {
                warn!("Webcam frame read failed: {e}");
                return Ok(None);
            }
        };
        let decoded = buffer.decode_image::<RgbFormat>().map_err(|e| backend_error("decode_image", e))?;
        let (width, height) = (decoded.width(), decoded.height());
        if width == 0 || height == 0 {
            return Ok(None);
        }

        let frame = RgbImage::from_raw(width, height, decoded.into_raw()).ok_or(CaptureError::Backend {
            context: "decode_image",
            reason: "frame buffer size mismatch".into(),
        })?;
        Ok(Some(imageops::flip_horizontal(&frame)))
    }

    fn size(&self) -> (u32, u32) {
        self.resolution()
    }
}

impl AdjustableSource for WebcamCapturer {
    fn resolution(&self) -> (u32, u32) {
        let resolution = self.camera.resolution();
        (resolution.width(), resolution.height())
    }

    fn request_resolution(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.camera
            .set_resolution(Resolution::new(width, height))
            .map_err(|e| backend_error("set_resolution", e))
    }
}

fn backend_error(context: &'static str, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Backend { context, reason: err.to_string() }
}
