//! 非 Windows 平台的屏幕采集（X11 / Wayland / macOS），基于 xcap

use std::thread;

use image::RgbImage;
use tracing::info;
use xcap::Monitor;

use crate::capture::{retry_grab, rgba_to_rgb, FrameSource};
use crate::config::{ACQUIRE_RETRIES, ACQUIRE_RETRY_DELAY};
use crate::error::CaptureError;

pub struct ScreenCapturer {
    monitor: Monitor,
    width: u32,
    height: u32,
}

impl ScreenCapturer {
    /// 打开第 `output_index` 个显示器
    pub fn open(output_index: usize) -> Result<Self, CaptureError> {
        let mut monitors = Monitor::all().map_err(|e| backend_error("Monitor::all", e))?;
        if output_index >= monitors.len() {
            return Err(CaptureError::NoOutput(format!(
                "monitor {output_index} not found ({} available)",
                monitors.len()
            )));
        }

        let monitor = monitors.swap_remove(output_index);
        let width = monitor.width().unwrap_or(0);
        let height = monitor.height().unwrap_or(0);
        let name = monitor.name().unwrap_or_else(|_| format!("Display {output_index}"));
        info!("Screen capture ready on {name} ({width}x{height})");

        Ok(Self { monitor, width, height })
    }
}

impl ScreenCapturer {
    fn capture_once(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        let image = self.monitor.capture_image().map_err(|e| backend_error("capture_image", e))?;
        let (width, height) = (image.width(), image.height());
        if width == 0 || height == 0 {
            return Ok(None);
        }

        self.width = width;
        self.height = height;
        let pixels = image.into_raw();
        rgba_to_rgb(&pixels, width, height, width as usize * 4).map(Some)
    }
}

impl FrameSource for ScreenCapturer {
    /// 失败时最多重试3次，间隔10ms
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        retry_grab(ACQUIRE_RETRIES, || self.capture_once(), || thread::sleep(ACQUIRE_RETRY_DELAY))
    }

    fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }
}

fn backend_error(context: &'static str, err: impl std::fmt::Display) -> CaptureError {
    CaptureError::Backend { context, reason: err.to_string() }
}
