//! 画面采集
//!
//! 屏幕采集在 Windows 下使用桌面复制（DXGI），其他平台使用 xcap；
//! 摄像头采集使用 nokhwa。所有来源都输出 RGB 帧。

pub mod screenshot;
pub mod webcam;

#[cfg(windows)]
mod dxgi;
#[cfg(windows)]
pub use dxgi::ScreenCapturer;

#[cfg(not(windows))]
mod xcap_backend;
#[cfg(not(windows))]
pub use xcap_backend::ScreenCapturer;

use image::RgbImage;
use tracing::debug;

use crate::config::BLACK_SAMPLE_SIZE;
use crate::error::CaptureError;

pub use screenshot::Screenshot;
pub use webcam::WebcamCapturer;

/// 帧来源接口
pub trait FrameSource {
    /// 取一帧；`Ok(None)` 表示这次没有新画面
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError>;

    fn size(&self) -> (u32, u32);
}

/// 可以调整分辨率的帧来源
pub trait AdjustableSource: FrameSource {
    /// 当前实际分辨率
    fn resolution(&self) -> (u32, u32);

    /// 请求新的分辨率，设备可能只部分满足
    fn request_resolution(&mut self, width: u32, height: u32) -> Result<(), CaptureError>;
}

/// BGRA（带行跨度）转 RGB
pub fn bgra_to_rgb(pixels: &[u8], width: u32, height: u32, stride: usize) -> Result<RgbImage, CaptureError> {
    strip_alpha(pixels, width, height, stride, [2, 1, 0])
}

/// RGBA（带行跨度）转 RGB
pub fn rgba_to_rgb(pixels: &[u8], width: u32, height: u32, stride: usize) -> Result<RgbImage, CaptureError> {
    strip_alpha(pixels, width, height, stride, [0, 1, 2])
}

fn strip_alpha(
    pixels: &[u8],
    width: u32,
    height: u32,
    stride: usize,
    order: [usize; 3],
) -> Result<RgbImage, CaptureError> {
    let row_bytes = width as usize * 4;
    let short = || CaptureError::Backend {
        context: "pixel conversion",
        reason: format!("buffer of {} bytes is too small for {width}x{height}", pixels.len()),
    };
    if stride < row_bytes {
        return Err(short());
    }

    let mut rgb = Vec::with_capacity(width as usize * height as usize * 3);
    for y in 0..height as usize {
        let start = y * stride;
        let row = pixels.get(start..start + row_bytes).ok_or_else(short)?;
        for px in row.chunks_exact(4) {
            rgb.extend_from_slice(&[px[order[0]], px[order[1]], px[order[2]]]);
        }
    }

    RgbImage::from_raw(width, height, rgb).ok_or_else(short)
}

/// 判断画面是否全黑
///
/// 在均匀网格上抽取100个像素，非黑像素不足10%即视为黑屏。
pub fn is_black_frame(image: &RgbImage) -> bool {
    let (width, height) = image.dimensions();
    if width == 0 || height == 0 {
        return true;
    }

    let side = (BLACK_SAMPLE_SIZE as f64).sqrt().ceil() as u32;
    let mut sampled = 0;
    let mut non_black = 0;
    'grid: for gy in 0..side {
        for gx in 0..side {
            if sampled == BLACK_SAMPLE_SIZE {
                break 'grid;
            }
            let x = ((2 * gx + 1) as u64 * width as u64 / (2 * side) as u64) as u32;
            let y = ((2 * gy + 1) as u64 * height as u64 / (2 * side) as u64) as u32;
            if image.get_pixel(x, y).0 != [0, 0, 0] {
                non_black += 1;
            }
            sampled += 1;
        }
    }

    non_black < BLACK_SAMPLE_SIZE / 10
}

/// 在 `attempts` 次内重复取帧
///
/// 需要重建会话的错误立即返回；普通错误和超时继续重试，最后一次的结果作为返回值。
pub(crate) fn retry_grab<A, W>(attempts: u32, mut grab: A, mut wait: W) -> Result<Option<RgbImage>, CaptureError>
where
    A: FnMut() -> Result<Option<RgbImage>, CaptureError>,
    W: FnMut(),
{
    let mut last = Ok(None);
    for attempt in 0..attempts {
        match grab() {
            Ok(Some(frame)) => return Ok(Some(frame)),
            Err(err) if err.requires_reinit() => return Err(err),
            Err(err) => {
                debug!("Grab attempt {} failed: {err}", attempt + 1);
                last = Err(err);
            }
            Ok(None) => last = Ok(None),
        }
        if attempt + 1 < attempts {
            wait();
        }
    }
    last
}
