use std::path::{Path, PathBuf};

use image::RgbImage;
use tracing::{info, warn};

use crate::capture::{is_black_frame, FrameSource};
use crate::env::timestamp_string;
use crate::error::CaptureError;

/// 定时截图
///
/// 每次 `capture` 取一帧，跳过黑屏，保存为 `screenshot_<时间戳>.png` 并保留最后一张图像。
/// 没有新画面或跳过时保留上一张。
pub struct Screenshot<S, F>
where
    S: FrameSource,
    F: FnMut() -> Result<S, CaptureError>,
{
    source: S,
    reopen: F,
    dir: PathBuf,
    image: Option<RgbImage>,
}

impl<S, F> Screenshot<S, F>
where
    S: FrameSource,
    F: FnMut() -> Result<S, CaptureError>,
{
    /// 创建存储目录并打开采集源
    pub fn new(dir: impl Into<PathBuf>, mut open: F) -> Result<Self, CaptureError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)?;
        let source = open()?;
        Ok(Self { source, reopen: open, dir, image: None })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// 最近一次保存的截图
    pub fn image(&self) -> Option<&RgbImage> {
        self.image.as_ref()
    }

    /// 截取一帧
    ///
    /// 采集会话失效时重建一次采集源，本次不产生新截图；重建失败返回错误。
    pub fn capture(&mut self) -> Result<(), CaptureError> {
        let frame = match self.source.grab() {
            Ok(frame) => frame,
            Err(err) if err.requires_reinit() => {
                warn!("Capture session lost: {err}");
                let message = match err {
                    CaptureError::AccessLost => "Failed to re-establish desktop duplication",
                    _ => "Failed to reinitialize DirectX",
                };
                self.source = (self.reopen)().map_err(|_| CaptureError::ReinitFailed(message))?;
                return Ok(());
            }
            Err(err) => return Err(err),
        };

        let Some(frame) = frame else {
            return Ok(());
        };
        if is_black_frame(&frame) {
            info!("Screen detected as black, skipping screenshot.");
            return Ok(());
        }

        let filename = format!("screenshot_{}.png", timestamp_string());
        frame.save(self.dir.join(&filename))?;
        info!("Screenshot saved to: {filename}");

        self.image = Some(frame);
        Ok(())
    }
}
