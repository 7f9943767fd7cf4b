use std::time::Instant;

use tracing::{error, info, warn};

use crate::capture::AdjustableSource;
use crate::config::{HIGH_RES_HEIGHT, HIGH_RES_WIDTH, MAX_HIGH_RES_ATTEMPTS, TARGET_FPS};
use crate::detect::{draw_detections, ObjectDetector};
use crate::error::AgentError;
use crate::utils::{FrameBoard, FramePacer};

/// 高分辨率切换
///
/// 摄像头先以默认分辨率快速启动，拿到画面后再逐帧尝试切换，最多尝试 `max_attempts` 次。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResolutionUpgrade {
    width: u32,
    height: u32,
    max_attempts: u32,
    attempts: u32,
    reached: bool,
}

impl ResolutionUpgrade {
    pub fn new(width: u32, height: u32, max_attempts: u32) -> Self {
        Self { width, height, max_attempts, attempts: 0, reached: false }
    }

    pub fn reached(&self) -> bool {
        self.reached
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    /// 已达到目标或放弃
    pub fn is_settled(&self) -> bool {
        self.reached || self.attempts >= self.max_attempts
    }

    fn satisfied_by(&self, (width, height): (u32, u32)) -> bool {
        width >= self.width && height >= self.height
    }

    /// 尝试一次切换
    pub fn step<S: AdjustableSource>(&mut self, source: &mut S) {
        if self.is_settled() {
            return;
        }
        if self.satisfied_by(source.resolution()) {
            self.reached = true;
            return;
        }

        info!("Attempting to switch to high resolution...");
        if let Err(e) = source.request_resolution(self.width, self.height) {
            warn!("Resolution request rejected: {e}");
        }

        let (width, height) = source.resolution();
        if self.satisfied_by((width, height)) {
            self.reached = true;
            info!("Successfully switched to high resolution: {width}x{height}");
        } else {
            self.attempts += 1;
            info!(
                "Failed to switch to high resolution, attempt {} of {}",
                self.attempts, self.max_attempts
            );
        }
    }
}

impl Default for ResolutionUpgrade {
    fn default() -> Self {
        Self::new(HIGH_RES_WIDTH, HIGH_RES_HEIGHT, MAX_HIGH_RES_ATTEMPTS)
    }
}

/// 摄像头代理
pub struct WebcamAgent<S: AdjustableSource, D: ObjectDetector> {
    source: S,
    detector: D,
    board: FrameBoard,
    pacer: FramePacer,
    upgrade: ResolutionUpgrade,
}

impl<S: AdjustableSource, D: ObjectDetector> WebcamAgent<S, D> {
    pub fn new(source: S, detector: D, board: FrameBoard) -> Self {
        Self {
            source,
            detector,
            board,
            pacer: FramePacer::new(TARGET_FPS),
            upgrade: ResolutionUpgrade::default(),
        }
    }

    pub fn with_fps(mut self, fps: u32) -> Self {
        self.pacer = FramePacer::new(fps);
        self
    }

    pub fn with_upgrade(mut self, upgrade: ResolutionUpgrade) -> Self {
        self.upgrade = upgrade;
        self
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    pub fn upgrade(&self) -> &ResolutionUpgrade {
        &self.upgrade
    }

    /// 运行到退出或摄像头断开，返回处理的帧数
    ///
    /// # 错误处理
    /// 读取或推理失败时停止并返回该错误
    pub fn run(&mut self) -> Result<u64, AgentError> {
        let mut frames = 0u64;

        while !self.board.should_quit() {
            let start = Instant::now();

            let Some(frame) = self.source.grab()? else {
                error!("Webcam Disconnected or Failed to get frames");
                break;
            };
            frames += 1;

            self.upgrade.step(&mut self.source);

            let detections = self.detector.detect(&frame).map_err(|e| {
                error!("Error during YOLO processing in webcam agent: {e}");
                e
            })?;
            let annotated = draw_detections(&frame, &detections);
            self.board.publish(annotated, detections);

            self.pacer.pace(start);
        }

        info!("Webcam Feed Ended");
        Ok(frames)
    }
}
