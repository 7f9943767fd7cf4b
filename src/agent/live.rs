use std::time::{Duration, Instant};

use tracing::{error, info, warn};

use crate::capture::FrameSource;
use crate::config::{
    FAILURE_RETRY_DELAY, MAX_CONSECUTIVE_FAILURES, REINITIALIZE_DELAY, REPORT_EVERY, TARGET_FPS,
};
use crate::detect::{draw_detections, ObjectDetector};
use crate::error::{AgentError, CaptureError};
use crate::utils::{FrameBoard, FramePacer};

/// 连续采集的重试与节奏参数
#[derive(Debug, Clone, Copy)]
pub struct LiveSettings {
    pub fps: u32,
    pub max_consecutive_failures: u32,
    pub reinitialize_delay: Duration,
    pub failure_retry_delay: Duration,
    pub report_every: u64,
}

impl Default for LiveSettings {
    fn default() -> Self {
        Self {
            fps: TARGET_FPS,
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            reinitialize_delay: REINITIALIZE_DELAY,
            failure_retry_delay: FAILURE_RETRY_DELAY,
            report_every: REPORT_EVERY,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum SessionEnd {
    Quit,
    AccessLost,
    TooManyFailures,
    InferenceFailed,
}

/// 连续屏幕采集代理
///
/// 外层循环负责打开采集会话和检测器，内层循环逐帧处理。
/// 会话因访问丢失或连续失败（含取帧超时）结束后，等待2秒重建；检测器只在推理出错后重新加载。
pub struct LiveAgent<S, D, OS, OD>
where
    S: FrameSource,
    D: ObjectDetector,
    OS: FnMut() -> Result<S, CaptureError>,
    OD: FnMut() -> Result<D, AgentError>,
{
    open_source: OS,
    open_detector: OD,
    board: FrameBoard,
    settings: LiveSettings,
}

impl<S, D, OS, OD> LiveAgent<S, D, OS, OD>
where
    S: FrameSource,
    D: ObjectDetector,
    OS: FnMut() -> Result<S, CaptureError>,
    OD: FnMut() -> Result<D, AgentError>,
{
    pub fn new(open_source: OS, open_detector: OD, board: FrameBoard) -> Self {
        Self { open_source, open_detector, board, settings: LiveSettings::default() }
    }

    pub fn with_settings(mut self, settings: LiveSettings) -> Self {
        self.settings = settings;
        self
    }

    /// 运行到收到退出请求，返回处理的帧数
    pub fn run(&mut self) -> u64 {
        let pacer = FramePacer::new(self.settings.fps);
        let delay = self.settings.reinitialize_delay;
        let mut detector: Option<D> = None;
        let mut frames = 0u64;

        while !self.board.should_quit() {
            info!("Attempting to initialize screen capture...");
            let mut source = match (self.open_source)() {
                Ok(source) => source,
                Err(e) => {
                    error!("Screen capture initialization failed: {e}. Retrying in 2 seconds...");
                    self.board.pause(delay);
                    continue;
                }
            };
            info!("Screen capture initialized successfully.");

            if detector.is_none() {
                match (self.open_detector)() {
                    Ok(loaded) => detector = Some(loaded),
                    Err(e) => {
                        error!("Failed to setup YOLO network: {e}. Cleaning up capture and retrying.");
                        drop(source);
                        self.board.pause(delay);
                        continue;
                    }
                }
            }
            let Some(active) = detector.as_mut() else {
                continue;
            };

            let end = self.run_session(&mut source, active, &pacer, &mut frames);
            info!("Cleaning up capture context for this session.");
            drop(source);

            match end {
                SessionEnd::Quit => {}
                SessionEnd::InferenceFailed => {
                    detector = None;
                    error!("Capture session ended after an inference error. Re-initializing in 2 seconds...");
                    self.board.pause(delay);
                }
                SessionEnd::AccessLost | SessionEnd::TooManyFailures => {
                    error!("Capture session ended or failed. Attempting to re-initialize in 2 seconds...");
                    self.board.pause(delay);
                }
            }
        }

        info!("Screen capture stopped.");
        frames
    }

    fn run_session(
        &self,
        source: &mut S,
        detector: &mut D,
        pacer: &FramePacer,
        frames: &mut u64,
    ) -> SessionEnd {
        let mut consecutive_failures = 0u32;

        while !self.board.should_quit() {
            let start = Instant::now();

            // 取帧超时与普通错误同样计入连续失败
            let grabbed = match source.grab() {
                Ok(Some(frame)) => {
                    consecutive_failures = 0;
                    Ok(frame)
                }
                Ok(None) => Err("no new frame within the acquire retries".to_string()),
                Err(e) if e.requires_reinit() => {
                    error!("Capture access lost ({e}). Re-initializing capture session...");
                    return SessionEnd::AccessLost;
                }
                Err(e) => Err(e.to_string()),
            };
            let frame = match grabbed {
                Ok(frame) => frame,
                Err(reason) => {
                    consecutive_failures += 1;
                    warn!("Frame capture failed ({consecutive_failures}): {reason}");
                    if consecutive_failures >= self.settings.max_consecutive_failures {
                        error!("Too many consecutive capture failures. Re-initializing capture session...");
                        return SessionEnd::TooManyFailures;
                    }
                    self.board.pause(self.settings.failure_retry_delay);
                    continue;
                }
            };

            *frames += 1;
            let detections = match detector.detect(&frame) {
                Ok(detections) => detections,
                Err(e) => {
                    error!("Error during YOLO processing: {e}");
                    return SessionEnd::InferenceFailed;
                }
            };

            let annotated = draw_detections(&frame, &detections);
            self.board.publish(annotated, detections);

            pacer.pace(start);
            if self.settings.report_every > 0 && *frames % self.settings.report_every == 0 {
                info!("Processed {} frames via screen capture.", frames);
            }
        }

        SessionEnd::Quit
    }
}
