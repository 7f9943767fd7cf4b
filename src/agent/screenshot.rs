use std::time::{Duration, Instant};

use image::RgbImage;
use tokio::time::sleep;
use tracing::{error, info};

use crate::capture::{FrameSource, Screenshot};
use crate::config::{INFERENCE_POLL, MAX_EMPTY_RETRIES, SCREENSHOT_INTERVAL};
use crate::detect::{draw_detections, Detection, ObjectDetector};
use crate::error::{AgentError, CaptureError};
use crate::utils::FrameBoard;

type Inference<D> = (D, Result<(RgbImage, Vec<Detection>), AgentError>);

/// 定时截图代理
///
/// 每个周期截一张图并立即显示原图，检测在阻塞线程池中执行，
/// 完成后换成带检测框的图像，然后等到周期结束。
pub struct ScreenshotAgent<D: ObjectDetector + 'static> {
    detector: Option<D>,
    board: FrameBoard,
    interval: Duration,
    max_empty_retries: u32,
    poll: Duration,
}

impl<D: ObjectDetector + 'static> ScreenshotAgent<D> {
    pub fn new(detector: D, board: FrameBoard) -> Self {
        Self {
            detector: Some(detector),
            board,
            interval: SCREENSHOT_INTERVAL,
            max_empty_retries: MAX_EMPTY_RETRIES,
            poll: INFERENCE_POLL,
        }
    }

    pub fn with_interval(mut self, interval: Duration) -> Self {
        self.interval = interval;
        self
    }

    pub fn with_poll(mut self, poll: Duration) -> Self {
        self.poll = poll;
        self
    }

    /// 运行到收到退出请求或连续取不到图像，返回完成检测的截图数
    ///
    /// # 错误处理
    /// 截图、保存或推理失败时结束并返回该错误
    pub async fn run<S, F>(&mut self, screenshot: &mut Screenshot<S, F>) -> Result<u64, AgentError>
    where
        S: FrameSource,
        F: FnMut() -> Result<S, CaptureError>,
    {
        let mut retry_count = 0u32;
        let mut frames = 0u64;

        while !self.board.should_quit() {
            let start = Instant::now();

            info!("Capturing screenshot...");
            screenshot.capture()?;
            let Some(image) = screenshot.image().cloned() else {
                error!("Image is empty, Retrying...");
                retry_count += 1;
                if retry_count >= self.max_empty_retries {
                    info!("Image is empty after {} retries. Exiting...", self.max_empty_retries);
                    break;
                }
                continue;
            };
            retry_count = 0;

            self.board.publish(image.clone(), Vec::new());

            let Some((annotated, detections)) = self.infer(image).await? else {
                break;
            };
            frames += 1;
            self.board.publish(annotated, detections);

            let remaining = self.interval.saturating_sub(start.elapsed());
            if !sleep_unless_quit(&self.board, remaining, self.poll).await {
                break;
            }
        }

        Ok(frames)
    }

    /// 后台推理，等待期间每隔 `poll` 检查一次退出标志；退出时返回 `None`
    async fn infer(&mut self, image: RgbImage) -> Result<Option<(RgbImage, Vec<Detection>)>, AgentError> {
        let mut detector = self
            .detector
            .take()
            .ok_or_else(|| AgentError::Task { reason: "detector unavailable".into() })?;

        let mut task = tokio::task::spawn_blocking(move || -> Inference<D> {
            let result = detector
                .detect(&image)
                .map(|detections| (draw_detections(&image, &detections), detections));
            (detector, result)
        });

        let joined = tokio::select! {
            joined = &mut task => joined,
            _ = wait_for_quit(&self.board, self.poll) => return Ok(None),
        };

        let (detector, result) = joined.map_err(|e| AgentError::Task { reason: e.to_string() })?;
        self.detector = Some(detector);
        result.map(Some)
    }
}

async fn wait_for_quit(board: &FrameBoard, poll: Duration) {
    while !board.should_quit() {
        sleep(poll).await;
    }
}

/// 分段休眠，返回 `false` 表示期间收到了退出请求
async fn sleep_unless_quit(board: &FrameBoard, duration: Duration, poll: Duration) -> bool {
    let deadline = Instant::now() + duration;
    loop {
        if board.should_quit() {
            return false;
        }
        let left = deadline.saturating_duration_since(Instant::now());
        if left.is_zero() {
            return true;
        }
        sleep(left.min(poll)).await;
    }
}
