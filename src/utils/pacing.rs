use std::thread;
use std::time::{Duration, Instant};

/// 帧率控制
///
/// 每帧处理完后睡掉目标帧间隔剩余的时间，处理超时则不等待。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FramePacer {
    frame_delay: Duration,
}

impl FramePacer {
    /// 帧间隔为 `1000 / fps` 毫秒（整数除法）
    pub fn new(fps: u32) -> Self {
        Self { frame_delay: Duration::from_millis(1000 / u64::from(fps.max(1))) }
    }

    pub fn frame_delay(&self) -> Duration {
        self.frame_delay
    }

    /// 已用去 `elapsed` 时还需等待的时间
    pub fn remaining(&self, elapsed: Duration) -> Duration {
        self.frame_delay.saturating_sub(elapsed)
    }

    /// 从 `start` 算起补足一个帧间隔
    pub fn pace(&self, start: Instant) {
        let wait = self.remaining(start.elapsed());
        if !wait.is_zero() {
            thread::sleep(wait);
        }
    }
}
