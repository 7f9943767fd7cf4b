use std::sync::{Arc, Condvar, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use image::RgbImage;

use crate::detect::Detection;

/// 一帧带检测结果的画面
#[derive(Debug, Clone)]
pub struct AnnotatedFrame {
    /// 发布序号，从1开始递增
    pub seq: u64,
    /// 已画好检测框的图像
    pub image: Arc<RgbImage>,
    /// 检测结果，显示端用来绘制标签
    pub detections: Vec<Detection>,
}

#[derive(Default)]
struct State {
    latest: Option<AnnotatedFrame>,
    seq: u64,
    quit: bool,
}

/// 生产者/消费者共享的帧槽
///
/// 只保留最新一帧，没有背压：生产者从不等待消费者。
/// 退出标志与帧槽共用同一把锁和条件变量，等待中的线程会被 `request_quit` 唤醒。
#[derive(Clone, Default)]
pub struct FrameBoard {
    inner: Arc<(Mutex<State>, Condvar)>,
}

impl FrameBoard {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.inner.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// 发布新的一帧，返回其序号
    pub fn publish(&self, image: RgbImage, detections: Vec<Detection>) -> u64 {
        let mut state = self.lock();
        state.seq += 1;
        let seq = state.seq;
        state.latest = Some(AnnotatedFrame { seq, image: Arc::new(image), detections });
        drop(state);
        self.inner.1.notify_all();
        seq
    }

    /// 序号大于 `seq` 的最新帧
    pub fn latest_after(&self, seq: u64) -> Option<AnnotatedFrame> {
        let state = self.lock();
        state.latest.as_ref().filter(|frame| frame.seq > seq).cloned()
    }

    /// 等待比 `seq` 更新的帧，超时或退出时返回 `None`
    pub fn wait_newer(&self, seq: u64, timeout: Duration) -> Option<AnnotatedFrame> {
        let state = self.lock();
        let (state, _) = self
            .inner
            .1
            .wait_timeout_while(state, timeout, |s| !s.quit && s.seq <= seq)
            .unwrap_or_else(PoisonError::into_inner);
        if state.quit {
            return None;
        }
        state.latest.as_ref().filter(|frame| frame.seq > seq).cloned()
    }

    pub fn request_quit(&self) {
        self.lock().quit = true;
        self.inner.1.notify_all();
    }

    pub fn should_quit(&self) -> bool {
        self.lock().quit
    }

    /// 休眠 `duration`，期间收到退出请求会提前醒来
    ///
    /// 返回 `true` 表示可以继续运行
    pub fn pause(&self, duration: Duration) -> bool {
        let state = self.lock();
        let (state, _) = self
            .inner
            .1
            .wait_timeout_while(state, duration, |s| !s.quit)
            .unwrap_or_else(PoisonError::into_inner);
        !state.quit
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::thread;
    use std::time::Instant;

    #[test]
    fn publish_keeps_only_latest() {
        let board = FrameBoard::new();
        assert!(board.latest_after(0).is_none());

        board.publish(RgbImage::new(2, 2), Vec::new());
        let seq = board.publish(RgbImage::new(4, 4), Vec::new());
        assert_eq!(seq, 2);

        let frame = board.latest_after(0).unwrap();
        assert_eq!(frame.seq, 2);
        assert_eq!(frame.image.dimensions(), (4, 4));
        assert!(board.latest_after(2).is_none());
    }

    #[test]
    fn wait_newer_wakes_on_publish() {
        let board = FrameBoard::new();
        let producer = board.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            producer.publish(RgbImage::new(1, 1), Vec::new());
        });

        let frame = board.wait_newer(0, Duration::from_secs(5));
        assert_eq!(frame.map(|f| f.seq), Some(1));
        handle.join().unwrap();
    }

    #[test]
    fn quit_interrupts_pause() {
        let board = FrameBoard::new();
        let other = board.clone();
        let handle = thread::spawn(move || {
            thread::sleep(Duration::from_millis(20));
            other.request_quit();
        });

        let start = Instant::now();
        assert!(!board.pause(Duration::from_secs(10)));
        assert!(start.elapsed() < Duration::from_secs(5));
        assert!(board.should_quit());
        assert!(board.wait_newer(0, Duration::from_secs(1)).is_none());
        handle.join().unwrap();
    }

    #[test]
    fn pause_runs_to_completion_without_quit() {
        let board = FrameBoard::new();
        assert!(board.pause(Duration::from_millis(5)));
    }
}
