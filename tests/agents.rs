use std::cell::{Cell, RefCell};
use std::collections::VecDeque;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use image::{Rgb, RgbImage};
use scout::agent::{LiveAgent, LiveSettings, ResolutionUpgrade, ScreenshotAgent, WebcamAgent};
use scout::capture::{AdjustableSource, FrameSource, Screenshot};
use scout::{AgentError, BoundingBox, CaptureError, Detection, FrameBoard, ObjectDetector};

type Step = Result<Option<RgbImage>, CaptureError>;

fn frame() -> RgbImage {
    RgbImage::from_pixel(16, 16, Rgb([200, 200, 200]))
}

fn os_failure() -> Step {
    Err(CaptureError::Os { context: "test", code: 1 })
}

fn temp_dir(name: &str) -> PathBuf {
    let dir = std::env::temp_dir().join(format!("scout-{name}-{}", std::process::id()));
    let _ = std::fs::remove_dir_all(&dir);
    dir
}

/// 按脚本返回帧，脚本用完后请求退出
struct ScriptedSource {
    steps: VecDeque<Step>,
    board: FrameBoard,
}

impl ScriptedSource {
    fn new(steps: Vec<Step>, board: &FrameBoard) -> Self {
        Self { steps: steps.into(), board: board.clone() }
    }
}

impl FrameSource for ScriptedSource {
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        match self.steps.pop_front() {
            Some(step) => step,
            None => {
                self.board.request_quit();
                Ok(None)
            }
        }
    }

    fn size(&self) -> (u32, u32) {
        (16, 16)
    }
}

#[derive(Clone, Default)]
struct FakeDetector {
    calls: Arc<AtomicUsize>,
    fail_on: Option<usize>,
}

impl ObjectDetector for FakeDetector {
    fn detect(&mut self, _frame: &RgbImage) -> Result<Vec<Detection>, AgentError> {
        let call = self.calls.fetch_add(1, Ordering::SeqCst) + 1;
        if self.fail_on == Some(call) {
            return Err(AgentError::UnexpectedOutput);
        }
        Ok(vec![Detection::new(BoundingBox::from_ltwh(2.0, 2.0, 8.0, 8.0), 0, "person".into(), 0.9)])
    }
}

fn fast_settings() -> LiveSettings {
    LiveSettings {
        fps: 1000,
        max_consecutive_failures: 5,
        reinitialize_delay: Duration::from_millis(1),
        failure_retry_delay: Duration::ZERO,
        report_every: 0,
    }
}

#[test]
fn live_access_lost_reopens_capture_but_keeps_detector() {
    let board = FrameBoard::new();
    let opens = Cell::new(0);
    let loads = Cell::new(0);
    let scripts = RefCell::new(VecDeque::from(vec![
        vec![Ok(Some(frame())), Err(CaptureError::AccessLost)],
        vec![Ok(Some(frame())), Ok(Some(frame()))],
    ]));

    let frames = LiveAgent::new(
        || {
            opens.set(opens.get() + 1);
            Ok(ScriptedSource::new(scripts.borrow_mut().pop_front().unwrap_or_default(), &board))
        },
        || {
            loads.set(loads.get() + 1);
            Ok(FakeDetector::default())
        },
        board.clone(),
    )
    .with_settings(fast_settings())
    .run();

    assert_eq!(frames, 3);
    assert_eq!(opens.get(), 2);
    assert_eq!(loads.get(), 1);

    let latest = board.latest_after(0).unwrap();
    assert_eq!(latest.seq, 3);
    assert_eq!(latest.detections.len(), 1);
}

#[test]
fn live_five_consecutive_failures_end_the_session() {
    let board = FrameBoard::new();
    let opens = Cell::new(0);
    let scripts = RefCell::new(VecDeque::from(vec![
        // 4次失败后成功，计数清零，不重建
        vec![os_failure(), os_failure(), os_failure(), os_failure(), Ok(Some(frame()))]
            .into_iter()
            .chain(std::iter::repeat_with(os_failure).take(5))
            .collect::<Vec<_>>(),
        vec![Ok(Some(frame()))],
    ]));

    let frames = LiveAgent::new(
        || {
            opens.set(opens.get() + 1);
            Ok(ScriptedSource::new(scripts.borrow_mut().pop_front().unwrap_or_default(), &board))
        },
        || Ok(FakeDetector::default()),
        board.clone(),
    )
    .with_settings(fast_settings())
    .run();

    assert_eq!(frames, 2);
    assert_eq!(opens.get(), 2);
}

#[test]
fn live_stalled_capture_counts_timeouts_as_failures() {
    let board = FrameBoard::new();
    let opens = Cell::new(0);
    let scripts = RefCell::new(VecDeque::from(vec![
        // 只超时不出帧的会话在第5次后重建
        std::iter::repeat_with(|| Ok(None)).take(5).collect::<Vec<Step>>(),
        vec![Ok(None), Ok(None), Ok(Some(frame()))],
    ]));

    let frames = LiveAgent::new(
        || {
            opens.set(opens.get() + 1);
            Ok(ScriptedSource::new(scripts.borrow_mut().pop_front().unwrap_or_default(), &board))
        },
        || Ok(FakeDetector::default()),
        board.clone(),
    )
    .with_settings(fast_settings())
    .run();

    assert_eq!(frames, 1);
    assert_eq!(opens.get(), 2);
}

#[test]
fn live_inference_error_reloads_detector() {
    let board = FrameBoard::new();
    let opens = Cell::new(0);
    let loads = Cell::new(0);
    let scripts = RefCell::new(VecDeque::from(vec![
        vec![Ok(Some(frame())), Ok(Some(frame()))],
        vec![Ok(Some(frame()))],
    ]));

    let frames = LiveAgent::new(
        || {
            opens.set(opens.get() + 1);
            Ok(ScriptedSource::new(scripts.borrow_mut().pop_front().unwrap_or_default(), &board))
        },
        || {
            loads.set(loads.get() + 1);
            // 第一个检测器在第一次推理时失败
            let fail_on = if loads.get() == 1 { Some(1) } else { None };
            Ok(FakeDetector { fail_on, ..Default::default() })
        },
        board.clone(),
    )
    .with_settings(fast_settings())
    .run();

    assert_eq!(frames, 2);
    assert_eq!(opens.get(), 2);
    assert_eq!(loads.get(), 2);
}

#[test]
fn live_retries_when_capture_cannot_open() {
    let board = FrameBoard::new();
    let opens = Cell::new(0);

    let frames = LiveAgent::new(
        || {
            opens.set(opens.get() + 1);
            if opens.get() < 3 {
                Err(CaptureError::NoOutput("not yet".into()))
            } else {
                Ok(ScriptedSource::new(vec![Ok(Some(frame()))], &board))
            }
        },
        || Ok(FakeDetector::default()),
        board.clone(),
    )
    .with_settings(fast_settings())
    .run();

    assert_eq!(frames, 1);
    assert_eq!(opens.get(), 3);
}

#[test]
fn live_stops_immediately_when_quit_already_requested() {
    let board = FrameBoard::new();
    board.request_quit();
    let frames = LiveAgent::new(
        || -> Result<ScriptedSource, CaptureError> { panic!("capture must not be opened") },
        || Ok(FakeDetector::default()),
        board,
    )
    .run();
    assert_eq!(frames, 0);
}

#[test]
fn screenshot_reinitializes_after_access_lost() {
    let dir = temp_dir("reinit");
    let board = FrameBoard::new();
    let opens = Cell::new(0);

    let mut screenshot = Screenshot::new(&dir, || {
        opens.set(opens.get() + 1);
        let steps = if opens.get() == 1 { vec![Err(CaptureError::AccessLost)] } else { vec![Ok(Some(frame()))] };
        Ok(ScriptedSource::new(steps, &board))
    })
    .unwrap();

    screenshot.capture().unwrap();
    assert_eq!(opens.get(), 2);
    assert!(screenshot.image().is_none());

    screenshot.capture().unwrap();
    assert_eq!(screenshot.image().map(|i| i.dimensions()), Some((16, 16)));
    let saved = std::fs::read_dir(&dir).unwrap().count();
    assert_eq!(saved, 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn screenshot_reports_failed_reinit() {
    let dir = temp_dir("reinit-fail");
    let board = FrameBoard::new();
    let opens = Cell::new(0);

    let mut screenshot = Screenshot::new(&dir, || {
        opens.set(opens.get() + 1);
        if opens.get() == 1 {
            Ok(ScriptedSource::new(vec![Err(CaptureError::AccessLost)], &board))
        } else {
            Err(CaptureError::NoOutput("gone".into()))
        }
    })
    .unwrap();

    let err = screenshot.capture().unwrap_err();
    assert_eq!(err.to_string(), "Failed to re-establish desktop duplication");

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn screenshot_reports_failed_device_reinit() {
    let dir = temp_dir("device-lost");
    let board = FrameBoard::new();
    let opens = Cell::new(0);

    let mut screenshot = Screenshot::new(&dir, || {
        opens.set(opens.get() + 1);
        if opens.get() == 1 {
            Ok(ScriptedSource::new(vec![Err(CaptureError::DeviceLost { code: 0x887A0005 })], &board))
        } else {
            Err(CaptureError::NoOutput("gone".into()))
        }
    })
    .unwrap();

    let err = screenshot.capture().unwrap_err();
    assert_eq!(err.to_string(), "Failed to reinitialize DirectX");
    assert_eq!(opens.get(), 2);

    let _ = std::fs::remove_dir_all(&dir);
}

#[test]
fn screenshot_skips_black_frames() {
    let dir = temp_dir("black");
    let board = FrameBoard::new();
    let mut screenshot =
        Screenshot::new(&dir, || Ok(ScriptedSource::new(vec![Ok(Some(RgbImage::new(64, 64)))], &board))).unwrap();

    screenshot.capture().unwrap();
    assert!(screenshot.image().is_none());
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 0);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn screenshot_agent_exits_after_empty_retries() {
    let dir = temp_dir("empty");
    let board = FrameBoard::new();
    let source_board = FrameBoard::new();
    let mut screenshot =
        Screenshot::new(&dir, || Ok(ScriptedSource::new(vec![Ok(None), Ok(None), Ok(None)], &source_board))).unwrap();

    let detector = FakeDetector::default();
    let calls = detector.calls.clone();
    let mut agent = ScreenshotAgent::new(detector, board.clone()).with_interval(Duration::ZERO);

    let frames = agent.run(&mut screenshot).await.unwrap();
    assert_eq!(frames, 0);
    assert_eq!(calls.load(Ordering::SeqCst), 0);
    assert!(!board.should_quit());

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn screenshot_agent_detects_and_publishes() {
    let dir = temp_dir("detect");
    let board = FrameBoard::new();
    let mut screenshot = Screenshot::new(&dir, || Ok(ScriptedSource::new(vec![Ok(Some(frame()))], &board))).unwrap();

    let detector = FakeDetector::default();
    let calls = detector.calls.clone();
    let mut agent = ScreenshotAgent::new(detector, board.clone())
        .with_interval(Duration::ZERO)
        .with_poll(Duration::from_millis(1));

    let frames = agent.run(&mut screenshot).await.unwrap();
    assert!((1..=2).contains(&frames), "frames = {frames}");
    assert!(calls.load(Ordering::SeqCst) >= 1);
    assert!(board.should_quit());
    assert_eq!(std::fs::read_dir(&dir).unwrap().count(), 1);

    let _ = std::fs::remove_dir_all(&dir);
}

#[tokio::test]
async fn screenshot_agent_propagates_inference_errors() {
    let dir = temp_dir("infer-error");
    let board = FrameBoard::new();
    let source_board = FrameBoard::new();
    let mut screenshot =
        Screenshot::new(&dir, || Ok(ScriptedSource::new(vec![Ok(Some(frame()))], &source_board))).unwrap();

    let detector = FakeDetector { fail_on: Some(1), ..Default::default() };
    let mut agent = ScreenshotAgent::new(detector, board).with_interval(Duration::ZERO);

    let result = agent.run(&mut screenshot).await;
    assert!(matches!(result, Err(AgentError::UnexpectedOutput)));

    let _ = std::fs::remove_dir_all(&dir);
}

/// 假摄像头：`frames` 帧后断开，`accepts` 控制是否接受分辨率请求
struct FakeCamera {
    frames: usize,
    resolution: (u32, u32),
    accepts: bool,
    requests: usize,
}

impl FakeCamera {
    fn new(frames: usize, accepts: bool) -> Self {
        Self { frames, resolution: (640, 480), accepts, requests: 0 }
    }
}

impl FrameSource for FakeCamera {
    fn grab(&mut self) -> Result<Option<RgbImage>, CaptureError> {
        if self.frames == 0 {
            return Ok(None);
        }
        self.frames -= 1;
        Ok(Some(RgbImage::from_pixel(self.resolution.0, self.resolution.1, Rgb([90, 90, 90]))))
    }

    fn size(&self) -> (u32, u32) {
        self.resolution
    }
}

impl AdjustableSource for FakeCamera {
    fn resolution(&self) -> (u32, u32) {
        self.resolution
    }

    fn request_resolution(&mut self, width: u32, height: u32) -> Result<(), CaptureError> {
        self.requests += 1;
        if self.accepts {
            self.resolution = (width, height);
        }
        Ok(())
    }
}

#[test]
fn webcam_upgrades_resolution_and_stops_on_disconnect() {
    let board = FrameBoard::new();
    let mut agent = WebcamAgent::new(FakeCamera::new(3, true), FakeDetector::default(), board.clone()).with_fps(1000);

    let frames = agent.run().unwrap();
    assert_eq!(frames, 3);
    assert!(agent.upgrade().reached());
    assert_eq!(agent.source().resolution(), (1280, 720));
    assert_eq!(agent.source().requests, 1);

    // 升级后的帧是高分辨率
    let latest = board.latest_after(0).unwrap();
    assert_eq!(latest.image.dimensions(), (1280, 720));
}

#[test]
fn webcam_gives_up_upgrade_after_three_attempts() {
    let board = FrameBoard::new();
    let mut agent = WebcamAgent::new(FakeCamera::new(6, false), FakeDetector::default(), board).with_fps(1000);

    assert_eq!(agent.run().unwrap(), 6);
    assert!(!agent.upgrade().reached());
    assert_eq!(agent.upgrade().attempts(), 3);
    assert_eq!(agent.source().requests, 3);
}

#[test]
fn webcam_stops_on_inference_error() {
    let board = FrameBoard::new();
    let detector = FakeDetector { fail_on: Some(2), ..Default::default() };
    let mut agent = WebcamAgent::new(FakeCamera::new(10, true), detector, board.clone())
        .with_fps(1000)
        .with_upgrade(ResolutionUpgrade::new(640, 480, 3));

    assert!(matches!(agent.run(), Err(AgentError::UnexpectedOutput)));
    assert_eq!(board.latest_after(0).map(|f| f.seq), Some(1));
    assert!(agent.upgrade().reached());
}
