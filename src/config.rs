use std::time::Duration;

// 目标检测超参数配置
pub const YOLO_INPUT_WIDTH: usize = 640;
pub const YOLO_INPUT_HEIGHT: usize = 640;
pub const CONFIDENCE_THRESHOLD: f32 = 0.5;
pub const NMS_THRESHOLD: f32 = 0.4;
pub const UNKNOWN_CLASS_LABEL: &str = "Unknown";

// 帧率与重试
pub const TARGET_FPS: u32 = 30;
pub const MAX_CONSECUTIVE_FAILURES: u32 = 5;
pub const REINITIALIZE_DELAY: Duration = Duration::from_secs(2);
pub const FAILURE_RETRY_DELAY: Duration = Duration::from_millis(10);
pub const REPORT_EVERY: u64 = 100;

// 桌面复制
pub const ACQUIRE_TIMEOUT_MS: u32 = 100;
pub const ACQUIRE_RETRIES: u32 = 3;
pub const ACQUIRE_RETRY_DELAY: Duration = Duration::from_millis(10);
pub const BLACK_SAMPLE_SIZE: u32 = 100;

// 截图模式
pub const SCREENSHOT_INTERVAL: Duration = Duration::from_secs(10);
pub const MAX_EMPTY_RETRIES: u32 = 3;
pub const INFERENCE_POLL: Duration = Duration::from_millis(10);

// 摄像头
pub const WEBCAM_INIT_ATTEMPTS: u32 = 3;
pub const WEBCAM_INIT_DELAY: Duration = Duration::from_millis(500);
pub const HIGH_RES_WIDTH: u32 = 1280;
pub const HIGH_RES_HEIGHT: u32 = 720;
pub const MAX_HIGH_RES_ATTEMPTS: u32 = 3;

// 窗口
pub const WINDOW_WIDTH: f32 = 1280.0;
pub const WINDOW_HEIGHT: f32 = 720.0;

// 默认路径，均相对于当前工作目录
pub const DEFAULT_MODEL_PATH: &str = "models/yolo/yolo11l.onnx";
pub const DEFAULT_CLASS_NAMES_PATH: &str = "models/yolo/coco.names.txt";
pub const DEFAULT_SCREENSHOT_DIR: &str = "Screenshots";
pub const DEFAULT_KERNEL_CACHE_DIR: &str = "kernel_cache";
