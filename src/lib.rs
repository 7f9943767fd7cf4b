pub mod agent;
pub mod capture;
pub mod cli;
pub mod config;
pub mod detect;
pub mod env;
pub mod error;
pub mod hardware;
pub mod launch;
pub mod telemetry;
pub mod utils;
pub mod viewer;

// 重新导出常用类型和函数
pub use detect::{BoundingBox, Detection, ObjectDetector, YoloDetector, draw_detections};
pub use error::{AgentError, CaptureError};
pub use launch::run_agent;
pub use utils::FrameBoard;
