//! 工具模块
//!
//! - board：采集线程与显示线程之间的帧交接
//! - pacing：按目标帧率控制循环节奏

pub mod board;
pub mod pacing;

pub use board::{AnnotatedFrame, FrameBoard};
pub use pacing::FramePacer;
