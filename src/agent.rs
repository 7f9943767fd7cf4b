//! 采集代理
//!
//! 三种代理共用同一套流程：采集一帧 → 检测 → 画框 → 发布到 [`FrameBoard`]。
//! 显示由主线程的窗口负责，代理只在工作线程上运行。
//!
//! - [`LiveAgent`]：连续屏幕采集，采集会话失效时自动重建
//! - [`ScreenshotAgent`]：定时截图，推理在后台执行
//! - [`WebcamAgent`]：摄像头采集，启动后尝试切换到高分辨率
//!
//! [`FrameBoard`]: crate::utils::FrameBoard

pub mod live;
pub mod screenshot;
pub mod webcam;

pub use live::{LiveAgent, LiveSettings};
pub use screenshot::ScreenshotAgent;
pub use webcam::{ResolutionUpgrade, WebcamAgent};
