//! Detect模块 - 基于YOLO的目标检测
//!
//! 该模块提供了一整套目标检测功能，包括：
//! - 模型与类别名称加载
//! - 图像预处理
//! - 模型推理
//! - 结果后处理（解码与NMS）
//! - 检测框绘制
//!
//! # 工作流程
//!
//! 1. 使用load_model加载ONNX模型，load_class_names加载类别名称
//! 2. 创建YoloDetector实例并配置阈值
//! 3. 调用detect方法执行检测
//! 4. 使用draw_detections绘制检测结果
//!
//! # 示例
//!
//! ```no_run
//! use scout::detect::{load_class_names, load_model, draw_detections, YoloDetector};
//! use scout::hardware::Backend;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let model = load_model("models/yolo/yolo11l.onnx".as_ref(), Backend::Cpu, None)?;
//! let names = load_class_names("models/yolo/coco.names.txt".as_ref())?;
//! let mut detector = YoloDetector::new(model, names)
//!     .with_confidence_threshold(0.5)
//!     .with_nms_threshold(0.4);
//!
//! let frame = image::open("frame.png")?.to_rgb8();
//! let detections = detector.detect(&frame)?;
//! let annotated = draw_detections(&frame, &detections);
//! # Ok(())
//! # }
//! ```

pub mod bounds;
pub mod infer;
pub mod labels;
pub mod model;
pub mod posts;
pub mod prevs;
pub mod yolo;

use image::RgbImage;

use crate::error::AgentError;

pub use bounds::{BoundingBox, Detection};
pub use labels::load_class_names;
pub use model::load_model;
pub use posts::{decode_proposals, draw_detections, non_max_suppression};
pub use prevs::{image_to_tensor, resize_image};
pub use yolo::YoloDetector;

/// 检测器接口，代理循环只依赖这个接口
pub trait ObjectDetector: Send {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, AgentError>;
}
