use std::time::Instant;

use image::RgbImage;
use ort::session::Session;
use tracing::debug;

use crate::cli::CommonArgs;
use crate::config::{CONFIDENCE_THRESHOLD, NMS_THRESHOLD, YOLO_INPUT_HEIGHT, YOLO_INPUT_WIDTH};
use crate::detect::bounds::Detection;
use crate::detect::infer::run_inference;
use crate::detect::labels::load_class_names;
use crate::detect::model::load_model;
use crate::detect::posts::{decode_proposals, non_max_suppression};
use crate::detect::prevs::{image_to_tensor, resize_image};
use crate::detect::ObjectDetector;
use crate::error::AgentError;
use crate::hardware::HardwareInfo;

/// YOLO目标检测器
///
/// 封装了完整的检测流程，包括图像预处理、模型推理和结果后处理。
pub struct YoloDetector {
    /// ONNX模型会话
    model: Session,
    /// 类别名称表，下标即类别ID
    class_names: Vec<String>,
    /// 模型输入宽度
    input_width: usize,
    /// 模型输入高度
    input_height: usize,
    /// 置信度阈值，低于此值的检测结果将被过滤
    confidence_threshold: f32,
    /// NMS（非极大值抑制）阈值，用于去除重复检测
    nms_threshold: f32,
}

impl YoloDetector {
    /// 创建新的YoloDetector实例，输入尺寸为640x640
    pub fn new(model: Session, class_names: Vec<String>) -> Self {
        Self {
            model,
            class_names,
            input_width: YOLO_INPUT_WIDTH,
            input_height: YOLO_INPUT_HEIGHT,
            confidence_threshold: CONFIDENCE_THRESHOLD,
            nms_threshold: NMS_THRESHOLD,
        }
    }

    /// 按命令行参数加载模型与类别，并选择推理后端
    ///
    /// # 错误处理
    /// 模型或类别文件缺失、ONNX Runtime 加载失败时返回Err
    pub fn setup(args: &CommonArgs, hardware: &HardwareInfo) -> Result<Self, AgentError> {
        let model = load_model(&args.model, hardware.preferred_backend(), Some(&args.kernel_cache))?;
        let class_names = load_class_names(&args.classes)?;
        Ok(Self::new(model, class_names)
            .with_confidence_threshold(args.confidence)
            .with_nms_threshold(args.nms))
    }

    /// 设置置信度阈值
    pub fn with_confidence_threshold(mut self, threshold: f32) -> Self {
        self.confidence_threshold = threshold;
        self
    }

    /// 设置NMS阈值
    pub fn with_nms_threshold(mut self, threshold: f32) -> Self {
        self.nms_threshold = threshold;
        self
    }

    /// 完整的检测流程：从图像到检测结果
    ///
    /// # 错误处理
    /// 空帧返回 `InvalidFrame`，推理失败或输出形状异常时返回Err
    pub fn detect(&mut self, img: &RgbImage) -> Result<Vec<Detection>, AgentError> {
        let (img_width, img_height) = img.dimensions();
        if img_width == 0 || img_height == 0 {
            return Err(AgentError::InvalidFrame);
        }

        let resized = resize_image(img, self.input_width as u32, self.input_height as u32);
        let input_tensor = image_to_tensor(&resized, self.input_height, self.input_width);

        let start_time = Instant::now();
        let proposals = run_inference(&mut self.model, &input_tensor)?;
        debug!("Inference took {:?}", start_time.elapsed());

        let candidates = decode_proposals(
            &proposals,
            img_width,
            img_height,
            self.input_width,
            self.input_height,
            self.confidence_threshold,
            &self.class_names,
        );
        Ok(non_max_suppression(candidates, self.confidence_threshold, self.nms_threshold))
    }
}

impl ObjectDetector for YoloDetector {
    fn detect(&mut self, frame: &RgbImage) -> Result<Vec<Detection>, AgentError> {
        YoloDetector::detect(self, frame)
    }
}
