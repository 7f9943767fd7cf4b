//! 命令行参数
//!
//! 所有参数的默认值即原先写死的配置，不带参数运行时行为不变。

use std::path::PathBuf;

use clap::Args;

use crate::config::{
    CONFIDENCE_THRESHOLD, DEFAULT_CLASS_NAMES_PATH, DEFAULT_KERNEL_CACHE_DIR, DEFAULT_MODEL_PATH,
    NMS_THRESHOLD, TARGET_FPS,
};

/// 三个代理共用的参数
#[derive(Args, Debug, Clone)]
pub struct CommonArgs {
    /// ONNX 模型文件路径
    #[arg(long, value_name = "MODEL", default_value = DEFAULT_MODEL_PATH)]
    pub model: PathBuf,

    /// 类别名称文件，每行一个类别
    #[arg(long, value_name = "CLASSES", default_value = DEFAULT_CLASS_NAMES_PATH)]
    pub classes: PathBuf,

    /// 置信度阈值
    #[arg(long, default_value_t = CONFIDENCE_THRESHOLD)]
    pub confidence: f32,

    /// NMS 阈值
    #[arg(long, default_value_t = NMS_THRESHOLD)]
    pub nms: f32,

    /// 目标帧率
    #[arg(long, default_value_t = TARGET_FPS)]
    pub fps: u32,

    /// 推理缓存目录
    #[arg(long, value_name = "DIR", default_value = DEFAULT_KERNEL_CACHE_DIR)]
    pub kernel_cache: PathBuf,

    /// 不打开窗口，Ctrl+C 退出
    #[arg(long)]
    pub headless: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::Parser;

    #[derive(Parser, Debug)]
    struct Harness {
        #[command(flatten)]
        common: CommonArgs,
    }

    #[test]
    fn defaults_are_the_hardcoded_paths() {
        let parsed = Harness::parse_from(["agent"]);
        assert_eq!(parsed.common.model, PathBuf::from("models/yolo/yolo11l.onnx"));
        assert_eq!(parsed.common.classes, PathBuf::from("models/yolo/coco.names.txt"));
        assert_eq!(parsed.common.confidence, 0.5);
        assert_eq!(parsed.common.nms, 0.4);
        assert_eq!(parsed.common.fps, 30);
        assert!(!parsed.common.headless);
    }

    #[test]
    fn flags_override_defaults() {
        let parsed = Harness::parse_from([
            "agent",
            "--model",
            "weights/custom.onnx",
            "--confidence",
            "0.25",
            "--headless",
        ]);
        assert_eq!(parsed.common.model, PathBuf::from("weights/custom.onnx"));
        assert_eq!(parsed.common.confidence, 0.25);
        assert!(parsed.common.headless);
    }
}
