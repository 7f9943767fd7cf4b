use std::path::PathBuf;

use thiserror::Error;

/// 采集层错误
///
/// `AccessLost` 与 `DeviceLost` 需要重建采集会话，其余错误按普通失败处理。
#[derive(Error, Debug)]
pub enum CaptureError {
    #[error("desktop duplication access lost")]
    AccessLost,

    #[error("capture device removed or reset (0x{code:08X})")]
    DeviceLost { code: u32 },

    #[error("capture OS error ({context}): 0x{code:08X}")]
    Os { context: &'static str, code: u32 },

    #[error("capture backend error ({context}): {reason}")]
    Backend { context: &'static str, reason: String },

    #[error("no capture output available: {0}")]
    NoOutput(String),

    #[error("{0}")]
    ReinitFailed(&'static str),

    #[error("failed to save screenshot: {0}")]
    Save(#[from] image::ImageError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl CaptureError {
    /// 是否需要销毁并重建整个采集上下文
    pub fn requires_reinit(&self) -> bool {
        matches!(self, CaptureError::AccessLost | CaptureError::DeviceLost { .. })
    }
}

/// 代理程序的统一错误类型
#[derive(Error, Debug)]
pub enum AgentError {
    #[error("Ensure models are in {}", dir.display())]
    ModelMissing { dir: PathBuf },

    #[error("Failed to load model: {0}")]
    ModelLoad(#[from] ort::Error),

    #[error("Failed to open classlist at: {}", path.display())]
    ClassList { path: PathBuf },

    #[error("Model or Frame is invalid")]
    InvalidFrame,

    #[error("Empty detection: check if model is loaded")]
    UnexpectedOutput,

    #[error("tensor shape error: {0}")]
    Shape(#[from] ndarray::ShapeError),

    #[error("environment setup failed: {reason}")]
    Environment { reason: String },

    #[error("inference task failed: {reason}")]
    Task { reason: String },

    #[error("display error: {reason}")]
    Display { reason: String },

    #[error(transparent)]
    Capture(#[from] CaptureError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}
