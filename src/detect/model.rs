use std::path::Path;

use ort::execution_providers::{CUDAExecutionProvider, DirectMLExecutionProvider};
use ort::session::{Session, builder::GraphOptimizationLevel};
use tracing::info;

use crate::error::AgentError;
use crate::hardware::Backend;

/// 加载YOLO模型
///
/// 加载ONNX格式的YOLO模型，应用最高级别的图优化，并按后端注册执行提供者。
/// 给出缓存目录时，优化后的模型会写入该目录。
///
/// # 错误处理
/// 模型文件不存在时返回 `ModelMissing`，ONNX Runtime 加载失败时返回 `ModelLoad`
///
/// # 示例
///
/// ```no_run
/// use scout::detect::load_model;
/// use scout::hardware::Backend;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let model = load_model("models/yolo/yolo11l.onnx".as_ref(), Backend::Cpu, None)?;
/// # Ok(())
/// # }
/// ```
pub fn load_model(
    model_path: &Path,
    backend: Backend,
    cache_dir: Option<&Path>,
) -> Result<Session, AgentError> {
    if !model_path.is_file() {
        let dir = model_path.parent().unwrap_or(Path::new(".")).to_path_buf();
        return Err(AgentError::ModelMissing { dir });
    }

    info!("Loading model from: {}", model_path.display());
    let session = build_session(model_path, backend, cache_dir)?;
    Ok(session)
}

fn build_session(
    model_path: &Path,
    backend: Backend,
    cache_dir: Option<&Path>,
) -> Result<Session, ort::Error> {
    let mut builder = Session::builder()?
        .with_optimization_level(GraphOptimizationLevel::Level3)?
        .with_intra_threads(4)?;

    builder = match backend {
        Backend::Cuda => {
            builder.with_execution_providers([CUDAExecutionProvider::default().build()])?
        }
        // DirectML 不支持内存复用模式
        Backend::DirectMl => builder
            .with_memory_pattern(false)?
            .with_execution_providers([DirectMLExecutionProvider::default().build()])?,
        Backend::Cpu => builder,
    };

    if let Some(dir) = cache_dir {
        builder = builder.with_optimized_model_path(optimized_model_path(dir, model_path, backend))?;
    }

    builder.commit_from_file(model_path)
}

/// 优化后模型的缓存文件名，按后端区分
pub fn optimized_model_path(cache_dir: &Path, model_path: &Path, backend: Backend) -> std::path::PathBuf {
    let stem = model_path.file_stem().and_then(|s| s.to_str()).unwrap_or("model");
    let tag = match backend {
        Backend::Cuda => "cuda",
        Backend::DirectMl => "dml",
        Backend::Cpu => "cpu",
    };
    cache_dir.join(format!("{stem}.{tag}.opt.onnx"))
}
