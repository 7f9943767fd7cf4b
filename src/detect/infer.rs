use ndarray::{Array2, Array4};
use ort::{inputs, session::Session, value::Tensor};

use crate::error::AgentError;

/// 运行模型推理
///
/// 使用ONNX模型对输入张量进行推理，返回按候选框排列的二维输出，
/// 每行为 `[cx, cy, w, h, class_score_0, class_score_1, ...]`。
///
/// # 参数
/// * `model` - ONNX模型Session
/// * `input` - 输入张量，形状为(1, 3, height, width)
///
/// # 错误处理
/// 输出不是 batch 为 1 的三维张量时返回 `UnexpectedOutput`
pub fn run_inference(model: &mut Session, input: &Array4<f32>) -> Result<Array2<f32>, AgentError> {
    let shape: Vec<usize> = input.shape().to_vec();
    let (data, _offset) = input.clone().into_raw_vec_and_offset();
    let input_tensor = Tensor::from_array(([shape[0], shape[1], shape[2], shape[3]], data))?;
    let outputs = model.run(inputs!["images" => input_tensor])?;

    let output = outputs[0].try_extract_tensor::<f32>()?;
    let dims: Vec<usize> = output.0.iter().map(|&d| d.max(0) as usize).collect();
    let data = output.1.to_vec();

    proposals_from_output(&dims, data)
}

/// 把原始输出整理为每行一个候选框
///
/// YOLOv8/YOLO11 导出的形状为 `[1, 4 + C, N]`（N 远大于 4 + C），需要转置；
/// `[1, N, 4 + C]` 的输出原样使用。
pub fn proposals_from_output(dims: &[usize], data: Vec<f32>) -> Result<Array2<f32>, AgentError> {
    if dims.len() != 3 || dims[0] != 1 {
        return Err(AgentError::UnexpectedOutput);
    }

    let (rows, cols) = (dims[1], dims[2]);
    let matrix = Array2::from_shape_vec((rows, cols), data)?;
    if rows < cols {
        Ok(matrix.reversed_axes().as_standard_layout().into_owned())
    } else {
        Ok(matrix)
    }
}
