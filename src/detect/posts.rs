use image::RgbImage;
use ndarray::{Array2, Axis};
use raqote::{DrawOptions, DrawTarget, LineJoin, PathBuilder, SolidSource, Source, StrokeStyle};

use crate::detect::bounds::{BoundingBox, Detection};
use crate::detect::labels::class_name;

/// 检测框颜色（绿色）
const BOX_COLOR: SolidSource = SolidSource { r: 0x00, g: 0xFF, b: 0x00, a: 0xFF };
const BOX_STROKE_WIDTH: f32 = 2.0;

/// 解码模型输出
///
/// 每行取类别分数最大值，超过置信度阈值的候选框换算回原始帧坐标。
/// 坐标按整数像素截断。
///
/// # 参数
/// * `proposals` - 模型输出，形状为(num_boxes, 4 + num_classes)
/// * `frame_width` / `frame_height` - 原始帧尺寸
/// * `input_width` / `input_height` - 模型输入尺寸
/// * `confidence_threshold` - 置信度阈值
/// * `class_names` - 类别名称表
///
/// # 示例
///
/// ```
/// use ndarray::Array2;
/// use scout::detect::decode_proposals;
///
/// let proposals = Array2::<f32>::zeros((8400, 84));
/// let detections = decode_proposals(&proposals, 1920, 1080, 640, 640, 0.5, &[]);
/// assert!(detections.is_empty());
/// ```
pub fn decode_proposals(
    proposals: &Array2<f32>,
    frame_width: u32,
    frame_height: u32,
    input_width: usize,
    input_height: usize,
    confidence_threshold: f32,
    class_names: &[String],
) -> Vec<Detection> {
    let x_factor = frame_width as f32 / input_width as f32;
    let y_factor = frame_height as f32 / input_height as f32;
    let mut detections = Vec::new();

    for row in proposals.axis_iter(Axis(0)) {
        if row.len() < 5 {
            continue;
        }

        let (class_id, score) = row
            .iter()
            .skip(4)
            .copied()
            .enumerate()
            .fold((0, f32::MIN), |best, (id, s)| if s > best.1 { (id, s) } else { best });

        if score <= confidence_threshold {
            continue;
        }

        let (cx, cy, w, h) = (row[0], row[1], row[2], row[3]);
        let left = ((cx - 0.5 * w) * x_factor) as i32;
        let top = ((cy - 0.5 * h) * y_factor) as i32;
        let width = (w * x_factor) as i32;
        let height = (h * y_factor) as i32;

        detections.push(Detection::new(
            BoundingBox::from_ltwh(left as f32, top as f32, width as f32, height as f32),
            class_id,
            class_name(class_names, class_id).to_string(),
            score,
        ));
    }

    detections
}

/// 非极大值抑制
///
/// 与类别无关：按置信度从高到低，丢弃低于置信度阈值的框，
/// 与已保留框的IoU大于阈值时抑制。
pub fn non_max_suppression(
    mut detections: Vec<Detection>,
    confidence_threshold: f32,
    nms_threshold: f32,
) -> Vec<Detection> {
    detections.retain(|d| d.confidence > confidence_threshold);
    detections.sort_by(|a, b| b.confidence.total_cmp(&a.confidence));

    let mut kept: Vec<Detection> = Vec::with_capacity(detections.len());
    for candidate in detections {
        if kept.iter().all(|k| k.bbox.iou(&candidate.bbox) <= nms_threshold) {
            kept.push(candidate);
        }
    }
    kept
}

/// 在图像上绘制检测框
///
/// 所有类别统一使用2像素宽的绿色边框，标签文字由显示窗口负责。
pub fn draw_detections(image: &RgbImage, detections: &[Detection]) -> RgbImage {
    let (img_width, img_height) = image.dimensions();
    if detections.is_empty() || img_width == 0 || img_height == 0 {
        return image.clone();
    }

    let mut dt = DrawTarget::new(img_width as i32, img_height as i32);

    // raqote 使用预乘的 ARGB
    let image_data: Vec<u32> = image
        .pixels()
        .map(|p| {
            let [r, g, b] = p.0;
            u32::from_le_bytes([b, g, r, 0xFF])
        })
        .collect();
    let src = raqote::Image { width: img_width as i32, height: img_height as i32, data: &image_data };
    dt.draw_image_at(0.0, 0.0, &src, &DrawOptions::new());

    for detection in detections {
        let bbox = &detection.bbox;
        let mut pb = PathBuilder::new();
        pb.rect(bbox.x1, bbox.y1, bbox.width(), bbox.height());
        let path = pb.finish();

        dt.stroke(
            &path,
            &Source::Solid(BOX_COLOR),
            &StrokeStyle { join: LineJoin::Miter, width: BOX_STROKE_WIDTH, ..StrokeStyle::default() },
            &DrawOptions::default(),
        );
    }

    let pixels: Vec<u8> = dt
        .get_data()
        .iter()
        .flat_map(|&pixel| {
            let [b, g, r, _a] = pixel.to_le_bytes();
            [r, g, b]
        })
        .collect();

    RgbImage::from_raw(img_width, img_height, pixels).unwrap_or_else(|| image.clone())
}
