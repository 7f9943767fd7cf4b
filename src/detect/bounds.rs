/// 边界框结构
///
/// 表示一个矩形边界框，坐标为原始帧上的像素坐标。
#[derive(Debug, Clone, Default, Copy, PartialEq)]
pub struct BoundingBox {
    /// 左上角x坐标
    pub x1: f32,
    /// 左上角y坐标
    pub y1: f32,
    /// 右下角x坐标
    pub x2: f32,
    /// 右下角y坐标
    pub y2: f32,
}

impl BoundingBox {
    pub fn new(x1: f32, y1: f32, x2: f32, y2: f32) -> Self {
        Self { x1, y1, x2, y2 }
    }

    /// 由左上角和宽高构造
    pub fn from_ltwh(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self { x1: left, y1: top, x2: left + width, y2: top + height }
    }

    pub fn width(&self) -> f32 {
        (self.x2 - self.x1).max(0.0)
    }

    pub fn height(&self) -> f32 {
        (self.y2 - self.y1).max(0.0)
    }

    pub fn area(&self) -> f32 {
        self.width() * self.height()
    }

    /// 交集面积
    pub fn intersection(&self, other: &BoundingBox) -> f32 {
        let x_left = self.x1.max(other.x1);
        let y_top = self.y1.max(other.y1);
        let x_right = self.x2.min(other.x2);
        let y_bottom = self.y2.min(other.y2);

        if x_right <= x_left || y_bottom <= y_top {
            0.0
        } else {
            (x_right - x_left) * (y_bottom - y_top)
        }
    }

    /// 交并比，两个框面积都为0时返回0
    pub fn iou(&self, other: &BoundingBox) -> f32 {
        let inter = self.intersection(other);
        let union = self.area() + other.area() - inter;
        if union <= 0.0 { 0.0 } else { inter / union }
    }
}

/// 检测结果结构
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Detection {
    /// 目标的边界框
    pub bbox: BoundingBox,
    /// 类别ID
    pub class_id: usize,
    /// 类别名称，超出类别表时为 "Unknown"
    pub class_name: String,
    /// 置信度
    pub confidence: f32,
}

impl Detection {
    pub fn new(bbox: BoundingBox, class_id: usize, class_name: String, confidence: f32) -> Self {
        Self { bbox, class_id, class_name, confidence }
    }

    /// 显示在框上方的标签，例如 `person: 0.87`
    pub fn label(&self) -> String {
        format!("{}: {:.2}", self.class_name, self.confidence)
    }
}
