use image::{RgbImage, imageops::{self, FilterType}};
use ndarray::{Array, Array4};

/// 调整图像大小以适应模型输入
///
/// 直接拉伸到目标尺寸（不做letterbox），使用双线性插值。
/// 尺寸已经一致时直接复制。
///
/// # 示例
///
/// ```
/// use image::RgbImage;
/// use scout::detect::prevs::resize_image;
///
/// let img = RgbImage::new(1920, 1080);
/// let resized = resize_image(&img, 640, 640);
/// assert_eq!(resized.dimensions(), (640, 640));
/// ```
pub fn resize_image(img: &RgbImage, width: u32, height: u32) -> RgbImage {
    if img.dimensions() == (width, height) {
        return img.clone();
    }
    imageops::resize(img, width, height, FilterType::Triangle)
}

/// 将图像转换为模型输入张量
///
/// 1. 归一化像素值到[0, 1]范围
/// 2. 通道顺序为RGB
/// 3. 维度顺序为NCHW
///
/// 图像尺寸应与输入尺寸一致，超出部分被忽略。
///
/// # 示例
///
/// ```
/// use image::RgbImage;
/// use scout::detect::prevs::image_to_tensor;
///
/// let img = RgbImage::new(640, 640);
/// let tensor = image_to_tensor(&img, 640, 640);
/// assert_eq!(tensor.shape(), &[1, 3, 640, 640]);
/// ```
pub fn image_to_tensor(img: &RgbImage, input_height: usize, input_width: usize) -> Array4<f32> {
    let mut tensor = Array::zeros((1, 3, input_height, input_width));

    for (x, y, pixel) in img.enumerate_pixels() {
        let (x, y) = (x as usize, y as usize);
        if x >= input_width || y >= input_height {
            continue;
        }
        let [r, g, b] = pixel.0;
        tensor[[0, 0, y, x]] = (r as f32) / 255.0;
        tensor[[0, 1, y, x]] = (g as f32) / 255.0;
        tensor[[0, 2, y, x]] = (b as f32) / 255.0;
    }

    tensor
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Rgb;

    #[test]
    fn tensor_is_rgb_planar_and_normalised() {
        let mut img = RgbImage::new(4, 2);
        img.put_pixel(3, 1, Rgb([255, 51, 0]));

        let tensor = image_to_tensor(&img, 2, 4);
        assert_eq!(tensor.shape(), &[1, 3, 2, 4]);
        assert_eq!(tensor[[0, 0, 1, 3]], 1.0);
        assert!((tensor[[0, 1, 1, 3]] - 0.2).abs() < 1e-6);
        assert_eq!(tensor[[0, 2, 1, 3]], 0.0);
        assert_eq!(tensor[[0, 0, 0, 0]], 0.0);
    }

    #[test]
    fn resize_stretches_without_letterbox() {
        let img = RgbImage::from_pixel(1920, 1080, Rgb([10, 20, 30]));
        let resized = resize_image(&img, 640, 640);
        assert_eq!(resized.dimensions(), (640, 640));
        assert_eq!(resized.get_pixel(0, 639), &Rgb([10, 20, 30]));
    }
}
