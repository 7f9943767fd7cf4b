//! 显示窗口
//!
//! 从 [`FrameBoard`] 取最新一帧显示，按原图比例缩放，在检测框上方绘制标签。
//! ESC 设置退出标志；其他线程设置退出标志后窗口自行关闭。

use std::time::Duration;

use egui::{Align2, Color32, FontId, Pos2, Rect, TextureHandle, TextureOptions, Vec2};

use crate::config::{WINDOW_HEIGHT, WINDOW_WIDTH};
use crate::detect::Detection;
use crate::error::AgentError;
use crate::utils::FrameBoard;

const REPAINT_INTERVAL: Duration = Duration::from_millis(15);
const LABEL_OFFSET: f32 = 10.0;
const LABEL_COLOR: Color32 = Color32::from_rgb(0, 255, 0);

pub struct Viewer {
    board: FrameBoard,
    texture: Option<TextureHandle>,
    seq: u64,
    frame_size: [usize; 2],
    detections: Vec<Detection>,
}

impl Viewer {
    pub fn new(board: FrameBoard) -> Self {
        Self { board, texture: None, seq: 0, frame_size: [0, 0], detections: Vec::new() }
    }

    fn refresh(&mut self, ctx: &egui::Context) {
        let Some(frame) = self.board.latest_after(self.seq) else {
            return;
        };
        self.seq = frame.seq;

        let size = [frame.image.width() as usize, frame.image.height() as usize];
        let color = egui::ColorImage::from_rgb(size, frame.image.as_raw());
        match &mut self.texture {
            Some(texture) => texture.set(color, TextureOptions::LINEAR),
            None => self.texture = Some(ctx.load_texture("frame", color, TextureOptions::LINEAR)),
        }
        self.frame_size = size;
        self.detections = frame.detections;
    }
}

impl eframe::App for Viewer {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if ctx.input(|i| i.key_pressed(egui::Key::Escape)) {
            self.board.request_quit();
        }
        if self.board.should_quit() {
            ctx.send_viewport_cmd(egui::ViewportCommand::Close);
            return;
        }

        self.refresh(ctx);

        egui::CentralPanel::default()
            .frame(egui::Frame::none().fill(Color32::BLACK))
            .show(ctx, |ui| {
                let Some(texture) = &self.texture else {
                    ui.centered_and_justified(|ui| ui.label("Waiting for frames..."));
                    return;
                };

                let rect = fit_rect(ui.available_rect_before_wrap(), self.frame_size);
                let painter = ui.painter();
                painter.image(
                    texture.id(),
                    rect,
                    Rect::from_min_max(Pos2::ZERO, Pos2::new(1.0, 1.0)),
                    Color32::WHITE,
                );

                let scale = rect.width() / self.frame_size[0].max(1) as f32;
                for detection in &self.detections {
                    let anchor = label_anchor(rect, scale, detection);
                    painter.text(anchor, Align2::LEFT_BOTTOM, detection.label(), FontId::proportional(14.0), LABEL_COLOR);
                }
            });

        ctx.request_repaint_after(REPAINT_INTERVAL);
    }
}

/// 在可用区域内居中放置保持比例的画面
pub fn fit_rect(available: Rect, frame_size: [usize; 2]) -> Rect {
    let [width, height] = frame_size;
    if width == 0 || height == 0 {
        return available;
    }

    let scale = (available.width() / width as f32).min(available.height() / height as f32);
    let size = Vec2::new(width as f32 * scale, height as f32 * scale);
    Rect::from_center_size(available.center(), size)
}

/// 标签左下角位于检测框左上角上方10像素（原图坐标）
fn label_anchor(rect: Rect, scale: f32, detection: &Detection) -> Pos2 {
    rect.min + Vec2::new(detection.bbox.x1 * scale, (detection.bbox.y1 - LABEL_OFFSET) * scale)
}

/// 打开窗口并阻塞到窗口关闭
///
/// 必须在主线程调用。
pub fn show(title: &str, board: FrameBoard) -> Result<(), AgentError> {
    let options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title(title)
            .with_inner_size([WINDOW_WIDTH, WINDOW_HEIGHT])
            .with_resizable(true),
        ..Default::default()
    };

    eframe::run_native(title, options, Box::new(move |_cc| Ok(Box::new(Viewer::new(board)))))
        .map_err(|e| AgentError::Display { reason: e.to_string() })
}
