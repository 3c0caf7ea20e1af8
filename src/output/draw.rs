// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/draw.rs - 目标检测结果可视化
//
// 本文件根据 Apache 许可证第 2.0 版（以下简称“许可证”）授权使用；
// 除非遵守该许可证条款，否则您不得使用本文件。
// 您可通过以下网址获取许可证副本：
// http://www.apache.org/licenses/LICENSE-2.0
// 除非适用法律要求或书面同意，根据本许可协议分发的软件均按“原样”提供，
// 不附带任何形式的明示或暗示的保证或条件。
// 有关许可权限与限制的具体条款，请参阅本许可协议。
//
// Copyright (C) 2026 Johann Li <me@qinka.pro>, Wareless Group

use std::path::Path;

use ab_glyph::{FontArc, PxScale};
use image::{Rgb, RgbImage, imageops::FilterType};
use imageproc::{
  drawing::{draw_filled_rect_mut, draw_hollow_rect_mut, draw_text_mut, text_size},
  rect::Rect,
};
use tracing::{debug, warn};

use crate::{
  layout::{DisplayMetrics, Size},
  model::PixelRect,
  output::overlay::{OverlayBox, OverlayRenderer},
};

// 绘制常量
const STROKE_WIDTH: i32 = 2;
const LABEL_CHAR_WIDTH: f32 = 7.0; // 无字体时每字符平均宽度（粗略估计）
const LABEL_PADDING_X: f32 = 6.0;
const TEXT_COLOR: [u8; 3] = [255, 255, 255];
const BACKGROUND: [u8; 3] = [0, 0, 0];

pub struct Draw {
  renderer: OverlayRenderer,
  font: Option<FontArc>,
  label_char_width: f32,
  label_padding_x: f32,
  background: [u8; 3],
}

impl Default for Draw {
  fn default() -> Self {
    Self {
      renderer: OverlayRenderer::default(),
      font: None,
      label_char_width: LABEL_CHAR_WIDTH,
      label_padding_x: LABEL_PADDING_X,
      background: BACKGROUND,
    }
  }
}

impl Draw {
  pub fn with_font(mut self, font: FontArc) -> Self {
    self.font = Some(font);
    self
  }

  /// 字体文件加载失败时退化为只画标签底色
  pub fn with_font_file(self, path: &Path) -> Self {
    let font = std::fs::read(path)
      .map_err(|e| e.to_string())
      .and_then(|data| FontArc::try_from_vec(data).map_err(|e| e.to_string()));
    match font {
      Ok(font) => self.with_font(font),
      Err(e) => {
        warn!("无法加载字体 {}: {}", path.display(), e);
        self
      }
    }
  }

  pub fn with_renderer(mut self, renderer: OverlayRenderer) -> Self {
    self.renderer = renderer;
    self
  }

  pub fn renderer(&self) -> &OverlayRenderer {
    &self.renderer
  }

  /// 将原图按 contain 方式缩放后放入画布中央
  pub fn compose(&self, image: &RgbImage, metrics: &DisplayMetrics, canvas: Size) -> RgbImage {
    let (cw, ch) = (canvas.width.round().max(1.0) as u32, canvas.height.round().max(1.0) as u32);
    let mut out = RgbImage::from_pixel(cw, ch, Rgb(self.background));

    let area = metrics.image_area(Size::from(image.dimensions()));
    let (w, h) = (area.width.round() as u32, area.height.round() as u32);
    if w == 0 || h == 0 {
      return out;
    }

    if (w, h) == image.dimensions() {
      image::imageops::overlay(&mut out, image, area.x.round() as i64, area.y.round() as i64);
    } else {
      let scaled = image::imageops::resize(image, w, h, FilterType::Triangle);
      image::imageops::overlay(&mut out, &scaled, area.x.round() as i64, area.y.round() as i64);
    }
    out
  }

  pub fn draw_overlay(&self, canvas: &mut RgbImage, plan: &[OverlayBox]) {
    for item in plan {
      self.draw_box(canvas, &item.rect, item.color);
      self.draw_chip(canvas, item);
    }
    debug!("绘制了 {} 个检测框", plan.len());
  }

  fn draw_box(&self, canvas: &mut RgbImage, rect: &PixelRect, color: [u8; 3]) {
    // 超出画布的边框不可见，留 STROKE_WIDTH 余量即可
    let slack = STROKE_WIDTH as f32;
    let Some((x, w)) = clamp_span(rect.x, rect.width, canvas.width(), slack) else {
      return;
    };
    let Some((y, h)) = clamp_span(rect.y, rect.height, canvas.height(), slack) else {
      return;
    };

    // 边框加粗为 STROKE_WIDTH 像素，向内收缩
    for t in 0..STROKE_WIDTH {
      let (iw, ih) = (w - 2 * t, h - 2 * t);
      if iw <= 0 || ih <= 0 {
        break;
      }
      let r = Rect::at(x + t, y + t).of_size(iw as u32, ih as u32);
      draw_hollow_rect_mut(canvas, r, Rgb(color));
    }
  }

  fn chip_width(&self, text: &str) -> f32 {
    let text_width = match &self.font {
      Some(font) => text_size(PxScale::from(self.renderer.font_size), font, text).0 as f32,
      None => text.chars().count() as f32 * self.label_char_width,
    };
    text_width + self.label_padding_x * 2.0
  }

  fn draw_chip(&self, canvas: &mut RgbImage, item: &OverlayBox) {
    let chip = &item.chip;
    if chip.text.is_empty() {
      return;
    }

    let chip_width = self.chip_width(&chip.text);
    let Some((x, width)) = clamp_span(chip.x, chip_width, canvas.width(), chip_width) else {
      return;
    };
    let Some((y, height)) = clamp_span(chip.y, chip.height, canvas.height(), chip.height) else {
      return;
    };
    // 不超出画布右边界
    let width = width.min(canvas.width() as i32 - x);
    if width <= 0 {
      return;
    }

    draw_filled_rect_mut(
      canvas,
      Rect::at(x, y).of_size(width as u32, height as u32),
      Rgb(item.color),
    );

    if let Some(font) = &self.font {
      draw_text_mut(
        canvas,
        Rgb(TEXT_COLOR),
        x + self.label_padding_x as i32,
        y + self.renderer.padding_y as i32,
        PxScale::from(self.renderer.font_size),
        font,
        &chip.text,
      );
    }
  }
}

/// 把 `[start, start + len)` 截断到 `[-slack, limit + slack]`，空区间返回 `None`
///
/// 截断在浮点域完成，避免极端坐标转换为 i32 后溢出。
fn clamp_span(start: f32, len: f32, limit: u32, slack: f32) -> Option<(i32, i32)> {
  let (lo, hi) = (-slack, limit as f32 + slack);
  let a = start.round().clamp(lo, hi);
  let b = (start + len).round().clamp(lo, hi);
  (b > a).then(|| (a as i32, (b - a) as i32))
}

/// 检测结果的文本记录
pub struct Record;

impl Record {
  /// 每行: label, score, x, y, w, h（原图像素坐标）
  pub fn format(detections: &[&crate::model::Detection]) -> String {
    detections
      .iter()
      .map(|d| {
        let r = d.bbox.to_rect();
        format!(
          "{}, {:.4}, {:.1}, {:.1}, {:.1}, {:.1}",
          d.label, d.score, r.x, r.y, r.width, r.height
        )
      })
      .collect::<Vec<_>>()
      .join("\n")
  }

  pub fn record(
    &self,
    detections: &[&crate::model::Detection],
    path: &Path,
  ) -> Result<(), std::io::Error> {
    std::fs::write(path.with_extension("txt"), Self::format(detections))
  }
}
