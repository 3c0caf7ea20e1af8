// 该文件是 Shanan （山南西风） 项目的一部分。
// src/output/overlay.rs - 叠加层渲染计划
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

use crate::{
  layout::DisplayMetrics,
  model::{Detection, PixelRect},
  threshold::Threshold,
};

/// 标签配色表
pub const PALETTE: [[u8; 3]; 5] = [
  [0xF9, 0x73, 0x16], // orange
  [0x10, 0xB9, 0x81], // emerald
  [0x3B, 0x82, 0xF6], // blue
  [0xA8, 0x55, 0xF7], // purple
  [0xE1, 0x1D, 0x48], // rose
];

// 标签文本常量
const CHIP_FONT_SIZE: f32 = 12.0;
const CHIP_PADDING_Y: f32 = 3.0;
const CHIP_GAP: f32 = 2.0;

/// 字符串哈希 `h = (h << 5) - h + c`，按 UTF-16 码元
///
/// 与浏览器端取色一致：只有移位按 32 位回绕，减法与加法不回绕，
/// 因此累加值用 i64 保存。
pub fn label_hash(label: &str) -> u64 {
  label
    .encode_utf16()
    .fold(0i64, |h, c| {
      let shifted = i64::from((h as i32) << 5);
      shifted.wrapping_sub(h).wrapping_add(i64::from(c))
    })
    .unsigned_abs()
}

pub fn color_for(label: &str) -> [u8; 3] {
  PALETTE[(label_hash(label) % PALETTE.len() as u64) as usize]
}

/// 标签文字块，锚定在矩形左上角上方
#[derive(Debug, Clone, PartialEq)]
pub struct LabelChip {
  pub text: String,
  pub x: f32,
  pub y: f32,
  pub height: f32,
}

#[derive(Debug, Clone, PartialEq)]
pub struct OverlayBox {
  pub label: String,
  pub score: f32,
  /// 屏幕坐标
  pub rect: PixelRect,
  pub color: [u8; 3],
  pub chip: LabelChip,
}

#[derive(Debug, Clone, Copy)]
pub struct OverlayRenderer {
  pub font_size: f32,
  pub padding_y: f32,
  pub gap: f32,
}

impl Default for OverlayRenderer {
  fn default() -> Self {
    Self {
      font_size: CHIP_FONT_SIZE,
      padding_y: CHIP_PADDING_Y,
      gap: CHIP_GAP,
    }
  }
}

impl OverlayRenderer {
  pub fn chip_height(&self) -> f32 {
    self.font_size + self.padding_y * 2.0
  }

  /// 计算所有通过阈值的检测结果在屏幕上的矩形、颜色与标签位置
  pub fn plan<'a>(
    &self,
    detections: impl IntoIterator<Item = &'a Detection>,
    threshold: Threshold,
    metrics: &DisplayMetrics,
  ) -> Vec<OverlayBox> {
    let chip_height = self.chip_height();
    detections
      .into_iter()
      .filter(|d| threshold.passes(d.score))
      .map(|d| {
        let rect = metrics.project(d.bbox.to_rect());
        // 标签不得超出图像上边缘
        let chip_y = (rect.y - chip_height - self.gap).max(metrics.offset_y);
        OverlayBox {
          label: d.label.clone(),
          score: d.score,
          rect,
          color: color_for(&d.label),
          chip: LabelChip {
            text: chip_text(&d.label, d.score),
            x: rect.x,
            y: chip_y,
            height: chip_height,
          },
        }
      })
      .collect()
  }
}

pub fn chip_text(label: &str, score: f32) -> String {
  format!("{label} {score:.2}").trim().to_string()
}
