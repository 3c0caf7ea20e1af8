// 该文件是 Shanan （山南西风） 项目的一部分。
// src/layout.rs - 显示布局与坐标变换
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

use tracing::debug;

use crate::model::PixelRect;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Size {
  pub width: f32,
  pub height: f32,
}

impl Size {
  pub fn new(width: f32, height: f32) -> Self {
    Self { width, height }
  }

  fn is_drawable(&self) -> bool {
    self.width.is_finite() && self.height.is_finite() && self.width > 0.0 && self.height > 0.0
  }
}

impl From<(u32, u32)> for Size {
  fn from((width, height): (u32, u32)) -> Self {
    Self::new(width as f32, height as f32)
  }
}

/// 原图像素坐标到屏幕坐标的映射
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DisplayMetrics {
  pub offset_x: f32,
  pub offset_y: f32,
  pub scale_x: f32,
  pub scale_y: f32,
}

impl DisplayMetrics {
  pub const IDENTITY: DisplayMetrics = DisplayMetrics {
    offset_x: 0.0,
    offset_y: 0.0,
    scale_x: 1.0,
    scale_y: 1.0,
  };

  /// contain 适配：等比缩放至完全放入容器并居中，不裁剪
  pub fn contain(native: Size, container: Size) -> Option<Self> {
    if !native.is_drawable() || !container.is_drawable() {
      return None;
    }
    let scale = (container.width / native.width).min(container.height / native.height);
    Some(Self {
      offset_x: (container.width - native.width * scale) / 2.0,
      offset_y: (container.height - native.height * scale) / 2.0,
      scale_x: scale,
      scale_y: scale,
    })
  }

  pub fn project(&self, rect: PixelRect) -> PixelRect {
    PixelRect {
      x: self.offset_x + rect.x * self.scale_x,
      y: self.offset_y + rect.y * self.scale_y,
      width: rect.width * self.scale_x,
      height: rect.height * self.scale_y,
    }
  }

  /// 图像在屏幕上实际占据的区域
  pub fn image_area(&self, native: Size) -> PixelRect {
    self.project(PixelRect {
      x: 0.0,
      y: 0.0,
      width: native.width,
      height: native.height,
    })
  }
}

/// 重新计算布局的两个触发点
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum LayoutTrigger {
  ImageReady(Size),
  ContainerResized(Size),
}

#[derive(Debug, Clone, Default)]
pub struct OverlayLayout {
  native: Option<Size>,
  container: Option<Size>,
  metrics: Option<DisplayMetrics>,
}

impl OverlayLayout {
  /// 容器尺寸未知时按原始尺寸显示
  pub fn recompute(&mut self, trigger: LayoutTrigger) -> Option<DisplayMetrics> {
    match trigger {
      LayoutTrigger::ImageReady(native) => self.native = Some(native),
      LayoutTrigger::ContainerResized(container) => self.container = Some(container),
    }

    self.metrics = self
      .native
      .and_then(|native| DisplayMetrics::contain(native, self.container.unwrap_or(native)));
    debug!("布局重新计算 ({:?}): {:?}", trigger, self.metrics);
    self.metrics
  }

  /// 换图或清除后，原图尺寸失效，容器尺寸保留
  pub fn forget_image(&mut self) {
    self.native = None;
    self.metrics = None;
  }

  pub fn metrics(&self) -> Option<DisplayMetrics> {
    self.metrics
  }

  pub fn native(&self) -> Option<Size> {
    self.native
  }

  /// 画布尺寸：容器尺寸，未设置时为原图尺寸
  pub fn canvas(&self) -> Option<Size> {
    self.container.or(self.native)
  }
}
