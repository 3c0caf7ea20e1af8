// 该文件是 Shanan （山南西风） 项目的一部分。
// src/threshold.rs - 置信度阈值
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

use std::fmt;

pub const DEFAULT_THRESHOLD: f32 = 0.25;

/// 置信度阈值，始终位于 [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Threshold(f32);

impl Default for Threshold {
  fn default() -> Self {
    Threshold(DEFAULT_THRESHOLD)
  }
}

impl Threshold {
  /// 超出范围的值被截断而不是拒绝；NaN 回落到默认值
  pub fn new(value: f32) -> Self {
    if value.is_nan() {
      return Self::default();
    }
    Threshold(value.clamp(0.0, 1.0))
  }

  pub fn set(&mut self, value: f32) {
    *self = Self::new(value);
  }

  pub fn reset(&mut self) {
    *self = Self::default();
  }

  pub fn value(&self) -> f32 {
    self.0
  }

  pub fn passes(&self, score: f32) -> bool {
    score >= self.0
  }
}

impl From<f32> for Threshold {
  fn from(value: f32) -> Self {
    Self::new(value)
  }
}

impl fmt::Display for Threshold {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    write!(f, "{:.2}", self.0)
  }
}
