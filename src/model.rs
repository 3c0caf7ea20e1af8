// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model.rs - 检测结果与模型定义
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

use thiserror::Error;

use crate::{input::UploadedImage, threshold::Threshold};

pub mod wire;
pub use self::wire::{WireError, parse_detections};

#[cfg(feature = "remote_detector")]
mod remote;
#[cfg(feature = "remote_detector")]
pub use self::remote::{RemoteDetector, RemoteDetectorBuilder};

/// 推理模型：推理本身可以在本地，也可以委托给远程服务
pub trait Model {
  type Input;
  type Output;
  type Error;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error>;
}

/// 原图像素坐标系下的矩形 (x, y, w, h)
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PixelRect {
  pub x: f32,
  pub y: f32,
  pub width: f32,
  pub height: f32,
}

/// 边界框的两种编码方式，均为原图像素坐标
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BoundingBox {
  Corners {
    xmin: f32,
    ymin: f32,
    xmax: f32,
    ymax: f32,
  },
  Extent {
    x: f32,
    y: f32,
    w: f32,
    h: f32,
  },
}

impl BoundingBox {
  /// 统一转换为 (x, y, w, h)，负的宽高截断为 0
  pub fn to_rect(&self) -> PixelRect {
    match *self {
      BoundingBox::Corners {
        xmin,
        ymin,
        xmax,
        ymax,
      } => PixelRect {
        x: xmin,
        y: ymin,
        width: (xmax - xmin).max(0.0),
        height: (ymax - ymin).max(0.0),
      },
      BoundingBox::Extent { x, y, w, h } => PixelRect {
        x,
        y,
        width: w.max(0.0),
        height: h.max(0.0),
      },
    }
  }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
  pub label: String,
  pub score: f32,
  pub bbox: BoundingBox,
}

/// 一次推理返回的全部检测结果
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DetectionSet {
  pub items: Box<[Detection]>,
}

impl From<Vec<Detection>> for DetectionSet {
  fn from(items: Vec<Detection>) -> Self {
    Self {
      items: items.into_boxed_slice(),
    }
  }
}

impl DetectionSet {
  pub fn len(&self) -> usize {
    self.items.len()
  }

  pub fn is_empty(&self) -> bool {
    self.items.is_empty()
  }

  pub fn iter(&self) -> std::slice::Iter<'_, Detection> {
    self.items.iter()
  }

  /// 满足 `score >= threshold` 的检测结果
  pub fn visible(&self, threshold: Threshold) -> impl Iterator<Item = &Detection> {
    self.items.iter().filter(move |d| threshold.passes(d.score))
  }
}

/// 一次检测请求的凭据；完成时以 `id` 判断结果是否仍然有效
#[derive(Debug, Clone)]
pub struct DetectRequest {
  pub id: u64,
  pub image: UploadedImage,
  pub threshold: Threshold,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum DetectError {
  #[error("Detector configuration error: {0}")]
  Configuration(String),
  #[error("Rejected request: {0}")]
  Validation(String),
  #[error("Upstream error (HTTP {status}): {message}")]
  Upstream { status: u16, message: String },
  #[error("Transport error: {0}")]
  Transport(String),
  #[error("Malformed response: {0}")]
  MalformedResponse(#[from] WireError),
}

impl DetectError {
  /// 展示给用户的单条错误信息
  pub fn user_message(&self) -> String {
    match self {
      DetectError::Configuration(msg) => format!("Detector is not configured: {msg}"),
      DetectError::Validation(msg) => msg.clone(),
      DetectError::Upstream { status, message } => {
        format!("Detection failed (HTTP {status}): {message}")
      }
      DetectError::Transport(_) => "Detection failed: could not reach the detection service".into(),
      DetectError::MalformedResponse(_) => "Detection failed: unexpected response".into(),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn det(label: &str, score: f32) -> Detection {
    Detection {
      label: label.into(),
      score,
      bbox: BoundingBox::Extent {
        x: 0.0,
        y: 0.0,
        w: 1.0,
        h: 1.0,
      },
    }
  }

  #[test]
  fn corner_and_extent_normalize_to_same_rect() {
    let corners = BoundingBox::Corners {
      xmin: 10.0,
      ymin: 20.0,
      xmax: 40.0,
      ymax: 60.0,
    };
    let extent = BoundingBox::Extent {
      x: 10.0,
      y: 20.0,
      w: 30.0,
      h: 40.0,
    };
    assert_eq!(corners.to_rect(), extent.to_rect());
  }

  #[test]
  fn inverted_corners_clamp_to_zero_extent() {
    let rect = BoundingBox::Corners {
      xmin: 50.0,
      ymin: 50.0,
      xmax: 40.0,
      ymax: 45.0,
    }
    .to_rect();
    assert_eq!(rect.width, 0.0);
    assert_eq!(rect.height, 0.0);

    let rect = BoundingBox::Extent {
      x: 1.0,
      y: 2.0,
      w: -3.0,
      h: 4.0,
    }
    .to_rect();
    assert_eq!(rect.width, 0.0);
    assert_eq!(rect.height, 4.0);
  }

  #[test]
  fn visible_includes_boundary_score() {
    let set = DetectionSet::from(vec![det("a", 0.49), det("b", 0.5), det("c", 0.51)]);
    let labels: Vec<_> = set
      .visible(Threshold::new(0.5))
      .map(|d| d.label.as_str())
      .collect();
    assert_eq!(labels, ["b", "c"]);
  }

  #[test]
  fn visible_matches_filter_for_all_thresholds() {
    let set = DetectionSet::from(vec![det("a", 0.0), det("b", 0.25), det("c", 0.75), det("d", 1.0)]);
    for step in 0..=20 {
      let t = step as f32 / 20.0;
      let expected: Vec<_> = set.iter().filter(|d| d.score >= t).collect();
      let actual: Vec<_> = set.visible(Threshold::new(t)).collect();
      assert_eq!(actual, expected, "threshold {t}");
    }
  }

  #[test]
  fn malformed_response_hides_details_from_user() {
    let err = DetectError::from(WireError::NotAnArray);
    assert_eq!(err.user_message(), "Detection failed: unexpected response");
  }
}
