// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/wire.rs - 检测结果的线上格式解析
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

//! 所有外部载荷在这里统一转换为 [`Detection`]，内部代码只看到规范化后的结构。

use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::model::{BoundingBox, Detection, DetectionSet};

const LABEL_KEYS: [&str; 4] = ["label", "class", "class_name", "name"];
const SCORE_KEYS: [&str; 3] = ["score", "confidence", "conf"];
const BOX_KEYS: [&str; 2] = ["box", "bbox"];

#[derive(Error, Debug, Clone, PartialEq)]
pub enum WireError {
  #[error("payload is not a detection array")]
  NotAnArray,
  #[error("element {0} is not an object")]
  NotAnObject(usize),
  #[error("element {index} has no usable `{field}` field")]
  MissingField { index: usize, field: &'static str },
  #[error("element {0} has an unrecognized box shape")]
  UnknownBoxShape(usize),
}

/// 解析检测数组；任何一个元素不符合已知格式时整体拒绝
pub fn parse_detections(payload: &Value) -> Result<DetectionSet, WireError> {
  let elements = payload.as_array().ok_or(WireError::NotAnArray)?;
  let items = elements
    .iter()
    .enumerate()
    .map(|(index, element)| parse_detection(index, element))
    .collect::<Result<Vec<_>, _>>()?;
  debug!("解析到 {} 个检测结果", items.len());
  Ok(DetectionSet::from(items))
}

fn parse_detection(index: usize, element: &Value) -> Result<Detection, WireError> {
  let object = element.as_object().ok_or(WireError::NotAnObject(index))?;

  let label = first_of(object, &LABEL_KEYS)
    .and_then(Value::as_str)
    .ok_or(WireError::MissingField {
      index,
      field: "label",
    })?;

  let score = first_of(object, &SCORE_KEYS)
    .and_then(Value::as_f64)
    .filter(|s| s.is_finite())
    .ok_or(WireError::MissingField {
      index,
      field: "score",
    })?;

  let raw_box = first_of(object, &BOX_KEYS).ok_or(WireError::MissingField { index, field: "box" })?;
  let bbox = parse_box(raw_box).ok_or(WireError::UnknownBoxShape(index))?;

  Ok(Detection {
    label: label.to_string(),
    score: score.clamp(0.0, 1.0) as f32,
    bbox,
  })
}

fn first_of<'a>(object: &'a Map<String, Value>, keys: &[&str]) -> Option<&'a Value> {
  keys.iter().find_map(|k| object.get(*k))
}

fn parse_box(value: &Value) -> Option<BoundingBox> {
  match value {
    // [x_min, y_min, x_max, y_max]
    Value::Array(coords) if coords.len() == 4 => {
      let c = coords
        .iter()
        .map(number)
        .collect::<Option<Vec<_>>>()?;
      Some(BoundingBox::Corners {
        xmin: c[0],
        ymin: c[1],
        xmax: c[2],
        ymax: c[3],
      })
    }
    Value::Object(fields) => {
      let get = |k: &str| fields.get(k).and_then(number);
      if let (Some(xmin), Some(ymin), Some(xmax), Some(ymax)) =
        (get("xmin"), get("ymin"), get("xmax"), get("ymax"))
      {
        return Some(BoundingBox::Corners {
          xmin,
          ymin,
          xmax,
          ymax,
        });
      }
      let x = get("x")?;
      let y = get("y")?;
      let w = get("w").or_else(|| get("width"))?;
      let h = get("h").or_else(|| get("height"))?;
      Some(BoundingBox::Extent { x, y, w, h })
    }
    _ => None,
  }
}

fn number(value: &Value) -> Option<f32> {
  value
    .as_f64()
    .filter(|v| v.is_finite())
    .map(|v| v as f32)
}
