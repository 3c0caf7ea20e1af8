// 该文件是 Shanan （山南西风） 项目的一部分。
// src/args.rs - 项目参数配置
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

use std::path::PathBuf;

use clap::Parser;
use shanan_overlay::layout::Size;
use url::Url;

/// Shanan Overlay 参数配置
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
  /// 输入图像，例如 image:///path/to/photo.jpg
  #[arg(long, value_name = "SOURCE")]
  pub input: Url,

  /// 检测代理地址，例如 http://localhost:3000/api/detect
  #[arg(long, env = "SHANAN_DETECT_ENDPOINT", value_name = "URL")]
  pub endpoint: Url,

  /// 输出路径，例如 image:///path/to/result.png，加 `?record` 同时输出文本记录
  #[arg(long, value_name = "OUTPUT")]
  pub output: Url,

  /// 置信度阈值 (0.0 - 1.0)，超出范围会被截断
  #[arg(long, default_value = "0.25", value_name = "THRESHOLD", allow_negative_numbers = true)]
  pub threshold: f32,

  /// 上传大小上限 (MB)
  #[arg(long, default_value = "5", value_name = "MB")]
  pub max_size_mb: u64,

  /// 显示区域尺寸，WxH；缺省时按原图尺寸
  #[arg(long, value_name = "WxH", value_parser = parse_display)]
  pub display: Option<Size>,

  /// 标签字体文件 (TTF/OTF)
  #[arg(long, value_name = "FILE")]
  pub font: Option<PathBuf>,

  /// 同时写出检测结果文本记录
  #[arg(long)]
  pub record: bool,

  /// 在标准输出打印 JSON 摘要
  #[arg(long)]
  pub json: bool,

  /// 请求超时 (秒)
  #[arg(long, default_value = "30", value_name = "SECONDS")]
  pub timeout_secs: u64,
}

impl Args {
  /// 上传大小上限 (字节)，过大的 MB 数取 u64 上限
  pub fn max_upload_bytes(&self) -> u64 {
    self.max_size_mb.saturating_mul(1024 * 1024)
  }
}

fn parse_display(value: &str) -> Result<Size, String> {
  let (w, h) = value
    .split_once(['x', 'X'])
    .ok_or_else(|| format!("显示尺寸格式应为 WxH, 实际为 '{value}'"))?;
  let w: u32 = w.trim().parse().map_err(|e| format!("宽度无效: {e}"))?;
  let h: u32 = h.trim().parse().map_err(|e| format!("高度无效: {e}"))?;
  if w == 0 || h == 0 {
    return Err("显示尺寸必须大于 0".to_string());
  }
  Ok(Size::from((w, h)))
}
