// 该文件是 Shanan （山南西风） 项目的一部分。
// src/main.rs - 项目主程序
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

mod args;

use std::time::Duration;

use anyhow::{Result, anyhow};
use clap::Parser;
use serde_json::json;
use tracing::{info, warn};

use shanan_overlay::{
  FromUrl,
  input::ImageFileInput,
  layout::Size,
  model::RemoteDetectorBuilder,
  output::{Render, SaveImageFileOutput, draw::Draw},
  session::{Completion, Session, SessionConfig},
};

fn main() -> Result<()> {
  tracing_subscriber::fmt::init();

  let args = args::Args::parse();

  info!("输入来源: {}", args.input);
  info!("检测服务: {}", args.endpoint);
  info!("输出路径: {}", args.output);

  let mut session = Session::new(SessionConfig {
    max_upload_bytes: args.max_upload_bytes(),
    ..SessionConfig::default()
  });
  session.set_threshold(args.threshold);
  info!("置信度阈值: {}", session.threshold());

  let candidate = ImageFileInput::from_url(&args.input)?.into_candidate();
  session.select_file(candidate)?;

  let model = RemoteDetectorBuilder::from_url(&args.endpoint)?
    .timeout(Duration::from_secs(args.timeout_secs))
    .build();

  info!("开始检测...");
  if session.detect(&model)? == Completion::Stale {
    return Err(anyhow!("检测结果已过期"));
  }
  if let Some(message) = session.error() {
    return Err(anyhow!("{message}"));
  }

  let frame = session
    .image()
    .ok_or_else(|| anyhow!("没有输入图像"))?
    .decode()?;
  session.on_image_ready(Size::from(frame.dimensions()));
  if let Some(display) = args.display {
    session.on_container_resized(display);
  }

  for det in session.visible_detections() {
    let r = det.bbox.to_rect();
    info!(
      "  - {}: {:.2}% at ({:.0}, {:.0}, {:.0}x{:.0})",
      det.label,
      det.score * 100.0,
      r.x,
      r.y,
      r.width,
      r.height
    );
  }

  let mut draw = Draw::default();
  if let Some(font) = &args.font {
    draw = draw.with_font_file(font);
  } else {
    warn!("未指定字体，标签只绘制底色");
  }

  let overlay = session
    .overlay(draw.renderer())
    .ok_or_else(|| anyhow!("布局尚未就绪"))?;
  let mut output = SaveImageFileOutput::from_url(&args.output)?.with_draw(draw);
  if args.record {
    output = output.with_record(true);
  }
  output.render_result(&frame, &overlay)?;

  if args.json {
    let detections: Vec<_> = overlay
      .detections
      .iter()
      .map(|d| {
        let r = d.bbox.to_rect();
        json!({
          "label": d.label,
          "score": d.score,
          "box": { "x": r.x, "y": r.y, "w": r.width, "h": r.height },
        })
      })
      .collect();
    let summary = json!({
      "image": session.image().map(|i| i.name.clone()),
      "threshold": session.threshold().value(),
      "total": session.detections().len(),
      "visible": detections,
      "output": output.path().display().to_string(),
    });
    println!("{}", serde_json::to_string_pretty(&summary)?);
  }

  info!(
    "处理完成! 共 {} 个检测结果, 显示 {} 个",
    session.detections().len(),
    overlay.detections.len()
  );

  Ok(())
}
