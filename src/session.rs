// 该文件是 Shanan （山南西风） 项目的一部分。
// src/session.rs - 检测会话编排
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

//! 会话状态机：
//!
//! ```text
//! Idle --选择文件--> HasImage --检测--> Requesting --成功--> HasResults
//!                                        Requesting --失败--> HasImage (附错误信息)
//! 任意状态 --换图--> HasImage，任意状态 --清除--> Idle
//! ```
//!
//! 同一时刻至多一个请求在途；换图或清除后，在途请求的结果会被忽略。

use chrono::Utc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::{
  input::{CandidateFile, DEFAULT_MAX_UPLOAD_BYTES, PreviewHandle, UploadError, UploadManager, UploadedImage},
  layout::{DisplayMetrics, LayoutTrigger, OverlayLayout, Size},
  model::{DetectError, DetectRequest, Detection, DetectionSet, Model},
  output::{Overlay, overlay::OverlayRenderer},
  threshold::Threshold,
};

mod history;
pub use self::history::{DEFAULT_HISTORY_CAPACITY, History, HistoryEntry};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
  Idle,
  HasImage,
  Requesting,
  HasResults,
}

/// 请求完成时结果是否被采纳
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Completion {
  Applied,
  Stale,
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum SessionError {
  #[error("No image selected")]
  NoImage,
  #[error("A detection request is already in flight")]
  RequestPending,
}

#[derive(Debug, Clone, Copy)]
pub struct SessionConfig {
  pub max_upload_bytes: u64,
  pub history_capacity: usize,
}

impl Default for SessionConfig {
  fn default() -> Self {
    Self {
      max_upload_bytes: DEFAULT_MAX_UPLOAD_BYTES,
      history_capacity: DEFAULT_HISTORY_CAPACITY,
    }
  }
}

#[derive(Debug)]
pub struct Session {
  uploads: UploadManager,
  threshold: Threshold,
  detections: DetectionSet,
  error: Option<String>,
  state: SessionState,
  /// 在途请求的 id 及其发出时的阈值
  pending: Option<(u64, Threshold)>,
  next_request: u64,
  history: History,
  layout: OverlayLayout,
}

impl Default for Session {
  fn default() -> Self {
    Self::new(SessionConfig::default())
  }
}

impl Session {
  pub fn new(config: SessionConfig) -> Self {
    Self {
      uploads: UploadManager::new(config.max_upload_bytes),
      threshold: Threshold::default(),
      detections: DetectionSet::default(),
      error: None,
      state: SessionState::Idle,
      pending: None,
      next_request: 1,
      history: History::with_capacity(config.history_capacity),
      layout: OverlayLayout::default(),
    }
  }

  pub fn state(&self) -> SessionState {
    self.state
  }

  pub fn image(&self) -> Option<&UploadedImage> {
    self.uploads.current()
  }

  pub fn uploads(&self) -> &UploadManager {
    &self.uploads
  }

  pub fn threshold(&self) -> Threshold {
    self.threshold
  }

  pub fn set_threshold(&mut self, value: f32) {
    self.threshold.set(value);
    debug!("阈值更新为 {}", self.threshold);
  }

  pub fn reset_threshold(&mut self) {
    self.threshold.reset();
  }

  pub fn detections(&self) -> &DetectionSet {
    &self.detections
  }

  /// 按当前阈值过滤后的结果
  pub fn visible_detections(&self) -> impl Iterator<Item = &Detection> {
    self.detections.visible(self.threshold)
  }

  pub fn error(&self) -> Option<&str> {
    self.error.as_deref()
  }

  pub fn is_loading(&self) -> bool {
    self.pending.is_some()
  }

  /// 检测按钮是否可用
  pub fn can_detect(&self) -> bool {
    self.uploads.current().is_some() && self.pending.is_none()
  }

  pub fn history(&self) -> &History {
    &self.history
  }

  pub fn layout(&self) -> &OverlayLayout {
    &self.layout
  }

  /// 选择新图像；被拒绝时会话保持不变
  pub fn select_file(&mut self, candidate: CandidateFile) -> Result<PreviewHandle, UploadError> {
    let preview = self.uploads.accept(candidate)?.preview;
    self.discard_results();
    self.layout.forget_image();
    self.state = SessionState::HasImage;
    Ok(preview)
  }

  pub fn clear(&mut self) {
    self.uploads.clear();
    self.discard_results();
    self.layout.forget_image();
    self.state = SessionState::Idle;
    info!("会话已清除");
  }

  fn discard_results(&mut self) {
    if let Some((id, _)) = self.pending.take() {
      debug!("放弃在途请求 #{}", id);
    }
    self.detections = DetectionSet::default();
    self.error = None;
  }

  /// 发起检测，返回交给模型的请求凭据
  pub fn begin_detect(&mut self) -> Result<DetectRequest, SessionError> {
    if self.pending.is_some() {
      return Err(SessionError::RequestPending);
    }
    let image = self.uploads.current().ok_or(SessionError::NoImage)?.clone();

    let id = self.next_request;
    self.next_request += 1;
    self.pending = Some((id, self.threshold));
    self.detections = DetectionSet::default();
    self.error = None;
    self.state = SessionState::Requesting;
    info!("发起检测请求 #{} ({}), 阈值 {}", id, image.name, self.threshold);

    Ok(DetectRequest {
      id,
      image,
      threshold: self.threshold,
    })
  }

  /// 仅当 `request_id` 仍是当前在途请求时才采纳结果
  pub fn complete(
    &mut self,
    request_id: u64,
    outcome: Result<DetectionSet, DetectError>,
  ) -> Completion {
    let sent_threshold = match self.pending {
      Some((id, threshold)) if id == request_id => threshold,
      _ => {
        warn!("忽略过期请求 #{} 的结果", request_id);
        return Completion::Stale;
      }
    };
    self.pending = None;

    match outcome {
      Ok(detections) => {
        info!("请求 #{} 成功: {} 个检测结果", request_id, detections.len());
        if let Some(image) = self.uploads.current() {
          self.history.push(HistoryEntry {
            name: image.name.clone(),
            size_bytes: image.size(),
            threshold: sent_threshold,
            detections: detections.len(),
            at: Utc::now(),
          });
        }
        self.detections = detections;
        self.state = SessionState::HasResults;
      }
      Err(e) => {
        warn!("请求 #{} 失败: {}", request_id, e);
        self.detections = DetectionSet::default();
        self.error = Some(e.user_message());
        self.state = SessionState::HasImage;
      }
    }
    Completion::Applied
  }

  /// 发起、执行并完成一次检测
  pub fn detect<M>(&mut self, model: &M) -> Result<Completion, SessionError>
  where
    M: Model<Input = DetectRequest, Output = DetectionSet, Error = DetectError>,
  {
    let request = self.begin_detect()?;
    let outcome = model.infer(&request);
    Ok(self.complete(request.id, outcome))
  }

  /// 图像加载完成（已知原始尺寸）
  pub fn on_image_ready(&mut self, native: Size) -> Option<DisplayMetrics> {
    self.layout.recompute(LayoutTrigger::ImageReady(native))
  }

  /// 显示容器尺寸变化
  pub fn on_container_resized(&mut self, container: Size) -> Option<DisplayMetrics> {
    self.layout.recompute(LayoutTrigger::ContainerResized(container))
  }

  /// 以当前布局与阈值生成叠加层；图像尚未就绪时返回 `None`
  pub fn overlay(&self, renderer: &OverlayRenderer) -> Option<Overlay> {
    let metrics = self.layout.metrics()?;
    let canvas = self.layout.canvas()?;
    Some(Overlay {
      metrics,
      canvas,
      boxes: renderer.plan(self.detections.iter(), self.threshold, &metrics),
      detections: self.visible_detections().cloned().collect(),
    })
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::model::BoundingBox;

  fn image(name: &str) -> CandidateFile {
    CandidateFile::new(name, "image/png", vec![1, 2, 3])
  }

  fn set(items: &[(&str, f32)]) -> DetectionSet {
    items
      .iter()
      .map(|(label, score)| Detection {
        label: (*label).into(),
        score: *score,
        bbox: BoundingBox::Corners {
          xmin: 0.0,
          ymin: 0.0,
          xmax: 10.0,
          ymax: 10.0,
        },
      })
      .collect::<Vec<_>>()
      .into()
  }

  #[test]
  fn follows_happy_path_states() {
    let mut session = Session::default();
    assert_eq!(session.state(), SessionState::Idle);
    assert!(!session.can_detect());
    assert_eq!(session.begin_detect().unwrap_err(), SessionError::NoImage);

    session.select_file(image("a.png")).unwrap();
    assert_eq!(session.state(), SessionState::HasImage);
    assert!(session.can_detect());

    let request = session.begin_detect().unwrap();
    assert_eq!(session.state(), SessionState::Requesting);
    assert!(session.is_loading());
    assert!(!session.can_detect());

    assert_eq!(
      session.complete(request.id, Ok(set(&[("dog", 0.9)]))),
      Completion::Applied
    );
    assert_eq!(session.state(), SessionState::HasResults);
    assert!(!session.is_loading());
    assert_eq!(session.detections().len(), 1);
    assert_eq!(session.history().len(), 1);
  }

  #[test]
  fn history_keeps_threshold_sent_with_request() {
    let mut session = Session::default();
    session.select_file(image("a.png")).unwrap();
    session.set_threshold(0.3);
    let request = session.begin_detect().unwrap();
    assert_eq!(request.threshold, Threshold::new(0.3));

    // 请求在途时移动滑块
    session.set_threshold(0.9);
    session.complete(request.id, Ok(DetectionSet::default()));

    let entry = session.history().recent().next().unwrap();
    assert_eq!(entry.threshold, Threshold::new(0.3));
    assert_eq!(session.threshold(), Threshold::new(0.9));
  }

  #[test]
  fn config_sets_upload_limit_and_history_capacity() {
    let session = Session::new(SessionConfig {
      max_upload_bytes: 1024,
      history_capacity: 2,
    });
    assert_eq!(session.uploads().max_bytes(), 1024);
    assert_eq!(session.history().capacity(), 2);
    assert_eq!(
      Session::default().history().capacity(),
      DEFAULT_HISTORY_CAPACITY
    );
  }

  #[test]
  fn second_request_is_refused_while_pending() {
    let mut session = Session::default();
    session.select_file(image("a.png")).unwrap();
    let first = session.begin_detect().unwrap();
    assert_eq!(
      session.begin_detect().unwrap_err(),
      SessionError::RequestPending
    );
    session.complete(first.id, Ok(DetectionSet::default()));
    assert!(session.begin_detect().is_ok());
  }

  #[test]
  fn failure_surfaces_message_and_returns_to_has_image() {
    let mut session = Session::default();
    session.select_file(image("a.png")).unwrap();
    let request = session.begin_detect().unwrap();
    session.complete(
      request.id,
      Err(DetectError::Transport("connection refused".into())),
    );

    assert_eq!(session.state(), SessionState::HasImage);
    assert!(session.detections().is_empty());
    assert!(!session.is_loading());
    assert_eq!(
      session.error(),
      Some("Detection failed: could not reach the detection service")
    );
    assert!(session.history().is_empty());
  }

  #[test]
  fn replacing_image_ignores_pending_result() {
    for outcome in [
      Ok(set(&[("dog", 0.9)])),
      Err(DetectError::Validation("No file uploaded".into())),
    ] {
      let mut session = Session::default();
      session.select_file(image("a.png")).unwrap();
      let request = session.begin_detect().unwrap();

      session.select_file(image("b.png")).unwrap();
      assert_eq!(session.state(), SessionState::HasImage);
      assert!(session.can_detect());

      assert_eq!(session.complete(request.id, outcome), Completion::Stale);
      assert!(session.detections().is_empty());
      assert!(session.error().is_none());
      assert_eq!(session.state(), SessionState::HasImage);
      assert_eq!(session.image().map(|i| i.name.as_str()), Some("b.png"));
    }
  }

  #[test]
  fn clear_resets_to_idle_and_ignores_pending_result() {
    let mut session = Session::default();
    session.select_file(image("a.png")).unwrap();
    let request = session.begin_detect().unwrap();
    session.clear();

    assert_eq!(session.state(), SessionState::Idle);
    assert!(session.image().is_none());
    assert_eq!(session.uploads().live_previews(), 0);
    assert_eq!(
      session.complete(request.id, Ok(set(&[("dog", 0.9)]))),
      Completion::Stale
    );
    assert!(session.detections().is_empty());
  }

  #[test]
  fn new_image_discards_previous_results() {
    let mut session = Session::default();
    session.select_file(image("a.png")).unwrap();
    let request = session.begin_detect().unwrap();
    session.complete(request.id, Ok(set(&[("dog", 0.9)])));

    session.select_file(image("b.png")).unwrap();
    assert!(session.detections().is_empty());
    assert_eq!(session.state(), SessionState::HasImage);
  }

  #[test]
  fn rejected_upload_keeps_session_unchanged() {
    let mut session = Session::new(SessionConfig {
      max_upload_bytes: 5 * 1024 * 1024,
      ..SessionConfig::default()
    });
    session.select_file(image("a.png")).unwrap();
    let request = session.begin_detect().unwrap();
    session.complete(request.id, Ok(set(&[("dog", 0.9)])));

    let big = CandidateFile::new("big.png", "image/png", vec![0; 6 * 1024 * 1024]);
    assert!(matches!(
      session.select_file(big),
      Err(UploadError::TooLarge { .. })
    ));
    let text = CandidateFile::new("a.txt", "text/plain", vec![0; 4]);
    assert!(matches!(
      session.select_file(text),
      Err(UploadError::UnsupportedType(_))
    ));

    assert_eq!(session.state(), SessionState::HasResults);
    assert_eq!(session.image().map(|i| i.name.as_str()), Some("a.png"));
    assert_eq!(session.detections().len(), 1);
  }

  #[test]
  fn threshold_changes_refilter_without_new_request() {
    let mut session = Session::default();
    session.select_file(image("a.png")).unwrap();
    let request = session.begin_detect().unwrap();
    session.complete(request.id, Ok(set(&[("dog", 0.9), ("cat", 0.3)])));

    session.set_threshold(0.5);
    assert_eq!(session.visible_detections().count(), 1);
    session.set_threshold(-2.0);
    assert_eq!(session.threshold().value(), 0.0);
    assert_eq!(session.visible_detections().count(), 2);
    session.reset_threshold();
    assert_eq!(session.threshold(), Threshold::default());
  }

  #[test]
  fn overlay_requires_image_metrics_and_tracks_resize() {
    let mut session = Session::default();
    session.select_file(image("a.png")).unwrap();
    let request = session.begin_detect().unwrap();
    session.complete(request.id, Ok(set(&[("dog", 0.9)])));

    let renderer = OverlayRenderer::default();
    assert!(session.overlay(&renderer).is_none());

    session.on_image_ready(Size::new(100.0, 100.0));
    let overlay = session.overlay(&renderer).unwrap();
    assert_eq!(overlay.boxes[0].rect.width, 10.0);

    session.on_container_resized(Size::new(50.0, 50.0));
    let overlay = session.overlay(&renderer).unwrap();
    assert_eq!(overlay.boxes[0].rect.width, 5.0);
    assert_eq!(overlay.canvas, Size::new(50.0, 50.0));

    // 换图后原图尺寸失效，需等待新的 ImageReady
    session.select_file(image("b.png")).unwrap();
    assert!(session.overlay(&renderer).is_none());
  }
}
