// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input/upload.rs - 上传校验与预览管理
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

use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};

use super::{CandidateFile, UploadedImage};

pub const DEFAULT_MAX_UPLOAD_BYTES: u64 = 5 * 1024 * 1024;

#[derive(Error, Debug, Clone, PartialEq)]
pub enum UploadError {
  #[error("Only image files are supported (got `{0}`).")]
  UnsupportedType(String),
  #[error("File is too large. Max {}.", format_limit(.max))]
  TooLarge { size: u64, max: u64 },
}

/// 整 MB 上限按 MB 显示，否则按字节显示
fn format_limit(max: &u64) -> String {
  const MB: u64 = 1024 * 1024;
  if *max >= MB && max % MB == 0 {
    format!("{}MB", max / MB)
  } else {
    format!("{max} bytes")
  }
}

/// 预览句柄，仅在对应图像仍为当前图像时可解析
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PreviewHandle {
  id: u64,
}

/// 持有当前唯一的上传图像；同一时刻至多一个预览存活
#[derive(Debug)]
pub struct UploadManager {
  max_bytes: u64,
  current: Option<UploadedImage>,
  next_preview: u64,
}

impl Default for UploadManager {
  fn default() -> Self {
    Self::new(DEFAULT_MAX_UPLOAD_BYTES)
  }
}

impl UploadManager {
  pub fn new(max_bytes: u64) -> Self {
    Self {
      max_bytes,
      current: None,
      next_preview: 1,
    }
  }

  pub fn max_bytes(&self) -> u64 {
    self.max_bytes
  }

  pub fn validate(&self, candidate: &CandidateFile) -> Result<(), UploadError> {
    if !candidate.mime.starts_with("image/") {
      return Err(UploadError::UnsupportedType(candidate.mime.clone()));
    }
    if candidate.size() > self.max_bytes {
      return Err(UploadError::TooLarge {
        size: candidate.size(),
        max: self.max_bytes,
      });
    }
    Ok(())
  }

  /// 校验并接收候选文件；被拒绝时当前图像保持不变
  pub fn accept(&mut self, candidate: CandidateFile) -> Result<&UploadedImage, UploadError> {
    if let Err(e) = self.validate(&candidate) {
      warn!("拒绝上传 {}: {}", candidate.name, e);
      return Err(e);
    }

    // 先释放旧预览，再创建新预览
    self.revoke();

    let preview = PreviewHandle {
      id: self.next_preview,
    };
    self.next_preview += 1;

    info!(
      "接收上传 {} ({}, {} 字节), 预览 #{}",
      candidate.name,
      candidate.mime,
      candidate.size(),
      preview.id
    );

    let image = UploadedImage {
      name: candidate.name,
      mime: candidate.mime,
      bytes: Arc::from(candidate.bytes),
      preview,
    };
    Ok(&*self.current.insert(image))
  }

  pub fn clear(&mut self) {
    self.revoke();
  }

  fn revoke(&mut self) {
    if let Some(old) = self.current.take() {
      debug!("释放预览 #{} ({})", old.preview.id, old.name);
    }
  }

  pub fn current(&self) -> Option<&UploadedImage> {
    self.current.as_ref()
  }

  /// 已被替换或清除的句柄返回 `None`
  pub fn resolve(&self, handle: PreviewHandle) -> Option<Arc<[u8]>> {
    self
      .current
      .as_ref()
      .filter(|image| image.preview == handle)
      .map(|image| Arc::clone(&image.bytes))
  }

  pub fn live_previews(&self) -> usize {
    usize::from(self.current.is_some())
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn image_file(name: &str, size: usize) -> CandidateFile {
    CandidateFile::new(name, "image/jpeg", vec![0u8; size])
  }

  #[test]
  fn accepts_image_within_limit() {
    let mut uploads = UploadManager::default();
    let image = uploads.accept(image_file("a.jpg", 1024)).unwrap();
    assert_eq!(image.name, "a.jpg");
    assert_eq!(image.size(), 1024);
    assert_eq!(uploads.live_previews(), 1);
  }

  #[test]
  fn oversized_file_leaves_current_image_untouched() {
    let mut uploads = UploadManager::new(5 * 1024 * 1024);
    let handle = uploads.accept(image_file("a.jpg", 10)).unwrap().preview;

    let err = uploads.accept(image_file("big.jpg", 6 * 1024 * 1024)).unwrap_err();
    assert_eq!(
      err,
      UploadError::TooLarge {
        size: 6 * 1024 * 1024,
        max: 5 * 1024 * 1024,
      }
    );
    assert_eq!(err.to_string(), "File is too large. Max 5MB.");
    assert_eq!(uploads.current().map(|i| i.name.as_str()), Some("a.jpg"));
    assert!(uploads.resolve(handle).is_some());
  }

  #[test]
  fn exact_limit_is_accepted() {
    let mut uploads = UploadManager::new(100);
    assert!(uploads.accept(image_file("edge.jpg", 100)).is_ok());
  }

  #[test]
  fn limit_below_one_megabyte_is_reported_in_bytes() {
    let mut uploads = UploadManager::new(100);
    let err = uploads.accept(image_file("big.jpg", 101)).unwrap_err();
    assert_eq!(err.to_string(), "File is too large. Max 100 bytes.");

    let mut uploads = UploadManager::new(3 * 1024 * 1024 / 2);
    let err = uploads.accept(image_file("big.jpg", 2 * 1024 * 1024)).unwrap_err();
    assert_eq!(err.to_string(), "File is too large. Max 1572864 bytes.");
  }

  #[test]
  fn non_image_is_rejected() {
    let mut uploads = UploadManager::default();
    let err = uploads
      .accept(CandidateFile::new("notes.txt", "text/plain", b"hi".to_vec()))
      .unwrap_err();
    assert!(matches!(err, UploadError::UnsupportedType(ref m) if m == "text/plain"));
    assert!(uploads.current().is_none());
  }

  #[test]
  fn replacing_revokes_previous_preview() {
    let mut uploads = UploadManager::default();
    let first = uploads.accept(image_file("a.jpg", 1)).unwrap().preview;
    let second = uploads.accept(image_file("b.jpg", 2)).unwrap().preview;

    assert_ne!(first, second);
    assert!(uploads.resolve(first).is_none());
    assert_eq!(uploads.resolve(second).map(|b| b.len()), Some(2));
    assert_eq!(uploads.live_previews(), 1);

    uploads.clear();
    assert!(uploads.resolve(second).is_none());
    assert_eq!(uploads.live_previews(), 0);
  }
}
