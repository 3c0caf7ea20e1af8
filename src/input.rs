// 该文件是 Shanan （山南西风） 项目的一部分。
// src/input.rs - 图像上传输入
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

use std::{path::Path, sync::Arc};

use image::{ImageFormat, RgbImage};
use thiserror::Error;
use tracing::{debug, error};
use url::Url;

use crate::{FromUrl, FromUrlWithScheme};

mod upload;
pub use self::upload::{DEFAULT_MAX_UPLOAD_BYTES, PreviewHandle, UploadError, UploadManager};

const FALLBACK_MIME: &str = "application/octet-stream";

/// 用户选择（尚未校验）的文件
#[derive(Debug, Clone)]
pub struct CandidateFile {
  pub name: String,
  pub mime: String,
  pub bytes: Vec<u8>,
}

impl CandidateFile {
  pub fn new(name: impl Into<String>, mime: impl Into<String>, bytes: Vec<u8>) -> Self {
    Self {
      name: name.into(),
      mime: mime.into(),
      bytes,
    }
  }

  pub fn size(&self) -> u64 {
    self.bytes.len() as u64
  }
}

/// 通过校验的图像，仅存在于当前会话中
#[derive(Debug, Clone)]
pub struct UploadedImage {
  pub name: String,
  pub mime: String,
  pub bytes: Arc<[u8]>,
  pub preview: PreviewHandle,
}

impl UploadedImage {
  pub fn size(&self) -> u64 {
    self.bytes.len() as u64
  }

  pub fn decode(&self) -> Result<RgbImage, image::ImageError> {
    Ok(image::load_from_memory(&self.bytes)?.to_rgb8())
  }
}

#[derive(Error, Debug)]
pub enum ImageFileInputError {
  #[error("URI schema mismatch")]
  SchemaMismatch,
  #[error("I/O error: {0}")]
  IoError(#[from] std::io::Error),
}

/// 从本地文件读取待上传图像，`image:///path/to/file.jpg`
pub struct ImageFileInput {
  candidate: CandidateFile,
}

impl FromUrlWithScheme for ImageFileInput {
  const SCHEME: &'static str = "image";
}

impl FromUrl for ImageFileInput {
  type Error = ImageFileInputError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    if url.scheme() != Self::SCHEME {
      error!(
        "URI scheme mismatch: expected '{}', found '{}'",
        Self::SCHEME,
        url.scheme()
      );
      return Err(ImageFileInputError::SchemaMismatch);
    }

    let path = Path::new(url.path());
    let bytes = std::fs::read(path)?;
    let mime = guess_mime(path, &bytes);
    let name = path
      .file_name()
      .map(|n| n.to_string_lossy().into_owned())
      .unwrap_or_default();
    debug!("读取文件 {} ({}, {} 字节)", path.display(), mime, bytes.len());

    Ok(ImageFileInput {
      candidate: CandidateFile::new(name, mime, bytes),
    })
  }
}

impl ImageFileInput {
  pub fn into_candidate(self) -> CandidateFile {
    self.candidate
  }
}

/// 优先按扩展名判断，失败时再按文件头嗅探
pub fn guess_mime(path: &Path, bytes: &[u8]) -> String {
  ImageFormat::from_path(path)
    .or_else(|_| image::guess_format(bytes))
    .map(|format| format.to_mime_type().to_string())
    .unwrap_or_else(|_| FALLBACK_MIME.to_string())
}
