// 该文件是 Shanan （山南西风） 项目的一部分。
// src/model/remote.rs - 远程检测服务客户端
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

use std::time::{Duration, Instant};

use serde_json::Value;
use tracing::{debug, error, info, warn};
use url::Url;

use crate::{
  FromUrl,
  model::{DetectError, DetectRequest, DetectionSet, Model, WireError, parse_detections},
};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(30);
const FALLBACK_CONTENT_TYPE: &str = "image/jpeg";

/// 检测代理客户端：multipart 上传 `file` 与 `threshold`
pub struct RemoteDetector {
  endpoint: Url,
  agent: ureq::Agent,
}

pub struct RemoteDetectorBuilder {
  endpoint: Url,
  timeout: Duration,
}

impl FromUrl for RemoteDetectorBuilder {
  type Error = DetectError;

  fn from_url(url: &Url) -> Result<Self, Self::Error> {
    match url.scheme() {
      "http" | "https" => Ok(RemoteDetectorBuilder {
        endpoint: url.clone(),
        timeout: DEFAULT_TIMEOUT,
      }),
      other => Err(DetectError::Configuration(format!(
        "检测服务地址必须使用 http 或 https 方案, 实际为 '{other}'"
      ))),
    }
  }
}

impl RemoteDetectorBuilder {
  pub fn timeout(mut self, timeout: Duration) -> Self {
    self.timeout = timeout;
    self
  }

  pub fn build(self) -> RemoteDetector {
    info!("检测服务地址: {} (超时 {:?})", self.endpoint, self.timeout);
    RemoteDetector {
      endpoint: self.endpoint,
      agent: ureq::AgentBuilder::new().timeout(self.timeout).build(),
    }
  }
}

impl Model for RemoteDetector {
  type Input = DetectRequest;
  type Output = DetectionSet;
  type Error = DetectError;

  fn infer(&self, input: &Self::Input) -> Result<Self::Output, Self::Error> {
    let boundary = multipart_boundary(input.id);
    let body = multipart_body(&boundary, input);
    debug!(
      "请求 #{}: 发送 {} ({} 字节), 阈值 {}",
      input.id,
      input.image.name,
      input.image.size(),
      input.threshold.value()
    );

    let now = Instant::now();
    let response = self
      .agent
      .post(self.endpoint.as_str())
      .set(
        "Content-Type",
        &format!("multipart/form-data; boundary={boundary}"),
      )
      .send_bytes(&body);

    let (status, text) = match response {
      Ok(resp) => {
        let status = resp.status();
        (status, read_body(resp)?)
      }
      Err(ureq::Error::Status(status, resp)) => (status, read_body(resp)?),
      Err(ureq::Error::Transport(t)) => {
        error!("请求 #{} 传输失败: {}", input.id, t);
        return Err(DetectError::Transport(t.to_string()));
      }
    };
    info!("请求 #{} 完成 (HTTP {}), 耗时: {:.2?}", input.id, status, now.elapsed());

    classify_response(status, &text)
  }
}

fn read_body(resp: ureq::Response) -> Result<String, DetectError> {
  resp
    .into_string()
    .map_err(|e| DetectError::Transport(format!("读取响应失败: {e}")))
}

fn multipart_boundary(request_id: u64) -> String {
  let nanos = chrono::Utc::now().timestamp_nanos_opt().unwrap_or_default();
  format!("----shanan-{request_id:x}-{nanos:x}")
}

fn multipart_body(boundary: &str, request: &DetectRequest) -> Vec<u8> {
  let image = &request.image;
  let content_type = if image.mime.is_empty() {
    FALLBACK_CONTENT_TYPE
  } else {
    image.mime.as_str()
  };
  let filename = image.name.replace('"', "");

  let mut body = Vec::with_capacity(image.bytes.len() + 512);
  body.extend_from_slice(
    format!(
      "--{boundary}\r\nContent-Disposition: form-data; name=\"file\"; filename=\"{filename}\"\r\nContent-Type: {content_type}\r\n\r\n"
    )
    .as_bytes(),
  );
  body.extend_from_slice(&image.bytes);
  body.extend_from_slice(
    format!(
      "\r\n--{boundary}\r\nContent-Disposition: form-data; name=\"threshold\"\r\n\r\n{}\r\n--{boundary}--\r\n",
      request.threshold.value()
    )
    .as_bytes(),
  );
  body
}

/// 按状态码与载荷形状归类代理响应
pub fn classify_response(status: u16, body: &str) -> Result<DetectionSet, DetectError> {
  let payload: Option<Value> = serde_json::from_str(body).ok();

  if !(200..300).contains(&status) {
    let message = payload
      .as_ref()
      .and_then(error_message)
      .unwrap_or_else(|| "Detection failed".to_string());
    warn!("检测服务返回错误 (HTTP {}): {}", status, message);
    return Err(if status == 400 {
      DetectError::Validation(message)
    } else {
      DetectError::Upstream { status, message }
    });
  }

  let Some(payload) = payload else {
    return Err(WireError::NotAnArray.into());
  };
  if payload.is_array() {
    return Ok(parse_detections(&payload)?);
  }
  match error_message(&payload) {
    Some(message) => Err(DetectError::Upstream { status, message }),
    None => Err(WireError::NotAnArray.into()),
  }
}

fn error_message(payload: &Value) -> Option<String> {
  let error = payload.get("error")?.as_str()?;
  Some(match payload.get("details").and_then(Value::as_str) {
    Some(details) => format!("{error}: {details}"),
    None => error.to_string(),
  })
}
