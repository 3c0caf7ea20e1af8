// 该文件是 Shanan （山南西风） 项目的一部分。
// src/lib.rs - 检测叠加库入口
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

//! 上传图像、调用远程检测服务，并把检测框叠加到等比缩放后的图像上。
//!
//! 宿主以事件驱动 [`session::Session`]：选择文件、设置阈值、检测、
//! 图像就绪、容器尺寸变化、清除。检测本身由实现 [`model::Model`] 的后端完成，
//! 叠加层由 [`output::overlay::OverlayRenderer`] 规划。

pub mod input;
pub mod layout;
pub mod model;
pub mod output;
pub mod session;
pub mod threshold;

/// 由 URL 构造输入、输出或检测后端
///
/// `image:///path` 表示本地图像文件，`http(s)://` 表示检测代理。
pub trait FromUrl {
  type Error;
  fn from_url(url: &url::Url) -> Result<Self, Self::Error>
  where
    Self: Sized;
}

/// 只接受固定协议的 [`FromUrl`]
pub trait FromUrlWithScheme: FromUrl {
  const SCHEME: &'static str;
}
