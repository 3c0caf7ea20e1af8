// 该文件是 Shanan （山南西风） 项目的一部分。
// src/session/history.rs - 最近检测记录
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

use std::collections::VecDeque;

use chrono::{DateTime, Utc};

use crate::threshold::Threshold;

pub const DEFAULT_HISTORY_CAPACITY: usize = 8;

#[derive(Debug, Clone, PartialEq)]
pub struct HistoryEntry {
  pub name: String,
  pub size_bytes: u64,
  pub threshold: Threshold,
  pub detections: usize,
  pub at: DateTime<Utc>,
}

/// 定长环形缓冲，仅存于内存，满时丢弃最旧的记录
#[derive(Debug, Clone)]
pub struct History {
  capacity: usize,
  entries: VecDeque<HistoryEntry>,
}

impl Default for History {
  fn default() -> Self {
    Self::with_capacity(DEFAULT_HISTORY_CAPACITY)
  }
}

impl History {
  pub fn with_capacity(capacity: usize) -> Self {
    Self {
      capacity,
      entries: VecDeque::with_capacity(capacity),
    }
  }

  pub fn push(&mut self, entry: HistoryEntry) {
    if self.capacity == 0 {
      return;
    }
    if self.entries.len() == self.capacity {
      self.entries.pop_front();
    }
    self.entries.push_back(entry);
  }

  /// 最新的在前
  pub fn recent(&self) -> impl Iterator<Item = &HistoryEntry> {
    self.entries.iter().rev()
  }

  pub fn len(&self) -> usize {
    self.entries.len()
  }

  pub fn is_empty(&self) -> bool {
    self.entries.is_empty()
  }

  pub fn capacity(&self) -> usize {
    self.capacity
  }
}
