//! GPU 同步机制模块
//!
//! 提供 CPU-GPU 同步用的 Fence 原语。
//!
//! # 设计原则
//!
//! - **单调递增**：每次提交分配一个新的 Fence 值，GPU 按顺序完成
//! - **原子发布**：已完成值存放在 `Arc<AtomicU64>` 中，GPU 完成回调可以在任意线程写入
//!
//! # 使用场景
//!
//! 1. **帧资源复用**：帧资源槽位记录最后一次使用它的 Fence 值，
//!    GPU 达到该值之前不能再写入该槽位
//! 2. **刷新队列**：等待最后一次提交完成，例如调整尺寸或截图前

use crate::core::error::Result;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

/// Fence 值
///
/// 用于CPU-GPU同步的单调递增值。0 表示"从未提交"，总是视为已完成。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct FenceValue(u64);

impl FenceValue {
    /// 从未提交过的 Fence 值
    pub const NONE: FenceValue = FenceValue(0);

    /// 创建新的Fence值
    pub fn new(value: u64) -> Self {
        Self(value)
    }

    /// 获取内部值
    pub fn value(&self) -> u64 {
        self.0
    }

    /// 下一个Fence值
    pub fn next(&self) -> Self {
        Self(self.0 + 1)
    }
}

/// Fence 管理器
///
/// 管理 CPU 侧分配的 Fence 值，并跟踪 GPU 已完成的值。
///
/// # 示例
///
/// ```rust
/// use wave_render::renderer::sync::FenceManager;
///
/// let fences = FenceManager::new();
///
/// // 提交工作
/// let fence = fences.next_value();
///
/// // GPU 完成后（通常在完成回调里）
/// fences.update_completed_value(fence);
/// assert!(fences.is_completed(fence));
/// ```
#[derive(Debug)]
pub struct FenceManager {
    /// 最后分配的Fence值（CPU侧）
    current_value: AtomicU64,
    /// 已完成的Fence值（GPU侧）
    completed_value: Arc<AtomicU64>,
}

impl FenceManager {
    /// 创建新的Fence管理器
    pub fn new() -> Self {
        Self {
            current_value: AtomicU64::new(0),
            completed_value: Arc::new(AtomicU64::new(0)),
        }
    }

    /// 最后分配的Fence值
    pub fn current_value(&self) -> FenceValue {
        FenceValue::new(self.current_value.load(Ordering::Acquire))
    }

    /// 已完成的Fence值
    pub fn completed_value(&self) -> FenceValue {
        FenceValue::new(self.completed_value.load(Ordering::Acquire))
    }

    /// 分配下一个Fence值
    pub fn next_value(&self) -> FenceValue {
        let value = self.current_value.fetch_add(1, Ordering::AcqRel);
        FenceValue::new(value + 1)
    }

    /// 发布已完成的Fence值
    ///
    /// 完成值只增不减，乱序到达的旧值会被忽略。
    pub fn update_completed_value(&self, value: FenceValue) {
        self.completed_value.fetch_max(value.value(), Ordering::AcqRel);
    }

    /// 共享的完成值句柄，交给 GPU 完成回调使用
    pub fn completion_handle(&self) -> Arc<AtomicU64> {
        Arc::clone(&self.completed_value)
    }

    /// 检查特定Fence值是否已完成
    pub fn is_completed(&self, value: FenceValue) -> bool {
        self.completed_value() >= value
    }

    /// 在完成之前反复调用 `poll`
    ///
    /// `poll` 负责推动 GPU 进度（例如 `wgpu::Device::poll`）。
    pub fn wait_for_value<F>(&self, value: FenceValue, mut poll: F) -> Result<()>
    where
        F: FnMut() -> Result<()>,
    {
        while !self.is_completed(value) {
            poll()?;
            if !self.is_completed(value) {
                std::thread::yield_now();
            }
        }
        Ok(())
    }

    /// 等待所有已分配的 Fence 完成
    pub fn flush<F>(&self, poll: F) -> Result<()>
    where
        F: FnMut() -> Result<()>,
    {
        self.wait_for_value(self.current_value(), poll)
    }
}

impl Default for FenceManager {
    fn default() -> Self {
        Self::new()
    }
}
