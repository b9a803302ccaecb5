//! 帧资源与帧资源环
//!
//! GPU 读取某一帧的常量缓冲区和动态顶点缓冲区时，CPU 不能改写它们。
//! 为了让 CPU 不必每帧都等待 GPU，每一帧使用环中的一个独立槽位：
//!
//! ```text
//! 帧 n   → 槽位 n % N    （CPU 写入）
//! 帧 n-1 → 槽位 (n-1) % N（GPU 可能仍在读取）
//! ...
//! ```
//!
//! 每个槽位记录最后一次使用它的提交的 Fence 值。环推进到某个槽位时，
//! 如果 GPU 还没有完成该 Fence，就阻塞等待。这样 CPU 最多领先 GPU N-1 帧。

use bytemuck::Pod;
use tracing::trace;

use crate::core::error::{ConfigError, Result};
use crate::gfx::device::GpuDevice;

use super::constants::{MaterialConstants, ObjectConstants, PassConstants};
use super::sync::FenceValue;
use super::upload::UploadBuffer;

/// 默认的帧资源数量（三重缓冲）
pub const DEFAULT_FRAME_RESOURCES: usize = 3;

/// 每个帧资源需要的缓冲区容量
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FrameResourceDesc {
    pub pass_count: usize,
    pub object_count: usize,
    /// 0 表示不需要材质常量
    pub material_count: usize,
    /// 0 表示没有动态顶点缓冲区
    pub wave_vertex_count: usize,
}

/// 一帧 CPU 构建命令所需的全部资源
///
/// `V` 为动态顶点缓冲区（波浪）的顶点类型。
#[derive(Debug)]
pub struct FrameResource<V> {
    pub pass_cb: UploadBuffer<PassConstants>,
    pub object_cb: UploadBuffer<ObjectConstants>,
    pub material_cb: Option<UploadBuffer<MaterialConstants>>,
    /// 每帧重写的波浪顶点
    pub waves_vb: Option<UploadBuffer<V>>,
    /// 最后一次使用本槽位的提交
    pub fence: FenceValue,
}

impl<V: Pod> FrameResource<V> {
    pub fn new<D: GpuDevice + ?Sized>(
        device: &mut D,
        slot: usize,
        desc: &FrameResourceDesc,
    ) -> Result<Self> {
        let pass_cb = UploadBuffer::new(
            device,
            desc.pass_count.max(1),
            true,
            &format!("frame{}.pass", slot),
        )?;
        let object_cb = UploadBuffer::new(
            device,
            desc.object_count.max(1),
            true,
            &format!("frame{}.objects", slot),
        )?;
        let material_cb = if desc.material_count > 0 {
            Some(UploadBuffer::new(
                device,
                desc.material_count,
                true,
                &format!("frame{}.materials", slot),
            )?)
        } else {
            None
        };
        let waves_vb = if desc.wave_vertex_count > 0 {
            Some(UploadBuffer::new(
                device,
                desc.wave_vertex_count,
                false,
                &format!("frame{}.waves", slot),
            )?)
        } else {
            None
        };

        Ok(Self {
            pass_cb,
            object_cb,
            material_cb,
            waves_vb,
            fence: FenceValue::NONE,
        })
    }
}

/// 帧资源环
#[derive(Debug)]
pub struct FrameResourceRing<V> {
    resources: Vec<FrameResource<V>>,
    current: usize,
    /// 实际阻塞等待 GPU 的次数
    waits: u64,
}

impl<V: Pod> FrameResourceRing<V> {
    /// 创建 `count` 个帧资源
    ///
    /// `count` 至少为 2，否则 CPU 和 GPU 无法并行。
    pub fn new<D: GpuDevice + ?Sized>(
        device: &mut D,
        count: usize,
        desc: &FrameResourceDesc,
    ) -> Result<Self> {
        if count < 2 {
            return Err(ConfigError::InvalidValue {
                field: "graphics.frame_resources".to_string(),
                reason: format!("at least 2 frame resources are required, got {}", count),
            }
            .into());
        }

        let resources = (0..count)
            .map(|slot| FrameResource::new(device, slot, desc))
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            resources,
            // 第一次 begin_frame 推进到槽位 0
            current: count - 1,
            waits: 0,
        })
    }

    /// 推进到下一个槽位
    ///
    /// 如果 GPU 还没有完成该槽位上一次的提交，阻塞等待。
    /// 返回后该槽位的所有缓冲区都可以安全写入。
    pub fn begin_frame<D: GpuDevice + ?Sized>(&mut self, device: &mut D) -> Result<usize> {
        self.current = (self.current + 1) % self.resources.len();

        let fence = self.resources[self.current].fence;
        if fence != FenceValue::NONE && device.completed_fence() < fence {
            trace!(
                slot = self.current,
                fence = fence.value(),
                completed = device.completed_fence().value(),
                "Waiting for frame resource"
            );
            device.wait_for_fence(fence)?;
            self.waits += 1;
        }

        Ok(self.current)
    }

    /// 记录当前槽位最后一次提交的 Fence 值
    pub fn end_frame(&mut self, fence: FenceValue) {
        self.resources[self.current].fence = fence;
    }
}

impl<V> FrameResourceRing<V> {
    /// 当前槽位
    pub fn current(&self) -> &FrameResource<V> {
        &self.resources[self.current]
    }

    pub fn current_index(&self) -> usize {
        self.current
    }

    pub fn len(&self) -> usize {
        self.resources.len()
    }

    pub fn is_empty(&self) -> bool {
        self.resources.is_empty()
    }

    pub fn get(&self, slot: usize) -> Option<&FrameResource<V>> {
        self.resources.get(slot)
    }

    pub fn wait_count(&self) -> u64 {
        self.waits
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::gfx::device::FramePass;
    use crate::gfx::HeadlessDevice;
    use crate::renderer::vertex::LitVertex;

    fn desc() -> FrameResourceDesc {
        FrameResourceDesc {
            pass_count: 1,
            object_count: 2,
            material_count: 0,
            wave_vertex_count: 4,
        }
    }

    fn empty_pass(ring: &FrameResourceRing<LitVertex>) -> FramePass {
        FramePass {
            clear_color: [0.0; 4],
            wireframe: false,
            pass_constants: ring.current().pass_cb.binding(0).unwrap(),
            draws: Vec::new(),
        }
    }

    /// 写入当前槽位的全部缓冲区，然后提交
    fn run_frame(ring: &mut FrameResourceRing<LitVertex>, device: &mut HeadlessDevice) {
        ring.begin_frame(device).unwrap();
        let frame = ring.current();
        frame
            .pass_cb
            .copy_data(device, 0, &PassConstants::default())
            .unwrap();
        frame
            .object_cb
            .copy_data(device, 1, &ObjectConstants::default())
            .unwrap();
        if let Some(vb) = &frame.waves_vb {
            vb.copy_slice(device, 0, &[LitVertex::default(); 4]).unwrap();
        }
        let fence = device.submit(&empty_pass(ring)).unwrap();
        ring.end_frame(fence);
    }

    #[test]
    fn test_ring_cycles_slots() {
        let mut device = HeadlessDevice::new(4, 4, 0);
        let mut ring = FrameResourceRing::<LitVertex>::new(&mut device, 3, &desc()).unwrap();

        let slots: Vec<_> = (0..7).map(|_| ring.begin_frame(&mut device).unwrap()).collect();
        assert_eq!(slots, vec![0, 1, 2, 0, 1, 2, 0]);
        assert!(ring.current().waves_vb.is_some());
        assert!(ring.current().material_cb.is_none());
    }

    #[test]
    fn test_ring_without_waits_when_gpu_keeps_up() {
        let mut device = HeadlessDevice::new(4, 4, 2);
        let mut ring = FrameResourceRing::<LitVertex>::new(&mut device, 3, &desc()).unwrap();

        for _ in 0..10 {
            run_frame(&mut ring, &mut device);
        }
        assert_eq!(ring.wait_count(), 0);
    }

    #[test]
    fn test_ring_blocks_when_gpu_lags() {
        let mut device = HeadlessDevice::new(4, 4, 5);
        let mut ring = FrameResourceRing::<LitVertex>::new(&mut device, 3, &desc()).unwrap();

        // 写入前总是等待，所以从不触发资源冲突
        for _ in 0..10 {
            run_frame(&mut ring, &mut device);
        }
        assert_eq!(ring.wait_count(), 7);
        assert!(device.stats().fence_waits >= 7);
    }

    #[test]
    fn test_ring_requires_two_slots() {
        let mut device = HeadlessDevice::new(4, 4, 0);
        assert!(FrameResourceRing::<LitVertex>::new(&mut device, 1, &desc()).is_err());
    }
}
