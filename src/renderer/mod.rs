//! 渲染器模块
//!
//! 与具体图形 API 无关的渲染组件。应用程序在这里准备每帧的数据，
//! 再通过 [`GpuDevice`](crate::gfx::GpuDevice) 交给 GPU。
//!
//! # 模块组织
//!
//! - `sync`：Fence 值与 Fence 管理器
//! - `upload`：CPU 可写的类型化缓冲区（常量缓冲区 256 字节对齐）
//! - `frame`：帧资源与帧资源环
//! - `constants`：与着色器一致的常量缓冲区布局
//! - `vertex`：顶点格式
//! - `item`：渲染项、几何体和材质

pub mod constants;
pub mod frame;
pub mod item;
pub mod sync;
pub mod upload;
pub mod vertex;

pub use constants::{Light, MaterialConstants, ObjectConstants, PassConstants, PassInputs};
pub use frame::{FrameResource, FrameResourceDesc, FrameResourceRing, DEFAULT_FRAME_RESOURCES};
pub use item::{Material, MeshGeometry, RenderItem, VertexSource};
pub use sync::{FenceManager, FenceValue};
pub use upload::UploadBuffer;
pub use vertex::{ColorVertex, LitVertex};
