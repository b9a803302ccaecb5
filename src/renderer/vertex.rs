//! 顶点数据定义
//!
//! 本模块定义了渲染管线使用的两种顶点结构体：
//!
//! - [`ColorVertex`]：位置 + RGBA 颜色，用于 Box、Shapes、LandAndWaves
//! - [`LitVertex`]：位置 + 法线，用于 LitWaves 的光照管线
//!
//! # 设计说明
//!
//! - 使用 `#[repr(C)]` 确保内存布局与着色器输入一致
//! - 实现 `Pod` 和 `Zeroable` trait 以支持零拷贝传输到 GPU

use bytemuck::{Pod, Zeroable};

use crate::geometry::Vertex as GeometryVertex;
use crate::math::Vector3;

/// 带颜色的顶点
///
/// # 内存布局
///
/// - `position`：前 12 字节（3 个 f32）
/// - `color`：后 16 字节（4 个 f32）
///
/// 总大小：28 字节
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ColorVertex {
    /// 顶点位置
    pub position: [f32; 3],
    /// 顶点颜色（RGBA，范围 0.0-1.0）
    pub color: [f32; 4],
}

impl ColorVertex {
    pub fn new(position: [f32; 3], color: [f32; 4]) -> Self {
        Self { position, color }
    }

    /// 从生成器顶点提取位置，使用统一颜色
    pub fn from_geometry(vertex: &GeometryVertex, color: [f32; 4]) -> Self {
        Self::new(vertex.position, color)
    }
}

/// 带法线的顶点
///
/// 总大小：24 字节
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct LitVertex {
    pub position: [f32; 3],
    pub normal: [f32; 3],
}

impl LitVertex {
    pub fn new(position: [f32; 3], normal: [f32; 3]) -> Self {
        Self { position, normal }
    }

    pub fn from_vectors(position: &Vector3, normal: &Vector3) -> Self {
        Self::new((*position).into(), (*normal).into())
    }
}

impl From<&GeometryVertex> for LitVertex {
    fn from(vertex: &GeometryVertex) -> Self {
        Self::new(vertex.position, vertex.normal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem;

    #[test]
    fn test_vertex_layout() {
        assert_eq!(mem::size_of::<ColorVertex>(), 28);
        assert_eq!(mem::size_of::<LitVertex>(), 24);
        assert_eq!(mem::align_of::<ColorVertex>(), 4);

        let vertex = ColorVertex::default();
        let base = &vertex as *const ColorVertex as usize;
        let color = &vertex.color as *const [f32; 4] as usize;
        assert_eq!(color - base, 12, "color should be at offset 12");
    }

    #[test]
    fn test_conversions() {
        let g = GeometryVertex::new([1.0, 2.0, 3.0], [0.0, 1.0, 0.0], [0.5, 0.5], [1.0, 0.0, 0.0]);

        let lit = LitVertex::from(&g);
        assert_eq!(lit.position, [1.0, 2.0, 3.0]);
        assert_eq!(lit.normal, [0.0, 1.0, 0.0]);

        let colored = ColorVertex::from_geometry(&g, [1.0, 0.0, 0.0, 1.0]);
        assert_eq!(colored.position, g.position);
        assert_eq!(colored.color, [1.0, 0.0, 0.0, 1.0]);

        let v = LitVertex::from_vectors(&Vector3::new(1.0, 0.0, 0.0), &Vector3::y());
        assert_eq!(v.normal, [0.0, 1.0, 0.0]);
    }
}
