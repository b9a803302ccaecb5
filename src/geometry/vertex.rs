/// 几何体顶点定义模块
///
/// 定义程序化几何生成使用的完整顶点结构，包含位置、法线、UV坐标和切线向量。
/// 示例程序会从它提取自己关心的属性（位置+颜色 或 位置+法线）。

use bytemuck::{Pod, Zeroable};

use crate::math::Vector3;

/// 完整的3D顶点结构
///
/// # 内存布局
///
/// - position: 12 bytes (3 * f32)
/// - normal: 12 bytes (3 * f32)
/// - texcoord: 8 bytes (2 * f32)
/// - tangent: 12 bytes (3 * f32)
/// - **总计**: 44 bytes
#[repr(C)]
#[derive(Default, Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Vertex {
    /// 顶点位置 (x, y, z)
    pub position: [f32; 3],

    /// 法线向量，归一化
    pub normal: [f32; 3],

    /// 纹理坐标 (u, v)
    pub texcoord: [f32; 2],

    /// 切线向量（沿 u 方向），归一化
    pub tangent: [f32; 3],
}

impl Vertex {
    /// 创建一个新的顶点
    #[inline]
    pub fn new(
        position: [f32; 3],
        normal: [f32; 3],
        texcoord: [f32; 2],
        tangent: [f32; 3],
    ) -> Self {
        Self {
            position,
            normal,
            texcoord,
            tangent,
        }
    }

    /// 按分量创建：位置、法线、切线、UV
    #[allow(clippy::too_many_arguments)]
    #[inline]
    pub fn from_components(
        px: f32, py: f32, pz: f32,
        nx: f32, ny: f32, nz: f32,
        tx: f32, ty: f32, tz: f32,
        u: f32, v: f32,
    ) -> Self {
        Self::new([px, py, pz], [nx, ny, nz], [u, v], [tx, ty, tz])
    }

    /// 位置向量
    #[inline]
    pub fn position_vec(&self) -> Vector3 {
        Vector3::from(self.position)
    }

    /// 法线向量
    #[inline]
    pub fn normal_vec(&self) -> Vector3 {
        Vector3::from(self.normal)
    }

    /// 切线向量
    #[inline]
    pub fn tangent_vec(&self) -> Vector3 {
        Vector3::from(self.tangent)
    }
}
