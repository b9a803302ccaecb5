//! GPU 常量缓冲区布局
//!
//! 这些结构体会被直接复制到常量缓冲区，字段顺序和填充必须与
//! `src/gfx/shaders/*.wgsl` 中的声明一致。矩阵按列主序存放，
//! 与 nalgebra 和 WGSL 的约定相同，上传时无需转置。

use bytemuck::{Pod, Zeroable};

use crate::math::{matrix, utils::to_cols_array, Matrix4, Vector3};

/// 通道常量中的灯光数量上限
pub const MAX_LIGHTS: usize = 16;

/// 着色器实际使用的方向光数量
pub const NUM_DIR_LIGHTS: usize = 3;

type Mat = [[f32; 4]; 4];

const IDENTITY: Mat = [
    [1.0, 0.0, 0.0, 0.0],
    [0.0, 1.0, 0.0, 0.0],
    [0.0, 0.0, 1.0, 0.0],
    [0.0, 0.0, 0.0, 1.0],
];

/// 每个物体的常量
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct ObjectConstants {
    pub world: Mat,
}

impl ObjectConstants {
    pub fn new(world: &Matrix4) -> Self {
        Self {
            world: to_cols_array(world),
        }
    }
}

impl Default for ObjectConstants {
    fn default() -> Self {
        Self { world: IDENTITY }
    }
}

/// 灯光
///
/// 方向光、点光源和聚光灯共用同一布局，48 字节。
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct Light {
    pub strength: [f32; 3],
    /// 仅点光源/聚光灯
    pub falloff_start: f32,
    /// 仅方向光/聚光灯
    pub direction: [f32; 3],
    /// 仅点光源/聚光灯
    pub falloff_end: f32,
    /// 仅点光源/聚光灯
    pub position: [f32; 3],
    /// 仅聚光灯
    pub spot_power: f32,
}

impl Default for Light {
    fn default() -> Self {
        Self {
            strength: [0.5, 0.5, 0.5],
            falloff_start: 1.0,
            direction: [0.0, -1.0, 0.0],
            falloff_end: 10.0,
            position: [0.0, 0.0, 0.0],
            spot_power: 64.0,
        }
    }
}

impl Light {
    /// 方向光
    pub fn directional(direction: Vector3, strength: [f32; 3]) -> Self {
        Self {
            direction: direction.into(),
            strength,
            ..Self::default()
        }
    }

    /// 不发光的占位灯
    pub fn off() -> Self {
        Self {
            strength: [0.0; 3],
            ..Self::default()
        }
    }
}

/// 每个渲染通道的常量
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct PassConstants {
    pub view: Mat,
    pub inv_view: Mat,
    pub proj: Mat,
    pub inv_proj: Mat,
    pub view_proj: Mat,
    pub inv_view_proj: Mat,
    pub eye_pos_w: [f32; 3],
    pub pad0: f32,
    pub render_target_size: [f32; 2],
    pub inv_render_target_size: [f32; 2],
    pub near_z: f32,
    pub far_z: f32,
    pub total_time: f32,
    pub delta_time: f32,
    pub ambient_light: [f32; 4],
    pub lights: [Light; MAX_LIGHTS],
}

impl Default for PassConstants {
    fn default() -> Self {
        Self {
            view: IDENTITY,
            inv_view: IDENTITY,
            proj: IDENTITY,
            inv_proj: IDENTITY,
            view_proj: IDENTITY,
            inv_view_proj: IDENTITY,
            eye_pos_w: [0.0; 3],
            pad0: 0.0,
            render_target_size: [0.0; 2],
            inv_render_target_size: [0.0; 2],
            near_z: 0.0,
            far_z: 0.0,
            total_time: 0.0,
            delta_time: 0.0,
            ambient_light: [0.0, 0.0, 0.0, 1.0],
            lights: [Light::off(); MAX_LIGHTS],
        }
    }
}

/// 相机和计时信息，用于填写 [`PassConstants`]
#[derive(Debug, Clone, Copy)]
pub struct PassInputs {
    pub view: Matrix4,
    pub proj: Matrix4,
    pub eye: Vector3,
    pub width: u32,
    pub height: u32,
    pub near_z: f32,
    pub far_z: f32,
    pub total_time: f32,
    pub delta_time: f32,
}

impl PassConstants {
    /// 由相机矩阵和目标尺寸计算所有派生矩阵
    ///
    /// 灯光和环境光保持默认，由调用方设置。
    pub fn from_inputs(inputs: &PassInputs) -> Self {
        let view_proj = inputs.proj * inputs.view;
        let (w, h) = (inputs.width.max(1) as f32, inputs.height.max(1) as f32);

        Self {
            view: to_cols_array(&inputs.view),
            inv_view: to_cols_array(&matrix::inverse_or_identity(&inputs.view)),
            proj: to_cols_array(&inputs.proj),
            inv_proj: to_cols_array(&matrix::inverse_or_identity(&inputs.proj)),
            view_proj: to_cols_array(&view_proj),
            inv_view_proj: to_cols_array(&matrix::inverse_or_identity(&view_proj)),
            eye_pos_w: inputs.eye.into(),
            render_target_size: [w, h],
            inv_render_target_size: [1.0 / w, 1.0 / h],
            near_z: inputs.near_z,
            far_z: inputs.far_z,
            total_time: inputs.total_time,
            delta_time: inputs.delta_time,
            ..Self::default()
        }
    }
}

/// 材质常量
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq, Pod, Zeroable)]
pub struct MaterialConstants {
    pub diffuse_albedo: [f32; 4],
    pub fresnel_r0: [f32; 3],
    pub roughness: f32,
    pub mat_transform: Mat,
}

impl Default for MaterialConstants {
    fn default() -> Self {
        Self {
            diffuse_albedo: [1.0, 1.0, 1.0, 1.0],
            fresnel_r0: [0.01, 0.01, 0.01],
            roughness: 0.25,
            mat_transform: IDENTITY,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::mem::size_of;

    #[test]
    fn test_layout_sizes() {
        assert_eq!(size_of::<ObjectConstants>(), 64);
        assert_eq!(size_of::<Light>(), 48);
        assert_eq!(size_of::<MaterialConstants>(), 96);
        // 6 个矩阵 + eye/pad + 尺寸 + 4 个标量 + 环境光 + 灯光
        assert_eq!(size_of::<PassConstants>(), 6 * 64 + 16 + 16 + 16 + 16 + 48 * MAX_LIGHTS);
    }

    #[test]
    fn test_pass_constants_from_inputs() {
        let view = matrix::look_at(
            &Vector3::new(0.0, 5.0, -10.0),
            &Vector3::zeros(),
            &Vector3::y(),
        );
        let proj = matrix::perspective(std::f32::consts::FRAC_PI_4, 2.0, 1.0, 1000.0);
        let pass = PassConstants::from_inputs(&PassInputs {
            view,
            proj,
            eye: Vector3::new(0.0, 5.0, -10.0),
            width: 800,
            height: 400,
            near_z: 1.0,
            far_z: 1000.0,
            total_time: 2.0,
            delta_time: 0.5,
        });

        assert_eq!(pass.render_target_size, [800.0, 400.0]);
        assert_eq!(pass.inv_render_target_size, [1.0 / 800.0, 1.0 / 400.0]);
        assert_eq!(pass.view_proj, to_cols_array(&(proj * view)));

        let round_trip = Matrix4::from(pass.view) * Matrix4::from(pass.inv_view);
        assert!((round_trip - Matrix4::identity()).norm() < 1e-4);
        assert_eq!(pass.lights[0].strength, [0.0; 3]);
    }

    #[test]
    fn test_object_constants_column_major() {
        let c = ObjectConstants::new(&matrix::translation(1.0, 2.0, 3.0));
        // 平移位于第 4 列
        assert_eq!(c.world[3], [1.0, 2.0, 3.0, 1.0]);
        assert_eq!(ObjectConstants::default().world, IDENTITY);
    }
}
