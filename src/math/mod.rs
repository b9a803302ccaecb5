//! 统一的数学库模块
//!
//! 基于 `nalgebra`，提供图形编程常用的类型别名和辅助函数。
//!
//! # 模块组织
//!
//! - **基础类型**：Vector2/3/4, Matrix4
//! - **常量**：PI, HALF_PI, DEG_TO_RAD 等
//! - **工具函数**：clamp, lerp, 球坐标转换等
//! - **矩阵辅助函数**：平移、缩放、透视投影（深度范围 [0, 1]）、Look-At

pub use nalgebra::{Matrix4 as Mat4, Point3, Vector2 as Vec2, Vector3 as Vec3, Vector4 as Vec4};

// 类型别名，使用更简洁的名称
pub type Vector2 = Vec2<f32>;
pub type Vector3 = Vec3<f32>;
pub type Vector4 = Vec4<f32>;
pub type Matrix4 = Mat4<f32>;

/// 数学常量
pub mod constants {
    /// π
    pub const PI: f32 = std::f32::consts::PI;

    /// 2π
    pub const TAU: f32 = std::f32::consts::TAU;

    /// π/2
    pub const HALF_PI: f32 = std::f32::consts::FRAC_PI_2;

    /// π/4
    pub const QUARTER_PI: f32 = std::f32::consts::FRAC_PI_4;

    /// 角度转弧度的系数
    pub const DEG_TO_RAD: f32 = PI / 180.0;

    /// 浮点数比较的 epsilon
    pub const EPSILON: f32 = 1e-6;
}

/// 数学工具函数
pub mod utils {
    use super::*;

    /// 限制值在范围内
    pub fn clamp<T: PartialOrd>(value: T, min: T, max: T) -> T {
        if value < min {
            min
        } else if value > max {
            max
        } else {
            value
        }
    }

    /// 线性插值
    pub fn lerp(a: f32, b: f32, t: f32) -> f32 {
        a + (b - a) * t
    }

    /// 角度转弧度
    pub fn deg_to_rad(degrees: f32) -> f32 {
        degrees * constants::DEG_TO_RAD
    }

    /// 检查两个浮点数是否近似相等
    pub fn approx_eq(a: f32, b: f32, epsilon: f32) -> bool {
        (a - b).abs() < epsilon
    }

    /// 球坐标转笛卡尔坐标（y 轴朝上）
    ///
    /// `theta` 为绕 y 轴的方位角，`phi` 为与 +y 轴的夹角。
    pub fn spherical_to_cartesian(radius: f32, theta: f32, phi: f32) -> Vector3 {
        Vector3::new(
            radius * phi.sin() * theta.cos(),
            radius * phi.cos(),
            radius * phi.sin() * theta.sin(),
        )
    }

    /// 把矩阵转为列主序数组，用于上传到常量缓冲区
    pub fn to_cols_array(m: &Matrix4) -> [[f32; 4]; 4] {
        *m.as_ref()
    }
}

/// 矩阵辅助函数
pub mod matrix {
    use super::*;

    /// 创建平移矩阵
    pub fn translation(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_translation(&Vector3::new(x, y, z))
    }

    /// 创建缩放矩阵
    pub fn scaling(x: f32, y: f32, z: f32) -> Matrix4 {
        Matrix4::new_nonuniform_scaling(&Vector3::new(x, y, z))
    }

    /// 创建右手系透视投影矩阵，深度映射到 [0, 1]
    ///
    /// `nalgebra` 自带的透视矩阵映射到 OpenGL 的 [-1, 1]，
    /// D3D12 和 wgpu 都需要 [0, 1]。
    pub fn perspective(fov_y: f32, aspect: f32, near: f32, far: f32) -> Matrix4 {
        let f = 1.0 / (0.5 * fov_y).tan();
        let range = far / (near - far);
        #[rustfmt::skip]
        let m = Matrix4::new(
            f / aspect, 0.0, 0.0, 0.0,
            0.0, f, 0.0, 0.0,
            0.0, 0.0, range, range * near,
            0.0, 0.0, -1.0, 0.0,
        );
        m
    }

    /// 创建 Look-At 视图矩阵（右手系）
    pub fn look_at(eye: &Vector3, target: &Vector3, up: &Vector3) -> Matrix4 {
        Matrix4::look_at_rh(&Point3::from(*eye), &Point3::from(*target), up)
    }

    /// 求逆；不可逆时返回单位矩阵
    pub fn inverse_or_identity(m: &Matrix4) -> Matrix4 {
        m.try_inverse().unwrap_or_else(Matrix4::identity)
    }
}
