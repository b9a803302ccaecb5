//! 山丘地形
//!
//! 解析的高度函数 `y = 0.3·(z·sin(0.1x) + x·cos(0.1z))`，以及按高度着色。

use crate::geometry::{GeometryGenerator, MeshData};
use crate::math::Vector3;

/// 地形网格边长
pub const LAND_SIZE: f32 = 160.0;

/// 地形网格每边顶点数
pub const LAND_RESOLUTION: u32 = 50;

/// 点 (x, z) 处的山丘高度
#[inline]
pub fn hills_height(x: f32, z: f32) -> f32 {
    0.3 * (z * (0.1 * x).sin() + x * (0.1 * z).cos())
}

/// 点 (x, z) 处的单位法线 `normalize(-∂y/∂x, 1, -∂y/∂z)`
pub fn hills_normal(x: f32, z: f32) -> Vector3 {
    Vector3::new(
        -0.03 * z * (0.1 * x).cos() - 0.3 * (0.1 * z).cos(),
        1.0,
        -0.3 * (0.1 * x).sin() + 0.03 * x * (0.1 * z).sin(),
    )
    .normalize()
}

/// 按高度选取地形颜色
///
/// 沙滩、浅绿、深绿、棕色山地、雪顶。
pub fn height_color(y: f32) -> [f32; 4] {
    if y < -10.0 {
        [1.0, 0.96, 0.62, 1.0]
    } else if y < 5.0 {
        [0.48, 0.77, 0.46, 1.0]
    } else if y < 12.0 {
        [0.1, 0.48, 0.19, 1.0]
    } else if y < 20.0 {
        [0.45, 0.39, 0.34, 1.0]
    } else {
        [1.0, 1.0, 1.0, 1.0]
    }
}

/// 生成山丘网格
///
/// 在 160×160 的 50×50 网格上套用高度函数，法线和切线按解析梯度重新计算。
pub fn build_hills() -> MeshData {
    let mut mesh =
        GeometryGenerator::create_grid(LAND_SIZE, LAND_SIZE, LAND_RESOLUTION, LAND_RESOLUTION);
    mesh.name = Some("hills".to_string());

    for vertex in &mut mesh.vertices {
        let [x, _, z] = vertex.position;
        let normal = hills_normal(x, z);
        // 沿 +x 的切线 (1, ∂y/∂x, 0)，与法线正交
        let tangent = Vector3::new(1.0, -normal.x / normal.y, 0.0).normalize();

        vertex.position[1] = hills_height(x, z);
        vertex.normal = normal.into();
        vertex.tangent = tangent.into();
    }

    mesh
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_height_at_origin() {
        assert_eq!(hills_height(0.0, 0.0), 0.0);
        assert!((hills_height(10.0, 0.0) - 3.0).abs() < 1e-5);
    }

    #[test]
    fn test_normal_matches_gradient() {
        let h = 1e-2;
        for &(x, z) in &[(0.0, 0.0), (12.5, -30.0), (-47.0, 61.0), (80.0, 80.0)] {
            let dydx = (hills_height(x + h, z) - hills_height(x - h, z)) / (2.0 * h);
            let dydz = (hills_height(x, z + h) - hills_height(x, z - h)) / (2.0 * h);
            let expected = Vector3::new(-dydx, 1.0, -dydz).normalize();

            let n = hills_normal(x, z);
            assert!((n - expected).norm() < 1e-2, "({}, {}): {:?} vs {:?}", x, z, n, expected);
            assert!((n.norm() - 1.0).abs() < 1e-5);
        }
    }

    #[test]
    fn test_height_color_bands() {
        assert_eq!(height_color(-20.0), [1.0, 0.96, 0.62, 1.0]);
        assert_eq!(height_color(-10.0), [0.48, 0.77, 0.46, 1.0]);
        assert_eq!(height_color(4.99), [0.48, 0.77, 0.46, 1.0]);
        assert_eq!(height_color(5.0), [0.1, 0.48, 0.19, 1.0]);
        assert_eq!(height_color(15.0), [0.45, 0.39, 0.34, 1.0]);
        assert_eq!(height_color(20.0), [1.0, 1.0, 1.0, 1.0]);
    }

    #[test]
    fn test_build_hills() {
        let mesh = build_hills();
        let n = LAND_RESOLUTION as usize;

        assert_eq!(mesh.vertex_count(), n * n);
        assert_eq!(mesh.triangle_count(), (n - 1) * (n - 1) * 2);
        assert!(mesh.indices16().is_some());

        for v in &mesh.vertices {
            let [x, y, z] = v.position;
            assert!((y - hills_height(x, z)).abs() < 1e-5);
            assert!(v.normal_vec().dot(&v.tangent_vec()).abs() < 1e-5);
        }
    }
}
