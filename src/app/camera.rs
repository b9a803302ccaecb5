//! 环绕相机
//!
//! 相机位于以原点为中心的球面上，始终看向原点。
//! 鼠标左键拖动改变方位角和极角，右键拖动改变半径。

use crate::math::{constants, matrix, utils, Matrix4, Vector3};

/// 每像素旋转的角度（度）
pub const ORBIT_DEGREES_PER_PIXEL: f32 = 0.25;

/// 极角离开两极的最小距离
const PHI_MARGIN: f32 = 0.1;

/// 环绕相机
#[derive(Debug, Clone, PartialEq)]
pub struct OrbitCamera {
    /// 绕 y 轴的方位角
    pub theta: f32,
    /// 与 +y 轴的夹角
    pub phi: f32,
    pub radius: f32,
    min_radius: f32,
    max_radius: f32,
    /// 每像素的半径变化
    zoom_per_pixel: f32,

    pub fov_y: f32,
    pub near_z: f32,
    pub far_z: f32,
}

impl OrbitCamera {
    /// 初始半径不受默认缩放范围限制，直到第一次缩放
    pub fn new(theta: f32, phi: f32, radius: f32) -> Self {
        Self {
            theta,
            phi: utils::clamp(phi, PHI_MARGIN, constants::PI - PHI_MARGIN),
            radius,
            min_radius: 3.0,
            max_radius: 15.0,
            zoom_per_pixel: 0.005,
            fov_y: constants::QUARTER_PI,
            near_z: 1.0,
            far_z: 1000.0,
        }
    }

    /// 半径范围和缩放速度
    pub fn with_zoom(mut self, min_radius: f32, max_radius: f32, per_pixel: f32) -> Self {
        self.min_radius = min_radius.min(max_radius);
        self.max_radius = max_radius.max(min_radius);
        self.zoom_per_pixel = per_pixel;
        self.clamp();
        self
    }

    /// 拖动旋转，`dx`/`dy` 为鼠标移动的像素数
    pub fn orbit(&mut self, dx: f32, dy: f32) {
        self.theta += utils::deg_to_rad(ORBIT_DEGREES_PER_PIXEL * dx);
        self.phi += utils::deg_to_rad(ORBIT_DEGREES_PER_PIXEL * dy);
        self.clamp();
    }

    /// 拖动缩放
    pub fn zoom(&mut self, dx: f32, dy: f32) {
        self.radius += self.zoom_per_pixel * (dx - dy);
        self.clamp();
    }

    fn clamp(&mut self) {
        self.phi = utils::clamp(self.phi, PHI_MARGIN, constants::PI - PHI_MARGIN);
        self.radius = utils::clamp(self.radius, self.min_radius, self.max_radius);
    }

    pub fn eye(&self) -> Vector3 {
        utils::spherical_to_cartesian(self.radius, self.theta, self.phi)
    }

    pub fn view(&self) -> Matrix4 {
        matrix::look_at(&self.eye(), &Vector3::zeros(), &Vector3::y())
    }

    pub fn proj(&self, aspect: f32) -> Matrix4 {
        matrix::perspective(self.fov_y, aspect, self.near_z, self.far_z)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_eye_on_sphere() {
        let camera = OrbitCamera::new(1.5 * constants::PI, constants::HALF_PI, 5.0);
        let eye = camera.eye();
        assert!((eye.norm() - 5.0).abs() < 1e-5);
        // theta = 1.5π 时相机位于 -z 方向
        assert!(eye.z < -4.9);
        assert!(eye.y.abs() < 1e-5);
    }

    #[test]
    fn test_orbit_and_clamp() {
        let mut camera = OrbitCamera::new(0.0, constants::HALF_PI, 5.0);
        camera.orbit(4.0, 0.0);
        assert!((camera.theta - utils::deg_to_rad(1.0)).abs() < 1e-6);

        camera.orbit(0.0, 10_000.0);
        assert!((camera.phi - (constants::PI - 0.1)).abs() < 1e-6);
        camera.orbit(0.0, -10_000.0);
        assert!((camera.phi - 0.1).abs() < 1e-6);
    }

    #[test]
    fn test_zoom_clamps_radius() {
        let mut camera = OrbitCamera::new(0.0, 1.0, 50.0).with_zoom(5.0, 150.0, 0.2);
        assert_eq!(camera.radius, 50.0);

        camera.zoom(100.0, 0.0);
        assert!((camera.radius - 70.0).abs() < 1e-4);
        camera.zoom(10_000.0, 0.0);
        assert_eq!(camera.radius, 150.0);
        camera.zoom(0.0, 10_000.0);
        assert_eq!(camera.radius, 5.0);
    }

    #[test]
    fn test_view_looks_at_origin() {
        let camera = OrbitCamera::new(1.0, 1.0, 10.0);
        let origin = camera.view() * crate::math::Vector4::new(0.0, 0.0, 0.0, 1.0);
        // 右手系视图空间中，目标位于 -z
        assert!(origin.x.abs() < 1e-4 && origin.y.abs() < 1e-4);
        assert!((origin.z + 10.0).abs() < 1e-4);
    }
}
