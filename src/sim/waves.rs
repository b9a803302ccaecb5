//! 波动方程高度场模拟
//!
//! 在 xz 平面的 m×n 网格上用有限差分求解带阻尼的二维波动方程：
//!
//! ```text
//! y(t+dt) = k1·y(t-dt) + k2·y(t) + k3·(四邻域 y(t) 之和)
//! ```
//!
//! 两个解网格交替充当"上一步"和"当前"，每步只交换索引，不复制数据。
//! 边界上的顶点固定不动。

use crate::core::config::SimulationConfig;
use crate::core::error::{Result, SimulationError};
use crate::math::Vector3;
use crate::sim_debug;

use super::stepper::FixedStepper;

/// 构造参数
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WaveParams {
    /// 行数 m
    pub rows: usize,
    /// 列数 n
    pub cols: usize,
    /// 相邻顶点间距 dx
    pub spatial_step: f32,
    /// 模拟时间步长 dt
    pub time_step: f32,
    /// 波速
    pub speed: f32,
    /// 阻尼系数
    pub damping: f32,
}

impl WaveParams {
    pub fn new(
        rows: usize,
        cols: usize,
        spatial_step: f32,
        time_step: f32,
        speed: f32,
        damping: f32,
    ) -> Self {
        Self {
            rows,
            cols,
            spatial_step,
            time_step,
            speed,
            damping,
        }
    }

    /// 检查构造前置条件
    pub fn validate(&self) -> std::result::Result<(), SimulationError> {
        fn invalid(name: &'static str, reason: String) -> SimulationError {
            SimulationError::InvalidParameter { name, reason }
        }

        if self.rows < 2 {
            return Err(invalid("rows", format!("must be > 1, got {}", self.rows)));
        }
        if self.cols < 2 {
            return Err(invalid("cols", format!("must be > 1, got {}", self.cols)));
        }
        if !(self.spatial_step.is_finite() && self.spatial_step > 0.0) {
            return Err(invalid(
                "spatial_step",
                format!("must be positive, got {}", self.spatial_step),
            ));
        }
        if !(self.time_step.is_finite() && self.time_step > 0.0) {
            return Err(invalid(
                "time_step",
                format!("must be positive, got {}", self.time_step),
            ));
        }
        if !(self.speed.is_finite() && self.speed >= 0.0) {
            return Err(invalid("speed", format!("must be >= 0, got {}", self.speed)));
        }
        if !(self.damping.is_finite() && self.damping >= 0.0) {
            return Err(invalid(
                "damping",
                format!("must be >= 0, got {}", self.damping),
            ));
        }
        Ok(())
    }
}

impl From<&SimulationConfig> for WaveParams {
    fn from(config: &SimulationConfig) -> Self {
        Self::new(
            config.rows,
            config.cols,
            config.spatial_step,
            config.time_step,
            config.wave_speed,
            config.damping,
        )
    }
}

/// 波动高度场
#[derive(Debug, Clone)]
pub struct Waves {
    rows: usize,
    cols: usize,

    spatial_step: f32,
    time_step: f32,

    // 有限差分系数，构造时计算一次
    k1: f32,
    k2: f32,
    k3: f32,

    solutions: [Vec<Vector3>; 2],
    /// `solutions[current]` 为当前解，另一个为上一步的解
    current: usize,

    normals: Vec<Vector3>,
    tangents: Vec<Vector3>,

    stepper: FixedStepper,
}

impl Waves {
    /// 创建平静的水面
    ///
    /// # Panics
    ///
    /// 参数不满足 [`WaveParams::validate`] 时 panic。
    /// 需要可恢复错误时使用 [`Waves::try_new`]。
    pub fn new(
        rows: usize,
        cols: usize,
        spatial_step: f32,
        time_step: f32,
        speed: f32,
        damping: f32,
    ) -> Self {
        let params = WaveParams::new(rows, cols, spatial_step, time_step, speed, damping);
        match Self::try_new(params) {
            Ok(waves) => waves,
            Err(e) => panic!("invalid wave parameters: {}", e),
        }
    }

    /// 按参数创建，参数非法时返回错误
    pub fn try_new(params: WaveParams) -> Result<Self> {
        params.validate()?;

        let WaveParams {
            rows,
            cols,
            spatial_step: dx,
            time_step: dt,
            speed,
            damping,
        } = params;

        let d = damping * dt + 2.0;
        let e = (speed * speed) * (dt * dt) / (dx * dx);
        let k1 = (damping * dt - 2.0) / d;
        let k2 = (4.0 - 8.0 * e) / d;
        let k3 = (2.0 * e) / d;

        let vertex_count = rows * cols;
        let half_width = (cols - 1) as f32 * dx * 0.5;
        let half_depth = (rows - 1) as f32 * dx * 0.5;

        let mut grid = Vec::with_capacity(vertex_count);
        for i in 0..rows {
            let z = half_depth - i as f32 * dx;
            for j in 0..cols {
                let x = -half_width + j as f32 * dx;
                grid.push(Vector3::new(x, 0.0, z));
            }
        }

        sim_debug!(rows, cols, k1, k2, k3, "Waves created");

        Ok(Self {
            rows,
            cols,
            spatial_step: dx,
            time_step: dt,
            k1,
            k2,
            k3,
            solutions: [grid.clone(), grid],
            current: 0,
            normals: vec![Vector3::y(); vertex_count],
            tangents: vec![Vector3::x(); vertex_count],
            stepper: FixedStepper::new(dt),
        })
    }

    /// 按模拟配置创建
    pub fn from_config(config: &SimulationConfig) -> Result<Self> {
        Self::try_new(WaveParams::from(config))
    }

    #[inline]
    pub fn row_count(&self) -> usize {
        self.rows
    }

    #[inline]
    pub fn column_count(&self) -> usize {
        self.cols
    }

    #[inline]
    pub fn vertex_count(&self) -> usize {
        self.rows * self.cols
    }

    #[inline]
    pub fn triangle_count(&self) -> usize {
        (self.rows - 1) * (self.cols - 1) * 2
    }

    pub fn width(&self) -> f32 {
        self.cols as f32 * self.spatial_step
    }

    pub fn depth(&self) -> f32 {
        self.rows as f32 * self.spatial_step
    }

    pub fn spatial_step(&self) -> f32 {
        self.spatial_step
    }

    pub fn time_step(&self) -> f32 {
        self.time_step
    }

    /// 有限差分系数 `(k1, k2, k3)`
    pub fn coefficients(&self) -> (f32, f32, f32) {
        (self.k1, self.k2, self.k3)
    }

    /// 第 k 个顶点的位置，`k = i * cols + j`
    #[inline]
    pub fn position(&self, k: usize) -> Vector3 {
        self.solutions[self.current][k]
    }

    /// 第 k 个顶点的法线
    #[inline]
    pub fn normal(&self, k: usize) -> Vector3 {
        self.normals[k]
    }

    /// 第 k 个顶点沿 +x 方向的切线
    #[inline]
    pub fn tangent_x(&self, k: usize) -> Vector3 {
        self.tangents[k]
    }

    pub fn positions(&self) -> &[Vector3] {
        &self.solutions[self.current]
    }

    pub fn normals(&self) -> &[Vector3] {
        &self.normals
    }

    pub fn tangents(&self) -> &[Vector3] {
        &self.tangents
    }

    /// 推进 `dt` 秒
    ///
    /// 按 `time_step` 固定步长执行 [`Waves::step`]，不足一步的时间留到下次。
    /// 返回本次执行的步数。
    pub fn update(&mut self, dt: f32) -> u32 {
        let steps = self.stepper.advance(dt);
        for _ in 0..steps {
            self.step();
        }
        steps
    }

    /// 执行一个有限差分时间步，并重新计算法线和切线
    pub fn step(&mut self) {
        let (rows, cols) = (self.rows, self.cols);
        let (k1, k2, k3) = (self.k1, self.k2, self.k3);

        let (first, second) = self.solutions.split_at_mut(1);
        let (curr, prev) = if self.current == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        };

        // 下一步的解直接写进上一步的存储，边界保持不变
        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                let k = i * cols + j;
                prev[k].y = k1 * prev[k].y
                    + k2 * curr[k].y
                    + k3 * (curr[k + cols].y + curr[k - cols].y + curr[k + 1].y + curr[k - 1].y);
            }
        }

        self.current = 1 - self.current;
        self.update_shading_vectors();
    }

    /// 在内部顶点 (i, j) 处激起波纹
    ///
    /// 该点抬高 `magnitude / 2`，上下左右四个邻点各抬高 `magnitude / 4`。
    ///
    /// # Panics
    ///
    /// 要求 `1 <= i <= rows - 2` 且 `1 <= j <= cols - 2`。
    pub fn disturb(&mut self, i: usize, j: usize, magnitude: f32) {
        assert!(
            i >= 1 && i + 2 <= self.rows,
            "disturb row {} outside interior 1..={}",
            i,
            self.rows.saturating_sub(2)
        );
        assert!(
            j >= 1 && j + 2 <= self.cols,
            "disturb column {} outside interior 1..={}",
            j,
            self.cols.saturating_sub(2)
        );

        let cols = self.cols;
        let half = 0.5 * magnitude;
        let quarter = 0.25 * magnitude;

        let curr = &mut self.solutions[self.current];
        let k = i * cols + j;
        curr[k].y += half;
        curr[k + 1].y += quarter;
        curr[k - 1].y += quarter;
        curr[k + cols].y += quarter;
        curr[k - cols].y += quarter;
    }

    /// 中心差分求内部顶点的法线和 x 切线
    fn update_shading_vectors(&mut self) {
        let (rows, cols) = (self.rows, self.cols);
        let two_dx = 2.0 * self.spatial_step;
        let curr = &self.solutions[self.current];

        for i in 1..rows - 1 {
            for j in 1..cols - 1 {
                let k = i * cols + j;
                let l = curr[k - 1].y;
                let r = curr[k + 1].y;
                let t = curr[k - cols].y;
                let b = curr[k + cols].y;

                self.normals[k] = Vector3::new(l - r, two_dx, b - t).normalize();
                self.tangents[k] = Vector3::new(two_dx, r - l, 0.0).normalize();
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn reference() -> Waves {
        Waves::new(4, 4, 1.0, 0.03, 4.0, 0.2)
    }

    fn abs_sum(waves: &Waves) -> f32 {
        waves.positions().iter().map(|p| p.y.abs()).sum()
    }

    #[test]
    fn test_counts() {
        for &(m, n) in &[(2, 2), (4, 4), (3, 7), (128, 128)] {
            let waves = Waves::new(m, n, 0.5, 0.01, 2.0, 0.1);
            assert_eq!(waves.vertex_count(), m * n);
            assert_eq!(waves.triangle_count(), (m - 1) * (n - 1) * 2);
            assert_eq!(waves.positions().len(), m * n);
        }
    }

    #[test]
    fn test_coefficients() {
        let waves = reference();
        let (k1, k2, k3) = waves.coefficients();

        let d = 0.2 * 0.03 + 2.0;
        let e = 16.0 * 0.03 * 0.03;
        assert!((k1 - (0.2 * 0.03 - 2.0) / d).abs() < 1e-6);
        assert!((k2 - (4.0 - 8.0 * e) / d).abs() < 1e-6);
        assert!((k3 - 2.0 * e / d).abs() < 1e-6);
    }

    #[test]
    fn test_flat_initial_state() {
        let waves = Waves::new(5, 6, 2.0, 0.03, 4.0, 0.2);

        for k in 0..waves.vertex_count() {
            assert_eq!(waves.position(k).y, 0.0);
            assert_eq!(waves.normal(k), Vector3::new(0.0, 1.0, 0.0));
            assert_eq!(waves.tangent_x(k), Vector3::new(1.0, 0.0, 0.0));
        }

        // 以原点为中心，第一行在 +z
        assert_eq!(waves.position(0), Vector3::new(-5.0, 0.0, 4.0));
        assert_eq!(waves.position(29), Vector3::new(5.0, 0.0, -4.0));
        assert_eq!(waves.width(), 12.0);
        assert_eq!(waves.depth(), 10.0);
    }

    #[test]
    fn test_disturb_reference_grid() {
        let mut waves = reference();
        waves.disturb(2, 2, 1.0);

        for k in 0..16 {
            let expected = match k {
                10 => 0.5,
                6 | 14 | 9 | 11 => 0.25,
                _ => 0.0,
            };
            assert_eq!(waves.position(k).y, expected, "vertex {}", k);
        }
    }

    #[test]
    fn test_disturb_accumulates() {
        let mut waves = Waves::new(8, 8, 1.0, 0.03, 4.0, 0.2);
        waves.disturb(3, 3, 0.4);
        waves.disturb(3, 4, 0.4);

        assert!((waves.position(3 * 8 + 3).y - 0.3).abs() < 1e-6);
        assert!((waves.position(3 * 8 + 4).y - 0.3).abs() < 1e-6);
        assert!((waves.position(3 * 8 + 5).y - 0.1).abs() < 1e-6);
    }

    #[test]
    #[should_panic(expected = "outside interior")]
    fn test_disturb_on_boundary_panics() {
        let mut waves = reference();
        waves.disturb(0, 2, 1.0);
    }

    #[test]
    #[should_panic(expected = "outside interior")]
    fn test_disturb_past_last_interior_column_panics() {
        let mut waves = reference();
        waves.disturb(1, 3, 1.0);
    }

    #[test]
    #[should_panic(expected = "invalid wave parameters")]
    fn test_new_rejects_degenerate_grid() {
        Waves::new(1, 4, 1.0, 0.03, 4.0, 0.2);
    }

    #[test]
    fn test_try_new_reports_parameter() {
        let params = WaveParams::new(4, 4, 1.0, 0.0, 4.0, 0.2);
        match Waves::try_new(params) {
            Err(crate::core::WaveRenderError::Simulation(SimulationError::InvalidParameter {
                name,
                ..
            })) => assert_eq!(name, "time_step"),
            other => panic!("unexpected result: {:?}", other.map(|w| w.vertex_count())),
        }

        let params = WaveParams::new(4, 4, -1.0, 0.03, 4.0, 0.2);
        assert!(Waves::try_new(params).is_err());
    }

    #[test]
    fn test_zero_field_is_fixed_point() {
        let mut waves = Waves::new(16, 16, 1.0, 0.03, 4.0, 0.2);
        for _ in 0..100 {
            waves.update(0.03);
        }

        assert!(waves.positions().iter().all(|p| p.y == 0.0));
        assert!(waves.normals().iter().all(|n| *n == Vector3::y()));
    }

    #[test]
    fn test_boundary_is_fixed() {
        let mut waves = Waves::new(10, 10, 1.0, 0.03, 4.0, 0.2);
        waves.disturb(1, 1, 2.0);
        for _ in 0..200 {
            waves.step();
        }

        for i in 0..10 {
            for j in 0..10 {
                if i == 0 || j == 0 || i == 9 || j == 9 {
                    let k = i * 10 + j;
                    // (0,1) 和 (1,0) 在扰动时被抬高过，之后保持不变
                    let expected = if k == 1 || k == 10 { 0.5 } else { 0.0 };
                    assert_eq!(waves.position(k).y, expected, "vertex {}", k);
                    assert_eq!(waves.normal(k), Vector3::y());
                }
            }
        }
    }

    #[test]
    fn test_disturbance_propagates_and_tilts_normals() {
        let mut waves = Waves::new(16, 16, 1.0, 0.03, 4.0, 0.2);
        waves.disturb(8, 8, 1.0);
        for _ in 0..20 {
            waves.step();
        }

        // 波纹传到三格之外
        assert!(waves.position(8 * 16 + 11).y.abs() > 0.0);

        let tilted = waves.normals().iter().filter(|n| n.x != 0.0 || n.z != 0.0).count();
        assert!(tilted > 0);
        for n in waves.normals() {
            assert!((n.norm() - 1.0).abs() < 1e-5);
            assert!(n.y > 0.0);
        }
        for t in waves.tangents() {
            assert!((t.norm() - 1.0).abs() < 1e-5);
            assert_eq!(t.z, 0.0);
        }
    }

    #[test]
    fn test_normal_is_orthogonal_to_tangent() {
        let mut waves = Waves::new(12, 12, 0.5, 0.03, 4.0, 0.2);
        waves.disturb(5, 6, 0.8);
        for _ in 0..30 {
            waves.step();
        }

        for k in 0..waves.vertex_count() {
            assert!(waves.normal(k).dot(&waves.tangent_x(k)).abs() < 1e-5);
        }
    }

    #[test]
    fn test_damped_energy_decays() {
        let mut waves = Waves::new(32, 32, 1.0, 0.03, 4.0, 0.2);
        waves.disturb(16, 16, 1.0);

        let early = (0..100)
            .map(|_| {
                waves.step();
                abs_sum(&waves)
            })
            .fold(0.0f32, f32::max);

        for _ in 0..1000 {
            waves.step();
        }

        let late = (0..100)
            .map(|_| {
                waves.step();
                abs_sum(&waves)
            })
            .fold(0.0f32, f32::max);

        assert!(late.is_finite());
        assert!(late < 0.5 * early, "late {} vs early {}", late, early);
        assert!(waves.positions().iter().all(|p| p.y.abs() <= 1.0));
    }

    #[test]
    fn test_update_uses_fixed_steps() {
        let mut waves = reference();

        assert_eq!(waves.update(0.01), 0);
        assert_eq!(waves.update(0.01), 0);
        assert_eq!(waves.update(0.015), 1);
        assert_eq!(waves.update(0.07), 2);
    }

    #[test]
    fn test_identical_sequences_are_deterministic() {
        let run = || {
            let mut waves = Waves::new(20, 24, 1.0, 0.03, 4.0, 0.2);
            for frame in 0..300 {
                if frame % 7 == 0 {
                    waves.disturb(1 + frame % 18, 1 + frame % 22, 0.3);
                }
                waves.update(1.0 / 60.0);
            }
            waves
        };

        let a = run();
        let b = run();
        assert_eq!(a.positions(), b.positions());
        assert_eq!(a.normals(), b.normals());
    }
}
