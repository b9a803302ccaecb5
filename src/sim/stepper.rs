//! 固定步长驱动与随机扰动调度
//!
//! 帧间隔并不恒定，而有限差分系数是按固定的 `dt` 预先算好的，
//! 所以模拟按固定步长推进，剩余时间累积到下一帧。

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::core::config::SimulationConfig;
use crate::sim_debug;

use super::waves::Waves;

/// 单次 `advance` 最多执行的步数
///
/// 长时间卡顿后不追赶全部积压的时间，避免越追越慢。
pub const MAX_STEPS_PER_ADVANCE: u32 = 8;

/// 固定步长累加器
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FixedStepper {
    step: f32,
    accumulator: f32,
}

impl FixedStepper {
    pub fn new(step: f32) -> Self {
        debug_assert!(step > 0.0);
        Self {
            step,
            accumulator: 0.0,
        }
    }

    #[inline]
    pub fn step(&self) -> f32 {
        self.step
    }

    /// 尚未消耗的时间
    #[inline]
    pub fn pending(&self) -> f32 {
        self.accumulator
    }

    /// 累积 `dt` 秒，返回应执行的步数
    ///
    /// 负数或非有限的 `dt` 视为 0。
    pub fn advance(&mut self, dt: f32) -> u32 {
        if dt.is_finite() && dt > 0.0 {
            self.accumulator += dt;
        }

        let mut steps = 0;
        while self.accumulator >= self.step {
            if steps == MAX_STEPS_PER_ADVANCE {
                sim_debug!(dropped = self.accumulator, "Step backlog dropped");
                self.accumulator = 0.0;
                break;
            }
            self.accumulator -= self.step;
            steps += 1;
        }
        steps
    }

    pub fn reset(&mut self) {
        self.accumulator = 0.0;
    }
}

/// 随机扰动调度器
///
/// 每隔 `interval` 秒在远离边界的内部随机位置激起一次波纹。
/// 使用固定种子的 `StdRng`，相同的种子和调用序列得到相同的水面。
#[derive(Debug, Clone)]
pub struct RandomDisturber {
    rng: StdRng,
    interval: f32,
    magnitude: (f32, f32),
    margin: usize,
    last_time: f32,
}

impl RandomDisturber {
    /// 扰动位置到边界的最小距离
    pub const DEFAULT_MARGIN: usize = 4;

    pub fn new(seed: u64, interval: f32, magnitude: (f32, f32)) -> Self {
        let (lo, hi) = magnitude;
        Self {
            rng: StdRng::seed_from_u64(seed),
            interval,
            magnitude: (lo.min(hi), lo.max(hi)),
            margin: Self::DEFAULT_MARGIN,
            last_time: 0.0,
        }
    }

    pub fn from_config(config: &SimulationConfig) -> Self {
        let [lo, hi] = config.disturb_magnitude;
        Self::new(config.seed, config.disturb_interval, (lo, hi))
    }

    /// 修改边界留白
    pub fn with_margin(mut self, margin: usize) -> Self {
        self.margin = margin.max(1);
        self
    }

    /// 根据总时间决定是否扰动
    ///
    /// 距离上次扰动超过 `interval` 时扰动一次，返回扰动位置和幅度。
    /// 网格太小放不下留白时不扰动。
    pub fn maybe_disturb(
        &mut self,
        waves: &mut Waves,
        total_time: f32,
    ) -> Option<(usize, usize, f32)> {
        if total_time - self.last_time < self.interval {
            return None;
        }
        self.last_time += self.interval;
        if total_time - self.last_time >= self.interval {
            // 跳过积压的间隔
            self.last_time = total_time;
        }

        let (rows, cols) = (waves.row_count(), waves.column_count());
        if rows < 2 * self.margin + 1 || cols < 2 * self.margin + 1 {
            return None;
        }

        let i = self.rng.gen_range(self.margin..=rows - self.margin - 1);
        let j = self.rng.gen_range(self.margin..=cols - self.margin - 1);
        let (lo, hi) = self.magnitude;
        let magnitude = if hi > lo { self.rng.gen_range(lo..hi) } else { lo };

        waves.disturb(i, j, magnitude);
        sim_debug!(i, j, magnitude, total_time, "Waves disturbed");
        Some((i, j, magnitude))
    }
}
