//! 游戏计时器
//!
//! 提供帧间隔、总运行时间和暂停功能，并统计每秒帧数。
//! 支持固定步长模式，便于无窗口运行和测试时得到可复现的结果。

use std::time::Instant;

/// 时间来源
#[derive(Debug, Clone, Copy)]
enum Clock {
    /// 真实时间
    Realtime { base: Instant, prev: Instant },
    /// 每次 tick 前进固定时长
    Fixed { step: f32 },
}

/// 游戏计时器
#[derive(Debug, Clone)]
pub struct GameTimer {
    clock: Clock,
    delta_time: f32,
    total_time: f32,
    paused_time: f32,
    stopped: bool,
    stop_at: Option<Instant>,
}

impl GameTimer {
    /// 使用真实时间的计时器
    pub fn realtime() -> Self {
        let now = Instant::now();
        Self {
            clock: Clock::Realtime { base: now, prev: now },
            delta_time: 0.0,
            total_time: 0.0,
            paused_time: 0.0,
            stopped: false,
            stop_at: None,
        }
    }

    /// 每帧固定前进 `step` 秒的计时器
    pub fn fixed(step: f32) -> Self {
        Self {
            clock: Clock::Fixed { step },
            delta_time: 0.0,
            total_time: 0.0,
            paused_time: 0.0,
            stopped: false,
            stop_at: None,
        }
    }

    /// 根据可选的固定步长创建
    pub fn new(fixed_step: Option<f32>) -> Self {
        match fixed_step {
            Some(step) => Self::fixed(step),
            None => Self::realtime(),
        }
    }

    /// 重置计时器（进入主循环前调用）
    pub fn reset(&mut self) {
        if let Clock::Realtime { base, prev } = &mut self.clock {
            let now = Instant::now();
            *base = now;
            *prev = now;
        }
        self.delta_time = 0.0;
        self.total_time = 0.0;
        self.paused_time = 0.0;
        self.stopped = false;
        self.stop_at = None;
    }

    /// 前进一帧
    pub fn tick(&mut self) {
        if self.stopped {
            self.delta_time = 0.0;
            return;
        }

        match &mut self.clock {
            Clock::Realtime { base, prev } => {
                let now = Instant::now();
                // 时钟可能因为休眠等原因不单调，负值截断为 0
                self.delta_time = now.saturating_duration_since(*prev).as_secs_f32();
                *prev = now;
                self.total_time =
                    now.saturating_duration_since(*base).as_secs_f32() - self.paused_time;
            }
            Clock::Fixed { step } => {
                self.delta_time = *step;
                self.total_time += *step;
            }
        }
    }

    /// 暂停
    pub fn stop(&mut self) {
        if !self.stopped {
            self.stopped = true;
            self.stop_at = Some(Instant::now());
        }
    }

    /// 恢复
    pub fn start(&mut self) {
        if !self.stopped {
            return;
        }
        if let (Clock::Realtime { prev, .. }, Some(stop_at)) = (&mut self.clock, self.stop_at) {
            let now = Instant::now();
            self.paused_time += now.saturating_duration_since(stop_at).as_secs_f32();
            *prev = now;
        }
        self.stopped = false;
        self.stop_at = None;
    }

    /// 本帧间隔（秒）
    pub fn delta_time(&self) -> f32 {
        self.delta_time
    }

    /// 不计暂停的总运行时间（秒）
    pub fn total_time(&self) -> f32 {
        self.total_time
    }

    /// 是否处于暂停状态
    pub fn is_stopped(&self) -> bool {
        self.stopped
    }
}

/// 帧率统计
///
/// 每累计满一秒（计时器时间）输出一次平均帧率和每帧毫秒数。
#[derive(Debug, Clone, Default)]
pub struct FrameStats {
    frame_count: u32,
    time_elapsed: f32,
    fps: f32,
    mspf: f32,
}

impl FrameStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// 记录一帧；返回 `true` 表示刚刚完成了一个统计窗口
    pub fn record(&mut self, total_time: f32) -> bool {
        self.frame_count += 1;

        if total_time - self.time_elapsed >= 1.0 {
            let window = total_time - self.time_elapsed;
            self.fps = self.frame_count as f32 / window;
            self.mspf = 1000.0 / self.fps;

            self.frame_count = 0;
            self.time_elapsed = total_time;
            return true;
        }
        false
    }

    pub fn fps(&self) -> f32 {
        self.fps
    }

    pub fn mspf(&self) -> f32 {
        self.mspf
    }
}
