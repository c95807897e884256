//! 控制周期诊断计数
//!
//! 会话状态独占，单线程更新，所以直接用普通整数而不是原子计数器。

use serde::Serialize;

/// 控制周期诊断计数器
#[derive(Debug, Clone, Default)]
pub struct CycleDiagnostics {
    /// 执行过的控制周期数
    pub cycles: u64,

    /// 发出的 HCA_01 帧数
    pub steering_frames: u64,

    /// 发出的 LDW_02 帧数
    pub hud_frames: u64,

    /// 请求扭矩被速率限制改写的评估次数
    pub rate_limited: u64,

    /// 连续使能到期触发的失能脉冲次数
    pub disable_pulses: u64,

    /// 扭矩不变触发的微调次数
    pub static_torque_nudges: u64,

    /// 偏移表未命中次数
    ///
    /// 如果这个值持续增长，说明识别到的限速档位不在表中，调整会一直停滞。
    pub offset_table_misses: u64,

    /// 发出的 GRA_ACC_01 帧数
    pub button_frames: u64,

    /// 开始发送的虚拟按键次数
    pub presses_started: u64,

    /// 完整发送完毕的虚拟按键次数
    pub presses_completed: u64,

    /// 仲裁落败或因发送中被丢弃的按键建议
    pub recommendations_dropped: u64,
}

impl CycleDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// 获取快照
    pub fn snapshot(&self) -> DiagnosticsSnapshot {
        DiagnosticsSnapshot {
            cycles: self.cycles,
            steering_frames: self.steering_frames,
            hud_frames: self.hud_frames,
            rate_limited: self.rate_limited,
            disable_pulses: self.disable_pulses,
            static_torque_nudges: self.static_torque_nudges,
            offset_table_misses: self.offset_table_misses,
            button_frames: self.button_frames,
            presses_started: self.presses_started,
            presses_completed: self.presses_completed,
            recommendations_dropped: self.recommendations_dropped,
        }
    }
}

/// 诊断快照（不可变，用于读取和输出）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
pub struct DiagnosticsSnapshot {
    pub cycles: u64,
    pub steering_frames: u64,
    pub hud_frames: u64,
    pub rate_limited: u64,
    pub disable_pulses: u64,
    pub static_torque_nudges: u64,
    pub offset_table_misses: u64,
    pub button_frames: u64,
    pub presses_started: u64,
    pub presses_completed: u64,
    pub recommendations_dropped: u64,
}

impl DiagnosticsSnapshot {
    /// 速率限制命中率（百分比）
    ///
    /// 返回 0.0 到 100.0 之间的值。没有发过转向帧时返回 0.0。
    pub fn rate_limited_percent(&self) -> f64 {
        if self.steering_frames == 0 {
            return 0.0;
        }
        (self.rate_limited as f64 / self.steering_frames as f64) * 100.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_snapshot_is_detached() {
        let mut diagnostics = CycleDiagnostics::new();
        diagnostics.steering_frames = 4;
        diagnostics.rate_limited = 1;
        diagnostics.offset_table_misses = 2;

        let snapshot = diagnostics.snapshot();
        assert_eq!(snapshot.steering_frames, 4);
        assert_eq!(snapshot.offset_table_misses, 2);
        assert!((snapshot.rate_limited_percent() - 25.0).abs() < 1e-9);

        diagnostics.steering_frames += 1;
        // 快照不受后续修改影响
        assert_eq!(snapshot.steering_frames, 4);
        assert_eq!(diagnostics.snapshot().steering_frames, 5);
    }

    #[test]
    fn test_rate_limited_percent_without_frames() {
        assert_eq!(DiagnosticsSnapshot::default().rate_limited_percent(), 0.0);
    }
}
