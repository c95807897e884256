//! # 转向扭矩整形（HCA）
//!
//! 把上层请求的扭矩比例转换为 HCA_01 扭矩指令，并保证 EPS 不会因为以下原因报故障：
//!
//! - 静止或 EPS 故障时仍然请求扭矩
//! - 扭矩变化过快（方向相反的驾驶员扭矩下更严格）
//! - HCA 连续使能超过 EPS 的计时上限（360 秒）
//! - 扭矩长时间完全不变（EPS 认为发送端卡死，6 秒）
//!
//! ## 状态机
//!
//! ```text
//!            engaged && !standstill && !fault
//!   Inactive ───────────────────────────────▶ Active
//!      ▲  (torque = 0, enabled = false)         │ torque == 0 ⇒ 计时复位
//!      └────────────────────────────────────────┘ 计时到期 ⇒ 单周期失能脉冲
//! ```
//!
//! 所有约束都通过钳位输出实现，不会返回错误。

use mqb_protocol::{RollingCounter, SteeringCommand};
use tracing::debug;

use crate::config::{CycleTiming, SteeringLimits};

/// 转向控制状态（会话内持久）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ControllerState {
    /// 上一次输出的扭矩
    pub apply_torque_last: i16,
    /// 连续输出相同扭矩的评估次数
    pub same_torque_count: u32,
    /// HCA 连续使能的评估次数
    pub enabled_cycle_count: u32,
    /// 本次评估是否触发了速率限制
    pub rate_limited: bool,
    /// HCA_01 滚动计数器（每发送一帧 +1）
    pub counter: RollingCounter,
}

/// 单次转向评估的输入
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct SteeringInput {
    pub engaged: bool,
    pub standstill: bool,
    pub steering_fault: bool,
    /// 期望扭矩比例，[-1, 1]
    pub steer: f32,
    /// 驾驶员扭矩
    pub driver_torque: i16,
}

/// 评估过程中发生的保护动作
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SteeringEvent {
    /// 连续使能计时到期：本周期 enabled = false，但扭矩照常输出
    DisablePulse,
    /// 扭矩长时间不变：幅值向零方向微调 1 个单位
    StaticTorqueNudge,
}

/// 单次转向评估的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SteeringOutput {
    pub torque: i16,
    pub enabled: bool,
    pub rate_limited: bool,
    pub event: Option<SteeringEvent>,
}

/// 标准扭矩速率限制
///
/// - 请求先钳位到 ±`max_torque`
/// - 幅值增大每次最多 `max_rate_up`，幅值减小每次最多 `max_rate_down`
/// - 过零时最多越过零点 `max_rate_up`
/// - 驾驶员反向用力（|driver| > `driver_allowance` 且方向与请求相反）时，
///   增大和减小的步长都收紧到 `max_rate_down_opposed`
pub fn apply_steer_torque_limits(
    desired: i32,
    apply_torque_last: i16,
    driver_torque: i16,
    limits: &SteeringLimits,
) -> i16 {
    let max_torque = i32::from(limits.max_torque);
    let last = i32::from(apply_torque_last);
    let desired = desired.clamp(-max_torque, max_torque);

    let (rate_up, rate_down) = if driver_opposes(desired, driver_torque, limits) {
        let opposed = i32::from(limits.max_rate_down_opposed);
        (i32::from(limits.max_rate_up).min(opposed), opposed)
    } else {
        (i32::from(limits.max_rate_up), i32::from(limits.max_rate_down))
    };

    let limited = if last > 0 {
        desired.clamp((last - rate_down).max(-rate_up), last + rate_up)
    } else {
        desired.clamp(last - rate_up, (last + rate_down).min(rate_up))
    };

    limited as i16
}

/// 驾驶员是否在反方向用力
pub fn driver_opposes(desired: i32, driver_torque: i16, limits: &SteeringLimits) -> bool {
    let driver = i32::from(driver_torque);
    desired != 0
        && driver.abs() > i32::from(limits.driver_allowance)
        && desired.signum() != driver.signum()
}

/// 相邻两次输出之间的扭矩变化及其允许上限
///
/// 幅值增大（含从零起步）用 `max_rate_up`，幅值减小用 `max_rate_down`；
/// 过零时整段变化按减小计，越过零点的部分不超过 `max_rate_up`。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TorqueStep {
    pub delta: i32,
    pub bound: i32,
}

impl TorqueStep {
    /// `opposed` 为驾驶员反向用力，此时两个方向都收紧到 `max_rate_down_opposed`
    pub fn new(last: i16, next: i16, opposed: bool, limits: &SteeringLimits) -> Self {
        let up = i32::from(limits.max_rate_up);
        let down = i32::from(limits.max_rate_down);
        let (up, down) = if opposed {
            let opposed = i32::from(limits.max_rate_down_opposed);
            (up.min(opposed), opposed)
        } else {
            (up, down)
        };

        let last = i32::from(last);
        let next = i32::from(next);
        let crosses = last != 0 && next != 0 && last.signum() != next.signum();
        if crosses && next.abs() > up {
            return Self {
                delta: next.abs(),
                bound: up,
            };
        }

        let grows = !crosses && next.abs() > last.abs();
        Self {
            delta: (next - last).abs(),
            bound: if grows { up } else { down },
        }
    }

    pub fn within(self) -> bool {
        self.delta <= self.bound
    }
}

/// 转向扭矩整形器
#[derive(Debug, Clone)]
pub struct SteeringTorqueShaper {
    limits: SteeringLimits,
    enabled_limit: u32,
    static_limit: u32,
}

impl SteeringTorqueShaper {
    /// 按转向节拍把时长限制换算成评估次数
    pub fn new(limits: &SteeringLimits, timing: &CycleTiming) -> Self {
        Self {
            limits: limits.clone(),
            enabled_limit: timing.steering_cycles(limits.max_enabled_duration_s).max(1),
            static_limit: timing.steering_cycles(limits.max_static_torque_duration_s),
        }
    }

    pub fn limits(&self) -> &SteeringLimits {
        &self.limits
    }

    /// 连续使能上限（评估次数）
    pub fn enabled_limit_cycles(&self) -> u32 {
        self.enabled_limit
    }

    /// 扭矩不变上限（评估次数）
    pub fn static_limit_cycles(&self) -> u32 {
        self.static_limit
    }

    /// 期望比例 → 扭矩单位
    fn scale(&self, steer: f32) -> i32 {
        (steer.clamp(-1.0, 1.0) * f32::from(self.limits.max_torque)).round() as i32
    }

    /// 执行一次转向评估并更新状态
    pub fn evaluate(&self, state: &mut ControllerState, input: &SteeringInput) -> SteeringOutput {
        let desired = self.scale(input.steer);
        let mut apply = i32::from(apply_steer_torque_limits(
            desired,
            state.apply_torque_last,
            input.driver_torque,
            &self.limits,
        ));
        state.rate_limited = apply != desired;

        let mut event = None;
        let enabled;

        if !input.engaged || input.standstill || input.steering_fault {
            // 静止 / 故障：继续发帧，但扭矩为零且失能，让齿条自行恢复
            apply = 0;
            enabled = false;
        } else if apply == 0 {
            // 扭矩恰好为零时失能不会有任何副作用，顺便复位连续使能计时
            enabled = false;
            state.enabled_cycle_count = 0;
        } else {
            state.enabled_cycle_count += 1;
            if state.enabled_cycle_count >= self.enabled_limit {
                enabled = false;
                state.enabled_cycle_count = 0;
                event = Some(SteeringEvent::DisablePulse);
                debug!(torque = apply, "HCA disable pulse");
            } else {
                enabled = true;
                if i32::from(state.apply_torque_last) == apply {
                    state.same_torque_count += 1;
                    if state.same_torque_count > self.static_limit {
                        apply -= apply.signum();
                        state.same_torque_count = 0;
                        event = Some(SteeringEvent::StaticTorqueNudge);
                        debug!(torque = apply, "HCA static torque nudge");
                    }
                } else {
                    state.same_torque_count = 0;
                }
            }
        }

        state.apply_torque_last = apply as i16;

        SteeringOutput {
            torque: state.apply_torque_last,
            enabled,
            rate_limited: state.rate_limited,
            event,
        }
    }

    /// 生成 HCA_01 帧字段，并推进滚动计数器
    pub fn command(&self, state: &mut ControllerState, output: &SteeringOutput) -> SteeringCommand {
        let command = SteeringCommand::new(output.torque, output.enabled, state.counter);
        state.counter = state.counter.next();
        command
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_torque_step_bound_by_direction() {
        let limits = SteeringLimits::default();

        let step = TorqueStep::new(0, 10, false, &limits);
        assert_eq!(step, TorqueStep { delta: 10, bound: 4 });
        assert!(!step.within());

        assert!(TorqueStep::new(100, 104, false, &limits).within());
        assert!(!TorqueStep::new(-100, -105, false, &limits).within());
        assert!(TorqueStep::new(100, 90, false, &limits).within());
        assert!(!TorqueStep::new(100, 89, false, &limits).within());

        // 过零：越过零点的部分按增大计
        assert!(TorqueStep::new(6, -4, false, &limits).within());
        assert_eq!(
            TorqueStep::new(3, -5, false, &limits),
            TorqueStep { delta: 5, bound: 4 }
        );
    }

    #[test]
    fn test_torque_step_opposed_bound() {
        let limits = SteeringLimits::default();
        assert_eq!(TorqueStep::new(100, 97, true, &limits).bound, 3);
        assert!(!TorqueStep::new(100, 96, true, &limits).within());
        assert!(!TorqueStep::new(100, 104, true, &limits).within());
    }

    #[test]
    fn test_limiter_output_always_within_torque_step() {
        let limits = SteeringLimits::default();
        for last in (-300i16..=300).step_by(7) {
            for desired in (-320i32..=320).step_by(11) {
                for driver in [-200i16, 0, 200] {
                    let next = apply_steer_torque_limits(desired, last, driver, &limits);
                    let opposed = driver_opposes(desired.clamp(-300, 300), driver, &limits);
                    assert!(
                        TorqueStep::new(last, next, opposed, &limits).within(),
                        "{} -> {} (desired {}, driver {})",
                        last,
                        next,
                        desired,
                        driver
                    );
                }
            }
        }
    }

    fn limits() -> SteeringLimits {
        SteeringLimits::default()
    }

    fn active(steer: f32) -> SteeringInput {
        SteeringInput {
            engaged: true,
            standstill: false,
            steering_fault: false,
            steer,
            driver_torque: 0,
        }
    }

    // ========================================================================
    // 速率限制
    // ========================================================================

    #[test]
    fn test_rate_up_from_zero() {
        assert_eq!(apply_steer_torque_limits(300, 0, 0, &limits()), 4);
        assert_eq!(apply_steer_torque_limits(-300, 0, 0, &limits()), -4);
    }

    #[test]
    fn test_rate_down_toward_zero() {
        assert_eq!(apply_steer_torque_limits(0, 100, 0, &limits()), 90);
        assert_eq!(apply_steer_torque_limits(0, -100, 0, &limits()), -90);
    }

    #[test]
    fn test_zero_crossing_limited_by_rate_up() {
        assert_eq!(apply_steer_torque_limits(-300, 6, 0, &limits()), -4);
        assert_eq!(apply_steer_torque_limits(300, -6, 0, &limits()), 4);
    }

    #[test]
    fn test_clamped_to_max_torque() {
        assert_eq!(apply_steer_torque_limits(1000, 298, 0, &limits()), 300);
        assert_eq!(apply_steer_torque_limits(-1000, -298, 0, &limits()), -300);
    }

    #[test]
    fn test_driver_opposition_tightens_rates() {
        // 驾驶员向右（负）用力，请求向左（正）
        assert!(driver_opposes(300, -150, &limits()));
        assert_eq!(apply_steer_torque_limits(300, 100, -150, &limits()), 103);
        assert_eq!(apply_steer_torque_limits(50, 100, -150, &limits()), 97);
        // 请求归零时没有"方向"，按普通减小速率
        assert_eq!(apply_steer_torque_limits(0, 100, -150, &limits()), 90);
    }

    #[test]
    fn test_driver_within_allowance_is_not_opposition() {
        assert!(!driver_opposes(300, -80, &limits()));
        assert!(!driver_opposes(300, 150, &limits()));
        assert!(!driver_opposes(0, -150, &limits()));
        assert_eq!(apply_steer_torque_limits(0, 100, -80, &limits()), 90);
    }

    // ========================================================================
    // 状态机
    // ========================================================================

    #[test]
    fn test_standstill_forces_zero_and_disabled() {
        let shaper = SteeringTorqueShaper::new(&limits(), &CycleTiming::default());
        let mut state = ControllerState {
            apply_torque_last: 120,
            enabled_cycle_count: 42,
            ..Default::default()
        };
        let mut input = active(1.0);
        input.standstill = true;

        let out = shaper.evaluate(&mut state, &input);
        assert_eq!(out.torque, 0);
        assert!(!out.enabled);
        assert_eq!(state.apply_torque_last, 0);
        // 不复位连续使能计时
        assert_eq!(state.enabled_cycle_count, 42);
    }

    #[test]
    fn test_fault_and_disengaged_force_zero() {
        let shaper = SteeringTorqueShaper::new(&limits(), &CycleTiming::default());

        let mut state = ControllerState::default();
        let mut input = active(0.5);
        input.steering_fault = true;
        let out = shaper.evaluate(&mut state, &input);
        assert_eq!((out.torque, out.enabled), (0, false));

        let mut input = active(0.5);
        input.engaged = false;
        let out = shaper.evaluate(&mut state, &input);
        assert_eq!((out.torque, out.enabled), (0, false));
    }

    #[test]
    fn test_exact_zero_resets_enable_counter() {
        let shaper = SteeringTorqueShaper::new(&limits(), &CycleTiming::default());
        let mut state = ControllerState {
            apply_torque_last: 4,
            enabled_cycle_count: 1000,
            ..Default::default()
        };
        let out = shaper.evaluate(&mut state, &active(0.0));
        assert_eq!(out.torque, 0);
        assert!(!out.enabled);
        assert_eq!(state.enabled_cycle_count, 0);
    }

    #[test]
    fn test_disable_pulse_keeps_torque() {
        let shaper = SteeringTorqueShaper::new(&limits(), &CycleTiming::default());
        let mut state = ControllerState {
            apply_torque_last: 200,
            enabled_cycle_count: shaper.enabled_limit_cycles() - 1,
            ..Default::default()
        };
        let out = shaper.evaluate(&mut state, &active(200.0 / 300.0));
        assert_eq!(out.torque, 200);
        assert!(!out.enabled);
        assert_eq!(out.event, Some(SteeringEvent::DisablePulse));
        assert_eq!(state.enabled_cycle_count, 0);

        // 下一周期恢复使能
        let out = shaper.evaluate(&mut state, &active(200.0 / 300.0));
        assert!(out.enabled);
        assert_eq!(state.enabled_cycle_count, 1);
    }

    #[test]
    fn test_static_torque_nudge_toward_zero() {
        let shaper = SteeringTorqueShaper::new(&limits(), &CycleTiming::default());
        let mut state = ControllerState {
            apply_torque_last: -300,
            ..Default::default()
        };

        let static_limit = shaper.static_limit_cycles();
        for _ in 0..static_limit {
            let out = shaper.evaluate(&mut state, &active(-1.0));
            assert_eq!(out.torque, -300);
            assert_eq!(out.event, None);
        }

        let out = shaper.evaluate(&mut state, &active(-1.0));
        assert_eq!(out.torque, -299);
        assert_eq!(out.event, Some(SteeringEvent::StaticTorqueNudge));
        assert_eq!(state.same_torque_count, 0);

        // 下一次立即回到上限，计数重新开始
        let out = shaper.evaluate(&mut state, &active(-1.0));
        assert_eq!(out.torque, -300);
        assert_eq!(state.same_torque_count, 0);
    }

    #[test]
    fn test_counter_advances_per_command() {
        let shaper = SteeringTorqueShaper::new(&limits(), &CycleTiming::default());
        let mut state = ControllerState::default();
        let mut seen = Vec::new();
        for _ in 0..18 {
            let out = shaper.evaluate(&mut state, &active(0.1));
            seen.push(shaper.command(&mut state, &out).counter.value());
        }
        assert_eq!(&seen[..3], &[0, 1, 2]);
        assert_eq!(seen[15], 15);
        assert_eq!(seen[16], 0);
        assert_eq!(seen[17], 1);
    }

    #[test]
    fn test_rate_limited_flag() {
        let shaper = SteeringTorqueShaper::new(&limits(), &CycleTiming::default());
        let mut state = ControllerState::default();
        let out = shaper.evaluate(&mut state, &active(1.0));
        assert!(out.rate_limited);
        assert_eq!(out.torque, 4);

        let mut state = ControllerState::default();
        let out = shaper.evaluate(&mut state, &active(3.0 / 300.0));
        assert!(!out.rate_limited);
        assert_eq!(out.torque, 3);
    }
}
