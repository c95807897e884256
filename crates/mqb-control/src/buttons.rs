//! # 虚拟巡航按键（GRA_ACC_01）
//!
//! 车辆自己的按键报文约 33Hz 发送一次，带 4 位滚动计数器。虚拟按键必须紧跟在
//! 车辆报文之后发出，并使用"车辆计数器 + 1"，接收端才会把它当成连续序列。
//!
//! 因此发送是边沿触发的：每个控制周期读取车辆计数器，发现变化就立即发一帧。
//!
//! ## 状态机
//!
//! ```text
//!        request()            计数器变化（首帧）
//!  Idle ───────────▶ Pending ──────────────────▶ Transmitting
//!   ▲                                                 │ 计数器变化：再发一帧
//!   └─────────────────────────────────────────────────┘ 已发 repeat_count 帧
//! ```
//!
//! 只有一个待发送寄存器；发送开始后不接受新的请求。

use mqb_protocol::{AccButtonCommand, ButtonAction, GraButtonStatus, RollingCounter};
use tracing::{debug, info};

use crate::config::CycleTiming;

/// 按键会话状态（会话内持久）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonSessionState {
    /// 待发送的按键
    pub pending: Option<ButtonAction>,
    /// 当前按键已发送的帧数
    pub sent_count: u8,
    /// 最近一次发送开始的周期（用于规则节流）
    pub tx_start: Option<u32>,
    /// 最近一次观察到的车辆计数器
    pub last_counter: Option<RollingCounter>,
}

/// 按键发送阶段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ButtonPhase {
    Idle,
    Pending,
    Transmitting,
}

impl ButtonSessionState {
    pub fn phase(&self) -> ButtonPhase {
        match (self.pending, self.sent_count) {
            (None, _) => ButtonPhase::Idle,
            (Some(_), 0) => ButtonPhase::Pending,
            (Some(_), _) => ButtonPhase::Transmitting,
        }
    }
}

/// 按键建议的来源，按优先级从高到低排列
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ButtonRule {
    /// 车辆巡航仍在但系统已脱离接管：取消巡航
    AutoCancel,
    /// 接管中静止：恢复巡航（自动起步）
    AutoResume,
    /// 限速规划器
    SpeedLimit,
}

impl ButtonRule {
    pub fn name(self) -> &'static str {
        match self {
            ButtonRule::AutoCancel => "auto_cancel",
            ButtonRule::AutoResume => "auto_resume",
            ButtonRule::SpeedLimit => "speed_limit",
        }
    }
}

/// 请求结果
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestOutcome {
    /// 已写入待发送寄存器
    Accepted,
    /// 覆盖了尚未开始发送的另一个按键
    Replaced(ButtonAction),
    /// 正在发送，请求被丢弃
    Rejected,
}

/// 一次边沿触发的发送
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ButtonTransmission {
    pub command: AccButtonCommand,
    /// 本帧是该按键的第一帧
    pub started: bool,
    /// 本帧是该按键的最后一帧
    pub completed: bool,
}

/// 虚拟按键发生器
#[derive(Debug, Clone)]
pub struct CruiseButtonEmulator {
    repeat_count: u8,
    watch_step: u32,
    planner_step: u32,
}

impl CruiseButtonEmulator {
    pub fn new(timing: &CycleTiming) -> Self {
        Self {
            repeat_count: timing.button_repeat_count,
            watch_step: timing.button_watch_step,
            planner_step: timing.planner_step,
        }
    }

    /// 有按键待发送或正在发送
    pub fn is_busy(state: &ButtonSessionState) -> bool {
        state.pending.is_some()
    }

    /// 按键已开始发送
    pub fn is_transmitting(state: &ButtonSessionState) -> bool {
        state.sent_count > 0
    }

    /// 写入待发送寄存器
    pub fn request(&self, state: &mut ButtonSessionState, action: ButtonAction) -> RequestOutcome {
        if Self::is_transmitting(state) {
            return RequestOutcome::Rejected;
        }
        match state.pending.replace(action) {
            Some(previous) if previous != action => {
                debug!(?previous, ?action, "pending button replaced");
                RequestOutcome::Replaced(previous)
            },
            _ => RequestOutcome::Accepted,
        }
    }

    fn since_start(state: &ButtonSessionState, cycle: u32) -> Option<u32> {
        state.tx_start.map(|start| cycle.wrapping_sub(start))
    }

    /// 自动取消 / 自动恢复规则是否可以评估
    pub fn rules_due(&self, state: &ButtonSessionState, cycle: u32) -> bool {
        Self::since_start(state, cycle).is_none_or(|elapsed| elapsed > self.watch_step)
    }

    /// 限速规划器是否可以评估
    pub fn planner_due(&self, state: &ButtonSessionState, cycle: u32) -> bool {
        Self::since_start(state, cycle).is_none_or(|elapsed| elapsed > self.planner_step)
    }

    /// 节流窗口结束后清除发送开始标记，避免周期计数回绕后再次节流
    pub fn release_hold(&self, state: &mut ButtonSessionState, cycle: u32) {
        if Self::since_start(state, cycle).is_some_and(|elapsed| elapsed > self.watch_step) {
            state.tx_start = None;
        }
    }

    /// 读取车辆计数器；计数器变化且有待发送按键时立即生成一帧
    ///
    /// 第一次观察到计数器也视为变化。
    pub fn on_counter(
        &self,
        state: &mut ButtonSessionState,
        status: &GraButtonStatus,
        cycle: u32,
    ) -> Option<ButtonTransmission> {
        if state.last_counter == Some(status.counter) {
            return None;
        }
        state.last_counter = Some(status.counter);

        let action = state.pending?;
        let started = state.sent_count == 0;
        if started {
            state.tx_start = Some(cycle);
            info!(?action, cycle, "virtual button press started");
        }

        let command = AccButtonCommand::press(action, status.counter.next(), status.passthrough);
        state.sent_count += 1;

        let completed = state.sent_count >= self.repeat_count;
        if completed {
            state.pending = None;
            state.sent_count = 0;
            info!(?action, cycle, "virtual button press completed");
        }

        Some(ButtonTransmission {
            command,
            started,
            completed,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqb_protocol::GraPassthrough;

    fn emulator() -> CruiseButtonEmulator {
        CruiseButtonEmulator::new(&CycleTiming::default())
    }

    fn status(counter: u8) -> GraButtonStatus {
        GraButtonStatus {
            counter: RollingCounter::new(counter),
            passthrough: GraPassthrough {
                main_switch: true,
                coding: 2,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_idle_without_request() {
        let emulator = emulator();
        let mut state = ButtonSessionState::default();
        assert_eq!(state.phase(), ButtonPhase::Idle);
        assert!(emulator.on_counter(&mut state, &status(3), 0).is_none());
        assert!(emulator.on_counter(&mut state, &status(4), 1).is_none());
        assert_eq!(state.last_counter, Some(RollingCounter::new(4)));
    }

    #[test]
    fn test_press_sends_repeat_count_frames() {
        let emulator = emulator();
        let mut state = ButtonSessionState::default();
        assert_eq!(
            emulator.request(&mut state, ButtonAction::AccelCruise),
            RequestOutcome::Accepted
        );
        assert_eq!(state.phase(), ButtonPhase::Pending);

        let mut frames = Vec::new();
        for i in 0..60u32 {
            // 车辆计数器每 3 个周期变化一次
            let counter = (10 + i / 3) as u8;
            if let Some(tx) = emulator.on_counter(&mut state, &status(counter), i) {
                assert_eq!(tx.command.counter, RollingCounter::new(counter).next());
                frames.push(tx);
            }
            if frames.len() == 16 {
                break;
            }
        }

        assert_eq!(frames.len(), 16);
        assert!(frames[0].started);
        assert!(frames[1..].iter().all(|tx| !tx.started));
        assert!(frames[15].completed);
        assert!(frames[..15].iter().all(|tx| !tx.completed));
        assert!(frames.iter().all(|tx| tx.command.action() == Some(ButtonAction::AccelCruise)));
        assert!(frames.iter().all(|tx| tx.command.passthrough.main_switch));
        assert_eq!(state.phase(), ButtonPhase::Idle);
        assert_eq!(state.sent_count, 0);
        assert_eq!(state.tx_start, Some(0));
    }

    #[test]
    fn test_counter_wraps() {
        let emulator = emulator();
        let mut state = ButtonSessionState::default();
        emulator.request(&mut state, ButtonAction::Cancel);

        let tx = emulator.on_counter(&mut state, &status(15), 0).unwrap();
        assert_eq!(tx.command.counter.value(), 0);
        assert!(tx.command.cancel);
    }

    #[test]
    fn test_no_frame_without_counter_change() {
        let emulator = emulator();
        let mut state = ButtonSessionState::default();
        emulator.request(&mut state, ButtonAction::ResumeCruise);

        assert!(emulator.on_counter(&mut state, &status(5), 0).is_some());
        assert!(emulator.on_counter(&mut state, &status(5), 1).is_none());
        assert!(emulator.on_counter(&mut state, &status(5), 2).is_none());
        assert_eq!(state.sent_count, 1);
        assert_eq!(state.phase(), ButtonPhase::Transmitting);
    }

    #[test]
    fn test_request_rules() {
        let emulator = emulator();
        let mut state = ButtonSessionState::default();

        emulator.request(&mut state, ButtonAction::AccelCruise);
        assert_eq!(
            emulator.request(&mut state, ButtonAction::DecelCruise),
            RequestOutcome::Replaced(ButtonAction::AccelCruise)
        );
        assert_eq!(
            emulator.request(&mut state, ButtonAction::DecelCruise),
            RequestOutcome::Accepted
        );

        emulator.on_counter(&mut state, &status(0), 0);
        assert_eq!(
            emulator.request(&mut state, ButtonAction::Cancel),
            RequestOutcome::Rejected
        );
        assert_eq!(state.pending, Some(ButtonAction::DecelCruise));
    }

    #[test]
    fn test_throttle_windows() {
        let emulator = emulator();
        let mut state = ButtonSessionState::default();
        assert!(emulator.rules_due(&state, 0));
        assert!(emulator.planner_due(&state, 0));

        state.tx_start = Some(1000);
        assert!(!emulator.planner_due(&state, 1025));
        assert!(emulator.planner_due(&state, 1026));
        assert!(!emulator.rules_due(&state, 1100));
        assert!(emulator.rules_due(&state, 1101));

        emulator.release_hold(&mut state, 1100);
        assert_eq!(state.tx_start, Some(1000));
        emulator.release_hold(&mut state, 1101);
        assert_eq!(state.tx_start, None);
    }

    #[test]
    fn test_throttle_across_cycle_wrap() {
        let emulator = emulator();
        let mut state = ButtonSessionState {
            tx_start: Some(u32::MAX - 10),
            ..Default::default()
        };
        assert!(!emulator.rules_due(&state, 50));
        assert!(emulator.rules_due(&state, 90));
        emulator.release_hold(&mut state, 90);
        assert!(state.tx_start.is_none());
    }

    #[test]
    fn test_rule_priority_order() {
        assert!(ButtonRule::AutoCancel < ButtonRule::AutoResume);
        assert!(ButtonRule::AutoResume < ButtonRule::SpeedLimit);
    }
}
