//! # 控制周期编排
//!
//! 外部实时调度器以固定频率调用 [`ControlCycle::step`]，每次传入一份 [`CycleInput`]，
//! 得到本周期要发送的帧（0~3 帧）。
//!
//! ## 周期内顺序
//!
//! 1. 转向（每 `steering_step` 个周期）→ HCA_01
//! 2. HUD（每 `hud_step` 个周期）→ LDW_02
//! 3. 按键规则仲裁，然后读取车辆按键计数器（每周期）→ GRA_ACC_01
//!
//! 帧按上述顺序追加，调用方按批次顺序发送即可。
//!
//! ## 按键仲裁
//!
//! 三个规则来源共用一个待发送寄存器，同一周期内按固定优先级决出唯一结果：
//! 自动取消 > 自动恢复 > 限速规划器。落败的建议被丢弃并计数。

use mqb_protocol::{ButtonAction, OutgoingFrame};
use smallvec::SmallVec;
use tracing::debug;

use crate::buttons::{ButtonRule, ButtonSessionState, CruiseButtonEmulator, RequestOutcome};
use crate::config::ControllerConfig;
use crate::diagnostics::CycleDiagnostics;
use crate::error::ConfigError;
use crate::hud::LaneAssistHud;
use crate::input::CycleInput;
use crate::speed_limit::{PlannerInput, SpeedLimitPlanner, SpeedLimitState};
use crate::steering::{ControllerState, SteeringEvent, SteeringInput, SteeringTorqueShaper};

/// 单周期输出帧（最多 3 帧，不分配堆内存）
pub type FrameBatch = SmallVec<[OutgoingFrame; 3]>;

/// 会话状态
///
/// 由控制循环独占，每周期以 `&mut` 传入。会话开始时创建，结束时丢弃。
#[derive(Debug, Clone, Default)]
pub struct SessionState {
    pub steering: ControllerState,
    pub buttons: ButtonSessionState,
    pub speed_limit: SpeedLimitState,
    pub diagnostics: CycleDiagnostics,
}

impl SessionState {
    pub fn new() -> Self {
        Self::default()
    }
}

/// 控制周期
///
/// 持有会话配置推导出的各子模块，本身不可变；所有可变状态都在 [`SessionState`] 中。
#[derive(Debug, Clone)]
pub struct ControlCycle {
    config: ControllerConfig,
    shaper: SteeringTorqueShaper,
    hud: LaneAssistHud,
    planner: SpeedLimitPlanner,
    emulator: CruiseButtonEmulator,
}

impl ControlCycle {
    /// 校验配置并构建
    pub fn new(config: ControllerConfig) -> Result<Self, ConfigError> {
        config.validate()?;
        Ok(Self {
            shaper: SteeringTorqueShaper::new(&config.limits, &config.timing),
            hud: LaneAssistHud,
            planner: SpeedLimitPlanner::new(&config.speed_limit, &config.offsets, &config.timing),
            emulator: CruiseButtonEmulator::new(&config.timing),
            config,
        })
    }

    pub fn config(&self) -> &ControllerConfig {
        &self.config
    }

    pub fn shaper(&self) -> &SteeringTorqueShaper {
        &self.shaper
    }

    /// 执行一个控制周期
    pub fn step(&self, session: &mut SessionState, input: &CycleInput) -> FrameBatch {
        let mut frames = FrameBatch::new();
        let timing = &self.config.timing;
        session.diagnostics.cycles += 1;

        if input.cycle % timing.steering_step == 0 {
            frames.push(self.steer(session, input));
        }

        if input.cycle % timing.hud_step == 0 {
            let status = self.hud.status(input.engaged, &input.vehicle, &input.hud);
            session.diagnostics.hud_frames += 1;
            frames.push(status.to_frame(self.config.bus));
        }

        self.arbitrate(session, input);

        // 计数器读取点即发送点
        if let Some(tx) =
            self.emulator
                .on_counter(&mut session.buttons, &input.vehicle.gra_status, input.cycle)
        {
            let diagnostics = &mut session.diagnostics;
            diagnostics.button_frames += 1;
            if tx.started {
                diagnostics.presses_started += 1;
            }
            if tx.completed {
                diagnostics.presses_completed += 1;
            }
            frames.push(tx.command.to_frame(self.config.bus));
        }

        frames
    }

    fn steer(&self, session: &mut SessionState, input: &CycleInput) -> OutgoingFrame {
        let vehicle = &input.vehicle;
        let steering_input = SteeringInput {
            engaged: input.engaged,
            standstill: vehicle.standstill,
            steering_fault: vehicle.steering_fault,
            steer: input.actuators.steer,
            driver_torque: vehicle.driver_torque,
        };
        let output = self.shaper.evaluate(&mut session.steering, &steering_input);

        let diagnostics = &mut session.diagnostics;
        diagnostics.steering_frames += 1;
        if output.rate_limited {
            diagnostics.rate_limited += 1;
        }
        match output.event {
            Some(SteeringEvent::DisablePulse) => diagnostics.disable_pulses += 1,
            Some(SteeringEvent::StaticTorqueNudge) => diagnostics.static_torque_nudges += 1,
            None => {},
        }

        self.shaper
            .command(&mut session.steering, &output)
            .to_frame(self.config.bus)
    }

    /// 自动取消 / 自动恢复
    fn auto_rule(input: &CycleInput) -> Option<(ButtonRule, ButtonAction)> {
        let vehicle = &input.vehicle;
        if !input.engaged && vehicle.cruise.enabled {
            Some((ButtonRule::AutoCancel, ButtonAction::Cancel))
        } else if input.engaged && vehicle.standstill {
            Some((ButtonRule::AutoResume, ButtonAction::ResumeCruise))
        } else {
            None
        }
    }

    fn arbitrate(&self, session: &mut SessionState, input: &CycleInput) {
        let cycle = input.cycle;
        self.emulator.release_hold(&mut session.buttons, cycle);

        let mut candidates: SmallVec<[(ButtonRule, ButtonAction); 2]> = SmallVec::new();

        if self.emulator.rules_due(&session.buttons, cycle) {
            candidates.extend(Self::auto_rule(input));
        }

        // 规划器即使落败也要评估，以推进其内部状态
        if self.emulator.planner_due(&session.buttons, cycle) {
            let planner_input = PlannerInput::from_vehicle(
                input.engaged,
                &input.vehicle,
                self.planner.options().sign_scale,
                CruiseButtonEmulator::is_busy(&session.buttons),
                cycle,
            );
            let decision = self.planner.evaluate(&mut session.speed_limit, &planner_input);
            if decision.table_miss.is_some() {
                session.diagnostics.offset_table_misses += 1;
            }
            if let Some(action) = decision.action {
                candidates.push((ButtonRule::SpeedLimit, action));
            }
        }

        candidates.sort_by_key(|(rule, _)| *rule);
        let mut candidates = candidates.into_iter();
        let Some((rule, action)) = candidates.next() else {
            return;
        };

        for (lost_rule, lost_action) in candidates {
            debug!(
                winner = rule.name(),
                rule = lost_rule.name(),
                action = ?lost_action,
                "button recommendation lost arbitration"
            );
            session.diagnostics.recommendations_dropped += 1;
        }

        match self.emulator.request(&mut session.buttons, action) {
            RequestOutcome::Rejected => {
                debug!(rule = rule.name(), ?action, "button recommendation dropped, press in flight");
                session.diagnostics.recommendations_dropped += 1;
            },
            RequestOutcome::Accepted | RequestOutcome::Replaced(_) => {
                debug!(rule = rule.name(), ?action, cycle, "button requested");
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mqb_protocol::{CruiseState, FramePayload, FrameKind, RollingCounter, VehicleState};

    fn control() -> ControlCycle {
        ControlCycle::new(ControllerConfig::default()).unwrap()
    }

    fn kinds(frames: &FrameBatch) -> Vec<FrameKind> {
        frames.iter().map(|frame| frame.kind()).collect()
    }

    #[test]
    fn test_invalid_config_rejected() {
        let mut config = ControllerConfig::default();
        config.timing.steering_step = 0;
        assert!(ControlCycle::new(config).is_err());
    }

    #[test]
    fn test_cadence_and_order() {
        let control = control();
        let mut session = SessionState::new();

        let frames = control.step(&mut session, &CycleInput::default());
        assert_eq!(kinds(&frames), vec![FrameKind::Steering, FrameKind::Hud]);

        let input = CycleInput {
            cycle: 1,
            ..Default::default()
        };
        assert!(control.step(&mut session, &input).is_empty());

        let input = CycleInput {
            cycle: 2,
            ..Default::default()
        };
        assert_eq!(kinds(&control.step(&mut session, &input)), vec![FrameKind::Steering]);

        assert_eq!(session.diagnostics.cycles, 3);
        assert_eq!(session.diagnostics.steering_frames, 2);
        assert_eq!(session.diagnostics.hud_frames, 1);
    }

    #[test]
    fn test_steering_counter_advances_per_frame() {
        let control = control();
        let mut session = SessionState::new();
        let mut counters = Vec::new();
        for cycle in 0..8 {
            let input = CycleInput {
                cycle,
                ..Default::default()
            };
            for frame in control.step(&mut session, &input) {
                if let FramePayload::Steering(command) = frame.payload {
                    counters.push(command.counter.value());
                }
            }
        }
        assert_eq!(counters, vec![0, 1, 2, 3]);
    }

    #[test]
    fn test_auto_cancel_on_disengage() {
        let control = control();
        let mut session = SessionState::new();
        let input = CycleInput {
            cycle: 1,
            engaged: false,
            vehicle: VehicleState {
                cruise: CruiseState {
                    enabled: true,
                    available: true,
                    speed: 0.0,
                },
                ..Default::default()
            },
            ..Default::default()
        };

        let frames = control.step(&mut session, &input);
        // 首次观察到计数器即发送
        let last = frames.last().unwrap();
        assert_eq!(last.kind(), FrameKind::AccButtons);
        match last.payload {
            FramePayload::AccButtons(command) => {
                assert!(command.cancel);
                assert_eq!(command.counter, RollingCounter::new(1));
            },
            _ => panic!("expected button frame"),
        }
        assert_eq!(session.diagnostics.presses_started, 1);
    }

    #[test]
    fn test_auto_rule_beats_planner() {
        let control = control();
        let mut session = SessionState::new();
        // 未接管、巡航开启、车速 60、限速 80：规划器按未接管表建议加速，自动取消优先
        let input = CycleInput {
            cycle: 1,
            engaged: false,
            vehicle: VehicleState {
                v_ego_raw: 60.0 / 3.6,
                traffic_sign_raw: 16.0,
                cruise: CruiseState {
                    enabled: true,
                    available: true,
                    speed: 60.0 / 3.6,
                },
                ..Default::default()
            },
            ..Default::default()
        };

        control.step(&mut session, &input);
        assert_eq!(session.buttons.pending, Some(ButtonAction::Cancel));
        assert_eq!(session.diagnostics.recommendations_dropped, 1);
        assert!(session.speed_limit.in_progress);
    }
}
