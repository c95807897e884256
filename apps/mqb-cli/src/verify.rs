//! 转向安全约束校验
//!
//! 对回放产生的 HCA_01 帧逐帧检查：
//! - 扭矩幅值不超过上限
//! - 静止 / 故障 / 未接管时扭矩为零且失能
//! - 相邻两帧扭矩变化不超过速率限制：幅值增大用 max_rate_up，减小用 max_rate_down，
//!   驾驶员反向用力时用更严格的限制

use std::fmt;

use mqb_control::{CycleInput, SteeringLimits, TorqueStep, driver_opposes};
use mqb_protocol::SteeringCommand;

/// 违反的约束
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    TorqueAboveMax,
    ActiveWhileInhibited,
    RateExceeded { delta: i32, bound: i32 },
}

/// 一次违规
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Violation {
    pub cycle: u32,
    pub torque: i16,
    pub kind: ViolationKind,
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            ViolationKind::TorqueAboveMax => {
                write!(f, "cycle {}: torque {} above max", self.cycle, self.torque)
            },
            ViolationKind::ActiveWhileInhibited => write!(
                f,
                "cycle {}: torque {} commanded while disengaged, standstill or faulted",
                self.cycle, self.torque
            ),
            ViolationKind::RateExceeded { delta, bound } => write!(
                f,
                "cycle {}: torque {} changed by {} (bound {})",
                self.cycle, self.torque, delta, bound
            ),
        }
    }
}

/// 转向帧校验器
pub struct SteeringVerifier {
    limits: SteeringLimits,
    last_torque: i16,
    frames: usize,
    violations: Vec<Violation>,
}

impl SteeringVerifier {
    pub fn new(limits: &SteeringLimits) -> Self {
        Self {
            limits: limits.clone(),
            last_torque: 0,
            frames: 0,
            violations: Vec::new(),
        }
    }

    /// 检查一帧
    pub fn observe(&mut self, input: &CycleInput, command: &SteeringCommand) {
        self.frames += 1;
        let vehicle = &input.vehicle;
        let torque = command.torque;
        let mut report = |kind| {
            self.violations.push(Violation {
                cycle: input.cycle,
                torque,
                kind,
            })
        };

        if torque.abs() > self.limits.max_torque {
            report(ViolationKind::TorqueAboveMax);
        }

        let inhibited = !input.engaged || vehicle.standstill || vehicle.steering_fault;
        if inhibited {
            if torque != 0 || command.enabled {
                report(ViolationKind::ActiveWhileInhibited);
            }
        } else {
            let desired = (input.actuators.steer.clamp(-1.0, 1.0)
                * f32::from(self.limits.max_torque))
            .round() as i32;
            let opposed = driver_opposes(desired, vehicle.driver_torque, &self.limits);
            let step = TorqueStep::new(self.last_torque, torque, opposed, &self.limits);
            if !step.within() {
                report(ViolationKind::RateExceeded {
                    delta: step.delta,
                    bound: step.bound,
                });
            }
        }

        self.last_torque = torque;
    }

    pub fn frames(&self) -> usize {
        self.frames
    }

    pub fn violations(&self) -> &[Violation] {
        &self.violations
    }
}
