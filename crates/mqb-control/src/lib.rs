//! # MQB Control
//!
//! MQB 平台车道保持与巡航按键的单周期控制核心：
//! - 转向扭矩整形（速率限制、静止 / 故障归零、连续使能与扭矩不变保护）
//! - 车道保持 HUD
//! - 限速识别 → 巡航设定速度规划
//! - 与车辆计数器同步的虚拟巡航按键
//!
//! 核心不含线程、定时器和 IO：调用方每个周期传入输入，取回待发送的帧。
//!
//! # 使用示例
//!
//! ```rust
//! use mqb_control::{ControlCycle, ControllerConfig, CycleInput, SessionState};
//!
//! let control = ControlCycle::new(ControllerConfig::default()).unwrap();
//! let mut session = SessionState::new();
//!
//! for cycle in 0..10 {
//!     let input = CycleInput { cycle, ..Default::default() };
//!     for frame in control.step(&mut session, &input) {
//!         println!("0x{:03X} on bus {}", frame.id, frame.bus.index());
//!     }
//! }
//! ```

pub mod buttons;
pub mod config;
pub mod cycle;
pub mod diagnostics;
mod error;
pub mod hud;
pub mod input;
pub mod offsets;
pub mod speed_limit;
pub mod steering;

pub use buttons::{
    ButtonPhase, ButtonRule, ButtonSessionState, ButtonTransmission, CruiseButtonEmulator,
    RequestOutcome,
};
pub use config::{ControllerConfig, CycleTiming, SpeedLimitOptions, SteeringLimits};
pub use cycle::{ControlCycle, FrameBatch, SessionState};
pub use diagnostics::{CycleDiagnostics, DiagnosticsSnapshot};
pub use error::ConfigError;
pub use hud::{LaneAssistHud, hud_alert};
pub use input::{Actuators, CycleInput, HudRequest, VisualAlert};
pub use offsets::{OffsetEntry, OffsetTable, OffsetTableKind, OffsetTables};
pub use speed_limit::{PlannerDecision, PlannerInput, SpeedLimitPlanner, SpeedLimitState, TableMiss};
pub use steering::{
    ControllerState, SteeringEvent, SteeringInput, SteeringOutput, SteeringTorqueShaper,
    TorqueStep, apply_steer_torque_limits, driver_opposes,
};
