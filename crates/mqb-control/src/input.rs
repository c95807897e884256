//! 每周期输入
//!
//! 由外部实时调度器在每个控制周期组装一份，按值传入 `ControlCycle::step`。

use mqb_protocol::VehicleState;
use serde::{Deserialize, Serialize};

/// 上层请求的视觉提示
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum VisualAlert {
    #[default]
    None,
    Fcw,
    SteerRequired,
    BrakePressed,
    WrongGear,
    SeatbeltUnbuckled,
    SpeedTooHigh,
    Ldw,
}

/// HUD 请求
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HudRequest {
    pub visual_alert: VisualAlert,
    pub left_lane_visible: bool,
    pub right_lane_visible: bool,
}

/// 执行器请求
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Actuators {
    /// 期望转向扭矩占最大扭矩的比例，[-1, 1]
    pub steer: f32,
}

/// 一个控制周期的完整输入
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleInput {
    /// 单调递增的周期计数（允许回绕）
    pub cycle: u32,
    /// 系统是否处于接管状态
    pub engaged: bool,
    /// 车辆状态快照
    pub vehicle: VehicleState,
    /// 执行器请求
    pub actuators: Actuators,
    /// HUD 请求
    pub hud: HudRequest,
}
