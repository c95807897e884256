//! 输出帧记录定义
//!
//! 包含控制器会发出的三类帧的字段记录，以及转换为 `OutgoingFrame` 的方法。

use num_enum::{IntoPrimitive, TryFromPrimitive};

use crate::{
    CanBus, FramePayload, GraPassthrough, LaneDepartureWarning, OutgoingFrame, RollingCounter,
    ids::*,
};

// ============================================================================
// HCA_01 转向扭矩指令
// ============================================================================

/// HCA_01 转向扭矩指令 (0x126)
///
/// - 扭矩单位：0.01 Nm，带符号（正值向左）
/// - `enabled = false` 时 EPS 忽略扭矩字段，同时复位其内部的连续使能计时
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct SteeringCommand {
    pub torque: i16,             // Assist_Torque + Assist_VZ（符号位）
    pub enabled: bool,           // HCA_Available / HCA_Request 组合状态
    pub counter: RollingCounter, // COUNTER
}

impl SteeringCommand {
    pub fn new(torque: i16, enabled: bool, counter: RollingCounter) -> Self {
        Self {
            torque,
            enabled,
            counter,
        }
    }

    /// 转换为输出帧
    pub fn to_frame(self, bus: CanBus) -> OutgoingFrame {
        OutgoingFrame {
            id: ID_HCA_01,
            bus,
            payload: FramePayload::Steering(self),
        }
    }
}

// ============================================================================
// LDW_02 车道保持 HUD 状态
// ============================================================================

/// LDW_02 仪表提示信息（LDW_Texte）
///
/// 数值与车辆 DBC 中的定义一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, IntoPrimitive, TryFromPrimitive)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(into = "u8", try_from = "u8"))]
#[repr(u8)]
pub enum HudAlert {
    /// 无提示
    None = 0,
    /// "车道保持当前不可用"，带提示音
    LaneAssistUnavailChime = 1,
    /// "车道保持不可用，传感器无视野"，带提示音
    LaneAssistUnavailNoSensorChime = 3,
    /// "请接管转向"，紧急提示音
    LaneAssistTakeOverUrgent = 4,
    /// 紧急辅助："请接管转向"，紧急提示音
    EmergencyAssistUrgent = 6,
    /// 紧急辅助："正在变道"，紧急提示音
    EmergencyAssistChangingLanes = 7,
    /// "车道保持已关闭"，静默，保留图标
    LaneAssistDeactivated = 8,
    /// "请接管转向"，普通提示音
    LaneAssistTakeOverChime = 10,
    /// "请接管转向"，静默
    LaneAssistTakeOverSilent = 11,
}

impl Default for HudAlert {
    fn default() -> Self {
        HudAlert::None
    }
}

/// LDW_02 HUD 状态 (0x397)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct HudStatusCommand {
    pub lane_assist_active: bool,         // LDW_Status_LED_gruen / gelb
    pub steering_pressed: bool,           // LDW_Lernmodus（驾驶员接管）
    pub alert: HudAlert,                  // LDW_Texte
    pub left_lane_visible: bool,          // LDW_Lernmodus_links
    pub right_lane_visible: bool,         // LDW_Lernmodus_rechts
    pub warning: LaneDepartureWarning,    // LDW_SW_Warnung_links/rechts, LDW_Seite_DLCTLC, LDW_DLC, LDW_TLC
}

impl HudStatusCommand {
    /// 转换为输出帧
    pub fn to_frame(self, bus: CanBus) -> OutgoingFrame {
        OutgoingFrame {
            id: ID_LDW_02,
            bus,
            payload: FramePayload::Hud(self),
        }
    }
}

// ============================================================================
// GRA_ACC_01 巡航按键
// ============================================================================

/// 虚拟按键动作
///
/// "无动作"用 `Option::<ButtonAction>::None` 表示。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ButtonAction {
    /// 取消巡航（GRA_Abbrechen）
    Cancel,
    /// 恢复巡航（GRA_Tip_Wiederaufnahme），已巡航时设定速度 +1
    ResumeCruise,
    /// 加速档（GRA_Tip_Hoch），设定速度跳到下一个 10 km/h 档位
    AccelCruise,
    /// 减速档（GRA_Tip_Runter）
    DecelCruise,
}

/// GRA_ACC_01 虚拟按键帧 (0x12B)
///
/// 计数器必须等于车辆最近一帧计数器 + 1，接收端才会把它当成连续序列。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct AccButtonCommand {
    pub counter: RollingCounter,     // COUNTER
    pub cancel: bool,                // GRA_Abbrechen
    pub resume: bool,                // GRA_Tip_Wiederaufnahme
    pub accel: bool,                 // GRA_Tip_Hoch
    pub decel: bool,                 // GRA_Tip_Runter
    pub passthrough: GraPassthrough, // 原样复制的车辆字段
}

impl AccButtonCommand {
    /// 创建按下指定按键的帧
    pub fn press(action: ButtonAction, counter: RollingCounter, passthrough: GraPassthrough) -> Self {
        Self {
            counter,
            cancel: action == ButtonAction::Cancel,
            resume: action == ButtonAction::ResumeCruise,
            accel: action == ButtonAction::AccelCruise,
            decel: action == ButtonAction::DecelCruise,
            passthrough,
        }
    }

    /// 帧中按下的按键（最多一个）
    pub fn action(&self) -> Option<ButtonAction> {
        if self.cancel {
            Some(ButtonAction::Cancel)
        } else if self.resume {
            Some(ButtonAction::ResumeCruise)
        } else if self.accel {
            Some(ButtonAction::AccelCruise)
        } else if self.decel {
            Some(ButtonAction::DecelCruise)
        } else {
            None
        }
    }

    /// 转换为输出帧
    pub fn to_frame(self, bus: CanBus) -> OutgoingFrame {
        OutgoingFrame {
            id: ID_GRA_ACC_01,
            bus,
            payload: FramePayload::AccButtons(self),
        }
    }
}
