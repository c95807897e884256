//! 车道保持 HUD（LDW_02）
//!
//! 无状态映射：原厂摄像头以 10Hz 发送 LDW_02，接管后由本模块以相同频率替代。

use mqb_protocol::{HudAlert, HudStatusCommand, VehicleState};

use crate::input::{HudRequest, VisualAlert};

/// 上层视觉提示 → 仪表提示
///
/// 只有"需要接管转向"有对应的静默提示，其余一律不显示。
pub fn hud_alert(alert: VisualAlert) -> HudAlert {
    match alert {
        VisualAlert::SteerRequired => HudAlert::LaneAssistTakeOverSilent,
        _ => HudAlert::None,
    }
}

/// 车道保持 HUD
#[derive(Debug, Clone, Copy, Default)]
pub struct LaneAssistHud;

impl LaneAssistHud {
    /// 生成 LDW_02 帧字段
    ///
    /// LDW 警告字段与驾驶员接管标志原样透传。
    pub fn status(
        &self,
        engaged: bool,
        vehicle: &VehicleState,
        request: &HudRequest,
    ) -> HudStatusCommand {
        HudStatusCommand {
            lane_assist_active: engaged && !vehicle.standstill,
            steering_pressed: vehicle.steering_pressed,
            alert: hud_alert(request.visual_alert),
            left_lane_visible: request.left_lane_visible,
            right_lane_visible: request.right_lane_visible,
            warning: vehicle.ldw,
        }
    }
}
