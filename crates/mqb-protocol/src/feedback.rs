//! 车辆状态快照
//!
//! 由外部 CAN 解析器（DBC parser）从原始负载解码得到，
//! 控制周期每次调用时以完整快照的形式传入。
//! 本模块只定义字段，不做任何解析。

use crate::{MS_TO_KPH, RollingCounter};

/// 车道偏离警告（LDW）字段
///
/// 既是输入（来自原厂摄像头的 LDW_02），也原样透传到输出的 HUD 帧。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct LaneDepartureWarning {
    /// 左侧车道偏离警告激活
    pub left: bool,
    /// 右侧车道偏离警告激活
    pub right: bool,
    /// 侧向距离 / 越线时间分级（DLC/TLC 组合字段）
    pub side_dlc_tlc: u8,
    /// 距离车道线分级（Distance to Line Crossing）
    pub dlc: u8,
    /// 越线时间分级（Time to Line Crossing）
    pub tlc: u8,
}

/// 原厂巡航系统状态
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct CruiseState {
    /// ACC 已接管纵向控制
    pub enabled: bool,
    /// ACC 主开关打开且可用
    pub available: bool,
    /// 当前巡航设定速度（m/s）
    pub speed: f32,
}

impl CruiseState {
    /// 巡航设定速度（km/h，四舍五入）
    pub fn setpoint_kph(&self) -> i32 {
        (self.speed * MS_TO_KPH).round() as i32
    }
}

/// GRA_ACC_01 中需要原样复制到虚拟按键帧的字段
///
/// 接收端（J428 ACC 雷达）会校验这些字段与车辆自身发送的帧一致。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GraPassthrough {
    /// GRA_Hauptschalter：巡航主开关
    pub main_switch: bool,
    /// GRA_Typ_Hauptschalter：主开关类型
    pub main_switch_type: u8,
    /// GRA_Codierung：拨杆编码
    pub coding: u8,
    /// GRA_Tip_Stufe_2：二级拨动
    pub tip_stufe_2: bool,
    /// GRA_ButtonTypeInfo：按键类型信息
    pub button_type_info: u8,
}

/// 车辆自身周期发送的 GRA_ACC_01 状态
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct GraButtonStatus {
    /// 最近一次观测到的消息计数器
    pub counter: RollingCounter,
    /// 需要透传的字段
    pub passthrough: GraPassthrough,
}

/// 完整的车辆状态快照（每个控制周期一份）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[cfg_attr(feature = "serde", serde(default))]
pub struct VehicleState {
    /// 原始车速（m/s，未滤波）
    pub v_ego_raw: f32,
    /// 车辆静止
    pub standstill: bool,
    /// EPS 报告转向故障
    pub steering_fault: bool,
    /// 驾驶员正在转动方向盘
    pub steering_pressed: bool,
    /// 驾驶员施加的扭矩（与 HCA 扭矩同单位，0.01 Nm）
    pub driver_torque: i16,
    /// 巡航状态
    pub cruise: CruiseState,
    /// 车道偏离警告字段
    pub ldw: LaneDepartureWarning,
    /// 交通标志识别的原始限速值（以 5 km/h 为单位）
    pub traffic_sign_raw: f32,
    /// 前车距离（m），0 表示无前车
    pub radar_distance: f32,
    /// 车辆自身的 GRA_ACC_01 状态
    pub gra_status: GraButtonStatus,
}

impl VehicleState {
    /// 当前车速（km/h，四舍五入）
    pub fn speed_kph(&self) -> i32 {
        (self.v_ego_raw * MS_TO_KPH).round() as i32
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_speed_kph_rounding() {
        let state = VehicleState {
            v_ego_raw: 16.666_667,
            ..Default::default()
        };
        assert_eq!(state.speed_kph(), 60);

        let state = VehicleState {
            v_ego_raw: 0.1,
            ..Default::default()
        };
        assert_eq!(state.speed_kph(), 0);
    }

    #[test]
    fn test_setpoint_kph_rounding() {
        let cruise = CruiseState {
            enabled: true,
            available: true,
            speed: 22.5,
        };
        assert_eq!(cruise.setpoint_kph(), 81);
    }

    #[cfg(feature = "serde")]
    #[test]
    fn test_partial_snapshot_deserializes_with_defaults() {
        let json = r#"{"v_ego_raw": 20.0, "cruise": {"enabled": true}}"#;
        let state: VehicleState = serde_json::from_str(json).unwrap();
        assert_eq!(state.v_ego_raw, 20.0);
        assert!(state.cruise.enabled);
        assert!(!state.cruise.available);
        assert_eq!(state.gra_status.counter.value(), 0);
    }
}
