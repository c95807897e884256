//! CAN ID 常量定义和枚举
//!
//! 定义控制器会发出的全部帧 ID，并提供 ID 分类功能。

// ============================================================================
// 控制帧 ID 常量
// ============================================================================

/// HCA_01：转向扭矩指令（Heading Control Assist）
pub const ID_HCA_01: u32 = 0x126;

/// LDW_02：车道偏离警告 / 车道保持 HUD 状态
pub const ID_LDW_02: u32 = 0x397;

/// GRA_ACC_01：巡航控制拨杆按键状态
///
/// 车辆自身以约 33Hz 周期发送此帧；虚拟按键复用同一 ID。
pub const ID_GRA_ACC_01: u32 = 0x12B;

// ============================================================================
// ID 分类枚举
// ============================================================================

/// CAN 帧类型分类
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FrameKind {
    /// 转向扭矩帧
    Steering,
    /// HUD 状态帧
    Hud,
    /// 巡航按键帧
    AccButtons,
    /// 未知类型
    Unknown,
}

impl FrameKind {
    /// 根据 CAN ID 判断帧类型
    pub fn from_id(id: u32) -> Self {
        match id {
            ID_HCA_01 => FrameKind::Steering,
            ID_LDW_02 => FrameKind::Hud,
            ID_GRA_ACC_01 => FrameKind::AccButtons,
            _ => FrameKind::Unknown,
        }
    }

    /// 可读名称（用于日志与回放汇总）
    pub fn name(self) -> &'static str {
        match self {
            FrameKind::Steering => "HCA_01",
            FrameKind::Hud => "LDW_02",
            FrameKind::AccButtons => "GRA_ACC_01",
            FrameKind::Unknown => "UNKNOWN",
        }
    }
}
