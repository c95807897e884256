//! # MQB Protocol
//!
//! MQB 平台车道保持 / 巡航按键相关 CAN 帧的协议定义（无硬件依赖、无编解码）
//!
//! ## 模块
//!
//! - `ids`: CAN ID 常量定义与帧分类
//! - `constants`: 协议常量定义
//! - `counter`: 4-bit 滚动计数器
//! - `feedback`: 已解码的车辆状态快照
//! - `control`: 输出帧记录（HCA_01 / LDW_02 / GRA_ACC_01）
//!
//! ## 边界
//!
//! 本 crate 只描述"字段"，不负责把字段打包成 8 字节负载。
//! 负载编码（DBC packer）与总线收发由调用方完成。

pub mod constants;
pub mod control;
pub mod counter;
pub mod feedback;
pub mod ids;

// 重新导出常用类型
pub use constants::*;
pub use control::*;
pub use counter::RollingCounter;
pub use feedback::*;
pub use ids::*;

use thiserror::Error;

/// 总线索引
///
/// MQB 车型上控制设备同时接入三路总线，
/// 控制帧全部发往动力总线（`Powertrain`）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
#[repr(u8)]
pub enum CanBus {
    /// 动力总线（J533 网关侧）
    #[default]
    Powertrain = 0,
    /// 辅助总线
    Auxiliary = 1,
    /// 摄像头总线（R242 侧）
    Camera = 2,
}

impl CanBus {
    /// 转换为总线序号
    pub fn index(self) -> u8 {
        self as u8
    }
}

impl TryFrom<u8> for CanBus {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            0 => Ok(CanBus::Powertrain),
            1 => Ok(CanBus::Auxiliary),
            2 => Ok(CanBus::Camera),
            _ => Err(ProtocolError::InvalidBus { index: value }),
        }
    }
}

/// 输出帧的统一抽象
///
/// 控制周期唯一的输出产物：`{identifier, busIndex, fields}`。
/// 调用方根据 `payload` 的类型选择对应的 DBC 消息进行打包。
///
/// # 设计特性
///
/// - **Copy trait**：无堆分配，适合 100Hz 控制循环
/// - **字段级描述**：不含原始字节，避免协议层与编解码耦合
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct OutgoingFrame {
    /// CAN ID（11-bit 标准帧）
    pub id: u32,

    /// 目标总线
    pub bus: CanBus,

    /// 帧字段
    pub payload: FramePayload,
}

impl OutgoingFrame {
    /// 根据 CAN ID 判断帧类型
    pub fn kind(&self) -> FrameKind {
        FrameKind::from_id(self.id)
    }
}

/// 输出帧字段
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum FramePayload {
    /// HCA_01 转向扭矩指令
    Steering(SteeringCommand),
    /// LDW_02 车道保持 HUD 状态
    Hud(HudStatusCommand),
    /// GRA_ACC_01 巡航按键（虚拟按键）
    AccButtons(AccButtonCommand),
}

/// 协议错误类型
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ProtocolError {
    #[error("Invalid bus index: {index}")]
    InvalidBus { index: u8 },

    #[error("Invalid value for field {field}: {value}")]
    InvalidValue { field: &'static str, value: u8 },
}
