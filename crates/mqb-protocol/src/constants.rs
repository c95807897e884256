//! 协议常量定义

/// 滚动计数器模数（4-bit，0~15 循环）
pub const ROLLING_COUNTER_MODULUS: u8 = 16;

/// HCA_01 扭矩字段可表示的最大幅值（单位：0.01 Nm）
///
/// 齿条侧的实际上限为 3.0 Nm，控制层的 `max_torque` 不得超过此值。
pub const HCA_TORQUE_FIELD_MAX: i16 = 300;

/// km/h 与 m/s 的换算系数
pub const MS_TO_KPH: f32 = 3.6;
