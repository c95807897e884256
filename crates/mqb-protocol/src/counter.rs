//! 4-bit 滚动计数器
//!
//! HCA_01 与 GRA_ACC_01 都带有 4-bit 的消息计数器（0~15 循环），
//! 接收端依赖它判断帧的连续性与重复。

use bilge::prelude::*;

use crate::{ProtocolError, ROLLING_COUNTER_MODULUS};

/// 4-bit 滚动计数器
///
/// 内部使用 `u4` 存储，构造时自动截断到低 4 位，因此永远不会越界。
///
/// # 示例
///
/// ```rust
/// use mqb_protocol::RollingCounter;
///
/// let counter = RollingCounter::new(15);
/// assert_eq!(counter.next().value(), 0);
/// assert_eq!(RollingCounter::new(0x1A).value(), 0x0A);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RollingCounter(u4);

impl RollingCounter {
    /// 创建计数器（取低 4 位）
    pub fn new(value: u8) -> Self {
        Self(u4::new(value % ROLLING_COUNTER_MODULUS))
    }

    /// 当前值（0~15）
    pub fn value(self) -> u8 {
        self.0.value()
    }

    /// 下一个值：(value + 1) mod 16
    pub fn next(self) -> Self {
        Self::new(self.value().wrapping_add(1))
    }
}

impl Default for RollingCounter {
    fn default() -> Self {
        Self::new(0)
    }
}

/// 严格转换：超出 0~15 的值返回错误而不是截断
impl TryFrom<u8> for RollingCounter {
    type Error = ProtocolError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if value >= ROLLING_COUNTER_MODULUS {
            return Err(ProtocolError::InvalidValue {
                field: "RollingCounter",
                value,
            });
        }
        Ok(Self::new(value))
    }
}

impl From<RollingCounter> for u8 {
    fn from(counter: RollingCounter) -> Self {
        counter.value()
    }
}

#[cfg(feature = "serde")]
impl serde::Serialize for RollingCounter {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(self.value())
    }
}

#[cfg(feature = "serde")]
impl<'de> serde::Deserialize<'de> for RollingCounter {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = <u8 as serde::Deserialize>::deserialize(deserializer)?;
        Self::try_from(raw).map_err(serde::de::Error::custom)
    }
}
