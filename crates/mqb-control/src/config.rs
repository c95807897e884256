//! # 会话配置
//!
//! 会话开始时加载一次，整个驾驶会话内保持不变。
//!
//! ## 文件格式
//!
//! ```toml
//! bus = "Powertrain"
//!
//! [limits]
//! max_torque = 300
//! max_rate_up = 4
//!
//! [timing]
//! steering_step = 2
//!
//! [speed_limit]
//! smooth_adjust = true
//!
//! [[offsets.accel]]
//! bucket = 80
//! target = 82
//! ```
//!
//! 未出现的字段使用默认值（量产调校值）。

use std::fs;
use std::path::Path;

use mqb_protocol::{CanBus, HCA_TORQUE_FIELD_MAX, ROLLING_COUNTER_MODULUS};
use serde::{Deserialize, Serialize};

use crate::error::ConfigError;
use crate::offsets::OffsetTables;

/// 控制器配置
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct ControllerConfig {
    /// 输出帧目标总线
    pub bus: CanBus,

    /// 转向扭矩限制
    pub limits: SteeringLimits,

    /// 周期与节拍
    pub timing: CycleTiming,

    /// 限速识别选项
    pub speed_limit: SpeedLimitOptions,

    /// 偏移表
    pub offsets: OffsetTables,
}

impl ControllerConfig {
    /// 从 TOML 字符串解析并校验
    pub fn from_toml_str(content: &str) -> Result<Self, ConfigError> {
        let config: ControllerConfig = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// 从文件加载配置
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        Self::from_toml_str(&content)
    }

    /// 序列化为 TOML
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    /// 保存配置到文件
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<(), ConfigError> {
        fs::write(path, self.to_toml_string()?)?;
        Ok(())
    }

    /// 校验配置
    ///
    /// 所有限制必须在会话开始前确定合法，控制周期内不再做任何检查。
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.limits.validate()?;
        self.timing.validate()?;
        self.speed_limit.validate()?;
        Ok(())
    }
}

/// 转向扭矩限制（单位：0.01 Nm / 每次转向评估）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SteeringLimits {
    /// 最大扭矩幅值
    pub max_torque: i16,

    /// 扭矩幅值增大的最大步长
    pub max_rate_up: i16,

    /// 扭矩幅值减小的最大步长
    pub max_rate_down: i16,

    /// 驾驶员反向用力时的步长上限（增大、减小都受此限制）
    pub max_rate_down_opposed: i16,

    /// 驾驶员扭矩超过此值才视为"反向用力"
    pub driver_allowance: i16,

    /// HCA 连续使能的最长时间（秒）
    ///
    /// EPS 在 360 秒后会报故障，这里留出三倍余量。
    pub max_enabled_duration_s: f32,

    /// 扭矩保持完全不变的最长时间（秒）
    ///
    /// EPS 在 6 秒后会认为发送端卡死，这里同样留出三倍余量。
    pub max_static_torque_duration_s: f32,
}

impl Default for SteeringLimits {
    fn default() -> Self {
        Self {
            max_torque: 300,
            max_rate_up: 4,
            max_rate_down: 10,
            max_rate_down_opposed: 3,
            driver_allowance: 80,
            max_enabled_duration_s: 118.0,
            max_static_torque_duration_s: 1.9,
        }
    }
}

impl SteeringLimits {
    fn validate(&self) -> Result<(), ConfigError> {
        if self.max_torque <= 0 || self.max_torque > HCA_TORQUE_FIELD_MAX {
            return Err(ConfigError::invalid(
                "limits.max_torque",
                format!("must be within 1..={}", HCA_TORQUE_FIELD_MAX),
            ));
        }
        if self.max_rate_up <= 0 {
            return Err(ConfigError::invalid("limits.max_rate_up", "must be greater than 0"));
        }
        if self.max_rate_down <= 0 {
            return Err(ConfigError::invalid("limits.max_rate_down", "must be greater than 0"));
        }
        if self.max_rate_down_opposed <= 0 || self.max_rate_down_opposed > self.max_rate_down {
            return Err(ConfigError::invalid(
                "limits.max_rate_down_opposed",
                "must be within 1..=max_rate_down",
            ));
        }
        if self.driver_allowance < 0 {
            return Err(ConfigError::invalid("limits.driver_allowance", "must not be negative"));
        }
        check_duration("limits.max_enabled_duration_s", self.max_enabled_duration_s)?;
        check_duration(
            "limits.max_static_torque_duration_s",
            self.max_static_torque_duration_s,
        )?;
        Ok(())
    }
}

fn check_duration(field: &'static str, seconds: f32) -> Result<(), ConfigError> {
    if !seconds.is_finite() || seconds <= 0.0 {
        return Err(ConfigError::invalid(field, "must be a positive number of seconds"));
    }
    Ok(())
}

/// 周期与节拍
///
/// 所有子行为的频率都由"每 N 个基础周期执行一次"推导，没有独立定时器。
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CycleTiming {
    /// 基础控制周期频率（Hz）
    pub cycle_hz: u32,

    /// HCA_01 发送节拍（100Hz / 2 = 50Hz）
    pub steering_step: u32,

    /// LDW_02 发送节拍（100Hz / 10 = 10Hz）
    pub hud_step: u32,

    /// 限速规划器在按键发送开始后的最小间隔（周期数）
    pub planner_step: u32,

    /// 自动取消 / 自动恢复规则在按键发送开始后的最小间隔（周期数）
    pub button_watch_step: u32,

    /// 每次虚拟按键重复发送的帧数（16 帧 ≈ 0.5 秒 @ 33Hz）
    pub button_repeat_count: u8,
}

impl Default for CycleTiming {
    fn default() -> Self {
        Self {
            cycle_hz: 100,
            steering_step: 2,
            hud_step: 10,
            planner_step: 25,
            button_watch_step: 100,
            button_repeat_count: 16,
        }
    }
}

impl CycleTiming {
    /// 把秒数换算成转向评估次数（四舍五入）
    pub fn steering_cycles(&self, seconds: f32) -> u32 {
        let per_second = self.cycle_hz as f32 / self.steering_step as f32;
        (seconds * per_second).round() as u32
    }

    /// 把秒数换算成基础周期数（四舍五入）
    pub fn base_cycles(&self, seconds: f32) -> u32 {
        (seconds * self.cycle_hz as f32).round() as u32
    }

    fn validate(&self) -> Result<(), ConfigError> {
        for (field, value) in [
            ("timing.cycle_hz", self.cycle_hz),
            ("timing.steering_step", self.steering_step),
            ("timing.hud_step", self.hud_step),
            ("timing.planner_step", self.planner_step),
            ("timing.button_watch_step", self.button_watch_step),
        ] {
            if value == 0 {
                return Err(ConfigError::invalid(field, "must be greater than 0"));
            }
        }
        if self.planner_step >= self.button_watch_step {
            return Err(ConfigError::invalid(
                "timing.planner_step",
                "must be shorter than button_watch_step",
            ));
        }
        if self.button_repeat_count == 0 || self.button_repeat_count > ROLLING_COUNTER_MODULUS {
            return Err(ConfigError::invalid(
                "timing.button_repeat_count",
                format!("must be within 1..={}", ROLLING_COUNTER_MODULUS),
            ));
        }
        Ok(())
    }
}

/// 限速识别选项（对应用户设置界面的三个开关）
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpeedLimitOptions {
    /// 平滑调整：每按一次键后等待车速跟上再按下一次
    pub smooth_adjust: bool,

    /// 忽略与当前车速差距过大的限速（多为误识别）
    pub ignore_difference_too_high: bool,

    /// 跟车时忽略限速，改为跟随前车速度
    pub ignore_when_following_lead: bool,

    /// 交通标志原始值到 km/h 的比例
    pub sign_scale: f32,
}

impl Default for SpeedLimitOptions {
    fn default() -> Self {
        Self {
            smooth_adjust: false,
            ignore_difference_too_high: false,
            ignore_when_following_lead: false,
            sign_scale: 5.0,
        }
    }
}

impl SpeedLimitOptions {
    fn validate(&self) -> Result<(), ConfigError> {
        if !self.sign_scale.is_finite() || self.sign_scale <= 0.0 {
            return Err(ConfigError::invalid(
                "speed_limit.sign_scale",
                "must be a positive finite number",
            ));
        }
        Ok(())
    }
}
