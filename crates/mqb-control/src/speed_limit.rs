//! # 限速识别 → 巡航设定速度规划
//!
//! 根据交通标志识别到的限速，决定巡航设定速度是否需要调整、调整到多少，
//! 并给出下一次应按下的虚拟按键。规划器本身从不发帧，只输出建议。
//!
//! ## 流程
//!
//! 1. 没有进行中的调整时锁存当前限速档位
//! 2. 接管且行驶中：车速高于 / 低于档位时开始一次调整（减速表 / 加速表）
//! 3. 未接管：若之前接管过则放弃进行中的调整；随后按"未接管表"预设
//! 4. 收敛：设定速度 > 目标按减速键；差距 ≥ 10 按加速键；差距 < 10 按恢复键（仅接管时）
//! 5. 不满足收敛条件（已到达、巡航不可用、没有目标）时标记该档位已处理
//!
//! 档位只做精确匹配；表中没有的档位不会产生目标，调整会停滞到档位变化为止。

use mqb_protocol::{ButtonAction, CruiseState, VehicleState};
use tracing::{debug, warn};

use crate::config::{CycleTiming, SpeedLimitOptions};
use crate::offsets::{OffsetTableKind, OffsetTables};

/// 车速高出限速超过此值时视为误识别（km/h）
pub const DECEL_DIFFERENCE_TOO_HIGH: i32 = 25;
/// 车速低于限速超过此值时限制单次提升幅度（km/h）
pub const ACCEL_DIFFERENCE_TOO_HIGH: i32 = 20;
/// 单次提升幅度上限（km/h）
pub const MAX_ACCEL_INCREMENT: i32 = 20;
/// 受限提升后的目标不得低于此值（km/h）
pub const MIN_CAPPED_TARGET: i32 = 50;
/// 前车距离超过此值视为"无前车"（m）
pub const LEAD_FAR_DISTANCE: f32 = 80.0;
/// 跟车时目标 = 当前车速 + 此值（km/h）
pub const LEAD_SPEED_MARGIN: i32 = 2;
/// 设定速度与车速差距小于此值时允许下一次按键（km/h）
pub const SMOOTH_ADJUST_GAP: i32 = 3;
/// 加速键一次跳一个 10 km/h 档位，差距小于此值时改用恢复键逐 1 km/h 调整
pub const COARSE_STEP: i32 = 10;
/// 平滑调整时两次按键之间的最长等待（秒）
pub const SMOOTH_ADJUST_TIMEOUT_S: f32 = 10.0;

/// 限速规划状态（会话内持久）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SpeedLimitState {
    /// 锁存的限速档位（km/h）
    pub speed_limit: i32,
    /// 目标设定速度（km/h），0 表示没有目标
    pub target_setpoint: i32,
    /// 最近一次处理完毕的档位，用于抑制重复触发
    pub processed_speed_limit: Option<i32>,
    /// 调整进行中
    pub in_progress: bool,
    /// 之前的评估处于接管状态
    pub was_engaged_before: bool,
    /// 本次调整使用平滑模式
    pub smooth_adjust: bool,
    /// 上一次给出按键建议的周期
    pub last_step_cycle: Option<u32>,
    /// 平滑模式下允许下一次按键
    pub allow_next_press: bool,
}

impl SpeedLimitState {
    fn is_processed(&self, speed_limit: i32) -> bool {
        self.processed_speed_limit == Some(speed_limit)
    }

    fn finish(&mut self) {
        if self.in_progress {
            debug!(
                speed_limit = self.speed_limit,
                target = self.target_setpoint,
                "speed limit adjustment finished"
            );
        }
        self.in_progress = false;
        self.processed_speed_limit = Some(self.speed_limit);
    }
}

/// 单次规划的输入（单位均为 km/h）
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlannerInput {
    pub engaged: bool,
    pub cruise: CruiseState,
    pub standstill: bool,
    pub current_speed: i32,
    pub setpoint: i32,
    /// 本周期识别到的限速档位
    pub speed_limit: i32,
    /// 前车距离（m），0 表示无前车
    pub radar_distance: f32,
    /// 虚拟按键正在发送
    pub press_in_flight: bool,
    pub cycle: u32,
}

impl PlannerInput {
    /// 从车辆快照换算
    pub fn from_vehicle(
        engaged: bool,
        vehicle: &VehicleState,
        sign_scale: f32,
        press_in_flight: bool,
        cycle: u32,
    ) -> Self {
        Self {
            engaged,
            cruise: vehicle.cruise,
            standstill: vehicle.standstill,
            current_speed: vehicle.speed_kph(),
            setpoint: vehicle.cruise.setpoint_kph(),
            speed_limit: (vehicle.traffic_sign_raw * sign_scale).round() as i32,
            radar_distance: vehicle.radar_distance,
            press_in_flight,
            cycle,
        }
    }

    fn has_lead(&self) -> bool {
        self.radar_distance > 0.0
    }
}

/// 偏移表未命中
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TableMiss {
    pub kind: OffsetTableKind,
    pub speed_limit: i32,
}

/// 单次规划的结果
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PlannerDecision {
    /// 建议的虚拟按键
    pub action: Option<ButtonAction>,
    /// 本次评估中发生的偏移表未命中
    pub table_miss: Option<TableMiss>,
}

/// 限速规划器
#[derive(Debug, Clone)]
pub struct SpeedLimitPlanner {
    options: SpeedLimitOptions,
    tables: OffsetTables,
    step_timeout_cycles: u32,
}

impl SpeedLimitPlanner {
    pub fn new(options: &SpeedLimitOptions, tables: &OffsetTables, timing: &CycleTiming) -> Self {
        Self {
            options: options.clone(),
            tables: tables.clone(),
            step_timeout_cycles: timing.base_cycles(SMOOTH_ADJUST_TIMEOUT_S),
        }
    }

    pub fn options(&self) -> &SpeedLimitOptions {
        &self.options
    }

    fn lookup(
        &self,
        kind: OffsetTableKind,
        speed_limit: i32,
        decision: &mut PlannerDecision,
    ) -> Option<i32> {
        let target = self.tables.lookup(kind, speed_limit);
        if target.is_none() {
            warn!(table = kind.name(), speed_limit, "no offset table entry for speed limit");
            decision.table_miss = Some(TableMiss { kind, speed_limit });
        }
        target
    }

    /// 执行一次规划并更新状态
    pub fn evaluate(&self, state: &mut SpeedLimitState, input: &PlannerInput) -> PlannerDecision {
        let mut decision = PlannerDecision::default();
        let speed = input.current_speed;
        let setpoint = input.setpoint;

        if !state.in_progress {
            state.speed_limit = input.speed_limit;
            state.target_setpoint = 0;
            state.last_step_cycle = None;
            state.smooth_adjust = false;
        }
        let limit = state.speed_limit;

        if input.engaged && input.cruise.enabled && !input.standstill {
            state.was_engaged_before = true;

            // 车速高于限速
            if speed > limit && !state.in_progress && !state.is_processed(limit) {
                state.in_progress = true;
                state.smooth_adjust = self.options.smooth_adjust;
                debug!(speed, speed_limit = limit, "speed limit adjustment started (decel)");

                if self.options.ignore_difference_too_high && speed - limit > DECEL_DIFFERENCE_TOO_HIGH {
                    // 差距不合理，多为误识别，直接视为已处理
                    state.processed_speed_limit = Some(limit);
                } else if self.options.ignore_when_following_lead && input.has_lead() {
                    // 跟车时保持车流速度
                    state.target_setpoint = speed + LEAD_SPEED_MARGIN;
                } else if let Some(target) = self.lookup(OffsetTableKind::Decel, limit, &mut decision) {
                    state.target_setpoint = target;
                }
            }

            // 车速低于限速
            if speed < limit && !state.in_progress && !state.is_processed(limit) {
                state.in_progress = true;
                debug!(speed, speed_limit = limit, "speed limit adjustment started (accel)");

                let no_close_lead = !input.has_lead() || input.radar_distance > LEAD_FAR_DISTANCE;
                if self.options.ignore_difference_too_high
                    && limit - speed > ACCEL_DIFFERENCE_TOO_HIGH
                    && no_close_lead
                {
                    // 无前车时限制单次提升幅度，避免猛加速
                    let capped = speed + MAX_ACCEL_INCREMENT;
                    if capped < limit && capped >= MIN_CAPPED_TARGET {
                        state.target_setpoint = capped;
                    }
                } else if let Some(target) = self.lookup(OffsetTableKind::Accel, limit, &mut decision) {
                    state.target_setpoint = target;
                }
            }
        } else if !input.engaged {
            // 接管 → 未接管：放弃进行中的调整（不标记已处理）
            if state.was_engaged_before {
                if state.in_progress {
                    debug!(speed_limit = limit, "speed limit adjustment aborted on disengage");
                }
                state.in_progress = false;
                state.was_engaged_before = false;
            }

            // 未接管时像原厂 pACC 一样预设巡航速度
            if !state.in_progress && !state.is_processed(limit) {
                state.in_progress = true;
                if let Some(target) = self.lookup(OffsetTableKind::NotEngaged, limit, &mut decision) {
                    state.target_setpoint = target;
                }
            }
        }

        let target = state.target_setpoint;
        if state.in_progress && setpoint != target && target > 0 && input.cruise.available {
            if !input.press_in_flight {
                if state.smooth_adjust {
                    // 每次按键后等车速跟上中间设定速度，减速更柔和
                    let elapsed = state
                        .last_step_cycle
                        .is_none_or(|last| input.cycle.wrapping_sub(last) > self.step_timeout_cycles);
                    if (setpoint - speed).abs() < SMOOTH_ADJUST_GAP
                        || (speed < setpoint && target <= speed)
                        || elapsed
                    {
                        state.allow_next_press = true;
                    }
                }

                if state.allow_next_press || !state.smooth_adjust {
                    state.allow_next_press = false;
                    state.last_step_cycle = Some(input.cycle);
                    if setpoint > target {
                        decision.action = Some(ButtonAction::DecelCruise);
                    }
                    if setpoint < target && target - setpoint >= COARSE_STEP {
                        decision.action = Some(ButtonAction::AccelCruise);
                    }
                }

                if setpoint < target && target - setpoint < COARSE_STEP {
                    if input.engaged {
                        decision.action = Some(ButtonAction::ResumeCruise);
                    } else {
                        // 未接管时按恢复键会让系统自行接管，只能放弃细调
                        debug!(speed_limit = limit, "fine adjustment not possible while disengaged");
                        state.in_progress = false;
                        state.processed_speed_limit = Some(limit);
                    }
                }
            }
        } else {
            state.finish();
        }

        decision
    }
}
