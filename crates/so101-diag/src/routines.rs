//! # 诊断例程
//!
//! 原始诊断脚本的流程化重写：逐舵机扫描、寄存器转储、扭矩回路、
//! 自由运动检查、wrist_roll 完整排查。所有例程对 [`ServoBus`] 泛型，
//! 台架仿真与真实硬件走同一条路径。
//!
//! 错误约定：不可达舵机（ping 超时）是诊断结论而非错误，体现为报告
//! 字段；只有致命的传输/后端错误才通过 `?` 传播。

use std::thread;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use so101_bus::{BusDeviceErrorKind, BusError, Register, ServoBus, ServoId};
use so101_poll::{PollOutcome, PollPolicy, Sample, Setpoint, poll_until_settled_with};

use crate::Result;
use crate::motors::MotorSpec;
use crate::report::{
    FreeMotionReport, MotorReport, MoveResult, PositionStatistics, RegisterReading, TorqueCheck,
};

/// 扭矩关闭下位置摆动的可疑阈值（原始单位）
pub const FREE_MOTION_VARIATION_LIMIT: i32 = 50;

/// 运动测试幅度
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MovementMode {
    /// 中等幅度（常规测试）
    Standard,

    /// 大幅度（需人工盯紧）
    Large,
}

impl MovementMode {
    /// 相对当前位置的偏移序列
    pub fn offsets(&self) -> &'static [i32] {
        match self {
            MovementMode::Standard => &[0, 300, -300, 150, -150, 0],
            MovementMode::Large => &[0, 600, -600, 400, -400, 200, -200, 0],
        }
    }

    /// 目标位置的安全钳制范围
    pub fn safe_range(&self) -> (i32, i32) {
        match self {
            MovementMode::Standard => (500, 3500),
            MovementMode::Large => (200, 3800),
        }
    }
}

/// 例程节奏参数
///
/// 原始脚本的等待节奏针对真实舵机；台架仿真一次读取即推进一步，
/// 等待没有意义，所以单独给出 `bench()` 预设。
#[derive(Debug, Clone, Copy)]
pub struct ProcedureTimings {
    /// 到位容差（原始单位）
    pub tolerance: i32,

    /// 收敛轮询策略
    pub settle: PollPolicy,

    /// 相邻两次运动之间的停顿
    pub pause_between_moves: Duration,

    /// 扭矩开关后的稳定等待
    pub torque_settle: Duration,

    /// 自由运动检查的采样数
    pub free_motion_samples: usize,

    /// 自由运动检查的采样间隔
    pub free_motion_interval: Duration,
}

impl Default for ProcedureTimings {
    /// 常规扫描节奏（对应 motor 诊断脚本：容差 30 / 超时 5s / 200ms）
    fn default() -> Self {
        Self {
            tolerance: 30,
            settle: PollPolicy::default(),
            pause_between_moves: Duration::from_secs(1),
            torque_settle: Duration::from_millis(500),
            free_motion_samples: 6,
            free_motion_interval: Duration::from_millis(500),
        }
    }
}

impl ProcedureTimings {
    /// wrist_roll 排查节奏（更紧：容差 20 / 超时 3s / 100ms + 卡死检测）
    pub fn wrist_roll() -> Self {
        Self {
            tolerance: 20,
            settle: PollPolicy {
                timeout: Duration::from_secs(3),
                poll_interval: Duration::from_millis(100),
                stuck_samples: 5,
                stuck_epsilon: 2,
            },
            ..Self::default()
        }
    }

    /// 台架仿真节奏：全部等待归零
    pub fn bench() -> Self {
        Self {
            tolerance: 30,
            settle: PollPolicy {
                timeout: Duration::from_secs(10),
                poll_interval: Duration::ZERO,
                stuck_samples: 5,
                stuck_epsilon: 2,
            },
            pause_between_moves: Duration::ZERO,
            torque_settle: Duration::ZERO,
            free_motion_samples: 6,
            free_motion_interval: Duration::ZERO,
        }
    }
}

/// ping 失败是否应视为"舵机不可达"（而非传播错误）
fn is_unreachable(err: &BusError) -> bool {
    match err {
        BusError::Timeout { .. } => true,
        BusError::Device(e) => matches!(
            e.kind,
            BusDeviceErrorKind::NotResponding | BusDeviceErrorKind::Busy
        ),
        _ => false,
    }
}

/// 逐舵机扫描测试
///
/// ping → 使能扭矩 → 按偏移序列运动并等待收敛 → 读遥测 → 关扭矩。
/// 每次采样通过 `on_sample` 上报（CLI 打印实时位置）。
pub fn sweep_motor<B: ServoBus + ?Sized>(
    bus: &mut B,
    spec: &MotorSpec,
    mode: MovementMode,
    timings: &ProcedureTimings,
    mut on_sample: impl FnMut(&Sample, Duration),
) -> Result<MotorReport> {
    let model_number = match bus.ping(spec.id) {
        Ok(m) => m,
        Err(e) if is_unreachable(&e) => {
            tracing::warn!(motor = spec.name, id = spec.id.0, "motor not responding to ping");
            return Ok(MotorReport::unreachable(spec.name, spec.id.0));
        },
        Err(e) => return Err(e),
    };

    tracing::info!(
        motor = spec.name,
        id = spec.id.0,
        model_number,
        ?mode,
        "sweep test start"
    );

    bus.enable_torque(spec.id)?;
    thread::sleep(timings.torque_settle);

    let moves = run_moves(bus, spec.id, mode, timings, &mut on_sample);

    // 遥测读取失败只留空，不终止报告
    let temperature = bus.read_register(spec.id, Register::PresentTemperature).ok();
    let voltage = bus.read_register(spec.id, Register::PresentVoltage).ok();
    let load = bus.read_register(spec.id, Register::PresentLoad).ok();

    // 扭矩关断是所有退出路径的收尾
    let disable = bus.disable_torque(spec.id);
    let moves = moves?;
    disable?;

    Ok(MotorReport {
        name: spec.name.to_string(),
        id: spec.id.0,
        model_number: Some(model_number),
        reachable: true,
        moves,
        temperature,
        voltage,
        load,
    })
}

fn run_moves<B: ServoBus + ?Sized>(
    bus: &mut B,
    id: ServoId,
    mode: MovementMode,
    timings: &ProcedureTimings,
    on_sample: &mut impl FnMut(&Sample, Duration),
) -> Result<Vec<MoveResult>> {
    let (safe_min, safe_max) = mode.safe_range();
    let mut moves = Vec::with_capacity(mode.offsets().len());

    for &offset in mode.offsets() {
        let current = bus.present_position(id)?;
        let target = (current + offset).clamp(safe_min, safe_max);

        bus.set_goal_position(id, target)?;

        let outcome = poll_until_settled_with(
            Setpoint::new(target, timings.tolerance),
            &timings.settle,
            || bus.sample(id),
            |sample, elapsed| on_sample(sample, elapsed),
        )?;

        tracing::info!(
            id = id.0,
            offset,
            target,
            outcome = outcome.description(),
            elapsed_ms = outcome.elapsed().as_millis() as u64,
            "movement finished"
        );

        moves.push(MoveResult {
            offset,
            target,
            outcome,
        });

        thread::sleep(timings.pause_between_moves);
    }

    Ok(moves)
}

/// 寄存器转储的人读注释
fn interpret(register: Register, value: i32) -> Option<String> {
    match register {
        Register::TorqueEnable => Some(if value == 1 { "Enabled" } else { "Disabled" }.into()),
        Register::Moving => Some(if value == 1 { "Moving" } else { "Stopped" }.into()),
        Register::Lock => Some(if value == 1 { "Locked" } else { "Unlocked" }.into()),
        Register::PresentTemperature | Register::MaxTemperatureLimit => Some(format!("{value}°C")),
        Register::PresentVoltage | Register::MaxVoltageLimit | Register::MinVoltageLimit => {
            Some(format!("{:.1}V", value as f64 / 10.0))
        },
        Register::MinAngleLimit
        | Register::MaxAngleLimit
        | Register::GoalPosition
        | Register::PresentPosition => Some(format!("(~{:.1}°)", value as f64 * 360.0 / 4095.0)),
        _ => None,
    }
}

/// 控制表全量转储
///
/// 逐条读取 [`Register::ALL`]；单条读失败记录在条目里，不中断转储。
pub fn dump_registers<B: ServoBus + ?Sized>(bus: &mut B, id: ServoId) -> Vec<RegisterReading> {
    Register::ALL
        .iter()
        .map(|&register| match bus.read_register(id, register) {
            Ok(value) => RegisterReading {
                name: register.name(),
                address: register.address(),
                size: register.size(),
                value: Some(value),
                error: None,
                note: interpret(register, value),
            },
            Err(e) => RegisterReading {
                name: register.name(),
                address: register.address(),
                size: register.size(),
                value: None,
                error: Some(e.to_string()),
                note: None,
            },
        })
        .collect()
}

/// 扭矩回路检查：关断/使能各回读一次
pub fn torque_check<B: ServoBus + ?Sized>(
    bus: &mut B,
    id: ServoId,
    timings: &ProcedureTimings,
) -> Result<TorqueCheck> {
    bus.disable_torque(id)?;
    thread::sleep(timings.torque_settle);
    let disable_ok = bus.read_register(id, Register::TorqueEnable)? == 0;

    bus.enable_torque(id)?;
    thread::sleep(timings.torque_settle);
    let enable_ok = bus.read_register(id, Register::TorqueEnable)? == 1;

    // 检查完毕保持关断
    bus.disable_torque(id)?;

    Ok(TorqueCheck {
        disable_ok,
        enable_ok,
    })
}

/// 自由运动检查
///
/// 扭矩关闭后采样位置序列；摆动超过
/// [`FREE_MOTION_VARIATION_LIMIT`] 说明关节在无驱动状态下仍在动，
/// 疑似联轴器松动或外力。
pub fn free_motion_check<B: ServoBus + ?Sized>(
    bus: &mut B,
    id: ServoId,
    timings: &ProcedureTimings,
) -> Result<FreeMotionReport> {
    bus.disable_torque(id)?;
    thread::sleep(timings.torque_settle);

    let mut positions = Vec::with_capacity(timings.free_motion_samples);
    for _ in 0..timings.free_motion_samples {
        positions.push(bus.present_position(id)?);
        thread::sleep(timings.free_motion_interval);
    }

    let statistics = PositionStatistics::calculate(&positions);
    let suspicious = statistics.variation() > FREE_MOTION_VARIATION_LIMIT;

    if suspicious {
        tracing::warn!(
            id = id.0,
            variation = statistics.variation(),
            "position drifts with torque disabled"
        );
    }

    Ok(FreeMotionReport {
        positions,
        statistics,
        suspicious,
    })
}

/// wrist_roll 排查结论
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Finding {
    /// 舵机不响应 ping
    NotResponding,

    /// 扭矩使能/关断回读不一致
    TorqueControlFault,

    /// 扭矩关闭下位置仍在动
    MechanicalLooseness,

    /// Moving 为真但位置不再变化
    StuckUnderLoad,

    /// 运动超时未到位
    MovementTimedOut,
}

impl Finding {
    /// 对应的排查建议
    pub fn recommendation(&self) -> &'static str {
        match self {
            Finding::NotResponding => "Check wiring and servo ID; verify the bus power supply",
            Finding::TorqueControlFault => {
                "Torque register does not follow commands; try a different control mode or replace \
                 the servo"
            },
            Finding::MechanicalLooseness => {
                "Check physical mounting and coupling of the joint; look for loose gears or \
                 external force"
            },
            Finding::StuckUnderLoad => {
                "Servo reports motion but does not move; check for obstruction or damaged internals"
            },
            Finding::MovementTimedOut => {
                "Movement did not complete in time; compare calibration values with a known-good \
                 arm"
            },
        }
    }
}

/// wrist_roll 完整排查报告
#[derive(Debug, Clone, Serialize)]
pub struct WristRollReport {
    pub id: u8,
    pub reachable: bool,
    pub model_number: Option<u16>,
    pub registers: Vec<RegisterReading>,
    pub torque: Option<TorqueCheck>,
    pub free_motion: Option<FreeMotionReport>,
    pub moves: Vec<MoveResult>,
    pub findings: Vec<Finding>,
}

impl WristRollReport {
    pub fn healthy(&self) -> bool {
        self.reachable && self.findings.is_empty()
    }
}

/// wrist_roll 完整排查流程
///
/// ping → 寄存器转储 → 扭矩回路 → 自由运动 → ±100 短程运动
/// （带卡死检测），最后汇总结论。
pub fn wrist_roll_procedure<B: ServoBus + ?Sized>(
    bus: &mut B,
    id: ServoId,
    timings: &ProcedureTimings,
    mut on_sample: impl FnMut(&Sample, Duration),
) -> Result<WristRollReport> {
    let model_number = match bus.ping(id) {
        Ok(m) => Some(m),
        Err(e) if is_unreachable(&e) => {
            return Ok(WristRollReport {
                id: id.0,
                reachable: false,
                model_number: None,
                registers: Vec::new(),
                torque: None,
                free_motion: None,
                moves: Vec::new(),
                findings: vec![Finding::NotResponding],
            });
        },
        Err(e) => return Err(e),
    };

    let registers = dump_registers(bus, id);
    let torque = torque_check(bus, id, timings)?;
    let free_motion = free_motion_check(bus, id, timings)?;

    // 短程运动：±100，钳制在常规安全范围内
    bus.enable_torque(id)?;
    thread::sleep(timings.torque_settle);

    let (safe_min, safe_max) = MovementMode::Standard.safe_range();
    let mut moves = Vec::new();
    let moves_result: Result<()> = (|| {
        for offset in [0, 100, -100, 0] {
            let current = bus.present_position(id)?;
            let target = (current + offset).clamp(safe_min, safe_max);
            bus.set_goal_position(id, target)?;

            let outcome = poll_until_settled_with(
                Setpoint::new(target, timings.tolerance),
                &timings.settle,
                || bus.sample(id),
                |sample, elapsed| on_sample(sample, elapsed),
            )?;
            moves.push(MoveResult {
                offset,
                target,
                outcome,
            });
            thread::sleep(timings.pause_between_moves);
        }
        Ok(())
    })();

    let disable = bus.disable_torque(id);
    moves_result?;
    disable?;

    let mut findings = Vec::new();
    if !torque.passed() {
        findings.push(Finding::TorqueControlFault);
    }
    if free_motion.suspicious {
        findings.push(Finding::MechanicalLooseness);
    }
    if moves.iter().any(|m| matches!(m.outcome, PollOutcome::Stuck { .. })) {
        findings.push(Finding::StuckUnderLoad);
    }
    if moves.iter().any(|m| matches!(m.outcome, PollOutcome::TimedOut { .. })) {
        findings.push(Finding::MovementTimedOut);
    }

    Ok(WristRollReport {
        id: id.0,
        reachable: true,
        model_number,
        registers,
        torque: Some(torque),
        free_motion: Some(free_motion),
        moves,
        findings,
    })
}
