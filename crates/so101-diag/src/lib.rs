//! # SO101 Diagnostics
//!
//! SO101 机械臂的诊断例程：逐个舵机的运动扫描、控制表转储、扭矩
//! 回路检查、自由运动检查，以及针对 wrist_roll 关节的完整排查流程。
//!
//! 本 crate 只产出结构化报告（全部可 serde 序列化），终端展示留给
//! CLI 层。总线访问通过 `so101-bus` 的 [`ServoBus`] trait，收敛等待
//! 复用 `so101-poll` 的轮询器。
//!
//! [`ServoBus`]: so101_bus::ServoBus

pub mod motors;
pub mod report;
pub mod routines;

pub use motors::{ArmPreset, MotorSpec, NormMode};
pub use report::{
    DiagnosticSummary, FreeMotionReport, MotorReport, MoveResult, PositionStatistics,
    RegisterReading, TorqueCheck,
};
pub use routines::{
    Finding, MovementMode, ProcedureTimings, WristRollReport, dump_registers, free_motion_check,
    sweep_motor, torque_check, wrist_roll_procedure,
};

/// 诊断层 Result 别名（传输错误用总线错误表达）
pub type Result<T> = std::result::Result<T, so101_bus::BusError>;
