//! # SO101 Bus Adapter Layer
//!
//! 舵机总线硬件抽象层，提供统一的总线接口抽象。
//!
//! 串口线协议（Feetech SCS 帧格式）由外部驱动层负责，不在本仓库范围内。
//! 本 crate 只定义边界：[`ServoBus`] trait、STS3215 控制表元数据、
//! 分层错误类型，以及一个用于测试与 `--simulate` 模式的台架仿真后端
//! （`bench` feature）。
//!
//! ```text
//! Diagnostics (so101-diag)
//!     ↓ ServoBus trait
//! Bus Layer (此 crate)
//!     ↓ 外部驱动实现 / BenchBus 仿真
//! Hardware
//! ```

use std::time::Duration;
use thiserror::Error;

pub mod control_table;

pub use control_table::Register;

#[cfg(feature = "bench")]
pub mod bench;

#[cfg(feature = "bench")]
pub use bench::{BenchBus, BenchServo};

use so101_poll::Sample;

/// 舵机总线 ID（1..=253，0xFE 为广播，由驱动层处理）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct ServoId(pub u8);

impl std::fmt::Display for ServoId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// 舵机型号（ping 返回的型号编号）
#[derive(Debug, Clone, Copy, PartialEq, Eq, num_enum::FromPrimitive)]
#[repr(u16)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum ServoModel {
    /// Feetech STS3215（SO101 全臂使用）
    Sts3215 = 777,

    /// 未知型号编号
    #[num_enum(default)]
    Unknown = 0,
}

impl ServoModel {
    pub fn name(&self) -> &'static str {
        match self {
            ServoModel::Sts3215 => "sts3215",
            ServoModel::Unknown => "unknown",
        }
    }
}

/// 总线适配层统一错误类型
#[derive(Error, Debug)]
pub enum BusError {
    #[error("IO Error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Device Error: {0}")]
    Device(#[from] BusDeviceError),
    #[error("Read timeout (servo {id})")]
    Timeout { id: ServoId },
    #[error("Register {register:?} is read-only")]
    ReadOnlyRegister { register: Register },
    #[error("Bus not connected")]
    NotConnected,
}

/// 设备/后端错误的结构化分类
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum BusDeviceErrorKind {
    Unknown,
    /// 串口设备不存在
    NoDevice,
    /// 舵机不响应 ping
    NotResponding,
    /// 无串口驱动后端（线协议由外部驱动提供）
    BackendUnavailable,
    AccessDenied,
    Busy,
    InvalidResponse,
}

/// 结构化设备错误
#[derive(Error, Debug, Clone)]
#[error("{kind:?}: {message}")]
pub struct BusDeviceError {
    pub kind: BusDeviceErrorKind,
    pub message: String,
}

impl BusDeviceError {
    pub fn new(kind: BusDeviceErrorKind, message: impl Into<String>) -> Self {
        Self {
            kind,
            message: message.into(),
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(
            self.kind,
            BusDeviceErrorKind::NoDevice
                | BusDeviceErrorKind::AccessDenied
                | BusDeviceErrorKind::BackendUnavailable
        )
    }
}

impl From<String> for BusDeviceError {
    fn from(message: String) -> Self {
        Self::new(BusDeviceErrorKind::Unknown, message)
    }
}

/// 舵机总线抽象
///
/// 诊断层只依赖这组操作。真实硬件由外部驱动 crate 实现本 trait 接入；
/// 仓库内置的实现是 `bench` 仿真后端。
pub trait ServoBus {
    /// ping 指定舵机，返回型号编号
    fn ping(&mut self, id: ServoId) -> Result<u16, BusError>;

    /// 读控制表寄存器（原始值，无归一化）
    fn read_register(&mut self, id: ServoId, register: Register) -> Result<i32, BusError>;

    /// 写控制表寄存器（原始值，无归一化）
    fn write_register(&mut self, id: ServoId, register: Register, value: i32)
    -> Result<(), BusError>;

    /// 设置读超时（可选；默认忽略）
    fn set_read_timeout(&mut self, _timeout: Duration) {}

    fn enable_torque(&mut self, id: ServoId) -> Result<(), BusError> {
        self.write_register(id, Register::TorqueEnable, 1)
    }

    fn disable_torque(&mut self, id: ServoId) -> Result<(), BusError> {
        self.write_register(id, Register::TorqueEnable, 0)
    }

    fn set_goal_position(&mut self, id: ServoId, position: i32) -> Result<(), BusError> {
        self.write_register(id, Register::GoalPosition, position)
    }

    fn present_position(&mut self, id: ServoId) -> Result<i32, BusError> {
        self.read_register(id, Register::PresentPosition)
    }

    fn is_moving(&mut self, id: ServoId) -> Result<bool, BusError> {
        Ok(self.read_register(id, Register::Moving)? != 0)
    }

    /// 取一次（位置，运动标志）采样，供收敛轮询器使用
    fn sample(&mut self, id: ServoId) -> Result<Sample, BusError> {
        let position = self.present_position(id)?;
        let moving = self.is_moving(id)?;
        Ok(Sample::new(position, moving))
    }
}

/// 打开真实串口总线
///
/// 线协议是外部驱动层的职责：本仓库不内置串口后端，真实硬件通过
/// 外部实现 [`ServoBus`] 的驱动 crate 接入。直接传入串口路径会得到
/// `BackendUnavailable`，提示改用 `--simulate` 或接入外部驱动。
pub fn open(port: &str) -> Result<Box<dyn ServoBus>, BusError> {
    tracing::warn!(port, "no serial driver backend linked");
    Err(BusError::Device(BusDeviceError::new(
        BusDeviceErrorKind::BackendUnavailable,
        format!(
            "no serial driver backend linked for '{port}'; the SCS wire protocol lives in the \
             external driver layer — plug in a ServoBus implementation, or run with --simulate"
        ),
    )))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_servo_model_from_number() {
        assert_eq!(ServoModel::from(777u16), ServoModel::Sts3215);
        assert_eq!(ServoModel::from(1234u16), ServoModel::Unknown);
        assert_eq!(ServoModel::Sts3215.name(), "sts3215");
    }

    #[test]
    fn test_device_error_fatal_classification() {
        let err = BusDeviceError::new(BusDeviceErrorKind::NoDevice, "missing /dev/ttyACM0");
        assert!(err.is_fatal());

        let err = BusDeviceError::new(BusDeviceErrorKind::NotResponding, "servo 5 silent");
        assert!(!err.is_fatal());

        let err = BusDeviceError::from("something odd".to_string());
        assert_eq!(err.kind, BusDeviceErrorKind::Unknown);
    }

    #[test]
    fn test_open_reports_backend_unavailable() {
        match open("/dev/ttyACM0") {
            Err(BusError::Device(e)) => {
                assert_eq!(e.kind, BusDeviceErrorKind::BackendUnavailable);
                assert!(e.is_fatal());
            },
            other => panic!("expected BackendUnavailable, got {:?}", other.map(|_| ())),
        }
    }

    #[test]
    fn test_bus_error_display() {
        let err = BusError::Timeout { id: ServoId(5) };
        assert_eq!(format!("{}", err), "Read timeout (servo 5)");

        let err = BusError::ReadOnlyRegister {
            register: Register::PresentPosition,
        };
        assert!(format!("{}", err).contains("read-only"));
    }
}
