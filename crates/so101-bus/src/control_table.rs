//! # STS3215 控制表
//!
//! 诊断脚本会读取的控制表条目（地址 / 宽度为描述性元数据，供寄存器
//! 转储展示；帧编码由外部驱动层完成）。
//!
//! | 区域 | 地址范围 | 说明 |
//! |------|----------|------|
//! | EPROM | 5..=16 | 配置项，掉电保持 |
//! | SRAM | 40..=66 | 运行状态，掉电丢失 |

/// 控制表寄存器
///
/// 变体按地址升序声明，派生的 `Ord` 即地址序（有序容器的键依赖这一点）。
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum Register {
    Id,
    Baudrate,
    ReturnDelayTime,
    ResponseStatusLevel,
    MinAngleLimit,
    MaxAngleLimit,
    MaxTemperatureLimit,
    MaxVoltageLimit,
    MinVoltageLimit,
    MaxTorqueLimit,
    TorqueEnable,
    GoalPosition,
    Lock,
    PresentPosition,
    PresentSpeed,
    PresentLoad,
    PresentVoltage,
    PresentTemperature,
    Moving,
}

impl Register {
    /// 诊断转储遍历的全部寄存器（按地址升序）
    pub const ALL: [Register; 19] = [
        Register::Id,
        Register::Baudrate,
        Register::ReturnDelayTime,
        Register::ResponseStatusLevel,
        Register::MinAngleLimit,
        Register::MaxAngleLimit,
        Register::MaxTemperatureLimit,
        Register::MaxVoltageLimit,
        Register::MinVoltageLimit,
        Register::MaxTorqueLimit,
        Register::TorqueEnable,
        Register::GoalPosition,
        Register::Lock,
        Register::PresentPosition,
        Register::PresentSpeed,
        Register::PresentLoad,
        Register::PresentVoltage,
        Register::PresentTemperature,
        Register::Moving,
    ];

    /// 控制表地址
    pub fn address(&self) -> u8 {
        match self {
            Register::Id => 5,
            Register::Baudrate => 6,
            Register::ReturnDelayTime => 7,
            Register::ResponseStatusLevel => 8,
            Register::MinAngleLimit => 9,
            Register::MaxAngleLimit => 11,
            Register::MaxTemperatureLimit => 13,
            Register::MaxVoltageLimit => 14,
            Register::MinVoltageLimit => 15,
            Register::MaxTorqueLimit => 16,
            Register::TorqueEnable => 40,
            Register::GoalPosition => 42,
            Register::Lock => 48,
            Register::PresentPosition => 56,
            Register::PresentSpeed => 58,
            Register::PresentLoad => 60,
            Register::PresentVoltage => 62,
            Register::PresentTemperature => 63,
            Register::Moving => 66,
        }
    }

    /// 字节宽度（1 或 2）
    pub fn size(&self) -> u8 {
        match self {
            Register::MinAngleLimit
            | Register::MaxAngleLimit
            | Register::MaxTorqueLimit
            | Register::GoalPosition
            | Register::PresentPosition
            | Register::PresentSpeed
            | Register::PresentLoad => 2,
            _ => 1,
        }
    }

    /// 控制表名称（与原始固件文档一致的下划线写法）
    pub fn name(&self) -> &'static str {
        match self {
            Register::Id => "ID",
            Register::Baudrate => "Baudrate",
            Register::ReturnDelayTime => "Return_Delay_Time",
            Register::ResponseStatusLevel => "Response_Status_Level",
            Register::MinAngleLimit => "Min_Angle_Limit",
            Register::MaxAngleLimit => "Max_Angle_Limit",
            Register::MaxTemperatureLimit => "Max_Temperature_Limit",
            Register::MaxVoltageLimit => "Max_Voltage_Limit",
            Register::MinVoltageLimit => "Min_Voltage_Limit",
            Register::MaxTorqueLimit => "Max_Torque_Limit",
            Register::TorqueEnable => "Torque_Enable",
            Register::GoalPosition => "Goal_Position",
            Register::Lock => "Lock",
            Register::PresentPosition => "Present_Position",
            Register::PresentSpeed => "Present_Speed",
            Register::PresentLoad => "Present_Load",
            Register::PresentVoltage => "Present_Voltage",
            Register::PresentTemperature => "Present_Temperature",
            Register::Moving => "Moving",
        }
    }

    /// 状态类寄存器（舵机侧只读）
    pub fn is_read_only(&self) -> bool {
        matches!(
            self,
            Register::PresentPosition
                | Register::PresentSpeed
                | Register::PresentLoad
                | Register::PresentVoltage
                | Register::PresentTemperature
                | Register::Moving
        )
    }
}
