//! 命令实现

use clap::ValueEnum;

pub mod calibration;
pub mod camera;
pub mod config;
pub mod motors;
pub mod registers;
pub mod train;
pub mod wrist_roll;

pub use calibration::CalibrationCommand;
pub use camera::CameraCommand;
pub use config::ConfigCommand;
pub use motors::MotorsCommand;
pub use registers::RegistersArgs;
pub use train::TrainCommand;
pub use wrist_roll::WristRollArgs;

/// 报告输出格式
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum OutputFormat {
    /// 人读文本
    Text,
    /// JSON（供脚本消费）
    Json,
}
