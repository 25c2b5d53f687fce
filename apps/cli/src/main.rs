//! # SO101 CLI
//!
//! SO101 机械臂的诊断与训练流程命令行工具。
//!
//! ## 常用操作
//!
//! ```bash
//! # 配置默认串口
//! so101-cli config set --port /dev/ttyACM0
//!
//! # 全臂扫描测试（无硬件时用 --simulate）
//! so101-cli motors test --simulate --yes
//!
//! # 单舵机深度排查
//! so101-cli wrist-roll --simulate
//!
//! # 生成云端训练 notebook
//! so101-cli train notebook --hf-user your_name -o train.ipynb
//! ```
//!
//! 所有总线命令都是 one-shot：连接 -> 执行 -> 断开。真实串口需要
//! 外部驱动后端；仓库内置的 `--simulate` 台架总线覆盖全部命令。

use anyhow::Result;
use clap::{Parser, Subcommand};

mod commands;
mod config;
mod connect;

use commands::{
    CalibrationCommand, CameraCommand, ConfigCommand, MotorsCommand, RegistersArgs, TrainCommand,
    WristRollArgs,
};

/// SO101 CLI - 机械臂诊断命令行工具
#[derive(Parser, Debug)]
#[command(name = "so101-cli")]
#[command(about = "Diagnostics and training tooling for the SO101 robot arm", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// 舵机诊断（列表 / ping / 扫描测试）
    #[command(subcommand)]
    Motors(MotorsCommand),

    /// wrist_roll 舵机深度排查
    WristRoll {
        #[command(flatten)]
        args: WristRollArgs,
    },

    /// 转储舵机控制表
    Registers {
        #[command(flatten)]
        args: RegistersArgs,
    },

    /// 校准文件比对
    #[command(subcommand)]
    Calibration(CalibrationCommand),

    /// 相机设备检查
    #[command(subcommand)]
    Camera(CameraCommand),

    /// 生成云端训练流程
    #[command(subcommand)]
    Train(TrainCommand),

    /// 配置管理
    #[command(subcommand)]
    Config(ConfigCommand),
}

fn main() -> Result<()> {
    // 初始化日志（写 stderr，stdout 留给报告输出）
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("so101_cli=info".parse().unwrap()),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Motors(cmd) => cmd.execute(),
        Commands::WristRoll { args } => args.execute(),
        Commands::Registers { args } => args.execute(),
        Commands::Calibration(cmd) => cmd.execute(),
        Commands::Camera(cmd) => cmd.execute(),
        Commands::Train(cmd) => cmd.execute(),
        Commands::Config(cmd) => cmd.execute(),
    }
}
