//! 配置管理命令
//!
//! 管理 CLI 的持久化默认值（串口、臂预设、校准 ID）。

use std::str::FromStr;

use anyhow::Result;
use clap::Subcommand;
use so101_diag::ArmPreset;

use crate::config::{CliConfig, config_file};

/// 配置命令
#[derive(Subcommand, Debug)]
pub enum ConfigCommand {
    /// 设置配置项
    Set {
        /// 默认串口设备（如 /dev/ttyACM0）
        #[arg(long)]
        port: Option<String>,

        /// 默认臂预设（so101_follower / so101_leader）
        #[arg(long)]
        arm: Option<String>,

        /// 随动臂校准文件 ID
        #[arg(long)]
        follower_id: Option<String>,

        /// 主臂校准文件 ID
        #[arg(long)]
        leader_id: Option<String>,
    },

    /// 获取配置项
    Get {
        /// 配置项名称（port / arm / follower_id / leader_id / all）
        #[arg(default_value = "all")]
        key: String,
    },

    /// 检查配置
    Check,
}

impl ConfigCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            ConfigCommand::Set {
                port,
                arm,
                follower_id,
                leader_id,
            } => {
                let mut config = CliConfig::load()?;

                if let Some(port) = port {
                    println!("✅ Default port: {}", port);
                    config.port = Some(port);
                }
                if let Some(arm) = arm {
                    // 存之前先验证预设名
                    ArmPreset::from_str(&arm).map_err(anyhow::Error::msg)?;
                    println!("✅ Default arm: {}", arm);
                    config.arm = Some(arm);
                }
                if let Some(id) = follower_id {
                    println!("✅ Follower calibration ID: {}", id);
                    config.follower_id = Some(id);
                }
                if let Some(id) = leader_id {
                    println!("✅ Leader calibration ID: {}", id);
                    config.leader_id = Some(id);
                }

                config.save()?;
                Ok(())
            },

            ConfigCommand::Get { key } => {
                let config = CliConfig::load()?;

                let show = |value: &Option<String>| match value {
                    Some(v) => println!("{}", v),
                    None => println!("(unset)"),
                };

                match key.as_str() {
                    "port" => show(&config.port),
                    "arm" => show(&config.arm),
                    "follower_id" => show(&config.follower_id),
                    "leader_id" => show(&config.leader_id),
                    _ => {
                        println!("SO101 CLI config:");
                        println!("  port: {:?}", config.port);
                        println!("  arm: {:?}", config.arm);
                        println!("  follower_id: {:?}", config.follower_id);
                        println!("  leader_id: {:?}", config.leader_id);
                    },
                }
                Ok(())
            },

            ConfigCommand::Check => {
                let config = CliConfig::load()?;
                let path = config_file()?;

                println!("Config file: {}", path.display());
                println!("  port: {:?}", config.port);
                println!("  arm: {:?}", config.arm);
                println!("  follower_id: {:?}", config.follower_id);
                println!("  leader_id: {:?}", config.leader_id);

                // 臂预设有效性
                if let Some(arm) = &config.arm {
                    match ArmPreset::from_str(arm) {
                        Ok(_) => println!("✅ arm preset is valid"),
                        Err(e) => println!("⚠️ {}", e),
                    }
                }
                Ok(())
            },
        }
    }
}
