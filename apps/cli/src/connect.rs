//! 总线连接参数
//!
//! 每个总线命令都带同一组连接参数：`--port` 指定串口（否则取配置文件
//! 或 `/dev/ttyACM0`），`--simulate` 换成内置台架仿真总线。

use anyhow::{Context, Result};
use clap::Args;
use so101_bus::{BenchBus, ServoBus};
use so101_diag::ProcedureTimings;

use crate::config::CliConfig;

pub const DEFAULT_PORT: &str = "/dev/ttyACM0";

/// 总线连接参数
#[derive(Args, Debug, Clone)]
pub struct ConnectArgs {
    /// 串口设备（默认取配置文件，其次 /dev/ttyACM0）
    #[arg(short, long)]
    pub port: Option<String>,

    /// 使用内置台架仿真总线（无需硬件）
    #[arg(long)]
    pub simulate: bool,
}

impl ConnectArgs {
    /// 打开总线
    pub fn open_bus(&self, config: &CliConfig) -> Result<Box<dyn ServoBus>> {
        if self.simulate {
            tracing::info!("using bench simulation bus");
            return Ok(Box::new(BenchBus::so101_follower()));
        }

        let port = self
            .port
            .clone()
            .or_else(|| config.port.clone())
            .unwrap_or_else(|| DEFAULT_PORT.to_string());

        tracing::info!(port, "opening servo bus");
        so101_bus::open(&port).with_context(|| format!("failed to open servo bus on {port}"))
    }

    /// 扫描测试节奏（仿真模式下取零等待，瞬时完成）
    pub fn sweep_timings(&self) -> ProcedureTimings {
        if self.simulate {
            ProcedureTimings::bench()
        } else {
            ProcedureTimings::default()
        }
    }

    /// wrist_roll 排查节奏
    pub fn wrist_roll_timings(&self) -> ProcedureTimings {
        if self.simulate {
            ProcedureTimings::bench()
        } else {
            ProcedureTimings::wrist_roll()
        }
    }
}
