//! 控制表转储命令

use anyhow::{Context, Result};
use clap::Args;
use so101_bus::ServoId;
use so101_diag::{ArmPreset, RegisterReading, dump_registers};

use crate::commands::OutputFormat;
use crate::config::CliConfig;
use crate::connect::ConnectArgs;

#[derive(Args, Debug)]
pub struct RegistersArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// 舵机名称（如 wrist_roll，按臂预设解析为总线 ID）
    #[arg(short, long, conflicts_with = "id")]
    motor: Option<String>,

    /// 舵机总线 ID（与 --motor 二选一）
    #[arg(long, default_value_t = 5)]
    id: u8,

    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl RegistersArgs {
    pub fn execute(self) -> Result<()> {
        let config = CliConfig::load()?;

        let id = match self.motor.as_deref() {
            Some(name) => {
                let arm: ArmPreset = config
                    .arm
                    .as_deref()
                    .unwrap_or("so101_follower")
                    .parse()
                    .map_err(anyhow::Error::msg)?;
                arm.find(name)
                    .with_context(|| format!("unknown motor '{name}' in preset"))?
                    .id
            },
            None => ServoId(self.id),
        };

        let mut bus = self.connect.open_bus(&config)?;
        let readings = dump_registers(bus.as_mut(), id);

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&readings)?),
            OutputFormat::Text => {
                println!("📊 Control table for servo ID {id}:");
                print_readings(&readings);
            },
        }
        Ok(())
    }
}

/// 逐行打印寄存器转储（wrist-roll 命令复用）
pub fn print_readings(readings: &[RegisterReading]) {
    for r in readings {
        match (&r.value, &r.error) {
            (Some(value), _) => {
                let note = r.note.as_deref().map(|n| format!("  {n}")).unwrap_or_default();
                println!("  [{:>3}] {:<22} = {:>6}{}", r.address, r.name, value, note);
            },
            (None, Some(error)) => {
                println!("  [{:>3}] {:<22} = <error: {}>", r.address, r.name, error);
            },
            (None, None) => {
                println!("  [{:>3}] {:<22} = <no value>", r.address, r.name);
            },
        }
    }
}
