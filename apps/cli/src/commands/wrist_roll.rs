//! wrist_roll 深度排查命令
//!
//! 对单个舵机跑完整排查流程：ping、寄存器转储、扭矩回路、自由运动
//! 检查、带卡死检测的短程运动，最后给出结论与建议。

use std::io::Write;

use anyhow::Result;
use clap::Args;
use so101_bus::ServoId;
use so101_diag::{WristRollReport, wrist_roll_procedure};

use crate::commands::OutputFormat;
use crate::commands::registers::print_readings;
use crate::config::CliConfig;
use crate::connect::ConnectArgs;

#[derive(Args, Debug)]
pub struct WristRollArgs {
    #[command(flatten)]
    connect: ConnectArgs,

    /// 舵机总线 ID（SO101 上 wrist_roll 为 5）
    #[arg(long, default_value_t = 5)]
    id: u8,

    /// 输出格式
    #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
    format: OutputFormat,
}

impl WristRollArgs {
    pub fn execute(self) -> Result<()> {
        let config = CliConfig::load()?;
        let mut bus = self.connect.open_bus(&config)?;
        let timings = self.connect.wrist_roll_timings();
        let live = self.format == OutputFormat::Text;

        if live {
            println!("🔍 Deep diagnostic for servo ID {}...", self.id);
        }

        let report =
            wrist_roll_procedure(bus.as_mut(), ServoId(self.id), &timings, |sample, elapsed| {
                if live {
                    print!(
                        "\r  position={:>4}  moving={:<5}  t={:.1}s",
                        sample.position,
                        sample.moving,
                        elapsed.as_secs_f32()
                    );
                    std::io::stdout().flush().ok();
                }
            })?;

        match self.format {
            OutputFormat::Json => println!("{}", serde_json::to_string_pretty(&report)?),
            OutputFormat::Text => print_report(&report),
        }

        if !report.healthy() {
            anyhow::bail!("servo ID {} failed the diagnostic", report.id);
        }
        Ok(())
    }
}

fn print_report(report: &WristRollReport) {
    println!();
    if !report.reachable {
        println!("❌ Servo ID {} is not responding to ping", report.id);
    } else {
        if let Some(model) = report.model_number {
            println!("✅ Ping OK, model {model}");
        }

        println!("📊 Register dump:");
        print_readings(&report.registers);

        if let Some(torque) = &report.torque {
            println!(
                "{} Torque loop: disable={}, enable={}",
                if torque.passed() { "✅" } else { "❌" },
                torque.disable_ok,
                torque.enable_ok
            );
        }

        if let Some(free) = &report.free_motion {
            println!(
                "{} Free motion (torque off): variation={} over {} samples",
                if free.suspicious { "⚠️" } else { "✅" },
                free.statistics.variation(),
                free.statistics.sample_count
            );
        }

        for m in &report.moves {
            println!(
                "  offset {:>5} -> target {:>4}: {}",
                m.offset,
                m.target,
                m.outcome.description()
            );
        }
    }

    if report.findings.is_empty() {
        println!("✅ No faults found");
    } else {
        println!("⚠️ Findings:");
        for finding in &report.findings {
            println!("  - {:?}: {}", finding, finding.recommendation());
        }
    }
}
