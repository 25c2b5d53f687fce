//! 舵机诊断命令
//!
//! `motors list` / `motors ping` / `motors test`。测试命令对整臂或
//! 单个舵机执行偏移序列扫描，实时打印位置采样，最后汇总通过/失败。

use std::io::Write;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};

use anyhow::{Context, Result};
use clap::Subcommand;
use so101_diag::{
    ArmPreset, DiagnosticSummary, MotorReport, MotorSpec, MovementMode, NormMode, sweep_motor,
};
use so101_poll::PollOutcome;

use crate::commands::OutputFormat;
use crate::config::CliConfig;
use crate::connect::ConnectArgs;

/// Ctrl+C 置位，循环在舵机之间检查
static INTERRUPTED: AtomicBool = AtomicBool::new(false);

fn install_interrupt_handler() -> Result<()> {
    ctrlc::set_handler(|| INTERRUPTED.store(true, Ordering::SeqCst))
        .context("failed to install Ctrl+C handler")
}

fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// 舵机命令
#[derive(Subcommand, Debug)]
pub enum MotorsCommand {
    /// 列出臂预设里的舵机
    List {
        /// 臂预设（so101_follower / so101_leader）
        #[arg(short, long)]
        arm: Option<String>,
    },

    /// ping 各舵机并报告型号
    Ping {
        #[command(flatten)]
        connect: ConnectArgs,

        /// 臂预设
        #[arg(short, long)]
        arm: Option<String>,

        /// 只测指定舵机（按名称）
        #[arg(short, long)]
        motor: Option<String>,
    },

    /// 扫描测试：按偏移序列运动并检查收敛
    Test {
        #[command(flatten)]
        connect: ConnectArgs,

        /// 臂预设
        #[arg(short, long)]
        arm: Option<String>,

        /// 只测指定舵机（按名称）
        #[arg(short, long)]
        motor: Option<String>,

        /// 大范围运动序列（±600，范围诊断用）
        #[arg(long)]
        large_movement: bool,

        /// 跳过所有确认提示
        #[arg(short = 'y', long)]
        yes: bool,

        /// 输出格式
        #[arg(long, value_enum, default_value_t = OutputFormat::Text)]
        format: OutputFormat,
    },
}

fn resolve_arm(arg: Option<&str>, config: &CliConfig) -> Result<ArmPreset> {
    let name = arg
        .map(str::to_string)
        .or_else(|| config.arm.clone())
        .unwrap_or_else(|| "so101_follower".to_string());
    ArmPreset::from_str(&name).map_err(anyhow::Error::msg)
}

/// 选择要测的舵机：指定名称或整臂
fn select_motors(arm: ArmPreset, motor: Option<&str>) -> Result<Vec<&'static MotorSpec>> {
    match motor {
        Some(name) => {
            let spec = arm
                .find(name)
                .with_context(|| format!("unknown motor '{name}' in preset"))?;
            Ok(vec![spec])
        },
        None => Ok(arm.motors().iter().collect()),
    }
}

fn norm_label(norm: NormMode) -> &'static str {
    match norm {
        NormMode::Degrees => "degrees",
        NormMode::Range0To100 => "0-100",
    }
}

impl MotorsCommand {
    pub fn execute(self) -> Result<()> {
        let config = CliConfig::load()?;

        match self {
            MotorsCommand::List { arm } => {
                let arm = resolve_arm(arm.as_deref(), &config)?;
                println!("📋 Motors ({arm:?}):");
                println!("  {:<15} {:>3}  {:<8} {}", "name", "id", "model", "norm");
                for spec in arm.motors() {
                    println!(
                        "  {:<15} {:>3}  {:<8} {}",
                        spec.name,
                        spec.id,
                        spec.model,
                        norm_label(spec.norm)
                    );
                }
                Ok(())
            },

            MotorsCommand::Ping {
                connect,
                arm,
                motor,
            } => {
                let arm = resolve_arm(arm.as_deref(), &config)?;
                let motors = select_motors(arm, motor.as_deref())?;
                let mut bus = connect.open_bus(&config)?;

                let mut silent = 0;
                for spec in motors {
                    match bus.ping(spec.id) {
                        Ok(model) => {
                            let name = so101_bus::ServoModel::from(model).name();
                            println!("✅ {} (ID {}): model {} ({})", spec.name, spec.id, model, name);
                        },
                        Err(e) => {
                            silent += 1;
                            println!("❌ {} (ID {}): {}", spec.name, spec.id, e);
                        },
                    }
                }

                if silent > 0 {
                    anyhow::bail!("{silent} motor(s) not responding");
                }
                Ok(())
            },

            MotorsCommand::Test {
                connect,
                arm,
                motor,
                large_movement,
                yes,
                format,
            } => {
                let arm = resolve_arm(arm.as_deref(), &config)?;
                let motors = select_motors(arm, motor.as_deref())?;
                let mode = if large_movement {
                    MovementMode::Large
                } else {
                    MovementMode::Standard
                };

                run_sweep(&connect, &config, &motors, mode, yes, format)
            },
        }
    }
}

fn run_sweep(
    connect: &ConnectArgs,
    config: &CliConfig,
    motors: &[&'static MotorSpec],
    mode: MovementMode,
    yes: bool,
    format: OutputFormat,
) -> Result<()> {
    let live = format == OutputFormat::Text;

    if live && !yes && motors.len() > 1 {
        let confirmed = inquire::Confirm::new(&format!(
            "Sweep test will move {} motors. The arm must be clear of obstacles. Continue?",
            motors.len()
        ))
        .with_default(false)
        .prompt()?;
        if !confirmed {
            println!("Aborted.");
            return Ok(());
        }
    }

    install_interrupt_handler()?;
    let mut bus = connect.open_bus(config)?;
    let timings = connect.sweep_timings();

    let mut reports: Vec<MotorReport> = Vec::with_capacity(motors.len());
    for (i, spec) in motors.iter().enumerate() {
        if interrupted() {
            println!("\n⚠️ Interrupted, stopping after {} motor(s)", i);
            break;
        }

        if live {
            println!("🔍 Testing {} (ID {})...", spec.name, spec.id);
        }

        let report = sweep_motor(bus.as_mut(), spec, mode, &timings, |sample, elapsed| {
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

        if live {
            print_motor_report(&report);
        }
        reports.push(report);

        if live && !yes && i + 1 < motors.len() {
            let go_on = inquire::Confirm::new("Continue with next motor?")
                .with_default(true)
                .prompt()?;
            if !go_on {
                break;
            }
        }
    }

    let summary = DiagnosticSummary::from_reports(&reports);

    match format {
        OutputFormat::Json => {
            println!("{}", serde_json::to_string_pretty(&reports)?);
        },
        OutputFormat::Text => {
            println!("📊 Summary: {}/{} passed", summary.passed, summary.total);
            if !summary.failed.is_empty() {
                println!("❌ Failed: {}", summary.failed.join(", "));
            }
        },
    }

    if !summary.all_passed() {
        anyhow::bail!("{} motor(s) failed the sweep test", summary.failed.len());
    }
    Ok(())
}

fn outcome_line(outcome: &PollOutcome) -> String {
    let emoji = match outcome {
        PollOutcome::Converged { .. } => "✅",
        PollOutcome::TimedOut { .. } => "⏰",
        PollOutcome::Stuck { .. } => "⚠️",
    };
    format!(
        "{} {} after {:.2}s",
        emoji,
        outcome.description(),
        outcome.elapsed().as_secs_f32()
    )
}

fn print_motor_report(report: &MotorReport) {
    if !report.reachable {
        println!("\r❌ {} (ID {}): not responding", report.name, report.id);
        return;
    }

    println!();
    for m in &report.moves {
        println!(
            "  offset {:>5} -> target {:>4}: {}",
            m.offset,
            m.target,
            outcome_line(&m.outcome)
        );
    }

    // 遥测（读失败留空）
    let temp = report
        .temperature
        .map_or("n/a".to_string(), |v| format!("{v}°C"));
    let volt = report
        .voltage
        .map_or("n/a".to_string(), |v| format!("{:.1}V", v as f64 / 10.0));
    println!(
        "  {} telemetry: temp={}, voltage={}",
        if report.passed() { "✅" } else { "❌" },
        temp,
        volt
    );
}
