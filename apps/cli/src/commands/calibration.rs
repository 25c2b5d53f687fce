//! 校准文件比对命令
//!
//! 校准文件格式由外部框架定义（每个舵机一个 JSON 对象），这里当作
//! 不透明 JSON 逐键比对：随动臂和主臂的同名舵机参数并排展示，便于
//! 发现坏的 homing offset 或量程。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;
use serde_json::Value;

use crate::config::CliConfig;

/// 校准命令
#[derive(Subcommand, Debug)]
pub enum CalibrationCommand {
    /// 并排比对随动臂与主臂的校准参数
    Compare {
        /// 随动臂校准文件 ID（默认取配置文件）
        #[arg(long)]
        follower_id: Option<String>,

        /// 主臂校准文件 ID（默认取配置文件）
        #[arg(long)]
        leader_id: Option<String>,

        /// 校准目录（默认 ~/.cache/lerobot/calibration）
        #[arg(long)]
        dir: Option<PathBuf>,

        /// 只看指定舵机
        #[arg(short, long)]
        motor: Option<String>,
    },
}

fn default_calibration_dir() -> Result<PathBuf> {
    let mut path = dirs::home_dir().context("cannot determine home directory")?;
    path.push(".cache/lerobot/calibration");
    Ok(path)
}

fn load_calibration(path: &Path) -> Result<Value> {
    let content = fs::read_to_string(path)
        .with_context(|| format!("failed to read calibration file {}", path.display()))?;
    serde_json::from_str(&content)
        .with_context(|| format!("malformed calibration file {}", path.display()))
}

/// 单个参数的两侧取值
#[derive(Debug, Clone, PartialEq)]
pub struct CalEntry {
    pub motor: String,
    pub key: String,
    pub follower: Option<Value>,
    pub leader: Option<Value>,
}

impl CalEntry {
    pub fn differs(&self) -> bool {
        self.follower != self.leader
    }
}

/// 逐舵机逐键并排展开两份校准
///
/// 两侧的舵机名与键取并集，缺失侧为 None。输出按舵机名、键名排序。
pub fn merge_calibrations(follower: &Value, leader: &Value) -> Vec<CalEntry> {
    let empty = serde_json::Map::new();
    let f = follower.as_object().unwrap_or(&empty);
    let l = leader.as_object().unwrap_or(&empty);

    let mut motors: Vec<&String> = f.keys().chain(l.keys()).collect();
    motors.sort();
    motors.dedup();

    let mut entries = Vec::new();
    for motor in motors {
        let fm = f.get(motor).and_then(Value::as_object);
        let lm = l.get(motor).and_then(Value::as_object);

        let mut keys: Vec<&String> = fm
            .map(|m| m.keys().collect::<Vec<_>>())
            .unwrap_or_default();
        keys.extend(lm.map(|m| m.keys().collect::<Vec<_>>()).unwrap_or_default());
        keys.sort();
        keys.dedup();

        for key in keys {
            entries.push(CalEntry {
                motor: motor.clone(),
                key: key.clone(),
                follower: fm.and_then(|m| m.get(key)).cloned(),
                leader: lm.and_then(|m| m.get(key)).cloned(),
            });
        }
    }
    entries
}

impl CalibrationCommand {
    pub fn execute(self) -> Result<()> {
        let config = CliConfig::load()?;

        match self {
            CalibrationCommand::Compare {
                follower_id,
                leader_id,
                dir,
                motor,
            } => {
                let dir = match dir {
                    Some(d) => d,
                    None => default_calibration_dir()?,
                };
                let follower_id = follower_id
                    .or_else(|| config.follower_id.clone())
                    .context("no follower calibration ID (use --follower-id or config set)")?;
                let leader_id = leader_id
                    .or_else(|| config.leader_id.clone())
                    .context("no leader calibration ID (use --leader-id or config set)")?;

                let follower_path = dir.join(format!("so101_follower_{follower_id}.json"));
                let leader_path = dir.join(format!("so101_leader_{leader_id}.json"));

                let follower = load_calibration(&follower_path)?;
                let leader = load_calibration(&leader_path)?;

                let entries = merge_calibrations(&follower, &leader);
                let entries: Vec<_> = match motor.as_deref() {
                    Some(name) => entries.into_iter().filter(|e| e.motor == name).collect(),
                    None => entries,
                };

                if entries.is_empty() {
                    println!("(no calibration entries to compare)");
                    return Ok(());
                }

                println!("📊 Calibration comparison:");
                println!(
                    "  {:<30} {:>14} {:>14}",
                    "motor.key", "follower", "leader"
                );
                let mut last_motor = String::new();
                for entry in &entries {
                    if entry.motor != last_motor {
                        println!("  {}:", entry.motor);
                        last_motor = entry.motor.clone();
                    }
                    let mark = if entry.differs() { "≠" } else { " " };
                    println!(
                        "    {:<28} {:>14} {:>14} {}",
                        entry.key,
                        render(&entry.follower),
                        render(&entry.leader),
                        mark
                    );
                }

                let diffs = entries.iter().filter(|e| e.differs()).count();
                println!("📋 {} value(s) differ between the two arms", diffs);
                Ok(())
            },
        }
    }
}

fn render(value: &Option<Value>) -> String {
    match value {
        Some(v) => v.to_string(),
        None => "(missing)".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_merge_pairs_values_by_motor_and_key() {
        let follower = json!({
            "wrist_roll": { "homing_offset": 120, "range_min": 500 },
            "gripper": { "homing_offset": -30 },
        });
        let leader = json!({
            "wrist_roll": { "homing_offset": 118, "range_min": 500 },
        });

        let entries = merge_calibrations(&follower, &leader);
        // gripper.homing_offset, wrist_roll.homing_offset, wrist_roll.range_min
        assert_eq!(entries.len(), 3);

        let homing = entries
            .iter()
            .find(|e| e.motor == "wrist_roll" && e.key == "homing_offset")
            .unwrap();
        assert!(homing.differs());
        assert_eq!(homing.follower, Some(json!(120)));
        assert_eq!(homing.leader, Some(json!(118)));

        let range = entries
            .iter()
            .find(|e| e.motor == "wrist_roll" && e.key == "range_min")
            .unwrap();
        assert!(!range.differs());

        // 只在一侧存在的舵机也会出现，缺失侧为 None
        let gripper = entries.iter().find(|e| e.motor == "gripper").unwrap();
        assert_eq!(gripper.leader, None);
        assert!(gripper.differs());
    }

    #[test]
    fn test_merge_handles_non_object_payload() {
        let entries = merge_calibrations(&json!(42), &json!({"m": {"k": 1}}));
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].follower, None);
    }
}
