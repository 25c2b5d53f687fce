//! # 舵机表
//!
//! SO101 各关节的总线 ID 与归一化模式。诊断统一用原始单位，归一化
//! 模式只作为元数据展示（校准/归一化由外部框架负责）。

use serde::{Deserialize, Serialize};
use so101_bus::ServoId;

/// 归一化模式（元数据，仅展示）
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NormMode {
    Degrees,
    Range0To100,
}

/// 单个舵机的配置
#[derive(Debug, Clone, Copy, Serialize)]
pub struct MotorSpec {
    pub name: &'static str,
    pub id: ServoId,
    pub model: &'static str,
    pub norm: NormMode,
}

/// 机械臂预设
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ArmPreset {
    So101Follower,
    So101Leader,
}

impl ArmPreset {
    /// 预设的舵机表（随动臂与主臂布局相同）
    pub fn motors(&self) -> &'static [MotorSpec] {
        const SO101: [MotorSpec; 6] = [
            MotorSpec {
                name: "shoulder_pan",
                id: ServoId(1),
                model: "sts3215",
                norm: NormMode::Degrees,
            },
            MotorSpec {
                name: "shoulder_lift",
                id: ServoId(2),
                model: "sts3215",
                norm: NormMode::Degrees,
            },
            MotorSpec {
                name: "elbow_flex",
                id: ServoId(3),
                model: "sts3215",
                norm: NormMode::Degrees,
            },
            MotorSpec {
                name: "wrist_flex",
                id: ServoId(4),
                model: "sts3215",
                norm: NormMode::Degrees,
            },
            MotorSpec {
                name: "wrist_roll",
                id: ServoId(5),
                model: "sts3215",
                norm: NormMode::Degrees,
            },
            MotorSpec {
                name: "gripper",
                id: ServoId(6),
                model: "sts3215",
                norm: NormMode::Range0To100,
            },
        ];
        &SO101
    }

    /// 按名称查找舵机
    pub fn find(&self, name: &str) -> Option<&'static MotorSpec> {
        self.motors().iter().find(|m| m.name == name)
    }
}

impl std::str::FromStr for ArmPreset {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "so101_follower" | "follower" => Ok(ArmPreset::So101Follower),
            "so101_leader" | "leader" => Ok(ArmPreset::So101Leader),
            other => Err(format!("unknown arm preset: {other}")),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_follower_layout() {
        let motors = ArmPreset::So101Follower.motors();
        assert_eq!(motors.len(), 6);
        assert_eq!(motors[0].name, "shoulder_pan");
        assert_eq!(motors[0].id, ServoId(1));
        assert_eq!(motors[5].name, "gripper");
        assert_eq!(motors[5].norm, NormMode::Range0To100);
    }

    #[test]
    fn test_find_by_name() {
        let wrist = ArmPreset::So101Follower.find("wrist_roll").unwrap();
        assert_eq!(wrist.id, ServoId(5));
        assert!(ArmPreset::So101Follower.find("elbow").is_none());
    }

    #[test]
    fn test_preset_parsing() {
        assert_eq!(
            "follower".parse::<ArmPreset>().unwrap(),
            ArmPreset::So101Follower
        );
        assert_eq!(
            "so101_leader".parse::<ArmPreset>().unwrap(),
            ArmPreset::So101Leader
        );
        assert!("so99".parse::<ArmPreset>().is_err());
    }
}
