//! # SO101 Train
//!
//! 云端训练流程生成器。把录制好的示教数据集训练成策略需要在
//! Colab 这类 GPU 环境里执行一串固定步骤；本 crate 根据配置渲染
//! 这份流程：nbformat-4 notebook（[`notebook`] 模块）或纯 shell
//! 脚本（[`script`] 模块）。
//!
//! 训练本身（`lerobot-train` 及其策略实现）属于外部 ML 框架，
//! 这里只生成调用它的流程文档。

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod notebook;
pub mod script;

pub use notebook::{Notebook, NotebookCell, walkthrough};
pub use script::render_script;

/// 训练配置错误
#[derive(Error, Debug)]
pub enum TrainError {
    #[error("HuggingFace user must not be empty")]
    MissingHfUser,

    #[error("Invalid {field}: {reason}")]
    InvalidValue {
        field: &'static str,
        reason: String,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Config parse error: {0}")]
    Toml(#[from] toml::de::Error),
}

/// 策略类型
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrainPolicy {
    /// Action Chunking Transformer
    Act,
    /// Diffusion Policy
    Diffusion,
    /// TD-MPC
    Tdmpc,
    /// VQ-BeT
    Vqbet,
}

impl TrainPolicy {
    pub fn name(&self) -> &'static str {
        match self {
            TrainPolicy::Act => "act",
            TrainPolicy::Diffusion => "diffusion",
            TrainPolicy::Tdmpc => "tdmpc",
            TrainPolicy::Vqbet => "vqbet",
        }
    }

    /// 策略特有的训练器附加参数
    pub fn extra_trainer_flags(&self) -> &'static [&'static str] {
        match self {
            TrainPolicy::Act => &[
                "--policy.n_action_steps=100",
                "--policy.chunk_size=100",
                "--policy.n_decoder_layers=4",
                "--policy.hidden_dim=512",
            ],
            TrainPolicy::Diffusion => &[
                "--policy.num_inference_steps=50",
                "--policy.down_dims='[256, 512, 1024]'",
                "--policy.diffusion_step_embed_dim=128",
            ],
            TrainPolicy::Tdmpc => &[
                "--policy.model_size=5",
                "--policy.horizon=5",
                "--policy.discount=0.99",
            ],
            TrainPolicy::Vqbet => &[
                "--policy.n_vqvae_training_steps=10000",
                "--policy.vqvae_learning_rate=1e-4",
            ],
        }
    }

    /// 建议的示教集规模
    pub fn recommended_episodes(&self) -> &'static str {
        match self {
            TrainPolicy::Act => "50-100 episodes",
            TrainPolicy::Diffusion => "100-200 episodes",
            TrainPolicy::Tdmpc => "200+ episodes",
            TrainPolicy::Vqbet => "100-200 episodes",
        }
    }
}

impl std::str::FromStr for TrainPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "act" => Ok(TrainPolicy::Act),
            "diffusion" => Ok(TrainPolicy::Diffusion),
            "tdmpc" => Ok(TrainPolicy::Tdmpc),
            "vqbet" => Ok(TrainPolicy::Vqbet),
            other => Err(format!(
                "unknown policy '{other}' (expected act, diffusion, tdmpc or vqbet)"
            )),
        }
    }
}

impl std::fmt::Display for TrainPolicy {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.name())
    }
}

/// 训练配置
///
/// 可从 TOML 加载，字段缺省取 [`TrainConfig::default`] 的值
/// （HF 用户名除外，必填）。
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TrainConfig {
    /// HuggingFace 用户名
    pub hf_user: String,

    /// 数据集名（不含用户名前缀）
    pub dataset_name: String,

    pub policy: TrainPolicy,

    /// 训练设备
    pub device: String,

    pub batch_size: u32,
    pub learning_rate: f64,
    pub steps: u32,
    pub eval_freq: u32,
    pub save_freq: u32,

    /// 运行标签（输出目录与 W&B run 名后缀）
    pub tag: String,
}

impl Default for TrainConfig {
    fn default() -> Self {
        Self {
            hf_user: String::new(),
            dataset_name: "lerobot-so101-demo".to_string(),
            policy: TrainPolicy::Act,
            device: "cuda".to_string(),
            batch_size: 8,
            learning_rate: 1e-4,
            steps: 10_000,
            eval_freq: 1_000,
            save_freq: 2_000,
            tag: "run".to_string(),
        }
    }
}

impl TrainConfig {
    /// 从 TOML 文件加载
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, TrainError> {
        let content = fs::read_to_string(path)?;
        Ok(toml::from_str(&content)?)
    }

    /// 数据集仓库 ID（`user/dataset`）
    pub fn dataset_repo(&self) -> String {
        format!("{}/{}", self.hf_user, self.dataset_name)
    }

    /// 训练产物的 Hub 仓库 ID
    pub fn hub_repo_id(&self) -> String {
        format!("{}/lerobot-so101-{}", self.hf_user, self.policy)
    }

    /// 训练输出目录（Colab 本地路径）
    pub fn output_dir(&self) -> String {
        format!("/content/lerobot_training_{}_{}", self.policy, self.tag)
    }

    /// W&B run 名
    pub fn run_name(&self) -> String {
        format!("{}-{}", self.policy, self.tag)
    }

    /// 配置合法性检查
    pub fn validate(&self) -> Result<(), TrainError> {
        if self.hf_user.trim().is_empty() {
            return Err(TrainError::MissingHfUser);
        }
        if self.steps == 0 {
            return Err(TrainError::InvalidValue {
                field: "steps",
                reason: "must be positive".to_string(),
            });
        }
        if self.batch_size == 0 {
            return Err(TrainError::InvalidValue {
                field: "batch_size",
                reason: "must be positive".to_string(),
            });
        }
        if !(self.learning_rate > 0.0) {
            return Err(TrainError::InvalidValue {
                field: "learning_rate",
                reason: format!("must be positive, got {}", self.learning_rate),
            });
        }
        if self.eval_freq == 0 || self.eval_freq > self.steps {
            return Err(TrainError::InvalidValue {
                field: "eval_freq",
                reason: format!("must be in 1..={}", self.steps),
            });
        }
        if self.save_freq == 0 || self.save_freq > self.steps {
            return Err(TrainError::InvalidValue {
                field: "save_freq",
                reason: format!("must be in 1..={}", self.steps),
            });
        }
        Ok(())
    }

    /// `lerobot-train` 的完整参数列表（不含策略附加参数）
    pub fn trainer_flags(&self) -> Vec<String> {
        vec![
            format!("--policy.type={}", self.policy),
            format!("--policy.device={}", self.device),
            format!("--dataset.repo_id={}", self.dataset_repo()),
            "--dataset.image_transforms.enable=true".to_string(),
            format!("--batch_size={}", self.batch_size),
            format!("--training.learning_rate={}", self.learning_rate),
            format!("--steps={}", self.steps),
            format!("--eval_freq={}", self.eval_freq),
            "--eval.n_episodes=5".to_string(),
            format!("--save_freq={}", self.save_freq),
            "--save_checkpoint=true".to_string(),
            "--log_freq=100".to_string(),
            "--wandb.enable=true".to_string(),
            "--wandb.project=\"lerobot-so101\"".to_string(),
            format!("--wandb.name=\"{}\"", self.run_name()),
            format!("--output_dir={}", self.output_dir()),
            "--push_to_hub=true".to_string(),
            format!("--hub_repo_id=\"{}\"", self.hub_repo_id()),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_config() -> TrainConfig {
        TrainConfig {
            hf_user: "berobemin".to_string(),
            ..TrainConfig::default()
        }
    }

    #[test]
    fn test_policy_parsing() {
        assert_eq!("act".parse::<TrainPolicy>().unwrap(), TrainPolicy::Act);
        assert_eq!(
            "diffusion".parse::<TrainPolicy>().unwrap(),
            TrainPolicy::Diffusion
        );
        assert!("ppo".parse::<TrainPolicy>().is_err());
    }

    #[test]
    fn test_repo_id_derivation() {
        let config = valid_config();
        assert_eq!(config.dataset_repo(), "berobemin/lerobot-so101-demo");
        assert_eq!(config.hub_repo_id(), "berobemin/lerobot-so101-act");
        assert_eq!(config.output_dir(), "/content/lerobot_training_act_run");
    }

    #[test]
    fn test_validation() {
        assert!(valid_config().validate().is_ok());

        let mut config = valid_config();
        config.hf_user = "  ".to_string();
        assert!(matches!(config.validate(), Err(TrainError::MissingHfUser)));

        let mut config = valid_config();
        config.steps = 0;
        assert!(matches!(
            config.validate(),
            Err(TrainError::InvalidValue { field: "steps", .. })
        ));

        let mut config = valid_config();
        config.eval_freq = config.steps + 1;
        assert!(matches!(
            config.validate(),
            Err(TrainError::InvalidValue {
                field: "eval_freq",
                ..
            })
        ));
    }

    #[test]
    fn test_trainer_flags_contain_key_parameters() {
        let flags = valid_config().trainer_flags();
        assert!(flags.contains(&"--policy.type=act".to_string()));
        assert!(flags.contains(&"--steps=10000".to_string()));
        assert!(
            flags
                .iter()
                .any(|f| f.contains("--dataset.repo_id=berobemin/lerobot-so101-demo"))
        );
    }

    #[test]
    fn test_load_from_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.toml");
        std::fs::write(
            &path,
            r#"
hf_user = "berobemin"
policy = "diffusion"
steps = 20000
batch_size = 16
"#,
        )
        .unwrap();

        let config = TrainConfig::load(&path).unwrap();
        assert_eq!(config.hf_user, "berobemin");
        assert_eq!(config.policy, TrainPolicy::Diffusion);
        assert_eq!(config.steps, 20_000);
        assert_eq!(config.batch_size, 16);
        // 未指定字段取默认
        assert_eq!(config.eval_freq, 1_000);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_load_rejects_bad_toml() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("train.toml");
        std::fs::write(&path, "policy = \"ppo\"").unwrap();
        assert!(matches!(TrainConfig::load(&path), Err(TrainError::Toml(_))));
    }
}
