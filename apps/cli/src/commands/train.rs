//! 训练流程生成命令
//!
//! 根据配置渲染云端训练 notebook 或 shell 脚本。配置来源：TOML 文件
//! （`--config`）叠加命令行覆盖项，生成前做合法性检查。

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Args, Subcommand};
use so101_train::{TrainConfig, TrainPolicy, render_script, walkthrough};

/// 训练配置来源参数
#[derive(Args, Debug)]
pub struct TrainConfigArgs {
    /// TOML 配置文件
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// HuggingFace 用户名
    #[arg(long)]
    hf_user: Option<String>,

    /// 数据集名（不含用户名前缀）
    #[arg(long)]
    dataset: Option<String>,

    /// 策略类型（act / diffusion / tdmpc / vqbet）
    #[arg(long)]
    policy: Option<TrainPolicy>,

    /// 训练步数
    #[arg(long)]
    steps: Option<u32>,

    /// 批大小
    #[arg(long)]
    batch_size: Option<u32>,

    /// 训练设备
    #[arg(long)]
    device: Option<String>,

    /// 运行标签
    #[arg(long)]
    tag: Option<String>,
}

impl TrainConfigArgs {
    /// 文件配置 + 命令行覆盖，校验后返回
    fn resolve(&self) -> Result<TrainConfig> {
        let mut config = match &self.config {
            Some(path) => TrainConfig::load(path)
                .with_context(|| format!("failed to load {}", path.display()))?,
            None => TrainConfig::default(),
        };

        if let Some(user) = &self.hf_user {
            config.hf_user = user.clone();
        }
        if let Some(dataset) = &self.dataset {
            config.dataset_name = dataset.clone();
        }
        if let Some(policy) = self.policy {
            config.policy = policy;
        }
        if let Some(steps) = self.steps {
            config.steps = steps;
        }
        if let Some(batch_size) = self.batch_size {
            config.batch_size = batch_size;
        }
        if let Some(device) = &self.device {
            config.device = device.clone();
        }
        if let Some(tag) = &self.tag {
            config.tag = tag.clone();
        }

        config.validate()?;
        Ok(config)
    }
}

/// 训练命令
#[derive(Subcommand, Debug)]
pub enum TrainCommand {
    /// 生成 Colab 训练 notebook（.ipynb）
    Notebook {
        #[command(flatten)]
        args: TrainConfigArgs,

        /// 输出文件
        #[arg(short, long, default_value = "so101_training.ipynb")]
        output: PathBuf,
    },

    /// 生成训练 shell 脚本
    Script {
        #[command(flatten)]
        args: TrainConfigArgs,

        /// 输出文件
        #[arg(short, long, default_value = "train_so101.sh")]
        output: PathBuf,
    },
}

impl TrainCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            TrainCommand::Notebook { args, output } => {
                let config = args.resolve()?;
                let notebook = walkthrough(&config);
                fs::write(&output, notebook.to_json()?)
                    .with_context(|| format!("failed to write {}", output.display()))?;

                println!("✅ Notebook written to {}", output.display());
                println!("  Dataset: {}", config.dataset_repo());
                println!(
                    "  Policy: {} ({})",
                    config.policy,
                    config.policy.recommended_episodes()
                );
                println!("  Model repo: {}", config.hub_repo_id());
                Ok(())
            },

            TrainCommand::Script { args, output } => {
                let config = args.resolve()?;
                fs::write(&output, render_script(&config))
                    .with_context(|| format!("failed to write {}", output.display()))?;

                println!("✅ Training script written to {}", output.display());
                println!("  Run with: bash {}", output.display());
                Ok(())
            },
        }
    }
}
