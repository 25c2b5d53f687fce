//! # Notebook 渲染
//!
//! nbformat-4 的类型化 serde 模型，以及九单元训练流程的构建。
//! 单元内容与原始 Colab 流程一一对应：安装、配置、数据集检查、
//! 训练、策略附加参数、监控、评估、推送 Hub、推理示例。

use serde::Serialize;
use serde_json::{Map, Value, json};

use crate::TrainConfig;

/// nbformat-4 notebook
#[derive(Debug, Clone, Serialize)]
pub struct Notebook {
    pub cells: Vec<NotebookCell>,
    pub metadata: Value,
    pub nbformat: u32,
    pub nbformat_minor: u32,
}

/// notebook 单元
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "cell_type", rename_all = "lowercase")]
pub enum NotebookCell {
    Markdown {
        metadata: Map<String, Value>,
        source: Vec<String>,
    },
    Code {
        metadata: Map<String, Value>,
        source: Vec<String>,
        outputs: Vec<Value>,
        execution_count: Option<u32>,
    },
}

impl NotebookCell {
    pub fn markdown(text: &str) -> Self {
        NotebookCell::Markdown {
            metadata: Map::new(),
            source: split_source(text),
        }
    }

    pub fn code(text: &str) -> Self {
        NotebookCell::Code {
            metadata: Map::new(),
            source: split_source(text),
            outputs: Vec::new(),
            execution_count: None,
        }
    }

    /// 单元源码（拼接回完整文本）
    pub fn source_text(&self) -> String {
        match self {
            NotebookCell::Markdown { source, .. } | NotebookCell::Code { source, .. } => {
                source.concat()
            },
        }
    }
}

/// nbformat 约定：source 为逐行数组，行尾保留 `\n`
fn split_source(text: &str) -> Vec<String> {
    let mut lines: Vec<String> = text.split_inclusive('\n').map(str::to_string).collect();
    if lines.is_empty() {
        lines.push(String::new());
    }
    lines
}

impl Notebook {
    pub fn new(cells: Vec<NotebookCell>) -> Self {
        Self {
            cells,
            metadata: json!({
                "kernelspec": {
                    "display_name": "Python 3",
                    "language": "python",
                    "name": "python3"
                },
                "language_info": { "name": "python" },
                "accelerator": "GPU"
            }),
            nbformat: 4,
            nbformat_minor: 5,
        }
    }

    /// 渲染为 .ipynb JSON
    pub fn to_json(&self) -> serde_json::Result<String> {
        serde_json::to_string_pretty(self)
    }
}

/// 构建完整的训练流程 notebook
///
/// 调用前应先 `config.validate()`；这里假定配置合法。
pub fn walkthrough(config: &TrainConfig) -> Notebook {
    let mut cells = Vec::with_capacity(11);

    cells.push(NotebookCell::markdown(&format!(
        "# SO101 Policy Training\n\
         \n\
         Training pipeline for policies on demonstration data recorded with the SO101 arm.\n\
         \n\
         - Dataset: `{}`\n\
         - Policy: `{}` (recommended dataset size: {})\n\
         - Output: `{}`\n\
         \n\
         Run the cells sequentially. Use a GPU runtime\n\
         (Runtime > Change runtime type > GPU).",
        config.dataset_repo(),
        config.policy,
        config.policy.recommended_episodes(),
        config.output_dir(),
    )));

    // 1. 安装
    cells.push(NotebookCell::code(
        "# Install LeRobot and training dependencies\n\
         !pip install lerobot\n\
         !apt-get update && apt-get install -y ffmpeg\n\
         !pip install tensorboard\n\
         \n\
         # Login to HuggingFace (enter your token)\n\
         from huggingface_hub import login\n\
         login()",
    ));

    // 2. 配置
    cells.push(NotebookCell::code(&format!(
        "# Configuration\n\
         HF_USER = \"{}\"\n\
         DATASET_NAME = \"{}\"\n\
         POLICY_TYPE = \"{}\"\n\
         DEVICE = \"{}\"\n\
         OUTPUT_DIR = \"{}\"\n\
         \n\
         print(f\"Dataset: {{DATASET_NAME}}\")\n\
         print(f\"Policy: {{POLICY_TYPE}}\")\n\
         print(f\"Output: {{OUTPUT_DIR}}\")",
        config.hf_user,
        config.dataset_repo(),
        config.policy,
        config.device,
        config.output_dir(),
    )));

    // 3. 数据集检查
    cells.push(NotebookCell::code(&format!(
        "# Inspect the dataset\n\
         from lerobot.datasets import LeRobotDataset\n\
         \n\
         dataset = LeRobotDataset(\"{}\")\n\
         print(f\"Number of episodes: {{len(dataset.episodes)}}\")\n\
         print(f\"Total frames: {{len(dataset)}}\")\n\
         print(f\"Robot type: {{dataset.metadata.get('robot_type', 'Unknown')}}\")\n\
         print(f\"Task: {{dataset.metadata.get('task', 'Unknown')}}\")",
        config.dataset_repo(),
    )));

    // 4. 训练
    let mut train_cmd = String::from("# Start training\n!lerobot-train \\\n");
    let flags = config.trainer_flags();
    for (i, flag) in flags.iter().enumerate() {
        train_cmd.push_str("    ");
        train_cmd.push_str(flag);
        if i + 1 < flags.len() {
            train_cmd.push_str(" \\");
        }
        train_cmd.push('\n');
    }
    cells.push(NotebookCell::code(train_cmd.trim_end()));

    // 5. 策略附加参数
    let mut extra = format!(
        "# Extra flags for the {} policy — append to the training command above\n",
        config.policy
    );
    for flag in config.policy.extra_trainer_flags() {
        extra.push_str(&format!("#     {flag} \\\n"));
    }
    cells.push(NotebookCell::code(extra.trim_end()));

    // 6. 监控
    cells.push(NotebookCell::code(&format!(
        "# Monitor training with TensorBoard\n\
         %load_ext tensorboard\n\
         %tensorboard --logdir {}/logs\n\
         \n\
         # Or monitor with Weights & Biases: https://wandb.ai/",
        config.output_dir(),
    )));

    // 7. 评估 + 下载 checkpoint
    cells.push(NotebookCell::code(&format!(
        "# Evaluate the trained model\n\
         !lerobot-eval \\\n\
             --policy.path={out}/checkpoints/last/pretrained_model \\\n\
             --policy.device={device} \\\n\
             --eval.n_episodes=10 \\\n\
             --eval.batch_size=1\n\
         \n\
         # Download the best checkpoint\n\
         from google.colab import files\n\
         import shutil, os\n\
         \n\
         best_model_path = \"{out}/checkpoints/best/pretrained_model\"\n\
         if os.path.exists(best_model_path):\n\
             shutil.make_archive(\"best_model\", \"zip\", best_model_path)\n\
             files.download(\"best_model.zip\")",
        out = config.output_dir(),
        device = config.device,
    )));

    // 8. 推送 Hub
    cells.push(NotebookCell::code(&format!(
        "# Push the trained model to HuggingFace Hub\n\
         # (already pushed during training when push_to_hub=true)\n\
         print(\"Model repo: {}\")",
        config.hub_repo_id(),
    )));

    // 9. 推理示例
    cells.push(NotebookCell::code(&format!(
        "# Load the trained model for inference\n\
         from lerobot.policies import get_policy_and_config_classes\n\
         import torch\n\
         \n\
         policy_class, config_class = get_policy_and_config_classes(\"{policy}\")\n\
         policy = policy_class.from_pretrained(\"{repo}\", device=\"{device}\")\n\
         \n\
         # observation = {{...}}  # camera images + robot state\n\
         # with torch.no_grad():\n\
         #     action = policy.predict(observation)",
        policy = config.policy,
        repo = config.hub_repo_id(),
        device = config.device,
    )));

    cells.push(NotebookCell::markdown(
        "## Training tips\n\
         \n\
         1. **GPU**: make sure the runtime uses a GPU.\n\
         2. **Dataset size**: larger datasets generally perform better\n\
            (ACT: 50-100 episodes, Diffusion: 100-200, TD-MPC: 200+).\n\
         3. **Hyperparameters**: start with defaults, adjust batch size to GPU memory.\n\
         4. **Monitoring**: watch validation loss; stop on overfitting.\n\
         5. **Evaluation**: test in simulation and on the real arm.",
    ));

    Notebook::new(cells)
}
