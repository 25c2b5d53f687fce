//! # Shell 脚本渲染
//!
//! 同一份训练流程的非 notebook 形态：适合有 GPU 的裸机/容器环境，
//! 直接 `bash train_so101.sh` 执行。

use crate::TrainConfig;

/// 渲染训练 shell 脚本
pub fn render_script(config: &TrainConfig) -> String {
    let mut out = String::new();

    out.push_str("#!/usr/bin/env bash\n");
    out.push_str("# SO101 policy training pipeline\n");
    out.push_str(&format!(
        "# Dataset: {}  Policy: {} ({})\n",
        config.dataset_repo(),
        config.policy,
        config.policy.recommended_episodes(),
    ));
    out.push_str("set -euo pipefail\n\n");

    out.push_str("# 1. Dependencies\n");
    out.push_str("pip install lerobot tensorboard\n");
    out.push_str("# huggingface-cli login   # run once, interactive\n\n");

    out.push_str("# 2. Training\n");
    out.push_str("lerobot-train \\\n");
    let flags = config.trainer_flags();
    let extras = config.policy.extra_trainer_flags();
    for flag in &flags {
        out.push_str(&format!("    {flag} \\\n"));
    }
    for (i, flag) in extras.iter().enumerate() {
        out.push_str(&format!("    {flag}"));
        if i + 1 < extras.len() {
            out.push_str(" \\");
        }
        out.push('\n');
    }
    out.push('\n');

    out.push_str("# 3. Evaluation\n");
    out.push_str(&format!(
        "lerobot-eval \\\n    --policy.path={}/checkpoints/last/pretrained_model \\\n    \
         --policy.device={} \\\n    --eval.n_episodes=10 \\\n    --eval.batch_size=1\n\n",
        config.output_dir(),
        config.device,
    ));

    out.push_str("# 4. Artifacts\n");
    out.push_str(&format!(
        "echo \"Model pushed to: {}\"\necho \"Checkpoints under: {}/checkpoints\"\n",
        config.hub_repo_id(),
        config.output_dir(),
    ));

    out
}
