//! CLI 配置
//!
//! 持久化在用户配置目录（`~/.config/so101/config.toml`）的默认值：
//! 串口、臂预设、校准文件 ID。

use std::fs;
use std::path::PathBuf;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// 配置目录
fn config_dir() -> Result<PathBuf> {
    let mut path = dirs::config_dir().context("cannot determine config directory")?;
    path.push("so101");
    Ok(path)
}

pub fn config_file() -> Result<PathBuf> {
    let mut path = config_dir()?;
    fs::create_dir_all(&path).context("failed to create config directory")?;

    path.push("config.toml");
    Ok(path)
}

/// CLI 配置
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    /// 默认串口设备
    pub port: Option<String>,

    /// 默认臂预设（so101_follower / so101_leader）
    pub arm: Option<String>,

    /// 随动臂校准文件 ID
    pub follower_id: Option<String>,

    /// 主臂校准文件 ID
    pub leader_id: Option<String>,
}

impl CliConfig {
    /// 加载配置（文件不存在时取默认值）
    pub fn load() -> Result<Self> {
        let path = config_file()?;

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = fs::read_to_string(&path).context("failed to read config file")?;
        toml::from_str(&content).with_context(|| format!("malformed config: {}", path.display()))
    }

    /// 保存配置
    pub fn save(&self) -> Result<()> {
        let path = config_file()?;
        let content = toml::to_string_pretty(self).context("failed to serialize config")?;
        fs::write(&path, content).context("failed to write config file")?;
        Ok(())
    }
}
