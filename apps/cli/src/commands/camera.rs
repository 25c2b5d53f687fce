//! 相机设备检查命令
//!
//! 图像捕获属于外部框架；这里只做设备节点级检查：枚举 `/dev/video*`
//! 并验证节点可以打开。

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

/// 相机命令
#[derive(Subcommand, Debug)]
pub enum CameraCommand {
    /// 枚举视频设备节点
    List {
        /// 设备目录（默认 /dev）
        #[arg(long, default_value = "/dev")]
        dev_dir: PathBuf,
    },

    /// 检查设备节点是否可打开
    Probe {
        /// 设备路径（如 /dev/video0）或序号
        device: String,
    },
}

/// 枚举 `video*` 设备节点，按名称排序
pub fn list_video_devices(dev_dir: &Path) -> Result<Vec<PathBuf>> {
    let mut devices = Vec::new();

    let entries = match fs::read_dir(dev_dir) {
        Ok(entries) => entries,
        // 目录不存在视为无设备（容器/CI 环境）
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(devices),
        Err(e) => {
            return Err(e).with_context(|| format!("failed to list {}", dev_dir.display()));
        },
    };

    for entry in entries {
        let entry = entry?;
        if entry
            .file_name()
            .to_string_lossy()
            .starts_with("video")
        {
            devices.push(entry.path());
        }
    }

    devices.sort();
    Ok(devices)
}

/// 打开设备节点验证可访问性
pub fn probe_device(path: &Path) -> Result<()> {
    if !path.exists() {
        anyhow::bail!("device {} does not exist", path.display());
    }
    fs::File::open(path)
        .with_context(|| format!("cannot open {} (permissions? device busy?)", path.display()))?;
    Ok(())
}

impl CameraCommand {
    pub fn execute(self) -> Result<()> {
        match self {
            CameraCommand::List { dev_dir } => {
                let devices = list_video_devices(&dev_dir)?;
                if devices.is_empty() {
                    println!("No video devices found under {}", dev_dir.display());
                } else {
                    println!("📋 Video devices:");
                    for device in devices {
                        println!("  {}", device.display());
                    }
                }
                Ok(())
            },

            CameraCommand::Probe { device } => {
                // 纯数字视为 /dev/videoN 序号
                let path = if device.chars().all(|c| c.is_ascii_digit()) {
                    PathBuf::from(format!("/dev/video{device}"))
                } else {
                    PathBuf::from(device)
                };

                probe_device(&path)?;
                println!("✅ {} is present and can be opened", path.display());
                Ok(())
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_finds_video_nodes() {
        let dir = tempfile::tempdir().unwrap();
        fs::write(dir.path().join("video0"), b"").unwrap();
        fs::write(dir.path().join("video2"), b"").unwrap();
        fs::write(dir.path().join("ttyACM0"), b"").unwrap();

        let devices = list_video_devices(dir.path()).unwrap();
        assert_eq!(devices.len(), 2);
        assert!(devices[0].ends_with("video0"));
        assert!(devices[1].ends_with("video2"));
    }

    #[test]
    fn test_list_missing_dir_is_empty() {
        let devices = list_video_devices(Path::new("/nonexistent-dev-dir")).unwrap();
        assert!(devices.is_empty());
    }

    #[test]
    fn test_probe_missing_device() {
        let err = probe_device(Path::new("/nonexistent/video9")).unwrap_err();
        assert!(err.to_string().contains("does not exist"));
    }

    #[test]
    fn test_probe_openable_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("video0");
        fs::write(&path, b"").unwrap();
        assert!(probe_device(&path).is_ok());
    }
}
