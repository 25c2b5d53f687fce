//! # 诊断报告
//!
//! 各诊断例程的结构化输出。全部可 serde 序列化，供 CLI 以表格或
//! JSON 输出。

use serde::Serialize;
use so101_poll::PollOutcome;

/// 单个寄存器的读取结果
///
/// 读失败不传播：逐条记录在报告里（断线舵机的转储仍然有展示价值）。
#[derive(Debug, Clone, Serialize)]
pub struct RegisterReading {
    /// 控制表名称（如 `Present_Position`）
    pub name: &'static str,

    /// 控制表地址
    pub address: u8,

    /// 字节宽度
    pub size: u8,

    /// 原始值（读失败为 None）
    pub value: Option<i32>,

    /// 读失败原因
    pub error: Option<String>,

    /// 人读解释（如 `32°C` / `7.4V` / `(~180.0°)`）
    pub note: Option<String>,
}

/// 单次运动测试结果
#[derive(Debug, Clone, Serialize)]
pub struct MoveResult {
    /// 相对当前位置的偏移量
    pub offset: i32,

    /// 实际下发的目标位置（已按安全范围钳制）
    pub target: i32,

    /// 收敛轮询终态
    pub outcome: PollOutcome,
}

/// 单个舵机的扫描测试报告
#[derive(Debug, Clone, Serialize)]
pub struct MotorReport {
    pub name: String,

    /// 总线 ID
    pub id: u8,

    /// ping 返回的型号编号（不可达为 None）
    pub model_number: Option<u16>,

    /// 是否响应 ping
    pub reachable: bool,

    /// 各次运动的结果
    pub moves: Vec<MoveResult>,

    /// 温度（原始值，°C）
    pub temperature: Option<i32>,

    /// 电压（原始值，分伏）
    pub voltage: Option<i32>,

    /// 负载（原始值）
    pub load: Option<i32>,
}

impl MotorReport {
    /// 不可达舵机的报告
    pub fn unreachable(name: &str, id: u8) -> Self {
        Self {
            name: name.to_string(),
            id,
            model_number: None,
            reachable: false,
            moves: Vec::new(),
            temperature: None,
            voltage: None,
            load: None,
        }
    }

    /// 通过判定：可达且所有运动都到位
    pub fn passed(&self) -> bool {
        self.reachable && self.moves.iter().all(|m| m.outcome.is_converged())
    }
}

/// 扭矩回路检查
#[derive(Debug, Clone, Copy, Serialize)]
pub struct TorqueCheck {
    /// 关断后回读为 0
    pub disable_ok: bool,

    /// 使能后回读为 1
    pub enable_ok: bool,
}

impl TorqueCheck {
    pub fn passed(&self) -> bool {
        self.disable_ok && self.enable_ok
    }
}

/// 位置样本统计（原始单位）
#[derive(Debug, Clone, Serialize)]
pub struct PositionStatistics {
    pub min: i32,
    pub max: i32,
    pub mean: f64,
    pub std_dev: f64,
    pub sample_count: usize,
}

impl PositionStatistics {
    pub fn calculate(positions: &[i32]) -> Self {
        if positions.is_empty() {
            return Self {
                min: 0,
                max: 0,
                mean: 0.0,
                std_dev: 0.0,
                sample_count: 0,
            };
        }

        let min = *positions.iter().min().unwrap_or(&0);
        let max = *positions.iter().max().unwrap_or(&0);
        let mean = positions.iter().sum::<i32>() as f64 / positions.len() as f64;

        let variance = positions
            .iter()
            .map(|&p| {
                let diff = p as f64 - mean;
                diff * diff
            })
            .sum::<f64>()
            / positions.len() as f64;

        Self {
            min,
            max,
            mean,
            std_dev: variance.sqrt(),
            sample_count: positions.len(),
        }
    }

    /// 最大位置摆动（max - min）
    pub fn variation(&self) -> i32 {
        self.max - self.min
    }
}

/// 自由运动检查（扭矩关闭下的位置稳定性）
#[derive(Debug, Clone, Serialize)]
pub struct FreeMotionReport {
    pub positions: Vec<i32>,
    pub statistics: PositionStatistics,

    /// 位置摆动超过阈值：扭矩关闭时仍在动，疑似机械问题
    pub suspicious: bool,
}

/// 全臂诊断汇总
#[derive(Debug, Clone, Serialize)]
pub struct DiagnosticSummary {
    pub total: usize,
    pub passed: usize,
    pub failed: Vec<String>,
}

impl DiagnosticSummary {
    pub fn from_reports(reports: &[MotorReport]) -> Self {
        let failed: Vec<String> = reports
            .iter()
            .filter(|r| !r.passed())
            .map(|r| r.name.clone())
            .collect();
        Self {
            total: reports.len(),
            passed: reports.len() - failed.len(),
            failed,
        }
    }

    pub fn all_passed(&self) -> bool {
        self.failed.is_empty()
    }
}
