//! # SO101 Poll
//!
//! 有界位置收敛轮询器（无硬件依赖）。
//!
//! 诊断流程中反复出现同一个过程：下发目标位置后，以固定节拍读取
//! `Present_Position` / `Moving`，直到舵机到位、卡死或超时。本 crate
//! 把这个过程收敛为一个参数化策略 + 三态结果：
//!
//! | 结果 | 条件 |
//! |------|------|
//! | `Converged` | `\|position - target\| < tolerance` 且 `!moving` |
//! | `Stuck` | 连续 `stuck_samples` 次采样几乎不动，但 `moving` 仍为真 |
//! | `TimedOut` | 超过 `timeout` 仍未到位 |
//!
//! ## 设计要点
//!
//! - **结果即值**：不可达的目标不是异常，而是 `PollOutcome` 的一个分支，
//!   由调用方决定重试、跳过还是告警。只有采样回调的传输错误通过 `?` 传播。
//! - **节拍下限**：相邻两次采样的间隔不小于 `poll_interval`（deadline
//!   锚定在上一次采样时刻，使用 `spin_sleep` 保证精度）。
//! - **无共享状态**：所有状态都是单次调用的局部变量，返回即丢弃。
//!
//! ## 示例
//!
//! ```rust
//! use so101_poll::{PollOutcome, PollPolicy, Sample, Setpoint, poll_until_settled};
//! use std::time::Duration;
//!
//! let mut position = 1448;
//! let policy = PollPolicy {
//!     poll_interval: Duration::ZERO,
//!     ..PollPolicy::default()
//! };
//!
//! let outcome = poll_until_settled(Setpoint::new(2048, 30), &policy, || {
//!     position = (position + 100).min(2048);
//!     Ok::<_, std::io::Error>(Sample::new(position, position != 2048))
//! })
//! .unwrap();
//!
//! assert!(matches!(outcome, PollOutcome::Converged { .. }));
//! ```

use std::time::{Duration, Instant};

/// 目标设定值
///
/// 位置为原始设备单位（STS3215 为 12-bit，0..=4095），容差为开区间窗口：
/// `|position - target| < tolerance` 视为到位。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct Setpoint {
    /// 目标位置（原始单位）
    pub target: i32,

    /// 容差窗口（原始单位）
    pub tolerance: i32,
}

impl Setpoint {
    pub fn new(target: i32, tolerance: i32) -> Self {
        Self { target, tolerance }
    }

    /// 采样值是否落在容差窗口内（不考虑运动标志）
    pub fn within_tolerance(&self, position: i32) -> bool {
        (position - self.target).abs() < self.tolerance
    }
}

/// 单次采样
///
/// 来自外部设备访问层的（位置，运动标志）对，附带采样时刻。
#[derive(Debug, Clone, Copy)]
pub struct Sample {
    /// 当前位置（原始单位）
    pub position: i32,

    /// 舵机是否报告运动中（`Moving` 寄存器）
    pub moving: bool,

    /// 采样时刻
    pub at: Instant,
}

impl Sample {
    /// 以当前时刻构建采样
    pub fn new(position: i32, moving: bool) -> Self {
        Self {
            position,
            moving,
            at: Instant::now(),
        }
    }
}

/// 轮询策略
///
/// 原始诊断脚本各自使用 20–30 单位容差、5–6 次卡死判定，没有统一定义。
/// 这里收敛为一个参数化策略，默认值取各脚本的共同量级。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct PollPolicy {
    /// 总超时
    pub timeout: Duration,

    /// 相邻采样的最小间隔
    pub poll_interval: Duration,

    /// 卡死判定：连续多少次采样几乎不动（0 = 关闭卡死检测）
    pub stuck_samples: u32,

    /// 卡死判定：位置变化小于该值视为"几乎不动"（原始单位）
    pub stuck_epsilon: i32,
}

impl Default for PollPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(5),
            poll_interval: Duration::from_millis(200),
            stuck_samples: 5,
            stuck_epsilon: 2,
        }
    }
}

impl PollPolicy {
    /// 关闭卡死检测的策略（只区分到位/超时）
    pub fn without_stuck_detection(mut self) -> Self {
        self.stuck_samples = 0;
        self
    }
}

/// 轮询终态
///
/// 三态结果，代替"成功/失败"布尔值。`elapsed` 为从第一次采样前
/// 到终态判定的耗时。
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(
    feature = "serde",
    derive(serde::Serialize, serde::Deserialize),
    serde(tag = "kind", rename_all = "snake_case")
)]
pub enum PollOutcome {
    /// 到位：采样值进入容差窗口且运动标志为假
    Converged { elapsed: Duration },

    /// 超时：超过 `timeout` 仍未到位
    TimedOut { elapsed: Duration },

    /// 卡死：`Moving` 仍为真，但位置已连续多次几乎不动
    Stuck { elapsed: Duration },
}

impl PollOutcome {
    /// 是否到位
    pub fn is_converged(&self) -> bool {
        matches!(self, PollOutcome::Converged { .. })
    }

    /// 终态耗时
    pub fn elapsed(&self) -> Duration {
        match self {
            PollOutcome::Converged { elapsed }
            | PollOutcome::TimedOut { elapsed }
            | PollOutcome::Stuck { elapsed } => *elapsed,
        }
    }

    /// 简短描述（CLI 输出用）
    pub fn description(&self) -> &'static str {
        match self {
            PollOutcome::Converged { .. } => "converged",
            PollOutcome::TimedOut { .. } => "timed out",
            PollOutcome::Stuck { .. } => "stuck",
        }
    }
}

/// 轮询直到到位、卡死或超时
///
/// `sample_fn` 由外部设备访问层提供；它的错误原样通过 `?` 传播，
/// 正常的不收敛只体现为 [`PollOutcome`]。
pub fn poll_until_settled<E>(
    setpoint: Setpoint,
    policy: &PollPolicy,
    sample_fn: impl FnMut() -> Result<Sample, E>,
) -> Result<PollOutcome, E> {
    poll_until_settled_with(setpoint, policy, sample_fn, |_, _| {})
}

/// 同 [`poll_until_settled`]，另将每次采样上报给观察者
///
/// 诊断脚本在等待期间打印实时遥测（位置 / 运动标志），观察者回调
/// 承担这一职责。回调参数为（采样，已耗时）。
pub fn poll_until_settled_with<E>(
    setpoint: Setpoint,
    policy: &PollPolicy,
    mut sample_fn: impl FnMut() -> Result<Sample, E>,
    mut on_sample: impl FnMut(&Sample, Duration),
) -> Result<PollOutcome, E> {
    let sleeper = spin_sleep::SpinSleeper::default();
    let start = Instant::now();
    let mut next_sample_at = start;
    let mut last_position: Option<i32> = None;
    let mut stuck_run: u32 = 0;

    loop {
        let now = Instant::now();
        if now < next_sample_at {
            sleeper.sleep(next_sample_at - now);
        }

        let sample = sample_fn()?;
        // 节拍锚定在本次采样返回的时刻：相邻两次采样调用不小于 poll_interval
        let sampled_at = Instant::now();
        let elapsed = start.elapsed();
        on_sample(&sample, elapsed);

        tracing::debug!(
            position = sample.position,
            moving = sample.moving,
            elapsed_ms = elapsed.as_millis() as u64,
            "poll sample"
        );

        if setpoint.within_tolerance(sample.position) && !sample.moving {
            return Ok(PollOutcome::Converged { elapsed });
        }

        if policy.stuck_samples > 0 {
            if let Some(prev) = last_position {
                if (sample.position - prev).abs() < policy.stuck_epsilon {
                    stuck_run += 1;
                } else {
                    stuck_run = 0;
                }
            }
            last_position = Some(sample.position);

            if stuck_run >= policy.stuck_samples && sample.moving {
                return Ok(PollOutcome::Stuck { elapsed });
            }
        }

        // 超时判定放在到位/卡死之后：恰好在 deadline 上到位仍算到位
        if elapsed >= policy.timeout {
            return Ok(PollOutcome::TimedOut { elapsed });
        }

        next_sample_at = sampled_at + policy.poll_interval;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::convert::Infallible;

    /// 脚本化采样序列：依次弹出，末尾重复最后一个
    fn scripted(
        samples: Vec<(i32, bool)>,
    ) -> impl FnMut() -> Result<Sample, Infallible> {
        let mut iter = samples.into_iter();
        let mut last = (0, false);
        move || {
            if let Some(s) = iter.next() {
                last = s;
            }
            Ok(Sample::new(last.0, last.1))
        }
    }

    fn fast_policy() -> PollPolicy {
        PollPolicy {
            timeout: Duration::from_millis(100),
            poll_interval: Duration::from_millis(2),
            stuck_samples: 5,
            stuck_epsilon: 2,
        }
    }

    #[test]
    fn test_converges_on_monotonic_sequence() {
        // 1448 -> 2048 线性收敛，到位后 moving=false
        let seq: Vec<(i32, bool)> = (0..=6)
            .map(|i| {
                let pos = 1448 + i * 100;
                (pos, pos < 2048)
            })
            .collect();

        let outcome =
            poll_until_settled(Setpoint::new(2048, 30), &fast_policy(), scripted(seq)).unwrap();

        match outcome {
            PollOutcome::Converged { elapsed } => {
                assert!(elapsed <= Duration::from_millis(100));
            },
            other => panic!("expected Converged, got {:?}", other),
        }
    }

    #[test]
    fn test_within_tolerance_but_still_moving_is_not_converged() {
        // 进入容差窗口但 moving 仍为真 -> 不算到位，最终超时
        let policy = PollPolicy {
            stuck_samples: 0,
            ..fast_policy()
        };
        let outcome = poll_until_settled(
            Setpoint::new(2048, 30),
            &policy,
            scripted(vec![(2040, true)]),
        )
        .unwrap();

        assert!(matches!(outcome, PollOutcome::TimedOut { .. }));
    }

    #[test]
    fn test_timeout_not_before_deadline() {
        // 永不进入容差窗口 -> TimedOut，且耗时 >= timeout
        let policy = PollPolicy {
            timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(2),
            stuck_samples: 0,
            stuck_epsilon: 2,
        };
        let start = Instant::now();
        let outcome = poll_until_settled(
            Setpoint::new(2048, 30),
            &policy,
            scripted(vec![(100, false)]),
        )
        .unwrap();

        assert!(matches!(outcome, PollOutcome::TimedOut { .. }));
        assert!(start.elapsed() >= policy.timeout);
        assert!(outcome.elapsed() >= policy.timeout);
    }

    #[test]
    fn test_stuck_detected_before_timeout() {
        // 位置恒定且 moving=true -> 在超时前判定卡死
        let policy = PollPolicy {
            timeout: Duration::from_millis(200),
            poll_interval: Duration::from_millis(2),
            stuck_samples: 5,
            stuck_epsilon: 2,
        };
        let outcome = poll_until_settled(
            Setpoint::new(2048, 30),
            &policy,
            scripted(vec![(1500, true)]),
        )
        .unwrap();

        match outcome {
            PollOutcome::Stuck { elapsed } => {
                assert!(elapsed < policy.timeout);
            },
            other => panic!("expected Stuck, got {:?}", other),
        }
    }

    #[test]
    fn test_stuck_detection_disabled() {
        // stuck_samples = 0：恒定位置 + moving=true 只会超时
        let policy = PollPolicy {
            timeout: Duration::from_millis(30),
            poll_interval: Duration::from_millis(2),
            ..PollPolicy::default().without_stuck_detection()
        };
        let outcome = poll_until_settled(
            Setpoint::new(2048, 30),
            &policy,
            scripted(vec![(1500, true)]),
        )
        .unwrap();

        assert!(matches!(outcome, PollOutcome::TimedOut { .. }));
    }

    #[test]
    fn test_poll_interval_respected() {
        // 相邻采样间隔不小于 poll_interval
        let policy = PollPolicy {
            timeout: Duration::from_millis(60),
            poll_interval: Duration::from_millis(10),
            stuck_samples: 0,
            stuck_epsilon: 2,
        };
        let mut call_times: Vec<Instant> = Vec::new();
        let _ = poll_until_settled(Setpoint::new(2048, 30), &policy, || {
            call_times.push(Instant::now());
            Ok::<_, Infallible>(Sample::new(100, false))
        })
        .unwrap();

        assert!(call_times.len() >= 2);
        for pair in call_times.windows(2) {
            let gap = pair[1] - pair[0];
            // deadline 锚定在上一次采样时刻，调度只会让间隔变长
            assert!(
                gap >= policy.poll_interval,
                "sample gap {:?} < poll interval {:?}",
                gap,
                policy.poll_interval
            );
        }
    }

    #[test]
    fn test_sampler_error_propagates() {
        #[derive(Debug, PartialEq)]
        struct TransportError;

        let result = poll_until_settled(Setpoint::new(2048, 30), &fast_policy(), || {
            Err::<Sample, _>(TransportError)
        });

        assert_eq!(result.unwrap_err(), TransportError);
    }

    #[test]
    fn test_observer_sees_every_sample() {
        let mut observed = 0usize;
        let policy = PollPolicy {
            timeout: Duration::from_millis(20),
            poll_interval: Duration::from_millis(2),
            stuck_samples: 0,
            stuck_epsilon: 2,
        };
        let _ = poll_until_settled_with(
            Setpoint::new(2048, 30),
            &policy,
            scripted(vec![(100, false)]),
            |_, _| observed += 1,
        )
        .unwrap();

        assert!(observed >= 2);
    }

    #[test]
    fn test_outcome_accessors() {
        let outcome = PollOutcome::Converged {
            elapsed: Duration::from_millis(250),
        };
        assert!(outcome.is_converged());
        assert_eq!(outcome.elapsed(), Duration::from_millis(250));
        assert_eq!(outcome.description(), "converged");

        let outcome = PollOutcome::Stuck {
            elapsed: Duration::from_millis(10),
        };
        assert!(!outcome.is_converged());
        assert_eq!(outcome.description(), "stuck");
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            /// 任意单调收敛到目标的序列都应判定为到位
            #[test]
            fn monotonic_convergence_always_converges(
                start in 0i32..4096,
                target in 0i32..4096,
                step in 1i32..400,
            ) {
                let policy = PollPolicy {
                    timeout: Duration::from_secs(60),
                    poll_interval: Duration::ZERO,
                    stuck_samples: 0,
                    stuck_epsilon: 2,
                };
                let mut position = start;
                let outcome = poll_until_settled(Setpoint::new(target, 30), &policy, || {
                    if position < target {
                        position = (position + step).min(target);
                    } else {
                        position = (position - step).max(target);
                    }
                    Ok::<_, Infallible>(Sample::new(position, position != target))
                })
                .unwrap();

                prop_assert!(outcome.is_converged());
            }

            /// 到位耗时不超过超时上限（可达目标）
            #[test]
            fn converged_elapsed_within_timeout(step in 50i32..400) {
                let policy = PollPolicy {
                    timeout: Duration::from_secs(60),
                    poll_interval: Duration::ZERO,
                    stuck_samples: 0,
                    stuck_epsilon: 2,
                };
                let mut position = 1000;
                let outcome = poll_until_settled(Setpoint::new(2000, 30), &policy, || {
                    position = (position + step).min(2000);
                    Ok::<_, Infallible>(Sample::new(position, position != 2000))
                })
                .unwrap();

                prop_assert!(outcome.elapsed() <= policy.timeout);
            }
        }
    }
}
