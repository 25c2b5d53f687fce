//! # 台架仿真后端
//!
//! 确定性的舵机总线仿真：每次位置读取推进一步运动模型。用于单元/
//! 集成测试和 CLI 的 `--simulate` 模式，不依赖任何硬件。
//!
//! 运动模型刻意简单：使能扭矩时每读一次位置就向目标推进 `step` 个
//! 单位；`jammed` 舵机位置冻结但 `Moving` 保持为真（复现卡死判定）；
//! 扭矩关闭时按 `drift` 自由漂移（复现机械松动检查）。

use std::collections::BTreeMap;

use rand::{Rng, SeedableRng, rngs::StdRng};

use crate::{BusError, Register, ServoBus, ServoId};

/// 仿真舵机
#[derive(Debug, Clone)]
pub struct BenchServo {
    /// ping 返回的型号编号（默认 STS3215 = 777）
    pub model_number: u16,

    /// 是否响应 ping / 读写（false 模拟断线舵机）
    pub responds: bool,

    /// 当前位置（原始单位）
    pub position: i32,

    /// 目标位置
    pub goal: i32,

    /// 每次位置读取向目标推进的步长
    pub step: i32,

    /// 扭矩使能状态
    pub torque_enabled: bool,

    /// 卡死：位置冻结但 Moving 保持为真
    pub jammed: bool,

    /// 扭矩关闭时每次读取的自由漂移量
    pub drift: i32,

    /// 位置读取噪声幅度（0 = 无噪声）
    pub noise: i32,

    /// 静态/遥测寄存器值
    registers: BTreeMap<Register, i32>,
}

impl BenchServo {
    pub fn new(id: u8) -> Self {
        let mut registers = BTreeMap::new();
        registers.insert(Register::Id, id as i32);
        registers.insert(Register::Baudrate, 0);
        registers.insert(Register::ReturnDelayTime, 0);
        registers.insert(Register::ResponseStatusLevel, 1);
        registers.insert(Register::MinAngleLimit, 0);
        registers.insert(Register::MaxAngleLimit, 4095);
        registers.insert(Register::MaxTemperatureLimit, 70);
        registers.insert(Register::MaxVoltageLimit, 80);
        registers.insert(Register::MinVoltageLimit, 40);
        registers.insert(Register::MaxTorqueLimit, 1000);
        registers.insert(Register::Lock, 0);
        registers.insert(Register::PresentLoad, 24);
        registers.insert(Register::PresentVoltage, 74);
        registers.insert(Register::PresentTemperature, 32);

        Self {
            model_number: 777,
            responds: true,
            position: 2048,
            goal: 2048,
            step: 120,
            torque_enabled: false,
            jammed: false,
            drift: 0,
            noise: 0,
            registers,
        }
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self.goal = position;
        self
    }

    pub fn with_step(mut self, step: i32) -> Self {
        self.step = step;
        self
    }

    /// 卡死舵机：Moving 恒为真但位置不再变化
    pub fn jammed(mut self) -> Self {
        self.jammed = true;
        self
    }

    /// 扭矩关闭时的自由漂移（机械松动仿真）
    pub fn with_drift(mut self, drift: i32) -> Self {
        self.drift = drift;
        self
    }

    /// 位置读取噪声
    pub fn with_noise(mut self, noise: i32) -> Self {
        self.noise = noise;
        self
    }

    /// 断线舵机：不响应任何指令
    pub fn silent(mut self) -> Self {
        self.responds = false;
        self
    }

    /// 是否处于运动状态（Moving 寄存器语义）
    fn moving(&self) -> bool {
        self.torque_enabled && self.position != self.goal
    }

    /// 推进一步运动模型（每次位置读取调用一次）
    fn tick(&mut self) {
        if !self.torque_enabled {
            self.position += self.drift;
        } else if !self.jammed && self.position != self.goal {
            if self.position < self.goal {
                self.position = (self.position + self.step).min(self.goal);
            } else {
                self.position = (self.position - self.step).max(self.goal);
            }
        }
    }
}

/// 仿真总线
///
/// 持有一组 [`BenchServo`]，实现 [`ServoBus`]。支持注入传输失败
/// （第 N 次读之后全部超时），用于验证错误传播路径。
pub struct BenchBus {
    servos: BTreeMap<u8, BenchServo>,
    rng: StdRng,
    reads: u64,
    fail_reads_after: Option<u64>,
}

impl BenchBus {
    pub fn new() -> Self {
        Self {
            servos: BTreeMap::new(),
            // 固定种子：噪声可复现
            rng: StdRng::seed_from_u64(0x5_0101),
            reads: 0,
            fail_reads_after: None,
        }
    }

    /// SO101 随动臂预设（ID 1..=6，全部健康）
    pub fn so101_follower() -> Self {
        let mut bus = Self::new();
        for id in 1..=6u8 {
            bus.add_servo(BenchServo::new(id));
        }
        bus
    }

    pub fn add_servo(&mut self, servo: BenchServo) -> &mut Self {
        let id = self.servo_register(&servo);
        self.servos.insert(id, servo);
        self
    }

    fn servo_register(&self, servo: &BenchServo) -> u8 {
        *servo.registers.get(&Register::Id).unwrap_or(&0) as u8
    }

    /// 第 `n` 次读之后注入读超时（传输错误路径测试）
    pub fn fail_reads_after(&mut self, n: u64) {
        self.fail_reads_after = Some(n);
    }

    pub fn servo(&self, id: ServoId) -> Option<&BenchServo> {
        self.servos.get(&id.0)
    }

    pub fn servo_mut(&mut self, id: ServoId) -> Option<&mut BenchServo> {
        self.servos.get_mut(&id.0)
    }

    fn lookup(&mut self, id: ServoId) -> Result<&mut BenchServo, BusError> {
        match self.servos.get_mut(&id.0) {
            Some(servo) if servo.responds => Ok(servo),
            // 不存在与不响应在总线上不可区分：都是读超时
            _ => Err(BusError::Timeout { id }),
        }
    }
}

impl Default for BenchBus {
    fn default() -> Self {
        Self::new()
    }
}

impl ServoBus for BenchBus {
    fn ping(&mut self, id: ServoId) -> Result<u16, BusError> {
        let servo = self.lookup(id)?;
        Ok(servo.model_number)
    }

    fn read_register(&mut self, id: ServoId, register: Register) -> Result<i32, BusError> {
        self.reads += 1;
        if let Some(limit) = self.fail_reads_after {
            if self.reads > limit {
                tracing::debug!(id = id.0, reads = self.reads, "injected read timeout");
                return Err(BusError::Timeout { id });
            }
        }

        let noise_amp = self
            .servos
            .get(&id.0)
            .map(|s| s.noise)
            .unwrap_or(0);
        let noise = if noise_amp > 0 {
            self.rng.gen_range(-noise_amp..=noise_amp)
        } else {
            0
        };

        let servo = self.lookup(id)?;
        match register {
            Register::PresentPosition => {
                servo.tick();
                Ok(servo.position + noise)
            },
            Register::Moving => Ok((servo.jammed && servo.torque_enabled || servo.moving()) as i32),
            Register::TorqueEnable => Ok(servo.torque_enabled as i32),
            Register::GoalPosition => Ok(servo.goal),
            Register::PresentSpeed => Ok(if servo.moving() { servo.step } else { 0 }),
            other => servo.registers.get(&other).copied().ok_or(BusError::Timeout { id }),
        }
    }

    fn write_register(
        &mut self,
        id: ServoId,
        register: Register,
        value: i32,
    ) -> Result<(), BusError> {
        if register.is_read_only() {
            return Err(BusError::ReadOnlyRegister { register });
        }

        tracing::debug!(id = id.0, register = register.name(), value, "bench register write");

        let servo = self.lookup(id)?;
        match register {
            Register::TorqueEnable => {
                servo.torque_enabled = value != 0;
                if servo.torque_enabled {
                    // 使能瞬间以当前位置为目标，避免虚假跳变
                    servo.goal = servo.position;
                }
            },
            Register::GoalPosition => servo.goal = value,
            other => {
                servo.registers.insert(other, value);
            },
        }
        Ok(())
    }
}
