//! モーターライフサイクル状態機械
//!
//! 状態は電源要求と測定速度から毎tick再計算される純粋関数の結果で、
//! 直接設定することはできません。

use crate::config::RUNNING_SPEED_RATIO;

/// ユーザー/UIからの電源要求
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorPowerIntent {
    On,
    #[default]
    Off,
}

/// モーターライフサイクル状態
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
#[repr(u8)]
pub enum MotorLifecycleState {
    /// 停止中
    #[default]
    Idle = 0,
    /// 加速中（目標速度の90%未満）
    Starting = 1,
    /// 定常運転
    Running = 2,
    /// 減速中
    Stopping = 3,
}

impl MotorLifecycleState {
    /// モーターが回転中、または回転を要求されているか
    pub fn is_active(self) -> bool {
        !matches!(self, MotorLifecycleState::Idle)
    }
}

/// 状態遷移関数
///
/// # 引数
/// * `intent` - 電源要求
/// * `measured_rpm` - 測定速度 [RPM]
/// * `desired_rpm` - 目標速度 [RPM]
pub fn transition(
    intent: MotorPowerIntent,
    measured_rpm: f32,
    desired_rpm: f32,
) -> MotorLifecycleState {
    match intent {
        MotorPowerIntent::On if measured_rpm < RUNNING_SPEED_RATIO * desired_rpm => {
            MotorLifecycleState::Starting
        }
        MotorPowerIntent::On => MotorLifecycleState::Running,
        MotorPowerIntent::Off if measured_rpm > 0.0 => MotorLifecycleState::Stopping,
        MotorPowerIntent::Off => MotorLifecycleState::Idle,
    }
}

/// ライフサイクル状態機械
#[derive(Debug, Default)]
pub struct MotorLifecycle {
    intent: MotorPowerIntent,
    state: MotorLifecycleState,
}

impl MotorLifecycle {
    pub const fn new() -> Self {
        Self {
            intent: MotorPowerIntent::Off,
            state: MotorLifecycleState::Idle,
        }
    }

    pub fn set_intent(&mut self, intent: MotorPowerIntent) {
        self.intent = intent;
    }

    pub fn intent(&self) -> MotorPowerIntent {
        self.intent
    }

    /// 状態を再計算
    ///
    /// # 戻り値
    /// 新しい状態
    pub fn update(&mut self, measured_rpm: f32, desired_rpm: f32) -> MotorLifecycleState {
        let next = transition(self.intent, measured_rpm, desired_rpm);
        if next != self.state {
            debug!("lifecycle: {} -> {}", self.state, next);
        }
        self.state = next;
        next
    }

    pub fn state(&self) -> MotorLifecycleState {
        self.state
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transition_table() {
        use MotorLifecycleState::*;
        use MotorPowerIntent::*;

        assert_eq!(transition(On, 850.0, 1000.0), Starting);
        assert_eq!(transition(On, 950.0, 1000.0), Running);
        assert_eq!(transition(Off, 10.0, 1000.0), Stopping);
        assert_eq!(transition(Off, 0.0, 1000.0), Idle);
    }

    #[test]
    fn test_threshold_boundary() {
        // 900は90%ちょうど: STARTINGではない
        assert_eq!(
            transition(MotorPowerIntent::On, 900.0, 1000.0),
            MotorLifecycleState::Running
        );
        // 目標0なら常にRUNNING
        assert_eq!(
            transition(MotorPowerIntent::On, 0.0, 0.0),
            MotorLifecycleState::Running
        );
    }

    #[test]
    fn test_lifecycle_follows_inputs() {
        let mut lifecycle = MotorLifecycle::new();
        assert_eq!(lifecycle.state(), MotorLifecycleState::Idle);
        assert_eq!(lifecycle.update(0.0, 1000.0), MotorLifecycleState::Idle);
        assert!(!lifecycle.state().is_active());
        // 電源OFFでも惰性回転中ならSTOPPING
        assert_eq!(lifecycle.update(500.0, 1000.0), MotorLifecycleState::Stopping);
        assert!(lifecycle.state().is_active());

        lifecycle.set_intent(MotorPowerIntent::On);
        assert_eq!(lifecycle.update(0.0, 1000.0), MotorLifecycleState::Starting);
        assert_eq!(lifecycle.update(1000.0, 1000.0), MotorLifecycleState::Running);

        lifecycle.set_intent(MotorPowerIntent::Off);
        assert_eq!(lifecycle.update(400.0, 1000.0), MotorLifecycleState::Stopping);
        assert_eq!(lifecycle.update(0.0, 1000.0), MotorLifecycleState::Idle);

        // 一定入力で固定点
        assert_eq!(lifecycle.update(0.0, 1000.0), MotorLifecycleState::Idle);
    }
}
