//! 制御ループ
//!
//! 1tickごとにHallデコード、転流、保護ライン監視、速度推定、PI制御、
//! ライフサイクル更新、測定サンプル送信をこの順で実行します。

use crate::config::ControlConfig;
use crate::error::{ConfigError, MotorError};
use crate::fault::{FaultKind, FaultLatch, FaultMonitor};
use crate::hardware::{HalfBridges, HallSensors, MeasurementSink, ProtectionLines};
use crate::lifecycle::{MotorLifecycle, MotorLifecycleState, MotorPowerIntent};
use crate::measurement::MeasurementSample;
use crate::six_step::{CommutationDriver, HallDecoder, PiController, RevolutionEstimator};
use crate::state::{MotorShared, MotorStatus, PowerRequest};

/// モーター制御ループ
///
/// 制御tickのコンテキストが唯一の所有者です。他のコンテキストからは
/// `MotorShared::handle` 経由で操作します。
pub struct MotorController<'a, H, P, B, M>
where
    H: HallSensors,
    P: ProtectionLines,
    B: HalfBridges,
    M: MeasurementSink,
{
    config: ControlConfig,
    shared: &'a MotorShared,
    hall: H,
    decoder: HallDecoder,
    driver: CommutationDriver<B>,
    fault_monitor: FaultMonitor<P>,
    faults: FaultLatch,
    pi: PiController,
    estimator: RevolutionEstimator<'a>,
    lifecycle: MotorLifecycle,
    measurements: M,
    /// 通電中のtick数
    powered_ticks: u64,
}

impl<'a, H, P, B, M> MotorController<'a, H, P, B, M>
where
    H: HallSensors,
    P: ProtectionLines,
    B: HalfBridges,
    M: MeasurementSink,
{
    /// 新しい制御ループを作成（出力停止・IDLE状態で開始）
    ///
    /// # 引数
    /// * `config` - 制御設定
    /// * `shared` - 割り込み/タスク間の共有ブロック
    /// * `hall` - Hallセンサー入力
    /// * `protection` - 保護ライン入力
    /// * `bridges` - 3相PWM出力
    /// * `measurements` - 測定値の集約先
    pub fn new(
        config: ControlConfig,
        shared: &'a MotorShared,
        mut hall: H,
        protection: P,
        bridges: B,
        measurements: M,
    ) -> Result<Self, ConfigError> {
        config.validate()?;

        hall.disable_edge_interrupts();
        shared.set_max_speed(config.max_speed_rpm);

        Ok(Self {
            config,
            shared,
            hall,
            decoder: HallDecoder::new(),
            driver: CommutationDriver::new(bridges),
            fault_monitor: FaultMonitor::new(protection),
            faults: FaultLatch::new(),
            pi: PiController::new(&config),
            estimator: RevolutionEstimator::new(shared.revolutions(), &config),
            lifecycle: MotorLifecycle::new(),
            measurements,
            powered_ticks: 0,
        })
    }

    /// 1制御周期分の処理
    ///
    /// # 戻り値
    /// このtickの終わりに公開したステータス
    pub fn tick(&mut self) -> MotorStatus {
        self.service_requests();

        let powered = self.is_powered();
        let desired = self.desired_rpm();

        if powered {
            let was_faulted = self.faults.is_set();

            let (h1, h2, h3) = self.hall.read_hall_lines();
            let reading = self.decoder.decode(h1, h2, h3, &mut self.faults);

            // 故障ラッチ中は出力を一切更新しない
            if !self.faults.is_set() {
                self.driver.drive(reading, self.pi.get_duty());
            }

            if self.fault_monitor.check() {
                self.faults.latch(FaultKind::Protection);
            }

            if !was_faulted && self.faults.is_set() {
                self.on_fault_latched();
            }

            self.powered_ticks += 1;
        }

        let new_rpm = self.estimator.on_tick();
        if let Some(rpm) = new_rpm {
            if powered && !self.faults.is_set() {
                let duty = self.pi.update(desired, rpm);
                trace!("pi: desired={} rpm={} duty={}", desired, rpm, duty);
            }
        }

        self.lifecycle.update(self.estimator.current_speed(), desired);

        self.measurements.push(MeasurementSample {
            speed_rpm: new_rpm,
            current: self.shared.take_current(),
            temperature: self.shared.take_temperature(),
        });

        let status = self.status();
        self.shared.publish(status);
        status
    }

    /// 他コンテキストからの電源要求を適用
    pub fn service_requests(&mut self) {
        match self.shared.take_power_request() {
            Some(PowerRequest::Start) => {
                if let Err(e) = self.start_motor() {
                    debug!("Start request not applied: {}", e);
                }
            }
            Some(PowerRequest::Stop) => self.stop_motor(),
            None => {}
        }
    }

    /// モーターを始動
    ///
    /// 保護ラインが正常な場合のみ故障ラッチを解除します。
    ///
    /// # 戻り値
    /// * `Ok(())` - 始動した
    /// * `Err(MotorError::ProtectionActive)` - 保護ラインが異常のため拒否（電源要求は変更しない）
    pub fn start_motor(&mut self) -> Result<(), MotorError> {
        if !self.fault_monitor.is_healthy() {
            warn!("Start refused: protection lines report a fault");
            if self.faults.latch(FaultKind::Protection) {
                self.on_fault_latched();
            }
            return Err(MotorError::ProtectionActive);
        }

        if let Some(kind) = self.faults.kind() {
            info!("Clearing latched fault: {}", kind);
        }
        self.faults.clear();
        self.pi.reset();
        self.estimator.reset();
        self.decoder.reset();
        self.driver.enable();
        self.hall.enable_edge_interrupts();
        self.lifecycle.set_intent(MotorPowerIntent::On);

        info!(
            "Motor started: target={} rpm, duty={}",
            self.desired_rpm(),
            self.pi.get_duty()
        );
        Ok(())
    }

    /// モーターを停止（冪等）
    ///
    /// 故障ラッチは変更しません。
    pub fn stop_motor(&mut self) {
        self.driver.disable();
        self.hall.disable_edge_interrupts();
        self.pi.stop();
        self.estimator.reset();
        self.lifecycle.set_intent(MotorPowerIntent::Off);
        let desired = self.desired_rpm();
        self.lifecycle.update(self.estimator.current_speed(), desired);

        info!("Motor stopped");
    }

    /// 目標速度を設定
    ///
    /// # 戻り値
    /// クランプ後の目標速度 [RPM]
    pub fn set_desired_speed(&mut self, rpm: i32) -> u32 {
        self.shared.handle().set_desired_speed(rpm)
    }

    /// 速度PIゲインを変更
    pub fn set_speed_gains(&mut self, kp: f32, ki: f32) {
        self.pi.set_gains(kp, ki);
        info!("Speed PI gains updated: Kp={}, Ki={}", kp, ki);
    }

    /// 推定速度 [RPM]
    pub fn current_speed(&self) -> f32 {
        self.estimator.current_speed()
    }

    pub fn is_faulted(&self) -> bool {
        self.faults.is_set()
    }

    pub fn fault_kind(&self) -> Option<FaultKind> {
        self.faults.kind()
    }

    pub fn lifecycle_state(&self) -> MotorLifecycleState {
        self.lifecycle.state()
    }

    pub fn is_powered(&self) -> bool {
        self.lifecycle.intent() == MotorPowerIntent::On
    }

    /// 現在のデューティ比
    pub fn duty(&self) -> f32 {
        self.pi.get_duty()
    }

    /// 通電時間の累計 [s]
    pub fn run_time_s(&self) -> u32 {
        (self.powered_ticks / self.config.tick_hz as u64) as u32
    }

    pub fn status(&self) -> MotorStatus {
        MotorStatus {
            lifecycle: self.lifecycle.state(),
            powered: self.is_powered(),
            speed_rpm: self.estimator.current_speed(),
            desired_rpm: self.desired_rpm(),
            duty: self.pi.get_duty(),
            fault: self.faults.kind(),
            run_time_s: self.run_time_s(),
        }
    }

    pub fn config(&self) -> &ControlConfig {
        &self.config
    }

    pub fn pi(&self) -> &PiController {
        &self.pi
    }

    pub fn driver(&self) -> &CommutationDriver<B> {
        &self.driver
    }

    pub fn hall(&self) -> &H {
        &self.hall
    }

    pub fn measurements(&self) -> &M {
        &self.measurements
    }

    fn desired_rpm(&self) -> f32 {
        self.shared.desired_rpm() as f32
    }

    /// 故障ラッチ直後に一度だけ出力を停止
    fn on_fault_latched(&mut self) {
        if let Some(kind) = self.faults.kind() {
            error!("FAULT latched: {}, outputs disabled", kind);
        }
        self.driver.disable();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core::cell::Cell;

    use crate::fault::tests::SettableLines;
    use crate::limit_monitor::{LimitMonitor, LimitMonitorConfig};
    use crate::measurement::{Measurements, SharedMeasurements};
    use crate::six_step::commutation::tests::RecordingBridges;

    /// テスト用のHall入力
    struct MockHall<'a> {
        lines: &'a Cell<(bool, bool, bool)>,
        irq_enabled: bool,
    }

    impl HallSensors for MockHall<'_> {
        fn read_hall_lines(&mut self) -> (bool, bool, bool) {
            self.lines.get()
        }

        fn enable_edge_interrupts(&mut self) {
            self.irq_enabled = true;
        }

        fn disable_edge_interrupts(&mut self) {
            self.irq_enabled = false;
        }
    }

    type TestController<'a> =
        MotorController<'a, MockHall<'a>, SettableLines<'a>, RecordingBridges, Measurements>;

    const HEALTHY: (bool, bool) = (true, true);
    const TRIPPED: (bool, bool) = (false, false);
    /// 状態0のHallパターン (h1, h2, h3) = 001
    const STATE_0: (bool, bool, bool) = (false, false, true);
    /// 状態1のHallパターン 101
    const STATE_1: (bool, bool, bool) = (true, false, true);
    const INVALID: (bool, bool, bool) = (true, true, true);

    struct Rig {
        shared: MotorShared,
        hall: Cell<(bool, bool, bool)>,
        protection: Cell<(bool, bool)>,
    }

    impl Rig {
        fn new() -> Self {
            Self {
                shared: MotorShared::new(6000),
                hall: Cell::new(STATE_0),
                protection: Cell::new(HEALTHY),
            }
        }

        fn controller(&self) -> TestController<'_> {
            self.controller_with(Measurements::new())
        }

        fn controller_with<M: MeasurementSink>(
            &self,
            measurements: M,
        ) -> MotorController<'_, MockHall<'_>, SettableLines<'_>, RecordingBridges, M> {
            MotorController::new(
                ControlConfig::default(),
                &self.shared,
                MockHall {
                    lines: &self.hall,
                    irq_enabled: false,
                },
                SettableLines(&self.protection),
                RecordingBridges::default(),
                measurements,
            )
            .unwrap()
        }
    }

    fn applied<M: MeasurementSink>(
        controller: &MotorController<'_, MockHall<'_>, SettableLines<'_>, RecordingBridges, M>,
    ) -> usize {
        controller.driver().bridges().applied.len()
    }

    #[test]
    fn test_new_rejects_invalid_config() {
        let rig = Rig::new();
        let result = MotorController::new(
            ControlConfig {
                window_ticks: 0,
                ..ControlConfig::default()
            },
            &rig.shared,
            MockHall {
                lines: &rig.hall,
                irq_enabled: true,
            },
            SettableLines(&rig.protection),
            RecordingBridges::default(),
            Measurements::new(),
        );
        assert!(matches!(result, Err(ConfigError::ZeroWindow)));
    }

    #[test]
    fn test_idle_controller_never_drives() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        for _ in 0..10 {
            let status = controller.tick();
            assert_eq!(status.lifecycle, MotorLifecycleState::Idle);
        }
        assert_eq!(applied(&controller), 0);
        assert!(!controller.driver().bridges().enabled);
    }

    #[test]
    fn test_start_drives_commutation_with_starting_duty() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        controller.set_desired_speed(1000);

        assert_eq!(controller.start_motor(), Ok(()));
        assert!(controller.hall().irq_enabled);
        assert_eq!(controller.duty(), controller.config().starting_duty);

        let status = controller.tick();
        assert_eq!(status.lifecycle, MotorLifecycleState::Starting);
        assert_eq!(applied(&controller), 1);

        // 状態0: Cがパルス、Bが下側ON、Aがフローティング
        let commands = controller.driver().last_commands().unwrap();
        assert!(!commands[0].enabled);
        assert_eq!(commands[1].compare, 0);
        assert_eq!(commands[2].compare, 250);

        rig.hall.set(STATE_1);
        controller.tick();
        assert_eq!(applied(&controller), 2);
    }

    #[test]
    fn test_invalid_hall_pattern_freezes_outputs_until_start() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        controller.set_desired_speed(1000);
        controller.start_motor().unwrap();
        controller.tick();
        assert_eq!(applied(&controller), 1);
        let disables = controller.driver().bridges().disable_calls;

        rig.hall.set(INVALID);
        let status = controller.tick();
        assert!(controller.is_faulted());
        assert_eq!(status.fault, Some(FaultKind::Sensor));
        assert_eq!(controller.driver().bridges().disable_calls, disables + 1);

        // 有効なパターンに戻ってもラッチ中は出力を更新しない
        let frozen_duty = controller.duty();
        for i in 0..600 {
            rig.hall.set(if i % 2 == 0 { STATE_0 } else { STATE_1 });
            rig.shared.on_position_edge();
            controller.tick();
        }
        assert_eq!(applied(&controller), 1);
        assert_eq!(controller.driver().bridges().disable_calls, disables + 1);
        assert_eq!(controller.duty(), frozen_duty);
        assert!(controller.is_faulted());

        // 明示的な再始動でのみ復帰
        controller.start_motor().unwrap();
        assert!(!controller.is_faulted());
        controller.tick();
        assert_eq!(applied(&controller), 2);
    }

    #[test]
    fn test_protection_fault_latches_while_running() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        controller.start_motor().unwrap();
        controller.tick();

        rig.protection.set(TRIPPED);
        controller.tick();
        assert_eq!(controller.fault_kind(), Some(FaultKind::Protection));
        assert!(!controller.driver().is_enabled());
        let count = applied(&controller);

        // 保護ラインが回復してもラッチは保持
        rig.protection.set(HEALTHY);
        for _ in 0..10 {
            controller.tick();
        }
        assert!(controller.is_faulted());
        assert_eq!(applied(&controller), count);
    }

    #[test]
    fn test_start_refused_while_protection_active() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        rig.protection.set(TRIPPED);

        assert_eq!(controller.start_motor(), Err(MotorError::ProtectionActive));
        assert!(controller.is_faulted());
        assert!(!controller.is_powered());
        assert!(!controller.hall().irq_enabled);

        controller.tick();
        assert_eq!(applied(&controller), 0);
        assert_eq!(controller.lifecycle_state(), MotorLifecycleState::Idle);

        rig.protection.set(HEALTHY);
        assert_eq!(controller.start_motor(), Ok(()));
        assert!(!controller.is_faulted());
    }

    #[test]
    fn test_pi_updates_once_per_window() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        controller.set_desired_speed(1000);
        controller.start_motor().unwrap();

        let starting_duty = controller.duty();
        for _ in 0..249 {
            controller.tick();
        }
        assert_eq!(controller.duty(), starting_duty);

        controller.tick();
        assert!(controller.duty() > starting_duty);
        assert!(controller.duty() - starting_duty <= controller.config().max_increment + 1.0e-7);
        assert!(controller.pi().get_error_sum() > 0.0);
    }

    #[test]
    fn test_lifecycle_follows_measured_speed() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        controller.set_desired_speed(1000);
        controller.start_motor().unwrap();

        // 25エッジ / 250tick = 1000 RPM
        rig.shared.on_position_edge();
        let mut status = controller.tick();
        assert_eq!(status.lifecycle, MotorLifecycleState::Starting);
        for tick in 1..250 {
            if tick % 10 == 0 {
                rig.shared.on_position_edge();
            }
            status = controller.tick();
        }
        assert!((status.speed_rpm - 1000.0).abs() < 1.0e-2);
        assert_eq!(status.lifecycle, MotorLifecycleState::Running);
        assert!((controller.measurements().filtered_speed() - 1000.0).abs() < 1.0e-2);

        controller.stop_motor();
        assert_eq!(controller.lifecycle_state(), MotorLifecycleState::Idle);
        assert_eq!(controller.current_speed(), 0.0);
    }

    #[test]
    fn test_stop_motor_zeroes_duty_and_keeps_fault_flag() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        controller.set_desired_speed(3000);
        controller.start_motor().unwrap();
        for _ in 0..500 {
            controller.tick();
        }
        assert!(controller.pi().get_error_sum() > 0.0);

        controller.stop_motor();
        assert_eq!(controller.duty(), 0.0);
        assert_eq!(controller.pi().get_error_sum(), 0.0);
        assert!(!controller.is_faulted());
        assert!(!controller.hall().irq_enabled);

        let count = applied(&controller);
        for _ in 0..100 {
            rig.hall.set(STATE_1);
            controller.tick();
        }
        assert_eq!(applied(&controller), count);

        // 故障ラッチ中の停止でもフラグは変化しない
        controller.start_motor().unwrap();
        rig.hall.set(INVALID);
        controller.tick();
        controller.stop_motor();
        controller.stop_motor();
        assert_eq!(controller.fault_kind(), Some(FaultKind::Sensor));
        assert_eq!(controller.duty(), 0.0);
    }

    #[test]
    fn test_desired_speed_is_clamped() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        assert_eq!(controller.set_desired_speed(-5), 0);
        assert_eq!(controller.set_desired_speed(6100), 6000);
        assert_eq!(controller.tick().desired_rpm, 6000.0);
    }

    #[test]
    fn test_handle_requests_apply_on_next_tick() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        let motor = rig.shared.handle();
        motor.set_desired_speed(1000);

        motor.start_motor();
        assert!(!controller.is_powered());
        controller.tick();
        assert!(controller.is_powered());
        assert_eq!(motor.lifecycle_state(), MotorLifecycleState::Starting);
        assert_eq!(applied(&controller), 1);

        motor.toggle_motor_power();
        controller.tick();
        assert!(!controller.is_powered());
        assert_eq!(motor.lifecycle_state(), MotorLifecycleState::Idle);
        assert_eq!(motor.current_speed(), 0.0);
        assert!(!motor.is_faulted());
    }

    #[test]
    fn test_refused_request_is_reported_through_status() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        rig.protection.set(TRIPPED);

        rig.shared.handle().start_motor();
        let status = controller.tick();
        assert!(!status.powered);
        assert_eq!(status.fault, Some(FaultKind::Protection));
    }

    #[test]
    fn test_samples_and_run_time() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        controller.start_motor().unwrap();

        rig.shared.record_current(0.75);
        rig.shared.record_temperature(31.0);
        controller.tick();
        assert_eq!(controller.measurements().filtered_current(), 0.75);
        assert_eq!(controller.measurements().filtered_temperature(), 31.0);

        for _ in 1..2000 {
            controller.tick();
        }
        assert_eq!(controller.run_time_s(), 2);

        // 停止中は加算されない
        controller.stop_motor();
        for _ in 0..1000 {
            controller.tick();
        }
        assert_eq!(controller.status().run_time_s, 2);
    }

    #[test]
    fn test_speed_gains_change_pi_step() {
        let rig = Rig::new();
        let mut controller = rig.controller();
        controller.set_speed_gains(2.0e-8, 0.0);
        assert_eq!(controller.pi().get_kp(), 2.0e-8);
        assert_eq!(controller.pi().get_ki(), 0.0);

        controller.set_desired_speed(100);
        controller.start_motor().unwrap();
        let starting_duty = controller.duty();
        for _ in 0..250 {
            controller.tick();
        }
        // 誤差100 RPM * Kp
        assert!((controller.duty() - starting_duty - 2.0e-6).abs() < 1.0e-7);
    }

    #[test]
    fn test_limit_trip_stops_motor_and_keeps_fault_flag() {
        let measurements = SharedMeasurements::new();
        let rig = Rig::new();
        let mut controller = rig.controller_with(&measurements);
        let mut monitor = LimitMonitor::new(LimitMonitorConfig {
            current_limit: 1.5,
            temperature_limit: 60.0,
        });
        controller.set_desired_speed(1000);
        controller.start_motor().unwrap();

        for _ in 0..5 {
            rig.shared.record_current(2.5);
            controller.tick();
        }
        assert_eq!(measurements.filtered_current(), 2.5);
        assert!(controller.is_powered());

        assert!(monitor.enforce(&measurements, rig.shared.handle()).over_current);
        let status = controller.tick();
        assert!(!status.powered);
        assert_eq!(status.lifecycle, MotorLifecycleState::Idle);
        assert_eq!(status.fault, None);
        assert_eq!(controller.duty(), 0.0);
        assert!(!controller.driver().is_enabled());

        let count = applied(&controller);
        for _ in 0..10 {
            controller.tick();
        }
        assert_eq!(applied(&controller), count);

        // 故障ラッチ中に停止してもラッチの種類は変わらない
        controller.start_motor().unwrap();
        rig.hall.set(INVALID);
        controller.tick();
        assert_eq!(controller.fault_kind(), Some(FaultKind::Sensor));
        assert!(controller.is_powered());

        monitor.enforce(&measurements, rig.shared.handle());
        let status = controller.tick();
        assert!(!status.powered);
        assert_eq!(status.fault, Some(FaultKind::Sensor));
    }
}
