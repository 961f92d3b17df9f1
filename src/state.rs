//! 共有状態管理
//!
//! 制御tick、Hallエッジ割り込み、低優先度タスクの間で共有される状態です。
//! 割り込み側の変更はアトミック操作のみで行い、制御状態のスナップショットは
//! クリティカルセクションで保護して公開します。

use core::cell::Cell;
use core::sync::atomic::{AtomicBool, AtomicU32, AtomicU8, Ordering};

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::fault::FaultKind;
use crate::hardware::{CurrentSensor, TemperatureSensor};
use crate::lifecycle::MotorLifecycleState;
use crate::six_step::RevolutionCounter;

/// 保留中の電源要求
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub(crate) enum PowerRequest {
    Start = 1,
    Stop = 2,
}

const NO_REQUEST: u8 = 0;

/// 制御tickが公開するモーターステータス
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MotorStatus {
    /// ライフサイクル状態
    pub lifecycle: MotorLifecycleState,
    /// 電源要求がONか
    pub powered: bool,
    /// 推定速度 [RPM]
    pub speed_rpm: f32,
    /// 目標速度 [RPM]
    pub desired_rpm: f32,
    /// デューティ比
    pub duty: f32,
    /// ラッチされた故障
    pub fault: Option<FaultKind>,
    /// 通電時間の累計 [s]
    pub run_time_s: u32,
}

impl MotorStatus {
    pub const fn new() -> Self {
        Self {
            lifecycle: MotorLifecycleState::Idle,
            powered: false,
            speed_rpm: 0.0,
            desired_rpm: 0.0,
            duty: 0.0,
            fault: None,
            run_time_s: 0,
        }
    }

    pub fn is_faulted(&self) -> bool {
        self.fault.is_some()
    }
}

impl Default for MotorStatus {
    fn default() -> Self {
        Self::new()
    }
}

/// 最新のセンサー値（f32のビット表現）と未読フラグ
struct Reading {
    bits: AtomicU32,
    fresh: AtomicBool,
}

impl Reading {
    const fn new() -> Self {
        Self {
            bits: AtomicU32::new(0),
            fresh: AtomicBool::new(false),
        }
    }

    fn record(&self, value: f32) {
        self.bits.store(value.to_bits(), Ordering::Relaxed);
        self.fresh.store(true, Ordering::Release);
    }

    fn take(&self) -> Option<f32> {
        if self.fresh.swap(false, Ordering::Acquire) {
            Some(f32::from_bits(self.bits.load(Ordering::Relaxed)))
        } else {
            None
        }
    }

    fn latest(&self) -> f32 {
        f32::from_bits(self.bits.load(Ordering::Relaxed))
    }
}

/// モーター制御の共有ブロック
///
/// ファームウェアでは `static` として配置します。
pub struct MotorShared {
    /// Hallエッジカウンタ（割り込み側）
    revolutions: RevolutionCounter,
    /// 保留中の電源要求
    power_request: AtomicU8,
    /// 目標速度 [RPM]（クランプ済み）
    desired_rpm: AtomicU32,
    /// 目標速度の上限 [RPM]
    max_speed_rpm: AtomicU32,
    current: Reading,
    temperature: Reading,
    /// 最後に公開されたステータス
    status: Mutex<CriticalSectionRawMutex, Cell<MotorStatus>>,
}

impl MotorShared {
    pub const fn new(max_speed_rpm: u32) -> Self {
        Self {
            revolutions: RevolutionCounter::new(),
            power_request: AtomicU8::new(NO_REQUEST),
            desired_rpm: AtomicU32::new(0),
            max_speed_rpm: AtomicU32::new(max_speed_rpm),
            current: Reading::new(),
            temperature: Reading::new(),
            status: Mutex::new(Cell::new(MotorStatus::new())),
        }
    }

    /// Hallエッジ割り込みから呼び出す
    #[inline(always)]
    pub fn on_position_edge(&self) {
        self.revolutions.on_position_edge();
    }

    pub fn revolutions(&self) -> &RevolutionCounter {
        &self.revolutions
    }

    /// 制御tick以外のコンテキスト向けのハンドルを取得
    pub fn handle(&self) -> MotorHandle<'_> {
        MotorHandle { shared: self }
    }

    /// 電流値を記録（次のtickでサンプルとして送られる）
    pub fn record_current(&self, current: f32) {
        self.current.record(current);
    }

    /// 温度値を記録（次のtickでサンプルとして送られる）
    pub fn record_temperature(&self, temperature: f32) {
        self.temperature.record(temperature);
    }

    /// 電流センサーを読み取り、値を記録
    pub fn sample_current<S: CurrentSensor>(&self, sensor: &mut S) -> f32 {
        let current = sensor.read_current();
        self.record_current(current);
        current
    }

    /// 温度センサーを読み取り、値を記録
    pub fn sample_temperature<S: TemperatureSensor>(&self, sensor: &mut S) -> f32 {
        let temperature = sensor.read_temperature();
        self.record_temperature(temperature);
        temperature
    }

    /// 最後に記録された電流値
    pub fn latest_current(&self) -> f32 {
        self.current.latest()
    }

    /// 最後に記録された温度値 [°C]
    pub fn latest_temperature(&self) -> f32 {
        self.temperature.latest()
    }

    /// 最後に公開されたステータス
    pub fn status(&self) -> MotorStatus {
        self.status.lock(|status| status.get())
    }

    pub(crate) fn take_current(&self) -> Option<f32> {
        self.current.take()
    }

    pub(crate) fn take_temperature(&self) -> Option<f32> {
        self.temperature.take()
    }

    pub(crate) fn take_power_request(&self) -> Option<PowerRequest> {
        match self.power_request.swap(NO_REQUEST, Ordering::AcqRel) {
            1 => Some(PowerRequest::Start),
            2 => Some(PowerRequest::Stop),
            _ => None,
        }
    }

    fn request_power(&self, request: PowerRequest) {
        self.power_request.store(request as u8, Ordering::Release);
    }

    fn pending_power_request(&self) -> Option<PowerRequest> {
        match self.power_request.load(Ordering::Acquire) {
            1 => Some(PowerRequest::Start),
            2 => Some(PowerRequest::Stop),
            _ => None,
        }
    }

    pub(crate) fn desired_rpm(&self) -> u32 {
        self.desired_rpm.load(Ordering::Relaxed)
    }

    /// 目標速度の上限を変更し、現在の目標速度を再クランプ
    pub(crate) fn set_max_speed(&self, max_speed_rpm: u32) {
        self.max_speed_rpm.store(max_speed_rpm, Ordering::Relaxed);
        let desired = self.desired_rpm.load(Ordering::Relaxed);
        if desired > max_speed_rpm {
            self.desired_rpm.store(max_speed_rpm, Ordering::Relaxed);
        }
    }

    pub(crate) fn publish(&self, status: MotorStatus) {
        self.status.lock(|cell| cell.set(status));
    }
}

/// モーター操作ハンドル
///
/// 電源要求は次の制御tickの先頭で適用されます。
#[derive(Clone, Copy)]
pub struct MotorHandle<'a> {
    shared: &'a MotorShared,
}

impl<'a> MotorHandle<'a> {
    /// モーター始動を要求
    ///
    /// 保護ラインが異常のままなら制御tickが始動を拒否し、故障ラッチを保持します。
    pub fn start_motor(&self) {
        self.shared.request_power(PowerRequest::Start);
    }

    /// モーター停止を要求（冪等）
    pub fn stop_motor(&self) {
        self.shared.request_power(PowerRequest::Stop);
    }

    /// 電源のON/OFFを切り替え
    pub fn toggle_motor_power(&self) {
        let powered = match self.shared.pending_power_request() {
            Some(PowerRequest::Start) => true,
            Some(PowerRequest::Stop) => false,
            None => self.shared.status().powered,
        };
        if powered {
            self.stop_motor();
        } else {
            self.start_motor();
        }
    }

    /// 目標速度を設定
    ///
    /// # 引数
    /// * `rpm` - 目標速度 [RPM]（負の値は0、上限超過は上限にクランプ）
    ///
    /// # 戻り値
    /// クランプ後の目標速度
    pub fn set_desired_speed(&self, rpm: i32) -> u32 {
        let max = self.shared.max_speed_rpm.load(Ordering::Relaxed);
        let clamped = (rpm.max(0) as u32).min(max);
        self.shared.desired_rpm.store(clamped, Ordering::Relaxed);
        clamped
    }

    /// 目標速度 [RPM]
    pub fn desired_speed(&self) -> u32 {
        self.shared.desired_rpm()
    }

    /// 推定速度 [RPM]
    pub fn current_speed(&self) -> f32 {
        self.shared.status().speed_rpm
    }

    pub fn is_faulted(&self) -> bool {
        self.shared.status().is_faulted()
    }

    pub fn lifecycle_state(&self) -> MotorLifecycleState {
        self.shared.status().lifecycle
    }

    pub fn status(&self) -> MotorStatus {
        self.shared.status()
    }
}
