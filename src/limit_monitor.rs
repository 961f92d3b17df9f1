//! Current / Temperature Limit Monitoring
//!
//! フィルタ済みの電流・温度をリミットと比較し、過電流/過温度を検出します。
//! `enforce` はリミット超過時に通電中のモーターへ停止を要求します。

use crate::config::limits::{DEFAULT_CURRENT_LIMIT, DEFAULT_TEMPERATURE_LIMIT};
use crate::measurement::SharedMeasurements;
use crate::state::MotorHandle;

/// リミット監視パラメータ
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitMonitorConfig {
    /// 電流リミット
    pub current_limit: f32,
    /// 温度リミット [°C]
    pub temperature_limit: f32,
}

impl Default for LimitMonitorConfig {
    fn default() -> Self {
        Self {
            current_limit: DEFAULT_CURRENT_LIMIT,
            temperature_limit: DEFAULT_TEMPERATURE_LIMIT,
        }
    }
}

/// リミット監視状態
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LimitState {
    /// 最後に評価した電流（フィルタ済み）
    pub current: f32,
    /// 最後に評価した温度（フィルタ済み）[°C]
    pub temperature: f32,
    /// 過電流フラグ
    pub over_current: bool,
    /// 過温度フラグ
    pub over_temperature: bool,
}

impl LimitState {
    pub const fn new() -> Self {
        Self {
            current: 0.0,
            temperature: 0.0,
            over_current: false,
            over_temperature: false,
        }
    }

    /// 電流・温度ともリミット内かチェック
    pub fn is_ok(&self) -> bool {
        !self.over_current && !self.over_temperature
    }
}

impl Default for LimitState {
    fn default() -> Self {
        Self::new()
    }
}

/// リミット監視コントローラ
pub struct LimitMonitor {
    config: LimitMonitorConfig,
    state: LimitState,
}

impl LimitMonitor {
    /// 新しいリミット監視コントローラを作成
    pub fn new(config: LimitMonitorConfig) -> Self {
        Self {
            config,
            state: LimitState::new(),
        }
    }

    /// フィルタ済みの測定値でリミットを評価
    ///
    /// # Arguments
    /// * `filtered_current` - フィルタ済み電流
    /// * `filtered_temperature` - フィルタ済み温度 [°C]
    ///
    /// # Returns
    /// 更新後のリミット監視状態
    pub fn update(&mut self, filtered_current: f32, filtered_temperature: f32) -> LimitState {
        self.state.current = filtered_current;
        self.state.temperature = filtered_temperature;

        // リミットちょうどは許容
        self.state.over_current = filtered_current > self.config.current_limit;
        self.state.over_temperature = filtered_temperature > self.config.temperature_limit;

        if self.state.over_current {
            error!(
                "OVERCURRENT detected! Current: {} (limit: {})",
                filtered_current, self.config.current_limit
            );
        }
        if self.state.over_temperature {
            error!(
                "OVERTEMPERATURE detected! Temperature: {}C (limit: {}C)",
                filtered_temperature, self.config.temperature_limit
            );
        }

        self.state
    }

    /// 測定値を評価し、リミット超過なら通電中のモーターを停止
    ///
    /// 停止は `MotorHandle::stop_motor` による要求で、次の制御tickで適用されます。
    /// 故障ラッチは変更しません。
    ///
    /// # Arguments
    /// * `measurements` - フィルタ済み測定値の取得元
    /// * `motor` - モーター操作ハンドル
    ///
    /// # Returns
    /// 更新後のリミット監視状態
    pub fn enforce(
        &mut self,
        measurements: &SharedMeasurements,
        motor: MotorHandle<'_>,
    ) -> LimitState {
        let state = self.update(
            measurements.filtered_current(),
            measurements.filtered_temperature(),
        );

        if !state.is_ok() && motor.status().powered {
            error!(
                "Limit exceeded! Stopping motor. Current: {}, Temperature: {}C",
                state.current, state.temperature
            );
            motor.stop_motor();
        }

        state
    }

    /// 現在の状態を取得
    pub fn get_state(&self) -> LimitState {
        self.state
    }

    /// 電流リミットを取得
    pub fn current_limit(&self) -> f32 {
        self.config.current_limit
    }

    /// 温度リミットを取得 [°C]
    pub fn temperature_limit(&self) -> f32 {
        self.config.temperature_limit
    }

    /// リミットを更新
    pub fn set_limits(&mut self, current_limit: f32, temperature_limit: f32) {
        self.config.current_limit = current_limit;
        self.config.temperature_limit = temperature_limit;
        info!(
            "Limits updated: current={}, temperature={}C",
            current_limit, temperature_limit
        );
    }
}
