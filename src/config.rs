//! Configuration module
//!
//! 制御ループの設定パラメータと、その妥当性検証を提供します。

pub mod params;

pub use params::*;

use crate::error::ConfigError;

/// 制御ループ設定
///
/// デフォルト値は `params` の定数から生成されます。
#[derive(Debug, Clone, Copy, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ControlConfig {
    /// 制御周期の周波数 [Hz]
    pub tick_hz: u32,
    /// 速度推定の平均化ウィンドウ [tick]
    pub window_ticks: u32,
    /// 速度PI制御の比例ゲイン
    pub speed_kp: f32,
    /// 速度PI制御の積分ゲイン
    pub speed_ki: f32,
    /// 誤差積算値の上限（対称）
    pub max_error_sum: f32,
    /// 1回の更新でのデューティ変化量の下限
    pub min_increment: f32,
    /// 1回の更新でのデューティ変化量の上限
    pub max_increment: f32,
    /// 最大デューティ比（1.0未満）
    pub max_duty: f32,
    /// 始動時のデューティ比
    pub starting_duty: f32,
    /// 目標速度の上限 [RPM]
    pub max_speed_rpm: u32,
}

impl ControlConfig {
    pub const fn new() -> Self {
        Self {
            tick_hz: DEFAULT_TICK_HZ,
            window_ticks: DEFAULT_WINDOW_TICKS,
            speed_kp: DEFAULT_SPEED_KP,
            speed_ki: DEFAULT_SPEED_KI,
            max_error_sum: DEFAULT_MAX_ERROR_SUM,
            min_increment: DEFAULT_MIN_INCREMENT,
            max_increment: DEFAULT_MAX_INCREMENT,
            max_duty: DEFAULT_MAX_DUTY,
            starting_duty: DEFAULT_STARTING_DUTY,
            max_speed_rpm: DEFAULT_MAX_SPEED_RPM,
        }
    }

    /// 1分あたりのtick数
    pub fn ticks_per_minute(&self) -> f32 {
        self.tick_hz as f32 * 60.0
    }

    /// 設定値の妥当性を検証
    ///
    /// # 戻り値
    /// * `Ok(())` - 設定値が有効
    /// * `Err(ConfigError)` - 最初に見つかった不正な設定値
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_hz == 0 {
            return Err(ConfigError::ZeroTickRate);
        }
        if self.window_ticks == 0 {
            return Err(ConfigError::ZeroWindow);
        }
        // NaNもここで弾かれる
        if !(self.max_duty > 0.0 && self.max_duty < 1.0) {
            return Err(ConfigError::MaxDutyOutOfRange);
        }
        if !(self.starting_duty >= 0.0 && self.starting_duty <= self.max_duty) {
            return Err(ConfigError::StartingDutyOutOfRange);
        }
        if !(self.min_increment <= self.max_increment) {
            return Err(ConfigError::InvertedIncrementLimits);
        }
        if !(self.max_error_sum > 0.0) {
            return Err(ConfigError::NonPositiveErrorSumLimit);
        }
        if self.max_speed_rpm == 0 {
            return Err(ConfigError::ZeroMaxSpeed);
        }
        Ok(())
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self::new()
    }
}
