//! エラー型定義

use core::fmt;

/// 制御設定エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ConfigError {
    /// 制御周期の周波数が0
    ZeroTickRate,
    /// 速度推定ウィンドウ長が0
    ZeroWindow,
    /// 最大デューティ比が (0, 1) の範囲外
    MaxDutyOutOfRange,
    /// 始動デューティ比が [0, 最大デューティ比] の範囲外
    StartingDutyOutOfRange,
    /// デューティ変化量の下限が上限を超えている
    InvertedIncrementLimits,
    /// 誤差積算値の上限が正でない
    NonPositiveErrorSumLimit,
    /// 目標速度の上限が0
    ZeroMaxSpeed,
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConfigError::ZeroTickRate => f.write_str("tick rate must be non-zero"),
            ConfigError::ZeroWindow => f.write_str("speed window must be at least one tick"),
            ConfigError::MaxDutyOutOfRange => f.write_str("max duty must lie in (0, 1)"),
            ConfigError::StartingDutyOutOfRange => {
                f.write_str("starting duty must lie in [0, max duty]")
            }
            ConfigError::InvertedIncrementLimits => {
                f.write_str("min increment must not exceed max increment")
            }
            ConfigError::NonPositiveErrorSumLimit => f.write_str("max error sum must be positive"),
            ConfigError::ZeroMaxSpeed => f.write_str("max speed must be non-zero"),
        }
    }
}

/// モーター操作エラー
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum MotorError {
    /// 保護ラインが異常を示しているため始動できない
    ProtectionActive,
}

impl fmt::Display for MotorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MotorError::ProtectionActive => {
                f.write_str("protection lines still report a driver shutdown")
            }
        }
    }
}
