//! グローバル共有状態
//!
//! Hallエッジ割り込み、制御タスク、低優先度タスクの間で共有されます。

use hall_bldc::config::DEFAULT_MAX_SPEED_RPM;
use hall_bldc::{MotorShared, SharedMeasurements};

/// モーター制御の共有ブロック（電源要求、目標速度、ステータス）
pub static MOTOR: MotorShared = MotorShared::new(DEFAULT_MAX_SPEED_RPM);

/// フィルタ済み測定値（制御tickが書き込み、リミット監視が読み出す）
pub static MEASUREMENTS: SharedMeasurements = SharedMeasurements::new();
