//! Hallセンサー付きBLDCモーターの6ステップ転流・速度制御コア
//!
//! ハードウェアには `hardware` モジュールのトレイト経由でのみアクセスするため、
//! ファームウェアからもホスト上のテストからも同じ制御ロジックを使用できます。
#![cfg_attr(not(test), no_std)]

mod fmt;

pub mod config;
pub mod control_loop;
pub mod error;
pub mod fault;
pub mod hardware;
pub mod lifecycle;
pub mod limit_monitor;
pub mod measurement;
pub mod six_step;
pub mod state;

pub use config::ControlConfig;
pub use control_loop::MotorController;
pub use error::{ConfigError, MotorError};
pub use fault::{FaultKind, FaultLatch, FaultMonitor};
pub use lifecycle::{MotorLifecycle, MotorLifecycleState, MotorPowerIntent};
pub use limit_monitor::{LimitMonitor, LimitMonitorConfig, LimitState};
pub use measurement::{MeasurementSample, Measurements, SampleWindow, SharedMeasurements};
pub use six_step::{
    CommutationDriver, CommutationState, HallDecoder, HallReading, PhaseCommand, PiController,
    RevolutionCounter, RevolutionEstimator,
};
pub use state::{MotorHandle, MotorShared, MotorStatus};
