//! タスクモジュール
//!
//! 各タスクの実装を分離して管理します。

pub mod button;
pub mod led;
pub mod limit_monitor;
pub mod motor_control;
pub mod sensors;

// タスク関数を再エクスポート
pub use button::button_task;
pub use led::led_task;
pub use limit_monitor::limit_monitor_task;
pub use motor_control::{motor_control_task, Controller};
pub use sensors::sensors_task;
