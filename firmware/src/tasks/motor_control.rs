//! モーター制御タスク
//!
//! 1kHzで制御ループを1tickずつ実行します。

use embassy_time::{Duration, Ticker};
use hall_bldc::{MotorController, SharedMeasurements};

use crate::config::{CONTROL_PERIOD_US, STATUS_LOG_INTERVAL_TICKS};
use crate::hall_tim::HallInputs;
use crate::hardware::ProtectionInputs;
use crate::motor_driver::MotorDriver;

/// ファームウェアの制御ループ型
pub type Controller = MotorController<
    'static,
    HallInputs,
    ProtectionInputs,
    MotorDriver,
    &'static SharedMeasurements,
>;

/// モーター制御タスク（1kHz制御ループ）
#[embassy_executor::task]
pub async fn motor_control_task(mut controller: Controller) {
    info!(
        "Motor control task started: {}Hz, window={} ticks",
        controller.config().tick_hz,
        controller.config().window_ticks
    );

    let mut ticker = Ticker::every(Duration::from_micros(CONTROL_PERIOD_US));

    // デバッグログ用カウンタ（1秒ごとにログ）
    let mut log_counter = 0u32;

    loop {
        ticker.next().await;

        let status = controller.tick();

        log_counter += 1;
        if log_counter >= STATUS_LOG_INTERVAL_TICKS {
            log_counter = 0;
            debug!(
                "[Motor] State: {}, RPM: {}/{}, Duty: {}, Fault: {}, Run: {}s",
                status.lifecycle,
                status.speed_rpm,
                status.desired_rpm,
                status.duty,
                status.fault,
                status.run_time_s
            );
        }
    }
}
