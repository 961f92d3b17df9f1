//! LED制御タスク
//!
//! モーターの状態をLEDで表示します。
//! 緑: 運転中は点灯、加速/減速中は点滅。赤: 故障ラッチ中は点灯。

use embassy_stm32::gpio::Output;
use embassy_time::{Duration, Timer};
use hall_bldc::MotorLifecycleState;

use crate::state::MOTOR;

/// LED制御タスク（250ms周期）
#[embassy_executor::task]
pub async fn led_task(mut green: Output<'static>, mut red: Output<'static>) {
    info!("LED task started");

    let mut blink = false;

    loop {
        let status = MOTOR.status();
        blink = !blink;

        if status.is_faulted() {
            red.set_high();
        } else {
            red.set_low();
        }

        match status.lifecycle {
            MotorLifecycleState::Running => green.set_high(),
            state if state.is_active() && blink => green.set_high(),
            _ => green.set_low(),
        }

        Timer::after(Duration::from_millis(250)).await;
    }
}
