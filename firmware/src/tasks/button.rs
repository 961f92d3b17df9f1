//! ボタンタスク
//!
//! ボタン押下でモーターの電源ON/OFFを切り替えます。

use embassy_stm32::exti::ExtiInput;
use embassy_time::{Duration, Timer};

use crate::config::BUTTON_DEBOUNCE_MS;
use crate::state::MOTOR;

/// ボタンタスク（立ち下がりエッジで電源トグル）
#[embassy_executor::task]
pub async fn button_task(mut button: ExtiInput<'static>) {
    info!("Button task started");

    let motor = MOTOR.handle();

    loop {
        button.wait_for_falling_edge().await;
        Timer::after(Duration::from_millis(BUTTON_DEBOUNCE_MS)).await;
        if button.is_high() {
            continue;
        }

        motor.toggle_motor_power();
        info!("Button: power toggled (target {} rpm)", motor.desired_speed());

        button.wait_for_high().await;
    }
}
