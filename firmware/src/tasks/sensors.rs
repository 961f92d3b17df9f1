//! センサー読み取りタスク
//!
//! ブロッキングのADC読み取りを制御tickの外で行い、最新値を共有ブロックに記録します。
//! 記録された値は次の制御tickで測定サンプルとして送られます。

use embassy_futures::select::{select, Either};
use embassy_time::{Duration, Ticker};

use crate::config::sensors::{CURRENT_PERIOD_MS, TEMPERATURE_PERIOD_MS};
use crate::hardware::SensorBoard;
use crate::state::MOTOR;

/// センサー読み取りタスク（電流5ms、温度500ms周期）
#[embassy_executor::task]
pub async fn sensors_task(mut sensors: SensorBoard) {
    info!("Sensor task started");

    let mut current_ticker = Ticker::every(Duration::from_millis(CURRENT_PERIOD_MS));
    let mut temperature_ticker = Ticker::every(Duration::from_millis(TEMPERATURE_PERIOD_MS));

    // 初回の温度値を記録
    let temperature = MOTOR.sample_temperature(&mut sensors);
    info!("Initial temperature: {}C", temperature);

    loop {
        match select(current_ticker.next(), temperature_ticker.next()).await {
            Either::First(_) => {
                MOTOR.sample_current(&mut sensors);
            }
            Either::Second(_) => {
                MOTOR.sample_temperature(&mut sensors);
            }
        }
    }
}
