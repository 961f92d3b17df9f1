//! リミット監視タスク
//!
//! フィルタ済みの電流・温度を監視し、リミット超過時にモーターを停止します。

use embassy_time::{Duration, Ticker};
use hall_bldc::{LimitMonitor, LimitMonitorConfig};

use crate::config::LIMIT_CHECK_PERIOD_MS;
use crate::state::{MEASUREMENTS, MOTOR};

/// リミット監視タスク - 過電流/過温度を検出してモーターを停止
#[embassy_executor::task]
pub async fn limit_monitor_task() {
    info!("Limit monitor task started");

    let mut monitor = LimitMonitor::new(LimitMonitorConfig::default());
    info!(
        "Limit monitor initialized: current={}, temperature={}C",
        monitor.current_limit(),
        monitor.temperature_limit()
    );

    let motor = MOTOR.handle();

    // 監視周期（100ms）
    let mut ticker = Ticker::every(Duration::from_millis(LIMIT_CHECK_PERIOD_MS));

    // デバッグログ用カウンタ（1秒ごとにログ）
    let mut log_counter = 0u32;

    loop {
        ticker.next().await;

        // リミット超過時はモーターを自動停止
        let state = monitor.enforce(&MEASUREMENTS, motor);

        log_counter += 1;
        if log_counter >= 10 {
            log_counter = 0;
            debug!(
                "[Limits] I={} (peak {}), T={}C, OC={}, OT={}",
                state.current,
                MEASUREMENTS.with(|m| m.peak_current()),
                state.temperature,
                state.over_current,
                state.over_temperature
            );
        }
    }
}
