//! ボードとタスク周期の設定パラメータ

/// 起動時の目標速度 [RPM]
pub const DEFAULT_TARGET_RPM: i32 = 1000;

/// 制御tick周期 [μs]（1kHz）
pub const CONTROL_PERIOD_US: u64 = 1_000_000 / hall_bldc::config::DEFAULT_TICK_HZ as u64;

/// ステータスログの間隔 [tick]（1秒ごと）
pub const STATUS_LOG_INTERVAL_TICKS: u32 = hall_bldc::config::DEFAULT_TICK_HZ;

/// PWM設定
pub mod pwm {
    use embassy_stm32::time::Hertz;

    /// PWM周波数（20kHz）
    pub const DEFAULT_FREQUENCY: Hertz = Hertz(20_000);

    /// デッドタイム [タイマーカウント]
    pub const DEFAULT_DEAD_TIME: u16 = 100;
}

/// センサー読み取り周期
pub mod sensors {
    /// 電流サンプリング周期 [ms]（5サンプルで中央値）
    pub const CURRENT_PERIOD_MS: u64 = 5;

    /// 温度サンプリング周期 [ms]（3サンプルで平均 = 1.5秒）
    pub const TEMPERATURE_PERIOD_MS: u64 = 500;

    /// ADC分解能（12ビット）
    pub const ADC_MAX: f32 = 4096.0;

    /// ADC基準電圧 [V]
    pub const VREF: f32 = 3.3;

    /// シャント抵抗 [Ω]
    pub const SHUNT_OHMS: f32 = 0.003;

    /// 電流センスアンプのゲイン
    pub const CURRENT_AMP_GAIN: f32 = 16.0;

    /// 電流0Aでのアンプ出力 [V]
    pub const CURRENT_OFFSET_V: f32 = 1.65;

    /// 内蔵温度センサー: 30°Cでの出力電圧 [V]
    pub const TEMP_V30: f32 = 0.76;

    /// 内蔵温度センサー: 温度係数 [V/°C]
    pub const TEMP_SLOPE: f32 = 0.0025;
}

/// リミット監視の周期 [ms]
pub const LIMIT_CHECK_PERIOD_MS: u64 = 100;

/// ボタンのチャタリング除去時間 [ms]
pub const BUTTON_DEBOUNCE_MS: u64 = 50;
