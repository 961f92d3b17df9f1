//! モーター制御の設定パラメータ

/// 制御周期の周波数 [Hz]（1kHz = 1ms）（デフォルト値）
pub const DEFAULT_TICK_HZ: u32 = 1_000;

/// 速度推定の平均化ウィンドウ [tick]（250ms）（デフォルト値）
pub const DEFAULT_WINDOW_TICKS: u32 = 250;

/// 速度PI制御ゲイン（デフォルト値）
/// 1回の更新でのデューティ変化がフルスケールの1e-5程度に収まるよう小さく設定
pub const DEFAULT_SPEED_KP: f32 = 1.0e-8; // 比例ゲイン
pub const DEFAULT_SPEED_KI: f32 = 5.0e-10; // 積分ゲイン

/// 誤差積算値の上限 [RPM]（ワインドアップ防止）（デフォルト値）
pub const DEFAULT_MAX_ERROR_SUM: f32 = 20_000.0;

/// デューティ変化量の上限/下限（急なトルク変化の抑制）（デフォルト値）
pub const DEFAULT_MAX_INCREMENT: f32 = 1.0e-5;
pub const DEFAULT_MIN_INCREMENT: f32 = -1.0e-5;

/// 最大デューティ比（ゲートドライバの最小Lowパルス幅を確保するため1.0未満）（デフォルト値）
pub const DEFAULT_MAX_DUTY: f32 = 0.95;

/// 始動時のデューティ比（デフォルト値）
pub const DEFAULT_STARTING_DUTY: f32 = 0.25;

/// 目標速度の上限 [RPM]（デフォルト値）
pub const DEFAULT_MAX_SPEED_RPM: u32 = 6_000;

/// STARTING/RUNNING判定のしきい値（目標速度に対する比率）
pub const RUNNING_SPEED_RATIO: f32 = 0.9;

/// 1電気回転あたりのHallエッジ数
pub const EDGES_PER_REVOLUTION: u32 = 6;

/// 保護リミット（デフォルト値）
pub mod limits {
    /// 電流リミット [A]
    pub const DEFAULT_CURRENT_LIMIT: f32 = 2.0;

    /// 温度リミット [°C]
    pub const DEFAULT_TEMPERATURE_LIMIT: f32 = 80.0;
}

/// 測定値フィルタのウィンドウ長
pub mod measurement {
    /// 速度: 直近6回の推定値の平均
    pub const SPEED_WINDOW: usize = 6;

    /// 電流: 直近5サンプルの中央値
    pub const CURRENT_WINDOW: usize = 5;

    /// 温度: 直近3サンプルの平均
    pub const TEMPERATURE_WINDOW: usize = 3;
}
