//! ハードウェア抽象化トレイト
//!
//! 制御ロジックはこれらのトレイト経由でのみペリフェラルにアクセスします。
//! ファームウェアはSTM32のペリフェラルで、テストはモックで実装します。

use crate::measurement::MeasurementSample;
use crate::six_step::PhaseCommand;

/// 3つのHallセンサー入力とエッジ割り込み
pub trait HallSensors {
    /// Hallセンサーのレベルを読み取る
    ///
    /// # 戻り値
    /// * `(h1, h2, h3)` - 各センサーのレベル（true = High）
    fn read_hall_lines(&mut self) -> (bool, bool, bool);

    /// Hallエッジ割り込みを有効化
    fn enable_edge_interrupts(&mut self);

    /// Hallエッジ割り込みを無効化
    fn disable_edge_interrupts(&mut self);
}

/// モータードライバーの保護ライン（過電流/過温度シャットダウン）
pub trait ProtectionLines {
    /// 保護ラインのレベルを読み取る
    ///
    /// 正常時は両方High。両方Lowでドライバーがシャットダウンしている。
    fn read_protection_lines(&mut self) -> (bool, bool);
}

/// 3相ハーフブリッジ（A/B/C）のPWM出力
pub trait HalfBridges {
    /// コンペア値の最大値（デューティ比1.0に相当）
    fn max_compare(&self) -> u16;

    /// 3チャネル分のコマンドを一括で反映する
    ///
    /// 実装は途中状態が出力されないよう、3チャネルを同期して更新すること。
    fn apply(&mut self, commands: &[PhaseCommand; 3]);

    /// 全チャネルの出力を許可
    fn enable(&mut self);

    /// 全チャネルのデューティを0にして出力を停止
    fn disable(&mut self);
}

/// 測定値の集約先
pub trait MeasurementSink {
    fn push(&mut self, sample: MeasurementSample);
}

/// 電流センサー（ブロッキングの可能性あり。制御周期の外で呼ぶこと）
pub trait CurrentSensor {
    fn read_current(&mut self) -> f32;
}

/// 温度センサー（ブロッキングの可能性あり。制御周期の外で呼ぶこと）
pub trait TemperatureSensor {
    /// 対象物温度 [°C]
    fn read_temperature(&mut self) -> f32;
}
