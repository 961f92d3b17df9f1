//! 6ステップ転流ドライバー
//!
//! 転流状態ごとに、3つのハーフブリッジ（A/B/C）のどれをPWM駆動し、
//! どれをLow固定、どれをリセットライン（ハイインピーダンス）にするかを
//! 固定テーブルで定義します。

use super::hall_decoder::{CommutationState, HallReading};
use crate::hardware::HalfBridges;

/// 1相分の駆動方法
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PhaseDrive {
    /// デューティ比でPWM駆動（High側）
    Pulsed,
    /// コンペア値0でLow固定
    Low,
    /// リセットラインLow（出力オフ）
    Floating,
}

use PhaseDrive::{Floating, Low, Pulsed};

/// 転流テーブル（転流状態 → [A, B, C]）
const COMMUTATION_TABLE: [[PhaseDrive; 3]; CommutationState::COUNT] = [
    [Floating, Low, Pulsed], // State 0 (Hall 001): C+, B-, A open
    [Pulsed, Low, Floating], // State 1 (Hall 101): A+, B-, C open
    [Pulsed, Floating, Low], // State 2 (Hall 100): A+, C-, B open
    [Floating, Pulsed, Low], // State 3 (Hall 110): B+, C-, A open
    [Low, Pulsed, Floating], // State 4 (Hall 010): B+, A-, C open
    [Low, Floating, Pulsed], // State 5 (Hall 011): C+, A-, B open
];

/// 1チャネル分の出力コマンド
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct PhaseCommand {
    /// PWMコンペア値（0 = 常時Low）
    pub compare: u16,
    /// リセットラインのレベル（false = 出力オフ）
    pub enabled: bool,
}

impl PhaseCommand {
    pub const OFF: Self = Self {
        compare: 0,
        enabled: false,
    };
}

/// 転流状態の駆動パターンを取得
pub fn phase_drives(state: CommutationState) -> [PhaseDrive; 3] {
    COMMUTATION_TABLE[state.index() as usize]
}

/// デューティ比をコンペア値に変換（[0, 1] にクランプ）
pub fn duty_to_compare(duty: f32, max_compare: u16) -> u16 {
    let duty = if duty.is_nan() { 0.0 } else { duty.clamp(0.0, 1.0) };
    libm::roundf(duty * max_compare as f32) as u16
}

/// 転流状態とデューティ比から3チャネル分のコマンドを計算
///
/// # 引数
/// * `state` - 転流状態
/// * `duty` - デューティ比
/// * `max_compare` - コンペア値の最大値
pub fn phase_commands(state: CommutationState, duty: f32, max_compare: u16) -> [PhaseCommand; 3] {
    let pulse = duty_to_compare(duty, max_compare);
    phase_drives(state).map(|drive| match drive {
        Pulsed => PhaseCommand {
            compare: pulse,
            enabled: true,
        },
        Low => PhaseCommand {
            compare: 0,
            enabled: true,
        },
        Floating => PhaseCommand::OFF,
    })
}

/// 転流ドライバー
///
/// 出力が許可されている間だけ、転流状態に応じたコマンドを一括で反映します。
pub struct CommutationDriver<B> {
    bridges: B,
    enabled: bool,
    last_commands: Option<[PhaseCommand; 3]>,
}

impl<B: HalfBridges> CommutationDriver<B> {
    /// 新しい転流ドライバーを作成（出力停止状態で開始）
    pub fn new(mut bridges: B) -> Self {
        bridges.disable();
        Self {
            bridges,
            enabled: false,
            last_commands: None,
        }
    }

    /// 転流状態に応じて3相を駆動
    ///
    /// Faultまたは出力停止中は何もしない。
    ///
    /// # 戻り値
    /// 出力を更新した場合 `true`
    pub fn drive(&mut self, reading: HallReading, duty: f32) -> bool {
        let HallReading::State(state) = reading else {
            return false;
        };
        if !self.enabled {
            return false;
        }

        let commands = phase_commands(state, duty, self.bridges.max_compare());
        self.bridges.apply(&commands);
        self.last_commands = Some(commands);
        true
    }

    /// 全チャネルの出力を許可
    pub fn enable(&mut self) {
        self.bridges.enable();
        self.enabled = true;
    }

    /// 全チャネルを停止（冪等）
    pub fn disable(&mut self) {
        self.bridges.disable();
        self.enabled = false;
        self.last_commands = None;
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// 最後に反映したコマンド
    pub fn last_commands(&self) -> Option<[PhaseCommand; 3]> {
        self.last_commands
    }

    pub fn bridges(&self) -> &B {
        &self.bridges
    }
}
