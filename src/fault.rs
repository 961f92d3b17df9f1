//! 故障検出とラッチ
//!
//! Hallセンサー異常と保護ライン異常を単一のラッチに保持します。
//! ラッチの解除は `MotorController::start_motor` のみが行います。

use crate::hardware::ProtectionLines;

/// ラッチされた故障の種類
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum FaultKind {
    /// 不正なHallパターン
    Sensor,
    /// 保護ラインが両方Low（ドライバーの過電流/過温度シャットダウン）
    Protection,
}

/// 故障ラッチ
///
/// 一度セットされると `clear` が呼ばれるまで保持されます。
/// 複数の故障が発生した場合は最初の種類を保持します。
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FaultLatch {
    kind: Option<FaultKind>,
}

impl FaultLatch {
    pub const fn new() -> Self {
        Self { kind: None }
    }

    /// 故障をラッチする
    ///
    /// # 戻り値
    /// 今回の呼び出しで新たにラッチされた場合 `true`
    pub fn latch(&mut self, kind: FaultKind) -> bool {
        if self.kind.is_some() {
            return false;
        }
        self.kind = Some(kind);
        true
    }

    pub fn is_set(&self) -> bool {
        self.kind.is_some()
    }

    pub fn kind(&self) -> Option<FaultKind> {
        self.kind
    }

    pub(crate) fn clear(&mut self) {
        self.kind = None;
    }
}

/// 保護ライン監視
pub struct FaultMonitor<P: ProtectionLines> {
    lines: P,
}

impl<P: ProtectionLines> FaultMonitor<P> {
    pub fn new(lines: P) -> Self {
        Self { lines }
    }

    /// 保護ラインをサンプリング
    ///
    /// # 戻り値
    /// 両方のラインが同時にLowなら `true`（故障）
    pub fn check(&mut self) -> bool {
        let (line1, line2) = self.lines.read_protection_lines();
        !line1 && !line2
    }

    /// 保護ラインが現在正常かどうか
    pub fn is_healthy(&mut self) -> bool {
        !self.check()
    }
}
