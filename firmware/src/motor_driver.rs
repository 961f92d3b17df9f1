//! モータードライバー抽象化レイヤー
//!
//! TIM1の3相相補PWMで6ステップ転流を出力します。
//! コンペア値（CCRプリロード）とチャネルの有効/無効（CCPCプリロード）は
//! 同じEGR書き込みで発生させる更新イベントとCOMイベントで同時に反映します。

use embassy_stm32::{
    pac, peripherals,
    timer::{complementary_pwm::ComplementaryPwm, Channel},
};
use hall_bldc::hardware::HalfBridges;
use hall_bldc::PhaseCommand;

/// A/B/C相に対応するTIM1チャネル
const PHASE_CHANNELS: [Channel; 3] = [Channel::Ch1, Channel::Ch2, Channel::Ch3];

/// 3相モータードライバー
///
/// STM32のComplementaryPwmを使用して3相ブラシレスモーターを駆動します。
pub struct MotorDriver {
    pwm: ComplementaryPwm<'static, peripherals::TIM1>,
    max_duty: u16,
}

impl MotorDriver {
    /// 新しいモータードライバーを作成（出力停止状態）
    ///
    /// # 引数
    /// * `pwm` - PWMペリフェラル（TIM1）
    pub fn new(pwm: ComplementaryPwm<'static, peripherals::TIM1>) -> Self {
        let max_duty = pwm.get_max_duty();

        let tim1 = pac::TIM1;
        // CCxE/CCxNEをプリロードし、COMイベントで一括反映
        tim1.cr2().modify(|w| w.set_ccpc(true));
        // MOEはenable()まで落としておく
        tim1.bdtr().modify(|w| w.set_moe(false));

        let mut driver = Self { pwm, max_duty };
        driver.stop();
        driver
    }

    /// PWMの最大Duty値を取得
    pub fn max_duty(&self) -> u16 {
        self.max_duty
    }

    /// 3相分のDuty値と有効/無効を書き込み、同期して反映
    fn write_phases(&mut self, commands: &[PhaseCommand; 3]) {
        let tim1 = pac::TIM1;

        // 書き込み途中のCCRが周期境界で反映されないよう更新イベントを抑止
        tim1.cr1().modify(|w| w.set_udis(true));

        for (channel, command) in PHASE_CHANNELS.into_iter().zip(commands) {
            self.pwm.set_duty(channel, command.compare);
            if command.enabled {
                self.pwm.enable(channel);
            } else {
                self.pwm.disable(channel);
            }
        }

        // UDIS=1のままではUGでもシャドウレジスタが転送されない
        tim1.cr1().modify(|w| w.set_udis(false));
        // UG: CCRを転送、COMG: CCxE/CCxNEを転送（同一書き込みで3相同時）
        tim1.egr().write(|w| {
            w.set_ug(true);
            w.set_comg(true);
        });
    }

    /// 全チャネルのDuty比を0にして停止
    pub fn stop(&mut self) {
        self.write_phases(&[PhaseCommand::OFF; 3]);
    }
}

impl HalfBridges for MotorDriver {
    fn max_compare(&self) -> u16 {
        self.max_duty
    }

    fn apply(&mut self, commands: &[PhaseCommand; 3]) {
        self.write_phases(commands);
    }

    fn enable(&mut self) {
        pac::TIM1.bdtr().modify(|w| w.set_moe(true));
    }

    fn disable(&mut self) {
        self.stop();
        pac::TIM1.bdtr().modify(|w| w.set_moe(false));
    }
}
