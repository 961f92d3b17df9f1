//! TIM4ベースのHallセンサーインターフェース実装
//!
//! STM32のハードウェアHall Sensor Interface Mode（XORモード）を使用して、
//! 3つのHallセンサー入力のいずれかのエッジごとにCC1割り込みを発生させます。
//! 割り込みハンドラーはエッジカウンタのインクリメントのみを行います。
//!
//! ## ハードウェア構成
//! - TIM4_CH1 (PB6): Hall H1
//! - TIM4_CH2 (PB7): Hall H2
//! - TIM4_CH3 (PB8): Hall H3

use embassy_stm32::pac;
use hall_bldc::hardware::HallSensors;

use crate::state::MOTOR;

/// Hallピン番号（GPIOB）
const HALL_PINS: [usize; 3] = [6, 7, 8];

/// TIM4 Hall Sensor Interface の初期化
///
/// 割り込みはマスク解除しますが、CC1IEは `HallInputs::enable_edge_interrupts` まで無効です。
///
/// # Safety
/// PACを使用した直接的なレジスタ操作を含むため、unsafe
pub unsafe fn init_hall_timer() {
    let rcc = pac::RCC;
    let tim4 = pac::TIM4;
    let gpiob = pac::GPIOB;

    // 1. クロック有効化
    rcc.ahb2enr().modify(|w| w.set_gpioben(true)); // GPIOB
    rcc.apb1enr1().modify(|w| w.set_tim4en(true)); // TIM4

    // 2. GPIO設定（PB6/PB7/PB8をAF2、外部プルアップ前提でプル無し）
    for pin in HALL_PINS {
        gpiob
            .moder()
            .modify(|w| w.set_moder(pin, pac::gpio::vals::Moder::ALTERNATE));
        gpiob
            .pupdr()
            .modify(|w| w.set_pupdr(pin, pac::gpio::vals::Pupdr::FLOATING));
    }
    gpiob.afr(0).modify(|w| {
        w.set_afr(6, 2);
        w.set_afr(7, 2);
    });
    gpiob.afr(1).modify(|w| w.set_afr(0, 2)); // PB8はAFRH[0]

    // 3. TIM4設定（フリーラン、エッジでリセット）
    tim4.cr1().modify(|w| w.set_cen(false));
    tim4.psc().write_value(0);
    tim4.arr().write_value(pac::timer::regs::ArrCore(0xFFFF));

    // 4. Hall Sensor Interface Mode: CH1/CH2/CH3をXOR -> TI1
    tim4.cr2().modify(|w| {
        w.set_ti1s(pac::timer::vals::Ti1s::XOR);
    });
    tim4.smcr().modify(|w| {
        // TI1のエッジ検出（両エッジ）をトリガーに選択
        w.set_ts(pac::timer::vals::Ts::TI1F_ED);
        w.set_sms(pac::timer::vals::Sms::RESET_MODE);
    });

    // 5. Input Capture設定（CH1 = TRC、8サイクルフィルタ）
    tim4.ccmr_input(0).modify(|w| {
        w.set_ccs(0, pac::timer::vals::CcmrInputCcs::TRC);
        w.set_icf(0, pac::timer::vals::FilterValue::FCK_INT_N8);
    });
    tim4.ccer().modify(|w| {
        w.set_cce(0, true);
        w.set_ccp(0, false);
    });

    // 6. 割り込みは無効のまま開始
    tim4.dier().modify(|w| w.set_ccie(0, false));

    // 7. NVIC（Embassyタスクより高優先度: Priority 2 = 0x20）
    unsafe {
        cortex_m::peripheral::NVIC::unmask(pac::Interrupt::TIM4);
        let mut cp = cortex_m::Peripherals::steal();
        cp.NVIC.set_priority(pac::Interrupt::TIM4, 0x20);
    }

    // 8. カウンタをリセットしてタイマー開始
    tim4.cnt().write_value(pac::timer::regs::CntCore(0));
    tim4.sr().write(|w| w.0 = 0);
    tim4.egr().write(|w| w.set_ug(true));
    tim4.cr1().modify(|w| {
        w.set_cen(true);
        w.set_urs(pac::timer::vals::Urs::COUNTER_ONLY);
    });
}

/// TIM4割り込みハンドラー（Capture/Compare 1）
///
/// # Safety
/// 割り込みコンテキストで実行されるため、処理は最小限にする
#[inline(always)]
pub unsafe fn tim4_irq_handler() {
    let tim4 = pac::TIM4;
    let sr = tim4.sr().read();

    if sr.ccif(0) {
        tim4.sr().modify(|w| w.set_ccif(0, false));
        MOTOR.on_position_edge();
    }
}

/// TIM4割り込みのRust側エントリーポイント
#[allow(non_snake_case)]
#[no_mangle]
pub unsafe extern "C" fn TIM4() {
    tim4_irq_handler();
}

/// Hallセンサー入力（GPIO直接読み取り + TIM4エッジ割り込み制御）
pub struct HallInputs {
    _private: (),
}

impl HallInputs {
    /// TIM4を初期化してHall入力を作成
    ///
    /// # Safety
    /// TIM4とPB6-8を他で使用していないこと
    pub unsafe fn new() -> Self {
        init_hall_timer();
        Self { _private: () }
    }
}

impl HallSensors for HallInputs {
    fn read_hall_lines(&mut self) -> (bool, bool, bool) {
        let idr = pac::GPIOB.idr().read();
        (
            idr.idr(HALL_PINS[0]) as u8 != 0,
            idr.idr(HALL_PINS[1]) as u8 != 0,
            idr.idr(HALL_PINS[2]) as u8 != 0,
        )
    }

    fn enable_edge_interrupts(&mut self) {
        let tim4 = pac::TIM4;
        // 停止中に溜まったフラグで余分なエッジを数えない
        tim4.sr().modify(|w| w.set_ccif(0, false));
        tim4.dier().modify(|w| w.set_ccie(0, true));
    }

    fn disable_edge_interrupts(&mut self) {
        pac::TIM4.dier().modify(|w| w.set_ccie(0, false));
    }
}
