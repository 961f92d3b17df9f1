//! ハードウェア初期化モジュール
//!
//! クロック設定と、保護ライン・電流/温度センサーの
//! `hall_bldc::hardware` トレイト実装を集約します。

use embassy_stm32::{
    adc::{Adc, AnyAdcChannel, Temperature},
    gpio::Input,
    peripherals, Config,
};
use hall_bldc::hardware::{CurrentSensor, ProtectionLines, TemperatureSensor};

use crate::config::sensors::*;

/// RCCクロック設定を初期化
///
/// HSI → PLL（÷4 × 85 ÷ 2）で170MHz生成
pub fn create_clock_config() -> Config {
    let mut config = Config::default();
    {
        use embassy_stm32::rcc::mux::{Adcsel, ClockMux};
        use embassy_stm32::rcc::{Pll, PllMul, PllPreDiv, PllRDiv, PllSource, Sysclk};

        config.rcc.hsi = true;
        config.rcc.pll = Some(Pll {
            source: PllSource::HSI,
            prediv: PllPreDiv::DIV4,
            mul: PllMul::MUL85,
            divp: None,
            divq: None,
            divr: Some(PllRDiv::DIV2),
        });
        config.rcc.sys = Sysclk::PLL1_R; // システムクロックをPLLに設定

        let mut clock_mux = ClockMux::default();
        clock_mux.adc12sel = Adcsel::SYS;
        config.rcc.mux = clock_mux;
    }
    config
}

/// モータードライバーの保護ライン（PC6/PC7、オープンドレイン・プルアップ）
pub struct ProtectionInputs {
    fault1: Input<'static>,
    fault2: Input<'static>,
}

impl ProtectionInputs {
    pub fn new(fault1: Input<'static>, fault2: Input<'static>) -> Self {
        Self { fault1, fault2 }
    }
}

impl ProtectionLines for ProtectionInputs {
    fn read_protection_lines(&mut self) -> (bool, bool) {
        (self.fault1.is_high(), self.fault2.is_high())
    }
}

/// ADC1による電流・内蔵温度センサー読み取り
pub struct SensorBoard {
    adc: Adc<'static, peripherals::ADC1>,
    current_pin: AnyAdcChannel<peripherals::ADC1>,
    temperature: Temperature,
}

impl SensorBoard {
    pub fn new(
        adc: Adc<'static, peripherals::ADC1>,
        current_pin: AnyAdcChannel<peripherals::ADC1>,
    ) -> Self {
        let temperature = adc.enable_temperature();
        Self {
            adc,
            current_pin,
            temperature,
        }
    }

    /// ADC生値から電圧を計算 [V]
    fn adc_to_voltage(adc_raw: u16) -> f32 {
        (adc_raw as f32 / ADC_MAX) * VREF
    }
}

impl CurrentSensor for SensorBoard {
    fn read_current(&mut self) -> f32 {
        let adc_raw = self.adc.blocking_read(&mut self.current_pin);
        // I = (V_amp - V_offset) / (R_shunt * Gain)
        (Self::adc_to_voltage(adc_raw) - CURRENT_OFFSET_V) / (SHUNT_OHMS * CURRENT_AMP_GAIN)
    }
}

impl TemperatureSensor for SensorBoard {
    fn read_temperature(&mut self) -> f32 {
        let adc_raw = self.adc.blocking_read(&mut self.temperature);
        (Self::adc_to_voltage(adc_raw) - TEMP_V30) / TEMP_SLOPE + 30.0
    }
}
