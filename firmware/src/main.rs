#![no_std]
#![no_main]

mod fmt;

mod config;
mod hall_tim;
mod hardware;
mod motor_driver;
mod state;
mod tasks;

#[cfg(not(feature = "defmt"))]
use panic_halt as _;
#[cfg(feature = "defmt")]
use {defmt_rtt as _, panic_probe as _};

use embassy_executor::Spawner;
use embassy_stm32::{
    adc::{Adc, AdcChannel, SampleTime},
    exti::ExtiInput,
    gpio::{Input, Level, Output, OutputType, Pull, Speed},
    timer::{
        complementary_pwm::{ComplementaryPwm, ComplementaryPwmPin},
        low_level::CountingMode,
        simple_pwm::PwmPin,
    },
};
use hall_bldc::{ControlConfig, MotorController};

use hall_tim::HallInputs;
use hardware::{ProtectionInputs, SensorBoard};
use motor_driver::MotorDriver;
use state::{MEASUREMENTS, MOTOR};
use tasks::{
    button_task, led_task, limit_monitor_task, motor_control_task, sensors_task, Controller,
};

#[embassy_executor::main]
async fn main(spawner: Spawner) {
    // ハードウェア初期化
    let config = hardware::create_clock_config();
    let p = embassy_stm32::init(config);

    info!("═══════════════════════════════════════════════════════");
    info!("   Hall BLDC six-step controller • STM32G431VB @ 170MHz");
    info!("═══════════════════════════════════════════════════════");

    // LED初期化＆タスク起動（PC13 = 緑、PC14 = 赤）
    let green = Output::new(p.PC13, Level::Low, Speed::Low);
    let red = Output::new(p.PC14, Level::Low, Speed::Low);
    spawner.spawn(led_task(green, red)).unwrap();

    // 電流・温度センサー（ADC1、PA0 = ADC1_IN1）
    let mut adc1 = Adc::new(p.ADC1);
    adc1.set_sample_time(SampleTime::CYCLES640_5);
    let current_pin = p.PA0.degrade_adc();
    spawner
        .spawn(sensors_task(SensorBoard::new(adc1, current_pin)))
        .unwrap();

    // 保護ライン（ドライバーのnFAULT出力、正常時High）
    let protection = ProtectionInputs::new(
        Input::new(p.PC6, Pull::Up),
        Input::new(p.PC7, Pull::Up),
    );

    // PWM初期化（TIM1、3相補完PWM）
    let mut uvw_pwm = ComplementaryPwm::new(
        p.TIM1,
        Some(PwmPin::new(p.PE9, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE8, OutputType::PushPull)),
        Some(PwmPin::new(p.PE11, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE10, OutputType::PushPull)),
        Some(PwmPin::new(p.PE13, OutputType::PushPull)),
        Some(ComplementaryPwmPin::new(p.PE12, OutputType::PushPull)),
        None,
        None,
        config::pwm::DEFAULT_FREQUENCY,
        CountingMode::EdgeAlignedUp,
    );
    uvw_pwm.set_dead_time(config::pwm::DEFAULT_DEAD_TIME);
    let driver = MotorDriver::new(uvw_pwm);
    info!("PWM initialized: max duty={}", driver.max_duty());

    // TIM4 Hallセンサーインターフェース初期化（PB6/PB7/PB8、XORモード）
    let hall = unsafe { HallInputs::new() };
    info!("TIM4 Hall Sensor Interface initialized");

    let controller: Controller = MotorController::new(
        ControlConfig::default(),
        &MOTOR,
        hall,
        protection,
        driver,
        &MEASUREMENTS,
    )
    .unwrap();

    let target = MOTOR.handle().set_desired_speed(config::DEFAULT_TARGET_RPM);
    info!("Target speed: {} rpm", target);

    spawner.spawn(motor_control_task(controller)).unwrap();
    spawner.spawn(limit_monitor_task()).unwrap();

    // 電源ボタン（PA15、プルアップ）
    let button = ExtiInput::new(p.PA15, p.EXTI15, Pull::Up);
    spawner.spawn(button_task(button)).unwrap();

    info!("Ready: press the button to start the motor");
}
