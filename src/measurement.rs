//! 測定値の集約とフィルタリング
//!
//! 制御ループが毎tick送るサンプルを固定長ウィンドウに蓄積し、
//! 速度（平均）、電流（中央値）、温度（平均）のフィルタ値を提供します。

use core::cell::RefCell;

use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::blocking_mutex::Mutex;

use crate::config::measurement::{CURRENT_WINDOW, SPEED_WINDOW, TEMPERATURE_WINDOW};
use crate::hardware::MeasurementSink;

/// 1tick分の測定サンプル
///
/// 新しい値がない項目は `None`（前回値の再送はしない）。
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct MeasurementSample {
    /// 速度推定値 [RPM]（ウィンドウ完了時のみ）
    pub speed_rpm: Option<f32>,
    /// 電流
    pub current: Option<f32>,
    /// 温度 [°C]
    pub temperature: Option<f32>,
}

/// 固定長のリングバッファ
#[derive(Debug, Clone, Copy)]
pub struct SampleWindow<const N: usize> {
    samples: [f32; N],
    len: usize,
    next: usize,
}

impl<const N: usize> SampleWindow<N> {
    pub const fn new() -> Self {
        Self {
            samples: [0.0; N],
            len: 0,
            next: 0,
        }
    }

    /// サンプルを追加（満杯なら最も古いサンプルを上書き）
    pub fn push(&mut self, value: f32) {
        if N == 0 {
            return;
        }
        self.samples[self.next] = value;
        self.next = (self.next + 1) % N;
        self.len = (self.len + 1).min(N);
    }

    pub fn len(&self) -> usize {
        self.len
    }

    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    pub fn is_full(&self) -> bool {
        self.len == N
    }

    fn values(&self) -> &[f32] {
        // 満杯になるまではnext == lenなので先頭から詰まっている
        &self.samples[..self.len]
    }

    /// 平均値
    pub fn mean(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        Some(self.values().iter().sum::<f32>() / self.len as f32)
    }

    /// 中央値（偶数個の場合は中央2値の平均）
    pub fn median(&self) -> Option<f32> {
        if self.is_empty() {
            return None;
        }
        let mut sorted = self.samples;
        let sorted = &mut sorted[..self.len];
        sorted.sort_unstable_by(|a, b| a.total_cmp(b));

        let mid = self.len / 2;
        if self.len % 2 == 1 {
            Some(sorted[mid])
        } else {
            Some((sorted[mid - 1] + sorted[mid]) / 2.0)
        }
    }

    pub fn clear(&mut self) {
        self.len = 0;
        self.next = 0;
    }
}

impl<const N: usize> Default for SampleWindow<N> {
    fn default() -> Self {
        Self::new()
    }
}

/// 測定値アグリゲータ
#[derive(Debug, Clone)]
pub struct Measurements {
    speed: SampleWindow<SPEED_WINDOW>,
    current: SampleWindow<CURRENT_WINDOW>,
    temperature: SampleWindow<TEMPERATURE_WINDOW>,
    peak_speed: f32,
    peak_current: f32,
    peak_temperature: Option<f32>,
}

impl Measurements {
    pub const fn new() -> Self {
        Self {
            speed: SampleWindow::new(),
            current: SampleWindow::new(),
            temperature: SampleWindow::new(),
            peak_speed: 0.0,
            peak_current: 0.0,
            peak_temperature: None,
        }
    }

    /// フィルタ済み速度 [RPM]（直近の推定値の平均）
    pub fn filtered_speed(&self) -> f32 {
        self.speed.mean().unwrap_or(0.0)
    }

    /// フィルタ済み電流（直近サンプルの中央値）
    pub fn filtered_current(&self) -> f32 {
        self.current.median().unwrap_or(0.0)
    }

    /// フィルタ済み温度 [°C]（直近サンプルの平均）
    pub fn filtered_temperature(&self) -> f32 {
        self.temperature.mean().unwrap_or(0.0)
    }

    pub fn peak_speed(&self) -> f32 {
        self.peak_speed
    }

    pub fn peak_current(&self) -> f32 {
        self.peak_current
    }

    pub fn peak_temperature(&self) -> Option<f32> {
        self.peak_temperature
    }

    /// ピーク値をリセット
    pub fn reset_peaks(&mut self) {
        self.peak_speed = 0.0;
        self.peak_current = 0.0;
        self.peak_temperature = None;
    }
}

impl Default for Measurements {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementSink for Measurements {
    fn push(&mut self, sample: MeasurementSample) {
        if let Some(speed) = sample.speed_rpm {
            self.speed.push(speed);
            self.peak_speed = self.peak_speed.max(speed);
        }
        if let Some(current) = sample.current {
            self.current.push(current);
            self.peak_current = self.peak_current.max(current);
        }
        if let Some(temperature) = sample.temperature {
            self.temperature.push(temperature);
            self.peak_temperature = Some(match self.peak_temperature {
                Some(peak) => peak.max(temperature),
                None => temperature,
            });
        }
    }
}

/// 割り込み/タスク間で共有できる測定値アグリゲータ
pub struct SharedMeasurements {
    inner: Mutex<CriticalSectionRawMutex, RefCell<Measurements>>,
}

impl SharedMeasurements {
    pub const fn new() -> Self {
        Self {
            inner: Mutex::new(RefCell::new(Measurements::new())),
        }
    }

    /// ロック中に測定値へアクセス
    pub fn with<R>(&self, f: impl FnOnce(&mut Measurements) -> R) -> R {
        self.inner.lock(|cell| f(&mut cell.borrow_mut()))
    }

    pub fn filtered_speed(&self) -> f32 {
        self.with(|m| m.filtered_speed())
    }

    pub fn filtered_current(&self) -> f32 {
        self.with(|m| m.filtered_current())
    }

    pub fn filtered_temperature(&self) -> f32 {
        self.with(|m| m.filtered_temperature())
    }
}

impl Default for SharedMeasurements {
    fn default() -> Self {
        Self::new()
    }
}

impl MeasurementSink for &SharedMeasurements {
    fn push(&mut self, sample: MeasurementSample) {
        self.with(|m| m.push(sample));
    }
}
