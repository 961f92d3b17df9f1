//! Configuration module
//!
//! ボード固有のハードウェア設定と周期パラメータを提供します。
//! 制御パラメータは `hall_bldc::config` のデフォルト値を使用します。

pub mod params;

// params.rsから主要な定数を再エクスポート
pub use params::*;
